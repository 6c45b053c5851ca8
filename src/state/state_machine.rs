use thiserror::Error;

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomStatus {
    /// Players are joining and readying up.
    Waiting,
    /// Reserved pre-round state; no transition currently leads here.
    Starting,
    /// Rounds are running.
    Playing,
    /// The last round expired; terminal.
    Finished,
}

impl RoomStatus {
    /// Whether no further transition can leave this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, RoomStatus::Finished)
    }
}

/// Events that move a room through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// Every member is ready; the first round begins.
    AllPlayersReady,
    /// The current round expired and another movie remains.
    NextRound,
    /// The last round expired.
    LastRoundExpired,
}

/// Error returned when an event cannot be applied from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Status the room was in.
    pub from: RoomStatus,
    /// Rejected event.
    pub event: RoomEvent,
}

/// Compute the status reached by applying `event` in `from`.
pub fn next_status(from: RoomStatus, event: RoomEvent) -> Result<RoomStatus, InvalidTransition> {
    let next = match (from, event) {
        (RoomStatus::Waiting, RoomEvent::AllPlayersReady) => RoomStatus::Playing,
        (RoomStatus::Playing, RoomEvent::NextRound) => RoomStatus::Playing,
        (RoomStatus::Playing, RoomEvent::LastRoundExpired) => RoomStatus::Finished,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_through_a_room() {
        let playing = next_status(RoomStatus::Waiting, RoomEvent::AllPlayersReady).unwrap();
        assert_eq!(playing, RoomStatus::Playing);
        assert_eq!(
            next_status(playing, RoomEvent::NextRound).unwrap(),
            RoomStatus::Playing
        );
        assert_eq!(
            next_status(playing, RoomEvent::LastRoundExpired).unwrap(),
            RoomStatus::Finished
        );
    }

    #[test]
    fn finished_is_terminal() {
        assert!(RoomStatus::Finished.is_terminal());
        for event in [
            RoomEvent::AllPlayersReady,
            RoomEvent::NextRound,
            RoomEvent::LastRoundExpired,
        ] {
            let err = next_status(RoomStatus::Finished, event).unwrap_err();
            assert_eq!(err.from, RoomStatus::Finished);
            assert_eq!(err.event, event);
        }
    }

    #[test]
    fn rounds_cannot_advance_before_start() {
        assert!(next_status(RoomStatus::Waiting, RoomEvent::NextRound).is_err());
        assert!(next_status(RoomStatus::Starting, RoomEvent::AllPlayersReady).is_err());
        assert!(next_status(RoomStatus::Playing, RoomEvent::AllPlayersReady).is_err());
    }
}
