use serde::{Deserialize, Serialize};

use crate::state::{
    room::{Room, RoundRules},
    state_machine::{InvalidTransition, RoomEvent, RoomStatus, next_status},
};

/// How a playing room's countdown moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressionMode {
    /// Timer is recomputed from `round_start_time` whenever the room is read.
    #[default]
    Derived,
    /// Timer is decremented once per ticker step; reads leave it untouched.
    Ticking,
}

/// What a progression step did to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Nothing moved.
    Unchanged,
    /// Only the countdown changed.
    TimerRefreshed,
    /// The next movie is up.
    RoundAdvanced,
    /// The last round expired.
    Finished,
}

impl Progress {
    /// Whether the room must be stored and published.
    pub fn changed(self) -> bool {
        !matches!(self, Progress::Unchanged)
    }
}

/// Bring a room up to date before it is handed to a reader.
pub fn catch_up(
    room: &mut Room,
    mode: ProgressionMode,
    now_ms: u64,
    rules: &RoundRules,
) -> Result<Progress, InvalidTransition> {
    match mode {
        ProgressionMode::Derived => derive(room, now_ms, rules),
        ProgressionMode::Ticking => Ok(Progress::Unchanged),
    }
}

/// One ticker step.
pub fn step(
    room: &mut Room,
    mode: ProgressionMode,
    now_ms: u64,
    rules: &RoundRules,
) -> Result<Progress, InvalidTransition> {
    match mode {
        ProgressionMode::Derived => derive(room, now_ms, rules),
        ProgressionMode::Ticking => tick(room, now_ms, rules),
    }
}

/// Recompute the countdown from the wall clock.
///
/// A round advances only when the stored timer was still running, so re-deriving an already
/// advanced snapshot never skips a second round.
pub fn derive(
    room: &mut Room,
    now_ms: u64,
    rules: &RoundRules,
) -> Result<Progress, InvalidTransition> {
    if room.status != RoomStatus::Playing {
        return Ok(Progress::Unchanged);
    }
    let Some(started) = room.round_start_time else {
        return Ok(Progress::Unchanged);
    };

    let elapsed_secs = now_ms.saturating_sub(started) / 1000;
    let remaining = u64::from(rules.round_seconds).saturating_sub(elapsed_secs) as u32;

    if remaining == 0 {
        if room.timer > 0 {
            return advance_round(room, now_ms, rules);
        }
        return Ok(Progress::Unchanged);
    }

    if remaining != room.timer {
        room.timer = remaining;
        return Ok(Progress::TimerRefreshed);
    }

    Ok(Progress::Unchanged)
}

/// Decrement the countdown by one second, advancing when it runs out.
pub fn tick(room: &mut Room, now_ms: u64, rules: &RoundRules) -> Result<Progress, InvalidTransition> {
    if room.status != RoomStatus::Playing {
        return Ok(Progress::Unchanged);
    }

    room.timer = room.timer.saturating_sub(1);
    if room.timer == 0 {
        return advance_round(room, now_ms, rules);
    }
    Ok(Progress::TimerRefreshed)
}

/// Move to the next movie, or finish the room after the last one.
pub fn advance_round(
    room: &mut Room,
    now_ms: u64,
    rules: &RoundRules,
) -> Result<Progress, InvalidTransition> {
    let next_index = room.current_round_index + 1;

    if next_index < room.movies.len() {
        room.status = next_status(room.status, RoomEvent::NextRound)?;
        room.current_round_index = next_index;
        room.timer = rules.round_seconds;
        room.round_start_time = Some(now_ms);
        room.clear_round_answers();
        Ok(Progress::RoundAdvanced)
    } else {
        room.status = next_status(room.status, RoomEvent::LastRoundExpired)?;
        room.timer = 0;
        Ok(Progress::Finished)
    }
}
