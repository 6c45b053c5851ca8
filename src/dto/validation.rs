//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted room code.
pub const MAX_ROOM_CODE_LEN: usize = 32;

/// Validates that a room code is 1 to 32 ASCII letters or digits.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("ABC123") // Ok
/// validate_room_code("")       // Err - empty
/// validate_room_code("ab-12")  // Err - dash
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() || code.len() > MAX_ROOM_CODE_LEN {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!(
                "Room code must be between 1 and {MAX_ROOM_CODE_LEN} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only ASCII letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Rejects strings that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Longest accepted username, in characters.
pub const MAX_USERNAME_CHARS: usize = 64;

/// Rejects usernames longer than [`MAX_USERNAME_CHARS`].
pub fn validate_username_len(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > MAX_USERNAME_CHARS {
        let mut err = ValidationError::new("length");
        err.message =
            Some(format!("username must be at most {MAX_USERNAME_CHARS} characters").into());
        return Err(err);
    }
    Ok(())
}
