use crate::error::CoreError;

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Longest owner identifier accepted at the boundary.
pub const MAX_OWNER_ID_LEN: usize = 255;

/// Check that a caller-supplied owner identifier is usable as a lookup key.
///
/// Owner ids are opaque, so only presence and length are enforced.
pub fn validate_owner_id(owner_id: &str) -> Result<(), CoreError> {
    if owner_id.trim().is_empty() {
        return Err(CoreError::Validation("guid is not provided".into()));
    }
    if owner_id.len() > MAX_OWNER_ID_LEN {
        return Err(CoreError::Validation(format!(
            "guid must be at most {MAX_OWNER_ID_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn accepts_opaque_ids() {
        assert!(validate_owner_id("u1").is_ok());
        assert!(validate_owner_id("6f1c2d1e-8a4b-4c55-9f0e-2b7d8c1a9e33").is_ok());
    }

    #[test]
    fn rejects_blank_id() {
        assert_matches!(validate_owner_id(""), Err(CoreError::Validation(_)));
        assert_matches!(validate_owner_id("   "), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_overlong_id() {
        let long = "x".repeat(MAX_OWNER_ID_LEN + 1);
        assert_matches!(validate_owner_id(&long), Err(CoreError::Validation(msg)) if msg.contains("255"));
        assert!(validate_owner_id(&"x".repeat(MAX_OWNER_ID_LEN)).is_ok());
    }
}
