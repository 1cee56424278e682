//! # Validation Utilities
//!
//! Input validation helpers.

/// Validate that a string is not empty.
pub fn validate_not_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate maximum length in characters.
pub fn validate_max_length(value: &str, max: usize, field_name: &str) -> Result<(), String> {
    if value.chars().count() > max {
        Err(format!("{} must be at most {} characters", field_name, max))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("hello", "content").is_ok());
        assert_eq!(
            validate_not_empty("   ", "content").unwrap_err(),
            "content cannot be empty"
        );
    }

    #[test]
    fn test_validate_max_length() {
        assert!(validate_max_length("abc", 3, "title").is_ok());
        assert!(validate_max_length("abcd", 3, "title").is_err());
        assert!(validate_max_length("ééé", 3, "title").is_ok());
    }
}
