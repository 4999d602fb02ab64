//! Greeting usecase.

use crate::error::AppError;

/// Longest name accepted by the greeting.
pub const MAX_NAME_LEN: usize = 100;

/// Greeting service.
#[derive(Debug, Default, Clone, Copy)]
pub struct HelloUsecase;

impl HelloUsecase {
    pub fn new() -> Self {
        Self
    }

    pub fn greet(&self, name: &str) -> Result<String, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::validation(format!(
                "name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }

        Ok(format!("Hello, {}!", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_greet() {
        assert_eq!(HelloUsecase::new().greet("World").unwrap(), "Hello, World!");
    }

    #[test]
    fn test_greet_rejects_blank_and_long_names() {
        let usecase = HelloUsecase::new();

        let err = usecase.greet("   ").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(
            err.message(),
            "invalid argument: validation failed: name is required"
        );

        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(usecase.greet(&long).is_err());
        assert!(usecase.greet(&"x".repeat(MAX_NAME_LEN)).is_ok());
    }
}
