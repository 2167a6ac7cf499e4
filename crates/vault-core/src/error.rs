use thiserror::Error;

/// Top-level error type for the vault.
///
/// Every record operation returns this type. Front ends decide how each
/// variant is presented: a console line in the menu, a JSON error envelope
/// over HTTP.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VaultError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for VaultError {
    fn from(err: toml::de::Error) -> Self {
        VaultError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VaultError::Validation("name must not be empty".to_string());
        assert_eq!(err.to_string(), "Validation error: name must not be empty");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(VaultError, &str)> = vec![
            (
                VaultError::Connection("refused".to_string()),
                "Connection error: refused",
            ),
            (
                VaultError::Storage("disk full".to_string()),
                "Storage error: disk full",
            ),
            (
                VaultError::NotFound("42".to_string()),
                "Record not found: 42",
            ),
            (
                VaultError::Conflict("id 7 already exists".to_string()),
                "Conflict: id 7 already exists",
            ),
            (
                VaultError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                VaultError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let vault_err: VaultError = io_err.into();
        assert!(matches!(vault_err, VaultError::Io(_)));
        assert!(vault_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let vault_err: VaultError = err.unwrap_err().into();
        assert!(matches!(vault_err, VaultError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let vault_err: VaultError = err.unwrap_err().into();
        assert!(matches!(vault_err, VaultError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
