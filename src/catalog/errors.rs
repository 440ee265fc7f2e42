//! Catalog error types

use thiserror::Error;

use super::field::FieldId;

/// Result type for catalog lookups
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Unknown field id: {0}")]
    UnknownField(FieldId),

    #[error("Unknown field name: {0}")]
    UnknownFieldName(String),

    #[error("Invalid value for field {field} ({codec}): '{value}'")]
    InvalidValue {
        field: FieldId,
        codec: &'static str,
        value: String,
    },
}

impl CatalogError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::UnknownField(_) | CatalogError::UnknownFieldName(_) => {
                "CONTACT_UNKNOWN_FIELD"
            }
            CatalogError::InvalidValue { .. } => "CONTACT_INVALID_VALUE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            CatalogError::UnknownField(FieldId(9999)).code(),
            "CONTACT_UNKNOWN_FIELD"
        );
        let err = CatalogError::InvalidValue {
            field: FieldId::OBJECT_ID,
            codec: "integer",
            value: "abc".into(),
        };
        assert_eq!(err.code(), "CONTACT_INVALID_VALUE");
        assert!(err.to_string().contains("abc"));
    }
}
