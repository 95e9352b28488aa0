use thiserror::Error;

mod domain_types;
mod ids;

pub use domain_types::*;
pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Value out of bounds: {value}, expected {min}..={max}")]
    OutOfBounds { value: u64, min: u64, max: u64 },

    #[error("Invalid access token: {reason}")]
    InvalidAccessToken { reason: String },

    #[error("Invalid API version '{0}': expected YYYY-MM or 'unstable'")]
    InvalidApiVersion(String),

    #[error("Unknown auth scheme '{0}': expected 'header' or 'bearer'")]
    InvalidAuthScheme(String),

    #[error("Invalid field path '{path}': {reason}")]
    InvalidFieldPath { path: String, reason: String },

    #[error("Query template is missing the {placeholder} placeholder")]
    MissingPlaceholder { placeholder: &'static str },

    #[error("Invalid dataset definition {path}: {reason}")]
    InvalidDefinition { path: String, reason: String },
}
