#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Decode failed for {field}: {message}")]
    Decode { field: &'static str, message: String },
}
