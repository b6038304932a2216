use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Decode(e.to_string())
    }
}
