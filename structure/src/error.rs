use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructureError {
    #[error("Malformed structure: {0}")]
    Malformed(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Parse failed: {0}")]
    ParseFailed(String),
}
