use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Rejected structure for {path}: {reason}")]
    RejectedStructure { path: String, reason: String },

    #[error("Invalid graph configuration: {0}")]
    InvalidConfig(String),
}
