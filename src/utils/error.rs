use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("control plane unavailable: {0}")]
    ControlPlane(String),

    #[error("JSON serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
