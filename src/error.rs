use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// How a failure is reported at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something unusable (missing or undecodable image).
    ClientInput,
    /// No model is loaded.
    Unavailable,
    /// Anything else that went wrong while serving a request.
    Internal,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No image provided in the request")]
    MissingImage,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error(
        "Model not loaded. Check if the model file exists at {model_path} and the model can be loaded correctly."
    )]
    ModelUnavailable { model_path: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("{0}")]
    Inference(String),

    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingImage | Self::InvalidImage(_) => ErrorKind::ClientInput,
            Self::ModelUnavailable { .. } => ErrorKind::Unavailable,
            _ => ErrorKind::Internal,
        }
    }
}
