use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("File read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {path}\nReason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Template error: {file}\nReason: {message}")]
    TemplateError { file: PathBuf, message: String },

    #[error("Template render error: {0}")]
    TemplateRenderError(String),

    #[error("{kind} {address} is declared more than once")]
    DuplicateBlock { kind: &'static str, address: String },

    #[error("Cannot resolve {reference}: {message}")]
    UnresolvedReference { reference: String, message: String },
}

pub type Result<T> = std::result::Result<T, FlowError>;
