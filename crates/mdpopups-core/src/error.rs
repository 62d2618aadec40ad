use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource not found: {path}")]
    NotFound { path: String },

    #[error("failed to read resource {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("resource {path} is not valid UTF-8")]
    Encoding { path: String },
}

#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("color scheme {scheme} could not be found")]
    NotFound { scheme: String },

    #[error("failed to parse color scheme {scheme}: {message}")]
    Parse { scheme: String, message: String },

    #[error("failed to generate CSS for color scheme {scheme}: {message}")]
    Css { scheme: String, message: String },

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("{0}")]
    UnknownVariable(String),

    #[error("template syntax error on line {line}: {detail}")]
    Syntax { line: usize, detail: String },

    #[error("template failed to render: {0}")]
    Render(String),
}

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("unknown markdown extension `{0}`")]
    Unknown(String),

    #[error("invalid configuration for markdown extension `{extension}`")]
    InvalidConfig {
        extension: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("highlighting backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("rendering panicked: {0}")]
    Panicked(String),
}
