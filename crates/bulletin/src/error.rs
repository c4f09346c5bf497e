//! Error types for bulletin rendering and delivery.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = BulletinError> = std::result::Result<T, E>;

/// Errors raised while processing sections, rendering templates or sending mail.
///
/// Nothing in the crate recovers from these locally: a failing section fails
/// the whole bulletin render.
#[derive(Debug, Error)]
pub enum BulletinError {
    /// The resolved template file does not exist in its folder
    #[error("Template '{name}' not found in '{}'", folder.display())]
    TemplateNotFound { name: String, folder: PathBuf },

    /// A template or partial failed to compile
    #[error("Template syntax error: {0}")]
    TemplateSyntax(#[from] handlebars::TemplateError),

    /// A compiled template failed to render
    #[error("Template render failed: {0}")]
    Render(#[from] handlebars::RenderError),

    /// HTTP GET section received something other than 200 OK
    #[error("Request to '{url}' failed with status {status}")]
    RequestFailed { url: String, status: u16 },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed document could not be parsed
    #[error("Feed parse error: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    /// Plain-text section was configured with an unknown encoding
    #[error("Unsupported text encoding: '{0}'")]
    UnsupportedEncoding(String),

    /// Section or bulletin configuration is missing a key or has the wrong shape
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Required environment variable is not set
    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),

    /// Bulletin description file is not valid TOML
    #[error("Invalid bulletin file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Email address could not be parsed
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Email message could not be assembled
    #[error("Failed to build email message: {0}")]
    Message(#[from] lettre::error::Error),

    /// Mail transport rejected or failed to deliver the message
    #[error("Mail transport failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The email server was created without a transport
    #[error("Email server is disabled")]
    TransportDisabled,

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by a caller-supplied process function
    #[error("{0}")]
    Process(String),
}

impl BulletinError {
    /// Wrap any transport error.
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport(err.into())
    }
}
