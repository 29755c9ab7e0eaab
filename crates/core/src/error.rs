//! Error types for outbrief deck generation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a template, rendering slides, or
/// writing the finished deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The template package could not be found or is not a presentation
    /// package at all. The user can fix this by uploading the template again.
    #[error("Template document file could not be found - try re-uploading it ({0})")]
    TemplateMissing(String),

    /// The template package was found but failed to load for another reason.
    #[error("Failed to load the template document: {0}")]
    TemplateLoad(String),

    /// The package structure is invalid while reading or writing parts.
    #[error("Package error: {0}")]
    PackageError(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or generation error.
    #[error("XML error: {0}")]
    XmlError(String),

    /// The rich text converter failed on a block of markup.
    #[error("Rich text conversion error: {0}")]
    RichTextError(String),

    /// An expression template could not be rendered.
    #[error("Template expression error: {0}")]
    ExpressionError(String),

    /// A configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether this error means the template itself is unusable and must be
    /// provided again.
    pub fn is_template_missing(&self) -> bool {
        matches!(self, Error::TemplateMissing(_))
    }
}

impl From<minijinja::Error> for Error {
    fn from(err: minijinja::Error) -> Self {
        Error::ExpressionError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
