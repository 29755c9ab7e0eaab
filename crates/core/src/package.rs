//! Package I/O boundary: loading templates and serializing finished decks.

use std::path::Path;

use crate::error::Result;
use crate::types::Deck;

/// MIME type of generated presentations.
pub const MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// File extension of generated presentations.
pub const EXTENSION: &str = "pptx";

/// Loads a template package into a [`Deck`].
///
/// Implementations return [`crate::Error::TemplateMissing`] when the file is
/// absent or not a presentation package, and [`crate::Error::TemplateLoad`]
/// for any other failure.
pub trait TemplateLoader {
    fn load(&self, path: &Path) -> Result<Deck>;
}

/// Serializes a finished [`Deck`] into package bytes.
pub trait DeckSerializer {
    fn serialize(&self, deck: &Deck) -> Result<Vec<u8>>;
}
