//! PPTX (Office Open XML) template loading and deck writing.
//!
//! A .pptx file is a ZIP archive of XML parts tied together by relationship
//! parts. [`PptxReader`] turns a template into a [`outbrief_core::Deck`] and
//! [`PptxWriter`] writes the finished deck back into a copy of the template.

pub mod drawing;
pub mod package;
pub mod reader;
pub mod writer;
pub mod xml;

#[cfg(test)]
mod fixture;

pub use reader::{list_layouts, PptxReader};
pub use writer::PptxWriter;
