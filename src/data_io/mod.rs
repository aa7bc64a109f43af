//! Field output: textual summaries and ASCII value dumps.

pub mod ascii_writer;
pub mod output_trait;
mod summary;

pub use ascii_writer::AsciiFieldWriter;
pub use output_trait::{FieldWriter, OutputMetadata};
pub use summary::{what, WhatOptions};
