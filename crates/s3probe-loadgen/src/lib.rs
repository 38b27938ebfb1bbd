//! Concurrent load generator for S3-compatible storage.
//!
//! A run creates `containers` folder objects under a root folder and then
//! fills each with `documents_per_container` generated PDF documents, running
//! at most `threads` upload loops at a time. Per-run counters and timers live
//! in [`RunStats`]; the outcome is a [`LoadReport`].
//!
//! Document names and content come from a [`DocumentGenerator`] selected by
//! [`GeneratorKind`].

mod document;
mod generator;
mod loader;
mod pdf;
mod stats;
mod target;

pub use document::{BODY_TEXT, DocumentContent};
pub use generator::{DocumentGenerator, GeneratorKind, Sequential, TaxReceipts};
pub use loader::{LoadConfig, LoadReport, LoadTest};
pub use pdf::render_pdf;
pub use stats::RunStats;
pub use target::LoadTarget;
