//! # CLI UI Module
//!
//! Styling and formatting layer for `lumion` output. Every command prints
//! either human output through this module or pretty JSON with `--json`.
//!
//! ## Module Structure
//!
//! - `color`: color mode detection and terminal width
//! - `style`: message prefixes and value styling
//! - `format`: small text formatters (truncation, scores, timestamps)
//! - `table`: comfy-table renderers for citations, communities, timelines and tables
//! - `progress`: progress bars for enrichment jobs

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use progress::{Progress, ProgressMode};
pub use style::{MessageType, Style};
