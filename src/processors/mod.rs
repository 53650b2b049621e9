//! # Content Processors Module
//!
//! Transformations applied to page sources before templating.
//!
//! - [`markdown`]: frontmatter splitting and markdown to HTML conversion
//!
//! ## Usage
//!
//! ```rust
//! use chainpress::processors::MarkdownProcessor;
//!
//! let processor = MarkdownProcessor::default();
//! let html = processor.render("## Fees\n\nCheap.");
//! assert!(html.starts_with("<h2>Fees</h2>"));
//! ```

/// Markdown processing functionality.
pub mod markdown;

// Re-export commonly used types
pub use markdown::{MarkdownProcessor, ParsedDocument};
