//! # Output Generators
//!
//! - [`html`]: writes rendered pages, minified in production
//! - [`passthrough`]: copies static files untouched

/// HTML page output.
pub mod html;

/// Static file copies.
pub mod passthrough;

pub use html::HtmlGenerator;
pub use passthrough::copy_passthrough;
