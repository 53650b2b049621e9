//! # Template Filters
//!
//! Lookups and formatters exposed to templates. None of them fail at render
//! time: unknown authors are dropped, unparseable dates are echoed back and
//! unreadable files yield an empty string.

/// Author records and the id lookup built once per process.
pub mod authors;

/// Date formatting and file modification times.
pub mod dates;

pub use authors::{Author, AuthorRegistry};
pub use dates::{file_last_modified, format_date_only};
