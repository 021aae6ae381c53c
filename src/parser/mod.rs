//! TimeMap parsing and response classification
//!
//! Pure functions only; nothing in this module performs I/O.
//!
//! - [`link_format`] - link-format text to memento records
//! - [`cdx`] - CDX tabular rows to memento records
//! - [`classify`] - one-step detection of a provider response's shape

pub mod cdx;
pub mod classify;
pub mod link_format;

pub use cdx::{cdx_rows_to_records, parse_cdx_body, replay_uri};
pub use classify::{classify_response, listed_to_records, ListedMemento, TimemapResponse};
pub use link_format::{is_memento_line, parse_link_format};
