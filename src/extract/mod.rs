//! Selector-driven extraction from HTML.
//!
//! A [`Document`] is parsed leniently and pruned of excluded elements once.
//! Field rules in [`fields`] then read from it without ever failing: a
//! selector that is missing, invalid or unmatched yields an empty field.

pub mod dates;
pub mod document;
pub mod fields;
pub mod infer;
pub mod rewrite;

pub use dates::{parse_date, published_or_now};
pub use document::Document;
pub use fields::{extract_fields, ExtractedFields};
pub use infer::infer_selector;
pub use rewrite::{absolutize_fragment, extract_first_image, resolve_url};
