//! Masking engine.
//!
//! # Data Flow
//! ```text
//! headers ──→ headers.rs (predicate per header name) ──→ masked HeaderList
//!
//! JSON body ──→ document.rs (parse)
//!           ──→ fields.rs  (top-level keys, shallow)
//!           ──→ path.rs    (path expressions, deep, in order)
//!           ──→ masked JSON text
//! ```
//!
//! # Design Decisions
//! - Masking only ever touches the copy that is logged
//! - Every masked value becomes the same sentinel string
//! - Shallow masking runs before path masking

pub mod config;
pub mod document;
pub mod fields;
pub mod headers;
pub mod path;
pub mod predicate;

pub use config::{Direction, DirectionRules, MaskConfig};
pub use document::{mask_json, MaskedDocument};
pub use headers::{mask_headers, HeaderEntry, HeaderList};
pub use path::{JsonPath, PathRule};
pub use predicate::{MaskPredicate, NameMatcher};

/// Placeholder substituted for every masked value.
pub const SENTINEL: &str = "***masked***";
