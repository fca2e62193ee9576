//! redline-annotate: the annotated-text protocol and the markdown flattener.
//!
//! This crate provides:
//! - `Segment` / `AnnotatedText` - the text-plus-markup representation sent
//!   to an external natural-language checker, with an invertible mapping
//!   from checker-stream offsets back to source offsets
//! - `annotate()` - flattens markdown source into an `AnnotatedText`
//!   without ever losing a source byte

pub mod annotated;
pub mod markdown;
pub mod segment;

pub use annotated::{AnnotatedText, Bias};
pub use markdown::annotate;
pub use segment::Segment;

/// Errors raised while building or validating annotated text.
///
/// Every variant is fatal for the check request it occurs in: a single
/// offset error invalidates every subsequent match position, so there is
/// no partial recovery.
#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    /// The flattened segments do not add up to the source region length.
    #[error("annotated source length {actual} does not match region length {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A parsed node rendered more text than its source span contains.
    #[error("node at {start}..{end} rendered {rendered} bytes from a {span}-byte span: {raw:?}")]
    NodeOverrun {
        start: usize,
        end: usize,
        rendered: usize,
        span: usize,
        raw: String,
    },

    /// A rendered-shorter text node could not be reconciled with its span.
    #[error("cannot align rendered text {rendered:?} with source span {raw:?} at {start}..{end}")]
    EscapeMismatch {
        start: usize,
        end: usize,
        rendered: String,
        raw: String,
    },

    /// A segment that occupies no source bytes and produces no stream bytes.
    #[error("refusing zero-length segment at index {index}")]
    EmptySegment { index: usize },
}
