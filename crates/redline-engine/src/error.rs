//! Error types for the engine - thin wrappers over the annotation and
//! checker errors plus the engine's own failure modes.

use miette::Diagnostic;

/// Main error type for engine operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum EngineError {
    /// Markdown annotation error
    #[error(transparent)]
    #[diagnostic(code(redline::annotate))]
    Annotate(#[from] redline_annotate::AnnotateError),

    /// Checker request error
    #[error(transparent)]
    #[diagnostic(code(redline::check))]
    Check(#[from] redline_check::CheckError),

    /// A check region no longer fits the document
    #[error("check region {start}..{end} is out of bounds for a document of {len} bytes")]
    #[diagnostic(code(redline::region))]
    RegionOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },

    /// Dictionary synchronization aborted mid-run
    #[error("dictionary sync failed on {word:?}: {reason}")]
    #[diagnostic(
        code(redline::dictionary),
        help("re-run the sync; completed changes are kept and retried work converges")
    )]
    DictionarySync { word: String, reason: String },

    /// IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("configuration parse error: {0}")]
    #[diagnostic(code(redline::config))]
    Config(#[from] serde_json::Error),
}
