// Error taxonomy for the serialization formats.

use wfst_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// AT&T text did not match the wire format.
    #[error("invalid AT&T format at line {line}: {message}")]
    NotValidAttFormat { line: usize, message: String },

    /// Prolog text did not match `network(...)`/`arc(...)`/`final(...)`/
    /// `symbol(...)` clause syntax.
    #[error("invalid Prolog format at line {line}: {message}")]
    NotValidPrologFormat { line: usize, message: String },

    /// A binary stream's header declared a magic/version this reader does
    /// not recognize.
    #[error("unsupported binary stream format: {0}")]
    UnsupportedFormat(String),

    /// Reached the end of a stream where another transducer was expected;
    /// not itself an error condition for callers that loop until this,
    /// but surfaced as a typed signal rather than an `Ok(None)` so the
    /// distinction from a genuinely malformed stream stays explicit.
    #[error("end of stream")]
    EndOfStream,
}
