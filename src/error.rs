//! Error types shared by the [`Diff`](crate::Diff), [`Match`](crate::Match)
//! and [`Patch`](crate::Patch) engines.

/// Errors raised synchronously by the engines in this crate.
///
/// None of these are raised for expected run-time conditions: "no fuzzy
/// match found" and "hunk could not be anchored" are soft failures
/// represented as ordinary return values (`-1` and `false` respectively),
/// not as `Error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A required argument was null/absent where one was expected.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// [`Match::bitap`](crate::matching::Match::bitap) was called with a
    /// pattern longer than the engine's configured `max_bits`.
    #[error("pattern of {pattern_len} chars exceeds max_bits ({max_bits})")]
    PatternTooLong {
        /// Length of the offending pattern, in chars.
        pattern_len: usize,
        /// The engine's configured bound.
        max_bits: u32,
    },

    /// A delta string failed to decode.
    #[error("invalid delta: {0}")]
    InvalidDelta(String),

    /// A `+TEXT` delta or patch token contained a malformed percent-escape.
    #[error("invalid percent-escape in: {0}")]
    InvalidEscape(String),

    /// A patch-text document failed to parse.
    #[error("invalid patch text: {0}")]
    InvalidPatchText(String),

    /// [`Patch::add_context`](crate::patch::Patch::add_context) was called
    /// on a hunk whose `start1`/`start2` are not yet anchored.
    #[error("patch hunk is not initialized (start1/start2 unset)")]
    PatchNotInitialized,
}

/// A `Result` type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
