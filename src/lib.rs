#![deny(missing_docs)]
//! A text differencing, fuzzy-matching and patching library.
//!
//! The crate is organized around three small, independently usable
//! engines, each a `Copy`/`Default`-able configuration struct with its
//! entry points as methods:
//!
//! * [`diff`] computes the edit script between two strings using a
//!   bidirectional Myers `O(ND)` bisection, with line-mode preprocessing
//!   for large inputs and a family of cleanup passes that reshape a raw
//!   script for human readability or machine efficiency.
//! * [`matching`] locates a pattern in a text near an expected location,
//!   tolerating a bounded number of errors, using the bit-parallel
//!   Bitap algorithm.
//! * [`patch`] turns a diff into a sequence of context-bearing hunks
//!   that can be serialized to text and later re-applied even against
//!   text that has since drifted, relocating each hunk with the
//!   matching engine.
//!
//! [`Dmp`] bundles one of each, wired together the way [`patch::Patch`]
//! expects, as a convenience for callers who want all three with one
//! shared configuration.
//!
//! ```
//! use diffmatchpatch::Dmp;
//!
//! let dmp = Dmp::default();
//! let script = dmp.diff.main("jump", "jumped over", false);
//! assert_eq!(diffmatchpatch::diff::Diff::text2(&script), "jumped over");
//! ```

pub mod diff;
pub mod error;
pub mod matching;
pub mod patch;

#[cfg(test)]
mod tests;

pub use diff::Diff;
pub use matching::Match;
pub use patch::{Hunk, Patch};

/// Bundles a [`Diff`], [`Match`] and [`Patch`] engine under one shared
/// configuration, matching the grouping used by the reference
/// implementation this crate's semantics trace back to.
///
/// Using the three engines independently (`Diff::default()`,
/// `Match::default()`, `Patch::default()`) works just as well; `Dmp` is
/// purely a convenience for the common case of wanting all three.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dmp {
    /// The diff engine.
    pub diff: Diff,
    /// The fuzzy-matching engine.
    pub matching: Match,
    /// The patch engine. Its own `diff`/`matching` fields default
    /// separately from this struct's; construct a [`patch::Patch`]
    /// directly and assign it here to share configuration across all
    /// three engines.
    pub patch: Patch,
}
