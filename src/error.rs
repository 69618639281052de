//! Top-level error type, composing each module's failure modes the way
//! `havocompare`'s `csv`/`html`/`report` errors compose into their own
//! enums via `#[from]`.

use thiserror::Error;
use vg_errortools::FatIOError;

/// Composes the failure modes of the lower modules. Only [`Error::FileAccess`]
/// is fatal to an entire comparison run — the driver catches [`Error::Line`]
/// and [`Error::Format`] itself, latches the corresponding flag, and keeps
/// sweeping; those variants exist so callers that invoke `line`/`format`
/// directly still get a typed error to propagate with `?`.
#[derive(Error, Debug)]
pub enum Error {
    /// Either input file could not be opened or read.
    #[error("file access failed: {0}")]
    FileAccess(#[from] FatIOError),

    /// A line failed to parse (malformed token or complex number).
    #[error(transparent)]
    Line(#[from] crate::line::Error),

    /// The two files disagree in column count on the same line.
    #[error(transparent)]
    Format(#[from] crate::format::Error),
}
