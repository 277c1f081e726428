//! Error type for the tape codec.
//!
//! Decode failures are surfaced to the study driver, which logs and skips
//! the offending tape; they are never fatal to an overall run.

use std::fmt;
use std::io;

/// Result alias used throughout the tape module.
pub type Result<T> = std::result::Result<T, TapeError>;

/// Error kinds produced by the tape encoder and decoder.
#[derive(Debug)]
pub enum TapeError {
    /// The file does not start with the expected magic bytes.
    ///
    /// Foreign magics are refused outright; the fix is to re-ingest the
    /// source data, not to guess at the layout.
    BadMagic {
        /// Magic bytes actually found in the header
        found: [u8; 4],
    },

    /// The file ended before a complete header, chunk, or column block.
    ShortRead {
        /// What was being read when the file ran out
        context: &'static str,
    },

    /// A chunk's row count would overshoot the total declared in the header.
    CorruptChunk {
        /// Rows decoded before this chunk
        pos: u64,
        /// Row count declared by the chunk
        chunk_rows: u32,
        /// Total rows declared by the header
        total_rows: u64,
    },

    /// The sum of chunk lengths does not equal the header's total.
    CountMismatch {
        /// Rows actually decoded
        loaded: u64,
        /// Total rows declared by the header
        expected: u64,
    },

    /// The declared row count exceeds what this platform can index.
    TooLarge {
        /// Total rows declared by the header
        total_rows: u64,
    },

    /// Underlying I/O failure.
    Io(io::Error),
}

impl fmt::Display for TapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic { found } => write!(
                f,
                "unsupported tape magic {:?} (expected {:?}); re-run ingest",
                String::from_utf8_lossy(found),
                String::from_utf8_lossy(&crate::tape::MAGIC),
            ),
            Self::ShortRead { context } => {
                write!(f, "file truncated while reading {context}")
            }
            Self::CorruptChunk {
                pos,
                chunk_rows,
                total_rows,
            } => write!(
                f,
                "corrupt chunk length: pos={pos}, n={chunk_rows}, total={total_rows}"
            ),
            Self::CountMismatch { loaded, expected } => {
                write!(f, "row count mismatch: loaded={loaded}, expected={expected}")
            }
            Self::TooLarge { total_rows } => {
                write!(f, "tape too large for this platform: {total_rows} rows")
            }
            Self::Io(e) => write!(f, "tape i/o error: {e}"),
        }
    }
}

impl std::error::Error for TapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TapeError {
    fn from(e: io::Error) -> Self {
        // An unexpected EOF mid-column is a truncation, not a generic I/O fault.
        if e.kind() == io::ErrorKind::UnexpectedEof {
            TapeError::ShortRead {
                context: "column data",
            }
        } else {
            TapeError::Io(e)
        }
    }
}
