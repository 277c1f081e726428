//! Columnar on-disk tape for TBBO event streams.
//!
//! The tape stores N events as parallel blocks of fixed-width fields so
//! that every analytical pass is a sequential scan with predictable cache
//! behavior. Layout (all little-endian):
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (64 B): magic "QDV1" | total_rows u64 @8 | footer @24 │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Chunk: n u32, then 18 column blocks of n packed values each  │
//! │   ts_event ts_recv ts_in_delta price size side action flags  │
//! │   depth sequence bid_px ask_px bid_sz ask_sz bid_ct ask_ct   │
//! │   publisher_id instrument_id                                 │
//! ├──────────────────────────────────────────────────────────────┤
//! │ ... more chunks ...                                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Footer: chunk_count u32, then chunk_count u64 chunk offsets  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The 4-byte magic is the single format-version marker; anything else is
//! refused with [`TapeError::BadMagic`]. Prices and sizes are stored as
//! `f64`; fixed-point conversion happens once, at ingest.
//!
//! Column blocks are read and written as raw byte spans over the backing
//! arrays (via `bytemuck`), which is only correct on little-endian hosts.

#[cfg(target_endian = "big")]
compile_error!("the tape format is little-endian on disk and in memory; big-endian hosts are not supported");

mod columns;
mod decoder;
mod encoder;
mod error;

pub use columns::{ColumnPool, TbboColumns};
pub use decoder::{decode_into, load_tape, load_tape_shared};
pub use encoder::{TapeEncoder, TapeRow};
pub use error::{Result, TapeError};

/// Format magic; bumped wholesale on any layout change.
pub const MAGIC: [u8; 4] = *b"QDV1";

/// Fixed header size in bytes. Fields beyond the three in use are
/// reserved zero.
pub const HEADER_LEN: usize = 64;

/// Nominal rows per chunk (64 Ki). Chunks never exceed this; the trailing
/// chunk of a file is usually shorter.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// File extension produced by ingest and consumed by the study driver.
pub const TAPE_EXT: &str = "quantdev";
