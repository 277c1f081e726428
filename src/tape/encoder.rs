//! Streaming tape writer.
//!
//! Single-writer, append-only. Rows accumulate in per-column staging
//! buffers; once a full chunk is staged it is flushed as one contiguous
//! run of column blocks. `close()` flushes the trailing partial chunk,
//! writes the footer index, then rewrites the header with the final row
//! count and footer offset.
//!
//! # Example
//!
//! ```ignore
//! use quantdev::tape::{TapeEncoder, TapeRow};
//!
//! let mut enc = TapeEncoder::create("MES-20240105.quantdev")?;
//! for row in rows {
//!     enc.add_row(&row)?;
//! }
//! enc.close()?;
//! ```

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use super::error::Result;
use super::{CHUNK_SIZE, HEADER_LEN, MAGIC};

/// One logical TBBO event, already converted out of wire fixed-point.
///
/// Prices and sizes are plain `f64` here and on disk; the only fixed-point
/// conversion in the system happens at ingest.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TapeRow {
    pub ts_event: u64,
    pub ts_recv: u64,
    pub ts_in_delta: i32,
    pub price: f64,
    pub size: f64,
    pub side: i8,
    pub action: i8,
    pub flags: u8,
    pub depth: u8,
    pub sequence: u32,
    pub bid_px: f64,
    pub ask_px: f64,
    pub bid_sz: f64,
    pub ask_sz: f64,
    pub bid_ct: u32,
    pub ask_ct: u32,
    pub publisher_id: u16,
    pub instrument_id: u32,
}

/// Streaming columnar tape writer.
pub struct TapeEncoder {
    out: File,
    chunk_capacity: usize,

    // Per-column staging, flushed together as one chunk.
    ts_event: Vec<u64>,
    ts_recv: Vec<u64>,
    ts_in_delta: Vec<i32>,
    prices: Vec<f64>,
    sizes: Vec<f64>,
    sides: Vec<i8>,
    actions: Vec<i8>,
    flags: Vec<u8>,
    depth: Vec<u8>,
    sequences: Vec<u32>,
    bid_px: Vec<f64>,
    ask_px: Vec<f64>,
    bid_sz: Vec<f64>,
    ask_sz: Vec<f64>,
    bid_ct: Vec<u32>,
    ask_ct: Vec<u32>,
    publisher_id: Vec<u16>,
    instrument_id: Vec<u32>,

    total_rows: u64,
    chunk_offsets: Vec<u64>,
}

impl TapeEncoder {
    /// Create a tape at `path` with the default chunk capacity.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_chunk_capacity(path, CHUNK_SIZE)
    }

    /// Create a tape with an explicit chunk capacity.
    ///
    /// Decoded output is identical for any capacity in `[1, N]`; smaller
    /// chunks only change the file's internal framing. Tests use this to
    /// exercise chunk boundaries.
    pub fn with_chunk_capacity<P: AsRef<Path>>(path: P, chunk_capacity: usize) -> Result<Self> {
        let chunk_capacity = chunk_capacity.max(1);
        let mut out = File::create(path)?;

        // Reserve header space; the real header is written on close.
        out.seek(SeekFrom::Start(HEADER_LEN as u64))?;

        Ok(Self {
            out,
            chunk_capacity,
            ts_event: Vec::with_capacity(chunk_capacity),
            ts_recv: Vec::with_capacity(chunk_capacity),
            ts_in_delta: Vec::with_capacity(chunk_capacity),
            prices: Vec::with_capacity(chunk_capacity),
            sizes: Vec::with_capacity(chunk_capacity),
            sides: Vec::with_capacity(chunk_capacity),
            actions: Vec::with_capacity(chunk_capacity),
            flags: Vec::with_capacity(chunk_capacity),
            depth: Vec::with_capacity(chunk_capacity),
            sequences: Vec::with_capacity(chunk_capacity),
            bid_px: Vec::with_capacity(chunk_capacity),
            ask_px: Vec::with_capacity(chunk_capacity),
            bid_sz: Vec::with_capacity(chunk_capacity),
            ask_sz: Vec::with_capacity(chunk_capacity),
            bid_ct: Vec::with_capacity(chunk_capacity),
            ask_ct: Vec::with_capacity(chunk_capacity),
            publisher_id: Vec::with_capacity(chunk_capacity),
            instrument_id: Vec::with_capacity(chunk_capacity),
            total_rows: 0,
            chunk_offsets: Vec::new(),
        })
    }

    /// Append one row; flushes a chunk when the staging buffers fill.
    pub fn add_row(&mut self, row: &TapeRow) -> Result<()> {
        self.ts_event.push(row.ts_event);
        self.ts_recv.push(row.ts_recv);
        self.ts_in_delta.push(row.ts_in_delta);
        self.prices.push(row.price);
        self.sizes.push(row.size);
        self.sides.push(row.side);
        self.actions.push(row.action);
        self.flags.push(row.flags);
        self.depth.push(row.depth);
        self.sequences.push(row.sequence);
        self.bid_px.push(row.bid_px);
        self.ask_px.push(row.ask_px);
        self.bid_sz.push(row.bid_sz);
        self.ask_sz.push(row.ask_sz);
        self.bid_ct.push(row.bid_ct);
        self.ask_ct.push(row.ask_ct);
        self.publisher_id.push(row.publisher_id);
        self.instrument_id.push(row.instrument_id);

        self.total_rows += 1;

        if self.ts_event.len() >= self.chunk_capacity {
            self.flush_chunk()?;
        }
        Ok(())
    }

    /// Total rows staged or written so far.
    pub fn rows(&self) -> u64 {
        self.total_rows
    }

    /// Flush any trailing partial chunk, write the footer, rewrite the header.
    pub fn close(mut self) -> Result<()> {
        if !self.ts_event.is_empty() {
            self.flush_chunk()?;
        }

        let footer_offset = self.out.stream_position()?;
        self.out
            .write_all(&(self.chunk_offsets.len() as u32).to_le_bytes())?;
        self.out.write_all(bytemuck::cast_slice(&self.chunk_offsets))?;

        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&MAGIC);
        header[8..16].copy_from_slice(&self.total_rows.to_le_bytes());
        header[24..32].copy_from_slice(&footer_offset.to_le_bytes());

        self.out.seek(SeekFrom::Start(0))?;
        self.out.write_all(&header)?;
        self.out.flush()?;
        Ok(())
    }

    fn flush_chunk(&mut self) -> Result<()> {
        let offset = self.out.stream_position()?;
        self.chunk_offsets.push(offset);

        let n = self.ts_event.len() as u32;
        self.out.write_all(&n.to_le_bytes())?;

        // Column blocks in the fixed on-disk order. The staging vectors are
        // packed little-endian scalars, written as raw byte spans.
        self.out.write_all(bytemuck::cast_slice(&self.ts_event))?;
        self.out.write_all(bytemuck::cast_slice(&self.ts_recv))?;
        self.out.write_all(bytemuck::cast_slice(&self.ts_in_delta))?;
        self.out.write_all(bytemuck::cast_slice(&self.prices))?;
        self.out.write_all(bytemuck::cast_slice(&self.sizes))?;
        self.out.write_all(bytemuck::cast_slice(&self.sides))?;
        self.out.write_all(bytemuck::cast_slice(&self.actions))?;
        self.out.write_all(bytemuck::cast_slice(&self.flags))?;
        self.out.write_all(bytemuck::cast_slice(&self.depth))?;
        self.out.write_all(bytemuck::cast_slice(&self.sequences))?;
        self.out.write_all(bytemuck::cast_slice(&self.bid_px))?;
        self.out.write_all(bytemuck::cast_slice(&self.ask_px))?;
        self.out.write_all(bytemuck::cast_slice(&self.bid_sz))?;
        self.out.write_all(bytemuck::cast_slice(&self.ask_sz))?;
        self.out.write_all(bytemuck::cast_slice(&self.bid_ct))?;
        self.out.write_all(bytemuck::cast_slice(&self.ask_ct))?;
        self.out.write_all(bytemuck::cast_slice(&self.publisher_id))?;
        self.out.write_all(bytemuck::cast_slice(&self.instrument_id))?;

        self.ts_event.clear();
        self.ts_recv.clear();
        self.ts_in_delta.clear();
        self.prices.clear();
        self.sizes.clear();
        self.sides.clear();
        self.actions.clear();
        self.flags.clear();
        self.depth.clear();
        self.sequences.clear();
        self.bid_px.clear();
        self.ask_px.clear();
        self.bid_sz.clear();
        self.ask_sz.clear();
        self.bid_ct.clear();
        self.ask_ct.clear();
        self.publisher_id.clear();
        self.instrument_id.clear();

        Ok(())
    }
}
