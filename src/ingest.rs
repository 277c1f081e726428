//! Vendor wire ingest: streaming DBN-style records → columnar tape.
//!
//! The wire format is length-prefixed: byte 0 is the record length in
//! 4-byte words, byte 1 the record type. Only trade-on-book records
//! (type 1, 80 bytes) are kept. A file header of `DBN` plus a u32
//! metadata length at bytes 4..8 is skipped when present; files without
//! it are treated as raw record streams.
//!
//! Prices arrive as 1e-9 fixed-point integers and are converted to `f64`
//! here; nothing downstream touches wire fixed-point.
//! Records carrying the `i64::MAX` null sentinel in any price field are
//! discarded.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::{StudyConfig, PX_SCALE};
use crate::study::tape_files;
use crate::tape::{Result, TapeEncoder, TapeRow, TAPE_EXT};

/// Wire-file magic; followed by a version byte and metadata length.
pub const DBN_MAGIC: &[u8; 3] = b"DBN";

/// Record type of trade-on-book (TBBO) records.
pub const RTYPE_TBBO: u8 = 1;

/// Fixed size of a TBBO wire record.
pub const RECORD_LEN: usize = 80;

/// Null sentinel in wire price fields.
const NULL_PRICE: i64 = i64::MAX;

/// Map the wire aggressor character onto a signed side.
#[inline]
fn side_from_char(c: u8) -> i8 {
    match c {
        b'B' => 1,
        b'A' => -1,
        _ => 0,
    }
}

/// Parse one 80-byte TBBO record into a tape row.
///
/// Returns `None` for records that must be discarded (null-price
/// sentinels). The caller has already verified type and length.
fn parse_record(rec: &[u8]) -> Option<TapeRow> {
    let read_u16 = |o: usize| u16::from_le_bytes(rec[o..o + 2].try_into().unwrap());
    let read_u32 = |o: usize| u32::from_le_bytes(rec[o..o + 4].try_into().unwrap());
    let read_u64 = |o: usize| u64::from_le_bytes(rec[o..o + 8].try_into().unwrap());
    let read_i64 = |o: usize| i64::from_le_bytes(rec[o..o + 8].try_into().unwrap());

    let price_raw = read_i64(16);
    let bid_px_raw = read_i64(48);
    let ask_px_raw = read_i64(56);
    if price_raw == NULL_PRICE || bid_px_raw == NULL_PRICE || ask_px_raw == NULL_PRICE {
        return None;
    }

    Some(TapeRow {
        publisher_id: read_u16(2),
        instrument_id: read_u32(4),
        ts_event: read_u64(8),
        price: price_raw as f64 * PX_SCALE,
        size: read_u32(24) as f64,
        action: rec[28] as i8,
        side: side_from_char(rec[29]),
        flags: rec[30],
        depth: rec[31],
        ts_recv: read_u64(32),
        ts_in_delta: i32::from_le_bytes(rec[40..44].try_into().unwrap()),
        sequence: read_u32(44),
        bid_px: bid_px_raw as f64 * PX_SCALE,
        ask_px: ask_px_raw as f64 * PX_SCALE,
        bid_sz: read_u32(64) as f64,
        ask_sz: read_u32(68) as f64,
        bid_ct: read_u32(72),
        ask_ct: read_u32(76),
    })
}

/// Convert one wire file into `<stem>.quantdev`; returns rows written.
pub fn convert_file(path: &Path) -> Result<u64> {
    let out_path = path.with_extension(TAPE_EXT);
    let mut reader = BufReader::new(File::open(path)?);
    let mut enc = TapeEncoder::create(&out_path)?;

    // Skip the metadata block when the file carries the wire header.
    let mut header = [0u8; 8];
    match reader.read_exact(&mut header) {
        Ok(()) => {
            if &header[0..3] == DBN_MAGIC {
                let meta_len = u32::from_le_bytes(header[4..8].try_into().unwrap());
                reader.seek(SeekFrom::Start(8 + meta_len as u64))?;
            } else {
                reader.seek(SeekFrom::Start(0))?;
            }
        }
        Err(_) => {
            // Shorter than a header: nothing to convert.
            enc.close()?;
            return Ok(0);
        }
    }

    // Large enough for the longest length-prefixed record (255 words).
    let mut rec = [0u8; 1024];
    loop {
        // Leading length byte; EOF here is the normal end of stream.
        if reader.read_exact(&mut rec[0..1]).is_err() {
            break;
        }
        let length_words = rec[0] as usize;
        if length_words == 0 {
            continue;
        }
        let rec_size = length_words * 4;

        if reader.read_exact(&mut rec[1..rec_size]).is_err() {
            log::warn!("{}: truncated trailing record", path.display());
            break;
        }

        if rec[1] != RTYPE_TBBO || rec_size != RECORD_LEN {
            continue;
        }

        if let Some(row) = parse_record(&rec[..RECORD_LEN]) {
            enc.add_row(&row)?;
        }
    }

    let rows = enc.rows();
    enc.close()?;
    Ok(rows)
}

/// The `data` verb: convert every `*.dbn` file in `dir` on the I/O pool.
pub fn run_data(dir: &Path, config: &StudyConfig) -> std::result::Result<u64, Box<dyn std::error::Error>> {
    let files: Vec<PathBuf> = tape_files(dir, "dbn")?;
    if files.is_empty() {
        log::warn!("no .dbn files found in {}", dir.display());
        return Ok(0);
    }

    let io_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.io_threads)
        .build()?;

    let total: u64 = io_pool.install(|| {
        files
            .par_iter()
            .map(|path| match convert_file(path) {
                Ok(rows) => {
                    log::info!("{} -> {} rows", path.display(), rows);
                    rows
                }
                Err(e) => {
                    log::error!("{}: {e}", path.display());
                    0
                }
            })
            .sum()
    });
    Ok(total)
}
