//! Tape reader.
//!
//! Reads the 64-byte header, validates the magic, sizes every column to
//! the declared row total, then appends chunk after chunk. Column blocks
//! are read straight into the backing arrays as byte spans; no per-element
//! copying or endianness conversion happens on the (little-endian) hot
//! path.
//!
//! Two entry points:
//!
//! - [`load_tape`]: decode into a pooled container with exclusive
//!   ownership, the primary interface for study workers.
//! - [`load_tape_shared`]: decode behind a weak cache keyed by path, so
//!   concurrent readers of the same tape share one immutable container.
//!   Dropping all strong references lets the entry lapse back to
//!   decode-on-miss.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use ahash::AHashMap;

use super::columns::{ColumnPool, TbboColumns};
use super::error::{Result, TapeError};
use super::{HEADER_LEN, MAGIC};

/// Decode a tape into a container taken from `pool`.
///
/// On failure the container goes back to the pool and the error is
/// returned; callers log and skip the tape.
pub fn load_tape<P: AsRef<Path>>(path: P, pool: &ColumnPool) -> Result<Box<TbboColumns>> {
    let mut cols = pool.get();
    match decode_into(path.as_ref(), &mut cols) {
        Ok(()) => Ok(cols),
        Err(e) => {
            pool.put(cols);
            Err(e)
        }
    }
}

fn shared_cache() -> &'static Mutex<AHashMap<PathBuf, Weak<TbboColumns>>> {
    static CACHE: OnceLock<Mutex<AHashMap<PathBuf, Weak<TbboColumns>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(AHashMap::new()))
}

/// Decode a tape through the shared weak cache.
///
/// Not required for correctness anywhere; it exists so that overlapping
/// jobs reading the same tape pay for one decode instead of several.
pub fn load_tape_shared<P: AsRef<Path>>(path: P) -> Result<Arc<TbboColumns>> {
    let key = path.as_ref().to_path_buf();
    let mut cache = shared_cache().lock().unwrap();

    if let Some(weak) = cache.get(&key) {
        if let Some(cols) = weak.upgrade() {
            return Ok(cols);
        }
        cache.remove(&key);
    }

    let mut cols = TbboColumns::new();
    decode_into(&key, &mut cols)?;
    let cols = Arc::new(cols);
    cache.insert(key, Arc::downgrade(&cols));
    Ok(cols)
}

/// Decode `path` into `cols`, replacing its contents.
pub fn decode_into(path: &Path, cols: &mut TbboColumns) -> Result<()> {
    let mut f = File::open(path)?;

    let mut header = [0u8; HEADER_LEN];
    f.read_exact(&mut header).map_err(|_| TapeError::ShortRead {
        context: "tape header",
    })?;

    if header[0..4] != MAGIC {
        return Err(TapeError::BadMagic {
            found: header[0..4].try_into().unwrap(),
        });
    }

    let total_rows = u64::from_le_bytes(header[8..16].try_into().unwrap());
    // footer_offset at 24..32 is not needed for a forward scan.

    if total_rows > usize::MAX as u64 {
        return Err(TapeError::TooLarge { total_rows });
    }
    let n_rows = total_rows as usize;

    cols.reset();
    cols.resize_for(n_rows);

    f.seek(SeekFrom::Start(HEADER_LEN as u64))?;

    let mut len_buf = [0u8; 4];
    let mut pos = 0usize;

    while pos < n_rows {
        f.read_exact(&mut len_buf).map_err(|_| TapeError::ShortRead {
            context: "chunk length",
        })?;
        let n = u32::from_le_bytes(len_buf);
        if n == 0 {
            continue;
        }
        if pos + n as usize > n_rows {
            return Err(TapeError::CorruptChunk {
                pos: pos as u64,
                chunk_rows: n,
                total_rows,
            });
        }

        let (i0, i1) = (pos, pos + n as usize);

        // Column blocks in the fixed on-disk order; must match the encoder.
        read_block(&mut f, &mut cols.ts_event[i0..i1])?;
        read_block(&mut f, &mut cols.ts_recv[i0..i1])?;
        read_block(&mut f, &mut cols.ts_in_delta[i0..i1])?;
        read_block(&mut f, &mut cols.prices[i0..i1])?;
        read_block(&mut f, &mut cols.sizes[i0..i1])?;
        read_block(&mut f, &mut cols.sides[i0..i1])?;
        read_block(&mut f, &mut cols.actions[i0..i1])?;
        read_block(&mut f, &mut cols.flags[i0..i1])?;
        read_block(&mut f, &mut cols.depth[i0..i1])?;
        read_block(&mut f, &mut cols.sequences[i0..i1])?;
        read_block(&mut f, &mut cols.bid_px[i0..i1])?;
        read_block(&mut f, &mut cols.ask_px[i0..i1])?;
        read_block(&mut f, &mut cols.bid_sz[i0..i1])?;
        read_block(&mut f, &mut cols.ask_sz[i0..i1])?;
        read_block(&mut f, &mut cols.bid_ct[i0..i1])?;
        read_block(&mut f, &mut cols.ask_ct[i0..i1])?;
        read_block(&mut f, &mut cols.publisher_id[i0..i1])?;
        read_block(&mut f, &mut cols.instrument_id[i0..i1])?;

        pos += n as usize;
    }

    if pos != n_rows {
        return Err(TapeError::CountMismatch {
            loaded: pos as u64,
            expected: total_rows,
        });
    }

    cols.count = n_rows;
    Ok(())
}

/// Read exactly one column block into a scalar slice, zero-copy.
#[inline]
fn read_block<T: bytemuck::Pod>(f: &mut File, dst: &mut [T]) -> Result<()> {
    if dst.is_empty() {
        return Ok(());
    }
    f.read_exact(bytemuck::cast_slice_mut(dst))?;
    Ok(())
}
