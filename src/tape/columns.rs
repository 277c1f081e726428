//! Struct-of-arrays container for TBBO events, plus a reuse pool.
//!
//! Every analytical pass touches only a handful of fields, so events are
//! stored as parallel per-field arrays rather than an array of record
//! structs. Hot loops then scan contiguous memory per column.
//!
//! # Invariants
//!
//! - Every column has length ≥ `count`, and all columns agree on `count`.
//! - A container is exclusively owned by one worker between
//!   [`ColumnPool::get`] and [`ColumnPool::put`].
//! - Returning a container to the pool never shrinks its backing storage.

use std::sync::Mutex;

/// One day (or file) of TBBO events in columnar layout.
///
/// Field semantics follow the vendor TBBO schema: each record is a trade
/// snapshot carrying the trade itself and the resulting top of book.
#[derive(Debug, Default)]
pub struct TbboColumns {
    /// Number of valid rows; every column below holds at least this many.
    pub count: usize,

    // Identity / routing
    pub publisher_id: Vec<u16>,
    pub instrument_id: Vec<u32>,

    // Timing
    pub ts_event: Vec<u64>,
    pub ts_recv: Vec<u64>,
    pub ts_in_delta: Vec<i32>,

    // Event
    pub prices: Vec<f64>,
    pub sizes: Vec<f64>,
    /// Aggressor side: +1 buy, -1 sell, 0 unknown.
    pub sides: Vec<i8>,
    /// Event kind character code: 'T', 'A', 'C', 'M', 'R', 'N'.
    pub actions: Vec<i8>,
    /// Raw vendor flag bits (see [`crate::config::flags`]).
    pub flags: Vec<u8>,
    /// Book level affected; 0 is top of book.
    pub depth: Vec<u8>,
    /// Monotone per-publisher message counter.
    pub sequences: Vec<u32>,

    // Top-of-book snapshot (post-event)
    pub bid_px: Vec<f64>,
    pub ask_px: Vec<f64>,
    pub bid_sz: Vec<f64>,
    pub ask_sz: Vec<f64>,
    pub bid_ct: Vec<u32>,
    pub ask_ct: Vec<u32>,
}

/// Reuse an existing backing allocation when it is large enough.
///
/// Values are left uninitialized in the logical sense: callers overwrite
/// the full `0..n` range before reading it.
fn resize_column<T: Default + Clone>(col: &mut Vec<T>, n: usize) {
    if col.capacity() < n {
        *col = vec![T::default(); n];
    } else {
        col.clear();
        col.resize(n, T::default());
    }
}

impl TbboColumns {
    /// Create an empty container with no reserved capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate all columns to zero length, keeping backing capacity.
    pub fn reset(&mut self) {
        self.count = 0;

        self.publisher_id.clear();
        self.instrument_id.clear();

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
    }

    /// Size every column to exactly `n` rows, reusing capacity where possible.
    ///
    /// `count` is left at 0; the decoder sets it once all rows are filled.
    pub fn resize_for(&mut self, n: usize) {
        self.count = 0;

        resize_column(&mut self.publisher_id, n);
        resize_column(&mut self.instrument_id, n);

        resize_column(&mut self.ts_event, n);
        resize_column(&mut self.ts_recv, n);
        resize_column(&mut self.ts_in_delta, n);

        resize_column(&mut self.prices, n);
        resize_column(&mut self.sizes, n);
        resize_column(&mut self.sides, n);
        resize_column(&mut self.actions, n);
        resize_column(&mut self.flags, n);
        resize_column(&mut self.depth, n);
        resize_column(&mut self.sequences, n);

        resize_column(&mut self.bid_px, n);
        resize_column(&mut self.ask_px, n);
        resize_column(&mut self.bid_sz, n);
        resize_column(&mut self.ask_sz, n);
        resize_column(&mut self.bid_ct, n);
        resize_column(&mut self.ask_ct, n);
    }

    /// Verify the column-length invariant for the first `count` rows.
    pub fn check_lengths(&self) -> bool {
        let n = self.count;
        self.publisher_id.len() >= n
            && self.instrument_id.len() >= n
            && self.ts_event.len() >= n
            && self.ts_recv.len() >= n
            && self.ts_in_delta.len() >= n
            && self.prices.len() >= n
            && self.sizes.len() >= n
            && self.sides.len() >= n
            && self.actions.len() >= n
            && self.flags.len() >= n
            && self.depth.len() >= n
            && self.sequences.len() >= n
            && self.bid_px.len() >= n
            && self.ask_px.len() >= n
            && self.bid_sz.len() >= n
            && self.ask_sz.len() >= n
            && self.bid_ct.len() >= n
            && self.ask_ct.len() >= n
    }
}

// ============================================================================
// Container pool
// ============================================================================

/// Thread-safe pool of [`TbboColumns`] containers.
///
/// Decoding a day of TBBO data needs tens of megabytes of column storage;
/// recycling containers across jobs keeps the steady-state allocation rate
/// near zero. Ownership is exclusive between `get` and `put`.
#[derive(Debug, Default)]
pub struct ColumnPool {
    free: Mutex<Vec<Box<TbboColumns>>>,
}

impl ColumnPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a container from the pool, or allocate a fresh one.
    ///
    /// The returned container is emptied but keeps whatever backing
    /// capacity it accumulated in previous lives.
    pub fn get(&self) -> Box<TbboColumns> {
        let mut free = self.free.lock().unwrap();
        match free.pop() {
            Some(mut cols) => {
                cols.reset();
                cols
            }
            None => Box::new(TbboColumns::new()),
        }
    }

    /// Return a container, transferring ownership back to the pool.
    pub fn put(&self, cols: Box<TbboColumns>) {
        let mut free = self.free.lock().unwrap();
        free.push(cols);
    }

    /// Number of idle containers currently pooled.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap().len()
    }
}
