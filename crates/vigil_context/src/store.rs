//! Hash-consing store for call-stack contexts.
//!
//! Contexts are kept in a chained hash table whose bucket count walks a
//! fixed list of primes. Chains are index-linked: growing the table only
//! rewrites links, the contexts themselves never move.

use std::fmt;

use crate::{Addr, Context, ContextId, ThreadId, Unwinder};

/// Deepest stack the store will keep, whatever the configuration says.
pub const MAX_BACKTRACE_DEPTH: usize = 500;

/// Default number of frames captured per context.
const DEFAULT_DEPTH: usize = 12;

/// Bucket counts, in growth order.
const PRIMES: &[usize] = &[
    769,
    1_543,
    3_079,
    6_151,
    12_289,
    24_593,
    49_157,
    98_317,
    196_613,
    393_241,
    786_433,
    1_572_869,
    3_145_739,
    6_291_469,
    12_582_917,
    25_165_843,
    50_331_653,
    100_663_319,
    201_326_611,
    402_653_189,
    805_306_457,
    1_610_612_741,
    3_221_225_473,
    4_294_967_291,
];

/// A successful lookup moves its entry one step up the chain once every
/// this many probes.
const PROMOTE_EVERY: u64 = 8;

/// Rotate-xor hash over the frame addresses.
#[inline]
fn hash_frames(frames: &[Addr]) -> u64 {
    frames
        .iter()
        .fold(0u64, |hash, addr| (hash ^ addr.raw()).rotate_left(19))
}

#[inline]
#[expect(
    clippy::cast_possible_truncation,
    reason = "the result is below the bucket count, which fits in usize"
)]
fn bucket_index(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

#[inline]
fn to_slot(index: usize) -> u32 {
    u32::try_from(index).unwrap_or_else(|_| panic!("context table overflow: {index} entries"))
}

/// Lookup statistics for a [`ContextStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContextStats {
    /// Calls to `intern`.
    pub search_requests: u64,
    /// Full frame-list comparisons made while walking chains.
    pub search_compares: u64,
    /// Entries moved up their chain.
    pub promotions: u64,
    /// Distinct contexts stored.
    pub stored: usize,
    /// Current bucket count.
    pub capacity: usize,
}

impl fmt::Display for ContextStats {
    #[expect(
        clippy::cast_precision_loss,
        reason = "ratios are printed with two decimals"
    )]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_bucket = self.stored as f64 / self.capacity.max(1) as f64;
        let per_search = self.search_compares as f64 / self.search_requests.max(1) as f64;
        writeln!(
            f,
            "contexts: {} buckets, {} contexts (avg {per_bucket:.2} per bucket)",
            self.capacity, self.stored
        )?;
        write!(
            f,
            "contexts: {} searches, {} full compares (avg {per_search:.2} per search), {} promotions",
            self.search_requests, self.search_compares, self.promotions
        )
    }
}

/// Interning table for [`Context`]s.
///
/// Every distinct frame sequence is stored once and handed out as a
/// `&'static Context`. The store also owns the sentinel context (a single
/// zero frame) which always carries [`ContextId::SENTINEL`].
pub struct ContextStore {
    /// Contexts in creation order. Slot `n` holds the context with id
    /// `(n + 1) * STRIDE`.
    contexts: Vec<&'static Context>,
    /// Next slot in the same bucket, parallel with `contexts`.
    chain: Vec<Option<u32>>,
    /// Head slot of each bucket.
    buckets: Vec<Option<u32>>,
    /// Index into `PRIMES` of the current bucket count.
    size_idx: usize,
    next_id: Option<ContextId>,
    max_depth: usize,
    search_requests: u64,
    search_compares: u64,
    promotions: u64,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    /// Create a store capturing the default number of frames.
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_DEPTH)
    }

    /// Create a store that keeps at most `max_depth` frames per context.
    ///
    /// The depth is clamped to `1..=MAX_BACKTRACE_DEPTH`.
    pub fn with_max_depth(max_depth: usize) -> Self {
        let mut store = ContextStore {
            contexts: Vec::new(),
            chain: Vec::new(),
            buckets: vec![None; PRIMES[0]],
            size_idx: 0,
            next_id: Some(ContextId::SENTINEL),
            max_depth: max_depth.clamp(1, MAX_BACKTRACE_DEPTH),
            search_requests: 0,
            search_compares: 0,
            promotions: 0,
        };
        let sentinel = store.intern(&[Addr::NULL]);
        debug_assert_eq!(sentinel.id(), ContextId::SENTINEL);
        store
    }

    /// The sentinel context: one zero frame, id [`ContextId::SENTINEL`].
    pub fn sentinel(&self) -> &'static Context {
        self.contexts[0]
    }

    /// Maximum number of frames kept per captured context.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of distinct contexts stored, sentinel included.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Always `false`: the sentinel is stored on creation.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    #[inline]
    fn capacity(&self) -> usize {
        PRIMES[self.size_idx]
    }

    /// Return the canonical context for `frames`, creating it on first use.
    ///
    /// # Panics
    /// Panics if `frames` is empty, or if the id space is exhausted.
    pub fn intern(&mut self, frames: &[Addr]) -> &'static Context {
        assert!(!frames.is_empty(), "cannot intern an empty call stack");
        self.search_requests += 1;

        let bucket = bucket_index(hash_frames(frames), self.capacity());
        let mut prev2: Option<u32> = None;
        let mut prev: Option<u32> = None;
        let mut cursor = self.buckets[bucket];

        while let Some(slot) = cursor {
            self.search_compares += 1;
            let ctx = self.contexts[slot as usize];
            if ctx.frames() == frames {
                if (self.search_requests + self.search_compares) % PROMOTE_EVERY == 0 {
                    self.promote(bucket, prev2, prev, slot);
                }
                return ctx;
            }
            prev2 = prev;
            prev = cursor;
            cursor = self.chain[slot as usize];
        }

        self.insert(bucket, frames)
    }

    /// Move `slot` one step towards the head of its chain.
    ///
    /// `prev` is the entry in front of `slot` and `prev2` the one in front of
    /// `prev`; the three links are rewritten together.
    fn promote(&mut self, bucket: usize, prev2: Option<u32>, prev: Option<u32>, slot: u32) {
        let Some(prev) = prev else {
            return;
        };
        self.chain[prev as usize] = self.chain[slot as usize];
        self.chain[slot as usize] = Some(prev);
        match prev2 {
            Some(prev2) => self.chain[prev2 as usize] = Some(slot),
            None => self.buckets[bucket] = Some(slot),
        }
        self.promotions += 1;
    }

    fn insert(&mut self, bucket: usize, frames: &[Addr]) -> &'static Context {
        let id = self
            .next_id
            .unwrap_or_else(|| panic!("context id space exhausted"));
        self.next_id = id.next();

        let ctx: &'static Context = Box::leak(Box::new(Context::new(id, frames.into())));
        let slot = to_slot(self.contexts.len());
        self.contexts.push(ctx);
        self.chain.push(self.buckets[bucket]);
        self.buckets[bucket] = Some(slot);

        if self.contexts.len() > self.capacity() && self.size_idx + 1 < PRIMES.len() {
            self.grow();
        }
        ctx
    }

    /// Move to the next prime and re-link every entry.
    fn grow(&mut self) {
        self.size_idx += 1;
        let capacity = self.capacity();
        let mut buckets = vec![None; capacity];
        for (index, ctx) in self.contexts.iter().enumerate() {
            let bucket = bucket_index(hash_frames(ctx.frames()), capacity);
            self.chain[index] = buckets[bucket];
            buckets[bucket] = Some(to_slot(index));
        }
        self.buckets = buckets;
        tracing::debug!(
            capacity,
            stored = self.contexts.len(),
            "grew context table"
        );
    }

    /// Capture `thread`'s stack with `unwinder` and intern it.
    ///
    /// The capture is clamped to [`max_depth`](Self::max_depth) frames. An
    /// empty capture yields the sentinel.
    pub fn record(
        &mut self,
        unwinder: &dyn Unwinder,
        thread: ThreadId,
        skip_frames: usize,
    ) -> &'static Context {
        let mut frames = unwinder.capture(thread, skip_frames, self.max_depth);
        frames.truncate(self.max_depth);
        if frames.is_empty() {
            return self.sentinel();
        }
        self.intern(&frames)
    }

    /// A one-frame context for a bare address.
    pub fn depth_one(&mut self, addr: Addr) -> &'static Context {
        self.intern(&[addr])
    }

    /// Look up a context by id.
    pub fn get(&self, id: ContextId) -> Option<&'static Context> {
        if !self.is_plausible_id(id) {
            return None;
        }
        let slot = (id.raw() / ContextId::STRIDE) as usize - 1;
        self.contexts.get(slot).copied()
    }

    /// Whether `id` could have been handed out by this store: non-zero, on
    /// the stride, and already allocated.
    pub fn is_plausible_id(&self, id: ContextId) -> bool {
        let raw = id.raw();
        let allocated = match self.next_id {
            Some(next) => raw < next.raw(),
            None => true,
        };
        raw != 0 && raw % ContextId::STRIDE == 0 && allocated
    }

    /// Current lookup statistics.
    pub fn stats(&self) -> ContextStats {
        ContextStats {
            search_requests: self.search_requests,
            search_compares: self.search_compares,
            promotions: self.promotions,
            stored: self.contexts.len(),
            capacity: self.capacity(),
        }
    }

    /// Slots of one bucket, head first.
    #[cfg(test)]
    fn bucket_slots(&self, bucket: usize) -> Vec<u32> {
        let mut slots = Vec::new();
        let mut cursor = self.buckets[bucket];
        while let Some(slot) = cursor {
            slots.push(slot);
            cursor = self.chain[slot as usize];
        }
        slots
    }
}
