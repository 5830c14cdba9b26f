use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use crate::error::{Result, ZipMapError};

/// Backing buffer of a zipmap.
///
/// The map keeps the store sized to exactly its serialized length and calls
/// [`ByteStore::realloc`] whenever an entry grows or shrinks. Dropping the
/// store releases the buffer.
pub trait ByteStore: AsRef<[u8]> + AsMut<[u8]> {
    /// Resizes the buffer to `new_len` bytes, preserving the common prefix.
    ///
    /// Growing may fail with [`ZipMapError::Alloc`], in which case the buffer
    /// must be left untouched. Shrinking must not fail.
    fn realloc(&mut self, new_len: usize) -> Result<()>;
}

impl ByteStore for Vec<u8> {
    fn realloc(&mut self, new_len: usize) -> Result<()> {
        let old_len = self.len();
        if new_len > old_len {
            self.try_reserve_exact(new_len - old_len)
                .map_err(|_| ZipMapError::Alloc { requested: new_len })?;
            Vec::resize(self, new_len, 0);
        } else {
            self.truncate(new_len);
            self.shrink_to_fit();
        }
        Ok(())
    }
}

impl ByteStore for Box<[u8]> {
    fn realloc(&mut self, new_len: usize) -> Result<()> {
        let mut vec = std::mem::take(self).into_vec();
        let res = vec.realloc(new_len);
        *self = vec.into_boxed_slice();
        res
    }
}

/// Allocation statistics shared by any number of [`TrackedStore`]s.
///
/// Each map reports into the sink it was given instead of a process wide
/// counter, so separate owners can account for their memory independently.
#[derive(Debug, Default)]
pub struct AllocStats {
    used: AtomicUsize,
    peak: AtomicUsize,
    allocations: AtomicUsize,
    reallocations: AtomicUsize,
    frees: AtomicUsize,
}

impl AllocStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bytes currently held by live stores.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    /// Highest value `used` has reached.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn reallocations(&self) -> usize {
        self.reallocations.load(Ordering::Relaxed)
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::Relaxed)
    }

    fn record_alloc(&self, len: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.add_used(len);
    }

    fn record_realloc(&self, old_len: usize, new_len: usize) {
        self.reallocations.fetch_add(1, Ordering::Relaxed);
        if new_len >= old_len {
            self.add_used(new_len - old_len);
        } else {
            self.used.fetch_sub(old_len - new_len, Ordering::Relaxed);
        }
    }

    fn record_free(&self, len: usize) {
        self.frees.fetch_add(1, Ordering::Relaxed);
        self.used.fetch_sub(len, Ordering::Relaxed);
    }

    fn add_used(&self, len: usize) {
        let used = self.used.fetch_add(len, Ordering::Relaxed) + len;
        self.peak.fetch_max(used, Ordering::Relaxed);
    }
}

/// A store that reports its allocations to an [`AllocStats`] sink.
pub struct TrackedStore<S: ByteStore = Vec<u8>> {
    inner: S,
    stats: Arc<AllocStats>,
}

impl<S: ByteStore> TrackedStore<S> {
    /// Wraps `inner`, counting its current size as one allocation.
    pub fn new(inner: S, stats: Arc<AllocStats>) -> Self {
        stats.record_alloc(inner.as_ref().len());
        Self { inner, stats }
    }

    pub fn stats(&self) -> &Arc<AllocStats> {
        &self.stats
    }
}

impl<S: ByteStore> AsRef<[u8]> for TrackedStore<S> {
    fn as_ref(&self) -> &[u8] {
        self.inner.as_ref()
    }
}

impl<S: ByteStore> AsMut<[u8]> for TrackedStore<S> {
    fn as_mut(&mut self) -> &mut [u8] {
        self.inner.as_mut()
    }
}

impl<S: ByteStore> ByteStore for TrackedStore<S> {
    fn realloc(&mut self, new_len: usize) -> Result<()> {
        let old_len = self.inner.as_ref().len();
        self.inner.realloc(new_len)?;
        trace!(old_len, new_len, "tracked realloc");
        self.stats.record_realloc(old_len, new_len);
        Ok(())
    }
}

impl<S: ByteStore> Drop for TrackedStore<S> {
    fn drop(&mut self) {
        self.stats.record_free(self.inner.as_ref().len());
    }
}
