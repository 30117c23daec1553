//! Resource chunk reassembly and reference-counted lifecycle.

use boldui_protocol::{ResourceChunk, ResourceId};
use rustc_hash::FxHashMap;

struct PendingResource {
    total_len: u32,
    buf: Vec<u8>,
}

struct ReadyResource {
    data: Vec<u8>,
    refcount: u32,
}

/// Assembles streamed [`ResourceChunk`]s into complete byte buffers and
/// tracks their reference count until `resource_deallocs` drops them to
/// zero. A resource is ready once the sum of received chunk lengths equals
/// its declared total.
#[derive(Default)]
pub struct ResourceStore {
    pending: FxHashMap<ResourceId, PendingResource>,
    ready: FxHashMap<ResourceId, ReadyResource>,
}

/// Whether adding a chunk completed the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    StillPending,
    Completed,
    /// A non-contiguous chunk was dropped. Chunks are assumed
    /// offset-addressed and contiguous; out-of-order delivery isn't
    /// supported.
    Rejected,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A 0-length chunk is a permitted no-op.
    pub fn add_chunk(&mut self, chunk: ResourceChunk) -> ChunkOutcome {
        if chunk.data.is_empty() && chunk.offset != 0 {
            return ChunkOutcome::StillPending;
        }
        if chunk.offset == 0 && !self.pending.contains_key(&chunk.id) && !self.ready.contains_key(&chunk.id) {
            self.pending.insert(chunk.id, PendingResource { total_len: chunk.total_len, buf: Vec::new() });
        }
        let Some(pending) = self.pending.get_mut(&chunk.id) else {
            return ChunkOutcome::Rejected;
        };
        if chunk.offset as usize != pending.buf.len() {
            return ChunkOutcome::Rejected;
        }
        pending.buf.extend_from_slice(&chunk.data);
        if pending.buf.len() as u32 >= pending.total_len {
            let pending = self.pending.remove(&chunk.id).unwrap();
            self.ready.insert(chunk.id, ReadyResource { data: pending.buf, refcount: 1 });
            ChunkOutcome::Completed
        } else {
            ChunkOutcome::StillPending
        }
    }

    pub fn get(&self, id: ResourceId) -> Option<&[u8]> {
        self.ready.get(&id).map(|r| r.data.as_slice())
    }

    pub fn is_ready(&self, id: ResourceId) -> bool {
        self.ready.contains_key(&id)
    }

    /// Adds a hold on an already-ready resource, e.g. a second scene
    /// referencing the same image.
    pub fn retain(&mut self, id: ResourceId) {
        if let Some(r) = self.ready.get_mut(&id) {
            r.refcount += 1;
        }
    }

    /// Applies one `resource_deallocs` entry; drops the data once the count
    /// hits zero.
    pub fn dealloc(&mut self, id: ResourceId) {
        if let Some(r) = self.ready.get_mut(&id) {
            r.refcount = r.refcount.saturating_sub(1);
            if r.refcount == 0 {
                self.ready.remove(&id);
            }
        } else {
            self.pending.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_becomes_ready_once_lengths_sum_to_total() {
        let mut store = ResourceStore::new();
        let id = ResourceId(1);
        assert_eq!(
            store.add_chunk(ResourceChunk { id, offset: 0, total_len: 6, data: vec![1, 2, 3] }),
            ChunkOutcome::StillPending
        );
        assert!(!store.is_ready(id));
        assert_eq!(
            store.add_chunk(ResourceChunk { id, offset: 3, total_len: 6, data: vec![4, 5, 6] }),
            ChunkOutcome::Completed
        );
        assert_eq!(store.get(id), Some(&[1, 2, 3, 4, 5, 6][..]));
    }

    #[test]
    fn out_of_order_chunk_is_rejected() {
        let mut store = ResourceStore::new();
        let id = ResourceId(1);
        store.add_chunk(ResourceChunk { id, offset: 0, total_len: 6, data: vec![1, 2, 3] });
        assert_eq!(
            store.add_chunk(ResourceChunk { id, offset: 4, total_len: 6, data: vec![9] }),
            ChunkOutcome::Rejected
        );
    }

    #[test]
    fn dealloc_frees_resource_only_once_refcount_hits_zero() {
        let mut store = ResourceStore::new();
        let id = ResourceId(1);
        store.add_chunk(ResourceChunk { id, offset: 0, total_len: 1, data: vec![7] });
        store.retain(id);
        store.dealloc(id);
        assert!(store.is_ready(id));
        store.dealloc(id);
        assert!(!store.is_ready(id));
    }

    #[test]
    fn zero_length_chunk_with_nonzero_offset_is_a_noop() {
        let mut store = ResourceStore::new();
        let id = ResourceId(1);
        store.add_chunk(ResourceChunk { id, offset: 0, total_len: 3, data: vec![1, 2, 3] });
        assert_eq!(
            store.add_chunk(ResourceChunk { id, offset: 3, total_len: 3, data: vec![] }),
            ChunkOutcome::StillPending
        );
        assert!(store.is_ready(id));
    }
}
