//! Qubit allocator.
//!
//! Hands out [`QubitId`]s from a pool, reusing reclaimed ids before the pool
//! grows. Reuse is lowest-index-first, so allocation order is deterministic
//! for a given sequence of requests.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ResourceError, ResourceResult};
use crate::qubit::QubitId;

/// Lifecycle state of a qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QubitState {
    /// Never handed out.
    Free,
    /// Handed out and still untouched by any operation.
    Allocated,
    /// Handed out and touched by at least one operation.
    Entangled,
    /// Returned to the pool; available for reuse.
    Reclaimed,
}

impl QubitState {
    /// Whether a qubit in this state is owned by some caller.
    #[inline]
    pub fn is_live(self) -> bool {
        matches!(self, QubitState::Allocated | QubitState::Entangled)
    }
}

/// Allocator owning every qubit handle of one compilation session.
#[derive(Debug, Clone, Default)]
pub struct QubitAllocator {
    states: Vec<QubitState>,
    reclaimed: BTreeSet<QubitId>,
    capacity: Option<u32>,
    live: u32,
    peak: u32,
}

impl QubitAllocator {
    /// Create an allocator, optionally bounded to `capacity` live qubits.
    pub fn new(capacity: Option<u32>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Allocate `count` qubits.
    ///
    /// Reclaimed ids are reused in ascending order; the pool grows only once
    /// none are left. On error nothing is allocated.
    pub fn allocate(&mut self, count: u32) -> ResourceResult<Vec<QubitId>> {
        if let Some(capacity) = self.capacity {
            if self.live.saturating_add(count) > capacity {
                return Err(ResourceError::CapacityExceeded {
                    requested: count,
                    live: self.live,
                    capacity,
                });
            }
        }

        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = match self.reclaimed.pop_first() {
                Some(id) => id,
                None => {
                    let id = QubitId(self.pool_size());
                    self.states.push(QubitState::Free);
                    id
                }
            };
            self.states[id.index()] = QubitState::Allocated;
            ids.push(id);
        }

        self.live += count;
        self.peak = self.peak.max(self.live);
        debug!(
            count,
            first = ids.first().map(|q| q.0),
            live = self.live,
            "allocated qubits"
        );
        Ok(ids)
    }

    /// Return qubits to the pool.
    ///
    /// Every id must be live and appear once; the request is checked in full
    /// before any qubit is released.
    pub fn deallocate(&mut self, qubits: &[QubitId]) -> ResourceResult<()> {
        let mut seen = BTreeSet::new();
        for &q in qubits {
            if !self.state(q).is_live() {
                return Err(ResourceError::NotAllocated(q));
            }
            if !seen.insert(q) {
                return Err(ResourceError::DuplicateRelease(q));
            }
        }

        for &q in qubits {
            self.states[q.index()] = QubitState::Reclaimed;
            self.reclaimed.insert(q);
        }
        self.live -= qubits.len() as u32;
        trace!(count = qubits.len(), live = self.live, "reclaimed qubits");
        Ok(())
    }

    /// Record that an operation touched `qubit`.
    pub fn mark_entangled(&mut self, qubit: QubitId) {
        if let Some(state) = self.states.get_mut(qubit.index()) {
            if *state == QubitState::Allocated {
                *state = QubitState::Entangled;
            }
        }
    }

    /// Current state of `qubit`. Ids beyond the pool are `Free`.
    pub fn state(&self, qubit: QubitId) -> QubitState {
        self.states
            .get(qubit.index())
            .copied()
            .unwrap_or(QubitState::Free)
    }

    /// Whether `qubit` is currently allocated.
    #[inline]
    pub fn is_live(&self, qubit: QubitId) -> bool {
        self.state(qubit).is_live()
    }

    /// Number of live qubits.
    #[inline]
    pub fn num_allocated(&self) -> u32 {
        self.live
    }

    /// Number of reclaimed ids waiting for reuse.
    #[inline]
    pub fn num_free(&self) -> u32 {
        self.reclaimed.len() as u32
    }

    /// Highest number of simultaneously live qubits seen so far.
    #[inline]
    pub fn peak(&self) -> u32 {
        self.peak
    }

    /// Number of distinct ids ever handed out.
    #[inline]
    pub fn pool_size(&self) -> u32 {
        self.states.len() as u32
    }

    /// Configured capacity, if any.
    pub fn capacity(&self) -> Option<u32> {
        self.capacity
    }

    /// All live qubits in ascending order.
    pub fn live_qubits(&self) -> Vec<QubitId> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_live())
            .map(|(i, _)| QubitId(i as u32))
            .collect()
    }
}
