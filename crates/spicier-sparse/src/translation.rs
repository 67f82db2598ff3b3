//! Mapping between external and internal indices.
//!
//! Pivoting swaps rows and columns of the matrix. The translation remembers
//! where each external (circuit) index ended up so that stamps can be placed
//! and solutions read back in external order.

/// A bidirectional permutation of indices starting at 1.
///
/// Indices outside the allocated range map to themselves.
#[derive(Debug, Clone, Default)]
pub struct Translation {
    to_internal: Vec<usize>,
    to_external: Vec<usize>,
}

impl Translation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indices currently tracked.
    pub fn len(&self) -> usize {
        self.to_internal.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Internal index of an external index.
    pub fn to_internal(&self, external: usize) -> usize {
        self.to_internal.get(external).copied().unwrap_or(external)
    }

    /// External index of an internal index.
    pub fn to_external(&self, internal: usize) -> usize {
        self.to_external.get(internal).copied().unwrap_or(internal)
    }

    /// Record that internal indices `a` and `b` were exchanged.
    pub fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.ensure(a.max(b));
        let external_a = self.to_external[a];
        let external_b = self.to_external[b];
        self.to_external[a] = external_b;
        self.to_external[b] = external_a;
        self.to_internal[external_a] = b;
        self.to_internal[external_b] = a;
    }

    /// Reorder a 1-based internal vector into a 0-based external slice.
    ///
    /// `internal[i]` is the value of internal unknown `i`; `external[k]`
    /// receives the value of external unknown `k + 1`.
    pub fn unscramble<T: Copy>(&self, internal: &[T], external: &mut [T]) {
        for (k, slot) in external.iter_mut().enumerate() {
            *slot = internal[self.to_internal(k + 1)];
        }
    }

    /// Reorder a 0-based external slice into a 1-based internal vector.
    pub fn scramble<T: Copy>(&self, external: &[T], internal: &mut [T]) {
        for (k, &value) in external.iter().enumerate() {
            internal[self.to_internal(k + 1)] = value;
        }
    }

    /// Forget all swaps.
    pub fn clear(&mut self) {
        self.to_internal.clear();
        self.to_external.clear();
    }

    fn ensure(&mut self, size: usize) {
        let current = self.to_internal.len();
        if size < current {
            return;
        }
        self.to_internal.extend(current..=size);
        self.to_external.extend(current..=size);
    }
}
