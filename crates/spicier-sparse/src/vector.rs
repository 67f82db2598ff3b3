//! Sparse vector used for right-hand sides.

use std::ops::Index;

use crate::scalar::Scalar;

/// Handle to an element of a [`SparseVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorElementId(pub(crate) usize);

impl VectorElementId {
    /// The trash-can element that collects writes to index 0.
    pub const TRASH: VectorElementId = VectorElementId(0);

    /// Check if this is the trash-can element.
    pub fn is_trash(self) -> bool {
        self.0 == 0
    }
}

/// One nonzero entry of a sparse vector.
#[derive(Debug, Clone)]
pub struct VectorElement<T> {
    pub(crate) index: usize,
    pub(crate) value: T,
    pub(crate) above: Option<VectorElementId>,
    pub(crate) below: Option<VectorElementId>,
}

impl<T: Copy> VectorElement<T> {
    /// Current (internal) index of the entry.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value stored in the entry.
    pub fn value(&self) -> T {
        self.value
    }

    /// Previous entry.
    pub fn above(&self) -> Option<VectorElementId> {
        self.above
    }

    /// Next entry.
    pub fn below(&self) -> Option<VectorElementId> {
        self.below
    }
}

/// A sparse vector with entries linked by increasing index.
#[derive(Debug, Clone)]
pub struct SparseVector<T> {
    elements: Vec<VectorElement<T>>,
    /// Slot of the entry at each index (0 = none).
    map: Vec<usize>,
    first: Option<VectorElementId>,
    last: Option<VectorElementId>,
    length: usize,
}

impl<T: Scalar> Default for SparseVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> SparseVector<T> {
    pub fn new() -> Self {
        Self::with_length(0)
    }

    pub fn with_length(length: usize) -> Self {
        Self {
            elements: vec![VectorElement {
                index: 0,
                value: T::zero(),
                above: None,
                below: None,
            }],
            map: vec![0; length + 1],
            first: None,
            last: None,
            length,
        }
    }

    /// Highest index the vector can hold.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of stored entries, excluding the trash can.
    pub fn element_count(&self) -> usize {
        self.elements.len() - 1
    }

    pub fn first(&self) -> Option<VectorElementId> {
        self.first
    }

    pub fn last(&self) -> Option<VectorElementId> {
        self.last
    }

    /// Find or create the entry at `index`. Index 0 returns the trash can.
    pub fn get_element(&mut self, index: usize) -> VectorElementId {
        if index == 0 {
            return VectorElementId::TRASH;
        }
        if index > self.length {
            self.map.resize(index + 1, 0);
            self.length = index;
        }
        if self.map[index] != 0 {
            return VectorElementId(self.map[index]);
        }

        let id = VectorElementId(self.elements.len());
        self.elements.push(VectorElement {
            index,
            value: T::zero(),
            above: None,
            below: None,
        });
        self.link(id);
        id
    }

    /// Find the entry at `index` without creating it.
    pub fn find_element(&self, index: usize) -> Option<VectorElementId> {
        match self.map.get(index) {
            Some(&slot) if index != 0 && slot != 0 => Some(VectorElementId(slot)),
            _ => None,
        }
    }

    /// Value at `index`, zero when the entry does not exist.
    pub fn get(&self, index: usize) -> T {
        self.find_element(index)
            .map_or_else(T::zero, |id| self.elements[id.0].value)
    }

    pub fn value_mut(&mut self, id: VectorElementId) -> &mut T {
        &mut self.elements[id.0].value
    }

    pub fn set_value(&mut self, id: VectorElementId, value: T) {
        self.elements[id.0].value = value;
    }

    pub fn add_value(&mut self, id: VectorElementId, value: T) {
        self.elements[id.0].value += value;
    }

    /// Exchange the entries at two indices.
    ///
    /// Handles follow their entry, only the index changes.
    pub fn swap_elements(&mut self, index1: usize, index2: usize) {
        if index1 == index2 || index1 == 0 || index2 == 0 {
            return;
        }
        let needed = index1.max(index2);
        if needed > self.length {
            self.map.resize(needed + 1, 0);
            self.length = needed;
        }

        let first = self.map[index1];
        let second = self.map[index2];
        for slot in [first, second] {
            if slot != 0 {
                self.unlink(VectorElementId(slot));
            }
        }
        if first != 0 {
            self.elements[first].index = index2;
        }
        if second != 0 {
            self.elements[second].index = index1;
        }
        self.map[index1] = second;
        self.map[index2] = first;
        for slot in [first, second] {
            if slot != 0 {
                self.link(VectorElementId(slot));
            }
        }
    }

    /// Iterate over `(index, value)` pairs in increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        let mut cursor = self.first;
        std::iter::from_fn(move || {
            let id = cursor?;
            let element = &self.elements[id.0];
            cursor = element.below;
            Some((element.index, element.value))
        })
    }

    /// Set every value to zero, keeping the structure.
    pub fn reset(&mut self) {
        for element in &mut self.elements {
            element.value = T::zero();
        }
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn link(&mut self, id: VectorElementId) {
        let index = self.elements[id.0].index;
        let mut after = None;
        let mut cursor = self.first;
        while let Some(current) = cursor {
            if self.elements[current.0].index > index {
                break;
            }
            after = Some(current);
            cursor = self.elements[current.0].below;
        }

        let next = match after {
            Some(previous) => self.elements[previous.0].below,
            None => self.first,
        };
        self.elements[id.0].above = after;
        self.elements[id.0].below = next;
        match after {
            Some(previous) => self.elements[previous.0].below = Some(id),
            None => self.first = Some(id),
        }
        match next {
            Some(following) => self.elements[following.0].above = Some(id),
            None => self.last = Some(id),
        }
        self.map[index] = id.0;
    }

    fn unlink(&mut self, id: VectorElementId) {
        let element = &self.elements[id.0];
        let (above, below) = (element.above, element.below);
        match above {
            Some(previous) => self.elements[previous.0].below = below,
            None => self.first = below,
        }
        match below {
            Some(next) => self.elements[next.0].above = above,
            None => self.last = above,
        }
        self.elements[id.0].above = None;
        self.elements[id.0].below = None;
    }
}

impl<T> Index<VectorElementId> for SparseVector<T> {
    type Output = VectorElement<T>;

    fn index(&self, id: VectorElementId) -> &VectorElement<T> {
        &self.elements[id.0]
    }
}
