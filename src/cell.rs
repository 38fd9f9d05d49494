//! [`Cell`]: the dense leaf of the tree. A cell covers `2^lg_size` voxels
//! per side and is either in *fill state* (no array allocated, every voxel
//! reads the fill value) or *expanded state* (a dense array plus a
//! bitfield marking which positions were explicitly touched since the
//! last collapse).
//!
//! The fill-state bitfield convention matters for iteration (see
//! [`crate::iter`]): all-bits-set means "every voxel is observably occupied
//! by the fill value" (a filled cube, visited by a
//! [`crate::iter::FilledBoundsIterator`]); all-bits-clear means "empty",
//! visited by nothing at all. The two are observably identical through
//! `get`, but diverge through iteration — see the Open Questions note on
//! this in the design docs.

use crate::bitfield::BitField3D;
use crate::bits;
use crate::error::VoxError;
use crate::policy::CombinePolicy;
use crate::voxel::VoxelValue;

/// Default leaf size: side 4 (64 voxels).
pub const DEFAULT_LG_CELL: u32 = 2;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell<T: VoxelValue> {
    lg_size: u32,
    fill_value: T,
    bits: BitField3D,
    /// `None` while in fill state; `Some` dense array of
    /// `2^(3*lg_size)` values while expanded.
    array: Option<Vec<T>>,
}

impl<T: VoxelValue> Default for Cell<T> {
    /// An empty, zero-sized cell. Only meaningful as a placeholder slot
    /// inside an [`crate::object_pool::ObjectPool`] before a real cell is
    /// pushed into it.
    fn default() -> Self {
        Self {
            lg_size: 0,
            fill_value: T::default(),
            bits: BitField3D::new(0),
            array: None,
        }
    }
}

impl<T: VoxelValue> Cell<T> {
    /// Creates a cell of the given size in fill state, with no voxels
    /// "set" (an empty cube).
    pub fn new(lg_size: u32, fill_value: T) -> Self {
        Self {
            lg_size,
            fill_value,
            bits: BitField3D::new(lg_size),
            array: None,
        }
    }

    pub fn lg_size(&self) -> u32 {
        self.lg_size
    }

    pub fn is_fill(&self) -> bool {
        self.array.is_none()
    }

    pub fn fill_value(&self) -> T {
        self.fill_value
    }

    #[inline]
    fn check_bounds(&self, i: u32, j: u32, k: u32) -> Result<u64, VoxError> {
        let side = bits::side_len(self.lg_size);
        if i >= side || j >= side || k >= side {
            return Err(VoxError::InvalidIndex {
                i: i64::from(i),
                j: i64::from(j),
                k: i64::from(k),
            });
        }
        Ok(bits::linear_index(i, j, k, self.lg_size))
    }

    /// The value stored at `(i, j, k)`: the array slot if expanded and
    /// set, otherwise the fill value.
    pub fn get(&self, i: u32, j: u32, k: u32) -> Result<T, VoxError> {
        let idx = self.check_bounds(i, j, k)?;
        match &self.array {
            Some(array) if self.bits.get(i, j, k)? => Ok(array[idx as usize]),
            _ => Ok(self.fill_value),
        }
    }

    /// Writes `v` at `(i, j, k)`.
    ///
    /// Staying in fill state when `v == m_fill` is what keeps an
    /// untouched-but-rewritten voxel from ever allocating storage (a
    /// tested invariant, see [`crate::cell`] tests and the crate-level
    /// property tests).
    pub fn set(&mut self, i: u32, j: u32, k: u32, v: T) -> Result<(), VoxError> {
        self.check_bounds(i, j, k)?;
        if self.array.is_none() {
            if v == self.fill_value {
                self.bits.set(i, j, k)?;
                return Ok(());
            }
            self.expand();
        }
        let idx = self.check_bounds(i, j, k)?;
        self.array.as_mut().unwrap()[idx as usize] = v;
        self.bits.set(i, j, k)?;
        Ok(())
    }

    /// Writes `combine(current, v)` at `(i, j, k)`, where `current` is
    /// the value presently stored there (or the fill value).
    pub fn update(
        &mut self,
        i: u32,
        j: u32,
        k: u32,
        v: T,
        combine: CombinePolicy,
    ) -> Result<(), VoxError> {
        let current = self.get(i, j, k)?;
        self.set(i, j, k, combine.apply(current, v))
    }

    /// Clears the bit at `(i, j, k)`; the array slot, if any, is left
    /// alone since it is no longer observable (the cell reads `m_fill`
    /// there again).
    pub fn unset(&mut self, i: u32, j: u32, k: u32) -> Result<(), VoxError> {
        self.check_bounds(i, j, k)?;
        self.bits.clear(i, j, k)
    }

    /// Forces fill state with a new fill value; the whole cell now reads
    /// `v` and every bit is set (observably occupied, per the fill-state
    /// convention above).
    pub fn fill(&mut self, v: T) {
        self.fill_value = v;
        self.array = None;
        self.bits.fill_all();
    }

    /// Fill state with the current fill value, but empty (no bits set).
    pub fn clear(&mut self) {
        self.array = None;
        self.bits.clear_all();
    }

    fn expand(&mut self) {
        let len = bits::num_bits_3d(self.lg_size) as usize;
        self.array = Some(vec![self.fill_value; len]);
    }

    /// If every array slot equals a single value `v` and every bit agrees
    /// (all-zero or all-one), collapses back to fill state with value
    /// `v`. Returns whether a collapse happened.
    pub fn try_collapse(&mut self) -> bool {
        let Some(array) = &self.array else { return false };
        if !(self.bits.is_all_set() || self.bits.is_none_set()) {
            return false;
        }
        let first = array[0];
        if !array.iter().all(|v| *v == first) {
            return false;
        }
        let was_all_set = self.bits.is_all_set();
        self.fill_value = first;
        self.array = None;
        if was_all_set {
            self.bits.fill_all();
        } else {
            self.bits.clear_all();
        }
        true
    }

    /// Yields `(linear index, value)` for every set bit, in ascending
    /// order. In fill state (all bits set), this enumerates the whole
    /// cube at the fill value; in expanded state, it reads back through
    /// the array.
    pub fn set_iterator(&self) -> CellSetIterator<'_, T> {
        CellSetIterator {
            cell: self,
            bits: self.bits.set_iterator(0),
        }
    }

    /// Reassembles a cell from its raw parts, as persisted by
    /// [`crate::io::bytecode`].
    pub(crate) fn from_parts(lg_size: u32, fill_value: T, bits: BitField3D, array: Option<Vec<T>>) -> Self {
        Self { lg_size, fill_value, bits, array }
    }

    pub(crate) fn bits_for_encoding(&self) -> &BitField3D {
        &self.bits
    }

    pub(crate) fn array_for_encoding(&self) -> Option<&Vec<T>> {
        self.array.as_ref()
    }
}

/// A value-producing iterator over a cell's set bits (see
/// [`crate::iter`] for how this slots into the stacked tree iterator).
pub struct CellSetIterator<'a, T: VoxelValue> {
    cell: &'a Cell<T>,
    bits: crate::bitfield::BitSetIterator<'a>,
}

impl<'a, T: VoxelValue> CellSetIterator<'a, T> {
    pub fn valid(&self) -> bool {
        self.bits.valid()
    }

    /// Advances to the next set bit, returning its local `(i, j, k, v)`.
    pub fn advance(&mut self) -> Option<(u32, u32, u32, T)> {
        let idx = self.bits.advance()?;
        let (i, j, k) = bits::coords_from_linear(idx, self.cell.lg_size);
        let v = match &self.cell.array {
            Some(array) => array[idx as usize],
            None => self.cell.fill_value,
        };
        Some((i, j, k, v))
    }

    pub fn coordinates(&self) -> Option<(u32, u32, u32)> {
        self.bits.coordinates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reads_fill_value() {
        let cell = Cell::<f32>::new(DEFAULT_LG_CELL, 0.0);
        assert_eq!(cell.get(1, 1, 1).unwrap(), 0.0);
        assert!(cell.is_fill());
    }

    #[test]
    fn set_then_get_matches() {
        let mut cell = Cell::<f32>::new(DEFAULT_LG_CELL, 0.0);
        cell.set(1, 2, 3, 5.0).unwrap();
        assert_eq!(cell.get(1, 2, 3).unwrap(), 5.0);
        assert_eq!(cell.get(0, 0, 0).unwrap(), 0.0);
        assert!(!cell.is_fill());
    }

    #[test]
    fn setting_fill_value_does_not_expand() {
        let mut cell = Cell::<f32>::new(DEFAULT_LG_CELL, 0.0);
        cell.set(1, 1, 1, 0.0).unwrap();
        assert!(cell.is_fill());
    }

    #[test]
    fn writing_every_voxel_same_value_collapses() {
        let mut cell = Cell::<f32>::new(DEFAULT_LG_CELL, 0.0);
        let side = bits::side_len(DEFAULT_LG_CELL);
        for i in 0..side {
            for j in 0..side {
                for k in 0..side {
                    cell.set(i, j, k, 1.0).unwrap();
                }
            }
        }
        assert!(cell.try_collapse());
        assert!(cell.is_fill());
        assert_eq!(cell.fill_value(), 1.0);
        assert_eq!(cell.get(3, 3, 3).unwrap(), 1.0);
    }

    #[test]
    fn set_iterator_yields_each_written_voxel_once() {
        let mut cell = Cell::<f32>::new(DEFAULT_LG_CELL, 0.0);
        cell.set(0, 0, 0, 1.0).unwrap();
        let mut iter = cell.set_iterator();
        let mut results = Vec::new();
        while iter.valid() {
            results.push(iter.advance().unwrap());
        }
        assert_eq!(results, vec![(0, 0, 0, 1.0)]);
    }

    #[test]
    fn all_default_cell_iterates_to_nothing() {
        let cell = Cell::<f32>::new(DEFAULT_LG_CELL, 0.0);
        let mut iter = cell.set_iterator();
        assert!(!iter.valid());
        assert_eq!(iter.advance(), None);
    }

    #[test]
    fn idempotent_set() {
        let mut a = Cell::<f32>::new(DEFAULT_LG_CELL, 0.0);
        a.set(1, 1, 1, 2.0).unwrap();
        a.set(1, 1, 1, 2.0).unwrap();
        let mut b = Cell::<f32>::new(DEFAULT_LG_CELL, 0.0);
        b.set(1, 1, 1, 2.0).unwrap();
        assert_eq!(a.get(1, 1, 1).unwrap(), b.get(1, 1, 1).unwrap());
        assert_eq!(a.is_fill(), b.is_fill());
    }

    #[test]
    fn unset_reverts_to_fill_value() {
        let mut cell = Cell::<f32>::new(DEFAULT_LG_CELL, 0.0);
        cell.set(1, 1, 1, 2.0).unwrap();
        cell.unset(1, 1, 1).unwrap();
        assert_eq!(cell.get(1, 1, 1).unwrap(), 0.0);
    }

    #[test]
    fn update_with_add_policy_accumulates() {
        let mut cell = Cell::<f32>::new(DEFAULT_LG_CELL, 0.0);
        cell.update(0, 0, 0, 1.0, CombinePolicy::Add).unwrap();
        cell.update(0, 0, 0, 2.0, CombinePolicy::Add).unwrap();
        assert_eq!(cell.get(0, 0, 0).unwrap(), 3.0);
    }
}
