//! The iteration framework: a stacked descent through a [`crate::volume::Volume`]
//! that visits every explicitly-set voxel in deterministic order.
//!
//! Four variants make up the abstract iterator described by the container:
//! [`crate::cell::CellSetIterator`] (value-producing, wraps a Cell's own
//! bitfield), [`FilledBoundsIterator`] (value-producing, enumerates a
//! collapsed-to-filled Node subtree as if it were dense), [`NodeSetIterator`]
//! (not value-producing, walks a Node's present child slots), and
//! [`SetIterator`], the user-visible stack of the first three.
//!
//! A Node's own fill state can mean two different things that read
//! identically through `get` but iterate differently: genuinely untouched
//! (nothing to report) or collapsed after every descendant agreed on one
//! value (report the whole subtree once, via `FilledBoundsIterator`). The
//! two are told apart by whether the node's bitfield is all-set or
//! all-clear — see [`crate::node::Node::is_filled_marker`].

use crate::bits;
use crate::cell::CellSetIterator;
use crate::node::Node;
use crate::volume::Volume;
use crate::voxel::VoxelValue;

/// Enumerates every voxel inside a collapsed, observably-filled Node
/// subtree, in ascending linear order, all at the same value.
pub struct FilledBoundsIterator<T: VoxelValue> {
    origin: (u64, u64, u64),
    lg_size: u32,
    value: T,
    next: u64,
    total: u64,
}

impl<T: VoxelValue> FilledBoundsIterator<T> {
    pub fn new(origin: (u64, u64, u64), lg_size: u32, value: T) -> Self {
        Self {
            origin,
            lg_size,
            value,
            next: 0,
            total: bits::num_bits_3d(lg_size),
        }
    }

    pub fn valid(&self) -> bool {
        self.next < self.total
    }

    fn local(&self) -> Option<(u32, u32, u32)> {
        if !self.valid() {
            return None;
        }
        Some(bits::coords_from_linear(self.next, self.lg_size))
    }

    pub fn advance(&mut self) -> Option<(u32, u32, u32, T)> {
        let (li, lj, lk) = self.local()?;
        self.next += 1;
        Some((
            (self.origin.0 + u64::from(li)) as u32,
            (self.origin.1 + u64::from(lj)) as u32,
            (self.origin.2 + u64::from(lk)) as u32,
            self.value,
        ))
    }

    pub fn coordinates(&self) -> Option<(u32, u32, u32)> {
        let (li, lj, lk) = self.local()?;
        Some((
            (self.origin.0 + u64::from(li)) as u32,
            (self.origin.1 + u64::from(lj)) as u32,
            (self.origin.2 + u64::from(lk)) as u32,
        ))
    }
}

/// A non-value-producing set-iterator over a Node's present child slots,
/// aligned to its sparse child list (spec's "branch iterator").
pub struct NodeSetIterator<'a, T: VoxelValue> {
    node: &'a Node<T>,
    bits: crate::bitfield::BitSetIterator<'a>,
}

impl<'a, T: VoxelValue> NodeSetIterator<'a, T> {
    pub(crate) fn new(node: &'a Node<T>) -> Self {
        Self {
            node,
            bits: node.bits().set_iterator(0),
        }
    }

    pub fn valid(&self) -> bool {
        self.bits.valid()
    }

    pub fn advance(&mut self) {
        self.bits.advance();
    }

    pub fn slot_coordinates(&self) -> Option<(u32, u32, u32)> {
        self.bits.coordinates()
    }

    pub fn current_child_key(&self) -> Option<u32> {
        let idx = self.bits.current()?;
        let pos = self.node.bits().popcount_up_to(idx) as usize;
        self.node.children_keys().map(|children| children[pos])
    }
}

struct StackFrame<'a, T: VoxelValue> {
    iter: NodeSetIterator<'a, T>,
    origin: (u64, u64, u64),
    child_dim: u64,
    child_is_cell: bool,
}

enum ValueFrame<'a, T: VoxelValue> {
    Cell(CellSetIterator<'a, T>, (u64, u64, u64)),
    Filled(FilledBoundsIterator<T>),
}

/// The user-visible stacked iterator over a [`Volume`]'s set voxels.
/// Single-pass: once dropped or exhausted it cannot be restarted in
/// place, only rebuilt via [`Volume::iterator_begin`].
pub struct SetIterator<'a, T: VoxelValue> {
    volume: &'a Volume<T>,
    quadrant: u8,
    frames: Vec<StackFrame<'a, T>>,
    value: Option<ValueFrame<'a, T>>,
}

impl<'a, T: VoxelValue> SetIterator<'a, T> {
    pub(crate) fn new(volume: &'a Volume<T>) -> Self {
        let mut it = Self {
            volume,
            quadrant: 0,
            frames: Vec::new(),
            value: None,
        };
        it.enter_quadrant();
        if it.value.is_none() {
            it.establish_value_frame();
        }
        it
    }

    fn frame_for(node: &'a Node<T>) -> StackFrame<'a, T> {
        StackFrame {
            iter: node.branch_iterator(),
            origin: (0, 0, 0),
            child_dim: node.compute_child_dim(),
            child_is_cell: node.depth() == 1,
        }
    }

    /// Enters `self.quadrant`'s root. A root can be in any of the three
    /// states a descendant child can: a collapsed, observably-filled
    /// subtree (emit a `FilledBoundsIterator` directly — there is no
    /// branch iterator to descend through), a plain untouched fill
    /// (nothing to report, leave `frames` empty for the caller to move
    /// on), or a real subtree (push a branch-iterator frame).
    fn enter_quadrant(&mut self) {
        let root = self.volume.root(self.quadrant);
        if root.is_filled_marker() {
            self.value = Some(ValueFrame::Filled(FilledBoundsIterator::new(
                (0, 0, 0),
                root.total_lg(),
                root.fill_value(),
            )));
        } else if !root.is_fill() {
            self.frames.push(Self::frame_for(root));
        }
    }

    /// Repairs the stack so `self.value`, if `Some`, is positioned at the
    /// next value-producing frame to read from. Sets it to `None` once
    /// every quadrant is exhausted.
    fn establish_value_frame(&mut self) {
        loop {
            while self.frames.is_empty() {
                if self.quadrant >= 7 {
                    self.value = None;
                    return;
                }
                self.quadrant += 1;
                self.enter_quadrant();
                if self.value.is_some() {
                    return;
                }
            }

            let top_valid = self.frames.last().unwrap().iter.valid();
            if !top_valid {
                self.frames.pop();
                if let Some(parent) = self.frames.last_mut() {
                    parent.iter.advance();
                }
                continue;
            }

            let (slot, key, origin, child_dim, child_is_cell) = {
                let top = self.frames.last().unwrap();
                let slot = top.iter.slot_coordinates().unwrap();
                let key = top.iter.current_child_key().unwrap();
                (slot, key, top.origin, top.child_dim, top.child_is_cell)
            };
            let child_origin = (
                origin.0 + u64::from(slot.0) * child_dim,
                origin.1 + u64::from(slot.1) * child_dim,
                origin.2 + u64::from(slot.2) * child_dim,
            );

            if child_is_cell {
                let cell = self.volume.cell_pool().get(key as usize);
                self.value = Some(ValueFrame::Cell(cell.set_iterator(), child_origin));
                return;
            }

            let child_node = self.volume.node_pool().get(key as usize);
            if child_node.is_filled_marker() {
                self.value = Some(ValueFrame::Filled(FilledBoundsIterator::new(
                    child_origin,
                    child_node.total_lg(),
                    child_node.fill_value(),
                )));
                return;
            }
            if child_node.is_fill() {
                // Present but untouched: nothing to report from this
                // branch, move on to the next sibling slot.
                self.frames.last_mut().unwrap().iter.advance();
                continue;
            }
            self.frames.push(StackFrame {
                iter: child_node.branch_iterator(),
                origin: child_origin,
                child_dim: child_node.compute_child_dim(),
                child_is_cell: child_node.depth() == 1,
            });
        }
    }

    fn to_world(&self, i: u32, j: u32, k: u32) -> (i64, i64, i64) {
        bits::quadrant_offsets_inverse(i, j, k, self.quadrant)
    }

    /// `true` while there is at least one more tuple to yield.
    pub fn valid(&self) -> bool {
        match &self.value {
            Some(ValueFrame::Cell(it, _)) => it.valid(),
            Some(ValueFrame::Filled(it)) => it.valid(),
            None => false,
        }
    }

    /// The signed world coordinates the iterator currently sits on,
    /// without advancing.
    pub fn coordinates(&self) -> Option<(i64, i64, i64)> {
        match &self.value {
            Some(ValueFrame::Cell(it, origin)) => it.coordinates().map(|(li, lj, lk)| {
                self.to_world(
                    (origin.0 + u64::from(li)) as u32,
                    (origin.1 + u64::from(lj)) as u32,
                    (origin.2 + u64::from(lk)) as u32,
                )
            }),
            Some(ValueFrame::Filled(it)) => it.coordinates().map(|(i, j, k)| self.to_world(i, j, k)),
            None => None,
        }
    }
}

impl<'a, T: VoxelValue> Iterator for SetIterator<'a, T> {
    type Item = (i64, i64, i64, T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let advanced = match &mut self.value {
                Some(ValueFrame::Cell(it, origin)) => it.advance().map(|(li, lj, lk, v)| {
                    let (i, j, k) = self.to_world(
                        (origin.0 + u64::from(li)) as u32,
                        (origin.1 + u64::from(lj)) as u32,
                        (origin.2 + u64::from(lk)) as u32,
                    );
                    (i, j, k, v)
                }),
                Some(ValueFrame::Filled(it)) => it.advance().map(|(i, j, k, v)| {
                    let (i, j, k) = self.to_world(i, j, k);
                    (i, j, k, v)
                }),
                None => None,
            };
            if let Some(item) = advanced {
                return Some(item);
            }
            if self.value.is_none() {
                return None;
            }
            if let Some(parent) = self.frames.last_mut() {
                parent.iter.advance();
            }
            self.establish_value_frame();
            if self.value.is_none() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CombinePolicy;

    #[test]
    fn empty_volume_iterates_to_nothing() {
        let vol = Volume::<f32>::new(2, 2, 2, 0.0);
        let mut it = vol.iterator_begin();
        assert!(!it.valid());
        assert_eq!(it.next(), None);
    }

    #[test]
    fn single_write_yields_single_tuple() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        vol.set(0, 0, 0, 1.0).unwrap();
        let results: Vec<_> = vol.iterator_begin().collect();
        assert_eq!(results, vec![(0, 0, 0, 1.0)]);
    }

    #[test]
    fn collapsed_cell_yields_all_64_points_in_linear_order() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        for k in 0..4i64 {
            for j in 0..4i64 {
                for i in 0..4i64 {
                    vol.set(i, j, k, 1.0).unwrap();
                }
            }
        }
        let results: Vec<_> = vol.iterator_begin().collect();
        assert_eq!(results.len(), 64);
        assert_eq!(results[0], (0, 0, 0, 1.0));
        assert_eq!(results.last().copied().unwrap(), (3, 3, 3, 1.0));
        assert_eq!(vol.get(4, 0, 0).unwrap(), 0.0);
    }

    #[test]
    fn negative_coordinates_round_trip_through_iteration() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        vol.set(-1, -2, -1, 3.0).unwrap();
        let results: Vec<_> = vol.iterator_begin().collect();
        assert_eq!(results, vec![(-1, -2, -1, 3.0)]);
    }

    #[test]
    fn two_quadrants_visited_in_ascending_order() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        vol.set(-1, -1, -1, 9.0).unwrap(); // quadrant 0b111 = 7
        vol.set(0, 0, 0, 1.0).unwrap(); // quadrant 0
        let results: Vec<_> = vol.iterator_begin().collect();
        assert_eq!(results, vec![(0, 0, 0, 1.0), (-1, -1, -1, 9.0)]);
    }

    #[test]
    fn update_then_iterate_reflects_combined_value() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        vol.update(1, 1, 1, 2.0, CombinePolicy::Add).unwrap();
        vol.update(1, 1, 1, 3.0, CombinePolicy::Add).unwrap();
        let results: Vec<_> = vol.iterator_begin().collect();
        assert_eq!(results, vec![(1, 1, 1, 5.0)]);
    }
}
