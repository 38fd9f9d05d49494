//! [`Node`]: an interior tree level with `2^lg_node` children per side. A
//! child is either another `Node` (when `depth > 1`) or a [`crate::cell::Cell`]
//! (when `depth == 1`) — the choice is a tag carried by `depth`, not by an
//! enum per child, matching the recommendation to discriminate node-vs-cell
//! by depth rather than by inheritance.
//!
//! Children live in two arenas owned by [`crate::volume::Volume`]: one
//! `ObjectPool<Node<T>>`, one `ObjectPool<Cell<T>>`. A Node only ever holds
//! `u32` keys into whichever pool its depth says to use, which keeps the
//! tree free of owning pointers and makes a fill collapse a cheap `free`
//! per child rather than a recursive drop.

use crate::bitfield::BitField3D;
use crate::bits;
use crate::cell::Cell;
use crate::error::VoxError;
use crate::object_pool::ObjectPool;
use crate::policy::CombinePolicy;
use crate::voxel::VoxelValue;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Node<T: VoxelValue> {
    lg_node: u32,
    lg_cell: u32,
    depth: u32,
    fill_value: T,
    bits: BitField3D,
    /// `None` in fill state. `Some` holds one pool key per present child,
    /// in ascending bit order — a Cell-pool key when `depth == 1`, else a
    /// Node-pool key.
    children: Option<Vec<u32>>,
}

impl<T: VoxelValue> Default for Node<T> {
    fn default() -> Self {
        Self {
            lg_node: 0,
            lg_cell: 0,
            depth: 1,
            fill_value: T::default(),
            bits: BitField3D::new(0),
            children: None,
        }
    }
}

impl<T: VoxelValue> Node<T> {
    /// Creates a node in fill state. `depth` must be at least 1.
    pub fn new(lg_node: u32, lg_cell: u32, depth: u32, fill_value: T) -> Self {
        debug_assert!(depth >= 1);
        Self {
            lg_node,
            lg_cell,
            depth,
            fill_value,
            bits: BitField3D::new(lg_node),
            children: None,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_fill(&self) -> bool {
        self.children.is_none()
    }

    pub fn fill_value(&self) -> T {
        self.fill_value
    }

    /// Voxel side length of one child.
    pub fn compute_child_dim(&self) -> u64 {
        1u64 << (self.lg_cell + self.lg_node * (self.depth - 1))
    }

    /// Voxel side length of this node itself.
    pub fn compute_set_bounds(&self) -> u64 {
        self.compute_child_dim() << self.lg_node
    }

    fn child_slot(&self, i: u32, j: u32, k: u32) -> (u32, u32, u32) {
        let dim = self.compute_child_dim();
        ((u64::from(i) / dim) as u32, (u64::from(j) / dim) as u32, (u64::from(k) / dim) as u32)
    }

    fn child_local(&self, i: u32, j: u32, k: u32) -> (u32, u32, u32) {
        let dim = self.compute_child_dim();
        ((u64::from(i) % dim) as u32, (u64::from(j) % dim) as u32, (u64::from(k) % dim) as u32)
    }

    fn check_bounds(&self, i: u32, j: u32, k: u32) -> Result<(), VoxError> {
        let bound = self.compute_set_bounds();
        if u64::from(i) >= bound || u64::from(j) >= bound || u64::from(k) >= bound {
            return Err(VoxError::InvalidIndex {
                i: i64::from(i),
                j: i64::from(j),
                k: i64::from(k),
            });
        }
        Ok(())
    }

    pub fn get(
        &self,
        i: u32,
        j: u32,
        k: u32,
        node_pool: &ObjectPool<Node<T>>,
        cell_pool: &ObjectPool<Cell<T>>,
    ) -> Result<T, VoxError> {
        self.check_bounds(i, j, k)?;
        if self.children.is_none() {
            return Ok(self.fill_value);
        }
        let (si, sj, sk) = self.child_slot(i, j, k);
        if !self.bits.get(si, sj, sk)? {
            return Ok(self.fill_value);
        }
        let key = self.child_key(si, sj, sk);
        let (li, lj, lk) = self.child_local(i, j, k);
        if self.depth == 1 {
            cell_pool.get(key as usize).get(li, lj, lk)
        } else {
            node_pool.get(key as usize).get(li, lj, lk, node_pool, cell_pool)
        }
    }

    /// Writes `v` at `(i, j, k)`, materialising children on demand.
    pub fn set(
        &mut self,
        i: u32,
        j: u32,
        k: u32,
        v: T,
        node_pool: &mut ObjectPool<Node<T>>,
        cell_pool: &mut ObjectPool<Cell<T>>,
    ) -> Result<(), VoxError> {
        self.check_bounds(i, j, k)?;
        if self.children.is_none() {
            if v == self.fill_value {
                return Ok(());
            }
            self.expand(node_pool, cell_pool);
        }
        self.ensure_child(i, j, k, node_pool, cell_pool);
        let (si, sj, sk) = self.child_slot(i, j, k);
        let key = self.child_key(si, sj, sk);
        let (li, lj, lk) = self.child_local(i, j, k);
        if self.depth == 1 {
            let cell = cell_pool.get_mut(key as usize);
            cell.set(li, lj, lk, v)?;
            cell.try_collapse();
        } else {
            let mut child = std::mem::take(node_pool.get_mut(key as usize));
            let result = child.set(li, lj, lk, v, node_pool, cell_pool);
            *node_pool.get_mut(key as usize) = child;
            result?;
        }
        self.try_collapse(node_pool, cell_pool);
        Ok(())
    }

    /// Writes `combine(current, v)` at `(i, j, k)`.
    pub fn update(
        &mut self,
        i: u32,
        j: u32,
        k: u32,
        v: T,
        combine: CombinePolicy,
        node_pool: &mut ObjectPool<Node<T>>,
        cell_pool: &mut ObjectPool<Cell<T>>,
    ) -> Result<(), VoxError> {
        let current = self.get(i, j, k, node_pool, cell_pool)?;
        self.set(i, j, k, combine.apply(current, v), node_pool, cell_pool)
    }

    /// Materialises every child slot in fill state with the current fill
    /// value, and marks every bit present — a write is about to target
    /// exactly one of them.
    fn expand(&mut self, node_pool: &mut ObjectPool<Node<T>>, cell_pool: &mut ObjectPool<Cell<T>>) {
        let n = bits::num_bits_3d(self.lg_node) as usize;
        let mut children = Vec::with_capacity(n);
        for _ in 0..n {
            let key = if self.depth == 1 {
                cell_pool.push(Cell::new(self.lg_cell, self.fill_value))
            } else {
                node_pool.push(Node::new(self.lg_node, self.lg_cell, self.depth - 1, self.fill_value))
            };
            children.push(key as u32);
        }
        self.children = Some(children);
        self.bits.fill_all();
    }

    /// Materialises the single child slot covering `(i, j, k)` if absent,
    /// preserving the bit-order invariant on the sparse child list.
    fn ensure_child(
        &mut self,
        i: u32,
        j: u32,
        k: u32,
        node_pool: &mut ObjectPool<Node<T>>,
        cell_pool: &mut ObjectPool<Cell<T>>,
    ) {
        let (si, sj, sk) = self.child_slot(i, j, k);
        if self.bits.get(si, sj, sk).unwrap_or(false) {
            return;
        }
        let key = if self.depth == 1 {
            cell_pool.push(Cell::new(self.lg_cell, self.fill_value))
        } else {
            node_pool.push(Node::new(self.lg_node, self.lg_cell, self.depth - 1, self.fill_value))
        };
        self.bits.set(si, sj, sk).expect("slot already bounds-checked");
        let slot_linear = bits::linear_index(si, sj, sk, self.lg_node);
        let pos = self.bits.popcount_up_to(slot_linear) as usize;
        self.children.get_or_insert_with(Vec::new).insert(pos, key as u32);
    }

    fn child_key(&self, si: u32, sj: u32, sk: u32) -> u32 {
        let slot_linear = bits::linear_index(si, sj, sk, self.lg_node);
        let pos = self.bits.popcount_up_to(slot_linear) as usize;
        self.children.as_ref().expect("child slot present")[pos]
    }

    /// If every present child is itself collapsed fill state with the
    /// same value, and no child slot is absent, collapses this node to
    /// fill state too, freeing every child back to its pool.
    pub fn try_collapse(&mut self, node_pool: &mut ObjectPool<Node<T>>, cell_pool: &mut ObjectPool<Cell<T>>) -> bool {
        if self.children.is_none() || !self.bits.is_all_set() {
            return false;
        }
        let children = self.children.as_ref().unwrap();
        let uniform_value = if self.depth == 1 {
            let first = cell_pool.get(children[0] as usize);
            if !first.is_fill() {
                return false;
            }
            first.fill_value()
        } else {
            let first = node_pool.get(children[0] as usize);
            if !first.is_fill() {
                return false;
            }
            first.fill_value()
        };
        let uniform = children.iter().all(|&key| {
            if self.depth == 1 {
                let c = cell_pool.get(key as usize);
                c.is_fill() && c.fill_value() == uniform_value
            } else {
                let n = node_pool.get(key as usize);
                n.is_fill() && n.fill_value() == uniform_value
            }
        });
        if !uniform {
            return false;
        }
        let children = self.children.take().unwrap();
        for key in children {
            if self.depth == 1 {
                cell_pool.free(key as usize);
            } else {
                node_pool.free(key as usize);
            }
        }
        self.fill_value = uniform_value;
        // Mark observably filled (as opposed to the all-clear "untouched"
        // state from construction) so an iterator descending into this
        // now-collapsed subtree still knows to enumerate it, via
        // `FilledBoundsIterator`, rather than skip it as empty.
        self.bits.fill_all();
        true
    }

    /// `true` when this node is in fill state *and* that state represents
    /// a collapsed, observably-occupied subtree rather than one that was
    /// simply never written to.
    pub(crate) fn is_filled_marker(&self) -> bool {
        self.children.is_none() && self.bits.is_all_set()
    }

    /// A set-iterator over this node's bitfield, aligned to its sparse
    /// child list.
    pub fn branch_iterator(&self) -> crate::iter::NodeSetIterator<'_, T> {
        crate::iter::NodeSetIterator::new(self)
    }

    /// Read-only access for the iteration framework.
    pub(crate) fn bits(&self) -> &BitField3D {
        &self.bits
    }

    pub(crate) fn children_keys(&self) -> Option<&[u32]> {
        self.children.as_deref()
    }

    pub(crate) fn lg_node(&self) -> u32 {
        self.lg_node
    }

    pub(crate) fn lg_cell(&self) -> u32 {
        self.lg_cell
    }

    /// `log2` of this node's own voxel side length.
    pub(crate) fn total_lg(&self) -> u32 {
        self.lg_cell + self.lg_node * self.depth
    }

    /// Reassembles a node from its raw parts, as persisted by
    /// [`crate::io::bytecode`].
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        lg_node: u32,
        lg_cell: u32,
        depth: u32,
        fill_value: T,
        bits: BitField3D,
        children: Option<Vec<u32>>,
    ) -> Self {
        Self { lg_node, lg_cell, depth, fill_value, bits, children }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pools() -> (ObjectPool<Node<f32>>, ObjectPool<Cell<f32>>) {
        (ObjectPool::with_capacity(8), ObjectPool::with_capacity(8))
    }

    #[test]
    fn fresh_node_reads_fill_value() {
        let (node_pool, cell_pool) = pools();
        let node = Node::<f32>::new(2, 2, 2, 0.0);
        assert_eq!(node.get(5, 5, 5, &node_pool, &cell_pool).unwrap(), 0.0);
        assert!(node.is_fill());
    }

    #[test]
    fn set_then_get_matches_through_two_levels() {
        let (mut node_pool, mut cell_pool) = pools();
        let mut node = Node::<f32>::new(2, 2, 2, 0.0);
        node.set(5, 6, 7, 9.0, &mut node_pool, &mut cell_pool).unwrap();
        assert_eq!(node.get(5, 6, 7, &node_pool, &cell_pool).unwrap(), 9.0);
        assert_eq!(node.get(0, 0, 0, &node_pool, &cell_pool).unwrap(), 0.0);
        assert!(!node.is_fill());
    }

    #[test]
    fn setting_fill_value_on_fresh_node_does_not_expand() {
        let (mut node_pool, mut cell_pool) = pools();
        let mut node = Node::<f32>::new(2, 2, 2, 0.0);
        node.set(1, 1, 1, 0.0, &mut node_pool, &mut cell_pool).unwrap();
        assert!(node.is_fill());
    }

    #[test]
    fn writing_whole_node_same_value_collapses() {
        let (mut node_pool, mut cell_pool) = pools();
        let mut node = Node::<f32>::new(2, 2, 1, 0.0);
        let bound = node.compute_set_bounds() as u32;
        for i in 0..bound {
            for j in 0..bound {
                for k in 0..bound {
                    node.set(i, j, k, 4.0, &mut node_pool, &mut cell_pool).unwrap();
                }
            }
        }
        assert!(node.is_fill());
        assert_eq!(node.fill_value(), 4.0);
    }

    #[test]
    fn out_of_range_is_invalid_index() {
        let (node_pool, cell_pool) = pools();
        let node = Node::<f32>::new(2, 2, 2, 0.0);
        let bound = node.compute_set_bounds() as u32;
        assert!(matches!(
            node.get(bound, 0, 0, &node_pool, &cell_pool),
            Err(VoxError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn update_with_add_policy_accumulates_through_child() {
        let (mut node_pool, mut cell_pool) = pools();
        let mut node = Node::<f32>::new(2, 2, 2, 0.0);
        node.update(1, 1, 1, 2.0, CombinePolicy::Add, &mut node_pool, &mut cell_pool).unwrap();
        node.update(1, 1, 1, 3.0, CombinePolicy::Add, &mut node_pool, &mut cell_pool).unwrap();
        assert_eq!(node.get(1, 1, 1, &node_pool, &cell_pool).unwrap(), 5.0);
    }
}
