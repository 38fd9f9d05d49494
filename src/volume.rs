//! [`Volume`]: the outward-facing octree container. Eight quadrant
//! [`Node`] roots partition signed index space by sign octant; a Volume
//! routes a signed `(i, j, k)` to its quadrant, converts to unsigned
//! per-octant coordinates, and delegates to that quadrant's root.

use crate::bits;
use crate::cell::Cell;
use crate::error::VoxError;
use crate::node::Node;
use crate::object_pool::ObjectPool;
use crate::policy::CombinePolicy;
use crate::voxel::VoxelValue;
use crate::xform::LocalXform;

/// Default child fan-out per node level: side 4 (64 children).
pub const DEFAULT_LG_NODE: u32 = 2;

pub struct Volume<T: VoxelValue> {
    roots: [Node<T>; 8],
    node_pool: ObjectPool<Node<T>>,
    cell_pool: ObjectPool<Cell<T>>,
    fill_value: T,
    lg_node: u32,
    lg_cell: u32,
    depth: u32,
    xform: LocalXform,
}

impl<T: VoxelValue> Volume<T> {
    /// Creates an empty volume. `depth` is the number of Node levels
    /// beneath each quadrant root before reaching Cell leaves (depth 1
    /// means the root's children are Cells directly).
    pub fn new(lg_node: u32, lg_cell: u32, depth: u32, fill_value: T) -> Self {
        Self::with_xform(lg_node, lg_cell, depth, fill_value, LocalXform::default())
    }

    pub fn with_xform(lg_node: u32, lg_cell: u32, depth: u32, fill_value: T, xform: LocalXform) -> Self {
        debug_assert!(depth >= 1);
        let roots = std::array::from_fn(|_| Node::new(lg_node, lg_cell, depth, fill_value));
        Self {
            roots,
            node_pool: ObjectPool::with_capacity(64),
            cell_pool: ObjectPool::with_capacity(64),
            fill_value,
            lg_node,
            lg_cell,
            depth,
            xform,
        }
    }

    pub fn fill_value(&self) -> T {
        self.fill_value
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn lg_node(&self) -> u32 {
        self.lg_node
    }

    pub fn lg_cell(&self) -> u32 {
        self.lg_cell
    }

    pub fn xform(&self) -> &LocalXform {
        &self.xform
    }

    fn route(i: i64, j: i64, k: i64) -> (u8, u32, u32, u32) {
        let q = bits::quadrant(i, j, k);
        let (ui, uj, uk) = bits::quadrant_offsets(i, j, k, q);
        (q, ui, uj, uk)
    }

    pub fn get(&self, i: i64, j: i64, k: i64) -> Result<T, VoxError> {
        let (q, ui, uj, uk) = Self::route(i, j, k);
        self.roots[q as usize].get(ui, uj, uk, &self.node_pool, &self.cell_pool)
    }

    pub fn set(&mut self, i: i64, j: i64, k: i64, v: T) -> Result<(), VoxError> {
        let (q, ui, uj, uk) = Self::route(i, j, k);
        self.roots[q as usize].set(ui, uj, uk, v, &mut self.node_pool, &mut self.cell_pool)
    }

    pub fn update(&mut self, i: i64, j: i64, k: i64, v: T, combine: CombinePolicy) -> Result<(), VoxError> {
        let (q, ui, uj, uk) = Self::route(i, j, k);
        self.roots[q as usize].update(ui, uj, uk, v, combine, &mut self.node_pool, &mut self.cell_pool)
    }

    pub fn local_to_voxel(&self, l: (f64, f64, f64)) -> (f64, f64, f64) {
        self.xform.local_to_voxel(l)
    }

    pub fn voxel_to_local(&self, v: (f64, f64, f64)) -> (f64, f64, f64) {
        self.xform.voxel_to_local(v)
    }

    pub fn voxel_to_index(&self, v: (f64, f64, f64)) -> (i64, i64, i64) {
        self.xform.voxel_to_index(v)
    }

    pub fn index_to_voxel(&self, i: (i64, i64, i64)) -> (f64, f64, f64) {
        self.xform.index_to_voxel(i)
    }

    /// Starts a stacked tree iterator over every set voxel, rooted at
    /// quadrant 0 and advancing through quadrants in ascending order.
    pub fn iterator_begin(&self) -> crate::iter::SetIterator<'_, T> {
        crate::iter::SetIterator::new(self)
    }

    pub(crate) fn root(&self, q: u8) -> &Node<T> {
        &self.roots[q as usize]
    }

    pub(crate) fn node_pool(&self) -> &ObjectPool<Node<T>> {
        &self.node_pool
    }

    pub(crate) fn cell_pool(&self) -> &ObjectPool<Cell<T>> {
        &self.cell_pool
    }

    pub(crate) fn roots(&self) -> &[Node<T>; 8] {
        &self.roots
    }

    /// Reassembles a volume from its raw parts, as persisted by
    /// [`crate::io::bytecode`].
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        roots: [Node<T>; 8],
        node_pool: ObjectPool<Node<T>>,
        cell_pool: ObjectPool<Cell<T>>,
        fill_value: T,
        lg_node: u32,
        lg_cell: u32,
        depth: u32,
        xform: LocalXform,
    ) -> Self {
        Self { roots, node_pool, cell_pool, fill_value, lg_node, lg_cell, depth, xform }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_volume_reads_fill_everywhere() {
        let vol = Volume::<f32>::new(DEFAULT_LG_NODE, 2, 2, 0.0);
        assert_eq!(vol.get(0, 0, 0).unwrap(), 0.0);
        assert_eq!(vol.get(-5, 3, -9).unwrap(), 0.0);
    }

    #[test]
    fn write_then_read_back_single_voxel() {
        let mut vol = Volume::<f32>::new(DEFAULT_LG_NODE, 2, 2, 0.0);
        vol.set(0, 0, 0, 1.0).unwrap();
        assert_eq!(vol.get(0, 0, 0).unwrap(), 1.0);
        assert_eq!(vol.get(1, 0, 0).unwrap(), 0.0);
    }

    #[test]
    fn negative_coordinates_route_through_quadrants_and_roundtrip() {
        let mut vol = Volume::<f32>::new(DEFAULT_LG_NODE, 2, 2, 0.0);
        vol.set(-1, -2, -1, 3.0).unwrap();
        assert_eq!(vol.get(-1, -2, -1).unwrap(), 3.0);
        assert_eq!(vol.get(-1, -2, 0).unwrap(), 0.0);
    }

    #[test]
    fn origin_is_unique_to_quadrant_zero() {
        assert_eq!(bits::quadrant(0, 0, 0), 0);
        let mut vol = Volume::<f32>::new(DEFAULT_LG_NODE, 2, 2, 0.0);
        vol.set(0, 0, 0, 7.0).unwrap();
        assert_eq!(vol.get(0, 0, 0).unwrap(), 7.0);
        assert_eq!(vol.get(-1, -1, -1).unwrap(), 0.0);
    }

    #[test]
    fn update_combines_across_octree_descent() {
        let mut vol = Volume::<f32>::new(DEFAULT_LG_NODE, 2, 2, 0.0);
        vol.update(2, 2, 2, 5.0, CombinePolicy::Add).unwrap();
        vol.update(2, 2, 2, 2.0, CombinePolicy::Add).unwrap();
        assert_eq!(vol.get(2, 2, 2).unwrap(), 7.0);
    }
}
