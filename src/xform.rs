//! The local-to-voxel transform: a per-axis voxel resolution that grounds
//! continuous sample coordinates to the integer lattice a [`crate::volume::Volume`]
//! addresses.
//!
//! There is deliberately no translation component: volumes support
//! negative indices and an unbounded grid, so the origin never needs to be
//! re-centred.

/// A scaling-only transform defined by the resolution of one voxel along
/// each axis. All three components must be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalXform {
    rx: f64,
    ry: f64,
    rz: f64,
}

impl Default for LocalXform {
    fn default() -> Self {
        Self { rx: 1.0, ry: 1.0, rz: 1.0 }
    }
}

impl LocalXform {
    /// Creates a new transform from per-axis resolutions. Panics if any
    /// component is not strictly positive — a voxel of zero or negative
    /// size is not a representable lattice.
    pub fn new(rx: f64, ry: f64, rz: f64) -> Self {
        assert!(rx > 0.0 && ry > 0.0 && rz > 0.0, "voxel resolution must be positive");
        Self { rx, ry, rz }
    }

    pub fn res(&self) -> (f64, f64, f64) {
        (self.rx, self.ry, self.rz)
    }

    pub fn res_x(&self) -> f64 {
        self.rx
    }

    pub fn res_y(&self) -> f64 {
        self.ry
    }

    pub fn res_z(&self) -> f64 {
        self.rz
    }

    /// Local (continuous, real-world) coordinates to voxel (continuous)
    /// coordinates: componentwise multiply by the resolution.
    pub fn local_to_voxel(&self, l: (f64, f64, f64)) -> (f64, f64, f64) {
        (l.0 * self.rx, l.1 * self.ry, l.2 * self.rz)
    }

    /// Inverse of [`Self::local_to_voxel`]: componentwise divide.
    pub fn voxel_to_local(&self, v: (f64, f64, f64)) -> (f64, f64, f64) {
        (v.0 / self.rx, v.1 / self.ry, v.2 / self.rz)
    }

    /// Voxel (continuous) coordinates to the lattice index that contains
    /// them: componentwise floor.
    pub fn voxel_to_index(&self, v: (f64, f64, f64)) -> (i64, i64, i64) {
        (v.0.floor() as i64, v.1.floor() as i64, v.2.floor() as i64)
    }

    /// Lattice index to voxel (continuous) coordinates: the index cast to
    /// a real, i.e. the minimum corner of that voxel.
    pub fn index_to_voxel(&self, i: (i64, i64, i64)) -> (f64, f64, f64) {
        (i.0 as f64, i.1 as f64, i.2 as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unit_resolution() {
        let xform = LocalXform::default();
        assert_eq!(xform.local_to_voxel((2.0, 3.0, 4.0)), (2.0, 3.0, 4.0));
    }

    #[test]
    fn local_to_voxel_and_back() {
        let xform = LocalXform::new(0.5, 2.0, 1.0);
        let local = (4.0, 1.0, 9.0);
        let voxel = xform.local_to_voxel(local);
        assert_eq!(voxel, (2.0, 2.0, 9.0));
        assert_eq!(xform.voxel_to_local(voxel), local);
    }

    #[test]
    fn voxel_to_index_floors() {
        let xform = LocalXform::default();
        assert_eq!(xform.voxel_to_index((1.9, -0.1, -2.1)), (1, -1, -3));
    }

    #[test]
    fn equality_is_componentwise() {
        assert_eq!(LocalXform::new(1.0, 2.0, 3.0), LocalXform::new(1.0, 2.0, 3.0));
        assert_ne!(LocalXform::new(1.0, 2.0, 3.0), LocalXform::new(1.0, 2.0, 3.1));
    }

    #[test]
    #[should_panic]
    fn zero_resolution_panics() {
        LocalXform::new(0.0, 1.0, 1.0);
    }
}
