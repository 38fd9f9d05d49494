use crate::error::VoxError;
use crate::policy::CombinePolicy;
use crate::volume::Volume;
use crate::voxel::VoxelValue;

/// Writes a sample to the single voxel containing it.
pub struct NearestNeighborSplat {
    policy: CombinePolicy,
}

impl NearestNeighborSplat {
    pub fn new(policy: CombinePolicy) -> Self {
        Self { policy }
    }

    pub fn splat<T: VoxelValue>(&self, volume: &mut Volume<T>, x: f64, y: f64, z: f64, v: T) -> Result<(), VoxError> {
        let (i, j, k) = (x.floor() as i64, y.floor() as i64, z.floor() as i64);
        volume.update(i, j, k, v, self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splat_lands_in_floor_voxel() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        NearestNeighborSplat::new(CombinePolicy::Set)
            .splat(&mut vol, 1.9, 0.1, -0.1, 5.0)
            .unwrap();
        assert_eq!(vol.get(1, 0, -1).unwrap(), 5.0);
    }
}
