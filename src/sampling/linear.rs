use super::linear_axis;
use crate::error::VoxError;
use crate::policy::CombinePolicy;
use crate::volume::Volume;
use crate::voxel::VoxelValue;

/// The eight `(i, j, k, weight)` corners of the trilinear neighbourhood
/// around `(x, y, z)`; weights multiply across axes and always sum to 1.
fn corners(x: f64, y: f64, z: f64) -> [(i64, i64, i64, f64); 8] {
    let (min_i, wx) = linear_axis(x);
    let (min_j, wy) = linear_axis(y);
    let (min_k, wz) = linear_axis(z);
    let mut out = [(0i64, 0i64, 0i64, 0.0); 8];
    let mut n = 0;
    for dk in 0..2 {
        let (k, wzc) = if dk == 0 { (min_k, 1.0 - wz) } else { (min_k + 1, wz) };
        for dj in 0..2 {
            let (j, wyc) = if dj == 0 { (min_j, 1.0 - wy) } else { (min_j + 1, wy) };
            for di in 0..2 {
                let (i, wxc) = if di == 0 { (min_i, 1.0 - wx) } else { (min_i + 1, wx) };
                out[n] = (i, j, k, wxc * wyc * wzc);
                n += 1;
            }
        }
    }
    out
}

/// Distributes a sample over the 2×2×2 neighbourhood by trilinear
/// weight, writing each corner through a combine policy.
pub struct LinearSplat {
    policy: CombinePolicy,
}

impl LinearSplat {
    pub fn new(policy: CombinePolicy) -> Self {
        Self { policy }
    }

    pub fn splat<T: VoxelValue>(&self, volume: &mut Volume<T>, x: f64, y: f64, z: f64, v: T) -> Result<(), VoxError> {
        for (i, j, k, weight) in corners(x, y, z) {
            volume.update(i, j, k, v.scaled(weight), self.policy)?;
        }
        Ok(())
    }
}

/// Reads the trilinear neighbourhood and blends it.
pub struct LinearInterpolation;

impl LinearInterpolation {
    pub fn interp<T: VoxelValue>(volume: &Volume<T>, x: f64, y: f64, z: f64) -> Result<T, VoxError> {
        let mut acc = T::Calc::default();
        for (i, j, k, weight) in corners(x, y, z) {
            let sample = volume.get(i, j, k)?;
            acc = acc + sample.to_calc() * weight;
        }
        Ok(T::from_calc(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        for (x, y, z) in [(0.0, 0.0, 0.0), (0.25, 0.25, 0.25), (-3.7, 1.2, 9.9)] {
            let sum: f64 = corners(x, y, z).iter().map(|c| c.3).sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum was {sum} at ({x},{y},{z})");
        }
    }

    #[test]
    fn splat_at_origin_spreads_across_eight_voxels_equally() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        LinearSplat::new(CombinePolicy::Set).splat(&mut vol, 0.0, 0.0, 0.0, 1.0).unwrap();
        for i in [-1i64, 0] {
            for j in [-1i64, 0] {
                for k in [-1i64, 0] {
                    assert_eq!(vol.get(i, j, k).unwrap(), 0.125);
                }
            }
        }
    }

    #[test]
    fn splat_off_centre_matches_product_weights() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        LinearSplat::new(CombinePolicy::Set).splat(&mut vol, 0.25, 0.25, 0.25, 1.0).unwrap();
        assert_eq!(vol.get(0, 0, 0).unwrap(), 0.421875);
        assert_eq!(vol.get(-1, -1, -1).unwrap(), 0.015625);
    }

    #[test]
    fn interpolation_at_integer_centre_returns_stored_value() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        vol.set(0, 0, 0, 1.0).unwrap();
        assert_eq!(LinearInterpolation::interp(&vol, 0.5, 0.5, 0.5).unwrap(), 1.0);
        assert_eq!(LinearInterpolation::interp(&vol, 1.0, 0.5, 0.5).unwrap(), 0.5);
        assert_eq!(LinearInterpolation::interp(&vol, 1.5, 0.5, 0.5).unwrap(), 0.0);
    }
}
