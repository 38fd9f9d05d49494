use super::cubic_axis;
use crate::error::VoxError;
use crate::volume::Volume;
use crate::voxel::VoxelValue;

fn lincomb<C>(terms: &[(C, f64)]) -> C
where
    C: Copy + Default + std::ops::Add<Output = C> + std::ops::Mul<f64, Output = C>,
{
    terms.iter().fold(C::default(), |acc, &(v, w)| acc + v * w)
}

/// 1-D cubic Hermite basis with Catmull-Rom-style tangents
/// `m0 = (p2 - p0)/2`, `m1 = (p3 - p1)/2`.
fn hermite<C>(t: f64, p: [C; 4]) -> C
where
    C: Copy + Default + std::ops::Add<Output = C> + std::ops::Mul<f64, Output = C>,
{
    let m0 = lincomb(&[(p[2], 0.5), (p[0], -0.5)]);
    let m1 = lincomb(&[(p[3], 0.5), (p[1], -0.5)]);
    let t2 = t * t;
    let t3 = t2 * t;
    lincomb(&[
        (p[1], 2.0 * t3 - 3.0 * t2 + 1.0),
        (m0, t3 - 2.0 * t2 + t),
        (p[2], 3.0 * t2 - 2.0 * t3),
        (m1, t3 - t2),
    ])
}

/// 1-D Catmull-Rom, provided as an interchangeable kernel to [`hermite`]
/// (same stencil and tangents, different basis coefficients).
fn catmull_rom<C>(t: f64, p: [C; 4]) -> C
where
    C: Copy + Default + std::ops::Add<Output = C> + std::ops::Mul<f64, Output = C>,
{
    let c0 = lincomb(&[(p[1], 2.0)]);
    let c1 = lincomb(&[(p[2], 1.0), (p[0], -1.0)]);
    let c2 = lincomb(&[(p[0], 2.0), (p[1], -5.0), (p[2], 4.0), (p[3], -1.0)]);
    let c3 = lincomb(&[(p[0], -1.0), (p[1], 3.0), (p[2], -3.0), (p[3], 1.0)]);
    lincomb(&[(c0, 0.5), (c1, 0.5 * t), (c2, 0.5 * t * t), (c3, 0.5 * t * t * t)])
}

fn fetch_64<T: VoxelValue>(
    volume: &Volume<T>,
    min_i: i64,
    min_j: i64,
    min_k: i64,
) -> Result<[[[T::Calc; 4]; 4]; 4], VoxError> {
    let mut samples = [[[T::Calc::default(); 4]; 4]; 4];
    for (dk, row) in samples.iter_mut().enumerate() {
        for (dj, col) in row.iter_mut().enumerate() {
            for (di, slot) in col.iter_mut().enumerate() {
                let v = volume.get(min_i + di as i64, min_j + dj as i64, min_k + dk as i64)?;
                *slot = v.to_calc();
            }
        }
    }
    Ok(samples)
}

fn interp_with<T: VoxelValue>(
    volume: &Volume<T>,
    x: f64,
    y: f64,
    z: f64,
    basis: fn(f64, [T::Calc; 4]) -> T::Calc,
) -> Result<T, VoxError> {
    let (min_i, tx) = cubic_axis(x);
    let (min_j, ty) = cubic_axis(y);
    let (min_k, tz) = cubic_axis(z);
    let samples = fetch_64(volume, min_i, min_j, min_k)?;

    // 16 row interpolations along x, one per (j, k) pair.
    let mut rows = [[T::Calc::default(); 4]; 4];
    for (k, plane) in samples.iter().enumerate() {
        for (j, row) in plane.iter().enumerate() {
            rows[k][j] = basis(tx, *row);
        }
    }
    // 4 plane interpolations along y.
    let mut planes = [T::Calc::default(); 4];
    for (k, row_set) in rows.iter().enumerate() {
        planes[k] = basis(ty, *row_set);
    }
    // final interpolation along z.
    let result = basis(tz, planes);
    Ok(T::from_calc(result))
}

/// Tricubic Hermite interpolation over a 4×4×4 neighbourhood.
pub struct CubicInterpolation;

impl CubicInterpolation {
    pub fn interp<T: VoxelValue>(volume: &Volume<T>, x: f64, y: f64, z: f64) -> Result<T, VoxError> {
        interp_with(volume, x, y, z, hermite::<T::Calc>)
    }
}

/// Tricubic Catmull-Rom interpolation, an interchangeable alternate
/// 1-D kernel over the same 4×4×4 neighbourhood.
pub struct CatmullRomInterpolation;

impl CatmullRomInterpolation {
    pub fn interp<T: VoxelValue>(volume: &Volume<T>, x: f64, y: f64, z: f64) -> Result<T, VoxError> {
        interp_with(volume, x, y, z, catmull_rom::<T::Calc>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_field_interpolates_to_the_same_constant() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 2.0);
        vol.set(100, 100, 100, 2.0).unwrap(); // force expansion without changing the value
        assert_eq!(CubicInterpolation::interp(&vol, 0.3, -1.7, 4.4).unwrap(), 2.0);
    }

    #[test]
    fn hermite_passes_through_interior_control_points() {
        let p = [0.0f64, 1.0, 2.0, 3.0];
        assert_eq!(hermite(0.0, p), 1.0);
        assert_eq!(hermite(1.0, p), 2.0);
    }

    #[test]
    fn catmull_rom_passes_through_interior_control_points() {
        let p = [0.0f64, 1.0, 2.0, 3.0];
        assert!((catmull_rom(0.0, p) - 1.0).abs() < 1e-12);
        assert!((catmull_rom(1.0, p) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn single_spike_interpolates_smoothly_near_it() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        vol.set(0, 0, 0, 8.0).unwrap();
        let centre = CubicInterpolation::interp(&vol, 0.5, 0.5, 0.5).unwrap();
        assert!(centre > 0.0 && centre <= 8.0);
    }
}
