//! Pure integer bit/index helpers shared by [`crate::bitfield::BitField3D`],
//! [`crate::cell::Cell`], [`crate::node::Node`] and [`crate::volume::Volume`].
//!
//! None of these allocate or depend on the rest of the crate; they are the
//! arithmetic bedrock everything else is built on.

/// Number of voxels along one side of a `2^lg_size` cube.
pub const fn side_len(lg_size: u32) -> u32 {
    1 << lg_size
}

/// Number of voxels in a `2^lg_size` cube, i.e. `(2^lg_size)^3`.
pub const fn num_bits_3d(lg_size: u32) -> u64 {
    1u64 << (3 * lg_size)
}

/// Linear index of `(i, j, k)` within a `2^lg_size` cube.
///
/// `i`, `j`, `k` must each be `< 2^lg_size`; callers at the bitfield/cell
/// boundary are expected to have already range-checked (see
/// [`crate::error::VoxError::InvalidIndex`]).
#[inline]
pub const fn linear_index(i: u32, j: u32, k: u32, lg_size: u32) -> u64 {
    i as u64 + ((j as u64) << lg_size) + ((k as u64) << (lg_size * 2))
}

/// Inverse of [`linear_index`].
#[inline]
pub const fn coords_from_linear(index: u64, lg_size: u32) -> (u32, u32, u32) {
    let lg_row = lg_size;
    let lg_page = lg_size * 2;
    let k = (index >> lg_page) as u32;
    let rest = modulo_lg(index, lg_page);
    let j = (rest >> lg_row) as u32;
    let i = modulo_lg(rest, lg_row) as u32;
    (i, j, k)
}

/// `v % 2^lg_divisor`, computed with a mask rather than a division.
#[inline]
pub const fn modulo_lg(v: u64, lg_divisor: u32) -> u64 {
    v & ((1u64 << lg_divisor) - 1)
}

/// Population count (Hamming weight) via the standard SWAR formula.
/// `u64::count_ones` already compiles to `POPCNT` on any target that has
/// it, but we spell the bit trick out so the behaviour is guaranteed
/// identical across hosts that lack the instruction.
#[inline]
pub const fn popcount(mut v: u64) -> u32 {
    v -= (v >> 1) & 0x5555_5555_5555_5555;
    v = (v & 0x3333_3333_3333_3333) + ((v >> 2) & 0x3333_3333_3333_3333);
    v = (v + (v >> 4)) & 0x0f0f_0f0f_0f0f_0f0f;
    ((v.wrapping_mul(0x0101_0101_0101_0101)) >> 56) as u32
}

/// 1-based index of the least significant set bit, or 0 if `v == 0`.
#[inline]
pub const fn first_set_bit_index(v: u64) -> u32 {
    if v == 0 {
        0
    } else {
        v.trailing_zeros() + 1
    }
}

/// 1-based index of the most significant set bit, or 0 if `v == 0`.
#[inline]
pub const fn last_set_bit_index(v: u64) -> u32 {
    if v == 0 {
        0
    } else {
        64 - v.leading_zeros()
    }
}

/// `true` if `v` is an exact power of two (zero is not).
#[inline]
pub const fn is_pow2(v: u64) -> bool {
    v != 0 && (v & (v - 1)) == 0
}

/// Rounds `v` up to the next multiple of `pow2` (`pow2` must itself be a
/// power of two).
#[inline]
pub const fn round_pow2(v: u64, pow2: u64) -> u64 {
    debug_assert!(is_pow2(pow2));
    (v + (pow2 - 1)) & !(pow2 - 1)
}

/// Branchless absolute value for a signed 64-bit coordinate, returned as
/// the corresponding unsigned type.
#[inline]
pub const fn abs_u64(v: i64) -> u64 {
    let mask = v >> 63;
    ((v ^ mask) - mask) as u64
}

/// Sign-bit triple (bit 2 = sign(i), bit 1 = sign(j), bit 0 = sign(k));
/// a set bit means the axis is negative. This is precisely the octant a
/// signed `(i, j, k)` lattice point belongs to.
#[inline]
pub const fn quadrant(i: i64, j: i64, k: i64) -> u8 {
    let neg_i = ((i as u64) >> 63) as u8;
    let neg_j = ((j as u64) >> 63) as u8;
    let neg_k = ((k as u64) >> 63) as u8;
    (neg_i << 2) | (neg_j << 1) | neg_k
}

/// Converts a signed lattice point into the unsigned, per-octant
/// coordinates used inside a quadrant's root [`crate::node::Node`].
///
/// For every axis whose sign bit is set in `q`, the unsigned coordinate is
/// `-(v + 1)` — so signed `-1` lands on unsigned `0`, `-2` on `1`, and so
/// on. This is what keeps the origin `(0, 0, 0)` unique to quadrant 0: a
/// non-negative axis maps to itself unchanged.
#[inline]
pub const fn quadrant_offsets(i: i64, j: i64, k: i64, q: u8) -> (u32, u32, u32) {
    let map = |v: i64, negative: bool| -> u32 {
        if negative {
            (-(v + 1)) as u32
        } else {
            v as u32
        }
    };
    (
        map(i, q & 0b100 != 0),
        map(j, q & 0b010 != 0),
        map(k, q & 0b001 != 0),
    )
}

/// Inverse of [`quadrant_offsets`]: recovers the signed lattice point from
/// a quadrant and its unsigned per-octant coordinates.
#[inline]
pub const fn quadrant_offsets_inverse(i: u32, j: u32, k: u32, q: u8) -> (i64, i64, i64) {
    let unmap = |v: u32, negative: bool| -> i64 {
        if negative {
            -(v as i64) - 1
        } else {
            v as i64
        }
    };
    (
        unmap(i, q & 0b100 != 0),
        unmap(j, q & 0b010 != 0),
        unmap(k, q & 0b001 != 0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_index_roundtrip() {
        for lg_size in 1..4u32 {
            let side = side_len(lg_size);
            for i in 0..side {
                for j in 0..side {
                    for k in 0..side {
                        let idx = linear_index(i, j, k, lg_size);
                        assert_eq!(coords_from_linear(idx, lg_size), (i, j, k));
                    }
                }
            }
        }
    }

    #[test]
    fn popcount_matches_builtin() {
        for v in [0u64, 1, 0xffff_ffff, 0xaaaa_aaaa_aaaa_aaaa, u64::MAX] {
            assert_eq!(popcount(v), v.count_ones());
        }
    }

    #[test]
    fn first_last_set_bit() {
        assert_eq!(first_set_bit_index(0), 0);
        assert_eq!(last_set_bit_index(0), 0);
        assert_eq!(first_set_bit_index(0b1000), 4);
        assert_eq!(last_set_bit_index(0b1000), 4);
        assert_eq!(first_set_bit_index(0b1010), 2);
        assert_eq!(last_set_bit_index(0b1010), 4);
    }

    #[test]
    fn pow2_helpers() {
        assert!(is_pow2(1));
        assert!(is_pow2(1024));
        assert!(!is_pow2(0));
        assert!(!is_pow2(6));
        assert_eq!(round_pow2(5, 4), 8);
        assert_eq!(round_pow2(8, 4), 8);
    }

    #[test]
    fn quadrant_routes_by_sign() {
        assert_eq!(quadrant(1, 1, 1), 0);
        assert_eq!(quadrant(-1, 1, 1), 0b100);
        assert_eq!(quadrant(1, -1, 1), 0b010);
        assert_eq!(quadrant(1, 1, -1), 0b001);
        assert_eq!(quadrant(-1, -1, -1), 0b111);
        // the origin always belongs to quadrant 0
        assert_eq!(quadrant(0, 0, 0), 0);
    }

    #[test]
    fn quadrant_offsets_roundtrip() {
        for i in -8i64..8 {
            for j in -8i64..8 {
                for k in -8i64..8 {
                    let q = quadrant(i, j, k);
                    let (ui, uj, uk) = quadrant_offsets(i, j, k, q);
                    let (ri, rj, rk) = quadrant_offsets_inverse(ui, uj, uk, q);
                    assert_eq!((i, j, k), (ri, rj, rk));
                }
            }
        }
    }

    #[test]
    fn negative_one_maps_to_unsigned_zero() {
        let q = quadrant(-1, -2, -1);
        let (i, j, k) = quadrant_offsets(-1, -2, -1, q);
        assert_eq!((i, j, k), (0, 1, 0));
    }
}
