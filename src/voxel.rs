//! The scalar element type `T` stored per voxel, and the "calc type"
//! indirection used by the sampling kernels ([`crate::sampling`]) so that a
//! half-precision `T` is accumulated in single precision rather than
//! losing bits on every intermediate add.

/// A value a [`crate::volume::Volume`] can store per voxel.
///
/// Implementors must be cheap to copy and comparable for equality — both
/// are load-bearing for fill-state collapse (see [`crate::cell::Cell`] and
/// [`crate::node::Node`]), which relies on `PartialEq` to detect a
/// uniform subtree.
pub trait VoxelValue: Default + Copy + PartialEq + std::fmt::Debug + 'static {
    /// Widened type used for kernel intermediate arithmetic. For
    /// half-precision `T` this is `f32`; for everything else it is `T`
    /// itself.
    type Calc: Copy
        + Default
        + std::ops::Add<Output = Self::Calc>
        + std::ops::Mul<f64, Output = Self::Calc>
        + PartialOrd;

    fn to_calc(self) -> Self::Calc;
    fn from_calc(v: Self::Calc) -> Self;

    /// `self + other`, accumulated through the calc type.
    fn combine_add(self, other: Self) -> Self {
        Self::from_calc(self.to_calc() + other.to_calc())
    }

    /// `max(self, other)`.
    fn combine_max(self, other: Self) -> Self {
        if self.to_calc() < other.to_calc() { other } else { self }
    }

    /// `min(self, other)`.
    fn combine_min(self, other: Self) -> Self {
        if other.to_calc() < self.to_calc() { other } else { self }
    }

    /// `other` if it has greater magnitude than `self`, else `self`.
    fn combine_replace_if_greater_magnitude(self, other: Self) -> Self {
        // Implementors of signed scalar types override this with a real
        // magnitude comparison; the default treats any change as growth.
        other
    }

    /// Scales a value by a real-valued weight (used by the splat kernels
    /// to distribute a sample across a neighbourhood), via the calc type.
    fn scaled(self, weight: f64) -> Self {
        Self::from_calc(self.to_calc() * weight)
    }

    /// The element-type tag persisted alongside a volume (see
    /// [`crate::io`]), used by a reader to reject a mismatched `T`.
    fn type_name() -> &'static str;

    /// Raw little-endian bytes for persistence. Kept separate from
    /// `ToBencode`/`FromBencode` because those are foreign traits over
    /// foreign primitive types (`f32`, `half::f16`, ...) and can't be
    /// implemented directly on them from this crate.
    fn to_le_bytes(self) -> Vec<u8>;
    fn from_le_bytes(bytes: &[u8]) -> Result<Self, crate::error::VoxError>;
}

/// Shared "wrong byte count" error for [`VoxelValue::from_le_bytes`]
/// implementations.
fn bad_byte_len(type_name: &str, expected: usize, found: usize) -> crate::error::VoxError {
    crate::error::VoxError::InputMalformed {
        reason: format!("`{type_name}` payload is {found} bytes, expected {expected}"),
    }
}

macro_rules! impl_voxel_value_float {
    ($t:ty) => {
        impl VoxelValue for $t {
            type Calc = f64;
            fn to_calc(self) -> f64 {
                self as f64
            }
            fn from_calc(v: f64) -> Self {
                v as $t
            }
            fn combine_replace_if_greater_magnitude(self, other: Self) -> Self {
                if other.abs() > self.abs() { other } else { self }
            }
            fn type_name() -> &'static str {
                stringify!($t)
            }
            fn to_le_bytes(self) -> Vec<u8> {
                <$t>::to_le_bytes(self).to_vec()
            }
            fn from_le_bytes(bytes: &[u8]) -> Result<Self, crate::error::VoxError> {
                let arr = bytes
                    .try_into()
                    .map_err(|_| bad_byte_len(stringify!($t), std::mem::size_of::<$t>(), bytes.len()))?;
                Ok(<$t>::from_le_bytes(arr))
            }
        }
    };
}

impl_voxel_value_float!(f32);
impl_voxel_value_float!(f64);

impl VoxelValue for half::f16 {
    type Calc = f32;
    fn to_calc(self) -> f32 {
        self.to_f32()
    }
    fn from_calc(v: f32) -> Self {
        half::f16::from_f32(v)
    }
    fn combine_replace_if_greater_magnitude(self, other: Self) -> Self {
        if other.to_f32().abs() > self.to_f32().abs() { other } else { self }
    }
    fn type_name() -> &'static str {
        "f16"
    }
    fn to_le_bytes(self) -> Vec<u8> {
        self.to_bits().to_le_bytes().to_vec()
    }
    fn from_le_bytes(bytes: &[u8]) -> Result<Self, crate::error::VoxError> {
        let arr = bytes.try_into().map_err(|_| bad_byte_len("f16", 2, bytes.len()))?;
        Ok(half::f16::from_bits(u16::from_le_bytes(arr)))
    }
}

macro_rules! impl_voxel_value_int {
    ($t:ty) => {
        impl VoxelValue for $t {
            type Calc = f64;
            fn to_calc(self) -> f64 {
                self as f64
            }
            fn from_calc(v: f64) -> Self {
                v.round() as $t
            }
            fn combine_replace_if_greater_magnitude(self, other: Self) -> Self {
                if (other as i64).unsigned_abs() > (self as i64).unsigned_abs() {
                    other
                } else {
                    self
                }
            }
            fn type_name() -> &'static str {
                stringify!($t)
            }
            fn to_le_bytes(self) -> Vec<u8> {
                <$t>::to_le_bytes(self).to_vec()
            }
            fn from_le_bytes(bytes: &[u8]) -> Result<Self, crate::error::VoxError> {
                let arr = bytes
                    .try_into()
                    .map_err(|_| bad_byte_len(stringify!($t), std::mem::size_of::<$t>(), bytes.len()))?;
                Ok(<$t>::from_le_bytes(arr))
            }
        }
    };
}

impl_voxel_value_int!(i8);
impl_voxel_value_int!(i16);
impl_voxel_value_int!(i32);
impl_voxel_value_int!(i64);
impl_voxel_value_int!(u8);
impl_voxel_value_int!(u16);
impl_voxel_value_int!(u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_combine_matches_scalar_add() {
        assert_eq!(1.5f32.combine_add(2.5f32), 4.0f32);
    }

    #[test]
    fn half_precision_accumulates_through_f32() {
        let a = half::f16::from_f32(1.0);
        let b = half::f16::from_f32(2.0);
        assert_eq!(a.combine_add(b).to_f32(), 3.0);
    }

    #[test]
    fn scaled_weights_integer_like_floats() {
        assert_eq!(1.0f32.scaled(0.125), 0.125f32);
    }

    #[test]
    fn max_min_combine() {
        assert_eq!(1.0f32.combine_max(3.0f32), 3.0f32);
        assert_eq!(1.0f32.combine_min(3.0f32), 1.0f32);
    }

    #[test]
    fn le_bytes_roundtrip_float_and_int() {
        // `to_le_bytes`/`from_le_bytes` share a name with inherent methods
        // on these primitive types, so the trait impl is exercised via
        // fully-qualified syntax rather than `.method()` dot-calls.
        let bytes = VoxelValue::to_le_bytes(-3.5f32);
        assert_eq!(<f32 as VoxelValue>::from_le_bytes(&bytes).unwrap(), -3.5f32);
        let bytes = VoxelValue::to_le_bytes(-7i32);
        assert_eq!(<i32 as VoxelValue>::from_le_bytes(&bytes).unwrap(), -7i32);
        let half = half::f16::from_f32(1.25);
        let bytes = VoxelValue::to_le_bytes(half);
        assert_eq!(<half::f16 as VoxelValue>::from_le_bytes(&bytes).unwrap().to_f32(), 1.25);
    }

    #[test]
    fn type_names_are_distinct() {
        assert_eq!(f32::type_name(), "f32");
        assert_eq!(i64::type_name(), "i64");
        assert_eq!(half::f16::type_name(), "f16");
    }

    #[test]
    fn truncated_payload_is_malformed() {
        assert!(<f64 as VoxelValue>::from_le_bytes(&[0u8, 1, 2]).is_err());
    }
}
