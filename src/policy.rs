//! Combine policies: the pure binary functions `T x T -> T` that decide how
//! a write merges with the voxel value already present. Shared by
//! [`crate::cell::Cell::update`], [`crate::node::Node::update`],
//! [`crate::volume::Volume::update`] and the splat kernels in
//! [`crate::sampling`].

use crate::voxel::VoxelValue;

/// A combine policy, dispatched by `match` inside the hot update path
/// rather than through an indirect call per voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinePolicy {
    /// Replace the current value outright.
    Set,
    /// Arithmetic `current + incoming`.
    Add,
    /// `max(current, incoming)`.
    Max,
    /// `min(current, incoming)`.
    Min,
    /// Keep whichever of the two has the greater magnitude.
    ReplaceIfGreaterMagnitude,
}

impl CombinePolicy {
    /// Applies the policy: `current` is the value presently stored (or
    /// the cell/node fill value, if nothing has been written yet),
    /// `incoming` is the value being written.
    #[inline]
    pub fn apply<T: VoxelValue>(self, current: T, incoming: T) -> T {
        match self {
            CombinePolicy::Set => incoming,
            CombinePolicy::Add => current.combine_add(incoming),
            CombinePolicy::Max => current.combine_max(incoming),
            CombinePolicy::Min => current.combine_min(incoming),
            CombinePolicy::ReplaceIfGreaterMagnitude => {
                current.combine_replace_if_greater_magnitude(incoming)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces() {
        assert_eq!(CombinePolicy::Set.apply(1.0f32, 2.0f32), 2.0);
    }

    #[test]
    fn add_accumulates() {
        assert_eq!(CombinePolicy::Add.apply(1.0f32, 2.0f32), 3.0);
    }

    #[test]
    fn max_min() {
        assert_eq!(CombinePolicy::Max.apply(1.0f32, 2.0f32), 2.0);
        assert_eq!(CombinePolicy::Min.apply(1.0f32, 2.0f32), 1.0);
    }

    #[test]
    fn replace_if_greater_magnitude() {
        assert_eq!(
            CombinePolicy::ReplaceIfGreaterMagnitude.apply(-5.0f32, 2.0f32),
            -5.0
        );
        assert_eq!(
            CombinePolicy::ReplaceIfGreaterMagnitude.apply(-1.0f32, 2.0f32),
            2.0
        );
    }
}
