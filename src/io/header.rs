//! The container header: the bit-level contract every persisted volume
//! starts with, independent of which storage backend carries it.

use crate::error::VoxError;

/// Null-terminated ASCII tag written at the start of every container,
/// whether it is a root-group attribute (hierarchical store) or a
/// stream prefix (flat store).
pub const MAGIC_TAG: &[u8] = b"nektar_\0";

/// What kind of payload follows the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum ContainerType {
    Invalid = 0,
    Volume = 1,
}

impl ContainerType {
    pub fn from_u32(v: u32) -> Result<Self, VoxError> {
        match v {
            0 => Ok(ContainerType::Invalid),
            1 => Ok(ContainerType::Volume),
            other => Err(VoxError::InputMalformed {
                reason: format!("unknown container_type tag {other}"),
            }),
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// The format version a container was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
}

/// The current version this crate writes. Readers accept any `major`
/// equal to this one; a `minor`/`revision` mismatch is not fatal.
pub const CURRENT_VERSION: Version = Version { major: 1, minor: 0, revision: 0 };

impl Version {
    pub fn is_readable_by_current(&self) -> bool {
        self.major == CURRENT_VERSION.major
    }
}

/// How a persistence target may be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    /// Create if absent, otherwise open the existing container for
    /// reading and writing.
    ReadWrite,
    /// Create, or truncate an existing container to empty.
    WriteTrunc,
}

impl OpenMode {
    pub fn allows_write(self) -> bool {
        !matches!(self, OpenMode::ReadOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub container_type: ContainerType,
    pub version: Version,
}

impl ContainerHeader {
    pub fn for_volume() -> Self {
        Self {
            container_type: ContainerType::Volume,
            version: CURRENT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), VoxError> {
        if self.container_type == ContainerType::Invalid {
            return Err(VoxError::InputMalformed {
                reason: "container_type is INVALID".into(),
            });
        }
        if !self.version.is_readable_by_current() {
            return Err(VoxError::InputMalformed {
                reason: format!(
                    "container major version {} is not readable by this build (expects {})",
                    self.version.major, CURRENT_VERSION.major
                ),
            });
        }
        Ok(())
    }
}

/// The `<kind>_q<Q>_<ox>_<oy>_<oz>` naming convention a hierarchical
/// store keys tree payloads by. `kind` is `"leaf"` for a fill-state node
/// (nothing further to descend into) or `"cell"` for an expanded cell or
/// node. Not used by the flat/bytestream backend, which concatenates
/// the whole tree as a single payload instead.
pub fn tree_payload_key(kind: &str, quadrant: u8, offset: (u64, u64, u64)) -> String {
    format!("{kind}_q{quadrant}_{}_{}_{}", offset.0, offset.1, offset.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_tag_is_null_terminated() {
        assert_eq!(MAGIC_TAG.last(), Some(&0u8));
        assert_eq!(&MAGIC_TAG[..MAGIC_TAG.len() - 1], b"nektar_");
    }

    #[test]
    fn current_version_validates() {
        ContainerHeader::for_volume().validate().unwrap();
    }

    #[test]
    fn invalid_container_type_rejected() {
        let header = ContainerHeader {
            container_type: ContainerType::Invalid,
            version: CURRENT_VERSION,
        };
        assert!(matches!(header.validate(), Err(VoxError::InputMalformed { .. })));
    }

    #[test]
    fn newer_major_version_rejected() {
        let header = ContainerHeader {
            container_type: ContainerType::Volume,
            version: Version { major: CURRENT_VERSION.major + 1, minor: 0, revision: 0 },
        };
        assert!(matches!(header.validate(), Err(VoxError::InputMalformed { .. })));
    }

    #[test]
    fn tree_payload_key_matches_convention() {
        assert_eq!(tree_payload_key("leaf", 3, (1, 2, 3)), "leaf_q3_1_2_3");
        assert_eq!(tree_payload_key("cell", 0, (0, 0, 0)), "cell_q0_0_0_0");
    }
}
