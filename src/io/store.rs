//! The streaming interface: every persisted value type (Volume,
//! LocalXform, attributes) reads and writes as flat concatenated bytes
//! in declaration order, with the container header and magic tag out
//! front. This is the flat/bytestream backend; a hierarchical store
//! backend would instead key payloads by [`super::header::tree_payload_key`]
//! under nested groups, but no concrete hierarchical-store crate is
//! wired up here.

use std::io::{Read, Write};

use bendy::decoding::{FromBencode, Object};
use bendy::encoding::{Error as BencodeError, SingleItemEncoder, ToBencode};

use crate::error::VoxError;
use crate::voxel::VoxelValue;
use crate::volume::Volume;

use super::attributes::AttributeBag;
use super::header::{ContainerHeader, OpenMode, MAGIC_TAG};

/// A fully self-describing persisted volume: magic tag, container
/// header, attribute bag, then the volume payload (which itself carries
/// the element-type tag, local transform, and tree).
pub struct Container<T: VoxelValue> {
    pub header: ContainerHeader,
    pub attributes: AttributeBag,
    pub volume: Volume<T>,
}

impl<T: VoxelValue> Container<T> {
    pub fn new(volume: Volume<T>) -> Self {
        Self {
            header: ContainerHeader::for_volume(),
            attributes: AttributeBag::new(),
            volume,
        }
    }

    /// Writes the container to any byte sink, flat-concatenated in
    /// declaration order (magic tag, header, attributes, volume).
    pub fn write_to<W: Write>(&self, mode: OpenMode, w: &mut W) -> Result<(), VoxError> {
        if !mode.allows_write() {
            return Err(VoxError::InvalidMode {
                reason: "container opened READ_ONLY cannot be written".into(),
            });
        }
        let bytes = self.to_bencode().map_err(|e| VoxError::IoFailure {
            key: "container".into(),
            source: std::io::Error::other(e.to_string()),
        })?;
        w.write_all(&bytes).map_err(|source| VoxError::IoFailure { key: "container".into(), source })
    }

    /// Reads a container back from any byte source written by
    /// [`Self::write_to`].
    pub fn read_from<R: Read>(mode: OpenMode, r: &mut R) -> Result<Self, VoxError> {
        if mode == OpenMode::WriteTrunc {
            return Err(VoxError::InvalidMode {
                reason: "WRITE_TRUNC does not support reading an existing container".into(),
            });
        }
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes).map_err(|source| VoxError::IoFailure { key: "container".into(), source })?;
        let container = Self::from_bencode(&bytes).map_err(|e| VoxError::InputMalformed { reason: e.to_string() })?;
        container.header.validate()?;
        Ok(container)
    }
}

impl<T: VoxelValue> ToBencode for Container<T> {
    const MAX_DEPTH: usize = 14;
    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        encoder.emit_list(|e| {
            e.emit_bytes(MAGIC_TAG)?;
            e.emit(&self.header)?;
            e.emit(&self.attributes)?;
            e.emit(&self.volume)
        })
    }
}

impl<T: VoxelValue> FromBencode for Container<T> {
    fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
        match data {
            Object::List(mut list) => {
                let magic = match list.next_object()?.unwrap() {
                    Object::Bytes(b) => b.to_vec(),
                    _ => return Err(bendy::decoding::Error::unexpected_token("magic tag bytes", "something else")),
                };
                if magic != MAGIC_TAG {
                    return Err(bendy::decoding::Error::malformed_content(Box::new(VoxError::InputMalformed {
                        reason: "container is missing the \"nektar_\" magic tag".into(),
                    })));
                }
                let header = ContainerHeader::decode_bencode_object(list.next_object()?.unwrap())?;
                let attributes = AttributeBag::decode_bencode_object(list.next_object()?.unwrap())?;
                let volume = Volume::<T>::decode_bencode_object(list.next_object()?.unwrap())?;
                Ok(Container { header, attributes, volume })
            }
            _ => Err(bendy::decoding::Error::unexpected_token("a Container list", "something else")),
        }
    }
}
