//! Bencode persistence for the flat/bytestream backend, via the same
//! `bendy` encoding used elsewhere in the crate for the object pool.
//!
//! `T` itself is never bencoded directly: `f32`, `f64`, and `half::f16`
//! are foreign types this crate has no `ToBencode`/`FromBencode` impl
//! for (bencode has no native float representation, and the orphan
//! rules forbid implementing a foreign trait on a foreign type from
//! here). Every `T` is instead carried as a tagged byte-string via
//! [`crate::voxel::VoxelValue::to_le_bytes`]/`from_le_bytes`.

use bendy::decoding::{FromBencode, Object};
use bendy::encoding::{Error as BencodeError, SingleItemEncoder, ToBencode};

use crate::bitfield::BitField3D;
use crate::cell::Cell;
use crate::node::Node;
use crate::voxel::VoxelValue;
use crate::volume::Volume;
use crate::xform::LocalXform;

use super::attributes::{AttributeBag, AttributeValue};
use super::header::{ContainerHeader, ContainerType, Version};

fn unexpected<T>(what: &str) -> Result<T, bendy::decoding::Error> {
    Err(bendy::decoding::Error::unexpected_token(what, "something else"))
}

fn encode_value<T: VoxelValue>(e: &mut bendy::encoding::ListEncoder, v: T) -> Result<(), BencodeError> {
    e.emit_bytes(&v.to_le_bytes())
}

fn decode_value<T: VoxelValue>(obj: Object) -> Result<T, bendy::decoding::Error> {
    match obj {
        Object::Bytes(b) => T::from_le_bytes(b).map_err(|e| bendy::decoding::Error::malformed_content(Box::new(e))),
        _ => unexpected("a byte-string voxel value"),
    }
}

impl ToBencode for BitField3D {
    const MAX_DEPTH: usize = 2;
    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        encoder.emit_list(|e| {
            e.emit_int(self.lg_size())?;
            e.emit(&self.words_for_encoding())
        })
    }
}

impl FromBencode for BitField3D {
    fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
        match data {
            Object::List(mut list) => {
                let lg_size = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let words = Vec::<u64>::decode_bencode_object(list.next_object()?.unwrap())?;
                Ok(BitField3D::from_parts(lg_size, words))
            }
            _ => unexpected("a BitField3D list"),
        }
    }
}

impl<T: VoxelValue> ToBencode for Cell<T> {
    const MAX_DEPTH: usize = 4;
    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        encoder.emit_list(|e| {
            e.emit_int(self.lg_size())?;
            encode_value(e, self.fill_value())?;
            e.emit(self.bits_for_encoding())?;
            match self.array_for_encoding() {
                Some(array) => e.emit_list(|a| {
                    for v in array {
                        encode_value(a, *v)?;
                    }
                    Ok(())
                }),
                None => e.emit_str("##x##"),
            }
        })
    }
}

impl<T: VoxelValue> FromBencode for Cell<T> {
    fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
        match data {
            Object::List(mut list) => {
                let lg_size = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let fill_value: T = decode_value(list.next_object()?.unwrap())?;
                let bits = BitField3D::decode_bencode_object(list.next_object()?.unwrap())?;
                let array = match list.next_object()?.unwrap() {
                    Object::List(mut values) => {
                        let mut out = Vec::new();
                        while let Some(obj) = values.next_object()? {
                            out.push(decode_value(obj)?);
                        }
                        Some(out)
                    }
                    Object::Bytes(_) => None,
                    _ => return unexpected("a Cell array list or the \"##x##\" sentinel"),
                };
                Ok(Cell::from_parts(lg_size, fill_value, bits, array))
            }
            _ => unexpected("a Cell list"),
        }
    }
}

impl<T: VoxelValue> ToBencode for Node<T> {
    const MAX_DEPTH: usize = 6;
    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        encoder.emit_list(|e| {
            e.emit_int(self.lg_node())?;
            e.emit_int(self.lg_cell())?;
            e.emit_int(self.depth())?;
            encode_value(e, self.fill_value())?;
            e.emit(self.bits())?;
            match self.children_keys() {
                Some(children) => e.emit_list(|c| {
                    for key in children {
                        c.emit_int(*key)?;
                    }
                    Ok(())
                }),
                None => e.emit_str("##x##"),
            }
        })
    }
}

impl<T: VoxelValue> FromBencode for Node<T> {
    fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
        match data {
            Object::List(mut list) => {
                let lg_node = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let lg_cell = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let depth = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let fill_value: T = decode_value(list.next_object()?.unwrap())?;
                let bits = BitField3D::decode_bencode_object(list.next_object()?.unwrap())?;
                let children = match list.next_object()?.unwrap() {
                    Object::List(mut keys) => {
                        let mut out = Vec::new();
                        while let Some(obj) = keys.next_object()? {
                            out.push(u32::decode_bencode_object(obj)?);
                        }
                        Some(out)
                    }
                    Object::Bytes(_) => None,
                    _ => return unexpected("a Node children list or the \"##x##\" sentinel"),
                };
                Ok(Node::from_parts(lg_node, lg_cell, depth, fill_value, bits, children))
            }
            _ => unexpected("a Node list"),
        }
    }
}

impl<T: VoxelValue> ToBencode for Volume<T> {
    const MAX_DEPTH: usize = 12;
    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        encoder.emit_list(|e| {
            e.emit_str(T::type_name())?;
            e.emit_int(self.lg_node())?;
            e.emit_int(self.lg_cell())?;
            e.emit_int(self.depth())?;
            encode_value(e, self.fill_value())?;
            e.emit(self.xform())?;
            e.emit_list(|r| {
                for root in self.roots() {
                    r.emit(root)?;
                }
                Ok(())
            })?;
            e.emit(self.node_pool())?;
            e.emit(self.cell_pool())
        })
    }
}

impl<T: VoxelValue> FromBencode for Volume<T> {
    fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
        match data {
            Object::List(mut list) => {
                let element_type = String::decode_bencode_object(list.next_object()?.unwrap())?;
                if element_type != T::type_name() {
                    return Err(bendy::decoding::Error::malformed_content(Box::new(crate::error::VoxError::TypeMismatch {
                        expected: T::type_name().to_string(),
                        found: element_type,
                    })));
                }
                let lg_node = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let lg_cell = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let depth = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let fill_value: T = decode_value(list.next_object()?.unwrap())?;
                let xform = LocalXform::decode_bencode_object(list.next_object()?.unwrap())?;
                let roots: [Node<T>; 8] = match list.next_object()?.unwrap() {
                    Object::List(mut items) => {
                        let mut out = Vec::with_capacity(8);
                        while let Some(obj) = items.next_object()? {
                            out.push(Node::<T>::decode_bencode_object(obj)?);
                        }
                        out.try_into()
                            .map_err(|_| bendy::decoding::Error::unexpected_token("exactly 8 quadrant roots", "a different count"))?
                    }
                    _ => return unexpected("a list of 8 quadrant roots"),
                };
                let node_pool = crate::object_pool::ObjectPool::<Node<T>>::decode_bencode_object(list.next_object()?.unwrap())?;
                let cell_pool = crate::object_pool::ObjectPool::<Cell<T>>::decode_bencode_object(list.next_object()?.unwrap())?;
                Ok(Volume::from_parts(roots, node_pool, cell_pool, fill_value, lg_node, lg_cell, depth, xform))
            }
            _ => unexpected("a Volume list"),
        }
    }
}

impl ToBencode for LocalXform {
    const MAX_DEPTH: usize = 2;
    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        let (rx, ry, rz) = self.res();
        encoder.emit_list(|e| {
            e.emit_bytes(&rx.to_le_bytes())?;
            e.emit_bytes(&ry.to_le_bytes())?;
            e.emit_bytes(&rz.to_le_bytes())
        })
    }
}

impl FromBencode for LocalXform {
    fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
        fn read_f64(obj: Object) -> Result<f64, bendy::decoding::Error> {
            match obj {
                Object::Bytes(b) => {
                    let arr: [u8; 8] = b.try_into().map_err(|_| bendy::decoding::Error::unexpected_token("8-byte f64", "wrong length"))?;
                    Ok(f64::from_le_bytes(arr))
                }
                _ => Err(bendy::decoding::Error::unexpected_token("f64 bytes", "something else")),
            }
        }
        match data {
            Object::List(mut list) => {
                let rx = read_f64(list.next_object()?.unwrap())?;
                let ry = read_f64(list.next_object()?.unwrap())?;
                let rz = read_f64(list.next_object()?.unwrap())?;
                Ok(LocalXform::new(rx, ry, rz))
            }
            _ => unexpected("a LocalXform list"),
        }
    }
}

impl ToBencode for AttributeValue {
    const MAX_DEPTH: usize = 2;
    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        encoder.emit_list(|e| {
            e.emit_str(self.type_name())?;
            e.emit_bytes(&self.encode())
        })
    }
}

impl FromBencode for AttributeValue {
    fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
        match data {
            Object::List(mut list) => {
                let type_name = String::decode_bencode_object(list.next_object()?.unwrap())?;
                let payload = match list.next_object()?.unwrap() {
                    Object::Bytes(b) => b.to_vec(),
                    _ => return unexpected("an attribute payload byte-string"),
                };
                AttributeValue::decode(&type_name, &payload)
                    .map_err(|e| bendy::decoding::Error::malformed_content(Box::new(e)))
            }
            _ => unexpected("an AttributeValue list"),
        }
    }
}

impl ToBencode for AttributeBag {
    const MAX_DEPTH: usize = 3;
    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        encoder.emit_dict(|d| {
            for (name, value) in self.iter() {
                d.emit_pair(name.as_bytes(), value)?;
            }
            Ok(())
        })
    }
}

impl FromBencode for AttributeBag {
    fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
        match data {
            Object::Dict(mut dict) => {
                let mut bag = AttributeBag::new();
                while let Some((key, value)) = dict.next_pair()? {
                    let name = String::from_utf8(key.to_vec())
                        .map_err(|_| bendy::decoding::Error::unexpected_token("utf-8 attribute name", "invalid bytes"))?;
                    bag.set(name, AttributeValue::decode_bencode_object(value)?);
                }
                Ok(bag)
            }
            _ => unexpected("an AttributeBag dictionary"),
        }
    }
}

impl ToBencode for ContainerHeader {
    const MAX_DEPTH: usize = 2;
    fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
        encoder.emit_list(|e| {
            e.emit_int(self.container_type.as_u32())?;
            e.emit_int(self.version.major)?;
            e.emit_int(self.version.minor)?;
            e.emit_int(self.version.revision)
        })
    }
}

impl FromBencode for ContainerHeader {
    fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
        match data {
            Object::List(mut list) => {
                let container_type = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let major = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let minor = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                let revision = u32::decode_bencode_object(list.next_object()?.unwrap())?;
                Ok(ContainerHeader {
                    container_type: ContainerType::from_u32(container_type)
                        .map_err(|e| bendy::decoding::Error::malformed_content(Box::new(e)))?,
                    version: Version { major, minor, revision },
                })
            }
            _ => unexpected("a ContainerHeader list"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CombinePolicy;
    use crate::volume::Volume;

    #[test]
    fn local_xform_roundtrips() {
        let xform = LocalXform::new(0.5, 2.0, 4.0);
        let bytes = xform.to_bencode().unwrap();
        assert_eq!(LocalXform::from_bencode(&bytes).unwrap(), xform);
    }

    #[test]
    fn attribute_value_roundtrips() {
        let v = AttributeValue::Str("tag".to_string());
        let bytes = v.to_bencode().unwrap();
        assert_eq!(AttributeValue::from_bencode(&bytes).unwrap(), v);
    }

    #[test]
    fn attribute_bag_roundtrips() {
        let mut bag = AttributeBag::new();
        bag.set("author", AttributeValue::Str("student".to_string()));
        bag.set("revision", AttributeValue::U32(3));
        let bytes = bag.to_bencode().unwrap();
        assert_eq!(AttributeBag::from_bencode(&bytes).unwrap(), bag);
    }

    #[test]
    fn container_header_roundtrips() {
        let header = ContainerHeader::for_volume();
        let bytes = header.to_bencode().unwrap();
        assert_eq!(ContainerHeader::from_bencode(&bytes).unwrap(), header);
    }

    #[test]
    fn cell_roundtrips_through_bencode() {
        let mut cell = Cell::<f32>::new(2, 0.0);
        cell.set(1, 2, 3, 5.0).unwrap();
        let bytes = cell.to_bencode().unwrap();
        let back = Cell::<f32>::from_bencode(&bytes).unwrap();
        assert_eq!(back.get(1, 2, 3).unwrap(), 5.0);
        assert_eq!(back.get(0, 0, 0).unwrap(), 0.0);
    }

    #[test]
    fn volume_roundtrips_through_bencode() {
        let mut vol = Volume::<f32>::new(2, 2, 2, 0.0);
        vol.update(1, 1, 1, 3.0, CombinePolicy::Add).unwrap();
        vol.set(-1, -2, -1, 9.0).unwrap();
        let bytes = vol.to_bencode().unwrap();
        let back = Volume::<f32>::from_bencode(&bytes).unwrap();
        assert_eq!(back.get(1, 1, 1).unwrap(), 3.0);
        assert_eq!(back.get(-1, -2, -1).unwrap(), 9.0);
        assert_eq!(back.get(0, 0, 0).unwrap(), 0.0);
    }
}
