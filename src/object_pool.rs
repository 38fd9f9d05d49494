//! A reusable-slot arena. [`crate::node::Node`] and [`crate::cell::Cell`]
//! are each stored in their own `ObjectPool` rather than behind an owning
//! `Box`; children are referenced by `(pool key)` rather than by pointer,
//! which keeps the tree free of `unsafe` and gives fill-collapse a cheap,
//! deterministic way to return memory (`pop`/`free` just clears a flag).

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Sentinel meaning "no child here". `u32::MAX` is never a valid pool
/// key because a pool can never grow that large in practice.
pub fn key_none_value() -> u32 {
    u32::MAX
}

/// Cheap pre-check before trusting a key enough to index with it.
pub fn key_might_be_valid(key: u32) -> bool {
    key != key_none_value()
}

#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone)]
struct ReusableSlot<T> {
    reserved: bool,
    item: T,
}

#[cfg(feature = "bytecode")]
mod bencode_impl {
    use super::{ObjectPool, ReusableSlot};
    use bendy::decoding::{FromBencode, Object};
    use bendy::encoding::{Error as BencodeError, SingleItemEncoder, ToBencode};

    impl<T: Clone + ToBencode> ToBencode for ReusableSlot<T> {
        const MAX_DEPTH: usize = 6;
        fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
            encoder.emit_list(|e| {
                e.emit_int(self.reserved as u8)?;
                e.emit(&self.item)
            })
        }
    }

    impl<T: Clone + FromBencode> FromBencode for ReusableSlot<T> {
        fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
            match data {
                Object::List(mut list) => {
                    let reserved = match list.next_object()?.unwrap() {
                        Object::Integer("0") => false,
                        Object::Integer("1") => true,
                        _ => {
                            return Err(bendy::decoding::Error::unexpected_token(
                                "boolean field reserved",
                                "something else",
                            ))
                        }
                    };
                    let item = T::decode_bencode_object(list.next_object()?.unwrap())?;
                    Ok(Self { reserved, item })
                }
                _ => Err(bendy::decoding::Error::unexpected_token(
                    "list of ReusableSlot<T> fields",
                    "something else",
                )),
            }
        }
    }

    impl<T: Default + Clone + ToBencode> ToBencode for ObjectPool<T> {
        const MAX_DEPTH: usize = 8;
        fn encode(&self, encoder: SingleItemEncoder) -> Result<(), BencodeError> {
            encoder.emit_list(|e| {
                e.emit_int(self.first_available)?;
                e.emit(&self.slots)
            })
        }
    }

    impl<T: Default + Clone + FromBencode> FromBencode for ObjectPool<T> {
        fn decode_bencode_object(data: Object) -> Result<Self, bendy::decoding::Error> {
            match data {
                Object::List(mut list) => {
                    let first_available = match list.next_object()?.unwrap() {
                        Object::Integer(i) => i.parse::<usize>().map_err(|_| {
                            bendy::decoding::Error::unexpected_token(
                                "usize field first_available",
                                i,
                            )
                        })?,
                        _ => {
                            return Err(bendy::decoding::Error::unexpected_token(
                                "int field first_available",
                                "something else",
                            ))
                        }
                    };
                    let slots = Vec::decode_bencode_object(list.next_object()?.unwrap())?;
                    Ok(Self { first_available, slots })
                }
                _ => Err(bendy::decoding::Error::unexpected_token(
                    "list of ObjectPool<T> fields",
                    "something else",
                )),
            }
        }
    }
}

/// Stores reusable objects of type `T`, handing out `usize` keys. Freed
/// slots are recycled by the next `allocate`/`push`, so a tree that grows
/// and shrinks doesn't leave holes in the backing `Vec` forever.
#[derive(Default, Clone)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub(crate) struct ObjectPool<T> {
    slots: Vec<ReusableSlot<T>>,
    first_available: usize,
}

impl<T: Default + Clone> ObjectPool<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        ObjectPool {
            slots: Vec::with_capacity(capacity),
            first_available: 0,
        }
    }

    fn is_next_available(&self) -> bool {
        self.first_available + 1 < self.slots.len() && !self.slots[self.first_available + 1].reserved
    }

    fn check_first_available(&mut self) -> bool {
        if self.first_available < self.slots.len() && !self.slots[self.first_available].reserved {
            true
        } else if self.is_next_available() {
            self.first_available += 1;
            true
        } else {
            self.first_available = self.slots.len();
            false
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn push(&mut self, item: T) -> usize {
        let key = self.allocate();
        *self.get_mut(key) = item;
        key
    }

    pub(crate) fn allocate(&mut self) -> usize {
        let key = if self.check_first_available() {
            self.slots[self.first_available].reserved = true;
            self.first_available
        } else {
            self.slots.push(ReusableSlot {
                reserved: true,
                item: T::default(),
            });
            self.slots.len() - 1
        };
        if self.is_next_available() {
            self.first_available += 1;
        }
        key
    }

    pub(crate) fn pop(&mut self, key: usize) -> Option<T> {
        if self.key_is_valid(key) {
            self.slots[key].reserved = false;
            self.first_available = self.first_available.min(key);
            Some(std::mem::take(&mut self.slots[key].item))
        } else {
            None
        }
    }

    pub(crate) fn free(&mut self, key: usize) -> bool {
        if self.key_is_valid(key) {
            self.slots[key].reserved = false;
            self.first_available = self.first_available.min(key);
            true
        } else {
            false
        }
    }

    pub(crate) fn get(&self, key: usize) -> &T {
        debug_assert!(self.key_is_valid(key));
        &self.slots[key].item
    }

    pub(crate) fn get_mut(&mut self, key: usize) -> &mut T {
        debug_assert!(self.key_is_valid(key));
        &mut self.slots[key].item
    }

    pub(crate) fn key_is_valid(&self, key: usize) -> bool {
        key < self.slots.len() && self.slots[key].reserved
    }
}
