//! Tree addresses
//!
//! An address is a path of child indices from the document root to a target
//! node, plus an optional character offset into a text node. Addresses are
//! immutable value snapshots: every transformation returns a new address, so
//! a live selection can never be corrupted by a concurrent re-resolution.
//!
//! Two encodings exist for cross-version compatibility. Legacy (V1) indices
//! count positions in the raw child sequence, synthetic wrapper nodes
//! included. Normalized (V2) indices count positions in a view that skips
//! wrappers, so paths survive changes to the tree builder's wrapping policy.
//! A document's requested shape version picks the encoding; see
//! [`crate::context::DOM_VERSION_NORMALIZED_ADDRESSES`].

pub mod navigate;
pub mod parser;
pub mod resolve;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::serial::SerialBuf;

pub use parser::{AddressParseError, ParsedPath, PathStep, StepName};

const ADDRESS_MAGIC: &[u8] = b"addr";

/// Position in the document tree.
///
/// The null address (no steps, no offset) is the "unresolved" sentinel:
/// operations that fail to locate a node return it instead of an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// Child indices from the root, in the encoding-appropriate child view
    pub steps: Vec<u32>,
    /// Character offset within the target text node
    pub offset: Option<u32>,
}

impl Address {
    /// The unresolved sentinel
    pub fn null() -> Self {
        Address::default()
    }

    pub fn is_null(&self) -> bool {
        self.steps.is_empty() && self.offset.is_none()
    }

    pub fn new(steps: Vec<u32>, offset: Option<u32>) -> Self {
        Address { steps, offset }
    }

    /// Same position, offset dropped
    pub fn without_offset(&self) -> Address {
        Address {
            steps: self.steps.clone(),
            offset: None,
        }
    }

    /// Same node, different offset
    pub fn with_offset(&self, offset: u32) -> Address {
        Address {
            steps: self.steps.clone(),
            offset: Some(offset),
        }
    }

    /// True if `self` names an ancestor of (or the same node as) `other`
    pub fn is_prefix_of(&self, other: &Address) -> bool {
        self.steps.len() <= other.steps.len()
            && self.steps.iter().zip(&other.steps).all(|(a, b)| a == b)
    }

    pub fn serialize(&self, buf: &mut SerialBuf) {
        buf.put_magic(ADDRESS_MAGIC);
        buf.write_u16(self.steps.len() as u16);
        for s in &self.steps {
            buf.write_u32(*s);
        }
        match self.offset {
            Some(o) => {
                buf.write_bool(true);
                buf.write_u32(o);
            }
            None => buf.write_bool(false),
        }
    }

    pub fn deserialize(buf: &mut SerialBuf) -> Option<Address> {
        if !buf.check_magic(ADDRESS_MAGIC) {
            return None;
        }
        let count = buf.read_u16() as usize;
        let mut steps = Vec::with_capacity(count);
        for _ in 0..count {
            steps.push(buf.read_u32());
        }
        let offset = if buf.read_bool() {
            Some(buf.read_u32())
        } else {
            None
        };
        if buf.error() {
            return None;
        }
        Some(Address { steps, offset })
    }
}

/// Lexicographic document order: an ancestor sorts before its descendants,
/// earlier siblings before later ones; a missing offset compares as zero.
impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.steps.iter().zip(&other.steps) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        match self.steps.len().cmp(&other.steps.len()) {
            Ordering::Equal => {}
            non_eq => return non_eq,
        }
        self.offset.unwrap_or(0).cmp(&other.offset.unwrap_or(0))
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(steps: &[u32], offset: Option<u32>) -> Address {
        Address::new(steps.to_vec(), offset)
    }

    #[test]
    fn test_document_order() {
        let a = addr(&[0, 1], None);
        let b = addr(&[0, 2], None);
        let c = addr(&[0, 1, 0], None);
        assert!(a < b);
        // ancestor precedes descendant
        assert!(a < c);
        assert!(c < b);
    }

    #[test]
    fn test_offset_order() {
        let a = addr(&[0, 1], Some(3));
        let b = addr(&[0, 1], Some(7));
        let c = addr(&[0, 1], None);
        assert!(a < b);
        // missing offset compares as zero
        assert!(c < a);
        assert_eq!(c.cmp(&addr(&[0, 1], Some(0))), Ordering::Equal);
    }

    #[test]
    fn test_null_sentinel() {
        assert!(Address::null().is_null());
        assert!(!addr(&[0], None).is_null());
    }

    #[test]
    fn test_prefix() {
        let parent = addr(&[0, 1], None);
        let child = addr(&[0, 1, 4], Some(2));
        assert!(parent.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
    }

    #[test]
    fn test_serial_roundtrip() {
        let a = addr(&[0, 3, 1], Some(15));
        let mut buf = SerialBuf::new(64);
        a.serialize(&mut buf);
        let mut buf = SerialBuf::from_bytes(buf.into_bytes());
        assert_eq!(Address::deserialize(&mut buf), Some(a));

        let n = Address::null();
        let mut buf = SerialBuf::new(16);
        n.serialize(&mut buf);
        let mut buf = SerialBuf::from_bytes(buf.into_bytes());
        assert_eq!(Address::deserialize(&mut buf), Some(n));
    }
}
