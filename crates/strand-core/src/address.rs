//! Structural identifiers and addresses
//!
//! An [`Id`] is a short binary key that names an entity among its siblings.
//! An [`Address`] is the ordered list of ids from a tree root down to a node,
//! so any entity can be located again by walking from its root.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Maximum number of bytes in an [`Id`]
pub const MAX_ID_LEN: usize = 16;

/// Fixed-capacity binary identifier
///
/// Equality, ordering and hashing are byte-wise over the used bytes. The
/// canonical text form is upper-case hex, so `Id::from_u64(123)` formats
/// as `7B`.
#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Id {
    len: u8,
    bytes: [u8; MAX_ID_LEN],
}

impl Id {
    /// The invalid (empty) identifier
    pub const INVALID: Id = Id {
        len: 0,
        bytes: [0; MAX_ID_LEN],
    };

    /// Create an id from raw bytes
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() > MAX_ID_LEN {
            return Err(Error::InvalidId(format!(
                "{} bytes exceeds the maximum of {}",
                raw.len(),
                MAX_ID_LEN
            )));
        }
        let mut bytes = [0; MAX_ID_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            len: raw.len() as u8,
            bytes,
        })
    }

    /// Create an id holding the minimal big-endian bytes of `value`
    pub fn from_u64(value: u64) -> Self {
        let be = value.to_be_bytes();
        let skip = be.iter().take(7).take_while(|b| **b == 0).count();
        let mut bytes = [0; MAX_ID_LEN];
        bytes[..8 - skip].copy_from_slice(&be[skip..]);
        Self {
            len: (8 - skip) as u8,
            bytes,
        }
    }

    /// Parse the canonical hex form (case-insensitive)
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.len() % 2 != 0 {
            return Err(Error::InvalidId(format!("'{}' has an odd number of digits", text)));
        }
        if text.len() / 2 > MAX_ID_LEN {
            return Err(Error::InvalidId(format!("'{}' is too long", text)));
        }
        if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidId(format!("'{}' is not hex", text)));
        }
        let mut bytes = [0; MAX_ID_LEN];
        for (i, pair) in text.as_bytes().chunks(2).enumerate() {
            let digits = std::str::from_utf8(pair)
                .map_err(|_| Error::InvalidId(format!("'{}' is not hex", text)))?;
            bytes[i] = u8::from_str_radix(digits, 16)
                .map_err(|_| Error::InvalidId(format!("'{}' is not hex", text)))?;
        }
        Ok(Self {
            len: (text.len() / 2) as u8,
            bytes,
        })
    }

    /// The used bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of used bytes
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Check if this is the invalid (empty) id
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if this id is usable as an entity key
    pub fn is_valid(&self) -> bool {
        self.len > 0
    }

    /// Interpret the bytes as a big-endian integer, if they fit in a u64
    pub fn to_u64(&self) -> Option<u64> {
        if self.len() > 8 {
            return None;
        }
        Some(
            self.as_bytes()
                .iter()
                .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
        )
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::INVALID
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Id {}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.as_bytes() {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl TryFrom<String> for Id {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.to_string()
    }
}

/// Path of ids from a tree root to a node
///
/// `id_count()` is the depth of the node plus one; a root's address holds
/// just its own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(Vec<Id>);

impl Address {
    /// The invalid (empty) address
    pub const INVALID: Address = Address(Vec::new());

    /// Textual separator between ids
    pub const SEPARATOR: char = '/';

    /// Create an address from its ids, root first
    pub fn new(ids: Vec<Id>) -> Self {
        Self(ids)
    }

    /// Address one level deeper
    pub fn append(&self, id: Id) -> Address {
        let mut ids = Vec::with_capacity(self.0.len() + 1);
        ids.extend_from_slice(&self.0);
        ids.push(id);
        Address(ids)
    }

    /// Address of the parent node, if this is not a root address
    pub fn parent(&self) -> Option<Address> {
        if self.0.len() < 2 {
            return None;
        }
        Some(Address(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn last(&self) -> Option<Id> {
        self.0.last().copied()
    }

    pub fn get_id(&self, index: usize) -> Option<Id> {
        self.0.get(index).copied()
    }

    pub fn id_count(&self) -> usize {
        self.0.len()
    }

    pub fn ids(&self) -> &[Id] {
        &self.0
    }

    /// Check if `prefix` names this node or one of its ancestors
    pub fn starts_with(&self, prefix: &Address) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(Id::is_valid)
    }

    /// Parse the canonical text form (`00/0A/01FF`)
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::INVALID);
        }
        let mut ids = Vec::new();
        for segment in text.split(Self::SEPARATOR) {
            if segment.is_empty() {
                return Err(Error::InvalidAddress(format!("'{}' has an empty segment", text)));
            }
            ids.push(Id::parse(segment)?);
        }
        Ok(Self(ids))
    }

    /// Encode as length-prefixed id bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.iter().map(|id| id.len() + 1).sum());
        for id in &self.0 {
            out.push(id.len() as u8);
            out.extend_from_slice(id.as_bytes());
        }
        out
    }

    /// Decode the binary form produced by [`Address::to_bytes`]
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let mut ids = Vec::new();
        let mut rest = raw;
        while let Some((&len, tail)) = rest.split_first() {
            let len = len as usize;
            if tail.len() < len {
                return Err(Error::InvalidAddress(format!(
                    "truncated id: expected {} bytes, found {}",
                    len,
                    tail.len()
                )));
            }
            ids.push(Id::from_bytes(&tail[..len])?);
            rest = &tail[len..];
        }
        Ok(Self(ids))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", Self::SEPARATOR)?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Id> for Address {
    fn from(id: Id) -> Self {
        Address(vec![id])
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_u64_is_minimal() {
        assert_eq!(Id::from_u64(123).as_bytes(), &[0x7B]);
        assert_eq!(Id::from_u64(0).as_bytes(), &[0x00]);
        assert_eq!(Id::from_u64(0x1FF).as_bytes(), &[0x01, 0xFF]);
        assert_eq!(Id::from_u64(0x1FF).to_u64(), Some(0x1FF));
    }

    #[test]
    fn test_id_text_form() {
        assert_eq!(Id::parse("7B").unwrap(), Id::from_u64(123));
        assert_eq!(Id::parse("c8").unwrap(), Id::from_u64(200));
        assert_eq!(Id::from_u64(200).to_string(), "C8");
        assert!(Id::parse("7").is_err());
        assert!(Id::parse("ZZ").is_err());
        assert!(matches!(Id::parse("+1"), Err(Error::InvalidId(_))));
        assert!(Id::parse("-1").is_err());
        assert!(Address::parse("01/+2").is_err());
        assert_eq!(Id::parse("").unwrap(), Id::INVALID);
    }

    #[test]
    fn test_id_ordering_is_bytewise() {
        let a = Id::from_bytes(&[0x01]).unwrap();
        let b = Id::from_bytes(&[0x01, 0x00]).unwrap();
        let c = Id::from_bytes(&[0x02]).unwrap();
        assert!(a < b);
        assert!(b < c);
        assert!(!Id::INVALID.is_valid());
    }

    #[test]
    fn test_id_too_long() {
        assert!(Id::from_bytes(&[0; MAX_ID_LEN + 1]).is_err());
        assert!(Id::from_bytes(&[0; MAX_ID_LEN]).is_ok());
    }

    #[test]
    fn test_address_append_and_parent() {
        let root = Address::from(Id::from_u64(1));
        let child = root.append(Id::from_u64(2));
        let grandchild = child.append(Id::from_u64(3));

        assert_eq!(root.id_count(), 1);
        assert_eq!(grandchild.id_count(), 3);
        assert_eq!(grandchild.parent(), Some(child.clone()));
        assert_eq!(root.parent(), None);
        assert_eq!(grandchild.last(), Some(Id::from_u64(3)));
        assert!(grandchild.starts_with(&child));
        assert!(!child.starts_with(&grandchild));
    }

    #[test]
    fn test_address_text_and_binary_forms() {
        let address = Address::new(vec![Id::from_u64(0), Id::from_u64(10), Id::from_u64(0x1FF)]);
        assert_eq!(address.to_string(), "00/0A/01FF");
        assert_eq!(Address::parse("00/0A/01FF").unwrap(), address);
        assert_eq!(address.to_bytes(), vec![1, 0x00, 1, 0x0A, 2, 0x01, 0xFF]);
        assert_eq!(Address::from_bytes(&address.to_bytes()).unwrap(), address);

        assert_eq!(Address::parse("").unwrap(), Address::INVALID);
        assert!(!Address::INVALID.is_valid());
        assert!(Address::parse("01//02").is_err());
        assert!(Address::from_bytes(&[3, 0x01]).is_err());
    }

    #[test]
    fn test_address_serde_uses_text_form() {
        let address = Address::new(vec![Id::from_u64(1), Id::from_u64(0xAB)]);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"01/AB\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
