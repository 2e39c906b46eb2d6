use alloc::{string::String, vec::Vec};
use core::str;

/// A raw devicetree property
///
/// Values keep the flattened encoding: integers are big-endian 32-bit cells
/// and string lists are NUL-separated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Property {
    name: String,
    value: Vec<u8>,
}

impl Property {
    pub fn new(name: &str, value: Vec<u8>) -> Self {
        Self {
            name: String::from(name),
            value,
        }
    }

    /// A boolean property: present, without a value
    pub fn flag(name: &str) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn u32(name: &str, value: u32) -> Self {
        Self::u32s(name, &[value])
    }

    pub fn u32s(name: &str, cells: &[u32]) -> Self {
        let mut value = Vec::with_capacity(cells.len() * 4);
        for cell in cells {
            value.extend_from_slice(&cell.to_be_bytes());
        }
        Self::new(name, value)
    }

    pub fn string(name: &str, value: &str) -> Self {
        Self::strings(name, &[value])
    }

    pub fn strings(name: &str, values: &[&str]) -> Self {
        let mut value = Vec::new();
        for s in values {
            value.extend_from_slice(s.as_bytes());
            value.push(0);
        }
        Self::new(name, value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// First cell of the property
    pub fn as_u32(&self) -> Option<u32> {
        self.u32_at(0)
    }

    /// Cell at `index`, if the property is long enough
    pub fn u32_at(&self, index: usize) -> Option<u32> {
        let start = index.checked_mul(4)?;
        let cell = self.value.get(start..start + 4)?;
        Some(u32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]))
    }

    /// All whole cells of the property; trailing bytes are ignored
    pub fn as_u32_array(&self) -> Vec<u32> {
        self.value
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// First string of the property
    pub fn as_str(&self) -> Option<&str> {
        self.as_str_list().into_iter().next()
    }

    pub fn as_str_list(&self) -> Vec<&str> {
        let mut value = self.value.as_slice();
        if let Some((&0, rest)) = value.split_last() {
            value = rest;
        }
        if value.is_empty() {
            return Vec::new();
        }
        value
            .split(|b| *b == 0)
            .filter_map(|s| str::from_utf8(s).ok())
            .collect()
    }
}
