//! In-memory source file images.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// A named, immutable file image that scanners read from.
///
/// Cloning is cheap: the bytes are shared.
#[derive(Clone, Debug)]
pub struct RawFile {
    name: String,
    data: Arc<[u8]>,
}

impl RawFile {
    /// Wrap a byte buffer under the given file name.
    pub fn new(name: &str, data: Vec<u8>) -> Self {
        Self {
            name: String::from(name),
            data: Arc::from(data),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased extension of the file name, without the dot.
    pub fn extension(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes in `offset..offset + len`, clamped to the end of the file.
    pub fn slice(&self, offset: u32, len: u32) -> &[u8] {
        let start = (offset as usize).min(self.data.len());
        let end = start.saturating_add(len as usize).min(self.data.len());
        &self.data[start..end]
    }

    pub fn get_u8(&self, offset: u32) -> Option<u8> {
        self.data.get(offset as usize).copied()
    }

    pub fn get_u16_le(&self, offset: u32) -> Option<u16> {
        self.array::<2>(offset).map(u16::from_le_bytes)
    }

    pub fn get_u16_be(&self, offset: u32) -> Option<u16> {
        self.array::<2>(offset).map(u16::from_be_bytes)
    }

    pub fn get_u32_le(&self, offset: u32) -> Option<u32> {
        self.array::<4>(offset).map(u32::from_le_bytes)
    }

    pub fn get_u32_be(&self, offset: u32) -> Option<u32> {
        self.array::<4>(offset).map(u32::from_be_bytes)
    }

    /// True if `offset..offset + len` lies entirely inside the file.
    pub fn contains(&self, offset: u32, len: u32) -> bool {
        (offset as usize)
            .checked_add(len as usize)
            .is_some_and(|end| end <= self.data.len())
    }

    fn array<const N: usize>(&self, offset: u32) -> Option<[u8; N]> {
        let start = offset as usize;
        let bytes = self.data.get(start..start.checked_add(N)?)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Some(out)
    }
}
