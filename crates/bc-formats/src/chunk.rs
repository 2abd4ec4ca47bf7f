//! Nested RIFF chunk trees.
//!
//! Writers build a tree of [`Chunk`] and [`ListChunk`] nodes and serialize
//! it depth-first in one pass. [`RiffChunks`] walks serialized chunks back.

use std::io::{self, Write};

pub type FourCc = [u8; 4];

/// A leaf chunk: tag plus payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub id: FourCc,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(id: &FourCc, data: Vec<u8>) -> Self {
        Self { id: *id, data }
    }

    /// A chunk holding a zero-terminated string, padded to even length.
    pub fn string(id: &FourCc, text: &str) -> Self {
        let mut data: Vec<u8> = text.bytes().filter(|&b| b != 0).collect();
        data.push(0);
        if data.len() % 2 != 0 {
            data.push(0);
        }
        Self::new(id, data)
    }

    pub fn payload_size(&self) -> u32 {
        self.data.len() as u32
    }

    /// Serialized size including header and pad byte.
    pub fn size(&self) -> u32 {
        8 + padded(self.payload_size())
    }

    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.id)?;
        w.write_all(&self.payload_size().to_le_bytes())?;
        w.write_all(&self.data)?;
        if self.data.len() % 2 != 0 {
            w.write_all(&[0])?;
        }
        Ok(())
    }
}

/// A `LIST` or `RIFF` container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListChunk {
    pub id: FourCc,
    pub list_type: FourCc,
    pub children: Vec<ChunkNode>,
}

impl ListChunk {
    pub fn list(list_type: &FourCc) -> Self {
        Self {
            id: *b"LIST",
            list_type: *list_type,
            children: Vec::new(),
        }
    }

    pub fn riff(form_type: &FourCc) -> Self {
        Self {
            id: *b"RIFF",
            list_type: *form_type,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, node: impl Into<ChunkNode>) -> &mut Self {
        self.children.push(node.into());
        self
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, node: impl Into<ChunkNode>) -> Self {
        self.children.push(node.into());
        self
    }

    /// List type tag plus the serialized children.
    pub fn payload_size(&self) -> u32 {
        4 + self.children.iter().map(ChunkNode::size).sum::<u32>()
    }

    pub fn size(&self) -> u32 {
        8 + padded(self.payload_size())
    }

    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.id)?;
        w.write_all(&self.payload_size().to_le_bytes())?;
        w.write_all(&self.list_type)?;
        for child in &self.children {
            child.write_to(w)?;
        }
        Ok(())
    }

    /// Serialize the whole tree into a new buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size() as usize);
        // writes into a Vec cannot fail
        let _ = self.write_to(&mut buf);
        buf
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkNode {
    Chunk(Chunk),
    List(ListChunk),
}

impl ChunkNode {
    pub fn size(&self) -> u32 {
        match self {
            ChunkNode::Chunk(c) => c.size(),
            ChunkNode::List(l) => l.size(),
        }
    }

    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        match self {
            ChunkNode::Chunk(c) => c.write_to(w),
            ChunkNode::List(l) => l.write_to(w),
        }
    }
}

impl From<Chunk> for ChunkNode {
    fn from(chunk: Chunk) -> Self {
        ChunkNode::Chunk(chunk)
    }
}

impl From<ListChunk> for ChunkNode {
    fn from(list: ListChunk) -> Self {
        ChunkNode::List(list)
    }
}

fn padded(size: u32) -> u32 {
    size + size % 2
}

/// Iterator over `(id, payload)` pairs of consecutive chunks.
///
/// Stops at the first header that does not fit; a payload running past
/// the end is truncated to the available bytes.
pub struct RiffChunks<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RiffChunks<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Children of a `LIST`/`RIFF` payload (skips the list type tag).
    pub fn in_list(payload: &'a [u8]) -> Self {
        Self::new(payload.get(4..).unwrap_or(&[]))
    }
}

impl<'a> Iterator for RiffChunks<'a> {
    type Item = (FourCc, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let header = self.data.get(self.pos..self.pos + 8)?;
        let id = [header[0], header[1], header[2], header[3]];
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let start = self.pos + 8;
        let end = start.saturating_add(size).min(self.data.len());
        self.pos = start.saturating_add(size).saturating_add(size % 2);
        Some((id, &self.data[start..end]))
    }
}

/// Find the first chunk with `id` among `chunks`.
pub fn find_chunk<'a>(chunks: RiffChunks<'a>, id: &FourCc) -> Option<&'a [u8]> {
    chunks.into_iter().find(|(cid, _)| cid == id).map(|(_, data)| data)
}

/// Find the first `LIST` whose type tag is `list_type`; returns its payload
/// including the tag.
pub fn find_list<'a>(chunks: RiffChunks<'a>, list_type: &FourCc) -> Option<&'a [u8]> {
    chunks
        .into_iter()
        .find(|(cid, data)| cid == b"LIST" && data.get(0..4) == Some(&list_type[..]))
        .map(|(_, data)| data)
}
