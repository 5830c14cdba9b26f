use std::ops::Range;

use crate::encoding::{END, decode_len};
use crate::error::{Result, ZipMapError};

/// Decoded position of one entry inside a zipmap buffer.
///
/// ```text
/// [key tag][key][value tag][free][value][free bytes of slack]
/// ^offset  ^key_start       ^    ^value_start                ^end()
/// ```
///
/// Offsets are relative to the start of the buffer, so a layout stays valid
/// only for the buffer it was decoded from and only until that buffer is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLayout {
    pub offset: usize,
    pub key_start: usize,
    pub key_len: usize,
    pub value_start: usize,
    pub value_len: usize,
    pub free: usize,
}

impl EntryLayout {
    /// Decodes the entry whose key tag starts at `offset`.
    ///
    /// Every field is bounds checked, and the entry must be followed by at
    /// least one more byte (the next key tag or the end marker).
    pub fn decode(buf: &[u8], offset: usize) -> Result<Self> {
        let (key_len, key_tag) = decode_len(buf, offset)?;
        let key_start = offset + key_tag;
        let value_tag_at = key_start
            .checked_add(key_len)
            .ok_or_else(|| ZipMapError::malformed(offset, "key length overflows"))?;

        let (value_len, value_tag) = decode_len(buf, value_tag_at)?;
        let free_at = value_tag_at + value_tag;
        let free = *buf
            .get(free_at)
            .ok_or_else(|| ZipMapError::malformed(free_at, "free byte past end of buffer"))?
            as usize;
        let value_start = free_at + 1;

        let end = value_start
            .checked_add(value_len)
            .and_then(|end| end.checked_add(free))
            .ok_or_else(|| ZipMapError::malformed(value_tag_at, "value length overflows"))?;
        if end >= buf.len() {
            return Err(ZipMapError::malformed(
                offset,
                "entry runs past the end marker",
            ));
        }

        Ok(EntryLayout {
            offset,
            key_start,
            key_len,
            value_start,
            value_len,
            free,
        })
    }

    /// Offset of the byte following this entry, including its slack.
    #[inline]
    pub fn end(&self) -> usize {
        self.value_start + self.value_len + self.free
    }

    /// Full number of bytes the entry occupies.
    #[inline]
    pub fn raw_len(&self) -> usize {
        self.end() - self.offset
    }

    #[inline]
    pub fn key_range(&self) -> Range<usize> {
        self.key_start..self.key_start + self.key_len
    }

    #[inline]
    pub fn value_range(&self) -> Range<usize> {
        self.value_start..self.value_start + self.value_len
    }

    pub fn key<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.key_range()]
    }

    pub fn value<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.value_range()]
    }
}

/// Outcome of decoding the position a cursor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Entry(EntryLayout),
    End,
}

/// Decodes whatever sits at `offset`: an entry or the end marker.
pub fn decode_slot(buf: &[u8], offset: usize) -> Result<Slot> {
    match buf.get(offset) {
        None => Err(ZipMapError::malformed(offset, "missing end marker")),
        Some(&END) => Ok(Slot::End),
        Some(_) => EntryLayout::decode(buf, offset).map(Slot::Entry),
    }
}
