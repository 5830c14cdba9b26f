use std::collections::HashSet;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::encoding::{BIGLEN, END, VALUE_MAX_FREE};
use crate::entry::{EntryLayout, Slot, decode_slot};
use crate::error::{Result, ZipMapError};

/// Read-only view over a serialized zipmap.
///
/// Every read on [`crate::ZipMap`] goes through this type, and it can be
/// pointed directly at persisted bytes (a memory map, a network buffer) to
/// query them without copying.
#[derive(Clone, Copy)]
pub struct ZipMapRef<'a> {
    bytes: &'a [u8],
}

/// Result of a full scan: the matching entry, if any, and the blob length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Scan {
    pub found: Option<EntryLayout>,
    pub blob_len: usize,
}

impl<'a> ZipMapRef<'a> {
    /// Wraps `bytes` after checking the header: at least two bytes, the last
    /// one being the end marker. Use [`validate`] for a full walk.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        validate(bytes, false)?;
        Ok(Self { bytes })
    }

    /// Wraps `bytes` after walking every entry.
    pub fn new_validated(bytes: &'a [u8]) -> Result<Self> {
        validate(bytes, true)?;
        Ok(Self { bytes })
    }

    pub(crate) fn new_unchecked(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// The raw buffer, including the count byte and end marker.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Raw count byte: exact below [`BIGLEN`], frozen at it otherwise.
    pub fn count_byte(&self) -> u8 {
        self.bytes[0]
    }

    /// Walks all entries looking for `key`, always running to the end marker
    /// so the total length comes out of the same pass.
    pub(crate) fn scan(&self, key: Option<&[u8]>) -> Result<Scan> {
        let mut found = None;
        let mut pos = 1;
        while let Slot::Entry(entry) = decode_slot(self.bytes, pos)? {
            if found.is_none() && key.is_some_and(|k| entry.key(self.bytes) == k) {
                found = Some(entry);
            }
            pos = entry.end();
        }
        Ok(Scan {
            found,
            blob_len: pos + 1,
        })
    }

    /// Same walk as [`Self::scan`] but stops at the first match.
    pub(crate) fn find(&self, key: &[u8]) -> Result<Option<EntryLayout>> {
        let mut pos = 1;
        while let Slot::Entry(entry) = decode_slot(self.bytes, pos)? {
            if entry.key(self.bytes) == key {
                return Ok(Some(entry));
            }
            pos = entry.end();
        }
        Ok(None)
    }

    /// Looks up the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<&'a [u8]>> {
        Ok(self.find(key)?.map(|entry| entry.value(self.bytes)))
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.find(key)?.is_some())
    }

    /// Number of entries. O(1) while the count byte is exact, a full
    /// traversal once it is frozen.
    pub fn len(&self) -> Result<usize> {
        let count = self.count_byte();
        if count < BIGLEN {
            return Ok(count as usize);
        }
        self.count_entries()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.get(1) == Some(&END)
    }

    /// Counts entries by walking the buffer, ignoring the count byte.
    pub(crate) fn count_entries(&self) -> Result<usize> {
        let mut cursor = self.rewind();
        let mut count = 0;
        while let Some((_, next)) = self.next(cursor)? {
            cursor = next;
            count += 1;
        }
        Ok(count)
    }

    /// Serialized size in bytes, found by scanning up to the end marker.
    pub fn blob_len(&self) -> Result<usize> {
        Ok(self.scan(None)?.blob_len)
    }

    /// Cursor positioned on the first entry.
    pub fn rewind(&self) -> Cursor<'a> {
        Cursor::at(1)
    }

    /// Decodes the entry under `cursor` and returns it with the cursor moved
    /// past it, or `None` once the end marker is reached.
    pub fn next(&self, cursor: Cursor<'a>) -> Result<Option<(Entry<'a>, Cursor<'a>)>> {
        let Some(offset) = cursor.offset() else {
            return Ok(None);
        };
        match decode_slot(self.bytes, offset)? {
            Slot::End => Ok(None),
            Slot::Entry(layout) => {
                let entry = Entry {
                    key: layout.key(self.bytes),
                    value: layout.value(self.bytes),
                };
                Ok(Some((entry, Cursor::at(layout.end()))))
            }
        }
    }

    pub fn iter(&self) -> Iter<'a> {
        Iter {
            view: *self,
            cursor: self.rewind(),
        }
    }
}

impl<'a> IntoIterator for ZipMapRef<'a> {
    type Item = Result<Entry<'a>>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for ZipMapRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for entry in self.iter() {
            match entry {
                Ok(entry) => map.entry(&Escaped(entry.key), &Escaped(entry.value)),
                Err(_) => map.entry(&"<malformed>", &""),
            };
        }
        map.finish()
    }
}

struct Escaped<'a>(&'a [u8]);

impl fmt::Debug for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.escape_ascii())
    }
}

/// One key/value pair borrowed from the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub key: &'a [u8],
    pub value: &'a [u8],
}

/// Position of a forward walk over the entries.
///
/// A cursor borrows the map it was obtained from, so it cannot outlive a
/// mutation of that map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    state: CursorState,
    _map: PhantomData<&'a [u8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Positioned(usize),
    Done,
}

impl Cursor<'_> {
    fn at(offset: usize) -> Self {
        Self {
            state: CursorState::Positioned(offset),
            _map: PhantomData,
        }
    }

    /// Offset of the key tag the cursor points at, `None` once done.
    pub fn offset(&self) -> Option<usize> {
        match self.state {
            CursorState::Positioned(offset) => Some(offset),
            CursorState::Done => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == CursorState::Done
    }

    fn finish(&mut self) {
        self.state = CursorState::Done;
    }
}

/// Iterator over the entries in storage order.
///
/// Stops for good after the end marker or after yielding a decoding error.
pub struct Iter<'a> {
    view: ZipMapRef<'a>,
    cursor: Cursor<'a>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Result<Entry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.view.next(self.cursor) {
            Ok(Some((entry, next))) => {
                self.cursor = next;
                Some(Ok(entry))
            }
            Ok(None) => {
                self.cursor.finish();
                None
            }
            Err(err) => {
                self.cursor.finish();
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for Iter<'_> {}

/// Checks that `bytes` is a well formed zipmap.
///
/// The shallow check only looks at the size and the trailing end marker. The
/// deep check walks every entry with bounds checks and additionally rejects
/// slack of [`VALUE_MAX_FREE`] or more, duplicate keys, bytes after the
/// terminating end marker and an exact count byte that disagrees with the
/// number of entries.
pub fn validate(bytes: &[u8], deep: bool) -> Result<()> {
    if bytes.len() < 2 {
        return Err(ZipMapError::malformed(0, "buffer shorter than an empty map"));
    }
    if bytes[bytes.len() - 1] != END {
        return Err(ZipMapError::malformed(bytes.len() - 1, "missing end marker"));
    }
    let count_byte = bytes[0];
    if count_byte == END {
        return Err(ZipMapError::malformed(0, "count byte holds the end marker"));
    }
    if !deep {
        return Ok(());
    }

    let mut keys = HashSet::new();
    let mut pos = 1;
    while let Slot::Entry(entry) = decode_slot(bytes, pos)? {
        if entry.free >= VALUE_MAX_FREE {
            return Err(ZipMapError::malformed(entry.value_start - 1, "free byte too large"));
        }
        if !keys.insert(entry.key(bytes)) {
            return Err(ZipMapError::malformed(entry.offset, "duplicate key"));
        }
        pos = entry.end();
    }
    if pos != bytes.len() - 1 {
        return Err(ZipMapError::malformed(pos, "trailing bytes after end marker"));
    }
    if count_byte < BIGLEN && count_byte as usize != keys.len() {
        return Err(ZipMapError::malformed(0, "count byte disagrees with entries"));
    }
    Ok(())
}
