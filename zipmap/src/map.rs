use std::fmt;

use tracing::{debug, trace, warn};

use crate::byte_store::ByteStore;
use crate::config::ZipMapConfig;
use crate::encoding::{BIGLEN, EMPTY, END, VALUE_MAX_FREE, check_encodable, encode_len, required_len};
use crate::entry::{Slot, decode_slot};
use crate::error::{Result, ZipMapError};
use crate::view::{Cursor, Entry, Iter, Scan, ZipMapRef, validate};

/// A map of byte strings packed into one contiguous buffer.
///
/// Layout:
/// ```text
/// [count][key tag][key][value tag][free][value][slack] ... [0xff]
/// ```
///
/// Lookups are linear scans, so this is meant for small maps where the
/// per-entry overhead (as little as three bytes) matters more than lookup
/// speed. The buffer is always exactly [`ZipMap::blob_len`] bytes long and can
/// be persisted with [`ZipMap::as_bytes`] and adopted back with
/// [`ZipMap::from_store`].
///
/// Mutations take `&mut self`, so keys, values and cursors borrowed from the
/// map cannot be used after the buffer has been moved or resized.
///
/// # Example
///
/// ```
/// use zipmap::ZipMap;
///
/// let mut map = ZipMap::new();
/// assert!(!map.set(b"foo", b"bar").unwrap());
/// assert!(map.set(b"foo", b"baz").unwrap());
/// assert_eq!(map.get(b"foo").unwrap(), Some(b"baz".as_ref()));
/// assert_eq!(map.len().unwrap(), 1);
/// assert_eq!(map.as_bytes(), b"\x01\x03foo\x03\x00baz\xff");
/// ```
#[derive(Clone)]
pub struct ZipMap<S: ByteStore = Vec<u8>> {
    store: S,
}

impl ZipMap<Vec<u8>> {
    /// Creates an empty map backed by a two byte `Vec`.
    pub fn new() -> Self {
        Self {
            store: EMPTY.to_vec(),
        }
    }

    /// Adopts a persisted blob, validating it completely.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_store(bytes.to_vec())
    }

    /// Builds a map from key/value pairs; later duplicates overwrite earlier ones.
    pub fn try_from_iter<I, K, V>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut map = Self::new();
        map.try_extend(iter)?;
        Ok(map)
    }

    /// Releases the buffer, which holds exactly the serialized map.
    pub fn into_bytes(self) -> Vec<u8> {
        self.store
    }
}

impl Default for ZipMap<Vec<u8>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ByteStore> ZipMap<S> {
    /// Creates an empty map in `store`, resizing it to two bytes.
    pub fn new_in(mut store: S) -> Result<Self> {
        store.realloc(EMPTY.len())?;
        store.as_mut().copy_from_slice(&EMPTY);
        Ok(Self { store })
    }

    /// Adopts a store that already holds a serialized map, with a deep
    /// integrity check.
    pub fn from_store(store: S) -> Result<Self> {
        Self::from_store_with(store, &ZipMapConfig::default())
    }

    /// Adopts a store that already holds a serialized map.
    ///
    /// A blob failing validation is rejected as a whole; no attempt is made
    /// to salvage the entries before the corruption. With
    /// `validate_on_load` disabled only the frame is checked and corruption
    /// surfaces as errors from later operations instead.
    pub fn from_store_with(store: S, config: &ZipMapConfig) -> Result<Self> {
        let bytes = store.as_ref();
        if let Err(err) = validate(bytes, config.validate_on_load) {
            warn!(len = bytes.len(), %err, "rejecting zipmap blob");
            return Err(err);
        }
        Ok(Self { store })
    }

    /// Read-only view over the current buffer.
    pub fn view(&self) -> ZipMapRef<'_> {
        ZipMapRef::new_unchecked(self.store.as_ref())
    }

    /// The serialized map.
    pub fn as_bytes(&self) -> &[u8] {
        self.store.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Sets `key` to `value`, returning whether the key already existed.
    ///
    /// New keys are appended at the end. An existing entry is rewritten in
    /// place: the tail is shifted forward when the new entry is larger, and
    /// leftover space is either kept as slack in the free byte or, when it
    /// reaches [`VALUE_MAX_FREE`], compacted away.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        check_encodable(key.len())?;
        check_encodable(value.len())?;
        let required = required_len(key.len(), value.len());
        let scan = self.scan_for_write(key)?;

        let (offset, occupied, existed) = match scan.found {
            None => {
                let offset = scan.blob_len - 1;
                self.resize_and_shift(offset, offset + required, scan.blob_len + required)?;
                let count = self.store.as_ref()[0];
                if count < BIGLEN {
                    self.store.as_mut()[0] = count + 1;
                }
                (offset, required, false)
            }
            Some(entry) => {
                let existing = entry.raw_len();
                if existing < required {
                    let new_len = scan.blob_len - existing + required;
                    self.resize_and_shift(entry.end(), entry.offset + required, new_len)?;
                    (entry.offset, required, true)
                } else {
                    (entry.offset, existing, true)
                }
            }
        };

        let slack = occupied - required;
        let free = if slack >= VALUE_MAX_FREE {
            debug!(slack, offset, "compacting value slack");
            let new_len = self.store.as_ref().len() - slack;
            self.resize_and_shift(offset + occupied, offset + required, new_len)?;
            0
        } else {
            slack
        };

        self.write_entry(offset, key, value, free);
        Ok(existed)
    }

    /// Removes `key`, returning whether it was present. The buffer is left
    /// untouched when it was not.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        let scan = self.scan_for_write(key)?;
        let Some(entry) = scan.found else {
            return Ok(false);
        };
        let new_len = scan.blob_len - entry.raw_len();
        self.resize_and_shift(entry.end(), entry.offset, new_len)?;
        let count = self.store.as_ref()[0];
        if count < BIGLEN {
            self.store.as_mut()[0] = count.saturating_sub(1);
        }
        Ok(true)
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<&[u8]>> {
        self.view().get(key)
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        self.view().exists(key)
    }

    /// Number of entries.
    ///
    /// Reads the count byte while it is exact. Once it is frozen the entries
    /// are counted, and the byte is restored when the count has dropped back
    /// below [`BIGLEN`].
    pub fn len(&mut self) -> Result<usize> {
        let count = self.store.as_ref()[0];
        if count < BIGLEN {
            return Ok(count as usize);
        }
        let len = self.view().count_entries()?;
        if len < BIGLEN as usize {
            debug!(len, "restoring exact count byte");
            self.store.as_mut()[0] = len as u8;
        }
        Ok(len)
    }

    pub fn is_empty(&self) -> bool {
        self.view().is_empty()
    }

    /// Serialized size in bytes, found by scanning to the end marker.
    pub fn blob_len(&self) -> Result<usize> {
        self.view().blob_len()
    }

    /// Cursor on the first entry, to be advanced with [`Self::next`].
    pub fn rewind(&self) -> Cursor<'_> {
        self.view().rewind()
    }

    /// Decodes the entry under `cursor`, returning it together with the
    /// advanced cursor, or `None` at the end marker.
    pub fn next<'a>(&'a self, cursor: Cursor<'a>) -> Result<Option<(Entry<'a>, Cursor<'a>)>> {
        self.view().next(cursor)
    }

    pub fn iter(&self) -> Iter<'_> {
        self.view().iter()
    }

    /// Sets every pair in order, stopping at the first error.
    pub fn try_extend<I, K, V>(&mut self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        for (key, value) in iter {
            self.set(key.as_ref(), value.as_ref())?;
        }
        Ok(())
    }

    /// True when the map has outgrown the thresholds in `config` and the
    /// caller should move to another representation.
    pub fn exceeds(&self, config: &ZipMapConfig) -> Result<bool> {
        if self.view().len()? > config.max_entries {
            return Ok(true);
        }
        for entry in self.iter() {
            let entry = entry?;
            if !config.accepts(entry.key, entry.value) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Renders the buffer structure, slack included:
    /// `{status 2}{key 3}foo{value 3}bar[.]{key 5}hello{value 5}world{end}`.
    pub fn repr(&self) -> Result<String> {
        let bytes = self.as_bytes();
        let mut out = format!("{{status {}}}", bytes[0]);
        let mut pos = 1;
        while let Slot::Entry(entry) = decode_slot(bytes, pos)? {
            out.push_str(&format!("{{key {}}}", entry.key_len));
            out.push_str(&String::from_utf8_lossy(entry.key(bytes)));
            out.push_str(&format!("{{value {}}}", entry.value_len));
            out.push_str(&String::from_utf8_lossy(entry.value(bytes)));
            if entry.free > 0 {
                out.push('[');
                out.push_str(&".".repeat(entry.free));
                out.push(']');
            }
            pos = entry.end();
        }
        out.push_str("{end}");
        Ok(out)
    }

    /// Scan used by mutations, which rely on the end marker found by the walk
    /// being the last byte of the store.
    fn scan_for_write(&self, key: &[u8]) -> Result<Scan> {
        let scan = self.view().scan(Some(key))?;
        if scan.blob_len != self.store.as_ref().len() {
            return Err(ZipMapError::malformed(
                scan.blob_len - 1,
                "trailing bytes after end marker",
            ));
        }
        Ok(scan)
    }

    /// Moves the tail `src..end marker` to start at `dst` and resizes the
    /// buffer to `new_len`, rewriting the end marker.
    ///
    /// Growing reallocates before moving and shrinking moves before
    /// reallocating, so the tail is never cut off. A failed grow leaves the
    /// buffer untouched.
    fn resize_and_shift(&mut self, src: usize, dst: usize, new_len: usize) -> Result<()> {
        let old_len = self.store.as_ref().len();
        let tail = old_len - 1 - src;
        debug_assert_eq!(dst + tail + 1, new_len);
        trace!(src, dst, old_len, new_len, "resize and shift");

        if new_len >= old_len {
            self.store.realloc(new_len)?;
            self.store.as_mut().copy_within(src..src + tail, dst);
        } else {
            self.store.as_mut().copy_within(src..src + tail, dst);
            self.store.realloc(new_len)?;
        }
        self.store.as_mut()[new_len - 1] = END;
        Ok(())
    }

    fn write_entry(&mut self, offset: usize, key: &[u8], value: &[u8], free: usize) {
        let buf = self.store.as_mut();
        let mut p = offset;
        p += encode_len(&mut buf[p..], key.len());
        buf[p..p + key.len()].copy_from_slice(key);
        p += key.len();
        p += encode_len(&mut buf[p..], value.len());
        buf[p] = free as u8;
        p += 1;
        buf[p..p + value.len()].copy_from_slice(value);
    }
}

impl<S: ByteStore> fmt::Debug for ZipMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}

impl<S: ByteStore> PartialEq for ZipMap<S> {
    /// Two maps are equal when their buffers are byte-for-byte identical.
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<S: ByteStore> Eq for ZipMap<S> {}

impl<'a, S: ByteStore> IntoIterator for &'a ZipMap<S> {
    type Item = Result<Entry<'a>>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_store::{AllocStats, TrackedStore};
    use proptest::prelude::*;

    fn bytes_of(map: &ZipMap<impl ByteStore>) -> Vec<u8> {
        map.as_bytes().to_vec()
    }

    /// A store that refuses to grow past `cap` bytes.
    struct CappedStore {
        inner: Vec<u8>,
        cap: usize,
    }

    impl AsRef<[u8]> for CappedStore {
        fn as_ref(&self) -> &[u8] {
            &self.inner
        }
    }

    impl AsMut<[u8]> for CappedStore {
        fn as_mut(&mut self) -> &mut [u8] {
            &mut self.inner
        }
    }

    impl ByteStore for CappedStore {
        fn realloc(&mut self, new_len: usize) -> Result<()> {
            if new_len > self.cap {
                return Err(ZipMapError::Alloc { requested: new_len });
            }
            self.inner.realloc(new_len)
        }
    }

    macro_rules! store_tests {
        ($($name:ident => $store:expr),* $(,)?) => {
            $(
                paste::paste! {
                    #[test]
                    fn [<set_get_delete_ $name>]() {
                        let mut map = ZipMap::new_in($store).unwrap();
                        assert_eq!(map.as_bytes(), &EMPTY);
                        assert!(!map.set(b"foo", b"bar").unwrap());
                        assert!(!map.set(b"hello", b"world").unwrap());
                        assert_eq!(map.get(b"foo").unwrap(), Some(b"bar".as_ref()));
                        assert_eq!(map.len().unwrap(), 2);
                        assert!(map.delete(b"foo").unwrap());
                        assert_eq!(map.as_bytes(), b"\x01\x05hello\x05\x00world\xff");
                    }
                }
            )*
        };
    }

    store_tests! {
        vec => Vec::<u8>::new(),
        boxed => Box::<[u8]>::default(),
        tracked => TrackedStore::new(Vec::new(), AllocStats::new()),
    }

    #[test]
    fn new_map_is_two_bytes() {
        let mut map = ZipMap::new();
        assert_eq!(map.len().unwrap(), 0);
        assert_eq!(map.blob_len().unwrap(), 2);
        assert_eq!(map.as_bytes(), &[0, END]);
        assert!(map.is_empty());
        assert!(map.iter().next().is_none());
    }

    #[test]
    fn single_entry_layout() {
        let mut map = ZipMap::new();
        assert!(!map.set(b"foo", b"bar").unwrap());
        assert_eq!(map.get(b"foo").unwrap(), Some(b"bar".as_ref()));
        assert_eq!(map.len().unwrap(), 1);
        assert_eq!(map.as_bytes(), b"\x01\x03foo\x03\x00bar\xff");
        assert_eq!(map.blob_len().unwrap(), 11);
    }

    #[test]
    fn updates_shrink_grow_and_compact() {
        let mut map = ZipMap::new();
        for key in [b"name".as_ref(), b"surname", b"age"] {
            map.set(key, b"foo").unwrap();
        }
        assert_eq!(
            map.repr().unwrap(),
            "{status 3}{key 4}name{value 3}foo{key 7}surname{value 3}foo{key 3}age{value 3}foo{end}"
        );

        map.set(b"hello", b"world!").unwrap();
        map.set(b"foo", b"bar").unwrap();
        map.set(b"foo", b"!").unwrap();
        assert!(map.repr().unwrap().ends_with("{key 3}foo{value 1}![..]{end}"));

        map.set(b"foo", b"12345").unwrap();
        map.set(b"new", b"xx").unwrap();
        map.set(b"noval", b"").unwrap();
        assert!(map.delete(b"new").unwrap());
        assert_eq!(
            map.repr().unwrap(),
            "{status 6}{key 4}name{value 3}foo{key 7}surname{value 3}foo{key 3}age{value 3}foo\
             {key 5}hello{value 6}world!{key 3}foo{value 5}12345{key 5}noval{value 0}{end}"
        );
        assert_eq!(map.get(b"noval").unwrap(), Some(b"".as_ref()));
    }

    #[test]
    fn slack_is_reused_without_reallocating() {
        let stats = AllocStats::new();
        let mut map = ZipMap::new_in(TrackedStore::new(Vec::new(), stats.clone())).unwrap();
        map.set(b"k", b"hello").unwrap();
        map.set(b"other", b"value").unwrap();
        let len = map.as_bytes().len();
        let reallocs = stats.reallocations();

        // shrink by 3: slack stays in the entry
        assert!(map.set(b"k", b"hi").unwrap());
        assert_eq!(map.as_bytes().len(), len);
        assert_eq!(map.view().find(b"k").unwrap().unwrap().free, 3);

        // regrow within the slack
        assert!(map.set(b"k", b"hey!").unwrap());
        assert_eq!(map.as_bytes().len(), len);
        assert_eq!(map.view().find(b"k").unwrap().unwrap().free, 1);
        assert_eq!(stats.reallocations(), reallocs);

        assert_eq!(map.get(b"k").unwrap(), Some(b"hey!".as_ref()));
        assert_eq!(map.get(b"other").unwrap(), Some(b"value".as_ref()));
        assert_eq!(map.len().unwrap(), 2);
    }

    #[test]
    fn large_slack_is_compacted() {
        let mut map = ZipMap::new();
        map.set(b"k", b"hello world").unwrap();
        map.set(b"tail", b"t").unwrap();
        let len = map.as_bytes().len();

        map.set(b"k", b"h").unwrap();
        assert_eq!(map.as_bytes().len(), len - 10);
        assert_eq!(map.view().find(b"k").unwrap().unwrap().free, 0);
        assert_eq!(map.get(b"tail").unwrap(), Some(b"t".as_ref()));
        assert_eq!(map.blob_len().unwrap(), map.as_bytes().len());
    }

    #[test]
    fn long_lengths_switch_tag_width() {
        let long_key = vec![b'a'; 512];
        let long_value = vec![b'v'; 254];
        let mut map = ZipMap::new();
        map.set(&long_key, b"long").unwrap();
        map.set(b"short", b"x").unwrap();
        assert_eq!(map.get(&long_key).unwrap(), Some(b"long".as_ref()));

        // value grows from a 1 byte tag to a 5 byte tag and back
        map.set(b"short", &long_value).unwrap();
        assert_eq!(map.get(b"short").unwrap(), Some(long_value.as_slice()));
        map.set(b"short", b"y").unwrap();
        assert_eq!(map.get(b"short").unwrap(), Some(b"y".as_ref()));
        assert_eq!(map.get(&long_key).unwrap(), Some(b"long".as_ref()));
        assert_eq!(map.as_bytes().len(), 2 + required_len(512, 4) + required_len(5, 1));
    }

    #[test]
    fn count_byte_freezes_at_254() {
        let mut map = ZipMap::new();
        for i in 0..253u32 {
            map.set(&i.to_le_bytes(), b"v").unwrap();
        }
        assert_eq!(map.view().count_byte(), 253);

        map.set(&253u32.to_le_bytes(), b"v").unwrap();
        assert_eq!(map.view().count_byte(), BIGLEN);
        assert_eq!(map.len().unwrap(), 254);

        for i in 254..300u32 {
            map.set(&i.to_le_bytes(), b"v").unwrap();
        }
        assert_eq!(map.view().count_byte(), BIGLEN);
        assert_eq!(map.len().unwrap(), 300);

        // updates never touch the count
        map.set(&7u32.to_le_bytes(), b"updated").unwrap();
        assert_eq!(map.len().unwrap(), 300);

        for i in 0..47u32 {
            assert!(map.delete(&i.to_le_bytes()).unwrap());
        }
        assert_eq!(map.view().count_byte(), BIGLEN);
        assert_eq!(map.len().unwrap(), 253);
        // the traversal restored the exact count
        assert_eq!(map.view().count_byte(), 253);

        map.set(b"again", b"v").unwrap();
        assert_eq!(map.view().count_byte(), BIGLEN);
        assert_eq!(map.len().unwrap(), 254);
    }

    #[test]
    fn deleting_everything_leaves_an_empty_map() {
        let mut map = ZipMap::new();
        let keys: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i; i as usize + 1]).collect();
        for key in &keys {
            map.set(key, key).unwrap();
        }
        for (deleted, key) in keys.iter().enumerate() {
            assert!(map.delete(key).unwrap());
            assert_eq!(*map.as_bytes().last().unwrap(), END);
            assert_eq!(map.len().unwrap(), keys.len() - deleted - 1);
        }
        assert_eq!(map.len().unwrap(), 0);
        assert_eq!(map.as_bytes(), &EMPTY);
    }

    #[test]
    fn deleting_a_missing_key_changes_nothing() {
        let mut map = ZipMap::try_from_iter([(b"a", b"1"), (b"b", b"2")]).unwrap();
        let before = bytes_of(&map);
        assert!(!map.delete(b"c").unwrap());
        assert_eq!(bytes_of(&map), before);
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut map = ZipMap::new();
        map.set(b"one", b"1").unwrap();
        map.set(b"two", b"2").unwrap();
        map.set(b"three", b"3").unwrap();
        map.set(b"two", b"a much longer value").unwrap();
        map.delete(b"one").unwrap();
        map.set(b"one", b"back").unwrap();

        let keys: Vec<&[u8]> = map.iter().map(|e| e.unwrap().key).collect();
        assert_eq!(keys, vec![b"two".as_ref(), b"three", b"one"]);

        let mut cursor = map.rewind();
        let mut seen = 0;
        while let Some((entry, next)) = map.next(cursor).unwrap() {
            assert_eq!(map.get(entry.key).unwrap(), Some(entry.value));
            cursor = next;
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn failed_growth_leaves_the_map_untouched() {
        let store = CappedStore {
            inner: Vec::new(),
            cap: 16,
        };
        let mut map = ZipMap::new_in(store).unwrap();
        map.set(b"k", b"v").unwrap();
        let before = bytes_of(&map);

        let err = map.set(b"key", b"far too long for the cap").unwrap_err();
        assert!(matches!(err, ZipMapError::Alloc { .. }));
        assert_eq!(bytes_of(&map), before);

        let err = map.set(b"k", b"also far too long").unwrap_err();
        assert!(matches!(err, ZipMapError::Alloc { .. }));
        assert_eq!(bytes_of(&map), before);
        assert_eq!(map.get(b"k").unwrap(), Some(b"v".as_ref()));
    }

    #[test]
    fn from_bytes_round_trip() {
        let mut map = ZipMap::try_from_iter([(b"x", b"1"), (b"y", b"2")]).unwrap();
        map.set(b"x", b"").unwrap();
        let len = map.blob_len().unwrap();
        let copy = ZipMap::from_bytes(&map.as_bytes()[..len]).unwrap();
        assert_eq!(copy, map);
        assert_eq!(copy.get(b"y").unwrap(), Some(b"2".as_ref()));
    }

    #[test]
    fn lenient_load_defers_errors_to_operations() {
        let config = ZipMapConfig::default().with_validation(false);
        let bytes = b"\x01\x03foo\x03\x00bar\xff\x00\xff".to_vec();
        assert!(ZipMap::from_bytes(&bytes).is_err());

        let mut map = ZipMap::from_store_with(bytes, &config).unwrap();
        assert_eq!(map.get(b"foo").unwrap(), Some(b"bar".as_ref()));
        assert!(map.set(b"baz", b"qux").unwrap_err().is_malformed());
        assert!(map.delete(b"foo").unwrap_err().is_malformed());

        let truncated = b"\x01\x03fo\xff".to_vec();
        let map = ZipMap::from_store_with(truncated, &config).unwrap();
        assert!(map.get(b"foo").unwrap_err().is_malformed());
        assert!(map.iter().next().unwrap().is_err());
    }

    #[test]
    fn exceeds_reports_threshold_crossings() {
        let config = ZipMapConfig::default()
            .with_max_entries(2)
            .with_max_value_len(8);
        let mut map = ZipMap::new();
        map.set(b"a", b"short").unwrap();
        assert!(!map.exceeds(&config).unwrap());
        map.set(b"b", b"a value too long").unwrap();
        assert!(map.exceeds(&config).unwrap());
        map.set(b"b", b"ok").unwrap();
        map.set(b"c", b"ok").unwrap();
        assert!(map.exceeds(&config).unwrap());
    }

    #[test]
    fn debug_lists_entries() {
        let map = ZipMap::try_from_iter([(b"k\x00", b"v")]).unwrap();
        assert_eq!(format!("{map:?}"), r#"{"k\x00": "v"}"#);
    }

    fn raw_entries(map: &ZipMap) -> Vec<(Vec<u8>, Vec<u8>)> {
        let bytes = map.as_bytes();
        let mut out = Vec::new();
        let mut pos = 1;
        while let Slot::Entry(entry) = decode_slot(bytes, pos).unwrap() {
            out.push((
                entry.key(bytes).to_vec(),
                bytes[entry.offset..entry.end()].to_vec(),
            ));
            pos = entry.end();
        }
        out
    }

    fn kv_strategy() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
        prop::collection::vec(
            (
                prop::collection::vec(any::<u8>(), 0..8),
                prop::collection::vec(any::<u8>(), 0..300),
            ),
            1..24,
        )
    }

    proptest! {
        #[test]
        fn prop_set_then_get(pairs in kv_strategy()) {
            let mut map = ZipMap::new();
            for (k, v) in &pairs {
                map.set(k, v).unwrap();
                prop_assert_eq!(map.get(k).unwrap(), Some(v.as_slice()));
            }
            prop_assert_eq!(map.blob_len().unwrap(), map.as_bytes().len());
            prop_assert!(validate(map.as_bytes(), true).is_ok());
        }

        #[test]
        fn prop_mutations_preserve_untouched_entries(
            pairs in kv_strategy(),
            pick in any::<prop::sample::Index>(),
            new_value in prop::collection::vec(any::<u8>(), 0..300),
            delete in any::<bool>(),
        ) {
            let mut map = ZipMap::try_from_iter(pairs.iter().map(|(k, v)| (k, v))).unwrap();
            let before = raw_entries(&map);
            let target = before[pick.index(before.len())].0.clone();

            if delete {
                prop_assert!(map.delete(&target).unwrap());
            } else {
                prop_assert!(map.set(&target, &new_value).unwrap());
                prop_assert_eq!(map.get(&target).unwrap(), Some(new_value.as_slice()));
            }

            let after = raw_entries(&map);
            let untouched = |entries: &[(Vec<u8>, Vec<u8>)]| -> Vec<(Vec<u8>, Vec<u8>)> {
                entries.iter().filter(|(k, _)| *k != target).cloned().collect()
            };
            prop_assert_eq!(untouched(&before), untouched(&after));
            prop_assert_eq!(*map.as_bytes().last().unwrap(), END);
            prop_assert!(validate(map.as_bytes(), true).is_ok());
        }
    }
}
