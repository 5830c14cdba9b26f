use std::marker::PhantomData;

use crate::byte_store::ByteStore;
use crate::error::{Result, ZipMapError};
use crate::map::ZipMap;
use crate::types::{Bytes, BytesDecode, BytesEncode, Native, Str};

// Type aliases for common use cases
pub type StrStrMap<S = Vec<u8>> = TypedZipMap<Str, Str, S>;
pub type StrU64Map<S = Vec<u8>> = TypedZipMap<Str, Native<u64>, S>;
pub type StrBytesMap<S = Vec<u8>> = TypedZipMap<Str, Bytes, S>;

/// A [`ZipMap`] whose keys and values go through [`BytesEncode`] /
/// [`BytesDecode`] codecs.
///
/// The buffer layout is unchanged; the codecs only decide which bytes are
/// stored, so a typed map can be persisted and reloaded like any other.
pub struct TypedZipMap<K, V, S: ByteStore = Vec<u8>> {
    raw: ZipMap<S>,
    _marker: PhantomData<(K, V)>,
}

impl<K, V> TypedZipMap<K, V> {
    pub fn new() -> Self {
        Self::from_raw(ZipMap::new())
    }
}

impl<K, V> Default for TypedZipMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S: ByteStore> TypedZipMap<K, V, S> {
    pub fn from_raw(raw: ZipMap<S>) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    pub fn raw(&self) -> &ZipMap<S> {
        &self.raw
    }

    pub fn into_raw(self) -> ZipMap<S> {
        self.raw
    }

    /// Inserts a key-value pair, returning whether the key was already present.
    pub fn insert<'k, 'v>(
        &mut self,
        key: &'k <K as BytesEncode<'k>>::EItem,
        value: &'v <V as BytesEncode<'v>>::EItem,
    ) -> Result<bool>
    where
        K: BytesEncode<'k>,
        V: BytesEncode<'v>,
    {
        let key = K::bytes_encode(key)?;
        let value = V::bytes_encode(value)?;
        self.raw.set(&key, &value)
    }

    pub fn get<'a, 'k>(
        &'a self,
        key: &'k <K as BytesEncode<'k>>::EItem,
    ) -> Result<Option<<V as BytesDecode<'a>>::DItem>>
    where
        K: BytesEncode<'k>,
        V: BytesDecode<'a>,
    {
        let key = K::bytes_encode(key)?;
        match self.raw.get(&key)? {
            Some(bytes) => decode::<V>(bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Removes a key, returning whether it was present.
    pub fn remove<'k>(&mut self, key: &'k <K as BytesEncode<'k>>::EItem) -> Result<bool>
    where
        K: BytesEncode<'k>,
    {
        let key = K::bytes_encode(key)?;
        self.raw.delete(&key)
    }

    pub fn contains_key<'k>(&self, key: &'k <K as BytesEncode<'k>>::EItem) -> Result<bool>
    where
        K: BytesEncode<'k>,
    {
        let key = K::bytes_encode(key)?;
        self.raw.exists(&key)
    }

    pub fn len(&mut self) -> Result<usize> {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Decoded entries in storage order.
    pub fn iter<'a>(
        &'a self,
    ) -> impl Iterator<Item = Result<(<K as BytesDecode<'a>>::DItem, <V as BytesDecode<'a>>::DItem)>> + 'a
    where
        K: BytesDecode<'a>,
        V: BytesDecode<'a>,
    {
        self.raw.iter().map(|entry| {
            let entry = entry?;
            Ok((decode::<K>(entry.key)?, decode::<V>(entry.value)?))
        })
    }
}

fn decode<'a, D: BytesDecode<'a>>(bytes: &'a [u8]) -> Result<D::DItem> {
    D::bytes_decode(bytes).map_err(|e| ZipMapError::Decoding(e.to_string()))
}
