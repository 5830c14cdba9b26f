use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::byte_store::ByteStore;
use crate::config::ZipMapConfig;
use crate::error::Result;
use crate::map::ZipMap;
use crate::view::{ZipMapRef, validate};

impl<S: ByteStore> ZipMap<S> {
    /// Writes the serialized map verbatim, returning the number of bytes written.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        let len = self.blob_len()?;
        writer.write_all(&self.as_bytes()[..len])?;
        Ok(len)
    }
}

impl ZipMap<Vec<u8>> {
    /// Reads a blob written by [`ZipMap::write_to`] until end of input.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        Self::read_from_with(reader, &ZipMapConfig::default())
    }

    pub fn read_from_with<R: Read>(mut reader: R, config: &ZipMapConfig) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_store_with(bytes, config)
    }
}

/// A persisted zipmap queried in place through a read-only memory map.
pub struct MappedZipMap {
    mmap: Mmap,
}

impl MappedZipMap {
    /// Maps the file at `path` and validates its contents.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &ZipMapConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: &ZipMapConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and the file is not expected to be
        // truncated while mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        validate(&mmap, config.validate_on_load)?;
        debug!(path = %path.display(), len = mmap.len(), "mapped zipmap");
        Ok(Self { mmap })
    }

    pub fn view(&self) -> ZipMapRef<'_> {
        ZipMapRef::new_unchecked(&self.mmap)
    }

    /// Copies the mapped blob into an owned, mutable map.
    pub fn to_owned_map(&self) -> Result<ZipMap> {
        ZipMap::from_store_with(self.mmap.to_vec(), &ZipMapConfig::default().with_validation(false))
    }
}
