//! Compact map of byte strings stored in a single relocatable buffer.
//!
//! ```text
//! [count][key tag][key][value tag][free][value] ... [0xff]
//! ```
//!
//! The whole map lives in one buffer that can be written to disk or sent over
//! the wire as is and read back without any transformation. See [`ZipMap`]
//! for the mutable map and [`ZipMapRef`] for querying persisted bytes in place.

pub mod byte_store;
pub mod config;
pub mod encoding;
pub mod endian;
mod entry;
pub mod error;
mod map;
mod persist;
pub mod typed_map;
pub mod types;
mod view;

pub use byte_store::{AllocStats, ByteStore, TrackedStore};
pub use config::ZipMapConfig;
pub use error::{Result, ZipMapError};
pub use map::ZipMap;
pub use persist::MappedZipMap;
pub use typed_map::{StrBytesMap, StrStrMap, StrU64Map, TypedZipMap};
pub use types::{Bytes, BytesDecode, BytesEncode, Native, Str};
pub use view::{Cursor, Entry, Iter, ZipMapRef, validate};
