//! Length tag encoding.
//!
//! Every key and value is prefixed by a tag holding its length:
//! - 0-253: 1 byte holding the length itself
//! - 254 and above: the byte [`BIGLEN`] followed by the length as a `u32` in
//!   storage order (see [`crate::endian`])
//!
//! [`END`] is never a valid first tag byte; it terminates the entry sequence.

use crate::endian::{from_storage_order, to_storage_order};
use crate::error::{Result, ZipMapError};

/// Tag byte announcing a 4 byte length, also the frozen value of the count byte.
pub const BIGLEN: u8 = 254;

/// End marker, always the last byte of the buffer.
pub const END: u8 = 255;

/// Largest slack a value may keep after an update; larger slack is compacted.
pub const VALUE_MAX_FREE: usize = 4;

/// Bytes of a long length tag.
pub const BIG_TAG_LEN: usize = 1 + size_of::<u32>();

/// An empty zipmap: zero entries followed by the end marker.
pub const EMPTY: [u8; 2] = [0, END];

/// Number of bytes the tag for `len` occupies.
#[inline]
pub const fn tag_len(len: usize) -> usize {
    if len < BIGLEN as usize { 1 } else { BIG_TAG_LEN }
}

/// Exact size of an entry holding a `klen` byte key and a `vlen` byte value
/// with no slack: both tags, both payloads and the free byte.
#[inline]
pub const fn required_len(klen: usize, vlen: usize) -> usize {
    let mut len = klen + vlen + 3;
    if klen >= BIGLEN as usize {
        len += 4;
    }
    if vlen >= BIGLEN as usize {
        len += 4;
    }
    len
}

/// Fails when `len` cannot be written into a length tag.
#[inline]
pub fn check_encodable(len: usize) -> Result<()> {
    if u32::try_from(len).is_err() {
        return Err(ZipMapError::TooLarge { len });
    }
    Ok(())
}

/// Decodes the tag at `at`, returning `(length, tag bytes)`.
pub fn decode_len(buf: &[u8], at: usize) -> Result<(usize, usize)> {
    let first = *buf
        .get(at)
        .ok_or_else(|| ZipMapError::malformed(at, "length tag past end of buffer"))?;
    match first {
        END => Err(ZipMapError::malformed(at, "end marker where a length tag was expected")),
        BIGLEN => {
            let raw = buf
                .get(at + 1..at + BIG_TAG_LEN)
                .ok_or_else(|| ZipMapError::malformed(at, "truncated 4 byte length tag"))?;
            let mut word = [0u8; 4];
            word.copy_from_slice(raw);
            let len = from_storage_order(u32::from_ne_bytes(word));
            Ok((len as usize, BIG_TAG_LEN))
        }
        short => Ok((short as usize, 1)),
    }
}

/// Writes the tag for `len` at the start of `out`, returning the bytes written.
///
/// `out` must have room for [`tag_len`] bytes and `len` must have passed
/// [`check_encodable`].
pub fn encode_len(out: &mut [u8], len: usize) -> usize {
    if len < BIGLEN as usize {
        out[0] = len as u8;
        1
    } else {
        out[0] = BIGLEN;
        let stored = to_storage_order(len as u32);
        out[1..BIG_TAG_LEN].copy_from_slice(&stored.to_ne_bytes());
        BIG_TAG_LEN
    }
}
