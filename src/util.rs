use crate::{AvroResult, error::Error};
use serde_json::{Map, Value};
use std::{
    io::{Read, Write},
    sync::{
        Once,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Maximum number of bytes that can be allocated while decoding a single
/// length-prefixed item. Hostile data can claim arbitrarily large lengths;
/// this bounds what a claim is allowed to allocate.
/// See [`max_allocation_bytes`] to change the limit.
pub const DEFAULT_MAX_ALLOCATION_BYTES: usize = 512 * 1024 * 1024;
static MAX_ALLOCATION_BYTES: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_ALLOCATION_BYTES);
static MAX_ALLOCATION_BYTES_ONCE: Once = Once::new();

/// Set a new maximum number of bytes that can be allocated when decoding data.
///
/// The limit can be set only once, and must be set before any data is decoded;
/// the first decode locks in the default otherwise.
///
/// Returns the configured maximum, which may differ from the argument if the
/// limit was already locked in.
pub fn max_allocation_bytes(num_bytes: usize) -> usize {
    MAX_ALLOCATION_BYTES_ONCE.call_once(|| {
        MAX_ALLOCATION_BYTES.store(num_bytes, Ordering::Release);
    });
    MAX_ALLOCATION_BYTES.load(Ordering::Acquire)
}

pub fn safe_len(len: usize) -> AvroResult<usize> {
    let maximum = max_allocation_bytes(DEFAULT_MAX_ALLOCATION_BYTES);
    if len <= maximum {
        Ok(len)
    } else {
        Err(Error::MemoryAllocation {
            desired: len,
            maximum,
        })
    }
}

/// Convenience accessors over a JSON object used by the schema parser.
pub(crate) trait MapHelper {
    fn string(&self, key: &str) -> Option<String>;

    fn name(&self) -> Option<String> {
        self.string("name")
    }

    fn doc(&self) -> Option<String> {
        self.string("doc")
    }

    fn aliases(&self) -> Option<Vec<String>>;
}

impl MapHelper for Map<String, Value> {
    fn string(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
    }

    fn aliases(&self) -> Option<Vec<String>> {
        self.get("aliases")
            .and_then(|aliases| aliases.as_array())
            .and_then(|aliases| {
                aliases
                    .iter()
                    .map(|alias| alias.as_str().map(|a| a.to_string()))
                    .collect::<Option<_>>()
            })
    }
}

pub fn zig_i32<W: Write>(n: i32, writer: W) -> AvroResult<usize> {
    zig_i64(n as i64, writer)
}

pub fn zig_i64<W: Write>(n: i64, writer: W) -> AvroResult<usize> {
    encode_variable(((n << 1) ^ (n >> 63)) as u64, writer)
}

pub fn zag_i32<R: Read>(reader: &mut R) -> AvroResult<i32> {
    let i = zag_i64(reader)?;
    i32::try_from(i).map_err(|e| Error::ZagI32(e, i))
}

pub fn zag_i64<R: Read>(reader: &mut R) -> AvroResult<i64> {
    let z = decode_variable(reader)?;
    Ok(if z & 0x1 == 0 {
        (z >> 1) as i64
    } else {
        !(z >> 1) as i64
    })
}

fn encode_variable<W: Write>(mut z: u64, mut writer: W) -> AvroResult<usize> {
    let mut buffer = [0u8; 10];
    let mut i = 0;
    loop {
        if z <= 0x7F {
            buffer[i] = (z & 0x7F) as u8;
            i += 1;
            break;
        } else {
            buffer[i] = (0x80 | (z & 0x7F)) as u8;
            i += 1;
            z >>= 7;
        }
    }
    writer
        .write_all(&buffer[..i])
        .map_err(Error::WriteBytes)
        .map(|_| i)
}

fn decode_variable<R: Read>(reader: &mut R) -> AvroResult<u64> {
    let mut i = 0u64;
    let mut buf = [0u8; 1];

    let mut j = 0;
    loop {
        if j > 9 {
            // 10 bytes of 7 bits each already cover 64 bits
            return Err(Error::VarintTooLong);
        }
        reader
            .read_exact(&mut buf[..])
            .map_err(Error::ReadVariableIntegerBytes)?;
        i |= u64::from(buf[0] & 0x7F) << (j * 7);
        if (buf[0] >> 7) == 0 {
            break;
        } else {
            j += 1;
        }
    }

    Ok(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zigzag_i32_and_i64_agree() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        zig_i32(42i32, &mut a).unwrap();
        zig_i64(42i64, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zigzag_known_encodings() {
        let cases: &[(i64, &[u8])] = &[
            (0, &[0]),
            (-1, &[1]),
            (1, &[2]),
            (-64, &[127]),
            (64, &[128, 1]),
            (i32::MAX as i64, &[254, 255, 255, 255, 15]),
            (i32::MIN as i64, &[255, 255, 255, 255, 15]),
            (
                i64::MAX,
                &[254, 255, 255, 255, 255, 255, 255, 255, 255, 1],
            ),
            (
                i64::MIN,
                &[255, 255, 255, 255, 255, 255, 255, 255, 255, 1],
            ),
        ];
        for (n, expected) in cases {
            let mut s = Vec::new();
            zig_i64(*n, &mut s).unwrap();
            assert_eq!(&s, expected, "encoding of {n}");
            assert_eq!(zag_i64(&mut &s[..]).unwrap(), *n, "round trip of {n}");
        }
    }

    #[test]
    fn zigzag_bijection() {
        for n in [0i64, 1, -1, 42, -42, i64::MAX, i64::MIN, 1 << 40, -(1 << 40)] {
            let mut s = Vec::new();
            zig_i64(n, &mut s).unwrap();
            assert!(s.len() <= 10);
            assert_eq!(zag_i64(&mut &s[..]).unwrap(), n);
        }
    }

    #[test]
    fn varint_too_long_is_rejected() {
        let oversized: &[u8] = &[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(
            zag_i64(&mut &*oversized),
            Err(Error::VarintTooLong)
        ));
    }

    #[test]
    fn int_range_is_checked() {
        let mut s = Vec::new();
        zig_i64(i32::MAX as i64 + 1, &mut s).unwrap();
        assert!(matches!(zag_i32(&mut &s[..]), Err(Error::ZagI32(..))));
    }

    #[test]
    fn safe_len_bounds_allocation() {
        assert_eq!(42usize, safe_len(42).unwrap());
        assert!(safe_len(usize::MAX).is_err());
    }
}
