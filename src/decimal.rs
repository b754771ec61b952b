use crate::{AvroResult, error::Error};
use num_bigint::{BigInt, Sign};

/// An unscaled decimal value: a two's-complement big-endian integer together
/// with the byte width it was read with (or should be written with).
///
/// `precision` and `scale` live on the schema; the value only carries digits.
#[derive(Debug, Clone, Eq)]
pub struct Decimal {
    value: BigInt,
    len: usize,
}

// Equality is on the numeric value; the byte width is an encoding detail.
impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Decimal {
    /// The byte width this decimal was constructed with.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// The two's-complement big-endian bytes at the natural width.
    pub(crate) fn to_vec(&self) -> AvroResult<Vec<u8>> {
        self.to_sign_extended_bytes(self.len)
    }

    /// The two's-complement big-endian bytes, sign-extended to `len` bytes.
    pub(crate) fn to_sign_extended_bytes(&self, len: usize) -> AvroResult<Vec<u8>> {
        let fill = if self.value.sign() == Sign::Minus {
            0xFF
        } else {
            0x00
        };
        let mut bytes = vec![fill; len];
        let raw = self.value.to_signed_bytes_be();
        let start = len.checked_sub(raw.len()).ok_or(Error::SignExtend {
            requested: len,
            needed: raw.len(),
        })?;
        bytes[start..].copy_from_slice(&raw);
        Ok(bytes)
    }
}

impl From<Decimal> for BigInt {
    fn from(decimal: Decimal) -> Self {
        decimal.value
    }
}

impl<T: AsRef<[u8]>> From<T> for Decimal {
    fn from(bytes: T) -> Self {
        let bytes = bytes.as_ref();
        Self {
            value: BigInt::from_signed_bytes_be(bytes),
            len: bytes.len(),
        }
    }
}

impl TryFrom<&Decimal> for Vec<u8> {
    type Error = Error;

    fn try_from(decimal: &Decimal) -> Result<Self, Self::Error> {
        decimal.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bytes_round_trip() {
        let input = vec![1, 24];
        let decimal = Decimal::from(&input);
        assert_eq!(<Vec<u8>>::try_from(&decimal).unwrap(), input);
    }

    #[test]
    fn sign_extension_preserves_the_value() {
        let negative = Decimal::from([0xFF_u8, 0x38]);
        let extended = negative.to_sign_extended_bytes(4).unwrap();
        assert_eq!(extended, vec![0xFF, 0xFF, 0xFF, 0x38]);
        assert_eq!(Decimal::from(extended), negative);

        let positive = Decimal::from([0x01_u8, 0x18]);
        let extended = positive.to_sign_extended_bytes(4).unwrap();
        assert_eq!(extended, vec![0x00, 0x00, 0x01, 0x18]);
        assert_eq!(Decimal::from(extended), positive);
    }

    #[test]
    fn sign_extension_rejects_narrowing() {
        let wide = Decimal::from([0x12_u8, 0x34, 0x56]);
        assert!(matches!(
            wide.to_sign_extended_bytes(2),
            Err(Error::SignExtend {
                requested: 2,
                needed: 3
            })
        ));
    }
}
