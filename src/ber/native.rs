use super::envelope::universal_tag as tag;
use super::{Envelope, Error};

/// Anything that can be packed to and unpacked from a BER content body
/// (the bytes after class/tag/length). This is the "native provider" of
/// the codec: every primitive SMI type implements it directly rather than
/// going through runtime reflection.
pub trait BerValue: Sized {
    fn envelope(&self) -> Envelope;
    fn pack(&self) -> Vec<u8>;
    fn unpack(content: &[u8]) -> Result<Self, Error>;
}

/// A two's-complement big-endian INTEGER, stored pre-encoded the way the
/// wire form naturally is: this makes sign canonicalization and bit-width
/// checks operate directly on bytes instead of round-tripping through a
/// machine integer that might not fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integer(pub i64);

impl Integer {
    /// Validate that the two's-complement encoding of `self` does not
    /// exceed `bits` bits: i.e. that any leading `0x00`/`0xff` padding
    /// beyond the sign bit is not itself significant.
    pub fn get_int(&self, bits: u32) -> Result<i64, Error> {
        let bytes = self.minimal_bytes();
        let needed = bytes.len() as u32 * 8;
        if needed > bits {
            return Err(Error::IntegerOverflow { bits });
        }
        Ok(self.0)
    }

    fn minimal_bytes(&self) -> Vec<u8> {
        canonical_be_bytes(self.0)
    }
}

fn canonical_be_bytes(v: i64) -> Vec<u8> {
    let full = v.to_be_bytes();
    let mut start = 0;
    while start + 1 < full.len() {
        let (b0, b1) = (full[start], full[start + 1]);
        let redundant = (b0 == 0x00 && b1 & 0x80 == 0) || (b0 == 0xff && b1 & 0x80 != 0);
        if redundant {
            start += 1;
        } else {
            break;
        }
    }
    full[start..].to_vec()
}

impl BerValue for Integer {
    fn envelope(&self) -> Envelope {
        Envelope::universal(tag::INTEGER)
    }

    fn pack(&self) -> Vec<u8> {
        canonical_be_bytes(self.0)
    }

    fn unpack(content: &[u8]) -> Result<Self, Error> {
        if content.is_empty() {
            return Err(Error::Truncated {
                expected: 1,
                actual: 0,
            });
        }
        let negative = content[0] & 0x80 != 0;
        let mut bytes = [if negative { 0xffu8 } else { 0 }; 8];
        let start = 8usize.saturating_sub(content.len());
        bytes[start..].copy_from_slice(&content[content.len().saturating_sub(8)..]);
        Ok(Integer(i64::from_be_bytes(bytes)))
    }
}

/// Raw bytes, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctetString(pub Vec<u8>);

impl BerValue for OctetString {
    fn envelope(&self) -> Envelope {
        Envelope::universal(tag::OCTET_STRING)
    }

    fn pack(&self) -> Vec<u8> {
        self.0.clone()
    }

    fn unpack(content: &[u8]) -> Result<Self, Error> {
        Ok(OctetString(content.to_vec()))
    }
}

/// An OBJECT IDENTIFIER value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oid(pub Vec<u32>);

impl BerValue for Oid {
    fn envelope(&self) -> Envelope {
        Envelope::universal(tag::OID)
    }

    fn pack(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.0.len() >= 2 {
            out.push((self.0[0] * 40 + self.0[1]) as u8);
        } else if self.0.len() == 1 {
            out.push((self.0[0] * 40) as u8);
        }
        for &arc in self.0.iter().skip(2) {
            out.extend(encode_arc(arc));
        }
        out
    }

    fn unpack(content: &[u8]) -> Result<Self, Error> {
        if content.is_empty() {
            return Ok(Oid(Vec::new()));
        }
        let first = content[0];
        let mut arcs = vec![(first / 40) as u32, (first % 40) as u32];
        let mut rest = &content[1..];
        while !rest.is_empty() {
            let mut value: u64 = 0;
            let mut terminated = false;
            let mut consumed = 0;
            for &b in rest {
                value = (value << 7) | (b & 0x7f) as u64;
                consumed += 1;
                if b & 0x80 == 0 {
                    terminated = true;
                    break;
                }
            }
            if !terminated {
                return Err(Error::OidElementTruncated);
            }
            arcs.push(value as u32);
            rest = &rest[consumed..];
        }
        Ok(Oid(arcs))
    }
}

fn encode_arc(mut arc: u32) -> Vec<u8> {
    let mut chunks = vec![(arc & 0x7f) as u8];
    arc >>= 7;
    while arc > 0 {
        chunks.push((arc & 0x7f) as u8 | 0x80);
        arc >>= 7;
    }
    chunks.reverse();
    chunks
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// The ASN.1 NULL value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Null;

impl BerValue for Null {
    fn envelope(&self) -> Envelope {
        Envelope::universal(tag::NULL)
    }

    fn pack(&self) -> Vec<u8> {
        Vec::new()
    }

    fn unpack(content: &[u8]) -> Result<Self, Error> {
        if !content.is_empty() {
            return Err(Error::NonEmptyNull(content.len()));
        }
        Ok(Null)
    }
}

/// A BIT STRING: first content byte is the count of unused bits in the
/// final byte, per BER convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString {
    pub unused_bits: u8,
    pub bytes: Vec<u8>,
}

impl BerValue for BitString {
    fn envelope(&self) -> Envelope {
        Envelope::universal(tag::BIT_STRING)
    }

    fn pack(&self) -> Vec<u8> {
        let mut out = vec![self.unused_bits];
        out.extend(&self.bytes);
        out
    }

    fn unpack(content: &[u8]) -> Result<Self, Error> {
        let (&unused, rest) = content.split_first().ok_or(Error::Truncated {
            expected: 1,
            actual: 0,
        })?;
        Ok(BitString {
            unused_bits: unused,
            bytes: rest.to_vec(),
        })
    }
}

macro_rules! charset_string {
    ($name:ident, $tag:expr, $validate:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(pub String);

        impl BerValue for $name {
            fn envelope(&self) -> Envelope {
                Envelope::universal($tag)
            }

            fn pack(&self) -> Vec<u8> {
                self.0.as_bytes().to_vec()
            }

            fn unpack(content: &[u8]) -> Result<Self, Error> {
                let s = String::from_utf8_lossy(content).into_owned();
                for c in s.chars() {
                    if !$validate(c) {
                        return Err(Error::InvalidCharset(c));
                    }
                }
                Ok($name(s))
            }
        }
    };
}

fn is_printable_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || " '()+,-./:=?".contains(c)
}

fn is_ia5_char(c: char) -> bool {
    c.is_ascii()
}

charset_string!(Utf8String, tag::UTF8_STRING, |_c: char| true);
charset_string!(PrintableString, tag::PRINTABLE_STRING, is_printable_char);
charset_string!(IA5String, tag::IA5_STRING, is_ia5_char);

/// `YYMMDDhhmmssZ` UTCTime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtcTime(pub String);

impl BerValue for UtcTime {
    fn envelope(&self) -> Envelope {
        Envelope::universal(tag::UTC_TIME)
    }

    fn pack(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    fn unpack(content: &[u8]) -> Result<Self, Error> {
        Ok(UtcTime(String::from_utf8_lossy(content).into_owned()))
    }
}

/// `YYYYMMDDhhmmssZhhmm` GeneralizedTime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralizedTime(pub String);

impl BerValue for GeneralizedTime {
    fn envelope(&self) -> Envelope {
        Envelope::universal(tag::GENERALIZED_TIME)
    }

    fn pack(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    fn unpack(content: &[u8]) -> Result<Self, Error> {
        Ok(GeneralizedTime(String::from_utf8_lossy(content).into_owned()))
    }
}

impl<T: BerValue> BerValue for Vec<T> {
    fn envelope(&self) -> Envelope {
        Envelope::universal(tag::SEQUENCE).constructed()
    }

    fn pack(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for item in self {
            out.extend(super::marshal(item, None));
        }
        out
    }

    fn unpack(mut content: &[u8]) -> Result<Self, Error> {
        let mut out = Vec::new();
        while !content.is_empty() {
            let (item, rest): (T, &[u8]) = super::unmarshal(content, None)?;
            out.push(item);
            content = rest;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::{marshal, unmarshal};

    #[test]
    fn integer_vectors() {
        assert_eq!(marshal(&Integer(0), None), vec![0x02, 0x01, 0x00]);
        assert_eq!(marshal(&Integer(127), None), vec![0x02, 0x01, 0x7F]);
        assert_eq!(marshal(&Integer(-128), None), vec![0x02, 0x01, 0x80]);
        assert_eq!(marshal(&Integer(2020), None), vec![0x02, 0x02, 0x07, 0xE4]);
    }

    #[test]
    fn integer_round_trip() {
        for v in [0i64, 127, -128, 2020, -1, i64::MAX, i64::MIN] {
            let bytes = marshal(&Integer(v), None);
            let (decoded, rest): (Integer, _) = unmarshal(&bytes, None).unwrap();
            assert_eq!(decoded.0, v);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn oid_vector() {
        let oid = Oid(vec![1, 3, 6, 1, 2, 1, 1, 1, 0]);
        let bytes = marshal(&oid, None);
        assert_eq!(
            bytes,
            vec![0x06, 0x08, 0x2B, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00]
        );
        let (decoded, _): (Oid, _) = unmarshal(&bytes, None).unwrap();
        assert_eq!(decoded, oid);
    }

    #[test]
    fn null_vector() {
        assert_eq!(marshal(&Null, None), vec![0x05, 0x00]);
    }

    #[test]
    fn long_form_length() {
        let bytes = OctetString(vec![0u8; 200]);
        let encoded = marshal(&bytes, None);
        assert_eq!(&encoded[..3], &[0x04, 0x81, 0xC8]);
    }

    #[test]
    fn oid_truncated_continuation_errors() {
        let bytes = [0x06u8, 0x01, 0x80];
        let result: Result<(Oid, _), _> = unmarshal(&bytes, None);
        assert!(matches!(result, Err(Error::OidElementTruncated)));
    }
}
