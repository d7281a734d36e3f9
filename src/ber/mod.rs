//! BER (Basic Encoding Rules) codec: envelopes, length framing, the native
//! typed values SNMP needs, and a small priority-ordered provider registry
//! for decoding values whose shape is only known from their wire tag.

mod envelope;
mod native;
mod provider;

pub use envelope::{universal_tag, Class, Envelope, Parameters};
pub use native::{
    BerValue, BitString, GeneralizedTime, IA5String, Integer, Null, OctetString, Oid,
    PrintableString, Utf8String, UtcTime,
};
pub use provider::{
    marshal_record, marshal_record_with, unmarshal_record, unmarshal_record_with, AnyValue,
    ProviderRegistry, Record,
};

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("truncated BER value: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("BER length byte count {0} exceeds the 6-byte cap")]
    LengthTooLong(usize),
    #[error("envelope mismatch: expected {expected}, found {actual}")]
    EnvelopeMismatch { expected: Envelope, actual: Envelope },
    #[error("OID element truncated")]
    OidElementTruncated,
    #[error("integer exceeds requested bit width {bits}")]
    IntegerOverflow { bits: u32 },
    #[error("invalid character {0:?} for this string type")]
    InvalidCharset(char),
    #[error("BMPString has odd byte length {0}")]
    OddBmpLength(usize),
    #[error("NULL value must be empty, found {0} bytes")]
    NonEmptyNull(usize),
    #[error("unrecognized BER parameter {0:?}")]
    BadParameter(String),
    #[error("no provider could decode tag {tag} in class {class:?}")]
    NoProvider { class: Class, tag: u32 },
    #[error("trailing {0} unconsumed bytes after decoding a SEQUENCE")]
    TrailingBytes(usize),
}

/// Encode a BER length. Short form for `< 128`; long form (`0x80 | n` then
/// `n` big-endian bytes) otherwise, capped at 6 length bytes.
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let mut bytes = len.to_be_bytes().to_vec();
    while bytes.first() == Some(&0) {
        bytes.remove(0);
    }
    let mut out = vec![0x80 | bytes.len() as u8];
    out.extend(bytes);
    out
}

/// Decode a BER length starting at `buf[0]`. Returns `(length, rest)`.
pub fn decode_length(buf: &[u8]) -> Result<(usize, &[u8]), Error> {
    let (&first, rest) = buf.split_first().ok_or(Error::Truncated {
        expected: 1,
        actual: 0,
    })?;
    if first & 0x80 == 0 {
        return Ok((first as usize, rest));
    }
    let n = (first & 0x7f) as usize;
    if n > 6 {
        return Err(Error::LengthTooLong(n));
    }
    if rest.len() < n {
        return Err(Error::Truncated {
            expected: n,
            actual: rest.len(),
        });
    }
    let (len_bytes, rest) = rest.split_at(n);
    let mut len = 0usize;
    for &b in len_bytes {
        len = (len << 8) | b as usize;
    }
    Ok((len, rest))
}

/// Marshal any [`BerValue`] into its full BER encoding (envelope + length +
/// content), optionally overriding its envelope via `params`.
pub fn marshal<T: BerValue>(value: &T, params: Option<&Parameters>) -> Vec<u8> {
    let mut envelope = value.envelope();
    if let Some(p) = params {
        p.apply(&mut envelope);
    }
    let content = value.pack();
    let mut out = envelope.encode();
    out.extend(encode_length(content.len()));
    out.extend(content);
    out
}

/// Unmarshal a [`BerValue`] from `buf`, returning the value and the
/// remaining tail. Validates the envelope against `params` when given.
pub fn unmarshal<'b, T: BerValue>(
    buf: &'b [u8],
    params: Option<&Parameters>,
) -> Result<(T, &'b [u8]), Error> {
    let (envelope, rest) = Envelope::decode(buf)?;
    if let Some(p) = params {
        p.validate(&envelope)?;
    }
    let (len, rest) = decode_length(rest)?;
    if rest.len() < len {
        return Err(Error::Truncated {
            expected: len,
            actual: rest.len(),
        });
    }
    let (content, tail) = rest.split_at(len);
    let value = T::unpack(content)?;
    Ok((value, tail))
}
