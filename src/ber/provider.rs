//! Dynamic decoding for values whose concrete shape is only known from the
//! wire tag, e.g. an SNMP varbind. The native SMI types in [`super::native`]
//! cover every *fixed-shape* use; this module is reserved for the one place
//! the wire genuinely carries a runtime type tag.

use super::envelope::{universal_tag as tag, Class};
use super::native::{BitString, GeneralizedTime, IA5String, Integer, Null, OctetString, Oid, PrintableString, Utf8String, UtcTime};
use super::{BerValue, Envelope, Error};

/// A decoded value whose type was determined at runtime from its envelope
/// rather than known statically by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    Oid(Oid),
    BitString(BitString),
    Utf8String(String),
    PrintableString(String),
    IA5String(String),
    UtcTime(String),
    GeneralizedTime(String),
    /// SNMP application-class types: `Counter32=0, Gauge32=1, TimeTicks=2,
    /// Opaque=3, NsapAddress=4, Counter64=5, Uinteger32=6`. The numeric kind
    /// is kept alongside the raw integer/bytes since the codec has no
    /// static type to hand the caller.
    Application { tag: u32, bytes: Vec<u8> },
    /// SNMP error/exception values encoded as context-specific primitives:
    /// `noSuchObject=0, noSuchInstance=1, endOfMibView=2`.
    Context { tag: u32 },
    Unknown { envelope: Envelope, bytes: Vec<u8> },
}

impl AnyValue {
    /// Re-encode a dynamically-decoded value back to its full BER bytes
    /// (envelope + length + content).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AnyValue::Integer(i) => super::marshal(&Integer(*i), None),
            AnyValue::OctetString(b) => super::marshal(&OctetString(b.clone()), None),
            AnyValue::Null => super::marshal(&Null, None),
            AnyValue::Oid(o) => super::marshal(o, None),
            AnyValue::BitString(b) => super::marshal(b, None),
            AnyValue::Utf8String(s) => super::marshal(&Utf8String(s.clone()), None),
            AnyValue::PrintableString(s) => super::marshal(&PrintableString(s.clone()), None),
            AnyValue::IA5String(s) => super::marshal(&IA5String(s.clone()), None),
            AnyValue::UtcTime(s) => super::marshal(&UtcTime(s.clone()), None),
            AnyValue::GeneralizedTime(s) => super::marshal(&GeneralizedTime(s.clone()), None),
            AnyValue::Application { tag, bytes } => {
                let mut out = Envelope::application(*tag).encode();
                out.extend(super::encode_length(bytes.len()));
                out.extend(bytes);
                out
            }
            AnyValue::Context { tag } => {
                let envelope = Envelope {
                    class: Class::ContextSpecific,
                    tag: *tag,
                    constructed: false,
                };
                let mut out = envelope.encode();
                out.extend(super::encode_length(0));
                out
            }
            AnyValue::Unknown { envelope, bytes } => {
                let mut out = envelope.encode();
                out.extend(super::encode_length(bytes.len()));
                out.extend(bytes);
                out
            }
        }
    }
}

/// A fixed-shape composite record: fields packed and unpacked in
/// declaration order, each wrapped in its own BER envelope, the way
/// `asn1reflect.structFieldHandler` walks a struct's fields one at a time.
/// Rust has no runtime field enumeration, so a record opts in by
/// implementing this trait by hand (or via a small macro) instead of being
/// discovered through struct tags; the original's convention of declaring a
/// struct's first field as `Envelope` to receive a non-default outer tag
/// becomes overriding [`Record::expected_envelope`] instead.
pub trait Record: Sized {
    /// The record's own outer envelope. Defaults to a constructed,
    /// universal SEQUENCE; override for a record framed with an
    /// application or context-specific tag.
    fn expected_envelope() -> Envelope {
        Envelope::universal(tag::SEQUENCE).constructed()
    }

    /// Pack every field, in order, each as a complete envelope+length+content
    /// run, concatenated to form this record's own content.
    fn pack_fields(&self, registry: &ProviderRegistry) -> Vec<u8>;

    /// Unpack every field from this record's content, in order. `registry`
    /// is threaded through for fields whose shape is only known once their
    /// own envelope is in hand (mirroring `asn1reflect`'s `Any` field kind).
    fn unpack_fields(content: &[u8], registry: &ProviderRegistry) -> Result<Self, Error>;
}

/// Marshal a [`Record`] using a default-configured [`ProviderRegistry`].
pub fn marshal_record<T: Record>(value: &T) -> Vec<u8> {
    marshal_record_with(value, &ProviderRegistry::with_defaults())
}

/// Marshal a [`Record`], threading `registry` through to any dynamically
/// typed field.
pub fn marshal_record_with<T: Record>(value: &T, registry: &ProviderRegistry) -> Vec<u8> {
    let content = value.pack_fields(registry);
    let mut out = T::expected_envelope().encode();
    out.extend(super::encode_length(content.len()));
    out.extend(content);
    out
}

/// Unmarshal a [`Record`] using a default-configured [`ProviderRegistry`].
pub fn unmarshal_record<T: Record>(buf: &[u8]) -> Result<(T, &[u8]), Error> {
    unmarshal_record_with(buf, &ProviderRegistry::with_defaults())
}

/// Unmarshal a [`Record`], threading `registry` through to any dynamically
/// typed field.
pub fn unmarshal_record_with<'b, T: Record>(
    buf: &'b [u8],
    registry: &ProviderRegistry,
) -> Result<(T, &'b [u8]), Error> {
    let (envelope, rest) = Envelope::decode(buf)?;
    let expected = T::expected_envelope();
    if envelope != expected {
        return Err(Error::EnvelopeMismatch {
            expected,
            actual: envelope,
        });
    }
    let (len, rest) = super::decode_length(rest)?;
    if rest.len() < len {
        return Err(Error::Truncated {
            expected: len,
            actual: rest.len(),
        });
    }
    let (content, tail) = rest.split_at(len);
    let value = T::unpack_fields(content, registry)?;
    Ok((value, tail))
}

/// One entry in a [`ProviderRegistry`]: recognizes a class/tag pair and
/// decodes the matching content bytes.
pub trait Provider {
    fn recognizes(&self, envelope: &Envelope) -> bool;
    fn decode(&self, envelope: &Envelope, content: &[u8]) -> Result<AnyValue, Error>;
}

struct NativeProvider;

impl Provider for NativeProvider {
    fn recognizes(&self, envelope: &Envelope) -> bool {
        matches!(envelope.class, Class::Universal)
    }

    fn decode(&self, envelope: &Envelope, content: &[u8]) -> Result<AnyValue, Error> {
        Ok(match envelope.tag {
            tag::INTEGER => AnyValue::Integer(Integer::unpack(content)?.0),
            tag::OCTET_STRING => AnyValue::OctetString(OctetString::unpack(content)?.0),
            tag::NULL => {
                Null::unpack(content)?;
                AnyValue::Null
            }
            tag::OID => AnyValue::Oid(Oid::unpack(content)?),
            tag::BIT_STRING => AnyValue::BitString(BitString::unpack(content)?),
            tag::UTF8_STRING => AnyValue::Utf8String(Utf8String::unpack(content)?.0),
            tag::PRINTABLE_STRING => AnyValue::PrintableString(PrintableString::unpack(content)?.0),
            tag::IA5_STRING => AnyValue::IA5String(IA5String::unpack(content)?.0),
            tag::UTC_TIME => AnyValue::UtcTime(UtcTime::unpack(content)?.0),
            tag::GENERALIZED_TIME => AnyValue::GeneralizedTime(GeneralizedTime::unpack(content)?.0),
            _ => {
                return Err(Error::NoProvider {
                    class: envelope.class,
                    tag: envelope.tag,
                })
            }
        })
    }
}

struct SnmpApplicationProvider;

impl Provider for SnmpApplicationProvider {
    fn recognizes(&self, envelope: &Envelope) -> bool {
        matches!(envelope.class, Class::Application)
    }

    fn decode(&self, envelope: &Envelope, content: &[u8]) -> Result<AnyValue, Error> {
        Ok(AnyValue::Application {
            tag: envelope.tag,
            bytes: content.to_vec(),
        })
    }
}

struct SnmpExceptionProvider;

impl Provider for SnmpExceptionProvider {
    fn recognizes(&self, envelope: &Envelope) -> bool {
        matches!(envelope.class, Class::ContextSpecific) && !envelope.constructed
    }

    fn decode(&self, envelope: &Envelope, _content: &[u8]) -> Result<AnyValue, Error> {
        Ok(AnyValue::Context { tag: envelope.tag })
    }
}

/// A priority-ordered list of [`Provider`]s consulted in registration order;
/// the first that recognizes the envelope decodes the value. Mirrors the
/// pluggable value-provider idea while staying statically dispatched, since
/// Rust has no runtime reflection to drive a registry off of struct tags.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderRegistry {
    /// A registry with the native SMI, SNMP application, and SNMP exception
    /// providers already registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self { providers: Vec::new() };
        registry.register(NativeProvider);
        registry.register(SnmpApplicationProvider);
        registry.register(SnmpExceptionProvider);
        registry
    }

    pub fn new() -> Self {
        Self { providers: Vec::new() }
    }

    pub fn register(&mut self, provider: impl Provider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Decode one full BER value (envelope + length + content) from `buf`,
    /// returning the decoded value and the remaining tail.
    pub fn decode<'b>(&self, buf: &'b [u8]) -> Result<(AnyValue, &'b [u8]), Error> {
        let (envelope, rest) = Envelope::decode(buf)?;
        let (len, rest) = super::decode_length(rest)?;
        if rest.len() < len {
            return Err(Error::Truncated {
                expected: len,
                actual: rest.len(),
            });
        }
        let (content, tail) = rest.split_at(len);
        for provider in &self.providers {
            if provider.recognizes(&envelope) {
                return Ok((provider.decode(&envelope, content)?, tail));
            }
        }
        let value = AnyValue::Unknown {
            envelope,
            bytes: content.to_vec(),
        };
        Ok((value, tail))
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::marshal;

    #[test]
    fn decodes_native_integer() {
        let registry = ProviderRegistry::with_defaults();
        let bytes = marshal(&Integer(42), None);
        let (value, rest) = registry.decode(&bytes).unwrap();
        assert_eq!(value, AnyValue::Integer(42));
        assert!(rest.is_empty());
    }

    #[test]
    fn decodes_snmp_counter32_as_application() {
        let registry = ProviderRegistry::with_defaults();
        let envelope = Envelope::application(1);
        let content = Integer(7).pack();
        let mut bytes = envelope.encode();
        bytes.extend(super::super::encode_length(content.len()));
        bytes.extend(content);
        let (value, _) = registry.decode(&bytes).unwrap();
        assert_eq!(
            value,
            AnyValue::Application {
                tag: 1,
                bytes: vec![7]
            }
        );
    }

    #[test]
    fn decodes_no_such_object_exception() {
        let registry = ProviderRegistry::with_defaults();
        let envelope = Envelope {
            class: Class::ContextSpecific,
            tag: 0,
            constructed: false,
        };
        let mut bytes = envelope.encode();
        bytes.extend(super::super::encode_length(0));
        let (value, _) = registry.decode(&bytes).unwrap();
        assert_eq!(value, AnyValue::Context { tag: 0 });
    }

    #[derive(Debug, PartialEq)]
    struct Pair {
        oid: Oid,
        count: Integer,
    }

    impl Record for Pair {
        fn pack_fields(&self, _registry: &ProviderRegistry) -> Vec<u8> {
            let mut out = super::super::marshal(&self.oid, None);
            out.extend(super::super::marshal(&self.count, None));
            out
        }

        fn unpack_fields(content: &[u8], _registry: &ProviderRegistry) -> Result<Self, Error> {
            let (oid, content): (Oid, _) = super::super::unmarshal(content, None)?;
            let (count, content): (Integer, _) = super::super::unmarshal(content, None)?;
            if !content.is_empty() {
                return Err(Error::TrailingBytes(content.len()));
            }
            Ok(Pair { oid, count })
        }
    }

    #[test]
    fn composite_record_round_trips_fixed_shape_fields_in_order() {
        let pair = Pair {
            oid: Oid(vec![1, 3, 6, 1]),
            count: Integer(5),
        };
        let bytes = marshal_record(&pair);
        let (decoded, rest): (Pair, _) = unmarshal_record(&bytes).unwrap();
        assert_eq!(decoded, pair);
        assert!(rest.is_empty());
    }

    #[test]
    fn composite_record_rejects_a_mismatched_outer_envelope() {
        let envelope = Envelope::application(9);
        let bytes = {
            let mut out = envelope.encode();
            out.extend(super::super::encode_length(0));
            out
        };
        let err = unmarshal_record::<Pair>(&bytes).unwrap_err();
        assert!(matches!(err, Error::EnvelopeMismatch { .. }));
    }

    #[test]
    fn unrecognized_tag_falls_back_to_unknown() {
        let mut registry = ProviderRegistry::new();
        registry.register(NativeProvider);
        let envelope = Envelope {
            class: Class::Private,
            tag: 9,
            constructed: false,
        };
        let mut bytes = envelope.encode();
        bytes.extend(super::super::encode_length(1));
        bytes.push(0xAB);
        let (value, _) = registry.decode(&bytes).unwrap();
        assert!(matches!(value, AnyValue::Unknown { .. }));
    }
}
