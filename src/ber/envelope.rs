use super::Error;
use num_enum::TryFromPrimitive;

/// The class bits of a BER tag octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Class {
    Universal = 0,
    Application = 1,
    ContextSpecific = 2,
    Private = 3,
}

impl std::fmt::Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Class::Universal => "universal",
            Class::Application => "application",
            Class::ContextSpecific => "context",
            Class::Private => "private",
        };
        write!(f, "{name}")
    }
}

/// Universal-class tag numbers used throughout the codec.
pub mod universal_tag {
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const OID: u32 = 6;
    pub const SEQUENCE: u32 = 16;
    pub const PRINTABLE_STRING: u32 = 19;
    pub const IA5_STRING: u32 = 22;
    pub const UTC_TIME: u32 = 23;
    pub const GENERALIZED_TIME: u32 = 24;
    pub const UTF8_STRING: u32 = 12;
    pub const BMP_STRING: u32 = 30;
}

/// The class+tag pair that precedes every BER-encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub class: Class,
    pub tag: u32,
    pub constructed: bool,
}

impl Envelope {
    pub const fn universal(tag: u32) -> Self {
        Self {
            class: Class::Universal,
            tag,
            constructed: false,
        }
    }

    pub const fn application(tag: u32) -> Self {
        Self {
            class: Class::Application,
            tag,
            constructed: false,
        }
    }

    pub const fn constructed(mut self) -> Self {
        self.constructed = true;
        self
    }

    /// Encode the identifier octet(s). Tags `< 0x1f` fit in the single
    /// leading byte; SNMP/SMI never needs the multi-byte tag form, so it is
    /// not implemented here.
    pub fn encode(&self) -> Vec<u8> {
        let class_bits = (self.class as u8) << 6;
        let constructed_bit = if self.constructed { 0x20 } else { 0 };
        vec![class_bits | constructed_bit | (self.tag as u8 & 0x1f)]
    }

    pub fn decode(buf: &[u8]) -> Result<(Self, &[u8]), Error> {
        let (&first, rest) = buf.split_first().ok_or(Error::Truncated {
            expected: 1,
            actual: 0,
        })?;
        let class = Class::try_from((first >> 6) & 0b11).unwrap();
        let constructed = first & 0x20 != 0;
        let tag = (first & 0x1f) as u32;
        Ok((
            Self {
                class,
                tag,
                constructed,
            },
            rest,
        ))
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if matches!(self.class, Class::Universal) {
            write!(f, "tag={}", self.tag)
        } else {
            write!(f, "class={},tag={}", self.class, self.tag)
        }
    }
}

/// Parsed `Tag,Class[,constructed]` field annotation, used to override a
/// value's default envelope (e.g. SNMP's `[APPLICATION 2] IMPLICIT`
/// `Counter32`).
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    pub tag: Option<u32>,
    pub class: Option<Class>,
    pub constructed: Option<bool>,
}

impl Parameters {
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut params = Parameters::default();
        for part in s.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(n) = part.strip_prefix("tag=") {
                params.tag = Some(n.parse().map_err(|_| Error::BadParameter(part.to_string()))?);
            } else if let Some(n) = part.strip_prefix("class=") {
                let c: u8 = n.parse().map_err(|_| Error::BadParameter(part.to_string()))?;
                params.class = Some(Class::try_from(c).map_err(|_| Error::BadParameter(part.to_string()))?);
            } else if part.eq_ignore_ascii_case("constructed") {
                params.constructed = Some(true);
            } else if part.eq_ignore_ascii_case("universal") {
                params.class = Some(Class::Universal);
            } else if part.eq_ignore_ascii_case("application") {
                params.class = Some(Class::Application);
            } else if part.eq_ignore_ascii_case("context") {
                params.class = Some(Class::ContextSpecific);
            } else if part.eq_ignore_ascii_case("private") {
                params.class = Some(Class::Private);
            } else {
                return Err(Error::BadParameter(part.to_string()));
            }
        }
        Ok(params)
    }

    pub fn apply(&self, envelope: &mut Envelope) {
        if let Some(tag) = self.tag {
            envelope.tag = tag;
        }
        if let Some(class) = self.class {
            envelope.class = class;
        }
        if let Some(constructed) = self.constructed {
            envelope.constructed = constructed;
        }
    }

    pub fn validate(&self, envelope: &Envelope) -> Result<(), Error> {
        let mut expected = *envelope;
        self.apply(&mut expected);
        if expected.class != envelope.class || expected.tag != envelope.tag {
            return Err(Error::EnvelopeMismatch {
                expected,
                actual: *envelope,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_envelope() {
        let e = Envelope::universal(super::universal_tag::INTEGER);
        let bytes = e.encode();
        let (decoded, rest) = Envelope::decode(&bytes).unwrap();
        assert_eq!(decoded, e);
        assert!(rest.is_empty());
    }

    #[test]
    fn parses_parameter_string() {
        let p = Parameters::parse("tag=1,application").unwrap();
        assert_eq!(p.tag, Some(1));
        assert_eq!(p.class, Some(Class::Application));
    }
}
