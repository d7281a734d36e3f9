//! SNMPv1/SNMPv2c datagram shape: `Message { version, community, pdu }`.
//!
//! Unlike the native BER primitives, a [`Message`] has heterogeneous
//! content (an INTEGER, an OCTET STRING, then an application-tagged PDU
//! whose own field count depends on its kind), so it is decoded by hand
//! rather than by deriving [`crate::ber::BerValue`]. [`Pdu`] is hand-decoded
//! for the same reason one level down: which fields follow depends on the
//! PDU kind named by its own application tag, so it can't be expressed as a
//! [`crate::ber::Record`] either — that trait's field unpackers
//! only see content bytes, never the envelope a tag-dependent shape needs
//! to dispatch on. [`VarBind`], the one PDU-layer shape that *is* fixed
//! regardless of context, implements [`crate::ber::Record`] instead of
//! being hand-rolled.

mod pdu;

pub use pdu::{Pdu, PduKind, VarBind};

use crate::ber::{self, decode_length, encode_length, unmarshal, universal_tag, Envelope, Integer, OctetString};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Ber(#[from] ber::Error),

    #[error("SNMP message envelope is not a universal constructed SEQUENCE")]
    NotAMessage,

    #[error("{0} unconsumed bytes after the SNMP message")]
    TrailingBytes(usize),

    #[error("unrecognized PDU application tag {0:#x}")]
    UnknownPduTag(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub version: i64,
    pub community: Vec<u8>,
    pub pdu: Pdu,
}

impl Message {
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let (envelope, rest) = Envelope::decode(buf)?;
        if envelope.tag != universal_tag::SEQUENCE || !envelope.constructed {
            return Err(Error::NotAMessage);
        }
        let (len, rest) = decode_length(rest)?;
        if rest.len() < len {
            return Err(ber::Error::Truncated {
                expected: len,
                actual: rest.len(),
            }
            .into());
        }
        let (content, tail) = rest.split_at(len);
        if !tail.is_empty() {
            return Err(Error::TrailingBytes(tail.len()));
        }

        let (version, content): (Integer, _) = unmarshal(content, None)?;
        let (community, content): (OctetString, _) = unmarshal(content, None)?;
        let pdu = Pdu::decode(content)?;

        Ok(Message {
            version: version.0,
            community: community.0,
            pdu,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut content = Vec::new();
        content.extend(ber::marshal(&Integer(self.version), None));
        content.extend(ber::marshal(&OctetString(self.community.clone()), None));
        content.extend(self.pdu.encode());

        let mut out = Envelope::universal(universal_tag::SEQUENCE)
            .constructed()
            .encode();
        out.extend(encode_length(content.len()));
        out.extend(content);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::{AnyValue, Oid};

    fn sample_message() -> Message {
        Message {
            version: 1,
            community: b"public".to_vec(),
            pdu: Pdu {
                kind: PduKind::Get,
                request_id: 42,
                error_status: 0,
                error_index: 0,
                var_binds: vec![VarBind {
                    oid: Oid(vec![1, 3, 6, 1, 2, 1, 1, 1, 0]),
                    value: AnyValue::Null,
                }],
            },
        }
    }

    #[test]
    fn round_trips_a_get_request() {
        let message = sample_message();
        let bytes = message.encode();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = sample_message().encode();
        bytes.push(0xFF);
        assert!(matches!(Message::decode(&bytes), Err(Error::TrailingBytes(1))));
    }
}
