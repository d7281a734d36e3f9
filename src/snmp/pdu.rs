use super::Error;
use crate::ber::{
    self, decode_length, encode_length, unmarshal, universal_tag, AnyValue, Class, Envelope,
    Integer, Oid, ProviderRegistry, Record,
};
use num_enum::TryFromPrimitive;

/// SNMP PDU application tags (ASN.1 `[APPLICATION n] IMPLICIT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum PduKind {
    Get = 0x20,
    GetNext = 0x21,
    Response = 0x22,
    Set = 0x23,
    Trap = 0x24,
    GetBulk = 0x25,
    Inform = 0x26,
}

impl PduKind {
    fn envelope(self) -> Envelope {
        Envelope {
            class: Class::Application,
            tag: self as u32,
            constructed: true,
        }
    }
}

/// One `{OID, Value}` binding inside a PDU's variable-binding list. `Value`
/// is dynamically typed since the wire does not commit to a static shape
/// for it, hence [`AnyValue`] rather than a concrete [`crate::ber::BerValue`].
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: AnyValue,
}

/// `VarBind` is the one PDU-layer shape that's fixed regardless of context
/// (unlike `Pdu`, whose field layout depends on its own application tag),
/// so it is expressed as a reflective [`Record`] rather than hand-decoded:
/// its `oid` field packs/unpacks as a plain `BerValue`, its `value` field
/// resolves dynamically through the threaded [`ProviderRegistry`].
impl Record for VarBind {
    fn pack_fields(&self, _registry: &ProviderRegistry) -> Vec<u8> {
        let mut out = ber::marshal(&self.oid, None);
        out.extend(self.value.encode());
        out
    }

    fn unpack_fields(content: &[u8], registry: &ProviderRegistry) -> Result<Self, ber::Error> {
        let (oid, content): (Oid, _) = unmarshal(content, None)?;
        let (value, content) = registry.decode(content)?;
        if !content.is_empty() {
            return Err(ber::Error::TrailingBytes(content.len()));
        }
        Ok(VarBind { oid, value })
    }
}

impl VarBind {
    fn decode(buf: &[u8], registry: &ProviderRegistry) -> Result<(Self, &[u8]), Error> {
        Ok(ber::unmarshal_record_with::<VarBind>(buf, registry)?)
    }

    fn encode(&self) -> Vec<u8> {
        ber::marshal_record_with(self, &ProviderRegistry::with_defaults())
    }
}

/// A decoded SNMP PDU: common envelope fields plus the variable bindings.
/// `GetBulk` reuses `error_status`/`error_index` as `non_repeaters`/
/// `max_repetitions` the way the wire format does.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub kind: PduKind,
    pub request_id: i64,
    pub error_status: i64,
    pub error_index: i64,
    pub var_binds: Vec<VarBind>,
}

impl Pdu {
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let (envelope, rest) = Envelope::decode(buf)?;
        if envelope.class != Class::Application || !envelope.constructed {
            return Err(Error::Ber(ber::Error::EnvelopeMismatch {
                expected: Envelope::universal(universal_tag::SEQUENCE).constructed(),
                actual: envelope,
            }));
        }
        let kind = PduKind::try_from(envelope.tag).map_err(|_| Error::UnknownPduTag(envelope.tag))?;
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

        let (request_id, content): (Integer, _) = unmarshal(content, None)?;
        let (error_status, content): (Integer, _) = unmarshal(content, None)?;
        let (error_index, mut content): (Integer, _) = unmarshal(content, None)?;

        let registry = ProviderRegistry::with_defaults();
        let (var_bind_list_envelope, rest) = Envelope::decode(content)?;
        if var_bind_list_envelope.tag != universal_tag::SEQUENCE || !var_bind_list_envelope.constructed {
            return Err(Error::Ber(ber::Error::EnvelopeMismatch {
                expected: Envelope::universal(universal_tag::SEQUENCE).constructed(),
                actual: var_bind_list_envelope,
            }));
        }
        let (vb_len, rest) = decode_length(rest)?;
        if rest.len() < vb_len {
            return Err(ber::Error::Truncated {
                expected: vb_len,
                actual: rest.len(),
            }
            .into());
        }
        let (mut vb_content, tail) = rest.split_at(vb_len);
        let mut var_binds = Vec::new();
        while !vb_content.is_empty() {
            let (vb, tail) = VarBind::decode(vb_content, &registry)?;
            var_binds.push(vb);
            vb_content = tail;
        }
        content = tail;
        if !content.is_empty() {
            return Err(Error::TrailingBytes(content.len()));
        }

        Ok(Pdu {
            kind,
            request_id: request_id.0,
            error_status: error_status.0,
            error_index: error_index.0,
            var_binds,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut var_bind_content = Vec::new();
        for vb in &self.var_binds {
            var_bind_content.extend(vb.encode());
        }
        let mut var_bind_list = Envelope::universal(universal_tag::SEQUENCE)
            .constructed()
            .encode();
        var_bind_list.extend(encode_length(var_bind_content.len()));
        var_bind_list.extend(var_bind_content);

        let mut content = Vec::new();
        content.extend(ber::marshal(&Integer(self.request_id), None));
        content.extend(ber::marshal(&Integer(self.error_status), None));
        content.extend(ber::marshal(&Integer(self.error_index), None));
        content.extend(var_bind_list);

        let mut out = self.kind.envelope().encode();
        out.extend(encode_length(content.len()));
        out.extend(content);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_response_with_two_var_binds() {
        let pdu = Pdu {
            kind: PduKind::Response,
            request_id: 7,
            error_status: 0,
            error_index: 0,
            var_binds: vec![
                VarBind {
                    oid: Oid(vec![1, 3, 6, 1, 2, 1, 1, 3, 0]),
                    value: AnyValue::Application {
                        tag: 2,
                        bytes: vec![0x00, 0x01, 0x86, 0xA0],
                    },
                },
                VarBind {
                    oid: Oid(vec![1, 3, 6, 1, 2, 1, 1, 1, 0]),
                    value: AnyValue::OctetString(b"a printer".to_vec()),
                },
            ],
        };
        let bytes = pdu.encode();
        let decoded = Pdu::decode(&bytes).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn rejects_unknown_pdu_tag() {
        let mut envelope = Envelope::universal(universal_tag::SEQUENCE);
        envelope.class = Class::Application;
        envelope.constructed = true;
        envelope.tag = 0x3f;
        let mut bytes = envelope.encode();
        bytes.extend(encode_length(0));
        assert!(matches!(Pdu::decode(&bytes), Err(Error::UnknownPduTag(0x3f))));
    }
}
