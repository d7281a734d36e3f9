//! MIB/ASN.1 tokenizer and compiler, a BER codec with an SNMP PDU layer on
//! top, and a Prometheus metric projector driven by the compiled MIB tree.

/// Tokenizer: byte stream to a lazy, restartable sequence of positioned tokens.
pub mod token;
/// Module reader and type/value compiler for the SMIv1/SMIv2 ASN.1 subset.
pub mod mib;
/// BER codec: envelopes, length framing, native SMI value types, and a
/// provider registry for dynamically-typed decoding.
pub mod ber;
/// SNMPv1/SNMPv2c message, PDU, and varbind shapes built on the BER codec.
pub mod snmp;
/// Projects decoded varbinds into Prometheus text exposition.
pub mod metric;
