use snmp_mib::ber::{self, AnyValue, Envelope, Integer, Null, Oid, OctetString};
use snmp_mib::mib::{CompileContext, Database};
use snmp_mib::metric::Projector;
use snmp_mib::snmp::{Message, Pdu, PduKind, VarBind};
use snmp_mib::token::{Scanner, ScannerOptions, TokenKind};

#[test]
fn ber_vectors_from_the_spec() {
    assert_eq!(ber::marshal(&Integer(0), None), vec![0x02, 0x01, 0x00]);
    assert_eq!(ber::marshal(&Integer(127), None), vec![0x02, 0x01, 0x7F]);
    assert_eq!(ber::marshal(&Integer(-128), None), vec![0x02, 0x01, 0x80]);
    assert_eq!(ber::marshal(&Integer(2020), None), vec![0x02, 0x02, 0x07, 0xE4]);
    assert_eq!(
        ber::marshal(&Oid(vec![1, 3, 6, 1, 2, 1, 1, 1, 0]), None),
        vec![0x06, 0x08, 0x2B, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00]
    );
    assert_eq!(ber::marshal(&Null, None), vec![0x05, 0x00]);
    let long = ber::marshal(&OctetString(vec![0u8; 200]), None);
    assert_eq!(&long[..3], &[0x04, 0x81, 0xC8]);
}

#[test]
fn tokenizer_round_trips_raw_spans() {
    let source = "testObject OBJECT-TYPE -- a comment\n  SYNTAX INTEGER";
    let mut scanner = Scanner::new("t", source, ScannerOptions::default());
    let mut spans = String::new();
    loop {
        let tok = scanner.pop();
        if tok.is_eof() {
            break;
        }
        if tok.kind != TokenKind::Whitespace && tok.kind != TokenKind::Comment {
            if !spans.is_empty() {
                spans.push(' ');
            }
            spans.push_str(&tok.text);
        }
    }
    assert_eq!(spans, "testObject OBJECT-TYPE SYNTAX INTEGER");
}

#[test]
fn find_oid_reports_residual_past_the_compiled_tree() {
    let mut db = Database::new();
    db.add_source(
        "TEST-MIB",
        r#"
        TEST-MIB DEFINITIONS ::= BEGIN
        iso OBJECT IDENTIFIER ::= { 1 }
        testScalar OBJECT-TYPE
            SYNTAX Counter32
            MAX-ACCESS read-only
            STATUS current
            DESCRIPTION "a counter"
            ::= { iso 1 }
        END
        "#,
    )
    .unwrap();
    let ctx = CompileContext::new();
    db.create_index(&ctx).unwrap();

    let (found, residual) = db.find_oid(&[1, 1]);
    assert!(found.is_some());
    assert!(residual.is_empty());

    let (found, residual) = db.find_oid(&[1, 1, 0]);
    assert!(found.is_some());
    assert_eq!(residual, vec![0]);
}

#[test]
fn decodes_a_get_response_and_projects_a_counter_metric() {
    let mut db = Database::new();
    db.add_source(
        "TEST-MIB",
        r#"
        TEST-MIB DEFINITIONS ::= BEGIN
        iso OBJECT IDENTIFIER ::= { 1 }
        ifInOctets OBJECT-TYPE
            SYNTAX Counter32
            MAX-ACCESS read-only
            STATUS current
            DESCRIPTION "total octets received"
            ::= { iso 1 }
        END
        "#,
    )
    .unwrap();
    let ctx = CompileContext::new();
    db.create_index(&ctx).unwrap();

    let message = Message {
        version: 1,
        community: b"public".to_vec(),
        pdu: Pdu {
            kind: PduKind::Response,
            request_id: 1,
            error_status: 0,
            error_index: 0,
            var_binds: vec![VarBind {
                oid: Oid(vec![1, 1, 0]),
                value: AnyValue::Application {
                    tag: 1,
                    bytes: vec![0x00, 0x00, 0x27, 0x10],
                },
            }],
        },
    };
    let bytes = message.encode();
    let decoded = Message::decode(&bytes).unwrap();
    assert_eq!(decoded, message);

    let mut projector = Projector::new(&db);
    let mut out = Vec::new();
    for vb in &decoded.pdu.var_binds {
        projector.handle(&mut out, vb).unwrap();
    }
    projector.flush(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("# TYPE if_in_octets_total COUNTER"));
    assert!(text.contains("if_in_octets_total 10000"));
}

#[test]
fn table_rows_group_under_one_header_with_index_labels() {
    let mut db = Database::new();
    db.add_source(
        "TEST-MIB",
        r#"
        TEST-MIB DEFINITIONS ::= BEGIN
        iso OBJECT IDENTIFIER ::= { 1 }
        fooTable OBJECT-TYPE
            SYNTAX SEQUENCE OF FooEntry
            MAX-ACCESS not-accessible
            STATUS current
            DESCRIPTION "a table"
            ::= { iso 1 }
        fooEntry OBJECT-TYPE
            SYNTAX FooEntry
            MAX-ACCESS not-accessible
            STATUS current
            DESCRIPTION "a row"
            INDEX { fooIndex }
            ::= { fooTable 1 }
        fooIndex OBJECT-TYPE
            SYNTAX INTEGER
            MAX-ACCESS not-accessible
            STATUS current
            DESCRIPTION "row index"
            ::= { fooEntry 1 }
        fooValue OBJECT-TYPE
            SYNTAX Gauge32
            MAX-ACCESS read-only
            STATUS current
            DESCRIPTION "row value"
            ::= { fooEntry 2 }
        END
        "#,
    )
    .unwrap();
    let ctx = CompileContext::new();
    db.create_index(&ctx).unwrap();

    let mut projector = Projector::new(&db);
    let mut out = Vec::new();
    for (index, value) in [(3u32, 17u32), (4, 23)] {
        let vb = VarBind {
            oid: Oid(vec![1, 1, 1, 2, index]),
            value: AnyValue::Application {
                tag: 2,
                bytes: value.to_be_bytes().to_vec(),
            },
        };
        projector.handle(&mut out, &vb).unwrap();
    }
    projector.flush(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(text.matches("# TYPE foo_value GAUGE").count(), 1);
    assert!(text.contains(r#"foo_value{index="3"} 17"#));
    assert!(text.contains(r#"foo_value{index="4"} 23"#));
}

#[test]
fn envelope_round_trips_application_class() {
    let envelope = Envelope::application(1).constructed();
    let bytes = envelope.encode();
    let (decoded, rest) = Envelope::decode(&bytes).unwrap();
    assert_eq!(decoded, envelope);
    assert!(rest.is_empty());
}
