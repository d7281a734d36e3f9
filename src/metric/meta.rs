use crate::mib::{Database, Definition, GoValue, Object, Value};
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Presentation flags derived from an object's SYNTAX/INDEX metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MetricFlag: u8 {
        /// Value renders as text rather than a number.
        const IS_STRING       = 0b0001;
        /// This object is itself used as an index column on some table.
        const IS_PART_OF_INDEX = 0b0010;
        /// This object is a table's conceptual row/entry (carries INDEX).
        const IS_TABLE        = 0b0100;
    }
}

/// A SYNTAX's rendering hint, matching the `display_hint` derivation in the
/// projector contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayHint {
    /// `e`: INTEGER with a named enumeration.
    Enum,
    /// `a`: OBJECT IDENTIFIER / DisplayString.
    Ascii,
    /// `b`: Opaque / OCTET STRING.
    Bytes,
    /// `n`: plain numeric (INTEGER without an enum, TimeTicks, Gauge32,
    /// Counter*).
    Numeric,
    /// `n.`: IpAddress / NetworkAddress, rendered dotted-quad.
    IpAddress,
    /// `x:`: PhysAddress, rendered colon-separated hex.
    PhysAddress,
}

/// Prometheus metric type implied by an object's SYNTAX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Untyped,
}

/// Derived, cached-once presentation metadata for one MIB object.
#[derive(Debug, Clone)]
pub struct MetricMeta {
    pub name: String,
    pub help: Option<String>,
    pub display_hint: DisplayHint,
    pub metric_type: MetricType,
    pub enum_values: Option<HashMap<i64, String>>,
    pub index_columns: Option<Vec<String>>,
    pub flags: MetricFlag,
}

impl MetricMeta {
    pub fn derive(object: &Object, db: &Database) -> Self {
        let resolved = object.meta.as_ref().and_then(|m| m.resolved.as_ref());
        let help = resolved
            .and_then(|c| c.text("DESCRIPTION"))
            .filter(|s| !s.is_empty())
            .map(|s| {
                let mut help = first_sentence(s).to_string();
                if let Some(arcs) = &object.arcs {
                    let oid = crate::ber::Oid(arcs.clone());
                    help.push_str(&format!(" (OID: {oid})"));
                }
                help
            });
        let syntax = resolved.and_then(|c| c.get("SYNTAX"));
        let index_columns = resolved
            .and_then(|c| c.get("INDEX"))
            .map(|v| {
                let mut names = Vec::new();
                collect_leaf_names(v, &mut names);
                names
            })
            .filter(|names| !names.is_empty());

        let (type_name, enum_values) = match syntax {
            Some(Value::Composite(composite)) => {
                let type_name = composite.text("type").unwrap_or("INTEGER").to_string();
                let enums = composite.get("enum").and_then(|v| match v {
                    Value::List(items) => {
                        let mut map = HashMap::new();
                        for item in items {
                            if let Value::Composite(entry) = item {
                                if let (Some(label), Some(Value::Primitive(GoValue::Int(n)))) =
                                    (entry.text("label"), entry.get("value"))
                                {
                                    map.insert(*n, label.to_string());
                                }
                            }
                        }
                        if map.is_empty() {
                            None
                        } else {
                            Some(map)
                        }
                    }
                    _ => None,
                });
                (type_name, enums)
            }
            Some(Value::Primitive(GoValue::Text(name))) => (name.clone(), None),
            _ => ("INTEGER".to_string(), None),
        };

        let (display_hint, metric_type) = resolve_display(&type_name, enum_values.is_some(), db, 0);

        let mut flags = MetricFlag::empty();
        if index_columns.is_some() {
            flags |= MetricFlag::IS_TABLE;
        }
        if matches!(display_hint, DisplayHint::Ascii | DisplayHint::Bytes | DisplayHint::PhysAddress) {
            flags |= MetricFlag::IS_STRING;
        }

        let base_name = to_snake_case(&object.name);
        let name = if matches!(metric_type, MetricType::Counter) {
            format!("{base_name}_total")
        } else {
            base_name
        };

        MetricMeta {
            name,
            help,
            display_hint,
            metric_type,
            enum_values,
            index_columns,
            flags,
        }
    }
}

/// Walk a SYNTAX type name to a `(display_hint, metric_type)` pair,
/// following one level of user-defined type alias through the database
/// when the name isn't one of the built-ins the projector contract names.
fn resolve_display(type_name: &str, has_enum: bool, db: &Database, depth: u32) -> (DisplayHint, MetricType) {
    if depth > 16 {
        return (DisplayHint::Numeric, MetricType::Untyped);
    }
    match type_name {
        "INTEGER" => (
            if has_enum { DisplayHint::Enum } else { DisplayHint::Numeric },
            MetricType::Untyped,
        ),
        "OBJECT IDENTIFIER" | "DisplayString" => (DisplayHint::Ascii, MetricType::Untyped),
        "Opaque" | "OCTET STRING" => (DisplayHint::Bytes, MetricType::Untyped),
        "TimeTicks" => (DisplayHint::Numeric, MetricType::Untyped),
        "IpAddress" | "NetworkAddress" => (DisplayHint::IpAddress, MetricType::Untyped),
        "PhysAddress" => (DisplayHint::PhysAddress, MetricType::Untyped),
        "Gauge32" | "Gauge" => (DisplayHint::Numeric, MetricType::Gauge),
        name if name.starts_with("Counter") => (DisplayHint::Numeric, MetricType::Counter),
        other => match underlying_type_name(db, other) {
            Some(next) => resolve_display(&next, has_enum, db, depth + 1),
            None => (DisplayHint::Numeric, MetricType::Untyped),
        },
    }
}

fn underlying_type_name(db: &Database, name: &str) -> Option<String> {
    match db.lookup_name(name)? {
        Definition::TypeReference(tr) => Some(tr.borrow().name.clone()),
        Definition::SimpleType(st) => Some(st.borrow().ident.clone()),
        _ => None,
    }
}

/// The first sentence of a DESCRIPTION string: up to and including its
/// first `.`, or the whole text if it has none.
fn first_sentence(text: &str) -> &str {
    match text.find('.') {
        Some(idx) => &text[..=idx],
        None => text,
    }
}

/// Collect every leaf text token found in an INDEX clause's captured value,
/// regardless of how deeply the owning macro's pattern nested it. This is a
/// deliberate simplification of full `IndexType`/`IMPLIED` parsing: good
/// enough to name the index columns, not to distinguish IMPLIED ones.
fn collect_leaf_names(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Primitive(GoValue::Text(s)) if !s.is_empty() => out.push(s.clone()),
        Value::List(items) => items.iter().for_each(|v| collect_leaf_names(v, out)),
        Value::Composite(c) => c.fields.values().for_each(|v| collect_leaf_names(v, out)),
        _ => {}
    }
}

/// `someCamelCaseName` -> `some_camel_case_name`.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_cases_camel_names() {
        assert_eq!(to_snake_case("ifInOctets"), "if_in_octets");
        assert_eq!(to_snake_case("sysDescr"), "sys_descr");
        assert_eq!(to_snake_case("alreadySnake_ish"), "already_snake_ish");
    }

    #[test]
    fn minimal_object_type_derives_a_truncated_help_with_oid_suffix() {
        let mut db = Database::new();
        db.add_source(
            "Z",
            r#"
            Z DEFINITIONS ::= BEGIN
            foo OBJECT-TYPE
                SYNTAX INTEGER
                MAX-ACCESS read-only
                STATUS current
                DESCRIPTION "x."
                ::= { iso 42 }
            END
            "#,
        )
        .unwrap();
        let ctx = crate::mib::CompileContext::new();
        db.create_index(&ctx).unwrap();
        let (obj_rc, residual) = db.find_oid(&[1, 42]);
        assert!(residual.is_empty());
        let obj = obj_rc.unwrap();
        let obj = obj.borrow();
        let meta = MetricMeta::derive(&obj, &db);
        assert_eq!(meta.name, "foo");
        assert_eq!(meta.help.as_deref(), Some("x. (OID: 1.42)"));
        assert_eq!(meta.display_hint, DisplayHint::Numeric);
        assert_eq!(meta.metric_type, MetricType::Untyped);
    }

    #[test]
    fn object_without_an_index_clause_has_no_index_columns() {
        let mut db = Database::new();
        db.add_source(
            "TEST-MIB",
            r#"
            TEST-MIB DEFINITIONS ::= BEGIN
            iso OBJECT IDENTIFIER ::= { 1 }
            testScalar OBJECT-TYPE
                SYNTAX INTEGER
                MAX-ACCESS read-only
                STATUS current
                DESCRIPTION "a scalar"
                ::= { iso 1 }
            END
            "#,
        )
        .unwrap();
        let ctx = crate::mib::CompileContext::new();
        db.create_index(&ctx).unwrap();
        let (obj_rc, _) = db.find_oid(&[1, 1]);
        let obj = obj_rc.unwrap();
        let obj = obj.borrow();
        let meta = MetricMeta::derive(&obj, &db);
        assert!(meta.index_columns.is_none());
        assert!(!meta.flags.contains(MetricFlag::IS_TABLE));
    }
}
