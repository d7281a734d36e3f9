//! Projects decoded SNMP varbinds into Prometheus text exposition, using a
//! compiled [`crate::mib::Database`] to name and type each sample.

mod meta;

pub use meta::{to_snake_case, DisplayHint, MetricFlag, MetricMeta, MetricType};

use crate::ber::AnyValue;
use crate::mib::{Database, Object};
use crate::snmp::VarBind;
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fetch (computing and caching on first access) an object's derived
/// presentation metadata.
pub fn get_or_compute<'a>(object: &'a Object, db: &Database) -> &'a MetricMeta {
    object.metadata.get_or_init(|| MetricMeta::derive(object, db))
}

/// Walk upward from `arcs` looking for the nearest ancestor object whose
/// resolved metadata carries an INDEX clause — the table row/entry that
/// governs index-column naming for every column beneath it. Returns the
/// entry object's own name alongside its INDEX columns, so a column name's
/// common prefix with the entry can be stripped for use as a label key.
fn find_index_columns(db: &Database, arcs: &[u32]) -> Option<(String, Vec<String>)> {
    let mut len = arcs.len();
    while len > 0 {
        len -= 1;
        let (found, residual) = db.find_oid(&arcs[..len]);
        if !residual.is_empty() {
            continue;
        }
        let Some(obj_rc) = found else { continue };
        let obj = obj_rc.borrow();
        let columns = get_or_compute(&obj, db).index_columns.clone();
        if let Some(columns) = columns {
            return Some((obj.name.clone(), columns));
        }
    }
    None
}

/// The longest common leading run of bytes shared by `a` and `b`, the way
/// `findCommonPrefix` in the original metric printer derives a table's
/// label-key prefix from its entry and column names.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

/// A column's own snake-cased name with its table/entry's common prefix
/// stripped off, e.g. `foo_index` under entry `foo_entry` becomes `index`.
/// Falls back to the full name if stripping would leave nothing.
fn label_key(entry_snake_name: &str, column_snake_name: &str) -> String {
    let n = common_prefix_len(entry_snake_name, column_snake_name);
    let stripped = &column_snake_name[n..];
    if stripped.is_empty() {
        column_snake_name.to_string()
    } else {
        stripped.to_string()
    }
}

/// Render a table's INDEX column value for use as a label: looked up by
/// name and decoded through that column's own declared SYNTAX/display hint
/// (so an enumerated INTEGER index renders its symbolic name, not a bare
/// arc number), falling back to the raw arc when the column can't be found
/// or its display hint doesn't apply to a single residual arc.
fn format_index_value(db: &Database, column_name: &str, arc: u32) -> String {
    let Some(obj_rc) = db.lookup_name(column_name).and_then(|d| d.as_object()) else {
        return arc.to_string();
    };
    let obj = obj_rc.borrow();
    let meta = get_or_compute(&obj, db);
    format_value(&AnyValue::Integer(arc as i64), meta).unwrap_or_else(|| arc.to_string())
}

/// One table's worth of buffered rows, keyed by stringified INDEX tuple, so
/// that interleaved varbinds for the same row are grouped before emission.
struct MetricBlock {
    table_key: Vec<u32>,
    name: String,
    help: Option<String>,
    metric_type: MetricType,
    header_written: bool,
    rows: BTreeMap<String, Row>,
}

struct Row {
    labels: Vec<(String, String)>,
    value: Option<String>,
}

impl MetricBlock {
    fn new(table_key: Vec<u32>, meta: &MetricMeta) -> Self {
        Self {
            table_key,
            name: meta.name.clone(),
            help: meta.help.clone(),
            metric_type: meta.metric_type,
            header_written: false,
            rows: BTreeMap::new(),
        }
    }

    fn set_row(&mut self, key: String, labels: Vec<(String, String)>, value: Option<String>) {
        self.rows.insert(key, Row { labels, value });
    }

    fn write(&mut self, out: &mut dyn Write) -> Result<(), Error> {
        if self.rows.is_empty() {
            return Ok(());
        }
        if !self.header_written {
            if let Some(help) = &self.help {
                writeln!(out, "# HELP {} {}", self.name, help)?;
            }
            let type_word = match self.metric_type {
                MetricType::Counter => "COUNTER",
                MetricType::Gauge => "GAUGE",
                MetricType::Untyped => "UNTYPED",
            };
            writeln!(out, "# TYPE {} {}", self.name, type_word)?;
            self.header_written = true;
        }
        for row in self.rows.values() {
            let labels = if row.labels.is_empty() {
                String::new()
            } else {
                let parts: Vec<String> = row
                    .labels
                    .iter()
                    .map(|(k, v)| format!("{k}=\"{}\"", escape_label(v)))
                    .collect();
                format!("{{{}}}", parts.join(","))
            };
            let value = row.value.as_deref().unwrap_or("1");
            writeln!(out, "{}{} {}", self.name, labels, value)?;
        }
        Ok(())
    }
}

fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Formats a decoded value according to its object's display hint.
fn format_value(value: &AnyValue, meta: &MetricMeta) -> Option<String> {
    match meta.display_hint {
        DisplayHint::Enum => match value {
            AnyValue::Integer(n) => Some(
                meta.enum_values
                    .as_ref()
                    .and_then(|map| map.get(n))
                    .cloned()
                    .unwrap_or_else(|| n.to_string()),
            ),
            _ => None,
        },
        DisplayHint::Ascii => match value {
            AnyValue::Utf8String(s) | AnyValue::PrintableString(s) | AnyValue::IA5String(s) => Some(s.clone()),
            AnyValue::Oid(oid) => Some(oid.to_string()),
            AnyValue::OctetString(b) => Some(String::from_utf8_lossy(b).into_owned()),
            _ => None,
        },
        DisplayHint::Bytes => match value {
            AnyValue::OctetString(b) | AnyValue::Application { bytes: b, .. } => {
                Some(b.iter().map(|byte| format!("{byte:02x}")).collect())
            }
            _ => None,
        },
        DisplayHint::IpAddress => match value {
            AnyValue::OctetString(b) | AnyValue::Application { bytes: b, .. } if b.len() == 4 => {
                Some(format!("{}.{}.{}.{}", b[0], b[1], b[2], b[3]))
            }
            _ => None,
        },
        DisplayHint::PhysAddress => match value {
            AnyValue::OctetString(b) | AnyValue::Application { bytes: b, .. } => Some(
                b.iter()
                    .map(|byte| format!("{byte:02x}"))
                    .collect::<Vec<_>>()
                    .join(":"),
            ),
            _ => None,
        },
        DisplayHint::Numeric => match value {
            AnyValue::Integer(n) => Some(n.to_string()),
            AnyValue::Application { bytes, .. } => Some(bytes_as_u64(bytes).to_string()),
            _ => None,
        },
    }
}

fn bytes_as_u64(bytes: &[u8]) -> u64 {
    let mut acc: u64 = 0;
    for &b in bytes {
        acc = (acc << 8) | b as u64;
    }
    acc
}

/// Consumes a stream of decoded varbinds and emits Prometheus text
/// exposition to a writer, grouping consecutive same-table rows.
pub struct Projector<'db> {
    db: &'db Database,
    current: Option<MetricBlock>,
}

impl<'db> Projector<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db, current: None }
    }

    pub fn handle(&mut self, out: &mut dyn Write, varbind: &VarBind) -> Result<(), Error> {
        let (found, residual) = self.db.find_oid(&varbind.oid.0);
        let Some(obj_rc) = found else {
            tracing::warn!(oid = %varbind.oid, "no MIB object matches this OID; dropping varbind");
            return Ok(());
        };
        let obj = obj_rc.borrow();
        let meta = get_or_compute(&obj, self.db);
        let table_key = obj.arcs.clone().unwrap_or_default();
        let index_info = find_index_columns(self.db, &table_key);

        if index_info.is_none() && residual.len() > 1 {
            tracing::warn!(
                oid = %varbind.oid,
                residual = ?residual,
                "varbind has residual arcs but its object is not part of a table; dropping"
            );
            return Ok(());
        }

        if self.current.as_ref().map(|b| b.table_key != table_key).unwrap_or(true) {
            self.flush(out)?;
            self.current = Some(MetricBlock::new(table_key, meta));
        }

        let row_key: String = residual
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".");
        let labels = match &index_info {
            Some((entry_name, names)) => {
                let entry_snake = to_snake_case(entry_name);
                names
                    .iter()
                    .zip(residual.iter())
                    .map(|(name, &arc)| {
                        let key = label_key(&entry_snake, &to_snake_case(name));
                        let value = format_index_value(self.db, name, arc);
                        (key, value)
                    })
                    .collect()
            }
            None => Vec::new(),
        };
        let value = format_value(&varbind.value, meta);

        self.current.as_mut().unwrap().set_row(row_key, labels, value);
        Ok(())
    }

    /// Flush the currently buffered table block, if any.
    pub fn flush(&mut self, out: &mut dyn Write) -> Result<(), Error> {
        if let Some(mut block) = self.current.take() {
            block.write(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::Oid;
    use crate::mib::CompileContext;

    fn built_database(source: &str) -> Database {
        let mut db = Database::new();
        db.add_source("TEST-MIB", source).unwrap();
        let ctx = CompileContext::new();
        db.create_index(&ctx).unwrap();
        db
    }

    #[test]
    fn scalar_object_projects_a_single_line() {
        let db = built_database(
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
        );
        let mut projector = Projector::new(&db);
        let varbind = VarBind {
            oid: Oid(vec![1, 1, 0]),
            value: AnyValue::Integer(42),
        };
        let mut out = Vec::new();
        projector.handle(&mut out, &varbind).unwrap();
        projector.flush(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("# TYPE test_scalar UNTYPED"));
        assert!(text.contains("test_scalar 42"));
    }

    #[test]
    fn unknown_oid_is_dropped_without_error() {
        let db = built_database(
            r#"
            TEST-MIB DEFINITIONS ::= BEGIN
            iso OBJECT IDENTIFIER ::= { 1 }
            END
            "#,
        );
        let mut projector = Projector::new(&db);
        let varbind = VarBind {
            oid: Oid(vec![9, 9, 9]),
            value: AnyValue::Null,
        };
        let mut out = Vec::new();
        projector.handle(&mut out, &varbind).unwrap();
        projector.flush(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
