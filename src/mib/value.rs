use crate::token::Position;
use std::collections::HashMap;

/// A leaf value produced by executing a [`super::Pattern`] or by a bare
/// literal definition (`foo STRING ::= "bar"`). Corresponds to what the
/// distilled model calls a `GoValue<T>`: a primitive captured straight from
/// a token's text with no further structure.
#[derive(Debug, Clone, PartialEq)]
pub enum GoValue {
    Int(i64),
    Text(String),
    Bool(bool),
}

/// Any value a pattern can produce: a primitive, a nested name→value map
/// built from named pattern captures, or a flat list from a `SequenceOf`.
#[derive(Debug, Clone)]
pub enum Value {
    Primitive(GoValue),
    Composite(CompositeValue),
    List(ValueList),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Primitive(GoValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Primitive(GoValue::Int(i)) => Some(*i),
            _ => None,
        }
    }
}

/// Named captures accumulated while matching a `Sequence`/`Choice` pattern,
/// e.g. the `SYNTAX`, `DESCRIPTION`, `MAX-ACCESS` fields of an `OBJECT-TYPE`
/// invocation.
#[derive(Debug, Clone)]
pub struct CompositeValue {
    pub source: Position,
    pub fields: HashMap<String, Value>,
}

impl CompositeValue {
    pub fn new(source: Position) -> Self {
        Self {
            source,
            fields: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }
}

/// The result of matching a `SequenceOf` pattern: an ordered list of
/// element values, e.g. the `VARIABLES` clause of a `TRAP-TYPE`.
pub type ValueList = Vec<Value>;
