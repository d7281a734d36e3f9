//! Compiled form of a MACRO field body, and the tentative matcher that
//! executes one against a live token stream.

use super::value::{CompositeValue, GoValue, Value};
use super::{CompileContext, Error};
use crate::token::{Position, Projection, Reader};
use std::collections::HashMap;

/// Empty map passed when executing a pattern with no sibling fields to
/// dispatch through (e.g. ad-hoc patterns built outside a macro body).
pub fn no_fields() -> HashMap<String, Pattern> {
    HashMap::new()
}

/// A compiled macro field grammar. Built once from the field's raw token
/// run by [`compile_field`], then executed once per macro invocation.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Must match this exact token text (case-insensitively for keywords).
    ExpectedToken(String),
    /// Consume a value of another field, or of a built-in type, binding it
    /// into the enclosing composite under `label` if one is given.
    TypeReference { name: String, label: Option<String> },
    /// Every sub-pattern must match, in order.
    Sequence(Vec<Pattern>),
    /// First sub-pattern that matches wins.
    Choice(Vec<Pattern>),
    /// `element (delimiter element)*`, folded from the left-recursive
    /// `X ::= Elem | X "," Elem` idiom.
    SequenceOf {
        element: Box<Pattern>,
        delimiter: String,
    },
    /// Matches zero tokens; used for optional macro clauses like `empty`.
    Empty,
}

/// Build a [`Pattern`] from a macro field's raw token run.
///
/// This performs a simple precedence-climbing parse over the token shapes
/// the built-in `OBJECT-TYPE`/`TRAP-TYPE` macros and typical user macros
/// use: quoted literals, `type(Name)`/`value(label Name)` wrappers, bare
/// identifiers referencing sibling fields, `|` alternation, and detection
/// of the `X ::= Elem | X "," Elem` left-recursive shape.
pub fn compile_field(field_name: &str, tokens: &[crate::token::Token]) -> Result<Pattern, Error> {
    let alternatives = split_top_level(tokens, "|");
    if alternatives.len() > 1 {
        if let Some(folded) = try_fold_sequence_of(field_name, &alternatives) {
            return Ok(folded);
        }
        let mut parts = Vec::new();
        for alt in alternatives {
            parts.push(compile_sequence(alt)?);
        }
        return Ok(Pattern::Choice(parts));
    }
    compile_sequence(tokens)
}

fn split_top_level<'a>(tokens: &'a [crate::token::Token], sep: &str) -> Vec<&'a [crate::token::Token]> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, t) in tokens.iter().enumerate() {
        match t.text.as_str() {
            "(" | "{" | "[" => depth += 1,
            ")" | "}" | "]" => depth -= 1,
            s if s == sep && depth == 0 => {
                out.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&tokens[start..]);
    out
}

fn compile_sequence(tokens: &[crate::token::Token]) -> Result<Pattern, Error> {
    if tokens.is_empty() || (tokens.len() == 1 && tokens[0].is_ci("empty")) {
        return Ok(Pattern::Empty);
    }
    let mut parts = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if t.kind == crate::token::TokenKind::String {
            parts.push(Pattern::ExpectedToken(t.text.clone()));
            i += 1;
            continue;
        }
        if (t.is("type") || t.is("value")) && tokens.get(i + 1).map(|n| n.is("(")).unwrap_or(false) {
            let is_value = t.is("value");
            let mut depth = 1;
            let mut j = i + 2;
            let mut inner = Vec::new();
            while j < tokens.len() && depth > 0 {
                match tokens[j].text.as_str() {
                    "(" => depth += 1,
                    ")" => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                inner.push(tokens[j].clone());
                j += 1;
            }
            if is_value && inner.len() == 2 {
                parts.push(Pattern::TypeReference {
                    label: Some(inner[0].text.clone()),
                    name: inner[1].text.clone(),
                });
            } else if let Some(last) = inner.last() {
                parts.push(Pattern::TypeReference {
                    label: None,
                    name: last.text.clone(),
                });
            }
            i = j + 1;
            continue;
        }
        if t.kind == crate::token::TokenKind::Ident {
            parts.push(Pattern::TypeReference {
                name: t.text.clone(),
                label: None,
            });
            i += 1;
            continue;
        }
        // Bare punctuation in a field body is treated as a literal keyword.
        parts.push(Pattern::ExpectedToken(t.text.clone()));
        i += 1;
    }
    if parts.len() == 1 {
        Ok(parts.into_iter().next().unwrap())
    } else {
        Ok(Pattern::Sequence(parts))
    }
}

/// Detects `X ::= Elem | X "," Elem` (in either operand order) and folds it
/// to a [`Pattern::SequenceOf`].
fn try_fold_sequence_of(field_name: &str, alternatives: &[&[crate::token::Token]]) -> Option<Pattern> {
    if alternatives.len() != 2 {
        return None;
    }
    let (single, recursive) = if alternatives[0].len() == 1 {
        (alternatives[0], alternatives[1])
    } else if alternatives[1].len() == 1 {
        (alternatives[1], alternatives[0])
    } else {
        return None;
    };
    let elem_name = &single[0].text;
    // recursive side must look like: field_name "," elem  OR  elem "," field_name
    let comma_at = recursive.iter().position(|t| t.is(","))?;
    let (left, right) = (&recursive[..comma_at], &recursive[comma_at + 1..]);
    let is_field = |run: &[crate::token::Token]| run.len() == 1 && run[0].text == *field_name;
    let delimiter = recursive[comma_at].text.clone();
    if is_field(left) && right.len() == 1 {
        return Some(Pattern::SequenceOf {
            element: Box::new(Pattern::TypeReference {
                name: elem_name.clone(),
                label: None,
            }),
            delimiter,
        });
    }
    if is_field(right) && left.len() == 1 {
        return Some(Pattern::SequenceOf {
            element: Box::new(Pattern::TypeReference {
                name: elem_name.clone(),
                label: None,
            }),
            delimiter,
        });
    }
    None
}

/// Execute `pattern` against `reader`, accumulating named captures into
/// `out`. On success the reader has been advanced past everything matched;
/// on failure the reader is left exactly where it started.
pub fn exec<R: Reader>(
    pattern: &Pattern,
    reader: &mut R,
    out: &mut CompositeValue,
    fields: &HashMap<String, Pattern>,
    ctx: &CompileContext,
    position: &Position,
) -> Result<(), Error> {
    let _guard = ctx.enter(position)?;
    match pattern {
        Pattern::Empty => Ok(()),
        Pattern::ExpectedToken(text) => {
            let mut proj = Projection::new(reader);
            let tok = proj.pop();
            if tok.is(text) || tok.is_ci(text) {
                proj.commit();
                Ok(())
            } else {
                Err(Error::Syntax {
                    position: tok.position.clone(),
                    message: format!("expected {text:?}, found {:?}", tok.text),
                })
            }
        }
        Pattern::TypeReference { name, label } => {
            let key = label.clone().unwrap_or_else(|| name.clone());
            if let Some(sibling) = fields.get(name) {
                let mut proj = Projection::new(reader);
                let mut inner = CompositeValue::new(position.clone());
                exec(sibling, &mut proj, &mut inner, fields, ctx, position)?;
                let consumed: Vec<String> = proj
                    .consumed()
                    .iter()
                    .map(|t| t.text.clone())
                    .collect();
                proj.commit();
                let value = match inner.fields.len() {
                    0 => Value::Primitive(GoValue::Text(consumed.join(" "))),
                    1 => inner.fields.into_values().next().unwrap(),
                    _ => Value::Composite(inner),
                };
                out.fields.insert(key, value);
                return Ok(());
            }
            // Not a sibling field: a built-in ASN.1 type name. Consume it,
            // plus a trailing bracketed enumeration/constraint if present
            // (e.g. `SYNTAX INTEGER { up(1), down(2) }`).
            let mut proj = Projection::new(reader);
            let base = proj.pop();
            if base.is_eof() {
                return Err(Error::Syntax {
                    position: base.position,
                    message: format!("expected a value for {name}, found end of input"),
                });
            }
            // `SEQUENCE OF`/`SET OF` fuse to one token in the scanner but are
            // still followed by the element type name; consume it here so the
            // reader stays aligned with the rest of the macro's Sequence.
            if base.text.eq_ignore_ascii_case("SEQUENCE OF") || base.text.eq_ignore_ascii_case("SET OF") {
                if proj.lookahead(0).kind == crate::token::TokenKind::Ident {
                    proj.pop();
                }
            }
            let mut enum_values = Vec::new();
            let mut has_bracket = false;
            if proj.lookahead(0).is("{") {
                has_bracket = true;
                let block = crate::token::read_block(&mut proj, "{", "}")?;
                let toks = block.remaining();
                let mut i = 0;
                while i + 2 < toks.len() {
                    if toks[i].kind == crate::token::TokenKind::Ident && toks[i + 1].is("(") {
                        if let Ok(n) = toks[i + 2].text.parse::<i64>() {
                            let mut entry = CompositeValue::new(toks[i].position.clone());
                            entry
                                .fields
                                .insert("label".to_string(), Value::Primitive(GoValue::Text(toks[i].text.clone())));
                            entry
                                .fields
                                .insert("value".to_string(), Value::Primitive(GoValue::Int(n)));
                            enum_values.push(Value::Composite(entry));
                        }
                    }
                    i += 1;
                }
            }
            proj.commit();
            let value = if has_bracket {
                let mut composite = CompositeValue::new(base.position.clone());
                composite
                    .fields
                    .insert("type".to_string(), Value::Primitive(GoValue::Text(base.text.clone())));
                composite
                    .fields
                    .insert("enum".to_string(), Value::List(enum_values));
                Value::Composite(composite)
            } else if base.kind == crate::token::TokenKind::Number {
                base.text
                    .parse::<i64>()
                    .map(GoValue::Int)
                    .map(Value::Primitive)
                    .unwrap_or_else(|_| Value::Primitive(GoValue::Text(base.text.clone())))
            } else {
                Value::Primitive(GoValue::Text(base.text.clone()))
            };
            out.fields.insert(key, value);
            Ok(())
        }
        Pattern::Sequence(parts) => {
            let mut proj = Projection::new(reader);
            for part in parts {
                exec(part, &mut proj, out, fields, ctx, position)?;
            }
            proj.commit();
            Ok(())
        }
        Pattern::Choice(alts) => {
            let mut errors = Vec::new();
            for alt in alts {
                let mut proj = Projection::new(reader);
                let mut attempt = out.clone();
                match exec(alt, &mut proj, &mut attempt, fields, ctx, position) {
                    Ok(()) => {
                        proj.commit();
                        *out = attempt;
                        return Ok(());
                    }
                    Err(e) => errors.push(e),
                }
            }
            Err(errors.into_iter().next().unwrap_or_else(|| Error::Syntax {
                position: position.clone(),
                message: "no alternative matched".to_string(),
            }))
        }
        Pattern::SequenceOf { element, delimiter } => {
            let mut proj = Projection::new(reader);
            let mut items = Vec::new();
            loop {
                let mut attempt = CompositeValue::new(position.clone());
                let mut probe = Projection::new(&mut proj);
                if exec(element, &mut probe, &mut attempt, fields, ctx, position).is_err() {
                    break;
                }
                probe.commit();
                items.push(Value::Composite(attempt));
                let mut sep_probe = Projection::new(&mut proj);
                let tok = sep_probe.pop();
                if tok.is(delimiter) {
                    sep_probe.commit();
                } else {
                    break;
                }
            }
            if items.is_empty() {
                return Err(Error::Syntax {
                    position: position.clone(),
                    message: "expected at least one element".to_string(),
                });
            }
            proj.commit();
            // SequenceOf is itself the value of the field; store it under a
            // synthetic key so a referencing TypeReference bubbles it up
            // unwrapped (see the single-field unwrap rule above).
            out.fields.insert(String::new(), Value::List(items));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Scanner, ScannerOptions};

    fn toks(s: &str) -> Vec<crate::token::Token> {
        let mut sc = Scanner::new("t", s, ScannerOptions::default());
        let mut out = Vec::new();
        loop {
            let t = sc.pop();
            if t.is_eof() {
                break;
            }
            out.push(t);
        }
        out
    }

    #[test]
    fn folds_left_recursive_sequence_of() {
        let tokens = toks(r#"VarType | VarTypes "," VarType"#);
        let pattern = compile_field("VarTypes", &tokens).unwrap();
        assert!(matches!(pattern, Pattern::SequenceOf { .. }));
    }

    #[test]
    fn sequence_of_matches_one_two_three_elements() {
        let pattern = Pattern::SequenceOf {
            element: Box::new(Pattern::TypeReference {
                name: "VarType".into(),
                label: None,
            }),
            delimiter: ",".into(),
        };
        for input in ["a", "a,b", "a,b,c"] {
            let mut sc = Scanner::new("t", input, ScannerOptions::default());
            let ctx = CompileContext::new();
            let mut out = CompositeValue::new(Position::eof("t"));
            exec(&pattern, &mut sc, &mut out, &no_fields(), &ctx, &Position::eof("t")).unwrap();
        }
    }
}
