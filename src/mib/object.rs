use super::value::CompositeValue;
use super::{CompileContext, Database, Error};
use crate::token::{Position, Reader, TokenList};

/// One element of an OID arc list as written in source (`{ mib-2 1 }`,
/// `{ enterprises 9999 myMib(1) }`).
#[derive(Debug, Clone)]
pub enum ArcElement {
    /// A bare integer arc.
    Number(u32),
    /// A symbolic reference to another `OBJECT IDENTIFIER` value; only
    /// meaningful as the first element, where it names this OID's parent.
    Reference(String),
    /// A `name(number)` labeled arc: the name is documentation only, the
    /// number is what gets encoded.
    Labeled(String, u32),
}

/// A compiled or pending `OBJECT IDENTIFIER` value, optionally carrying the
/// composite metadata bound by a governing macro invocation (e.g. the
/// `SYNTAX`/`DESCRIPTION`/... fields of an `OBJECT-TYPE`).
#[derive(Debug)]
pub struct Object {
    pub source: Position,
    pub name: String,
    /// Name of the module this object was defined in, used to resolve
    /// symbolic references the way the defining module would see them
    /// (its own definitions first, then its IMPORTS clause).
    pub module: String,
    pub elements: Vec<ArcElement>,
    pub arcs: Option<Vec<u32>>,
    /// The macro invocation governing this object (`OBJECT-TYPE`, …) and
    /// its unresolved metadata token run, set at read time.
    pub meta: Option<PendingMeta>,
    pub metadata: std::sync::OnceLock<crate::metric::MetricMeta>,
}

#[derive(Debug, Clone)]
pub struct PendingMeta {
    pub macro_name: String,
    pub tokens: TokenList,
    pub resolved: Option<CompositeValue>,
}

impl Object {
    pub fn new(source: Position, name: String, module: String, elements: Vec<ArcElement>) -> Self {
        Self {
            source,
            name,
            module,
            elements,
            arcs: None,
            meta: None,
            metadata: std::sync::OnceLock::new(),
        }
    }

    /// Attempt to reduce `elements` to integer arcs. Returns `Ok(true)` if
    /// this call completed the reduction, `Ok(false)` if it's still blocked
    /// on another object that hasn't been reduced yet (retry next pass).
    pub fn compile_arcs(&mut self, db: &Database) -> Result<bool, Error> {
        if self.arcs.is_some() {
            return Ok(false);
        }
        let mut arcs = Vec::new();
        for (i, el) in self.elements.iter().enumerate() {
            match el {
                ArcElement::Number(n) => arcs.push(*n),
                ArcElement::Labeled(_, n) => arcs.push(*n),
                ArcElement::Reference(name) => {
                    if i != 0 {
                        return Err(Error::Structural {
                            position: self.source.clone(),
                            message: format!(
                                "symbolic OID element {name:?} only allowed as the first element"
                            ),
                        });
                    }
                    let def = db.lookup_from(&self.module, name).ok_or_else(|| Error::Lookup {
                        position: self.source.clone(),
                        name: name.clone(),
                    })?;
                    let parent = def.as_object().ok_or_else(|| Error::Structural {
                        position: self.source.clone(),
                        message: format!("{name:?} does not name an OBJECT IDENTIFIER value"),
                    })?;
                    let parent_arcs = parent.borrow().arcs.clone();
                    match parent_arcs {
                        Some(parent_arcs) => arcs.extend(parent_arcs),
                        None => return Ok(false),
                    }
                }
            }
        }
        self.arcs = Some(arcs);
        Ok(true)
    }

    /// Attempt to parse this object's pending macro invocation metadata
    /// using the now-compiled `Pattern`s of its governing macro. Returns
    /// `Ok(true)` on progress, `Ok(false)` if the macro itself isn't
    /// compiled yet.
    pub fn compile_meta(&mut self, db: &Database, ctx: &CompileContext) -> Result<bool, Error> {
        let Some(meta) = &mut self.meta else {
            return Ok(false);
        };
        if meta.resolved.is_some() {
            return Ok(false);
        }
        let Some(def) = db.lookup_from(&self.module, &meta.macro_name) else {
            return Err(Error::Lookup {
                position: self.source.clone(),
                name: meta.macro_name.clone(),
            });
        };
        let Some(macro_def) = def.as_macro() else {
            return Err(Error::Structural {
                position: self.source.clone(),
                message: format!("{:?} does not name a MACRO", meta.macro_name),
            });
        };
        let macro_def = macro_def.borrow();
        let Some(type_pattern) = macro_def.field_pattern("TYPE NOTATION").cloned() else {
            return Ok(false);
        };
        let Some(sibling_fields) = macro_def.compiled_fields().cloned() else {
            return Ok(false);
        };
        let mut composite = CompositeValue::new(self.source.clone());
        let mut reader = meta.tokens.clone_reader();
        super::pattern::exec(
            &type_pattern,
            &mut reader,
            &mut composite,
            &sibling_fields,
            ctx,
            &self.source,
        )?;
        meta.resolved = Some(composite);
        Ok(true)
    }
}

/// Read the arc-element list of `{ ... }` bracketed OID value body.
pub fn read_elements<R: Reader>(reader: &mut R) -> Result<Vec<ArcElement>, Error> {
    let body = crate::token::read_block(reader, "{", "}")?;
    let mut list = body;
    let mut out = Vec::new();
    loop {
        let tok = list.lookahead(0);
        if tok.is_eof() {
            break;
        }
        if tok.kind == crate::token::TokenKind::Number {
            list.pop();
            out.push(ArcElement::Number(tok.text.parse().map_err(|_| Error::Syntax {
                position: tok.position.clone(),
                message: format!("invalid OID arc {:?}", tok.text),
            })?));
            continue;
        }
        if tok.kind == crate::token::TokenKind::Ident {
            list.pop();
            if list.lookahead(0).is("(") {
                let inner = crate::token::read_block(&mut list, "(", ")")?;
                let n: u32 = inner
                    .remaining()
                    .first()
                    .and_then(|t| t.text.parse().ok())
                    .ok_or_else(|| Error::Syntax {
                        position: tok.position.clone(),
                        message: format!("expected a number in {}( )", tok.text),
                    })?;
                out.push(ArcElement::Labeled(tok.text.clone(), n));
            } else {
                out.push(ArcElement::Reference(tok.text.clone()));
            }
            continue;
        }
        return Err(Error::Syntax {
            position: tok.position.clone(),
            message: format!("unexpected token {:?} in OID value", tok.text),
        });
    }
    Ok(out)
}
