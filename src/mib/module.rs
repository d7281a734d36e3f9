use super::object::{self, Object, PendingMeta};
use super::r#macro::{self, MacroDefinition};
use super::value::{GoValue, Value};
use super::{CompileContext, Database, Definition, Error, SimpleType, TypeReference, SIMPLE_TYPE_NAMES};
use crate::token::{Position, Reader, Scanner, ScannerOptions, Token, TokenKind};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Exports {
    All,
    Named(HashSet<String>),
}

pub struct Module {
    pub name: String,
    pub imports: HashMap<String, (String, String)>,
    pub exports: Exports,
    pub definitions: HashMap<String, Definition>,
}

impl Module {
    pub fn exported_names(&self) -> Vec<&str> {
        match &self.exports {
            Exports::All => self.definitions.keys().map(String::as_str).collect(),
            Exports::Named(set) => set.iter().map(String::as_str).collect(),
        }
    }
}

/// Parse a full `<ModuleName> DEFINITIONS ::= BEGIN ... END` source file.
pub fn read_module(source_name: &str, text: &str) -> Result<Module, Error> {
    let mut scanner = Scanner::new(source_name, text, ScannerOptions::default());
    let name_tok = scanner.pop();
    if name_tok.is_eof() {
        return Err(Error::Syntax {
            position: name_tok.position,
            message: "empty module source".to_string(),
        });
    }
    // Skip anything between the module name and the defining `::=`
    // (`DEFINITIONS`, tag-default clauses like `EXPLICIT TAGS`, etc).
    crate::token::read_until(&mut scanner, "::=");
    crate::token::read_expected(&mut scanner, &["::=", "BEGIN"])?;

    let mut module = Module {
        name: name_tok.text,
        imports: HashMap::new(),
        exports: Exports::Named(HashSet::new()),
        definitions: HashMap::new(),
    };

    loop {
        let next = scanner.lookahead(0);
        if next.is_eof() || next.is("END") {
            scanner.pop();
            break;
        }
        if next.is("IMPORTS") {
            read_imports(&mut scanner, &mut module)?;
            continue;
        }
        if next.is("EXPORTS") {
            read_exports(&mut scanner, &mut module)?;
            continue;
        }
        read_definition(&mut scanner, &mut module)?;
    }
    Ok(module)
}

fn read_imports(reader: &mut Scanner, module: &mut Module) -> Result<(), Error> {
    reader.pop(); // IMPORTS
    loop {
        let mut symbols = Vec::new();
        loop {
            let tok = reader.pop();
            if tok.is_eof() {
                return Err(Error::Syntax {
                    position: tok.position,
                    message: "unexpected end of input in IMPORTS clause".to_string(),
                });
            }
            symbols.push(tok.text);
            let sep = reader.lookahead(0);
            if sep.is(",") {
                reader.pop();
                continue;
            }
            break;
        }
        crate::token::read_expected(reader, &["FROM"])?;
        let module_name = reader.pop().text;
        for sym in symbols {
            module
                .imports
                .insert(sym.clone(), (sym, module_name.clone()));
        }
        let term = reader.lookahead(0);
        if term.is(";") {
            reader.pop();
            break;
        }
    }
    Ok(())
}

fn read_exports(reader: &mut Scanner, module: &mut Module) -> Result<(), Error> {
    reader.pop(); // EXPORTS
    if reader.lookahead(0).is("ALL") {
        reader.pop();
        module.exports = Exports::All;
        if reader.lookahead(0).is(";") {
            reader.pop();
        }
        return Ok(());
    }
    let mut names = HashSet::new();
    loop {
        let tok = reader.pop();
        if tok.is(";") || tok.is_eof() {
            break;
        }
        if tok.is(",") {
            continue;
        }
        names.insert(tok.text);
    }
    module.exports = Exports::Named(names);
    Ok(())
}

fn read_definition(reader: &mut Scanner, module: &mut Module) -> Result<(), Error> {
    let name_tok = reader.pop();
    let source = name_tok.position.clone();
    let mut meta_tokens: Vec<Token> = Vec::new();
    loop {
        let next = reader.lookahead(0);
        if next.is("::=") || next.is_eof() {
            break;
        }
        meta_tokens.push(reader.pop());
    }
    crate::token::read_expected(reader, &["::="])?;

    let is_macro_decl = meta_tokens.iter().any(|t| t.is("MACRO"));
    if is_macro_decl {
        let fields = r#macro::read_body(reader)?;
        let def = MacroDefinition::new(source, name_tok.text.clone(), fields);
        module.definitions.insert(
            name_tok.text,
            Definition::MacroDefinition(Rc::new(RefCell::new(def))),
        );
        return Ok(());
    }

    let after = reader.lookahead(0);
    if after.is("{") {
        let elements = object::read_elements(reader)?;
        let mut obj = Object::new(source, name_tok.text.clone(), module.name.clone(), elements);
        if let Some((macro_name, rest)) = split_macro_invocation(&meta_tokens) {
            obj.meta = Some(PendingMeta {
                macro_name,
                tokens: crate::token::TokenList::new(reader.source_name().to_string(), rest),
                resolved: None,
            });
        }
        module.definitions.insert(
            name_tok.text,
            Definition::Object(Rc::new(RefCell::new(obj))),
        );
        return Ok(());
    }

    if matches!(after.kind, TokenKind::String | TokenKind::Number) {
        let tok = reader.pop();
        let value = if tok.kind == TokenKind::Number {
            Value::Primitive(GoValue::Int(tok.text.parse().unwrap_or(0)))
        } else {
            Value::Primitive(GoValue::Text(tok.text))
        };
        module.definitions.insert(
            name_tok.text,
            Definition::ConstantValue(Rc::new(RefCell::new(value))),
        );
        return Ok(());
    }

    if after.is("[") || SIMPLE_TYPE_NAMES.iter().any(|n| after.is_ci(n)) {
        let simple = read_simple_type(reader, source)?;
        module.definitions.insert(
            name_tok.text,
            Definition::SimpleType(Rc::new(RefCell::new(simple))),
        );
        return Ok(());
    }

    // Anything else is a TypeReference to another named type, possibly
    // flagged SEQUENCE OF, with an optional trailing constraint block.
    let target = reader.pop();
    let sequence_of = target.is("SEQUENCE OF") || target.is("SET OF");
    let (target_name, constraint) = if sequence_of {
        let referenced = reader.pop();
        (referenced.text, read_optional_constraint(reader)?)
    } else {
        (target.text, read_optional_constraint(reader)?)
    };
    let type_ref = TypeReference {
        source,
        name: target_name,
        target_module: None,
        sequence_of,
        constraint,
    };
    module.definitions.insert(
        name_tok.text,
        Definition::TypeReference(Rc::new(RefCell::new(type_ref))),
    );
    Ok(())
}

fn split_macro_invocation(meta_tokens: &[Token]) -> Option<(String, Vec<Token>)> {
    let (first, rest) = meta_tokens.split_first()?;
    if first.kind != TokenKind::Ident {
        return None;
    }
    Some((first.text.clone(), rest.to_vec()))
}

fn read_simple_type(reader: &mut Scanner, source: Position) -> Result<SimpleType, Error> {
    let (tag, implicit) = if reader.lookahead(0).is("[") {
        let block = crate::token::read_block(reader, "[", "]")?;
        let toks = block.remaining();
        let tag = toks.first().and_then(|t| t.text.parse::<i64>().ok());
        let pair = tag.map(|t| (0i64, t));
        let implicit = if reader.lookahead(0).is("IMPLICIT") {
            reader.pop();
            Some(true)
        } else if reader.lookahead(0).is("EXPLICIT") {
            reader.pop();
            Some(false)
        } else {
            None
        };
        (pair, implicit)
    } else {
        (None, None)
    };
    let ident_tok = reader.pop();
    let constraint = read_optional_constraint(reader)?;
    Ok(SimpleType {
        source,
        ident: ident_tok.text,
        implicit,
        tag,
        constraint,
    })
}

fn read_optional_constraint(reader: &mut Scanner) -> Result<Option<crate::token::TokenList>, Error> {
    let next = reader.lookahead(0);
    if next.is("{") {
        Ok(Some(crate::token::read_block(reader, "{", "}")?))
    } else if next.is("(") {
        Ok(Some(crate::token::read_block(reader, "(", ")")?))
    } else {
        Ok(None)
    }
}

/// Attempt to make progress compiling every unresolved value/macro in
/// `module`. Returns whether any definition advanced this pass.
pub fn compile_pass(
    module: &Rc<RefCell<Module>>,
    db: &Database,
    ctx: &CompileContext,
) -> Result<bool, Error> {
    let defs: Vec<Definition> = module.borrow().definitions.values().cloned().collect();
    let mut progressed = false;
    for def in defs {
        match &def {
            Definition::MacroDefinition(m) => {
                if !m.borrow().is_compiled() {
                    progressed |= m.borrow_mut().compile()?;
                }
            }
            Definition::Object(o) => {
                if o.borrow().arcs.is_none() {
                    progressed |= o.borrow_mut().compile_arcs(db)?;
                }
                let needs_meta = o
                    .borrow()
                    .meta
                    .as_ref()
                    .map(|m| m.resolved.is_none())
                    .unwrap_or(false);
                if needs_meta {
                    progressed |= o.borrow_mut().compile_meta(db, ctx)?;
                }
            }
            _ => {}
        }
    }
    Ok(progressed)
}
