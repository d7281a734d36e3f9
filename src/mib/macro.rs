use super::pattern::{self, Pattern};
use super::Error;
use crate::token::{Position, Reader, Token, TokenList};
use std::collections::HashMap;

/// A user-defined `MACRO ::= BEGIN ... END` body: a bag of named field
/// grammars (`TYPE NOTATION`, `VALUE NOTATION`, and any helper productions
/// the macro author introduced) captured verbatim at read time and turned
/// into executable [`Pattern`]s once the whole module has been read.
#[derive(Debug, Clone)]
pub struct MacroDefinition {
    pub source: Position,
    pub name: String,
    fields: HashMap<String, TokenList>,
    compiled: Option<HashMap<String, Pattern>>,
    pub value_notation: Option<Pattern>,
}

impl MacroDefinition {
    pub fn new(source: Position, name: String, fields: HashMap<String, TokenList>) -> Self {
        Self {
            source,
            name,
            fields,
            compiled: None,
            value_notation: None,
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Compile every field's raw token run into a [`Pattern`]. Idempotent;
    /// returns `Ok(true)` only the first time it actually compiles.
    pub fn compile(&mut self) -> Result<bool, Error> {
        if self.compiled.is_some() {
            return Ok(false);
        }
        let mut compiled = HashMap::new();
        for (name, tokens) in &self.fields {
            let pattern = pattern::compile_field(name, tokens.remaining())?;
            compiled.insert(name.clone(), pattern);
        }
        self.value_notation = compiled.get("VALUE NOTATION").cloned();
        self.compiled = Some(compiled);
        Ok(true)
    }

    pub fn field_pattern(&self, name: &str) -> Option<&Pattern> {
        self.compiled.as_ref()?.get(name)
    }

    pub fn compiled_fields(&self) -> Option<&HashMap<String, Pattern>> {
        self.compiled.as_ref()
    }
}

/// Read a `BEGIN ... END` macro body into its named field definitions, each
/// of the form `<FieldName> ::= <tokens up to the next field>`.
pub fn read_body<R: Reader>(reader: &mut R) -> Result<HashMap<String, TokenList>, Error> {
    crate::token::read_expected(reader, &["BEGIN"])?;
    let mut body = crate::token::read_until(reader, "END");
    crate::token::read_expected(reader, &["END"])?;

    let mut fields = HashMap::new();
    loop {
        if body.is_empty() {
            break;
        }
        let name_tok = body.pop();
        crate::token::read_expected(&mut body, &["::="])?;
        let mut collected: Vec<Token> = Vec::new();
        loop {
            if body.is_empty() {
                break;
            }
            let t0 = body.lookahead(0);
            let t1 = body.lookahead(1);
            if t0.kind == crate::token::TokenKind::Ident && t1.is("::=") {
                break;
            }
            collected.push(body.pop());
        }
        fields.insert(
            name_tok.text.clone(),
            TokenList::new(reader.source_name().to_string(), collected),
        );
    }
    Ok(fields)
}
