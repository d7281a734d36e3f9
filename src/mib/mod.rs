//! Module reader and type/value compiler for the SMIv1/SMIv2 subset of ASN.1
//! used by SNMP MIBs.

mod builtin;
mod r#macro;
mod module;
mod object;
mod oid_tree;
pub mod pattern;
mod value;

pub use module::{Exports, Module};
pub use object::Object;
pub use oid_tree::OidTree;
pub use pattern::Pattern;
pub use r#macro::MacroDefinition;
pub use value::{CompositeValue, GoValue, Value, ValueList};

use crate::token::Position;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Maximum nesting depth allowed while executing a [`Pattern`] against a
/// token stream, guarding against cyclic macro references.
pub const MAX_PATTERN_DEPTH: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Token(#[from] crate::token::Error),

    #[error("{position}: syntax error: {message}")]
    Syntax { position: Position, message: String },

    #[error("{position}: structural error: {message}")]
    Structural { position: Position, message: String },

    #[error("{position}: {what} is not implemented yet")]
    Unimplemented {
        position: Position,
        what: String,
        #[source]
        cause: Option<Box<Error>>,
    },

    #[error("{position}: unknown symbol {name:?}")]
    Lookup { position: Position, name: String },

    #[error("{position}: pattern recursion exceeded {limit}")]
    Depth { position: Position, limit: u32 },
}

impl Error {
    pub fn position(&self) -> Option<&Position> {
        match self {
            Error::Token(e) => Some(e.position()),
            Error::Syntax { position, .. }
            | Error::Structural { position, .. }
            | Error::Unimplemented { position, .. }
            | Error::Lookup { position, .. }
            | Error::Depth { position, .. } => Some(position),
        }
    }

    pub fn unimplemented(position: Position, what: impl Into<String>) -> Self {
        Error::Unimplemented {
            position,
            what: what.into(),
            cause: None,
        }
    }
}

/// An aggregate of independent compile failures, produced when the
/// fixed-point loops in [`Database::create_index`] make no further progress.
#[derive(Debug, thiserror::Error)]
#[error("{} error(s) while compiling:\n{}", .0.len(), render_list(.0))]
pub struct ErrorList(pub Vec<Error>);

fn render_list(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Threaded through compile and decode to support cooperative cancellation
/// and the recursion-depth guard described for pattern execution.
#[derive(Default)]
pub struct CompileContext {
    cancelled: AtomicBool,
    depth: Cell<u32>,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn enter(&self, position: &Position) -> Result<DepthGuard<'_>, Error> {
        let d = self.depth.get();
        if d >= MAX_PATTERN_DEPTH {
            return Err(Error::Depth {
                position: position.clone(),
                limit: MAX_PATTERN_DEPTH,
            });
        }
        self.depth.set(d + 1);
        Ok(DepthGuard { ctx: self })
    }
}

pub(crate) struct DepthGuard<'a> {
    ctx: &'a CompileContext,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.ctx.depth.set(self.ctx.depth.get() - 1);
    }
}

/// A named value, macro, or type header parsed in a module body. Variants
/// correspond to the cases the module reader can distinguish *without*
/// resolving references (see [`module::read_body`]).
#[derive(Debug, Clone)]
pub enum Definition {
    TypeReference(Rc<RefCell<TypeReference>>),
    SimpleType(Rc<RefCell<SimpleType>>),
    MacroDefinition(Rc<RefCell<MacroDefinition>>),
    Object(Rc<RefCell<Object>>),
    ConstantValue(Rc<RefCell<Value>>),
    CompositeValue(Rc<RefCell<CompositeValue>>),
}

impl Definition {
    pub fn source(&self) -> Position {
        match self {
            Definition::TypeReference(d) => d.borrow().source.clone(),
            Definition::SimpleType(d) => d.borrow().source.clone(),
            Definition::MacroDefinition(d) => d.borrow().source.clone(),
            Definition::Object(d) => d.borrow().source.clone(),
            Definition::ConstantValue(d) => d.borrow().source.clone(),
            Definition::CompositeValue(d) => d.borrow().source.clone(),
        }
    }

    pub fn as_object(&self) -> Option<Rc<RefCell<Object>>> {
        match self {
            Definition::Object(o) => Some(o.clone()),
            _ => None,
        }
    }

    pub fn as_macro(&self) -> Option<Rc<RefCell<MacroDefinition>>> {
        match self {
            Definition::MacroDefinition(m) => Some(m.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeReference {
    pub source: Position,
    pub name: String,
    pub target_module: Option<String>,
    pub sequence_of: bool,
    pub constraint: Option<crate::token::TokenList>,
}

#[derive(Debug, Clone)]
pub struct SimpleType {
    pub source: Position,
    pub ident: String,
    pub implicit: Option<bool>,
    pub tag: Option<(i64, i64)>,
    pub constraint: Option<crate::token::TokenList>,
}

pub(crate) const SIMPLE_TYPE_NAMES: &[&str] = &[
    "INTEGER",
    "OCTET STRING",
    "SEQUENCE",
    "SEQUENCE OF",
    "SET",
    "SET OF",
    "CHOICE",
    "OBJECT IDENTIFIER",
    "IA5String",
    "DisplayString",
    "Counter32",
    "Counter64",
    "Gauge32",
    "TimeTicks",
    "IpAddress",
    "Opaque",
    "NetworkAddress",
    "PhysAddress",
    "BITS",
    "NULL",
];

/// A loaded collection of modules, their cross-module imports resolved and
/// their values compiled into a queryable OID tree.
pub struct Database {
    modules: HashMap<String, Rc<RefCell<Module>>>,
    order: Vec<String>,
    root: OidTree,
    indexed: bool,
}

impl Database {
    pub fn new() -> Self {
        let mut db = Self {
            modules: HashMap::new(),
            order: Vec::new(),
            root: OidTree::new(),
            indexed: false,
        };
        builtin::install(&mut db);
        db
    }

    fn insert_module(&mut self, module: Module) {
        let name = module.name.clone();
        if !self.modules.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.modules.insert(name, Rc::new(RefCell::new(module)));
    }

    pub fn add_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Syntax {
            position: Position::eof(path.to_string_lossy().to_string()),
            message: e.to_string(),
        })?;
        let name = path
            .to_string_lossy()
            .to_string();
        let module = module::read_module(&name, &text)?;
        self.insert_module(module);
        self.indexed = false;
        Ok(())
    }

    pub fn add_directory(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let entries = std::fs::read_dir(path).map_err(|e| Error::Syntax {
            position: Position::eof(path.to_string_lossy().to_string()),
            message: e.to_string(),
        })?;
        let mut files: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("mib"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        for f in files {
            self.add_file(f)?;
        }
        Ok(())
    }

    /// Add an in-memory module, primarily for tests.
    pub fn add_source(&mut self, name: &str, text: &str) -> Result<(), Error> {
        let module = module::read_module(name, text)?;
        self.insert_module(module);
        self.indexed = false;
        Ok(())
    }

    /// Resolve imports, compile every value, and build the OID tree.
    /// Runs a fixed-point loop: each pass attempts every unresolved
    /// definition, stopping when a pass makes no progress.
    pub fn create_index(&mut self, ctx: &CompileContext) -> Result<(), ErrorList> {
        let names: Vec<String> = self.order.clone();

        let mut last_errors: Vec<Error> = Vec::new();
        loop {
            if ctx.is_cancelled() {
                return Err(ErrorList(vec![Error::Syntax {
                    position: Position::eof("<cancelled>"),
                    message: "compile cancelled".to_string(),
                }]));
            }
            let mut progressed = false;
            let mut errors = Vec::new();
            for name in &names {
                let module = self.modules.get(name).unwrap().clone();
                match module::compile_pass(&module, self, ctx) {
                    Ok(made_progress) => progressed |= made_progress,
                    Err(e) => errors.push(e),
                }
            }
            if errors.is_empty() {
                break;
            }
            if !progressed {
                return Err(ErrorList(errors));
            }
            last_errors = errors;
        }
        let _ = last_errors;

        self.root = OidTree::new();
        for name in &names {
            let module = self.modules.get(name).unwrap().borrow();
            for def in module.definitions.values() {
                if let Some(obj) = def.as_object() {
                    let arcs = obj.borrow().arcs.clone();
                    if let Some(arcs) = arcs {
                        self.root.insert(&arcs, obj.clone());
                    }
                }
            }
        }
        self.indexed = true;
        Ok(())
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn find_oid(&self, oid: &[u32]) -> (Option<Rc<RefCell<Object>>>, Vec<u32>) {
        self.root.find(oid)
    }

    /// Look up `symbol`, which may be a bare name (scanned across every
    /// loaded module in registration order) or a `<Module>.<name>` qualified
    /// form naming one module directly.
    pub fn lookup_name(&self, symbol: &str) -> Option<Definition> {
        if let Some((module_name, name)) = symbol.split_once('.') {
            return self
                .modules
                .get(module_name)?
                .borrow()
                .definitions
                .get(name)
                .cloned();
        }
        for name in &self.order {
            if let Some(module) = self.modules.get(name) {
                if let Some(def) = module.borrow().definitions.get(symbol) {
                    return Some(def.clone());
                }
            }
        }
        None
    }

    /// Resolve `symbol` the way `module_name` itself would see it: its own
    /// definitions first, then (if not defined locally) whatever its
    /// IMPORTS clause brought in from another module, falling back to the
    /// plain cross-module scan for symbols every module sees implicitly
    /// (the builtin macros and types) without declaring them imported.
    pub fn lookup_from(&self, module_name: &str, symbol: &str) -> Option<Definition> {
        if let Some(module) = self.modules.get(module_name) {
            let module = module.borrow();
            if let Some(def) = module.definitions.get(symbol) {
                return Some(def.clone());
            }
            if let Some((imported_symbol, from_module)) = module.imports.get(symbol) {
                if let Some(def) = self.lookup_name(&format!("{from_module}.{imported_symbol}")) {
                    return Some(def);
                }
            }
        }
        self.lookup_name(symbol)
    }

    pub fn module(&self, name: &str) -> Option<Rc<RefCell<Module>>> {
        self.modules.get(name).cloned()
    }

    pub(crate) fn modules_iter(&self) -> impl Iterator<Item = &Rc<RefCell<Module>>> {
        self.order.iter().filter_map(|n| self.modules.get(n))
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
