//! The construction context that owns every IR node.

use crate::arena::Arena;
use crate::constant::{ConstKey, EnumDef};
use crate::error::{IrError, IrResult};
use crate::ids::{EnumId, ScopeId, StmtId, StructId, VarId};
use crate::keywords::is_sv_keyword;
use crate::scope::Scope;
use crate::stmt::Stmt;
use crate::var::{StructDef, Var};
use std::collections::BTreeMap;
use weft_common::{Ident, Interner, SourceLoc};
use weft_config::IrConfig;

/// Owns the node arenas, the name interner, and the free-standing constant
/// scope with its constant pool.
///
/// Every IR operation is a method on `Context`; nodes refer to each other by
/// ID. Mutation requires `&mut Context`, so construction is single-threaded
/// by construction.
#[derive(Debug)]
pub struct Context {
    interner: Interner,
    pub(crate) vars: Arena<VarId, Var>,
    pub(crate) stmts: Arena<StmtId, Stmt>,
    pub(crate) scopes: Arena<ScopeId, Scope>,
    pub(crate) enums: Arena<EnumId, EnumDef>,
    pub(crate) structs: Arena<StructId, StructDef>,
    pub(crate) const_pool: BTreeMap<ConstKey, VarId>,
    const_scope: ScopeId,
    config: IrConfig,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a context with default settings.
    pub fn new() -> Self {
        Self::with_config(IrConfig::default())
    }

    /// Creates a context that applies `config` to every scope it creates.
    pub fn with_config(config: IrConfig) -> Self {
        let interner = Interner::new();
        let mut scopes = Arena::new();
        let const_scope = scopes.alloc(Scope::new(interner.empty(), None, config.ir.debug));
        Self {
            interner,
            vars: Arena::new(),
            stmts: Arena::new(),
            scopes,
            enums: Arena::new(),
            structs: Arena::new(),
            const_pool: BTreeMap::new(),
            const_scope,
            config,
        }
    }

    /// The settings this context was created with.
    pub fn config(&self) -> &IrConfig {
        &self.config
    }

    /// The scope that owns free-standing constants.
    pub fn const_scope(&self) -> ScopeId {
        self.const_scope
    }

    /// Interns `name`.
    pub fn intern(&self, name: &str) -> Ident {
        self.interner.get_or_intern(name)
    }

    /// Resolves an interned name.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.interner.resolve(ident)
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Ident> {
        self.interner.get(name)
    }

    pub(crate) fn empty_name(&self) -> Ident {
        self.interner.empty()
    }

    /// Returns a value node.
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id]
    }

    /// Returns a statement.
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    /// Returns a scope.
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id]
    }

    /// Returns an enum definition.
    pub fn enum_def(&self, id: EnumId) -> &EnumDef {
        &self.enums[id]
    }

    /// Returns a packed struct definition.
    pub fn struct_def(&self, id: StructId) -> &StructDef {
        &self.structs[id]
    }

    /// The local name of a value; empty for anonymous nodes.
    pub fn name(&self, var: VarId) -> &str {
        self.resolve(self.vars[var].name)
    }

    /// Total width of a value.
    pub fn width(&self, var: VarId) -> u32 {
        self.vars[var].width()
    }

    /// Number of value nodes allocated so far.
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// The location of the caller when `scope` is in debug mode.
    #[track_caller]
    pub(crate) fn caller_loc(&self, scope: ScopeId) -> Option<SourceLoc> {
        if self.scopes[scope].debug {
            Some(SourceLoc::caller())
        } else {
            None
        }
    }

    /// Rejects names that are empty, SystemVerilog keywords or reserved.
    pub(crate) fn check_identifier(&self, kind: &str, name: &str) -> IrResult<()> {
        if name.is_empty() {
            return Err(IrError::user(format!("{kind} name cannot be empty")));
        }
        if self.config.ir.check_keywords && is_sv_keyword(name) {
            return Err(IrError::user(format!("{name} is a SystemVerilog keyword")));
        }
        if self.config.ir.reserved_names.iter().any(|r| r == name) {
            return Err(IrError::user(format!("{name} is a reserved name")));
        }
        Ok(())
    }

    /// Validates a new variable name against the keyword list, the configured
    /// reserved names, and the names already declared in `scope`.
    pub(crate) fn check_new_name(&self, scope: ScopeId, name: &str) -> IrResult<Ident> {
        self.check_identifier("Variable", name)?;
        let ident = self.intern(name);
        if self.scopes[scope].get_var(ident).is_some() {
            return Err(IrError::user(format!(
                "{name} already exists in {}",
                self.scope_handle_name(scope, false)
            )));
        }
        Ok(ident)
    }
}
