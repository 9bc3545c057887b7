//! Owning scopes: the named containers of variables, statements and functions.
//!
//! A scope answers the identity, naming and containment queries the value
//! and statement nodes need (`get_var`, `handle_name`, ancestor checks) and
//! accepts statements and functions discovered while the graph is built.

use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::expr::ExprKey;
use crate::ids::{ScopeId, StmtId, VarId};
use crate::stmt::StmtParent;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use weft_common::Ident;
use weft_config::resolve_scope;

/// A named scope (module instance).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scope {
    /// Definition name.
    pub name: Ident,
    /// Name of this instance inside its parent.
    pub instance_name: Ident,
    /// The enclosing scope, if any.
    pub parent: Option<ScopeId>,
    /// Child scopes in creation order.
    pub children: Vec<ScopeId>,
    /// Record host-program locations on nodes created in this scope.
    pub debug: bool,
    vars: BTreeMap<Ident, VarId>,
    var_order: Vec<VarId>,
    stmts: Vec<StmtId>,
    functions: BTreeMap<Ident, StmtId>,
    call_vars: Vec<VarId>,
    #[serde(skip)]
    pub(crate) exprs: BTreeMap<ExprKey, VarId>,
}

impl Scope {
    pub(crate) fn new(name: Ident, parent: Option<ScopeId>, debug: bool) -> Self {
        Self {
            name,
            instance_name: name,
            parent,
            children: Vec::new(),
            debug,
            vars: BTreeMap::new(),
            var_order: Vec::new(),
            stmts: Vec::new(),
            functions: BTreeMap::new(),
            call_vars: Vec::new(),
            exprs: BTreeMap::new(),
        }
    }

    /// Looks up a declared variable by name.
    pub fn get_var(&self, name: Ident) -> Option<VarId> {
        self.vars.get(&name).copied()
    }

    /// Declared variables in declaration order.
    pub fn vars(&self) -> &[VarId] {
        &self.var_order
    }

    /// Top-level statements in insertion order.
    pub fn stmts(&self) -> &[StmtId] {
        &self.stmts
    }

    /// Function blocks keyed by function name.
    pub fn functions(&self) -> &BTreeMap<Ident, StmtId> {
        &self.functions
    }

    /// Function calls used as values inside this scope.
    pub fn call_vars(&self) -> &[VarId] {
        &self.call_vars
    }

    pub(crate) fn insert_var(&mut self, name: Ident, var: VarId) {
        self.vars.insert(name, var);
        self.var_order.push(var);
    }

    pub(crate) fn push_stmt(&mut self, stmt: StmtId) {
        self.stmts.push(stmt);
    }

    pub(crate) fn take_stmt(&mut self, stmt: StmtId) -> bool {
        let before = self.stmts.len();
        self.stmts.retain(|&s| s != stmt);
        before != self.stmts.len()
    }
}

impl Context {
    /// Creates a top-level scope.
    pub fn add_scope(&mut self, name: &str) -> IrResult<ScopeId> {
        if name.is_empty() {
            return Err(IrError::user("Scope name cannot be empty"));
        }
        let debug = resolve_scope(self.config(), name).debug;
        let ident = self.intern(name);
        Ok(self.scopes.alloc(Scope::new(ident, None, debug)))
    }

    /// Creates a scope instantiated inside `parent` under `instance_name`.
    pub fn add_child_scope(
        &mut self,
        parent: ScopeId,
        name: &str,
        instance_name: &str,
    ) -> IrResult<ScopeId> {
        if name.is_empty() || instance_name.is_empty() {
            return Err(IrError::user("Scope name cannot be empty"));
        }
        let instance = self.intern(instance_name);
        if self.scopes[parent]
            .children
            .iter()
            .any(|&c| self.scopes[c].instance_name == instance)
        {
            return Err(IrError::user(format!(
                "{instance_name} already exists in {}",
                self.scope_handle_name(parent, false)
            )));
        }
        let debug = resolve_scope(self.config(), name).debug;
        let mut scope = Scope::new(self.intern(name), Some(parent), debug);
        scope.instance_name = instance;
        let id = self.scopes.alloc(scope);
        self.scopes[parent].children.push(id);
        Ok(id)
    }

    /// Turns location recording on or off for `scope`.
    pub fn set_debug(&mut self, scope: ScopeId, debug: bool) {
        self.scopes[scope].debug = debug;
    }

    /// Looks up a variable declared in `scope`.
    pub fn get_var(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        self.lookup(name)
            .and_then(|ident| self.scopes[scope].get_var(ident))
    }

    /// The dotted instance path of `scope`; `ignore_top` drops the root.
    pub fn scope_handle_name(&self, scope: ScopeId, ignore_top: bool) -> String {
        let mut path = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            path.push(self.scopes[id].instance_name);
            current = self.scopes[id].parent;
        }
        if ignore_top {
            path.pop();
        }
        path.iter()
            .rev()
            .map(|&name| self.resolve(name))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The enclosing scope of `scope`.
    pub fn scope_parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope].parent
    }

    /// `true` if `ancestor` encloses `scope` (directly or transitively).
    pub fn is_ancestor(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        let mut current = self.scopes[scope].parent;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.scopes[id].parent;
        }
        false
    }

    /// Appends a statement to `scope`, registering its dependency edges.
    pub fn add_stmt(&mut self, scope: ScopeId, stmt: StmtId) -> IrResult<()> {
        self.attach(stmt, StmtParent::Scope(scope))?;
        self.scopes[scope].push_stmt(stmt);
        Ok(())
    }

    /// Detaches a top-level statement from `scope`. Dependency edges are kept;
    /// use [`Context::unassign`] to drop them as well.
    pub fn remove_stmt(&mut self, scope: ScopeId, stmt: StmtId) -> IrResult<()> {
        if !self.scopes[scope].take_stmt(stmt) {
            return Err(IrError::stmt(
                format!(
                    "statement does not belong to {}",
                    self.scope_handle_name(scope, false)
                ),
                vec![stmt],
            ));
        }
        self.stmts[stmt].parent = None;
        Ok(())
    }

    /// Registers a function block with `scope`.
    pub fn add_function(&mut self, scope: ScopeId, func: StmtId) -> IrResult<()> {
        let name = self.function_def(func)?.name;
        match self.scopes[scope].functions.get(&name).copied() {
            Some(existing) if existing != func => Err(IrError::user(format!(
                "Function {} already exists in {}",
                self.resolve(name),
                self.scope_handle_name(scope, false)
            ))),
            _ => {
                debug!(
                    "registering function {} with {}",
                    self.resolve(name),
                    self.scope_handle_name(scope, false)
                );
                self.scopes[scope].functions.insert(name, func);
                Ok(())
            }
        }
    }

    /// `true` if `scope` has a function called `name`.
    pub fn has_function(&self, scope: ScopeId, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|ident| self.scopes[scope].functions.contains_key(&ident))
    }

    /// Registers a function-call value with `scope`.
    pub fn add_call_var(&mut self, scope: ScopeId, var: VarId) {
        let calls = &mut self.scopes[scope].call_vars;
        if !calls.contains(&var) {
            calls.push(var);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarDecl;

    #[test]
    fn handle_name_follows_instance_path() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let child = ctx.add_child_scope(top, "adder", "u_add").unwrap();
        let leaf = ctx.add_child_scope(child, "fa", "u_fa0").unwrap();
        assert_eq!(ctx.scope_handle_name(leaf, false), "top.u_add.u_fa0");
        assert_eq!(ctx.scope_handle_name(leaf, true), "u_add.u_fa0");
        assert_eq!(ctx.scope_handle_name(top, true), "");
        assert_eq!(ctx.scope_handle_name(ctx.const_scope(), false), "");
    }

    #[test]
    fn ancestors() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let child = ctx.add_child_scope(top, "mid", "mid").unwrap();
        let leaf = ctx.add_child_scope(child, "leaf", "leaf").unwrap();
        assert!(ctx.is_ancestor(top, leaf));
        assert!(ctx.is_ancestor(child, leaf));
        assert!(!ctx.is_ancestor(leaf, top));
        assert!(!ctx.is_ancestor(top, top));
        assert_eq!(ctx.scope_parent(leaf), Some(child));
    }

    #[test]
    fn duplicate_instance_rejected() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        ctx.add_child_scope(top, "mid", "u0").unwrap();
        assert!(ctx.add_child_scope(top, "mid", "u0").is_err());
    }

    #[test]
    fn get_var_by_name() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        assert_eq!(ctx.get_var(top, "a"), Some(a));
        assert_eq!(ctx.get_var(top, "missing"), None);
        assert_eq!(ctx.scope(top).vars(), &[a]);
    }

    #[test]
    fn add_and_remove_stmt() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let stmt = ctx.assign(a, b, crate::stmt::AssignmentType::Undefined).unwrap();
        ctx.add_stmt(top, stmt).unwrap();
        assert_eq!(ctx.scope(top).stmts(), &[stmt]);
        assert_eq!(ctx.stmt_scope(stmt), Some(top));
        ctx.remove_stmt(top, stmt).unwrap();
        assert!(ctx.scope(top).stmts().is_empty());
        assert!(ctx.remove_stmt(top, stmt).is_err());
    }
}
