//! Function blocks, DPI imports and calls.

use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::ids::{ScopeId, StmtId, VarId};
use crate::keywords::is_sv_keyword;
use crate::stmt::{BlockKind, StmtBlock, StmtKind, StmtParent};
use crate::var::{PortDirection, Var, VarKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use weft_common::Ident;

/// Signature and bookkeeping of a function block.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Function name.
    pub name: Ident,
    /// The scope that defines the function.
    pub scope: ScopeId,
    /// Ports keyed by name.
    pub ports: BTreeMap<Ident, VarId>,
    /// The value holding the return value, if the function returns one.
    pub handler: Option<VarId>,
    /// Explicit argument order for call rendering.
    pub ordering: BTreeMap<Ident, u32>,
    /// Imported through DPI rather than defined in the design.
    pub dpi: bool,
    /// Return width of a DPI import; 0 for none.
    pub return_width: u32,
}

impl Context {
    /// Defines a function in `scope`.
    #[track_caller]
    pub fn function(&mut self, scope: ScopeId, name: &str) -> IrResult<StmtId> {
        self.new_function(scope, name, false, 0)
    }

    /// Declares a DPI import in `scope`; `return_width` 0 means no return value.
    #[track_caller]
    pub fn dpi_function(
        &mut self,
        scope: ScopeId,
        name: &str,
        return_width: u32,
    ) -> IrResult<StmtId> {
        self.new_function(scope, name, true, return_width)
    }

    #[track_caller]
    fn new_function(
        &mut self,
        scope: ScopeId,
        name: &str,
        dpi: bool,
        return_width: u32,
    ) -> IrResult<StmtId> {
        if self.has_function(scope, name) {
            return Err(IrError::user(format!(
                "Function {name} already exists in {}",
                self.scope_handle_name(scope, false)
            )));
        }
        let def = FunctionDef {
            name: self.intern(name),
            scope,
            ports: BTreeMap::new(),
            handler: None,
            ordering: BTreeMap::new(),
            dpi,
            return_width,
        };
        let func = self.alloc_stmt(
            StmtKind::Block(StmtBlock {
                kind: BlockKind::Function(Box::new(def)),
                stmts: Vec::new(),
            }),
            scope,
        );
        self.stmts[func].parent = Some(StmtParent::Scope(scope));
        self.add_function(scope, func)?;
        Ok(func)
    }

    /// The definition behind a function block.
    pub fn function_def(&self, func: StmtId) -> IrResult<&FunctionDef> {
        match &self.stmts[func].kind {
            StmtKind::Block(StmtBlock {
                kind: BlockKind::Function(def),
                ..
            }) => Ok(def),
            _ => Err(IrError::stmt("statement is not a function", vec![func])),
        }
    }

    fn function_def_mut(&mut self, func: StmtId) -> IrResult<&mut FunctionDef> {
        match &mut self.stmts[func].kind {
            StmtKind::Block(StmtBlock {
                kind: BlockKind::Function(def),
                ..
            }) => Ok(def),
            _ => Err(IrError::stmt("statement is not a function", vec![func])),
        }
    }

    /// Adds an input port.
    #[track_caller]
    pub fn function_input(
        &mut self,
        func: StmtId,
        name: &str,
        width: u32,
        signed: bool,
    ) -> IrResult<VarId> {
        self.function_port(func, name, width, signed, PortDirection::In)
    }

    /// Adds an output port to a DPI import.
    #[track_caller]
    pub fn dpi_output(
        &mut self,
        func: StmtId,
        name: &str,
        width: u32,
        signed: bool,
    ) -> IrResult<VarId> {
        if !self.function_def(func)?.dpi {
            return Err(IrError::stmt(
                "Only DPI functions can have output ports",
                vec![func],
            ));
        }
        self.function_port(func, name, width, signed, PortDirection::Out)
    }

    #[track_caller]
    fn function_port(
        &mut self,
        func: StmtId,
        name: &str,
        width: u32,
        signed: bool,
        direction: PortDirection,
    ) -> IrResult<VarId> {
        let def = self.function_def(func)?;
        let scope = def.scope;
        if width == 0 {
            return Err(IrError::user(format!("{name} cannot have zero width")));
        }
        if self.config().ir.check_keywords && is_sv_keyword(name) {
            return Err(IrError::user(format!("{name} is a SystemVerilog keyword")));
        }
        let ident = self.intern(name);
        if def.ports.contains_key(&ident) {
            return Err(IrError::user(format!(
                "{name} already exists in function {}",
                self.resolve(def.name)
            )));
        }
        let mut port = Var::new(ident, scope, width, vec![1], signed, VarKind::Port { direction });
        port.locs.extend(self.caller_loc(scope));
        let id = self.vars.alloc(port);
        self.function_def_mut(func)?.ports.insert(ident, id);
        Ok(id)
    }

    /// Creates the value that carries the function's return value.
    #[track_caller]
    pub fn create_function_handler(
        &mut self,
        func: StmtId,
        width: u32,
        signed: bool,
    ) -> IrResult<VarId> {
        let def = self.function_def(func)?;
        if def.handler.is_some() {
            return Err(IrError::stmt(
                format!("{} already has a return value", self.resolve(def.name)),
                vec![func],
            ));
        }
        let (name, scope) = (def.name, def.scope);
        let mut handler = Var::new(name, scope, width, vec![1], signed, VarKind::Base);
        handler.locs.extend(self.caller_loc(scope));
        let id = self.vars.alloc(handler);
        self.function_def_mut(func)?.handler = Some(id);
        Ok(id)
    }

    /// `return value` inside `func`; append it with [`Context::block_add_stmt`].
    #[track_caller]
    pub fn return_stmt(&mut self, func: StmtId, value: VarId) -> IrResult<StmtId> {
        let def = self.function_def(func)?;
        let Some(handler) = def.handler else {
            return Err(IrError::stmt(
                format!("{} doesn't have return value", self.resolve(def.name)),
                vec![func],
            ));
        };
        let scope = def.scope;
        if self.width(handler) != self.width(value) {
            return Err(IrError::var(
                format!(
                    "Return value {} width ({}) doesn't match with {} width ({})",
                    self.to_string(value),
                    self.width(value),
                    self.resolve(def.name),
                    self.width(handler)
                ),
                vec![value, handler],
            ));
        }
        Ok(self.alloc_stmt(StmtKind::Return { func, value }, scope))
    }

    /// Fixes the order in which call arguments are rendered.
    pub fn set_port_ordering(&mut self, func: StmtId, ordering: &[(&str, u32)]) -> IrResult<()> {
        let def = self.function_def(func)?;
        let mut resolved = BTreeMap::new();
        for &(name, index) in ordering {
            match self.lookup(name).filter(|ident| def.ports.contains_key(ident)) {
                Some(ident) => {
                    resolved.insert(ident, index);
                }
                None => {
                    return Err(IrError::user(format!(
                        "{name} is not a port of {}",
                        self.resolve(def.name)
                    )))
                }
            }
        }
        self.function_def_mut(func)?.ordering = resolved;
        Ok(())
    }

    /// A call of `func` used as a value inside `scope`.
    #[track_caller]
    pub fn call_var(
        &mut self,
        scope: ScopeId,
        func: StmtId,
        args: &[(&str, VarId)],
    ) -> IrResult<VarId> {
        let args = self.call_args(args);
        self.build_call(scope, func, args, true)
    }

    /// A call of `func` whose result is discarded.
    #[track_caller]
    pub fn call_stmt(
        &mut self,
        scope: ScopeId,
        func: StmtId,
        args: &[(&str, VarId)],
    ) -> IrResult<StmtId> {
        let args = self.call_args(args);
        let var = self.build_call(scope, func, args, false)?;
        Ok(self.alloc_stmt(StmtKind::FunctionCall { func, var }, scope))
    }

    fn call_args(&self, args: &[(&str, VarId)]) -> BTreeMap<Ident, VarId> {
        args.iter()
            .map(|&(name, var)| (self.intern(name), var))
            .collect()
    }

    #[track_caller]
    pub(crate) fn build_call(
        &mut self,
        scope: ScopeId,
        func: StmtId,
        args: BTreeMap<Ident, VarId>,
        has_return: bool,
    ) -> IrResult<VarId> {
        let def = self.function_def(func)?;
        for (&port_name, &port) in &def.ports {
            let name = self.resolve(port_name);
            let Some(&arg) = args.get(&port_name) else {
                return Err(IrError::var(format!("{name} is not connected"), vec![port]));
            };
            let (p, a) = (&self.vars[port], &self.vars[arg]);
            if p.width() != a.width() {
                return Err(IrError::var(
                    format!("{name}'s width doesn't match"),
                    vec![port, arg],
                ));
            }
            if p.signed != a.signed {
                return Err(IrError::var(
                    format!("{name}'s sign doesn't match"),
                    vec![port, arg],
                ));
            }
        }
        if let Some(extra) = args.keys().find(|name| !def.ports.contains_key(name)) {
            return Err(IrError::user(format!(
                "{} is not a port of {}",
                self.resolve(*extra),
                self.resolve(def.name)
            )));
        }
        let (var_width, size, signed) = match (has_return, def.dpi, def.handler) {
            (false, _, _) => (0, vec![1], false),
            (true, true, _) => (def.return_width, vec![1], false),
            (true, false, Some(handler)) => {
                let h = &self.vars[handler];
                (h.var_width, h.size.clone(), h.signed)
            }
            (true, false, None) => {
                return Err(IrError::stmt(
                    format!("{} doesn't have return value", self.resolve(def.name)),
                    vec![func],
                ));
            }
        };
        debug!(
            "calling {} from {}",
            self.resolve(def.name),
            self.scope_handle_name(scope, false)
        );
        let mut call = Var::new(
            self.empty_name(),
            scope,
            var_width,
            size,
            signed,
            VarKind::FunctionCall { func, args },
        );
        call.locs.extend(self.caller_loc(scope));
        let id = self.vars.alloc(call);
        if scope != self.const_scope() {
            self.add_call_var(scope, id);
        }
        Ok(id)
    }
}
