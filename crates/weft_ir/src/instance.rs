//! Module instantiation statements.

use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::ids::{ScopeId, StmtId, VarId};
use crate::stmt::{AssignStmt, StmtKind};
use crate::var::{PortDirection, VarKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Instantiation of `target` inside `parent`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct InstanceStmt {
    /// The instantiated scope.
    pub target: ScopeId,
    /// The instantiating scope.
    pub parent: ScopeId,
    /// Port of `target` to the value it is wired to in `parent`.
    pub port_mapping: BTreeMap<VarId, VarId>,
    /// Port of `target` to the assignment that made the connection.
    pub port_debug: BTreeMap<VarId, StmtId>,
}

impl Context {
    /// Builds the instantiation of `target` in `parent` from the whole-port
    /// connections `parent` has made so far: an input maps to its driver, an
    /// output to its reader.
    #[track_caller]
    pub fn instantiate(&mut self, target: ScopeId, parent: ScopeId) -> IrResult<StmtId> {
        let stmt = self.alloc_stmt(
            StmtKind::ModuleInstantiation(InstanceStmt {
                target,
                parent,
                port_mapping: BTreeMap::new(),
                port_debug: BTreeMap::new(),
            }),
            parent,
        );
        if self.scopes[target].parent != Some(parent) {
            return Err(IrError::stmt(
                format!(
                    "{}'s parent is not {}",
                    self.scope_handle_name(target, false),
                    self.scope_handle_name(parent, false)
                ),
                vec![stmt],
            ));
        }

        let mut port_mapping = BTreeMap::new();
        let mut port_debug = BTreeMap::new();
        for &port in self.scopes[target].vars() {
            let VarKind::Port { direction } = self.vars[port].kind else {
                continue;
            };
            let v = &self.vars[port];
            if matches!(direction, PortDirection::In | PortDirection::InOut) {
                if let Some((driver, by)) = self.find_connection(&v.sources, parent, |a| {
                    (a.left == port).then_some(a.right)
                }) {
                    port_mapping.insert(port, driver);
                    port_debug.insert(port, by);
                }
            }
            if matches!(direction, PortDirection::Out | PortDirection::InOut) {
                if let Some((reader, by)) = self.find_connection(&v.sinks, parent, |a| {
                    (a.right == port).then_some(a.left)
                }) {
                    port_mapping.insert(port, reader);
                    port_debug.insert(port, by);
                }
            }
        }

        if let StmtKind::ModuleInstantiation(inst) = &mut self.stmts[stmt].kind {
            inst.port_mapping = port_mapping;
            inst.port_debug = port_debug;
        }
        Ok(stmt)
    }

    fn find_connection(
        &self,
        edges: &BTreeSet<StmtId>,
        parent: ScopeId,
        other_side: impl Fn(&AssignStmt) -> Option<VarId>,
    ) -> Option<(VarId, StmtId)> {
        edges.iter().find_map(|&s| {
            let assign = self.stmts[s].as_assign()?;
            let other = other_side(assign)?;
            (self.stmt_scope(s) == Some(parent)).then_some((other, s))
        })
    }
}
