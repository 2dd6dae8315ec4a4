//! Rule enforcer: normalizes a tree so every node matches its capability.
//!
//! Structural violations are never errors. [`enforce`] silently drops
//! `children` from kinds that cannot own them and gives every group a
//! (possibly empty) child list. [`audit`] reports the same findings without
//! touching the tree, plus duplicate ids, which enforcement cannot repair.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::locate::state_hash;
use crate::node::{Node, NodeId};
use crate::walk::{self, NodePath};

/// Normalize a copy of `tree`. Idempotent.
#[must_use]
pub fn enforce(tree: &[Node]) -> Vec<Node> {
    let mut working = tree.to_vec();
    enforce_in_place(&mut working);
    working
}

/// Normalize `tree` in place.
pub fn enforce_in_place(tree: &mut [Node]) {
    walk::visit_mut(tree, &mut |node| {
        if node.kind.capabilities().can_have_children {
            if node.children.is_none() {
                node.children = Some(Vec::new());
            }
        } else if node.children.take().is_some() {
            tracing::trace!(node = %node.id, kind = %node.kind, "dropped children from leaf");
        }
    });
}

/// Severity for one invariant finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantSeverity {
    Error,
    Warning,
}

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantCode {
    ChildrenOnLeaf,
    MissingGroupChildren,
    DuplicateId,
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantIssue {
    pub code: InvariantCode,
    pub severity: InvariantSeverity,
    pub repairable: bool,
    pub node_id: NodeId,
    pub path: NodePath,
    pub message: String,
}

/// Structured invariant report over one tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantReport {
    pub tree_hash: u64,
    pub node_count: usize,
    pub issues: Vec<InvariantIssue>,
}

impl InvariantReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Return true if any error-level finding exists.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == InvariantSeverity::Error)
    }

    /// Return true when [`enforce`] alone would clear every finding.
    #[must_use]
    pub fn is_repairable(&self) -> bool {
        self.issues.iter().all(|issue| issue.repairable)
    }
}

/// Report capability mismatches and duplicate ids without changing `tree`.
#[must_use]
pub fn audit(tree: &[Node]) -> InvariantReport {
    let mut issues = Vec::new();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut node_count = 0usize;

    walk::walk::<()>(tree, |path, node| {
        node_count += 1;
        let can_nest = node.kind.capabilities().can_have_children;
        match (&node.children, can_nest) {
            (Some(children), false) => issues.push(InvariantIssue {
                code: InvariantCode::ChildrenOnLeaf,
                severity: InvariantSeverity::Warning,
                repairable: true,
                node_id: node.id.clone(),
                path: path.clone(),
                message: format!(
                    "{} node {} carries {} child(ren)",
                    node.kind,
                    node.id,
                    children.len()
                ),
            }),
            (None, true) => issues.push(InvariantIssue {
                code: InvariantCode::MissingGroupChildren,
                severity: InvariantSeverity::Warning,
                repairable: true,
                node_id: node.id.clone(),
                path: path.clone(),
                message: format!("group {} has no children list", node.id),
            }),
            _ => {}
        }
        if !seen.insert(node.id.as_str()) {
            issues.push(InvariantIssue {
                code: InvariantCode::DuplicateId,
                severity: InvariantSeverity::Error,
                repairable: false,
                node_id: node.id.clone(),
                path: path.clone(),
                message: format!("id {} appears more than once", node.id),
            });
        }
        std::ops::ControlFlow::Continue(())
    });

    InvariantReport {
        tree_hash: state_hash(tree),
        node_count,
        issues,
    }
}
