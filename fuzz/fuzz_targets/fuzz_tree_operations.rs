#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mapforge_tree::{Node, NodeKind, OperationKind, TreeOperation, audit, locate};

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    InsertAtRoot { kind: u8, id: u8 },
    InsertIntoGroup { group: u8, kind: u8, id: u8 },
    InsertBefore { target: u8, kind: u8, id: u8 },
    Remove { id: u8 },
    MoveUp { id: u8 },
    MoveDown { id: u8 },
    MoveToIndex { id: u8, index: u8 },
    MoveBefore { id: u8, target: u8 },
    MoveIntoGroup { id: u8, group: u8 },
}

const KINDS: [NodeKind; 3] = [NodeKind::Group, NodeKind::Layer, NodeKind::Tool];

fn node(kind: u8, id: u8) -> Node {
    let kind = KINDS[usize::from(kind) % KINDS.len()];
    Node::new(format!("{}:{}", kind, id % 24), format!("n{id}"), kind)
}

fn id(raw: u8, kind: u8) -> String {
    format!("{}:{}", KINDS[usize::from(kind) % KINDS.len()], raw % 24)
}

impl FuzzOp {
    fn into_operation(self) -> TreeOperation {
        match self {
            Self::InsertAtRoot { kind, id } => TreeOperation::InsertAtRoot { node: node(kind, id) },
            Self::InsertIntoGroup { group, kind, id } => TreeOperation::InsertIntoGroup {
                group: self::id(group, 0).into(),
                node: node(kind, id),
            },
            Self::InsertBefore { target, kind, id } => TreeOperation::InsertBefore {
                target: self::id(target, target).into(),
                node: node(kind, id),
            },
            Self::Remove { id } => TreeOperation::Remove { id: self::id(id, id).into() },
            Self::MoveUp { id } => TreeOperation::MoveUp { id: self::id(id, id).into() },
            Self::MoveDown { id } => TreeOperation::MoveDown { id: self::id(id, id).into() },
            Self::MoveToIndex { id, index } => TreeOperation::MoveToIndex {
                id: self::id(id, id).into(),
                index: usize::from(index % 8),
            },
            Self::MoveBefore { id, target } => TreeOperation::MoveBefore {
                id: self::id(id, id).into(),
                target: self::id(target, target).into(),
            },
            Self::MoveIntoGroup { id, group } => TreeOperation::MoveIntoGroup {
                id: self::id(id, id).into(),
                group: self::id(group, 0).into(),
            },
        }
    }
}

fuzz_target!(|ops: Vec<FuzzOp>| {
    let mut tree: Vec<Node> = Vec::new();
    for op in ops.into_iter().take(256) {
        let operation = op.into_operation();
        let before = locate::node_count(&tree);
        let outcome = operation.apply(&tree);
        let after = locate::node_count(&outcome.tree);
        match outcome.kind {
            OperationKind::Remove => {
                let removed = outcome.removed.as_ref().map_or(0, Node::subtree_len);
                assert_eq!(after + removed, before);
            }
            OperationKind::InsertAtRoot
            | OperationKind::InsertIntoGroup
            | OperationKind::InsertBefore => assert!(after == before || after == before + 1),
            _ => assert_eq!(after, before),
        }
        if !outcome.changed {
            assert_eq!(outcome.before_hash, outcome.after_hash);
        }

        let report = audit(&outcome.tree);
        assert!(report.is_clean(), "issues after {operation:?}: {:?}", report.issues);
        tree = outcome.tree;
    }
});
