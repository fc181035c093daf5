//! Three-visit traversal over the formula DAG.
//!
//! Per the design notes ("avoid language-native generators to keep control
//! flow explicit"), this is modeled as a visitor with `enter`/`between`/
//! `leave` callbacks driven by an explicit stack, not a recursive
//! generator. Grounded on `pygplib/op.py`'s `generate_subformulas`
//! (explicit stack + `done` set for the shared-skipping case).

use super::{node_id, Node};
use std::collections::HashSet;

/// Receives the three visits of every subformula: `enter` on first arrival
/// (prefix order), `between` after the left operand has been fully visited
/// (infix order), and `leave` after both operands have been fully visited
/// (postfix order). Atoms and single-operand nodes still receive all three
/// calls, back to back.
pub trait Visitor {
    fn enter(&mut self, _n: &Node) {}
    fn between(&mut self, _n: &Node) {}
    fn leave(&mut self, _n: &Node) {}
}

enum Phase {
    Enter,
    AfterLeft,
    Leave,
}

struct Frame {
    node: Node,
    phase: Phase,
}

/// Walks the DAG rooted at `root`, calling `visitor`'s three methods for
/// every subformula.
///
/// `skip_shared` suppresses every visit (enter/between/leave alike) of a
/// structurally identical subformula beyond its first occurrence. Callers
/// that care about binding scope — substitution, free-variable collection —
/// MUST pass `skip_shared = false`, because the same node can occur both
/// bound and free (spec's hash-consing design note).
pub fn walk<V: Visitor>(root: &Node, visitor: &mut V, skip_shared: bool) {
    let mut seen: HashSet<usize> = HashSet::new();
    let mut stack = vec![Frame {
        node: root.clone(),
        phase: Phase::Enter,
    }];

    while let Some(frame) = stack.pop() {
        match frame.phase {
            Phase::Enter => {
                if skip_shared && !seen.insert(node_id(&frame.node)) {
                    continue;
                }
                visitor.enter(&frame.node);
                stack.push(Frame {
                    node: frame.node.clone(),
                    phase: Phase::Leave,
                });
                if let Some(r) = frame.node.right.clone() {
                    stack.push(Frame {
                        node: r,
                        phase: Phase::Enter,
                    });
                }
                stack.push(Frame {
                    node: frame.node.clone(),
                    phase: Phase::AfterLeft,
                });
                if let Some(l) = frame.node.left.clone() {
                    stack.push(Frame {
                        node: l,
                        phase: Phase::Enter,
                    });
                }
            }
            Phase::AfterLeft => visitor.between(&frame.node),
            Phase::Leave => visitor.leave(&frame.node),
        }
    }
}

/// Collects every subformula in postfix (leave) order. With
/// `skip_shared = true` each distinct shared subformula appears once, in
/// the order its subtree first completes — the order algebraic reduction
/// replaces nodes in.
pub fn postorder(root: &Node, skip_shared: bool) -> Vec<Node> {
    struct Collect(Vec<Node>);
    impl Visitor for Collect {
        fn leave(&mut self, n: &Node) {
            self.0.push(n.clone());
        }
    }
    let mut c = Collect(Vec::new());
    walk(root, &mut c, skip_shared);
    c.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Context;

    #[test]
    /// Postorder visits children before their parent.
    fn postorder_visits_children_first() {
        let mut ctx = Context::new();
        let x = ctx.names.lookup_index("x").unwrap();
        let a = ctx.var(x);
        let phi = ctx.neg(a.clone());
        let order = postorder(&phi, false);
        assert_eq!(order.len(), 2);
        assert!(std::rc::Rc::ptr_eq(&order[0], &a));
        assert!(std::rc::Rc::ptr_eq(&order[1], &phi));
    }

    #[test]
    /// `skip_shared=true` visits a repeated subformula only once.
    fn skip_shared_deduplicates() {
        let mut ctx = Context::new();
        let x = ctx.names.lookup_index("x").unwrap();
        let a = ctx.var(x);
        let phi = ctx.land(a.clone(), a.clone());
        let shared = postorder(&phi, true);
        let unshared = postorder(&phi, false);
        assert_eq!(shared.len(), 2); // a, phi
        assert_eq!(unshared.len(), 3); // a, a, phi
    }
}
