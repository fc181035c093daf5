//! Algebraic reduction. Postorder, `skip_shared=true`, memoized by node
//! identity. Grounded on `pygplib/op.py`'s `reduce`/`reduce_formula` and
//! `pygplib/absneg.py`'s per-tag simplification rules.

use crate::error::Result;
use crate::expr::traversal::postorder;
use crate::expr::{node_id, Context, Node, Tag};
use std::collections::HashMap;

/// The subset of [`crate::grst::GrSt`] that constant-folding needs: vertex
/// identity, edge membership, and the internal order, plus the domain for
/// folding `forall x. F` / `exists x. T`.
pub trait ConstantFacts {
    fn vertex_eq(&self, x: usize, y: usize) -> bool {
        x == y
    }
    fn vertex_edg(&self, x: usize, y: usize) -> bool;
    fn vertex_lt(&self, x: usize, y: usize) -> bool;
    fn domain_is_empty(&self) -> bool;
}

/// Algebraically reduces `phi`. When `facts` is supplied, atoms over two
/// constants are folded using the graph structure, and `forall x. F` /
/// `exists x. T` fold using domain emptiness; without `facts` those two
/// cases are left unreduced (they are not assumed to be context errors —
/// only quantifier expansion and atom *encoding* require a structure, per
/// the component design).
pub fn reduce(ctx: &mut Context, phi: &Node, facts: Option<&dyn ConstantFacts>) -> Result<Node> {
    let order = postorder(phi, true);
    let mut memo: HashMap<usize, Node> = HashMap::new();

    for n in order {
        let reduced = reduce_one(ctx, &n, &memo, facts)?;
        memo.insert(node_id(&n), reduced);
    }
    Ok(memo.get(&node_id(phi)).expect("root was reduced").clone())
}

fn looked_up(memo: &HashMap<usize, Node>, child: &Node) -> Node {
    memo.get(&node_id(child)).expect("children reduced before parent in postorder").clone()
}

fn reduce_one(
    ctx: &mut Context,
    n: &Node,
    memo: &HashMap<usize, Node>,
    facts: Option<&dyn ConstantFacts>,
) -> Result<Node> {
    Ok(match n.tag {
        Tag::True | Tag::False | Tag::Var => n.clone(),

        Tag::Eq | Tag::Edg | Tag::Lt => {
            let (x, y) = n.aux;
            if x == y {
                // x=x -> T ; edg(x,x) -> F ; x<x -> F
                return Ok(match n.tag {
                    Tag::Eq => ctx.true_const(),
                    _ => ctx.false_const(),
                });
            }
            let both_constants = ctx.names.is_constant(x) && ctx.names.is_constant(y);
            if both_constants {
                if let Some(f) = facts {
                    let truth = match n.tag {
                        Tag::Eq => f.vertex_eq(x, y),
                        Tag::Edg => f.vertex_edg(x, y),
                        Tag::Lt => f.vertex_lt(x, y),
                        _ => unreachable!(),
                    };
                    return Ok(if truth { ctx.true_const() } else { ctx.false_const() });
                }
            }
            n.clone()
        }

        Tag::Not => {
            let a = looked_up(memo, n.left.as_ref().unwrap());
            match a.tag {
                Tag::True => ctx.false_const(),
                Tag::False => ctx.true_const(),
                _ => ctx.neg(a),
            }
        }

        Tag::And => {
            let l = looked_up(memo, n.left.as_ref().unwrap());
            let r = looked_up(memo, n.right.as_ref().unwrap());
            match (l.tag, r.tag) {
                (Tag::False, _) | (_, Tag::False) => ctx.false_const(),
                (Tag::True, _) => r,
                (_, Tag::True) => l,
                _ if node_id(&l) == node_id(&r) => l,
                _ => ctx.land(l, r),
            }
        }

        Tag::Or => {
            let l = looked_up(memo, n.left.as_ref().unwrap());
            let r = looked_up(memo, n.right.as_ref().unwrap());
            match (l.tag, r.tag) {
                (Tag::True, _) | (_, Tag::True) => ctx.true_const(),
                (Tag::False, _) => r,
                (_, Tag::False) => l,
                _ if node_id(&l) == node_id(&r) => l,
                _ => ctx.lor(l, r),
            }
        }

        Tag::Implies => {
            let l = looked_up(memo, n.left.as_ref().unwrap());
            let r = looked_up(memo, n.right.as_ref().unwrap());
            match (l.tag, r.tag) {
                (Tag::False, _) | (_, Tag::True) => ctx.true_const(),
                (Tag::True, _) => r,
                (_, Tag::False) => ctx.neg(l),
                _ if node_id(&l) == node_id(&r) => ctx.true_const(),
                _ => ctx.implies(l, r),
            }
        }

        Tag::Iff => {
            let l = looked_up(memo, n.left.as_ref().unwrap());
            let r = looked_up(memo, n.right.as_ref().unwrap());
            match (l.tag, r.tag) {
                _ if node_id(&l) == node_id(&r) => ctx.true_const(),
                (Tag::True, _) => r,
                (_, Tag::True) => l,
                (Tag::False, _) => ctx.neg(r),
                (_, Tag::False) => ctx.neg(l),
                _ => ctx.iff(l, r),
            }
        }

        Tag::Forall | Tag::Exists => {
            let body = looked_up(memo, n.left.as_ref().unwrap());
            let x = n.aux.0;
            match (n.tag, body.tag) {
                (Tag::Forall, Tag::True) => ctx.true_const(),
                (Tag::Exists, Tag::False) => ctx.false_const(),
                (Tag::Forall, Tag::False) => match facts {
                    Some(f) => {
                        if f.domain_is_empty() {
                            ctx.true_const()
                        } else {
                            ctx.false_const()
                        }
                    }
                    None => ctx.forall(x, body),
                },
                (Tag::Exists, Tag::True) => match facts {
                    Some(f) => {
                        if f.domain_is_empty() {
                            ctx.false_const()
                        } else {
                            ctx.true_const()
                        }
                    }
                    None => ctx.exists(x, body),
                },
                _ => ctx.qf(n.tag, body, x)?,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    /// Reduction is idempotent.
    fn reduction_is_idempotent() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "(T & (x=x)) | F").unwrap();
        let r1 = reduce(&mut ctx, &phi, None).unwrap();
        let r2 = reduce(&mut ctx, &r1, None).unwrap();
        assert!(std::rc::Rc::ptr_eq(&r1, &r2));
    }

    #[test]
    /// `x=x` folds to `T`, `edg(x,x)`/`x<x` fold to `F`, without needing a
    /// graph structure.
    fn reflexive_atoms_fold_without_structure() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "(x=x) & ~edg(x,x) & ~(x<x)").unwrap();
        let r = reduce(&mut ctx, &phi, None).unwrap();
        let t = ctx.true_const();
        assert!(std::rc::Rc::ptr_eq(&r, &t));
    }

    #[test]
    /// `T -> x=y` reduces to the consequent.
    fn implication_with_true_antecedent() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "T -> (x=y)").unwrap();
        let r = reduce(&mut ctx, &phi, None).unwrap();
        let x = ctx.names.lookup_index("x").unwrap();
        let y = ctx.names.lookup_index("y").unwrap();
        let expected = ctx.eq(x, y).unwrap();
        assert!(std::rc::Rc::ptr_eq(&r, &expected));
    }
}
