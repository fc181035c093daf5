//! Substitution. Replaces every *free* occurrence of symbol `x` by symbol
//! `y`. A quantifier binding `x` shadows the substitution on its body.
//!
//! Grounded on `pygplib/op.py`'s `substitute`, which tracks a bind-depth
//! counter keyed on `x` so that rewriting only fires when the counter is
//! zero. This traversal is deliberately unshared: the same hash-consed
//! node can occur both bound and free, so a memoized/skip-shared walk
//! would substitute it inconsistently.

use crate::expr::{Context, Node, Tag};

/// Replaces every free occurrence of `x` with `y` in `phi`.
pub fn substitute(ctx: &mut Context, phi: &Node, x: usize, y: usize) -> Node {
    substitute_at(ctx, phi, x, y, 0)
}

fn substitute_at(ctx: &mut Context, n: &Node, x: usize, y: usize, depth: usize) -> Node {
    match n.tag {
        Tag::True | Tag::False => n.clone(),

        Tag::Var => {
            if depth == 0 && n.aux.0 == x {
                ctx.var(y)
            } else {
                n.clone()
            }
        }

        Tag::Eq | Tag::Edg => {
            let (a, b) = n.aux;
            let a2 = if depth == 0 && a == x { y } else { a };
            let b2 = if depth == 0 && b == x { y } else { b };
            if (a2, b2) == (a, b) {
                n.clone()
            } else if n.tag == Tag::Eq {
                ctx.eq(a2, b2).expect("substituted symbols are already registered")
            } else {
                ctx.edg(a2, b2).expect("substituted symbols are already registered")
            }
        }

        Tag::Lt => {
            let (a, b) = n.aux;
            let a2 = if depth == 0 && a == x { y } else { a };
            let b2 = if depth == 0 && b == x { y } else { b };
            if (a2, b2) == (a, b) {
                n.clone()
            } else {
                ctx.lt(a2, b2)
            }
        }

        Tag::Not => {
            let a = substitute_at(ctx, n.left.as_ref().unwrap(), x, y, depth);
            ctx.neg(a)
        }

        Tag::And | Tag::Or | Tag::Implies | Tag::Iff => {
            let l = substitute_at(ctx, n.left.as_ref().unwrap(), x, y, depth);
            let r = substitute_at(ctx, n.right.as_ref().unwrap(), x, y, depth);
            ctx.binop(n.tag, l, r).expect("tag is binary")
        }

        Tag::Forall | Tag::Exists => {
            let bound = n.aux.0;
            let body_depth = if bound == x { depth + 1 } else { depth };
            let body = substitute_at(ctx, n.left.as_ref().unwrap(), x, y, body_depth);
            ctx.qf(n.tag, body, bound).expect("tag is a quantifier")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    /// A free occurrence is replaced.
    fn replaces_free_occurrence() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "x=z").unwrap();
        let x = ctx.names.lookup_index("x").unwrap();
        let y = ctx.names.lookup_index("y").unwrap();
        let out = substitute(&mut ctx, &phi, x, y);
        let expected = parse(&mut ctx, "y=z").unwrap();
        assert!(std::rc::Rc::ptr_eq(&out, &expected));
    }

    #[test]
    /// A quantifier binding `x` shadows substitution of `x` in its body.
    fn quantifier_shadows_bound_occurrence() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "![x]:(x=z)").unwrap();
        let x = ctx.names.lookup_index("x").unwrap();
        let y = ctx.names.lookup_index("y").unwrap();
        let out = substitute(&mut ctx, &phi, x, y);
        assert!(std::rc::Rc::ptr_eq(&out, &phi));
    }

    #[test]
    /// The classic shadowing trap: `(?[x]:x) & x` only substitutes the
    /// free `x` on the right; this requires the unshared traversal.
    fn shared_node_substituted_only_when_free() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "(?[x]:(x=x)) & (x=z)").unwrap();
        let x = ctx.names.lookup_index("x").unwrap();
        let w = ctx.names.lookup_index("w").unwrap();
        let out = substitute(&mut ctx, &phi, x, w);
        let expected = parse(&mut ctx, "(?[x]:(x=x)) & (w=z)").unwrap();
        assert!(std::rc::Rc::ptr_eq(&out, &expected));
    }
}
