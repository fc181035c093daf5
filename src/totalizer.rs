//! At-most-r cardinality constraint (Module I), grounded on
//! `pygplib/constraints.py::at_most_r` — a balanced binary totalizer tree
//! over the input literals.
//!
//! The design notes call out that the Python source builds its totalizer
//! as a string of propositional syntax re-parsed by the Prop parser, and
//! that a direct implementation should build the Prop DAG directly. We go
//! one step further: rather than minting a named Boolean signal per
//! totalizer-tree node (as the clause-level Bailleux–Boufkhad encoding
//! does), each "at least k" signal is built as a formula directly, so
//! Tseitin (Module H) mints exactly the auxiliary variables the resulting
//! DAG's hash-consed sharing actually needs.

use crate::error::Result;
use crate::expr::{Context, Node};

/// Returns a formula satisfied by an assignment iff at most `r` of `vars`
/// are true. Short-circuits the small cases named in the component design
/// (`r >= n`, `r == 0`, `r < 0`).
pub fn at_most_r(ctx: &mut Context, vars: &[Node], r: i64) -> Result<Node> {
    let n = vars.len() as i64;
    if r < 0 {
        return Ok(ctx.false_const());
    }
    if r >= n {
        return Ok(ctx.true_const());
    }
    if r == 0 {
        let negated: Vec<Node> = vars.iter().map(|v| ctx.neg(v.clone())).collect();
        return ctx.binop_batch(crate::expr::Tag::And, negated, true);
    }
    let signals = totalizer_signals(ctx, vars)?;
    // `signals[k-1]` means "at least k of vars are true"; forbidding
    // "at least r+1" is exactly "at most r".
    let too_many = signals[r as usize].clone();
    Ok(ctx.neg(too_many))
}

/// Builds `signals` where `signals[k-1]` is a formula for "at least k of
/// `leaves` are true", via a balanced binary merge tree.
fn totalizer_signals(ctx: &mut Context, leaves: &[Node]) -> Result<Vec<Node>> {
    if leaves.len() == 1 {
        return Ok(vec![leaves[0].clone()]);
    }
    let mid = leaves.len() / 2;
    let left = totalizer_signals(ctx, &leaves[..mid])?;
    let right = totalizer_signals(ctx, &leaves[mid..])?;
    merge(ctx, &left, &right)
}

fn at_least(ctx: &mut Context, sig: &[Node], k: i64) -> Node {
    if k <= 0 {
        ctx.true_const()
    } else if k as usize > sig.len() {
        ctx.false_const()
    } else {
        sig[(k - 1) as usize].clone()
    }
}

fn merge(ctx: &mut Context, left: &[Node], right: &[Node]) -> Result<Vec<Node>> {
    let p = left.len() as i64;
    let q = right.len() as i64;
    let total = (p + q) as usize;
    let mut out = Vec::with_capacity(total);
    for k in 1..=total as i64 {
        let lo = 0.max(k - q);
        let hi = p.min(k);
        let mut terms = Vec::new();
        for i in lo..=hi {
            let a = at_least(ctx, left, i);
            let b = at_least(ctx, right, k - i);
            terms.push(ctx.land(a, b));
        }
        out.push(ctx.binop_batch(crate::expr::Tag::Or, terms, true)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::reduce::reduce;

    fn vars(ctx: &mut Context, names: &[&str]) -> Vec<Node> {
        names
            .iter()
            .map(|n| {
                let i = ctx.names.lookup_index(n).unwrap();
                ctx.var(i)
            })
            .collect()
    }

    fn is_true(ctx: &mut Context, n: &Node) -> bool {
        reduce(ctx, n, None).unwrap().tag == crate::expr::Tag::True
    }
    fn is_false(ctx: &mut Context, n: &Node) -> bool {
        reduce(ctx, n, None).unwrap().tag == crate::expr::Tag::False
    }

    #[test]
    /// Exhaustive check on 4 variables, r=2: satisfied iff at most two are
    /// true. We check this by substituting each assignment for T/F and
    /// reducing.
    fn at_most_r_matches_brute_force() {
        let mut ctx = Context::new();
        let v = vars(&mut ctx, &["a", "b", "c", "d"]);
        let phi = at_most_r(&mut ctx, &v, 2).unwrap();

        for mask in 0u32..16 {
            let mut cur = phi.clone();
            for (i, var_node) in v.iter().enumerate() {
                let bit = (mask >> i) & 1 == 1;
                let replacement = if bit { ctx.true_const() } else { ctx.false_const() };
                // substitute the underlying symbol with a constant truth
                // value by replacing the var atom identity directly.
                cur = substitute_var(&mut ctx, &cur, var_node, &replacement);
            }
            let expected = mask.count_ones() <= 2;
            if expected {
                assert!(is_true(&mut ctx, &cur), "mask {mask:04b} should satisfy at-most-2");
            } else {
                assert!(is_false(&mut ctx, &cur), "mask {mask:04b} should violate at-most-2");
            }
        }
    }

    /// Test-only helper: replaces every occurrence of the atom `var_node`
    /// with `value` (a `T`/`F` constant) throughout `n`.
    fn substitute_var(ctx: &mut Context, n: &Node, var_node: &Node, value: &Node) -> Node {
        use crate::expr::{node_id, Tag};
        if node_id(n) == node_id(var_node) {
            return value.clone();
        }
        match n.tag {
            Tag::True | Tag::False | Tag::Var | Tag::Eq | Tag::Edg | Tag::Lt => n.clone(),
            Tag::Not => {
                let a = substitute_var(ctx, n.left.as_ref().unwrap(), var_node, value);
                ctx.neg(a)
            }
            Tag::And | Tag::Or | Tag::Implies | Tag::Iff => {
                let l = substitute_var(ctx, n.left.as_ref().unwrap(), var_node, value);
                let r = substitute_var(ctx, n.right.as_ref().unwrap(), var_node, value);
                ctx.binop(n.tag, l, r).unwrap()
            }
            Tag::Forall | Tag::Exists => {
                let body = substitute_var(ctx, n.left.as_ref().unwrap(), var_node, value);
                ctx.qf(n.tag, body, n.aux.0).unwrap()
            }
        }
    }

    #[test]
    /// `r >= n` short-circuits to `T`.
    fn r_at_least_n_is_trivially_true() {
        let mut ctx = Context::new();
        let v = vars(&mut ctx, &["a", "b"]);
        let phi = at_most_r(&mut ctx, &v, 5).unwrap();
        assert!(is_true(&mut ctx, &phi));
    }

    #[test]
    /// `r == 0` forces every variable false.
    fn r_zero_forces_all_false() {
        let mut ctx = Context::new();
        let v = vars(&mut ctx, &["a", "b"]);
        let phi = at_most_r(&mut ctx, &v, 0).unwrap();
        let t = ctx.true_const();
        let a_true = substitute_var(&mut ctx, &phi, &v[0], &t);
        assert!(is_false(&mut ctx, &a_true));
    }
}
