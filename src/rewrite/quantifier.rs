//! Quantifier expansion to finite conjunction/disjunction over a domain.
//! Grounded on `pygplib/op.py`'s `_eliminate_qf_step`/`eliminate_qf`
//! (substitute over the domain, then fold with `binop_batch`).

use crate::error::Result;
use crate::expr::{node_id, Context, Node, Tag};
use crate::rewrite::substitute::substitute;
use std::collections::HashMap;

/// Expands every `forall`/`exists` node in `phi` into a conjunction/
/// disjunction over `domain` (a list of constant-symbol indices), using
/// `binop_batch` with the given `bipartite_order` fold strategy. A node is
/// only ever expanded once per distinct shared subformula, since the
/// rewrite is context-independent (unlike substitution, it need not track
/// binding depth: the quantifier node itself supplies that).
pub fn expand_quantifiers(
    ctx: &mut Context,
    phi: &Node,
    domain: &[usize],
    bipartite_order: bool,
) -> Result<Node> {
    let mut memo = HashMap::new();
    expand_rec(ctx, phi, domain, bipartite_order, &mut memo)
}

fn expand_rec(
    ctx: &mut Context,
    n: &Node,
    domain: &[usize],
    bipartite_order: bool,
    memo: &mut HashMap<usize, Node>,
) -> Result<Node> {
    if let Some(r) = memo.get(&node_id(n)) {
        return Ok(r.clone());
    }
    let result = match n.tag {
        Tag::True | Tag::False | Tag::Var | Tag::Eq | Tag::Edg | Tag::Lt => n.clone(),
        Tag::Not => {
            let a = expand_rec(ctx, n.left.as_ref().unwrap(), domain, bipartite_order, memo)?;
            ctx.neg(a)
        }
        Tag::And | Tag::Or | Tag::Implies | Tag::Iff => {
            let l = expand_rec(ctx, n.left.as_ref().unwrap(), domain, bipartite_order, memo)?;
            let r = expand_rec(ctx, n.right.as_ref().unwrap(), domain, bipartite_order, memo)?;
            ctx.binop(n.tag, l, r)?
        }
        Tag::Forall | Tag::Exists => {
            let body = expand_rec(ctx, n.left.as_ref().unwrap(), domain, bipartite_order, memo)?;
            if domain.is_empty() {
                // Vacuous: forall over an empty domain is true, exists is false.
                if n.tag == Tag::Forall {
                    ctx.true_const()
                } else {
                    ctx.false_const()
                }
            } else {
                let bound = n.aux.0;
                let copies: Vec<Node> = domain
                    .iter()
                    .map(|&d| substitute(ctx, &body, bound, d))
                    .collect();
                let batch_tag = if n.tag == Tag::Forall { Tag::And } else { Tag::Or };
                ctx.binop_batch(batch_tag, copies, bipartite_order)?
            }
        }
    };
    memo.insert(node_id(n), result.clone());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    /// `forall x. x=V1` over domain {V1, V2} expands to a conjunction over
    /// both substitutions.
    fn forall_expands_to_conjunction() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "![x]:(x=V1)").unwrap();
        let v1 = ctx.names.lookup_index("V1").unwrap();
        let v2 = ctx.names.lookup_index("V2").unwrap();
        let expanded = expand_quantifiers(&mut ctx, &phi, &[v1, v2], false).unwrap();
        assert_eq!(expanded.tag, Tag::And);
    }

    #[test]
    /// An empty domain makes `forall` vacuously true and `exists` false.
    fn empty_domain_is_vacuous() {
        let mut ctx = Context::new();
        let forall = parse(&mut ctx, "![x]:(x=x)").unwrap();
        let exists = parse(&mut ctx, "?[x]:(x=x)").unwrap();
        let ef = expand_quantifiers(&mut ctx, &forall, &[], false).unwrap();
        let ee = expand_quantifiers(&mut ctx, &exists, &[], false).unwrap();
        assert_eq!(ef.tag, Tag::True);
        assert_eq!(ee.tag, Tag::False);
    }
}
