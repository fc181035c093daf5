//! Boolean encoder (Module G): expands quantifiers over a graph structure's
//! domain, then replaces every first-order atom (`=`, `edg`, `<`) with its
//! propositional encoding under that structure's chosen vertex encoding.
//!
//! Grounded on `pygplib/fog.py`'s `FO.encode_boolean` (quantifier expansion
//! followed by a postorder atom substitution pass) and `pygplib/grst.py`'s
//! per-predicate `be_*` encodings consumed here through [`crate::grst::GrSt`].

use crate::error::Result;
use crate::expr::traversal::postorder;
use crate::expr::{node_id, Context, Node, Tag};
use crate::grst::GrSt;
use crate::rewrite::expand_quantifiers;
use std::collections::{HashMap, HashSet};

/// Expands every quantifier in `phi` over `grst`'s vertex domain, then
/// rewrites every remaining `=`/`edg`/`<` atom (now all first-order,
/// variable-or-constant, since expansion has eliminated bound variables
/// down to substituted domain constants) into its Boolean form.
///
/// Any first-order variable left free after expansion (one whose value
/// the caller wants a SAT solver to choose, rather than one bound inside
/// `phi`) is constrained to the code of some actual vertex, and the
/// `vertex`-encoding auxiliary prefix-chain constraints `grst`'s
/// encodings introduced are conjoined in, so the returned formula is
/// self-contained and ready for Tseitin conversion.
pub fn perform_boolean_encoding(ctx: &mut Context, phi: &Node, grst: &GrSt) -> Result<Node> {
    let expanded = expand_quantifiers(ctx, phi, grst.domain(), grst.bipartite_order())?;
    let free_vars = collect_free_variables(ctx, &expanded);
    let encoded = encode_atoms(ctx, &expanded, grst)?;

    let aux = grst.compute_auxiliary_constraint(ctx, &expanded)?;

    let mut parts = vec![encoded];
    for x in free_vars {
        parts.push(grst.domain_constraint(ctx, x)?);
    }
    if aux.tag != Tag::True {
        parts.push(aux);
    }
    ctx.binop_batch(Tag::And, parts, false)
}

/// Collects every symbol classified as a first-order variable (not a
/// constant) that appears as an argument of a surviving `=`/`edg`/`<`
/// atom — after quantifier expansion, these are exactly the variables a
/// caller left free in `phi`.
fn collect_free_variables(ctx: &Context, phi: &Node) -> HashSet<usize> {
    let mut out = HashSet::new();
    for n in postorder(phi, true) {
        if matches!(n.tag, Tag::Eq | Tag::Edg | Tag::Lt) {
            let (x, y) = n.aux;
            if ctx.names.is_variable(x) {
                out.insert(x);
            }
            if ctx.names.is_variable(y) {
                out.insert(y);
            }
        }
    }
    out
}

fn encode_atoms(ctx: &mut Context, phi: &Node, grst: &GrSt) -> Result<Node> {
    let order = postorder(phi, true);
    let mut memo: HashMap<usize, Node> = HashMap::new();

    for n in order {
        let replaced = match n.tag {
            Tag::True | Tag::False | Tag::Var => n.clone(),
            Tag::Eq => grst.be_eq(ctx, n.aux.0, n.aux.1)?,
            Tag::Edg => grst.be_edg(ctx, n.aux.0, n.aux.1)?,
            Tag::Lt => grst.be_lt(ctx, n.aux.0, n.aux.1)?,
            Tag::Not => {
                let a = looked_up(&memo, n.left.as_ref().unwrap());
                ctx.neg(a)
            }
            Tag::And | Tag::Or | Tag::Implies | Tag::Iff => {
                let l = looked_up(&memo, n.left.as_ref().unwrap());
                let r = looked_up(&memo, n.right.as_ref().unwrap());
                ctx.binop(n.tag, l, r)?
            }
            Tag::Forall | Tag::Exists => {
                unreachable!("quantifiers must be expanded before atom encoding")
            }
        };
        memo.insert(node_id(&n), replaced);
    }
    Ok(memo.get(&node_id(phi)).expect("root was encoded").clone())
}

fn looked_up(memo: &HashMap<usize, Node>, child: &Node) -> Node {
    memo.get(&node_id(child)).expect("children encoded before parent in postorder").clone()
}
