//! Negation normal form. Pushes negation down to the atoms using an
//! explicit work stack plus a deferred-constructor output stack, so the
//! result is built bottom-up without native recursion — grounded on
//! `pygplib/absneg.py`'s `compute_nnf_step` (a stack of deferred 0/1/2-ary
//! constructors).

use crate::error::Result;
use crate::expr::{Context, Node, Tag};

fn dual(tag: Tag) -> Tag {
    match tag {
        Tag::And => Tag::Or,
        Tag::Or => Tag::And,
        Tag::Forall => Tag::Exists,
        Tag::Exists => Tag::Forall,
        other => other,
    }
}

enum Work {
    Process(Node, bool),
    CombineBinary(Tag),
    CombineIff(bool),
    CombineQuantifier(Tag, usize),
}

/// Rewrites `phi` into negation normal form: no `->`/`<->` survive, and
/// negation occurs only immediately above an atom.
pub fn to_nnf(ctx: &mut Context, phi: &Node) -> Result<Node> {
    let mut stack = vec![Work::Process(phi.clone(), false)];
    let mut output: Vec<Node> = Vec::new();

    while let Some(work) = stack.pop() {
        match work {
            Work::Process(n, neg) => process(ctx, n, neg, &mut stack, &mut output)?,
            Work::CombineBinary(tag) => {
                let r = output.pop().expect("nnf: missing right operand");
                let l = output.pop().expect("nnf: missing left operand");
                output.push(ctx.binop(tag, l, r)?);
            }
            Work::CombineIff(neg) => {
                let rt = output.pop().expect("nnf: missing rt");
                let rf = output.pop().expect("nnf: missing rf");
                let lt_ = output.pop().expect("nnf: missing lt");
                let lf = output.pop().expect("nnf: missing lf");
                let (or1, or2) = if neg {
                    (ctx.lor(lf, rf), ctx.lor(lt_, rt))
                } else {
                    (ctx.lor(lt_, rf), ctx.lor(rt, lf))
                };
                output.push(ctx.land(or1, or2));
            }
            Work::CombineQuantifier(tag, x) => {
                let body = output.pop().expect("nnf: missing quantifier body");
                output.push(ctx.qf(tag, body, x)?);
            }
        }
    }

    Ok(output.pop().expect("nnf: empty result"))
}

fn process(
    ctx: &mut Context,
    n: Node,
    neg: bool,
    stack: &mut Vec<Work>,
    output: &mut Vec<Node>,
) -> Result<()> {
    // Collapse a chain of negations by flipping `neg`; this is also where
    // double-negation elimination (`~~phi = phi`) falls out for free.
    let mut cur = n;
    let mut neg = neg;
    while cur.tag == Tag::Not {
        cur = cur.left.clone().expect("Not node without an operand");
        neg = !neg;
    }

    match cur.tag {
        Tag::True => output.push(if neg { ctx.false_const() } else { ctx.true_const() }),
        Tag::False => output.push(if neg { ctx.true_const() } else { ctx.false_const() }),
        Tag::Var | Tag::Eq | Tag::Edg | Tag::Lt => {
            output.push(if neg { ctx.neg(cur) } else { cur });
        }
        Tag::And | Tag::Or => {
            let effective = if neg { dual(cur.tag) } else { cur.tag };
            let l = cur.left.clone().unwrap();
            let r = cur.right.clone().unwrap();
            stack.push(Work::CombineBinary(effective));
            stack.push(Work::Process(r, neg));
            stack.push(Work::Process(l, neg));
        }
        Tag::Implies => {
            let l = cur.left.clone().unwrap();
            let r = cur.right.clone().unwrap();
            if neg {
                // ~(l -> r) = l & ~r
                stack.push(Work::CombineBinary(Tag::And));
                stack.push(Work::Process(r, true));
                stack.push(Work::Process(l, false));
            } else {
                // l -> r = ~l | r
                stack.push(Work::CombineBinary(Tag::Or));
                stack.push(Work::Process(r, false));
                stack.push(Work::Process(l, true));
            }
        }
        Tag::Iff => {
            let l = cur.left.clone().unwrap();
            let r = cur.right.clone().unwrap();
            stack.push(Work::CombineIff(neg));
            stack.push(Work::Process(r, true));
            stack.push(Work::Process(r, false));
            stack.push(Work::Process(l, true));
            stack.push(Work::Process(l, false));
        }
        Tag::Forall | Tag::Exists => {
            let effective = if neg { dual(cur.tag) } else { cur.tag };
            let x = cur.aux.0;
            let body = cur.left.clone().unwrap();
            stack.push(Work::CombineQuantifier(effective, x));
            stack.push(Work::Process(body, neg));
        }
        Tag::Not => unreachable!("collapsed above"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn has_no_implies_or_iff(ctx: &Context, n: &Node) -> bool {
        match n.tag {
            Tag::Implies | Tag::Iff => false,
            Tag::Not => {
                n.left.as_ref().unwrap().tag.is_atom()
                    && has_no_implies_or_iff(ctx, n.left.as_ref().unwrap())
            }
            _ => {
                n.left.as_ref().map(|l| has_no_implies_or_iff(ctx, l)).unwrap_or(true)
                    && n.right.as_ref().map(|r| has_no_implies_or_iff(ctx, r)).unwrap_or(true)
            }
        }
    }

    #[test]
    /// No `->`/`<->` survives NNF, and negation appears only over atoms.
    fn nnf_law_holds() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "~((x=y -> edg(x,z)) <-> ~(x<y))").unwrap();
        let nnf = to_nnf(&mut ctx, &phi).unwrap();
        assert!(has_no_implies_or_iff(&ctx, &nnf));
    }

    #[test]
    /// Double negation collapses away.
    fn double_negation_collapses() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "~~T").unwrap();
        let nnf = to_nnf(&mut ctx, &phi).unwrap();
        let t = ctx.true_const();
        assert!(std::rc::Rc::ptr_eq(&nnf, &t));
    }

    #[test]
    /// `~forall x. phi` becomes `exists x. ~phi`.
    fn quantifier_duality() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "~![x]:T").unwrap();
        let nnf = to_nnf(&mut ctx, &phi).unwrap();
        assert_eq!(nnf.tag, Tag::Exists);
        assert_eq!(nnf.left.as_ref().unwrap().tag, Tag::False);
    }
}
