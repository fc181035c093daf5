//! Tseitin CNF conversion and DIMACS output (Module H).
//!
//! Grounded on `pygplib/cnf.py`'s `Cnf` class: reduce, short-circuit to
//! unsatisfiable on a `False` input, assign a fresh literal per connective
//! node via postorder with node-identity sharing, and accumulate one unit
//! clause per top-level formula. Variable numbering is split in two bands:
//! the decodable first-order variable bits (spec's "external" variables,
//! whose value a caller can decode back to a vertex) get the low numbers,
//! everything else (registered auxiliary signals and Tseitin's own fresh
//! gate variables) gets the high numbers — grounded on `pygplib/cnf.py`'s
//! `parse_model`/variable-renumbering split.

use crate::error::{Error, Result};
use crate::expr::traversal::postorder;
use crate::expr::{node_id, Context, Node, Tag};
use crate::grst::GrSt;
use crate::rewrite::reduce;
use std::collections::HashMap;

/// A CNF formula: `clauses` over 1-based DIMACS-style literals (negative
/// for negation), plus the variable-numbering split needed to decode a
/// satisfying model back to first-order variable assignments.
pub struct Cnf {
    pub clauses: Vec<Vec<i64>>,
    pub nvar: usize,
    /// Variables `1..=n_decodable` are bits of a decodable first-order
    /// variable; the registry index each corresponds to.
    pub n_decodable: usize,
    var_of_symbol: HashMap<usize, usize>,
    symbol_of_var: Vec<usize>, // cnf var (1-based) -> registry index, 0 for pure Tseitin gates
    /// Unsatisfiable by construction: some input formula reduced to `F`.
    pub trivially_unsat: bool,
}

struct Builder {
    clauses: Vec<Vec<i64>>,
    var_of_symbol: HashMap<usize, usize>,
    symbol_of_var: Vec<usize>,
    node_lit: HashMap<usize, i64>,
    next_var: usize,
}

impl Builder {
    fn fresh_gate(&mut self) -> usize {
        self.next_var += 1;
        self.symbol_of_var.push(0);
        self.next_var
    }

    fn var_for_symbol(&mut self, sym: usize) -> usize {
        if let Some(&v) = self.var_of_symbol.get(&sym) {
            return v;
        }
        let v = self.fresh_gate();
        self.var_of_symbol.insert(sym, v);
        v
    }

    fn literal(&self, n: &Node) -> i64 {
        *self.node_lit.get(&node_id(n)).expect("children assigned a literal before their parent")
    }

    /// Tseitin-encodes one connective node, given its operands' literals
    /// already assigned, and records `n`'s own literal.
    fn visit(&mut self, n: &Node) -> Result<()> {
        let lit = match n.tag {
            Tag::True => {
                let g = self.fresh_gate() as i64;
                self.clauses.push(vec![g]);
                g
            }
            Tag::False => {
                let g = self.fresh_gate() as i64;
                self.clauses.push(vec![-g]);
                g
            }
            Tag::Var => self.var_for_symbol(n.aux.0) as i64,
            Tag::Eq | Tag::Edg | Tag::Lt => {
                return Err(Error::Context(
                    "cnf conversion requires atoms already rewritten to Boolean form".to_string(),
                ))
            }
            Tag::Not => -self.literal(n.left.as_ref().unwrap()),
            Tag::And => {
                let a = self.literal(n.left.as_ref().unwrap());
                let b = self.literal(n.right.as_ref().unwrap());
                let g = self.fresh_gate() as i64;
                self.clauses.push(vec![-g, a]);
                self.clauses.push(vec![-g, b]);
                self.clauses.push(vec![g, -a, -b]);
                g
            }
            Tag::Or => {
                let a = self.literal(n.left.as_ref().unwrap());
                let b = self.literal(n.right.as_ref().unwrap());
                let g = self.fresh_gate() as i64;
                self.clauses.push(vec![g, -a]);
                self.clauses.push(vec![g, -b]);
                self.clauses.push(vec![-g, a, b]);
                g
            }
            Tag::Implies => {
                let a = self.literal(n.left.as_ref().unwrap());
                let b = self.literal(n.right.as_ref().unwrap());
                let g = self.fresh_gate() as i64;
                self.clauses.push(vec![g, a]);
                self.clauses.push(vec![g, -b]);
                self.clauses.push(vec![-g, -a, b]);
                g
            }
            Tag::Iff => {
                let a = self.literal(n.left.as_ref().unwrap());
                let b = self.literal(n.right.as_ref().unwrap());
                let g = self.fresh_gate() as i64;
                self.clauses.push(vec![-g, -a, b]);
                self.clauses.push(vec![-g, a, -b]);
                self.clauses.push(vec![g, a, b]);
                self.clauses.push(vec![g, -a, -b]);
                g
            }
            Tag::Forall | Tag::Exists => {
                return Err(Error::Context(
                    "cnf conversion requires quantifiers already expanded".to_string(),
                ))
            }
        };
        self.node_lit.insert(node_id(n), lit);
        Ok(())
    }
}

/// Converts `formulas` (each already Boolean-encoded, i.e. free of `=`/
/// `edg`/`<`/quantifiers) into one CNF whose models simultaneously satisfy
/// every formula in the list. Each formula is reduced first; a formula
/// that reduces to `F` makes the whole result trivially unsatisfiable, and
/// one that reduces to `T` contributes no clauses.
pub fn compile_cnf(ctx: &mut Context, formulas: &[Node], grst: Option<&GrSt>) -> Result<Cnf> {
    let facts = grst.map(|g| g as &dyn crate::rewrite::ConstantFacts);
    let mut surviving = Vec::with_capacity(formulas.len());
    for phi in formulas {
        let r = reduce(ctx, phi, facts)?;
        match r.tag {
            Tag::False => {
                return Ok(Cnf {
                    clauses: vec![Vec::new()],
                    nvar: 0,
                    n_decodable: 0,
                    var_of_symbol: HashMap::new(),
                    symbol_of_var: Vec::new(),
                    trivially_unsat: true,
                });
            }
            Tag::True => continue,
            _ => surviving.push(r),
        }
    }

    // First band: every decodable first-order variable bit referenced,
    // numbered in first-occurrence order across all surviving formulas.
    // A real `grst` names its allocated bit variables exactly; without one
    // (spec §8 scenario #6's standalone, graph-less use) fall back to the
    // lowercase-name heuristic.
    let allocated = grst.map(|g| g.allocated_bit_variables());
    let is_decodable = |sym: usize| match &allocated {
        Some(bits) => bits.contains(&sym),
        None => ctx.names.is_variable(sym),
    };
    let mut var_of_symbol = HashMap::new();
    let mut symbol_of_var = Vec::new();
    for phi in &surviving {
        for n in postorder(phi, true) {
            if n.tag == Tag::Var && is_decodable(n.aux.0) && !var_of_symbol.contains_key(&n.aux.0) {
                symbol_of_var.push(n.aux.0);
                var_of_symbol.insert(n.aux.0, symbol_of_var.len());
            }
        }
    }
    let n_decodable = symbol_of_var.len();

    let mut builder = Builder {
        clauses: Vec::new(),
        var_of_symbol,
        symbol_of_var,
        node_lit: HashMap::new(),
        next_var: n_decodable,
    };

    let mut roots = Vec::with_capacity(surviving.len());
    for phi in &surviving {
        for n in postorder(phi, true) {
            if !builder.node_lit.contains_key(&node_id(&n)) {
                builder.visit(&n)?;
            }
        }
        roots.push(builder.literal(phi));
    }
    for lit in &roots {
        builder.clauses.push(vec![*lit]);
    }

    Ok(Cnf {
        clauses: builder.clauses,
        nvar: builder.next_var,
        n_decodable,
        var_of_symbol: builder.var_of_symbol,
        symbol_of_var: builder.symbol_of_var,
        trivially_unsat: false,
    })
}

impl Cnf {
    /// Writes DIMACS CNF text. The component design fixes the header
    /// guard explicitly: a formula is written as the degenerate `p cnf 0
    /// 0` only when it has *both* no variables and no clauses, never
    /// (the upstream bug this corrects) merely one or the other.
    pub fn to_dimacs(&self) -> String {
        let mut out = String::new();
        if self.nvar == 0 || self.clauses.is_empty() {
            out.push_str("p cnf 0 0\n");
            return out;
        }
        out.push_str(&format!("c domain 1..{}\n", self.n_decodable));
        out.push_str(&format!("c enc {} decodable, {} total variables\n", self.n_decodable, self.nvar));
        out.push_str(&format!("p cnf {} {}\n", self.nvar, self.clauses.len()));
        for clause in &self.clauses {
            for lit in clause {
                out.push_str(&lit.to_string());
                out.push(' ');
            }
            out.push_str("0\n");
        }
        out
    }

    /// Decodes a satisfying assignment (`model[v-1]` is the truth value of
    /// CNF variable `v`, `1..=nvar`) into the registry-index → truth-value
    /// map for every decodable variable. Fatal if the model is too short
    /// to cover the decodable band — never silently filtered.
    pub fn decode_assignment(&self, model: &[bool]) -> Result<HashMap<usize, bool>> {
        if model.len() < self.n_decodable {
            return Err(Error::Decode(format!(
                "model has {} variables, fewer than the {} decodable variables",
                model.len(),
                self.n_decodable
            )));
        }
        let mut out = HashMap::with_capacity(self.n_decodable);
        for (cnf_var, &sym) in self.symbol_of_var.iter().enumerate().take(self.n_decodable) {
            out.insert(sym, model[cnf_var]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    /// A tautology's CNF is satisfied by every assignment of its
    /// variables (checked by exhaustive enumeration).
    fn tautology_is_satisfied_by_every_assignment() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "(x@1 | ~x@1)").unwrap();
        let cnf = compile_cnf(&mut ctx, &[phi], None).unwrap();
        assert!(!cnf.trivially_unsat);
        for mask in 0u32..(1 << cnf.nvar) {
            let model: Vec<bool> = (0..cnf.nvar).map(|i| (mask >> i) & 1 == 1).collect();
            assert!(clause_list_satisfied(&cnf.clauses, &model));
        }
    }

    fn clause_list_satisfied(clauses: &[Vec<i64>], model: &[bool]) -> bool {
        clauses.iter().all(|clause| {
            clause.iter().any(|&lit| {
                let v = lit.unsigned_abs() as usize - 1;
                if lit > 0 {
                    model[v]
                } else {
                    !model[v]
                }
            })
        })
    }

    #[test]
    /// `F` as an input formula makes the whole CNF trivially unsatisfiable.
    fn false_input_is_trivially_unsat() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "F").unwrap();
        let cnf = compile_cnf(&mut ctx, &[phi], None).unwrap();
        assert!(cnf.trivially_unsat);
        assert_eq!(cnf.to_dimacs(), "p cnf 0 0\n");
    }

    #[test]
    /// `T` contributes no clauses and no variables.
    fn true_input_is_vacuous() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "T").unwrap();
        let cnf = compile_cnf(&mut ctx, &[phi], None).unwrap();
        assert!(!cnf.trivially_unsat);
        assert_eq!(cnf.nvar, 0);
        assert!(cnf.clauses.is_empty());
    }

    #[test]
    /// A satisfiable formula's model decodes back to the expected
    /// variable bit assignment.
    fn decode_assignment_recovers_variable_bits() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "x@1").unwrap();
        let cnf = compile_cnf(&mut ctx, &[phi], None).unwrap();
        let model = vec![true; cnf.nvar];
        let decoded = cnf.decode_assignment(&model).unwrap();
        let x1 = ctx.names.lookup_index("x@1").unwrap();
        assert_eq!(decoded.get(&x1), Some(&true));
    }

    #[test]
    /// An undersized model is a fatal decode error, not silently ignored.
    fn undersized_model_is_a_decode_error() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "x@1").unwrap();
        let cnf = compile_cnf(&mut ctx, &[phi], None).unwrap();
        assert!(cnf.decode_assignment(&[]).is_err());
    }
}
