//! Hash-consed formula DAG (Module B).
//!
//! Nodes are shared by structural equality: two requests to build a node
//! with the same `(tag, left-identity, right-identity, aux)` return the
//! same [`Node`]. Grounded on `pygplib/absexpr.py`'s `_unique_table`
//! hash-consing `__new__`, adapted from process-wide class state to an
//! interner owned by [`Context`].

pub mod traversal;

use crate::error::{Error, Result};
use crate::name::NameRegistry;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// The tag set: propositional atoms/connectives plus first-order atoms and
/// quantifiers (spec §3 "Tag set").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    True,
    False,
    Var,
    Not,
    And,
    Or,
    Implies,
    Iff,
    Eq,
    Edg,
    Lt,
    Forall,
    Exists,
}

impl Tag {
    pub fn is_atom(self) -> bool {
        matches!(
            self,
            Tag::True | Tag::False | Tag::Var | Tag::Eq | Tag::Edg | Tag::Lt
        )
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Tag::Not)
    }

    pub fn is_binary(self) -> bool {
        matches!(self, Tag::And | Tag::Or | Tag::Implies | Tag::Iff)
    }

    pub fn is_quantifier(self) -> bool {
        matches!(self, Tag::Forall | Tag::Exists)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tag::True => "T",
            Tag::False => "F",
            Tag::Var => "var",
            Tag::Not => "~",
            Tag::And => "&",
            Tag::Or => "|",
            Tag::Implies => "->",
            Tag::Iff => "<->",
            Tag::Eq => "=",
            Tag::Edg => "edg",
            Tag::Lt => "<",
            Tag::Forall => "!",
            Tag::Exists => "?",
        };
        write!(f, "{s}")
    }
}

/// A node in the formula DAG. Atoms carry their payload in `aux`
/// (`var(i)` stores `i`; `eq`/`edg`/`lt` store `(x, y)`); unary and binary
/// connectives carry their operand(s) in `left`/`right`; quantifiers carry
/// the bound-variable index in `aux.0` and the body in `left`.
#[derive(Debug)]
pub struct NodeData {
    pub tag: Tag,
    pub left: Option<Node>,
    pub right: Option<Node>,
    pub aux: (usize, usize),
}

/// A shared, hash-consed formula node. Structural equality implies pointer
/// identity for any two nodes built through the same [`Context`].
pub type Node = Rc<NodeData>;

pub fn node_id(n: &Node) -> usize {
    Rc::as_ptr(n) as usize
}

type InternKey = (Tag, usize, usize, usize, usize);

/// Owns the hash-cons table and the name registry for one compilation.
/// Grounded on the design notes' guidance to replace `pygplib`'s
/// process-wide `NameMgr`/`_unique_table` class state with a single
/// explicit, owned value.
#[derive(Default)]
pub struct Context {
    pub names: NameRegistry,
    table: HashMap<InternKey, Node>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, tag: Tag, left: Option<Node>, right: Option<Node>, aux: (usize, usize)) -> Node {
        let key = (
            tag,
            left.as_ref().map(node_id).unwrap_or(0),
            right.as_ref().map(node_id).unwrap_or(0),
            aux.0,
            aux.1,
        );
        if let Some(existing) = self.table.get(&key) {
            return existing.clone();
        }
        let node: Node = Rc::new(NodeData { tag, left, right, aux });
        self.table.insert(key, node.clone());
        node
    }

    pub fn true_const(&mut self) -> Node {
        self.intern(Tag::True, None, None, (0, 0))
    }

    pub fn false_const(&mut self) -> Node {
        self.intern(Tag::False, None, None, (0, 0))
    }

    pub fn var(&mut self, i: usize) -> Node {
        self.intern(Tag::Var, None, None, (i, 0))
    }

    pub fn neg(&mut self, a: Node) -> Node {
        self.intern(Tag::Not, Some(a), None, (0, 0))
    }

    pub fn land(&mut self, a: Node, b: Node) -> Node {
        self.binop(Tag::And, a, b).expect("And is binary")
    }

    pub fn lor(&mut self, a: Node, b: Node) -> Node {
        self.binop(Tag::Or, a, b).expect("Or is binary")
    }

    pub fn implies(&mut self, a: Node, b: Node) -> Node {
        self.binop(Tag::Implies, a, b).expect("Implies is binary")
    }

    pub fn iff(&mut self, a: Node, b: Node) -> Node {
        self.binop(Tag::Iff, a, b).expect("Iff is binary")
    }

    /// Generic binary-connective constructor.
    pub fn binop(&mut self, tag: Tag, l: Node, r: Node) -> Result<Node> {
        if !tag.is_binary() {
            return Err(Error::Structure(format!("{tag} is not a binary connective")));
        }
        Ok(self.intern(tag, Some(l), Some(r), (0, 0)))
    }

    /// Equality atom. Symmetric: `eq(x,y)` and `eq(y,x)` normalize their
    /// argument order by symbol *name* (grounded on `pygplib/fog.py`'s
    /// `_normalize_aux` override for `_EQ`/`_EDG`) so they hash-cons to the
    /// same node.
    pub fn eq(&mut self, x: usize, y: usize) -> Result<Node> {
        let (a, b) = self.normalize_symmetric(x, y)?;
        Ok(self.intern(Tag::Eq, None, None, (a, b)))
    }

    /// Adjacency atom, normalized the same way as [`Context::eq`].
    pub fn edg(&mut self, x: usize, y: usize) -> Result<Node> {
        let (a, b) = self.normalize_symmetric(x, y)?;
        Ok(self.intern(Tag::Edg, None, None, (a, b)))
    }

    /// Strict-order atom. Not symmetric: argument order is preserved.
    pub fn lt(&mut self, x: usize, y: usize) -> Node {
        self.intern(Tag::Lt, None, None, (x, y))
    }

    fn normalize_symmetric(&self, x: usize, y: usize) -> Result<(usize, usize)> {
        let nx = self.names.lookup_name(x)?;
        let ny = self.names.lookup_name(y)?;
        Ok(if nx <= ny { (x, y) } else { (y, x) })
    }

    pub fn forall(&mut self, x: usize, phi: Node) -> Node {
        self.qf(Tag::Forall, phi, x).expect("Forall is a quantifier")
    }

    pub fn exists(&mut self, x: usize, phi: Node) -> Node {
        self.qf(Tag::Exists, phi, x).expect("Exists is a quantifier")
    }

    /// Generic quantifier constructor; `x` is the bound-variable index.
    pub fn qf(&mut self, tag: Tag, phi: Node, x: usize) -> Result<Node> {
        if !tag.is_quantifier() {
            return Err(Error::Structure(format!("{tag} is not a quantifier")));
        }
        Ok(self.intern(tag, Some(phi), None, (x, 0)))
    }

    /// Generic atom constructor from a tag and its symbol-index arguments.
    pub fn atom(&mut self, tag: Tag, args: &[usize]) -> Result<Node> {
        match (tag, args) {
            (Tag::True, []) => Ok(self.true_const()),
            (Tag::False, []) => Ok(self.false_const()),
            (Tag::Var, [i]) => Ok(self.var(*i)),
            (Tag::Eq, [x, y]) => self.eq(*x, *y),
            (Tag::Edg, [x, y]) => self.edg(*x, *y),
            (Tag::Lt, [x, y]) => Ok(self.lt(*x, *y)),
            _ => Err(Error::Structure(format!(
                "tag {tag} does not accept {} argument(s)",
                args.len()
            ))),
        }
    }

    /// Folds a list of formulas into a binary tree with `tag`, either
    /// left-associatively or by balanced halving, matching
    /// `pygplib/op.py`'s `Prop.bipartite_order`-gated choice between
    /// `functools.reduce` and a halving fold.
    pub fn binop_batch(&mut self, tag: Tag, phis: Vec<Node>, bipartite_order: bool) -> Result<Node> {
        if !tag.is_binary() {
            return Err(Error::Structure(format!("{tag} is not a binary connective")));
        }
        if phis.is_empty() {
            return Err(Error::Structure("binop_batch requires at least one operand".to_string()));
        }
        if bipartite_order {
            self.fold_balanced(tag, phis)
        } else {
            let mut it = phis.into_iter();
            let mut acc = it.next().unwrap();
            for phi in it {
                acc = self.binop(tag, acc, phi)?;
            }
            Ok(acc)
        }
    }

    fn fold_balanced(&mut self, tag: Tag, mut phis: Vec<Node>) -> Result<Node> {
        if phis.len() == 1 {
            return Ok(phis.pop().unwrap());
        }
        let mid = phis.len() / 2;
        let right = phis.split_off(mid);
        let left = self.fold_balanced(tag, phis)?;
        let right = self.fold_balanced(tag, right)?;
        self.binop(tag, left, right)
    }

    /// Prefix (Polish) pretty-printer.
    pub fn to_prefix(&self, n: &Node) -> String {
        self.print(n, PrintStyle::Prefix)
    }

    /// Infix pretty-printer; this is the form the parser (Module C)
    /// round-trips (spec §6 "Printed form round-trips through the parser").
    pub fn to_infix(&self, n: &Node) -> String {
        self.print(n, PrintStyle::Infix)
    }

    /// Postfix (reverse Polish) pretty-printer.
    pub fn to_postfix(&self, n: &Node) -> String {
        self.print(n, PrintStyle::Postfix)
    }

    /// Graphviz DOT pretty-printer of the DAG rooted at `n`.
    pub fn to_dot(&self, n: &Node) -> String {
        let mut out = String::from("digraph formula {\n");
        let mut seen = std::collections::HashSet::new();
        self.dot_visit(n, &mut out, &mut seen);
        out.push_str("}\n");
        out
    }

    fn dot_visit(&self, n: &Node, out: &mut String, seen: &mut std::collections::HashSet<usize>) {
        let id = node_id(n);
        if !seen.insert(id) {
            return;
        }
        out.push_str(&format!("  n{id} [label=\"{}\"];\n", self.node_label(n)));
        if let Some(l) = &n.left {
            out.push_str(&format!("  n{id} -> n{};\n", node_id(l)));
            self.dot_visit(l, out, seen);
        }
        if let Some(r) = &n.right {
            out.push_str(&format!("  n{id} -> n{};\n", node_id(r)));
            self.dot_visit(r, out, seen);
        }
    }

    fn node_label(&self, n: &Node) -> String {
        match n.tag {
            Tag::True | Tag::False | Tag::Not | Tag::And | Tag::Or | Tag::Implies | Tag::Iff => {
                n.tag.to_string()
            }
            Tag::Var => format!("var({})", n.aux.0),
            Tag::Eq | Tag::Edg | Tag::Lt => {
                let x = self.names.lookup_name(n.aux.0).unwrap_or("?");
                let y = self.names.lookup_name(n.aux.1).unwrap_or("?");
                format!("{}({x},{y})", n.tag)
            }
            Tag::Forall | Tag::Exists => {
                let x = self.names.lookup_name(n.aux.0).unwrap_or("?");
                format!("{}[{x}]", n.tag)
            }
        }
    }

    fn print(&self, n: &Node, style: PrintStyle) -> String {
        match n.tag {
            Tag::True | Tag::False => n.tag.to_string(),
            Tag::Var => self.names.lookup_name(n.aux.0).unwrap_or("?").to_string(),
            Tag::Eq | Tag::Edg | Tag::Lt => {
                let x = self.names.lookup_name(n.aux.0).unwrap_or("?");
                let y = self.names.lookup_name(n.aux.1).unwrap_or("?");
                match n.tag {
                    Tag::Eq => format!("{x}={y}"),
                    Tag::Edg => format!("edg({x},{y})"),
                    Tag::Lt => format!("{x}<{y}"),
                    _ => unreachable!(),
                }
            }
            Tag::Not => {
                let a = self.print(n.left.as_ref().unwrap(), style);
                match style {
                    PrintStyle::Prefix => format!("~{a}"),
                    PrintStyle::Infix => format!("(~{a})"),
                    PrintStyle::Postfix => format!("{a}~"),
                }
            }
            Tag::And | Tag::Or | Tag::Implies | Tag::Iff => {
                let l = self.print(n.left.as_ref().unwrap(), style);
                let r = self.print(n.right.as_ref().unwrap(), style);
                let op = n.tag.to_string();
                match style {
                    PrintStyle::Prefix => format!("{op} {l} {r}"),
                    PrintStyle::Infix => format!("({l}{op}{r})"),
                    PrintStyle::Postfix => format!("{l} {r} {op}"),
                }
            }
            Tag::Forall | Tag::Exists => {
                let x = self.names.lookup_name(n.aux.0).unwrap_or("?");
                let qf = n.tag.to_string();
                let body = self.print(n.left.as_ref().unwrap(), style);
                match style {
                    PrintStyle::Prefix => format!("{qf}[{x}]: {body}"),
                    PrintStyle::Infix => format!("({qf}[{x}]:{body})"),
                    PrintStyle::Postfix => format!("{body} {qf}[{x}]"),
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum PrintStyle {
    Prefix,
    Infix,
    Postfix,
}
