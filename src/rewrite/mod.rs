//! Rewrite pipeline (Module D): negation-normal-form, algebraic reduction,
//! substitution, and quantifier expansion. Every rewrite is side-effect
//! free on its input DAG; rewrites return new (possibly hash-cons-shared)
//! nodes and never mutate an existing node.

pub mod nnf;
pub mod quantifier;
pub mod reduce;
pub mod substitute;

pub use nnf::to_nnf;
pub use quantifier::expand_quantifiers;
pub use reduce::{reduce, ConstantFacts};
pub use substitute::substitute;
