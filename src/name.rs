//! Name registry: a bijection between textual symbols and dense, 1-based
//! integer indices (Module A).
//!
//! Grounded on `pygplib/name.py`'s `NameMgr` classmethod registry, adapted
//! from process-wide class state into an explicit, owned value per the
//! `Context`-object guidance in the design notes.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Reserved leading character for auxiliary names. Never alphabetic, so it
/// can never collide with a name coming through the ordinary parsed-name
/// path, which requires an alphabetic leading character.
const AUX_PREFIX: char = '$';

/// Bijection between names and dense 1-based indices, with the variable /
/// constant / auxiliary classification baked into each name's leading
/// character.
#[derive(Debug, Default)]
pub struct NameRegistry {
    name_of: Vec<String>, // index i (1-based) -> name_of[i-1]
    index_of: HashMap<String, usize>,
    next_aux: usize,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `name`, registering it with a fresh index if it has not
    /// been seen before. Rejects names whose leading character is neither
    /// alphabetic nor the reserved auxiliary prefix.
    pub fn lookup_index(&mut self, name: &str) -> Result<usize> {
        if let Some(&i) = self.index_of.get(name) {
            return Ok(i);
        }
        let leading = name.chars().next().ok_or_else(|| {
            Error::Name("cannot register an empty name".to_string())
        })?;
        if leading != AUX_PREFIX && !leading.is_alphabetic() {
            return Err(Error::Name(format!(
                "name '{name}' has a forbidden leading character '{leading}'"
            )));
        }
        let index = self.name_of.len() + 1;
        self.name_of.push(name.to_string());
        self.index_of.insert(name.to_string(), index);
        Ok(index)
    }

    /// Bounds-checked reverse lookup.
    pub fn lookup_name(&self, index: usize) -> Result<&str> {
        self.name_of
            .get(index.wrapping_sub(1))
            .map(String::as_str)
            .ok_or_else(|| Error::Name(format!("no name registered for index {index}")))
    }

    pub fn has_index(&self, index: usize) -> bool {
        index >= 1 && index <= self.name_of.len()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.index_of.contains_key(name)
    }

    /// A registered name is a first-order variable iff its leading
    /// character is a lowercase letter.
    pub fn is_variable(&self, index: usize) -> bool {
        self.lookup_name(index)
            .ok()
            .and_then(|n| n.chars().next())
            .is_some_and(|c| c.is_lowercase())
    }

    /// A registered name is a constant (vertex) iff its leading character
    /// is an uppercase letter.
    pub fn is_constant(&self, index: usize) -> bool {
        self.lookup_name(index)
            .ok()
            .and_then(|n| n.chars().next())
            .is_some_and(|c| c.is_uppercase())
    }

    pub fn is_aux(&self, index: usize) -> bool {
        self.lookup_name(index)
            .ok()
            .and_then(|n| n.chars().next())
            .is_some_and(|c| c == AUX_PREFIX)
    }

    /// Mints a fresh reserved auxiliary name and registers it.
    pub fn get_aux_index(&mut self) -> usize {
        self.next_aux += 1;
        let name = format!("{AUX_PREFIX}{}", self.next_aux);
        let index = self.name_of.len() + 1;
        self.name_of.push(name.clone());
        self.index_of.insert(name, index);
        index
    }

    /// Drops every registered name. A compilation's `Context` owns one
    /// registry; `clear()` is what a fresh compilation calls (or, more
    /// idiomatically, what dropping the `Context` achieves).
    pub fn clear(&mut self) {
        log::debug!("clearing name registry ({} names)", self.name_of.len());
        self.name_of.clear();
        self.index_of.clear();
        self.next_aux = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// Repeated lookups of the same name return the same index.
    fn lookup_index_is_stable() {
        let mut reg = NameRegistry::new();
        let a = reg.lookup_index("x").unwrap();
        let b = reg.lookup_index("x").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    /// Leading case determines variable vs. constant classification.
    fn classification_by_leading_case() {
        let mut reg = NameRegistry::new();
        let x = reg.lookup_index("x1").unwrap();
        let v = reg.lookup_index("V1").unwrap();
        assert!(reg.is_variable(x) && !reg.is_constant(x));
        assert!(reg.is_constant(v) && !reg.is_variable(v));
    }

    #[test]
    /// A name with a non-alphabetic leading character is rejected.
    fn rejects_forbidden_leading_character() {
        let mut reg = NameRegistry::new();
        assert!(reg.lookup_index("1x").is_err());
        assert!(reg.lookup_index("$1").is_err()); // reserved for get_aux_index only
    }

    #[test]
    /// Auxiliary names never collide with a parsed name and are classified
    /// as neither variable nor constant.
    fn aux_names_are_reserved_and_unique() {
        let mut reg = NameRegistry::new();
        let a1 = reg.get_aux_index();
        let a2 = reg.get_aux_index();
        assert_ne!(a1, a2);
        assert!(reg.is_aux(a1));
        assert!(!reg.is_variable(a1) && !reg.is_constant(a1));
    }

    #[test]
    /// `clear()` drops all registered names.
    fn clear_resets_the_registry() {
        let mut reg = NameRegistry::new();
        reg.lookup_index("x").unwrap();
        reg.clear();
        assert!(!reg.has_name("x"));
        assert_eq!(reg.lookup_index("x").unwrap(), 1);
    }
}
