//! Symbol table for local variables.
//!
//! There is a single flat frame for the whole program. Variables are named
//! by a single character. A variable is defined by its first use and keeps
//! the same `rbp`-relative offset for the rest of the compilation.

use tracing::trace;

/// Size of one stack slot in bytes.
pub const WORD_SIZE: i64 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
  pub name: String,
  /// Distance below `rbp`, always a positive multiple of [`WORD_SIZE`].
  pub offset: i64,
}

/// Locals in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Locals {
  vars: Vec<LocalVar>,
}

impl Locals {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn find(&self, name: &str) -> Option<&LocalVar> {
    self.vars.iter().find(|var| var.name == name)
  }

  /// Offset of `name`, allocating the next slot on first sight.
  pub fn resolve(&mut self, name: &str) -> i64 {
    if let Some(var) = self.find(name) {
      return var.offset;
    }

    let offset = (self.vars.len() as i64 + 1) * WORD_SIZE;
    trace!(name, offset, "allocated local");
    self.vars.push(LocalVar {
      name: name.to_string(),
      offset,
    });
    offset
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &LocalVar> {
    self.vars.iter()
  }

  /// Bytes needed to hold every local, before any alignment.
  pub fn frame_size(&self) -> i64 {
    self.vars.len() as i64 * WORD_SIZE
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn offsets_grow_by_a_word_in_first_seen_order() {
    let mut locals = Locals::new();
    assert_eq!(locals.resolve("b"), 8);
    assert_eq!(locals.resolve("a"), 16);
    assert_eq!(locals.resolve("z"), 24);
    let names: Vec<_> = locals.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["b", "a", "z"]);
  }

  #[test]
  fn re_resolving_keeps_the_original_offset() {
    let mut locals = Locals::new();
    locals.resolve("x");
    locals.resolve("y");
    assert_eq!(locals.resolve("x"), 8);
    assert_eq!(locals.resolve("y"), 16);
    assert_eq!(locals.len(), 2);
  }

  #[test]
  fn frame_size_counts_every_slot() {
    let mut locals = Locals::new();
    assert!(locals.is_empty());
    assert_eq!(locals.frame_size(), 0);
    for name in ["a", "b", "c"] {
      locals.resolve(name);
    }
    assert_eq!(locals.frame_size(), 24);
    assert_eq!(locals.find("c").map(|v| v.offset), Some(24));
    assert!(locals.find("d").is_none());
  }
}
