//! Build variants.
//!
//! A variant is an unordered set of tags (`debug`, `shared`, `multi-thread`,
//! ...) that selects compile and link flavors. Combining variants is a set
//! union, so the order in which tags are added never matters.

use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Variant {
  tags: BTreeSet<String>,
}

impl Variant {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a single tag, a list of tags, or every tag of another variant.
  pub fn add(&mut self, tags: impl Into<Variant>) -> &mut Self {
    self.tags.extend(tags.into().tags);
    self
  }

  /// Builder form of [`Variant::add`].
  pub fn with(mut self, tags: impl Into<Variant>) -> Self {
    self.add(tags);
    self
  }

  pub fn contains(&self, tag: &str) -> bool {
    self.tags.contains(tag)
  }

  /// Remove a tag if present. Removing an absent tag is a no-op.
  pub fn discard(&mut self, tag: &str) {
    self.tags.remove(tag);
  }

  pub fn union(&self, other: &Variant) -> Variant {
    Variant {
      tags: self.tags.union(&other.tags).cloned().collect(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.tags.is_empty()
  }

  pub fn len(&self) -> usize {
    self.tags.len()
  }

  /// Tags in sorted order.
  pub fn tags(&self) -> impl Iterator<Item = &str> {
    self.tags.iter().map(String::as_str)
  }
}

impl fmt::Display for Variant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let tags: Vec<&str> = self.tags().collect();
    write!(f, "Variant[{}]", tags.join(", "))
  }
}

impl From<&str> for Variant {
  fn from(tag: &str) -> Self {
    Self {
      tags: BTreeSet::from([tag.to_string()]),
    }
  }
}

impl From<String> for Variant {
  fn from(tag: String) -> Self {
    Self {
      tags: BTreeSet::from([tag]),
    }
  }
}

impl<S: Into<String>> From<Vec<S>> for Variant {
  fn from(tags: Vec<S>) -> Self {
    tags.into_iter().map(Into::into).collect()
  }
}

impl From<&[&str]> for Variant {
  fn from(tags: &[&str]) -> Self {
    tags.iter().copied().map(String::from).collect()
  }
}

impl From<&Variant> for Variant {
  fn from(other: &Variant) -> Self {
    other.clone()
  }
}

impl FromIterator<String> for Variant {
  fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
    Self {
      tags: iter.into_iter().collect(),
    }
  }
}
