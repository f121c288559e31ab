//! Template parsing and substitution for directory settings.
//!
//! Directory settings such as `build/${PLATFORM}/${VARIANTS}/obj` are
//! templates resolved against a variable mapping right before use. A
//! substituted value may itself contain references, so substitution is
//! repeated until no references remain.
//!
//! # Template Formats
//!
//! - `${NAME}` - braced reference
//! - `$NAME` - bare reference, the name runs while characters are `[A-Za-z0-9_]`
//! - `$$` - a literal `$`
//!
//! Any other use of `$` is malformed.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use bslua_lib::template::substitute;
//!
//! let vars = BTreeMap::from([
//!   ("TARGET_TYPE".to_string(), "lib".to_string()),
//!   ("OUT".to_string(), "build/${TARGET_TYPE}".to_string()),
//! ]);
//! assert_eq!(substitute("${OUT}/x", &vars).unwrap(), "build/lib/x");
//! ```

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::consts::MAX_SUBSTITUTION_ROUNDS;

/// A segment of parsed template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no references)
  Literal(String),

  /// A `${NAME}` or `$NAME` reference
  Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("unclosed reference at position {0}")]
  Unclosed(usize),

  #[error("malformed reference at position {0}")]
  Malformed(usize),

  #[error("unresolved variable: {0}")]
  Unresolved(String),

  #[error("substitution of '{0}' does not converge")]
  Divergent(String),
}

/// Source of variable values during substitution.
pub trait Resolver {
  fn resolve(&self, name: &str) -> Option<&str>;
}

impl Resolver for BTreeMap<String, String> {
  fn resolve(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

impl Resolver for HashMap<String, String> {
  fn resolve(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

fn is_name_start(ch: char) -> bool {
  ch.is_ascii_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
  ch.is_ascii_alphanumeric() || ch == '_'
}

/// Parse a template into literal and variable segments.
///
/// # Errors
///
/// Returns an error for an unclosed `${`, an empty or invalid name, or a `$`
/// followed by anything other than `$`, `{` or a name.
pub fn parse(input: &str) -> Result<Vec<Segment>, TemplateError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek().copied() {
      Some((_, '$')) => {
        chars.next();
        literal.push('$');
      }
      Some((_, '{')) => {
        chars.next();
        let mut name = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          name.push(c);
        }
        if !found_close {
          return Err(TemplateError::Unclosed(pos));
        }
        if !name.starts_with(is_name_start) || !name.chars().all(is_name_char) {
          return Err(TemplateError::Malformed(pos));
        }
        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Variable(name));
      }
      Some((_, c)) if is_name_start(c) => {
        let mut name = String::new();
        while let Some((_, c)) = chars.peek().copied() {
          if !is_name_char(c) {
            break;
          }
          name.push(c);
          chars.next();
        }
        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Variable(name));
      }
      _ => return Err(TemplateError::Malformed(pos)),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Join segments back into text. With `escape` set, literal `$` is written
/// back as `$$` so the result can be parsed again.
fn render(segments: Vec<Segment>, resolver: &impl Resolver, escape: bool) -> Result<String, TemplateError> {
  let mut out = String::new();
  for segment in segments {
    match segment {
      Segment::Literal(text) if escape => out.push_str(&text.replace('$', "$$")),
      Segment::Literal(text) => out.push_str(&text),
      Segment::Variable(name) => {
        let value = resolver.resolve(&name).ok_or(TemplateError::Unresolved(name))?;
        out.push_str(value);
      }
    }
  }
  Ok(out)
}

/// Substitute repeatedly until no references remain.
///
/// Escapes are only unfolded in the final round, so `$$` always yields a
/// literal `$` no matter how deeply it was nested.
///
/// # Errors
///
/// Fails on malformed or unresolved references, and on templates that keep
/// producing new references without converging.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, TemplateError> {
  let mut current = input.to_string();
  for _ in 0..MAX_SUBSTITUTION_ROUNDS {
    let segments = parse(&current)?;
    if !segments.iter().any(|s| matches!(s, Segment::Variable(_))) {
      return render(segments, resolver, false);
    }
    current = render(segments, resolver, true)?;
  }
  Err(TemplateError::Divergent(input.to_string()))
}

/// Substitute every element of a list.
pub fn substitute_all(inputs: &[String], resolver: &impl Resolver) -> Result<Vec<String>, TemplateError> {
  inputs.iter().map(|s| substitute(s, resolver)).collect()
}

/// Replace `${NAME}` in a naming format with a concrete name.
///
/// Only the `${NAME}` token is touched, so names containing `$` survive.
pub fn format_name(format: &str, name: &str) -> String {
  format.replace("${NAME}", name)
}
