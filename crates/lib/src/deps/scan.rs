//! Parser for the Makefile rules printed by `cc -M`.
//!
//! ```text
//! a.o: src/a.c include/a.h \
//!   include/with\ space.h
//! ```
//!
//! Only the first rule is used; the compiler prints one rule per source.
//! Physical lines ending in `\` are joined, `\ ` is an escaped space and `$$`
//! is a literal `$`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
  #[error("empty dependency output")]
  Empty,

  #[error("missing ':' separator in rule: {0}")]
  MissingSeparator(String),

  #[error("rule has no target: {0}")]
  MissingTarget(String),

  #[error("rule ends with a dangling line continuation")]
  DanglingContinuation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeRule {
  pub targets: Vec<String>,
  pub deps: Vec<String>,
}

/// Parse the first rule of `cc -M` output.
pub fn parse_rule(output: &str) -> Result<MakeRule, ScanError> {
  let mut lines = output
    .lines()
    .map(|l| l.trim_end_matches('\r'))
    .skip_while(|l| l.trim().is_empty());

  let mut logical = String::new();
  let mut line = lines.next().ok_or(ScanError::Empty)?;
  loop {
    match line.strip_suffix('\\') {
      Some(continued) => {
        logical.push_str(continued);
        logical.push(' ');
        line = lines.next().ok_or(ScanError::DanglingContinuation)?;
      }
      None => {
        logical.push_str(line);
        break;
      }
    }
  }

  let colon = find_separator(&logical).ok_or_else(|| ScanError::MissingSeparator(logical.trim().to_string()))?;
  let targets = tokenize(&logical[..colon]);
  if targets.is_empty() {
    return Err(ScanError::MissingTarget(logical.trim().to_string()));
  }

  Ok(MakeRule {
    targets,
    deps: tokenize(&logical[colon + 1..]),
  })
}

/// Position of the rule separator: a `:` followed by whitespace or the end
/// of the line, which skips drive letters such as `C:\`.
fn find_separator(line: &str) -> Option<usize> {
  let bytes = line.as_bytes();
  bytes.iter().enumerate().find_map(|(i, b)| {
    let at_boundary = bytes.get(i + 1).is_none_or(|next| next.is_ascii_whitespace());
    (*b == b':' && at_boundary).then_some(i)
  })
}

fn tokenize(text: &str) -> Vec<String> {
  let mut tokens = Vec::new();
  let mut current = String::new();
  let mut chars = text.chars().peekable();

  while let Some(ch) = chars.next() {
    match ch {
      '\\' if chars.peek() == Some(&' ') => {
        chars.next();
        current.push(' ');
      }
      '$' if chars.peek() == Some(&'$') => {
        chars.next();
        current.push('$');
      }
      c if c.is_whitespace() => {
        if !current.is_empty() {
          tokens.push(std::mem::take(&mut current));
        }
      }
      c => current.push(c),
    }
  }
  if !current.is_empty() {
    tokens.push(current);
  }
  tokens
}
