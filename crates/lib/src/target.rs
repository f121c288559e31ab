//! Declared build targets.
//!
//! Targets are immutable once declared. A target's inputs can only name
//! targets declared before it, so the input graph is acyclic by construction.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::env::Environment;
use crate::error::BuildError;
use crate::settings::SharedSettings;
use crate::variant::Variant;

/// Variant tag selecting a shared library.
pub const SHARED_TAG: &str = "shared";

/// Identity of a declared target, unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
  Library {
    /// Define added while compiling a shared build, such as `CORE_SHARED`.
    shared_define: Option<String>,
  },
  Application,
}

#[derive(Debug, Clone)]
pub enum Input {
  Source(String),
  Target(Rc<Target>),
}

#[derive(Debug)]
pub struct Target {
  pub id: TargetId,
  pub name: String,
  pub kind: TargetKind,
  pub inputs: Vec<Input>,
  /// Artifact base name; defaults to `name`.
  pub output: Option<String>,
  /// Own settings; `None` uses the process-wide defaults.
  pub settings: Option<SharedSettings>,
  pub variant: Variant,
  /// Context the target was declared in.
  pub env: Environment,
}

impl Target {
  pub fn output_name(&self) -> &str {
    self.output.as_deref().unwrap_or(&self.name)
  }

  pub fn is_library(&self) -> bool {
    matches!(self.kind, TargetKind::Library { .. })
  }

  /// Value of the `TARGET_TYPE` template variable.
  pub fn type_tag(&self) -> &'static str {
    match self.kind {
      TargetKind::Library { .. } => "lib",
      TargetKind::Application => "app",
    }
  }

  /// Progress label printed before each command.
  pub fn label(&self) -> String {
    match self.kind {
      TargetKind::Library { .. } => format!("<Lib:{}>", self.name),
      TargetKind::Application => format!("<App:{}>", self.name),
    }
  }

  /// The process-wide default variant combined with the target's own tags.
  pub fn effective_variant(&self, defaults: &Variant) -> Variant {
    defaults.union(&self.variant)
  }

  pub fn is_shared(&self, defaults: &Variant) -> bool {
    self.is_library() && self.effective_variant(defaults).contains(SHARED_TAG)
  }

  pub fn sources(&self) -> impl Iterator<Item = &str> {
    self.inputs.iter().filter_map(|input| match input {
      Input::Source(path) => Some(path.as_str()),
      Input::Target(_) => None,
    })
  }

  /// Directly nested targets, in declaration order.
  pub fn subtargets(&self) -> impl Iterator<Item = &Rc<Target>> {
    self.inputs.iter().filter_map(|input| match input {
      Input::Target(t) => Some(t),
      Input::Source(_) => None,
    })
  }

  /// Every transitively nested target, each once, depth first.
  pub fn all_subtargets(&self) -> Vec<Rc<Target>> {
    let mut seen = Vec::new();
    collect_subtargets(self, &mut seen);
    seen
  }

  /// Every library linked into this target, dependents before their
  /// dependencies, so static archives resolve in a single pass.
  pub fn link_order(&self) -> Vec<Rc<Target>> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let subs: Vec<&Rc<Target>> = self.subtargets().collect();
    for sub in subs.into_iter().rev() {
      post_order(sub, &mut visited, &mut order);
    }
    order.reverse();
    order
  }
}

fn post_order(target: &Rc<Target>, visited: &mut HashSet<TargetId>, order: &mut Vec<Rc<Target>>) {
  if !visited.insert(target.id) {
    return;
  }
  let subs: Vec<&Rc<Target>> = target.subtargets().collect();
  for sub in subs.into_iter().rev() {
    post_order(sub, visited, order);
  }
  order.push(target.clone());
}

fn collect_subtargets(target: &Target, seen: &mut Vec<Rc<Target>>) {
  for sub in target.subtargets() {
    if seen.iter().any(|t| t.id == sub.id) {
      continue;
    }
    seen.push(sub.clone());
    collect_subtargets(sub, seen);
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.label())
  }
}

/// A target as written in a description file, before registration.
#[derive(Debug, Clone)]
pub struct TargetDecl {
  pub name: String,
  pub kind: TargetKind,
  pub inputs: Vec<Input>,
  pub output: Option<String>,
  pub settings: Option<SharedSettings>,
  pub variant: Variant,
}

impl TargetDecl {
  pub fn library(name: impl Into<String>) -> Self {
    Self::new(name, TargetKind::Library { shared_define: None })
  }

  pub fn application(name: impl Into<String>) -> Self {
    Self::new(name, TargetKind::Application)
  }

  fn new(name: impl Into<String>, kind: TargetKind) -> Self {
    Self {
      name: name.into(),
      kind,
      inputs: Vec::new(),
      output: None,
      settings: None,
      variant: Variant::new(),
    }
  }

  pub fn source(mut self, path: impl Into<String>) -> Self {
    self.inputs.push(Input::Source(path.into()));
    self
  }

  pub fn input(mut self, target: Rc<Target>) -> Self {
    self.inputs.push(Input::Target(target));
    self
  }

  pub fn settings(mut self, settings: SharedSettings) -> Self {
    self.settings = Some(settings);
    self
  }

  pub fn variant(mut self, variant: impl Into<Variant>) -> Self {
    self.variant.add(variant);
    self
  }

  pub fn output(mut self, output: impl Into<String>) -> Self {
    self.output = Some(output.into());
    self
  }

  pub fn shared_define(mut self, define: impl Into<String>) -> Self {
    if let TargetKind::Library { shared_define } = &mut self.kind {
      *shared_define = Some(define.into());
    }
    self
  }
}

/// Every target declared during a run, addressable by name.
#[derive(Debug, Default)]
pub struct Registry {
  targets: Vec<Rc<Target>>,
  by_name: BTreeMap<String, usize>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a declaration made in `env`.
  ///
  /// Redeclaring a name replaces the earlier entry for lookups; targets that
  /// already reference the earlier one keep it.
  pub fn declare(&mut self, decl: TargetDecl, env: Environment) -> Result<Rc<Target>, BuildError> {
    if decl.name.is_empty() {
      return Err(BuildError::config("target name cannot be empty"));
    }
    if let Some(bad) = decl.inputs.iter().find_map(|input| match input {
      Input::Target(t) if !t.is_library() => Some(t.name.clone()),
      _ => None,
    }) {
      return Err(BuildError::config(format!(
        "target '{}': only libraries can be used as inputs, '{}' is an application",
        decl.name, bad
      )));
    }

    let target = Rc::new(Target {
      id: TargetId(self.targets.len()),
      name: decl.name,
      kind: decl.kind,
      inputs: decl.inputs,
      output: decl.output,
      settings: decl.settings,
      variant: decl.variant,
      env,
    });

    if self
      .by_name
      .insert(target.name.clone(), self.targets.len())
      .is_some()
    {
      warn!(name = %target.name, "target redeclared, the latest declaration wins");
    }
    self.targets.push(target.clone());
    Ok(target)
  }

  pub fn get(&self, name: &str) -> Option<&Rc<Target>> {
    self.by_name.get(name).map(|&index| &self.targets[index])
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Rc<Target>> {
    self.targets.iter()
  }
}
