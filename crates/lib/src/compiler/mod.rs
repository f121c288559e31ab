//! Compiler abstraction: turns declared targets into toolchain invocations.
//!
//! The [`Compiler`] owns everything a build needs across targets: the
//! toolchain description, the process-wide default settings and variant, the
//! execution context stack, the dependency cache and the timestamp checker.
//! Building a target first builds its nested libraries (once per run), then
//! compiles each source whose dependencies changed, then archives or links
//! when any object, library or the description file itself is newer than the
//! artifact.

pub mod actions;
pub mod language;
pub mod toolchain;

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path};
use std::rc::Rc;

use tracing::{debug, error, info, warn};

pub use language::Language;
pub use toolchain::{Family, LinkKind, NamingFormats, Toolchain};

use crate::deps::{CacheEntry, DependencyCache, TimestampChecker, parse_rule};
use crate::env::{EnvStack, Environment, join_path, path_to_reach};
use crate::error::BuildError;
use crate::exec::{Capture, FileManager, Task, TaskOutput, TaskRunner};
use crate::platform::PlatformInfo;
use crate::settings::{Settings, SharedSettings};
use crate::target::{SHARED_TAG, Target, TargetId, TargetKind};
use crate::template::{format_name, substitute, substitute_all};
use crate::variant::Variant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
  /// Print commands instead of running them.
  pub dry_run: bool,
  /// Trust cached dependency lists and skip nested targets.
  pub fast: bool,
  pub verbose: u8,
}

/// Outcome of building one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
  UpToDate,
  Rebuilt,
  /// The toolchain reported an error for this target or one of its inputs.
  Failed,
}

impl TargetStatus {
  pub fn is_failed(self) -> bool {
    self == Self::Failed
  }

  pub fn is_changed(self) -> bool {
    self == Self::Rebuilt
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
  pub objects_compiled: usize,
  pub dependency_scans: usize,
  pub artifacts_linked: usize,
  pub up_to_date_targets: usize,
  pub failed_targets: usize,
}

/// A library as seen from a target linking against it.
#[derive(Debug, Clone)]
struct LinkedLibrary {
  name: String,
  /// Library directory, reachable from the linking target's directory.
  dir: String,
  /// Artifact path, reachable from the linking target's directory.
  file: String,
}

pub struct Compiler {
  options: BuildOptions,
  toolchain: Toolchain,
  defaults: SharedSettings,
  default_variant: Variant,
  envs: EnvStack,
  cache: DependencyCache,
  checker: TimestampChecker,
  runner: Box<dyn TaskRunner>,
  files: FileManager,
  built: HashMap<TargetId, TargetStatus>,
  failed: Vec<String>,
  stats: BuildStats,
}

/// Source path without its extension, reduced to plain components so the
/// object always lands inside the object directory.
fn object_stem(source: &str) -> String {
  let stem = Path::new(source).with_extension("");
  let parts: Vec<String> = stem
    .components()
    .filter_map(|c| match c {
      Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
      _ => None,
    })
    .collect();
  parts.join("/")
}

fn parent_dir(path: &str) -> &Path {
  Path::new(path).parent().unwrap_or(Path::new(""))
}

impl Compiler {
  pub fn new(toolchain: Toolchain, options: BuildOptions, root: Environment, runner: Box<dyn TaskRunner>) -> Self {
    Self {
      files: FileManager::new(options.dry_run),
      options,
      toolchain,
      defaults: Settings::standard().into_shared(),
      default_variant: Variant::new(),
      envs: EnvStack::new(root),
      cache: DependencyCache::new(),
      checker: TimestampChecker::new(),
      runner,
      built: HashMap::new(),
      failed: Vec::new(),
      stats: BuildStats::default(),
    }
  }

  pub fn options(&self) -> BuildOptions {
    self.options
  }

  pub fn toolchain(&self) -> &Toolchain {
    &self.toolchain
  }

  pub fn platform(&self) -> &PlatformInfo {
    &self.toolchain.platform
  }

  /// The process-wide default settings, shared with description files.
  pub fn defaults(&self) -> &SharedSettings {
    &self.defaults
  }

  pub fn default_variant(&self) -> &Variant {
    &self.default_variant
  }

  pub fn set_default_variant(&mut self, variant: Variant) {
    self.default_variant = variant;
  }

  pub fn envs(&self) -> &EnvStack {
    &self.envs
  }

  pub fn envs_mut(&mut self) -> &mut EnvStack {
    &mut self.envs
  }

  pub fn files(&self) -> &FileManager {
    &self.files
  }

  pub fn stats(&self) -> BuildStats {
    self.stats
  }

  /// Names of targets that failed during this run, in failure order.
  pub fn failed_targets(&self) -> &[String] {
    &self.failed
  }

  /// Record a failure reported outside of [`Compiler::build`], such as an
  /// external project step.
  pub fn record_failure(&mut self, name: impl Into<String>) {
    self.failed.push(name.into());
    self.stats.failed_targets += 1;
  }

  pub fn submit(&mut self, task: &Task, capture: Capture) -> Result<TaskOutput, BuildError> {
    self.runner.submit(task, capture)
  }

  /// Flush the dependency cache. Nothing is written in dry-run mode.
  pub fn save_cache(&mut self) -> Result<usize, BuildError> {
    if self.options.dry_run {
      return Ok(0);
    }
    Ok(self.cache.save_all()?)
  }

  /// Template variables for a target and variant.
  pub fn mapping(&self, target: &Target, variant: &Variant, target_type: &str) -> BTreeMap<String, String> {
    let platform = self.platform();
    BTreeMap::from([
      ("TARGET_NAME".to_string(), target.name.clone()),
      ("TARGET_TYPE".to_string(), target_type.to_string()),
      ("PLATFORM".to_string(), platform.platform.as_str().to_string()),
      ("PLATFORM_FLAVOR".to_string(), platform.flavor.as_str().to_string()),
      ("PLATFORM_VERSION".to_string(), platform.version.clone().unwrap_or_default()),
      ("PLATFORM_ARCH".to_string(), platform.arch.as_str().to_string()),
      ("VARIANTS".to_string(), Toolchain::variants_label(variant)),
    ])
  }

  fn settings_of(&self, target: &Target) -> Settings {
    match &target.settings {
      Some(own) => own.borrow().clone(),
      None => self.defaults.borrow().clone(),
    }
  }

  /// Build a target and, first, every library it uses.
  ///
  /// Each target is built at most once per run; later calls return the
  /// recorded status. The target's execution context is pushed for the
  /// duration and popped on every exit path.
  pub fn build(&mut self, target: &Rc<Target>) -> Result<TargetStatus, BuildError> {
    if let Some(status) = self.built.get(&target.id) {
      debug!(target = %target.name, ?status, "already built");
      return Ok(*status);
    }

    self.envs.push(target.env.clone());
    let result = self.make(target);
    self.envs.pop();
    let status = result?;

    match status {
      TargetStatus::Failed => {
        error!(target = %target.name, "target failed");
        self.record_failure(target.name.clone());
      }
      TargetStatus::UpToDate => {
        info!(target = %target.name, "up to date");
        self.stats.up_to_date_targets += 1;
      }
      TargetStatus::Rebuilt => info!(target = %target.name, "rebuilt"),
    }
    self.built.insert(target.id, status);
    Ok(status)
  }

  fn make(&mut self, target: &Rc<Target>) -> Result<TargetStatus, BuildError> {
    let mut settings = self.settings_of(target);
    let variant = target.effective_variant(&self.default_variant);
    info!(target = %target.name, %variant, env = %target.env.path.display(), "building");

    match &target.kind {
      TargetKind::Library { shared_define } => {
        if variant.contains(SHARED_TAG) {
          match shared_define {
            Some(define) => settings.define(define.clone(), None),
            None => {
              return Err(BuildError::config(format!(
                "library '{}' is marked as shared but has no shared_define value",
                target.name
              )));
            }
          }
        }
        self.compile_library(target, &settings, &variant)
      }
      TargetKind::Application => self.compile_application(target, &settings, &variant),
    }
  }

  /// Build every nested target and combine their statuses.
  fn build_subtargets(&mut self, target: &Target) -> Result<TargetStatus, BuildError> {
    let subs: Vec<Rc<Target>> = target.subtargets().cloned().collect();
    if subs.is_empty() {
      return Ok(TargetStatus::UpToDate);
    }
    if self.options.fast {
      for sub in &subs {
        println!("Skipping subtarget: {}", sub.name);
      }
      warn!(target = %target.name, "build may be incomplete");
      return Ok(TargetStatus::UpToDate);
    }

    let mut combined = TargetStatus::UpToDate;
    for sub in &subs {
      match self.build(sub)? {
        TargetStatus::Failed => combined = TargetStatus::Failed,
        TargetStatus::Rebuilt if combined != TargetStatus::Failed => combined = TargetStatus::Rebuilt,
        _ => {}
      }
    }
    Ok(combined)
  }

  /// Locate a source file relative to the target, trying each source path in
  /// turn when it is not found as given.
  fn find_source(&self, dir: &Path, source: &str, source_paths: &[String]) -> Result<String, BuildError> {
    if dir.join(source).is_file() {
      return Ok(source.to_string());
    }
    for search in source_paths {
      let candidate = join_path(search, source);
      if dir.join(&candidate).is_file() {
        return Ok(candidate);
      }
    }
    let mut searched = vec![dir.display().to_string()];
    searched.extend(source_paths.iter().cloned());
    Err(BuildError::MissingInput {
      input: source.to_string(),
      searched: searched.join(", "),
    })
  }

  fn object_path(&self, target: &Target, source: &str, settings: &Settings, variant: &Variant) -> Result<String, BuildError> {
    let mapping = self.mapping(target, variant, "obj");
    let defaults = self.defaults.borrow();
    let obj_dir = substitute(&settings.intermediate_dir_for_objects(&defaults), &mapping)?;
    let object = format_name(self.toolchain.formats.object, &object_stem(source));
    Ok(join_path(&obj_dir, &object))
  }

  /// Compile one source of `target` unless its object is current.
  ///
  /// Returns the object path (relative to the target's directory), or `None`
  /// when the compiler reported an error.
  pub fn compile_object(
    &mut self,
    target: &Target,
    source: &str,
    settings: &Settings,
    variant: &Variant,
  ) -> Result<Option<String>, BuildError> {
    let dir = target.env.real_path.clone();
    let mapping = self.mapping(target, variant, "obj");
    let language = Language::from_path(source)?;
    let include_paths = substitute_all(&settings.include_paths, &mapping)?;
    let source_paths = substitute_all(&settings.source_paths, &mapping)?;
    let input = self.find_source(&dir, source, &source_paths)?;
    let object = self.object_path(target, source, settings, variant)?;

    let defines = Toolchain::define_flags(&settings.defines);
    let includes = Toolchain::include_flags(&include_paths);
    let (deps, invalidated) = self.object_dependencies(target, &input, &object, language, &defines, &includes)?;

    // An object whose recorded dependencies no longer hold is rebuilt even
    // when the rescanned list looks current.
    if !invalidated && !self.checker.is_stale(&dir, &object, &deps) {
      debug!(object = %object, "object is current");
      return Ok(Some(object));
    }

    self.files.mkdir(&dir.join(parent_dir(&object)))?;
    let language_flags = if language.is_cxx_family() {
      &settings.cxxflags
    } else {
      &settings.cflags
    };
    let task = Task::from_argv(self.toolchain.driver(language).to_vec(), &dir)?
      .args(self.toolchain.compile_flags(variant, language))
      .args(["-c", "-o"])
      .arg(&object)
      .arg(&input)
      .args(defines)
      .args(includes)
      .args(language_flags.iter().cloned())
      .label(target.label());

    let output = self.runner.submit(&task, Capture::Inherit)?;
    if !output.success {
      error!(source = %input, code = ?output.code, "compilation failed");
      return Ok(None);
    }
    self.checker.forget(&dir, &object);
    self.stats.objects_compiled += 1;
    Ok(Some(object))
  }

  /// Dependencies of an object, from the cache when it can be trusted.
  ///
  /// The flag is set when a cached entry existed but failed validation.
  fn object_dependencies(
    &mut self,
    target: &Target,
    input: &str,
    object: &str,
    language: Language,
    defines: &[String],
    includes: &[String],
  ) -> Result<(Vec<String>, bool), BuildError> {
    let dir = target.env.real_path.clone();
    let cached = self.cache.get(&dir, object).map(|entry| entry.deps.clone());
    let invalidated = cached.is_some();

    match cached {
      Some(deps) if self.options.fast => {
        debug!(object, "fast mode, trusting cached dependencies");
        return Ok((deps, false));
      }
      Some(deps) => {
        if !self.checker.is_stale(&dir, object, &deps) {
          debug!(object, "cache did the job");
          return Ok((deps, false));
        }
        if self.options.dry_run {
          return Ok((deps, true));
        }
        debug!(object, "cached dependencies outdated, regenerating");
      }
      None if self.options.dry_run => {
        let mut deps = vec![input.to_string()];
        deps.extend(target.env.filename.clone());
        return Ok((deps, false));
      }
      None => debug!(object, "cache didn't know about it, regenerating"),
    }

    let deps = self.scan_dependencies(target, input, language, defines, includes)?;
    self.cache.set(
      &dir,
      object,
      CacheEntry {
        output: object.to_string(),
        deps: deps.clone(),
      },
    );
    Ok((deps, invalidated))
  }

  /// Ask the compiler for the Makefile rule of `input`.
  fn scan_dependencies(
    &mut self,
    target: &Target,
    input: &str,
    language: Language,
    defines: &[String],
    includes: &[String],
  ) -> Result<Vec<String>, BuildError> {
    let task = Task::from_argv(self.toolchain.driver(language).to_vec(), &target.env.real_path)?
      .arg("-M")
      .arg(input)
      .args(defines.iter().cloned())
      .args(includes.iter().cloned())
      .label(target.label());

    let output = self.runner.submit(&task, Capture::Stdout)?;
    self.stats.dependency_scans += 1;
    if !output.success {
      return Err(BuildError::DependencyScan {
        input: input.to_string(),
        reason: format!(
          "'{}' exited with {} (run in '{}')",
          task,
          output.code.map_or("a signal".to_string(), |c| format!("status {}", c)),
          target.env.path.display()
        ),
      });
    }

    let rule = parse_rule(&output.stdout).map_err(|e| BuildError::DependencyScan {
      input: input.to_string(),
      reason: e.to_string(),
    })?;
    let mut deps = rule.deps;
    deps.extend(target.env.filename.clone());
    deps.sort();
    deps.dedup();
    debug!(input, count = deps.len(), "scanned dependencies");
    Ok(deps)
  }

  /// Compile every source of `target`, stopping at the first failure.
  fn compile_sources(&mut self, target: &Target, settings: &Settings, variant: &Variant) -> Result<Option<Vec<String>>, BuildError> {
    let sources: Vec<String> = target.sources().map(String::from).collect();
    let mut objects = Vec::with_capacity(sources.len());
    for source in &sources {
      match self.compile_object(target, source, settings, variant)? {
        Some(object) => objects.push(object),
        None => return Ok(None),
      }
    }
    Ok(Some(objects))
  }

  /// Libraries linked into `target`, with paths usable from its directory.
  fn linked_libraries(&self, target: &Target) -> Result<Vec<LinkedLibrary>, BuildError> {
    let mut libs = Vec::new();
    for lib in target.link_order() {
      let prefix = path_to_reach(&target.env.real_path, &lib.env.real_path);
      let dir = join_path(&prefix, &self.library_dir_path(&lib)?);
      let file = join_path(&prefix, &self.library_file_path(&lib)?);
      libs.push(LinkedLibrary {
        name: lib.output_name().to_string(),
        dir,
        file,
      });
    }
    Ok(libs)
  }

  /// Build a library: nested targets, objects, then the archive or shared object.
  pub fn compile_library(&mut self, target: &Rc<Target>, settings: &Settings, variant: &Variant) -> Result<TargetStatus, BuildError> {
    let kind = if variant.contains(SHARED_TAG) {
      LinkKind::SharedLibrary
    } else {
      LinkKind::StaticLibrary
    };
    self.compile_and_link(target, settings, variant, kind)
  }

  /// Build an application: nested libraries, objects, then the executable.
  pub fn compile_application(&mut self, target: &Rc<Target>, settings: &Settings, variant: &Variant) -> Result<TargetStatus, BuildError> {
    self.compile_and_link(target, settings, variant, LinkKind::Application)
  }

  fn compile_and_link(
    &mut self,
    target: &Rc<Target>,
    settings: &Settings,
    variant: &Variant,
    kind: LinkKind,
  ) -> Result<TargetStatus, BuildError> {
    let sub_status = self.build_subtargets(target)?;
    if sub_status.is_failed() {
      return Ok(TargetStatus::Failed);
    }

    let Some(objects) = self.compile_sources(target, settings, variant)? else {
      return Ok(TargetStatus::Failed);
    };

    let dir = target.env.real_path.clone();
    let output = match kind {
      LinkKind::Application => self.application_file_path(target)?,
      _ => self.library_file_path(target)?,
    };
    let libs = if kind == LinkKind::StaticLibrary {
      Vec::new()
    } else {
      self.linked_libraries(target)?
    };

    let mut deps = objects.clone();
    deps.extend(libs.iter().map(|lib| lib.file.clone()));
    deps.extend(target.env.filename.clone());
    let stale = sub_status.is_changed() || self.checker.is_stale(&dir, &output, &deps);
    if !stale {
      return Ok(TargetStatus::UpToDate);
    }

    self.files.mkdir(&dir.join(parent_dir(&output)))?;
    let task = self.link_task(target, settings, variant, kind, &output, &objects, &libs)?;
    let result = self.runner.submit(&task, Capture::Inherit)?;
    if !result.success {
      error!(target = %target.name, output = %output, code = ?result.code, "link failed");
      return Ok(TargetStatus::Failed);
    }
    self.checker.forget(&dir, &output);
    self.stats.artifacts_linked += 1;
    Ok(TargetStatus::Rebuilt)
  }

  #[allow(clippy::too_many_arguments)]
  fn link_task(
    &self,
    target: &Target,
    settings: &Settings,
    variant: &Variant,
    kind: LinkKind,
    output: &str,
    objects: &[String],
    libs: &[LinkedLibrary],
  ) -> Result<Task, BuildError> {
    let dir = &target.env.real_path;
    if kind == LinkKind::StaticLibrary {
      return Ok(
        Task::from_argv(self.toolchain.archiver().to_vec(), dir)?
          .arg("rcs")
          .arg(output)
          .args(objects.iter().cloned())
          .label(target.label()),
      );
    }

    let language = Language::dominant(target.sources())?;
    let mut task = Task::from_argv(self.toolchain.driver(language).to_vec(), dir)?
      .args(self.toolchain.link_flags(variant, kind));
    if kind == LinkKind::SharedLibrary {
      task = task
        .args(self.toolchain.formats.shared_library_flags.iter().copied())
        .args(["-o", output])
        .args(
          self
            .toolchain
            .import_library_flags(&parent_dir(output).to_string_lossy(), target.output_name()),
        );
    } else {
      task = task.args(["-o", output]);
    }
    task = task.args(objects.iter().cloned());
    for lib in libs {
      task = task.args(Toolchain::library_flags(&lib.dir, &lib.name));
    }
    Ok(
      task
        .args(settings.ldflags.iter().cloned())
        .args(self.toolchain.framework_flags(&settings.frameworks))
        .label(target.label()),
    )
  }

  /// Delete the intermediate objects of a target, optionally those of every
  /// nested target too. Returns how many files were removed.
  pub fn clean(&mut self, target: &Rc<Target>, recursive: bool) -> Result<usize, BuildError> {
    let dir = target.env.real_path.clone();
    let settings = self.settings_of(target);
    let variant = target.effective_variant(&self.default_variant);

    let mut removed = 0;
    let sources: Vec<String> = target.sources().map(String::from).collect();
    for source in &sources {
      let object = self.object_path(target, source, &settings, &variant)?;
      if self.files.delete_pruning_empty_dirs(&dir.join(&object), &dir)? {
        removed += 1;
      }
      self.checker.forget(&dir, &object);
    }
    self.built.remove(&target.id);
    debug!(target = %target.name, removed, "cleaned");

    if recursive {
      for sub in target.all_subtargets() {
        removed += self.clean(&sub, false)?;
      }
    }
    Ok(removed)
  }

  /// Directory a library is written to, relative to its own directory.
  pub fn library_dir_path(&self, lib: &Target) -> Result<String, BuildError> {
    let variant = lib.effective_variant(&self.default_variant);
    let mapping = self.mapping(lib, &variant, "lib");
    let settings = self.settings_of(lib);
    let defaults = self.defaults.borrow();
    Ok(substitute(&settings.destination_dir_for_libraries(&defaults), &mapping)?)
  }

  /// Library artifact path, relative to the library's own directory.
  pub fn library_file_path(&self, lib: &Target) -> Result<String, BuildError> {
    let shared = lib.is_shared(&self.default_variant);
    let file = self.toolchain.formats.library_file(lib.output_name(), shared);
    Ok(join_path(&self.library_dir_path(lib)?, &file))
  }

  /// Executable path, relative to the application's own directory.
  pub fn application_file_path(&self, app: &Target) -> Result<String, BuildError> {
    let variant = app.effective_variant(&self.default_variant);
    let mapping = self.mapping(app, &variant, "app");
    let settings = self.settings_of(app);
    let defaults = self.defaults.borrow();
    let dir = substitute(&settings.destination_dir_for_executables(&defaults), &mapping)?;
    Ok(join_path(&dir, &format_name(self.toolchain.formats.application, app.output_name())))
  }
}
