//! Shared helpers for library integration tests.
//!
//! [`FakeToolchain`] stands in for gcc and ar: it answers `-M` scans from a
//! table of headers and "produces" objects, archives and executables by
//! writing files. Every file written by a test or by the fake gets a
//! modification time from one shared [`Clock`], so staleness decisions never
//! depend on filesystem timestamp resolution.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use bslua_lib::BuildError;
use bslua_lib::compiler::{BuildOptions, Compiler, Toolchain};
use bslua_lib::env::Environment;
use bslua_lib::exec::{Capture, Task, TaskOutput, TaskRunner};
use bslua_lib::platform::{Flavor, PlatformInfo};

/// Monotonic fake time, in seconds after a fixed epoch.
#[derive(Debug, Clone, Default)]
pub struct Clock(Rc<Cell<u64>>);

impl Clock {
  pub fn tick(&self) -> u64 {
    let next = self.0.get() + 10;
    self.0.set(next);
    next
  }
}

/// Write `content` to `path` (creating parents) and stamp it at `secs`.
pub fn write_stamped(path: &Path, content: &str, secs: u64) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
  stamp(path, secs);
}

pub fn stamp(path: &Path, secs: u64) {
  let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
  let file = File::options().write(true).open(path).unwrap();
  file.set_modified(base + Duration::from_secs(secs)).unwrap();
}

/// A temporary source tree.
pub struct Project {
  _temp: TempDir,
  pub root: PathBuf,
  pub clock: Clock,
}

impl Project {
  /// An empty project holding only a `BSFile`.
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let root = dunce::canonicalize(temp.path()).unwrap();
    let project = Self {
      _temp: temp,
      root,
      clock: Clock::default(),
    };
    project.write("BSFile", "-- build description\n");
    project
  }

  /// The library/application example tree: `core` from `a.c` and `b.c`
  /// (`a.c` includes `core.h`), `app` from `main.c`.
  pub fn core_app() -> Self {
    let project = Self::new();
    project.write("core.h", "int a(void);\n");
    project.write("a.c", "#include \"core.h\"\nint a(void) { return 1; }\n");
    project.write("b.c", "int b(void) { return 2; }\n");
    project.write("main.c", "int main(void) { return 0; }\n");
    project
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.root.join(relative)
  }

  /// Write a file stamped at the next clock tick.
  pub fn write(&self, relative: &str, content: &str) {
    write_stamped(&self.path(relative), content, self.clock.tick());
  }

  /// Bump the modification time of an existing file.
  pub fn touch(&self, relative: &str) {
    stamp(&self.path(relative), self.clock.tick());
  }

  pub fn exists(&self, relative: &str) -> bool {
    self.path(relative).exists()
  }

  /// The execution context of the root `BSFile`.
  pub fn env(&self) -> Environment {
    Environment::new(".", self.root.clone(), Some("BSFile".to_string()))
  }

  /// A fresh compiler, as a new `bs` process would create it.
  pub fn compiler(&self, fake: &FakeToolchain, options: BuildOptions) -> Compiler {
    Compiler::new(linux_toolchain(), options, self.env(), Box::new(fake.clone()))
  }
}

pub fn linux_toolchain() -> Toolchain {
  Toolchain::new(PlatformInfo::new(Flavor::Linux))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
  Scan,
  Compile,
  Archive,
  Link,
  Other,
}

#[derive(Debug, Clone)]
pub struct Invocation {
  pub kind: Kind,
  pub argv: Vec<String>,
  pub cwd: PathBuf,
  /// Source file for scans and compiles, output file for archives and links.
  pub file: String,
}

#[derive(Debug, Default)]
struct FakeState {
  headers: HashMap<String, Vec<String>>,
  failing: HashSet<String>,
  log: Vec<Invocation>,
}

/// A [`TaskRunner`] imitating gcc, g++ and ar.
#[derive(Debug, Clone)]
pub struct FakeToolchain {
  state: Rc<RefCell<FakeState>>,
  clock: Clock,
}

fn value_after(argv: &[String], flag: &str) -> Option<String> {
  argv.iter().position(|a| a == flag).and_then(|i| argv.get(i + 1)).cloned()
}

impl FakeToolchain {
  pub fn new(clock: &Clock) -> Self {
    Self {
      state: Rc::new(RefCell::new(FakeState::default())),
      clock: clock.clone(),
    }
  }

  /// Headers reported by the dependency scan of `source`.
  pub fn headers(&self, source: &str, headers: &[&str]) {
    self
      .state
      .borrow_mut()
      .headers
      .insert(source.to_string(), headers.iter().map(|h| h.to_string()).collect());
  }

  /// Make compiles of `source` exit with status 1.
  pub fn fail(&self, source: &str) {
    self.state.borrow_mut().failing.insert(source.to_string());
  }

  pub fn invocations(&self) -> Vec<Invocation> {
    self.state.borrow().log.clone()
  }

  pub fn count(&self, kind: Kind) -> usize {
    self.state.borrow().log.iter().filter(|i| i.kind == kind).count()
  }

  /// Files of every invocation of `kind`, in order.
  pub fn files(&self, kind: Kind) -> Vec<String> {
    self
      .state
      .borrow()
      .log
      .iter()
      .filter(|i| i.kind == kind)
      .map(|i| i.file.clone())
      .collect()
  }

  pub fn clear(&self) {
    self.state.borrow_mut().log.clear();
  }

  fn produce(&self, cwd: &Path, output: &str) {
    write_stamped(&cwd.join(output), "fake artifact\n", self.clock.tick());
  }
}

impl TaskRunner for FakeToolchain {
  fn submit(&mut self, task: &Task, _capture: Capture) -> Result<TaskOutput, BuildError> {
    let argv: Vec<String> = task.argv().map(String::from).collect();
    let args = &argv[1..];

    let (kind, file) = if task.program == "ar" {
      (Kind::Archive, args.get(1).cloned().unwrap_or_default())
    } else if args.iter().any(|a| a == "-M") {
      (Kind::Scan, value_after(args, "-M").unwrap_or_default())
    } else if args.iter().any(|a| a == "-c") {
      let object = value_after(args, "-o").unwrap_or_default();
      (Kind::Compile, value_after(args, &object).unwrap_or_default())
    } else if args.iter().any(|a| a == "-o") {
      (Kind::Link, value_after(args, "-o").unwrap_or_default())
    } else {
      (Kind::Other, String::new())
    };

    self.state.borrow_mut().log.push(Invocation {
      kind,
      argv: argv.clone(),
      cwd: task.cwd.clone(),
      file: file.clone(),
    });

    match kind {
      Kind::Scan => {
        let headers = self.state.borrow().headers.get(&file).cloned().unwrap_or_default();
        // One dependency per continuation line, the way gcc wraps long rules.
        let mut rule = format!("{}.o: {}", file.trim_end_matches(".c"), file);
        for header in headers {
          rule.push_str(" \\\n  ");
          rule.push_str(&header);
        }
        rule.push('\n');
        Ok(TaskOutput::succeeded(rule))
      }
      Kind::Compile => {
        if self.state.borrow().failing.contains(&file) {
          return Ok(TaskOutput::failed(Some(1)));
        }
        let object = value_after(args, "-o").unwrap_or_default();
        self.produce(&task.cwd, &object);
        Ok(TaskOutput::succeeded(""))
      }
      Kind::Archive | Kind::Link => {
        self.produce(&task.cwd, &file);
        Ok(TaskOutput::succeeded(""))
      }
      Kind::Other => Ok(TaskOutput::succeeded("")),
    }
  }
}
