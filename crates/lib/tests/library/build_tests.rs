//! Incremental builds of the library/application example against a fake toolchain.

use std::rc::Rc;

use bslua_lib::compiler::{BuildOptions, Compiler, TargetStatus};
use bslua_lib::target::{Registry, Target, TargetDecl};

use super::common::{FakeToolchain, Kind, Project};

const OBJ_A: &str = "build/linux/single/obj/core/a.o";
const OBJ_B: &str = "build/linux/single/obj/core/b.o";
const OBJ_MAIN: &str = "build/linux/single/obj/app/main.o";
const LIB_CORE: &str = "build/linux/single/lib/libcore.a";
const APP: &str = "build/linux/single/bin/app";

struct Example {
  core: Rc<Target>,
  app: Rc<Target>,
}

fn declare(project: &Project) -> Example {
  let mut registry = Registry::new();
  let core = registry
    .declare(TargetDecl::library("core").source("a.c").source("b.c"), project.env())
    .unwrap();
  let app = registry
    .declare(
      TargetDecl::application("app").source("main.c").input(core.clone()),
      project.env(),
    )
    .unwrap();
  Example { core, app }
}

fn setup() -> (Project, FakeToolchain, Example) {
  let project = Project::core_app();
  let fake = FakeToolchain::new(&project.clock);
  fake.headers("a.c", &["core.h"]);
  let example = declare(&project);
  (project, fake, example)
}

/// One `bs app` invocation: a fresh compiler, a build, a cache flush.
fn run(project: &Project, fake: &FakeToolchain, target: &Rc<Target>) -> (TargetStatus, Compiler) {
  let mut compiler = project.compiler(fake, BuildOptions::default());
  let status = compiler.build(target).unwrap();
  compiler.save_cache().unwrap();
  (status, compiler)
}

#[test]
fn first_build_compiles_archives_and_links() {
  let (project, fake, example) = setup();

  let (status, compiler) = run(&project, &fake, &example.app);

  assert_eq!(status, TargetStatus::Rebuilt);
  assert_eq!(fake.files(Kind::Compile), vec!["a.c", "b.c", "main.c"]);
  assert_eq!(fake.files(Kind::Archive), vec![LIB_CORE]);
  assert_eq!(fake.files(Kind::Link), vec![APP]);
  for file in [OBJ_A, OBJ_B, OBJ_MAIN, LIB_CORE, APP] {
    assert!(project.exists(file), "{} missing", file);
  }

  let stats = compiler.stats();
  assert_eq!(stats.objects_compiled, 3);
  assert_eq!(stats.dependency_scans, 3);
  assert_eq!(stats.artifacts_linked, 2);
  assert!(compiler.failed_targets().is_empty());
}

#[test]
fn library_is_built_before_application_links_it() {
  let (project, fake, example) = setup();
  run(&project, &fake, &example.app);

  let kinds: Vec<Kind> = fake
    .invocations()
    .into_iter()
    .map(|i| i.kind)
    .filter(|k| *k != Kind::Scan)
    .collect();
  assert_eq!(
    kinds,
    vec![Kind::Compile, Kind::Compile, Kind::Archive, Kind::Compile, Kind::Link]
  );

  let link = fake.invocations().into_iter().find(|i| i.kind == Kind::Link).unwrap();
  assert!(link.argv.contains(&"-lcore".to_string()));
  assert!(link.argv.contains(&"-Lbuild/linux/single/lib".to_string()));
  assert_eq!(link.cwd, project.root);
}

#[test]
fn second_run_does_nothing() {
  let (project, fake, example) = setup();
  run(&project, &fake, &example.app);
  fake.clear();

  let (status, compiler) = run(&project, &fake, &example.app);

  assert_eq!(status, TargetStatus::UpToDate);
  assert!(fake.invocations().is_empty(), "{:?}", fake.invocations());
  assert_eq!(compiler.stats().up_to_date_targets, 2);
}

#[test]
fn touching_a_source_rebuilds_only_its_object() {
  let (project, fake, example) = setup();
  run(&project, &fake, &example.app);
  fake.clear();

  project.touch("b.c");
  let (status, _) = run(&project, &fake, &example.app);

  assert_eq!(status, TargetStatus::Rebuilt);
  assert_eq!(fake.files(Kind::Scan), vec!["b.c"]);
  assert_eq!(fake.files(Kind::Compile), vec!["b.c"]);
  assert_eq!(fake.files(Kind::Archive), vec![LIB_CORE]);
  assert_eq!(fake.files(Kind::Link), vec![APP]);
}

#[test]
fn touching_a_header_rebuilds_its_includers() {
  let (project, fake, example) = setup();
  run(&project, &fake, &example.app);
  fake.clear();

  project.touch("core.h");
  run(&project, &fake, &example.app);

  assert_eq!(fake.files(Kind::Compile), vec!["a.c"]);
  assert_eq!(fake.count(Kind::Archive), 1);
  assert_eq!(fake.count(Kind::Link), 1);
}

#[test]
fn unrelated_file_changes_nothing() {
  let (project, fake, example) = setup();
  run(&project, &fake, &example.app);
  fake.clear();

  project.write("README", "notes\n");
  let (status, _) = run(&project, &fake, &example.app);

  assert_eq!(status, TargetStatus::UpToDate);
  assert!(fake.invocations().is_empty());
}

#[test]
fn editing_the_build_file_rebuilds_everything() {
  let (project, fake, example) = setup();
  run(&project, &fake, &example.app);
  fake.clear();

  project.touch("BSFile");
  run(&project, &fake, &example.app);

  assert_eq!(fake.files(Kind::Compile), vec!["a.c", "b.c", "main.c"]);
  assert_eq!(fake.count(Kind::Link), 1);
}

#[test]
fn deleted_header_rebuilds_its_includer() {
  let (project, fake, example) = setup();
  run(&project, &fake, &example.app);
  fake.clear();

  std::fs::remove_file(project.path("core.h")).unwrap();
  fake.headers("a.c", &[]);
  run(&project, &fake, &example.app);

  assert_eq!(fake.files(Kind::Scan), vec!["a.c"]);
  assert_eq!(fake.files(Kind::Compile), vec!["a.c"]);
  assert_eq!(fake.count(Kind::Archive), 1);
}

#[test]
fn header_resolved_elsewhere_after_deletion_still_rebuilds() {
  let project = Project::new();
  // The fallback copy is older than every object built below.
  project.write("inc2/core.h", "int a(void);\n");
  project.write("inc1/core.h", "int a(void);\n");
  project.write("a.c", "#include \"core.h\"\nint a(void) { return 1; }\n");
  let fake = FakeToolchain::new(&project.clock);
  fake.headers("a.c", &["inc1/core.h"]);
  let mut registry = Registry::new();
  let core = registry
    .declare(TargetDecl::library("core").source("a.c"), project.env())
    .unwrap();
  run(&project, &fake, &core);
  fake.clear();

  std::fs::remove_file(project.path("inc1/core.h")).unwrap();
  fake.headers("a.c", &["inc2/core.h"]);
  let (status, _) = run(&project, &fake, &core);

  assert_eq!(status, TargetStatus::Rebuilt);
  assert_eq!(fake.files(Kind::Scan), vec!["a.c"]);
  assert_eq!(fake.files(Kind::Compile), vec!["a.c"]);
  assert_eq!(fake.count(Kind::Archive), 1);
}

#[test]
fn deleted_object_is_rescanned_and_recompiled() {
  let (project, fake, example) = setup();
  run(&project, &fake, &example.app);
  fake.clear();

  std::fs::remove_file(project.path(OBJ_MAIN)).unwrap();
  run(&project, &fake, &example.app);

  assert_eq!(fake.files(Kind::Scan), vec!["main.c"]);
  assert_eq!(fake.files(Kind::Compile), vec!["main.c"]);
  assert_eq!(fake.count(Kind::Link), 1);
  assert_eq!(fake.count(Kind::Archive), 0);
}

#[test]
fn compile_failure_fails_the_chain() {
  let (project, fake, example) = setup();
  fake.fail("b.c");

  let (status, compiler) = run(&project, &fake, &example.app);

  assert_eq!(status, TargetStatus::Failed);
  assert_eq!(fake.files(Kind::Compile), vec!["a.c", "b.c"]);
  assert_eq!(fake.count(Kind::Archive), 0);
  assert_eq!(fake.count(Kind::Link), 0);
  assert_eq!(compiler.failed_targets(), ["core", "app"]);
  assert!(!project.exists(LIB_CORE));
}

#[test]
fn missing_source_is_reported() {
  let project = Project::new();
  let fake = FakeToolchain::new(&project.clock);
  let mut registry = Registry::new();
  let lib = registry
    .declare(TargetDecl::library("ghost").source("nowhere.c"), project.env())
    .unwrap();

  let mut compiler = project.compiler(&fake, BuildOptions::default());
  let err = compiler.build(&lib).unwrap_err();

  assert_eq!(err.exit_code(), bslua_lib::error::exit_code::MISSING_INPUT);
  assert!(err.to_string().contains("nowhere.c"));
  assert!(fake.invocations().is_empty());
}

#[test]
fn shared_library_links_with_define() {
  let project = Project::core_app();
  let fake = FakeToolchain::new(&project.clock);
  let mut registry = Registry::new();
  let core = registry
    .declare(
      TargetDecl::library("core")
        .source("a.c")
        .shared_define("CORE_SHARED")
        .variant("shared"),
      project.env(),
    )
    .unwrap();

  let (status, _) = run(&project, &fake, &core);

  assert_eq!(status, TargetStatus::Rebuilt);
  let compile = fake.invocations().into_iter().find(|i| i.kind == Kind::Compile).unwrap();
  assert!(compile.argv.contains(&"-DCORE_SHARED".to_string()));
  assert_eq!(fake.count(Kind::Archive), 0);
  assert_eq!(fake.files(Kind::Link), vec!["build/linux/single/lib/libcore.so"]);
}

#[test]
fn targets_build_once_per_run() {
  let project = Project::core_app();
  let fake = FakeToolchain::new(&project.clock);
  let mut registry = Registry::new();
  let core = registry
    .declare(TargetDecl::library("core").source("a.c").source("b.c"), project.env())
    .unwrap();
  let first = registry
    .declare(
      TargetDecl::application("first").source("main.c").input(core.clone()),
      project.env(),
    )
    .unwrap();
  let second = registry
    .declare(
      TargetDecl::application("second").source("main.c").input(core.clone()),
      project.env(),
    )
    .unwrap();

  let mut compiler = project.compiler(&fake, BuildOptions::default());
  compiler.build(&first).unwrap();
  compiler.build(&second).unwrap();
  compiler.build(&core).unwrap();

  assert_eq!(fake.count(Kind::Archive), 1);
  assert_eq!(fake.files(Kind::Compile), vec!["a.c", "b.c", "main.c", "main.c"]);
  assert_eq!(
    fake.files(Kind::Link),
    vec!["build/linux/single/bin/first", "build/linux/single/bin/second"]
  );
}

#[test]
fn fast_mode_skips_subtargets() {
  let (project, fake, example) = setup();
  let options = BuildOptions {
    fast: true,
    ..BuildOptions::default()
  };

  let mut compiler = project.compiler(&fake, options);
  compiler.build(&example.app).unwrap();

  assert_eq!(fake.files(Kind::Compile), vec!["main.c"]);
  assert_eq!(fake.count(Kind::Archive), 0);
}

#[test]
fn dry_run_scans_nothing_and_saves_nothing() {
  let (project, fake, example) = setup();
  let options = BuildOptions {
    dry_run: true,
    ..BuildOptions::default()
  };

  let mut compiler = project.compiler(&fake, options);
  compiler.build(&example.app).unwrap();

  assert_eq!(fake.count(Kind::Scan), 0);
  assert_eq!(fake.count(Kind::Compile), 3);
  assert_eq!(compiler.save_cache().unwrap(), 0);
  assert!(!project.exists(".bsdeps.json"));
}

#[test]
fn clean_removes_objects_and_empty_dirs() {
  let (project, fake, example) = setup();
  let (_, mut compiler) = run(&project, &fake, &example.app);

  let removed = compiler.clean(&example.app, false).unwrap();
  assert_eq!(removed, 1);
  assert!(!project.exists(OBJ_MAIN));
  assert!(!project.exists("build/linux/single/obj/app"));
  assert!(project.exists(OBJ_A));

  let removed = compiler.clean(&example.app, true).unwrap();
  assert_eq!(removed, 2);
  assert!(!project.exists("build/linux/single/obj/core"));
  assert!(project.exists(LIB_CORE));
  assert!(project.exists(APP));
  assert!(project.exists("core.h"));
}

#[test]
fn cleaned_target_rebuilds_in_the_same_run() {
  let (project, fake, example) = setup();
  let (_, mut compiler) = run(&project, &fake, &example.app);
  fake.clear();

  compiler.clean(&example.core, false).unwrap();
  let status = compiler.build(&example.core).unwrap();

  assert_eq!(status, TargetStatus::Rebuilt);
  assert_eq!(fake.files(Kind::Compile), vec!["a.c", "b.c"]);
}
