//! Whole runs: description files evaluated, actions dispatched, caches saved.

use bslua_lib::eval::{RunSummary, evaluate_with_toolchain};
use bslua_lib::session::SessionOptions;

use super::common::{FakeToolchain, Kind, Project, linux_toolchain};

const EXAMPLE: &str = r#"
core = bs.library{ name = "core", inputs = { "a.c", "b.c" } }
app = bs.application{ name = "app", inputs = { "main.c", core } }

function default()
  return app:build()
end
"#;

fn evaluate(project: &Project, fake: &FakeToolchain, actions: &[&str]) -> RunSummary {
  let options = SessionOptions {
    actions: actions.iter().map(|a| a.to_string()).collect(),
    ..SessionOptions::default()
  };
  evaluate_with_toolchain(&project.root, options, linux_toolchain(), Box::new(fake.clone())).unwrap()
}

fn example() -> (Project, FakeToolchain) {
  let project = Project::core_app();
  project.write("BSFile", EXAMPLE);
  let fake = FakeToolchain::new(&project.clock);
  fake.headers("a.c", &["core.h"]);
  (project, fake)
}

#[test]
fn named_target_is_built() {
  let (project, fake) = example();

  let summary = evaluate(&project, &fake, &["app"]);

  assert!(summary.success);
  assert!(summary.failed.is_empty());
  assert_eq!(summary.stats.objects_compiled, 3);
  assert_eq!(summary.stats.artifacts_linked, 2);
  assert_eq!(summary.caches_saved, 1);
  assert_eq!(summary.loaded_files, vec![project.path("BSFile")]);
  assert!(project.exists("build/linux/single/bin/app"));
}

#[test]
fn default_function_runs_without_actions() {
  let (project, fake) = example();

  let summary = evaluate(&project, &fake, &[]);

  assert!(summary.success);
  assert_eq!(fake.count(Kind::Link), 1);
}

#[test]
fn second_run_is_a_no_op() {
  let (project, fake) = example();
  evaluate(&project, &fake, &["app"]);
  fake.clear();

  let summary = evaluate(&project, &fake, &["app"]);

  assert!(summary.success);
  assert!(fake.invocations().is_empty());
  assert_eq!(summary.stats.up_to_date_targets, 2);
  assert_eq!(summary.caches_saved, 0);
}

#[test]
fn failing_compile_is_reported() {
  let (project, fake) = example();
  fake.fail("b.c");

  let summary = evaluate(&project, &fake, &["core"]);

  assert!(!summary.success);
  assert_eq!(summary.failed, vec!["core".to_string()]);
  assert_eq!(summary.stats.failed_targets, 1);
  // Scans of the objects that were reached still land in the cache.
  assert_eq!(summary.caches_saved, 1);
}

#[test]
fn nested_build_file_runs_in_its_own_directory() {
  let project = Project::new();
  project.write("main.c", "int main(void) { return 0; }\n");
  project.write("lib/util.c", "int util;\n");
  project.write("lib/BSFile", r#"bs.library{ name = "util", inputs = "util.c" }"#);
  project.write(
    "BSFile",
    r#"
    bs.load("lib/BSFile")
    bs.application{ name = "app", inputs = { "main.c", bs.target("util") } }
    "#,
  );
  let fake = FakeToolchain::new(&project.clock);

  let summary = evaluate(&project, &fake, &["app"]);

  assert!(summary.success);
  let util = fake
    .invocations()
    .into_iter()
    .find(|i| i.kind == Kind::Compile && i.file == "util.c")
    .unwrap();
  assert_eq!(util.cwd, project.path("lib"));
  assert!(project.exists("lib/build/linux/single/lib/libutil.a"));

  let link = fake.invocations().into_iter().find(|i| i.kind == Kind::Link).unwrap();
  assert_eq!(link.cwd, project.root);
  assert!(link.argv.contains(&"-Llib/build/linux/single/lib".to_string()));
  assert!(link.argv.contains(&"-lutil".to_string()));

  // Each directory keeps its own cache.
  assert_eq!(summary.caches_saved, 2);
  assert!(project.exists("lib/.bsdeps.json"));
}

#[test]
fn project_file_sets_default_variant() {
  let (project, fake) = example();
  project.write("BSProject", r#"bs.set_default_variants{ "debug" }"#);

  let summary = evaluate(&project, &fake, &["core"]);

  assert!(summary.success);
  assert_eq!(summary.loaded_files.len(), 2);
  assert_eq!(fake.files(Kind::Archive), vec!["build/linux/debug_single/lib/libcore.a"]);
  let compile = fake.invocations().into_iter().find(|i| i.kind == Kind::Compile).unwrap();
  assert!(compile.argv.contains(&"-ggdb".to_string()));
}
