//! Dry-run builds of the library/application fixture.

use predicates::prelude::*;

use super::common::TestEnv;

/// The `core_app` fixture plus its sources.
fn core_app() -> TestEnv {
  let env = TestEnv::from_fixture("core_app.lua");
  env.write_file("core/strings.c", "int strings(void) { return 1; }\n");
  env.write_file("core/files.c", "int files(void) { return 2; }\n");
  env.write_file("core/core.h", "int strings(void);\n");
  env.write_file("app/main.c", "int main(void) { return 0; }\n");
  env
}

#[test]
fn library_compiles_and_archives() {
  let env = core_app();

  env
    .bs_cmd()
    .args(["-n", "core"])
    .assert()
    .success()
    .stdout(predicate::str::contains("<Lib:core>"))
    .stdout(predicate::str::contains("-c"))
    .stdout(predicate::str::contains("strings.c"))
    .stdout(predicate::str::contains("rcs"))
    .stdout(predicate::str::contains("libcore.a"));
}

#[test]
fn default_action_links_application() {
  let env = core_app();

  env
    .bs_cmd()
    .arg("--dry-run")
    .assert()
    .success()
    .stdout(predicate::str::contains("<App:app>"))
    .stdout(predicate::str::contains("-lcore"))
    .stdout(predicate::str::contains("Dry run complete"));
}

#[test]
fn dry_run_writes_nothing() {
  let env = core_app();

  env.bs_cmd().args(["-n", "app"]).assert().success();

  assert!(!env.path().join("build").exists());
  assert!(!env.path().join(".bsdeps.json").exists());
}

#[test]
fn variant_selects_output_directories() {
  let env = core_app();

  env
    .bs_cmd()
    .args(["-n", "--variant", "debug", "core"])
    .assert()
    .success()
    .stdout(predicate::str::contains("debug_"));
}

#[test]
fn fast_mode_skips_subtargets() {
  let env = core_app();

  env
    .bs_cmd()
    .args(["-n", "--fast", "app"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Skipping subtarget: core"))
    .stdout(predicate::str::contains("<Lib:core>").not())
    .stderr(predicate::str::contains("may be incomplete"));
}

#[test]
fn target_clean_method() {
  let env = core_app();

  env.bs_cmd().args(["-n", "core.clean"]).assert().success();
  env.bs_cmd().args(["-n", "app.clean_all"]).assert().success();
}

#[test]
fn run_method_passes_arguments() {
  let env = core_app();

  env
    .bs_cmd()
    .args(["-n", "app.run", "--", "one", "two"])
    .assert()
    .success()
    .stdout(predicate::str::contains("one two"));
}

#[test]
fn run_on_library_is_rejected() {
  let env = core_app();

  env
    .bs_cmd()
    .args(["-n", "core.run"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("only applications"));
}

#[test]
fn missing_source_exits_with_missing_input_status() {
  let env = TestEnv::with_build_file(r#"bs.library{ name = "core", inputs = "missing.c" }"#);

  env
    .bs_cmd()
    .args(["-n", "core"])
    .assert()
    .code(4)
    .stderr(predicate::str::contains("missing.c"));
}

#[test]
fn shared_library_without_define_is_config_error() {
  let env = TestEnv::with_build_file(r#"bs.library{ name = "core", inputs = "a.c", shared = true }"#);
  env.write_file("a.c", "int a;\n");

  env
    .bs_cmd()
    .args(["-n", "core"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("shared_define"));
}

#[test]
fn nested_build_file_is_loaded_relative_to_context() {
  let env = TestEnv::with_build_file(
    r#"
    bs.load("lib/BSFile")
    bs.application{ name = "app", inputs = { "main.c", bs.target("util") } }
    "#,
  );
  env.write_file("main.c", "int main(void) { return 0; }\n");
  env.write_file("lib/BSFile", r#"bs.library{ name = "util", inputs = "util.c" }"#);
  env.write_file("lib/util.c", "int util;\n");

  env
    .bs_cmd()
    .args(["-n", "app"])
    .assert()
    .success()
    .stdout(predicate::str::contains("<Lib:util>"))
    .stdout(predicate::str::contains("-lutil"));
}
