//! Action resolution and exit statuses.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn lua_function_receives_passthrough_args() {
  let env = TestEnv::from_fixture("actions.lua");

  env
    .bs_cmd()
    .args(["greet", "--", "wide", "world"])
    .assert()
    .success()
    .stdout(predicate::str::contains("hello wide world"));
}

#[test]
fn table_method_action() {
  let env = TestEnv::from_fixture("actions.lua");

  env
    .bs_cmd()
    .args(["-n", "tools.info"])
    .assert()
    .success()
    .stdout(predicate::str::contains("flavor="))
    .stdout(predicate::str::contains("dry_run=true"));
}

#[test]
fn false_return_is_failure() {
  let env = TestEnv::from_fixture("actions.lua");

  env
    .bs_cmd()
    .arg("check")
    .assert()
    .code(6)
    .stderr(predicate::str::contains("check"));
}

#[test]
fn nonzero_return_is_failure() {
  let env = TestEnv::from_fixture("actions.lua");

  env.bs_cmd().arg("exit_code").assert().code(6);
}

#[test]
fn unknown_action_is_config_error() {
  let env = TestEnv::from_fixture("actions.lua");

  env
    .bs_cmd()
    .arg("nope")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("unknown action 'nope'"));
}

#[test]
fn lua_error_is_reported() {
  let env = TestEnv::from_fixture("actions.lua");

  env
    .bs_cmd()
    .arg("boom")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("exploded on purpose"));
}

#[test]
fn syntax_error_in_build_file() {
  let env = TestEnv::with_build_file("this is not valid lua {{{");

  env.bs_cmd().assert().code(1);
}

#[test]
fn missing_default_only_warns() {
  let env = TestEnv::with_build_file("-- nothing declared\n");

  env
    .bs_cmd()
    .assert()
    .success()
    .stderr(predicate::str::contains("no default target defined"));
}

#[test]
fn failing_default_reports_failure() {
  let env = TestEnv::with_build_file("function default() return false end\n");

  env
    .bs_cmd()
    .assert()
    .code(6)
    .stderr(predicate::str::contains("'default' action reported failure"));
}

#[test]
fn missing_build_file_is_config_error() {
  let env = TestEnv::empty();

  env
    .bs_cmd()
    .assert()
    .code(1)
    .stderr(predicate::str::contains("no build file 'BSFile'"));
}

#[test]
fn custom_build_file_name() {
  let env = TestEnv::empty();
  env.write_file("build.lua", r#"function default() print("custom file") end"#);

  env
    .bs_cmd()
    .args(["-f", "build.lua"])
    .assert()
    .success()
    .stdout(predicate::str::contains("custom file"));
}

#[test]
fn project_files_load_before_build_file() {
  let env = TestEnv::empty();
  env.write_file("BSProject", r#"bs.set_default_variants{ "release" }"#);
  env.write_file("sub/BSFile", &super::common::fixture_content("actions.lua"));

  env
    .bs_cmd_in("sub")
    .arg("tools.info")
    .assert()
    .success()
    .stdout(predicate::str::contains("variants=release"));
}

#[test]
fn command_line_variant_replaces_project_default() {
  let env = TestEnv::empty();
  env.write_file("BSProject", r#"bs.set_default_variants{ "release" }"#);
  env.write_file("sub/BSFile", &super::common::fixture_content("actions.lua"));

  env
    .bs_cmd_in("sub")
    .args(["--variant", "debug,multi", "tools.info"])
    .assert()
    .success()
    .stdout(predicate::str::contains("variants=debug,multi"));
}
