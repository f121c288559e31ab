//! The `bs` global table.
//!
//! This module registers the `bs` global table which provides:
//! - `bs.library{}` / `bs.application{}` - Declare a target
//! - `bs.settings{}` / `bs.defaults()` - Create or fetch settings objects
//! - `bs.set_default_variants()` / `bs.default_variants()` - The default variant
//! - `bs.load(path)` - Load a nested description file
//! - `bs.target(name)` - Look up a declared target
//! - `bs.build()`, `bs.clean()`, `bs.run()`, `bs.deploy()` - Functional actions
//! - `bs.autoconf{}` - Declare an autoconf project
//! - `bs.platform`, `bs.platform_flavor`, `bs.platform_version`, `bs.arch`
//! - `bs.args`, `bs.verbose`, `bs.dry_run` - Command-line state

use mlua::prelude::*;

use crate::error::BuildError;
use crate::handlers::{AutoconfProject, AutoconfStep};
use crate::lua::convert::{parse_inputs, parse_settings, parse_variant, string_list};
use crate::lua::handles::{AutoconfHandle, SettingsHandle, TargetHandle};
use crate::lua::loaders::{load_description, resolve_in_current};
use crate::session::SessionRef;
use crate::settings::Settings;
use crate::target::{SHARED_TAG, TargetDecl};
use crate::variant::Variant;

const LIBRARY_FIELDS: &[&str] = &["name", "inputs", "output", "settings", "variants", "shared", "shared_define"];
const APPLICATION_FIELDS: &[&str] = &["name", "inputs", "output", "settings", "variants"];
const AUTOCONF_FIELDS: &[&str] = &[
  "name",
  "source_dir",
  "build_dir",
  "steps",
  "conf_flags",
  "build_flags",
  "install_flags",
  "conf_cmd",
  "make_cmd",
];

fn key_label(key: &LuaValue) -> String {
  match key {
    LuaValue::String(s) => format!("'{}'", s.to_string_lossy()),
    other => format!("of type {}", other.type_name()),
  }
}

fn check_fields(spec: &LuaTable, what: &str, allowed: &[&str]) -> LuaResult<()> {
  for pair in spec.pairs::<LuaValue, LuaValue>() {
    let (key, _) = pair?;
    let known = match &key {
      LuaValue::String(s) => allowed.contains(&s.to_string_lossy().as_str()),
      _ => false,
    };
    if !known {
      return Err(BuildError::config(format!("{}: unknown field {}", what, key_label(&key))).into());
    }
  }
  Ok(())
}

fn required_name(spec: &LuaTable, what: &str) -> LuaResult<String> {
  match spec.get::<Option<String>>("name")? {
    Some(name) if !name.is_empty() => Ok(name),
    _ => Err(BuildError::config(format!("{}: 'name' is required", what)).into()),
  }
}

/// Shared part of `bs.library{}` and `bs.application{}`.
fn declare_target(session: &SessionRef, spec: &LuaTable, mut decl: TargetDecl) -> LuaResult<TargetHandle> {
  decl.inputs = parse_inputs(spec.get("inputs")?, &decl.name)?;
  decl.output = spec.get("output")?;
  decl.settings = parse_settings(spec.get("settings")?)?;
  decl.variant.add(parse_variant(spec.get("variants")?)?);

  let target = session.borrow_mut().declare(decl)?;
  Ok(TargetHandle::new(target, session.clone()))
}

/// A target given as a handle or by name.
fn target_arg(session: &SessionRef, value: LuaValue) -> LuaResult<TargetHandle> {
  match value {
    LuaValue::UserData(ud) if ud.is::<TargetHandle>() => Ok(ud.borrow::<TargetHandle>()?.clone()),
    LuaValue::String(name) => {
      let name = name.to_str()?.to_string();
      let target = session.borrow().registry.get(&name).cloned();
      match target {
        Some(target) => Ok(TargetHandle::new(target, session.clone())),
        None => Err(BuildError::config(format!("unknown target '{}'", name)).into()),
      }
    }
    other => Err(BuildError::config(format!("expected a target, got {}", other.type_name())).into()),
  }
}

fn register_declarations(lua: &Lua, bs: &LuaTable, session: &SessionRef) -> LuaResult<()> {
  let s = session.clone();
  bs.set(
    "library",
    lua.create_function(move |_, spec: LuaTable| {
      check_fields(&spec, "library", LIBRARY_FIELDS)?;
      let name = required_name(&spec, "library")?;
      let mut decl = TargetDecl::library(name);
      if let Some(define) = spec.get::<Option<String>>("shared_define")? {
        decl = decl.shared_define(define);
      }
      if spec.get::<Option<bool>>("shared")?.unwrap_or(false) {
        decl = decl.variant(SHARED_TAG);
      }
      declare_target(&s, &spec, decl)
    })?,
  )?;

  let s = session.clone();
  bs.set(
    "application",
    lua.create_function(move |_, spec: LuaTable| {
      check_fields(&spec, "application", APPLICATION_FIELDS)?;
      let name = required_name(&spec, "application")?;
      declare_target(&s, &spec, TargetDecl::application(name))
    })?,
  )?;

  let s = session.clone();
  bs.set(
    "autoconf",
    lua.create_function(move |_, spec: LuaTable| {
      check_fields(&spec, "autoconf", AUTOCONF_FIELDS)?;
      let name = required_name(&spec, "autoconf")?;
      let source_dir: String = spec
        .get::<Option<String>>("source_dir")?
        .ok_or_else(|| BuildError::config(format!("autoconf '{}': 'source_dir' is required", name)))?;

      let env = s.borrow().current_env().clone();
      let mut project = AutoconfProject::new(name, source_dir, env);
      if let Some(build_dir) = spec.get::<Option<String>>("build_dir")? {
        project.build_dir = build_dir;
      }
      let steps: LuaValue = spec.get("steps")?;
      if !steps.is_nil() {
        project.steps = string_list(steps, "steps")?
          .iter()
          .map(|step| AutoconfStep::parse(step))
          .collect::<Result<_, _>>()?;
      }
      project.conf_flags = string_list(spec.get("conf_flags")?, "conf_flags")?;
      project.build_flags = string_list(spec.get("build_flags")?, "build_flags")?;
      project.install_flags = string_list(spec.get("install_flags")?, "install_flags")?;
      if let Some(cmd) = spec.get::<Option<String>>("conf_cmd")? {
        project.conf_cmd = cmd;
      }
      if let Some(cmd) = spec.get::<Option<String>>("make_cmd")? {
        project.make_cmd = cmd;
      }
      Ok(AutoconfHandle {
        project,
        session: s.clone(),
      })
    })?,
  )?;

  Ok(())
}

fn register_settings(lua: &Lua, bs: &LuaTable, session: &SessionRef) -> LuaResult<()> {
  bs.set(
    "settings",
    lua.create_function(|_, values: Option<LuaTable>| {
      let settings = match values {
        Some(values) => parse_settings(LuaValue::Table(values))?.unwrap_or_else(|| Settings::new().into_shared()),
        None => Settings::new().into_shared(),
      };
      Ok(SettingsHandle(settings))
    })?,
  )?;

  let s = session.clone();
  bs.set(
    "defaults",
    lua.create_function(move |_, ()| Ok(SettingsHandle(s.borrow().compiler.defaults().clone())))?,
  )?;

  let s = session.clone();
  bs.set(
    "set_default_variants",
    lua.create_function(move |_, tags: LuaValue| {
      let variant = parse_variant(tags)?;
      s.borrow_mut().compiler.set_default_variant(variant);
      Ok(())
    })?,
  )?;

  let s = session.clone();
  bs.set(
    "default_variants",
    lua.create_function(move |_, ()| {
      let variant: Variant = s.borrow().compiler.default_variant().clone();
      Ok(variant.tags().map(String::from).collect::<Vec<_>>())
    })?,
  )?;

  Ok(())
}

fn register_actions(lua: &Lua, bs: &LuaTable, session: &SessionRef) -> LuaResult<()> {
  let s = session.clone();
  bs.set(
    "load",
    lua.create_function(move |lua, path: String| {
      let path = resolve_in_current(&s, &path);
      load_description(lua, &s, &path)
    })?,
  )?;

  let s = session.clone();
  bs.set(
    "target",
    lua.create_function(move |_, name: String| {
      let target = s.borrow().registry.get(&name).cloned();
      Ok(target.map(|t| TargetHandle::new(t, s.clone())))
    })?,
  )?;

  let s = session.clone();
  bs.set(
    "build",
    lua.create_function(move |_, target: LuaValue| target_arg(&s, target)?.build())?,
  )?;

  let s = session.clone();
  bs.set(
    "clean",
    lua.create_function(move |_, (target, recursive): (LuaValue, Option<bool>)| {
      target_arg(&s, target)?.clean(recursive.unwrap_or(false))
    })?,
  )?;

  let s = session.clone();
  bs.set(
    "run",
    lua.create_function(move |_, (target, args): (LuaValue, Option<LuaValue>)| {
      let handle = target_arg(&s, target)?;
      let args = args.map(|v| string_list(v, "run arguments")).transpose()?;
      handle.run(args)
    })?,
  )?;

  let s = session.clone();
  bs.set(
    "deploy",
    lua.create_function(move |_, (target, destination): (LuaValue, Option<String>)| {
      target_arg(&s, target)?.deploy(destination)
    })?,
  )?;

  Ok(())
}

fn register_values(lua: &Lua, bs: &LuaTable, session: &SessionRef) -> LuaResult<()> {
  let session = session.borrow();
  let platform = session.compiler.platform();
  bs.set("platform", platform.platform.as_str())?;
  bs.set("platform_flavor", platform.flavor.as_str())?;
  bs.set("platform_version", platform.version.clone())?;
  bs.set("arch", platform.arch.as_str().to_string())?;

  let options = session.options();
  bs.set("args", lua.create_sequence_from(options.args.iter().cloned())?)?;
  bs.set("verbose", options.build.verbose)?;
  bs.set("dry_run", options.build.dry_run)?;
  bs.set("fast", options.build.fast)?;
  Ok(())
}

/// Register the `bs` global table in the Lua runtime.
pub fn register_globals(lua: &Lua, session: SessionRef) -> LuaResult<()> {
  let bs = lua.create_table()?;

  register_values(lua, &bs, &session)?;
  register_declarations(lua, &bs, &session)?;
  register_settings(lua, &bs, &session)?;
  register_actions(lua, &bs, &session)?;

  lua.globals().set("bs", bs)?;
  Ok(())
}
