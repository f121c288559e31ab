//! Named actions given on the command line.
//!
//! An action is resolved, in order, as:
//! 1. a declared target, which is built;
//! 2. `target.method` with `method` one of `build`, `clean`, `clean_all`,
//!    `run` or `deploy`;
//! 3. a global Lua function (or callable value), or `table.method` on a
//!    global table or userdata, called with the passthrough arguments.
//!
//! With no action, the global `default` is called.

use std::rc::Rc;

use mlua::prelude::*;
use tracing::{debug, info, warn};

use crate::consts::DEFAULT_ACTION;
use crate::error::BuildError;
use crate::session::SessionRef;
use crate::target::Target;

const TARGET_METHODS: &[&str] = &["build", "clean", "clean_all", "run", "deploy"];

/// Whether a value returned by an action means success.
///
/// `false` and nonzero numbers are failures; anything else succeeds.
fn is_success(value: &LuaValue) -> bool {
  match value {
    LuaValue::Boolean(ok) => *ok,
    LuaValue::Integer(code) => *code == 0,
    LuaValue::Number(code) => *code == 0.0,
    _ => true,
  }
}

fn call_value(value: LuaValue, args: LuaTable) -> LuaResult<Option<LuaValue>> {
  match value {
    LuaValue::Function(f) => f.call(args).map(Some),
    LuaValue::UserData(ud) => ud.call(args).map(Some),
    LuaValue::Table(t) if t.metatable().is_some_and(|mt| mt.contains_key("__call").unwrap_or(false)) => {
      t.call(args).map(Some)
    }
    _ => Ok(None),
  }
}

fn run_target_method(session: &SessionRef, target: &Rc<Target>, method: &str) -> Result<bool, BuildError> {
  let args = session.borrow().options().args.clone();
  let mut session = session.borrow_mut();
  let compiler = &mut session.compiler;
  match method {
    "build" => Ok(!compiler.build(target)?.is_failed()),
    "clean" => compiler.clean(target, false).map(|_| true),
    "clean_all" => compiler.clean(target, true).map(|_| true),
    "run" => compiler.run_application(target, &args),
    "deploy" => compiler.deploy_application(target, None),
    other => Err(BuildError::config(format!("unknown target method '{}'", other))),
  }
}

fn run_lua_action(lua: &Lua, action: &str, args: LuaTable) -> Result<Option<bool>, BuildError> {
  let globals = lua.globals();

  let value: LuaValue = globals.get(action)?;
  if let Some(result) = call_value(value, args.clone())? {
    return Ok(Some(is_success(&result)));
  }

  let Some((base, method)) = action.rsplit_once('.') else {
    return Ok(None);
  };
  match globals.get::<LuaValue>(base)? {
    LuaValue::Table(table) => {
      let value: LuaValue = table.get(method)?;
      Ok(call_value(value, args)?.map(|result| is_success(&result)))
    }
    LuaValue::UserData(ud) => {
      let result: LuaValue = ud.call_method(method, args)?;
      Ok(Some(is_success(&result)))
    }
    _ => Ok(None),
  }
}

/// Resolve and invoke one action. Returns whether it succeeded.
pub fn run_action(lua: &Lua, session: &SessionRef, action: &str) -> Result<bool, BuildError> {
  info!(action, "running action");

  let target = session.borrow().registry.get(action).cloned();
  if let Some(target) = target {
    return run_target_method(session, &target, "build");
  }

  if let Some((base, method)) = action.rsplit_once('.') {
    let target = session.borrow().registry.get(base).cloned();
    if let Some(target) = target.filter(|_| TARGET_METHODS.contains(&method)) {
      return run_target_method(session, &target, method);
    }
  }

  let args = lua.create_sequence_from(session.borrow().options().args.iter().cloned())?;
  match run_lua_action(lua, action, args)? {
    Some(ok) => Ok(ok),
    None => Err(BuildError::config(format!("unknown action '{}'", action))),
  }
}

/// Run the requested actions, or the `default` function when none is given.
///
/// Stops at the first failing action. The run fails when an action fails or
/// when any target reported a toolchain failure along the way.
pub fn run_actions(lua: &Lua, session: &SessionRef) -> Result<bool, BuildError> {
  let actions = session.borrow().options().actions.clone();

  let mut ok = true;
  if actions.is_empty() {
    let default: LuaValue = lua.globals().get(DEFAULT_ACTION)?;
    if default.is_nil() {
      warn!("no default target defined");
    } else {
      debug!("running default action");
      let args = lua.create_sequence_from(session.borrow().options().args.iter().cloned())?;
      ok = match call_value(default, args)? {
        Some(result) => is_success(&result),
        None => return Err(BuildError::config(format!("'{}' is not callable", DEFAULT_ACTION))),
      };
    }
  } else {
    for action in &actions {
      if !run_action(lua, session, action)? {
        warn!(action = %action, "action failed");
        ok = false;
        break;
      }
    }
  }

  Ok(ok && session.borrow().compiler.failed_targets().is_empty())
}
