//! Conversions from Lua values to engine types.

use mlua::prelude::*;

use crate::error::BuildError;
use crate::lua::handles::{SettingsHandle, TargetHandle};
use crate::settings::{Settings, SharedSettings};
use crate::target::Input;
use crate::variant::Variant;

fn config_error(message: String) -> LuaError {
  BuildError::config(message).into()
}

fn value_to_string(value: LuaValue, what: &str) -> LuaResult<String> {
  match value {
    LuaValue::String(s) => Ok(s.to_str()?.to_string()),
    LuaValue::Integer(i) => Ok(i.to_string()),
    LuaValue::Number(n) => Ok(n.to_string()),
    other => Err(config_error(format!(
      "{}: expected a string, got {}",
      what,
      other.type_name()
    ))),
  }
}

/// A string or a list of strings. `nil` is an empty list.
pub fn string_list(value: LuaValue, what: &str) -> LuaResult<Vec<String>> {
  match value {
    LuaValue::Nil => Ok(Vec::new()),
    LuaValue::Table(t) => t
      .sequence_values::<LuaValue>()
      .map(|v| value_to_string(v?, what))
      .collect(),
    other => Ok(vec![value_to_string(other, what)?]),
  }
}

pub fn parse_variant(value: LuaValue) -> LuaResult<Variant> {
  Ok(Variant::from(string_list(value, "variants")?))
}

/// Target inputs: a source path, a target handle, or a list of both.
pub fn parse_inputs(value: LuaValue, target: &str) -> LuaResult<Vec<Input>> {
  let mut inputs = Vec::new();
  collect_inputs(value, target, &mut inputs)?;
  Ok(inputs)
}

fn collect_inputs(value: LuaValue, target: &str, inputs: &mut Vec<Input>) -> LuaResult<()> {
  match value {
    LuaValue::Nil => {}
    LuaValue::String(s) => inputs.push(Input::Source(s.to_str()?.to_string())),
    LuaValue::UserData(ud) if ud.is::<TargetHandle>() => {
      let handle = ud.borrow::<TargetHandle>()?;
      inputs.push(Input::Target(handle.target.clone()));
    }
    LuaValue::Table(t) => {
      for item in t.sequence_values::<LuaValue>() {
        let item = item?;
        if matches!(item, LuaValue::Table(_)) {
          return Err(config_error(format!("target '{}': nested input lists are not supported", target)));
        }
        collect_inputs(item, target, inputs)?;
      }
    }
    other => {
      return Err(config_error(format!(
        "target '{}': don't know what to make with input of type {}",
        target,
        other.type_name()
      )));
    }
  }
  Ok(())
}

/// Settings given to a declaration: a settings handle is shared, a table
/// creates a new settings object.
pub fn parse_settings(value: LuaValue) -> LuaResult<Option<SharedSettings>> {
  match value {
    LuaValue::Nil => Ok(None),
    LuaValue::UserData(ud) if ud.is::<SettingsHandle>() => Ok(Some(ud.borrow::<SettingsHandle>()?.0.clone())),
    LuaValue::Table(t) => {
      let mut settings = Settings::new();
      apply_settings(&mut settings, &t)?;
      Ok(Some(settings.into_shared()))
    }
    other => Err(config_error(format!(
      "settings: expected a settings object or a table, got {}",
      other.type_name()
    ))),
  }
}

fn parse_defines(settings: &mut Settings, value: LuaValue) -> LuaResult<()> {
  let LuaValue::Table(t) = value else {
    return Err(config_error("defines: expected a table".to_string()));
  };
  for pair in t.pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair?;
    match (key, value) {
      // List entries are bare defines.
      (LuaValue::Integer(_), name) => settings.define(value_to_string(name, "defines")?, None),
      (name, LuaValue::Boolean(true)) => settings.define(value_to_string(name, "defines")?, None),
      (name, LuaValue::Boolean(false)) => {
        settings.defines.remove(&value_to_string(name, "defines")?);
      }
      (name, value) => {
        let name = value_to_string(name, "defines")?;
        let value = value_to_string(value, &name)?;
        settings.define(name, Some(value));
      }
    }
  }
  Ok(())
}

/// Assign every field of `values` to `settings`.
pub fn apply_settings(settings: &mut Settings, values: &LuaTable) -> LuaResult<()> {
  for pair in values.pairs::<String, LuaValue>() {
    let (field, value) = pair?;
    if field == "defines" {
      parse_defines(settings, value)?;
    } else if Settings::is_dir_field(&field) {
      let dir = match value {
        LuaValue::Nil | LuaValue::Boolean(false) => None,
        other => Some(value_to_string(other, &field)?),
      };
      settings.set_dir(&field, dir)?;
    } else {
      let list = string_list(value, &field)?;
      *settings.list_mut(&field)? = list;
    }
  }
  Ok(())
}
