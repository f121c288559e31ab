use mlua::prelude::*;

use crate::lua::globals;
use crate::session::SessionRef;

/// Create a new Lua runtime with the `bs` global table registered.
pub fn create_runtime(session: SessionRef) -> LuaResult<Lua> {
  let lua = Lua::new();
  globals::register_globals(&lua, session)?;
  Ok(lua)
}
