//! Userdata handles returned to description files.

use std::rc::Rc;

use mlua::prelude::*;

use crate::handlers::AutoconfProject;
use crate::lua::convert::{apply_settings, string_list};
use crate::session::SessionRef;
use crate::settings::{Settings, SharedSettings};
use crate::target::Target;

/// A declared library or application. Calling it builds it.
#[derive(Clone)]
pub struct TargetHandle {
  pub target: Rc<Target>,
  pub session: SessionRef,
}

impl TargetHandle {
  pub fn new(target: Rc<Target>, session: SessionRef) -> Self {
    Self { target, session }
  }

  /// Build the target. Returns `false` on a toolchain failure.
  pub fn build(&self) -> LuaResult<bool> {
    let status = self.session.borrow_mut().compiler.build(&self.target)?;
    Ok(!status.is_failed())
  }

  pub fn clean(&self, recursive: bool) -> LuaResult<usize> {
    Ok(self.session.borrow_mut().compiler.clean(&self.target, recursive)?)
  }

  /// Build and run the application; `None` passes the command-line passthrough.
  pub fn run(&self, args: Option<Vec<String>>) -> LuaResult<bool> {
    let mut session = self.session.borrow_mut();
    let args = args.unwrap_or_else(|| session.options().args.clone());
    Ok(session.compiler.run_application(&self.target, &args)?)
  }

  pub fn deploy(&self, destination: Option<String>) -> LuaResult<bool> {
    Ok(
      self
        .session
        .borrow_mut()
        .compiler
        .deploy_application(&self.target, destination.as_deref())?,
    )
  }
}

impl LuaUserData for TargetHandle {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("name", |_, this| Ok(this.target.name.clone()));
    fields.add_field_method_get("output", |_, this| Ok(this.target.output_name().to_string()));
    fields.add_field_method_get("type", |_, this| Ok(this.target.type_tag()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("build", |_, this, ()| this.build());
    methods.add_method("clean", |_, this, recursive: Option<bool>| {
      this.clean(recursive.unwrap_or(false))
    });
    methods.add_method("run", |_, this, args: Option<LuaValue>| {
      let args = args.map(|v| string_list(v, "run arguments")).transpose()?;
      this.run(args)
    });
    methods.add_method("deploy", |_, this, destination: Option<String>| this.deploy(destination));

    methods.add_meta_method(LuaMetaMethod::Call, |_, this, ()| this.build());
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.target.label()));
  }
}

/// A settings object, shared with every target that uses it.
#[derive(Clone)]
pub struct SettingsHandle(pub SharedSettings);

impl LuaUserData for SettingsHandle {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("set", |_, this, values: LuaTable| {
      apply_settings(&mut this.0.borrow_mut(), &values)
    });

    methods.add_method("define", |_, this, (name, value): (String, Option<LuaValue>)| {
      let value = match value {
        None | Some(LuaValue::Nil) | Some(LuaValue::Boolean(true)) => None,
        Some(LuaValue::String(s)) => Some(s.to_str()?.to_string()),
        Some(LuaValue::Integer(i)) => Some(i.to_string()),
        Some(LuaValue::Number(n)) => Some(n.to_string()),
        Some(other) => {
          return Err(LuaError::external(format!(
            "define '{}': unsupported value type {}",
            name,
            other.type_name()
          )));
        }
      };
      this.0.borrow_mut().define(name, value);
      Ok(())
    });

    methods.add_method("append", |_, this, (field, values): (String, LuaValue)| {
      let values = string_list(values, &field)?;
      let mut settings = this.0.borrow_mut();
      settings.list_mut(&field)?.extend(values);
      Ok(())
    });

    methods.add_method("copy", |_, this, ()| {
      let copy: Settings = this.0.borrow().clone();
      Ok(SettingsHandle(copy.into_shared()))
    });

    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.0.borrow().to_string()));
  }
}

/// An autoconf project. Calling it runs its steps.
#[derive(Clone)]
pub struct AutoconfHandle {
  pub project: AutoconfProject,
  pub session: SessionRef,
}

impl AutoconfHandle {
  pub fn run(&self) -> LuaResult<bool> {
    Ok(self.project.run(&mut self.session.borrow_mut().compiler)?)
  }
}

impl LuaUserData for AutoconfHandle {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("name", |_, this| Ok(this.project.name.clone()));
    fields.add_field_method_get("build_dir", |_, this| Ok(this.project.build_dir.clone()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("run", |_, this, ()| this.run());
    methods.add_method("clean", |_, this, ()| {
      Ok(this.project.clean(&mut this.session.borrow_mut().compiler)?)
    });
    methods.add_meta_method(LuaMetaMethod::Call, |_, this, ()| this.run());
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.project.label()));
  }
}
