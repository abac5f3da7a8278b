//! The binding of one parameter to the conversion of its input.
//!
//! A [`Requisition`](crate::requisition::Requisition) holds one assignment for
//! the command name, one per parameter of the resolved command, and one for
//! input that no parameter accepted. Assignments own their conversion; which
//! parts of the input line produced it is tracked by the requisition.

use std::mem;

use crate::{
  argument::{
    Argument,
    ArgumentKind,
    BegetOptions,
  },
  canon::{
    Canon,
    Parameter,
  },
  conversion::{
    Conversion,
    Prediction,
  },
  status::Status,
  types::Type,
  value::Value,
};

/// Which assignment of a requisition something belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentId {
  Command,
  /// A parameter of the current command, by declaration index.
  Param(usize),
  Unassigned,
}

#[derive(Debug, Clone)]
pub struct Assignment {
  id:         AssignmentId,
  param:      Parameter,
  conversion: Conversion,
}

impl Assignment {
  pub(crate) fn new(id: AssignmentId, param: Parameter) -> Self {
    let mut assignment = Self {
      id,
      param,
      conversion: Conversion::valid(None, Argument::empty()),
    };
    assignment.conversion = assignment.default_conversion();
    assignment
  }

  pub(crate) fn command(canon: &Canon) -> Self {
    Self::new(
      AssignmentId::Command,
      Parameter::internal("__command", canon.command_type(), true),
    )
  }

  pub(crate) fn unassigned() -> Self {
    Self::new(
      AssignmentId::Unassigned,
      Parameter::internal("__unassigned", Type::String, false),
    )
  }

  pub fn id(&self) -> AssignmentId {
    self.id
  }

  pub fn param(&self) -> &Parameter {
    &self.param
  }

  pub fn name(&self) -> &str {
    self.param.name()
  }

  pub fn param_index(&self) -> Option<usize> {
    match self.id {
      AssignmentId::Param(index) => Some(index),
      _ => None,
    }
  }

  pub fn conversion(&self) -> &Conversion {
    &self.conversion
  }

  pub fn arg(&self) -> &Argument {
    self.conversion.arg()
  }

  pub fn value(&self) -> Option<&Value> {
    self.conversion.value()
  }

  pub fn message(&self) -> &str {
    self.conversion.message()
  }

  pub fn predictions(&self) -> Vec<Prediction> {
    self.conversion.predictions()
  }

  pub fn status(&self) -> Status {
    self.status_of(None)
  }

  /// Status of the whole assignment, or of one member of an array.
  ///
  /// A required parameter with nothing typed is an error. An optional one
  /// with nothing typed is fine whatever its type would make of the empty
  /// text.
  pub fn status_of(&self, member: Option<usize>) -> Status {
    if self.id == AssignmentId::Unassigned {
      return Status::Error;
    }

    let blank = self.arg().is_blank();
    let status = if self.param.is_data_required() {
      if blank || !self.conversion.is_data_provided() {
        Status::Error
      } else {
        self.conversion.status_of(member)
      }
    } else if blank {
      Status::Valid
    } else {
      self.conversion.status_of(member)
    };

    // A namespace alone can not run.
    let namespace = self.id == AssignmentId::Command
      && self
        .value()
        .and_then(Value::as_command)
        .is_some_and(|command| !command.is_executable());
    if namespace {
      Status::combine([status, Status::Incomplete])
    } else {
      status
    }
  }

  /// The parameter's default value, else its type's default. An optional
  /// parameter without either has no value; a required one gets whatever the
  /// type makes of empty input.
  pub fn default_conversion(&self) -> Conversion {
    let ty = self.param.ty().resolved();
    match self.param.default_value() {
      Some(value) if !ty.is_boolean() => Conversion::valid(Some(value.clone()), Argument::empty()),
      _ => ty.default_conversion().unwrap_or_else(|| {
        if self.param.is_data_required() {
          ty.parse(Argument::empty())
        } else {
          Conversion::valid(None, Argument::empty())
        }
      }),
    }
  }

  pub(crate) fn set_default(&mut self) -> Option<Conversion> {
    self.replace(self.default_conversion())
  }

  /// Installs `conversion`, returning the previous one when it differed.
  pub(crate) fn replace(&mut self, conversion: Conversion) -> Option<Conversion> {
    let old = mem::replace(&mut self.conversion, conversion);
    (old != self.conversion).then_some(old)
  }

  /// Gives a blank assignment some text of its own, so that a positional
  /// parameter after it can be written without being read back into this
  /// one. Returns whether anything changed.
  pub(crate) fn ensure_visible_argument(&mut self) -> bool {
    let ty = self.param.ty().resolved();
    if ty.is_array() || !self.conversion.arg().is_blank() {
      return false;
    }

    let text = ty.stringify(self.conversion.value());
    let options = BegetOptions {
      prefix_space: self.id != AssignmentId::Command,
    };
    let arg = self.conversion.arg().beget(text, Some(options));
    self.conversion = ty.parse(arg);
    true
  }

  /// Puts a space between a plain argument and whatever precedes it in the
  /// line.
  pub(crate) fn separate(&mut self) {
    if matches!(self.conversion.arg().kind(), ArgumentKind::Plain) {
      let arg = self.conversion.arg_mut();
      *arg = mem::take(arg).with_leading_space();
    }
  }

  /// The conversion after accepting the first prediction, if there is one.
  pub(crate) fn completion(&self) -> Option<Conversion> {
    let prediction = self.predictions().into_iter().next()?;
    Some(self.conversion_for(&self.param.ty().resolved(), &prediction.value))
  }

  /// The conversion after stepping the value up (`forward`) or down, if the
  /// type can step.
  pub(crate) fn stepped(&self, forward: bool) -> Option<Conversion> {
    let ty = self.param.ty().resolved();
    let value = if forward {
      ty.increment(self.value())
    } else {
      ty.decrement(self.value())
    }?;
    Some(self.conversion_for(&ty, &value))
  }

  /// `value` written into this assignment's place in the input.
  fn conversion_for(&self, ty: &Type, value: &Value) -> Conversion {
    let arg = if ty.is_boolean() {
      match value.as_bool() {
        Some(true) => Argument::true_named(self.param.name(), None),
        _ => Argument::false_named(),
      }
    } else {
      self.place(ty.stringify(Some(value)))
    };
    ty.parse(arg)
  }

  /// Re-parses a conversion that was built from bare text, outside of any
  /// input line, so that its argument fits where this assignment sits.
  pub(crate) fn placed(&self, conversion: Conversion) -> Conversion {
    let arg = conversion.arg();
    let bare = matches!(arg.kind(), ArgumentKind::Plain)
      && arg.prefix().is_empty()
      && arg.suffix().is_empty()
      && !arg.text().is_empty();
    let ty = self.param.ty().resolved();
    if !bare || ty.is_boolean() {
      return conversion;
    }
    ty.parse(self.place(arg.text().to_string()))
  }

  fn place(&self, text: String) -> Argument {
    let current = self.conversion.arg();
    if self.id == AssignmentId::Command {
      // Command names may hold spaces; the splitter rejoins them.
      Argument::new(text, current.prefix(), current.suffix())
    } else if current.is_blank() && !self.param.is_positional_allowed() {
      let name = Argument::new(format!("--{}", self.param.name()), " ", "");
      let options = BegetOptions { prefix_space: true };
      Argument::named(name, Argument::empty().beget(text, Some(options)))
    } else {
      current.beget(text, None)
    }
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use super::*;
  use crate::{
    canon::{
      CommandSpec,
      ParamSpec,
    },
    command_line::tokenize,
    types::{
      TypeSpec,
      Types,
    },
  };

  fn canon() -> Canon {
    let canon = Canon::new(Types::with_builtins());
    canon
      .add_command(
        CommandSpec::new("demo")
          .param(ParamSpec::new("name", "string"))
          .param(ParamSpec::new("count", TypeSpec::new("number").min(0).max(10)).default_value(3))
          .param(ParamSpec::new("browser", TypeSpec::new("selection").names(["firefox", "chrome", "ie"])).optional())
          .param(ParamSpec::new("files", TypeSpec::new("array").subtype("string")).optional())
          .param(ParamSpec::new("verbose", "boolean"))
          .exec(|_, _| Ok(Default::default())),
      )
      .unwrap();
    canon.add_command(CommandSpec::new("tsg")).unwrap();
    canon
      .add_command(CommandSpec::new("tsg a").exec(|_, _| Ok(Default::default())))
      .unwrap();
    canon
  }

  fn assignment(canon: &Canon, param: &str) -> Assignment {
    let command = canon.command("demo").unwrap();
    let index = command.params().iter().position(|p| p.name() == param).unwrap();
    Assignment::new(AssignmentId::Param(index), command.params()[index].clone())
  }

  fn typed(text: &str) -> Argument {
    tokenize(text).remove(0)
  }

  #[track_caller]
  fn assert_status(assignment: &Assignment, status: Status) {
    assert_eq!(assignment.status(), status, "{assignment:?}");
  }

  #[test]
  fn defaults() {
    let canon = canon();

    let count = assignment(&canon, "count");
    assert_eq!(count.value(), Some(&Value::Number(3)));
    assert_status(&count, Status::Valid);

    let verbose = assignment(&canon, "verbose");
    assert_eq!(verbose.value(), Some(&Value::Boolean(false)));
    assert!(verbose.arg().is_blank());

    let files = assignment(&canon, "files");
    assert_eq!(files.value(), Some(&Value::Array(Vec::new())));
    assert!(files.arg().is_array());
  }

  #[test]
  fn required_without_input_is_an_error() {
    let canon = canon();
    let mut name = assignment(&canon, "name");
    assert_status(&name, Status::Error);

    name.replace(name.param().ty().parse(typed("fred")));
    assert_status(&name, Status::Valid);

    name.replace(name.param().ty().parse(typed("''")));
    assert_status(&name, Status::Valid);
  }

  #[test]
  fn optional_blank_input_is_valid() {
    let canon = canon();
    let mut browser = assignment(&canon, "browser");
    assert_status(&browser, Status::Valid);
    assert_eq!(browser.value(), None);

    browser.replace(browser.param().ty().parse(typed("f")));
    assert_status(&browser, Status::Incomplete);

    browser.replace(browser.param().ty().parse(typed("z")));
    assert_status(&browser, Status::Error);
  }

  #[test]
  fn namespaces_are_incomplete() {
    let canon = canon();
    let mut command = Assignment::command(&canon);
    assert_status(&command, Status::Error);

    let ty = command.param().ty().clone();
    command.replace(ty.parse(typed("tsg")));
    assert_status(&command, Status::Incomplete);

    command.replace(ty.parse(typed("demo")));
    assert_status(&command, Status::Valid);
  }

  #[test]
  fn unassigned_is_always_an_error() {
    assert_status(&Assignment::unassigned(), Status::Error);
  }

  #[test]
  fn replace_reports_changes_only() {
    let canon = canon();
    let mut count = assignment(&canon, "count");
    let ty = count.param().ty().clone();

    assert!(count.replace(ty.parse(typed("4"))).is_some());
    assert!(count.replace(ty.parse(typed("4"))).is_none());
    assert!(count.set_default().is_some());
  }

  #[test]
  fn ensure_visible_argument() {
    let canon = canon();

    let mut count = assignment(&canon, "count");
    assert!(count.ensure_visible_argument());
    assert_eq!(count.arg().to_string(), " 3");
    assert_eq!(count.value(), Some(&Value::Number(3)));
    assert!(!count.ensure_visible_argument());

    let mut browser = assignment(&canon, "browser");
    assert!(browser.ensure_visible_argument());
    assert_eq!(browser.arg().to_string(), " ''");

    let mut files = assignment(&canon, "files");
    assert!(!files.ensure_visible_argument());

    let mut command = Assignment::command(&canon);
    assert!(command.ensure_visible_argument());
    assert_eq!(command.arg().to_string(), "''");
  }

  #[test]
  fn completion_takes_first_prediction() {
    let canon = canon();
    let mut browser = assignment(&canon, "browser");
    browser.replace(browser.param().ty().parse(typed(" fi")));

    let completed = browser.completion().unwrap();
    assert_eq!(completed.value(), Some(&Value::from("firefox")));
    assert_eq!(completed.arg().to_string(), " firefox");
    assert_eq!(completed.status(), Status::Valid);

    assert!(assignment(&canon, "count").completion().is_none());
  }

  #[test]
  fn command_completion_keeps_spaces_unquoted() {
    let canon = canon();
    let mut command = Assignment::command(&canon);
    let ty = command.param().ty().clone();
    command.replace(ty.parse(Argument::merged(tokenize("tsg a"))));

    let completed = command.completion().unwrap();
    let value = completed.value().and_then(Value::as_command).map(Arc::clone);
    assert_eq!(value.map(|command| command.name().to_string()).as_deref(), Some("tsg a"));
    assert_eq!(completed.arg().to_string(), "tsg a");
    assert_eq!(completed.status(), Status::Valid);
  }

  #[test]
  fn stepping() {
    let canon = canon();
    let mut count = assignment(&canon, "count");
    count.replace(count.param().ty().parse(typed(" 9")));

    let up = count.stepped(true).unwrap();
    assert_eq!(up.value(), Some(&Value::Number(10)));
    assert_eq!(up.arg().to_string(), " 10");

    count.replace(up);
    assert_eq!(count.stepped(true).unwrap().value(), Some(&Value::Number(10)));
    assert_eq!(count.stepped(false).unwrap().value(), Some(&Value::Number(9)));

    assert!(assignment(&canon, "name").stepped(true).is_none());
  }

  #[test]
  fn stepping_booleans_writes_flags() {
    let canon = canon();
    let mut verbose = assignment(&canon, "verbose");

    let on = verbose.stepped(true).unwrap();
    assert_eq!(on.value(), Some(&Value::Boolean(true)));
    assert_eq!(on.arg().to_string(), " --verbose");

    verbose.replace(on);
    let off = verbose.stepped(true).unwrap();
    assert_eq!(off.value(), Some(&Value::Boolean(false)));
    assert!(off.arg().is_blank());
  }

  #[test]
  fn named_values_are_rewritten_in_place() {
    let canon = canon();
    let mut count = assignment(&canon, "count");
    let ty = count.param().ty().clone();
    count.replace(ty.parse(Argument::named(typed(" --count"), Argument::empty())));
    assert_status(&count, Status::Incomplete);

    let stepped = count.stepped(true).unwrap();
    assert_eq!(stepped.arg().to_string(), " --count 0");
    assert_eq!(stepped.status(), Status::Valid);
  }
}
