//! Typed values produced by parsing and handed to command handlers.

use std::{
  fmt,
  sync::Arc,
};

use indexmap::IndexMap;

use crate::canon::Command;

/// A converted argument value.
#[derive(Debug, Clone)]
pub enum Value {
  String(String),
  Number(i64),
  Boolean(bool),
  /// A registered command. Two command values are equal when they name the
  /// same command.
  Command(Arc<Command>),
  Array(Vec<Value>),
}

impl Value {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(text) => Some(text),
      _ => None,
    }
  }

  pub fn as_number(&self) -> Option<i64> {
    match self {
      Value::Number(number) => Some(*number),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Boolean(flag) => Some(*flag),
      _ => None,
    }
  }

  pub fn as_command(&self) -> Option<&Arc<Command>> {
    match self {
      Value::Command(command) => Some(command),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&[Value]> {
    match self {
      Value::Array(values) => Some(values),
      _ => None,
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => a == b,
      (Value::Boolean(a), Value::Boolean(b)) => a == b,
      (Value::Command(a), Value::Command(b)) => a.name() == b.name(),
      (Value::Array(a), Value::Array(b)) => a == b,
      _ => false,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::String(text) => f.write_str(text),
      Value::Number(number) => write!(f, "{number}"),
      Value::Boolean(flag) => write!(f, "{flag}"),
      Value::Command(command) => f.write_str(command.name()),
      Value::Array(values) => {
        for (i, value) in values.iter().enumerate() {
          if i > 0 {
            f.write_str(" ")?;
          }
          write!(f, "{value}")?;
        }
        Ok(())
      },
    }
  }
}

impl From<&str> for Value {
  fn from(text: &str) -> Self {
    Value::String(text.to_string())
  }
}

impl From<String> for Value {
  fn from(text: String) -> Self {
    Value::String(text)
  }
}

impl From<i64> for Value {
  fn from(number: i64) -> Self {
    Value::Number(number)
  }
}

impl From<bool> for Value {
  fn from(flag: bool) -> Self {
    Value::Boolean(flag)
  }
}

impl From<Arc<Command>> for Value {
  fn from(command: Arc<Command>) -> Self {
    Value::Command(command)
  }
}

impl From<Vec<Value>> for Value {
  fn from(values: Vec<Value>) -> Self {
    Value::Array(values)
  }
}

/// The argument object passed to a command handler: parameter name to value,
/// in parameter declaration order. A parameter that converted to nothing maps
/// to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
  values: IndexMap<String, Option<Value>>,
}

impl Args {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, value: Option<Value>) {
    self.values.insert(name.into(), value);
  }

  /// Builder form of [`Args::insert`] for a present value.
  pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(name, Some(value.into()));
    self
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.values.get(name).and_then(Option::as_ref)
  }

  pub fn get_str(&self, name: &str) -> Option<&str> {
    self.get(name).and_then(Value::as_str)
  }

  pub fn get_number(&self, name: &str) -> Option<i64> {
    self.get(name).and_then(Value::as_number)
  }

  pub fn get_bool(&self, name: &str) -> Option<bool> {
    self.get(name).and_then(Value::as_bool)
  }

  pub fn get_array(&self, name: &str) -> Option<&[Value]> {
    self.get(name).and_then(Value::as_array)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
    self
      .values
      .iter()
      .map(|(name, value)| (name.as_str(), value.as_ref()))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl FromIterator<(String, Option<Value>)> for Args {
  fn from_iter<I: IntoIterator<Item = (String, Option<Value>)>>(iter: I) -> Self {
    Self {
      values: iter.into_iter().collect(),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn display_joins_arrays_with_spaces() {
    let value = Value::Array(vec![Value::from("a"), Value::from(2), Value::from(true)]);
    assert_eq!(value.to_string(), "a 2 true");
  }

  #[test]
  fn variants_never_compare_equal_across_kinds() {
    assert_ne!(Value::from("1"), Value::from(1));
    assert_ne!(Value::from("true"), Value::from(true));
  }

  #[test]
  fn args_keep_declaration_order_and_typed_lookups() {
    let mut args = Args::new().with("name", "fred").with("count", 3);
    args.insert("missing", None);

    let names: Vec<_> = args.iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["name", "count", "missing"]);
    assert_eq!(args.get_str("name"), Some("fred"));
    assert_eq!(args.get_number("count"), Some(3));
    assert_eq!(args.get_str("count"), None);
    assert!(args.contains("missing"));
    assert_eq!(args.get("missing"), None);
  }
}
