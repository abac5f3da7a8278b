//! Converters between argument text and typed values, and the registry that
//! builds them from names.
//!
//! Every [`Type`] can `parse` an [`Argument`] into a [`Conversion`] and
//! `stringify` a value back into text, such that parsing the stringified
//! form of a valid value gives the same value again.
//!
//! Parameters name their type with a [`TypeSpec`], which [`Types`] turns into
//! a concrete [`Type`]:
//!
//! ```
//! use the_lib::types::{
//!   Type,
//!   TypeSpec,
//!   Types,
//! };
//!
//! let types = Types::with_builtins();
//! let ty = types.get(TypeSpec::new("number").max(10)).unwrap();
//!
//! assert!(ty.parse_string("7").status().is_valid());
//! assert!(!ty.parse_string("15").status().is_valid());
//! assert!(types.get(TypeSpec::new("string").max(10)).is_err());
//! ```

use std::{
  borrow::Cow,
  collections::HashMap,
  fmt,
  sync::Arc,
};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use thiserror::Error;

use crate::{
  argument::{
    Argument,
    ArgumentKind,
  },
  canon::{
    Command,
    WeakCanon,
  },
  command_line::{
    quote,
    tokenize,
  },
  conversion::{
    Conversion,
    Prediction,
    Predictions,
  },
  value::Value,
};

/// Name to value table of a selection, in presentation order.
pub type Lookup = IndexMap<String, Value>;
pub type LookupFn = Arc<dyn Fn() -> Lookup + Send + Sync>;
/// Produces the concrete type behind a deferred type, on every use.
pub type Resolver = Arc<dyn Fn() -> Type + Send + Sync>;
pub type TypeFactory = Arc<dyn Fn(&TypeSpec, &Types) -> Result<Type, TypeError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum TypeError {
  #[error("unknown type '{name}'")]
  Unknown { name: String },
  #[error("type '{name}' can not be customized with '{option}'")]
  NotCustomizable { name: String, option: &'static str },
  #[error("selection type needs 'data'")]
  MissingData,
  #[error("deferred type needs a resolver")]
  MissingResolver,
}

#[derive(Clone)]
pub enum SelectionData {
  Fixed(Lookup),
  /// Recomputed every time the selection is used.
  Dynamic(LookupFn),
}

impl fmt::Debug for SelectionData {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SelectionData::Fixed(lookup) => f.debug_tuple("Fixed").field(lookup).finish(),
      SelectionData::Dynamic(_) => f.write_str("Dynamic(..)"),
    }
  }
}

/// One value out of a known set, chosen by name.
#[derive(Debug, Clone)]
pub struct Selection {
  data: SelectionData,
}

static BOOLEAN: Lazy<Selection> = Lazy::new(|| {
  Selection::new(IndexMap::from([
    ("true".to_string(), Value::Boolean(true)),
    ("false".to_string(), Value::Boolean(false)),
  ]))
});

impl Selection {
  pub fn new(lookup: Lookup) -> Self {
    Self::from_data(SelectionData::Fixed(lookup))
  }

  /// A selection whose values are the names themselves.
  pub fn from_names<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let lookup = names
      .into_iter()
      .map(|name| {
        let name = name.into();
        (name.clone(), Value::String(name))
      })
      .collect();
    Self::new(lookup)
  }

  pub fn dynamic(f: impl Fn() -> Lookup + Send + Sync + 'static) -> Self {
    Self::from_data(SelectionData::Dynamic(Arc::new(f)))
  }

  pub fn from_data(data: SelectionData) -> Self {
    Self { data }
  }

  pub fn lookup(&self) -> Cow<'_, Lookup> {
    match &self.data {
      SelectionData::Fixed(lookup) => Cow::Borrowed(lookup),
      SelectionData::Dynamic(f) => Cow::Owned(f()),
    }
  }

  /// The exact match alone if there is one, otherwise every name starting
  /// with `text`.
  fn completions(&self, text: &str) -> Vec<Prediction> {
    let lookup = self.lookup();
    if let Some(value) = lookup.get(text) {
      return vec![Prediction::new(text, value.clone())];
    }
    lookup
      .iter()
      .filter(|(name, _)| name.starts_with(text))
      .map(|(name, value)| Prediction::new(name.clone(), value.clone()))
      .collect()
  }

  fn parse(&self, arg: Argument) -> Conversion {
    let text = arg.text().to_string();
    let completions = self.completions(&text);

    match completions.as_slice() {
      [only] if only.name == text => Conversion::valid(Some(only.value.clone()), arg),
      [] => Conversion::error(None, arg, format!("Can't use '{text}'.")),
      _ => {
        let selection = self.clone();
        Conversion::incomplete(None, arg)
          .with_predictions(Predictions::lazy(move || selection.completions(&text)))
      },
    }
  }

  fn stringify(&self, value: Option<&Value>) -> String {
    let Some(value) = value else {
      return String::new();
    };
    self
      .lookup()
      .iter()
      .find(|(_, candidate)| *candidate == value)
      .map_or_else(|| value.to_string(), |(name, _)| name.clone())
  }

  /// Moves to the neighbouring entry, wrapping around at either end. With no
  /// current value, or one that is not in the table, starts at the first
  /// (forward) or last (backward) entry. When two entries hold equal values
  /// the first one is taken as the current position.
  fn step(&self, value: Option<&Value>, forward: bool) -> Option<Value> {
    let lookup = self.lookup();
    let len = lookup.len();
    if len == 0 {
      return None;
    }

    let current = value.and_then(|value| lookup.values().position(|candidate| candidate == value));
    let index = match (current, forward) {
      (None, true) => 0,
      (None, false) => len - 1,
      (Some(i), true) => (i + 1) % len,
      (Some(i), false) => (i + len - 1) % len,
    };
    lookup.get_index(index).map(|(_, value)| value.clone())
  }
}

/// Selects a registered command by name.
#[derive(Clone)]
pub struct CommandType {
  canon: WeakCanon,
}

impl CommandType {
  pub(crate) fn new(canon: WeakCanon) -> Self {
    Self { canon }
  }

  /// An executable command named exactly `text` alone; otherwise every command
  /// whose name starts with `text`. Sub-commands are left out while nothing
  /// has been typed.
  fn matches(&self, text: &str) -> Vec<Arc<Command>> {
    let Some(canon) = self.canon.upgrade() else {
      return Vec::new();
    };

    if let Some(exact) = canon.command(text).filter(|command| command.is_executable()) {
      return vec![exact];
    }

    canon
      .commands()
      .into_iter()
      .filter(|command| {
        command.name().starts_with(text) && (!text.is_empty() || !command.name().contains(' '))
      })
      .collect()
  }

  fn parse(&self, arg: Argument) -> Conversion {
    let text = arg.text().to_string();
    let matches = self.matches(&text);
    let value = matches
      .iter()
      .find(|command| command.name() == text)
      .cloned();

    let predictions = {
      let this = self.clone();
      let text = text.clone();
      Predictions::lazy(move || {
        this
          .matches(&text)
          .into_iter()
          .map(|command| Prediction::new(command.name().to_string(), command))
          .collect()
      })
    };

    let executable = value.as_ref().is_some_and(|command| command.is_executable());
    let value = value.map(Value::Command);
    let conversion = match matches.len() {
      0 => Conversion::error(None, arg, format!("Can't use '{text}'.")),
      1 if executable => Conversion::valid(value, arg),
      _ => Conversion::incomplete(value, arg),
    };
    conversion.with_predictions(predictions)
  }

  fn step(&self, value: Option<&Value>, forward: bool) -> Option<Value> {
    let canon = self.canon.upgrade()?;
    let names = canon.command_names();
    let len = names.len();
    if len == 0 {
      return None;
    }

    let current = value
      .and_then(Value::as_command)
      .and_then(|command| names.iter().position(|name| name == command.name()));
    let index = match (current, forward) {
      (None, true) => 0,
      (None, false) => len - 1,
      (Some(i), true) => (i + 1) % len,
      (Some(i), false) => (i + len - 1) % len,
    };
    canon.command(&names[index]).map(Value::Command)
  }
}

#[derive(Clone)]
pub enum Type {
  String,
  /// Integers, optionally bounded. Out-of-range values are reported, never
  /// clamped.
  Number {
    min:  Option<i64>,
    max:  Option<i64>,
    step: Option<i64>,
  },
  /// A two-valued selection that also understands `--flag` arguments.
  Boolean,
  Selection(Selection),
  Array(Box<Type>),
  Deferred(Resolver),
  /// Placeholder for a type that is not known yet.
  Blank,
  Command(CommandType),
}

impl Type {
  pub fn name(&self) -> &'static str {
    match self {
      Type::String => "string",
      Type::Number { .. } => "number",
      Type::Boolean => "boolean",
      Type::Selection(_) => "selection",
      Type::Array(_) => "array",
      Type::Deferred(_) => "deferred",
      Type::Blank => "blank",
      Type::Command(_) => "command",
    }
  }

  pub fn is_string(&self) -> bool {
    match self {
      Type::Deferred(resolve) => resolve().is_string(),
      other => matches!(other, Type::String),
    }
  }

  pub fn is_boolean(&self) -> bool {
    match self {
      Type::Deferred(resolve) => resolve().is_boolean(),
      other => matches!(other, Type::Boolean),
    }
  }

  pub fn is_array(&self) -> bool {
    match self {
      Type::Deferred(resolve) => resolve().is_array(),
      other => matches!(other, Type::Array(_)),
    }
  }

  /// The type a deferred type stands for right now. Other types are
  /// returned as they are.
  pub fn resolved(&self) -> Cow<'_, Type> {
    match self {
      Type::Deferred(resolve) => Cow::Owned(resolve().resolved().into_owned()),
      other => Cow::Borrowed(other),
    }
  }

  /// Converts an argument.
  ///
  /// # Panics
  ///
  /// Array types only accept array arguments; anything else is a bug in the
  /// caller.
  pub fn parse(&self, arg: Argument) -> Conversion {
    match self {
      Type::String => Conversion::valid(Some(Value::String(arg.text().to_string())), arg),
      Type::Number { min, max, .. } => parse_number(arg, *min, *max),
      Type::Boolean => match arg.kind() {
        ArgumentKind::TrueNamed(_) => Conversion::valid(Some(Value::Boolean(true)), arg),
        ArgumentKind::FalseNamed => Conversion::valid(Some(Value::Boolean(false)), arg),
        _ => BOOLEAN.parse(arg),
      },
      Type::Selection(selection) => selection.parse(arg),
      Type::Array(subtype) => {
        assert!(arg.is_array(), "array type given a non-array argument: {arg:?}");
        let members = arg
          .members()
          .iter()
          .map(|member| subtype.parse(member.clone()))
          .collect();
        Conversion::array(members, arg)
      },
      Type::Deferred(resolve) => resolve().parse(arg),
      Type::Blank => Conversion::valid(None, arg),
      Type::Command(command) => command.parse(arg),
    }
  }

  /// Converts bare text, as if it had been typed with no surrounding
  /// whitespace. Array types split the text into members first.
  pub fn parse_string(&self, text: &str) -> Conversion {
    match self {
      Type::Array(_) => {
        let members = if text.trim().is_empty() {
          Vec::new()
        } else {
          tokenize(text)
        };
        self.parse(Argument::array(members))
      },
      Type::Deferred(resolve) => resolve().parse_string(text),
      _ => self.parse(Argument::new(text, "", "")),
    }
  }

  /// Text that parses back into `value`. `None` stringifies to the empty
  /// string.
  pub fn stringify(&self, value: Option<&Value>) -> String {
    match self {
      Type::Selection(selection) => selection.stringify(value),
      Type::Array(subtype) => match value {
        Some(Value::Array(values)) => values
          .iter()
          .map(|value| quote(&subtype.stringify(Some(value))))
          .collect::<Vec<_>>()
          .join(" "),
        other => subtype.stringify(other),
      },
      Type::Deferred(resolve) => resolve().stringify(value),
      Type::Blank => String::new(),
      _ => value.map(ToString::to_string).unwrap_or_default(),
    }
  }

  /// The value after `value`, or `None` when this type can not step.
  pub fn increment(&self, value: Option<&Value>) -> Option<Value> {
    self.step(value, true)
  }

  /// The value before `value`, or `None` when this type can not step.
  pub fn decrement(&self, value: Option<&Value>) -> Option<Value> {
    self.step(value, false)
  }

  fn step(&self, value: Option<&Value>, forward: bool) -> Option<Value> {
    match self {
      Type::Number { min, max, step } => step_number(value, *min, *max, *step, forward),
      Type::Boolean => BOOLEAN.step(value, forward),
      Type::Selection(selection) => selection.step(value, forward),
      Type::Deferred(resolve) => resolve().step(value, forward),
      Type::Command(command) => command.step(value, forward),
      Type::String | Type::Array(_) | Type::Blank => None,
    }
  }

  /// The conversion a parameter of this type starts with when it has no
  /// default of its own, if the type defines one.
  pub fn default_conversion(&self) -> Option<Conversion> {
    match self {
      Type::Boolean => Some(Conversion::valid(
        Some(Value::Boolean(false)),
        Argument::false_named(),
      )),
      Type::Array(_) => Some(Conversion::array(Vec::new(), Argument::array(Vec::new()))),
      Type::Deferred(resolve) => resolve().default_conversion(),
      _ => None,
    }
  }
}

impl fmt::Debug for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Type::Number { min, max, step } => f
        .debug_struct("Number")
        .field("min", min)
        .field("max", max)
        .field("step", step)
        .finish(),
      Type::Selection(selection) => f.debug_tuple("Selection").field(selection).finish(),
      Type::Array(subtype) => f.debug_tuple("Array").field(subtype).finish(),
      other => f.write_str(other.name()),
    }
  }
}

fn parse_number(arg: Argument, min: Option<i64>, max: Option<i64>) -> Conversion {
  let text = arg.text();
  if text.chars().all(char::is_whitespace) {
    return Conversion::incomplete(None, arg);
  }

  let value = match text.trim().parse::<i64>() {
    Ok(value) => value,
    Err(_) => {
      let message = format!("Can't convert \"{text}\" to a number.");
      return Conversion::error(None, arg, message);
    },
  };

  if let Some(max) = max.filter(|max| value > *max) {
    let message = format!("{value} is greater than maximum allowed: {max}.");
    return Conversion::error(Some(Value::Number(value)), arg, message);
  }
  if let Some(min) = min.filter(|min| value < *min) {
    let message = format!("{value} is smaller than minimum allowed: {min}.");
    return Conversion::error(Some(Value::Number(value)), arg, message);
  }

  Conversion::valid(Some(Value::Number(value)), arg)
}

/// Steps by `step` (default 1) and stays put when that would leave the
/// bounds. Without a current value, starts from the minimum, or zero.
fn step_number(
  value: Option<&Value>,
  min: Option<i64>,
  max: Option<i64>,
  step: Option<i64>,
  forward: bool,
) -> Option<Value> {
  let step = step.map_or(1, i64::abs).max(1);
  let Some(current) = value.and_then(Value::as_number) else {
    let start = min.unwrap_or(0);
    return Some(Value::Number(max.map_or(start, |max| start.min(max))));
  };

  let next = if forward {
    current.saturating_add(step)
  } else {
    current.saturating_sub(step)
  };
  let in_bounds = min.is_none_or(|min| next >= min) && max.is_none_or(|max| next <= max);
  Some(Value::Number(if in_bounds { next } else { current }))
}

/// A type name plus the options used to configure it.
#[derive(Clone, Default)]
pub struct TypeSpec {
  name:    String,
  min:     Option<i64>,
  max:     Option<i64>,
  step:    Option<i64>,
  data:    Option<SelectionData>,
  subtype: Option<Box<TypeSpec>>,
  defer:   Option<Resolver>,
}

impl TypeSpec {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn min(mut self, min: i64) -> Self {
    self.min = Some(min);
    self
  }

  pub fn max(mut self, max: i64) -> Self {
    self.max = Some(max);
    self
  }

  pub fn step(mut self, step: i64) -> Self {
    self.step = Some(step);
    self
  }

  pub fn data(mut self, data: SelectionData) -> Self {
    self.data = Some(data);
    self
  }

  pub fn lookup(self, lookup: Lookup) -> Self {
    self.data(SelectionData::Fixed(lookup))
  }

  /// Selection data whose values are the names themselves.
  pub fn names<I, S>(self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let lookup = names
      .into_iter()
      .map(|name| {
        let name = name.into();
        (name.clone(), Value::String(name))
      })
      .collect();
    self.lookup(lookup)
  }

  pub fn dynamic(self, f: impl Fn() -> Lookup + Send + Sync + 'static) -> Self {
    self.data(SelectionData::Dynamic(Arc::new(f)))
  }

  pub fn subtype(mut self, subtype: impl Into<TypeSpec>) -> Self {
    self.subtype = Some(Box::new(subtype.into()));
    self
  }

  pub fn defer(mut self, resolve: impl Fn() -> Type + Send + Sync + 'static) -> Self {
    self.defer = Some(Arc::new(resolve));
    self
  }

  fn options(&self) -> impl Iterator<Item = &'static str> {
    [
      ("min", self.min.is_some()),
      ("max", self.max.is_some()),
      ("step", self.step.is_some()),
      ("data", self.data.is_some()),
      ("subtype", self.subtype.is_some()),
      ("defer", self.defer.is_some()),
    ]
    .into_iter()
    .filter_map(|(option, set)| set.then_some(option))
  }

  /// Fails on the first option that is set but not in `accepted`.
  pub fn accept_only(&self, accepted: &[&str]) -> Result<(), TypeError> {
    match self.options().find(|option| !accepted.contains(option)) {
      Some(option) => Err(TypeError::NotCustomizable {
        name: self.name.clone(),
        option,
      }),
      None => Ok(()),
    }
  }
}

impl fmt::Debug for TypeSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeSpec")
      .field("name", &self.name)
      .field("options", &self.options().collect::<Vec<_>>())
      .field("subtype", &self.subtype)
      .finish()
  }
}

impl From<&str> for TypeSpec {
  fn from(name: &str) -> Self {
    Self::new(name)
  }
}

impl From<String> for TypeSpec {
  fn from(name: String) -> Self {
    Self::new(name)
  }
}

impl From<&TypeSpec> for TypeSpec {
  fn from(spec: &TypeSpec) -> Self {
    spec.clone()
  }
}

/// Registry of type factories by name.
///
/// Cloning gives another handle to the same registry.
#[derive(Clone, Default)]
pub struct Types {
  factories: Arc<RwLock<HashMap<String, TypeFactory>>>,
}

impl Types {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry holding string, number, boolean, selection, array, deferred
  /// and blank.
  pub fn with_builtins() -> Self {
    let types = Self::new();

    types.register("string", |spec, _| {
      spec.accept_only(&[])?;
      Ok(Type::String)
    });
    types.register("number", |spec, _| {
      spec.accept_only(&["min", "max", "step"])?;
      Ok(Type::Number {
        min:  spec.min,
        max:  spec.max,
        step: spec.step,
      })
    });
    types.register("boolean", |spec, _| {
      spec.accept_only(&[])?;
      Ok(Type::Boolean)
    });
    types.register("selection", |spec, _| {
      spec.accept_only(&["data"])?;
      let data = spec.data.clone().ok_or(TypeError::MissingData)?;
      Ok(Type::Selection(Selection::from_data(data)))
    });
    types.register("array", |spec, types| {
      spec.accept_only(&["subtype"])?;
      let subtype = match &spec.subtype {
        Some(subtype) => types.get(subtype.as_ref())?,
        None => {
          tracing::warn!("array type without a subtype, assuming string");
          Type::String
        },
      };
      Ok(Type::Array(Box::new(subtype)))
    });
    types.register("deferred", |spec, _| {
      spec.accept_only(&["defer"])?;
      spec
        .defer
        .clone()
        .map(Type::Deferred)
        .ok_or(TypeError::MissingResolver)
    });
    types.register("blank", |spec, _| {
      spec.accept_only(&[])?;
      Ok(Type::Blank)
    });

    types
  }

  /// Registers `factory` under `name`, replacing any earlier registration.
  pub fn register<F>(&self, name: impl Into<String>, factory: F)
  where
    F: Fn(&TypeSpec, &Types) -> Result<Type, TypeError> + Send + Sync + 'static,
  {
    let name = name.into();
    tracing::trace!(%name, "registering type");
    self.factories.write().insert(name, Arc::new(factory));
  }

  pub fn deregister(&self, name: &str) -> bool {
    self.factories.write().remove(name).is_some()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.factories.read().contains_key(name)
  }

  /// Builds the type `spec` describes.
  pub fn get(&self, spec: impl Into<TypeSpec>) -> Result<Type, TypeError> {
    let spec = spec.into();
    // Factories may look up other types, so never call one under the lock.
    let factory = self
      .factories
      .read()
      .get(&spec.name)
      .cloned()
      .ok_or_else(|| TypeError::Unknown {
        name: spec.name.clone(),
      })?;
    factory(&spec, self)
  }

  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<_> = self.factories.read().keys().cloned().collect();
    names.sort();
    names
  }
}

impl fmt::Debug for Types {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Types").field("names", &self.names()).finish()
  }
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{
    AtomicUsize,
    Ordering,
  };

  use quickcheck::quickcheck;

  use super::*;
  use crate::status::Status;

  #[track_caller]
  fn assert_parse(ty: &Type, text: &str, status: Status, value: Option<Value>) {
    let conversion = ty.parse_string(text);
    assert_eq!(conversion.status(), status, "status of {text:?}");
    assert_eq!(conversion.value(), value.as_ref(), "value of {text:?}");
  }

  fn number(min: Option<i64>, max: Option<i64>) -> Type {
    Type::Number {
      min,
      max,
      step: None,
    }
  }

  #[test]
  fn number_parse() {
    let ty = number(Some(0), Some(10));

    assert_parse(&ty, "", Status::Incomplete, None);
    assert_parse(&ty, "  ", Status::Incomplete, None);
    assert_parse(&ty, "7", Status::Valid, Some(Value::Number(7)));
    assert_parse(&ty, "abc", Status::Error, None);
    assert_parse(&ty, "1.5", Status::Error, None);
    assert_parse(&ty, "15", Status::Error, Some(Value::Number(15)));
    assert_parse(&ty, "-1", Status::Error, Some(Value::Number(-1)));

    assert_eq!(
      ty.parse_string("15").message(),
      "15 is greater than maximum allowed: 10."
    );
    assert_eq!(
      ty.parse_string("-1").message(),
      "-1 is smaller than minimum allowed: 0."
    );
    assert_eq!(
      ty.parse_string("abc").message(),
      "Can't convert \"abc\" to a number."
    );
  }

  #[test]
  fn number_steps_within_bounds() {
    let ty = Type::Number {
      min:  Some(0),
      max:  Some(10),
      step: Some(4),
    };

    assert_eq!(ty.increment(None), Some(Value::Number(0)));
    assert_eq!(ty.increment(Some(&Value::Number(4))), Some(Value::Number(8)));
    assert_eq!(ty.increment(Some(&Value::Number(8))), Some(Value::Number(8)));
    assert_eq!(ty.decrement(Some(&Value::Number(3))), Some(Value::Number(3)));
    assert_eq!(ty.decrement(Some(&Value::Number(10))), Some(Value::Number(6)));

    let open = number(None, None);
    assert_eq!(open.decrement(Some(&Value::Number(0))), Some(Value::Number(-1)));
  }

  #[test]
  fn selection_matching() {
    let ty = Type::Selection(Selection::from_names(["apple", "apricot", "banana"]));

    assert_parse(&ty, "banana", Status::Valid, Some(Value::from("banana")));
    assert_parse(&ty, "ap", Status::Incomplete, None);
    assert_parse(&ty, "z", Status::Error, None);
    assert_eq!(ty.parse_string("z").message(), "Can't use 'z'.");

    let names: Vec<_> = ty
      .parse_string("ap")
      .predictions()
      .into_iter()
      .map(|prediction| prediction.name)
      .collect();
    assert_eq!(names, ["apple", "apricot"]);
  }

  #[test]
  fn selection_steps_wrap_around() {
    let ty = Type::Selection(Selection::from_names(["a", "b", "c"]));

    assert_eq!(ty.increment(None), Some(Value::from("a")));
    assert_eq!(ty.decrement(None), Some(Value::from("c")));
    assert_eq!(ty.increment(Some(&Value::from("c"))), Some(Value::from("a")));
    assert_eq!(ty.decrement(Some(&Value::from("a"))), Some(Value::from("c")));
    assert_eq!(ty.increment(Some(&Value::from("zzz"))), Some(Value::from("a")));
  }

  #[test]
  fn selection_stringifies_through_the_lookup() {
    let ty = Type::Selection(Selection::new(IndexMap::from([
      ("one".to_string(), Value::Number(1)),
      ("two".to_string(), Value::Number(2)),
    ])));

    assert_eq!(ty.stringify(Some(&Value::Number(2))), "two");
    assert_eq!(ty.parse_string("two").value(), Some(&Value::Number(2)));
  }

  #[test]
  fn dynamic_selection_is_recomputed() {
    let calls = Arc::new(AtomicUsize::new(0));
    let selection = Selection::dynamic({
      let calls = calls.clone();
      move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        IndexMap::from([(format!("v{n}"), Value::Number(n as i64))])
      }
    });
    let ty = Type::Selection(selection);

    assert_parse(&ty, "v0", Status::Valid, Some(Value::Number(0)));
    assert_parse(&ty, "v0", Status::Error, None);
  }

  #[test]
  fn boolean_understands_flags() {
    let ty = Type::Boolean;

    let on = ty.parse(Argument::true_named("verbose", None));
    assert_eq!(on.value(), Some(&Value::Boolean(true)));
    let off = ty.parse(Argument::false_named());
    assert_eq!(off.value(), Some(&Value::Boolean(false)));

    assert_parse(&ty, "true", Status::Valid, Some(Value::Boolean(true)));
    assert_parse(&ty, "t", Status::Incomplete, None);
    assert_parse(&ty, "x", Status::Error, None);
    assert_eq!(ty.stringify(Some(&Value::Boolean(false))), "false");

    let default = ty.default_conversion().unwrap();
    assert_eq!(default.value(), Some(&Value::Boolean(false)));
    assert!(matches!(default.arg().kind(), ArgumentKind::FalseNamed));
  }

  #[test]
  fn array_members() {
    let ty = Type::Array(Box::new(number(None, Some(10))));

    let conversion = ty.parse_string("1 2 30");
    assert_eq!(
      conversion.value(),
      Some(&Value::Array(vec![Value::Number(1), Value::Number(2), Value::Number(30)]))
    );
    assert_eq!(conversion.status(), Status::Error);
    assert_eq!(conversion.status_of(Some(1)), Status::Valid);
    assert_eq!(conversion.status_of(Some(2)), Status::Error);

    assert_parse(&ty, "", Status::Valid, Some(Value::Array(Vec::new())));
  }

  #[test]
  fn array_stringify_quotes_members() {
    let ty = Type::Array(Box::new(Type::String));
    let value = Value::Array(vec![Value::from("a"), Value::from("b c")]);

    let text = ty.stringify(Some(&value));
    assert_eq!(text, "a 'b c'");
    assert_eq!(ty.parse_string(&text).value(), Some(&value));
  }

  #[test]
  #[should_panic(expected = "non-array argument")]
  fn array_rejects_plain_arguments() {
    Type::Array(Box::new(Type::String)).parse(Argument::new("a", "", ""));
  }

  #[test]
  fn deferred_resolves_on_every_use() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ty = Type::Deferred(Arc::new({
      let calls = calls.clone();
      move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Type::Boolean
      }
    }));

    assert_parse(&ty, "true", Status::Valid, Some(Value::Boolean(true)));
    assert!(ty.default_conversion().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn resolved_unwraps_nested_deferred_types() {
    let inner = Type::Deferred(Arc::new(|| Type::Array(Box::new(Type::String))));
    let outer = Type::Deferred(Arc::new(move || inner.clone()));

    assert!(matches!(outer.resolved().as_ref(), Type::Array(_)));
    assert!(matches!(Type::String.resolved(), Cow::Borrowed(Type::String)));
  }

  #[test]
  fn blank_is_always_valid_and_empty() {
    assert_parse(&Type::Blank, "anything", Status::Valid, None);
    assert_eq!(Type::Blank.stringify(Some(&Value::from("x"))), "");
  }

  #[test]
  fn registry_builds_types() {
    let types = Types::with_builtins();

    assert!(matches!(
      types.get("number").unwrap(),
      Type::Number { min: None, .. }
    ));
    assert!(matches!(types.get("nope"), Err(TypeError::Unknown { .. })));
    assert!(matches!(
      types.get(TypeSpec::new("boolean").min(1)),
      Err(TypeError::NotCustomizable { option: "min", .. })
    ));
    assert!(matches!(types.get("selection"), Err(TypeError::MissingData)));
    assert!(matches!(types.get("deferred"), Err(TypeError::MissingResolver)));

    let array = types.get("array").unwrap();
    assert!(matches!(array, Type::Array(subtype) if subtype.is_string()));

    let numbers = types
      .get(TypeSpec::new("array").subtype(TypeSpec::new("number").max(3)))
      .unwrap();
    assert_eq!(numbers.parse_string("1 4").status(), Status::Error);
  }

  #[test]
  fn registry_aliases_and_deregistration() {
    let types = Types::with_builtins();
    types.register("port", |spec, types| {
      spec.accept_only(&[])?;
      types.get(TypeSpec::new("number").min(1).max(65535))
    });

    let port = types.get("port").unwrap();
    assert_eq!(port.parse_string("8080").status(), Status::Valid);
    assert_eq!(port.parse_string("0").status(), Status::Error);
    assert!(types.names().contains(&"port".to_string()));

    assert!(types.deregister("port"));
    assert!(!types.deregister("port"));
    assert!(!types.contains("port"));
  }

  quickcheck! {
    fn number_round_trips(n: i64) -> bool {
      let ty = number(None, None);
      ty.parse_string(&ty.stringify(Some(&Value::Number(n)))).value() == Some(&Value::Number(n))
    }
  }
}
