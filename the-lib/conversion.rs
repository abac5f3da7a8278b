//! The result of parsing one argument with a type.

use std::{
  fmt,
  sync::Arc,
};

use crate::{
  argument::Argument,
  status::Status,
  value::Value,
};

/// A completion candidate: the display name and the value it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
  pub name:  String,
  pub value: Value,
}

impl Prediction {
  pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
    Self {
      name:  name.into(),
      value: value.into(),
    }
  }
}

pub type PredictionFn = Arc<dyn Fn() -> Vec<Prediction> + Send + Sync>;

/// Completion candidates, computed eagerly or on first request.
#[derive(Clone, Default)]
pub enum Predictions {
  #[default]
  None,
  Fixed(Vec<Prediction>),
  Lazy(PredictionFn),
}

impl Predictions {
  pub fn lazy(f: impl Fn() -> Vec<Prediction> + Send + Sync + 'static) -> Self {
    Predictions::Lazy(Arc::new(f))
  }

  pub fn get(&self) -> Vec<Prediction> {
    match self {
      Predictions::None => Vec::new(),
      Predictions::Fixed(predictions) => predictions.clone(),
      Predictions::Lazy(f) => f(),
    }
  }
}

impl fmt::Debug for Predictions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Predictions::None => f.write_str("None"),
      Predictions::Fixed(predictions) => f.debug_tuple("Fixed").field(predictions).finish(),
      Predictions::Lazy(_) => f.write_str("Lazy(..)"),
    }
  }
}

/// What a type made of an argument: the value (if any), how acceptable it is,
/// why, and what the user might have meant.
///
/// Array conversions additionally carry one member conversion per array
/// element; their value is the array of member values.
#[derive(Debug, Clone)]
pub struct Conversion {
  value:       Option<Value>,
  arg:         Argument,
  status:      Status,
  message:     Option<String>,
  predictions: Predictions,
  members:     Option<Vec<Conversion>>,
}

impl Conversion {
  pub fn new(value: Option<Value>, arg: Argument, status: Status) -> Self {
    Self {
      value,
      arg,
      status,
      message: None,
      predictions: Predictions::None,
      members: None,
    }
  }

  pub fn valid(value: Option<Value>, arg: Argument) -> Self {
    Self::new(value, arg, Status::Valid)
  }

  pub fn incomplete(value: Option<Value>, arg: Argument) -> Self {
    Self::new(value, arg, Status::Incomplete)
  }

  pub fn error(value: Option<Value>, arg: Argument, message: impl Into<String>) -> Self {
    Self::new(value, arg, Status::Error).with_message(message)
  }

  /// An array conversion. Its status is the worst member status.
  pub fn array(members: Vec<Conversion>, arg: Argument) -> Self {
    let values = members.iter().filter_map(|member| member.value.clone()).collect();
    let status = Status::combine(members.iter().map(|member| member.status));
    Self {
      value: Some(Value::Array(values)),
      arg,
      status,
      message: None,
      predictions: Predictions::None,
      members: Some(members),
    }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }

  pub fn with_predictions(mut self, predictions: Predictions) -> Self {
    self.predictions = predictions;
    self
  }

  pub fn value(&self) -> Option<&Value> {
    self.value.as_ref()
  }

  pub fn arg(&self) -> &Argument {
    &self.arg
  }

  pub(crate) fn arg_mut(&mut self) -> &mut Argument {
    &mut self.arg
  }

  pub fn status(&self) -> Status {
    self.status
  }

  /// Status of one array member, or of the whole conversion when `member` is
  /// `None` or out of range.
  pub fn status_of(&self, member: Option<usize>) -> Status {
    match (member, &self.members) {
      (Some(index), Some(members)) => members
        .get(index)
        .map_or(self.status, |member| member.status),
      _ => self.status,
    }
  }

  /// The message explaining the status; empty when there is none.
  pub fn message(&self) -> &str {
    match (&self.message, &self.members) {
      (Some(message), _) => message,
      (None, Some(members)) => members
        .iter()
        .find_map(|member| member.message.as_deref())
        .unwrap_or_default(),
      (None, None) => "",
    }
  }

  pub fn predictions(&self) -> Vec<Prediction> {
    self.predictions.get()
  }

  pub fn members(&self) -> Option<&[Conversion]> {
    self.members.as_deref()
  }

  /// Did the user give us anything to work with?
  pub fn is_data_provided(&self) -> bool {
    match &self.members {
      Some(members) => !members.is_empty(),
      None => self.value.is_some() || !self.arg.text().is_empty(),
    }
  }

  pub fn value_equals(&self, other: &Conversion) -> bool {
    match (&self.members, &other.members) {
      (Some(a), Some(b)) => {
        a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.value == b.value)
      },
      _ => self.value == other.value,
    }
  }

  pub fn arg_equals(&self, other: &Conversion) -> bool {
    self.arg == other.arg
  }
}

/// Equal when both the value and the argument are equal. Status and
/// predictions are derived from those and do not take part.
impl PartialEq for Conversion {
  fn eq(&self, other: &Self) -> bool {
    self.value_equals(other) && self.arg_equals(other)
  }
}
