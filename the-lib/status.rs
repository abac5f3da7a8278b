//! How acceptable a piece of input is.

use std::fmt;

use serde::{
  Deserialize,
  Serialize,
};

/// Input status, ordered from best to worst.
///
/// Aggregating a group of statuses takes the worst one, so a requisition is
/// only [`Status::Valid`] when every part of it is.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
  /// The input can be executed as is.
  #[default]
  Valid,
  /// The input is not usable yet, but could become valid with more typing.
  Incomplete,
  /// The input can not become valid by appending to it.
  Error,
}

impl Status {
  /// The worst of `statuses`, or [`Status::Valid`] for an empty iterator.
  pub fn combine(statuses: impl IntoIterator<Item = Status>) -> Status {
    statuses.into_iter().max().unwrap_or_default()
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Status::Valid => "VALID",
      Status::Incomplete => "INCOMPLETE",
      Status::Error => "ERROR",
    }
  }

  pub fn is_valid(self) -> bool {
    self == Status::Valid
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
