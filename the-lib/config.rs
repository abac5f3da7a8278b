use serde::{
  Deserialize,
  Serialize,
};

/// Tuning for a [`Requisition`](crate::requisition::Requisition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RequisitionConfig {
  /// Upper bound on the predictions offered for one assignment.
  pub max_predictions:    usize,
  /// Report INCOMPLETE input away from the cursor as ERROR in the status
  /// markup: the user has moved on, so it will not be completed by typing.
  pub promote_incomplete: bool,
}

impl Default for RequisitionConfig {
  fn default() -> Self {
    Self {
      max_predictions:    20,
      promote_incomplete: true,
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn missing_fields_use_defaults() {
    let config: RequisitionConfig = toml::from_str("max-predictions = 5").unwrap();
    assert_eq!(config, RequisitionConfig {
      max_predictions:    5,
      promote_incomplete: true,
    });
  }

  #[test]
  fn unknown_fields_are_rejected() {
    assert!(toml::from_str::<RequisitionConfig>("max_predictions = 5").is_err());
  }
}
