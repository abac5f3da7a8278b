use std::{
  fs,
  io,
  path::{
    Path,
    PathBuf,
  },
};

use serde::{
  Deserialize,
  Serialize,
};
use the_lib::config::RequisitionConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },
  #[error("invalid configuration: {0}")]
  Toml(#[from] toml::de::Error),
}

/// Text around the command table printed by `help` without a search term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct HelpConfig {
  pub prefix: Option<String>,
  pub suffix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
  pub requisition: RequisitionConfig,
  pub help:        HelpConfig,
}

impl Config {
  pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(text)?)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| {
      ConfigError::Io {
        path: path.to_path_buf(),
        source,
      }
    })?;
    let config = Self::from_toml_str(&text)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
  }
}

#[cfg(test)]
mod test {
  use std::io::Write;

  use super::*;

  #[test]
  fn empty_file_is_default() {
    assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
  }

  #[test]
  fn sections_are_read() {
    let config = Config::from_toml_str(
      r#"
        [requisition]
        max-predictions = 3
        promote-incomplete = false

        [help]
        prefix = "Welcome"
      "#,
    )
    .unwrap();

    assert_eq!(config.requisition.max_predictions, 3);
    assert!(!config.requisition.promote_incomplete);
    assert_eq!(config.help.prefix.as_deref(), Some("Welcome"));
    assert_eq!(config.help.suffix, None);
  }

  #[test]
  fn bad_toml_is_reported() {
    let err = Config::from_toml_str("[help]\nheader = 1").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
  }

  #[test]
  fn load_reads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[help]\nsuffix = \"bye\"").unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.help.suffix.as_deref(), Some("bye"));
  }

  #[test]
  fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
  }
}
