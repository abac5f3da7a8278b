use std::path::PathBuf;

use clap::{
  ArgAction,
  Parser,
};

#[derive(Clone, Debug)]
pub struct CliOptions {
  pub verbosity:   u8,
  pub log_file:    Option<PathBuf>,
  pub config_file: Option<PathBuf>,
}

impl CliOptions {
  pub fn parse() -> Self {
    RawCli::parse().into()
  }
}

#[derive(Parser, Debug)]
#[command(name = "the-cmdline", about, long_about = None, version)]
struct RawCli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count)]
  verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE")]
  log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE")]
  config_file: Option<PathBuf>,
}

impl From<RawCli> for CliOptions {
  fn from(raw: RawCli) -> Self {
    Self {
      verbosity:   raw.verbosity,
      log_file:    raw.log_file,
      config_file: raw.config_file,
    }
  }
}

#[cfg(test)]
mod test {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn cli_definition_is_consistent() {
    RawCli::command().debug_assert();
  }

  #[test]
  fn flags_are_read() {
    let raw = RawCli::parse_from(["the-cmdline", "-vv", "--log", "out.log", "-c", "cmd.toml"]);
    let options = CliOptions::from(raw);
    assert_eq!(options.verbosity, 2);
    assert_eq!(options.log_file, Some(PathBuf::from("out.log")));
    assert_eq!(options.config_file, Some(PathBuf::from("cmd.toml")));
  }
}
