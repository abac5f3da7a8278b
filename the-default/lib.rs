//! Default wiring for the command line engine.
//!
//! [`startup`] builds a type registry with the built-in types, a command
//! registry over it with the `help` command registered, and an output
//! channel. [`shutdown`] tears that down again.

mod config;
mod help;

pub use config::{
  Config,
  ConfigError,
  HelpConfig,
};
pub use help::{
  HELP_COMMAND,
  help_command,
  render_help,
};
use the_lib::{
  canon::{
    Canon,
    CanonError,
  },
  config::RequisitionConfig,
  output::OutputManager,
  requisition::Requisition,
  types::Types,
};

/// Everything a command line surface needs.
#[derive(Debug, Clone)]
pub struct Environment {
  pub types:   Types,
  pub canon:   Canon,
  pub outputs: OutputManager,
  config:      RequisitionConfig,
}

impl Environment {
  /// A new input surface over this environment.
  pub fn requisition(&self) -> Requisition {
    Requisition::with_config(self.canon.clone(), self.outputs.clone(), self.config.clone())
  }
}

pub fn startup(config: &Config) -> Result<Environment, CanonError> {
  let types = Types::with_builtins();
  let canon = Canon::new(types.clone());
  canon.add_command(help_command(config.help.clone()))?;
  tracing::debug!(types = ?types.names(), "started");

  Ok(Environment {
    types,
    canon,
    outputs: OutputManager::new(),
    config: config.requisition.clone(),
  })
}

/// Unregisters every command and type.
pub fn shutdown(env: &Environment) {
  env.canon.dispose();
  for name in env.types.names() {
    env.types.deregister(&name);
  }
  tracing::debug!("shut down");
}
