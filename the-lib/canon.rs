//! The command registry.
//!
//! Commands are declared with a [`CommandSpec`] and registered with
//! [`Canon::add_command`], which validates the declaration, resolves every
//! parameter type and computes the shortest prefix each parameter can be
//! named by. Names containing a space are sub-commands (`tsg a` lives under
//! `tsg`); a command without a handler only groups its sub-commands.

use std::{
  collections::BTreeMap,
  fmt,
  sync::{
    Arc,
    Weak,
  },
};

use parking_lot::RwLock;
use regex::Regex;
use the_cmdline_event::Event;
use thiserror::Error;

use crate::{
  output::{
    CommandError,
    ExecutionContext,
    Reply,
  },
  status::Status,
  types::{
    CommandType,
    Type,
    TypeError,
    TypeSpec,
    Types,
  },
  value::{
    Args,
    Value,
  },
};

pub type CommandFn =
  Arc<dyn Fn(&Args, &ExecutionContext) -> Result<Reply, CommandError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum CanonError {
  #[error("command is missing a name")]
  MissingName,
  #[error("a parameter of '{command}' is missing a name")]
  MissingParamName { command: String },
  #[error("parameter '{param}' of '{command}' is declared twice")]
  DuplicateParam { command: String, param: String },
  #[error("parameter '{param}' of '{command}' has an unusable type")]
  Type {
    command: String,
    param:   String,
    #[source]
    source:  TypeError,
  },
  #[error("boolean parameter '{param}' of '{command}' can not have a default value")]
  BooleanDefault { command: String, param: String },
  #[error(transparent)]
  Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Default)]
enum ParamDefault {
  #[default]
  Required,
  Null,
  Value(Value),
}

/// Declaration of one parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
  name:        String,
  ty:          TypeSpec,
  description: Option<String>,
  default:     ParamDefault,
}

impl ParamSpec {
  /// A required parameter of type `ty`.
  pub fn new(name: impl Into<String>, ty: impl Into<TypeSpec>) -> Self {
    Self {
      name:        name.into(),
      ty:          ty.into(),
      description: None,
      default:     ParamDefault::Required,
    }
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  /// Makes the parameter optional, falling back to `value`.
  pub fn default_value(mut self, value: impl Into<Value>) -> Self {
    self.default = ParamDefault::Value(value.into());
    self
  }

  /// Makes the parameter optional with no fallback value.
  pub fn optional(mut self) -> Self {
    self.default = ParamDefault::Null;
    self
  }
}

#[derive(Debug, Clone)]
enum ParamEntry {
  Param(ParamSpec),
  Group { name: String, params: Vec<ParamSpec> },
}

/// Declaration of a command.
#[derive(Clone, Default)]
pub struct CommandSpec {
  name:        String,
  description: Option<String>,
  params:      Vec<ParamEntry>,
  return_type: Option<String>,
  hidden:      bool,
  exec:        Option<CommandFn>,
}

impl CommandSpec {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  /// Adds a parameter that may be given by position or by name.
  pub fn param(mut self, param: ParamSpec) -> Self {
    self.params.push(ParamEntry::Param(param));
    self
  }

  /// Adds a group of parameters that can only be given by name. Ungrouped
  /// parameters declared after a group are ignored.
  pub fn group(mut self, name: impl Into<String>, params: impl IntoIterator<Item = ParamSpec>) -> Self {
    self.params.push(ParamEntry::Group {
      name:   name.into(),
      params: params.into_iter().collect(),
    });
    self
  }

  pub fn return_type(mut self, return_type: impl Into<String>) -> Self {
    self.return_type = Some(return_type.into());
    self
  }

  pub fn hidden(mut self, hidden: bool) -> Self {
    self.hidden = hidden;
    self
  }

  pub fn exec<F>(mut self, exec: F) -> Self
  where
    F: Fn(&Args, &ExecutionContext) -> Result<Reply, CommandError> + Send + Sync + 'static,
  {
    self.exec = Some(Arc::new(exec));
    self
  }
}

impl fmt::Debug for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CommandSpec")
      .field("name", &self.name)
      .field("params", &self.params)
      .field("hidden", &self.hidden)
      .field("exec", &self.exec.is_some())
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct Parameter {
  name:          String,
  description:   Option<String>,
  ty:            Type,
  default:       Option<Value>,
  required:      bool,
  unique_prefix: String,
  matcher:       Option<Regex>,
  group:         Option<String>,
}

impl Parameter {
  fn build(
    spec: ParamSpec,
    command: &str,
    siblings: &[&str],
    group: Option<&str>,
    types: &Types,
  ) -> Result<Self, CanonError> {
    if spec.name.is_empty() {
      return Err(CanonError::MissingParamName {
        command: command.to_string(),
      });
    }

    let ty = types.get(&spec.ty).map_err(|source| CanonError::Type {
      command: command.to_string(),
      param: spec.name.clone(),
      source,
    })?;

    let (default, required) = if ty.is_boolean() {
      if !matches!(spec.default, ParamDefault::Required) {
        return Err(CanonError::BooleanDefault {
          command: command.to_string(),
          param:   spec.name,
        });
      }
      (Some(Value::Boolean(false)), false)
    } else {
      match spec.default {
        ParamDefault::Required => (None, true),
        ParamDefault::Null => (None, false),
        ParamDefault::Value(value) => (Some(value), false),
      }
    };

    if let Some(value) = &default {
      let text = ty.stringify(Some(value));
      let check = ty.parse_string(&text);
      if check.status() != Status::Valid || check.value() != Some(value) {
        tracing::warn!(
          command,
          param = spec.name,
          %text,
          "default value does not survive a stringify/parse round trip"
        );
      }
    }

    let unique_prefix = unique_prefix(&spec.name, siblings);
    let matcher = Regex::new(&format!("^--?{}", regex::escape(&unique_prefix)))?;

    Ok(Self {
      name: spec.name,
      description: spec.description,
      ty,
      default,
      required,
      unique_prefix,
      matcher: Some(matcher),
      group: group.map(str::to_string),
    })
  }

  /// A parameter that can not be named in input, used for the command and
  /// unassigned slots of a requisition.
  pub(crate) fn internal(name: &str, ty: Type, required: bool) -> Self {
    Self {
      name: name.to_string(),
      description: None,
      ty,
      default: None,
      required,
      unique_prefix: name.to_string(),
      matcher: None,
      group: None,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn description(&self) -> Option<&str> {
    self.description.as_deref()
  }

  pub fn ty(&self) -> &Type {
    &self.ty
  }

  pub fn default_value(&self) -> Option<&Value> {
    self.default.as_ref()
  }

  pub fn unique_prefix(&self) -> &str {
    &self.unique_prefix
  }

  pub fn group(&self) -> Option<&str> {
    self.group.as_deref()
  }

  /// Does `text` (for example `--verb`) name this parameter?
  pub fn is_known_as(&self, text: &str) -> bool {
    let Some(matcher) = &self.matcher else {
      return false;
    };
    if !matcher.is_match(text) {
      return false;
    }
    let bare = text
      .strip_prefix("--")
      .or_else(|| text.strip_prefix('-'))
      .unwrap_or(text);
    self.name.starts_with(bare)
  }

  pub fn is_data_required(&self) -> bool {
    self.required
  }

  /// Grouped parameters can only be given by name.
  pub fn is_positional_allowed(&self) -> bool {
    self.group.is_none()
  }
}

/// The shortest prefix of `name` that is not a prefix of any other name in
/// `names`; the whole name when there is none.
fn unique_prefix(name: &str, names: &[&str]) -> String {
  let others: Vec<&str> = names.iter().copied().filter(|other| *other != name).collect();
  let mut prefix = String::new();
  for ch in name.chars() {
    prefix.push(ch);
    if !others.iter().any(|other| other.starts_with(prefix.as_str())) {
      break;
    }
  }
  prefix
}

pub struct Command {
  name:        String,
  description: Option<String>,
  params:      Vec<Parameter>,
  return_type: Option<String>,
  hidden:      bool,
  exec:        Option<CommandFn>,
}

impl Command {
  fn build(spec: CommandSpec, types: &Types) -> Result<Self, CanonError> {
    let name = spec.name.trim().to_string();
    if name.is_empty() {
      return Err(CanonError::MissingName);
    }

    let mut accepted: Vec<(ParamSpec, Option<String>)> = Vec::new();
    let mut grouped = false;
    for entry in spec.params {
      match entry {
        ParamEntry::Param(param) if grouped => {
          tracing::warn!(
            command = name,
            param = param.name,
            "ignoring ungrouped parameter declared after a group"
          );
        },
        ParamEntry::Param(param) => accepted.push((param, None)),
        ParamEntry::Group { name, params } => {
          grouped = true;
          accepted.extend(params.into_iter().map(|param| (param, Some(name.clone()))));
        },
      }
    }

    let names: Vec<String> = accepted.iter().map(|(param, _)| param.name.clone()).collect();
    for (i, param) in names.iter().enumerate() {
      if names[..i].contains(param) {
        return Err(CanonError::DuplicateParam {
          command: name,
          param:   param.clone(),
        });
      }
    }

    let siblings: Vec<&str> = names.iter().map(String::as_str).collect();
    let params = accepted
      .into_iter()
      .map(|(param, group)| Parameter::build(param, &name, &siblings, group.as_deref(), types))
      .collect::<Result<_, _>>()?;

    Ok(Self {
      name,
      description: spec.description,
      params,
      return_type: spec.return_type,
      hidden: spec.hidden,
      exec: spec.exec,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn description(&self) -> Option<&str> {
    self.description.as_deref()
  }

  pub fn description_or_default(&self) -> &str {
    self.description.as_deref().unwrap_or("(No description)")
  }

  pub fn params(&self) -> &[Parameter] {
    &self.params
  }

  pub fn param(&self, name: &str) -> Option<&Parameter> {
    self.params.iter().find(|param| param.name == name)
  }

  pub fn return_type(&self) -> Option<&str> {
    self.return_type.as_deref()
  }

  pub fn is_hidden(&self) -> bool {
    self.hidden
  }

  /// False for commands that only group sub-commands.
  pub fn is_executable(&self) -> bool {
    self.exec.is_some()
  }

  pub(crate) fn handler(&self) -> Option<&CommandFn> {
    self.exec.as_ref()
  }
}

impl AsRef<str> for Command {
  fn as_ref(&self) -> &str {
    &self.name
  }
}

impl fmt::Debug for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Command")
      .field("name", &self.name)
      .field("params", &self.params.iter().map(Parameter::name).collect::<Vec<_>>())
      .field("hidden", &self.hidden)
      .field("executable", &self.is_executable())
      .finish()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonChange {
  Added(String),
  Removed(String),
}

struct CanonInner {
  commands:     RwLock<BTreeMap<String, Arc<Command>>>,
  types:        Types,
  canon_change: Event<CanonChange>,
}

/// Shared handle to a command registry.
#[derive(Clone)]
pub struct Canon {
  inner: Arc<CanonInner>,
}

/// A handle that does not keep the registry alive.
#[derive(Clone, Default)]
pub struct WeakCanon {
  inner: Weak<CanonInner>,
}

impl WeakCanon {
  pub fn upgrade(&self) -> Option<Canon> {
    self.inner.upgrade().map(|inner| Canon { inner })
  }
}

impl Canon {
  /// Creates an empty registry and registers the `command` type with `types`.
  pub fn new(types: Types) -> Self {
    let inner = Arc::new(CanonInner {
      commands: RwLock::new(BTreeMap::new()),
      types,
      canon_change: Event::new("canon_change"),
    });

    let weak = Arc::downgrade(&inner);
    inner.types.register("command", move |spec, _| {
      spec.accept_only(&[])?;
      Ok(Type::Command(CommandType::new(WeakCanon {
        inner: weak.clone(),
      })))
    });

    Self { inner }
  }

  pub fn types(&self) -> &Types {
    &self.inner.types
  }

  pub fn canon_change(&self) -> &Event<CanonChange> {
    &self.inner.canon_change
  }

  pub fn downgrade(&self) -> WeakCanon {
    WeakCanon {
      inner: Arc::downgrade(&self.inner),
    }
  }

  /// The type that selects commands from this registry.
  pub fn command_type(&self) -> Type {
    Type::Command(CommandType::new(self.downgrade()))
  }

  /// Validates and registers a command, replacing any command with the same
  /// name. On error nothing is registered.
  pub fn add_command(&self, spec: CommandSpec) -> Result<Arc<Command>, CanonError> {
    let command = Arc::new(Command::build(spec, &self.inner.types)?);
    let name = command.name().to_string();

    let replaced = self
      .inner
      .commands
      .write()
      .insert(name.clone(), command.clone());
    if replaced.is_some() {
      tracing::debug!(%name, "replaced existing command");
    }

    self.inner.canon_change.emit(&CanonChange::Added(name));
    Ok(command)
  }

  pub fn remove_command(&self, name: impl AsRef<str>) -> Option<Arc<Command>> {
    let name = name.as_ref();
    let removed = self.inner.commands.write().remove(name);
    if removed.is_some() {
      self
        .inner
        .canon_change
        .emit(&CanonChange::Removed(name.to_string()));
    }
    removed
  }

  pub fn command(&self, name: &str) -> Option<Arc<Command>> {
    self.inner.commands.read().get(name).cloned()
  }

  /// Every command, sorted by name.
  pub fn commands(&self) -> Vec<Arc<Command>> {
    self.inner.commands.read().values().cloned().collect()
  }

  pub fn command_names(&self) -> Vec<String> {
    self.inner.commands.read().keys().cloned().collect()
  }

  /// Removes every command and the `command` type.
  pub fn dispose(&self) {
    for name in self.command_names() {
      self.remove_command(&name);
    }
    self.inner.types.deregister("command");
  }
}

impl fmt::Debug for Canon {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Canon")
      .field("commands", &self.command_names())
      .finish()
  }
}
