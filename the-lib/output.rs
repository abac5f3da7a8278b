//! Command execution and its published results.
//!
//! Every execution produces an [`Output`] record that is published on the
//! [`OutputManager`] twice: once when created, and again when the command
//! completes (synchronously, or when its [`Promise`] settles).

use std::{
  any::Any,
  panic::{
    self,
    AssertUnwindSafe,
  },
  sync::{
    Arc,
    atomic::{
      AtomicU64,
      Ordering,
    },
  },
  time::{
    Duration,
    Instant,
  },
};

use the_cmdline_event::{
  Event,
  SubscriptionId,
};
use thiserror::Error;

use crate::{
  canon::{
    Canon,
    Command,
  },
  promise::Promise,
  value::{
    Args,
    Value,
  },
};

/// Failure reported by a command handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
  message: String,
}

impl CommandError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }

  pub fn message(&self) -> &str {
    &self.message
  }
}

impl From<String> for CommandError {
  fn from(message: String) -> Self {
    Self::new(message)
  }
}

impl From<&str> for CommandError {
  fn from(message: &str) -> Self {
    Self::new(message)
  }
}

/// What a command handler returns.
#[derive(Debug, Clone, Default)]
pub enum Reply {
  #[default]
  None,
  Value(Value),
  /// The command finishes when the promise settles.
  Deferred(Promise),
}

impl From<Value> for Reply {
  fn from(value: Value) -> Self {
    Reply::Value(value)
  }
}

impl From<String> for Reply {
  fn from(text: String) -> Self {
    Reply::Value(Value::String(text))
  }
}

impl From<&str> for Reply {
  fn from(text: &str) -> Self {
    Reply::Value(Value::from(text))
  }
}

impl From<Promise> for Reply {
  fn from(promise: Promise) -> Self {
    Reply::Deferred(promise)
  }
}

/// One execution of a command.
#[derive(Debug, Clone)]
pub struct Output {
  pub id:        u64,
  pub command:   Arc<Command>,
  pub args:      Args,
  /// The input as it would be typed to run this execution again.
  pub typed:     String,
  pub start:     Instant,
  pub end:       Option<Instant>,
  pub duration:  Option<Duration>,
  pub completed: bool,
  pub output:    Option<Value>,
  pub error:     Option<String>,
}

impl Output {
  fn complete(&mut self, result: Result<Option<Value>, String>) {
    let end = Instant::now();
    self.end = Some(end);
    self.duration = Some(end.duration_since(self.start));
    self.completed = true;
    match result {
      Ok(output) => self.output = output,
      Err(error) => self.error = Some(error),
    }
  }

  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }
}

/// What a running command can reach.
pub struct ExecutionContext {
  canon:   Canon,
  outputs: OutputManager,
  typed:   String,
}

impl ExecutionContext {
  pub fn canon(&self) -> &Canon {
    &self.canon
  }

  pub fn outputs(&self) -> &OutputManager {
    &self.outputs
  }

  /// The input that started this execution.
  pub fn typed(&self) -> &str {
    &self.typed
  }

  /// A promise to return as [`Reply::Deferred`] and settle later.
  pub fn create_promise(&self) -> Promise {
    Promise::new()
  }
}

struct OutputInner {
  output_change: Event<Output>,
  next_id:       AtomicU64,
}

/// Runs commands and publishes their output records.
///
/// Cloning gives another handle to the same channel.
#[derive(Clone)]
pub struct OutputManager {
  inner: Arc<OutputInner>,
}

impl Default for OutputManager {
  fn default() -> Self {
    Self::new()
  }
}

impl OutputManager {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(OutputInner {
        output_change: Event::new("output_change"),
        next_id:       AtomicU64::new(1),
      }),
    }
  }

  pub fn output_change(&self) -> &Event<Output> {
    &self.inner.output_change
  }

  pub fn subscribe(&self, f: impl Fn(&Output) + Send + Sync + 'static) -> SubscriptionId {
    self.inner.output_change.subscribe(f)
  }

  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    self.inner.output_change.unsubscribe(id)
  }

  /// Runs `command`. The created record is always published; the completed
  /// record only when `visible`.
  pub(crate) fn execute(
    &self,
    canon: Canon,
    command: Arc<Command>,
    args: Args,
    typed: String,
    visible: bool,
  ) -> u64 {
    let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
    let record = Output {
      id,
      command: command.clone(),
      args,
      typed: typed.clone(),
      start: Instant::now(),
      end: None,
      duration: None,
      completed: false,
      output: None,
      error: None,
    };
    tracing::debug!(id, command = command.name(), %typed, "executing");
    self.inner.output_change.emit(&record);

    let Some(handler) = command.handler().cloned() else {
      let error = format!("'{}' is not executable", command.name());
      self.finish(record, Err(error), visible);
      return id;
    };

    let context = ExecutionContext {
      canon,
      outputs: self.clone(),
      typed,
    };
    let result = panic::catch_unwind(AssertUnwindSafe(|| handler(&record.args, &context)));

    let result = match result {
      Ok(Ok(Reply::Deferred(promise))) => {
        let (outputs, pending) = (self.clone(), record.clone());
        let (rejected_outputs, rejected) = (self.clone(), record);
        promise.then(
          move |value| outputs.finish(pending, Ok(Some(value)), visible),
          move |error| rejected_outputs.finish(rejected, Err(error.to_string()), visible),
        );
        return id;
      },
      Ok(Ok(Reply::Value(value))) => Ok(Some(value)),
      Ok(Ok(Reply::None)) => Ok(None),
      Ok(Err(error)) => Err(error.to_string()),
      Err(payload) => Err(panic_message(payload.as_ref())),
    };

    self.finish(record, result, visible);
    id
  }

  fn finish(&self, mut record: Output, result: Result<Option<Value>, String>, visible: bool) {
    record.complete(result);
    if let Some(error) = &record.error {
      tracing::warn!(id = record.id, command = record.command.name(), %error, "command failed");
    }
    if visible {
      self.inner.output_change.emit(&record);
    }
  }
}

impl std::fmt::Debug for OutputManager {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OutputManager")
      .field("subscribers", &self.inner.output_change.len())
      .finish()
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "command panicked".to_string()
  }
}
