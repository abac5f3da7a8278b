//! Settle-once deferred results for commands that finish later.
//!
//! A [`Promise`] is resolved with a [`Value`] or rejected with a
//! [`CommandError`], exactly once. Callbacks registered with
//! [`Promise::then`] run on the settling thread; callbacks registered after
//! settlement run immediately.

use std::{
  fmt,
  mem,
  sync::{
    Arc,
    atomic::{
      AtomicUsize,
      Ordering,
    },
  },
};

use parking_lot::Mutex;

use crate::{
  output::CommandError,
  value::Value,
};

type SuccessFn = Box<dyn FnOnce(Value) + Send>;
type ErrorFn = Box<dyn FnOnce(CommandError) + Send>;

enum State {
  Pending {
    on_success: Vec<SuccessFn>,
    on_error:   Vec<ErrorFn>,
  },
  Resolved(Value),
  Rejected(CommandError),
}

#[derive(Clone)]
pub struct Promise {
  state: Arc<Mutex<State>>,
}

impl Default for Promise {
  fn default() -> Self {
    Self::new()
  }
}

impl Promise {
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(State::Pending {
        on_success: Vec::new(),
        on_error:   Vec::new(),
      })),
    }
  }

  pub fn resolved(value: Value) -> Self {
    let promise = Self::new();
    promise.resolve(value);
    promise
  }

  pub fn rejected(error: CommandError) -> Self {
    let promise = Self::new();
    promise.reject(error);
    promise
  }

  /// Registers callbacks for either outcome. Only one of them ever runs.
  pub fn then<S, E>(&self, on_success: S, on_error: E)
  where
    S: FnOnce(Value) + Send + 'static,
    E: FnOnce(CommandError) + Send + 'static,
  {
    let settled = {
      let mut state = self.state.lock();
      match &mut *state {
        State::Pending {
          on_success: successes,
          on_error: errors,
        } => {
          successes.push(Box::new(on_success));
          errors.push(Box::new(on_error));
          return;
        },
        State::Resolved(value) => Ok(value.clone()),
        State::Rejected(error) => Err(error.clone()),
      }
    };

    match settled {
      Ok(value) => on_success(value),
      Err(error) => on_error(error),
    }
  }

  /// Settles with `value`. Returns `false`, and does nothing else, when the
  /// promise was already settled.
  pub fn resolve(&self, value: Value) -> bool {
    let mut state = self.state.lock();
    let State::Pending { on_success, .. } = &mut *state else {
      tracing::warn!(%value, "ignoring resolve of an already settled promise");
      return false;
    };
    let callbacks = mem::take(on_success);
    *state = State::Resolved(value.clone());
    drop(state);

    for callback in callbacks {
      callback(value.clone());
    }
    true
  }

  /// Settles with `error`. Returns `false`, and does nothing else, when the
  /// promise was already settled.
  pub fn reject(&self, error: CommandError) -> bool {
    let mut state = self.state.lock();
    let State::Pending { on_error, .. } = &mut *state else {
      tracing::warn!(%error, "ignoring reject of an already settled promise");
      return false;
    };
    let callbacks = mem::take(on_error);
    *state = State::Rejected(error.clone());
    drop(state);

    for callback in callbacks {
      callback(error.clone());
    }
    true
  }

  pub fn is_complete(&self) -> bool {
    !matches!(*self.state.lock(), State::Pending { .. })
  }

  pub fn is_resolved(&self) -> bool {
    matches!(*self.state.lock(), State::Resolved(_))
  }

  pub fn is_rejected(&self) -> bool {
    matches!(*self.state.lock(), State::Rejected(_))
  }

  /// A promise for `f` applied to this promise's value. Rejections pass
  /// through unchanged.
  pub fn chain<F>(&self, f: F) -> Promise
  where
    F: FnOnce(Value) -> Result<Value, CommandError> + Send + 'static,
  {
    let next = Promise::new();
    let on_success = next.clone();
    let on_error = next.clone();
    self.then(
      move |value| {
        match f(value) {
          Ok(value) => on_success.resolve(value),
          Err(error) => on_success.reject(error),
        };
      },
      move |error| {
        on_error.reject(error);
      },
    );
    next
  }

  /// A promise for the values of all `promises`, in order. Rejects with the
  /// first rejection.
  pub fn group(promises: impl IntoIterator<Item = Promise>) -> Promise {
    let promises: Vec<_> = promises.into_iter().collect();
    let group = Promise::new();
    if promises.is_empty() {
      group.resolve(Value::Array(Vec::new()));
      return group;
    }

    let results = Arc::new(Mutex::new(vec![None; promises.len()]));
    let remaining = Arc::new(AtomicUsize::new(promises.len()));

    for (index, promise) in promises.into_iter().enumerate() {
      let results = results.clone();
      let remaining = remaining.clone();
      let on_success = group.clone();
      let on_error = group.clone();
      promise.then(
        move |value| {
          results.lock()[index] = Some(value);
          if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let values = results.lock().drain(..).flatten().collect();
            on_success.resolve(Value::Array(values));
          }
        },
        move |error| {
          if !on_error.is_complete() {
            on_error.reject(error);
          }
        },
      );
    }

    group
  }
}

impl fmt::Debug for Promise {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = match &*self.state.lock() {
      State::Pending { .. } => "pending".to_string(),
      State::Resolved(value) => format!("resolved({value})"),
      State::Rejected(error) => format!("rejected({error})"),
    };
    f.debug_tuple("Promise").field(&state).finish()
  }
}
