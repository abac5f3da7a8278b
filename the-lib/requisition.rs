//! The stateful engine behind one command line.
//!
//! A [`Requisition`] takes the text a user has typed so far, works out which
//! command it names and which parts of it belong to which parameter, and
//! keeps an [`Assignment`] per parameter with the resulting conversion. It is
//! the single source of truth for:
//!
//! - the status of the line, overall and per character,
//! - completion candidates for the assignment under the cursor,
//! - the line itself after structured edits (completion, stepping a value,
//!   setting a conversion directly), which are written back into the text.
//!
//! Parsing runs in three steps:
//!
//! 1. [`tokenize`] splits the line into lossless [`Argument`]s.
//! 2. The leading arguments are merged one at a time until they stop naming
//!    a namespace, so `tsg a` finds the sub-command `a` of `tsg`.
//! 3. The remaining arguments are assigned: `--name value` pairs first, then
//!    positionally in declaration order. Leftovers are unassigned.
//!
//! Every raw argument is kept as a [`Slot`] recording the assignment that
//! owns it, so the line can be rebuilt, traced per character and edited in
//! place.

use std::{
  fmt,
  iter,
  mem,
  sync::Arc,
};

use smallvec::SmallVec;
use the_cmdline_event::Event;

use crate::{
  argument::{
    Argument,
    ArgumentKind,
  },
  assignment::{
    Assignment,
    AssignmentId,
  },
  canon::{
    Canon,
    Command,
  },
  command_line::{
    quote,
    tokenize,
  },
  config::RequisitionConfig,
  conversion::{
    Conversion,
    Prediction,
  },
  output::OutputManager,
  status::Status,
  types::Type,
  value::{
    Args,
    Value,
  },
};

/// A selection in the input line, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
  pub start: usize,
  pub end:   usize,
}

impl Cursor {
  pub fn at(position: usize) -> Self {
    Self {
      start: position,
      end:   position,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Input {
  pub typed:  String,
  /// Where the user is editing. `None` means the end of the line.
  pub cursor: Option<Cursor>,
}

impl Input {
  pub fn new(typed: impl Into<String>) -> Self {
    Self {
      typed:  typed.into(),
      cursor: None,
    }
  }

  pub fn with_cursor(mut self, cursor: Cursor) -> Self {
    self.cursor = Some(cursor);
    self
  }

  pub fn cursor(&self) -> Cursor {
    self
      .cursor
      .unwrap_or_else(|| Cursor::at(self.typed.chars().count()))
  }
}

impl From<&str> for Input {
  fn from(typed: &str) -> Self {
    Self::new(typed)
  }
}

impl From<String> for Input {
  fn from(typed: String) -> Self {
    Self::new(typed)
  }
}

/// One raw argument of the line and the assignment it was given to.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
  arg:    Argument,
  owner:  AssignmentId,
  /// The array element this argument became, for array parameters.
  member: Option<usize>,
}

impl Slot {
  fn new(arg: Argument, owner: AssignmentId, member: Option<usize>) -> Self {
    Self { arg, owner, member }
  }

  pub fn arg(&self) -> &Argument {
    &self.arg
  }

  pub fn owner(&self) -> AssignmentId {
    self.owner
  }

  pub fn member(&self) -> Option<usize> {
    self.member
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
  Prefix,
  Text,
  Suffix,
}

/// How one character of the line was understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgTrace {
  /// Index into [`Requisition::slots`].
  pub slot: usize,
  pub ch:   char,
  pub part: Part,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  Idle,
  /// Rebuilding every assignment from the text. Slots are rebuilt wholesale.
  Parsing,
  /// Writing one edited assignment back into the slots.
  Splicing,
}

#[derive(Debug, Clone)]
pub struct CommandChange {
  pub old: Option<Arc<Command>>,
  pub new: Option<Arc<Command>>,
}

#[derive(Debug, Clone)]
pub struct AssignmentChange {
  pub id:         AssignmentId,
  pub name:       String,
  pub conversion: Conversion,
  pub old:        Conversion,
}

/// The line changed in a way an input control should mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputChange {
  pub typed: String,
}

/// What [`Requisition::exec`] should run.
#[derive(Debug, Clone)]
pub enum ExecInput {
  /// Parse this input first, then run it if it is valid.
  Typed(Input),
  /// Run a command by name with ready-made arguments, leaving the current
  /// line alone. Completion is published only when `visible` (default
  /// `false`).
  Direct {
    command: String,
    args:    Args,
    visible: Option<bool>,
  },
}

pub struct Requisition {
  canon:             Canon,
  outputs:           OutputManager,
  config:            RequisitionConfig,
  command:           Assignment,
  params:            Vec<Assignment>,
  /// The command `params` were built for.
  params_command:    Option<Arc<Command>>,
  unassigned:        Assignment,
  slots:             Vec<Slot>,
  input:             Input,
  last_update:       Option<Input>,
  phase:             Phase,
  command_change:    Event<CommandChange>,
  assignment_change: Event<AssignmentChange>,
  input_change:      Event<InputChange>,
}

impl Requisition {
  pub fn new(canon: Canon, outputs: OutputManager) -> Self {
    Self::with_config(canon, outputs, RequisitionConfig::default())
  }

  pub fn with_config(canon: Canon, outputs: OutputManager, config: RequisitionConfig) -> Self {
    let command = Assignment::command(&canon);
    let mut requisition = Self {
      canon,
      outputs,
      config,
      command,
      params: Vec::new(),
      params_command: None,
      unassigned: Assignment::unassigned(),
      slots: Vec::new(),
      input: Input::default(),
      last_update: None,
      phase: Phase::Idle,
      command_change: Event::new("command_change"),
      assignment_change: Event::new("assignment_change"),
      input_change: Event::new("input_change"),
    };
    requisition.parse();
    requisition
  }

  pub fn canon(&self) -> &Canon {
    &self.canon
  }

  pub fn outputs(&self) -> &OutputManager {
    &self.outputs
  }

  pub fn config(&self) -> &RequisitionConfig {
    &self.config
  }

  pub fn input(&self) -> &Input {
    &self.input
  }

  pub fn command_change(&self) -> &Event<CommandChange> {
    &self.command_change
  }

  pub fn assignment_change(&self) -> &Event<AssignmentChange> {
    &self.assignment_change
  }

  pub fn input_change(&self) -> &Event<InputChange> {
    &self.input_change
  }

  /// The raw arguments of the line, in order.
  pub fn slots(&self) -> &[Slot] {
    &self.slots
  }

  /// The command the line names, if any. May be a namespace.
  pub fn command(&self) -> Option<&Arc<Command>> {
    self.command.value().and_then(Value::as_command)
  }

  pub fn command_assignment(&self) -> &Assignment {
    &self.command
  }

  pub fn unassigned(&self) -> &Assignment {
    &self.unassigned
  }

  /// Re-reads the line. An update identical to the previous one does
  /// nothing.
  pub fn update(&mut self, input: impl Into<Input>) {
    let input = input.into();
    if self.last_update.as_ref() == Some(&input) {
      tracing::trace!(typed = %input.typed, "input unchanged");
      return;
    }

    self.input = input.clone();
    self.last_update = Some(input);
    self.parse();
    self.input_change.emit(&InputChange {
      typed: self.input.typed.clone(),
    });
  }

  fn parse(&mut self) {
    self.phase = Phase::Parsing;

    let args = tokenize(&self.input.typed);
    self.slots = args
      .iter()
      .map(|arg| Slot::new(arg.clone(), AssignmentId::Unassigned, None))
      .collect();

    let mut args: Vec<(usize, Argument)> = args.into_iter().enumerate().collect();
    let used = self.split(&args);
    for (slot, _) in args.drain(..used) {
      self.own(slot, AssignmentId::Command, None);
    }
    self.assign(args);

    self.phase = Phase::Idle;
    tracing::trace!(typed = %self.input.typed, status = %self.status(), "parsed");
  }

  /// Finds the command at the start of `args` and returns how many
  /// arguments its name used.
  fn split(&mut self, args: &[(usize, Argument)]) -> usize {
    let ty = self.command.param().ty().clone();
    if args.is_empty() {
      self.set_command(ty.parse(Argument::empty()));
      return 0;
    }

    let mut used = 1;
    let conversion = loop {
      let arg = match &args[..used] {
        [(_, only)] => only.clone(),
        many => Argument::merged(many.iter().map(|(_, arg)| arg.clone()).collect()),
      };
      let conversion = ty.parse(arg);
      let namespace = conversion
        .value()
        .and_then(Value::as_command)
        .is_some_and(|command| !command.is_executable());
      if !namespace || used == args.len() {
        break conversion;
      }
      used += 1;
    };

    self.set_command(conversion);
    used
  }

  fn set_command(&mut self, conversion: Conversion) {
    self.set_assignment(AssignmentId::Command, conversion);
    let new = self.command().cloned();

    let same = match (&self.params_command, &new) {
      (Some(old), Some(new)) => Arc::ptr_eq(old, new),
      (None, None) => true,
      _ => false,
    };
    if same {
      return;
    }
    let old = mem::replace(&mut self.params_command, new.clone());

    self.params = new
      .as_ref()
      .map(|command| {
        command
          .params()
          .iter()
          .enumerate()
          .map(|(index, param)| Assignment::new(AssignmentId::Param(index), param.clone()))
          .collect()
      })
      .unwrap_or_default();
    tracing::debug!(
      old = old.as_ref().map(|command| command.name()),
      new = new.as_ref().map(|command| command.name()),
      "command changed"
    );
    self.command_change.emit(&CommandChange { old, new });
  }

  fn assign(&mut self, mut args: Vec<(usize, Argument)>) {
    if self.command().is_none() || (self.params.is_empty() && !args.is_empty()) {
      self.set_unassigned(args);
      return;
    }

    if args.is_empty() {
      self.reset_params();
      self.set_unassigned(Vec::new());
      return;
    }

    // Deferred types are resolved once so every pass sees the same type.
    let types: Vec<Type> = self
      .params
      .iter()
      .map(|assignment| assignment.param().ty().resolved().into_owned())
      .collect();

    // A lone string parameter takes the rest of the line: `echo a b c`.
    let single_string = matches!(types.as_slice(), [only] if only.is_string());
    if single_string {
      for (slot, _) in &args {
        self.own(*slot, AssignmentId::Param(0), None);
      }
      let arg = match args.as_slice() {
        [(_, only)] => only.clone(),
        many => Argument::merged(many.iter().map(|(_, arg)| arg.clone()).collect()),
      };
      let conversion = types[0].parse(arg);
      self.set_assignment(AssignmentId::Param(0), conversion);
      self.set_unassigned(Vec::new());
      return;
    }

    let count = self.params.len();
    let mut positional: SmallVec<[usize; 8]> = (0..count).collect();
    let mut arrays: Vec<Option<Argument>> = vec![None; count];

    for index in 0..count {
      let param = self.params[index].param().clone();
      let ty = &types[index];
      let id = AssignmentId::Param(index);

      let mut i = 0;
      while i < args.len() {
        if !param.is_known_as(args[i].1.text()) {
          i += 1;
          continue;
        }

        let (name_slot, name) = args.remove(i);
        positional.retain(|candidate| *candidate != index);
        let member = ty
          .is_array()
          .then(|| arrays[index].as_ref().map_or(0, |array| array.members().len()));
        self.own(name_slot, id, member);

        let arg = if ty.is_boolean() {
          Argument::true_named(param.name(), Some(name))
        } else {
          let value = if i < args.len() {
            let (value_slot, value) = args.remove(i);
            self.own(value_slot, id, member);
            value
          } else {
            Argument::empty()
          };
          Argument::named(name, value)
        };

        if ty.is_array() {
          arrays[index]
            .get_or_insert_with(|| Argument::array(Vec::new()))
            .add_argument(arg);
        } else {
          self.set_assignment(id, ty.parse(arg));
        }
      }
    }

    for index in positional {
      let id = AssignmentId::Param(index);
      let param = self.params[index].param().clone();

      if !param.is_positional_allowed() {
        self.set_default(id);
      } else if types[index].is_array() {
        let array = arrays[index].get_or_insert_with(|| Argument::array(Vec::new()));
        for (slot, arg) in mem::take(&mut args) {
          let member = array.members().len();
          if let Some(slot) = self.slots.get_mut(slot) {
            slot.owner = id;
            slot.member = Some(member);
          }
          array.add_argument(arg);
        }
      } else if args.is_empty() {
        self.set_default(id);
      } else {
        let (slot, arg) = args.remove(0);
        self.own(slot, id, None);
        self.set_assignment(id, types[index].parse(arg));
      }
    }

    for (index, array) in arrays.into_iter().enumerate() {
      if let Some(array) = array {
        let conversion = types[index].parse(array);
        self.set_assignment(AssignmentId::Param(index), conversion);
      }
    }

    self.set_unassigned(args);
  }

  fn set_unassigned(&mut self, args: Vec<(usize, Argument)>) {
    if args.is_empty() {
      self.set_default(AssignmentId::Unassigned);
      return;
    }

    if !self.params.is_empty() {
      tracing::debug!(count = args.len(), "arguments left unassigned");
    }
    for (slot, _) in &args {
      self.own(*slot, AssignmentId::Unassigned, None);
    }
    let arg = Argument::merged(args.into_iter().map(|(_, arg)| arg).collect());
    let conversion = self.unassigned.param().ty().parse(arg);
    self.set_assignment(AssignmentId::Unassigned, conversion);
  }

  fn reset_params(&mut self) {
    for index in 0..self.params.len() {
      self.set_default(AssignmentId::Param(index));
    }
  }

  fn own(&mut self, slot: usize, owner: AssignmentId, member: Option<usize>) {
    if let Some(slot) = self.slots.get_mut(slot) {
      slot.owner = owner;
      slot.member = member;
    }
  }

  fn set_default(&mut self, id: AssignmentId) {
    if let Some(conversion) = self.assignment_by_id(id).map(Assignment::default_conversion) {
      self.set_assignment(id, conversion);
    }
  }

  /// Installs `conversion` and reports a changed value. Returns the previous
  /// conversion when anything changed.
  fn set_assignment(&mut self, id: AssignmentId, conversion: Conversion) -> Option<Conversion> {
    let assignment = self.assignment_mut(id)?;
    let old = assignment.replace(conversion)?;

    let current = assignment.conversion();
    if !current.value_equals(&old) {
      let change = AssignmentChange {
        id,
        name: assignment.name().to_string(),
        conversion: current.clone(),
        old: old.clone(),
      };
      self.assignment_change.emit(&change);
    }
    Some(old)
  }

  pub fn assignment_by_id(&self, id: AssignmentId) -> Option<&Assignment> {
    match id {
      AssignmentId::Command => Some(&self.command),
      AssignmentId::Param(index) => self.params.get(index),
      AssignmentId::Unassigned => Some(&self.unassigned),
    }
  }

  fn assignment_mut(&mut self, id: AssignmentId) -> Option<&mut Assignment> {
    match id {
      AssignmentId::Command => Some(&mut self.command),
      AssignmentId::Param(index) => self.params.get_mut(index),
      AssignmentId::Unassigned => Some(&mut self.unassigned),
    }
  }

  /// The assignment of the parameter called `name`.
  pub fn assignment(&self, name: &str) -> Option<&Assignment> {
    self.params.iter().find(|assignment| assignment.name() == name)
  }

  pub fn assignment_by_index(&self, index: usize) -> Option<&Assignment> {
    self.params.get(index)
  }

  /// The parameter assignments in declaration order, optionally preceded by
  /// the command assignment.
  pub fn assignments(&self, include_command: bool) -> Vec<&Assignment> {
    let command = include_command.then_some(&self.command);
    command.into_iter().chain(&self.params).collect()
  }

  pub fn assignment_count(&self) -> usize {
    self.params.len()
  }

  pub fn parameter_names(&self) -> Vec<&str> {
    self.params.iter().map(Assignment::name).collect()
  }

  /// Resets every parameter to its default, rewriting the line to match.
  pub fn set_default_arguments(&mut self) {
    for index in 0..self.params.len() {
      let conversion = self.params[index].default_conversion();
      self.set_conversion(AssignmentId::Param(index), conversion);
    }
  }

  /// Worst status of the command, every parameter and any unassigned text.
  pub fn status(&self) -> Status {
    let unassigned = (!self.unassigned.arg().is_blank()).then(|| self.unassigned.status());
    Status::combine(
      iter::once(self.command.status())
        .chain(self.params.iter().map(Assignment::status))
        .chain(unassigned),
    )
  }

  /// Completion candidates for an assignment, at most
  /// [`RequisitionConfig::max_predictions`] of them.
  pub fn predictions(&self, id: AssignmentId) -> Vec<Prediction> {
    let Some(assignment) = self.assignment_by_id(id) else {
      return Vec::new();
    };
    let mut predictions = assignment.predictions();
    predictions.truncate(self.config.max_predictions);
    predictions
  }

  /// One entry per character of the line.
  pub fn input_arg_trace(&self) -> Vec<ArgTrace> {
    let mut trace = Vec::new();
    for (slot, Slot { arg, .. }) in self.slots.iter().enumerate() {
      let parts = [
        (Part::Prefix, arg.prefix()),
        (Part::Text, arg.source_text()),
        (Part::Suffix, arg.suffix()),
      ];
      for (part, text) in parts {
        trace.extend(text.chars().map(|ch| ArgTrace { slot, ch, part }));
      }
    }
    trace
  }

  /// The status of every character of the line.
  ///
  /// Only argument text carries a status; whitespace and quotes are always
  /// valid. Incomplete text away from the cursor is reported as an error,
  /// except in the command name.
  pub fn input_status_markup(&self) -> Vec<Status> {
    let trace = self.input_arg_trace();
    let cursor = self.input.cursor().start.saturating_sub(1);
    let under_cursor = trace
      .get(cursor)
      .filter(|at| at.part == Part::Text)
      .map(|at| at.slot);

    trace
      .iter()
      .map(|at| {
        if at.part != Part::Text {
          return Status::Valid;
        }
        let slot = &self.slots[at.slot];
        let status = self
          .assignment_by_id(slot.owner)
          .map_or(Status::Error, |assignment| assignment.status_of(slot.member));

        let promote = status == Status::Incomplete
          && self.config.promote_incomplete
          && slot.owner != AssignmentId::Command
          && under_cursor != Some(at.slot);
        if promote { Status::Error } else { status }
      })
      .collect()
  }

  /// The assignment the user is editing with the cursor at `cursor`.
  ///
  /// Whitespace after an argument belongs to whatever comes next: typing
  /// there starts the next argument.
  pub fn assignment_at(&self, cursor: usize) -> AssignmentId {
    let mut owners = Vec::new();
    for (index, slot) in self.slots.iter().enumerate() {
      let arg = &slot.arg;
      let own = arg.prefix().chars().count() + arg.source_text().chars().count();
      owners.extend(iter::repeat_n(slot.owner, own));

      let next = match self.slots.get(index + 1) {
        Some(next) => next.owner,
        None => self.next_assignment(slot.owner),
      };
      owners.extend(iter::repeat_n(next, arg.suffix().chars().count()));
    }

    let Some(index) = cursor.checked_sub(1) else {
      return AssignmentId::Command;
    };
    owners
      .get(index)
      .or(owners.last())
      .copied()
      .unwrap_or(AssignmentId::Command)
  }

  fn next_assignment(&self, id: AssignmentId) -> AssignmentId {
    let next = match id {
      AssignmentId::Command => 0,
      AssignmentId::Param(index) => index + 1,
      AssignmentId::Unassigned => return id,
    };
    if next < self.params.len() {
      AssignmentId::Param(next)
    } else {
      id
    }
  }

  /// Replaces an assignment's conversion from outside the text, for example
  /// from a form field, and writes it back into the line. Editing the
  /// command re-reads the whole line. Returns whether anything changed.
  pub fn set_conversion(&mut self, id: AssignmentId, conversion: Conversion) -> bool {
    if self.phase != Phase::Idle {
      tracing::warn!(?id, phase = ?self.phase, "ignoring nested edit");
      return false;
    }

    let Some(conversion) = self
      .assignment_by_id(id)
      .map(|assignment| assignment.placed(conversion))
    else {
      return false;
    };

    self.phase = Phase::Splicing;
    let old = self.set_assignment(id, conversion);
    let moved = old.as_ref().is_some_and(|old| {
      self
        .assignment_by_id(id)
        .is_some_and(|assignment| !assignment.conversion().arg_equals(old))
    });
    if moved {
      self.splice(id);
    }
    self.phase = Phase::Idle;

    if !moved {
      return old.is_some();
    }

    self.input = Input::new(self.to_string());
    self.last_update = Some(self.input.clone());
    if id == AssignmentId::Command {
      self.parse();
    }
    self.input_change.emit(&InputChange {
      typed: self.input.typed.clone(),
    });
    true
  }

  /// Accepts the first prediction of an assignment.
  pub fn complete(&mut self, id: AssignmentId) -> bool {
    match self.assignment_by_id(id).and_then(Assignment::completion) {
      Some(conversion) => self.set_conversion(id, conversion),
      None => false,
    }
  }

  pub fn increment(&mut self, id: AssignmentId) -> bool {
    self.step(id, true)
  }

  pub fn decrement(&mut self, id: AssignmentId) -> bool {
    self.step(id, false)
  }

  fn step(&mut self, id: AssignmentId, forward: bool) -> bool {
    match self.assignment_by_id(id).and_then(|assignment| assignment.stepped(forward)) {
      Some(conversion) => self.set_conversion(id, conversion),
      None => false,
    }
  }

  /// Writes the argument of `id` back into the slots, in place of whatever
  /// it owned before.
  fn splice(&mut self, id: AssignmentId) {
    let visible = self
      .assignment_by_id(id)
      .is_some_and(|assignment| !assignment.arg().is_blank());

    // Positional parameters before this one need text of their own, or this
    // one would be read back into the first empty position.
    if let AssignmentId::Param(target) = id
      && visible
      && self.params[target].param().is_positional_allowed()
    {
      for index in 0..target {
        let assignment = &mut self.params[index];
        if !assignment.param().is_positional_allowed() {
          continue;
        }
        let before = assignment.conversion().clone();
        if !assignment.ensure_visible_argument() {
          continue;
        }

        let current = assignment.conversion().clone();
        let name = assignment.name().to_string();
        self.replace_slots(AssignmentId::Param(index));
        if !current.value_equals(&before) {
          self.assignment_change.emit(&AssignmentChange {
            id: AssignmentId::Param(index),
            name,
            conversion: current,
            old: before,
          });
        }
      }
    }

    self.replace_slots(id);
  }

  fn replace_slots(&mut self, id: AssignmentId) {
    let Some(assignment) = self.assignment_by_id(id) else {
      return;
    };
    let mut slots = slots_for(assignment.arg(), id);

    let first = self.slots.iter().position(|slot| slot.owner == id);
    self.slots.retain(|slot| slot.owner != id);

    let index = match first {
      Some(first) => first,
      None => {
        let index = self.insertion_point(id);
        let separated = index == 0 ||
          self.slots[index - 1]
            .arg
            .to_string()
            .ends_with(char::is_whitespace);
        if !separated {
          // The space belongs to the assignment too, so the next edit of it
          // keeps the arguments apart.
          if let Some(assignment) = self.assignment_mut(id) {
            assignment.separate();
            slots = slots_for(assignment.arg(), id);
          }
          if let Some(slot) = slots.first_mut() {
            slot.arg = mem::take(&mut slot.arg).with_leading_space();
          }
        }
        index
      },
    };

    tracing::trace!(?id, index, count = slots.len(), "splicing arguments");
    self.slots.splice(index..index, slots);
  }

  /// Where an assignment with no text yet goes: before the first argument of
  /// any later assignment.
  fn insertion_point(&self, id: AssignmentId) -> usize {
    let rank = |id: AssignmentId| match id {
      AssignmentId::Command => 0,
      AssignmentId::Param(index) => index + 1,
      AssignmentId::Unassigned => usize::MAX,
    };
    self
      .slots
      .iter()
      .position(|slot| rank(slot.owner) > rank(id))
      .unwrap_or(self.slots.len())
  }

  /// The command and its non-default values, written so that parsing the
  /// result gives the same values back.
  ///
  /// Values are positional until one positional parameter is skipped; from
  /// then on, and for grouped parameters, they are written as
  /// `--name value`. A true boolean is written as `--name`.
  pub fn to_canonical_string(&self) -> String {
    let mut line = match self.command() {
      Some(command) => command.name().to_string(),
      None => self.command.arg().text().to_string(),
    };

    let mut named = false;
    for assignment in &self.params {
      let param = assignment.param();
      let ty = param.ty();
      let value = assignment.value();

      if value.is_none() || value == param.default_value() || assignment.arg().is_blank() {
        named |= param.is_positional_allowed();
        continue;
      }
      let as_name = named || !param.is_positional_allowed();

      match value {
        Some(Value::Boolean(true)) => line.push_str(&format!(" --{}", param.name())),
        Some(Value::Array(values)) if as_name => {
          for value in values {
            let text = ty.stringify(Some(&Value::Array(vec![value.clone()])));
            line.push_str(&format!(" --{} {text}", param.name()));
          }
        },
        Some(Value::Array(values)) => {
          if !values.is_empty() {
            line.push(' ');
            line.push_str(&ty.stringify(value));
          }
          named = true;
        },
        _ => {
          let text = quote(&ty.stringify(value));
          if as_name {
            line.push_str(&format!(" --{} {text}", param.name()));
          } else {
            line.push(' ');
            line.push_str(&text);
          }
        },
      }
    }
    line
  }

  /// Parameter name to value for the current command.
  pub fn args_object(&self) -> Args {
    self
      .params
      .iter()
      .map(|assignment| (assignment.name().to_string(), assignment.value().cloned()))
      .collect()
  }

  /// Runs a command. Returns whether one was dispatched; what it did is
  /// published on [`Requisition::outputs`].
  ///
  /// Without an explicit input the current line runs, if it is valid.
  pub fn exec(&mut self, input: Option<ExecInput>) -> bool {
    let (command, args, typed, visible) = match input {
      Some(ExecInput::Direct {
        command,
        args,
        visible,
      }) => {
        let Some(found) = self.canon.command(&command) else {
          tracing::error!(%command, "can not execute unknown command");
          return false;
        };
        (found, args, command, visible.unwrap_or(false))
      },
      other => {
        if let Some(ExecInput::Typed(input)) = other {
          self.update(input);
        }
        let status = self.status();
        if status != Status::Valid {
          tracing::debug!(typed = %self.input.typed, %status, "not executing");
          return false;
        }
        let Some(command) = self.command().cloned() else {
          return false;
        };
        (command, self.args_object(), self.to_canonical_string(), true)
      },
    };

    self
      .outputs
      .execute(self.canon.clone(), command, args, typed, visible);
    true
  }
}

/// The slots an argument occupies once written into the line.
fn slots_for(arg: &Argument, owner: AssignmentId) -> Vec<Slot> {
  let slots: Vec<Slot> = match arg.kind() {
    ArgumentKind::Array(members) => members
      .iter()
      .enumerate()
      .flat_map(|(member, arg)| {
        arg
          .leaves()
          .into_iter()
          .map(move |leaf| Slot::new(leaf, owner, Some(member)))
      })
      .collect(),
    _ => arg
      .leaves()
      .into_iter()
      .map(|leaf| Slot::new(leaf, owner, None))
      .collect(),
  };
  slots
    .into_iter()
    .filter(|slot| !slot.arg.to_string().is_empty())
    .collect()
}

impl fmt::Display for Requisition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for slot in &self.slots {
      write!(f, "{}", slot.arg)?;
    }
    Ok(())
  }
}

impl fmt::Debug for Requisition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Requisition")
      .field("typed", &self.input.typed)
      .field("command", &self.command().map(|command| command.name()))
      .field("params", &self.parameter_names())
      .field("status", &self.status())
      .finish()
  }
}
