//! Lossless pieces of typed input.
//!
//! An [`Argument`] is one token of the input line together with the
//! whitespace and quoting around it, so that `prefix + text + suffix` gives
//! back exactly what the user typed. When the typed form differs from the
//! unescaped text (`a\ b` versus `a b`), the typed form is kept as the
//! argument's *source* and used for display.
//!
//! Compound arguments are built from plain ones during assignment:
//!
//! | Kind | Built from |
//! |------|------------|
//! | [`ArgumentKind::Merged`] | several adjacent tokens given to one string parameter |
//! | [`ArgumentKind::Named`] | `--name value` |
//! | [`ArgumentKind::TrueNamed`] | a boolean flag that is present (`--verbose`) |
//! | [`ArgumentKind::FalseNamed`] | a boolean flag that is absent |
//! | [`ArgumentKind::Array`] | every token routed to an array parameter |

use std::fmt;

use crate::command_line::{
  Quote,
  escape_quoted,
  needs_quoting,
};

/// Options for [`Argument::beget`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BegetOptions {
  /// Start the new argument with a separating space.
  pub prefix_space: bool,
}

#[derive(Debug, Clone, Default)]
pub enum ArgumentKind {
  #[default]
  Plain,
  Merged(Vec<Argument>),
  Named {
    name:  Box<Argument>,
    value: Box<Argument>,
  },
  /// A boolean flag that was given. Wraps the flag token when it came from
  /// typed input.
  TrueNamed(Option<Box<Argument>>),
  FalseNamed,
  Array(Vec<Argument>),
}

#[derive(Debug, Clone, Default)]
pub struct Argument {
  text:   String,
  prefix: String,
  suffix: String,
  source: Option<String>,
  kind:   ArgumentKind,
}

impl Argument {
  pub fn new(text: impl Into<String>, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      prefix: prefix.into(),
      suffix: suffix.into(),
      source: None,
      kind: ArgumentKind::Plain,
    }
  }

  /// The empty argument: no text, no surrounding whitespace.
  pub fn empty() -> Self {
    Self::default()
  }

  /// Records how the text was typed, if that differs from the text itself.
  pub(crate) fn with_source(mut self, source: String) -> Self {
    self.source = (source != self.text).then_some(source);
    self
  }

  /// Joins `args` into one argument spanning all of them.
  pub fn merged(args: Vec<Argument>) -> Self {
    let mut merged = match args.split_first() {
      Some((first, rest)) => rest.iter().fold(first.plain(), |acc, arg| acc.merge(arg)),
      None => Argument::empty(),
    };
    merged.kind = ArgumentKind::Merged(args);
    merged
  }

  /// A `--name value` pair. The name token, with its surrounding whitespace,
  /// becomes part of the prefix. A missing value leaves a space after the
  /// name for one to be written into.
  pub fn named(name: Argument, value: Argument) -> Self {
    let mut prefix = format!("{name}{}", value.prefix);
    if value.prefix.is_empty() && value.text.is_empty() && !prefix.ends_with(char::is_whitespace) {
      prefix.push(' ');
    }
    Self {
      text:   value.text.clone(),
      prefix,
      suffix: value.suffix.clone(),
      source: value.source.clone(),
      kind:   ArgumentKind::Named {
        name:  Box::new(name),
        value: Box::new(value),
      },
    }
  }

  /// A boolean flag that is set. Without a typed token the argument renders as
  /// ` --name`.
  pub fn true_named(name: &str, arg: Option<Argument>) -> Self {
    match arg {
      Some(arg) => Self {
        text:   arg.text.clone(),
        prefix: arg.prefix.clone(),
        suffix: arg.suffix.clone(),
        source: arg.source.clone(),
        kind:   ArgumentKind::TrueNamed(Some(Box::new(arg))),
      },
      None => Self {
        text: format!("--{name}"),
        prefix: " ".to_string(),
        kind: ArgumentKind::TrueNamed(None),
        ..Self::default()
      },
    }
  }

  pub fn false_named() -> Self {
    Self {
      kind: ArgumentKind::FalseNamed,
      ..Self::default()
    }
  }

  pub fn array(members: Vec<Argument>) -> Self {
    Self {
      kind: ArgumentKind::Array(members),
      ..Self::default()
    }
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  pub fn suffix(&self) -> &str {
    &self.suffix
  }

  pub fn kind(&self) -> &ArgumentKind {
    &self.kind
  }

  /// The text as it appears in the input line.
  pub fn source_text(&self) -> &str {
    self.source.as_deref().unwrap_or(&self.text)
  }

  pub fn is_array(&self) -> bool {
    matches!(self.kind, ArgumentKind::Array(_))
  }

  /// Members of an array argument; empty for every other kind.
  pub fn members(&self) -> &[Argument] {
    match &self.kind {
      ArgumentKind::Array(members) => members,
      _ => &[],
    }
  }

  pub fn add_argument(&mut self, arg: Argument) {
    match &mut self.kind {
      ArgumentKind::Array(members) => members.push(arg),
      _ => tracing::warn!(?arg, "ignoring member added to a non-array argument"),
    }
  }

  pub fn add_arguments(&mut self, args: impl IntoIterator<Item = Argument>) {
    for arg in args {
      self.add_argument(arg);
    }
  }

  /// Concatenates `self` and the argument that follows it in the input.
  pub fn merge(&self, following: &Argument) -> Argument {
    let join = |a: &str, b: &str| format!("{a}{}{}{b}", self.suffix, following.prefix);
    let text = join(&self.text, &following.text);
    let source = if self.source.is_some() || following.source.is_some() {
      Some(join(self.source_text(), following.source_text()))
    } else {
      None
    };

    Argument {
      text,
      prefix: self.prefix.clone(),
      suffix: following.suffix.clone(),
      source,
      kind: ArgumentKind::Plain,
    }
  }

  /// A plain argument with `text` in place of this one's text.
  ///
  /// Without options the surrounding prefix and suffix are kept, and quotes
  /// are added when the new text needs them and is not already inside a
  /// quote. With options the prefix and suffix are rebuilt from scratch:
  /// quotes when the text needs them, and an optional leading space. Inside
  /// quotes the source escapes backslashes and the quote character.
  pub fn beget(&self, text: impl Into<String>, options: Option<BegetOptions>) -> Argument {
    let text = text.into();
    let needs_quote = needs_quoting(&text);
    let quote = if needs_quote { "'" } else { "" };

    let (prefix, suffix) = match options {
      Some(options) => {
        let space = if options.prefix_space { " " } else { "" };
        (format!("{space}{quote}"), quote.to_string())
      },
      None if needs_quote && self.quote().is_none() && !text.is_empty() => {
        (format!("{}'", self.prefix), format!("'{}", self.suffix))
      },
      None => (self.prefix.clone(), self.suffix.clone()),
    };

    let source = prefix
      .chars()
      .last()
      .and_then(Quote::from_char)
      .map(|quote| escape_quoted(&text, quote))
      .filter(|source| *source != text);

    Argument {
      text,
      prefix,
      suffix,
      source,
      kind: ArgumentKind::Plain,
    }
  }

  fn quote(&self) -> Option<Quote> {
    self.prefix.chars().last().and_then(Quote::from_char)
  }

  /// True when the argument has no visible content.
  pub fn is_blank(&self) -> bool {
    match &self.kind {
      ArgumentKind::Array(members) => members.iter().all(Argument::is_blank),
      _ => self.text.is_empty() && self.prefix.trim().is_empty() && self.suffix.trim().is_empty(),
    }
  }

  /// The plain arguments that make up this one, in input order. These are
  /// what gets written back into the input line when the argument replaces
  /// an earlier one.
  pub fn leaves(&self) -> Vec<Argument> {
    match &self.kind {
      ArgumentKind::Plain => vec![self.clone()],
      ArgumentKind::Merged(args) | ArgumentKind::Array(args) => {
        args.iter().flat_map(Argument::leaves).collect()
      },
      ArgumentKind::Named { name, value } => {
        let mut leaves = name.leaves();
        leaves.extend(value.leaves());
        leaves
      },
      ArgumentKind::TrueNamed(Some(arg)) => arg.leaves(),
      ArgumentKind::TrueNamed(None) => vec![self.plain()],
      ArgumentKind::FalseNamed => Vec::new(),
    }
  }

  pub(crate) fn push_suffix(&mut self, extra: &str) {
    self.suffix.push_str(extra);
  }

  /// Adds a separating space in front unless there already is one.
  pub(crate) fn with_leading_space(mut self) -> Self {
    if !self.prefix.starts_with(char::is_whitespace) {
      self.prefix.insert(0, ' ');
    }
    self
  }

  fn plain(&self) -> Argument {
    Argument {
      kind: ArgumentKind::Plain,
      ..self.clone()
    }
  }

  fn same_kind(&self, other: &Argument) -> bool {
    std::mem::discriminant(&self.kind) == std::mem::discriminant(&other.kind)
  }
}

/// Structural equality: same kind, text, prefix and suffix. Arrays compare
/// their members.
impl PartialEq for Argument {
  fn eq(&self, other: &Self) -> bool {
    if !self.same_kind(other) {
      return false;
    }
    match (&self.kind, &other.kind) {
      (ArgumentKind::Array(a), ArgumentKind::Array(b)) => a == b,
      _ => self.text == other.text && self.prefix == other.prefix && self.suffix == other.suffix,
    }
  }
}

impl fmt::Display for Argument {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let ArgumentKind::Array(members) = &self.kind {
      return members.iter().try_for_each(|member| write!(f, "{member}"));
    }
    write!(f, "{}{}{}", self.prefix, self.source_text(), self.suffix)
  }
}
