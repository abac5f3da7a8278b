//! Splitting typed input into [`Argument`]s.
//!
//! Tokenizing is lossless: concatenating the rendered arguments gives back the
//! input exactly, including whitespace, quotes and escapes. This is what lets
//! a requisition rewrite one argument in place while leaving everything the
//! user typed around it untouched.
//!
//! # Quoting Rules
//!
//! | Syntax | Behavior |
//! |--------|----------|
//! | `foo` | Unquoted, ends at the next space |
//! | `'foo bar'` | Single-quoted, spaces are kept |
//! | `"foo bar"` | Double-quoted, spaces are kept |
//! | `foo'bar` | A quote inside an unquoted token is literal |
//!
//! Only the space character separates tokens. An unterminated quote runs to
//! the end of the input.
//!
//! # Escapes
//!
//! | Escape | Meaning |
//! |--------|---------|
//! | `\\` | a backslash |
//! | `\b` `\f` `\n` `\r` `\t` `\v` | the control character |
//! | `\ ` `\'` `\"` | a literal space or quote that never delimits |
//!
//! A backslash before any other character is kept as typed.
//!
//! ```
//! use the_lib::command_line::tokenize;
//!
//! let args = tokenize(r#"open 'a b' c\ d"#);
//! let texts: Vec<_> = args.iter().map(|arg| arg.text()).collect();
//! assert_eq!(texts, ["open", "a b", "c d"]);
//!
//! let typed: String = args.iter().map(ToString::to_string).collect();
//! assert_eq!(typed, r#"open 'a b' c\ d"#);
//! ```

use std::mem;

use crate::argument::Argument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
  Single,
  Double,
}

impl Quote {
  pub const fn char(&self) -> char {
    match self {
      Self::Single => '\'',
      Self::Double => '"',
    }
  }

  pub(crate) fn from_char(ch: char) -> Option<Self> {
    match ch {
      '\'' => Some(Self::Single),
      '"' => Some(Self::Double),
      _ => None,
    }
  }
}

/// One input character after escape processing.
#[derive(Debug, Clone, Copy)]
struct Unit<'a> {
  ch:      char,
  /// The characters as typed, including any backslash.
  raw:     &'a str,
  /// Escaped characters never start, end or delimit a token.
  escaped: bool,
}

impl Unit<'_> {
  fn is_space(&self) -> bool {
    !self.escaped && self.ch == ' '
  }

  fn quote(&self) -> Option<Quote> {
    if self.escaped {
      None
    } else {
      Quote::from_char(self.ch)
    }
  }
}

fn unescape(input: &str) -> Vec<Unit<'_>> {
  let mut units = Vec::with_capacity(input.len());
  let mut chars = input.char_indices().peekable();

  while let Some((start, ch)) = chars.next() {
    if ch != '\\' {
      units.push(Unit {
        ch,
        raw: &input[start..start + ch.len_utf8()],
        escaped: false,
      });
      continue;
    }

    let escaped = chars.peek().and_then(|&(_, next)| {
      let ch = match next {
        '\\' => '\\',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{b}',
        ' ' | '\'' | '"' => next,
        _ => return None,
      };
      Some((ch, next.len_utf8()))
    });

    match escaped {
      Some((escaped, len)) => {
        chars.next();
        units.push(Unit {
          ch:      escaped,
          raw:     &input[start..start + 1 + len],
          escaped: true,
        });
      },
      // An unknown escape keeps its backslash; the next character is handled
      // on its own.
      None => units.push(Unit {
        ch,
        raw: &input[start..start + 1],
        escaped: false,
      }),
    }
  }

  units
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  Outside,
  Unquoted,
  Quoted(Quote),
}

/// Streaming tokenizer state: the token being built and the whitespace and
/// opening quote seen before it.
#[derive(Debug, Default)]
struct Tokenizer {
  args:   Vec<Argument>,
  prefix: String,
  text:   String,
  source: String,
}

impl Tokenizer {
  fn push(&mut self, unit: Unit<'_>) {
    self.text.push(unit.ch);
    self.source.push_str(unit.raw);
  }

  fn finish_token(&mut self, suffix: &str) {
    let arg = Argument::new(mem::take(&mut self.text), mem::take(&mut self.prefix), suffix)
      .with_source(mem::take(&mut self.source));
    self.args.push(arg);
  }

  fn run(mut self, units: &[Unit<'_>]) -> Vec<Argument> {
    let mut state = State::Outside;

    for unit in units {
      state = match state {
        State::Outside => {
          if unit.is_space() {
            self.prefix.push(' ');
            State::Outside
          } else if let Some(quote) = unit.quote() {
            self.prefix.push(quote.char());
            State::Quoted(quote)
          } else {
            self.push(*unit);
            State::Unquoted
          }
        },
        State::Unquoted => {
          if unit.is_space() {
            self.finish_token("");
            self.prefix.push(' ');
            State::Outside
          } else {
            self.push(*unit);
            State::Unquoted
          }
        },
        State::Quoted(quote) => {
          if unit.quote() == Some(quote) {
            self.finish_token(&quote.char().to_string());
            State::Outside
          } else {
            self.push(*unit);
            State::Quoted(quote)
          }
        },
      };
    }

    match state {
      State::Unquoted | State::Quoted(_) => self.finish_token(""),
      State::Outside if self.prefix.is_empty() => {},
      State::Outside => {
        let trailing = mem::take(&mut self.prefix);
        match self.args.last_mut() {
          Some(last) => last.push_suffix(&trailing),
          None => self.args.push(Argument::new("", trailing, "")),
        }
      },
    }

    self.args
  }
}

/// Whether `text` has to be quoted for [`tokenize`] to read it back as one
/// argument with the same text.
pub fn needs_quoting(text: &str) -> bool {
  text.is_empty() || text.contains([' ', '\\']) || text.starts_with(['\'', '"'])
}

/// Escapes backslashes and `quote` for use between a pair of `quote`s.
pub fn escape_quoted(text: &str, quote: Quote) -> String {
  let mut escaped = String::with_capacity(text.len());
  for ch in text.chars() {
    if ch == '\\' || ch == quote.char() {
      escaped.push('\\');
    }
    escaped.push(ch);
  }
  escaped
}

/// `text` written as a single argument: as is when that reads back
/// unchanged, single-quoted otherwise.
pub fn quote(text: &str) -> String {
  if needs_quoting(text) {
    format!("'{}'", escape_quoted(text, Quote::Single))
  } else {
    text.to_string()
  }
}

/// Splits `input` into arguments.
///
/// Always returns at least one argument: empty input gives a single empty
/// argument, and whitespace-only input gives a single argument whose prefix
/// is that whitespace. Trailing whitespace is attached to the last argument's
/// suffix.
pub fn tokenize(input: &str) -> Vec<Argument> {
  if input.is_empty() {
    return vec![Argument::empty()];
  }

  if !input.contains([' ', '\'', '"', '\\']) {
    return vec![Argument::new(input, "", "")];
  }

  Tokenizer::default().run(&unescape(input))
}

#[cfg(test)]
mod test {
  use quickcheck::quickcheck;

  use super::*;

  #[track_caller]
  fn assert_tokens(input: &str, expected: &[&str]) {
    let args = tokenize(input);
    let actual: Vec<_> = args.iter().map(|arg| arg.text()).collect();
    assert_eq!(actual.as_slice(), expected);
  }

  #[track_caller]
  fn assert_parts(input: &str, expected: &[(&str, &str, &str)]) {
    let args = tokenize(input);
    let actual: Vec<_> = args
      .iter()
      .map(|arg| (arg.prefix(), arg.text(), arg.suffix()))
      .collect();
    assert_eq!(actual.as_slice(), expected);
  }

  #[test]
  fn tokenize_unquoted() {
    assert_tokens("", &[""]);
    assert_tokens("hello", &["hello"]);
    assert_tokens("hello world", &["hello", "world"]);
    assert_tokens("  hello   world", &["hello", "world"]);
  }

  #[test]
  fn tokenize_blank() {
    assert_parts("", &[("", "", "")]);
    assert_parts("   ", &[("   ", "", "")]);
  }

  #[test]
  fn trailing_whitespace_goes_to_the_last_suffix() {
    assert_parts("a b  ", &[("", "a", ""), (" ", "b", "  ")]);
    assert_parts("'a'  ", &[("'", "a", "'  ")]);
  }

  #[test]
  fn tokenize_quoting() {
    assert_parts(r#"foo "bar baz" qux"#, &[
      ("", "foo", ""),
      (" \"", "bar baz", "\""),
      (" ", "qux", ""),
    ]);
    assert_tokens("'hello world'", &["hello world"]);
    assert_tokens("''", &[""]);
    assert_tokens(r#"'it"s'"#, &[r#"it"s"#]);
    assert_tokens("don't stop", &["don't", "stop"]);
  }

  #[test]
  fn unterminated_quote_runs_to_the_end() {
    assert_parts("echo 'a b", &[("", "echo", ""), (" '", "a b", "")]);
  }

  #[test]
  fn tokenize_escapes() {
    assert_tokens(r"a\ b c", &["a b", "c"]);
    assert_tokens(r"a\nb", &["a\nb"]);
    assert_tokens(r"a\\b", &["a\\b"]);
    assert_tokens(r"\'quoted\'", &["'quoted'"]);
    assert_tokens(r#""say \"hi\"""#, &[r#"say "hi""#]);
    // Unknown escapes are kept verbatim.
    assert_tokens(r"a\qb", &[r"a\qb"]);
    assert_tokens(r"trailing\", &[r"trailing\"]);
  }

  #[test]
  fn only_spaces_separate() {
    assert_tokens("a\tb", &["a\tb"]);
  }

  #[test]
  fn quote_only_when_needed() {
    assert_eq!(quote("plain"), "plain");
    assert_eq!(quote("don't"), "don't");
    assert_eq!(quote(""), "''");
    assert_eq!(quote("a b"), "'a b'");
    assert_eq!(quote(r"C:\temp"), r"'C:\\temp'");
    assert_eq!(quote("'x"), r"'\'x'");
    assert_eq!(quote("\"x"), "'\"x'");
  }

  #[test]
  fn escape_quoted_matches_the_quote() {
    assert_eq!(escape_quoted(r#"it's "so""#, Quote::Single), r#"it\'s "so""#);
    assert_eq!(escape_quoted(r#"it's "so""#, Quote::Double), r#"it's \"so\""#);
  }

  quickcheck! {
    fn reconstructs_input(input: String) -> bool {
      let rebuilt: String = tokenize(&input).iter().map(ToString::to_string).collect();
      rebuilt == input
    }

    fn quoted_text_reads_back(text: String) -> bool {
      let args = tokenize(&quote(&text));
      args.len() == 1 && args[0].text() == text
    }
  }
}
