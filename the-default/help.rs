//! The built-in `help` command.

use the_lib::{
  canon::{
    Canon,
    Command,
    CommandSpec,
    ParamSpec,
  },
  output::{
    CommandError,
    ExecutionContext,
    Reply,
  },
  value::Args,
};

use crate::config::HelpConfig;

pub const HELP_COMMAND: &str = "help";

pub fn help_command(config: HelpConfig) -> CommandSpec {
  CommandSpec::new(HELP_COMMAND)
    .description("Get help on the available commands")
    .param(
      ParamSpec::new("search", "string")
        .description("Search string")
        .optional(),
    )
    .group("Options", [
      ParamSpec::new("hidden", "boolean").description("Include hidden"),
    ])
    .return_type("text")
    .exec(move |args, context| cmd_help(&config, args, context))
}

fn cmd_help(
  config: &HelpConfig,
  args: &Args,
  context: &ExecutionContext,
) -> Result<Reply, CommandError> {
  let search = args.get_str("search").filter(|search| !search.is_empty());
  let hidden = args.get_bool("hidden").unwrap_or(false);
  Ok(render_help(context.canon(), config, search, hidden).into())
}

/// Help text for `search`, or the command overview when there is none.
pub fn render_help(canon: &Canon, config: &HelpConfig, search: Option<&str>, hidden: bool) -> String {
  let found = search.and_then(|search| canon.command(search));
  if let Some(command) = &found
    && command.is_executable()
  {
    return command.description_or_default().to_string();
  }

  let mut lines = Vec::new();
  if search.is_none()
    && let Some(prefix) = &config.prefix
  {
    lines.push(prefix.clone());
  }

  match (&found, search) {
    (Some(namespace), _) => {
      lines.push(format!("Sub-Commands of {}:", namespace.name()));
      lines.push(namespace.description_or_default().to_string());
    },
    (None, Some(search)) => lines.push(format!("Commands starting with '{search}':")),
    (None, None) => lines.push("Available Commands:".to_string()),
  }

  let listed: Vec<_> = canon
    .commands()
    .into_iter()
    .filter(|command| is_listed(command, search, hidden))
    .collect();
  let width = listed
    .iter()
    .map(|command| command.name().len())
    .max()
    .unwrap_or(0);
  for command in &listed {
    let description = command.description().unwrap_or_default();
    lines.push(format!("  {:<width$}  {description}", command.name()));
  }

  if search.is_none()
    && let Some(suffix) = &config.suffix
  {
    lines.push(suffix.clone());
  }

  lines.join("\n")
}

fn is_listed(command: &Command, search: Option<&str>, hidden: bool) -> bool {
  if command.is_hidden() && !hidden {
    return false;
  }
  // Commands without a description are internal.
  if command.description().is_none() {
    return false;
  }
  match search {
    Some(search) => command.name().starts_with(search) && command.name() != search,
    None => !command.name().contains(' '),
  }
}

#[cfg(test)]
mod test {
  use the_lib::types::Types;

  use super::*;

  fn noop(_: &Args, _: &ExecutionContext) -> Result<Reply, CommandError> {
    Ok(Reply::None)
  }

  fn canon() -> Canon {
    let canon = Canon::new(Types::with_builtins());
    canon
      .add_command(CommandSpec::new("echo").description("Show a message").exec(noop))
      .unwrap();
    canon
      .add_command(CommandSpec::new("edit").exec(noop))
      .unwrap();
    canon
      .add_command(CommandSpec::new("tsg").description("Test sub-commands"))
      .unwrap();
    canon
      .add_command(CommandSpec::new("tsg a").description("First").exec(noop))
      .unwrap();
    canon
      .add_command(CommandSpec::new("tsg b").description("Second").exec(noop))
      .unwrap();
    canon
      .add_command(
        CommandSpec::new("secret")
          .description("Not for everyone")
          .hidden(true)
          .exec(noop),
      )
      .unwrap();
    canon
  }

  #[test]
  fn overview_lists_top_level_commands() {
    let text = render_help(&canon(), &HelpConfig::default(), None, false);
    assert_eq!(
      text,
      "Available Commands:\n  echo  Show a message\n  tsg   Test sub-commands"
    );
  }

  #[test]
  fn overview_includes_hidden_on_request() {
    let text = render_help(&canon(), &HelpConfig::default(), None, true);
    assert!(text.contains("secret  Not for everyone"));
  }

  #[test]
  fn overview_is_framed_by_prefix_and_suffix() {
    let config = HelpConfig {
      prefix: Some("Welcome".into()),
      suffix: Some("Bye".into()),
    };
    let text = render_help(&canon(), &config, None, false);
    assert!(text.starts_with("Welcome\nAvailable Commands:"));
    assert!(text.ends_with("\nBye"));

    let text = render_help(&canon(), &config, Some("e"), false);
    assert!(!text.contains("Welcome"));
    assert!(!text.contains("Bye"));
  }

  #[test]
  fn executable_command_gets_its_description() {
    let canon = canon();
    let config = HelpConfig::default();
    assert_eq!(render_help(&canon, &config, Some("echo"), false), "Show a message");
    assert_eq!(render_help(&canon, &config, Some("edit"), false), "(No description)");
  }

  #[test]
  fn namespace_lists_its_sub_commands() {
    let text = render_help(&canon(), &HelpConfig::default(), Some("tsg"), false);
    assert_eq!(
      text,
      "Sub-Commands of tsg:\nTest sub-commands\n  tsg a  First\n  tsg b  Second"
    );
  }

  #[test]
  fn search_filters_by_prefix() {
    let text = render_help(&canon(), &HelpConfig::default(), Some("e"), false);
    assert_eq!(text, "Commands starting with 'e':\n  echo  Show a message");
  }
}
