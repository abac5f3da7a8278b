mod cli;

use std::{
  io::{
    self,
    BufRead,
    Write,
  },
  path::Path,
};

use anyhow::{
  Context,
  Result,
};
use cli::CliOptions;
use log::LevelFilter;
use the_default::{
  Config,
  shutdown,
  startup,
};
use the_lib::{
  output::Output,
  requisition::Requisition,
  status::Status,
};

fn main() -> Result<()> {
  let options = CliOptions::parse();
  setup_logging(options.verbosity, options.log_file.as_deref())?;

  let config = match &options.config_file {
    Some(path) => Config::load(path)?,
    None => Config::default(),
  };
  let env = startup(&config)?;
  env.outputs.subscribe(print_output);

  let mut requisition = env.requisition();
  let stdin = io::stdin();
  let mut stdout = io::stdout();
  for line in stdin.lock().lines() {
    let line = line.context("failed to read input")?;
    // A trailing tab asks for the input under the cursor to be completed.
    let (typed, complete) = match line.strip_suffix('\t') {
      Some(typed) => (typed, true),
      None => (line.as_str(), false),
    };

    requisition.update(typed);
    if complete {
      let id = requisition.assignment_at(typed.chars().count());
      requisition.complete(id);
    }

    write!(stdout, "{}", report(&requisition))?;
    stdout.flush()?;

    if requisition.status().is_valid() && !complete {
      requisition.exec(None);
    }
  }

  shutdown(&env);
  Ok(())
}

fn setup_logging(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
  let level = match verbosity {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Info,
    2 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };

  let mut dispatch = fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "[{}] {}: {}",
        record.level(),
        record.target(),
        message
      ))
    })
    .level(level);

  dispatch = match log_file {
    Some(path) => dispatch.chain(fern::log_file(path)?),
    None => dispatch.chain(io::stderr()),
  };
  dispatch.apply()?;
  Ok(())
}

/// The current input, a markup line under it and what can be typed next.
fn report(requisition: &Requisition) -> String {
  let typed = requisition.to_string();
  let markup: String = requisition
    .input_status_markup()
    .into_iter()
    .map(|status| {
      match status {
        Status::Valid => ' ',
        Status::Incomplete => '~',
        Status::Error => '^',
      }
    })
    .collect();

  let mut report = format!("{typed}\n{}\n", markup.trim_end());
  report.push_str(&format!("status: {}\n", requisition.status()));

  let id = requisition.assignment_at(requisition.input().cursor().start);
  if let Some(assignment) = requisition.assignment_by_id(id) {
    if !assignment.message().is_empty() {
      report.push_str(&format!("{}: {}\n", assignment.name(), assignment.message()));
    }
    let names: Vec<_> = requisition
      .predictions(id)
      .into_iter()
      .map(|prediction| prediction.name)
      .collect();
    if !names.is_empty() {
      report.push_str(&format!("predictions: {}\n", names.join(" ")));
    }
  }
  report
}

fn print_output(output: &Output) {
  if !output.completed {
    return;
  }
  match (&output.error, &output.output) {
    (Some(error), _) => eprintln!("{}: {error}", output.typed),
    (None, Some(value)) => println!("{value}"),
    (None, None) => {},
  }
}
