//! A type-aware command line engine.
//!
//! Commands are registered in a [`canon::Canon`] with typed parameters. A
//! [`requisition::Requisition`] reads what the user has typed so far,
//! resolves the command, assigns every argument to a parameter and converts
//! it through the parameter's [`types::Type`], reporting a
//! [`status::Status`] per assignment and per character, completion
//! candidates, and the arguments to run the command with.

pub mod argument;
pub mod assignment;
pub mod canon;
pub mod command_line;
pub mod config;
pub mod conversion;
pub mod output;
pub mod promise;
pub mod requisition;
pub mod status;
pub mod types;
pub mod value;
