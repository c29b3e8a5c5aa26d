//! ffgate core library — config, Basic auth, command validation, tool execution
//! and the HTTP gateway used by the CLI.

pub mod auth;
pub mod command;
pub mod config;
pub mod exec;
pub mod gateway;

#[cfg(test)]
mod test_log;
