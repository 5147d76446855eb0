//! One module per subcommand. Each signs in, does its work, and signs out.

pub mod add;
pub mod delete;
pub mod list;
pub mod register;
pub mod reset;
pub mod show;
