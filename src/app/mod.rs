pub mod cli;
pub mod commands;
pub mod context;

pub use cli::{Cli, Command, TaskCommand};
pub use commands::{run, Report};
pub use context::{AppContext, ContextOptions};
