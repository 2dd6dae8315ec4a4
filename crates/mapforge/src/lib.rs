#![forbid(unsafe_code)]

pub mod available;
pub mod check;
pub mod cli;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod replay;
pub mod script;
pub mod util;

pub use cli::run_from_env;
pub use error::{CliError, Result};
