//! Command dispatch: bridges CLI args -> SDK calls -> output formatting.

pub mod config_cmd;
pub mod records;
pub mod session;
pub mod util;

use baobab_core::Sdk;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, sdk: &Sdk, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Plugins => session::plugins(sdk, global),
        Command::Whoami => session::whoami(sdk, global),
        Command::Fetch(args) => records::fetch(sdk, args, global).await,
        Command::Things(args) => records::things(sdk, args, global).await,
        Command::Logins(args) => records::logins(sdk, args, global).await,
        Command::Baseline(args) => records::baseline(sdk, args, global).await,
        Command::Search(args) => records::search(sdk, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
