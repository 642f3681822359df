//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`init`], [`validate`], [`try_match`], or
//! [`health`]. Each handler lives in its own submodule.

pub mod health;
pub mod init;
pub mod run;
pub mod try_match;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::WaypointError;

pub async fn dispatch(cli: Cli) -> Result<(), WaypointError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Init(ref args)) => init::execute(args),
        Some(Commands::Validate(ref args)) => validate::execute(args),
        Some(Commands::Match(ref args)) => try_match::execute(args).await,
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  waypoint v{version} \u{2014} DFA-based HTTP endpoint matcher\n\n  \
         No command provided. To get started:\n\n    \
         waypoint init                     Generate a starter endpoint file\n    \
         waypoint match /products/42       Resolve a path (reads ./waypoint.yaml)\n    \
         waypoint run                      Serve matches over HTTP\n    \
         waypoint --help                   See all commands and options\n"
    );
}
