//! warden CLI: policy-driven governance for self-modifying codebases.
//!
//! Subcommands: `audit`, `check-paths`, `verify-edit`, `actions`. See
//! `warden --help` for usage.

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod cli_args;
mod commands;

use cli_args::{ActionCommands, Cli, Commands};

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("WARDEN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let formatter: Box<dyn warden_output::OutputFormatter> = if cli.json {
        Box::new(warden_output::json::JsonFormatter)
    } else {
        Box::new(warden_output::human::HumanFormatter)
    };

    let root = cli.root.clone();
    let exit_code = match cli.command {
        Commands::Audit { timeout, workers } => commands::audit::run(&*formatter, root, timeout, workers),
        Commands::CheckPaths { paths, content_from } => {
            commands::check_paths::run(&*formatter, root, paths, content_from)
        }
        Commands::VerifyEdit {
            original,
            modified,
            path,
            max_comment_length,
            allow,
        } => commands::verify_edit::run(&*formatter, root, original, modified, path, max_comment_length, allow),
        Commands::Actions { command } => match command {
            ActionCommands::List { category } => commands::actions::list(&*formatter, category),
            ActionCommands::Run { id, params, write } => {
                commands::actions::run(&*formatter, root, id, params, write)
            }
        },
    };

    std::process::exit(exit_code);
}
