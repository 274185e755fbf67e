//! `cool` -- inspect and change a UCM object graph through cleartool.
//!
//! Parses CLI arguments with clap, resolves the runtime context, and
//! dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use cool_ucm::UcmError;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

fn main() {
    // First Ctrl+C exits with 130, a second one forces exit 1.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        std::process::exit(130);
    });

    let cli = Cli::parse();
    init_tracing(&cli);

    let result = RuntimeContext::from_global_args(&cli.global).and_then(|ctx| dispatch(&ctx, cli.command));

    if let Err(e) = result {
        let kind = e.downcast_ref::<UcmError>().map(UcmError::kind);
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
                "kind": kind,
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            match kind {
                Some(kind) => eprintln!("Error: {}: {:#}", kind, e),
                None => eprintln!("Error: {:#}", e),
            }
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr. `RUST_LOG` wins over the verbosity flags.
fn init_tracing(cli: &Cli) {
    let default = if cli.global.verbose {
        "cool=debug,cool_ucm=debug,cool_cleartool=debug"
    } else if cli.global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(ctx: &RuntimeContext, command: Option<Commands>) -> anyhow::Result<()> {
    match command {
        Some(Commands::Show(args)) => commands::show::run(ctx, &args),
        Some(Commands::Children(args)) => commands::children::run(ctx, &args),
        Some(Commands::Siblings(args)) => commands::siblings::run(ctx, &args),
        Some(Commands::Delivering(args)) => commands::delivering::run(ctx, &args),
        Some(Commands::Baselines(args)) => commands::baselines::run(ctx, &args),
        Some(Commands::Recommended(args)) => commands::recommended::run(ctx, &args),
        Some(Commands::Promote(args)) => commands::promote::run(ctx, &args),
        Some(Commands::SetTag(args)) => commands::tag::run_set(ctx, &args),
        Some(Commands::GetTag(args)) => commands::tag::run_get(ctx, &args),
        Some(Commands::Completion(args)) => commands::completion::run(ctx, &args),
        Some(Commands::Version) => commands::version::run(ctx),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    }
}
