use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use provisioner::commands::{self, Session};
use provisioner::error::{StepLabel, critical_line, error_kind};
use provisioner::output::Output;
use provisioner::{Cli, Commands};

/// Set to `True` to see configuration loading before the CLI is fully set up.
const PRE_RUN_DEBUG_ENV: &str = "PROVISIONER_PRE_RUN_DEBUG";

fn init_tracing(verbose: bool) {
    let pre_run_debug = std::env::var(PRE_RUN_DEBUG_ENV).is_ok_and(|value| value.eq_ignore_ascii_case("true"));
    let default_filter = if pre_run_debug {
        "debug"
    } else if verbose {
        "warn,provisioner=info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Install(_) => "install",
        Commands::SingleBoard(_) => "single-board",
        Commands::Examples(_) => "examples",
        Commands::System(_) => "system",
        Commands::Config(_) => "config",
        Commands::Completions(_) => "completions",
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions(args) = &cli.command {
        return commands::completions::run(args);
    }

    let session = Session::from_cli(&cli)?;
    tracing::debug!(
        os_arch = %session.ctx.os_arch,
        dry_run = session.ctx.dry_run,
        verbose = session.ctx.verbose,
        "Session created"
    );

    match cli.command {
        Commands::Install(args) => commands::install::run(args, &session),
        Commands::SingleBoard(args) => commands::single_board::run(args, &session),
        Commands::Examples(args) => commands::examples::run(args, &session),
        Commands::System(args) => commands::system::run(args, &session),
        Commands::Config(args) => commands::config::run(args, &session),
        Commands::Completions(args) => commands::completions::run(&args),
    }
}

fn main() {
    let cli = Cli::parse();
    let verbose = cli.is_verbose();
    init_tracing(verbose);
    let name = command_name(&cli.command);

    let Err(err) = run(cli) else {
        return;
    };

    // A failure escaping a named step is a managed failure: one line, exit 0.
    if !verbose && err.downcast_ref::<StepLabel>().is_some() {
        Output::error(critical_line(name, &err));
        return;
    }
    Output::error(format!("{}: {err:#}", error_kind(&err)));
    std::process::exit(1);
}
