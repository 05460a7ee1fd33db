//! Binary entry point: parses the CLI, loads config and logging, and
//! dispatches to the per-subcommand handler.
//!
//! Loads config before logging before dispatch: `Cli::parse()`, then
//! `ConfigLoader::load()`, then `logging::init()`, then a match over
//! `cli.command`.

use clap::Parser;
use swarm1::cli::{commands, Cli, Commands};
use swarm1::infrastructure::{logging, ConfigLoader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load() {
        Ok(c) => c,
        Err(err) => {
            eprintln!("config error: {err}");
            std::process::exit(202);
        }
    };

    let _logger_guard = logging::init(&config.logging);

    let exit_code = match cli.command {
        Commands::Run {
            graph,
            project_id,
            run_id,
        } => commands::run::handle(&graph, project_id, run_id, &config, cli.json).await,
        Commands::Resume { graph, run_id } => {
            commands::resume::handle(&graph, &run_id, &config, cli.json).await
        }
        Commands::Validate { graph } => commands::validate::handle(&graph, cli.json).await,
        Commands::Route {
            agent,
            cap,
            budget,
            consent,
            registry,
            policy,
        } => commands::route::handle(&agent, &cap, budget, consent, &registry, &policy).await,
        Commands::Spend {
            session,
            artifact_root,
        } => commands::spend::handle(session, &artifact_root).await,
    };

    std::process::exit(exit_code);
}
