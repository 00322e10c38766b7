//! # robot_cli
//!
//! Terminal front end for the soft robot workbench. Parameters persist in a
//! state directory between invocations; solving and presets go to the HTTP
//! service named in the config file.

mod cli;
mod commands;
mod config;
mod http;

use clap::Parser;
use robot_core::storage::FileStorage;
use robot_core::Workbench;

use cli::{Cli, Command};
use config::CliConfig;
use http::ServiceClient;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let config = CliConfig::load(cli.config.as_deref())?;

    // Single-threaded: the core shares state through Rc and spawns onto a LocalSet
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(cli, config))
}

async fn run(cli: Cli, config: CliConfig) -> anyhow::Result<()> {
    let state_dir = config.state_dir(cli.state_dir.as_deref());
    log::debug!("State directory: {}", state_dir.display());
    let storage = FileStorage::open(&state_dir)?;

    let service = ServiceClient::new(&config.service)?;
    let bench = Workbench::open(Box::new(storage), service.clone(), config.session);

    let output = match cli.command {
        Command::Show { json } => {
            let state = bench.parameters();
            if json {
                serde_json::to_string_pretty(&state)?
            } else {
                commands::render_state(&state)
            }
        }
        Command::Set(args) => {
            let state = commands::apply_set(&mut bench.store().borrow_mut(), &args)?;
            commands::render_state(&state)
        }
        Command::Validate => commands::validate_current(&bench.parameters())?,
        Command::Solve => commands::solve(&bench).await?,
        Command::Presets { mine } => commands::list_presets(&service, mine).await?,
        Command::Load { id, solve } => commands::load(&bench, &service, id, solve).await?,
        Command::Save {
            name,
            description,
            public,
        } => commands::save(&bench.parameters(), &service, &name, description.as_deref(), public).await?,
        Command::Delete { id } => commands::delete(&service, id).await?,
        Command::Auto => commands::auto(&bench, &service).await,
    };

    println!("{}", output);
    Ok(())
}
