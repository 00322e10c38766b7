use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "robot_cli", about = "Soft robot configuration workbench")]
pub struct Cli {
    /// Optional config file (.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted parameters (overrides the config file)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the persisted parameters
    Show {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Edit parameters; array fields take INDEX=VALUE pairs
    Set(SetArgs),
    /// Run the validation gate on the persisted parameters
    Validate,
    /// Submit the persisted parameters to the solver once
    Solve,
    /// List presets
    Presets {
        /// Only presets owned by the signed-in user
        #[arg(long)]
        mine: bool,
    },
    /// Replace the parameters with a stored preset
    Load {
        id: i64,
        /// Solve the loaded configuration afterwards
        #[arg(long)]
        solve: bool,
    },
    /// Save the current parameters as a new preset
    Save {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        public: bool,
    },
    /// Delete a preset
    Delete { id: i64 },
    /// Bootstrap an empty session from the default public preset
    Auto,
}

#[derive(clap::Args, Default)]
pub struct SetArgs {
    /// Number of segments (clamped to 1..=10)
    #[arg(long, allow_negative_numbers = true)]
    pub segments: Option<i64>,

    /// Bending angle in degrees, e.g. --bend 0=20.5
    #[arg(long = "bend", value_name = "INDEX=DEG", allow_negative_numbers = true)]
    pub bend: Vec<String>,

    /// Rotation angle in degrees
    #[arg(long = "rotate", value_name = "INDEX=DEG", allow_negative_numbers = true)]
    pub rotate: Vec<String>,

    /// Backbone length in meters
    #[arg(long = "backbone", value_name = "INDEX=M")]
    pub backbone: Vec<String>,

    /// Coupling length in meters (index 0 is the base coupling)
    #[arg(long = "coupling", value_name = "INDEX=M")]
    pub coupling: Vec<String>,

    /// Discretization steps per segment
    #[arg(long)]
    pub steps: Option<u32>,

    /// Tendon count; adds tendons with default radii if there are none
    #[arg(long)]
    pub tendons: Option<u32>,

    /// Tendon routing radius in meters at a coupling
    #[arg(long = "radius", value_name = "INDEX=M")]
    pub radius: Vec<String>,

    /// Tendon coupling offset in meters
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<f64>,

    /// Remove the tendon configuration
    #[arg(long, conflicts_with_all = ["tendons", "radius", "offset"])]
    pub no_tendons: bool,
}

/// Parse an `INDEX=VALUE` pair.
pub fn parse_indexed(raw: &str) -> anyhow::Result<(usize, f64)> {
    let (index, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected INDEX=VALUE, got '{}'", raw))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid index in '{}'", raw))?;
    let value = value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid number in '{}'", raw))?;
    Ok((index, value))
}
