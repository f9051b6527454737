//! move-stamp CLI: specialize a compiled Move template without recompiling.
//!
//! Three commands cover the workflow: `inspect` a template to see what can be
//! edited, write a `plan`, then `stamp` the template with it.
//!
//! All byte-level work is delegated to [`move_stamp_core`].

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "move-stamp",
    about = "Stamp specialized Move modules out of a compiled template",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the version, name, identifiers and constants of a module
    Inspect {
        /// Path to the compiled module (.mv)
        module: PathBuf,
    },

    /// Apply an edit plan to a template module
    Stamp {
        /// Path to the compiled template module
        #[arg(long, short)]
        template: PathBuf,

        /// Path to the edit plan JSON
        #[arg(long, short)]
        plan: PathBuf,

        /// Output path for the stamped module
        #[arg(long, short)]
        output: PathBuf,

        /// Companion module published alongside, left untouched
        #[arg(long)]
        dependency: Option<PathBuf>,

        /// Also write a publish bundle to this path
        #[arg(long)]
        bundle: Option<PathBuf>,
    },

    /// Write the edit plan for the token template
    Plan {
        /// New module name (the witness becomes its uppercase form)
        #[arg(long)]
        name: String,

        /// Total supply
        #[arg(long, default_value = "100")]
        total_supply: String,

        /// Decimals
        #[arg(long, default_value = "9")]
        decimals: String,

        /// Coin symbol
        #[arg(long, default_value = "Symbol")]
        symbol: String,

        /// Coin display name
        #[arg(long, default_value = "Name")]
        token_name: String,

        /// Coin description
        #[arg(long, default_value = "Description")]
        description: String,

        /// Icon URL
        #[arg(long, default_value = "icon_url")]
        icon_url: String,

        /// Mint price
        #[arg(long, default_value = "1000")]
        mint_price: String,

        /// Owner allocation
        #[arg(long, default_value = "10000")]
        owner_allocation: String,

        /// Take expected values from this template instead of the preset
        #[arg(long)]
        template: Option<PathBuf>,

        /// Output path for the plan
        #[arg(long, short, default_value = "edit_plan.json")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Inspect { module } => {
            commands::inspect::run(&module)?;
        }
        Commands::Stamp {
            template,
            plan,
            output,
            dependency,
            bundle,
        } => {
            commands::stamp::run(
                &template,
                &plan,
                &output,
                dependency.as_deref(),
                bundle.as_deref(),
            )?;
        }
        Commands::Plan {
            name,
            total_supply,
            decimals,
            symbol,
            token_name,
            description,
            icon_url,
            mint_price,
            owner_allocation,
            template,
            output,
        } => {
            let params = move_stamp_core::token::TokenParams {
                module_name: name,
                total_supply,
                decimals,
                symbol,
                name: token_name,
                description,
                icon_url,
                mint_price,
                owner_allocation,
            };
            commands::plan::run(&params, template.as_deref(), &output)?;
        }
    }

    Ok(())
}
