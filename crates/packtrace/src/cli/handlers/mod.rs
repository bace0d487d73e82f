//! CLI command handlers that bridge between `clap` and `packtrace-core`
//!
//! - `catalogue`: customer and product registration
//! - `run`: run lifecycle, detail and progress
//! - `device`: simulated printer and verifier
//! - `packing`: automatic and manual aggregation
//! - `line`: line start/stop and pallet signals
//! - `codec`: identifier utilities that need no database

use anyhow::{anyhow, Result};
use clap::ArgMatches;
use packtrace_core::{config, Config, Services};

pub mod catalogue;
pub mod codec;
pub mod device;
pub mod line;
pub mod packing;
pub mod run;

pub async fn dispatch(matches: &ArgMatches) -> Result<()> {
    let Some((name, sub_m)) = matches.subcommand() else {
        anyhow::bail!("Unknown command. Run 'packtrace --help' for usage.");
    };

    // Codec utilities never touch the database.
    match name {
        "gtin" => return codec::handle_gtin(sub_m),
        "sscc" => return codec::handle_sscc(sub_m),
        _ => {}
    }

    let config = load(matches).await?;
    let services = Services::connect(&config).await?;

    match name {
        "customer" => catalogue::handle_customer(&services, sub_m).await,
        "product" => catalogue::handle_product(&services, sub_m).await,
        "run" => run::handle_run(&services, sub_m).await,
        "print" => device::handle_print(&services, sub_m).await,
        "print-unit" => device::handle_print_unit(&services, sub_m).await,
        "verify" => device::handle_verify(&services, sub_m).await,
        "verify-unit" => device::handle_verify_unit(&services, sub_m).await,
        "retry" => device::handle_retry(&services, sub_m).await,
        "aggregate" => packing::handle_aggregate(&services, sub_m).await,
        "box" => packing::handle_box(&services, sub_m).await,
        "pallet" => packing::handle_pallet(&services, sub_m).await,
        "tree" => packing::handle_tree(&services, sub_m).await,
        "line" => line::handle_line(&services, sub_m).await,
        other => Err(anyhow!("Unknown command: {other}")),
    }
}

/// Config files and environment, then command-line flags on top.
async fn load(matches: &ArgMatches) -> Result<Config> {
    let mut config = config::load_config().await?;
    if let Some(url) = matches.get_one::<String>("db") {
        config.database.url.clone_from(url);
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.simulator.seed = Some(*seed);
    }
    Ok(config)
}

/// Value of an argument clap already enforces as required.
pub(crate) fn required<T>(matches: &ArgMatches, name: &str) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
{
    matches
        .get_one::<T>(name)
        .cloned()
        .ok_or_else(|| anyhow!("missing required argument <{name}>"))
}

pub(crate) fn unknown(group: &str, name: &str) -> anyhow::Error {
    anyhow!("Unknown {group} subcommand: {name}. Run 'packtrace {group} --help' for usage.")
}
