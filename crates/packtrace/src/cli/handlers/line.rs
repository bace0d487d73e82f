//! Line control handlers
//!
//! Line state lives in the process, so `status` only reflects starts and
//! stops issued by the same invocation.

use anyhow::Result;
use clap::ArgMatches;
use packtrace_core::{
    domain::{ContainerId, RunId},
    Services,
};
use serde_json::json;

use super::{required, unknown};
use crate::output::print_json;

pub async fn handle_line(services: &Services, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("start", sub_m)) => {
            let run_id: RunId = required(sub_m, "run")?;
            print_json(&services.line.start(run_id).await?)
        }
        Some(("stop", sub_m)) => {
            let run_id: RunId = required(sub_m, "run")?;
            print_json(&services.line.stop(run_id).await?)
        }
        Some(("status", sub_m)) => {
            let run_id: RunId = required(sub_m, "run")?;
            services.runs.get_run(run_id).await?;
            print_json(&services.line.status(run_id).await)
        }
        Some(("pallet-complete", sub_m)) => {
            let pallet_id: ContainerId = required(sub_m, "pallet")?;
            let acknowledged = services.line.signal_pallet_complete(pallet_id).await?;
            print_json(&json!({ "pallet_id": pallet_id, "acknowledged": acknowledged }))
        }
        Some((name, _)) => Err(unknown("line", name)),
        None => Err(unknown("line", "")),
    }
}
