//! Production run handlers

use anyhow::Result;
use chrono::NaiveDate;
use clap::ArgMatches;
use packtrace_core::{
    domain::{CreateRun, ProductId, RunId, RunStatus},
    Services,
};
use serde_json::json;

use super::{required, unknown};
use crate::output::print_json;

pub async fn handle_run(services: &Services, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("create", sub_m)) => handle_create(services, sub_m).await,
        Some(("list", _)) => print_json(&services.runs.list_runs().await?),
        Some(("show", sub_m)) => {
            let detail = services.runs.run_detail(required(sub_m, "run")?).await?;
            if sub_m.get_flag("summary") {
                print_json(&json!({
                    "run": detail.run,
                    "product": detail.product,
                    "customer": detail.customer,
                    "totals": detail.totals,
                    "containers": detail.containers,
                }))
            } else {
                print_json(&detail)
            }
        }
        Some(("status", sub_m)) => {
            let run_id: RunId = required(sub_m, "run")?;
            let status: RunStatus = required(sub_m, "status")?;
            print_json(&services.runs.update_status(run_id, status).await?)
        }
        Some(("progress", sub_m)) => {
            let run_id: RunId = required(sub_m, "run")?;
            print_json(&services.line.production_status(run_id).await?)
        }
        Some(("reset", sub_m)) => print_json(&services.runs.reset_run(required(sub_m, "run")?).await?),
        Some(("delete", sub_m)) => {
            let run_id: RunId = required(sub_m, "run")?;
            services.runs.delete_run(run_id).await?;
            print_json(&json!({ "deleted": run_id }))
        }
        Some((name, _)) => Err(unknown("run", name)),
        None => Err(unknown("run", "")),
    }
}

async fn handle_create(services: &Services, matches: &ArgMatches) -> Result<()> {
    let product_id: ProductId = required(matches, "product")?;
    let quantity: u32 = required(matches, "quantity")?;
    let lot: String = required(matches, "lot")?;
    let expiry: NaiveDate = required(matches, "expiry")?;

    let mut params = CreateRun::new(product_id, quantity, lot, expiry);
    if let Some(start) = matches.get_one::<u64>("start") {
        params = params.with_start_sequence(*start);
    }
    let box_capacity = matches
        .get_one::<u32>("box-capacity")
        .copied()
        .unwrap_or(params.box_capacity);
    let pallet_capacity = matches
        .get_one::<u32>("pallet-capacity")
        .copied()
        .unwrap_or(params.pallet_capacity);
    params = params.with_capacities(box_capacity, pallet_capacity);

    print_json(&services.runs.create_run(params).await?)
}
