//! Aggregation handlers

use anyhow::Result;
use clap::ArgMatches;
use packtrace_core::{
    domain::{ContainerId, RunId, UnitId},
    Services,
};

use super::required;
use crate::output::print_json;

pub async fn handle_aggregate(services: &Services, matches: &ArgMatches) -> Result<()> {
    let run_id: RunId = required(matches, "run")?;
    print_json(&services.aggregation.aggregate(run_id).await?)
}

pub async fn handle_box(services: &Services, matches: &ArgMatches) -> Result<()> {
    let run_id: RunId = required(matches, "run")?;
    let units: Vec<UnitId> = matches
        .get_many::<UnitId>("units")
        .map(|ids| ids.copied().collect())
        .unwrap_or_default();
    print_json(&services.aggregation.create_box(run_id, &units).await?)
}

pub async fn handle_pallet(services: &Services, matches: &ArgMatches) -> Result<()> {
    let run_id: RunId = required(matches, "run")?;
    let boxes: Vec<ContainerId> = matches
        .get_many::<ContainerId>("boxes")
        .map(|ids| ids.copied().collect())
        .unwrap_or_default();
    print_json(&services.aggregation.create_pallet(run_id, &boxes).await?)
}

pub async fn handle_tree(services: &Services, matches: &ArgMatches) -> Result<()> {
    let run_id: RunId = required(matches, "run")?;
    print_json(&services.aggregation.container_tree(run_id).await?)
}
