//! Simulated printer and verifier handlers

use anyhow::Result;
use clap::ArgMatches;
use packtrace_core::{
    domain::{RunId, UnitId},
    Services,
};

use super::required;
use crate::output::print_json;

pub async fn handle_print(services: &Services, matches: &ArgMatches) -> Result<()> {
    let run_id: RunId = required(matches, "run")?;
    let limit = matches.get_one::<usize>("limit").copied();
    print_json(&services.printer.print_batch(run_id, limit).await?)
}

pub async fn handle_print_unit(services: &Services, matches: &ArgMatches) -> Result<()> {
    let unit_id: UnitId = required(matches, "unit")?;
    print_json(&services.printer.print(unit_id).await?)
}

pub async fn handle_verify(services: &Services, matches: &ArgMatches) -> Result<()> {
    let run_id: RunId = required(matches, "run")?;
    print_json(&services.verifier.verify_batch(run_id).await?)
}

pub async fn handle_verify_unit(services: &Services, matches: &ArgMatches) -> Result<()> {
    let unit_id: UnitId = required(matches, "unit")?;
    print_json(&services.verifier.verify(unit_id).await?)
}

pub async fn handle_retry(services: &Services, matches: &ArgMatches) -> Result<()> {
    let unit_id: UnitId = required(matches, "unit")?;
    print_json(&services.verifier.retry(unit_id).await?)
}
