//! Identifier utilities

use anyhow::Result;
use clap::ArgMatches;
use packtrace_core::gs1;
use serde_json::{json, Value};

use super::{required, unknown};
use crate::output::print_json;

pub fn handle_gtin(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("check", sub_m)) => print_json(&gtin_check(&required::<String>(sub_m, "body")?)?),
        Some(("validate", sub_m)) => print_json(&gtin_validate(&required::<String>(sub_m, "gtin")?)),
        Some((name, _)) => Err(unknown("gtin", name)),
        None => Err(unknown("gtin", "")),
    }
}

pub fn handle_sscc(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("validate", sub_m)) => {
            let code: String = required(sub_m, "code")?;
            print_json(&json!({ "sscc": code, "valid": gs1::validate_sscc(&code) }))
        }
        Some((name, _)) => Err(unknown("sscc", name)),
        None => Err(unknown("sscc", "")),
    }
}

fn gtin_check(body: &str) -> Result<Value> {
    let check = gs1::gtin_check_digit(body).map_err(packtrace_core::Error::from)?;
    Ok(json!({ "body": body, "check_digit": check, "gtin": format!("{body}{check}") }))
}

fn gtin_validate(gtin: &str) -> Value {
    json!({ "gtin": gtin, "valid": gs1::validate_gtin(gtin) })
}
