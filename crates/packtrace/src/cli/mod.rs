pub mod handlers;

use chrono::NaiveDate;
use clap::{value_parser, Arg, ArgAction, Command};
use packtrace_core::domain::{ContainerId, CustomerId, ProductId, RunId, RunStatus, UnitId};

pub fn build_cli() -> Command {
    Command::new("packtrace")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Serialization, print/verify simulation and packing aggregation")
        .subcommand_required(true)
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .value_name("URL")
                .help("Database URL (overrides config and PACKTRACE_DATABASE_URL)"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .global(true)
                .value_name("N")
                .value_parser(value_parser!(u64))
                .help("Seed for the simulated devices"),
        )
        .subcommand(cmd_customer())
        .subcommand(cmd_product())
        .subcommand(cmd_run())
        .subcommand(
            Command::new("print")
                .about("Print a run's generated units in sequence order")
                .arg(run_arg())
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .help("Print at most this many units (0 means all)"),
                ),
        )
        .subcommand(
            Command::new("print-unit")
                .about("Print a single unit")
                .arg(unit_arg()),
        )
        .subcommand(
            Command::new("verify")
                .about("Verify a run's printed units")
                .arg(run_arg()),
        )
        .subcommand(
            Command::new("verify-unit")
                .about("Verify a single unit")
                .arg(unit_arg()),
        )
        .subcommand(
            Command::new("retry")
                .about("Manually verify a rejected unit")
                .arg(unit_arg()),
        )
        .subcommand(
            Command::new("aggregate")
                .about("Pack every unit of a run into boxes and pallets")
                .arg(run_arg()),
        )
        .subcommand(
            Command::new("box")
                .about("Pack selected units into a new box")
                .arg(run_arg())
                .arg(
                    Arg::new("units")
                        .required(true)
                        .num_args(1..)
                        .value_parser(|s: &str| s.parse::<UnitId>())
                        .help("Unit ids"),
                ),
        )
        .subcommand(
            Command::new("pallet")
                .about("Stack selected boxes onto a new pallet")
                .arg(run_arg())
                .arg(
                    Arg::new("boxes")
                        .required(true)
                        .num_args(1..)
                        .value_parser(|s: &str| s.parse::<ContainerId>())
                        .help("Box ids"),
                ),
        )
        .subcommand(
            Command::new("tree")
                .about("Show a run's packing tree")
                .arg(run_arg()),
        )
        .subcommand(cmd_line())
        .subcommand(cmd_gtin())
        .subcommand(cmd_sscc())
}

fn run_arg() -> Arg {
    Arg::new("run")
        .required(true)
        .value_name("RUN_ID")
        .value_parser(|s: &str| s.parse::<RunId>())
}

fn unit_arg() -> Arg {
    Arg::new("unit")
        .required(true)
        .value_name("UNIT_ID")
        .value_parser(|s: &str| s.parse::<UnitId>())
}

fn cmd_customer() -> Command {
    Command::new("customer")
        .about("Manage customers")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Register a customer")
                .arg(Arg::new("name").long("name").required(true))
                .arg(
                    Arg::new("gln")
                        .long("gln")
                        .required(true)
                        .help("Global location number; its first 7 digits are the company prefix"),
                )
                .arg(Arg::new("note").long("note")),
        )
        .subcommand(Command::new("list").about("List customers"))
}

fn cmd_product() -> Command {
    Command::new("product")
        .about("Manage products")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Register a product")
                .arg(
                    Arg::new("customer")
                        .long("customer")
                        .required(true)
                        .value_parser(|s: &str| s.parse::<CustomerId>()),
                )
                .arg(Arg::new("gtin").long("gtin").required(true))
                .arg(Arg::new("name").long("name").required(true)),
        )
        .subcommand(
            Command::new("list").about("List products").arg(
                Arg::new("customer")
                    .long("customer")
                    .value_parser(|s: &str| s.parse::<CustomerId>()),
            ),
        )
}

fn cmd_run() -> Command {
    Command::new("run")
        .about("Manage production runs")
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Create a run and serialize its units")
                .arg(
                    Arg::new("product")
                        .long("product")
                        .required(true)
                        .value_parser(|s: &str| s.parse::<ProductId>()),
                )
                .arg(
                    Arg::new("quantity")
                        .long("quantity")
                        .required(true)
                        .value_parser(value_parser!(u32)),
                )
                .arg(Arg::new("lot").long("lot").required(true))
                .arg(
                    Arg::new("expiry")
                        .long("expiry")
                        .required(true)
                        .value_name("YYYY-MM-DD")
                        .value_parser(|s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d")),
                )
                .arg(
                    Arg::new("start")
                        .long("start")
                        .value_parser(value_parser!(u64))
                        .help("First sequence number (default 1)"),
                )
                .arg(
                    Arg::new("box-capacity")
                        .long("box-capacity")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("pallet-capacity")
                        .long("pallet-capacity")
                        .value_parser(value_parser!(u32)),
                ),
        )
        .subcommand(Command::new("list").about("List runs, newest first"))
        .subcommand(
            Command::new("show")
                .about("Show a run with units and packing tree")
                .arg(run_arg())
                .arg(
                    Arg::new("summary")
                        .long("summary")
                        .action(ArgAction::SetTrue)
                        .help("Omit the unit list"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Set a run's status")
                .arg(run_arg())
                .arg(
                    Arg::new("status")
                        .required(true)
                        .value_parser(|s: &str| s.parse::<RunStatus>()),
                ),
        )
        .subcommand(
            Command::new("progress")
                .about("Count a run's units by status")
                .arg(run_arg()),
        )
        .subcommand(
            Command::new("reset")
                .about("Drop a run's packing and return its units to generated")
                .arg(run_arg()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a run with its units and containers")
                .arg(run_arg()),
        )
}

fn cmd_line() -> Command {
    Command::new("line")
        .about("Production line control")
        .subcommand_required(true)
        .subcommand(Command::new("start").about("Start the line").arg(run_arg()))
        .subcommand(Command::new("stop").about("Stop the line").arg(run_arg()))
        .subcommand(Command::new("status").about("Line status").arg(run_arg()))
        .subcommand(
            Command::new("pallet-complete")
                .about("Signal that a pallet is complete")
                .arg(
                    Arg::new("pallet")
                        .required(true)
                        .value_parser(|s: &str| s.parse::<ContainerId>()),
                ),
        )
}

fn cmd_gtin() -> Command {
    Command::new("gtin")
        .about("Product identifier utilities")
        .subcommand_required(true)
        .subcommand(
            Command::new("check")
                .about("Compute the check digit for an identifier body")
                .arg(Arg::new("body").required(true)),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a full identifier")
                .arg(Arg::new("gtin").required(true)),
        )
}

fn cmd_sscc() -> Command {
    Command::new("sscc")
        .about("Shipping container identifier utilities")
        .subcommand_required(true)
        .subcommand(
            Command::new("validate")
                .about("Validate an 18-digit container code")
                .arg(Arg::new("code").required(true)),
        )
}
