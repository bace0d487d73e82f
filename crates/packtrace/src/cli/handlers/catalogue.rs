//! Customer and product handlers

use anyhow::Result;
use clap::ArgMatches;
use packtrace_core::{
    domain::{CustomerId, NewCustomer, NewProduct},
    Services,
};

use super::{required, unknown};
use crate::output::print_json;

pub async fn handle_customer(services: &Services, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("add", sub_m)) => {
            let customer = services
                .catalogue
                .create_customer(NewCustomer {
                    name: required(sub_m, "name")?,
                    gln: required(sub_m, "gln")?,
                    note: sub_m.get_one::<String>("note").cloned(),
                })
                .await?;
            print_json(&customer)
        }
        Some(("list", _)) => print_json(&services.catalogue.list_customers().await?),
        Some((name, _)) => Err(unknown("customer", name)),
        None => Err(unknown("customer", "")),
    }
}

pub async fn handle_product(services: &Services, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("add", sub_m)) => {
            let product = services
                .catalogue
                .create_product(NewProduct {
                    customer_id: required(sub_m, "customer")?,
                    gtin: required(sub_m, "gtin")?,
                    name: required(sub_m, "name")?,
                })
                .await?;
            print_json(&product)
        }
        Some(("list", sub_m)) => {
            let customer = sub_m.get_one::<CustomerId>("customer").copied();
            print_json(&services.catalogue.list_products(customer).await?)
        }
        Some((name, _)) => Err(unknown("product", name)),
        None => Err(unknown("product", "")),
    }
}
