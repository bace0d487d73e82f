//! Customers and products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CustomerId, ProductId};
use crate::{gs1, Error, Result};

const COMPANY_PREFIX_LEN: usize = 7;
const GLN_MAX_LEN: usize = 13;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Global location number; its leading digits form the company prefix.
    pub gln: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Company prefix embedded in every shipping identifier minted for this
    /// customer's runs.
    pub fn company_prefix(&self) -> &str {
        self.gln.get(..COMPANY_PREFIX_LEN).unwrap_or(&self.gln)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub gln: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewCustomer {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("customer name cannot be empty"));
        }
        let len = self.gln.len();
        if !(COMPANY_PREFIX_LEN..=GLN_MAX_LEN).contains(&len)
            || !self.gln.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::validation(format!(
                "GLN must be {COMPANY_PREFIX_LEN} to {GLN_MAX_LEN} digits: {}",
                self.gln
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub customer_id: CustomerId,
    pub gtin: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub customer_id: CustomerId,
    pub gtin: String,
    pub name: String,
}

impl NewProduct {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("product name cannot be empty"));
        }
        if !gs1::validate_gtin(&self.gtin) {
            return Err(Error::validation(format!("invalid GTIN: {}", self.gtin)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_prefix_is_first_seven_digits() {
        let customer = Customer {
            id: CustomerId::new(),
            name: "Acme".into(),
            gln: "8690123456789".into(),
            note: None,
            created_at: Utc::now(),
        };
        assert_eq!(customer.company_prefix(), "8690123");
    }

    #[test]
    fn test_new_customer_gln_rules() {
        let mut c = NewCustomer {
            name: "Acme".into(),
            gln: "8690123".into(),
            note: None,
        };
        assert!(c.validate().is_ok());
        c.gln = "869012".into();
        assert!(c.validate().is_err());
        c.gln = "86901234567890".into();
        assert!(c.validate().is_err());
        c.gln = "86901a3".into();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_new_product_requires_valid_gtin() {
        let mut p = NewProduct {
            customer_id: CustomerId::new(),
            gtin: "123456789014".into(),
            name: "Tablets".into(),
        };
        assert!(p.validate().is_ok());
        p.gtin = "123456789015".into();
        assert!(matches!(p.validate(), Err(Error::Validation(_))));
    }
}
