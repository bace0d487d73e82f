//! Customer and product registry.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::{
    domain::{Customer, CustomerId, NewCustomer, NewProduct, Product, ProductId},
    store::TrackStore,
    Result,
};

pub struct CatalogueService {
    store: Arc<dyn TrackStore>,
}

impl CatalogueService {
    pub fn new(store: Arc<dyn TrackStore>) -> Self {
        Self { store }
    }

    pub async fn create_customer(&self, new: NewCustomer) -> Result<Customer> {
        new.validate()?;
        let customer = Customer {
            id: CustomerId::new(),
            name: new.name.trim().to_string(),
            gln: new.gln,
            note: new.note,
            created_at: Utc::now(),
        };
        self.store.insert_customer(&customer).await?;
        info!(customer_id = %customer.id, name = %customer.name, "Customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer> {
        self.store.get_customer(id).await
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        self.store.list_customers().await
    }

    /// Registers a product under an existing customer. The GTIN must carry a
    /// valid check digit.
    pub async fn create_product(&self, new: NewProduct) -> Result<Product> {
        new.validate()?;
        self.store.get_customer(new.customer_id).await?;
        let product = Product {
            id: ProductId::new(),
            customer_id: new.customer_id,
            gtin: new.gtin,
            name: new.name.trim().to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_product(&product).await?;
        info!(product_id = %product.id, gtin = %product.gtin, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store.get_product(id).await
    }

    pub async fn list_products(&self, customer_id: Option<CustomerId>) -> Result<Vec<Product>> {
        self.store.list_products(customer_id).await
    }
}
