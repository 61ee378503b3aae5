use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use tracing::info;

use crate::{
    db::{Repository, Store},
    models::{CreateProductEntity, ProductEntity, max_amount, round_amount},
    services::ServiceError,
};

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn list_products(
        &self,
        category: Option<String>,
    ) -> Result<Vec<ProductEntity>, ServiceError>;

    async fn get_product(&self, product_id: i64) -> Result<ProductEntity, ServiceError>;

    async fn create_product(
        &self,
        product: CreateProductEntity,
    ) -> Result<ProductEntity, ServiceError>;

    /// Replaces every field of an existing product.
    async fn update_product(
        &self,
        product_id: i64,
        product: CreateProductEntity,
    ) -> Result<ProductEntity, ServiceError>;

    async fn delete_product(&self, product_id: i64) -> Result<(), ServiceError>;
}

pub struct CatalogService<S> {
    store: Arc<S>,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

/// Checks the input and rounds its price to cents.
fn validate(mut product: CreateProductEntity) -> Result<CreateProductEntity, ServiceError> {
    if product.name.trim().is_empty() {
        return Err(ServiceError::Validation("Product name must not be empty".into()));
    }
    if product.price < BigDecimal::from(0) {
        return Err(ServiceError::Validation("Price must not be negative".into()));
    }

    product.price = round_amount(&product.price);
    if product.price > max_amount() {
        return Err(ServiceError::Validation(format!(
            "Price must not exceed {}",
            max_amount()
        )));
    }
    Ok(product)
}

#[async_trait]
impl<S: Store> ProductCatalog for CatalogService<S> {
    async fn list_products(
        &self,
        category: Option<String>,
    ) -> Result<Vec<ProductEntity>, ServiceError> {
        self.store
            .run(move |conn| {
                Box::pin(async move { Ok(conn.list_products(category.as_deref()).await?) })
            })
            .await
    }

    async fn get_product(&self, product_id: i64) -> Result<ProductEntity, ServiceError> {
        self.store
            .run(move |conn| Box::pin(async move { Ok(conn.find_product(product_id).await?) }))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product #{product_id}")))
    }

    async fn create_product(
        &self,
        product: CreateProductEntity,
    ) -> Result<ProductEntity, ServiceError> {
        let product = validate(product)?;

        let product = self
            .store
            .run(move |conn| Box::pin(async move { Ok(conn.insert_product(product).await?) }))
            .await?;

        info!("Created product #{} ({})", product.id, product.name);
        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: i64,
        product: CreateProductEntity,
    ) -> Result<ProductEntity, ServiceError> {
        let product = validate(product)?;

        self.store
            .run(move |conn| {
                Box::pin(async move { Ok(conn.update_product(product_id, product).await?) })
            })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product #{product_id}")))
    }

    async fn delete_product(&self, product_id: i64) -> Result<(), ServiceError> {
        let deleted = self
            .store
            .run(move |conn| Box::pin(async move { Ok(conn.delete_product(product_id).await?) }))
            .await?;

        if !deleted {
            return Err(ServiceError::NotFound(format!("Product #{product_id}")));
        }
        info!("Deleted product #{}", product_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::db::MemoryStore;

    fn lamp(price: &str) -> CreateProductEntity {
        CreateProductEntity {
            name: "Desk lamp".into(),
            description: Some("Warm light".into()),
            category: Some("home".into()),
            image_url: None,
            price: BigDecimal::from_str(price).unwrap(),
        }
    }

    fn service() -> CatalogService<MemoryStore> {
        CatalogService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_then_read_back() {
        let catalog = service();

        let created = catalog.create_product(lamp("19.99")).await.unwrap();
        let fetched = catalog.get_product(created.id).await.unwrap();

        assert_eq!(fetched.name, "Desk lamp");
        assert_eq!(fetched.price.to_string(), "19.99");
        assert_eq!(catalog.list_products(None).await.unwrap().len(), 1);
        assert_eq!(
            catalog
                .list_products(Some("home".into()))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn rejects_negative_price_and_blank_name() {
        let catalog = service();

        let err = catalog.create_product(lamp("-1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let mut blank = lamp("1");
        blank.name = "  ".into();
        let err = catalog.create_product(blank).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let catalog = service();
        let created = catalog.create_product(lamp("19.99")).await.unwrap();

        let mut replacement = lamp("24.00");
        replacement.description = None;
        let updated = catalog
            .update_product(created.id, replacement)
            .await
            .unwrap();

        assert_eq!(updated.price, BigDecimal::from(24));
        assert_eq!(updated.description, None);
    }

    #[tokio::test]
    async fn missing_products_are_not_found() {
        let catalog = service();

        assert!(matches!(
            catalog.get_product(7).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            catalog.update_product(7, lamp("1")).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            catalog.delete_product(7).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_removes_unreferenced_product() {
        let catalog = service();
        let created = catalog.create_product(lamp("3")).await.unwrap();

        catalog.delete_product(created.id).await.unwrap();

        assert!(catalog.list_products(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prices_are_rounded_to_cents() {
        let catalog = service();

        for (input, stored) in [("10.1", "10.10"), ("10.005", "10.01"), ("0.289", "0.29")] {
            let created = catalog.create_product(lamp(input)).await.unwrap();
            assert_eq!(created.price.to_string(), stored);
        }
    }

    #[tokio::test]
    async fn rejects_prices_beyond_column_range() {
        let catalog = service();

        catalog.create_product(lamp("9999999999.99")).await.unwrap();
        let err = catalog
            .create_product(lamp("99999999999999999999.99"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
