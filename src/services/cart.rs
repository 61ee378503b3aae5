use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use tracing::{debug, info};

use crate::{
    db::{Repository, Store},
    models::{CartItemEntity, CartLine, CreateCartItemEntity, round_amount},
    services::ServiceError,
};

#[async_trait]
pub trait CartManager: Send + Sync {
    async fn list_items(&self, user_id: i64) -> Result<Vec<CartItemEntity>, ServiceError>;

    /// Adds a new line. Repeated calls for the same product create separate lines.
    async fn add_item(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<CartItemEntity, ServiceError>;

    /// Removing an id that is not in any cart succeeds without doing anything.
    async fn remove_item(&self, cart_item_id: i64) -> Result<(), ServiceError>;

    async fn clear_cart(&self, user_id: i64) -> Result<(), ServiceError>;

    async fn cart_total(&self, user_id: i64) -> Result<BigDecimal, ServiceError>;
}

pub struct CartService<S> {
    store: Arc<S>,
}

impl<S: Store> CartService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

/// The user's cart lines with their current unit prices.
pub async fn cart_lines<R: Repository>(
    repo: &mut R,
    user_id: i64,
) -> Result<Vec<CartLine>, ServiceError> {
    Ok(repo.list_cart_lines(user_id).await?)
}

pub fn lines_total(lines: &[CartLine]) -> BigDecimal {
    let total = lines
        .iter()
        .map(CartLine::line_total)
        .fold(BigDecimal::from(0), |total, line| total + line);
    round_amount(&total)
}

pub async fn clear<R: Repository>(repo: &mut R, user_id: i64) -> Result<usize, ServiceError> {
    Ok(repo.delete_cart_items_for_user(user_id).await?)
}

async fn insert_item<R: Repository>(
    repo: &mut R,
    user_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<CartItemEntity, ServiceError> {
    if repo.find_user(user_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("User #{user_id}")));
    }
    if repo.find_product(product_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("Product #{product_id}")));
    }

    Ok(repo
        .insert_cart_item(CreateCartItemEntity {
            user_id,
            product_id,
            quantity,
        })
        .await?)
}

#[async_trait]
impl<S: Store> CartManager for CartService<S> {
    async fn list_items(&self, user_id: i64) -> Result<Vec<CartItemEntity>, ServiceError> {
        let lines = self
            .store
            .run(move |conn| Box::pin(cart_lines(conn, user_id)))
            .await?;

        Ok(lines.into_iter().map(|line| line.item).collect())
    }

    async fn add_item(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<CartItemEntity, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::Validation(
                "Quantity must be a positive integer".into(),
            ));
        }

        let item = self
            .store
            .transaction(move |conn| Box::pin(insert_item(conn, user_id, product_id, quantity)))
            .await?;

        debug!(
            "Added product #{} x{} to cart of user #{}",
            product_id, quantity, user_id
        );
        Ok(item)
    }

    async fn remove_item(&self, cart_item_id: i64) -> Result<(), ServiceError> {
        let deleted = self
            .store
            .run(move |conn| {
                Box::pin(async move { Ok(conn.delete_cart_item(cart_item_id).await?) })
            })
            .await?;

        if deleted == 0 {
            debug!("Cart item #{} was not in any cart", cart_item_id);
        }
        Ok(())
    }

    async fn clear_cart(&self, user_id: i64) -> Result<(), ServiceError> {
        let deleted = self
            .store
            .run(move |conn| Box::pin(clear(conn, user_id)))
            .await?;

        info!("Cleared {} item(s) from cart of user #{}", deleted, user_id);
        Ok(())
    }

    async fn cart_total(&self, user_id: i64) -> Result<BigDecimal, ServiceError> {
        let lines = self
            .store
            .run(move |conn| Box::pin(cart_lines(conn, user_id)))
            .await?;

        Ok(lines_total(&lines))
    }
}
