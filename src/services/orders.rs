use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tracing::info;

use crate::{
    db::{Repository, Store},
    models::{CartItemEntity, CreateOrderEntity, OrderDetails, max_amount},
    services::{ServiceError, cart},
};

#[async_trait]
pub trait OrderWorkflow: Send + Sync {
    /// Checks out the user's cart into a new order.
    async fn place_order(&self, user_id: i64) -> Result<OrderDetails, ServiceError>;

    /// The user's orders, newest first.
    async fn list_orders(&self, user_id: i64) -> Result<Vec<OrderDetails>, ServiceError>;
}

pub struct OrderService<S> {
    store: Arc<S>,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

/// Checkout sequence. Callers run it inside one transaction so the new order, the moved
/// items and the emptied cart become visible together or not at all.
pub async fn checkout<R: Repository>(
    repo: &mut R,
    user_id: i64,
) -> Result<OrderDetails, ServiceError> {
    let lines = cart::cart_lines(repo, user_id).await?;
    if lines.is_empty() {
        return Err(ServiceError::InvalidState("Cart is empty".into()));
    }

    let total_amount = cart::lines_total(&lines);
    if total_amount > max_amount() {
        return Err(ServiceError::InvalidState(format!(
            "Order total {total_amount} exceeds the maximum of {}",
            max_amount()
        )));
    }
    let order = repo
        .insert_order(CreateOrderEntity {
            user_id,
            total_amount,
        })
        .await?;

    let snapshot = lines
        .into_iter()
        .map(|line| (line.item.id, line.unit_price))
        .collect();
    let items = repo.assign_cart_items(order.id, snapshot).await?;

    cart::clear(repo, user_id).await?;

    Ok(OrderDetails { order, items })
}

async fn orders_with_items<R: Repository>(
    repo: &mut R,
    user_id: i64,
) -> Result<Vec<OrderDetails>, ServiceError> {
    let orders = repo.list_orders(user_id).await?;
    let order_ids: Vec<i64> = orders.iter().map(|order| order.id).collect();
    let items = repo.list_order_items(&order_ids).await?;

    let mut group: HashMap<i64, Vec<CartItemEntity>> = HashMap::new();
    for item in items {
        if let Some(order_id) = item.order_id {
            group.entry(order_id).or_default().push(item);
        }
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = group.remove(&order.id).unwrap_or_default();
            OrderDetails { order, items }
        })
        .collect())
}

#[async_trait]
impl<S: Store> OrderWorkflow for OrderService<S> {
    async fn place_order(&self, user_id: i64) -> Result<OrderDetails, ServiceError> {
        let placed = self
            .store
            .transaction(move |conn| Box::pin(checkout(conn, user_id)))
            .await?;

        info!(
            "Order #{} placed for user #{} ({} item(s), total {})",
            placed.order.id,
            user_id,
            placed.items.len(),
            placed.order.total_amount
        );
        Ok(placed)
    }

    async fn list_orders(&self, user_id: i64) -> Result<Vec<OrderDetails>, ServiceError> {
        self.store
            .run(move |conn| Box::pin(orders_with_items(conn, user_id)))
            .await
    }
}
