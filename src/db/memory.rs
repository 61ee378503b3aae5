use std::{
    collections::BTreeMap,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    db::{Repository, RepositoryError, RepositoryResult, Store},
    models::{
        CartItemEntity, CartLine, CreateCartItemEntity, CreateOrderEntity, CreateProductEntity,
        CreateUserEntity, OrderEntity, ProductEntity, UserEntity, round_amount,
    },
    services::ServiceError,
};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    users: BTreeMap<i64, UserEntity>,
    products: BTreeMap<i64, ProductEntity>,
    cart_items: BTreeMap<i64, CartItemEntity>,
    orders: BTreeMap<i64, OrderEntity>,
    last_user_id: i64,
    last_product_id: i64,
    last_cart_item_id: i64,
    last_order_id: i64,
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

/// Process-local store. Calls are serialized by one lock. Plain runs write straight into the
/// shared state; a transaction works on a private copy that replaces the state only on `Ok`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug)]
enum ConnState {
    Live(OwnedMutexGuard<MemoryState>),
    Staged(MemoryState),
}

impl Deref for ConnState {
    type Target = MemoryState;

    fn deref(&self) -> &MemoryState {
        match self {
            ConnState::Live(guard) => &**guard,
            ConnState::Staged(state) => state,
        }
    }
}

impl DerefMut for ConnState {
    fn deref_mut(&mut self) -> &mut MemoryState {
        match self {
            ConnState::Live(guard) => &mut **guard,
            ConnState::Staged(state) => state,
        }
    }
}

#[derive(Debug)]
pub struct MemoryConn {
    state: ConnState,
}

impl Store for MemoryStore {
    type Conn = MemoryConn;

    async fn run<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Self::Conn) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    {
        let mut conn = MemoryConn {
            state: ConnState::Live(self.state.clone().lock_owned().await),
        };
        f(&mut conn).await
    }

    async fn transaction<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Self::Conn) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    {
        let mut state = self.state.lock().await;
        let mut conn = MemoryConn {
            state: ConnState::Staged(state.clone()),
        };
        let result = f(&mut conn).await;
        if let (Ok(_), ConnState::Staged(staged)) = (&result, conn.state) {
            *state = staged;
        }
        result
    }
}

#[async_trait]
impl Repository for MemoryConn {
    async fn insert_user(&mut self, user: CreateUserEntity) -> RepositoryResult<UserEntity> {
        if self.state.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("Email already exists".into()));
        }

        let user = UserEntity {
            id: next_id(&mut self.state.last_user_id),
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        self.state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&mut self, id: i64) -> RepositoryResult<Option<UserEntity>> {
        Ok(self.state.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> RepositoryResult<Option<UserEntity>> {
        Ok(self
            .state
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_products(
        &mut self,
        category: Option<&str>,
    ) -> RepositoryResult<Vec<ProductEntity>> {
        Ok(self
            .state
            .products
            .values()
            .filter(|p| category.is_none() || p.category.as_deref() == category)
            .cloned()
            .collect())
    }

    async fn find_product(&mut self, id: i64) -> RepositoryResult<Option<ProductEntity>> {
        Ok(self.state.products.get(&id).cloned())
    }

    async fn insert_product(
        &mut self,
        product: CreateProductEntity,
    ) -> RepositoryResult<ProductEntity> {
        let now = Utc::now();
        let product = ProductEntity {
            id: next_id(&mut self.state.last_product_id),
            name: product.name,
            description: product.description,
            category: product.category,
            image_url: product.image_url,
            price: round_amount(&product.price),
            created_at: now,
            updated_at: now,
        };
        self.state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &mut self,
        id: i64,
        product: CreateProductEntity,
    ) -> RepositoryResult<Option<ProductEntity>> {
        let Some(existing) = self.state.products.get_mut(&id) else {
            return Ok(None);
        };

        existing.name = product.name;
        existing.description = product.description;
        existing.category = product.category;
        existing.image_url = product.image_url;
        existing.price = round_amount(&product.price);
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn delete_product(&mut self, id: i64) -> RepositoryResult<bool> {
        if self
            .state
            .cart_items
            .values()
            .any(|item| item.product_id == id)
        {
            return Err(RepositoryError::Conflict(
                "Product is referenced by cart or order items".into(),
            ));
        }

        Ok(self.state.products.remove(&id).is_some())
    }

    async fn list_cart_lines(&mut self, user_id: i64) -> RepositoryResult<Vec<CartLine>> {
        let lines = self
            .state
            .cart_items
            .values()
            .filter(|item| item.user_id == user_id && item.order_id.is_none())
            .filter_map(|item| {
                self.state.products.get(&item.product_id).map(|product| CartLine {
                    item: item.clone(),
                    unit_price: product.price.clone(),
                })
            })
            .collect();

        Ok(lines)
    }

    async fn insert_cart_item(
        &mut self,
        item: CreateCartItemEntity,
    ) -> RepositoryResult<CartItemEntity> {
        if !self.state.users.contains_key(&item.user_id)
            || !self.state.products.contains_key(&item.product_id)
        {
            return Err(anyhow::anyhow!("cart item references a missing user or product").into());
        }

        let item = CartItemEntity {
            id: next_id(&mut self.state.last_cart_item_id),
            user_id: item.user_id,
            product_id: item.product_id,
            order_id: None,
            quantity: item.quantity,
            unit_price: None,
            created_at: Utc::now(),
        };
        self.state.cart_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn delete_cart_item(&mut self, id: i64) -> RepositoryResult<usize> {
        let in_cart = self
            .state
            .cart_items
            .get(&id)
            .is_some_and(|item| item.order_id.is_none());
        if !in_cart {
            return Ok(0);
        }

        self.state.cart_items.remove(&id);
        Ok(1)
    }

    async fn delete_cart_items_for_user(&mut self, user_id: i64) -> RepositoryResult<usize> {
        let before = self.state.cart_items.len();
        self.state
            .cart_items
            .retain(|_, item| item.user_id != user_id || item.order_id.is_some());
        Ok(before - self.state.cart_items.len())
    }

    async fn insert_order(&mut self, order: CreateOrderEntity) -> RepositoryResult<OrderEntity> {
        if !self.state.users.contains_key(&order.user_id) {
            return Err(anyhow::anyhow!("order references a missing user").into());
        }

        let order = OrderEntity {
            id: next_id(&mut self.state.last_order_id),
            user_id: order.user_id,
            total_amount: round_amount(&order.total_amount),
            created_at: Utc::now(),
        };
        self.state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn assign_cart_items(
        &mut self,
        order_id: i64,
        items: Vec<(i64, BigDecimal)>,
    ) -> RepositoryResult<Vec<CartItemEntity>> {
        let mut assigned = Vec::with_capacity(items.len());
        for (id, unit_price) in items {
            let item = self
                .state
                .cart_items
                .get_mut(&id)
                .ok_or_else(|| anyhow::anyhow!("cart item #{id} disappeared during checkout"))?;
            item.order_id = Some(order_id);
            item.unit_price = Some(round_amount(&unit_price));
            assigned.push(item.clone());
        }

        Ok(assigned)
    }

    async fn list_orders(&mut self, user_id: i64) -> RepositoryResult<Vec<OrderEntity>> {
        Ok(self
            .state
            .orders
            .values()
            .rev()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_order_items(
        &mut self,
        order_ids: &[i64],
    ) -> RepositoryResult<Vec<CartItemEntity>> {
        Ok(self
            .state
            .cart_items
            .values()
            .filter(|item| item.order_id.is_some_and(|id| order_ids.contains(&id)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn price(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    async fn seed(store: &MemoryStore) -> (i64, i64) {
        store
            .run(|conn| {
                Box::pin(async move {
                    let user = conn
                        .insert_user(CreateUserEntity {
                            email: "ada@example.com".into(),
                            password_hash: "hash".into(),
                        })
                        .await?;
                    let product = conn
                        .insert_product(CreateProductEntity {
                            name: "Lamp".into(),
                            description: None,
                            category: Some("home".into()),
                            image_url: None,
                            price: price("12.5"),
                        })
                        .await?;
                    Ok((user.id, product.id))
                })
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn failed_transaction_discards_writes() {
        let store = MemoryStore::new();
        let (user_id, _) = seed(&store).await;

        let result: Result<(), ServiceError> = store
            .transaction(move |conn| {
                Box::pin(async move {
                    conn.insert_order(CreateOrderEntity {
                        user_id,
                        total_amount: price("1.00"),
                    })
                    .await?;
                    Err(ServiceError::InvalidState("boom".into()))
                })
            })
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidState(_))));

        let orders = store
            .run(move |conn| Box::pin(async move { Ok(conn.list_orders(user_id).await?) }))
            .await
            .unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn committed_transaction_keeps_writes() {
        let store = MemoryStore::new();
        let (user_id, _) = seed(&store).await;

        store
            .transaction(move |conn| {
                Box::pin(async move {
                    conn.insert_order(CreateOrderEntity {
                        user_id,
                        total_amount: price("3"),
                    })
                    .await?;
                    Ok(())
                })
            })
            .await
            .unwrap();

        let orders = store
            .run(move |conn| Box::pin(async move { Ok(conn.list_orders(user_id).await?) }))
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total_amount.to_string(), "3.00");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        seed(&store).await;

        let err = store
            .run(|conn| {
                Box::pin(async move {
                    Ok(conn
                        .insert_user(CreateUserEntity {
                            email: "ada@example.com".into(),
                            password_hash: "other".into(),
                        })
                        .await?)
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn referenced_product_cannot_be_deleted() {
        let store = MemoryStore::new();
        let (user_id, product_id) = seed(&store).await;

        let err = store
            .run(move |conn| {
                Box::pin(async move {
                    conn.insert_cart_item(CreateCartItemEntity {
                        user_id,
                        product_id,
                        quantity: 1,
                    })
                    .await?;
                    Ok(conn.delete_product(product_id).await?)
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn category_filter_matches_exactly() {
        let store = MemoryStore::new();
        seed(&store).await;

        let (home, garden) = store
            .run(|conn| {
                Box::pin(async move {
                    let home = conn.list_products(Some("home")).await?;
                    let garden = conn.list_products(Some("garden")).await?;
                    Ok((home, garden))
                })
            })
            .await
            .unwrap();
        assert_eq!(home.len(), 1);
        assert!(garden.is_empty());
    }

    #[tokio::test]
    async fn plain_run_writes_straight_through() {
        let store = MemoryStore::new();
        let (user_id, _) = seed(&store).await;

        let result: Result<(), ServiceError> = store
            .run(move |conn| {
                Box::pin(async move {
                    conn.insert_order(CreateOrderEntity {
                        user_id,
                        total_amount: price("2.345"),
                    })
                    .await?;
                    Err(ServiceError::InvalidState("late failure".into()))
                })
            })
            .await;
        assert!(result.is_err());

        let orders = store
            .run(move |conn| Box::pin(async move { Ok(conn.list_orders(user_id).await?) }))
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total_amount.to_string(), "2.35");
    }
}
