//! Persistence seams.
//!
//! [`Repository`] is the set of primitive reads and writes the services need on a single
//! connection. [`Store`] hands such a connection to a closure, either as-is or wrapped in a
//! serializable transaction. Two backends exist:
//!
//! - [`pg::PgStore`]: a bb8 pool of `diesel-async` PostgreSQL connections.
//! - [`memory::MemoryStore`]: process-local state, used by tests and database-less runs.

pub mod memory;
pub mod pg;

use std::future::Future;

use anyhow::Context;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use diesel::{Connection, pg::PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};
use futures::future::BoxFuture;
use thiserror::Error;

use crate::{
    models::{
        CartItemEntity, CartLine, CreateCartItemEntity, CreateOrderEntity, CreateProductEntity,
        CreateUserEntity, OrderEntity, ProductEntity, UserEntity,
    },
    services::ServiceError,
};

pub use memory::MemoryStore;
pub use pg::{DbPool, PgStore, create_pool};

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A uniqueness or reference constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait Repository: Send {
    // Users

    /// Fails with [`RepositoryError::Conflict`] when the email is taken.
    async fn insert_user(&mut self, user: CreateUserEntity) -> RepositoryResult<UserEntity>;
    async fn find_user(&mut self, id: i64) -> RepositoryResult<Option<UserEntity>>;
    async fn find_user_by_email(&mut self, email: &str) -> RepositoryResult<Option<UserEntity>>;

    // Products

    /// Products ordered by id, optionally restricted to one category.
    async fn list_products(&mut self, category: Option<&str>)
    -> RepositoryResult<Vec<ProductEntity>>;
    async fn find_product(&mut self, id: i64) -> RepositoryResult<Option<ProductEntity>>;
    async fn insert_product(&mut self, product: CreateProductEntity)
    -> RepositoryResult<ProductEntity>;
    async fn update_product(
        &mut self,
        id: i64,
        product: CreateProductEntity,
    ) -> RepositoryResult<Option<ProductEntity>>;
    /// Returns `false` when no such product exists. Fails with
    /// [`RepositoryError::Conflict`] while any line item references the product.
    async fn delete_product(&mut self, id: i64) -> RepositoryResult<bool>;

    // Cart items

    /// Items still in the user's cart, joined with the current product price.
    async fn list_cart_lines(&mut self, user_id: i64) -> RepositoryResult<Vec<CartLine>>;
    async fn insert_cart_item(&mut self, item: CreateCartItemEntity)
    -> RepositoryResult<CartItemEntity>;
    /// Deletes a cart item unless it already belongs to an order. Returns the rows removed.
    async fn delete_cart_item(&mut self, id: i64) -> RepositoryResult<usize>;
    /// Deletes every item in the user's cart. Ordered items are left alone.
    async fn delete_cart_items_for_user(&mut self, user_id: i64) -> RepositoryResult<usize>;

    // Orders

    async fn insert_order(&mut self, order: CreateOrderEntity) -> RepositoryResult<OrderEntity>;
    /// Moves the given cart items into `order_id`, stamping each with its unit price.
    async fn assign_cart_items(
        &mut self,
        order_id: i64,
        items: Vec<(i64, BigDecimal)>,
    ) -> RepositoryResult<Vec<CartItemEntity>>;
    /// The user's orders, newest first.
    async fn list_orders(&mut self, user_id: i64) -> RepositoryResult<Vec<OrderEntity>>;
    async fn list_order_items(&mut self, order_ids: &[i64])
    -> RepositoryResult<Vec<CartItemEntity>>;
}

/// Source of [`Repository`] connections.
pub trait Store: Send + Sync + 'static {
    type Conn: Repository;

    /// Runs `f` on a connection without an explicit transaction.
    fn run<T, F>(&self, f: F) -> impl Future<Output = Result<T, ServiceError>> + Send
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Self::Conn) -> BoxFuture<'c, Result<T, ServiceError>> + Send;

    /// Runs `f` inside a serializable transaction. Nothing `f` wrote is kept unless it
    /// returns `Ok`.
    fn transaction<T, F>(&self, f: F) -> impl Future<Output = Result<T, ServiceError>> + Send
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Self::Conn) -> BoxFuture<'c, Result<T, ServiceError>> + Send;
}

/// Applies pending migrations on a blocking thread and returns how many ran.
pub async fn run_migrations_blocking(
    migrations: EmbeddedMigrations,
    database_url: &str,
) -> anyhow::Result<usize> {
    let database_url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&database_url)
            .context("Failed to connect to the database for migrations")?;
        let applied = conn
            .run_pending_migrations(migrations)
            .map_err(|err| anyhow::anyhow!("Failed to run migrations: {err}"))?;
        Ok(applied.len())
    })
    .await
    .context("Migration task panicked")?
}
