use anyhow::Context;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use diesel::{
    ExpressionMethods, NullableExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::{
    AsyncPgConnection, RunQueryDsl,
    pooled_connection::{AsyncDieselConnectionManager, bb8::Pool},
    scoped_futures::ScopedFutureExt,
};
use futures::future::BoxFuture;

use crate::{
    db::{Repository, RepositoryError, RepositoryResult, Store},
    models::{
        CartItemEntity, CartLine, CreateCartItemEntity, CreateOrderEntity, CreateProductEntity,
        CreateUserEntity, OrderEntity, ProductEntity, UserEntity,
    },
    schema::{cart_items, orders, products, users},
    services::ServiceError,
};

pub type DbPool = Pool<AsyncPgConnection>;

/// Builds the bb8 pool of async PostgreSQL connections.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_connections)
        .build(manager)
        .await
        .context("Failed to build the DB connection pool")
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl Store for PgStore {
    type Conn = AsyncPgConnection;

    async fn run<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Self::Conn) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    {
        let mut conn = self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        f(&mut *conn).await
    }

    async fn transaction<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Self::Conn) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    {
        let mut conn = self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        conn.build_transaction()
            .serializable()
            .run(move |conn| async move { f(conn).await }.scope_boxed())
            .await
    }
}

#[async_trait]
impl Repository for AsyncPgConnection {
    async fn insert_user(&mut self, user: CreateUserEntity) -> RepositoryResult<UserEntity> {
        diesel::insert_into(users::table)
            .values(user)
            .returning(UserEntity::as_returning())
            .get_result(self)
            .await
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    RepositoryError::Conflict("Email already exists".into())
                }
                err => anyhow::Error::new(err)
                    .context("Failed to create user")
                    .into(),
            })
    }

    async fn find_user(&mut self, id: i64) -> RepositoryResult<Option<UserEntity>> {
        let user = users::table
            .find(id)
            .select(UserEntity::as_select())
            .get_result(self)
            .await
            .optional()
            .context("Failed to get user")?;

        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> RepositoryResult<Option<UserEntity>> {
        let user = users::table
            .filter(users::email.eq(email))
            .select(UserEntity::as_select())
            .get_result(self)
            .await
            .optional()
            .context("Failed to get user by email")?;

        Ok(user)
    }

    async fn list_products(
        &mut self,
        category: Option<&str>,
    ) -> RepositoryResult<Vec<ProductEntity>> {
        let mut query = products::table.order_by(products::id.asc()).into_boxed();
        if let Some(category) = category {
            query = query.filter(products::category.eq(category));
        }

        let products = query
            .select(ProductEntity::as_select())
            .load(self)
            .await
            .context("Failed to get products")?;

        Ok(products)
    }

    async fn find_product(&mut self, id: i64) -> RepositoryResult<Option<ProductEntity>> {
        let product = products::table
            .find(id)
            .select(ProductEntity::as_select())
            .get_result(self)
            .await
            .optional()
            .context("Failed to get product")?;

        Ok(product)
    }

    async fn insert_product(
        &mut self,
        product: CreateProductEntity,
    ) -> RepositoryResult<ProductEntity> {
        let product = diesel::insert_into(products::table)
            .values(product)
            .returning(ProductEntity::as_returning())
            .get_result(self)
            .await
            .context("Failed to create product")?;

        Ok(product)
    }

    async fn update_product(
        &mut self,
        id: i64,
        product: CreateProductEntity,
    ) -> RepositoryResult<Option<ProductEntity>> {
        let product = diesel::update(products::table.find(id))
            .set((&product, products::updated_at.eq(diesel::dsl::now)))
            .returning(ProductEntity::as_returning())
            .get_result(self)
            .await
            .optional()
            .context("Failed to update product")?;

        Ok(product)
    }

    async fn delete_product(&mut self, id: i64) -> RepositoryResult<bool> {
        match diesel::delete(products::table.find(id)).execute(self).await {
            Ok(deleted) => Ok(deleted > 0),
            Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => Err(
                RepositoryError::Conflict("Product is referenced by cart or order items".into()),
            ),
            Err(err) => Err(anyhow::Error::new(err)
                .context("Failed to delete product")
                .into()),
        }
    }

    async fn list_cart_lines(&mut self, user_id: i64) -> RepositoryResult<Vec<CartLine>> {
        let rows: Vec<(CartItemEntity, BigDecimal)> = cart_items::table
            .inner_join(products::table)
            .filter(cart_items::user_id.eq(user_id))
            .filter(cart_items::order_id.is_null())
            .order_by(cart_items::id.asc())
            .select((CartItemEntity::as_select(), products::price))
            .load(self)
            .await
            .context("Failed to get cart items")?;

        Ok(rows
            .into_iter()
            .map(|(item, unit_price)| CartLine { item, unit_price })
            .collect())
    }

    async fn insert_cart_item(
        &mut self,
        item: CreateCartItemEntity,
    ) -> RepositoryResult<CartItemEntity> {
        let item = diesel::insert_into(cart_items::table)
            .values(item)
            .returning(CartItemEntity::as_returning())
            .get_result(self)
            .await
            .context("Failed to create cart item")?;

        Ok(item)
    }

    async fn delete_cart_item(&mut self, id: i64) -> RepositoryResult<usize> {
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::id.eq(id))
                .filter(cart_items::order_id.is_null()),
        )
        .execute(self)
        .await
        .context("Failed to delete cart item")?;

        Ok(deleted)
    }

    async fn delete_cart_items_for_user(&mut self, user_id: i64) -> RepositoryResult<usize> {
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::user_id.eq(user_id))
                .filter(cart_items::order_id.is_null()),
        )
        .execute(self)
        .await
        .context("Failed to clear cart")?;

        Ok(deleted)
    }

    async fn insert_order(&mut self, order: CreateOrderEntity) -> RepositoryResult<OrderEntity> {
        let order = diesel::insert_into(orders::table)
            .values(order)
            .returning(OrderEntity::as_returning())
            .get_result(self)
            .await
            .context("Failed to create order")?;

        Ok(order)
    }

    async fn assign_cart_items(
        &mut self,
        order_id: i64,
        items: Vec<(i64, BigDecimal)>,
    ) -> RepositoryResult<Vec<CartItemEntity>> {
        let mut assigned = Vec::with_capacity(items.len());
        for (id, unit_price) in items {
            let item = diesel::update(cart_items::table.find(id))
                .set((
                    cart_items::order_id.eq(order_id),
                    cart_items::unit_price.eq(unit_price),
                ))
                .returning(CartItemEntity::as_returning())
                .get_result(self)
                .await
                .context("Failed to move cart item into order")?;
            assigned.push(item);
        }

        Ok(assigned)
    }

    async fn list_orders(&mut self, user_id: i64) -> RepositoryResult<Vec<OrderEntity>> {
        let orders = orders::table
            .filter(orders::user_id.eq(user_id))
            .order_by((orders::created_at.desc(), orders::id.desc()))
            .select(OrderEntity::as_select())
            .load(self)
            .await
            .context("Failed to get orders")?;

        Ok(orders)
    }

    async fn list_order_items(
        &mut self,
        order_ids: &[i64],
    ) -> RepositoryResult<Vec<CartItemEntity>> {
        let items = cart_items::table
            .filter(cart_items::order_id.assume_not_null().eq_any(order_ids))
            .order_by(cart_items::id.asc())
            .select(CartItemEntity::as_select())
            .load(self)
            .await
            .context("Failed to get order items")?;

        Ok(items)
    }
}
