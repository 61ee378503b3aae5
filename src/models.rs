use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Money

/// Largest amount a `NUMERIC(12,2)` column holds.
pub fn max_amount() -> BigDecimal {
    BigDecimal::new(999_999_999_999_i64.into(), 2)
}

/// Rounds to cents, half away from zero, the way PostgreSQL stores `NUMERIC(12,2)`.
pub fn round_amount(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

// Users

/// Stored account. Not `Serialize`; handlers answer with `routes::auth::UserRes`.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct CreateUserEntity {
    pub email: String,
    pub password_hash: String,
}

// Products

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ProductEntity {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    #[schema(value_type = String, example = "10.00")]
    pub price: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of product create/replace requests. Replacement clears optional fields left out.
#[derive(Insertable, AsChangeset, Deserialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductEntity {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[schema(value_type = String, example = "10.00")]
    pub price: BigDecimal,
}

// Cart items

/// A line item. `order_id` is `None` while the item sits in its owner's cart;
/// `unit_price` is stamped when the item is checked out into an order.
#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct CartItemEntity {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub order_id: Option<i64>,
    pub quantity: i32,
    #[schema(value_type = Option<String>, example = "10.00")]
    pub unit_price: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::cart_items)]
pub struct CreateCartItemEntity {
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i32,
}

/// A cart item together with the current catalog price of its product.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item: CartItemEntity,
    pub unit_price: BigDecimal,
}

impl CartLine {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.item.quantity)
    }
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct OrderEntity {
    pub id: i64,
    pub user_id: i64,
    #[schema(value_type = String, example = "25.00")]
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub user_id: i64,
    pub total_amount: BigDecimal,
}

/// An order with the line items it owns.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct OrderDetails {
    pub order: OrderEntity,
    pub items: Vec<CartItemEntity>,
}
