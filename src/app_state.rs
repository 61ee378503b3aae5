use std::sync::Arc;

use crate::{
    db::Store,
    services::{
        auth::{AuthService, CredentialStore},
        cart::{CartManager, CartService},
        catalog::{CatalogService, ProductCatalog},
        orders::{OrderService, OrderWorkflow},
    },
};

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<dyn CredentialStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub cart: Arc<dyn CartManager>,
    pub orders: Arc<dyn OrderWorkflow>,
}

impl AppState {
    /// Wires all services onto one store.
    pub fn new<S: Store>(store: Arc<S>) -> Self {
        Self {
            credentials: Arc::new(AuthService::new(store.clone())),
            catalog: Arc::new(CatalogService::new(store.clone())),
            cart: Arc::new(CartService::new(store.clone())),
            orders: Arc::new(OrderService::new(store)),
        }
    }
}
