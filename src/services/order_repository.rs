//! Order persistence
//!
//! `OrderRepository` is the seam between the order service and storage. The
//! SeaORM implementation backs the running service; the in-memory one backs
//! tests and local experiments.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};

use crate::entities::{orders, prelude::*};
use crate::error::{OrderError, Result};
use crate::models::order::{Order, OrderUpdate};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Fails with `DuplicateKey` when the order id is taken.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Applies a partial update. Returns whether a record matched; a miss is not an error.
    async fn update_fields(&self, order_id: &str, update: &OrderUpdate) -> Result<bool>;

    async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>>;

    /// Every order keyed by id.
    async fn list_all(&self) -> Result<BTreeMap<String, Order>>;

    /// False when running without a storage connection.
    fn is_available(&self) -> bool;
}

/// SeaORM-backed repository. Without a connection every operation fails with
/// `StorageUnavailable` so the service can keep serving in degraded mode.
#[derive(Clone)]
pub struct SeaOrmOrderRepository {
    db: Option<DatabaseConnection>,
}

impl SeaOrmOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db: Some(db) }
    }

    pub fn degraded() -> Self {
        Self { db: None }
    }

    fn conn(&self) -> Result<&DatabaseConnection> {
        self.db.as_ref().ok_or(OrderError::StorageUnavailable)
    }
}

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    async fn insert(&self, order: &Order) -> Result<()> {
        let db = self.conn()?;

        // Checked up front so SQLite and PostgreSQL report duplicates the same way
        if Orders::find_by_id(order.order_id.clone()).one(db).await?.is_some() {
            return Err(OrderError::DuplicateKey(order.order_id.clone()));
        }

        let new_order = orders::ActiveModel {
            order_id: Set(order.order_id.clone()),
            email: Set(order.email.clone()),
            udid: Set(order.udid.clone()),
            timestamp: Set(order.timestamp.clone()),
            status: Set(order.status.to_string()),
            download_link: Set(order.download_link.clone()),
            receipt_url: Set(order.receipt_url.clone()),
        };

        new_order.insert(db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => OrderError::DuplicateKey(order.order_id.clone()),
            _ => OrderError::from(e),
        })?;

        tracing::debug!(order_id = %order.order_id, "Inserted order");
        Ok(())
    }

    async fn update_fields(&self, order_id: &str, update: &OrderUpdate) -> Result<bool> {
        let db = self.conn()?;

        if update.is_empty() {
            return Ok(self.find_by_id(order_id).await?.is_some());
        }

        let mut query = Orders::update_many().filter(orders::Column::OrderId.eq(order_id));
        if let Some(link) = &update.download_link {
            query = query.col_expr(orders::Column::DownloadLink, Expr::value(link.clone()));
        }
        if let Some(status) = update.status {
            query = query.col_expr(orders::Column::Status, Expr::value(status.as_str()));
        }

        let result = query.exec(db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>> {
        let db = self.conn()?;
        Orders::find_by_id(order_id.to_string())
            .one(db)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list_all(&self) -> Result<BTreeMap<String, Order>> {
        let db = self.conn()?;
        let rows = Orders::find()
            .order_by_asc(orders::Column::OrderId)
            .all(db)
            .await?;

        rows.into_iter()
            .map(|row| Order::try_from(row).map(|order| (order.order_id.clone(), order)))
            .collect()
    }

    fn is_available(&self) -> bool {
        self.db.is_some()
    }
}

/// Map-backed repository with the same semantics as the database one.
pub struct InMemoryOrderRepository {
    orders: RwLock<BTreeMap<String, Order>>,
    available: bool,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(BTreeMap::new()),
            available: true,
        }
    }

    /// A repository that behaves like a lost database connection.
    pub fn unavailable() -> Self {
        Self {
            orders: RwLock::new(BTreeMap::new()),
            available: false,
        }
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(OrderError::StorageUnavailable)
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<()> {
        self.check()?;
        let mut orders = self.orders.write();
        if orders.contains_key(&order.order_id) {
            return Err(OrderError::DuplicateKey(order.order_id.clone()));
        }
        orders.insert(order.order_id.clone(), order.clone());
        Ok(())
    }

    async fn update_fields(&self, order_id: &str, update: &OrderUpdate) -> Result<bool> {
        self.check()?;
        match self.orders.write().get_mut(order_id) {
            Some(order) => {
                update.apply_to(order);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>> {
        self.check()?;
        Ok(self.orders.read().get(order_id).cloned())
    }

    async fn list_all(&self) -> Result<BTreeMap<String, Order>> {
        self.check()?;
        Ok(self.orders.read().clone())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
