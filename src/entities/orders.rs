//! `SeaORM` Entity for orders table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Short public order id (8 uppercase hex chars)
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: String,
    pub email: String,
    pub udid: String,
    /// Creation time, `%Y-%m-%d %H:%M:%S` UTC
    pub timestamp: String,
    /// "pending" or "completed"
    pub status: String,
    pub download_link: String,
    pub receipt_url: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
