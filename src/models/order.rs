use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::orders;
use crate::error::OrderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(OrderError::Storage(format!("Unknown order status '{}'", other))),
        }
    }
}

/// A customer order, as stored and as returned to the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub email: String,
    pub udid: String,
    pub timestamp: String,
    pub status: OrderStatus,
    pub download_link: String,
    pub receipt_url: String,
}

impl Order {
    /// A freshly submitted order: pending, no download link.
    pub fn new_pending(order_id: String, email: String, udid: String, timestamp: String, receipt_url: String) -> Self {
        Self {
            order_id,
            email,
            udid,
            timestamp,
            status: OrderStatus::Pending,
            download_link: String::new(),
            receipt_url,
        }
    }

    /// True once an administrator has attached a non-empty link.
    pub fn is_ready_for_delivery(&self) -> bool {
        !self.download_link.is_empty()
    }
}

impl TryFrom<orders::Model> for Order {
    type Error = OrderError;

    fn try_from(model: orders::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            status: model.status.parse()?,
            order_id: model.order_id,
            email: model.email,
            udid: model.udid,
            timestamp: model.timestamp,
            download_link: model.download_link,
            receipt_url: model.receipt_url,
        })
    }
}

/// Partial update applied by the repository. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub download_link: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderUpdate {
    /// The only transition an order goes through: pending -> completed with a link.
    pub fn attach_link(link: String) -> Self {
        Self {
            download_link: Some(link),
            status: Some(OrderStatus::Completed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.download_link.is_none() && self.status.is_none()
    }

    pub fn apply_to(&self, order: &mut Order) {
        if let Some(link) = &self.download_link {
            order.download_link = link.clone();
        }
        if let Some(status) = self.status {
            order.status = status;
        }
    }
}

/// An uploaded receipt as received from the multipart form.
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Raw inputs of the submit-order form, before validation.
#[derive(Debug, Clone, Default)]
pub struct SubmitOrderForm {
    pub email: Option<String>,
    pub udid: Option<String>,
    pub receipt: Option<ReceiptUpload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderResponse {
    pub success: bool,
    pub order_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendLinkRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Failure body. `msg` is only present for client errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl FailureResponse {
    pub fn with_message(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: Some(msg.into()),
        }
    }

    pub fn generic() -> Self {
        Self {
            success: false,
            msg: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
}
