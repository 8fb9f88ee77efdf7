//! Request validation
//!
//! Only presence is checked today. `udid` and `link` are opaque and stored as
//! given; tighter rules belong here rather than in the order service.

use crate::error::{OrderError, Result};
use crate::models::order::{ReceiptUpload, SendLinkRequest, SubmitOrderForm};

pub const MISSING_DATA: &str = "Missing data";

/// A submit-order form with every required part present.
#[derive(Debug, Clone)]
pub struct ValidSubmission {
    pub email: String,
    pub udid: String,
    pub receipt: ReceiptUpload,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn validate_submission(form: SubmitOrderForm) -> Result<ValidSubmission> {
    let email = present(form.email);
    let udid = present(form.udid);
    // A file part without a name is what browsers send when nothing was picked
    let receipt = form.receipt.filter(|r| !r.file_name.is_empty());

    match (email, udid, receipt) {
        (Some(email), Some(udid), Some(receipt)) => Ok(ValidSubmission { email, udid, receipt }),
        _ => Err(OrderError::Validation(MISSING_DATA.to_string())),
    }
}

pub fn validate_order_id(order_id: Option<String>) -> Result<String> {
    present(order_id).ok_or_else(|| OrderError::Validation("Missing order_id".to_string()))
}

/// Returns `(order_id, link)`.
pub fn validate_link_request(request: SendLinkRequest) -> Result<(String, String)> {
    match (present(request.order_id), present(request.link)) {
        (Some(order_id), Some(link)) => Ok((order_id, link)),
        _ => Err(OrderError::Validation("Missing order_id or link".to_string())),
    }
}
