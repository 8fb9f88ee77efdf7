//! Order lifecycle: submit, list, attach link, email link.
//!
//! ```text
//! pending --(attach link)--> completed
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{OrderError, Result};
use crate::models::order::{Order, OrderUpdate, SendLinkRequest, SubmitOrderForm};
use crate::services::mailer::MailSender;
use crate::services::order_repository::OrderRepository;
use crate::services::receipt_store::ReceiptStore;
use crate::services::telegram::Announcer;
use crate::services::validation;

pub const ORDER_ID_LEN: usize = 8;

/// Attempts at finding an unused order id before giving up.
const MAX_ORDER_ID_ATTEMPTS: usize = 3;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// First 8 hex digits of a random v4 UUID, uppercased.
pub fn generate_order_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    uuid[..ORDER_ID_LEN].to_uppercase()
}

#[derive(Clone)]
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    receipts: ReceiptStore,
    announcer: Arc<dyn Announcer>,
    mailer: Arc<dyn MailSender>,
}

impl OrderService {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        receipts: ReceiptStore,
        announcer: Arc<dyn Announcer>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            repository,
            receipts,
            announcer,
            mailer,
        }
    }

    pub fn receipts(&self) -> &ReceiptStore {
        &self.receipts
    }

    pub fn storage_available(&self) -> bool {
        self.repository.is_available()
    }

    /// Creates a pending order from a customer submission.
    ///
    /// `base_url` is the absolute origin used to link the receipt in the
    /// announcement. The receipt is written before the record; if the insert
    /// then fails the file stays behind.
    pub async fn submit_order(&self, form: SubmitOrderForm, base_url: &str) -> Result<Order> {
        let submission = validation::validate_submission(form)?;
        let order_id = self.unused_order_id().await?;

        let receipt_url = self
            .receipts
            .save(&submission.receipt.bytes, &submission.receipt.file_name, &order_id)
            .await?;

        let order = Order::new_pending(
            order_id,
            submission.email,
            submission.udid,
            Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            receipt_url,
        );

        if let Err(e) = self.repository.insert(&order).await {
            tracing::error!(
                order_id = %order.order_id,
                "Order insert failed, receipt {} left without a record: {}",
                order.receipt_url,
                e
            );
            return Err(e);
        }

        tracing::info!(order_id = %order.order_id, "New order submitted");

        let receipt_link = format!("{}{}", base_url.trim_end_matches('/'), order.receipt_url);
        self.announcer.announce(&order, &receipt_link).await;

        Ok(order)
    }

    async fn unused_order_id(&self) -> Result<String> {
        for _ in 0..MAX_ORDER_ID_ATTEMPTS {
            let candidate = generate_order_id();
            if self.repository.find_by_id(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            tracing::warn!("Generated order id {} already exists, retrying", candidate);
        }
        Err(OrderError::Storage("Could not allocate an unused order id".to_string()))
    }

    pub async fn list_orders(&self) -> Result<BTreeMap<String, Order>> {
        self.repository.list_all().await
    }

    pub async fn find_order(&self, order_id: &str) -> Result<Order> {
        self.repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order {}", order_id)))
    }

    /// Attaches the download link and completes the order.
    ///
    /// Succeeds even when no order matches; existing admin clients rely on it.
    pub async fn attach_link(&self, request: SendLinkRequest) -> Result<()> {
        let (order_id, link) = validation::validate_link_request(request)?;

        let matched = self
            .repository
            .update_fields(&order_id, &OrderUpdate::attach_link(link))
            .await?;

        if matched {
            tracing::info!(order_id = %order_id, "Download link attached, order completed");
        } else {
            tracing::warn!(order_id = %order_id, "Download link sent for an unknown order, nothing updated");
        }
        Ok(())
    }

    /// Emails the customer their download link. Returns whether the relay accepted it.
    pub async fn send_email(&self, order_id: Option<String>) -> Result<bool> {
        let order_id = validation::validate_order_id(order_id)?;

        let order = match self.repository.find_by_id(&order_id).await? {
            Some(order) if order.is_ready_for_delivery() => order,
            _ => return Err(OrderError::NotReady(order_id)),
        };

        Ok(self
            .mailer
            .send_download_link(&order.email, &order.order_id, &order.download_link)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{OrderStatus, ReceiptUpload};
    use crate::services::order_repository::InMemoryOrderRepository;
    use crate::test_utils::{RecordingAnnouncer, RecordingMailer};
    use std::collections::HashSet;

    struct Harness {
        service: OrderService,
        repository: Arc<InMemoryOrderRepository>,
        announcer: Arc<RecordingAnnouncer>,
        mailer: Arc<RecordingMailer>,
        _dir: tempfile::TempDir,
    }

    fn harness_with(repository: InMemoryOrderRepository, mailer: RecordingMailer) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(repository);
        let announcer = Arc::new(RecordingAnnouncer::default());
        let mailer = Arc::new(mailer);
        let service = OrderService::new(
            repository.clone(),
            ReceiptStore::new(dir.path()),
            announcer.clone(),
            mailer.clone(),
        );
        Harness {
            service,
            repository,
            announcer,
            mailer,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_with(InMemoryOrderRepository::new(), RecordingMailer::succeeding())
    }

    fn form(email: &str, udid: &str) -> SubmitOrderForm {
        SubmitOrderForm {
            email: Some(email.into()),
            udid: Some(udid.into()),
            receipt: Some(ReceiptUpload {
                file_name: "receipt.pdf".into(),
                bytes: b"PDF...".to_vec(),
            }),
        }
    }

    #[test]
    fn test_generated_ids_are_short_uppercase_hex() {
        for _ in 0..100 {
            let id = generate_order_id();
            assert_eq!(id.len(), ORDER_ID_LEN);
            assert!(id.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
    }

    #[tokio::test]
    async fn test_submit_creates_pending_order_and_announces() {
        let h = harness();
        let order = h.service.submit_order(form("a@b.com", "UDID123"), "http://localhost:5000/").await.unwrap();

        assert_eq!(order.order_id.len(), ORDER_ID_LEN);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.download_link, "");
        assert_eq!(order.receipt_url, format!("/uploads/{}_receipt.pdf", order.order_id));

        let stored = h.repository.find_by_id(&order.order_id).await.unwrap().unwrap();
        assert_eq!(stored, order);

        let announced = h.announcer.announced();
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0].0, order.order_id);
        assert_eq!(
            announced[0].1,
            format!("http://localhost:5000/uploads/{}_receipt.pdf", order.order_id)
        );
    }

    #[tokio::test]
    async fn test_submitted_ids_are_unique() {
        let h = harness();
        let mut ids = HashSet::new();
        for i in 0..200 {
            let order = h
                .service
                .submit_order(form(&format!("u{}@b.com", i), "UDID"), "http://x")
                .await
                .unwrap();
            assert!(ids.insert(order.order_id));
        }
        assert_eq!(h.repository.len(), 200);
    }

    #[tokio::test]
    async fn test_invalid_submission_creates_nothing() {
        let h = harness();
        let mut missing_receipt = form("a@b.com", "UDID123");
        missing_receipt.receipt = None;

        let result = h.service.submit_order(missing_receipt, "http://x").await;

        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert!(h.repository.is_empty());
        assert!(h.announcer.announced().is_empty());
        assert_eq!(std::fs::read_dir(h.service.receipts().upload_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_submit_fails_when_storage_unavailable() {
        let h = harness_with(InMemoryOrderRepository::unavailable(), RecordingMailer::succeeding());
        let result = h.service.submit_order(form("a@b.com", "UDID123"), "http://x").await;
        assert!(matches!(result, Err(OrderError::StorageUnavailable)));
        assert!(h.announcer.announced().is_empty());
    }

    #[tokio::test]
    async fn test_attach_link_completes_order() {
        let h = harness();
        let order = h.service.submit_order(form("a@b.com", "UDID123"), "http://x").await.unwrap();

        h.service
            .attach_link(SendLinkRequest {
                order_id: Some(order.order_id.clone()),
                link: Some("https://dl.example.com/cert".into()),
            })
            .await
            .unwrap();

        let updated = h.service.find_order(&order.order_id).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Completed);
        assert_eq!(updated.download_link, "https://dl.example.com/cert");
    }

    #[tokio::test]
    async fn test_attach_link_to_unknown_order_succeeds_without_record() {
        let h = harness();
        h.service
            .attach_link(SendLinkRequest {
                order_id: Some("DEADBEEF".into()),
                link: Some("https://dl.example.com/cert".into()),
            })
            .await
            .unwrap();

        assert!(h.repository.is_empty());
        assert!(matches!(h.service.find_order("DEADBEEF").await, Err(OrderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_send_email_before_link_is_not_ready() {
        let h = harness();
        let order = h.service.submit_order(form("a@b.com", "UDID123"), "http://x").await.unwrap();

        let result = h.service.send_email(Some(order.order_id.clone())).await;
        assert!(matches!(result, Err(OrderError::NotReady(id)) if id == order.order_id));

        let unknown = h.service.send_email(Some("DEADBEEF".into())).await;
        assert!(matches!(unknown, Err(OrderError::NotReady(_))));

        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_email_delivers_link_each_time() {
        let h = harness();
        let order = h.service.submit_order(form("a@b.com", "UDID123"), "http://x").await.unwrap();
        h.service
            .attach_link(SendLinkRequest {
                order_id: Some(order.order_id.clone()),
                link: Some("https://dl/x".into()),
            })
            .await
            .unwrap();

        assert!(h.service.send_email(Some(order.order_id.clone())).await.unwrap());
        assert!(h.service.send_email(Some(order.order_id.clone())).await.unwrap());

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            ("a@b.com".to_string(), order.order_id.clone(), "https://dl/x".to_string())
        );
    }

    #[tokio::test]
    async fn test_send_email_reports_relay_failure() {
        let h = harness_with(InMemoryOrderRepository::new(), RecordingMailer::failing());
        let order = h.service.submit_order(form("a@b.com", "UDID123"), "http://x").await.unwrap();
        h.service
            .attach_link(SendLinkRequest {
                order_id: Some(order.order_id.clone()),
                link: Some("https://dl/x".into()),
            })
            .await
            .unwrap();

        assert!(!h.service.send_email(Some(order.order_id)).await.unwrap());
        assert_eq!(h.mailer.sent().len(), 1);
    }
}
