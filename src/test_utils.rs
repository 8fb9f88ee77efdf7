//! Recording stand-ins for the outbound notifiers.
//!
//! Used by the unit and integration tests in place of Telegram and SMTP.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::models::order::Order;
use crate::services::mailer::MailSender;
use crate::services::telegram::Announcer;

/// Remembers `(order_id, receipt_link)` for every announcement.
#[derive(Default)]
pub struct RecordingAnnouncer {
    announced: Mutex<Vec<(String, String)>>,
}

impl RecordingAnnouncer {
    pub fn announced(&self) -> Vec<(String, String)> {
        self.announced.lock().clone()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, order: &Order, receipt_link: &str) {
        self.announced
            .lock()
            .push((order.order_id.clone(), receipt_link.to_string()));
    }
}

/// Remembers `(to, order_id, link)` for every send and answers with a fixed outcome.
pub struct RecordingMailer {
    outcome: bool,
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    pub fn succeeding() -> Self {
        Self {
            outcome: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            outcome: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send_download_link(&self, to_address: &str, order_id: &str, link: &str) -> bool {
        self.sent
            .lock()
            .push((to_address.to_string(), order_id.to_string(), link.to_string()));
        self.outcome
    }
}
