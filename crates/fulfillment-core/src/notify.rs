//! Purchase confirmation delivery.

use async_trait::async_trait;
use thiserror::Error;

/// Notification errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to build email: {0}")]
    Build(String),
    #[error("Failed to send email: {0}")]
    Send(String),
    #[error("Email API rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Content of a purchase confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseEmail {
    pub to: String,
    pub customer_name: Option<String>,
    pub order_id: String,
    pub product_name: String,
    pub download_url: String,
}

impl PurchaseEmail {
    pub fn subject(&self) -> String {
        format!("Your {} Plans - Order #{}", self.product_name, self.order_id)
    }
}

/// Sends purchase confirmations.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_purchase_email(&self, email: &PurchaseEmail) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject() {
        let email = PurchaseEmail {
            to: "a@example.com".to_string(),
            customer_name: None,
            order_id: "1001".to_string(),
            product_name: "Workbench".to_string(),
            download_url: "https://x/download/order-1001_1.pdf".to_string(),
        };
        assert_eq!(email.subject(), "Your Workbench Plans - Order #1001");
    }
}
