//! Per-order watermark parameters.

use chrono::{DateTime, Utc};

use super::event::PurchaseEvent;

/// What gets stamped into one rendered copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkSpec {
    pub order_id: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    /// Issue instant; the stamp shows its date, metadata the full time.
    pub issued_at: DateTime<Utc>,
}

impl WatermarkSpec {
    pub fn from_event(event: &PurchaseEvent, issued_at: DateTime<Utc>) -> Self {
        Self {
            order_id: event.order_id.clone(),
            customer_email: event.customer_email.clone(),
            customer_name: event.customer_name.clone(),
            issued_at,
        }
    }

    /// `YYYY-MM-DD` issue date.
    pub fn issued_date(&self) -> String {
        self.issued_at.format("%Y-%m-%d").to_string()
    }

    /// Identifying line drawn in the page corners.
    pub fn stamp_text(&self) -> String {
        format!(
            "Order: {} | {} | {}",
            self.order_id,
            self.customer_email,
            self.issued_date()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stamp_text() {
        let spec = WatermarkSpec {
            order_id: "1001".to_string(),
            customer_email: "a@example.com".to_string(),
            customer_name: Some("Alice".to_string()),
            issued_at: Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 0).unwrap(),
        };

        assert_eq!(spec.issued_date(), "2026-03-09");
        assert_eq!(spec.stamp_text(), "Order: 1001 | a@example.com | 2026-03-09");
    }
}
