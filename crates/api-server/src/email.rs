//! Email client for purchase confirmations, sent through the Resend HTTP API.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use fulfillment_core::{Notifier, NotifyError, PurchaseEmail};

pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_FROM: &str = "DIY Furniture Project <orders@diyfurnitureproject.com>";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Email client configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Resend API key.
    pub api_key: String,
    /// Messages endpoint.
    pub api_url: String,
    /// Sender mailbox, `Name <address>`.
    pub from: String,
    /// Reply-To address (optional).
    pub reply_to: Option<String>,
}

impl EmailConfig {
    /// Create configuration from environment variables; `None` without an
    /// API key.
    pub fn from_env() -> Option<Self> {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Some(Self {
            api_key: var("RESEND_API_KEY")?,
            api_url: var("RESEND_API_URL").unwrap_or_else(|| DEFAULT_RESEND_API_URL.to_string()),
            from: var("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM.to_string()),
            reply_to: var("EMAIL_REPLY_TO"),
        })
    }
}

/// Request body of the Resend send-email call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// Email client for sending transactional emails.
#[derive(Clone)]
pub struct EmailClient {
    http: reqwest::Client,
    config: EmailConfig,
}

impl std::fmt::Debug for EmailClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailClient")
            .field("api_url", &self.config.api_url)
            .field("from", &self.config.from)
            .finish()
    }
}

impl EmailClient {
    /// Create a new email client with the given configuration.
    pub fn new(config: EmailConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Compose the confirmation message for a purchase.
    pub fn compose(&self, email: &PurchaseEmail) -> OutgoingEmail {
        OutgoingEmail {
            from: self.config.from.clone(),
            to: vec![email.to.clone()],
            subject: email.subject(),
            html: purchase_html(email),
            reply_to: self.config.reply_to.clone(),
        }
    }
}

#[async_trait]
impl Notifier for EmailClient {
    async fn send_purchase_email(&self, email: &PurchaseEmail) -> Result<(), NotifyError> {
        let message = self.compose(email);

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::Send(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %email.to, order_id = %email.order_id, "Purchase email sent");
        Ok(())
    }
}

fn purchase_html(email: &PurchaseEmail) -> String {
    let product = escape_html(&email.product_name);
    let order_id = escape_html(&email.order_id);
    let download_url = escape_html(&email.download_url);
    let greeting = email
        .customer_name
        .as_deref()
        .map(|name| format!("Hi {},", escape_html(name)))
        .unwrap_or_else(|| "Hi there,".to_string());

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Your {product} Plans</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333333;">
    <table role="presentation" style="width: 100%; max-width: 600px; margin: 0 auto; border-collapse: collapse;">
        <tr>
            <td style="padding: 20px; text-align: center;">
                <h1 style="margin: 0 0 10px 0;">Thank you for your purchase!</h1>
            </td>
        </tr>
        <tr>
            <td style="padding: 0 20px;">
                <p>{greeting}</p>
                <p>Your <strong>{product}</strong> furniture plans are ready to download. This PDF has been personalized with your order information.</p>
                <p style="text-align: center;">
                    <a href="{download_url}" style="display: inline-block; background: #000000; color: #ffffff; padding: 14px 28px; text-decoration: none; font-weight: 500; margin: 20px 0;">Download Your Plans</a>
                </p>
                <p>If the button doesn't work, copy and paste this link into your browser:</p>
                <p style="word-break: break-all; font-size: 12px; color: #666666;">{download_url}</p>
            </td>
        </tr>
        <tr>
            <td style="padding: 20px; border-top: 1px solid #eeeeee; font-size: 12px; color: #666666;">
                <p style="margin: 0;">Order #{order_id}</p>
                <p style="margin: 0;">DIY Furniture Project</p>
            </td>
        </tr>
    </table>
</body>
</html>"#
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    fn purchase() -> PurchaseEmail {
        PurchaseEmail {
            to: "a@example.com".to_string(),
            customer_name: Some("Alice".to_string()),
            order_id: "1001".to_string(),
            product_name: "Workbench".to_string(),
            download_url: "https://plans.example.com/download/order-1001_1.pdf".to_string(),
        }
    }

    fn config(api_url: String) -> EmailConfig {
        EmailConfig {
            api_key: "re_test".to_string(),
            api_url,
            from: DEFAULT_FROM.to_string(),
            reply_to: Some("help@example.com".to_string()),
        }
    }

    /// Local stand-in for the messages endpoint.
    async fn fake_api(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let sink = captured.clone();
        let app = Router::new().route(
            "/emails",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    sink.lock().unwrap().push((auth, body));
                    (status, Json(serde_json::json!({ "id": "msg_1" })))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/emails", addr), captured)
    }

    #[test]
    fn test_compose() {
        let client = EmailClient::new(config(DEFAULT_RESEND_API_URL.to_string())).unwrap();
        let message = client.compose(&purchase());

        assert_eq!(message.to, vec!["a@example.com".to_string()]);
        assert_eq!(message.subject, "Your Workbench Plans - Order #1001");
        assert_eq!(message.reply_to.as_deref(), Some("help@example.com"));
        assert!(message.html.contains("Hi Alice,"));
        assert!(message
            .html
            .contains("href=\"https://plans.example.com/download/order-1001_1.pdf\""));
        assert!(message.html.contains("Order #1001"));
    }

    #[test]
    fn test_html_is_escaped() {
        let mut email = purchase();
        email.customer_name = Some("<script>".to_string());
        email.product_name = "Bench & Stool".to_string();

        let html = purchase_html(&email);
        assert!(html.contains("Hi &lt;script&gt;,"));
        assert!(html.contains("Bench &amp; Stool"));
        assert!(!html.contains("<script>"));
    }

    #[tokio::test]
    async fn test_send_posts_message() {
        let (url, captured) = fake_api(StatusCode::OK).await;
        let client = EmailClient::new(config(url)).unwrap();

        client.send_purchase_email(&purchase()).await.unwrap();

        let requests = captured.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (auth, body) = &requests[0];
        assert_eq!(auth.as_deref(), Some("Bearer re_test"));
        assert_eq!(body["to"][0], "a@example.com");
        assert_eq!(body["from"], DEFAULT_FROM);
        assert_eq!(body["reply_to"], "help@example.com");
    }

    #[tokio::test]
    async fn test_rejected_send() {
        let (url, _captured) = fake_api(StatusCode::UNPROCESSABLE_ENTITY).await;
        let client = EmailClient::new(config(url)).unwrap();

        match client.send_purchase_email(&purchase()).await {
            Err(NotifyError::Rejected { status, .. }) => assert_eq!(status, 422),
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
