//! Purchase fulfillment.
//!
//! One webhook delivery runs straight through: verify, parse, filter,
//! validate, resolve the template, render, persist, notify. Nothing is
//! retried and nothing is rolled back; a failed e-mail only degrades the
//! receipt to `emailSent: false`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use auth::Signer;

use crate::catalog::ProductCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::FulfillmentConfig;
use crate::notify::{Notifier, PurchaseEmail};
use crate::storage::{BlobStore, ObjectMetadata};
use crate::types::{artifact_key, PurchaseEvent, StoredArtifact, WatermarkSpec, WebhookPayload, PDF_CONTENT_TYPE};
use crate::watermark::WatermarkRenderer;
use crate::{Error, Result};

/// Header carrying the hex HMAC of the raw webhook body.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Optional TrueType font for stamps, in the documents bucket.
pub const CUSTOM_FONT_KEY: &str = "fonts/IBMPlexMono-Regular.ttf";

/// What to do with webhooks when no secret is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsignedWebhookPolicy {
    /// Accept and log a warning.
    #[default]
    Allow,
    /// Refuse with `BadSignature`.
    Reject,
}

impl FromStr for UnsignedWebhookPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "UNSIGNED_WEBHOOK_POLICY must be allow or reject, got {:?}",
                other
            )),
        }
    }
}

/// Body returned for a fulfilled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentReceipt {
    pub success: bool,
    pub download_url: String,
    /// Full storage key of the rendered copy.
    pub filename: String,
    pub email_sent: bool,
}

/// Result of handling one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// Not an `order_created` event; acknowledged without side effects.
    Ignored { event_name: Option<String> },
    Fulfilled(FulfillmentReceipt),
}

/// A verified delivery, before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Not an `order_created` event.
    Ignored { event_name: Option<String> },
    Order(PurchaseEvent),
}

/// The fulfillment pipeline. Immutable and shareable across requests.
#[derive(Clone)]
pub struct FulfillmentPipeline {
    documents: Arc<dyn BlobStore>,
    catalog: Arc<ProductCatalog>,
    renderer: WatermarkRenderer,
    webhook_signer: Option<Signer>,
    unsigned_policy: UnsignedWebhookPolicy,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FulfillmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FulfillmentPipeline")
            .field("catalog", &self.catalog)
            .field("renderer", &self.renderer)
            .field("webhook_signer", &self.webhook_signer)
            .field("unsigned_policy", &self.unsigned_policy)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

impl FulfillmentPipeline {
    /// Pipeline with no webhook secret, no notifier and the wall clock.
    pub fn new(documents: Arc<dyn BlobStore>, catalog: ProductCatalog) -> Self {
        Self {
            documents,
            catalog: Arc::new(catalog),
            renderer: WatermarkRenderer::default(),
            webhook_signer: None,
            unsigned_policy: UnsignedWebhookPolicy::default(),
            notifier: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Assemble a pipeline from configuration.
    #[allow(clippy::result_large_err)]
    pub fn from_config(
        config: &FulfillmentConfig,
        documents: Arc<dyn BlobStore>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Result<Self> {
        let mut pipeline = Self::new(documents, config.load_catalog()?)
            .with_renderer(WatermarkRenderer::new(config.watermark.render_options()))
            .with_unsigned_policy(config.unsigned_webhook_policy);
        if let Some(secret) = &config.webhook_secret {
            pipeline = pipeline.with_webhook_secret(secret);
        }
        if let Some(notifier) = notifier {
            pipeline = pipeline.with_notifier(notifier);
        }
        Ok(pipeline)
    }

    pub fn with_webhook_secret(mut self, secret: impl AsRef<[u8]>) -> Self {
        self.webhook_signer = Some(Signer::new(secret));
        self
    }

    pub fn with_unsigned_policy(mut self, policy: UnsignedWebhookPolicy) -> Self {
        self.unsigned_policy = policy;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_renderer(mut self, renderer: WatermarkRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Whether purchase e-mails can be sent.
    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    /// Whether deliveries are checked against a webhook secret.
    pub fn verifies_signatures(&self) -> bool {
        self.webhook_signer.is_some()
    }

    /// Handle one raw webhook delivery.
    ///
    /// `public_base` is the externally visible origin used to build the
    /// download link.
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
        public_base: &Url,
    ) -> Result<FulfillmentOutcome> {
        match self.accept(body, signature)? {
            Delivery::Ignored { event_name } => Ok(FulfillmentOutcome::Ignored { event_name }),
            Delivery::Order(event) => {
                let receipt = self.fulfill(&event, public_base).await?;
                Ok(FulfillmentOutcome::Fulfilled(receipt))
            }
        }
    }

    /// Verify, parse, filter and validate a raw delivery.
    pub fn accept(&self, body: &[u8], signature: Option<&str>) -> Result<Delivery> {
        self.verify_signature(body, signature)?;

        let payload = WebhookPayload::parse(body)?;
        if !payload.is_order_created() {
            let event_name = payload.event_name().map(str::to_string);
            info!(event = ?event_name, "Ignoring webhook event");
            return Ok(Delivery::Ignored { event_name });
        }

        Ok(Delivery::Order(payload.into_purchase_event()?))
    }

    fn verify_signature(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        match (&self.webhook_signer, self.unsigned_policy) {
            (Some(signer), _) => {
                let provided = signature.map(str::trim).unwrap_or_default();
                if provided.is_empty() || !signer.verify(body, provided) {
                    warn!(
                        signature_present = !provided.is_empty(),
                        "Webhook signature rejected"
                    );
                    return Err(Error::BadSignature);
                }
                debug!("Webhook signature verified");
                Ok(())
            }
            (None, UnsignedWebhookPolicy::Allow) => {
                warn!("Webhook secret not configured, accepting unsigned delivery");
                Ok(())
            }
            (None, UnsignedWebhookPolicy::Reject) => {
                warn!("Webhook secret not configured, rejecting delivery");
                Err(Error::BadSignature)
            }
        }
    }

    /// Render, persist and announce one purchase.
    pub async fn fulfill(&self, event: &PurchaseEvent, public_base: &Url) -> Result<FulfillmentReceipt> {
        let template = self.catalog.resolve(&event.product_id).clone();
        info!(
            order_id = %event.order_id,
            product_id = %event.product_id,
            template = %template.template_key,
            "Fulfilling order"
        );

        let template_bytes = self
            .documents
            .get(&template.template_key)
            .await?
            .ok_or_else(|| Error::TemplateNotFound(template.template_key.clone()))?
            .body;
        let font = self.load_font().await;

        let issued_at = self.clock.now();
        let spec = WatermarkSpec::from_event(event, issued_at);
        let renderer = self.renderer.clone();
        let pdf = tokio::task::spawn_blocking(move || {
            renderer.render_with_font(&template_bytes, &spec, font.as_deref())
        })
        .await
        .map_err(|e| Error::Render {
            message: format!("render task failed: {}", e),
        })??;

        let artifact = self.persist(event, artifact_key(&event.order_id, issued_at), pdf).await?;
        let download_url = download_url(public_base, artifact.filename())?;

        let email = PurchaseEmail {
            to: event.customer_email.clone(),
            customer_name: event.customer_name.clone(),
            order_id: event.order_id.clone(),
            product_name: template.display_name,
            download_url: download_url.to_string(),
        };
        let email_sent = self.notify(&email).await;

        Ok(FulfillmentReceipt {
            success: true,
            download_url: download_url.into(),
            filename: artifact.key,
            email_sent,
        })
    }

    async fn load_font(&self) -> Option<Vec<u8>> {
        match self.documents.get(CUSTOM_FONT_KEY).await {
            Ok(Some(object)) => Some(object.body),
            Ok(None) => None,
            Err(e) => {
                warn!(key = CUSTOM_FONT_KEY, error = %e, "Could not read custom font");
                None
            }
        }
    }

    async fn persist(&self, event: &PurchaseEvent, key: String, pdf: Vec<u8>) -> Result<StoredArtifact> {
        let metadata = ObjectMetadata::with_content_type(PDF_CONTENT_TYPE)
            .with_custom("orderId", event.order_id.as_str())
            .with_custom("customerEmail", event.customer_email.as_str())
            .with_custom("productId", event.product_id.as_str());

        let artifact = StoredArtifact {
            key,
            content_type: PDF_CONTENT_TYPE.to_string(),
            size: pdf.len(),
            metadata: metadata.custom.clone(),
        };
        self.documents.put(&artifact.key, pdf, metadata).await?;

        info!(order_id = %event.order_id, key = %artifact.key, size = artifact.size, "Artifact stored");
        Ok(artifact)
    }

    async fn notify(&self, email: &PurchaseEmail) -> bool {
        let Some(notifier) = &self.notifier else {
            error!(order_id = %email.order_id, "No e-mail client configured, download link not sent");
            return false;
        };

        match notifier.send_purchase_email(email).await {
            Ok(()) => {
                info!(order_id = %email.order_id, "Purchase e-mail sent");
                true
            }
            Err(e) => {
                error!(order_id = %email.order_id, error = %e, "Failed to send purchase e-mail");
                false
            }
        }
    }
}

/// `<base>/download/<filename>`
fn download_url(base: &Url, filename: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::Config {
            message: format!("public base URL cannot carry a path: {}", base),
        })?
        .pop_if_empty()
        .push("download")
        .push(filename);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
