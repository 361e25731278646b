//! Purchase notifications.

use serde::{Deserialize, Deserializer};

use crate::{Error, Result};

/// The only event kind that triggers fulfillment.
pub const ORDER_CREATED: &str = "order_created";

/// A validated purchase ready for fulfillment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseEvent {
    pub event_name: String,
    pub order_id: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub product_id: String,
}

/// Raw webhook body as sent by the storefront.
///
/// Every field is optional at this stage so irrelevant events can be
/// acknowledged without validating order fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    meta: Option<WebhookMeta>,
    #[serde(default)]
    event_name: Option<String>,
    #[serde(default)]
    data: Option<OrderData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WebhookMeta {
    #[serde(default)]
    event_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OrderData {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    id: Option<String>,
    #[serde(default)]
    attributes: Option<OrderAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OrderAttributes {
    #[serde(default)]
    user_email: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    first_order_item: Option<OrderItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OrderItem {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    product_id: Option<String>,
}

impl WebhookPayload {
    /// Decode a raw body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| Error::MalformedPayload(e.to_string()))
    }

    /// Event name from `meta.event_name`, else a top-level `event_name`.
    pub fn event_name(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.event_name.as_deref())
            .or(self.event_name.as_deref())
    }

    pub fn is_order_created(&self) -> bool {
        self.event_name() == Some(ORDER_CREATED)
    }

    /// Validate required order fields.
    pub fn into_purchase_event(self) -> Result<PurchaseEvent> {
        let event_name = self.event_name().unwrap_or_default().to_string();
        let data = self.data.unwrap_or_default();
        let attributes = data.attributes.unwrap_or_default();

        let order_id = non_empty(data.id).ok_or(Error::MissingField("orderId"))?;
        let customer_email =
            non_empty(attributes.user_email).ok_or(Error::MissingField("customerEmail"))?;
        let product_id = non_empty(attributes.first_order_item.and_then(|item| item.product_id))
            .ok_or(Error::MissingField("productId"))?;

        Ok(PurchaseEvent {
            event_name,
            order_id,
            customer_email,
            customer_name: non_empty(attributes.user_name),
            product_id,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accept identifiers sent either as strings or as JSON integers.
pub fn deserialize_optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdValue {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<IdValue>::deserialize(deserializer)?.map(|id| match id {
        IdValue::Text(s) => s,
        IdValue::Number(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_created() -> serde_json::Value {
        json!({
            "meta": { "event_name": "order_created" },
            "data": {
                "id": "1001",
                "attributes": {
                    "user_email": "a@example.com",
                    "user_name": "Alice",
                    "first_order_item": { "product_id": 796585 }
                }
            }
        })
    }

    fn parse(value: serde_json::Value) -> WebhookPayload {
        WebhookPayload::parse(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_lemon_squeezy_order() {
        let payload = parse(order_created());
        assert!(payload.is_order_created());

        let event = payload.into_purchase_event().unwrap();
        assert_eq!(
            event,
            PurchaseEvent {
                event_name: "order_created".to_string(),
                order_id: "1001".to_string(),
                customer_email: "a@example.com".to_string(),
                customer_name: Some("Alice".to_string()),
                product_id: "796585".to_string(),
            }
        );
    }

    #[test]
    fn test_top_level_event_name() {
        let mut body = order_created();
        body.as_object_mut().unwrap().remove("meta");
        body["event_name"] = json!("order_created");

        assert!(parse(body).is_order_created());
    }

    #[test]
    fn test_meta_event_name_takes_precedence() {
        let mut body = order_created();
        body["event_name"] = json!("order_created");
        body["meta"]["event_name"] = json!("subscription_created");

        let payload = parse(body);
        assert_eq!(payload.event_name(), Some("subscription_created"));
        assert!(!payload.is_order_created());
    }

    #[test]
    fn test_other_events_need_no_order_fields() {
        let payload = parse(json!({ "meta": { "event_name": "order_refunded" } }));
        assert_eq!(payload.event_name(), Some("order_refunded"));
        assert!(!payload.is_order_created());
    }

    #[test]
    fn test_numeric_order_id() {
        let mut body = order_created();
        body["data"]["id"] = json!(1001);

        let event = parse(body).into_purchase_event().unwrap();
        assert_eq!(event.order_id, "1001");
    }

    #[test]
    fn test_missing_fields() {
        let cases = [
            ("/data/id", "orderId"),
            ("/data/attributes/user_email", "customerEmail"),
            ("/data/attributes/first_order_item/product_id", "productId"),
        ];

        for (pointer, field) in cases {
            let mut body = order_created();
            *body.pointer_mut(pointer).unwrap() = serde_json::Value::Null;

            match parse(body).into_purchase_event() {
                Err(Error::MissingField(missing)) => assert_eq!(missing, field),
                other => panic!("expected missing {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_blank_email_is_missing() {
        let mut body = order_created();
        body["data"]["attributes"]["user_email"] = json!("   ");

        assert!(matches!(
            parse(body).into_purchase_event(),
            Err(Error::MissingField("customerEmail"))
        ));
    }

    #[test]
    fn test_customer_name_optional() {
        let mut body = order_created();
        body["data"]["attributes"]
            .as_object_mut()
            .unwrap()
            .remove("user_name");

        let event = parse(body).into_purchase_event().unwrap();
        assert_eq!(event.customer_name, None);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            WebhookPayload::parse(b"{not json"),
            Err(Error::MalformedPayload(_))
        ));
        assert!(matches!(
            WebhookPayload::parse(b"[1, 2, 3]"),
            Err(Error::MalformedPayload(_))
        ));
    }
}
