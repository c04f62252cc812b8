//! Wire messages exchanged on `/ws`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

use techmart_core::{OrderId, OrderStatus};

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    SubscribeOrder {
        #[serde(deserialize_with = "order_id_from_number_or_text")]
        order_id: OrderId,
    },
}

/// Browsers often send ids read from the DOM as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOrderId {
    Number(i32),
    Text(String),
}

fn order_id_from_number_or_text<'de, D>(deserializer: D) -> Result<OrderId, D::Error>
where
    D: Deserializer<'de>,
{
    match RawOrderId::deserialize(deserializer)? {
        RawOrderId::Number(id) => Ok(OrderId::new(id)),
        RawOrderId::Text(text) => text
            .trim()
            .parse()
            .map(OrderId::new)
            .map_err(|_| D::Error::custom(format!("invalid order id {text:?}"))),
    }
}

/// Messages pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    OrderUpdate {
        order_id: OrderId,
        new_status: OrderStatus,
        timestamp: DateTime<Utc>,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_subscribe() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe_order","orderId":42}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SubscribeOrder {
                order_id: OrderId::new(42)
            }
        );
    }

    #[test]
    fn test_parse_subscribe_with_string_id() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe_order","orderId":"42"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SubscribeOrder {
                order_id: OrderId::new(42)
            }
        );
        assert!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe_order","orderId":"abc"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"orderId":1}"#).is_err());
    }

    #[test]
    fn test_order_update_shape() {
        let msg = ServerMessage::OrderUpdate {
            order_id: OrderId::new(7),
            new_status: OrderStatus::Shipped,
            timestamp: Utc.with_ymd_and_hms(2026, 5, 1, 8, 30, 0).unwrap(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "order_update");
        assert_eq!(json["orderId"], 7);
        assert_eq!(json["newStatus"], "shipped");
        assert_eq!(json["timestamp"], "2026-05-01T08:30:00Z");
    }
}
