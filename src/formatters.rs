//! Formatters for objects returned by filters.

use crate::utils;
use serde_json::{Map, Value};

/// Formats a log, converting its hex quantities to numbers. Fields of pending
/// logs are `null` and left untouched.
pub fn output_log_formatter(mut log: Value) -> Value {
    if let Some(log) = log.as_object_mut() {
        for field in ["blockNumber", "transactionIndex", "logIndex"] {
            to_decimal(log, field);
        }
    }
    log
}

/// Formats a whisper message, converting its hex quantities to numbers and
/// decoding its payload and topics as text. The raw payload is kept as
/// `payloadRaw`, and payloads that are JSON documents are parsed.
pub fn output_post_formatter(mut post: Value) -> Value {
    let Some(fields) = post.as_object_mut() else {
        return post;
    };
    for field in ["expiry", "sent", "ttl", "workProved"] {
        to_decimal(fields, field);
    }

    if let Some(payload) = fields.get("payload").cloned() {
        let text = payload.as_str().and_then(|hex| utils::to_ascii(hex).ok());
        if let Some(text) = text {
            let decoded = serde_json::from_str::<Value>(&text)
                .ok()
                .filter(|value| value.is_object() || value.is_array())
                .unwrap_or(Value::String(text));
            fields.insert("payload".to_owned(), decoded);
        }
        fields.insert("payloadRaw".to_owned(), payload);
    }

    let topics = match fields.remove("topics") {
        Some(Value::Array(topics)) => topics
            .into_iter()
            .map(|topic| match topic.as_str().map(utils::to_ascii) {
                Some(Ok(text)) => Value::String(text),
                _ => topic,
            })
            .collect(),
        _ => Vec::new(),
    };
    fields.insert("topics".to_owned(), Value::Array(topics));

    post
}

fn to_decimal(object: &mut Map<String, Value>, field: &str) {
    let Some(value) = object.get_mut(field) else {
        return;
    };
    let number = value
        .as_str()
        .and_then(|hex| hex.strip_prefix("0x"))
        .and_then(|digits| u64::from_str_radix(digits, 16).ok());
    if let Some(number) = number {
        *value = Value::from(number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn logs() {
        assert_eq!(
            output_log_formatter(json!({
                "blockNumber": "0x1b4",
                "transactionIndex": "0x0",
                "logIndex": "0x1",
                "data": "0x0000000000000000000000000000000000000000000000000000000000000001",
            })),
            json!({
                "blockNumber": 436,
                "transactionIndex": 0,
                "logIndex": 1,
                "data": "0x0000000000000000000000000000000000000000000000000000000000000001",
            }),
        );
    }

    #[test]
    fn pending_logs() {
        let log = json!({"blockNumber": null, "logIndex": null, "transactionIndex": null});
        assert_eq!(output_log_formatter(log.clone()), log);
    }

    #[test]
    fn posts() {
        assert_eq!(
            output_post_formatter(json!({
                "expiry": "0x10",
                "sent": "0x20",
                "ttl": "0x64",
                "workProved": "0x0",
                "payload": "0x6869",
                "topics": ["0x616263"],
            })),
            json!({
                "expiry": 16,
                "sent": 32,
                "ttl": 100,
                "workProved": 0,
                "payload": "hi",
                "payloadRaw": "0x6869",
                "topics": ["abc"],
            }),
        );
    }

    #[test]
    fn json_payloads() {
        let post = output_post_formatter(json!({"payload": "0x7b2261223a317d"}));
        assert_eq!(post["payload"], json!({"a": 1}));
        assert_eq!(post["topics"], json!([]));
    }
}
