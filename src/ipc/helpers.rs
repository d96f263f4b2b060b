use serde_json::{json, Value};

use super::error::err;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Conversation ids arrive as strings or as the transport's integer chat ids.
pub fn get_chat_id(params: &Value) -> Result<String, HandlerErr> {
    match params.get("chatId") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Some(other) => Err(HandlerErr {
            code: "bad_params",
            message: "chatId must be a non-empty string or an integer".into(),
            details: Some(json!({ "chatId": other })),
        }),
        None => Err(HandlerErr::bad_params("missing chatId")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_accepts_strings_and_integers() {
        assert_eq!(get_chat_id(&json!({"chatId": " 42 "})).ok(), Some("42".into()));
        assert_eq!(
            get_chat_id(&json!({"chatId": -1001234})).ok(),
            Some("-1001234".into())
        );

        let e = get_chat_id(&json!({"chatId": 1.5})).err().expect("float rejected");
        assert_eq!(e.code, "bad_params");
        assert!(e.details.is_some());
        assert!(get_chat_id(&json!({"chatId": ""})).is_err());
        assert!(get_chat_id(&json!({})).is_err());
    }
}
