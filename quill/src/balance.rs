use serde_json::Value;

/// Pull a credit balance out of an API response body.
///
/// Endpoints disagree on shape: chat-style responses carry a top-level
/// `credits_remaining`, profile-style responses nest the balance under
/// `user.credits`. A present `credits_remaining` always wins, even when it
/// is unusable; bodies with neither field carry no balance at all.
pub fn extract_balance(body: &Value) -> Option<u64> {
    match body.get("credits_remaining") {
        Some(value) => value.as_u64(),
        None => body
            .get("user")
            .and_then(|user| user.get("credits"))
            .and_then(Value::as_u64),
    }
}
