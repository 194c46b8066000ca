use serde_json::Value;

/// Splits a `{success, message, data}` envelope.
///
/// Returns `Err` with the payload untouched when the envelope reports
/// `success: false`. Payloads without a boolean `success` key pass through as data.
pub fn unwrap_envelope(payload: Value) -> Result<(Value, Option<String>), Value> {
    let Some(success) = payload.get("success").and_then(Value::as_bool) else {
        return Ok((payload, None));
    };
    if !success {
        return Err(payload);
    }
    let message = payload.get("message").and_then(Value::as_str).map(str::to_string);
    let data = payload.get("data").cloned().unwrap_or(Value::Null);
    Ok((data, message))
}
