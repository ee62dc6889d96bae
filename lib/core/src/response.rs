//! JSON response envelope helpers.
//!
//! Every success response is `{"success": true, ...}`; list responses add
//! `count` (items in this page) and `total` (items matching the filter).
//! Error responses are produced by `ServiceError::into_response`.

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// `{"success": true, "data": <data>}`
pub fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// `{"success": true, "count": n, "total": m, "data": [...]}`
pub fn ok_list<T: Serialize>(items: Vec<T>, total: usize) -> Json<Value> {
    Json(json!({
        "success": true,
        "count": items.len(),
        "total": total,
        "data": items,
    }))
}

/// `{"success": true, "message": <msg>}`
pub fn ok_message(msg: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": msg }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shapes() {
        let Json(v) = ok(json!({"id": "x"}));
        assert_eq!(v["success"], true);
        assert_eq!(v["data"]["id"], "x");

        let Json(v) = ok_list(vec![1, 2, 3], 10);
        assert_eq!(v["count"], 3);
        assert_eq!(v["total"], 10);

        let Json(v) = ok_message("deleted");
        assert_eq!(v["message"], "deleted");
    }
}
