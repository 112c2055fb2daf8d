//! Firestore REST store against an in-process stub.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use store::firestore::FirestoreStore;
use store::DocumentStore;

#[derive(Debug, Clone)]
struct Call {
    method: Method,
    path: String,
    query: String,
    auth: String,
    body: Value,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

const DOCS: &str = "projects/proj/databases/(default)/documents";

async fn firestore(
    State(rec): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let path = uri.path().to_string();
    rec.calls.lock().unwrap().push(Call {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().unwrap_or_default().to_string(),
        auth: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        body: body.clone(),
    });

    if path.contains("denied") {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "status": "PERMISSION_DENIED" } })),
        )
            .into_response();
    }
    if path.ends_with(":runQuery") {
        return Json(json!([
            { "readTime": "2026-10-17T10:00:00Z" },
            {
                "document": {
                    "name": format!("{DOCS}/usuarios/u1"),
                    "fields": {
                        "telefone": { "stringValue": "841111111" },
                        "saldo": { "integerValue": "200" }
                    }
                },
                "readTime": "2026-10-17T10:00:00Z"
            }
        ]))
        .into_response();
    }
    if method == Method::POST {
        return Json(json!({
            "name": format!("{DOCS}/compras/abc123"),
            "fields": body["fields"],
        }))
        .into_response();
    }
    Json(json!({ "name": format!("{DOCS}/sms_logs/x"), "fields": body["fields"] })).into_response()
}

async fn start_stub() -> (String, Recorder) {
    let rec = Recorder::default();
    let app = Router::new().fallback(firestore).with_state(rec.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), rec)
}

#[tokio::test]
async fn add_posts_typed_fields_and_returns_document_id() {
    let (base, rec) = start_stub().await;
    let store = FirestoreStore::new(base, "proj".into(), "tok".into());

    let id = store
        .add("compras", json!({ "reference": "R1", "amount": 197 }))
        .await
        .unwrap();
    assert_eq!(id, "abc123");

    let calls = rec.calls.lock().unwrap();
    assert_eq!(calls[0].method, Method::POST);
    assert!(calls[0].path.ends_with("/documents/compras"));
    assert!(calls[0].path.contains("/projects/proj/"));
    assert_eq!(calls[0].auth, "Bearer tok");
    assert_eq!(
        calls[0].body["fields"],
        json!({
            "reference": { "stringValue": "R1" },
            "amount": { "integerValue": "197" }
        })
    );
}

#[tokio::test]
async fn merge_patches_with_leaf_update_mask() {
    let (base, rec) = start_stub().await;
    let store = FirestoreStore::new(base, "proj".into(), "tok".into());

    store
        .merge(
            "sms_logs",
            "258841234567__TX1",
            json!({ "dlr": { "status": "DELIVERED", "raw": { "to": "258841234567" } } }),
        )
        .await
        .unwrap();

    let calls = rec.calls.lock().unwrap();
    assert_eq!(calls[0].method, Method::PATCH);
    assert!(calls[0].path.ends_with("/documents/sms_logs/258841234567__TX1"));
    let mut mask: Vec<&str> = calls[0]
        .query
        .split('&')
        .filter_map(|pair| pair.strip_prefix("updateMask.fieldPaths="))
        .collect();
    mask.sort();
    assert_eq!(mask, vec!["dlr.raw.to", "dlr.status"]);
    assert_eq!(
        calls[0].body["fields"]["dlr"]["mapValue"]["fields"]["status"],
        json!({ "stringValue": "DELIVERED" })
    );
}

#[tokio::test]
async fn find_by_field_runs_equality_query_and_skips_rows_without_document() {
    let (base, rec) = start_stub().await;
    let store = FirestoreStore::new(base, "proj".into(), "tok".into());

    let found = store
        .find_by_field("usuarios", "telefone", &json!("841111111"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "u1");
    assert_eq!(found[0].data, json!({ "telefone": "841111111", "saldo": 200 }));

    let calls = rec.calls.lock().unwrap();
    assert!(calls[0].path.ends_with("/documents:runQuery"));
    let query = &calls[0].body["structuredQuery"];
    assert_eq!(query["from"][0]["collectionId"], "usuarios");
    assert_eq!(query["where"]["fieldFilter"]["field"]["fieldPath"], "telefone");
    assert_eq!(query["where"]["fieldFilter"]["op"], "EQUAL");
    assert_eq!(
        query["where"]["fieldFilter"]["value"],
        json!({ "stringValue": "841111111" })
    );
}

#[tokio::test]
async fn error_status_carries_response_body() {
    let (base, _rec) = start_stub().await;
    let store = FirestoreStore::new(base, "denied".into(), "tok".into());

    let err = store
        .add("compras", json!({ "reference": "R1" }))
        .await
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("Firestore create failed"));
    assert!(text.contains("403"));
    assert!(text.contains("PERMISSION_DENIED"));
}
