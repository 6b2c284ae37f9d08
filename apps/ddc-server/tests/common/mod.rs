//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

use ddc_server::config::Config;
use ddc_server::ddc::{PdfAttachmentExtractor, PdfRenderer};
use ddc_server::routes;
use ddc_server::scanner::{ClamdClient, ClamdEndpoint};
use ddc_server::session::SessionStore;
use ddc_server::state::AppState;

/// Bytes the fake daemon reports as infected
pub const MARKER: &[u8] = b"EICAR";

/// A clamd stand-in on a local TCP port
pub struct FakeClamd {
    pub addr: String,
    scans: Arc<AtomicUsize>,
}

impl FakeClamd {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let scans = Arc::new(AtomicUsize::new(0));
        let counter = scans.clone();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let counter = counter.clone();
                tokio::spawn(async move {
                    let mut command = [0u8; 10];
                    if stream.read_exact(&mut command).await.is_err() {
                        return;
                    }
                    let mut payload = Vec::new();
                    loop {
                        let mut len = [0u8; 4];
                        if stream.read_exact(&mut len).await.is_err() {
                            return;
                        }
                        let len = u32::from_be_bytes(len) as usize;
                        if len == 0 {
                            break;
                        }
                        let mut chunk = vec![0u8; len];
                        if stream.read_exact(&mut chunk).await.is_err() {
                            return;
                        }
                        payload.extend_from_slice(&chunk);
                    }

                    counter.fetch_add(1, Ordering::SeqCst);
                    let reply: &[u8] = if payload.windows(MARKER.len()).any(|w| w == MARKER) {
                        b"stream: Eicar-Test-Signature FOUND\n"
                    } else {
                        b"stream: OK\n"
                    };
                    let _ = stream.write_all(reply).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self { addr, scans }
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

/// The full router wired to a fake clamd
pub async fn test_app() -> (Router, FakeClamd) {
    let clamd = FakeClamd::start().await;
    let scanner = ClamdClient::new(Some(ClamdEndpoint::Tcp(clamd.addr.clone())));
    let state = AppState::with_components(
        Config::default(),
        SessionStore::new(),
        Arc::new(scanner),
        Arc::new(PdfRenderer),
        Arc::new(PdfAttachmentExtractor),
    );
    (routes::app(state), clamd)
}

/// Post one RPC request and return the whole envelope
pub async fn rpc_envelope(app: &Router, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/rpc")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Call a method and return its result object
pub async fn call(app: &Router, method: &str, args: Value) -> Value {
    let envelope = rpc_envelope(app, json!({"method": method, "params": [args], "id": 1})).await;
    assert!(
        envelope["error"].is_null(),
        "{} failed at the envelope: {}",
        method,
        envelope["error"]
    );
    envelope["result"].clone()
}

/// Call a method and assert its `Error` field is empty
pub async fn call_ok(app: &Router, method: &str, args: Value) -> Value {
    let result = call(app, method, args).await;
    assert_eq!(result["Error"], "", "{} failed: {}", method, result["Error"]);
    result
}

pub fn b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn unb64(value: &Value) -> Vec<u8> {
    STANDARD.decode(value.as_str().unwrap_or_default()).unwrap()
}

/// Read a chunked download to the end, checking that only the last part
/// is flagged final
pub async fn download(app: &Router, method: &str, id: &str, max: i64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let result = call_ok(app, method, json!({"ID": id, "MaxPartSize": max})).await;
        let part = unb64(&result["Part"]);
        let is_final = result["IsFinal"] == true;
        assert!(part.len() as i64 <= max);
        if !is_final {
            assert_eq!(part.len() as i64, max, "short part before the end");
        }
        out.extend(part);
        if is_final {
            return out;
        }
    }
}

/// Signature argument in the descriptor's camelCase format
pub fn signature(file_name: &str, body: &[u8], subject: &str) -> Value {
    json!({
        "body": b64(body),
        "fileName": file_name,
        "signerName": subject,
        "signatureVisualization": {
            "subjectName": subject,
            "subjectID": "123456789012",
        },
    })
}

/// A small PDF without attachments
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let mut kids = Vec::new();
    for i in 0..pages {
        let content = format!("BT /F1 24 Tf 100 700 Td (Page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
