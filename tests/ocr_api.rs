//! OCR API tests against a canned engine

mod common;

use axum::http::StatusCode;

use common::{get, multipart, png, TestApp};
use ocr_lexicon_server::audit::{AuditContext, AuditEventType};

const EXTRACT: &str = "/api/ocr/extract";

#[tokio::test]
async fn test_extract_tracks_unknown_words() {
    let app = TestApp::new("SURAT KEPUTUSAN koperasi merdeka").await;

    let (status, body) = app
        .send(multipart(EXTRACT, "scan.png", &png(), &[("correct", "false")]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["text"], "SURAT KEPUTUSAN koperasi merdeka");
    assert_eq!(body["pages"], 1);
    assert_eq!(body["engine"], "tesseract");
    assert_eq!(body["language"], "mixed");
    assert_eq!(body["learning"]["tracked"], 2);
    assert_eq!(body["learning"]["new_words"], 2);

    let pending = app.state.lexicon().list_pending(50).await;
    let words: Vec<&str> = pending.iter().map(|w| w.word.as_str()).collect();
    assert!(words.contains(&"koperasi"));
    assert!(words.contains(&"merdeka"));
    assert!(!words.contains(&"surat"));
}

#[tokio::test]
async fn test_repeated_sightings_promote_a_word() {
    let app = TestApp::with_config("koperasi", |config| {
        config.learning.frequency_threshold = 2;
    })
    .await;

    let request = || multipart(EXTRACT, "scan.png", &png(), &[("correct", "false")]);
    let (_, first) = app.send(request()).await;
    assert_eq!(first["learning"]["newly_approved"].as_array().unwrap().len(), 0);

    let (_, second) = app.send(request()).await;
    assert_eq!(second["learning"]["newly_approved"][0], "koperasi");

    // Promotion happens once
    let (_, third) = app.send(request()).await;
    assert_eq!(third["learning"]["newly_approved"].as_array().unwrap().len(), 0);

    let word = app.state.lexicon().get_word("koperasi").await.unwrap();
    assert!(word.is_approved);
    assert_eq!(word.frequency, 3);

    // Tracking is not an administrative action
    assert!(app.backend.stored_audit().is_empty());
}

#[tokio::test]
async fn test_corrected_tokens_are_still_learned() {
    let app = TestApp::with_config("Kabupatan", |config| {
        config.learning.frequency_threshold = 2;
    })
    .await;

    // Correction is on by default and rewrites the token, but it is still counted
    let (status, first) = app.send(multipart(EXTRACT, "scan.png", &png(), &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["text"], "Kabupaten");
    assert_eq!(first["corrections"], 1);
    assert_eq!(first["learning"]["tracked"], 1);
    assert_eq!(first["learning"]["new_words"], 1);

    let (_, second) = app.send(multipart(EXTRACT, "scan.png", &png(), &[])).await;
    assert_eq!(second["learning"]["newly_approved"][0], "kabupatan");
    // Once approved the word is known and left as recognized
    assert_eq!(second["text"], "Kabupatan");
    assert_eq!(second["corrections"], 0);

    let word = app.state.lexicon().get_word("kabupatan").await.unwrap();
    assert!(word.is_approved);
    assert_eq!(word.frequency, 2);
    assert_eq!(app.state.lexicon().stats().await.approved, 1);
}

#[tokio::test]
async fn test_correction_uses_only_approved_words() {
    let app = TestApp::new("Koperasl").await;

    let (_, body) = app.send(multipart(EXTRACT, "scan.png", &png(), &[])).await;
    assert_eq!(body["text"], "Koperasl");
    assert_eq!(body["corrections"], 0);

    app.state
        .lexicon()
        .import_wordlist(vec!["koperasi".into()], true, &AuditContext::system())
        .await
        .unwrap();

    let (_, body) = app.send(multipart(EXTRACT, "scan.png", &png(), &[])).await;
    assert_eq!(body["text"], "Koperasi");
    assert_eq!(body["corrections"], 1);
}

#[tokio::test]
async fn test_spelling_normalization_on_request() {
    let app = TestApp::new("Djawatan Keuangan").await;

    let (_, body) = app
        .send(multipart(
            EXTRACT,
            "scan.png",
            &png(),
            &[("normalize_spelling", "true"), ("correct", "false")],
        ))
        .await;
    assert_eq!(body["text"], "Jawatan Keuangan");
    assert_eq!(body["spelling_changes"], 1);
}

#[tokio::test]
async fn test_upload_validation() {
    let app = TestApp::new("teks").await;

    let (status, body) = app.send(multipart(EXTRACT, "notes.txt", b"hello", &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "FILE_TYPE_NOT_ALLOWED");

    let (status, body) = app.send(multipart(EXTRACT, "scan.png", b"", &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "FILE_EMPTY");

    let (status, body) = app
        .send(multipart(EXTRACT, "scan.png", b"not an image", &[]))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "FILE_CORRUPTED");

    let (status, body) = app
        .send(multipart(EXTRACT, "scan.png", &png(), &[("language", "fr")]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "OCR_LANGUAGE_NOT_SUPPORTED");

    let (status, body) = app
        .send(multipart(EXTRACT, "scan.png", &png(), &[("engine", "paddle")]))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_code"], "OCR_ENGINE_UNAVAILABLE");
}

#[tokio::test]
async fn test_learning_failure_keeps_text() {
    let app = TestApp::new("koperasi").await;
    app.backend.set_unavailable(true);

    let (status, body) = app
        .send(multipart(EXTRACT, "scan.png", &png(), &[("correct", "false")]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "koperasi");
    assert_eq!(body["learning"]["error_code"], "STORE_UNAVAILABLE");
    assert!(app.state.lexicon().get_word("koperasi").await.is_err());
}

#[tokio::test]
async fn test_api_keys_enforced_when_enabled() {
    let app = TestApp::with_config("teks", |config| {
        config.auth.api_keys_enabled = true;
        config.auth.api_keys = vec!["sk-static".to_string()];
    })
    .await;

    let (status, body) = app.send(multipart(EXTRACT, "scan.png", &png(), &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "AUTH_MISSING_KEY");

    let mut request = multipart(EXTRACT, "scan.png", &png(), &[]);
    request
        .headers_mut()
        .insert("x-api-key", "sk-wrong".parse().unwrap());
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "AUTH_INVALID_KEY");

    let mut request = multipart(EXTRACT, "scan.png", &png(), &[]);
    request
        .headers_mut()
        .insert("x-api-key", "sk-static".parse().unwrap());
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let failures: Vec<_> = app
        .backend
        .stored_audit()
        .into_iter()
        .filter(|e| e.event_type == AuditEventType::AuthFailed)
        .collect();
    assert_eq!(failures.len(), 2);
}

#[tokio::test]
async fn test_engines_endpoint() {
    let app = TestApp::new("teks").await;

    let (status, body) = app.send(get("/api/ocr/engines")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["engines"][0]["engine"], "tesseract");
    assert_eq!(body["engines"][0]["available"], true);
    assert_eq!(body["default_language"], "mixed");
}
