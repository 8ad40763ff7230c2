//! Integration tests: serve the gateway router on a free port with mockito standing in for
//! both the Telegram Bot API and respond.io, then drive the webhooks over HTTP.

use mockito::{Matcher, Server, ServerGuard};
use relay::config::{
    RESPOND_IO_API_TOKEN, RESPOND_IO_BASE_URL, RESPOND_IO_CHANNEL_ID, TELEGRAM_API_BASE,
    TELEGRAM_BOT_TOKEN, TELEGRAM_SECRET_TOKEN, WELCOME_MESSAGE,
};
use relay::gateway::{self, GatewayState, TELEGRAM_SIGNATURE_HEADER};
use relay::translate::canned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Credentials for both platforms, with both APIs pointed at `upstream`.
fn full_env(upstream: &ServerGuard) -> HashMap<String, String> {
    [
        (TELEGRAM_BOT_TOKEN, "TOKEN".to_string()),
        (TELEGRAM_API_BASE, upstream.url()),
        (RESPOND_IO_API_TOKEN, "RIO".to_string()),
        (RESPOND_IO_CHANNEL_ID, "555".to_string()),
        (RESPOND_IO_BASE_URL, upstream.url()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Start the router on 127.0.0.1:0 and return its base URL.
async fn start_gateway(env: HashMap<String, String>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let base = format!("http://{}", listener.local_addr().expect("local_addr"));
    let app = gateway::router(GatewayState::new(Arc::new(env), base.clone()));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    base
}

async fn post(url: String, body: &Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .expect("request");
    let status = resp.status().as_u16();
    (status, resp.json().await.expect("JSON response"))
}

#[tokio::test]
async fn start_command_sends_welcome_with_buttons() {
    let mut upstream = Server::new_async().await;
    let send = upstream
        .mock("POST", "/botTOKEN/sendMessage")
        .match_body(Matcher::PartialJson(json!({
            "chat_id": 42,
            "text": "Hello there",
            "parse_mode": "HTML",
            "reply_markup": {"inline_keyboard": [[
                {"text": "Да", "callback_data": "yes"},
                {"text": "Нет", "callback_data": "no"}
            ]]}
        })))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .create_async()
        .await;

    let mut env = full_env(&upstream);
    env.insert(WELCOME_MESSAGE.to_string(), "Hello there".to_string());
    let base = start_gateway(env).await;

    let (status, body) = post(
        format!("{}/telegram/webhook", base),
        &json!({"update_id": 1, "message": {
            "message_id": 1, "text": "/start", "chat": {"id": 42}
        }}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"success": true}));
    send.assert_async().await;
}

#[tokio::test]
async fn yes_button_notifies_agent_and_thanks_user() {
    let mut upstream = Server::new_async().await;
    let agent = upstream
        .mock("POST", "/v2/contact/message")
        .match_header("authorization", "Bearer RIO")
        .match_body(Matcher::PartialJson(json!({
            "channelId": 555,
            "contactId": 7,
            "message": {"type": "text", "text": canned::CHOSE_YES}
        })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let answer = upstream
        .mock("POST", "/botTOKEN/answerCallbackQuery")
        .match_body(Matcher::PartialJson(json!({"callback_query_id": "cb1"})))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":true}"#)
        .create_async()
        .await;
    let thanks = upstream
        .mock("POST", "/botTOKEN/sendMessage")
        .match_body(Matcher::PartialJson(json!({"chat_id": 7, "text": canned::REPLY_YES})))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .create_async()
        .await;

    let base = start_gateway(full_env(&upstream)).await;
    let (status, body) = post(
        format!("{}/telegram/webhook", base),
        &json!({"callback_query": {
            "id": "cb1",
            "from": {"id": 7},
            "data": "yes",
            "message": {"chat": {"id": 7}}
        }}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"success": true}));
    agent.assert_async().await;
    answer.assert_async().await;
    thanks.assert_async().await;
}

#[tokio::test]
async fn agent_text_is_delivered_to_contact_chat() {
    let mut upstream = Server::new_async().await;
    let send = upstream
        .mock("POST", "/botTOKEN/sendMessage")
        .match_body(Matcher::PartialJson(json!({"chat_id": 99, "text": "hi"})))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .create_async()
        .await;

    // Only the bot token is needed for this direction.
    let env: HashMap<String, String> = [
        (TELEGRAM_BOT_TOKEN.to_string(), "TOKEN".to_string()),
        (TELEGRAM_API_BASE.to_string(), upstream.url()),
    ]
    .into_iter()
    .collect();
    let base = start_gateway(env).await;

    let (status, body) = post(
        format!("{}/respond-io/webhook", base),
        &json!({"event": "message", "message": {"type": "text", "contactId": 99, "text": "hi"}}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"success": true}));
    send.assert_async().await;
}

#[tokio::test]
async fn get_on_webhooks_is_method_not_allowed() {
    let upstream = Server::new_async().await;
    let base = start_gateway(full_env(&upstream)).await;
    for path in ["/telegram/webhook", "/respond-io/webhook"] {
        let resp = reqwest::get(format!("{}{}", base, path)).await.expect("request");
        assert_eq!(resp.status().as_u16(), 405, "{}", path);
        let body: Value = resp.json().await.expect("JSON response");
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }
}

#[tokio::test]
async fn missing_credentials_name_the_variable() {
    let upstream = Server::new_async().await;
    let base = start_gateway(HashMap::new()).await;
    for path in ["/telegram/webhook", "/respond-io/webhook"] {
        let (status, body) = post(format!("{}{}", base, path), &json!({})).await;
        assert_eq!(status, 500, "{}", path);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(
            body["message"],
            "TELEGRAM_BOT_TOKEN environment variable is required"
        );
    }

    let mut env = full_env(&upstream);
    env.remove(RESPOND_IO_CHANNEL_ID);
    let base = start_gateway(env).await;
    let (status, body) = post(format!("{}/telegram/webhook", base), &json!({})).await;
    assert_eq!(status, 500);
    assert_eq!(
        body["message"],
        "RESPOND_IO_CHANNEL_ID environment variable is required"
    );
}

#[tokio::test]
async fn telegram_signature_is_enforced_when_secret_is_set() {
    let upstream = Server::new_async().await;
    let mut env = full_env(&upstream);
    env.insert(TELEGRAM_SECRET_TOKEN.to_string(), "s3cret".to_string());
    let base = start_gateway(env).await;
    let url = format!("{}/telegram/webhook", base);
    let raw = br#"{"update_id":5}"#.to_vec();
    let client = reqwest::Client::new();

    for provided in [None, Some("s3cret".to_string())] {
        let mut req = client.post(&url).body(raw.clone());
        if let Some(p) = provided {
            req = req.header(TELEGRAM_SIGNATURE_HEADER, p);
        }
        let resp = req.send().await.expect("request");
        assert_eq!(resp.status().as_u16(), 401);
        let body: Value = resp.json().await.expect("JSON response");
        assert_eq!(body, json!({"error": "Invalid signature"}));
    }

    let signature = gateway::telegram_signature("s3cret", &raw).expect("signature");
    let resp = client
        .post(&url)
        .header(TELEGRAM_SIGNATURE_HEADER, signature)
        .body(raw)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn malformed_body_is_a_server_error() {
    let upstream = Server::new_async().await;
    let base = start_gateway(full_env(&upstream)).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/telegram/webhook", base))
        .body("not json")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.expect("JSON response");
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn rejected_text_gets_unauthorized_reply_after_all_shapes() {
    let mut upstream = Server::new_async().await;
    let attempts = upstream
        .mock("POST", "/v2/contact/message")
        .with_status(401)
        .with_body(r#"{"message":"Unauthorized"}"#)
        .expect(3)
        .create_async()
        .await;
    let reply = upstream
        .mock("POST", "/botTOKEN/sendMessage")
        .match_body(Matcher::PartialJson(
            json!({"chat_id": 10, "text": canned::TEXT_UNAUTHORIZED}),
        ))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .create_async()
        .await;

    let base = start_gateway(full_env(&upstream)).await;
    let (status, _) = post(
        format!("{}/telegram/webhook", base),
        &json!({"message": {"text": "help", "chat": {"id": 10}, "from": {"id": 10}}}),
    )
    .await;
    assert_eq!(status, 200);
    attempts.assert_async().await;
    reply.assert_async().await;
}

#[tokio::test]
async fn failed_apology_is_a_server_error() {
    let mut upstream = Server::new_async().await;
    let _attempts = upstream
        .mock("POST", "/v2/contact/message")
        .with_status(500)
        .create_async()
        .await;
    let _reply = upstream
        .mock("POST", "/botTOKEN/sendMessage")
        .with_status(500)
        .with_body("down")
        .create_async()
        .await;

    let base = start_gateway(full_env(&upstream)).await;
    let (status, body) = post(
        format!("{}/telegram/webhook", base),
        &json!({"message": {"text": "help", "chat": {"id": 10}}}),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn photo_is_downloaded_uploaded_and_sent() {
    let mut upstream = Server::new_async().await;
    let get_file = upstream
        .mock("GET", "/botTOKEN/getFile")
        .match_query(Matcher::UrlEncoded("file_id".into(), "large".into()))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{"file_id":"large","file_path":"photos/large.jpg"}}"#)
        .create_async()
        .await;
    let download = upstream
        .mock("GET", "/file/botTOKEN/photos/large.jpg")
        .with_status(200)
        .with_body("JPEGDATA")
        .create_async()
        .await;
    let upload = upstream
        .mock("POST", "/v2/media/upload")
        .match_header("authorization", "Bearer RIO")
        .match_body(Matcher::Regex(r#"filename="photo_\d+\.jpg""#.to_string()))
        .with_status(200)
        .with_body(r#"{"url":"https://cdn.example/photo.jpg"}"#)
        .create_async()
        .await;
    let send = upstream
        .mock("POST", "/v2/contact/message")
        .match_body(Matcher::PartialJson(json!({
            "channelId": 555,
            "contactId": "5",
            "message": {"type": "photo", "url": "https://cdn.example/photo.jpg", "caption": "cat"}
        })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let base = start_gateway(full_env(&upstream)).await;
    let (status, body) = post(
        format!("{}/telegram/webhook", base),
        &json!({"message": {
            "chat": {"id": 5},
            "from": {"id": 5},
            "caption": "cat",
            "photo": [{"file_id": "small"}, {"file_id": "large"}]
        }}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"success": true}));
    get_file.assert_async().await;
    download.assert_async().await;
    upload.assert_async().await;
    send.assert_async().await;
}
