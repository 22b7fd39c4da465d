//! Webhook registration tests
//!
//! Uses a recording Bot API double for precondition checks and wiremock for
//! the wire format.

use rexctl::telegram::TelegramClient;
use rexctl::webhook::{SECRET_KEY, SecretOrigin};
use rexctl::{EnvRecord, Error, RegisterOptions, WebhookRegistrar};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{RecordingBotApi, config_from, write_env};

const TOKEN: &str = "123456:test-token";

fn full_env() -> String {
    format!(
        "# Rex\nTELEGRAM_BOT_TOKEN={TOKEN}\nPUBLIC_URL=https://example.ngrok.app/\nBOT_PATH=/telegram/webhook\n"
    )
}

#[tokio::test]
async fn missing_token_aborts_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let content = "PUBLIC_URL=https://example.ngrok.app\n";
    let env = write_env(dir.path(), content);
    let config = config_from(&env);
    let api = RecordingBotApi::default();

    let err = WebhookRegistrar::new(&api, &config)
        .register(RegisterOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingSetting("TELEGRAM_BOT_TOKEN")));
    assert_eq!(err.to_string(), "TELEGRAM_BOT_TOKEN is not set");
    assert!(api.calls().await.is_empty());
    assert_eq!(std::fs::read_to_string(&env).unwrap(), content);
}

#[tokio::test]
async fn missing_public_url_leaves_env_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let content = format!("TELEGRAM_BOT_TOKEN={TOKEN}\n");
    let env = write_env(dir.path(), &content);
    let config = config_from(&env);
    let api = RecordingBotApi::default();

    let err = WebhookRegistrar::new(&api, &config)
        .register(RegisterOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingSetting("PUBLIC_URL")));
    assert!(api.calls().await.is_empty());
    assert_eq!(std::fs::read_to_string(&env).unwrap(), content);
}

#[tokio::test]
async fn registration_persists_and_reuses_secret() {
    let dir = tempfile::tempdir().unwrap();
    let env = write_env(dir.path(), &full_env());
    let config = config_from(&env);
    let api = RecordingBotApi::default();
    let registrar = WebhookRegistrar::new(&api, &config);

    let first = registrar.register(RegisterOptions::default()).await.unwrap();
    assert_eq!(first.secret_origin, SecretOrigin::Generated);

    let second = registrar.register(RegisterOptions::default()).await.unwrap();
    assert_eq!(second.secret_origin, SecretOrigin::Existing);
    assert_eq!(first.webhook_url, second.webhook_url);

    let record = EnvRecord::load(&env).unwrap();
    let secret = record.get(SECRET_KEY).unwrap();
    assert_eq!(
        first.webhook_url,
        format!("https://example.ngrok.app/telegram/webhook?secret={secret}")
    );

    let content = std::fs::read_to_string(&env).unwrap();
    assert_eq!(content.matches("WEBHOOK_SECRET=").count(), 1);
    assert!(content.starts_with("# Rex\n"));

    let requests = api.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].allowed_updates, ["message", "callback_query"]);
    assert!(requests[0].secret_token.is_none());
}

#[tokio::test]
async fn secret_header_option_sends_secret_token() {
    let dir = tempfile::tempdir().unwrap();
    let env = write_env(
        dir.path(),
        &format!("{}WEBHOOK_SECRET=known-secret\n", full_env()),
    );
    let config = config_from(&env);
    let api = RecordingBotApi::default();

    WebhookRegistrar::new(&api, &config)
        .register(RegisterOptions {
            secret_header: true,
            drop_pending_updates: true,
        })
        .await
        .unwrap();

    let requests = api.requests().await;
    assert_eq!(requests[0].secret_token.as_deref(), Some("known-secret"));
    assert!(requests[0].drop_pending_updates);
}

#[tokio::test]
async fn unregister_needs_only_the_token() {
    let dir = tempfile::tempdir().unwrap();
    let env = write_env(dir.path(), &format!("TELEGRAM_BOT_TOKEN={TOKEN}\n"));
    let config = config_from(&env);
    let api = RecordingBotApi::default();

    let result = WebhookRegistrar::new(&api, &config).unregister().await.unwrap();

    assert_eq!(api.calls().await, ["deleteWebhook", "getWebhookInfo"]);
    assert_eq!(result.delete.method, "deleteWebhook");
    assert_eq!(result.info.method, "getWebhookInfo");
}

#[tokio::test]
async fn set_webhook_sends_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/setWebhook")))
        .and(body_string_contains(
            "url=https%3A%2F%2Fexample.ngrok.app%2Ftelegram%2Fwebhook%3Fsecret%3Dabc123",
        ))
        .and(body_string_contains("allowed_updates%5B%5D=message"))
        .and(body_string_contains("allowed_updates%5B%5D=callback_query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"ok":true,"result":true,"description":"Webhook was set"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let env = write_env(
        dir.path(),
        &format!("{}WEBHOOK_SECRET=abc123\n", full_env()),
    );
    let config = config_from(&env);
    let client = TelegramClient::new(TOKEN, server.uri(), reqwest::Client::new());

    let registration = WebhookRegistrar::new(&client, &config)
        .register(RegisterOptions::default())
        .await
        .unwrap();

    assert_eq!(registration.reply.status, 200);
    assert!(registration.reply.body.contains("Webhook was set"));
    registration.reply.ensure_ok().unwrap();
}

#[tokio::test]
async fn rejection_is_returned_and_fails_strict_check() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/setWebhook")))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: bad webhook: HTTPS url must be provided for webhook"}"#,
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let env = write_env(dir.path(), &full_env());
    let config = config_from(&env);
    let client = TelegramClient::new(TOKEN, server.uri(), reqwest::Client::new());

    let registration = WebhookRegistrar::new(&client, &config)
        .register(RegisterOptions::default())
        .await
        .unwrap();

    assert_eq!(registration.reply.status, 400);
    assert_eq!(registration.reply.ok(), Some(false));

    let err = registration.reply.ensure_ok().unwrap_err();
    assert!(matches!(err, Error::Telegram(_)));
    assert!(err.to_string().contains("HTTPS url must be provided"));
}

#[tokio::test]
async fn delete_then_info_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/deleteWebhook")))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true,"result":true}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getWebhookInfo")))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"ok":true,"result":{"url":"","has_custom_certificate":false,"pending_update_count":0}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let env = write_env(dir.path(), &format!("TELEGRAM_BOT_TOKEN={TOKEN}\n"));
    let config = config_from(&env);
    let client = TelegramClient::new(TOKEN, server.uri(), reqwest::Client::new());

    let result = WebhookRegistrar::new(&client, &config).unregister().await.unwrap();

    let info = result
        .info
        .envelope::<rexctl::telegram::WebhookInfo>()
        .and_then(|r| r.result)
        .unwrap();
    assert!(info.url.is_empty());
    assert_eq!(info.pending_update_count, 0);
}
