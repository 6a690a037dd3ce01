use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::services::providers::{SendGridProvider, TwilioProvider};

#[tokio::test]
async fn sendgrid_posts_plain_text_mail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("authorization", "Bearer sg-test-key"))
        .and(body_string_contains("jo@example.com"))
        .and(body_string_contains("Appointment Request Received"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = SendGridProvider::with_base_url(
        "sg-test-key",
        "clinic@example.com",
        &mock_server.uri(),
    );

    provider
        .send_email(
            "jo@example.com",
            "Appointment Request Received - E-Booklet",
            "Hello Jo",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn sendgrid_failure_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&mock_server)
        .await;

    let provider =
        SendGridProvider::with_base_url("wrong-key", "clinic@example.com", &mock_server.uri());

    let err = provider
        .send_email("jo@example.com", "subject", "body")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("SendGrid error"));
}

#[tokio::test]
async fn unconfigured_sendgrid_refuses_to_send() {
    let provider = SendGridProvider::new("", "");
    let err = provider
        .send_email("jo@example.com", "subject", "body")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not configured"));
}

#[tokio::test]
async fn twilio_posts_form_encoded_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(body_string_contains("To=%2B447700900000"))
        .and(body_string_contains("From=%2B15005550006"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = TwilioProvider::with_base_url(
        "AC123",
        "auth-token",
        "+15005550006",
        &mock_server.uri(),
    );

    provider
        .send_sms("+447700900000", "Your appointment has been approved!")
        .await
        .unwrap();
}

#[tokio::test]
async fn twilio_failure_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid number"))
        .mount(&mock_server)
        .await;

    let provider =
        TwilioProvider::with_base_url("AC123", "auth-token", "+15005550006", &mock_server.uri());

    let err = provider.send_sms("not-a-number", "hi").await.unwrap_err();
    assert!(err.to_string().contains("Twilio error"));
}
