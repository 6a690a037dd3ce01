use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::json;
use tracing::debug;

const SENDGRID_BASE_URL: &str = "https://api.sendgrid.com";
const TWILIO_BASE_URL: &str = "https://api.twilio.com";

/// Email delivery via the SendGrid v3 mail send endpoint.
pub struct SendGridProvider {
    client: Client,
    base_url: String,
    api_key: String,
    from_email: String,
}

impl SendGridProvider {
    pub fn new(api_key: &str, from_email: &str) -> Self {
        Self::with_base_url(api_key, from_email, SENDGRID_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, from_email: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.from_email.is_empty()
    }

    pub async fn send_email(&self, to_email: &str, subject: &str, body: &str) -> Result<()> {
        if !self.is_configured() {
            return Err(anyhow!("SendGrid not configured"));
        }

        let payload = json!({
            "personalizations": [{ "to": [{ "email": to_email }] }],
            "from": { "email": self.from_email },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }]
        });

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("SendGrid error ({}): {}", status, error_text));
        }

        debug!("Email sent to {}", to_email);
        Ok(())
    }
}

/// SMS delivery via the Twilio Messages endpoint.
pub struct TwilioProvider {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioProvider {
    pub fn new(account_sid: &str, auth_token: &str, from_number: &str) -> Self {
        Self::with_base_url(account_sid, auth_token, from_number, TWILIO_BASE_URL)
    }

    pub fn with_base_url(
        account_sid: &str,
        auth_token: &str,
        from_number: &str,
        base_url: &str,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }

    pub async fn send_sms(&self, to_number: &str, body: &str) -> Result<()> {
        if !self.is_configured() {
            return Err(anyhow!("Twilio not configured"));
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", self.from_number.as_str()), ("To", to_number), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Twilio error ({}): {}", status, error_text));
        }

        debug!("SMS sent to {}", to_number);
        Ok(())
    }
}
