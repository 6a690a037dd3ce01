use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub base_app_url: String,
    /// Enabled notification channels, e.g. ["email", "sms"].
    pub notify_channels: Vec<String>,
    pub sendgrid_api_key: String,
    pub sendgrid_from_email: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env_or_warn("SUPABASE_URL"),
            supabase_anon_key: env_or_warn("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_jwt_secret: env_or_warn("SUPABASE_JWT_SECRET"),
            base_app_url: env::var("BASE_APP_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            notify_channels: env::var("NOTIFY_CHANNELS")
                .unwrap_or_else(|_| "email".to_string())
                .split(',')
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
            sendgrid_api_key: env::var("SENDGRID_API_KEY").unwrap_or_default(),
            sendgrid_from_email: env::var("SENDGRID_FROM_EMAIL").unwrap_or_default(),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_from_number: env::var("TWILIO_FROM_NUMBER").unwrap_or_default(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.sendgrid_api_key.is_empty() && !self.sendgrid_from_email.is_empty()
    }

    pub fn is_sms_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_from_number.is_empty()
    }
}

fn env_or_warn(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}
