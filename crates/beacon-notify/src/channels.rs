use futures_util::future::BoxFuture;

/// One SMS-channel alert. `link` deep-links into the ticket detail view.
#[derive(Debug, Clone)]
pub struct SmsAlert {
    pub to: String,
    pub sender_name: String,
    pub link: String,
}

/// One email-channel alert.
#[derive(Debug, Clone)]
pub struct EmailAlert {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery channels are fire-and-log: callers never consume a return value
/// beyond logging the error. Trait objects so tests can inject mocks.
pub trait SmsChannel: Send + Sync {
    fn send(&self, alert: SmsAlert) -> BoxFuture<'_, anyhow::Result<()>>;
}

pub trait EmailChannel: Send + Sync {
    fn send(&self, alert: EmailAlert) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// SMS gateway reached over HTTP with a bearer token.
pub struct HttpSmsGateway {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl HttpSmsGateway {
    pub fn new(http: reqwest::Client, url: String, token: String) -> Self {
        Self { http, url, token }
    }
}

impl SmsChannel for HttpSmsGateway {
    fn send(&self, alert: SmsAlert) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            let resp = self
                .http
                .post(&self.url)
                .bearer_auth(&self.token)
                .json(&serde_json::json!({
                    "to": alert.to,
                    "sender_name": alert.sender_name,
                    "link": alert.link,
                }))
                .send()
                .await?;

            if !resp.status().is_success() {
                anyhow::bail!("SMS gateway returned {}", resp.status());
            }
            Ok(())
        })
    }
}

pub struct HttpEmailGateway {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl HttpEmailGateway {
    pub fn new(http: reqwest::Client, url: String, token: String) -> Self {
        Self { http, url, token }
    }
}

impl EmailChannel for HttpEmailGateway {
    fn send(&self, alert: EmailAlert) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            let resp = self
                .http
                .post(&self.url)
                .bearer_auth(&self.token)
                .json(&serde_json::json!({
                    "to": alert.to,
                    "subject": alert.subject,
                    "body": alert.body,
                }))
                .send()
                .await?;

            if !resp.status().is_success() {
                anyhow::bail!("Email gateway returned {}", resp.status());
            }
            Ok(())
        })
    }
}
