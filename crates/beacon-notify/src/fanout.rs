use std::sync::Arc;

use futures_util::future::{BoxFuture, join_all};
use tracing::{info, warn};
use uuid::Uuid;

use crate::channels::{EmailAlert, EmailChannel, SmsAlert, SmsChannel};

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub sms_enabled: bool,
    /// National dialing prefix applied to bare 10-digit numbers, e.g. "+91".
    pub country_prefix: String,
    /// Base URL for ticket deep links, e.g. "https://app.example".
    pub deep_link_base: String,
}

/// Fan-out input describing the SOS that was just raised.
#[derive(Debug, Clone)]
pub struct TicketAlert {
    pub ticket_id: Uuid,
    pub alerter_name: String,
    /// Seed coordinates of the SOS, carried as geo context in email alerts.
    pub latitude: f64,
    pub longitude: f64,
}

/// Fan-out input for one emergency contact.
#[derive(Debug, Clone)]
pub struct ContactRecipient {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// Fan-out input for the resolved responding station.
#[derive(Debug, Clone)]
pub struct StationRecipient {
    pub name: String,
    pub email: String,
}

/// Normalize a phone number to the configured national prefix.
/// Already-prefixed numbers pass through; bare 10-digit numbers get the
/// prefix; anything else is unsupported and skipped by the caller.
pub fn normalize_phone(raw: &str, prefix: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.starts_with(prefix) {
        return Some(raw.to_string());
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 && digits.len() == raw.len() {
        Some(format!("{}{}", prefix, digits))
    } else {
        None
    }
}

/// Dispatches SOS alerts: the station first, awaited sequentially, then one
/// parallel batch covering every contact's SMS and email sends.
///
/// Contract: never returns an error. Every per-recipient failure is caught,
/// logged and isolated — it must not cancel sibling sends or surface to the
/// handler that triggered ticket creation.
pub struct Notifier {
    sms: Arc<dyn SmsChannel>,
    email: Arc<dyn EmailChannel>,
    config: NotifyConfig,
}

impl Notifier {
    pub fn new(sms: Arc<dyn SmsChannel>, email: Arc<dyn EmailChannel>, config: NotifyConfig) -> Self {
        Self { sms, email, config }
    }

    pub async fn notify_all(
        &self,
        alert: &TicketAlert,
        station: Option<StationRecipient>,
        contacts: Vec<ContactRecipient>,
    ) {
        let ticket_id = alert.ticket_id;
        let alerter_name = alert.alerter_name.as_str();
        let link = format!(
            "{}/ticket/{}",
            self.config.deep_link_base.trim_end_matches('/'),
            ticket_id
        );
        let geo = format!("{:.6}, {:.6}", alert.latitude, alert.longitude);

        // Authorities are alerted before (or in the same breath as) personal
        // contacts. Delivery failure does not block the rest of the fan-out.
        if let Some(st) = station {
            let alert = EmailAlert {
                to: st.email,
                subject: format!("SOS alert: {} needs help", alerter_name),
                body: format!(
                    "{} raised an SOS alert. Ticket: {}\nLast known location: {}\nLive details: {}",
                    alerter_name, ticket_id, geo, link
                ),
            };
            if let Err(e) = self.email.send(alert).await {
                warn!("Station alert for ticket {} failed: {}", ticket_id, e);
            } else {
                info!("Station {} alerted for ticket {}", st.name, ticket_id);
            }
        }

        let mut sends: Vec<BoxFuture<'_, ()>> = Vec::new();
        let mut skipped = 0usize;

        for contact in &contacts {
            if self.config.sms_enabled {
                match normalize_phone(&contact.phone, &self.config.country_prefix) {
                    Some(to) => {
                        let alert = SmsAlert {
                            to,
                            sender_name: alerter_name.to_string(),
                            link: link.clone(),
                        };
                        let name = contact.name.clone();
                        sends.push(Box::pin(async move {
                            if let Err(e) = self.sms.send(alert).await {
                                warn!("SMS alert to {} failed: {}", name, e);
                            }
                        }));
                    }
                    None => {
                        // unsupported numbering plan — skip, never fail the batch
                        warn!(
                            "Skipping SMS for contact {}: unsupported number {:?}",
                            contact.name, contact.phone
                        );
                        skipped += 1;
                    }
                }
            }

            if let Some(email) = &contact.email {
                let alert = EmailAlert {
                    to: email.clone(),
                    subject: format!("SOS alert: {} needs help", alerter_name),
                    body: format!(
                        "{} raised an SOS alert and listed you as an emergency contact.\nLast known location: {}\nTrack their location and evidence: {}",
                        alerter_name, geo, link
                    ),
                };
                let name = contact.name.clone();
                sends.push(Box::pin(async move {
                    if let Err(e) = self.email.send(alert).await {
                        warn!("Email alert to {} failed: {}", name, e);
                    }
                }));
            }
        }

        let dispatched = sends.len();
        join_all(sends).await;
        info!(
            "Fan-out for ticket {} complete: {} sends issued, {} numbers skipped",
            ticket_id, dispatched, skipped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSms {
        sent: Mutex<Vec<SmsAlert>>,
        fail_for: Option<String>,
    }

    impl SmsChannel for RecordingSms {
        fn send(&self, alert: SmsAlert) -> futures_util::future::BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async move {
                if self.fail_for.as_deref() == Some(alert.to.as_str()) {
                    anyhow::bail!("gateway rejected {}", alert.to);
                }
                self.sent.lock().unwrap().push(alert);
                Ok(())
            })
        }
    }

    #[derive(Default)]
    struct RecordingEmail {
        sent: Mutex<Vec<EmailAlert>>,
    }

    impl EmailChannel for RecordingEmail {
        fn send(&self, alert: EmailAlert) -> futures_util::future::BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(alert);
                Ok(())
            })
        }
    }

    fn config() -> NotifyConfig {
        NotifyConfig {
            sms_enabled: true,
            country_prefix: "+91".to_string(),
            deep_link_base: "https://app.example/".to_string(),
        }
    }

    fn sos() -> TicketAlert {
        TicketAlert {
            ticket_id: Uuid::new_v4(),
            alerter_name: "Asha".into(),
            latitude: 28.6139,
            longitude: 77.2090,
        }
    }

    fn contacts() -> Vec<ContactRecipient> {
        vec![
            ContactRecipient {
                name: "C1".into(),
                phone: "9876543210".into(),
                email: Some("c1@example.com".into()),
            },
            ContactRecipient {
                name: "C2".into(),
                phone: "+919812345678".into(),
                email: None,
            },
        ]
    }

    #[test]
    fn normalizes_ten_digit_numbers() {
        assert_eq!(normalize_phone("9876543210", "+91").as_deref(), Some("+919876543210"));
        assert_eq!(normalize_phone("+919876543210", "+91").as_deref(), Some("+919876543210"));
        assert_eq!(normalize_phone("12345", "+91"), None);
        assert_eq!(normalize_phone("+4479460958", "+91"), None);
        assert_eq!(normalize_phone("98-76-54", "+91"), None);
    }

    #[tokio::test]
    async fn dispatches_two_sms_and_one_email() {
        let sms = Arc::new(RecordingSms::default());
        let email = Arc::new(RecordingEmail::default());
        let notifier = Notifier::new(sms.clone(), email.clone(), config());

        notifier.notify_all(&sos(), None, contacts()).await;

        assert_eq!(sms.sent.lock().unwrap().len(), 2);
        let emails = email.sent.lock().unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "c1@example.com");
        assert!(emails[0].subject.contains("Asha"));
    }

    #[tokio::test]
    async fn emails_carry_the_sos_location() {
        let sms = Arc::new(RecordingSms::default());
        let email = Arc::new(RecordingEmail::default());
        let notifier = Notifier::new(sms, email.clone(), config());

        let station = StationRecipient {
            name: "Central PS".into(),
            email: "central@police.example".into(),
        };
        notifier.notify_all(&sos(), Some(station), contacts()).await;

        let emails = email.sent.lock().unwrap();
        assert_eq!(emails.len(), 2);
        for sent in emails.iter() {
            assert!(sent.body.contains("28.613900, 77.209000"), "body: {}", sent.body);
        }
    }

    #[tokio::test]
    async fn channel_failure_does_not_cancel_siblings() {
        let sms = Arc::new(RecordingSms {
            sent: Mutex::new(vec![]),
            fail_for: Some("+919876543210".to_string()), // C1's number
        });
        let email = Arc::new(RecordingEmail::default());
        let notifier = Notifier::new(sms.clone(), email.clone(), config());

        notifier.notify_all(&sos(), None, contacts()).await;

        // C1's SMS failed; C2's SMS and C1's email still completed
        let sent = sms.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "+919812345678");
        assert_eq!(email.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn station_is_alerted_before_contacts() {
        let sms = Arc::new(RecordingSms::default());
        let email = Arc::new(RecordingEmail::default());
        let notifier = Notifier::new(sms.clone(), email.clone(), config());

        let station = StationRecipient {
            name: "Central PS".into(),
            email: "central@police.example".into(),
        };
        let alert = sos();
        notifier.notify_all(&alert, Some(station), contacts()).await;

        let emails = email.sent.lock().unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].to, "central@police.example");
        assert!(emails[0].body.contains(&alert.ticket_id.to_string()));
    }

    #[tokio::test]
    async fn unsupported_numbers_are_skipped_not_fatal() {
        let sms = Arc::new(RecordingSms::default());
        let email = Arc::new(RecordingEmail::default());
        let notifier = Notifier::new(sms.clone(), email.clone(), config());

        let contacts = vec![ContactRecipient {
            name: "Overseas".into(),
            phone: "+4479460958".into(),
            email: Some("o@example.com".into()),
        }];
        notifier.notify_all(&sos(), None, contacts).await;

        assert_eq!(sms.sent.lock().unwrap().len(), 0);
        assert_eq!(email.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sms_disabled_still_sends_email() {
        let sms = Arc::new(RecordingSms::default());
        let email = Arc::new(RecordingEmail::default());
        let mut cfg = config();
        cfg.sms_enabled = false;
        let notifier = Notifier::new(sms.clone(), email.clone(), cfg);

        notifier.notify_all(&sos(), None, contacts()).await;

        assert_eq!(sms.sent.lock().unwrap().len(), 0);
        assert_eq!(email.sent.lock().unwrap().len(), 1);
    }
}
