pub mod channels;
pub mod fanout;

pub use channels::{EmailAlert, EmailChannel, HttpEmailGateway, HttpSmsGateway, SmsAlert, SmsChannel};
pub use fanout::{ContactRecipient, Notifier, NotifyConfig, StationRecipient, TicketAlert, normalize_phone};
