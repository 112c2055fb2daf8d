use gateway::PaymentGateway;
use integrations::mail::MailClient;
use integrations::push::PushNotifier;
use integrations::sheets::SheetsClient;
use integrations::sms::SmsClient;
use integrations::tracking::ConversionTracker;
use integrations::whatsapp::WhatsAppClient;
use std::sync::Arc;
use std::time::Duration;
use store::audit::AuditLog;
use store::DocumentStore;
use visionpay_core::messages::ContentSettings;

use crate::sms_ledger::SmsLedger;

pub const DEFAULT_RECOVERY_DELAY: Duration = Duration::from_secs(120);

/// Everything a request handler needs. Optional integrations that are not
/// configured are skipped silently.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn PaymentGateway>,
    pub store: Arc<dyn DocumentStore>,
    pub audit: AuditLog,
    pub tracker: Option<Arc<ConversionTracker>>,
    pub mail: Option<Arc<MailClient>>,
    pub sheets: Option<Arc<SheetsClient>>,
    pub sms: Option<Arc<SmsClient>>,
    pub whatsapp: Option<Arc<WhatsAppClient>>,
    pub recovery_whatsapp: Option<Arc<WhatsAppClient>>,
    pub push: Option<Arc<PushNotifier>>,
    pub sms_ledger: SmsLedger,
    pub content: ContentSettings,
    pub recovery_delay: Duration,
}

impl AppState {
    pub fn new(gateway: Arc<dyn PaymentGateway>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            gateway,
            store,
            audit: AuditLog::disabled(),
            tracker: None,
            mail: None,
            sheets: None,
            sms: None,
            whatsapp: None,
            recovery_whatsapp: None,
            push: None,
            sms_ledger: SmsLedger::default(),
            content: ContentSettings::default(),
            recovery_delay: DEFAULT_RECOVERY_DELAY,
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<ConversionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_mail(mut self, mail: Arc<MailClient>) -> Self {
        self.mail = Some(mail);
        self
    }

    pub fn with_sheets(mut self, sheets: Arc<SheetsClient>) -> Self {
        self.sheets = Some(sheets);
        self
    }

    pub fn with_sms(mut self, sms: Arc<SmsClient>) -> Self {
        self.sms = Some(sms);
        self
    }

    pub fn with_whatsapp(mut self, whatsapp: Arc<WhatsAppClient>) -> Self {
        self.whatsapp = Some(whatsapp);
        self
    }

    pub fn with_recovery_whatsapp(mut self, whatsapp: Arc<WhatsAppClient>) -> Self {
        self.recovery_whatsapp = Some(whatsapp);
        self
    }

    pub fn with_push(mut self, push: Arc<PushNotifier>) -> Self {
        self.push = Some(push);
        self
    }

    pub fn with_content(mut self, content: ContentSettings) -> Self {
        self.content = content;
        self
    }

    pub fn with_recovery_delay(mut self, delay: Duration) -> Self {
        self.recovery_delay = delay;
        self
    }
}
