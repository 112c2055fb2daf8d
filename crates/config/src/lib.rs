use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use visionpay_core::messages::ContentSettings;

const APP_NAME: &str = "visionpay";
const KEYCHAIN_SERVICE: &str = "visionpay.credentials";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub pushcut: PushcutConfig,
    #[serde(default)]
    pub content: ContentSettings,
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_kind")]
    pub kind: String, // "mock" | "e2payments"
    pub base_url: Option<String>,
    pub client_id: Option<String>,
    pub mpesa_wallet_id: Option<String>,
    pub emola_wallet_id: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: default_gateway_kind(),
            base_url: None,
            client_id: None,
            mpesa_wallet_id: None,
            emola_wallet_id: None,
        }
    }
}

fn default_gateway_kind() -> String {
    "mock".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    #[serde(default = "default_store_kind")]
    pub kind: String, // "sled" | "firestore"
    pub path: String,
    pub firestore_base_url: Option<String>,
    pub project_id: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            path: ".visionpay_store".to_string(),
            firestore_base_url: None,
            project_id: None,
        }
    }
}

fn default_store_kind() -> String {
    "sled".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// `None` disables the audit trail.
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: Some("audit.jsonl".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub graph_url: Option<String>,
    pub pixel_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub from: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub base_url: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub range: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            spreadsheet_id: None,
            range: "A1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub base_url: Option<String>,
    pub sender: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            sender: "ServiceSMS".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZapiInstance {
    pub instance_id: String,
    pub instance_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub base_url: Option<String>,
    /// Instance used for purchase confirmations.
    pub confirmation: Option<ZapiInstance>,
    /// Instance used for failed-payment recovery messages.
    pub recovery: Option<ZapiInstance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushcutConfig {
    /// Notification URLs triggered, in order, after a confirmed sale.
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub delay_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self { delay_secs: 120 }
    }
}

/// Credentials never written to the config file.
#[derive(Clone, Default)]
pub struct Secrets {
    pub mpesa_token: Option<String>,
    pub emola_token: Option<String>,
    pub fb_access_token: Option<String>,
    pub email_api_key: Option<String>,
    pub google_access_token: Option<String>,
    pub firestore_access_token: Option<String>,
    pub infobip_api_key: Option<String>,
    pub zapi_client_token: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |v: &Option<String>| if v.is_some() { "set" } else { "missing" };
        f.debug_struct("Secrets")
            .field("mpesa_token", &set(&self.mpesa_token))
            .field("emola_token", &set(&self.emola_token))
            .field("fb_access_token", &set(&self.fb_access_token))
            .field("email_api_key", &set(&self.email_api_key))
            .field("google_access_token", &set(&self.google_access_token))
            .field("firestore_access_token", &set(&self.firestore_access_token))
            .field("infobip_api_key", &set(&self.infobip_api_key))
            .field("zapi_client_token", &set(&self.zapi_client_token))
            .finish()
    }
}

/// Points the service at an explicit config file instead of the per-user one.
pub const CONFIG_PATH_ENV: &str = "VISIONPAY_CONFIG";

pub fn load() -> Result<AppConfig> {
    let cfg: AppConfig = confy::load(APP_NAME, None).context("Failed to load app config")?;
    Ok(cfg)
}

/// Loads the config file at `path`. A missing file is created with defaults;
/// a file that exists but does not parse is an error.
pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let cfg: AppConfig = confy::load_path(path)
        .with_context(|| format!("Failed to load app config from {}", path.display()))?;
    Ok(cfg)
}

/// Config file overlaid with process environment variables.
pub fn load_with_env() -> Result<AppConfig> {
    let mut cfg = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => load_from(path)?,
        _ => load()?,
    };
    apply_env(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

/// Overlays deployment variables onto `cfg`. Empty values are ignored.
pub fn apply_env<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
        cfg.server.port = port;
    }
    if let Some(v) = get("BIND_ADDR") {
        cfg.server.bind = v;
    }

    if let Some(v) = get("GATEWAY_KIND") {
        cfg.gateway.kind = v;
    }
    set_opt(&mut cfg.gateway.base_url, get("GATEWAY_BASE_URL"));
    set_opt(&mut cfg.gateway.client_id, get("CLIENT_ID"));
    set_opt(&mut cfg.gateway.mpesa_wallet_id, get("MPESA_WALLET_ID"));
    set_opt(&mut cfg.gateway.emola_wallet_id, get("EMOLA_WALLET_ID"));

    if let Some(v) = get("STORE_KIND") {
        cfg.store.kind = v;
    }
    if let Some(v) = get("STORE_PATH") {
        cfg.store.path = v;
    }
    set_opt(&mut cfg.store.project_id, get("FIREBASE_PROJECT_ID"));
    set_opt(&mut cfg.store.firestore_base_url, get("FIRESTORE_BASE_URL"));

    if let Some(v) = get("AUDIT_LOG_PATH") {
        cfg.audit.path = if v == "off" { None } else { Some(v) };
    }

    set_opt(&mut cfg.tracking.pixel_id, get("FB_PIXEL_ID"));
    set_opt(&mut cfg.tracking.graph_url, get("FB_GRAPH_URL"));

    set_opt(&mut cfg.mail.from, get("EMAIL_USER"));
    set_opt(&mut cfg.mail.api_url, get("EMAIL_API_URL"));

    set_opt(&mut cfg.sheets.spreadsheet_id, get("SHEETS_SPREADSHEET_ID"));
    set_opt(&mut cfg.sheets.base_url, get("SHEETS_BASE_URL"));

    set_opt(&mut cfg.sms.base_url, get("INFOBIP_BASE_URL"));
    if let Some(v) = get("SMS_SENDER") {
        cfg.sms.sender = v;
    }

    set_opt(&mut cfg.whatsapp.base_url, get("ZAPI_BASE_URL"));
    if let (Some(instance_id), Some(instance_token)) =
        (get("ZAPI_INSTANCE_ID"), get("ZAPI_INSTANCE_TOKEN"))
    {
        cfg.whatsapp.confirmation = Some(ZapiInstance {
            instance_id,
            instance_token,
        });
    }
    if let (Some(instance_id), Some(instance_token)) = (
        get("ZAPI_RECOVERY_INSTANCE_ID"),
        get("ZAPI_RECOVERY_INSTANCE_TOKEN"),
    ) {
        cfg.whatsapp.recovery = Some(ZapiInstance {
            instance_id,
            instance_token,
        });
    }

    if let Some(v) = get("PUSHCUT_URLS") {
        cfg.pushcut.urls = v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    if let Some(secs) = get("RECOVERY_DELAY_SECS").and_then(|s| s.parse().ok()) {
        cfg.recovery.delay_secs = secs;
    }
}

fn set_opt(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Resolves credentials from the environment, falling back to the OS keychain.
pub fn resolve_secrets() -> Secrets {
    let get = |env_key: &str, keychain_key: &str| {
        std::env::var(env_key)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| get_secret(keychain_key).ok())
    };
    Secrets {
        mpesa_token: get("MPESA_TOKEN", "mpesa_token"),
        emola_token: get("EMOLA_TOKEN", "emola_token"),
        fb_access_token: get("FB_ACCESS_TOKEN", "fb_access_token"),
        email_api_key: get("EMAIL_API_KEY", "email_api_key"),
        google_access_token: get("GOOGLE_ACCESS_TOKEN", "google_access_token"),
        firestore_access_token: get("FIRESTORE_ACCESS_TOKEN", "firestore_access_token")
            .or_else(|| get("GOOGLE_ACCESS_TOKEN", "google_access_token")),
        infobip_api_key: get("INFOBIP_API_KEY", "infobip_api_key"),
        zapi_client_token: get("ZAPI_CLIENT_TOKEN", "zapi_client_token"),
    }
}

/// Reads a credential from the `visionpay.credentials` keychain service.
pub fn get_secret(key: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    let password = entry.get_password()?;
    Ok(password)
}
