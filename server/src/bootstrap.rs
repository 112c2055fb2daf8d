//! Wires configuration and secrets into an [`AppState`].

use anyhow::{anyhow, bail, Result};
use config::{AppConfig, Secrets, ZapiInstance};
use gateway::e2payments::{self, E2PaymentsClient, WalletCredentials};
use gateway::mock::MockGateway;
use gateway::PaymentGateway;
use integrations::mail::{self, MailClient};
use integrations::push::PushNotifier;
use integrations::sheets::{self, SheetsClient};
use integrations::sms::SmsClient;
use integrations::tracking::{self, ConversionTracker};
use integrations::whatsapp::{self, WhatsAppClient};
use std::sync::Arc;
use std::time::Duration;
use store::audit::AuditLog;
use store::firestore::{self, FirestoreStore};
use store::sled_store::SledStore;
use store::DocumentStore;

use crate::state::AppState;

pub fn build_state(cfg: &AppConfig, secrets: &Secrets) -> Result<AppState> {
    let mut state = AppState::new(create_gateway(cfg, secrets)?, create_store(cfg, secrets)?)
        .with_content(cfg.content.clone())
        .with_recovery_delay(Duration::from_secs(cfg.recovery.delay_secs));

    if let Some(path) = &cfg.audit.path {
        state = state.with_audit(AuditLog::new(path));
    }

    if let (Some(pixel_id), Some(token)) = (&cfg.tracking.pixel_id, &secrets.fb_access_token) {
        let base = cfg
            .tracking
            .graph_url
            .clone()
            .unwrap_or_else(|| tracking::DEFAULT_GRAPH_URL.to_string());
        state = state.with_tracker(ConversionTracker::new(base, pixel_id.clone(), token.clone()));
    } else {
        tracing::info!("Conversion tracking disabled");
    }

    if let (Some(from), Some(key)) = (&cfg.mail.from, &secrets.email_api_key) {
        let api_url = cfg
            .mail
            .api_url
            .clone()
            .unwrap_or_else(|| mail::DEFAULT_API_URL.to_string());
        state = state.with_mail(MailClient::new(api_url, key.clone(), from.clone()));
    } else {
        tracing::info!("Confirmation email disabled");
    }

    if let (Some(sheet_id), Some(token)) =
        (&cfg.sheets.spreadsheet_id, &secrets.google_access_token)
    {
        let base = cfg
            .sheets
            .base_url
            .clone()
            .unwrap_or_else(|| sheets::DEFAULT_BASE_URL.to_string());
        state = state.with_sheets(SheetsClient::new(
            base,
            sheet_id.clone(),
            cfg.sheets.range.clone(),
            token.clone(),
        ));
    } else {
        tracing::info!("Spreadsheet logging disabled");
    }

    if let (Some(base), Some(key)) = (&cfg.sms.base_url, &secrets.infobip_api_key) {
        state = state.with_sms(SmsClient::new(base.clone(), key.clone(), cfg.sms.sender.clone())?);
    } else {
        tracing::info!("SMS confirmation disabled");
    }

    if let Some(client_token) = &secrets.zapi_client_token {
        let base = cfg
            .whatsapp
            .base_url
            .clone()
            .unwrap_or_else(|| whatsapp::DEFAULT_BASE_URL.to_string());
        let client = |instance: &ZapiInstance| {
            WhatsAppClient::new(
                base.clone(),
                instance.instance_id.clone(),
                instance.instance_token.clone(),
                client_token.clone(),
            )
        };
        if let Some(instance) = &cfg.whatsapp.confirmation {
            state = state.with_whatsapp(client(instance));
        }
        if let Some(instance) = &cfg.whatsapp.recovery {
            state = state.with_recovery_whatsapp(client(instance));
        }
    } else {
        tracing::info!("WhatsApp messages disabled");
    }

    if !cfg.pushcut.urls.is_empty() {
        state = state.with_push(PushNotifier::new(cfg.pushcut.urls.clone()));
    }

    Ok(state)
}

fn create_gateway(cfg: &AppConfig, secrets: &Secrets) -> Result<Arc<dyn PaymentGateway>> {
    match cfg.gateway.kind.as_str() {
        "e2payments" => {
            let client_id = cfg
                .gateway
                .client_id
                .clone()
                .ok_or_else(|| anyhow!("e2Payments client_id not configured"))?;
            let base_url = cfg
                .gateway
                .base_url
                .clone()
                .unwrap_or_else(|| e2payments::DEFAULT_BASE_URL.to_string());

            let wallet = |id: &Option<String>, token: &Option<String>| match (id, token) {
                (Some(wallet_id), Some(token)) => Some(WalletCredentials {
                    wallet_id: wallet_id.clone(),
                    token: token.clone(),
                }),
                _ => None,
            };
            let mpesa = wallet(&cfg.gateway.mpesa_wallet_id, &secrets.mpesa_token);
            let emola = wallet(&cfg.gateway.emola_wallet_id, &secrets.emola_token);
            if mpesa.is_none() && emola.is_none() {
                bail!("e2Payments needs at least one wallet id with its token");
            }

            tracing::info!(
                mpesa = mpesa.is_some(),
                emola = emola.is_some(),
                "Using e2Payments gateway"
            );
            Ok(E2PaymentsClient::new(base_url, client_id, mpesa, emola))
        }
        "mock" => {
            tracing::warn!("Using mock payment gateway");
            Ok(MockGateway::new())
        }
        other => bail!("Unknown gateway kind: {}", other),
    }
}

fn create_store(cfg: &AppConfig, secrets: &Secrets) -> Result<Arc<dyn DocumentStore>> {
    match cfg.store.kind.as_str() {
        "firestore" => {
            let project_id = cfg
                .store
                .project_id
                .clone()
                .ok_or_else(|| anyhow!("Firestore project_id not configured"))?;
            let token = secrets
                .firestore_access_token
                .clone()
                .ok_or_else(|| anyhow!("Firestore access token not found in env or keychain"))?;
            let base_url = cfg
                .store
                .firestore_base_url
                .clone()
                .unwrap_or_else(|| firestore::DEFAULT_BASE_URL.to_string());
            tracing::info!(project_id = %project_id, "Using Firestore document store");
            Ok(FirestoreStore::new(base_url, project_id, token))
        }
        "sled" => {
            tracing::info!(path = %cfg.store.path, "Using local document store");
            Ok(SledStore::open(&cfg.store.path)?)
        }
        other => bail!("Unknown store kind: {}", other),
    }
}
