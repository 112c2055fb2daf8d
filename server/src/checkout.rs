//! `POST /api/pagar`: charge through the gateway, then fan out the
//! post-purchase side effects.
//!
//! Only the gateway call decides the response. Every side effect runs in
//! order and logs its own failure without affecting the others.

use chrono::Utc;
use gateway::{ChargeRequest, GatewayResponse};
use serde_json::{json, Value};
use store::audit::AuditEvent;
use store::collections;
use visionpay_core::messages;
use visionpay_core::models::CheckoutRequest;
use visionpay_core::parsing::{to_moz_e164, whatsapp_destination};
use visionpay_core::validation::{self, ValidCheckout};

use crate::error::ApiError;
use crate::recovery;
use crate::sms_ledger::ledger_key;
use crate::state::AppState;

/// Balance credited to a buyer's first account.
pub const INITIAL_BALANCE: i64 = 200;

const GATEWAY_PAYER_FIELDS: [&str; 4] = ["payerPhone", "msisdn", "debited_msisdn", "msisdn_payer"];
const FORM_PHONE_FIELDS: [&str; 3] = ["phone", "phone_number", "customer_phone"];
const TRANSACTION_ID_FIELDS: [&str; 4] = ["txId", "transactionId", "reference", "orderId"];
const PLAN_FIELDS: [&str; 4] = ["planName", "product", "item", "pedido"];

struct Purchase<'a> {
    req: &'a CheckoutRequest,
    valid: &'a ValidCheckout,
    gateway: &'a GatewayResponse,
    name: &'a str,
}

pub async fn process(state: &AppState, req: CheckoutRequest) -> Result<Value, ApiError> {
    let valid = validation::validate(&req).map_err(|e| {
        tracing::warn!(error = ?e, "Checkout rejected");
        e
    })?;

    tracing::info!(
        reference = %valid.reference,
        method = %valid.method,
        utm_source = req.utm_source.as_deref().unwrap_or_default(),
        utm_campaign = req.utm_campaign.as_deref().unwrap_or_default(),
        "Checkout received"
    );

    let charge = ChargeRequest {
        method: valid.method,
        amount: valid.amount.clone(),
        phone: valid.phone.clone(),
        reference: valid.reference.clone(),
    };

    let response = match state.gateway.charge(&charge).await {
        Ok(response) => response,
        Err(err) => {
            let detail = err.detail();
            tracing::error!(reference = %valid.reference, error = %err, "Gateway charge failed");
            handle_failure(state, &req, &valid, &detail).await;
            return Err(ApiError::Failed(detail));
        }
    };

    state.audit.record(
        AuditEvent::new("payment_charged", &valid.reference, "charged")
            .with_payment(valid.method.as_str(), valid.amount.as_str()),
    );

    let purchase = Purchase {
        req: &req,
        valid: &valid,
        gateway: &response,
        name: req.customer_name(),
    };
    run_side_effects(state, &purchase).await;

    Ok(json!({ "status": "ok", "data": response.body }))
}

async fn run_side_effects(state: &AppState, p: &Purchase<'_>) {
    if let Err(e) = track_conversion(state, p).await {
        tracing::error!(error = %e, "Conversion tracking failed");
    }
    send_confirmation_email(state, p);
    if let Err(e) = append_to_sheet(state, p).await {
        tracing::error!(error = %e, "Spreadsheet append failed");
    }
    if let Err(e) = save_purchase(state, p).await {
        tracing::error!(error = %e, "Saving purchase failed");
    }
    if let Err(e) = ensure_user(state, p).await {
        tracing::error!(error = %e, "Saving user failed");
    }
    send_confirmation_sms(state, p).await;
    notify_buyer_and_team(state, p).await;
}

async fn track_conversion(state: &AppState, p: &Purchase<'_>) -> anyhow::Result<()> {
    let (Some(tracker), Some(email)) = (&state.tracker, &p.req.email) else {
        return Ok(());
    };
    let event = integrations::tracking::PurchaseEvent {
        email,
        phone: &p.valid.phone,
        amount: &p.valid.amount,
        fbp: p.req.fbp.as_deref(),
        fbc: p.req.fbc.as_deref(),
        event_time: Utc::now().timestamp(),
    };
    tracker.track_purchase(&event).await
}

fn send_confirmation_email(state: &AppState, p: &Purchase<'_>) {
    let (Some(mail), Some(email)) = (&state.mail, &p.req.email) else {
        return;
    };
    let html = messages::confirmation_email_html(
        &state.content,
        p.name,
        &p.valid.reference,
        &p.valid.amount,
    );
    let mail = mail.clone();
    let to = email.clone();
    tokio::spawn(async move {
        if let Err(e) = mail.send_html(&to, messages::EMAIL_SUBJECT, &html).await {
            tracing::error!(error = %e, "Confirmation email failed");
        }
    });
}

fn sheet_row(p: &Purchase<'_>) -> Vec<String> {
    let attribution = p.req.attribution();
    vec![
        p.name.to_string(),
        p.req.email.clone().unwrap_or_default(),
        p.valid.phone.clone(),
        p.valid.method.as_str().to_string(),
        p.valid.amount.as_str().to_string(),
        p.valid.reference.clone(),
        messages::maputo_timestamp(Utc::now()),
        attribution.source,
        attribution.medium,
        attribution.campaign,
        attribution.term,
        attribution.content,
    ]
}

async fn append_to_sheet(state: &AppState, p: &Purchase<'_>) -> anyhow::Result<()> {
    let Some(sheets) = &state.sheets else {
        return Ok(());
    };
    sheets.append_row(sheet_row(p)).await
}

async fn save_purchase(state: &AppState, p: &Purchase<'_>) -> anyhow::Result<()> {
    let now = Utc::now().to_rfc3339();
    let attribution = p.req.attribution();

    let doc = json!({
        "nome": p.name,
        "email": p.req.email,
        "phone": p.valid.phone,
        "whatsapp": p.req.whatsapp.clone().unwrap_or_default(),
        "metodo": p.valid.method,
        "amount": p.valid.amount,
        "reference": p.valid.reference,
        "created_at": now,
        "utm": attribution,
    });
    let id = state.store.add(collections::PURCHASES, doc).await?;
    tracing::info!(id = %id, reference = %p.valid.reference, "Purchase saved");

    if p.req.recuperacao {
        let doc = json!({
            "nome": p.name,
            "email": p.req.email,
            "phone": p.valid.phone,
            "metodo": p.valid.method,
            "amount": p.valid.amount,
            "reference": p.valid.reference,
            "utm_source": attribution.source,
            "utm_medium": attribution.medium,
            "utm_campaign": attribution.campaign,
            "utm_term": attribution.term,
            "utm_content": attribution.content,
            "createdAt": now,
        });
        state.store.add(collections::RECOVERY_PURCHASES, doc).await?;
        tracing::info!(reference = %p.valid.reference, "Recovery purchase saved");
    }
    Ok(())
}

async fn ensure_user(state: &AppState, p: &Purchase<'_>) -> anyhow::Result<()> {
    let phone = Value::String(p.valid.phone.clone());
    let existing = state
        .store
        .find_by_field(collections::USERS, "telefone", &phone)
        .await?;
    if !existing.is_empty() {
        tracing::debug!("User already registered");
        return Ok(());
    }
    state
        .store
        .add(
            collections::USERS,
            json!({
                "nome": p.name,
                "telefone": phone,
                "saldo": INITIAL_BALANCE,
                "dataCadastro": Utc::now().to_rfc3339(),
            }),
        )
        .await?;
    tracing::info!("New user registered");
    Ok(())
}

/// Number to text: what the gateway says it debited, then what the caller
/// says was debited, then the form's phone.
fn sms_recipient(p: &Purchase<'_>) -> Option<String> {
    p.gateway
        .payer_msisdn()
        .or_else(|| p.req.first_field(&GATEWAY_PAYER_FIELDS))
        .or_else(|| p.req.first_field(&FORM_PHONE_FIELDS))
        .and_then(|raw| to_moz_e164(&raw))
}

async fn send_confirmation_sms(state: &AppState, p: &Purchase<'_>) {
    let Some(sms) = &state.sms else {
        return;
    };
    let (Some(to), Some(transaction_id)) =
        (sms_recipient(p), p.req.first_field(&TRANSACTION_ID_FIELDS))
    else {
        tracing::warn!("No usable phone or transaction id; SMS not sent");
        return;
    };

    let key = ledger_key(&to, &transaction_id);
    let Some(reservation) = state.sms_ledger.reserve(&key) else {
        tracing::info!(key = %key, "SMS already sent, skipping");
        return;
    };

    let plan = p.req.first_field(&PLAN_FIELDS);
    let text = messages::confirmation_sms(
        &state.content,
        &p.valid.amount,
        plan.as_deref(),
        &transaction_id,
    );

    match sms.send(&to, &text, Some(&transaction_id)).await {
        Ok(_) => {
            reservation.commit();
            tracing::info!(to = %to, "Confirmation SMS sent");
            state.audit.record(
                AuditEvent::new("sms_sent", &p.valid.reference, "sent").with_recipient(to),
            );
        }
        Err(e) => tracing::error!(to = %to, error = %e, "Confirmation SMS failed"),
    }
}

/// WhatsApp confirmation, then the internal push alerts. The alerts are
/// skipped when the WhatsApp send fails.
async fn notify_buyer_and_team(state: &AppState, p: &Purchase<'_>) {
    if let Some(whatsapp) = &state.whatsapp {
        let raw = p.req.whatsapp.as_deref().unwrap_or(&p.valid.phone);
        let destination = whatsapp_destination(raw);
        let message = messages::confirmation_whatsapp(
            &state.content,
            p.name,
            &p.valid.reference,
            &p.valid.amount,
        );
        if let Err(e) = whatsapp.send_text(&destination, &message).await {
            tracing::error!(error = %e, "WhatsApp confirmation failed");
            return;
        }
        tracing::info!("WhatsApp confirmation sent");
    }

    if let Some(push) = &state.push {
        push.notify_sale().await;
    }
}

async fn handle_failure(state: &AppState, req: &CheckoutRequest, valid: &ValidCheckout, detail: &str) {
    let doc = json!({
        "phone": valid.phone,
        "metodo": valid.method,
        "reference": valid.reference,
        "erro": detail,
        "status": "falhou",
        "created_at": Utc::now().to_rfc3339(),
    });
    match state.store.add(collections::FAILED_TRANSACTIONS, doc).await {
        Ok(_) => tracing::warn!(reference = %valid.reference, "Failed transaction recorded"),
        Err(e) => tracing::error!(error = %e, "Saving failed transaction failed"),
    }

    state.audit.record(
        AuditEvent::new("payment_failed", &valid.reference, "failed")
            .with_payment(valid.method.as_str(), valid.amount.as_str())
            .with_error(detail.to_string()),
    );

    recovery::schedule(state, valid.phone.clone(), req.customer_name().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> CheckoutRequest {
        serde_json::from_value(body).unwrap()
    }

    fn with_purchase<F: FnOnce(&Purchase<'_>)>(body: Value, gateway: Value, f: F) {
        let req = request(body);
        let valid = validation::validate(&req).unwrap();
        let gateway = GatewayResponse { body: gateway };
        let purchase = Purchase {
            req: &req,
            valid: &valid,
            gateway: &gateway,
            name: req.customer_name(),
        };
        f(&purchase)
    }

    fn base() -> Value {
        json!({ "phone": "841111111", "amount": 197, "reference": "R1", "metodo": "mpesa" })
    }

    #[test]
    fn recipient_prefers_gateway_reported_number() {
        with_purchase(base(), json!({ "debited_msisdn": "258852222222" }), |p| {
            assert_eq!(sms_recipient(p).as_deref(), Some("+258852222222"));
        });
    }

    #[test]
    fn recipient_skips_blank_gateway_fields() {
        with_purchase(
            base(),
            json!({ "msisdn": null, "payerPhone": "258852222222" }),
            |p| assert_eq!(sms_recipient(p).as_deref(), Some("+258852222222")),
        );
        with_purchase(
            base(),
            json!({ "msisdn": "", "debited_msisdn": "258853333333" }),
            |p| assert_eq!(sms_recipient(p).as_deref(), Some("+258853333333")),
        );
    }

    #[test]
    fn recipient_then_request_payer_fields() {
        let mut body = base();
        body["msisdn_payer"] = json!("863333333");
        with_purchase(body, json!({ "success": true }), |p| {
            assert_eq!(sms_recipient(p).as_deref(), Some("+258863333333"));
        });
    }

    #[test]
    fn recipient_falls_back_to_form_phone() {
        with_purchase(base(), json!("ok"), |p| {
            assert_eq!(sms_recipient(p).as_deref(), Some("+258841111111"));
        });
    }

    #[test]
    fn sheet_row_has_twelve_columns_in_order() {
        let mut body = base();
        body["nome"] = json!("Ana");
        body["utm_source"] = json!("fb");
        body["utm_content"] = json!("video");
        with_purchase(body, json!({}), |p| {
            let row = sheet_row(p);
            assert_eq!(row.len(), 12);
            assert_eq!(&row[..6], &["Ana", "", "841111111", "mpesa", "197", "R1"]);
            assert_eq!(row[7], "fb");
            assert_eq!(row[11], "video");
        });
    }
}
