//! Fixed-price follow-up offers charged through the same gateway.

use chrono::Utc;
use gateway::ChargeRequest;
use serde_json::{json, Value};
use store::audit::AuditEvent;
use visionpay_core::models::{UpsellOffer, UpsellRequest};
use visionpay_core::validation;

use crate::error::ApiError;
use crate::state::AppState;

pub const MISSING_PHONE_MESSAGE: &str = "phone é obrigatório";

pub async fn process(
    state: &AppState,
    offer: UpsellOffer,
    req: UpsellRequest,
) -> Result<Value, ApiError> {
    let method = validation::upsell_method(&req).map_err(|e| {
        tracing::warn!(offer = offer.slug(), error = %e, "Upsell rejected");
        ApiError::Failed(e.to_string())
    })?;
    let Some(phone) = req.phone.clone() else {
        return Err(ApiError::BadRequest(MISSING_PHONE_MESSAGE.to_string()));
    };

    let amount = offer.amount();
    let reference = offer.reference_at(Utc::now().timestamp_millis());
    tracing::info!(offer = offer.slug(), reference = %reference, method = %method, "Upsell received");

    let charge = ChargeRequest {
        method,
        amount: amount.clone(),
        phone: phone.clone(),
        reference: reference.clone(),
    };
    let response = state.gateway.charge(&charge).await.map_err(|e| {
        tracing::error!(offer = offer.slug(), reference = %reference, error = %e, "Upsell charge failed");
        state.audit.record(
            AuditEvent::new("upsell_failed", &reference, "failed")
                .with_payment(method.as_str(), amount.as_str())
                .with_error(e.detail()),
        );
        ApiError::Failed(e.detail())
    })?;

    let doc = json!({
        "nome": req.nome,
        "email": req.email,
        "phone": phone,
        "whatsapp": req.whatsapp.clone().unwrap_or_default(),
        "metodo": method,
        "amount": amount,
        "reference": reference,
        "created_at": Utc::now().to_rfc3339(),
    });
    let id = state
        .store
        .add(&offer.collection(), doc)
        .await
        .map_err(|e| {
            tracing::error!(offer = offer.slug(), error = %e, "Saving upsell failed");
            ApiError::Failed(e.to_string())
        })?;
    tracing::info!(offer = offer.slug(), id = %id, "Upsell saved");

    state.audit.record(
        AuditEvent::new("upsell_charged", &reference, "charged")
            .with_payment(method.as_str(), amount.as_str()),
    );

    Ok(json!({ "status": "ok", "data": response.body }))
}
