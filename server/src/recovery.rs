use tokio::task::JoinHandle;
use visionpay_core::messages;
use visionpay_core::parsing::whatsapp_destination;

use crate::state::AppState;

/// Schedules the recovery WhatsApp message for a payer whose charge failed.
/// Returns `None` when no recovery instance is configured.
pub fn schedule(state: &AppState, phone: String, name: String) -> Option<JoinHandle<()>> {
    let whatsapp = state.recovery_whatsapp.clone()?;
    let delay = state.recovery_delay;
    let message = messages::recovery_whatsapp(&state.content, &name);
    let destination = whatsapp_destination(&phone);

    tracing::info!(delay_secs = delay.as_secs(), "Recovery message scheduled");
    Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match whatsapp.send_text(&destination, &message).await {
            Ok(()) => tracing::info!("Recovery message sent"),
            Err(e) => tracing::error!(error = %e, "Recovery message failed"),
        }
    }))
}
