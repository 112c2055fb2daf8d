//! Customer-facing copy sent after a checkout.
//!
//! The texts are Portuguese because the audience is Mozambican; links and
//! sender names come from [`ContentSettings`] so they can change per
//! deployment without a rebuild.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Amount;

/// Africa/Maputo has no DST.
const MAPUTO_OFFSET_SECS: i32 = 2 * 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSettings {
    /// Link where a buyer claims access to the product.
    pub access_link: String,
    /// WhatsApp number shown in the confirmation SMS.
    pub support_whatsapp: String,
    /// Team name used in the SMS greeting.
    pub brand_name: String,
    /// Signature line closing the SMS.
    pub sms_signature: String,
    /// Checkout page offered after a failed payment.
    pub recovery_link: String,
    pub regular_price: String,
    pub recovery_price: String,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            access_link: "https://wa.me/258858093864?text=ola,%20quero%20receber%20meu%20acceso!"
                .to_string(),
            support_whatsapp: "858322793".to_string(),
            brand_name: "Visionpay".to_string(),
            sms_signature: "grupo vision.".to_string(),
            recovery_link: "https://lifeboostsecrets.online/rec/".to_string(),
            regular_price: "197".to_string(),
            recovery_price: "97".to_string(),
        }
    }
}

pub const EMAIL_SUBJECT: &str = "Compra Confirmada!";

pub fn confirmation_email_html(
    content: &ContentSettings,
    name: &str,
    reference: &str,
    amount: &Amount,
) -> String {
    format!(
        r#"
<p>Olá {name}, seu pedido foi recebido com sucesso!</p>
<p>Referência: {reference}. Valor: MZN {amount}.</p>
<p>É um enorme prazer te ter por aqui</p>
<p>Para acessar a sua conta, clique no link:
<a href="{link}" target="_blank">Acessar produto</a></p>
"#,
        link = content.access_link
    )
}

pub fn confirmation_sms(
    content: &ContentSettings,
    amount: &Amount,
    plan: Option<&str>,
    transaction_id: &str,
) -> String {
    let plan = plan.map(|p| format!(" - {p}")).unwrap_or_default();
    format!(
        "Olá, tudo bem? Aqui fala a equipe do {brand} para você poder acessar a sua conta oficial mande uma mensagem no WhatsApp para:  {support}. pagamento confirmado  {amount} MZN{plan}.\nRef: {transaction_id}\n{signature}",
        brand = content.brand_name,
        support = content.support_whatsapp,
        signature = content.sms_signature,
    )
}

pub fn confirmation_whatsapp(
    content: &ContentSettings,
    name: &str,
    reference: &str,
    amount: &Amount,
) -> String {
    format!(
        "👋 Olá {name}!\n\n✅ Sua compra foi confirmada com sucesso.\n\n📌 Referência: *{reference}*  \n💵 Valor: *MZN {amount}*\n\nClique no link abaixo para poder receber o seu acesso:\n{link}",
        link = content.access_link
    )
}

pub fn recovery_whatsapp(content: &ContentSettings, name: &str) -> String {
    let greeting = if name.is_empty() {
        String::new()
    } else {
        format!(" {name}")
    };
    format!(
        "⚠️ Olá{greeting}! Parece que houve um erro na sua tentativa de pagamento…\n\nMas temos uma notícia boa 🤑\n\nConseguimos liberar um acesso especial: em vez de pagar {regular} MZN, você pode acessar tudo por apenas **{recovery} MZN** (por tempo limitado)!\n\n👉 Finalize aqui agora:\n{link}\nSe tiver dúvidas, é só responder por aqui. Estamos te esperando!",
        regular = content.regular_price,
        recovery = content.recovery_price,
        link = content.recovery_link,
    )
}

/// Local wall-clock time in Maputo, `dd/mm/yyyy, HH:MM:SS`.
pub fn maputo_timestamp(now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(MAPUTO_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).format("%d/%m/%Y, %H:%M:%S").to_string(),
        None => now.format("%d/%m/%Y, %H:%M:%S").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sms_includes_plan_only_when_known() {
        let content = ContentSettings::default();
        let amount = Amount::new("197");
        let with_plan = confirmation_sms(&content, &amount, Some("Premium"), "TX1");
        assert!(with_plan.contains("197 MZN - Premium."));
        assert!(with_plan.contains("\nRef: TX1\n"));

        let without = confirmation_sms(&content, &amount, None, "TX1");
        assert!(without.contains("197 MZN.\n"));
    }

    #[test]
    fn recovery_greeting_skips_empty_name() {
        let content = ContentSettings::default();
        assert!(recovery_whatsapp(&content, "").starts_with("⚠️ Olá! "));
        let text = recovery_whatsapp(&content, "Ana");
        assert!(text.starts_with("⚠️ Olá Ana! "));
        assert!(text.contains("**97 MZN**"));
        assert!(text.contains(&content.recovery_link));
    }

    #[test]
    fn timestamp_is_maputo_local_time() {
        let utc = Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 5).unwrap();
        assert_eq!(maputo_timestamp(utc), "02/03/2026, 01:30:05");
    }

    #[test]
    fn email_mentions_reference_and_amount() {
        let html = confirmation_email_html(
            &ContentSettings::default(),
            "Ana",
            "REF-7",
            &Amount::new("350"),
        );
        assert!(html.contains("Olá Ana"));
        assert!(html.contains("Referência: REF-7. Valor: MZN 350."));
    }
}
