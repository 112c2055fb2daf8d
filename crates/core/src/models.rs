use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Mobile-money rail selected by the `metodo` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mpesa,
    Emola,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Emola => "emola",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mpesa" => Ok(PaymentMethod::Mpesa),
            "emola" => Ok(PaymentMethod::Emola),
            other => Err(UnknownMethod(other.to_string())),
        }
    }
}

/// Amount exactly as the caller sent it, normalised to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount(String);

impl Amount {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Numeric JSON value when the text parses, the raw string otherwise.
    pub fn to_json(&self) -> Value {
        let trimmed = self.0.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::from(i);
        }
        match self.as_f64().and_then(serde_json::Number::from_f64) {
            Some(n) => Value::Number(n),
            None => Value::String(self.0.clone()),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<u32> for Amount {
    fn from(v: u32) -> Self {
        Self(v.to_string())
    }
}

/// Renders a JSON scalar the way a form submission would show it.
/// Integral floats lose their trailing `.0`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    Some(format!("{}", f as i64))
                } else {
                    Some(f.to_string())
                }
            } else {
                Some(n.to_string())
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// JavaScript-style truthiness, used for flags such as `recuperacao`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value))
}

fn loose_amount<'de, D>(deserializer: D) -> Result<Option<Amount>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Value::Number(n) = &value {
        if n.as_f64() == Some(0.0) {
            return Ok(None);
        }
    }
    Ok(scalar_text(&value).map(Amount))
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(is_truthy(&value))
}

/// Campaign attribution tags captured by the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub campaign: String,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub content: String,
}

/// Body of `POST /api/pagar`.
///
/// The checkout form is loosely typed: numbers and strings are accepted
/// interchangeably and empty strings count as absent. Unrecognised fields
/// are kept in `extra` because SMS routing looks at several alternate names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default, deserialize_with = "loose_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "loose_amount")]
    pub amount: Option<Amount>,
    #[serde(default, deserialize_with = "loose_string")]
    pub reference: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub metodo: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub nome: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub pedido: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub whatsapp: Option<String>,
    #[serde(default, deserialize_with = "truthy")]
    pub recuperacao: bool,
    #[serde(default, deserialize_with = "loose_string")]
    pub utm_source: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub utm_medium: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub utm_campaign: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub utm_term: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub utm_content: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub fbc: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub fbp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const DEFAULT_CUSTOMER_NAME: &str = "Cliente";

impl CheckoutRequest {
    pub fn customer_name(&self) -> &str {
        self.nome.as_deref().unwrap_or(DEFAULT_CUSTOMER_NAME)
    }

    pub fn attribution(&self) -> Attribution {
        let tag = |v: &Option<String>| v.clone().unwrap_or_default();
        Attribution {
            source: tag(&self.utm_source),
            medium: tag(&self.utm_medium),
            campaign: tag(&self.utm_campaign),
            term: tag(&self.utm_term),
            content: tag(&self.utm_content),
        }
    }

    /// Text of a named field, looking at typed fields first and then at
    /// anything the caller sent that has no dedicated field.
    pub fn field(&self, name: &str) -> Option<String> {
        let typed = match name {
            "phone" => self.phone.clone(),
            "reference" => self.reference.clone(),
            "pedido" => self.pedido.clone(),
            "amount" => self.amount.as_ref().map(|a| a.as_str().to_string()),
            _ => None,
        };
        typed.or_else(|| self.extra.get(name).and_then(scalar_text))
    }

    /// First present value among `names`, in order.
    pub fn first_field(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|n| self.field(n))
    }
}

/// Body of the upsell endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsellRequest {
    #[serde(default, deserialize_with = "loose_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub metodo: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub nome: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub whatsapp: Option<String>,
}

/// Fixed-price follow-up offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsellOffer {
    First,
    Second,
    Third,
}

impl UpsellOffer {
    pub fn slug(&self) -> &'static str {
        match self {
            UpsellOffer::First => "upsell1",
            UpsellOffer::Second => "upsell2",
            UpsellOffer::Third => "upsell3",
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            UpsellOffer::First => Amount::from(349),
            UpsellOffer::Second => Amount::from(250),
            UpsellOffer::Third => Amount::from(149),
        }
    }

    pub fn collection(&self) -> String {
        format!("{}_compras", self.slug())
    }

    /// `UPSELLn-<unix millis>`
    pub fn reference_at(&self, unix_millis: i64) -> String {
        format!("{}-{}", self.slug().to_uppercase(), unix_millis)
    }
}

/// One entry of an SMS delivery-report callback.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReport {
    pub to: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub correlation_id: Option<String>,
    pub raw: Value,
}

impl DeliveryReport {
    pub fn from_value(raw: &Value) -> Self {
        let text = |v: Option<&Value>| v.and_then(scalar_text);
        let status = raw.get("status");
        Self {
            to: text(raw.get("to")),
            status: text(status.and_then(|s| s.get("groupName"))),
            description: text(status.and_then(|s| s.get("description"))),
            correlation_id: text(raw.get("callbackData"))
                .or_else(|| text(raw.get("bulkId")))
                .or_else(|| text(raw.get("messageId"))),
            raw: raw.clone(),
        }
    }

    /// Document id in the SMS log: `<to>__<correlation id>`.
    pub fn log_key(&self) -> Option<String> {
        match (&self.to, &self.correlation_id) {
            (Some(to), Some(id)) => Some(format!("{to}__{id}")),
            _ => None,
        }
    }
}

/// Extracts the `results` array of a delivery-report callback, tolerating
/// bodies that are not JSON objects.
pub fn delivery_reports(body: &Value) -> Vec<DeliveryReport> {
    body.get("results")
        .and_then(Value::as_array)
        .map(|results| results.iter().map(DeliveryReport::from_value).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_parses_exact_lowercase_only() {
        assert_eq!("mpesa".parse::<PaymentMethod>(), Ok(PaymentMethod::Mpesa));
        assert_eq!("emola".parse::<PaymentMethod>(), Ok(PaymentMethod::Emola));
        assert!("MPESA".parse::<PaymentMethod>().is_err());
        assert!("card".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn checkout_accepts_numeric_and_string_fields() {
        let req: CheckoutRequest = serde_json::from_value(json!({
            "phone": 841234567,
            "amount": 197.0,
            "reference": "REF1",
            "metodo": "mpesa",
            "email": "",
            "recuperacao": "sim",
            "txId": 42
        }))
        .unwrap();

        assert_eq!(req.phone.as_deref(), Some("841234567"));
        assert_eq!(req.amount.as_ref().map(Amount::as_str), Some("197"));
        assert_eq!(req.email, None);
        assert!(req.recuperacao);
        assert_eq!(req.field("txId").as_deref(), Some("42"));
        assert_eq!(req.customer_name(), "Cliente");
    }

    #[test]
    fn zero_amount_counts_as_missing() {
        let req: CheckoutRequest = serde_json::from_value(json!({ "amount": 0 })).unwrap();
        assert!(req.amount.is_none());

        let req: CheckoutRequest = serde_json::from_value(json!({ "amount": "0" })).unwrap();
        assert_eq!(req.amount, Some(Amount::new("0")));
    }

    #[test]
    fn first_field_prefers_earlier_names() {
        let req: CheckoutRequest = serde_json::from_value(json!({
            "reference": "R-9",
            "orderId": "O-1"
        }))
        .unwrap();
        assert_eq!(
            req.first_field(&["txId", "transactionId", "reference", "orderId"]).as_deref(),
            Some("R-9")
        );
    }

    #[test]
    fn amount_json_is_numeric_when_possible() {
        assert_eq!(Amount::new("150").to_json(), json!(150));
        assert_eq!(Amount::new("99.5").to_json(), json!(99.5));
        assert_eq!(Amount::new("abc").to_json(), json!("abc"));
    }

    #[test]
    fn upsell_offers_have_fixed_pricing() {
        assert_eq!(UpsellOffer::First.amount().as_str(), "349");
        assert_eq!(UpsellOffer::Second.amount().as_str(), "250");
        assert_eq!(UpsellOffer::Third.amount().as_str(), "149");
        assert_eq!(UpsellOffer::Second.collection(), "upsell2_compras");
        assert_eq!(UpsellOffer::Third.reference_at(1700000000000), "UPSELL3-1700000000000");
    }

    #[test]
    fn delivery_report_falls_back_through_correlation_ids() {
        let body = json!({
            "results": [
                { "to": "258841234567", "callbackData": "TX1",
                  "status": { "groupName": "DELIVERED", "description": "Delivered to handset" } },
                { "to": "258841234567", "messageId": "m-2" },
                { "bulkId": "b-3" }
            ]
        });
        let reports = delivery_reports(&body);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].log_key().as_deref(), Some("258841234567__TX1"));
        assert_eq!(reports[0].status.as_deref(), Some("DELIVERED"));
        assert_eq!(reports[1].log_key().as_deref(), Some("258841234567__m-2"));
        assert_eq!(reports[2].log_key(), None);
    }

    #[test]
    fn delivery_reports_tolerate_odd_bodies() {
        assert!(delivery_reports(&json!(null)).is_empty());
        assert!(delivery_reports(&json!({ "results": "nope" })).is_empty());
    }
}
