mod rules;

use crate::models::{Amount, CheckoutRequest, PaymentMethod, UpsellRequest};

pub const MISSING_FIELDS_MESSAGE: &str = "phone, amount, reference e metodo são obrigatórios";
pub const INVALID_METHOD_MESSAGE: &str = "Método inválido. Use mpesa ou emola.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("phone, amount, reference e metodo são obrigatórios")]
    MissingFields(Vec<&'static str>),
    #[error("Método inválido. Use mpesa ou emola.")]
    InvalidMethod(Option<String>),
}

/// A checkout that passed the presence checks and carries a known method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCheckout {
    pub phone: String,
    pub amount: Amount,
    pub reference: String,
    pub method: PaymentMethod,
}

pub fn validate(req: &CheckoutRequest) -> Result<ValidCheckout, ValidationError> {
    let (Some(phone), Some(amount), Some(reference), Some(_)) =
        (&req.phone, &req.amount, &req.reference, &req.metodo)
    else {
        return Err(ValidationError::MissingFields(rules::missing_checkout_fields(req)));
    };
    let method = rules::method(req.metodo.as_deref())?;
    Ok(ValidCheckout {
        phone: phone.clone(),
        amount: amount.clone(),
        reference: reference.clone(),
        method,
    })
}

pub fn upsell_method(req: &UpsellRequest) -> Result<PaymentMethod, ValidationError> {
    rules::method(req.metodo.as_deref())
}
