use super::ValidationError;
use crate::models::{CheckoutRequest, PaymentMethod};

pub fn missing_checkout_fields(req: &CheckoutRequest) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if req.phone.is_none() {
        missing.push("phone");
    }
    if req.amount.is_none() {
        missing.push("amount");
    }
    if req.reference.is_none() {
        missing.push("reference");
    }
    if req.metodo.is_none() {
        missing.push("metodo");
    }
    missing
}

pub fn method(raw: Option<&str>) -> Result<PaymentMethod, ValidationError> {
    raw.and_then(|m| m.parse().ok())
        .ok_or_else(|| ValidationError::InvalidMethod(raw.map(str::to_string)))
}
