pub mod messages;
pub mod models;
pub mod parsing;
pub mod validation;
