//! Request and response bodies.

pub mod request;
pub mod response;

use validator::Validate;

use securedrop_core::error::AppError;

/// Runs `validator` rules and flattens the failures into one message.
pub fn validate_body<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate().map_err(|errors| {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let reason = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field} {reason}")
            })
            .collect();
        fields.sort();
        AppError::validation(fields.join("; "))
    })
}
