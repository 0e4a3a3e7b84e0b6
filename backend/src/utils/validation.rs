use crate::errors::{ServiceError, ServiceResult};
use validator::Validate;

/// Runs the `validator` derive checks on a request and flattens any failures
/// into a single `field: message` list.
pub fn validate_request<T: Validate>(request: &T) -> ServiceResult<()> {
    if let Err(validation_errors) = request.validate() {
        let mut error_messages: Vec<String> = validation_errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error.message.as_ref().unwrap_or(&"Invalid value".into())
                    )
                })
            })
            .collect();
        error_messages.sort();

        return Err(ServiceError::validation(error_messages.join(", ")));
    }
    Ok(())
}
