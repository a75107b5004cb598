use anyhow::anyhow;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};
use rollcall_core::AppError;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

fn format_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// serde reports absent fields as "missing field `name` at line 1 column 20".
fn missing_field(message: &str) -> Option<&str> {
    let rest = message.split_once("missing field `")?.1;
    rest.split_once('`').map(|(field, _)| field)
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Missing 'Content-Type: application/json' header".to_string()
        }
        JsonRejection::JsonDataError(err) => match missing_field(&err.body_text()) {
            Some(field) => format!("{} is required", field),
            None => "Invalid field type in request".to_string(),
        },
        JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".to_string(),
        _ => "Invalid request body".to_string(),
    };

    AppError::bad_request(anyhow!(message))
}

/// JSON body extractor that runs `validator` rules before the handler sees the value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;

        value.validate().map_err(|errors| {
            AppError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                anyhow!("{}", format_errors(&errors)),
            )
        })?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(length(min = 6))]
        password: String,
    }

    #[test]
    fn test_missing_field_name_is_extracted() {
        assert_eq!(
            missing_field("Failed to deserialize the JSON body into the target type: missing field `password` at line 1 column 19"),
            Some("password")
        );
        assert_eq!(missing_field("invalid type: integer `5`, expected a string"), None);
    }

    #[test]
    fn test_format_errors_uses_messages_and_fallbacks() {
        let sample = Sample {
            name: String::new(),
            password: "abc".to_string(),
        };
        let errors = sample.validate().unwrap_err();
        assert_eq!(format_errors(&errors), "Name is required, password is invalid");
    }
}
