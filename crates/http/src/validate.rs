//! Rendering of `validator` failures, plus the field rules the derive cannot express.

use std::borrow::Cow;

use serde_json::{json, Value};
use validator::{ValidationError, ValidationErrors};
use vidly_db::ObjectId;

use crate::error::AppError;

/// The first failing field, by name, becomes the single `details` entry and the message.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let first = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                let error = describe(errs.first()?);
                Some((camel_case(&field.to_string()), error))
            })
            .min();

        match first {
            Some((field, error)) => AppError::validation(
                vec![json!({ "field": field, "error": error })],
                format!("\"{field}\" {error}"),
            ),
            None => AppError::validation(Vec::new(), "request body is invalid"),
        }
    }
}

/// Human-readable text for one broken rule.
fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let param = |name: &str| error.params.get(name).and_then(Value::as_f64);
    match error.code.as_ref() {
        "length" => {
            let len = error
                .params
                .get("value")
                .and_then(Value::as_str)
                .map(|value| value.chars().count() as f64);
            match (len, param("min"), param("max")) {
                (Some(len), Some(min), _) if len < min => {
                    format!("length must be at least {min} characters long")
                }
                (_, _, Some(max)) => {
                    format!("length must be less than or equal to {max} characters long")
                }
                (_, Some(min), None) => format!("length must be at least {min} characters long"),
                _ => "has an invalid length".to_string(),
            }
        }
        "range" => match (param("value"), param("min"), param("max")) {
            (Some(value), Some(min), _) if value < min => {
                format!("must be greater than or equal to {min}")
            }
            (_, _, Some(max)) => format!("must be less than or equal to {max}"),
            (_, Some(min), None) => format!("must be greater than or equal to {min}"),
            _ => "is out of range".to_string(),
        },
        "email" => "must be a valid email".to_string(),
        "required" => "is required".to_string(),
        other => other.replace('_', " "),
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// A present, well-formed record id.
pub fn object_id(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    if !ObjectId::is_valid(value) {
        let mut err = ValidationError::new("object_id");
        err.message = Some(Cow::Borrowed("must be a valid id"));
        return Err(err);
    }
    Ok(())
}

/// Parse an id that already passed [`object_id`].
pub fn parse_object_id(field: &'static str, value: &str) -> Result<ObjectId, AppError> {
    value.parse().map_err(|_| {
        AppError::validation(
            vec![json!({ "field": field, "error": "must be a valid id" })],
            format!("\"{field}\" must be a valid id"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        #[validate(length(min = 5, max = 50))]
        name: String,
        #[validate(required, range(min = 0.0, max = 255.0))]
        daily_rental_rate: Option<f64>,
        #[validate(email)]
        email: String,
        #[validate(custom(function = "object_id"))]
        genre_id: String,
    }

    fn sample() -> Sample {
        Sample {
            name: "abcde".to_string(),
            daily_rental_rate: Some(2.0),
            email: "email1@email.com".to_string(),
            genre_id: ObjectId::new().to_string(),
        }
    }

    fn rejection(sample: Sample) -> (Vec<Value>, String) {
        match AppError::from(sample.validate().unwrap_err()) {
            AppError::Validation {
                details, message, ..
            } => (details, message),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn valid_body_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn length_bounds_are_inclusive_and_count_characters() {
        let mut body = sample();
        body.name = "a".repeat(50);
        assert!(body.validate().is_ok());

        body.name = "éééé".to_string();
        let (details, message) = rejection(body);
        assert_eq!(details[0]["field"], "name");
        assert_eq!(message, "\"name\" length must be at least 5 characters long");

        let mut body = sample();
        body.name = "a".repeat(51);
        let (_, message) = rejection(body);
        assert_eq!(
            message,
            "\"name\" length must be less than or equal to 50 characters long"
        );
    }

    #[test]
    fn range_and_required_name_the_field_in_camel_case() {
        let mut body = sample();
        body.daily_rental_rate = Some(-0.5);
        let (details, message) = rejection(body);
        assert_eq!(details[0]["field"], "dailyRentalRate");
        assert_eq!(
            message,
            "\"dailyRentalRate\" must be greater than or equal to 0"
        );

        let mut body = sample();
        body.daily_rental_rate = None;
        let (_, message) = rejection(body);
        assert_eq!(message, "\"dailyRentalRate\" is required");
    }

    #[test]
    fn malformed_email_and_id_are_rejected() {
        let mut body = sample();
        body.email = "@email1".to_string();
        let (_, message) = rejection(body);
        assert_eq!(message, "\"email\" must be a valid email");

        let mut body = sample();
        body.genre_id = "1".to_string();
        let (details, message) = rejection(body);
        assert_eq!(details[0]["field"], "genreId");
        assert_eq!(message, "\"genreId\" must be a valid id");

        let mut body = sample();
        body.genre_id = String::new();
        let (_, message) = rejection(body);
        assert_eq!(message, "\"genreId\" is required");
    }

    #[test]
    fn only_the_first_failing_field_is_reported() {
        let mut body = sample();
        body.name = "abc".to_string();
        body.email = "nope".to_string();
        let (details, message) = rejection(body);
        assert_eq!(details.len(), 1);
        assert_eq!(details[0]["field"], "email");
        assert_eq!(message, "\"email\" must be a valid email");
    }
}
