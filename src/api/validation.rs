//! Input validation for API requests and catalogue entries.
//!
//! Field messages follow the wording clients of this API already parse
//! ("This field is required.", "Enter a valid email address.", ...).
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use super::error::{ApiError, ValidationErrorBuilder};
use crate::db::{PlaceOrderRequest, RegisterRequest};

pub const NAME_MAX_LENGTH: usize = 100;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MAX_LENGTH: usize = 100;
pub const IMAGE_URL_MAX_LENGTH: usize = 200;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_INTEGER: &str = "A valid integer is required.";
pub const EMAIL_TAKEN: &str = "user with this email already exists.";

lazy_static! {
    /// Regex for the local part and domain of an email address
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+(\.[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+)*@([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,63}$"
    ).unwrap();

    /// Regex for validating HTTP/HTTPS URLs
    static ref HTTP_URL_REGEX: Regex = Regex::new(
        r"^https?://[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)*(:\d+)?(/[-a-zA-Z0-9_%&=+@~.,!$'()*;:]*)*(\?[^\s#]*)?(#\S*)?$"
    ).unwrap();
}

/// Parse a request body as JSON. An empty body is treated as `{}`.
pub fn parse_json_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("JSON parse error - {}", e)))
}

/// Require the body to be a JSON object
pub fn expect_object(data: &Value) -> Result<&Map<String, Value>, ApiError> {
    data.as_object().ok_or_else(|| {
        ApiError::validation_field(
            "non_field_errors",
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_type_name(data)
            ),
        )
    })
}

/// Name of a JSON value's type as reported in error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Read a required string field. Numbers are accepted and converted,
/// surrounding whitespace is trimmed and blank values are rejected.
pub fn string_field(data: &Map<String, Value>, field: &str) -> Result<String, String> {
    let raw = match data.get(field) {
        None => return Err(REQUIRED.to_string()),
        Some(Value::Null) => return Err(NOT_NULL.to_string()),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(NOT_A_STRING.to_string()),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NOT_BLANK.to_string());
    }
    Ok(trimmed.to_string())
}

/// Validate a maximum length in characters
pub fn validate_max_length(value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            max
        ));
    }
    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    validate_max_length(email, EMAIL_MAX_LENGTH)?;

    let valid = match email.rsplit_once('@') {
        Some((local, "localhost")) => EMAIL_REGEX.is_match(&format!("{}@localhost.localdomain", local)),
        _ => EMAIL_REGEX.is_match(email),
    };
    if !valid {
        return Err(INVALID_EMAIL.to_string());
    }
    Ok(())
}

/// Validate a product image URL
pub fn validate_image_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Err("Image URL is required".to_string());
    }
    validate_max_length(url, IMAGE_URL_MAX_LENGTH)?;

    if !HTTP_URL_REGEX.is_match(url) {
        return Err("Enter a valid URL.".to_string());
    }
    Ok(())
}

/// Validate a product price
pub fn validate_price(price: f64) -> Result<(), String> {
    if !price.is_finite() {
        return Err("Price must be a finite number".to_string());
    }
    if price < 0.0 {
        return Err("Price must not be negative".to_string());
    }
    Ok(())
}

/// Validate a product name
pub fn validate_product_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Product name is required".to_string());
    }
    validate_max_length(name, NAME_MAX_LENGTH)
}

/// Interpret a JSON value as a primary key: an integer or a string holding one
pub fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Validate a registration body, collecting every field error.
///
/// The error set is returned unfinished so checks that need the database can
/// add to it. Fields that failed are left empty in the request.
pub fn check_registration(
    data: &Value,
) -> Result<(RegisterRequest, ValidationErrorBuilder), ApiError> {
    let data = expect_object(data)?;
    let mut errors = ValidationErrorBuilder::new();

    let mut checked = |field: &str, extra: fn(&str) -> Result<(), String>| -> String {
        match string_field(data, field).and_then(|v| extra(&v).map(|_| v)) {
            Ok(value) => value,
            Err(message) => {
                errors.add(field, message);
                String::new()
            }
        }
    };

    let name = checked("name", |v| validate_max_length(v, NAME_MAX_LENGTH));
    let email = checked("email", validate_email);
    let password = checked("password", |v| validate_max_length(v, PASSWORD_MAX_LENGTH));

    Ok((
        RegisterRequest {
            name,
            email,
            password,
        },
        errors,
    ))
}

/// Validate an order body. A missing or null `user_id` is not an error here:
/// it resolves to no user, which the handler reports as not found.
pub fn validate_order(data: &Value) -> Result<PlaceOrderRequest, ApiError> {
    let data = expect_object(data)?;
    let mut errors = ValidationErrorBuilder::new();

    let user_id = match data.get("user_id") {
        None | Some(Value::Null) => None,
        Some(value) => match integer_value(value) {
            Some(id) => Some(id),
            None => {
                errors.add("user_id", INVALID_INTEGER);
                None
            }
        },
    };

    let mut products = Vec::new();
    match data.get("products") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for item in items {
                match integer_value(item) {
                    Some(id) => products.push(id),
                    None => {
                        errors.add(
                            "products",
                            format!(
                                "Incorrect type. Expected pk value, received {}.",
                                json_type_name(item)
                            ),
                        );
                    }
                }
            }
        }
        Some(other) => {
            errors.add(
                "products",
                format!(
                    "Expected a list of items but got type \"{}\".",
                    json_type_name(other)
                ),
            );
        }
    }

    errors.finish()?;
    Ok(PlaceOrderRequest { user_id, products })
}
