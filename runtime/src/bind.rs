//! Request binding for record handlers.
//!
//! `#[derive(Bind)]` expands to one call per field into [`bind_param`], [`bind_upload`] or
//! [`bind_body`]. Each call reads the raw values from the [`Context`], applies the field's
//! [`Rules`], and converts them into the field type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::context::Context;
use crate::upload::UploadedFile;

/// Where a field's value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Path,
    Query,
    Form,
    Header,
    Cookie,
}

/// Why a request could not be bound or handled.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("missing required parameter {0:?}")]
    Missing(String),

    #[error("invalid parameter {field:?}: {reason}")]
    Invalid { field: String, reason: String },

    /// Message supplied by an `err = "..."` annotation.
    #[error("{0}")]
    Custom(String),

    #[error("unreadable request: {0}")]
    Request(String),

    #[error("failed to save upload {field:?}: {source}")]
    Save {
        field: String,
        #[source]
        source: std::io::Error,
    },
}

impl BindError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Status code reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Save { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for BindError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// Bind a handler's state from a request.
///
/// Usually derived; see [`macro@crate::Bind`].
pub trait Bind: Sized {
    fn bind(ctx: &Context) -> Result<Self, BindError>;
}

/// Validation annotations of one field, as written in its `#[param(...)]` attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rules {
    pub required: bool,
    pub nonzero: bool,
    pub len: Option<&'static str>,
    pub range: Option<&'static str>,
    pub regex: Option<&'static str>,
    pub maxmb: Option<u32>,
    pub err: Option<&'static str>,
}

impl Rules {
    fn fail(&self, error: BindError) -> BindError {
        match self.err {
            Some(message) => BindError::Custom(message.to_string()),
            None => error,
        }
    }
}

/// A value that can be parsed from the raw strings of one request parameter.
pub trait FromParam: Sized {
    /// Parse from every non-empty value sent under `name`; `values` is never empty.
    fn from_param(name: &str, values: &[&str]) -> Result<Self, String>;

    /// Length checked by `len`.
    fn length(&self) -> Option<usize> {
        None
    }

    /// Numeric value checked by `range`.
    fn number(&self) -> Option<f64> {
        None
    }

    /// Value rejected by `nonzero`.
    fn is_zero(&self) -> bool {
        false
    }
}

fn last<'a>(values: &[&'a str]) -> &'a str {
    values.last().copied().unwrap_or_default()
}

impl FromParam for String {
    fn from_param(_: &str, values: &[&str]) -> Result<Self, String> {
        Ok(last(values).to_string())
    }

    fn length(&self) -> Option<usize> {
        Some(self.chars().count())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl FromParam for bool {
    fn from_param(_: &str, values: &[&str]) -> Result<Self, String> {
        match last(values).to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(true),
            "0" | "false" | "off" | "no" => Ok(false),
            other => Err(format!("{other:?} is not a boolean")),
        }
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

macro_rules! numeric_param {
    ($($ty:ty),*) => {$(
        impl FromParam for $ty {
            fn from_param(_: &str, values: &[&str]) -> Result<Self, String> {
                let raw = last(values).trim();
                raw.parse::<$ty>()
                    .map_err(|e| format!("{raw:?} is not a valid {}: {e}", stringify!($ty)))
            }

            fn number(&self) -> Option<f64> {
                Some(*self as f64)
            }

            fn is_zero(&self) -> bool {
                *self as f64 == 0.0
            }
        }
    )*};
}

numeric_param!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: FromParam> FromParam for Option<T> {
    fn from_param(name: &str, values: &[&str]) -> Result<Self, String> {
        T::from_param(name, values).map(Some)
    }

    fn length(&self) -> Option<usize> {
        self.as_ref().and_then(T::length)
    }

    fn number(&self) -> Option<f64> {
        self.as_ref().and_then(T::number)
    }

    fn is_zero(&self) -> bool {
        self.as_ref().is_none_or(T::is_zero)
    }
}

impl<T: FromParam> FromParam for Vec<T> {
    fn from_param(name: &str, values: &[&str]) -> Result<Self, String> {
        values
            .iter()
            .map(|v| T::from_param(name, std::slice::from_ref(v)))
            .collect()
    }

    fn length(&self) -> Option<usize> {
        Some(self.len())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// A request cookie bound by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl FromParam for Cookie {
    fn from_param(name: &str, values: &[&str]) -> Result<Self, String> {
        Ok(Cookie {
            name: name.to_string(),
            value: last(values).to_string(),
        })
    }

    fn length(&self) -> Option<usize> {
        Some(self.value.chars().count())
    }

    fn is_zero(&self) -> bool {
        self.value.is_empty()
    }
}

/// Inclusive bounds parsed from `"N"`, `"N:M"`, `"N:"` or `":M"`. A bare `N` is exact.
pub(crate) fn bounds(spec: &str) -> Option<(Option<f64>, Option<f64>)> {
    let spec = spec.trim();
    let parse = |s: &str| -> Option<Option<f64>> {
        let s = s.trim();
        if s.is_empty() {
            Some(None)
        } else {
            s.parse().ok().map(Some)
        }
    };
    match spec.split_once(':') {
        Some((min, max)) => Some((parse(min)?, parse(max)?)),
        None => {
            let exact = parse(spec)??;
            Some((Some(exact), Some(exact)))
        }
    }
}

fn within(value: f64, spec: &str) -> bool {
    match bounds(spec) {
        Some((min, max)) => min.is_none_or(|m| value >= m) && max.is_none_or(|m| value <= m),
        None => false,
    }
}

static PATTERNS: Lazy<Mutex<HashMap<&'static str, Regex>>> = Lazy::new(Default::default);

fn matches(pattern: &'static str, value: &str) -> Result<bool, regex::Error> {
    let mut cache = PATTERNS.lock().unwrap_or_else(|p| p.into_inner());
    if let Some(re) = cache.get(pattern) {
        return Ok(re.is_match(value));
    }
    let re = Regex::new(pattern)?;
    let found = re.is_match(value);
    cache.insert(pattern, re);
    Ok(found)
}

fn check_value<T: FromParam>(key: &str, value: &T, rules: &Rules) -> Result<(), BindError> {
    if rules.nonzero && value.is_zero() {
        return Err(BindError::invalid(key, "must not be zero"));
    }
    if let (Some(spec), Some(len)) = (rules.len, value.length()) {
        if !within(len as f64, spec) {
            return Err(BindError::invalid(key, format!("length {len} is outside {spec}")));
        }
    }
    if let (Some(spec), Some(number)) = (rules.range, value.number()) {
        if !within(number, spec) {
            return Err(BindError::invalid(key, format!("{number} is outside {spec}")));
        }
    }
    Ok(())
}

/// Bind a scalar, optional or repeated parameter.
pub fn bind_param<T>(ctx: &Context, source: Source, key: &str, rules: &Rules) -> Result<T, BindError>
where
    T: FromParam + Default,
{
    let values: Vec<&str> = ctx
        .values(source, key)
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        if rules.required {
            return Err(rules.fail(BindError::Missing(key.to_string())));
        }
        return Ok(T::default());
    }
    if let Some(pattern) = rules.regex {
        for value in &values {
            let ok = matches(pattern, value).map_err(|e| BindError::invalid(key, e.to_string()))?;
            if !ok {
                return Err(rules.fail(BindError::invalid(
                    key,
                    format!("{value:?} does not match {pattern}"),
                )));
            }
        }
    }
    let value = T::from_param(key, &values).map_err(|e| rules.fail(BindError::invalid(key, e)))?;
    check_value(key, &value, rules).map_err(|e| rules.fail(e))?;
    Ok(value)
}

/// A field type that holds uploaded files.
pub trait FromUpload: Sized {
    fn from_upload(files: Vec<UploadedFile>) -> Self;
}

impl FromUpload for UploadedFile {
    fn from_upload(files: Vec<UploadedFile>) -> Self {
        files.into_iter().next().unwrap_or_default()
    }
}

impl FromUpload for Option<UploadedFile> {
    fn from_upload(files: Vec<UploadedFile>) -> Self {
        files.into_iter().next()
    }
}

impl FromUpload for Vec<UploadedFile> {
    fn from_upload(files: Vec<UploadedFile>) -> Self {
        files
    }
}

/// Bind uploaded files from a multipart form.
pub fn bind_upload<T: FromUpload>(ctx: &Context, key: &str, rules: &Rules) -> Result<T, BindError> {
    let files = ctx.files(key).to_vec();
    if files.is_empty() && rules.required {
        return Err(rules.fail(BindError::Missing(key.to_string())));
    }
    if let Some(mb) = rules.maxmb {
        let limit = u64::from(mb) * 1024 * 1024;
        if let Some(big) = files.iter().find(|f| f.size() > limit) {
            return Err(rules.fail(BindError::invalid(
                key,
                format!("{:?} is larger than {mb} MB", big.file_name),
            )));
        }
    }
    Ok(T::from_upload(files))
}

/// Bind the whole request body as JSON.
pub fn bind_body<T>(ctx: &Context, key: &str, rules: &Rules) -> Result<T, BindError>
where
    T: DeserializeOwned + Default,
{
    let body = ctx.body();
    if body.iter().all(u8::is_ascii_whitespace) {
        if rules.required {
            return Err(rules.fail(BindError::Missing(key.to_string())));
        }
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| rules.fail(BindError::invalid(key, e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert_eq!(bounds("3"), Some((Some(3.0), Some(3.0))));
        assert_eq!(bounds("1:10"), Some((Some(1.0), Some(10.0))));
        assert_eq!(bounds("2:"), Some((Some(2.0), None)));
        assert_eq!(bounds(":-1.5"), Some((None, Some(-1.5))));
        assert_eq!(bounds("a:b"), None);
        assert_eq!(bounds(""), None);
    }

    #[test]
    fn test_within() {
        assert!(within(5.0, "1:10"));
        assert!(within(10.0, "1:10"));
        assert!(!within(11.0, "1:10"));
        assert!(within(3.0, "3"));
        assert!(!within(4.0, "3"));
        assert!(within(1e9, "0:"));
    }

    #[test]
    fn test_from_param() {
        assert_eq!(u8::from_param("age", &["42"]), Ok(42));
        assert!(u8::from_param("age", &["300"]).is_err());
        assert_eq!(bool::from_param("on", &["on"]), Ok(true));
        assert_eq!(String::from_param("name", &["a", "b"]), Ok("b".to_string()));
        assert_eq!(
            Vec::<i32>::from_param("ids", &["1", "2", "3"]),
            Ok(vec![1, 2, 3])
        );
        assert_eq!(Option::<f64>::from_param("x", &["1.5"]), Ok(Some(1.5)));
        let cookie = Cookie::from_param("sid", &["abc"]).unwrap();
        assert_eq!(cookie.name, "sid");
        assert_eq!(cookie.value, "abc");
    }

    #[test]
    fn test_rules_checks() {
        let rules = Rules {
            len: Some("2:4"),
            ..Rules::default()
        };
        assert!(check_value("name", &"abc".to_string(), &rules).is_ok());
        assert!(check_value("name", &"abcde".to_string(), &rules).is_err());

        let rules = Rules {
            nonzero: true,
            range: Some(":10"),
            ..Rules::default()
        };
        assert!(check_value("n", &0u8, &rules).is_err());
        assert!(check_value("n", &11u8, &rules).is_err());
        assert!(check_value("n", &7u8, &rules).is_ok());
    }

    #[test]
    fn test_custom_error_replaces_message() {
        let rules = Rules {
            err: Some("age is out of range"),
            ..Rules::default()
        };
        let err = rules.fail(BindError::invalid("age", "300 is outside 0:150"));
        assert_eq!(err.to_string(), "age is out of range");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_regex_cache() {
        assert!(matches(r"^\d+$", "123").unwrap());
        assert!(!matches(r"^\d+$", "12a").unwrap());
        assert!(matches("(", "x").is_err());
    }
}
