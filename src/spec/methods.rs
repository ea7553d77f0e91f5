use http::Method;
use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::error::{GenError, GenResult};

/// Methods the generated axum router can register a handler for.
const SUPPORTED: [Method; 8] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
];

/// Ordered, de-duplicated set of HTTP methods a handler answers.
///
/// An empty set means the handler answers every method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet(Vec<Method>);

impl MethodSet {
    /// A set answering every method.
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse a list of method tokens. Each token may itself hold several methods separated by
    /// whitespace, `,` or `|` (`"GET POST"`, `"get|head"`).
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidMethod`] for tokens the generated router cannot register.
    pub fn parse<I, S>(tokens: I) -> GenResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut methods = Vec::new();
        for token in tokens {
            for part in token
                .as_ref()
                .split(|c: char| c.is_whitespace() || c == ',' || c == '|')
                .filter(|p| !p.is_empty())
            {
                let upper = part.to_ascii_uppercase();
                let method = Method::from_bytes(upper.as_bytes())
                    .ok()
                    .filter(|m| SUPPORTED.contains(m))
                    .ok_or_else(|| GenError::InvalidMethod {
                        method: part.to_string(),
                    })?;
                if !methods.contains(&method) {
                    methods.push(method);
                }
            }
        }
        Ok(Self(methods))
    }

    /// Methods in registration order.
    pub fn methods(&self) -> &[Method] {
        &self.0
    }

    /// Whether the handler answers every method.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("*");
        }
        let names: Vec<&str> = self.0.iter().map(Method::as_str).collect();
        f.write_str(&names.join("|"))
    }
}

/// Manifest form: a single string or a list of strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMethods {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for MethodSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tokens = match RawMethods::deserialize(deserializer)? {
            RawMethods::One(s) => vec![s],
            RawMethods::Many(v) => v,
        };
        MethodSet::parse(tokens).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_separators_and_dedup() {
        let set = MethodSet::parse(["get POST", "Get|put,post"]).unwrap();
        assert_eq!(set.methods(), &[Method::GET, Method::POST, Method::PUT]);
        assert_eq!(set.to_string(), "GET|POST|PUT");
    }

    #[test]
    fn test_empty_is_any() {
        let set = MethodSet::parse(Vec::<String>::new()).unwrap();
        assert!(set.is_any());
        assert_eq!(set.to_string(), "*");
    }

    #[test]
    fn test_rejects_unsupported() {
        assert!(matches!(
            MethodSet::parse(["CONNECT"]),
            Err(GenError::InvalidMethod { .. })
        ));
        assert!(matches!(
            MethodSet::parse(["FETCH"]),
            Err(GenError::InvalidMethod { .. })
        ));
    }
}
