//! Identifier canonicalization.
//!
//! User-supplied names (`"my handler"`, `"user_profile"`, `"Index"`) become exported
//! CamelCase identifiers. The generated Rust code then derives snake_case function, field and
//! file names from the canonical form.

use crate::error::{GenError, GenResult};

/// A validated, canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    canonical: String,
    token: char,
}

impl Identifier {
    /// Canonical CamelCase name (`MyHandler`).
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Lowercase first character, used as a short local binding in generated code.
    pub fn binding_token(&self) -> char {
        self.token
    }

    /// snake_case form used for Rust function and file names (`my_handler`).
    pub fn snake(&self) -> String {
        to_snake_case(&self.canonical)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Canonicalize a raw name into an exported identifier and its binding token.
///
/// # Errors
///
/// Returns [`GenError::InvalidIdentifier`] when the canonical form is empty or does not begin
/// with an ASCII uppercase letter.
///
/// ```
/// use routeforge::naming::resolve_identifier;
///
/// let ident = resolve_identifier("my handler").unwrap();
/// assert_eq!(ident.canonical(), "MyHandler");
/// assert_eq!(ident.binding_token(), 'm');
/// assert!(resolve_identifier("123abc").is_err());
/// ```
pub fn resolve_identifier(raw: &str) -> GenResult<Identifier> {
    let canonical = to_camel_case(raw.trim());
    match canonical.chars().next() {
        Some(first) if first.is_ascii_uppercase() => Ok(Identifier {
            token: first.to_ascii_lowercase(),
            canonical,
        }),
        _ => Err(GenError::InvalidIdentifier {
            name: raw.to_string(),
        }),
    }
}

/// Convert a name into CamelCase.
///
/// Any non-alphanumeric character is a word separator and is removed; the first character of
/// every word is uppercased and the rest is kept as written, so existing case changes survive.
pub fn to_camel_case(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<String>()
}

/// Convert a name into snake_case.
///
/// Word boundaries are separators, a lowercase or digit followed by an uppercase letter, and
/// the last capital of an acronym run that is followed by a lowercase letter (`HTTPServer` →
/// `http_server`).
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out.trim_end_matches('_').to_string()
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true",
    "try", "type", "unsafe", "use", "where", "while", "yield",
];

/// Keywords that are not accepted as raw identifiers.
const NON_RAW_KEYWORDS: &[&str] = &["crate", "self", "Self", "super"];

/// Render `name` as a Rust identifier, escaping keywords as raw identifiers.
///
/// `self`, `Self`, `super` and `crate` cannot be raw identifiers and get a `_` suffix instead.
pub fn rust_ident(name: &str) -> String {
    if NON_RAW_KEYWORDS.contains(&name) {
        format!("{name}_")
    } else if RUST_KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}

/// Whether `name` can be used as a module name as written (`mod name;`).
pub fn is_module_ident(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name != "_"
        && !RUST_KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_identifier_rejects_unusable_names() {
        for raw in ["", "   ", "123abc", "_", "--"] {
            assert!(
                matches!(
                    resolve_identifier(raw),
                    Err(GenError::InvalidIdentifier { .. })
                ),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_resolve_identifier_canonicalizes() {
        let ident = resolve_identifier("  my handler ").unwrap();
        assert_eq!(ident.canonical(), "MyHandler");
        assert_eq!(ident.binding_token(), 'm');

        let ident = resolve_identifier("user_profile-view").unwrap();
        assert_eq!(ident.canonical(), "UserProfileView");
        assert_eq!(ident.binding_token(), 'u');
        assert_eq!(ident.snake(), "user_profile_view");
    }

    #[test]
    fn test_camel_case_keeps_inner_case() {
        assert_eq!(to_camel_case("getUserByID"), "GetUserByID");
        assert_eq!(to_camel_case("index"), "Index");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("MyHandler"), "my_handler");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("AvatarUrls"), "avatar_urls");
        assert_eq!(to_snake_case("Route"), "route");
        assert_eq!(to_snake_case("V2Api"), "v2_api");
    }

    #[test]
    fn test_module_idents() {
        for ok in ["handler", "api_v2", "_private"] {
            assert!(is_module_ident(ok), "{ok}");
        }
        for bad in ["my-api", "2fa", "", "_", "type", "self", "héllo", "a.b"] {
            assert!(!is_module_ident(bad), "{bad}");
        }
    }

    #[test]
    fn test_rust_ident_escapes_keywords() {
        assert_eq!(rust_ident("type"), "r#type");
        assert_eq!(rust_ident("name"), "name");
        for word in ["self", "Self", "super", "crate"] {
            assert_eq!(rust_ident(word), format!("{word}_"));
        }
    }
}
