//! Field-binding synthesis for record-style handlers.
//!
//! A record handler is generated as a struct whose fields are bound from the request by the
//! runtime's `Bind` extractor. Each [`FieldBinding`] becomes a [`FieldDecl`] carrying the
//! canonical field name, the `#[param(...)]` metadata, and, for uploaded files, a companion
//! field that receives the stored file's URL(s) after the handler saves it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

use super::types::{FieldBinding, SourcePosition, UploadKind};
use crate::error::{GenError, GenResult};
use crate::naming::{resolve_identifier, rust_ident, to_snake_case};

#[allow(clippy::expect_used)]
static LEN_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)?(:(\d+)?)?$").expect("valid length range regex"));

#[allow(clippy::expect_used)]
static NUM_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d+(\.\d+)?)?(:(-?\d+(\.\d+)?)?)?$").expect("valid numeric range regex")
});

/// One validation or documentation annotation on a bound field, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `required`
    Required,
    /// `nonzero`
    Nonzero,
    /// `len = "3:6"`
    Len(String),
    /// `range = "0:10"`
    Range(String),
    /// `regex = "^\\w+$"`
    Regex(String),
    /// `maxmb = 32`
    MaxMb(u32),
    /// `err = "..."`
    Err(String),
    /// `desc = "..."`
    Desc(String),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Required => f.write_str("required"),
            Constraint::Nonzero => f.write_str("nonzero"),
            Constraint::Len(v) => write!(f, "len = {v:?}"),
            Constraint::Range(v) => write!(f, "range = {v:?}"),
            Constraint::Regex(v) => write!(f, "regex = {v:?}"),
            Constraint::MaxMb(v) => write!(f, "maxmb = {v}"),
            Constraint::Err(v) => write!(f, "err = {v:?}"),
            Constraint::Desc(v) => write!(f, "desc = {v:?}"),
        }
    }
}

/// Request-binding metadata of a field.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingMeta {
    /// Request position
    pub position: SourcePosition,
    /// Explicit request parameter name
    pub param_name: Option<String>,
    /// Annotations in emission order
    pub constraints: Vec<Constraint>,
}

impl BindingMeta {
    /// The `param(...)` attribute body.
    pub fn attribute(&self) -> String {
        let mut parts = vec![format!("in = {:?}", self.position.to_string())];
        if let Some(name) = &self.param_name {
            parts.push(format!("name = {name:?}"));
        }
        parts.extend(self.constraints.iter().map(ToString::to_string));
        format!("param({})", parts.join(", "))
    }
}

/// Field synthesized to hold where an uploaded file was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionField {
    /// Canonical name (`AvatarUrl`, `PhotosUrls`)
    pub canonical_name: String,
    /// Rust field name (`avatar_url`)
    pub rust_name: String,
    /// `String` or `Vec<String>`
    pub value_type: &'static str,
    /// Single or multi upload
    pub kind: UploadKind,
}

/// One declared struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Canonical name (`Avatar`)
    pub canonical_name: String,
    /// Rust field name (`avatar`)
    pub rust_name: String,
    /// Value type as written
    pub value_type: String,
    /// Request position, name and annotations; `None` for plain data fields
    pub binding: Option<BindingMeta>,
    /// Extra attributes as written
    pub attrs: Vec<String>,
    /// Upload URL holder for uploaded-file fields
    pub companion: Option<CompanionField>,
}

/// Fields of one record handler plus the runtime types they need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesizedFields {
    /// Declarations in input order
    pub fields: Vec<FieldDecl>,
    /// Runtime type names to import, sorted
    pub runtime_imports: Vec<String>,
}

impl SynthesizedFields {
    /// Companion fields in declaration order, paired with the upload field they belong to.
    pub fn uploads(&self) -> impl Iterator<Item = (&FieldDecl, &CompanionField)> {
        self.fields
            .iter()
            .filter_map(|f| f.companion.as_ref().map(|c| (f, c)))
    }
}

/// Check the binding rules of a record handler's fields.
///
/// # Errors
///
/// Returns [`GenError::InvalidIdentifier`] for unusable field names and
/// [`GenError::InvalidBinding`] when more than one field binds the body, when form and body
/// fields are mixed, when an uploaded file binds from anywhere but the form, or when a length
/// range, numeric range or regex is malformed.
pub fn validate_bindings(handler: &str, fields: &[FieldBinding]) -> GenResult<()> {
    let mut body = 0usize;
    let mut form = false;
    for field in fields {
        resolve_identifier(&field.name)?;
        let Some(position) = field.position else {
            continue;
        };
        match position {
            SourcePosition::Body => body += 1,
            SourcePosition::Form => form = true,
            _ => {}
        }
        if UploadKind::of(&field.value_type).is_some() && position != SourcePosition::Form {
            return Err(GenError::binding(
                handler,
                format!("uploaded file field {:?} must bind from form", field.name),
            ));
        }
        if let Some(len) = &field.len {
            check_range(handler, &field.name, "len", len, &LEN_RANGE)?;
        }
        if let Some(range) = &field.range {
            check_range(handler, &field.name, "range", range, &NUM_RANGE)?;
        }
        if let Some(pattern) = &field.regex {
            Regex::new(pattern).map_err(|e| {
                GenError::binding(handler, format!("regex of {:?} does not compile: {e}", field.name))
            })?;
        }
    }
    if body > 1 {
        return Err(GenError::binding(handler, "more than one field binds the body"));
    }
    if body == 1 && form {
        return Err(GenError::binding(
            handler,
            "form and body fields can not be used together",
        ));
    }
    Ok(())
}

fn check_range(handler: &str, field: &str, what: &str, value: &str, shape: &Regex) -> GenResult<()> {
    let value = value.trim();
    let malformed = || GenError::binding(handler, format!("{what} of {field:?} is malformed: {value:?}"));
    if value.is_empty() || value == ":" || !shape.is_match(value) {
        return Err(malformed());
    }
    if let Some((min, max)) = value.split_once(':') {
        if let (Ok(min), Ok(max)) = (min.parse::<f64>(), max.parse::<f64>()) {
            if min > max {
                return Err(malformed());
            }
        }
    }
    Ok(())
}

/// Synthesize the struct field declarations of a record handler.
///
/// Declaration order follows `fields`; duplicate names are not detected here.
///
/// # Errors
///
/// Returns [`GenError::InvalidIdentifier`] when a field name cannot be canonicalized.
pub fn synthesize(fields: &[FieldBinding]) -> GenResult<SynthesizedFields> {
    let mut imports = BTreeSet::new();
    let mut decls = Vec::with_capacity(fields.len());
    for field in fields {
        let canonical = resolve_identifier(&field.name)?.canonical().to_string();
        let snake = to_snake_case(&canonical);
        let rust_name = rust_ident(&snake);
        // a suffixed name would change the request key it binds from
        let param_name = field
            .param_name
            .clone()
            .or_else(|| (rust_name.trim_start_matches("r#") != snake).then(|| snake.clone()));

        let binding = field.position.map(|position| BindingMeta {
            position,
            param_name,
            constraints: constraints_of(field),
        });

        if UploadKind::of(&field.value_type).is_some() {
            imports.insert("UploadedFile".to_string());
        }
        if field.value_type.contains("Cookie") {
            imports.insert("Cookie".to_string());
        }

        let companion = field.upload_kind().map(|kind| {
            let (suffix, value_type) = match kind {
                UploadKind::Single => ("Url", "String"),
                UploadKind::Multi => ("Urls", "Vec<String>"),
            };
            let canonical_name = format!("{canonical}{suffix}");
            CompanionField {
                rust_name: rust_ident(&to_snake_case(&canonical_name)),
                canonical_name,
                value_type,
                kind,
            }
        });

        decls.push(FieldDecl {
            canonical_name: canonical,
            rust_name,
            value_type: field.value_type.trim().to_string(),
            binding,
            attrs: field.attrs.clone(),
            companion,
        });
    }
    Ok(SynthesizedFields {
        fields: decls,
        runtime_imports: imports.into_iter().collect(),
    })
}

fn constraints_of(field: &FieldBinding) -> Vec<Constraint> {
    let mut out = Vec::new();
    if field.required {
        out.push(Constraint::Required);
    }
    if field.nonzero {
        out.push(Constraint::Nonzero);
    }
    if let Some(v) = non_empty(&field.len) {
        out.push(Constraint::Len(v));
    }
    if let Some(v) = non_empty(&field.range) {
        out.push(Constraint::Range(v));
    }
    if let Some(v) = non_empty(&field.regex) {
        out.push(Constraint::Regex(v));
    }
    if let Some(mb) = field.max_mb.filter(|mb| *mb > 0) {
        out.push(Constraint::MaxMb(mb));
    }
    if let Some(v) = non_empty(&field.error) {
        out.push(Constraint::Err(v));
    }
    if let Some(v) = non_empty(&field.desc) {
        out.push(Constraint::Desc(v));
    }
    out
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use SourcePosition::*;

    #[test]
    fn test_upload_field_gains_one_companion() {
        let fields = vec![
            FieldBinding::new("avatar", "UploadedFile").bind(Form),
            FieldBinding::new("photos", "Vec<UploadedFile>").bind(Form),
            FieldBinding::new("name", "String").bind(Form),
        ];
        let out = synthesize(&fields).unwrap();
        assert_eq!(out.fields.len(), 3);

        let single = out.fields[0].companion.as_ref().unwrap();
        assert_eq!(single.canonical_name, "AvatarUrl");
        assert_eq!(single.rust_name, "avatar_url");
        assert_eq!(single.value_type, "String");

        let multi = out.fields[1].companion.as_ref().unwrap();
        assert_eq!(multi.canonical_name, "PhotosUrls");
        assert_eq!(multi.value_type, "Vec<String>");

        assert!(out.fields[2].companion.is_none());
        assert_eq!(out.uploads().count(), 2);
        assert_eq!(out.runtime_imports, vec!["UploadedFile"]);
    }

    #[test]
    fn test_constraints_in_emission_order() {
        let mut field = FieldBinding::new("name", "String")
            .bind(Form)
            .required()
            .with_len("1:10")
            .with_desc("your name");
        field.nonzero = true;
        field.param_name = Some("user_name".into());
        field.max_mb = Some(32);
        field.error = Some("bad name".into());
        let out = synthesize(&[field]).unwrap();
        let meta = out.fields[0].binding.as_ref().unwrap();
        assert_eq!(
            meta.attribute(),
            r#"param(in = "form", name = "user_name", required, nonzero, len = "1:10", maxmb = 32, err = "bad name", desc = "your name")"#
        );
    }

    #[test]
    fn test_plain_fields_pass_through() {
        let mut field = FieldBinding::new("extra", "Meta");
        field.attrs = vec!["serde(flatten)".into()];
        let out = synthesize(&[field]).unwrap();
        assert!(out.fields[0].binding.is_none());
        assert!(out.fields[0].companion.is_none());
        assert_eq!(out.fields[0].attrs, vec!["serde(flatten)"]);
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let fields = vec![
            FieldBinding::new("id", "u64").bind(Query),
            FieldBinding::new("id", "u64").bind(Header),
        ];
        assert_eq!(synthesize(&fields).unwrap().fields.len(), 2);
    }

    #[test]
    fn test_keyword_field_names_are_escaped() {
        let out = synthesize(&[FieldBinding::new("type", "String").bind(Query)]).unwrap();
        assert_eq!(out.fields[0].canonical_name, "Type");
        assert_eq!(out.fields[0].rust_name, "r#type");
    }

    #[test]
    fn test_self_field_names_are_suffixed() {
        let fields = vec![
            FieldBinding::new("self", "String").bind(Query),
            FieldBinding::new("Self", "String").bind(Header),
            FieldBinding::new("super", "String"),
        ];
        let out = synthesize(&fields).unwrap();
        assert_eq!(out.fields[0].rust_name, "self_");
        assert_eq!(
            out.fields[0].binding.as_ref().unwrap().attribute(),
            r#"param(in = "query", name = "self")"#
        );
        assert_eq!(out.fields[1].rust_name, "self_");
        assert_eq!(out.fields[2].rust_name, "super_");
        assert!(out.fields[2].binding.is_none());
    }

    #[test]
    fn test_validate_rejects_two_bodies() {
        let fields = vec![
            FieldBinding::new("a", "Payload").bind(Body),
            FieldBinding::new("b", "Payload").bind(Body),
        ];
        assert!(matches!(
            validate_bindings("H", &fields),
            Err(GenError::InvalidBinding { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_form_with_body() {
        let fields = vec![
            FieldBinding::new("a", "String").bind(Form),
            FieldBinding::new("b", "Payload").bind(Body),
        ];
        assert!(validate_bindings("H", &fields).is_err());
    }

    #[test]
    fn test_validate_rejects_upload_outside_form() {
        let fields = vec![FieldBinding::new("a", "UploadedFile").bind(Query)];
        assert!(validate_bindings("H", &fields).is_err());
    }

    #[test]
    fn test_validate_ranges_and_regex() {
        let ok = vec![
            FieldBinding::new("a", "String").bind(Query).with_len("3"),
            FieldBinding::new("b", "String").bind(Query).with_len(":6"),
            FieldBinding::new("c", "i32").bind(Query).with_range("-1.5:10"),
        ];
        assert!(validate_bindings("H", &ok).is_ok());

        for bad in [
            FieldBinding::new("a", "String").bind(Query).with_len("a:b"),
            FieldBinding::new("a", "String").bind(Query).with_len(":"),
            FieldBinding::new("a", "i32").bind(Query).with_range("10:1"),
        ] {
            assert!(validate_bindings("H", &[bad]).is_err());
        }

        let mut regex = FieldBinding::new("a", "String").bind(Query);
        regex.regex = Some("(".into());
        assert!(validate_bindings("H", &[regex]).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_field_name() {
        let fields = vec![FieldBinding::new("9lives", "String").bind(Query)];
        assert!(matches!(
            validate_bindings("H", &fields),
            Err(GenError::InvalidIdentifier { .. })
        ));
    }
}
