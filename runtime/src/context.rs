//! Per-request state handed to record handlers.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Multipart, RawPathParams, Request};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, error};

use crate::bind::{BindError, Source};
use crate::upload::{SavedFile, UploadedFile};

/// Directory uploads are saved into, relative to the working directory.
pub const UPLOAD_DIR_ENV: &str = "ROUTEFORGE_UPLOAD_DIR";
const DEFAULT_UPLOAD_DIR: &str = "upload";

type Params = HashMap<String, Vec<String>>;

/// A fully read request: path parameters, query, cookies, form fields, files and body.
#[derive(Debug, Default)]
pub struct Context {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    path: HashMap<String, String>,
    query: Params,
    cookies: HashMap<String, String>,
    form: Params,
    files: HashMap<String, Vec<UploadedFile>>,
    body: Bytes,
    upload_dir: PathBuf,
}

fn push_pairs(target: &mut Params, input: &[u8]) {
    for (k, v) in url::form_urlencoded::parse(input) {
        target.entry(k.into_owned()).or_default().push(v.into_owned());
    }
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().trim_matches('"').to_string()))
        })
        .collect()
}

fn all<'a>(params: &'a Params, name: &str) -> Vec<&'a str> {
    params
        .get(name)
        .map(|vs| vs.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

impl Context {
    /// Read the whole request.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Request`] when the body or a multipart field cannot be read.
    pub async fn from_request(req: Request) -> Result<Self, BindError> {
        let (mut parts, body) = req.into_parts();
        let path = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(params) => params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            Err(_) => HashMap::new(),
        };
        let mut ctx = Context {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            path,
            cookies: parse_cookies(&parts.headers),
            upload_dir: std::env::var_os(UPLOAD_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            ..Context::default()
        };
        if let Some(query) = parts.uri.query() {
            push_pairs(&mut ctx.query, query.as_bytes());
        }

        let kind = content_type(&parts.headers).to_ascii_lowercase();
        let req = Request::from_parts(parts, body);
        if kind.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, &())
                .await
                .map_err(|e| BindError::Request(e.body_text()))?;
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| BindError::Request(e.body_text()))?
            {
                let name = field.name().unwrap_or_default().to_string();
                match field.file_name().map(str::to_string) {
                    Some(file_name) => {
                        let content_type = field.content_type().map(str::to_string);
                        let bytes = field.bytes().await.map_err(|e| BindError::Request(e.body_text()))?;
                        ctx.files.entry(name).or_default().push(UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        });
                    }
                    None => {
                        let text = field.text().await.map_err(|e| BindError::Request(e.body_text()))?;
                        ctx.form.entry(name).or_default().push(text);
                    }
                }
            }
        } else {
            ctx.body = Bytes::from_request(req, &())
                .await
                .map_err(|e| BindError::Request(e.body_text()))?;
            if kind.starts_with("application/x-www-form-urlencoded") {
                let body = ctx.body.clone();
                push_pairs(&mut ctx.form, &body);
            }
        }
        debug!(method = %ctx.method, uri = %ctx.uri, "request read");
        Ok(ctx)
    }

    /// Raw values of a parameter, in the order they were sent.
    pub fn values(&self, source: Source, name: &str) -> Vec<&str> {
        match source {
            Source::Path => self.path.get(name).map(String::as_str).into_iter().collect(),
            Source::Query => all(&self.query, name),
            Source::Form => all(&self.form, name),
            Source::Header => self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect(),
            Source::Cookie => self.cookies.get(name).map(String::as_str).into_iter().collect(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path.get(name).map(String::as_str)
    }

    /// Last value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).and_then(|vs| vs.last()).map(String::as_str)
    }

    /// Last value of a form field.
    pub fn form(&self, name: &str) -> Option<&str> {
        self.form.get(name).and_then(|vs| vs.last()).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Request body; empty for multipart requests.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// First file uploaded under `name`.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files(name).first()
    }

    /// Every file uploaded under `name`.
    pub fn files(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Directory uploads are saved into.
    pub fn upload_dir(&self) -> &std::path::Path {
        &self.upload_dir
    }

    /// Store the first file uploaded under `name`; `None` when nothing was sent.
    ///
    /// # Errors
    ///
    /// [`BindError::Save`] when writing fails.
    pub async fn save_file(&self, name: &str, cover: bool) -> Result<Option<SavedFile>, BindError> {
        let Some(file) = self.file(name) else {
            return Ok(None);
        };
        file.save(&self.upload_dir, cover)
            .await
            .map(Some)
            .map_err(|source| BindError::Save {
                field: name.to_string(),
                source,
            })
    }

    /// Store every file uploaded under `name`. Nothing sent is not an error.
    ///
    /// # Errors
    ///
    /// [`BindError::Save`] on the first file that cannot be written.
    pub async fn save_files(&self, name: &str, cover: bool) -> Result<Vec<SavedFile>, BindError> {
        let mut saved = Vec::new();
        for file in self.files(name) {
            let stored = file
                .save(&self.upload_dir, cover)
                .await
                .map_err(|source| BindError::Save {
                    field: name.to_string(),
                    source,
                })?;
            saved.push(stored);
        }
        Ok(saved)
    }

    /// Serialize `value` as the JSON response body.
    pub fn json<T: Serialize + ?Sized>(&self, status: StatusCode, value: &T) -> Response {
        match serde_json::to_vec(value) {
            Ok(body) => (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            Err(err) => {
                error!(error = %err, "failed to serialize response");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
