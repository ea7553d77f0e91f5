use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use routeforge_runtime::{serve, Bind, Context, Cookie, Doc, Serve, UploadedFile};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Debug, Default, Bind, Serialize)]
pub struct Signup {
    #[param(in = "form", required, len = "1:10", desc = "user name")]
    pub name: String,
    #[param(in = "query", name = "ref")]
    pub referrer: Option<String>,
    #[param(in = "form", range = "0:150", err = "age is out of range")]
    pub age: u8,
    #[param(in = "form", regex = r"^[a-z]+$")]
    pub tags: Vec<String>,
}

impl Serve for Signup {
    async fn serve(self, ctx: &mut Context) -> Response {
        ctx.json(StatusCode::OK, &self)
    }

    fn doc() -> Doc {
        Doc {
            note: "create an account",
            returns: "the bound form",
        }
    }
}

#[derive(Debug, Default, Bind, Serialize)]
pub struct Show {
    #[param(in = "path", required, nonzero)]
    pub id: u64,
    #[param(in = "header", name = "x-token")]
    pub token: String,
    #[param(in = "cookie")]
    pub sid: Cookie,
    #[param(in = "query")]
    pub r#type: String,
    pub note: String,
}

impl Serve for Show {
    async fn serve(self, ctx: &mut Context) -> Response {
        ctx.json(StatusCode::OK, &self)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub count: u32,
}

#[derive(Debug, Default, Bind, Serialize)]
pub struct Create {
    #[param(in = "body", required)]
    pub item: Item,
}

impl Serve for Create {
    async fn serve(self, ctx: &mut Context) -> Response {
        ctx.json(StatusCode::CREATED, &self.item)
    }
}

#[derive(Debug, Default, Bind, Serialize)]
pub struct Upload {
    #[param(in = "form", required)]
    pub title: String,
    #[param(in = "form", maxmb = 1)]
    #[serde(skip)]
    pub avatar: Option<UploadedFile>,
    #[param(skip)]
    pub avatar_url: String,
}

impl Serve for Upload {
    async fn serve(self, ctx: &mut Context) -> Response {
        let file = self.avatar.as_ref();
        ctx.json(
            StatusCode::OK,
            &json!({
                "title": self.title,
                "file_name": file.map(|f| f.file_name.clone()),
                "size": file.map(UploadedFile::size),
                "avatar_url": self.avatar_url,
            }),
        )
    }
}

fn app() -> Router {
    Router::new()
        .route("/signup", post(serve::<Signup>))
        .route("/users/:id", get(serve::<Show>))
        .route("/items", post(serve::<Create>))
        .route("/upload", post(serve::<Upload>))
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart(title: &str, file: Option<(&str, Vec<u8>)>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!("--XBOUND\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{title}\r\n")
            .as_bytes(),
    );
    if let Some((name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--XBOUND\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"{name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"--XBOUND--\r\n");
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "multipart/form-data; boundary=XBOUND")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_form_and_query_binding() {
    let (status, body) = send(form("/signup?ref=home", "name=ann&age=30&tags=a&tags=bc")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "name": "ann", "referrer": "home", "age": 30, "tags": ["a", "bc"] })
    );
}

#[tokio::test]
async fn test_absent_optional_fields_take_defaults() {
    let (status, body) = send(form("/signup", "name=ann&age=")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["referrer"], Value::Null);
    assert_eq!(body["age"], 0);
    assert_eq!(body["tags"], json!([]));
}

#[tokio::test]
async fn test_missing_required_field_is_rejected() {
    let (status, body) = send(form("/signup", "age=30")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("\"name\""));
}

#[tokio::test]
async fn test_length_violation_is_rejected() {
    let (status, body) = send(form("/signup", "name=abcdefghijk")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("length 11"));
}

#[tokio::test]
async fn test_range_violation_uses_custom_message() {
    let (status, body) = send(form("/signup", "name=ann&age=151")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "age is out of range");

    // parse failures report the custom message too
    let (status, body) = send(form("/signup", "name=ann&age=old")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "age is out of range");
}

#[tokio::test]
async fn test_regex_checked_per_value() {
    let (status, body) = send(form("/signup", "name=ann&tags=ok&tags=Bad")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("\"Bad\""));
}

#[tokio::test]
async fn test_path_header_and_cookie_binding() {
    let request = Request::builder()
        .uri("/users/42?type=admin")
        .header("x-token", "t0k")
        .header("cookie", "other=1; sid=abc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "id": 42,
            "token": "t0k",
            "sid": { "name": "sid", "value": "abc" },
            "type": "admin",
            "note": "",
        })
    );
}

#[tokio::test]
async fn test_nonzero_path_param() {
    let request = Request::builder()
        .uri("/users/0")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("zero"));
}

#[tokio::test]
async fn test_json_body_binding() {
    let request = Request::builder()
        .method("POST")
        .uri("/items")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"title":"pen","count":3}"#))
        .unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "title": "pen", "count": 3 }));

    let request = Request::builder()
        .method("POST")
        .uri("/items")
        .header("content-type", "application/json")
        .body(Body::from("{"))
        .unwrap();
    let (status, _) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_multipart_upload_binding() {
    let (status, body) = send(multipart("cat", Some(("cat.png", vec![7u8; 64])))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "cat");
    assert_eq!(body["file_name"], "cat.png");
    assert_eq!(body["size"], 64);
    assert_eq!(body["avatar_url"], "");

    let (status, body) = send(multipart("none", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_name"], Value::Null);
}

#[tokio::test]
async fn test_upload_size_limit() {
    let too_big = vec![0u8; 1024 * 1024 + 1];
    let (status, body) = send(multipart("big", Some(("big.bin", too_big)))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("larger than 1 MB"));
}

#[test]
fn test_doc_defaults_to_empty() {
    assert_eq!(Show::doc(), Doc::default());
    assert_eq!(Signup::doc().note, "create an account");
}
