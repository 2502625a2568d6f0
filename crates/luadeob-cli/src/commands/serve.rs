//! `luadeob serve` command implementation.
//!
//! A small HTTP front end over the rename pipeline:
//!
//! ```text
//! GET  /                  empty form
//! POST /                  form field `input_code` → page with both panes
//! POST /api/deobfuscate   {"code": "..."} → {"ok": true, "output": "..."}
//! ```
//!
//! Each request runs the pipeline on a blocking worker with its own AST and
//! renamer; the only shared state is the read-only [`Config`].

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use luadeob_core::{deobfuscate, Config, Deobfuscated};
use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};

/// Serve command action.
#[derive(Debug, Clone)]
pub struct ServeAction {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Config file.
    pub config: Option<PathBuf>,
}

type AppState = Arc<Config>;

/// Worst-case growth of the source once it is form- or JSON-encoded
/// (`%XX` per byte).
const BODY_ENCODING_FACTOR: usize = 3;

/// Room for the field names and JSON punctuation around the source.
const BODY_OVERHEAD: usize = 64 * 1024;

/// Form body posted by the page.
#[derive(Debug, Deserialize)]
struct FormInput {
    #[serde(default)]
    input_code: Option<String>,
}

/// JSON request body.
#[derive(Debug, Deserialize)]
struct ApiRequest {
    code: String,
}

/// JSON response body.
#[derive(Debug, Serialize)]
struct ApiResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    declarations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    code: String,
    message: String,
}

/// Run the server until interrupted.
pub async fn run(action: ServeAction) -> Result<()> {
    let config = match &action.config {
        Some(path) => Config::load(path).into_diagnostic()?,
        None => Config::default(),
    };

    let addr: SocketAddr = format!("{}:{}", action.host, action.port)
        .parse()
        .into_diagnostic()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    info!(%addr, "listening");
    println!("  Deobfuscator running at http://{}", addr);
    println!("  (ctrl+c to exit)");

    serve_until(listener, Arc::new(config), shutdown_signal())
        .await
        .into_diagnostic()?;

    info!("server stopped");
    Ok(())
}

/// Serve on `listener` until `shutdown` resolves, letting in-flight requests
/// finish.
async fn serve_until<F>(
    listener: tokio::net::TcpListener,
    config: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    println!();
    println!("Server stopped.");
}

/// Request body cap: large enough for any source the config accepts, so
/// oversized sources reach the pipeline and get a structured error.
fn body_limit(config: &Config) -> usize {
    config
        .max_input_bytes
        .saturating_mul(BODY_ENCODING_FACTOR)
        .saturating_add(BODY_OVERHEAD)
}

/// Build the application router.
pub fn router(config: AppState) -> Router {
    let limit = body_limit(&config);
    Router::new()
        .route("/", get(index).post(submit))
        .route("/api/deobfuscate", post(api_deobfuscate))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(config)
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn index() -> Html<String> {
    Html(render_page("", None))
}

async fn submit(State(config): State<AppState>, Form(form): Form<FormInput>) -> Html<String> {
    let input = form.input_code.unwrap_or_default();
    if input.is_empty() {
        return Html(render_page("", None));
    }

    let outcome = run_pipeline(config, input.clone())
        .await
        .map(|out| out.code)
        .map_err(|message| format!("Error processing code: {message}"));
    Html(render_page(&input, Some(&outcome)))
}

async fn api_deobfuscate(
    State(config): State<AppState>,
    Json(request): Json<ApiRequest>,
) -> impl IntoResponse {
    match run_pipeline_typed(config, request.code).await {
        Ok(out) => (
            StatusCode::OK,
            Json(ApiResponse {
                ok: true,
                output: Some(out.code),
                declarations: Some(out.stats.declarations),
                error: None,
            }),
        ),
        Err((code, message)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse {
                ok: false,
                output: None,
                declarations: None,
                error: Some(ApiError { code, message }),
            }),
        ),
    }
}

/// Run the pipeline off the async executor, keeping the error code.
async fn run_pipeline_typed(
    config: AppState,
    source: String,
) -> std::result::Result<Deobfuscated, (String, String)> {
    debug!(bytes = source.len(), "deobfuscate request");
    let joined = tokio::task::spawn_blocking(move || deobfuscate(&source, &config)).await;
    match joined {
        Ok(Ok(out)) => Ok(out),
        Ok(Err(e)) => {
            warn!(code = e.code(), error = %e, "request failed");
            Err((e.code().to_string(), e.to_string()))
        }
        Err(e) => Err(("INTERNAL_ERROR".to_string(), e.to_string())),
    }
}

async fn run_pipeline(config: AppState, source: String) -> std::result::Result<Deobfuscated, String> {
    run_pipeline_typed(config, source)
        .await
        .map_err(|(_, message)| message)
}

// ============================================================================
// Page
// ============================================================================

/// Render the two-pane page. `outcome` is the output text or an error
/// message; `None` renders an empty output pane.
fn render_page(input: &str, outcome: Option<&std::result::Result<String, String>>) -> String {
    let (output, error) = match outcome {
        Some(Ok(code)) => (code.as_str(), None),
        Some(Err(message)) => ("", Some(message.as_str())),
        None => ("", None),
    };
    let alert = error
        .map(|e| format!(r#"<div class="alert alert-danger mt-3">{}</div>"#, escape_html(e)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Luau Deobfuscator</title>
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet">
    <style>
        body {{ padding: 20px; background-color: #f8f9fa; }}
        .container {{ max-width: 1200px; }}
        textarea {{ font-family: monospace; height: 400px; }}
        .btn-submit {{ margin-top: 10px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1 class="text-center mb-4">Luau Script Deobfuscator</h1>
        <form method="POST">
            <div class="row">
                <div class="col-md-6">
                    <h3>Input Obfuscated Code</h3>
                    <textarea name="input_code" class="form-control" placeholder="Paste your obfuscated Luau code here...">
{input}</textarea>
                </div>
                <div class="col-md-6">
                    <h3>Deobfuscated Output</h3>
                    <textarea class="form-control" readonly>
{output}</textarea>
                </div>
            </div>
            {alert}
            <div class="text-center">
                <button type="submit" class="btn btn-primary btn-lg btn-submit">Deobfuscate</button>
            </div>
        </form>
    </div>
    <script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/js/bootstrap.bundle.min.js"></script>
</body>
</html>
"#,
        input = escape_html(input),
        output = escape_html(output),
        alert = alert,
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"if a < b and c > "d" then"#),
            "if a &lt; b and c &gt; &quot;d&quot; then"
        );
        assert_eq!(escape_html("x & 'y'"), "x &amp; &#39;y&#39;");
    }

    #[test]
    fn test_render_empty_page() {
        let page = render_page("", None);
        assert!(page.contains("<title>Luau Deobfuscator</title>"));
        assert!(page.contains(r#"name="input_code""#));
        assert!(!page.contains("alert-danger"));
    }

    #[test]
    fn test_render_output_is_escaped() {
        let outcome = Ok("return v1 < 2\n".to_string());
        let page = render_page("return a < 2", Some(&outcome));
        assert!(page.contains("return a &lt; 2</textarea>"));
        assert!(page.contains("return v1 &lt; 2\n</textarea>"));
    }

    #[test]
    fn test_render_error_keeps_input() {
        let outcome = Err("Error processing code: boom <here>".to_string());
        let page = render_page("local = ", Some(&outcome));
        assert!(page.contains("local = </textarea>"));
        assert!(page.contains(
            r#"<div class="alert alert-danger mt-3">Error processing code: boom &lt;here&gt;</div>"#
        ));
    }

    #[test]
    fn test_render_keeps_leading_newline() {
        let outcome = Ok("\nreturn 1\n".to_string());
        let page = render_page("\nreturn 1", Some(&outcome));
        assert!(page.contains("here...\">\n\nreturn 1</textarea>"));
        assert!(page.contains("readonly>\n\nreturn 1\n</textarea>"));
    }

    #[test]
    fn test_body_limit_covers_max_input() {
        let config = Config::default();
        assert!(body_limit(&config) > config.max_input_bytes * 2);

        let config = Config {
            max_input_bytes: usize::MAX,
            ..Config::default()
        };
        assert_eq!(body_limit(&config), usize::MAX);
    }

    async fn spawn_server() -> SocketAddr {
        spawn_server_with(Config::default()).await
    }

    async fn spawn_server_with(config: Config) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(config)))
                .await
                .unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_api_deobfuscate() {
        let addr = spawn_server().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("http://{addr}/api/deobfuscate"))
            .json(&serde_json::json!({ "code": "local secret = 1 return secret" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["output"], "local v1 = 1\nreturn v1\n");
        assert_eq!(body["declarations"], 1);
    }

    #[tokio::test]
    async fn test_api_reports_parse_errors() {
        let addr = spawn_server().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("http://{addr}/api/deobfuscate"))
            .json(&serde_json::json!({ "code": "local = 1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "PARSE_ERROR");
        assert!(body.get("output").is_none());
    }

    #[tokio::test]
    async fn test_api_accepts_bodies_over_two_megabytes() {
        let addr = spawn_server().await;
        let client = reqwest::Client::new();

        let code = format!("--{}\nlocal big = 1 return big", "x".repeat(3 << 20));
        let resp = client
            .post(format!("http://{addr}/api/deobfuscate"))
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["output"], "local v1 = 1\nreturn v1\n");
    }

    #[tokio::test]
    async fn test_api_reports_input_too_large() {
        let addr = spawn_server_with(Config {
            max_input_bytes: 1024,
            ..Config::default()
        })
        .await;
        let client = reqwest::Client::new();

        let code = format!("--{}\nreturn 1", "x".repeat(4096));
        let resp = client
            .post(format!("http://{addr}/api/deobfuscate"))
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "INPUT_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_api_rejects_deep_nesting() {
        let addr = spawn_server().await;
        let client = reqwest::Client::new();

        let n = 10_000;
        let code = format!("local a = {}1{}", "(".repeat(n), ")".repeat(n));
        let resp = client
            .post(format!("http://{addr}/api/deobfuscate"))
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 422);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "PARSE_ERROR");

        // Server is still up.
        let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn test_form_submit_renames() {
        let addr = spawn_server().await;
        let client = reqwest::Client::new();

        let body = client
            .post(format!("http://{addr}/"))
            .header("content-type", "application/x-www-form-urlencoded")
            .body("input_code=local%20secret%20%3D%201")
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains(">\nlocal secret = 1</textarea>"));
        assert!(body.contains("readonly>\nlocal v1 = 1\n</textarea>"));
        assert!(!body.contains("alert-danger"));
    }

    #[tokio::test]
    async fn test_form_submit_error_keeps_input() {
        let addr = spawn_server().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("http://{addr}/"))
            .header("content-type", "application/x-www-form-urlencoded")
            .body("input_code=local%20%3D")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body = resp.text().await.unwrap();
        assert!(body.contains(r#"<div class="alert alert-danger mt-3">Error processing code: "#));
        assert!(body.contains(">\nlocal =</textarea>"));
    }

    #[tokio::test]
    async fn test_graceful_shutdown() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(
            listener,
            Arc::new(Config::default()),
            async move {
                let _ = rx.await;
            },
        ));

        let body = reqwest::get(format!("http://{addr}/"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("Luau Script Deobfuscator"));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_index_page() {
        let addr = spawn_server().await;
        let body = reqwest::get(format!("http://{addr}/"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("Luau Script Deobfuscator"));
    }
}
