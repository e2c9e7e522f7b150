// Static file serving
//
// `App::static_dir` registers a catch-all route whose handler resolves the
// captured remainder against a root directory. Lookups never escape the
// root: parent-directory components are rejected before touching the
// filesystem.

use crate::context::Context;
use crate::error::Error;
use crate::handler::Handler;
use crate::response::plain_error;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Build a handler serving files below `root`. The route registering it
/// must capture the remainder in a `filepath` parameter.
pub fn serve_dir(root: PathBuf) -> impl Handler {
    move |ctx: Context| {
        let root = root.clone();
        async move { serve_file(&root, ctx).await }
    }
}

async fn serve_file(root: &Path, ctx: Context) -> Result<(), Error> {
    let raw = ctx.param("filepath").trim_start_matches('/');
    let Some(rel) = sanitize(raw) else {
        plain_error(
            &mut *ctx.writer().lock().unwrap(),
            StatusCode::BAD_REQUEST,
            "invalid URL path",
        );
        return Ok(());
    };

    let mut target = root.join(rel);
    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => {
            target.push("index.html");
            if tokio::fs::metadata(&target).await.is_err() {
                not_found(&ctx);
                return Ok(());
            }
        }
        Ok(_) => {}
        Err(_) => {
            not_found(&ctx);
            return Ok(());
        }
    }

    let contents = match tokio::fs::read(&target).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            not_found(&ctx);
            return Ok(());
        }
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            plain_error(
                &mut *ctx.writer().lock().unwrap(),
                StatusCode::FORBIDDEN,
                "403 Forbidden",
            );
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    debug!(path = %target.display(), bytes = contents.len(), "serving static file");
    let mut writer = ctx.writer().lock().unwrap();
    writer.insert_header(
        CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&target)),
    );
    writer.write(&contents);
    Ok(())
}

/// Reject any path that could walk above the root; returns the cleaned
/// relative path otherwise.
fn sanitize(rel: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(clean)
}

fn not_found(ctx: &Context) {
    plain_error(
        &mut *ctx.writer().lock().unwrap(),
        StatusCode::NOT_FOUND,
        "404 page not found",
    );
}

/// Content type from the file extension; octet-stream when unknown.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("pdf") => "application/pdf",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use bytes::Bytes;
    use http::{Method, Request, Response};
    use http_body_util::{BodyExt as _, Full};
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.css"), "body { margin: 0 }").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        let app = App::new();
        app.set_access_log(false);
        app.static_dir("/public", dir.path());
        (dir, app)
    }

    async fn request(app: &App, path: &str) -> Response<Full<Bytes>> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap();
        app.handle(req).await
    }

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_file_with_content_type() {
        let (_dir, app) = fixture();
        let response = request(&app, "/public/app.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/css");
        assert_eq!(body_text(response).await, "body { margin: 0 }");
    }

    #[tokio::test]
    async fn test_nested_file_resolves() {
        let (_dir, app) = fixture();
        let response = request(&app, "/public/docs/index.html").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<h1>docs</h1>");
    }

    #[tokio::test]
    async fn test_directory_serves_index_html() {
        let (_dir, app) = fixture();
        let response = request(&app, "/public/docs").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "<h1>docs</h1>");
    }

    #[tokio::test]
    async fn test_directory_without_index_is_404() {
        let (_dir, app) = fixture();
        let response = request(&app, "/public/empty").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let (_dir, app) = fixture();
        let response = request(&app, "/public/nope.css").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "404 page not found\n");
    }

    #[tokio::test]
    async fn test_parent_components_rejected() {
        let (_dir, app) = fixture();
        let response = request(&app, "/public/../secret.txt").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "invalid URL path\n");
    }

    #[tokio::test]
    async fn test_mount_respects_subrouter_prefix() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("note.txt"), "hi").unwrap();
        let app = App::new();
        app.set_access_log(false);
        let assets = app.subrouter("/assets");
        assets.static_dir("/files", dir.path());
        let response = request(&app, "/assets/files/note.txt").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "hi");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a/b.css"), Some(PathBuf::from("a/b.css")));
        assert_eq!(sanitize("./a"), Some(PathBuf::from("a")));
        assert_eq!(sanitize("../x"), None);
        assert_eq!(sanitize("a/../../b"), None);
        assert_eq!(sanitize(""), Some(PathBuf::new()));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("x.html")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("x.svg")), "image/svg+xml");
        assert_eq!(content_type_for(Path::new("x.unknown")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }
}
