//! Local build directory served as the application origin

use crate::error::{PrecacheError, PrecacheResult};
use crate::network::Network;
use crate::request::{Method, Request, Response};
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;
use url::Url;

/// Serves files under `root` for requests to `origin`
///
/// Directory paths serve their `index.html`. Missing files produce 404
/// responses, not errors. Requests for other origins fail like an
/// unreachable host.
#[derive(Debug, Clone)]
pub struct LocalNetwork {
    root: PathBuf,
    origin: Url,
}

impl LocalNetwork {
    /// Create a local backend
    pub fn new(root: PathBuf, origin: Url) -> Self {
        Self { root, origin }
    }

    /// Map a request URL onto a path under the root
    ///
    /// Segments are percent-decoded. A segment that decodes to `..` or
    /// contains a separator maps to nothing. The flag is set when the URL
    /// names a directory (trailing slash or empty path).
    fn file_path(&self, url: &Url) -> Option<(PathBuf, bool)> {
        let mut path = self.root.clone();
        let mut is_dir = true;

        if let Some(segments) = url.path_segments() {
            for segment in segments {
                let segment = percent_decode_str(segment).decode_utf8().ok()?;
                if segment == ".." || segment.contains(['/', '\\', '\0']) {
                    return None;
                }
                if segment.is_empty() || segment == "." {
                    is_dir = true;
                    continue;
                }
                path.push(&*segment);
                is_dir = false;
            }
        }

        Some((path, is_dir))
    }
}

#[async_trait]
impl Network for LocalNetwork {
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
        let url = &request.url;
        if url.origin() != self.origin.origin() {
            return Err(PrecacheError::network(
                url.as_str(),
                format!("host unreachable (serving {} only)", self.origin),
            ));
        }

        if !matches!(request.method, Method::Get | Method::Head) {
            return Ok(Response::new(url.clone(), 405).with_header("allow", "GET, HEAD"));
        }

        let Some((mut path, is_dir)) = self.file_path(url) else {
            return Ok(Response::new(url.clone(), 404));
        };
        if is_dir || matches!(fs::metadata(&path).await, Ok(meta) if meta.is_dir()) {
            path.push("index.html");
        }

        match fs::read(&path).await {
            Ok(bytes) => {
                debug!("Serving {} from {}", url, path.display());
                let mut response = Response::new(url.clone(), 200)
                    .with_header("content-type", content_type(&path))
                    .with_header("content-length", bytes.len().to_string());
                if request.method == Method::Get {
                    response.body = bytes;
                }
                Ok(response)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Not found: {}", path.display());
                Ok(Response::new(url.clone(), 404))
            }
            Err(e) => Err(PrecacheError::network(
                url.as_str(),
                format!("reading {}: {}", path.display(), e),
            )),
        }
    }

    fn network_name(&self) -> &'static str {
        "local"
    }
}

fn content_type(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("webmanifest") => "application/manifest+json",
        Some("wasm") => "application/wasm",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("xml") => "application/xml",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
