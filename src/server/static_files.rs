//! Static file responder.
//!
//! Turns a parsed request into a response for a file below the document
//! root. Resolution is redone for every request: nothing about the
//! filesystem is cached, so edits to the served tree show up immediately.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::debug;
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;

use crate::parser::{HttpRequest, Method};
use crate::server::config::ServerConfig;
use crate::server::error::ResourceError;
use crate::server::mime::mime_type_for;
use crate::server::path::resolve_under;
use crate::server::response::{HttpResponse, StatusCode};

/// Value of the `Allow` header on `405` responses.
pub const ALLOWED_METHODS: &str = "GET, HEAD";

/// A file a request path resolved to.
#[derive(Debug, Clone)]
pub struct ResolvedResource {
    /// Canonical location of the file, always below the document root.
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
    pub last_modified: Option<SystemTime>,
    pub mime_type: &'static str,
}

/// Build the response for `request`.
///
/// Every failure becomes a status response here. `HEAD` gets exactly the
/// headers `GET` would get, with the body left off.
pub async fn respond(request: &HttpRequest, config: &ServerConfig) -> HttpResponse {
    let response = match serve(request, config).await {
        Ok(response) => response,
        Err(err) => {
            debug!("{} {}: {err}", request.method, request.path);
            let response = error_response(err.status(), config);
            if matches!(err, ResourceError::MethodNotAllowed(_)) {
                response.with_header("Allow", ALLOWED_METHODS)
            } else {
                response
            }
        }
    };

    if request.method == Method::HEAD {
        response.without_body()
    } else {
        response
    }
}

/// A bodied error response carrying the common headers.
pub fn error_response(status: StatusCode, config: &ServerConfig) -> HttpResponse {
    base_response(status, config).with_error_body()
}

fn base_response(status: StatusCode, config: &ServerConfig) -> HttpResponse {
    HttpResponse::new(status)
        .with_header("Server", config.server_name.as_str())
        .with_header("Date", httpdate::fmt_http_date(SystemTime::now()))
}

async fn serve(request: &HttpRequest, config: &ServerConfig) -> Result<HttpResponse, ResourceError> {
    if !request.method.is_supported() {
        return Err(ResourceError::MethodNotAllowed(request.method.to_string()));
    }

    let resource = resolve(&request.path, config).await?;
    let mut file = File::open(&resource.absolute_path)
        .await
        .map_err(|e| open_error(&resource.absolute_path, e))?;

    let response = base_response(StatusCode::Ok, config).with_content_type(resource.mime_type);
    let response = if request.method == Method::HEAD {
        response.with_header("Content-Length", resource.size_bytes.to_string())
    } else if resource.size_bytes <= config.in_memory_file_limit {
        let mut bytes = Vec::with_capacity(resource.size_bytes as usize);
        file.read_to_end(&mut bytes).await?;
        response.with_body_bytes(bytes)
    } else {
        response.with_body_file(file, resource.size_bytes)
    };

    Ok(match resource.last_modified {
        Some(modified) => response.with_header("Last-Modified", httpdate::fmt_http_date(modified)),
        None => response,
    })
}

/// Resolve a raw request path to a regular file below the document root.
///
/// Directories resolve to their default document. The final location is
/// canonicalized and checked against the root again, so a symlink inside
/// the tree cannot hand out files from outside it.
pub async fn resolve(raw_path: &str, config: &ServerConfig) -> Result<ResolvedResource, ResourceError> {
    let root = &config.document_root;
    let mut path = resolve_under(root, raw_path)?;

    let mut metadata = stat(&path).await?;
    if metadata.is_dir() {
        path.push(&config.default_document);
        metadata = stat(&path).await?;
    }
    if !metadata.is_file() {
        return Err(ResourceError::NotFound(path.display().to_string()));
    }

    let absolute_path = fs::canonicalize(&path).await.map_err(|e| open_error(&path, e))?;
    if !absolute_path.starts_with(root) {
        return Err(ResourceError::Forbidden(format!(
            "{} resolves outside the document root",
            path.display()
        )));
    }

    Ok(ResolvedResource {
        mime_type: mime_type_for(&path),
        absolute_path,
        size_bytes: metadata.len(),
        last_modified: metadata.modified().ok(),
    })
}

async fn stat(path: &Path) -> Result<std::fs::Metadata, ResourceError> {
    fs::metadata(path).await.map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => ResourceError::Forbidden(path.display().to_string()),
        // Missing files, a file used as a directory, names too long: nothing to serve.
        _ => ResourceError::NotFound(format!("{}: {e}", path.display())),
    })
}

fn open_error(path: &Path, e: std::io::Error) -> ResourceError {
    match e.kind() {
        ErrorKind::PermissionDenied => ResourceError::Forbidden(path.display().to_string()),
        ErrorKind::NotFound => ResourceError::NotFound(path.display().to_string()),
        _ => ResourceError::Internal(e),
    }
}
