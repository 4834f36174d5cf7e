//! Service des fichiers de l'application web, avec repli SPA sur `index.html`.

use crate::errors::RequestError;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use std::path::{Path, PathBuf};
use tracing::debug;

const INDEX_FILE: &str = "index.html";
const CACHE_IMMUTABLE: &str = "public, max-age=31536000";
const CACHE_NONE: &str = "no-cache";

/// Fichier résolu, prêt à être renvoyé
#[derive(Debug, Clone)]
pub struct Asset {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

impl Asset {
    pub fn is_html(&self) -> bool {
        self.mime.starts_with("text/html")
    }
}

/// Serveur de fichiers statiques en lecture seule
#[derive(Debug, Clone)]
pub struct StaticAssetServer {
    root: PathBuf,
    long_cache: bool,
}

impl StaticAssetServer {
    /// `long_cache` active le cache navigateur d'un an pour les fichiers non HTML.
    pub fn new(root: impl Into<PathBuf>, long_cache: bool) -> Self {
        Self {
            root: root.into(),
            long_cache,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joint le chemin demandé sous la racine en ignorant `.` et `..`.
    pub fn join(&self, request_path: &str) -> PathBuf {
        request_path
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Résout un chemin de requête en fichier.
    ///
    /// Un chemin absent ou désignant un répertoire renvoie `index.html`.
    pub async fn resolve(&self, request_path: &str) -> Result<Asset, RequestError> {
        let candidate = self.join(request_path);
        let target = match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => candidate,
            _ => {
                debug!("SPA fallback for {}", request_path);
                self.root.join(INDEX_FILE)
            }
        };

        let bytes = tokio::fs::read(&target)
            .await
            .map_err(|source| RequestError::AssetRead {
                path: target.clone(),
                source,
            })?;

        Ok(Asset {
            mime: mime_from_extension(&target),
            bytes,
            path: target,
        })
    }

    /// En-tête `Cache-Control` à appliquer au fichier
    pub fn cache_control(&self, asset: &Asset) -> &'static str {
        if self.long_cache && !asset.is_html() {
            CACHE_IMMUTABLE
        } else {
            CACHE_NONE
        }
    }

    /// Résout et construit la réponse HTTP (500 si la lecture échoue)
    pub async fn serve(&self, request_path: &str) -> Response {
        match self.resolve(request_path).await {
            Ok(asset) => {
                let cache = self.cache_control(&asset);
                (
                    [
                        (header::CONTENT_TYPE, HeaderValue::from_static(asset.mime)),
                        (header::CACHE_CONTROL, HeaderValue::from_static(cache)),
                    ],
                    asset.bytes,
                )
                    .into_response()
            }
            Err(e) => e.into_response(),
        }
    }
}

/// Type MIME déduit de l'extension
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") | Some("map") => "application/json; charset=utf-8",
        Some("webmanifest") => "application/manifest+json",
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
        Some("xml") => "application/xml",
        Some("txt") => "text/plain; charset=utf-8",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn web_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), b"<html>app</html>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.js"), b"console.log(1)").unwrap();
        dir
    }

    #[test]
    fn test_join_drops_traversal() {
        let server = StaticAssetServer::new("/srv/web", true);
        assert_eq!(
            server.join("/../../etc/passwd"),
            PathBuf::from("/srv/web/etc/passwd")
        );
        assert_eq!(server.join("/a/./b//c"), PathBuf::from("/srv/web/a/b/c"));
        assert_eq!(server.join("/"), PathBuf::from("/srv/web"));
    }

    #[test]
    fn test_mime_table() {
        assert_eq!(mime_from_extension(Path::new("a/index.html")), "text/html; charset=utf-8");
        assert_eq!(mime_from_extension(Path::new("logo.SVG")), "image/svg+xml");
        assert_eq!(mime_from_extension(Path::new("blob.xyz")), "application/octet-stream");
        assert_eq!(mime_from_extension(Path::new("Makefile")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_resolve_file_and_fallbacks() {
        let dir = web_root();
        let server = StaticAssetServer::new(dir.path(), true);

        let js = server.resolve("/assets/app.js").await.unwrap();
        assert_eq!(js.bytes, b"console.log(1)");
        assert_eq!(js.mime, "application/javascript; charset=utf-8");
        assert_eq!(server.cache_control(&js), CACHE_IMMUTABLE);

        let missing = server.resolve("/settings/network").await.unwrap();
        assert_eq!(missing.bytes, b"<html>app</html>");
        assert_eq!(server.cache_control(&missing), CACHE_NONE);

        let directory = server.resolve("/assets").await.unwrap();
        assert_eq!(directory.path, dir.path().join("index.html"));
    }

    #[tokio::test]
    async fn test_development_disables_long_cache() {
        let dir = web_root();
        let server = StaticAssetServer::new(dir.path(), false);
        let js = server.resolve("/assets/app.js").await.unwrap();
        assert_eq!(server.cache_control(&js), CACHE_NONE);
    }

    #[tokio::test]
    async fn test_missing_index_is_read_error() {
        let dir = TempDir::new().unwrap();
        let server = StaticAssetServer::new(dir.path(), true);
        match server.resolve("/").await {
            Err(RequestError::AssetRead { path, .. }) => {
                assert_eq!(path, dir.path().join("index.html"))
            }
            other => panic!("expected AssetRead, got {other:?}"),
        }
    }
}
