//! Preview server for a generated site.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};

/// Page served for unknown paths when the site provides one.
pub const NOT_FOUND_PAGE: &str = "404.html";

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewServerConfig {
    /// Directory containing the generated site
    pub root: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for PreviewServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public"),
            port: 7777,
            host: "127.0.0.1".to_string(),
            open: false,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {host}:{port}: {source}")]
    Bind {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] io::Error),
}

/// Serves the files of a generated site.
pub struct PreviewServer {
    config: PreviewServerConfig,
}

impl PreviewServer {
    pub fn new(config: PreviewServerConfig) -> Self {
        Self { config }
    }

    /// Router serving the site root, answering unknown paths with the
    /// site's 404 page.
    pub fn router(&self) -> Router {
        let not_found = ServeFile::new(self.config.root.join(NOT_FOUND_PAGE));
        Router::new()
            .fallback_service(ServeDir::new(&self.config.root).not_found_service(not_found))
    }

    /// Bind the configured address and serve until `shutdown` completes.
    pub async fn start<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| ServerError::Bind {
                host: self.config.host.clone(),
                port: self.config.port,
                source,
            })?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr().map_err(ServerError::Serve)?;
        let url = format!("http://{addr}");
        tracing::info!(root = %self.config.root.display(), "Serving site at {url}");

        if self.config.open {
            if let Err(err) = open::that(&url) {
                tracing::warn!(error = %err, "Failed to open browser");
            }
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    async fn start(root: PathBuf) -> (SocketAddr, oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = PreviewServer::new(PreviewServerConfig {
            root,
            ..Default::default()
        });
        tokio::spawn(server.serve(listener, async {
            let _ = stopped.await;
        }));
        (addr, stop)
    }

    #[test]
    fn creates_server_with_default_config() {
        let server = PreviewServer::new(PreviewServerConfig::default());
        assert_eq!(server.config.port, 7777);
        assert!(!server.config.open);
    }

    #[tokio::test]
    async fn serves_site_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("blog")).unwrap();
        fs::write(temp.path().join("blog/index.html"), "<h1>Blog</h1>").unwrap();
        let (addr, _stop) = start(temp.path().to_path_buf()).await;

        let response = get(addr, "/blog/index.html").await;

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("<h1>Blog</h1>"));
    }

    #[tokio::test]
    async fn answers_unknown_paths_with_not_found_page() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(NOT_FOUND_PAGE), "nothing here").unwrap();
        let (addr, _stop) = start(temp.path().to_path_buf()).await;

        let response = get(addr, "/missing.html").await;

        assert!(response.starts_with("HTTP/1.1 404"));
        assert!(response.ends_with("nothing here"));
    }

    #[tokio::test]
    async fn answers_plain_not_found_without_page() {
        let temp = tempdir().unwrap();
        let (addr, _stop) = start(temp.path().to_path_buf()).await;

        let response = get(addr, "/missing.html").await;

        assert!(response.starts_with("HTTP/1.1 404"));
    }
}
