//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use capture_listener::config::ServerConfig;
use capture_listener::lifecycle::startup;
use capture_listener::lifecycle::Shutdown;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A running server on an ephemeral port with its own www and out directories.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub www: TempDir,
    pub out: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn www_path(&self) -> &Path {
        self.www.path()
    }

    pub fn out_path(&self) -> &Path {
        self.out.path()
    }

    /// Capture folders under the out dir, sorted by name.
    pub fn capture_folders(&self) -> Vec<PathBuf> {
        let mut folders: Vec<PathBuf> = std::fs::read_dir(self.out.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_dir())
            .collect();
        folders.sort();
        folders
    }

    /// Recorded GET request files under the out dir.
    pub fn recorded_gets(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.out.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .map_or(false, |n| n.to_string_lossy().starts_with("GET_"))
            })
            .collect()
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Populate a www root with a small site.
pub fn write_site(root: &Path) {
    std::fs::write(root.join("index.html"), "<h1>Home</h1>").unwrap();
    std::fs::write(root.join("style.css"), "body{}").unwrap();
    std::fs::create_dir_all(root.join("docs")).unwrap();
    std::fs::write(root.join("docs/notes.txt"), "notes").unwrap();
}

/// Start a server; `adjust` can tweak the config before it binds.
pub async fn start_server(adjust: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let www = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_site(www.path());

    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.directories.www_dir = www.path().to_path_buf();
    config.directories.out_dir = out.path().to_path_buf();
    adjust(&mut config);

    let prepared = startup::prepare(&config).await.unwrap();
    let addr = prepared.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(prepared.serve(shutdown.subscribe()));

    TestServer {
        addr,
        shutdown,
        www,
        out,
        handle,
    }
}

/// Send raw bytes and read until the server closes the connection.
#[allow(dead_code)]
pub async fn raw_request(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server did not close the connection")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Status code from a raw response.
#[allow(dead_code)]
pub fn status_of(response: &str) -> u16 {
    response
        .split(' ')
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Body from a raw response.
#[allow(dead_code)]
pub fn body_of(response: &str) -> &str {
    response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or("")
}
