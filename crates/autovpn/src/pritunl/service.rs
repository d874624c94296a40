//! Blocking client for the Pritunl background service.
//!
//! The service owns every tunnel. It authenticates callers with the key found
//! in its auth file, sent as the `Auth-Key` header.

use crate::model::Connections;
use anyhow::Context;
use reqwest::blocking::{Client, Response};
use reqwest::Method;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ServiceClient {
    base_url: String,
    auth_key: Option<String>,
    http: Client,
}

impl ServiceClient {
    pub fn new(base_url: &str, auth_key_path: &Path) -> anyhow::Result<Self> {
        let auth_key = match fs::read_to_string(auth_key_path) {
            Ok(key) => Some(key.trim().to_string()),
            Err(e) => {
                log::warn!(
                    "Cannot read Pritunl auth key at {}: {}",
                    auth_key_path.display(),
                    e
                );
                None
            }
        };

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("pritunl")
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_key,
            http,
        })
    }

    /// Live connections keyed by profile id.
    pub fn connections(&self) -> anyhow::Result<Connections> {
        let response = self.send(Method::GET, "/profile", None)?;
        let body = response.text().context("failed to read connections")?;
        // An idle service answers with `null` rather than `{}`.
        let conns: Option<Connections> =
            serde_json::from_str(&body).context("failed to unmarshal connections")?;
        Ok(conns.unwrap_or_default())
    }

    pub fn connect(
        &self,
        profile_id: &str,
        username: &str,
        password: &str,
        ovpn_data: &str,
    ) -> anyhow::Result<()> {
        let body = json!({
            "id": profile_id,
            "reconnect": true,
            "timeout": true,
            "data": ovpn_data,
            "username": username,
            "password": password,
        });
        self.send(Method::POST, "/profile", Some(body))?;
        Ok(())
    }

    pub fn disconnect(&self, profile_id: &str) -> anyhow::Result<()> {
        self.send(Method::DELETE, "/profile", Some(json!({ "id": profile_id })))?;
        Ok(())
    }

    pub fn stop_all(&self) -> anyhow::Result<()> {
        self.send(Method::POST, "/stop", None)?;
        Ok(())
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> anyhow::Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url);
        if let Some(key) = &self.auth_key {
            request = request.header("Auth-Key", key);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", url, status, text.trim());
        }
        Ok(response)
    }
}

/// True when `err` means nothing was listening at the service address.
pub fn is_unreachable(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_connect() || e.is_timeout())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConnectionStatus;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves one canned HTTP response and hands back the raw request head and body.
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(len) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = len.trim().parse().unwrap();
                }
                request.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut payload = vec![0; content_length];
            reader.read_exact(&mut payload).unwrap();
            request.push_str(&String::from_utf8_lossy(&payload));

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            request
        });

        (url, handle)
    }

    fn client(url: &str, dir: &Path) -> ServiceClient {
        let key_path = dir.join("pritunl.auth");
        fs::write(&key_path, "secret-key\n").unwrap();
        ServiceClient::new(url, &key_path).unwrap()
    }

    #[test]
    fn fetches_connections_with_auth_key() {
        let dir = tempfile::tempdir().unwrap();
        let (url, server) = serve_once(
            "200 OK",
            r#"{"abc": {"id": "abc", "status": "connecting", "timestamp": 0}}"#,
        );

        let conns = client(&url, dir.path()).connections().unwrap();
        let request = server.join().unwrap();

        assert!(request.starts_with("GET /profile HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("auth-key: secret-key"));
        assert_eq!(conns["abc"].status, ConnectionStatus::Connecting);
    }

    #[test]
    fn null_body_means_no_connections() {
        let dir = tempfile::tempdir().unwrap();
        let (url, server) = serve_once("200 OK", "null");

        let conns = client(&url, dir.path()).connections().unwrap();
        server.join().unwrap();

        assert!(conns.is_empty());
    }

    #[test]
    fn connect_posts_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let (url, server) = serve_once("200 OK", "");

        client(&url, dir.path())
            .connect("abc", "alice", "99123456", "client\n")
            .unwrap();
        let request = server.join().unwrap();

        assert!(request.starts_with("POST /profile HTTP/1.1"));
        assert!(request.contains(r#""password":"99123456""#));
        assert!(request.contains(r#""username":"alice""#));
    }

    #[test]
    fn error_status_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (url, server) = serve_once("401 Unauthorized", "bad key");

        let err = client(&url, dir.path()).disconnect("abc").unwrap_err();
        server.join().unwrap();

        assert!(err.to_string().contains("401"));
        assert!(!is_unreachable(&err));
    }

    #[test]
    fn closed_port_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&url, dir.path()).connections().unwrap_err();
        assert!(is_unreachable(&err));
    }
}
