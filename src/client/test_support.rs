// src/client/test_support.rs
//! Fakes shared by the client tests.

use super::{ClientError, SessionProvider};
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Hands out a fixed token and remembers every `force_refresh` it was asked for.
#[derive(Default)]
pub struct RecordingSession {
    pub refreshes: Mutex<Vec<bool>>,
}

impl RecordingSession {
    pub fn refreshes(&self) -> Vec<bool> {
        self.refreshes.lock().unwrap().clone()
    }
}

#[rocket::async_trait]
impl SessionProvider for RecordingSession {
    async fn id_token(&self, force_refresh: bool) -> Result<Option<String>, ClientError> {
        self.refreshes.lock().unwrap().push(force_refresh);
        Ok(Some("test-token".into()))
    }
}

/// Serve one canned HTTP response and hand back the raw request.
pub async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        line.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).to_string()
    });

    (url, handle)
}
