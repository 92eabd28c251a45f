//! Blocking HTTP client.

use std::io::Read;

use super::Headers;
use crate::status::{codes, FatResult, Failure};

/// A completed exchange. Non-2xx statuses are still responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: i32,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    fn from_ureq(response: ureq::Response) -> FatResult<Self> {
        let status = i32::from(response.status());
        let mut headers = Headers::new();
        for name in response.headers_names() {
            for value in response.all(&name) {
                headers.push(name.clone(), value);
            }
        }
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| Failure::other(codes::HTTP, format!("read body: {}", e)))?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn header(&self, name: &str) -> String {
        self.headers.get_or_empty(name)
    }
}

/// HTTP client; one connection pool per instance.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    pub fn get(&self, url: &str) -> FatResult<HttpResponse> {
        tracing::debug!(url, "GET");
        finish(self.agent.get(url).call())
    }

    /// POST `body`; the Content-Type header is sent only when given.
    pub fn post(&self, url: &str, content_type: &str, body: &[u8]) -> FatResult<HttpResponse> {
        tracing::debug!(url, len = body.len(), "POST");
        let mut request = self.agent.post(url);
        if !content_type.is_empty() {
            request = request.set("Content-Type", content_type);
        }
        finish(request.send_bytes(body))
    }
}

fn finish(result: Result<ureq::Response, ureq::Error>) -> FatResult<HttpResponse> {
    match result {
        Ok(response) => HttpResponse::from_ureq(response),
        Err(ureq::Error::Status(_, response)) => HttpResponse::from_ureq(response),
        Err(ureq::Error::Transport(transport)) => {
            let message = transport.to_string();
            Err(match transport.kind() {
                ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
                    Failure::syntax(codes::HTTP, message)
                }
                _ => Failure::other(codes::HTTP, message),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    #[test]
    fn test_invalid_url_is_syntax() {
        let client = HttpClient::new();
        let failure = client.get("not a url").unwrap_err();
        assert_eq!(failure.status, Status::Syntax);
        assert_eq!(failure.code, codes::HTTP);
    }

    #[test]
    fn test_connection_refused_is_other() {
        // bind then drop to get a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = HttpClient::new();
        let failure = client
            .get(&format!("http://127.0.0.1:{}/", port))
            .unwrap_err();
        assert_eq!(failure.status, Status::Other);
    }
}
