//! Shared HTTP plumbing for the streaming providers.

use promptgate_core::error::ProviderError;
use tracing::warn;

/// Build the HTTP client shared by a provider's requests.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Map a transport failure onto the provider error taxonomy.
pub(crate) fn transport_error(provider: &str, base_url: &str, e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else if e.is_connect() {
        ProviderError::Network(format!("Cannot connect to {provider} at {base_url}: {e}"))
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Turn a non-success HTTP response into an error, consuming its body.
pub(crate) async fn reject_status(
    provider: &str,
    model: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    match status {
        200..=299 => Ok(response),
        429 => Err(ProviderError::RateLimited { retry_after_secs: 5 }),
        401 | 403 => Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        )),
        404 => Err(ProviderError::ModelNotFound(model.to_string())),
        _ => {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider, status, body = %error_body, "Provider returned error");
            Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            })
        }
    }
}

/// Splits a byte stream into newline-terminated lines.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network reads decode correctly.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete line without its terminator (`\n` or `\r\n`).
    pub(crate) fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Whatever is left once the stream has ended.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_across_pushes() {
        let mut buf = LineBuffer::default();
        buf.push(b"{\"a\":1}\n{\"b\"");
        assert_eq!(buf.next_line().as_deref(), Some("{\"a\":1}"));
        assert_eq!(buf.next_line(), None);
        buf.push(b":2}\r\n");
        assert_eq!(buf.next_line().as_deref(), Some("{\"b\":2}"));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn multibyte_char_split_between_reads() {
        let text = "é\n".as_bytes();
        let mut buf = LineBuffer::default();
        buf.push(&text[..1]);
        assert_eq!(buf.next_line(), None);
        buf.push(&text[1..]);
        assert_eq!(buf.next_line().as_deref(), Some("é"));
    }

    #[test]
    fn finish_returns_unterminated_tail() {
        let mut buf = LineBuffer::default();
        buf.push(b"{\"done\":true}");
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.finish().as_deref(), Some("{\"done\":true}"));
    }
}
