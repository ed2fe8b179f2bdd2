//! Canned HTTP payloads.
//!
//! # Responsibilities
//! - Fixed 404 response sent when no registered path matches
//! - 200-OK header template for building per-path responses
//! - Default request terminator (end of headers, no body)

/// End of an HTTP request without a body.
pub const DEFAULT_TERMINATOR: &str = "\r\n\r\n";

/// 200-OK header; `%u` is the content length.
pub const OK_HEADER_TEMPLATE: &str =
    "HTTP/1.1 200 OK\r\nConnection: Closed\r\nContent-Length: %u\r\nContent-type: text/html\r\n\r\n";

pub const NOT_FOUND_RESPONSE: &str = concat!(
    "HTTP/1.1 404 Not Found\r\n",
    "Connection: Closed\r\n",
    "Content-type: text/html\r\n",
    "\r\n",
    "<html><head><title>404 Not Found</title></head>",
    "<body><h1>Not Found</h1><p>The requested URL was not found on this server.</p></body></html>",
);

/// The OK header with the content length filled in.
pub fn ok_header(content_length: usize) -> String {
    OK_HEADER_TEMPLATE.replacen("%u", &content_length.to_string(), 1)
}

/// A complete 200 response: header followed by `body`.
pub fn ok_response(body: &[u8]) -> Vec<u8> {
    let mut response = ok_header(body.len()).into_bytes();
    response.extend_from_slice(body);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_header_fills_length() {
        assert_eq!(
            ok_header(12),
            "HTTP/1.1 200 OK\r\nConnection: Closed\r\nContent-Length: 12\r\nContent-type: text/html\r\n\r\n"
        );
    }

    #[test]
    fn ok_response_appends_body() {
        let response = ok_response(b"<p>hi</p>");
        let text = String::from_utf8(response).unwrap();
        assert!(text.contains("Content-Length: 9\r\n"));
        assert!(text.ends_with("\r\n\r\n<p>hi</p>"));
    }

    #[test]
    fn not_found_is_closed_html() {
        assert!(NOT_FOUND_RESPONSE.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(NOT_FOUND_RESPONSE.contains("Connection: Closed\r\n"));
        assert!(NOT_FOUND_RESPONSE.contains("Content-type: text/html\r\n\r\n<html>"));
    }
}
