//! HTTP admin-panel emulation.
//!
//! Single-shot: once the header block (and, for POST, the body indicated
//! by Content-Length) has arrived, the request is parsed, credentials are
//! extracted, a canned 403 page is returned and the session closes. An
//! unparseable request gets a 400 and no record.

use super::{HandlerOutput, SessionContext};
use crate::types::{payload_hash, AttackRecord, Protocol};
use tracing::{info, warn};

/// Request-line caps, matching the emulated server's parser.
const MAX_METHOD_LEN: usize = 15;
const MAX_PATH_LEN: usize = 127;

/// Header values are truncated to this before capture.
const MAX_HEADER_VALUE: usize = 255;

/// POST body keys scanned for credentials. First match wins, so the
/// more specific spellings come first.
const USERNAME_KEYS: [&str; 4] = ["username=", "user=", "login=", "uname="];
const PASSWORD_KEYS: [&str; 4] = ["password=", "pass=", "pwd=", "passwd="];

/// Path fragments typical of exploit probes.
const SUSPICIOUS_PATHS: [&str; 4] = ["/shell", "/cmd", "/exec", ".."];

/// Fake admin panel returned for every parseable request.
const FAKE_LOGIN_HTML: &str = "<!DOCTYPE html>\n\
<html lang='en'>\n\
<head>\n\
    <meta charset='UTF-8'>\n\
    <meta name='viewport' content='width=device-width, initial-scale=1.0'>\n\
    <title>Router Admin Panel</title>\n\
    <style>\n\
        body { font-family: Arial, sans-serif; margin: 40px; }\n\
        .container { max-width: 400px; margin: 0 auto; padding: 20px; border: 1px solid #ccc; }\n\
        .error { color: red; margin-top: 10px; }\n\
    </style>\n\
</head>\n\
<body>\n\
    <div class='container'>\n\
        <h2>Router Administration</h2>\n\
        <div class='error'>Access Denied: Invalid credentials</div>\n\
        <p>Please contact your network administrator.</p>\n\
    </div>\n\
</body>\n\
</html>";

const ERROR_BODY: &str = "<html><body><h1>Error</h1><p>An error occurred.</p></body></html>";

#[derive(Debug, Default)]
pub struct HttpState;

/// Render the full response with the impersonated server headers.
pub fn response(code: u16, reason: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\nServer: Apache/2.4.41 (Ubuntu)\r\n\r\n{}",
        code,
        reason,
        body.len(),
        body
    )
    .into_bytes()
}

pub fn on_data(
    _state: &mut HttpState,
    ctx: &SessionContext,
    buf: &[u8],
    buffer_full: bool,
) -> HandlerOutput {
    let Some(header_end) = find(buf, b"\r\n\r\n") else {
        if buffer_full {
            // Budget exhausted without a complete header block.
            return bad_request(ctx, buf.len());
        }
        return HandlerOutput::pending();
    };

    let text = String::from_utf8_lossy(buf).into_owned();
    let Some((method, path)) = parse_request_line(&text) else {
        return bad_request(ctx, buf.len());
    };

    let user_agent = header_value(&text, "User-Agent:");
    let authorization = header_value(&text, "Authorization:");

    // Body completeness only matters for POST credential extraction.
    let body = &buf[header_end + 4..];
    if method == "POST" && !buffer_full {
        if let Some(content_length) = header_value(&text, "Content-Length:")
            .and_then(|v| v.parse::<usize>().ok())
        {
            if body.len() < content_length {
                return HandlerOutput::pending();
            }
        }
    }

    info!(
        "HTTP {} {} from {} (User-Agent: {})",
        method,
        path,
        ctx.peer_ip,
        user_agent.as_deref().unwrap_or("-")
    );

    if SUSPICIOUS_PATHS.iter().any(|frag| path.contains(frag)) {
        warn!(
            "Potential path traversal attack from {}: {}",
            ctx.peer_ip, path
        );
    }

    let mut username = None;
    let mut password = authorization;
    if method == "POST" {
        let body_text = String::from_utf8_lossy(body);
        if let Some(user) = extract_value(&body_text, &USERNAME_KEYS) {
            username = Some(user);
        }
        if let Some(pass) = extract_value(&body_text, &PASSWORD_KEYS) {
            password = Some(pass);
        }
    }

    let record = AttackRecord::new(&ctx.peer_ip, ctx.port, Protocol::Http)
        .with_username(username.as_deref().unwrap_or(""))
        .with_password(password.as_deref().unwrap_or(""))
        .with_user_agent(user_agent.as_deref().unwrap_or(""))
        .with_payload_hash(payload_hash(buf))
        .with_metadata(&format!("Method: {}, Path: {}", method, path));

    HandlerOutput {
        reply: response(403, "Forbidden", FAKE_LOGIN_HTML),
        record: Some(record),
        close: true,
        consumed: buf.len(),
    }
}

fn bad_request(ctx: &SessionContext, consumed: usize) -> HandlerOutput {
    warn!("Invalid HTTP request from {}", ctx.peer_ip);
    HandlerOutput {
        reply: response(400, "Bad Request", ERROR_BODY),
        record: None,
        close: true,
        consumed,
    }
}

/// `METHOD SP PATH [SP VERSION]` with the emulated caps applied.
fn parse_request_line(text: &str) -> Option<(String, String)> {
    if text.len() < 10 {
        return None;
    }
    let line = text.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    if method.is_empty() || path.is_empty() {
        return None;
    }
    Some((
        crate::types::bounded(method, MAX_METHOD_LEN),
        crate::types::bounded(path, MAX_PATH_LEN),
    ))
}

/// Case-insensitive header lookup; leading spaces trimmed, value capped.
fn header_value(text: &str, name: &str) -> Option<String> {
    for line in text.lines().skip(1) {
        if line.is_empty() {
            break; // end of headers
        }
        let bytes = line.as_bytes();
        if bytes.len() >= name.len() && bytes[..name.len()].eq_ignore_ascii_case(name.as_bytes()) {
            // The matched prefix is ASCII, so the byte index is a char boundary.
            let value = line[name.len()..].trim_start_matches(' ').trim_end();
            return Some(crate::types::bounded(value, MAX_HEADER_VALUE));
        }
    }
    None
}

/// First-match-wins scan over the key list. The value runs to the next
/// `&`, whitespace, or end of body, then gets URL-decoded.
fn extract_value(body: &str, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(pos) = body.find(key) {
            let rest = &body[pos + key.len()..];
            let end = rest
                .find(|c: char| c == '&' || c.is_whitespace())
                .unwrap_or(rest.len());
            return Some(url_decode(&rest[..end]));
        }
    }
    None
}

/// `%HH` hex escapes and `+` for space.
fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                let hi = (bytes[i + 1] as char).to_digit(16).unwrap_or(0) as u8;
                let lo = (bytes[i + 2] as char).to_digit(16).unwrap_or(0) as u8;
                out.push(hi << 4 | lo);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SessionContext {
        SessionContext {
            peer_ip: "192.0.2.10".to_string(),
            port: 80,
        }
    }

    fn drive(input: &[u8]) -> HandlerOutput {
        on_data(&mut HttpState, &ctx(), input, false)
    }

    #[test]
    fn test_post_credential_capture() {
        let req = b"POST /login HTTP/1.1\r\nHost: x\r\nUser-Agent: curl/7.81\r\nContent-Length: 27\r\n\r\nusername=admin&password=1234";
        let out = drive(req);

        assert!(out.reply.starts_with(b"HTTP/1.1 403 Forbidden\r\n"));
        assert!(out.close);
        let rec = out.record.unwrap();
        assert_eq!(rec.username, "admin");
        assert_eq!(rec.password, "1234");
        assert_eq!(rec.user_agent, "curl/7.81");
        assert_eq!(rec.metadata, "Method: POST, Path: /login");
        assert_eq!(rec.payload_hash.len(), 32);
    }

    #[test]
    fn test_get_gets_403_and_record() {
        let out = drive(b"GET /../../etc/passwd HTTP/1.0\r\n\r\n");
        assert!(out.reply.starts_with(b"HTTP/1.1 403 Forbidden\r\n"));
        let rec = out.record.unwrap();
        assert_eq!(rec.username, "N/A");
        assert_eq!(rec.metadata, "Method: GET, Path: /../../etc/passwd");
    }

    #[test]
    fn test_short_garbage_is_bad_request() {
        let out = on_data(&mut HttpState, &ctx(), b"hi\r\n\r\n", false);
        assert!(out.reply.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
        assert!(out.record.is_none());
        assert!(out.close);
    }

    #[test]
    fn test_partial_request_waits() {
        let out = drive(b"GET /index.html HTTP/1.1\r\nHost: x\r\n");
        assert!(out.reply.is_empty());
        assert!(!out.close);
        assert_eq!(out.consumed, 0);
    }

    #[test]
    fn test_post_waits_for_body() {
        let head = b"POST /login HTTP/1.1\r\nContent-Length: 27\r\n\r\nusername=adm";
        let out = drive(head);
        assert!(out.reply.is_empty());
        assert!(!out.close);
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("a%20b+c"), "a b c");
        assert_eq!(url_decode("p%40ss"), "p@ss");
        assert_eq!(url_decode("50%"), "50%");
    }

    #[test]
    fn test_first_match_wins() {
        // "username=" is found before "user=" even though "user=first"
        // appears earlier in the body.
        let body = "user=first&username=second";
        assert_eq!(
            extract_value(body, &USERNAME_KEYS),
            Some("second".to_string())
        );
    }

    #[test]
    fn test_authorization_header_captured_as_password() {
        let req = b"GET /admin HTTP/1.1\r\nAuthorization: Basic dXNlcjpwdw==\r\n\r\n";
        let out = drive(req);
        let rec = out.record.unwrap();
        assert_eq!(rec.password, "Basic dXNlcjpwdw==");
    }

    #[test]
    fn test_response_template_bytes() {
        let resp = response(403, "Forbidden", "x");
        assert_eq!(
            resp,
            b"HTTP/1.1 403 Forbidden\r\nContent-Type: text/html\r\nContent-Length: 1\r\nConnection: close\r\nServer: Apache/2.4.41 (Ubuntu)\r\n\r\nx".to_vec()
        );
    }
}
