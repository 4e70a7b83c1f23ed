//! Protocol handler tests, driven at the handler interface.
//!
//! Run with: cargo test --test services_test

use honeypot::services::{greeting, on_data, HandlerState, SessionContext};
use honeypot::types::Protocol;

fn ctx(port: u16) -> SessionContext {
    SessionContext {
        peer_ip: "192.0.2.99".to_string(),
        port,
    }
}

// =============================================================================
// HTTP
// =============================================================================

#[test]
fn test_http_post_credential_capture() {
    let mut state = HandlerState::new(Protocol::Http);
    let input = b"POST /login HTTP/1.1\r\nHost: x\r\nUser-Agent: curl/7.81\r\nContent-Length: 27\r\n\r\nusername=admin&password=1234";
    let out = on_data(&mut state, &ctx(80), input, false);

    assert!(out.reply.starts_with(b"HTTP/1.1 403 Forbidden\r\n"));
    assert!(out.close);
    let rec = out.record.expect("credential capture expected");
    assert_eq!(rec.service, Protocol::Http);
    assert_eq!(rec.username, "admin");
    assert_eq!(rec.password, "1234");
    assert_eq!(rec.user_agent, "curl/7.81");
    assert_eq!(rec.metadata, "Method: POST, Path: /login");
}

#[test]
fn test_http_url_encoded_credentials() {
    let mut state = HandlerState::new(Protocol::Http);
    let body = "login=ad%6din&pwd=p%40ss+word";
    let input = format!(
        "POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let out = on_data(&mut state, &ctx(8080), input.as_bytes(), false);

    let rec = out.record.unwrap();
    assert_eq!(rec.username, "admin");
    assert_eq!(rec.password, "p@ss word");
}

#[test]
fn test_http_traversal_still_served() {
    let mut state = HandlerState::new(Protocol::Http);
    let out = on_data(
        &mut state,
        &ctx(80),
        b"GET /../../etc/passwd HTTP/1.0\r\n\r\n",
        false,
    );

    // The warning is log-only; the reply does not change.
    assert!(out.reply.starts_with(b"HTTP/1.1 403 Forbidden\r\n"));
    assert!(out.record.is_some());
}

#[test]
fn test_http_reply_headers_byte_exact() {
    let mut state = HandlerState::new(Protocol::Http);
    let out = on_data(&mut state, &ctx(80), b"GET / HTTP/1.1\r\n\r\n", false);
    let reply = String::from_utf8(out.reply).unwrap();

    let (head, body) = reply.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 403 Forbidden\r\n"));
    assert!(head.contains("Content-Type: text/html\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", body.len())));
    assert!(head.contains("Connection: close\r\n"));
    assert!(head.ends_with("Server: Apache/2.4.41 (Ubuntu)"));
    assert!(body.starts_with("<!DOCTYPE html>"));
    assert!(body.contains("Router Administration"));
}

// =============================================================================
// TELNET
// =============================================================================

#[test]
fn test_telnet_greeting_and_login_flow() {
    assert_eq!(
        greeting(Protocol::Telnet),
        b"\r\nWelcome to Device Login\r\n\r\nlogin: ".to_vec()
    );

    let mut state = HandlerState::new(Protocol::Telnet);
    let out = on_data(&mut state, &ctx(23), b"root\r\n", false);
    assert_eq!(out.reply, b"Password: ".to_vec());
    assert!(!out.close);

    let out = on_data(&mut state, &ctx(23), b"toor\r\n", false);
    assert_eq!(out.reply, b"Login incorrect\r\n".to_vec());
    assert!(out.close);
    let rec = out.record.unwrap();
    assert_eq!(rec.service, Protocol::Telnet);
    assert_eq!(rec.username, "root");
    assert_eq!(rec.password, "toor");
}

// =============================================================================
// FTP
// =============================================================================

#[test]
fn test_ftp_user_pass_scenario() {
    assert_eq!(greeting(Protocol::Ftp), b"220 FTP Server Ready\r\n".to_vec());

    let mut state = HandlerState::new(Protocol::Ftp);
    let out = on_data(&mut state, &ctx(21), b"USER admin\r\n", false);
    assert_eq!(out.reply, b"331 Password required for admin\r\n".to_vec());

    let out = on_data(&mut state, &ctx(21), b"PASS hunter2\r\n", false);
    assert_eq!(out.reply, b"530 Login incorrect\r\n".to_vec());
    assert!(out.close);
    let rec = out.record.unwrap();
    assert_eq!(rec.service, Protocol::Ftp);
    assert_eq!(rec.username, "admin");
    assert_eq!(rec.password, "hunter2");
}

#[test]
fn test_ftp_unknown_then_quit() {
    let mut state = HandlerState::new(Protocol::Ftp);
    let out = on_data(&mut state, &ctx(21), b"FEAT\r\n", false);
    assert_eq!(out.reply, b"502 Command not implemented\r\n".to_vec());
    assert!(!out.close);

    let out = on_data(&mut state, &ctx(21), b"QUIT\r\n", false);
    assert_eq!(out.reply, b"221 Goodbye\r\n".to_vec());
    assert!(out.close);
    assert!(out.record.is_none());
}

// =============================================================================
// MQTT
// =============================================================================

/// MQTT 3.1.1 CONNECT: ClientID "bot", username "iot", password "pass".
fn mqtt_connect() -> Vec<u8> {
    let mut body: Vec<u8> = Vec::new();
    body.extend_from_slice(&[0x00, 0x04]);
    body.extend_from_slice(b"MQTT");
    body.push(0x04); // protocol level 4
    body.push(0xC2); // username + password + clean session
    body.extend_from_slice(&[0x00, 0x3C]); // keepalive 60
    body.extend_from_slice(&[0x00, 0x03]);
    body.extend_from_slice(b"bot");
    body.extend_from_slice(&[0x00, 0x03]);
    body.extend_from_slice(b"iot");
    body.extend_from_slice(&[0x00, 0x04]);
    body.extend_from_slice(b"pass");

    let mut packet = vec![0x10, body.len() as u8];
    packet.extend_from_slice(&body);
    packet
}

#[test]
fn test_mqtt_connect_scenario() {
    let mut state = HandlerState::new(Protocol::Mqtt);
    let out = on_data(&mut state, &ctx(1883), &mqtt_connect(), false);

    assert_eq!(out.reply, vec![0x20, 0x02, 0x00, 0x05]);
    assert!(out.close);
    let rec = out.record.unwrap();
    assert_eq!(rec.service, Protocol::Mqtt);
    assert_eq!(rec.username, "iot");
    assert_eq!(rec.password, "pass");
    assert_eq!(rec.payload_hash.len(), 32);
    assert!(rec
        .payload_hash
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn test_mqtt_split_delivery() {
    let mut state = HandlerState::new(Protocol::Mqtt);
    let packet = mqtt_connect();

    // First half: framing incomplete, handler waits.
    let out = on_data(&mut state, &ctx(1883), &packet[..10], false);
    assert!(out.reply.is_empty());
    assert!(!out.close);
    assert_eq!(out.consumed, 0);

    // Full buffer: the CONNECT completes.
    let out = on_data(&mut state, &ctx(1883), &packet, false);
    assert_eq!(out.reply, vec![0x20, 0x02, 0x00, 0x05]);
    assert!(out.close);
}

#[test]
fn test_mqtt_garbage_closed_without_reply() {
    let mut state = HandlerState::new(Protocol::Mqtt);
    let out = on_data(&mut state, &ctx(1883), &[0xF0, 0x01, 0x00], false);
    assert!(out.reply.is_empty());
    assert!(out.record.is_none());
    assert!(out.close);
}
