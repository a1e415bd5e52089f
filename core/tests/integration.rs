//! Lookups over real HTTP.
//!
//! # Design
//! Two kinds of servers are used. The mock server runs on a random port and
//! exercises every format end-to-end. Single-shot `std::net` stubs serve a
//! canned response and hand back the request line, which covers exact wire
//! assertions and the failure modes the mock server never produces
//! (malformed, oversized and truncated bodies, silence, refused
//! connections).

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use ip2geo_core::{ClientConfig, Format, Ip2GeoClient, LookupError, LookupRequest, LookupResult};
use serde_json::json;

/// Start the mock server on a random port and return its address.
fn start_mock_server() -> SocketAddr {
    let std_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// Serve one canned response and report the request line that was received.
fn serve_once(status: &'static str, body: &'static str) -> (SocketAddr, mpsc::Receiver<String>) {
    let head = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    serve_raw([head.as_bytes(), body.as_bytes()].concat())
}

/// Write `response` byte for byte after reading the request head, then close.
fn serve_raw(response: Vec<u8>) -> (SocketAddr, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
        }
        tx.send(request_line.trim_end().to_string()).unwrap();

        let mut stream = reader.into_inner();
        stream.write_all(&response).unwrap();
        stream.flush().unwrap();
    });

    (addr, rx)
}

fn client_at(addr: SocketAddr, api_key: &str) -> Ip2GeoClient {
    let config = ClientConfig::new(api_key)
        .with_base_url(&format!("http://{addr}/ip"))
        .with_timeout(Duration::from_secs(10));
    Ip2GeoClient::with_config(config)
}

// ---------------------------------------------------------------------------
// Single-shot stubs
// ---------------------------------------------------------------------------

#[test]
fn default_format_decodes_stub_body() {
    let (addr, requests) = serve_once("200 OK", r#"{"country":"US"}"#);
    let client = client_at(addr, "");

    let result = client
        .lookup(&LookupRequest::from_params("1.2.3.4", "", ""))
        .unwrap();

    let expected = json!({"country": "US"});
    assert_eq!(result, LookupResult::Json(expected.as_object().unwrap().clone()));
    assert_eq!(requests.recv().unwrap(), "GET /ip/1.2.3.4 HTTP/1.1");
}

#[test]
fn api_key_reaches_the_wire() {
    let (addr, requests) = serve_once("200 OK", "{}");
    let client = client_at(addr, "abc123");

    client.lookup(&LookupRequest::new()).unwrap();

    assert_eq!(requests.recv().unwrap(), "GET /ip?key=abc123 HTTP/1.1");
}

#[test]
fn jsonp_callback_reaches_the_wire_and_body_stays_raw() {
    let (addr, requests) = serve_once("200 OK", r#"cb({"country":"US"});"#);
    let client = client_at(addr, "");

    let request = LookupRequest::new()
        .ip("8.8.8.8")
        .format(Format::Jsonp)
        .callback("cb");
    let result = client.lookup(&request).unwrap();

    assert_eq!(result.as_raw(), Some(r#"cb({"country":"US"});"#));
    assert_eq!(
        requests.recv().unwrap(),
        "GET /ip/8.8.8.8?format=jsonp&callback=cb HTTP/1.1"
    );
}

#[test]
fn xml_body_is_returned_unmodified() {
    let (addr, _requests) = serve_once("200 OK", "<a>1</a>");
    let client = client_at(addr, "");

    let result = client
        .lookup(&LookupRequest::new().format(Format::Xml))
        .unwrap();

    assert_eq!(result.as_raw(), Some("<a>1</a>"));
}

#[test]
fn malformed_json_is_a_decode_error() {
    let (addr, _requests) = serve_once("200 OK", "{not json");
    let client = client_at(addr, "");

    let err = client
        .lookup(&LookupRequest::new().format(Format::Json))
        .unwrap_err();

    assert!(matches!(err, LookupError::Decode(_)), "{err:?}");
}

#[test]
fn error_status_with_json_body_is_decoded() {
    let (addr, _requests) = serve_once("503 Service Unavailable", r#"{"success":false}"#);
    let client = client_at(addr, "");

    let result = client.lookup(&LookupRequest::new()).unwrap();

    assert_eq!(result.get("success"), Some(&json!(false)));
}

#[test]
fn json_null_body_is_an_empty_mapping() {
    let (addr, _requests) = serve_once("200 OK", "null");
    let client = client_at(addr, "");

    let result = client.lookup(&LookupRequest::new()).unwrap();

    assert_eq!(result.as_json().map(|m| m.len()), Some(0));
}

#[test]
fn body_larger_than_ten_mebibytes_is_read_whole() {
    let body = "x".repeat(11 * 1024 * 1024);
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let (addr, _requests) = serve_raw([head.as_bytes(), body.as_bytes()].concat());
    let client = client_at(addr, "");

    let result = client
        .lookup(&LookupRequest::new().format(Format::Xml))
        .unwrap();

    assert_eq!(result.as_raw().map(str::len), Some(body.len()));
}

#[test]
fn truncated_body_is_an_io_error() {
    let response = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\nConnection: close\r\n\r\n{\"cou".to_vec();
    let (addr, _requests) = serve_raw(response);
    let client = client_at(addr, "");

    let err = client.lookup(&LookupRequest::new()).unwrap_err();

    assert!(matches!(err, LookupError::Io(_)), "{err:?}");
    assert_eq!(err.to_string(), "failed to read ip2geo API response body");
}

#[test]
fn silent_server_times_out_as_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (_stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_secs(5));
    });

    let timeout = Duration::from_millis(300);
    let config = ClientConfig::default()
        .with_base_url(&format!("http://{addr}/ip"))
        .with_timeout(timeout);
    let client = Ip2GeoClient::with_config(config);

    let started = Instant::now();
    let err = client.lookup(&LookupRequest::new()).unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, LookupError::Transport(_)), "{err:?}");
    assert!(elapsed >= timeout / 2, "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "returned after {elapsed:?}");
}

#[test]
fn refused_connection_is_a_transport_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = client_at(addr, "");

    let err = client.lookup(&LookupRequest::new()).unwrap_err();

    assert!(matches!(err, LookupError::Transport(_)), "{err:?}");
    assert_eq!(err.to_string(), "unable to reach ip2geo API");
}

// ---------------------------------------------------------------------------
// Mock server
// ---------------------------------------------------------------------------

#[test]
fn mock_server_lookups() {
    let addr = start_mock_server();
    let client = client_at(addr, "abc123");

    // Step 1: explicit IP, default format.
    let result = client.lookup(&LookupRequest::new().ip("8.8.8.8")).unwrap();
    assert_eq!(result.get("success"), Some(&json!(true)));
    assert_eq!(result.get("country_code"), Some(&json!("US")));

    // Step 2: caller's own address.
    let result = client.lookup(&LookupRequest::new()).unwrap();
    assert_eq!(result.get("ip"), Some(&json!(mock_server::FALLBACK_CALLER)));

    // Step 3: IPv6.
    let result = client
        .lookup(&LookupRequest::new().ip("2001:4860:4860::8888"))
        .unwrap();
    assert_eq!(result.get("city"), Some(&json!("Mountain View")));

    // Step 4: xml.
    let result = client
        .lookup(&LookupRequest::new().ip("1.1.1.1").format(Format::Xml))
        .unwrap();
    let body = result.as_raw().unwrap();
    assert!(body.starts_with("<response>"), "{body}");
    assert!(body.contains("<city>Sydney</city>"), "{body}");

    // Step 5: yaml.
    let result = client
        .lookup(&LookupRequest::new().ip("1.1.1.1").format(Format::Yaml))
        .unwrap();
    assert!(result.as_raw().unwrap().contains("country_code: \"AU\""));

    // Step 6: jsonp.
    let request = LookupRequest::from_params("8.8.8.8", "jsonp", "show");
    let result = client.lookup(&request).unwrap();
    assert!(result.as_raw().unwrap().starts_with("show({"));

    // Step 7: unknown IP is decoded, not judged.
    let result = client.lookup(&LookupRequest::new().ip("9.9.9.9")).unwrap();
    assert_eq!(result.reported_failure(), Some("no record for 9.9.9.9"));

    // Step 8: unsupported format comes back raw.
    let result = client
        .lookup(&LookupRequest::new().ip("8.8.8.8").format_param("csv"))
        .unwrap();
    assert_eq!(result.as_raw(), Some("unsupported format: csv"));
}

#[test]
fn mock_server_rejected_key_is_returned_as_payload() {
    let addr = start_mock_server();
    let client = client_at(addr, mock_server::INVALID_KEY);

    let result = client.lookup(&LookupRequest::new().ip("8.8.8.8")).unwrap();

    assert_eq!(result.reported_failure(), Some("invalid API key"));
}

#[test]
fn concurrent_lookups_share_one_client() {
    let addr = start_mock_server();
    let client = client_at(addr, "");

    let handles: Vec<_> = ["8.8.8.8", "1.1.1.1", "1.2.3.4"]
        .into_iter()
        .map(|ip| {
            let client = client.clone();
            thread::spawn(move || {
                let result = client.lookup(&LookupRequest::new().ip(ip)).unwrap();
                (ip, result)
            })
        })
        .collect();

    for handle in handles {
        let (ip, result) = handle.join().unwrap();
        assert_eq!(result.get("ip"), Some(&json!(ip)));
    }
}
