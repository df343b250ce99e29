use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use chunkwire::{ClientConfig, ClientError, HttpRequest, ParseError, send, send_with_config};

/// Accept one connection, read the request head (and `body_len` body
/// bytes), then write `reply` in the given pieces with short pauses.
fn serve_once(
    body_len: usize,
    reply: Vec<Vec<u8>>,
) -> (u16, thread::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream, body_len);
        for piece in reply {
            stream.write_all(&piece).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(5));
        }
        request
    });

    (port, handle)
}

fn read_request(stream: &mut TcpStream, body_len: usize) -> Vec<u8> {
    let mut received = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        if let Some(end) = received.windows(4).position(|w| w == b"\r\n\r\n") {
            if received.len() >= end + 4 + body_len {
                return received;
            }
        }
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            return received;
        }
        received.extend_from_slice(&buf[..n]);
    }
}

#[test]
fn fetch_fragmented_chunked_response() {
    let reply = vec![
        b"HTTP/1.1 200 OK\r\nX-Foo: bar\r\nContent-Type: text/pl".to_vec(),
        b"ain\r\nTransfer-Encoding: chunked\r\n\r".to_vec(),
        b"\n2\r\nO".to_vec(),
        b"K\r\n0\r\n\r\n".to_vec(),
    ];
    let request = HttpRequest::new("127.0.0.1")
        .method("POST")
        .header("Foo", "bar")
        .form("name", "hello");
    let body_len = "name=hello".len();
    let (port, server) = serve_once(body_len, reply);

    let response = send(&request.port(port)).unwrap();
    assert_eq!(response.status_code, "200");
    assert_eq!(response.status_text, "OK");
    assert_eq!(response.headers.get("X-Foo"), Some("bar"));
    assert_eq!(response.headers.get("Content-Type"), Some("text/plain"));
    assert_eq!(response.body_as_str(), Some("OK"));

    let sent = String::from_utf8(server.join().unwrap()).unwrap();
    assert!(sent.starts_with("POST / HTTP/1.1\r\n"));
    assert!(sent.contains("Foo: bar\r\n"));
    assert!(sent.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
    assert!(sent.contains("Content-Length: 10\r\n"));
    assert!(sent.ends_with("\r\n\r\nname=hello"));
}

#[test]
fn json_request_body() {
    let reply = vec![b"HTTP/1.1 201 Created\r\n\r\n0\r\n\r\n".to_vec()];
    let request = HttpRequest::new("127.0.0.1")
        .method("PUT")
        .path("/items/1")
        .json(serde_json::json!({ "id": 1 }));
    let (port, server) = serve_once("{\"id\":1}".len(), reply);

    let response = send(&request.port(port)).unwrap();
    assert_eq!(response.status_code, "201");
    assert!(response.body.is_empty());

    let sent = String::from_utf8(server.join().unwrap()).unwrap();
    assert!(sent.starts_with("PUT /items/1 HTTP/1.1\r\n"));
    assert!(sent.ends_with("{\"id\":1}"));
}

#[test]
fn connection_closed_mid_body() {
    let reply = vec![b"HTTP/1.1 200 OK\r\n\r\n5\r\nab".to_vec()];
    let (port, server) = serve_once(0, reply);

    let err = send(&HttpRequest::new("127.0.0.1").port(port)).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Parse(ParseError::UnexpectedEndOfStream)
    ));
    server.join().unwrap();
}

#[test]
fn malformed_chunk_size_is_reported() {
    let reply = vec![b"HTTP/1.1 200 OK\r\n\r\nxyz\r\n".to_vec()];
    let (port, server) = serve_once(0, reply);

    let err = send(&HttpRequest::new("127.0.0.1").port(port)).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Parse(ParseError::InvalidChunkSizeDigit { found: b'x' })
    ));
    server.join().unwrap();
}

#[test]
fn read_timeout_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_request(&mut stream, 0);
        stream.write_all(b"HTTP/1.1 200 OK\r\n").unwrap();
        // Hold the connection open past the client's timeout.
        thread::sleep(Duration::from_millis(300));
    });

    let config = ClientConfig {
        read_timeout: Some(Duration::from_millis(50)),
        ..ClientConfig::default()
    };
    let err = send_with_config(&HttpRequest::new("127.0.0.1").port(port), &config).unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));
    server.join().unwrap();
}

#[test]
fn connection_refused_is_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let err = send(&HttpRequest::new("127.0.0.1").port(port)).unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));
}
