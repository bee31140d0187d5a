use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use askdocs_core::config::Settings;
use askdocs_core::error::Error;
use askdocs_core::traits::{Embedder, Generator};
use askdocs_embed::OllamaClient;

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 { break; }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let len = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse::<usize>().unwrap())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + len { break; }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Answer exactly one request with a canned response; the handle yields the raw request.
fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        let response = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        request
    });
    (format!("http://{addr}"), handle)
}

fn client_for(host: &str, timeout_secs: u64) -> OllamaClient {
    let mut settings = Settings::default();
    settings.ollama.host = host.to_string();
    settings.ollama.timeout_secs = timeout_secs;
    settings.rag.embedding_model = "nomic-embed-text".to_string();
    OllamaClient::new(&settings).expect("client")
}

#[test]
fn embed_posts_model_and_prompt() {
    let (host, server) = serve_once("HTTP/1.1 200 OK", r#"{"embedding":[0.5,-0.25,1.0]}"#);
    let client = client_for(&host, 5);

    let vector = client.embed("what is the wifi password").expect("embed");
    assert_eq!(vector, vec![0.5, -0.25, 1.0]);

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /api/embeddings"));
    assert!(request.contains(r#""model":"nomic-embed-text""#));
    assert!(request.contains(r#""prompt":"what is the wifi password""#));
}

#[test]
fn missing_embedding_field_means_no_embedding() {
    let (host, server) = serve_once("HTTP/1.1 200 OK", "{}");
    let vector = client_for(&host, 5).embed("anything").expect("embed");
    assert!(vector.is_empty());
    server.join().unwrap();
}

#[test]
fn generate_disables_streaming_and_sends_temperature() {
    let (host, server) = serve_once("HTTP/1.1 200 OK", r#"{"response":"Hold the reset button.","done":true}"#);
    let client = client_for(&host, 5);

    let answer = client.generate("How do I reset it?").expect("generate");
    assert_eq!(answer, "Hold the reset button.");

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /api/generate"));
    assert!(request.contains(r#""stream":false"#));
    assert!(request.contains(r#""temperature":0.4"#));
}

#[test]
fn blank_inputs_never_reach_the_server() {
    // Nothing listens on this address; any request would fail.
    let client = client_for("http://127.0.0.1:9", 1);
    assert!(client.embed("").expect("embed").is_empty());
    assert_eq!(client.generate("   ").expect("generate"), "");
}

#[test]
fn error_status_is_a_service_error() {
    let (host, server) = serve_once("HTTP/1.1 404 Not Found", r#"{"error":"model 'nomic-embed-text' not found"}"#);
    let err = client_for(&host, 5).embed("hello").expect_err("404");
    assert!(matches!(err, Error::Service(ref msg) if msg.contains("not found")), "{err}");
    assert!(!err.is_transient());
    server.join().unwrap();
}

#[test]
fn scheme_less_host_reaches_the_server() {
    let (host, server) = serve_once("HTTP/1.1 200 OK", r#"{"embedding":[1.0]}"#);
    let bare = host.trim_start_matches("http://");
    let client = client_for(bare, 5);
    assert_eq!(client.base_url(), host);

    assert_eq!(client.embed("hello").expect("embed"), vec![1.0]);
    server.join().unwrap();
}

#[test]
fn refused_connection_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(&format!("http://{addr}"), 5).embed("hello").expect_err("refused");
    assert!(matches!(err, Error::Unavailable(_)), "{err}");
    assert!(err.is_transient());
}

#[test]
fn slow_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = read_request(&mut stream);
        thread::sleep(Duration::from_secs(3));
    });

    let err = client_for(&format!("http://{addr}"), 1).generate("hello").expect_err("timeout");
    assert!(matches!(err, Error::Timeout(_)), "{err}");
    server.join().unwrap();
}
