use sleuth::client::open_event_stream;
use sleuth::console::Console;
use sleuth::streaming::{stream_to_terminal, StreamHandler};
use sleuth::{SleuthError, StreamOutcome};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// One-shot HTTP server: answers the first request with `response` and hands
/// back the raw request head.
async fn serve_once(response: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    (format!("http://{}/stream", addr), rx)
}

#[tokio::test]
async fn streams_body_and_sends_bearer_token() {
    let body = concat!(
        "data: {\"message\":{\"content\":{\"content_type\":\"CHAT_RESPONSE\",\"parts\":[\"Hi\"]},\"end_turn\":true},\"session_uuid\":\"net-1\"}\n",
        "\n",
    );
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
        body
    );
    let (url, head) = serve_once(response).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let reader = open_event_stream(&client, &url, Some("tok-123"))
        .await
        .unwrap();

    colored::control::set_override(false);
    let mut handler = StreamHandler::new(Console::plain(Vec::new()));
    let outcome = stream_to_terminal(reader, &mut handler).await.unwrap();

    assert_eq!(outcome, StreamOutcome::EndTurn);
    assert_eq!(handler.final_answer(), "Hi");
    assert_eq!(handler.session_uuid(), Some("net-1"));

    let head = head.await.unwrap().to_ascii_lowercase();
    assert!(head.contains("authorization: bearer tok-123"));
    assert!(head.contains("accept: text/event-stream"));
}

#[tokio::test]
async fn non_success_status_is_an_upstream_error() {
    let response =
        "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 9\r\nConnection: close\r\n\r\noverload\n"
            .to_string();
    let (url, _head) = serve_once(response).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let err = match open_event_stream(&client, &url, None).await {
        Ok(_) => panic!("expected an upstream error"),
        Err(e) => e,
    };
    match err.inner {
        SleuthError::Upstream(status, body) => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "overload\n");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
