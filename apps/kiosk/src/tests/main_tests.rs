use tokio::net::TcpListener;

use super::*;

fn client_for(server_url: &str) -> Arc<EventStreamClient> {
    let synchronizer = Synchronizer::new(Arc::new(TracingSurface));
    let url = websocket_url(server_url, "/ws").expect("valid url");
    EventStreamClient::new(url, synchronizer)
}

#[tokio::test]
async fn stalled_handshake_gives_up_after_the_limit() {
    // Accepted by the kernel backlog but never answered.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let client = client_for(&format!("http://{addr}"));

    let started = Instant::now();
    let err = connect_within(&client, Duration::from_millis(200))
        .await
        .expect_err("handshake never completes");

    assert!(err.to_string().contains("connect timed out"));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!client.is_connected().await);
    drop(listener);
}

#[test]
fn console_commands_are_case_insensitive() {
    assert!(matches!(parse_command(" SHOW "), Some(Command::Show)));
    assert!(matches!(parse_command("hide"), Some(Command::Hide)));
    assert!(matches!(parse_command("exit"), Some(Command::Quit)));
    assert!(parse_command("open door").is_none());
}
