use httpmock::MockServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::auth::Credentials;
use crate::client::BaseClient;
use crate::config::ClientConfig;

/// A client pointed at a mock node.
pub(crate) fn mock_client(server: &MockServer) -> BaseClient {
    BaseClient::new(
        &server.base_url(),
        &ClientConfig::default(),
        &Credentials::Anonymous,
    )
    .expect("Could not create client")
}

/// Reads a file from `tests/fixtures`.
pub(crate) fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}"))
        .unwrap_or_else(|_| panic!("Missing fixture {name}"))
}

/// The identifier document nodes answer storage calls with.
pub(crate) fn identifier_xml(pid: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><d1:identifier xmlns:d1="http://ns.dataone.org/service/types/v1">{pid}</d1:identifier>"#
    )
}

/// A DataONE exception envelope.
pub(crate) fn error_xml(name: &str, error_code: u16, detail_code: &str, description: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><error detailCode="{detail_code}" errorCode="{error_code}" name="{name}"><description>{description}</description></error>"#
    )
}

/// Serves one response that announces `content_length` bytes but closes
/// the connection after `body`. Returns the server's base URL.
pub(crate) async fn truncated_body_server(body: &'static str, content_length: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {content_length}\r\nContent-Type: application/octet-stream\r\n\r\n"
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}/")
}
