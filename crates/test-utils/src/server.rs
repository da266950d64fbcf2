//! Throwaway HTTP server for tests that exercise network code.

use axum::Router;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral localhost port and return its base URL
/// (`http://127.0.0.1:PORT`). The server lives until the runtime shuts down.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{}", addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn test_spawn_server_binds() {
        let base = spawn_server(Router::new().route("/", get(|| async { "ok" }))).await;
        assert!(base.starts_with("http://127.0.0.1:"));
    }
}
