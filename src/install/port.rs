// ABOUTME: Host port availability probe run before a cluster is created.
// ABOUTME: Binds the port and releases it immediately.

use tokio::net::TcpListener;

pub async fn ensure_port_free(port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    drop(listener);
    Ok(())
}
