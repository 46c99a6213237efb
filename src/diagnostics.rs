// Connectivity test listener: echoes whatever arrives into the log.
//
// Bring-up helper, not part of the control path. Point netcat at the
// controller and watch the log to confirm the link is alive. One peer at
// a time.

use std::io;

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub async fn diagnostics_loop(port: u16) -> io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "diagnostics listener up");
    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("accept failed: {e}");
                continue;
            }
        };
        info!(%peer, "diagnostics connection");
        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => {
                    info!(%peer, "diagnostics connection closed");
                    break;
                }
                Ok(n) => {
                    info!(%peer, "received: {}", String::from_utf8_lossy(&buf[..n]).trim_end());
                }
                // resets are routine when a peer drops the link; keep
                // accepting
                Err(e) => {
                    warn!(%peer, "connection error: {e}");
                    break;
                }
            }
        }
    }
}
