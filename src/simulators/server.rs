use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Management RPC port shared by both dialects.
pub const RPC_PORT: u16 = 4028;

/// One receive covers the whole request; anything longer is truncated, as the
/// emulated firmware truncates it.
const READ_BUFFER_SIZE: usize = 1024;

/// A wire dialect: one parsed JSON document in, one JSON document out.
#[async_trait]
pub trait RpcDialect: Send + Sync + 'static {
    /// Dialect name used in log lines.
    fn name(&self) -> &'static str;

    /// Handle one request document and produce the response document.
    async fn handle_request(&self, request: Value) -> Value;

    /// Envelope returned when the request body is not valid JSON.
    fn malformed_response(&self) -> Value;
}

/// One-shot TCP command server: accept, read once, respond, close. Each
/// connection is served on its own task; the dialect owns any shared state.
pub struct RpcServer<D> {
    dialect: Arc<D>,
    port: u16,
}

impl<D: RpcDialect> RpcServer<D> {
    pub fn new(dialect: D) -> Self {
        RpcServer {
            dialect: Arc::new(dialect),
            port: RPC_PORT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub async fn run(self) -> io::Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.port)).await?;
        info!("{} RPC listening on port {}", self.dialect.name(), self.port);
        loop {
            let (stream, peer) = listener.accept().await?;
            let dialect = Arc::clone(&self.dialect);
            tokio::spawn(async move {
                if let Err(err) = serve_connection(dialect.as_ref(), stream).await {
                    debug!("rpc: connection from {peer} dropped: {err}");
                }
            });
        }
    }
}

async fn serve_connection<D: RpcDialect>(dialect: &D, mut stream: TcpStream) -> io::Result<()> {
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    let received = stream.read(&mut buffer).await?;
    let response = match serde_json::from_slice::<Value>(&buffer[..received]) {
        Ok(request) => dialect.handle_request(request).await,
        Err(_) => dialect.malformed_response(),
    };
    let body = serde_json::to_vec(&response)?;
    stream.write_all(&body).await?;
    stream.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream as ClientStream;

    struct EchoDialect;

    #[async_trait]
    impl RpcDialect for EchoDialect {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn handle_request(&self, request: Value) -> Value {
            json!({ "echoed": request })
        }

        fn malformed_response(&self) -> Value {
            json!({ "error": "bad json" })
        }
    }

    async fn exchange(port: u16, body: &[u8]) -> Value {
        let mut stream = ClientStream::connect(("127.0.0.1", port))
            .await
            .expect("connect");
        stream.write_all(body).await.expect("send");
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.expect("receive");
        serde_json::from_slice(&response).expect("response is json")
    }

    #[tokio::test]
    async fn serves_one_exchange_per_connection() {
        let port = 24028;
        tokio::spawn(RpcServer::new(EchoDialect).with_port(port).run());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let first = exchange(port, br#"{"command":"devs"}"#).await;
        assert_eq!(first["echoed"]["command"], "devs");

        // a second, independent connection is also served
        let second = exchange(port, b"not json at all").await;
        assert_eq!(second["error"], "bad json");
    }
}
