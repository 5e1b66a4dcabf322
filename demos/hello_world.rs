//! # Hello World Pool
//!
//! One binary, two roles:
//! - started by a user, it is the supervisor: a TCP front door on
//!   `127.0.0.1:8080` that forwards every connection to a worker picked by
//!   the pool;
//! - started by the pool (bootstrap in the environment), it is a worker
//!   answering each HTTP request with its own pid.
//!
//! `SIGHUP` reloads the workers, `SIGINT`/`SIGTERM` stops everything.
//!
//! ## Run
//! ```bash
//! cargo run --example hello_world --features logging
//! curl http://127.0.0.1:8080/
//! kill -HUP <supervisor pid>
//! ```

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use poolvisor::logging::{self, LogConfig};
use poolvisor::{
    BackoffPolicy, Bootstrap, LogWriter, Payload, PayloadContext, Pool, PoolBuilder, PoolConfig,
    RequestMeta, WorkerCount, WorkerError, WorkerRegistry, run_worker_main,
};

const FRONT_DOOR: &str = "127.0.0.1:8080";

struct Hello;

#[async_trait::async_trait]
impl Payload for Hello {
    async fn serve(&self, listener: TcpListener, ctx: PayloadContext) -> Result<(), WorkerError> {
        loop {
            tokio::select! {
                () = ctx.shutdown.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (stream, _) = accepted.map_err(|e| WorkerError::Serve(e.to_string()))?;
                    tokio::spawn(answer(stream));
                }
            }
        }
    }
}

async fn answer(mut stream: TcpStream) {
    let mut buf = [0u8; 1024];
    if stream.read(&mut buf).await.is_err() {
        return;
    }
    let body = format!("hello from worker {}\n", std::process::id());
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
}

/// Request path from the first line, peeked so the bytes still reach the worker.
async fn peek_path(stream: &TcpStream) -> String {
    let mut buf = [0u8; 1024];
    let n = stream.peek(&mut buf).await.unwrap_or(0);
    let head = String::from_utf8_lossy(&buf[..n]);
    head.split_whitespace().nth(1).unwrap_or("/").to_string()
}

async fn forward(pool: Pool, mut inbound: TcpStream) {
    let meta = RequestMeta {
        path: peek_path(&inbound).await,
        remote: inbound.peer_addr().ok(),
    };
    let target = match pool.route(&meta).await {
        Ok(target) => target,
        Err(err) => {
            warn!(error = %err, "no worker for connection");
            return;
        }
    };
    match TcpStream::connect(target.addr).await {
        Ok(mut outbound) => {
            let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
        }
        Err(err) => warn!(error = %err, worker = %target.worker, "worker unreachable"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(bootstrap) = Bootstrap::from_env()? {
        logging::init(LogConfig::for_worker().with_env_overrides());
        let registry = WorkerRegistry::new().payload("hello", Hello);
        std::process::exit(run_worker_main(bootstrap, &registry).await);
    }

    logging::init(LogConfig::for_supervisor().with_env_overrides());

    let cfg = PoolConfig {
        workers: WorkerCount::Fixed(2),
        worker_timeout: Duration::from_secs(5),
        keep_alive: true,
        min_expected_lifetime: Duration::from_secs(1),
        backoff: Some(BackoffPolicy {
            max_attempts: Some(5),
            ..BackoffPolicy::default()
        }),
        ping_interval: Some(Duration::from_secs(1)),
        title: Some("hello".into()),
        ..PoolConfig::default()
    };
    let pool = PoolBuilder::new("hello", cfg)
        .subscriber(LogWriter)
        .build()?;

    let listener = TcpListener::bind(FRONT_DOOR).await?;
    info!(addr = FRONT_DOOR, "front door listening");

    let reloader = pool.clone();
    tokio::spawn(async move {
        while poolvisor::wait_for_reload_signal().await.is_ok() {
            if let Err(err) = reloader.reload().await {
                warn!(error = %err, "reload failed");
            }
        }
    });

    let shutdown = poolvisor::wait_for_shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                break;
            }
            accepted = listener.accept() => {
                let (stream, _) = accepted?;
                tokio::spawn(forward(pool.clone(), stream));
            }
        }
    }

    info!("stopping workers");
    pool.shutdown().await?;
    Ok(())
}
