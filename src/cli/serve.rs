//! `serve`: newline-delimited JSON requests on stdin, responses on stdout.
//!
//! Runs until stdin closes or Ctrl+C, then drains the queue before exiting.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::api::ApiHandler;
use crate::config::EnvConfig;
use crate::shutdown::ShutdownResult;
use crate::telemetry::{self, LogError};
use crate::Runtime;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Logging setup failed: {0}")]
    Logging(#[from] LogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Answer one request per input line until EOF or `stop` fires.
///
/// Blank lines are skipped. Each response is written as one line and
/// flushed immediately.
pub async fn serve_lines<R, W>(
    handler: &ApiHandler,
    reader: R,
    mut writer: W,
    stop: CancellationToken,
) -> Result<u64, ServeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0u64;

    loop {
        let line = tokio::select! {
            biased;
            () = stop.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let response = handler.process(line.as_bytes()).await;
        writer.write_all(&response).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        served += 1;
    }

    Ok(served)
}

/// Run the service on stdin/stdout with configuration from the environment.
///
/// Tokio reads stdin on a blocking thread that cannot be interrupted, so the
/// caller must not wait for blocking tasks when dropping its runtime.
pub async fn run_serve(config: EnvConfig) -> Result<ShutdownResult, ServeError> {
    telemetry::init_logging(&config.log)?;
    telemetry::init_metrics();

    let runtime = Runtime::new(config);
    let effective = runtime.config.effective_config();
    tracing::info!(
        batch_size = effective.batch_size,
        rate_limit_ms = effective.rate_limit_ms,
        work_latency_ms = effective.work_latency_ms,
        max_pending = effective.max_pending,
        "ingest-core starting"
    );

    let stop = CancellationToken::new();
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_stop.cancel();
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    serve(&runtime, stdin, tokio::io::stdout(), stop).await
}

/// Serve `reader` until EOF or `stop`, then drain and stop the worker.
///
/// Returns once shutdown finished, even if `reader` never reaches EOF.
pub async fn serve<R, W>(
    runtime: &Runtime,
    reader: R,
    writer: W,
    stop: CancellationToken,
) -> Result<ShutdownResult, ServeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let worker_shutdown = CancellationToken::new();
    let worker_handle = runtime.scheduler.spawn_worker(worker_shutdown.clone());

    let served = serve_lines(&runtime.handler, reader, writer, stop).await;
    if let Ok(count) = &served {
        tracing::info!(requests = count, "input closed, draining");
    }

    let result = runtime
        .shutdown
        .initiate(&runtime.scheduler, runtime.config.shutdown_timeout)
        .await;

    worker_shutdown.cancel();
    runtime.scheduler.wake();
    if let Err(e) = worker_handle.await {
        tracing::error!(error = %e, "worker task failed");
    }

    served?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiResponse;
    use crate::scheduler::{SchedulerConfig, WorkerConfig};
    use std::time::Duration;

    fn runtime() -> Runtime {
        let mut config = EnvConfig::default();
        config.work_latency = Duration::ZERO;
        config.scheduler = SchedulerConfig {
            worker: WorkerConfig {
                rate_limit: Duration::ZERO,
            },
            ..SchedulerConfig::default()
        };
        Runtime::new(config)
    }

    fn responses(output: &[u8]) -> Vec<ApiResponse> {
        output
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn one_response_per_request_line() {
        let runtime = runtime();
        let input = concat!(
            r#"{"type":"ingest","ids":[1,2,3,4],"priority":"LOW"}"#,
            "\n\n",
            r#"{"type":"status","ingestion_id":"missing"}"#,
            "\n",
            "oops\n",
        );
        let mut output = Vec::new();

        let served = serve_lines(
            &runtime.handler,
            input.as_bytes(),
            &mut output,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(served, 3);
        let codes: Vec<u16> = responses(&output).iter().map(|r| r.code).collect();
        assert_eq!(codes, vec![201, 404, 400]);
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let runtime = runtime();
        let (client, server) = tokio::io::duplex(1024);
        let stop = CancellationToken::new();
        stop.cancel();

        let mut output = Vec::new();
        let served = serve_lines(&runtime.handler, BufReader::new(server), &mut output, stop)
            .await
            .unwrap();

        assert_eq!(served, 0);
        assert!(output.is_empty());
        drop(client);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_drains_and_returns_while_input_stays_open() {
        let runtime = runtime();
        let (mut client, server) = tokio::io::duplex(1024);
        client
            .write_all(b"{\"type\":\"ingest\",\"ids\":[1,2,3,4,5]}\n")
            .await
            .unwrap();

        let stop = CancellationToken::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let mut output = Vec::new();
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            serve(&runtime, BufReader::new(server), &mut output, stop),
        )
        .await
        .expect("serve must return while the client keeps its end open")
        .unwrap();

        assert_eq!(result, ShutdownResult::Complete);
        assert_eq!(runtime.shutdown.state(), crate::shutdown::ShutdownState::Stopped);
        assert_eq!(runtime.scheduler.pending().await, 0);
        assert_eq!(responses(&output)[0].code, 201);
        drop(client);
    }
}
