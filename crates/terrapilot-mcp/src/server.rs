//! Newline-delimited transport for the protocol handler

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::error::McpResult;
use crate::handler::ProtocolHandler;

/// Serve one message per line until the reader is exhausted.
///
/// Blank lines are skipped. Every reply is written as a single line and
/// flushed immediately.
pub async fn serve_lines<R, W>(handler: &ProtocolHandler, reader: R, mut writer: W) -> McpResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        handled += 1;

        if let Some(reply) = handler.handle_message(line).await {
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    debug!(messages = handled, "Input closed");
    Ok(())
}

/// Serve via stdin/stdout.
pub async fn serve_stdio(handler: &ProtocolHandler) -> McpResult<()> {
    info!(
        server = %handler.info().name,
        version = %handler.info().version,
        tools = handler.tools().len(),
        resources = handler.resources().len(),
        "Starting protocol server on stdio"
    );

    serve_lines(
        handler,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}
