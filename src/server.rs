//! Drive a [Connection] over a tokio transport.

use crate::*;
use log::debug;
use std::{io, sync::Arc};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time,
};

/// Run a connection to completion: handshake, messages, close.
///
/// Returns `Ok(())` when the connection was closed cleanly or the client went away.
/// On error, queued frames (such as the close frame reporting it) are flushed on a
/// best-effort basis before the transport is shut down.
pub async fn serve<IO, H>(mut stream: IO, config: Arc<Config>, mut handler: H) -> Result<()>
where
    IO: AsyncRead + AsyncWrite + Unpin,
    H: Handler,
{
    let mut buf = vec![0; config.read_buffer_size.max(1)];
    let mut conn = Connection::new(config);

    let result = run(&mut conn, &mut stream, &mut buf, &mut handler).await;
    if result.is_err() {
        let _ = flush(&mut conn, &mut stream).await;
    }
    let _ = stream.shutdown().await;
    debug!("[{}] connection closed", conn.id());
    result
}

async fn run<IO, H>(conn: &mut Connection, stream: &mut IO, buf: &mut [u8], handler: &mut H) -> Result<()>
where
    IO: AsyncRead + AsyncWrite + Unpin,
    H: Handler,
{
    loop {
        flush(conn, stream).await?;
        if conn.is_closed() {
            return Ok(());
        }
        let amt = match conn.next_deadline() {
            None => stream.read(buf).await?,
            Some(deadline) => match time::timeout_at(deadline.into(), stream.read(buf)).await {
                Ok(amt) => amt?,
                Err(_) => {
                    conn.tick(now())?;
                    continue;
                }
            },
        };
        if amt == 0 {
            debug!("[{}] end of stream", conn.id());
            return Ok(());
        }
        conn.receive(&buf[..amt], now(), handler)?;
    }
}

async fn flush<IO>(conn: &mut Connection, stream: &mut IO) -> Result<()>
where
    IO: AsyncWrite + Unpin,
{
    if !conn.has_outgoing() {
        return Ok(());
    }
    while conn.has_outgoing() {
        let amt = stream.write(conn.outgoing()).await?;
        if amt == 0 {
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }
        conn.advance(amt);
    }
    stream.flush().await?;
    Ok(())
}

/// Follows tokio's clock, so paused time in tests drives the liveness checks.
fn now() -> std::time::Instant {
    time::Instant::now().into_std()
}
