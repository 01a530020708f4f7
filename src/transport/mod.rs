//! Wire transport: length-prefixed framing over a byte stream.
//!
//! Both directions use the same frame layout: a 4-byte big-endian payload
//! length followed by the payload bytes. The explicit length prefix makes the
//! request boundary unambiguous regardless of how TCP segments the stream,
//! and lets the reader size its buffer up front.

pub mod protocol;

pub use protocol::{decode_request, Envelope, Response};

use anyhow::Result;

/// Maximum frame payload size (64 MB). Safety valve against malformed or
/// hostile length prefixes.
const MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// Write one length-prefixed frame.
///
/// Format: [4-byte big-endian length][payload bytes]. The whole frame is
/// written with `write_all`, so a short write is retried by the runtime
/// until the frame is complete or the connection errors.
pub async fn send_frame<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| anyhow::anyhow!("frame too large: {} bytes", payload.len()))?;
    anyhow::ensure!(
        len <= MAX_FRAME_SIZE,
        "frame exceeds max size: {len} > {MAX_FRAME_SIZE}"
    );

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame and return its payload bytes.
///
/// Enforces `MAX_FRAME_SIZE` before allocating. A read error or premature
/// EOF aborts the connection.
pub async fn recv_frame<R: tokio::io::AsyncReadExt + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);

    anyhow::ensure!(
        len <= MAX_FRAME_SIZE,
        "frame exceeds max size: {len} > {MAX_FRAME_SIZE}"
    );

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_framing() {
        let payload = br#"{"action":"clear","secretkey":"s"}"#;
        let mut buf = Vec::new();

        send_frame(&mut buf, payload).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let received = recv_frame(&mut cursor).await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn empty_payload() {
        let mut buf = Vec::new();
        send_frame(&mut buf, b"").await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let received = recv_frame(&mut cursor).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn oversize_length_prefix_rejected() {
        // Hand-built header claiming a payload larger than the cap.
        let mut buf = Vec::from((MAX_FRAME_SIZE + 1).to_be_bytes());
        buf.extend_from_slice(b"ignored");

        let mut cursor = std::io::Cursor::new(buf);
        let err = recv_frame(&mut cursor).await.unwrap_err();
        assert!(err.to_string().contains("exceeds max size"));
    }

    #[tokio::test]
    async fn truncated_frame_errors() {
        let mut buf = Vec::from(100u32.to_be_bytes());
        buf.extend_from_slice(b"only a few bytes");

        let mut cursor = std::io::Cursor::new(buf);
        assert!(recv_frame(&mut cursor).await.is_err());
    }
}
