//! Native-messaging framing: a 32-bit length in native byte order, then that
//! many bytes of UTF-8 JSON.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest message a native host may send to the browser.
pub const MAX_OUTBOUND_LEN: usize = 1024 * 1024;
/// Largest message the browser may send to a native host.
pub const MAX_INBOUND_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("message of {len} bytes exceeds the {limit}-byte limit")]
    TooLarge { len: usize, limit: usize },
    #[error("stream ended inside a frame")]
    Truncated,
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes `msg` and checks it fits in an outbound frame.
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, FrameError> {
    let body = serde_json::to_vec(msg)?;
    if body.len() > MAX_OUTBOUND_LEN {
        return Err(FrameError::TooLarge {
            len: body.len(),
            limit: MAX_OUTBOUND_LEN,
        });
    }
    Ok(body)
}

/// Reads one frame body. `Ok(None)` means clean EOF at a frame boundary.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(FrameError::Truncated)
            };
        }
        filled += n;
    }

    let len = u32::from_ne_bytes(len_buf) as usize;
    if len > MAX_INBOUND_LEN {
        return Err(FrameError::TooLarge {
            len,
            limit: MAX_INBOUND_LEN,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            FrameError::Truncated
        } else {
            FrameError::Io(e)
        }
    })?;
    Ok(Some(body))
}

/// Writes one frame and flushes.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > MAX_OUTBOUND_LEN {
        return Err(FrameError::TooLarge {
            len: body.len(),
            limit: MAX_OUTBOUND_LEN,
        });
    }
    let len = body.len() as u32;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads and decodes one message. `Ok(None)` on clean EOF.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
        None => Ok(None),
    }
}

pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = encode_message(msg)?;
    write_frame(writer, &body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn frame_layout_is_native_length_prefix() {
        let mut out = Vec::new();
        write_frame(&mut out, br#"{"a":1}"#).await.unwrap();
        assert_eq!(&out[..4], &7u32.to_ne_bytes());
        assert_eq!(&out[4..], br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn message_survives_the_wire() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let msg = json!({"type": "trigger", "options": {"audio": true}});
        write_message(&mut a, &msg).await.unwrap();
        let got: Value = read_message(&mut b).await.unwrap().unwrap();
        assert_eq!(got, msg);
    }

    #[tokio::test]
    async fn clean_eof_and_truncation() {
        let mut empty: &[u8] = &[];
        assert!(read_frame(&mut empty).await.unwrap().is_none());

        let mut half_len: &[u8] = &[5, 0];
        assert!(matches!(
            read_frame(&mut half_len).await,
            Err(FrameError::Truncated)
        ));

        let mut short_body = Vec::new();
        short_body.extend_from_slice(&10u32.to_ne_bytes());
        short_body.extend_from_slice(b"{}");
        let mut reader = short_body.as_slice();
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(FrameError::Truncated)
        ));
    }

    #[tokio::test]
    async fn oversized_frames_are_rejected() {
        let mut out = Vec::new();
        let big = vec![b'x'; MAX_OUTBOUND_LEN + 1];
        assert!(matches!(
            write_frame(&mut out, &big).await,
            Err(FrameError::TooLarge { .. })
        ));
        assert!(out.is_empty());

        let header = ((MAX_INBOUND_LEN + 1) as u32).to_ne_bytes();
        let mut reader: &[u8] = &header;
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(FrameError::TooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_json_is_a_json_error() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"not json").await.unwrap();
        let mut reader = buf.as_slice();
        let res: Result<Option<Value>, _> = read_message(&mut reader).await;
        assert!(matches!(res, Err(FrameError::Json(_))));
    }
}
