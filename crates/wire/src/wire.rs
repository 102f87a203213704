// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message framing: 4-byte length prefix (big-endian) + JSON payload.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Request, Response};

/// Maximum framed message size (documents travel as raw bodies, not JSON).
pub const MAX_MESSAGE: u32 = 4 * 1024 * 1024;

/// Errors from reading or writing framed messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timed out")]
    Timeout,

    #[error("Message too large: {0} bytes")]
    TooLarge(u32),

    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode a serializable message with the length prefix.
pub fn encode<T: serde::Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(msg)?;
    let mut buf = Vec::with_capacity(payload.len() + 4);
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode a JSON payload (without the length prefix).
pub fn decode<T: serde::de::DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(payload)?)
}

async fn read_frame<R>(reader: &mut R, timeout: Duration) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let read = async {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ProtocolError::ConnectionClosed)
            }
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_be_bytes(len_buf);
        if len > MAX_MESSAGE {
            return Err(ProtocolError::TooLarge(len));
        }
        let mut payload = vec![0u8; len as usize];
        reader.read_exact(&mut payload).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ProtocolError::ConnectionClosed
            } else {
                ProtocolError::from(e)
            }
        })?;
        Ok(payload)
    };

    tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

/// Read one request with a timeout.
pub async fn read_request<R>(reader: &mut R, timeout: Duration) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let payload = read_frame(reader, timeout).await?;
    decode(&payload)
}

/// Copy a request's raw document body into `dest`, bounded by `body_len`.
pub async fn read_body<R, W>(
    reader: &mut R,
    dest: &mut W,
    body_len: u64,
    timeout: Duration,
) -> Result<u64, ProtocolError>
where
    R: AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let copy = async {
        let mut limited = reader.take(body_len);
        let copied = tokio::io::copy(&mut limited, dest).await?;
        if copied < body_len {
            return Err(ProtocolError::ConnectionClosed);
        }
        Ok(copied)
    };
    tokio::time::timeout(timeout, copy)
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

/// Write one response with a timeout.
pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let buf = encode(response)?;
    let write = async {
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    };
    tokio::time::timeout(timeout, write)
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

/// Write one request with a timeout (client side; used by tests and tools).
pub async fn write_request<W>(
    writer: &mut W,
    request: &Request,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let buf = encode(request)?;
    let write = async {
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    };
    tokio::time::timeout(timeout, write)
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

/// Read one response with a timeout (client side).
pub async fn read_response<R>(reader: &mut R, timeout: Duration) -> Result<Response, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let payload = read_frame(reader, timeout).await?;
    decode(&payload)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
