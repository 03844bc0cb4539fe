//! Wire Protocol Module
//!
//! Framing for the store's textual request/response protocol:
//! commands go out as arrays of bulk strings, replies come back as
//! simple strings, errors, integers, bulk strings, or arrays.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{CacheError, Result};

// == Reply ==
/// A single reply from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `+OK`-style status line
    Simple(String),
    /// `-ERR ...` error line
    Error(String),
    /// `:n` integer
    Integer(i64),
    /// `$n` bulk payload; None is the nil reply
    Bulk(Option<Vec<u8>>),
    /// `*n` array of nested replies
    Array(Vec<Reply>),
}

// == Write Side ==
/// Writes one command as an array of bulk strings and flushes it.
pub async fn write_command<W>(writer: &mut W, parts: &[&[u8]]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = Vec::with_capacity(16 + parts.iter().map(|p| p.len() + 16).sum::<usize>());
    frame.extend_from_slice(format!("*{}\r\n", parts.len()).as_bytes());
    for part in parts {
        frame.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        frame.extend_from_slice(part);
        frame.extend_from_slice(b"\r\n");
    }

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

// == Read Side ==
/// Reads one reply, recursing into array elements.
pub fn read_reply<'a, R>(
    reader: &'a mut R,
) -> Pin<Box<dyn Future<Output = Result<Reply>> + Send + 'a>>
where
    R: AsyncBufRead + Unpin + Send,
{
    Box::pin(async move {
        let line = read_line(reader).await?;
        let (marker, rest) = line
            .split_first()
            .ok_or_else(|| malformed("empty reply line"))?;

        match *marker {
            b'+' => Ok(Reply::Simple(String::from_utf8_lossy(rest).into_owned())),
            b'-' => Ok(Reply::Error(String::from_utf8_lossy(rest).into_owned())),
            b':' => Ok(Reply::Integer(parse_int(rest)?)),
            b'$' => {
                let len = parse_int(rest)?;
                if len < 0 {
                    return Ok(Reply::Bulk(None));
                }
                let mut payload = vec![0u8; len as usize];
                reader.read_exact(&mut payload).await?;
                let mut crlf = [0u8; 2];
                reader.read_exact(&mut crlf).await?;
                if &crlf != b"\r\n" {
                    return Err(malformed("bulk payload not terminated"));
                }
                Ok(Reply::Bulk(Some(payload)))
            }
            b'*' => {
                let len = parse_int(rest)?;
                if len < 0 {
                    return Ok(Reply::Bulk(None));
                }
                let mut elements = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    elements.push(read_reply(reader).await?);
                }
                Ok(Reply::Array(elements))
            }
            other => Err(malformed(&format!("unknown reply marker {:?}", other as char))),
        }
    })
}

/// Reads one CRLF-terminated line, without the terminator.
async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = reader.read_until(b'\n', &mut line).await?;
    if read == 0 {
        return Err(CacheError::Connectivity("connection closed".to_string()));
    }
    if !line.ends_with(b"\r\n") {
        return Err(malformed("reply line not CRLF terminated"));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_int(bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| malformed("invalid integer in reply"))
}

fn malformed(detail: &str) -> CacheError {
    CacheError::Connectivity(format!("malformed reply: {}", detail))
}
