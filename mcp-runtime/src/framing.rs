//! Stdio message framing.
//!
//! MCP clients send newline-delimited JSON; some older clients send
//! LSP-style `Content-Length` headers. Both are accepted, and each reply is
//! framed the way its request was.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One JSON document per `\n`-terminated line.
    Line,
    /// `Content-Length: N` header block, blank line, then N bytes.
    ContentLength,
}

#[derive(Debug)]
pub struct Frame {
    pub framing: Framing,
    pub body: Vec<u8>,
}

/// Largest `Content-Length` body accepted.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Reads the next frame. `Ok(None)` means the peer closed the stream.
/// Blank lines between messages are skipped. Line bodies are passed on as
/// raw bytes, so invalid UTF-8 surfaces later as a JSON parse error.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut raw = Vec::new();
        if reader.read_until(b'\n', &mut raw).await? == 0 {
            return Ok(None);
        }
        let line = trim_line_ending(&raw);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        if let Some(length) = parse_content_length(&String::from_utf8_lossy(line))? {
            skip_remaining_headers(reader).await?;
            let mut body = vec![0_u8; length];
            reader.read_exact(&mut body).await?;
            return Ok(Some(Frame {
                framing: Framing::ContentLength,
                body,
            }));
        }

        return Ok(Some(Frame {
            framing: Framing::Line,
            body: line.to_vec(),
        }));
    }
}

fn trim_line_ending(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = line {
        line = rest;
    }
    line
}

fn parse_content_length(line: &str) -> io::Result<Option<usize>> {
    let Some((name, value)) = line.split_once(':') else {
        return Ok(None);
    };
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return Ok(None);
    }
    let length = value.trim().parse::<usize>().map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "Invalid Content-Length header")
    })?;
    if length > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Content-Length {length} exceeds the {MAX_FRAME_BYTES} byte limit"),
        ));
    }
    Ok(Some(length))
}

async fn skip_remaining_headers<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut raw = Vec::new();
        if reader.read_until(b'\n', &mut raw).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }
        if trim_line_ending(&raw).is_empty() {
            return Ok(());
        }
    }
}

pub async fn write_frame<W>(
    writer: &mut W,
    framing: Framing,
    value: &serde_json::Value,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::Line => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
    }
    writer.flush().await
}
