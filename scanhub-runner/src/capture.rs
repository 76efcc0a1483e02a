//! Bounded output capture

use std::io;
use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE: usize = 8192;

/// Bytes kept from a stream plus whether anything was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

impl Captured {
    pub fn into_string(self) -> String {
        match String::from_utf8(self.bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

/// Read `reader` to EOF keeping at most `limit` bytes.
///
/// Bytes past the ceiling are read and discarded so a chatty child never
/// blocks on a full pipe.
pub async fn capture_stream<R>(mut reader: R, limit: usize) -> io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::with_capacity(limit.min(64 * 1024));
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut truncated = false;

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(bytes.len());
        if room > 0 {
            bytes.extend_from_slice(&chunk[..n.min(room)]);
        }
        if n > room {
            truncated = true;
        }
    }

    Ok(Captured { bytes, truncated })
}

/// Read a report file written by a scanner with the same ceiling as the
/// process streams. `Ok(None)` when the file does not exist.
pub async fn read_capped(path: &Path, limit: usize) -> io::Result<Option<Captured>> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    capture_stream(file, limit).await.map(Some)
}
