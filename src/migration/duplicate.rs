//! Byte-for-byte file comparison.

use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// Size of the chunks compared at a time.
pub const COMPARE_CHUNK_SIZE: usize = 8 * 1024;

/// Check if two files have identical content.
///
/// Files with different sizes are never identical and are not read at all.
/// Otherwise both files are streamed in lockstep, one chunk at a time,
/// so memory use does not depend on the file size.
///
/// # Errors
/// Returns an error if either file cannot be opened or read.
pub async fn files_are_identical(path_a: &Path, path_b: &Path) -> io::Result<bool> {
    let size_a = tokio::fs::metadata(path_a).await?.len();
    let size_b = tokio::fs::metadata(path_b).await?.len();
    if size_a != size_b {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(path_a).await?);
    let mut reader_b = BufReader::new(File::open(path_b).await?);
    streams_are_identical(&mut reader_a, &mut reader_b).await
}

/// Compare two readers chunk by chunk until both end.
async fn streams_are_identical<A, B>(reader_a: &mut A, reader_b: &mut B) -> io::Result<bool>
where
    A: AsyncRead + Unpin,
    B: AsyncRead + Unpin,
{
    let mut buffer_a = vec![0_u8; COMPARE_CHUNK_SIZE];
    let mut buffer_b = vec![0_u8; COMPARE_CHUNK_SIZE];

    loop {
        let read_a = read_chunk(reader_a, &mut buffer_a).await?;
        let read_b = read_chunk(reader_b, &mut buffer_b).await?;

        if read_a != read_b {
            return Ok(false);
        }
        if read_a == 0 {
            return Ok(true);
        }
        if buffer_a[..read_a] != buffer_b[..read_b] {
            return Ok(false);
        }
    }
}

/// Fill the buffer as far as possible.
/// A short count means the end of the stream was reached.
async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]).await {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}
