//! Line draining for worker output streams

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::warn;

/// Read `reader` to end-of-stream, calling `on_line` for every line
///
/// Lines are split on `\n` with a trailing `\r` removed, and decoded lossily
/// so a stray invalid byte never ends the drain early. A read error stops the
/// drain; lines delivered before it stand. Returns the number of lines seen.
pub async fn drain_lines<R, F>(reader: R, stream: &'static str, mut on_line: F) -> usize
where
    R: AsyncRead + Unpin,
    F: FnMut(String),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    let mut count = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                on_line(String::from_utf8_lossy(&buf).into_owned());
                count += 1;
            }
            Err(e) => {
                warn!(stream, error = %e, "Worker output stream failed");
                break;
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static [u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let count = drain_lines(input, "test", |line| lines.push(line)).await;
        assert_eq!(count, lines.len());
        lines
    }

    #[tokio::test]
    async fn test_splits_lines() {
        assert_eq!(collect(b"a\nb\n").await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        assert_eq!(collect(b"a\nlast").await, vec!["a", "last"]);
    }

    #[tokio::test]
    async fn test_crlf_and_empty_lines() {
        assert_eq!(collect(b"one\r\n\r\ntwo\r\n").await, vec!["one", "", "two"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_lossy() {
        assert_eq!(collect(b"ok\n\xff\xfe bad\n").await, vec!["ok", "\u{fffd}\u{fffd} bad"]);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        assert!(collect(b"").await.is_empty());
    }
}
