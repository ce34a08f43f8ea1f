//! Wraps a child's stdout/stderr into structured log lines.
//!
//! Pre-formatted JSON (a chunk starting with `{`) is passed through to the
//! supervisor's own stdout verbatim; anything else becomes one structured
//! warning-level log record.

use std::io::Write;

use tokio::io::{AsyncRead, AsyncReadExt};

/// A byte-sink bound to one (child, stream-kind) pair.
pub struct ChildOutputAdapter {
    kind: &'static str,
    cmd: String,
}

impl ChildOutputAdapter {
    pub fn new(kind: &'static str, cmd: String) -> Self {
        Self { kind, cmd }
    }

    /// Handles one chunk of data, writing JSON straight through or emitting a
    /// structured log record. Returns the number of bytes accepted, which is
    /// always `data.len()`; the adapter never returns short.
    pub fn on_chunk(&self, data: &[u8], stdout: &mut impl Write) -> usize {
        if data.first() == Some(&b'{') {
            let _ = stdout.write_all(data);
            let _ = stdout.flush();
        } else {
            let msg = String::from_utf8_lossy(data);
            log::warn!(kind = self.kind, cmd = self.cmd.as_str(); "{}", msg.trim_end());
        }
        data.len()
    }

    /// Spawns a task that reads `reader` to EOF, feeding each chunk through
    /// [`Self::on_chunk`] against the real process stdout.
    pub fn pump(kind: &'static str, cmd: String, reader: impl AsyncRead + Send + 'static) {
        tokio::spawn(async move {
            let adapter = ChildOutputAdapter::new(kind, cmd);
            let mut reader = Box::pin(reader);
            let mut buf = [0u8; 8192];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let mut stdout = std::io::stdout();
                        adapter.on_chunk(&buf[..n], &mut stdout);
                    }
                    Err(_) => break,
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_passes_through_verbatim() {
        let adapter = ChildOutputAdapter::new("stdout", "echo".into());
        let input = b"{\"level\":\"info\"}\n";
        let mut out = Vec::new();
        let n = adapter.on_chunk(input, &mut out);
        assert_eq!(n, input.len());
        assert_eq!(out, input);
    }

    #[test]
    fn non_json_returns_full_length_without_writing_to_stdout() {
        let adapter = ChildOutputAdapter::new("stderr", "myapp".into());
        let input = b"plain text line\n";
        let mut out = Vec::new();
        let n = adapter.on_chunk(input, &mut out);
        assert_eq!(n, input.len());
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_utf8_is_accepted_without_panicking() {
        let adapter = ChildOutputAdapter::new("stdout", "bin".into());
        let input = &[0xff, 0xfe, b'x'];
        let mut out = Vec::new();
        let n = adapter.on_chunk(input, &mut out);
        assert_eq!(n, input.len());
    }
}
