//! Unix-socket log forwarder: relays arbitrary upstream output to the
//! supervisor's own stdout.

use std::path::Path;

use tokio::io::AsyncReadExt;
use tokio::net::UnixListener;

/// Binds a Unix stream socket at `path` (removing any stale file), chmods it
/// `0666`, then accepts connections serially: each connection is read fully
/// into a growable buffer, the buffer is written to stdout with a trailing
/// newline, and the connection is closed.
///
/// Accept errors terminate the forwarder; read errors only close the
/// offending connection.
pub async fn serve(path: impl AsRef<Path>) {
    let path = path.as_ref();
    let _ = std::fs::remove_file(path);

    let listener = match UnixListener::bind(path) {
        Ok(l) => l,
        Err(e) => {
            log::error!(path = path.to_string_lossy().into_owned(), error = e.to_string(); "failed to bind log socket");
            return;
        }
    };

    if let Err(e) = set_world_writable(path) {
        log::error!(path = path.to_string_lossy().into_owned(), error = e.to_string(); "failed to chmod log socket");
        return;
    }

    log::info!(path = path.to_string_lossy().into_owned(); "log socket listening");

    loop {
        let (mut stream, _addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!(error = e.to_string(); "accept failed on log socket, stopping forwarder");
                return;
            }
        };

        let mut buf = Vec::with_capacity(1024);
        if let Err(e) = stream.read_to_end(&mut buf).await {
            log::warn!(error = e.to_string(); "read failed on log socket connection");
            continue;
        }

        let mut out = buf;
        out.push(b'\n');
        use std::io::Write;
        let _ = std::io::stdout().write_all(&out);
    }
}

#[cfg(unix)]
fn set_world_writable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixStream;

    #[tokio::test]
    async fn forwards_connection_bytes_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("logger.sock");

        let serve_path = sock_path.clone();
        tokio::spawn(async move { serve(serve_path).await });

        // Give the listener a moment to bind.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut stream = UnixStream::connect(&sock_path).await.unwrap();
        stream.write_all(b"hello from upstream").await.unwrap();
        stream.shutdown().await.unwrap();
        // We can't easily capture this process's own stdout here; this
        // confirms the accept/read path doesn't hang or error.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}
