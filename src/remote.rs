//! Remote artifact retrieval.
//!
//! Every artifact the pipeline can build may also exist precomputed under a
//! remote base URL. Fetching is strictly best effort: any failure is reported
//! as [`PipelineError::RemoteFetch`] and the caller falls back to a local
//! build. Downloads land in a `.part` sibling first and are renamed into
//! place only once complete, so an interrupted transfer never leaves a
//! truncated artifact behind.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};
use ureq::Agent;

use crate::errors::PipelineError;

const DOWNLOAD_BUFFER_BYTES: usize = 64 * 1024;

/// HTTP client with a bounded global timeout per request.
#[derive(Clone)]
pub struct RemoteFetcher {
    agent: Agent,
}

impl RemoteFetcher {
    /// Fetcher whose requests abort after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }

    /// Download `url` to `dest`, replacing any existing file.
    pub fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<(), PipelineError> {
        let remote_fetch = |reason: String| PipelineError::RemoteFetch {
            url: url.to_string(),
            reason,
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| remote_fetch(format!("failed creating {}: {err}", parent.display())))?;
        }
        let temp_dest = dest.with_extension("part");
        if temp_dest.exists() {
            let _ = fs::remove_file(&temp_dest);
        }

        debug!("fetching {url} -> {}", dest.display());
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| remote_fetch(format!("request failed: {err}")))?;
        let mut reader = response.into_body().into_reader();
        let mut file = File::create(&temp_dest)
            .map_err(|err| remote_fetch(format!("failed creating {}: {err}", temp_dest.display())))?;

        let mut buffer = vec![0u8; DOWNLOAD_BUFFER_BYTES];
        let mut total_bytes = 0u64;
        loop {
            let read = reader
                .read(&mut buffer)
                .map_err(|err| remote_fetch(format!("stream read failed: {err}")))?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .map_err(|err| remote_fetch(format!("failed writing {}: {err}", temp_dest.display())))?;
            total_bytes += read as u64;
        }
        file.flush()
            .map_err(|err| remote_fetch(format!("failed flushing {}: {err}", temp_dest.display())))?;
        drop(file);

        fs::rename(&temp_dest, dest)
            .map_err(|err| remote_fetch(format!("failed renaming into {}: {err}", dest.display())))?;
        info!("fetched {total_bytes} bytes from {url}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;
    use tempfile::tempdir;

    fn spawn_one_shot_http(payload: Vec<u8>) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request_buf = [0u8; 1024];
            let _ = stream.read(&mut request_buf);
            let headers = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                payload.len()
            );
            stream.write_all(headers.as_bytes()).unwrap();
            stream.write_all(&payload).unwrap();
            let _ = stream.flush();
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn fetch_streams_payload_into_destination() {
        let payload = "번호,제목\n1,안녕\n".as_bytes().to_vec();
        let (base_url, server) = spawn_one_shot_http(payload.clone());
        let temp = tempdir().unwrap();
        let dest = temp.path().join("stats").join("daily_posts.csv");

        let fetcher = RemoteFetcher::new(Duration::from_secs(5));
        fetcher
            .fetch_to_file(&format!("{base_url}/daily_posts.csv"), &dest)
            .unwrap();
        server.join().unwrap();

        assert_eq!(fs::read(&dest).unwrap(), payload);
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn unreachable_host_reports_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let temp = tempdir().unwrap();
        let dest = temp.path().join("main.csv");
        let fetcher = RemoteFetcher::new(Duration::from_secs(1));
        let err = fetcher
            .fetch_to_file(&format!("http://{addr}/main.csv"), &dest)
            .unwrap_err();
        assert!(matches!(err, PipelineError::RemoteFetch { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn http_error_status_leaves_no_file_behind() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request_buf = [0u8; 1024];
            let _ = stream.read(&mut request_buf);
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .unwrap();
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("main_clean.csv");
        let fetcher = RemoteFetcher::new(Duration::from_secs(5));
        let err = fetcher
            .fetch_to_file(&format!("http://{addr}/main_clean.csv"), &dest)
            .unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, PipelineError::RemoteFetch { .. }));
        assert!(!dest.exists());
    }
}
