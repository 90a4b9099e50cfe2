//! Streaming transfers to and from the pre-signed URLs handed out by Device Farm.

use crate::report::Reporter;
use crate::Result;
use futures::{StreamExt, TryStreamExt};
use log::*;
use reqwest::header::CONTENT_LENGTH;
use std::path::Path;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::ReaderStream;

/// Size of the chunks files are streamed in.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// `PUT` the file at `path` to `url`.
///
/// The body is streamed in [`CHUNK_SIZE`] chunks with an explicit
/// `Content-Length`, pre-signed S3 URLs refuse chunked transfer encoding.
/// Returns the number of bytes sent.
pub async fn upload_file(
    http: &reqwest::Client,
    path: &Path,
    url: &str,
    label: &str,
    reporter: &Reporter,
) -> Result<u64> {
    let file = File::open(path).await?;
    let total = file.metadata().await?.len();
    debug!("Uploading {} ({} bytes)", path.display(), total);

    let progress = reporter.clone();
    let label = label.to_string();
    let mut sent = 0u64;
    let body = ReaderStream::with_capacity(file, CHUNK_SIZE).inspect_ok(move |chunk| {
        sent += chunk.len() as u64;
        progress.percentage(&label, percent(sent, total));
    });

    let start = Instant::now();
    http.put(url)
        .header(CONTENT_LENGTH, total)
        .body(reqwest::Body::wrap_stream(body))
        .send()
        .await?
        .error_for_status()?;

    reporter.line(&format!(
        "\nSent {} bytes in {}s",
        total,
        start.elapsed().as_secs()
    ));

    Ok(total)
}

/// `GET` `url` into the file at `path`, replacing it if it exists.
///
/// Returns the number of bytes written.
pub async fn download_file(http: &reqwest::Client, url: &str, path: &Path) -> Result<u64> {
    let response = http.get(url).send().await?.error_for_status()?;

    let mut out = BufWriter::with_capacity(CHUNK_SIZE, File::create(path).await?);
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;

    trace!("Wrote {} bytes to {}", written, path.display());
    Ok(written)
}

fn percent(done: u64, total: u64) -> u64 {
    if total == 0 {
        100
    } else {
        done * 100 / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn percentage_is_floored() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[tokio::test]
    async fn upload_sends_whole_file_with_length() {
        let dir = TempDir::new().unwrap();
        let apk = dir.path().join("app.apk");
        let content: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&apk, &content).unwrap();

        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/upload/app"))
            .and(header("content-length", "40000"))
            .and(body_bytes(content.clone()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sent = upload_file(
            &reqwest::Client::new(),
            &apk,
            &format!("{}/upload/app", server.uri()),
            "Sending APK",
            &Reporter::new(false),
        )
        .await
        .unwrap();

        assert_eq!(sent, 40_000);
    }

    #[tokio::test]
    async fn upload_rejected_by_server_is_an_error() {
        let dir = TempDir::new().unwrap();
        let apk = dir.path().join("app.apk");
        std::fs::write(&apk, b"apk").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = upload_file(
            &reqwest::Client::new(),
            &apk,
            &server.uri(),
            "Sending APK",
            &Reporter::new(true),
        )
        .await;

        assert!(matches!(result, Err(crate::FarmError::Request(_))));
    }

    #[tokio::test]
    async fn download_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("logcat.txt");
        std::fs::write(&target, "a much longer stale content").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/artifact/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
            .mount(&server)
            .await;

        let written = download_file(
            &reqwest::Client::new(),
            &format!("{}/artifact/1", server.uri()),
            &target,
        )
        .await
        .unwrap();

        assert_eq!(written, 5);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "fresh");
    }
}
