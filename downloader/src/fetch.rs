/// A single fetch task: one GET, body streamed to a fresh file, one status
/// message out.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use url::Url;

use fanfetch_shared::errors::FetchError;
use fanfetch_shared::models::{DownloadRequest, Outcome, StatusMessage};
use fanfetch_shared::task_group::{StatusSink, TaskGuard};

use crate::deadline::Deadline;
use crate::naming::FileNamer;
use crate::progress::ProgressTracker;

/// Everything one task needs. Owns its guard, so the task group slot is
/// released however the task ends.
pub struct FetchTask {
    pub request: DownloadRequest,
    pub client: Client,
    pub deadline: Deadline,
    pub namer: Arc<FileNamer>,
    pub accept_error_status: bool,
    pub sink: StatusSink,
    pub guard: TaskGuard,
}

impl FetchTask {
    /// Run to completion and emit exactly one status message.
    pub async fn run(self) {
        let FetchTask {
            request,
            client,
            deadline,
            namer,
            accept_error_status,
            sink,
            guard,
        } = self;

        info!(task = %request.task_id, "Fetching {}", request.url);
        let outcome = match fetch(&client, &request, &deadline, &namer, accept_error_status).await {
            Ok((path, bytes)) => {
                info!(task = %request.task_id, "Wrote {} bytes to {}", bytes, path.display());
                Outcome::Downloaded { path, bytes }
            }
            Err(e) => {
                warn!(task = %request.task_id, kind = e.kind(), "{}", e);
                Outcome::Failed(e)
            }
        };

        if sink.send(StatusMessage::new(&request, outcome)).is_err() {
            warn!(task = %request.task_id, "Status stream closed before report");
        }
        drop(guard);
    }
}

/// Check the URL before any network work.
pub fn parse_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|e| FetchError::invalid_request(raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::invalid_request(
            raw,
            format!("unsupported scheme {:?}", other),
        )),
    }
}

async fn fetch(
    client: &Client,
    request: &DownloadRequest,
    deadline: &Deadline,
    namer: &FileNamer,
    accept_error_status: bool,
) -> Result<(PathBuf, u64), FetchError> {
    let url = &request.url;
    let target = parse_url(url)?;

    let mut response = deadline
        .run(client.get(target).send())
        .await
        .map_err(|expired| FetchError::download(url, expired))?
        .map_err(|e| FetchError::download(url, e))?;

    let status = response.status();
    if !status.is_success() && !accept_error_status {
        return Err(FetchError::download(url, format!("HTTP status {}", status)));
    }

    let (path, mut file) = namer.create().await.map_err(FetchError::CreateFile)?;
    let mut progress = ProgressTracker::new(&request.task_id, url, response.content_length());

    let copied = async {
        loop {
            let chunk = deadline
                .run(response.chunk())
                .await
                .map_err(|expired| FetchError::download(url, expired))?
                .map_err(|e| FetchError::download(url, e))?;
            let Some(chunk) = chunk else { break };

            file.write_all(&chunk).await.map_err(FetchError::Write)?;
            progress.advance(chunk.len() as u64);
        }
        file.flush().await.map_err(FetchError::Write)?;
        Ok::<(), FetchError>(())
    }
    .await;

    drop(file);
    match copied {
        Ok(()) => {
            progress.finish();
            Ok((path, progress.transferred()))
        }
        Err(e) => {
            remove_partial(&path).await;
            Err(e)
        }
    }
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove partial file {}: {}", path.display(), e);
    }
}
