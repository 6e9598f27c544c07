/// Fan-out/fan-in coordinator.
///
/// Starts the shared deadline, spawns one fetch task per URL, lets a
/// supervisory awaiter close the status stream once the task group drains,
/// and prints every status line in arrival order before the completion line.
use std::io::Write;
use std::sync::Arc;

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use fanfetch_shared::errors::{FanfetchResult, FetchError};
use fanfetch_shared::models::{DownloadRequest, Outcome, RunSummary, StatusMessage};
use fanfetch_shared::task_group::{status_channel, TaskGroup};

use crate::config::Config;
use crate::deadline::Deadline;
use crate::fetch::FetchTask;
use crate::naming::FileNamer;

pub const COMPLETION_LINE: &str = "All downloads complete";

/// What a run produced, in arrival order.
#[derive(Debug)]
pub struct RunReport {
    pub messages: Vec<StatusMessage>,
    pub summary: RunSummary,
}

pub struct Coordinator {
    config: Config,
    client: Client,
}

impl Coordinator {
    pub fn new(config: Config) -> FanfetchResult<Self> {
        let client = Client::builder().user_agent(config.user_agent.clone()).build()?;
        Ok(Self { config, client })
    }

    /// Fetch every configured URL, writing one line per outcome and then the
    /// completion line to `out`.
    pub async fn run<W: Write>(&self, out: &mut W) -> FanfetchResult<RunReport> {
        let deadline = Deadline::start(self.config.timeout());
        // Cancels anything still in flight on every exit path.
        let _cancel_on_exit = deadline.drop_guard();

        let namer = Arc::new(FileNamer::new(
            self.config.output_dir.clone(),
            self.config.file_prefix.clone(),
            self.config.file_extension.clone(),
        ));
        let group = TaskGroup::new();
        let (sink, mut stream) = status_channel();

        let mut workers: Vec<(DownloadRequest, JoinHandle<()>)> =
            Vec::with_capacity(self.config.urls.len());
        for url in &self.config.urls {
            let request = DownloadRequest::new(url.clone());
            let task = FetchTask {
                request: request.clone(),
                client: self.client.clone(),
                deadline: deadline.clone(),
                namer: namer.clone(),
                accept_error_status: self.config.accept_error_status,
                sink: sink.clone(),
                guard: group.add(),
            };
            workers.push((request, tokio::spawn(task.run())));
        }
        info!(
            "Started {} fetch task(s), deadline in {:?}",
            group.in_flight(),
            deadline.remaining()
        );

        // Holds the coordinator's own sink; dropping it after the group drains
        // is what lets the stream end.
        let awaiter = {
            let group = group.clone();
            tokio::spawn(async move {
                group.wait().await;
                drop(sink);
            })
        };

        let mut messages = Vec::with_capacity(workers.len());
        while let Some(msg) = stream.recv().await {
            writeln!(out, "{}", msg)?;
            messages.push(msg);
        }

        if let Err(e) = awaiter.await {
            error!("Status awaiter failed: {}", e);
        }

        // A task that panicked released its slot without reporting.
        for (request, handle) in workers {
            if let Err(e) = handle.await {
                warn!(task = %request.task_id, "Fetch task aborted: {}", e);
                let msg = StatusMessage::new(
                    &request,
                    Outcome::Failed(FetchError::download(&request.url, format!("task aborted: {}", e))),
                );
                writeln!(out, "{}", msg)?;
                messages.push(msg);
            }
        }

        writeln!(out, "{}", COMPLETION_LINE)?;
        out.flush()?;

        let summary = RunSummary::from_messages(&messages);
        info!("Run summary: {}", serde_json::to_string(&summary)?);
        Ok(RunReport { messages, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_urls_prints_only_completion() {
        let config = Config {
            urls: Vec::new(),
            ..Config::default()
        };
        let coordinator = Coordinator::new(config).unwrap();
        let mut out = Vec::new();

        let report = coordinator.run(&mut out).await.unwrap();
        assert!(report.messages.is_empty());
        assert_eq!(report.summary, RunSummary::default());
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", COMPLETION_LINE));
    }

    #[tokio::test]
    async fn test_malformed_urls_each_report_once() {
        let config = Config {
            urls: vec!["example.com".into(), "mailto:someone@example.com".into()],
            ..Config::default()
        };
        let coordinator = Coordinator::new(config).unwrap();
        let mut out = Vec::new();

        let report = coordinator.run(&mut out).await.unwrap();
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.failed, 2);
        assert!(report.messages.iter().all(|m| m.error().is_some_and(FetchError::is_local)));

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], COMPLETION_LINE);
    }
}
