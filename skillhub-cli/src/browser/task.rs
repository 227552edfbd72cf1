//! Long-running hub operations off the UI loop
//!
//! A task reports through a one-shot result channel. The screen waits for it
//! with a spinner up to a deadline; past the deadline the task keeps running
//! in the background and is never cancelled.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::oneshot::{self, error::TryRecvError};

use super::theme::Tone;
use skillhub_core::{HubError, OperationReport};

/// How long the UI blocks on a task before moving it to the background
pub const FOREGROUND_DEADLINE: Duration = Duration::from_secs(60);

pub type TaskResult = Result<OperationReport, String>;

pub struct BackgroundTask {
    label: String,
    started: Instant,
    deadline: Duration,
    rx: oneshot::Receiver<TaskResult>,
}

impl BackgroundTask {
    pub fn spawn<F>(label: impl Into<String>, work: F) -> Self
    where
        F: Future<Output = Result<OperationReport, HubError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = work.await.map_err(|e| e.to_string());
            let _ = tx.send(result);
        });

        Self {
            label: label.into(),
            started: Instant::now(),
            deadline: FOREGROUND_DEADLINE,
            rx,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The UI has waited long enough
    pub fn is_overdue(&self) -> bool {
        self.started.elapsed() >= self.deadline
    }

    /// Block until the task finishes
    pub async fn wait(self) -> TaskResult {
        self.rx
            .await
            .unwrap_or_else(|_| Err("task ended without a result".to_string()))
    }

    /// The result, once the task has finished
    pub fn poll(&mut self) -> Option<TaskResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err("task ended without a result".to_string())),
        }
    }
}

/// What changed on a tick
#[derive(Debug)]
pub enum TaskEvent {
    Finished { label: String, result: TaskResult },
    MovedToBackground { label: String },
}

/// One foreground task the UI waits on, plus overdue ones left running
#[derive(Default)]
pub struct TaskDesk {
    foreground: Option<BackgroundTask>,
    background: Vec<BackgroundTask>,
}

impl TaskDesk {
    pub fn start(&mut self, task: BackgroundTask) {
        if let Some(previous) = self.foreground.replace(task) {
            self.background.push(previous);
        }
    }

    pub fn busy_label(&self) -> Option<&str> {
        self.foreground.as_ref().map(BackgroundTask::label)
    }

    pub fn is_busy(&self) -> bool {
        self.foreground.is_some()
    }

    pub fn background_count(&self) -> usize {
        self.background.len()
    }

    /// Tasks not yet finished, foreground included
    pub fn pending_count(&self) -> usize {
        self.background.len() + usize::from(self.foreground.is_some())
    }

    /// Wait out every unfinished task once the screen is gone
    pub async fn finish(self) -> Vec<(String, TaskResult)> {
        let mut results = Vec::new();
        for task in self.foreground.into_iter().chain(self.background) {
            let label = task.label().to_string();
            results.push((label, task.wait().await));
        }
        results
    }

    pub fn tick(&mut self) -> Vec<TaskEvent> {
        let mut events = Vec::new();

        if let Some(task) = self.foreground.as_mut() {
            if let Some(result) = task.poll() {
                events.push(TaskEvent::Finished {
                    label: task.label().to_string(),
                    result,
                });
                self.foreground = None;
            } else if task.is_overdue() {
                events.push(TaskEvent::MovedToBackground {
                    label: task.label().to_string(),
                });
                self.background.extend(self.foreground.take());
            }
        }

        let mut still_running = Vec::new();
        for mut task in self.background.drain(..) {
            match task.poll() {
                Some(result) => events.push(TaskEvent::Finished {
                    label: task.label().to_string(),
                    result,
                }),
                None => still_running.push(task),
            }
        }
        self.background = still_running;

        events
    }
}

/// Status line text for a finished task
pub fn describe(label: &str, result: &TaskResult) -> (String, Tone) {
    match result {
        Err(e) => (format!("{label}: {e}"), Tone::Error),
        Ok(report) => {
            let text = match report.entries.as_slice() {
                [only] => format!("{}: {}", only.label, only.outcome),
                _ => format!("{label}: {}", report.summary()),
            };
            let tone = if report.has_failures() {
                Tone::Error
            } else if report.succeeded().next().is_none() {
                Tone::Warning
            } else {
                Tone::Success
            };
            (text, tone)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillhub_core::{Outcome, SkipReason};

    #[tokio::test]
    async fn test_result_arrives_through_channel() {
        let mut task = BackgroundTask::spawn("demo", async {
            Ok(OperationReport::single("demo@acme/tools", Outcome::NotFound))
        });

        let mut result = None;
        for _ in 0..100 {
            result = task.poll();
            if result.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let report = result.unwrap().unwrap();
        assert_eq!(report.entries.len(), 1);
        assert!(!task.is_overdue());
    }

    #[tokio::test]
    async fn test_overdue_task_keeps_running() {
        let mut task = BackgroundTask::spawn("slow", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(OperationReport::new())
        })
        .with_deadline(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(task.is_overdue());
        assert!(task.poll().is_none());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(task.poll().unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_errors_are_stringified() {
        let mut task = BackgroundTask::spawn("bad", async {
            Err(HubError::InvalidTarget {
                input: "x".to_string(),
            })
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let err = task.poll().unwrap().unwrap_err();
        assert!(err.contains("Invalid target"));
    }

    #[tokio::test]
    async fn test_desk_moves_overdue_task_to_background() {
        let mut desk = TaskDesk::default();
        desk.start(
            BackgroundTask::spawn("slow", async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(OperationReport::new())
            })
            .with_deadline(Duration::ZERO),
        );
        assert!(desk.is_busy());

        let events = desk.tick();
        assert!(matches!(events[0], TaskEvent::MovedToBackground { .. }));
        assert!(!desk.is_busy());
        assert_eq!(desk.background_count(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let events = desk.tick();
        assert!(matches!(events[0], TaskEvent::Finished { .. }));
        assert_eq!(desk.background_count(), 0);
    }

    #[tokio::test]
    async fn test_finish_waits_for_overdue_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("done");
        let written = marker.clone();

        let mut desk = TaskDesk::default();
        desk.start(
            BackgroundTask::spawn("slow", async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                std::fs::write(&written, "ok")
                    .map(|_| OperationReport::new())
                    .map_err(|e| HubError::io(&written, e))
            })
            .with_deadline(Duration::ZERO),
        );
        desk.tick();
        desk.start(BackgroundTask::spawn("quick", async {
            Ok(OperationReport::new())
        }));
        assert_eq!(desk.pending_count(), 2);
        assert!(!marker.exists());

        let results = desk.finish().await;
        let labels: Vec<&str> = results.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["quick", "slow"]);
        assert!(results.iter().all(|(_, result)| result.is_ok()));
        assert!(marker.exists());
    }

    #[test]
    fn test_describe() {
        let skipped = Ok(OperationReport::single(
            "demo@acme/tools",
            Outcome::Skipped(SkipReason::AlreadyInstalled),
        ));
        let (text, tone) = describe("demo@acme/tools", &skipped);
        assert!(text.contains("use -u"));
        assert_eq!(tone, Tone::Warning);

        let (_, tone) = describe("x", &Err("boom".to_string()));
        assert_eq!(tone, Tone::Error);
    }
}
