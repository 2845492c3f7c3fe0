//! Command polling.
//!
//! The poller keeps a cursor: the server time returned by the last successful
//! query. Every poll asks for entries touched since the cursor, applies the
//! pending ones and acknowledges them with `clear`.
//!
//! The first successful poll is a bootstrap: it only adopts the server's clock.
//! Whatever it returns may predate this process, and replaying it would fire
//! stale effects.
//!
//! A failed query leaves the cursor alone, so nothing announced in the
//! meantime is skipped.

use std::time::Duration;

use futures_util::future::join_all;
use lf_protocol::{CommandEntry, CommandKind, PollResponse};

use crate::transport::TransportError;

/// Cursor value before the first successful poll.
pub const BOOTSTRAP_CURSOR: i64 = 0;

#[allow(async_fn_in_trait)]
pub trait CommandTransport {
    async fn query(&self, since: i64) -> Result<PollResponse, TransportError>;
    async fn clear(&self, kind: CommandKind, uuid: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The subject is not loaded here. The command is dropped but still cleared.
    SubjectMissing,
}

pub trait CommandApplier {
    fn apply(&mut self, entry: &CommandEntry) -> Result<ApplyOutcome, String>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub bootstrap: bool,
    pub applied: usize,
    pub missing: usize,
    pub failed: usize,
    pub cleared: usize,
    pub clear_failures: usize,
}

pub struct CommandPoller<T, A> {
    transport: T,
    applier: A,
    cursor: i64,
    interval: Duration,
}

impl<T: CommandTransport, A: CommandApplier> CommandPoller<T, A> {
    pub fn new(transport: T, applier: A, interval: Duration) -> Self {
        Self {
            transport,
            applier,
            cursor: BOOTSTRAP_CURSOR,
            interval,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub async fn poll_once(&mut self) -> Result<PollReport, TransportError> {
        let response = self.transport.query(self.cursor).await?;
        let bootstrap = self.cursor == BOOTSTRAP_CURSOR;
        self.cursor = response.time;

        let mut report = PollReport {
            bootstrap,
            ..PollReport::default()
        };
        if bootstrap {
            log::info!(
                "Command bootstrap poll: server time {}, ignoring {} entries",
                response.time,
                response.commands.len()
            );
            return Ok(report);
        }

        let pending: Vec<&CommandEntry> = response.commands.iter().filter(|c| c.num > 0).collect();
        for entry in &pending {
            match self.applier.apply(entry) {
                Ok(ApplyOutcome::Applied) => report.applied += 1,
                Ok(ApplyOutcome::SubjectMissing) => {
                    log::warn!(
                        "Dropping {} x{} for {}: subject not loaded",
                        entry.kind,
                        entry.num,
                        entry.uuid
                    );
                    report.missing += 1;
                }
                Err(err) => {
                    log::error!("Applying {} for {} failed: {err}", entry.kind, entry.uuid);
                    report.failed += 1;
                }
            }
        }

        let results = join_all(
            pending
                .iter()
                .map(|entry| self.transport.clear(entry.kind, &entry.uuid)),
        )
        .await;
        for (entry, result) in pending.iter().zip(results) {
            match result {
                Ok(()) => report.cleared += 1,
                Err(err) => {
                    log::warn!("Clearing {} for {} failed: {err}", entry.kind, entry.uuid);
                    report.clear_failures += 1;
                }
            }
        }
        Ok(report)
    }

    /// Poll forever, sleeping `interval` between attempts.
    pub async fn run(mut self) {
        loop {
            match self.poll_once().await {
                Ok(report) if report.applied + report.missing + report.failed > 0 => {
                    log::debug!("Poll report: {report:?}");
                }
                Ok(_) => {}
                Err(err) => log::warn!("Command poll failed (cursor stays at {}): {err}", self.cursor),
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Scripted transport: queued query results, recorded calls.
    #[derive(Clone, Default)]
    pub struct FakeTransport {
        pub responses: Rc<RefCell<VecDeque<Result<PollResponse, TransportError>>>>,
        pub queries: Rc<RefCell<Vec<i64>>>,
        pub clears: Rc<RefCell<Vec<(CommandKind, String)>>>,
        pub fail_clears: bool,
    }

    impl FakeTransport {
        pub fn respond(&self, time: i64, commands: Vec<CommandEntry>) {
            self.responses
                .borrow_mut()
                .push_back(Ok(PollResponse { time, commands }));
        }

        pub fn fail(&self) {
            self.responses
                .borrow_mut()
                .push_back(Err(TransportError::Status { status: 503 }));
        }
    }

    impl CommandTransport for FakeTransport {
        async fn query(&self, since: i64) -> Result<PollResponse, TransportError> {
            self.queries.borrow_mut().push(since);
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(TransportError::Status { status: 500 }))
        }

        async fn clear(&self, kind: CommandKind, uuid: &str) -> Result<(), TransportError> {
            self.clears.borrow_mut().push((kind, uuid.to_string()));
            if self.fail_clears {
                Err(TransportError::Status { status: 502 })
            } else {
                Ok(())
            }
        }
    }

    /// Knows a fixed set of subjects; "boom" makes the handler fail.
    #[derive(Default)]
    pub struct RecordingApplier {
        pub known: Vec<String>,
        pub applied: Vec<CommandEntry>,
    }

    impl CommandApplier for RecordingApplier {
        fn apply(&mut self, entry: &CommandEntry) -> Result<ApplyOutcome, String> {
            if entry.uuid == "boom" {
                return Err("handler exploded".to_string());
            }
            if !self.known.contains(&entry.uuid) {
                return Ok(ApplyOutcome::SubjectMissing);
            }
            self.applied.push(entry.clone());
            Ok(ApplyOutcome::Applied)
        }
    }

    pub fn entry(uuid: &str, kind: CommandKind, num: u32) -> CommandEntry {
        CommandEntry {
            uuid: uuid.to_string(),
            kind,
            num,
        }
    }

    fn poller(transport: &FakeTransport, known: &[&str]) -> CommandPoller<FakeTransport, RecordingApplier> {
        let applier = RecordingApplier {
            known: known.iter().map(|s| s.to_string()).collect(),
            applied: Vec::new(),
        };
        CommandPoller::new(transport.clone(), applier, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn bootstrap_poll_applies_and_clears_nothing() {
        let transport = FakeTransport::default();
        transport.respond(1_000, vec![entry("a", CommandKind::Wiggle, 3)]);
        let mut poller = poller(&transport, &["a"]);

        let report = poller.poll_once().await.expect("poll should succeed");
        assert!(report.bootstrap);
        assert_eq!(poller.cursor(), 1_000);
        assert!(poller.applier.applied.is_empty());
        assert!(transport.clears.borrow().is_empty());
    }

    #[tokio::test]
    async fn later_polls_apply_then_clear_pending_entries() {
        let transport = FakeTransport::default();
        transport.respond(1_000, vec![]);
        transport.respond(
            2_000,
            vec![
                entry("a", CommandKind::Wiggle, 2),
                entry("a", CommandKind::Glimmer, 0),
                entry("ghost", CommandKind::Spawn, 1),
            ],
        );
        let mut poller = poller(&transport, &["a"]);
        poller.poll_once().await.expect("bootstrap");

        let report = poller.poll_once().await.expect("poll should succeed");
        assert_eq!(transport.queries.borrow().as_slice(), &[0, 1_000]);
        assert_eq!(report.applied, 1);
        assert_eq!(report.missing, 1);
        assert_eq!(report.cleared, 2);
        assert_eq!(poller.cursor(), 2_000);
        // Zero-count entries are neither applied nor cleared; missing subjects still are.
        let clears = transport.clears.borrow();
        assert_eq!(
            clears.as_slice(),
            &[
                (CommandKind::Wiggle, "a".to_string()),
                (CommandKind::Spawn, "ghost".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn failed_query_keeps_cursor() {
        let transport = FakeTransport::default();
        transport.respond(1_000, vec![]);
        transport.fail();
        transport.respond(3_000, vec![entry("a", CommandKind::Wiggle, 1)]);
        let mut poller = poller(&transport, &["a"]);

        poller.poll_once().await.expect("bootstrap");
        assert!(poller.poll_once().await.is_err());
        assert_eq!(poller.cursor(), 1_000);

        let report = poller.poll_once().await.expect("retry should succeed");
        assert_eq!(transport.queries.borrow().last(), Some(&1_000));
        assert_eq!(report.applied, 1);
        assert!(!report.bootstrap);
    }

    #[tokio::test]
    async fn failed_handler_does_not_stop_the_batch() {
        let transport = FakeTransport::default();
        transport.respond(1_000, vec![]);
        transport.respond(
            2_000,
            vec![entry("boom", CommandKind::Wiggle, 1), entry("a", CommandKind::Wiggle, 1)],
        );
        let mut poller = poller(&transport, &["a", "boom"]);
        poller.poll_once().await.expect("bootstrap");

        let report = poller.poll_once().await.expect("poll should succeed");
        assert_eq!(report.failed, 1);
        assert_eq!(report.applied, 1);
        assert_eq!(report.cleared, 2);
    }

    #[tokio::test]
    async fn clear_failures_are_reported_not_fatal() {
        let mut transport = FakeTransport::default();
        transport.fail_clears = true;
        transport.respond(1_000, vec![]);
        transport.respond(2_000, vec![entry("a", CommandKind::Spawn, 1)]);
        let mut poller = poller(&transport, &["a"]);
        poller.poll_once().await.expect("bootstrap");

        let report = poller.poll_once().await.expect("poll should succeed");
        assert_eq!(report.clear_failures, 1);
        assert_eq!(poller.cursor(), 2_000);
    }
}
