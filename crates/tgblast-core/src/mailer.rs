//! The broadcast scheduler.
//!
//! One `Mailer` owns all mailing state: the target registry, the composed
//! message, the durable settings, and the handle of the running auto-mailing
//! loop. Callers (the operator command layer) go through its methods only;
//! everything mutable sits behind a single `tokio::sync::Mutex`.
//!
//! State machine: `Idle --start--> Running --stop--> Idle`, with one
//! mailing-cycle tick per loop iteration. `start` while running is an
//! idempotent no-op, `stop` while idle is a no-op.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    compose::{ComposedMessage, MessageStore},
    delivery::{DeliveryExecutor, DeliveryOutcome},
    domain::Target,
    ports::{BroadcastTransport, SettingsStore, TargetResolver, TargetStore},
    registry::TargetRegistry,
    settings::{delay_in_range, MailingSettings},
    Error, Result,
};

/// Pause before continuing the loop after an unexpected cycle fault.
const LOOP_FAULT_BACKOFF: Duration = Duration::from_secs(10);

/// Outcome of one completed mailing cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub delivered: usize,
    pub failed: usize,
    /// Cumulative completed cycles, including this one.
    pub total_cycles: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct MailingStarted {
    /// True when the loop was already running and the call was a no-op.
    pub already_running: bool,
    pub delay_seconds: u64,
    pub target_count: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct MailingStopped {
    pub was_running: bool,
    pub total_cycles: u64,
}

/// Read-only snapshot for the status view.
#[derive(Clone, Debug)]
pub struct MailingStatus {
    pub is_running: bool,
    pub delay_seconds: u64,
    pub target_count: usize,
    pub total_cycles_sent: u64,
    pub has_composed_message: bool,
    pub message_kind: Option<&'static str>,
    pub auto_repeat: bool,
    pub max_repeats: u64,
}

#[derive(Clone)]
pub struct Mailer {
    inner: Arc<MailerInner>,
}

struct MailerInner {
    executor: DeliveryExecutor,
    resolver: Arc<dyn TargetResolver>,
    target_store: Arc<dyn TargetStore>,
    settings_store: Arc<dyn SettingsStore>,
    /// Bounds simultaneous in-flight deliveries when configured.
    send_permits: Option<Arc<Semaphore>>,
    state: Mutex<MailerState>,
}

struct MailerState {
    registry: TargetRegistry,
    composed: MessageStore,
    settings: MailingSettings,
    mailing: Option<MailingHandle>,
}

struct MailingHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Mailer {
    /// Build a mailer, loading targets and settings from the stores.
    ///
    /// Store failures are not fatal on startup: a broken file logs a warning
    /// and the mailer starts from an empty registry / default settings.
    pub async fn load(
        transport: Arc<dyn BroadcastTransport>,
        resolver: Arc<dyn TargetResolver>,
        target_store: Arc<dyn TargetStore>,
        settings_store: Arc<dyn SettingsStore>,
        max_concurrent_sends: Option<usize>,
    ) -> Self {
        let registry = match target_store.load().await {
            Ok(targets) => TargetRegistry::from_targets(targets),
            Err(e) => {
                warn!(error = %e, "failed to load targets, starting empty");
                TargetRegistry::default()
            }
        };

        let mut settings = match settings_store.load().await {
            Ok(Some(s)) => s,
            Ok(None) => MailingSettings::default(),
            Err(e) => {
                warn!(error = %e, "failed to load settings, using defaults");
                MailingSettings::default()
            }
        };
        // The loop is never live at startup, whatever a stale record says.
        settings.mailing_enabled = false;

        Self {
            inner: Arc::new(MailerInner {
                executor: DeliveryExecutor::new(transport),
                resolver,
                target_store,
                settings_store,
                send_permits: max_concurrent_sends.map(|n| Arc::new(Semaphore::new(n))),
                state: Mutex::new(MailerState {
                    registry,
                    composed: MessageStore::default(),
                    settings,
                    mailing: None,
                }),
            }),
        }
    }

    // === Target registry ===

    /// Resolve operator input into a target and register it.
    pub async fn add_target(&self, input: &str) -> Result<Target> {
        let target = self.inner.resolver.resolve(input).await?;

        let mut st = self.inner.state.lock().await;
        st.registry.add(target.clone())?;
        self.persist_targets(&st.registry).await;
        Ok(target)
    }

    /// Remove by title (or id, when the matcher parses as one).
    pub async fn remove_target(&self, matcher: &str) -> Result<Target> {
        let mut st = self.inner.state.lock().await;
        let removed = st.registry.remove(matcher)?;
        self.persist_targets(&st.registry).await;
        Ok(removed)
    }

    pub async fn list_targets(&self) -> Vec<Target> {
        self.inner.state.lock().await.registry.list()
    }

    // === Composed message ===

    pub async fn set_text_message(&self, body: impl Into<String>) {
        let mut st = self.inner.state.lock().await;
        st.composed.set_text(body);
    }

    pub async fn set_photo_message(
        &self,
        body: impl Into<String>,
        data: bytes::Bytes,
    ) -> Result<()> {
        let limit = self.inner.executor.capabilities().max_photo_bytes;
        let mut st = self.inner.state.lock().await;
        st.composed.set_photo(body, data, limit)
    }

    /// Append "@name" mentions to the composed body and return the updated
    /// body for display.
    pub async fn append_tags(&self, names: &[String]) -> Result<String> {
        let mut st = self.inner.state.lock().await;
        st.composed.append_tags(names)?;
        Ok(st
            .composed
            .peek()
            .map(|m| m.body().to_string())
            .unwrap_or_default())
    }

    // === Mailing ===

    /// Run exactly one mailing cycle and return its tally.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let (message, targets, simultaneous) = self.snapshot_for_cycle().await?;
        let (delivered, failed) = self.fan_out(message, targets, simultaneous).await;
        let total_cycles = self.finish_cycle().await;

        info!(delivered, failed, total_cycles, "mailing cycle complete");
        Ok(CycleReport {
            delivered,
            failed,
            total_cycles,
        })
    }

    /// Transition to Running and spawn the auto-mailing loop.
    ///
    /// Either fully transitions with a live loop, or fails with the state
    /// unchanged.
    pub async fn start_auto_mailing(&self) -> Result<MailingStarted> {
        let mut st = self.inner.state.lock().await;

        if st.mailing.is_some() {
            return Ok(MailingStarted {
                already_running: true,
                delay_seconds: st.settings.delay_seconds,
                target_count: st.registry.count(),
            });
        }
        if !st.composed.is_set() {
            return Err(Error::NothingToSend);
        }
        if st.registry.is_empty() {
            return Err(Error::NoTargets);
        }

        st.settings.mailing_enabled = true;
        self.persist_settings(&st.settings).await;

        let cancel = CancellationToken::new();
        let mailer = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            mailer.mailing_loop(token).await;
        });
        st.mailing = Some(MailingHandle { cancel, task });

        info!(
            delay_seconds = st.settings.delay_seconds,
            targets = st.registry.count(),
            "auto-mailing started"
        );
        Ok(MailingStarted {
            already_running: false,
            delay_seconds: st.settings.delay_seconds,
            target_count: st.registry.count(),
        })
    }

    /// Transition to Idle, cancelling the loop.
    ///
    /// Cancellation takes effect at the next suspension point: deliveries
    /// already dispatched in the current cycle run to completion before the
    /// loop exits. Counters are left as-is.
    pub async fn stop_auto_mailing(&self) -> Result<MailingStopped> {
        let handle = {
            let mut st = self.inner.state.lock().await;
            let handle = st.mailing.take();
            if handle.is_some() {
                st.settings.mailing_enabled = false;
                self.persist_settings(&st.settings).await;
            }
            handle
        };

        let Some(handle) = handle else {
            let st = self.inner.state.lock().await;
            return Ok(MailingStopped {
                was_running: false,
                total_cycles: st.settings.repeat_count,
            });
        };

        handle.cancel.cancel();
        if let Err(e) = handle.task.await {
            warn!(error = %e, "mailing loop did not shut down cleanly");
        }

        let st = self.inner.state.lock().await;
        info!(total_cycles = st.settings.repeat_count, "auto-mailing stopped");
        Ok(MailingStopped {
            was_running: true,
            total_cycles: st.settings.repeat_count,
        })
    }

    /// Update the inter-cycle delay. Takes effect on the next loop iteration.
    pub async fn set_delay(&self, seconds: u64) -> Result<()> {
        if !delay_in_range(seconds) {
            return Err(Error::DelayOutOfRange(seconds));
        }
        let mut st = self.inner.state.lock().await;
        st.settings.delay_seconds = seconds;
        self.persist_settings(&st.settings).await;
        Ok(())
    }

    /// Flip the advisory auto-repeat flag.
    pub async fn set_auto_repeat(&self, enabled: bool) -> Result<()> {
        let mut st = self.inner.state.lock().await;
        st.settings.auto_repeat = enabled;
        self.persist_settings(&st.settings).await;
        Ok(())
    }

    pub async fn status(&self) -> MailingStatus {
        let st = self.inner.state.lock().await;
        MailingStatus {
            is_running: st.mailing.is_some(),
            delay_seconds: st.settings.delay_seconds,
            target_count: st.registry.count(),
            total_cycles_sent: st.settings.repeat_count,
            has_composed_message: st.composed.is_set(),
            message_kind: st.composed.peek().map(|m| m.kind_label()),
            auto_repeat: st.settings.auto_repeat,
            max_repeats: st.settings.max_repeats,
        }
    }

    // === Cycle internals ===

    /// Take the cycle snapshot under the lock: later registry or message
    /// mutations do not affect an in-flight cycle.
    async fn snapshot_for_cycle(&self) -> Result<(Arc<ComposedMessage>, Vec<Target>, bool)> {
        let st = self.inner.state.lock().await;
        let message = st.composed.peek().cloned().ok_or(Error::NothingToSend)?;
        if st.registry.is_empty() {
            return Err(Error::NoTargets);
        }
        Ok((
            Arc::new(message),
            st.registry.list(),
            st.settings.simultaneous_sending,
        ))
    }

    /// Deliver to every target, waiting for all attempts; never
    /// short-circuits on failure.
    async fn fan_out(
        &self,
        message: Arc<ComposedMessage>,
        targets: Vec<Target>,
        simultaneous: bool,
    ) -> (usize, usize) {
        let mut delivered = 0usize;
        let mut failed = 0usize;

        if !simultaneous {
            for target in targets {
                match self.inner.executor.deliver(&message, &target).await {
                    DeliveryOutcome::Delivered => delivered += 1,
                    DeliveryOutcome::Failed { .. } => failed += 1,
                }
            }
            return (delivered, failed);
        }

        let mut set = JoinSet::new();
        for target in targets {
            let executor = self.inner.executor.clone();
            let message = Arc::clone(&message);
            let permits = self.inner.send_permits.clone();
            set.spawn(async move {
                let _permit = match permits {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                executor.deliver(&message, &target).await
            });
        }

        while let Some(res) = set.join_next().await {
            match res {
                Ok(DeliveryOutcome::Delivered) => delivered += 1,
                Ok(DeliveryOutcome::Failed { .. }) => failed += 1,
                Err(e) => {
                    warn!(error = %e, "delivery task failed to run");
                    failed += 1;
                }
            }
        }
        (delivered, failed)
    }

    /// One cycle has completed, whatever the per-target outcomes: bump the
    /// cumulative counter and persist.
    async fn finish_cycle(&self) -> u64 {
        let mut st = self.inner.state.lock().await;
        st.settings.repeat_count += 1;
        self.persist_settings(&st.settings).await;
        st.settings.repeat_count
    }

    async fn mailing_loop(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.try_cycle().await {
                Ok(Some(report)) => {
                    info!(
                        delivered = report.delivered,
                        failed = report.failed,
                        total_cycles = report.total_cycles,
                        "auto-mailing cycle complete"
                    );
                }
                Ok(None) => {
                    // Message or targets vanished mid-run: skip this cycle
                    // and wait out the normal delay.
                    info!("nothing to send, skipping cycle");
                }
                Err(e) => {
                    warn!(error = %e, "mailing loop fault, backing off");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(LOOP_FAULT_BACKOFF) => {}
                    }
                    continue;
                }
            }

            // Read the delay fresh each iteration so a change mid-run takes
            // effect on the next cycle.
            let delay = {
                let st = self.inner.state.lock().await;
                Duration::from_secs(st.settings.delay_seconds)
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(delay) => {}
            }
        }
    }

    /// Loop-side cycle: missing preconditions are a skip, not a fault.
    async fn try_cycle(&self) -> Result<Option<CycleReport>> {
        let snapshot = match self.snapshot_for_cycle().await {
            Ok(v) => v,
            Err(Error::NothingToSend) | Err(Error::NoTargets) => return Ok(None),
            Err(e) => return Err(e),
        };

        let (message, targets, simultaneous) = snapshot;
        let (delivered, failed) = self.fan_out(message, targets, simultaneous).await;
        let total_cycles = self.finish_cycle().await;
        Ok(Some(CycleReport {
            delivered,
            failed,
            total_cycles,
        }))
    }

    // === Persistence (logged, never fatal) ===

    async fn persist_targets(&self, registry: &TargetRegistry) {
        if let Err(e) = self.inner.target_store.save(&registry.list()).await {
            warn!(error = %e, "failed to persist targets");
        }
    }

    async fn persist_settings(&self, settings: &MailingSettings) {
        if let Err(e) = self.inner.settings_store.save(settings).await {
            warn!(error = %e, "failed to persist settings");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::domain::TargetId;
    use crate::ports::TransportCapabilities;

    #[derive(Default)]
    struct StubTransport {
        attempts: AtomicUsize,
        fail_ids: Vec<i64>,
    }

    impl StubTransport {
        fn failing_for(ids: &[i64]) -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                fail_ids: ids.to_vec(),
            }
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        fn send(&self, target: TargetId) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_ids.contains(&target.0) {
                return Err(Error::Transport("stub failure".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BroadcastTransport for StubTransport {
        fn capabilities(&self) -> TransportCapabilities {
            TransportCapabilities {
                max_text_len: 4096,
                max_caption_len: 1024,
                max_photo_bytes: 1024 * 1024,
            }
        }

        async fn send_text(&self, target: TargetId, _body: &str) -> Result<()> {
            self.send(target)
        }

        async fn send_photo(&self, target: TargetId, _caption: &str, _photo: Bytes) -> Result<()> {
            self.send(target)
        }
    }

    /// Resolves "N" to a target with id N; the title carries a generation
    /// counter so tests can observe re-resolution.
    #[derive(Default)]
    struct StubResolver {
        generation: AtomicUsize,
    }

    #[async_trait]
    impl TargetResolver for StubResolver {
        async fn resolve(&self, input: &str) -> Result<Target> {
            let id = input
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::ResolutionFailed(input.to_string()))?;
            let generation = self.generation.fetch_add(1, Ordering::SeqCst);
            Ok(Target {
                id: TargetId(id),
                title: format!("Chat {id} gen{generation}"),
                username: None,
            })
        }
    }

    #[derive(Default)]
    struct MemoryTargetStore {
        saved: StdMutex<Vec<Target>>,
    }

    #[async_trait]
    impl TargetStore for MemoryTargetStore {
        async fn load(&self) -> Result<Vec<Target>> {
            Ok(self.saved.lock().unwrap().clone())
        }

        async fn save(&self, targets: &[Target]) -> Result<()> {
            *self.saved.lock().unwrap() = targets.to_vec();
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySettingsStore {
        saved: StdMutex<Option<MailingSettings>>,
    }

    #[async_trait]
    impl SettingsStore for MemorySettingsStore {
        async fn load(&self) -> Result<Option<MailingSettings>> {
            Ok(self.saved.lock().unwrap().clone())
        }

        async fn save(&self, settings: &MailingSettings) -> Result<()> {
            *self.saved.lock().unwrap() = Some(settings.clone());
            Ok(())
        }
    }

    struct Harness {
        mailer: Mailer,
        transport: Arc<StubTransport>,
        settings_store: Arc<MemorySettingsStore>,
    }

    async fn harness(transport: StubTransport) -> Harness {
        let transport = Arc::new(transport);
        let settings_store = Arc::new(MemorySettingsStore::default());
        let mailer = Mailer::load(
            transport.clone(),
            Arc::new(StubResolver::default()),
            Arc::new(MemoryTargetStore::default()),
            settings_store.clone(),
            None,
        )
        .await;
        Harness {
            mailer,
            transport,
            settings_store,
        }
    }

    #[tokio::test]
    async fn run_once_without_message_fails_before_any_attempt() {
        let h = harness(StubTransport::default()).await;
        h.mailer.add_target("1").await.unwrap();

        let err = h.mailer.run_once().await.unwrap_err();
        assert!(matches!(err, Error::NothingToSend));
        assert_eq!(h.transport.attempts(), 0);
    }

    #[tokio::test]
    async fn run_once_with_empty_registry_fails_before_any_attempt() {
        let h = harness(StubTransport::default()).await;
        h.mailer.set_text_message("hello").await;

        let err = h.mailer.run_once().await.unwrap_err();
        assert!(matches!(err, Error::NoTargets));
        assert_eq!(h.transport.attempts(), 0);
        assert_eq!(h.mailer.status().await.total_cycles_sent, 0);
    }

    #[tokio::test]
    async fn adding_the_same_target_twice_is_rejected() {
        let h = harness(StubTransport::default()).await;
        h.mailer.add_target("1").await.unwrap();

        let err = h.mailer.add_target("1").await.unwrap_err();
        assert!(matches!(err, Error::DuplicateTarget(_)));
        assert_eq!(h.mailer.list_targets().await.len(), 1);
    }

    #[tokio::test]
    async fn remove_then_add_takes_the_fresh_resolution() {
        let h = harness(StubTransport::default()).await;
        let first = h.mailer.add_target("5").await.unwrap();
        h.mailer.remove_target(&first.title).await.unwrap();

        let second = h.mailer.add_target("5").await.unwrap();
        assert_eq!(second.id, first.id);
        assert_ne!(second.title, first.title);

        let listed = h.mailer.list_targets().await;
        assert_eq!(listed, vec![second]);
    }

    #[tokio::test]
    async fn partial_failure_is_tallied_and_counts_one_cycle() {
        let h = harness(StubTransport::failing_for(&[1])).await;
        h.mailer.add_target("1").await.unwrap();
        h.mailer.add_target("2").await.unwrap();
        h.mailer.set_text_message("hello").await;

        let report = h.mailer.run_once().await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total_cycles, 1);

        // The cycle counter ignores per-target outcomes.
        let report = h.mailer.run_once().await.unwrap();
        assert_eq!(report.total_cycles, 2);
    }

    #[tokio::test]
    async fn delivers_text_to_single_target_and_persists_counter() {
        let h = harness(StubTransport::default()).await;
        h.mailer.add_target("1").await.unwrap();
        h.mailer.set_text_message("hello").await;

        let report = h.mailer.run_once().await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.total_cycles, 1);

        let persisted = h.settings_store.saved.lock().unwrap().clone().unwrap();
        assert_eq!(persisted.repeat_count, 1);
    }

    #[tokio::test]
    async fn sequential_mode_delivers_to_every_target() {
        let transport = Arc::new(StubTransport::default());
        let settings_store = Arc::new(MemorySettingsStore::default());
        settings_store
            .save(&MailingSettings {
                simultaneous_sending: false,
                ..MailingSettings::default()
            })
            .await
            .unwrap();

        let mailer = Mailer::load(
            transport.clone(),
            Arc::new(StubResolver::default()),
            Arc::new(MemoryTargetStore::default()),
            settings_store,
            None,
        )
        .await;

        mailer.add_target("1").await.unwrap();
        mailer.add_target("2").await.unwrap();
        mailer.add_target("3").await.unwrap();
        mailer.set_text_message("hello").await;

        let report = mailer.run_once().await.unwrap();
        assert_eq!(report.delivered, 3);
        assert_eq!(transport.attempts(), 3);
    }

    #[tokio::test]
    async fn set_delay_bounds_are_inclusive() {
        let h = harness(StubTransport::default()).await;

        assert!(matches!(
            h.mailer.set_delay(0).await.unwrap_err(),
            Error::DelayOutOfRange(0)
        ));
        assert!(matches!(
            h.mailer.set_delay(3601).await.unwrap_err(),
            Error::DelayOutOfRange(3601)
        ));
        h.mailer.set_delay(1).await.unwrap();
        h.mailer.set_delay(3600).await.unwrap();
        assert_eq!(h.mailer.status().await.delay_seconds, 3600);
    }

    #[tokio::test]
    async fn start_requires_message_and_targets_and_leaves_state_unchanged() {
        let h = harness(StubTransport::default()).await;

        let err = h.mailer.start_auto_mailing().await.unwrap_err();
        assert!(matches!(err, Error::NothingToSend));
        assert!(!h.mailer.status().await.is_running);

        h.mailer.set_text_message("hello").await;
        let err = h.mailer.start_auto_mailing().await.unwrap_err();
        assert!(matches!(err, Error::NoTargets));
        assert!(!h.mailer.status().await.is_running);
    }

    #[tokio::test]
    async fn start_is_idempotent_while_running() {
        let h = harness(StubTransport::default()).await;
        h.mailer.add_target("1").await.unwrap();
        h.mailer.set_text_message("hello").await;
        h.mailer.set_delay(3600).await.unwrap();

        let started = h.mailer.start_auto_mailing().await.unwrap();
        assert!(!started.already_running);

        let again = h.mailer.start_auto_mailing().await.unwrap();
        assert!(again.already_running);

        let stopped = h.mailer.stop_auto_mailing().await.unwrap();
        assert!(stopped.was_running);
    }

    #[tokio::test]
    async fn start_then_stop_counts_only_completed_cycles() {
        let h = harness(StubTransport::default()).await;
        h.mailer.add_target("1").await.unwrap();
        h.mailer.set_text_message("hello").await;
        // Max delay: the second cycle cannot start during the test.
        h.mailer.set_delay(3600).await.unwrap();

        h.mailer.start_auto_mailing().await.unwrap();

        // The first cycle runs immediately; wait for it to complete.
        let mut cycles = 0;
        for _ in 0..500 {
            cycles = h.mailer.status().await.total_cycles_sent;
            if cycles >= 1 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(cycles, 1);

        let stopped = h.mailer.stop_auto_mailing().await.unwrap();
        assert!(stopped.was_running);
        assert_eq!(stopped.total_cycles, 1);

        let status = h.mailer.status().await;
        assert!(!status.is_running);
        assert_eq!(status.total_cycles_sent, 1);
        assert_eq!(h.transport.attempts(), 1);
    }

    #[tokio::test]
    async fn stop_while_idle_is_a_noop() {
        let h = harness(StubTransport::default()).await;
        let stopped = h.mailer.stop_auto_mailing().await.unwrap();
        assert!(!stopped.was_running);
        assert_eq!(stopped.total_cycles, 0);
    }

    #[tokio::test]
    async fn bounded_fan_out_still_reaches_every_target() {
        let transport = Arc::new(StubTransport::default());
        let mailer = Mailer::load(
            transport.clone(),
            Arc::new(StubResolver::default()),
            Arc::new(MemoryTargetStore::default()),
            Arc::new(MemorySettingsStore::default()),
            Some(2),
        )
        .await;

        for id in 1..=6 {
            mailer.add_target(&id.to_string()).await.unwrap();
        }
        mailer.set_text_message("hello").await;

        let report = mailer.run_once().await.unwrap();
        assert_eq!(report.delivered, 6);
        assert_eq!(transport.attempts(), 6);
    }

    #[tokio::test]
    async fn append_tags_goes_through_the_store() {
        let h = harness(StubTransport::default()).await;

        let err = h
            .mailer
            .append_tags(&["alice".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoComposedMessage));

        h.mailer.set_text_message("hello").await;
        let body = h
            .mailer
            .append_tags(&["alice".to_string(), "bob".to_string()])
            .await
            .unwrap();
        assert_eq!(body, "hello\n\n@alice\n@bob");
    }

    #[tokio::test]
    async fn status_reports_message_kind() {
        let h = harness(StubTransport::default()).await;
        assert_eq!(h.mailer.status().await.message_kind, None);

        h.mailer
            .set_photo_message("cap", Bytes::from_static(b"img"))
            .await
            .unwrap();
        let status = h.mailer.status().await;
        assert!(status.has_composed_message);
        assert_eq!(status.message_kind, Some("photo"));
    }
}
