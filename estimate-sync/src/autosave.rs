//! Autosave synchronization for a live editing session.
//!
//! Three stimuli can lead to a save: the 2-second debounce after any
//! mutation, the 30-second heartbeat, and an explicit manual save. A single
//! guard sits in front of all of them: at most one save is in flight at a
//! time, and automatic attempts are dropped outright when fewer than
//! 3 seconds have passed since the last success. Dropped attempts are never
//! queued; a newer edit schedules its own debounce anyway.
//!
//! Autosave failures are logged and swallowed so editing is never
//! interrupted; only [`Autosave::save_now`] surfaces failure to the caller.

use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use estimate_core::{DocumentRenderer, Estimate, EstimateGateway, GatewayError};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

/// Timer and guard intervals. Defaults match live editing; tests shrink or
/// stretch them freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period after the last mutation before a save attempt.
    pub debounce: Duration,
    /// Fixed period between edit-independent save attempts.
    pub heartbeat: Duration,
    /// Minimum gap after a successful save before the next automatic one.
    pub min_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(2),
            heartbeat: Duration::from_secs(30),
            min_interval: Duration::from_secs(3),
        }
    }
}

/// External policy flag governing whether the estimate may be edited.
///
/// Checked immediately before every save attempt, not only at mutation
/// time, because the governing status can change mid-session.
pub trait EditPolicy: Send + Sync {
    fn can_edit(&self) -> bool;
}

/// Policy for estimates with no editing restriction.
pub struct AlwaysEditable;

impl EditPolicy for AlwaysEditable {
    fn can_edit(&self) -> bool {
        true
    }
}

/// What became of one save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Updated an already-persisted estimate.
    Saved,
    /// First save; carries the id the gateway assigned.
    Created(i64),
    SkippedInFlight,
    SkippedMinInterval,
    SkippedPolicy,
    /// Autosave failure, logged and swallowed.
    Failed,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("editing is restricted for this estimate")]
    EditingForbidden,

    #[error("another save is already in flight")]
    SaveInFlight,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

struct Shared {
    estimate: Mutex<Estimate>,
    gateway: Arc<dyn EstimateGateway>,
    policy: Arc<dyn EditPolicy>,
    config: SyncConfig,
    in_flight: AtomicBool,
    last_saved: StdMutex<Option<Instant>>,
    restriction_noticed: AtomicBool,
}

impl Shared {
    /// The save attempt procedure. `manual` bypasses the minimum interval
    /// and turns skips and failures into errors for the caller.
    async fn attempt(&self, manual: bool) -> Result<SaveOutcome, SyncError> {
        if !self.policy.can_edit() {
            // Standing notice on first detection; silent afterwards.
            if !self.restriction_noticed.swap(true, Ordering::SeqCst) {
                warn!("editing is restricted for this estimate; saves suspended");
            }
            return if manual {
                Err(SyncError::EditingForbidden)
            } else {
                Ok(SaveOutcome::SkippedPolicy)
            };
        }
        self.restriction_noticed.store(false, Ordering::SeqCst);

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("save skipped: another save is in flight");
            return if manual {
                Err(SyncError::SaveInFlight)
            } else {
                Ok(SaveOutcome::SkippedInFlight)
            };
        }

        let result = self.guarded_save(manual).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    /// Runs with the in-flight flag held.
    async fn guarded_save(&self, manual: bool) -> Result<SaveOutcome, SyncError> {
        if !manual {
            let too_soon = self
                .last_saved
                .lock()
                .unwrap()
                .is_some_and(|at| at.elapsed() < self.config.min_interval);
            if too_soon {
                debug!("save skipped: within minimum interval since last success");
                return Ok(SaveOutcome::SkippedMinInterval);
            }
        }

        // Snapshot under the lock, release before the network call.
        let (id, payload) = {
            let estimate = self.estimate.lock().await;
            (estimate.id, estimate.to_payload())
        };

        let result = match id {
            Some(id) => self
                .gateway
                .update(id, &payload)
                .await
                .map(|()| SaveOutcome::Saved),
            None => self.gateway.create(&payload).await.map(SaveOutcome::Created),
        };

        match result {
            Ok(outcome) => {
                if let SaveOutcome::Created(new_id) = outcome {
                    let mut estimate = self.estimate.lock().await;
                    if estimate.id.is_none() {
                        estimate.id = Some(new_id);
                    }
                    info!(id = new_id, "estimate persisted for the first time");
                }
                *self.last_saved.lock().unwrap() = Some(Instant::now());
                Ok(outcome)
            }
            Err(error) if manual => Err(SyncError::Gateway(error)),
            Err(error) => {
                warn!(%error, "autosave failed; editing continues");
                Ok(SaveOutcome::Failed)
            }
        }
    }
}

/// Scheduler that owns the debounce and heartbeat timers for one estimate.
///
/// Must be created inside a tokio runtime; the heartbeat task is spawned at
/// construction. Dropping the synchronizer cancels both timers.
pub struct Autosave {
    shared: Arc<Shared>,
    debounce: StdMutex<Option<JoinHandle<()>>>,
    heartbeat: JoinHandle<()>,
}

impl Autosave {
    pub fn new(
        estimate: Estimate,
        gateway: Arc<dyn EstimateGateway>,
        policy: Arc<dyn EditPolicy>,
    ) -> Self {
        Self::with_config(estimate, gateway, policy, SyncConfig::default())
    }

    pub fn with_config(
        estimate: Estimate,
        gateway: Arc<dyn EstimateGateway>,
        policy: Arc<dyn EditPolicy>,
        config: SyncConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            estimate: Mutex::new(estimate),
            gateway,
            policy,
            config,
            in_flight: AtomicBool::new(false),
            last_saved: StdMutex::new(None),
            restriction_noticed: AtomicBool::new(false),
        });
        let heartbeat = tokio::spawn(Self::heartbeat_loop(shared.clone(), Instant::now()));
        Self {
            shared,
            debounce: StdMutex::new(None),
            heartbeat,
        }
    }

    async fn heartbeat_loop(shared: Arc<Shared>, started: Instant) {
        // Anchored at construction so the first tick lands one full period
        // later, regardless of when this task is first polled.
        let mut ticker = time::interval_at(started + shared.config.heartbeat, shared.config.heartbeat);
        loop {
            ticker.tick().await;
            if !shared.estimate.lock().await.has_content() {
                debug!("heartbeat skipped: nothing to persist yet");
                continue;
            }
            let _ = shared.attempt(false).await;
        }
    }

    /// Applies a mutation to the estimate and restarts the debounce timer.
    pub async fn mutate<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Estimate) -> R,
    {
        let result = {
            let mut estimate = self.shared.estimate.lock().await;
            f(&mut estimate)
        };
        self.on_mutation();
        result
    }

    /// Reads the estimate without scheduling a save.
    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Estimate) -> R,
    {
        let estimate = self.shared.estimate.lock().await;
        f(&estimate)
    }

    /// Restarts the debounce timer. When the quiet period elapses without
    /// another mutation, a save attempt is made.
    pub fn on_mutation(&self) {
        let shared = self.shared.clone();
        // Anchor the quiet period at the mutation itself, not at whenever
        // the spawned task is first polled.
        let deadline = Instant::now() + shared.config.debounce;
        let handle = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            let _ = shared.attempt(false).await;
        });
        if let Some(previous) = self.debounce.lock().unwrap().replace(handle) {
            previous.abort();
        }
    }

    /// Explicit save. Bypasses debounce and minimum interval, but still
    /// honors the single-flight guard and the permission gate. On failure
    /// the in-memory estimate is untouched so the caller can retry.
    pub async fn save_now(&self) -> Result<SaveOutcome, SyncError> {
        self.shared.attempt(true).await
    }

    /// Persists the estimate, then asks the document collaborator to render
    /// it, so the artifact reflects current state.
    pub async fn generate_document(
        &self,
        renderer: &dyn DocumentRenderer,
    ) -> Result<Vec<u8>, SyncError> {
        self.save_now().await?;
        let id = self
            .shared
            .estimate
            .lock()
            .await
            .id
            .ok_or(SyncError::Gateway(GatewayError::NotFound))?;
        renderer.render(id).await.map_err(SyncError::Gateway)
    }

    /// Cancels both timers. No save fires after teardown.
    pub fn teardown(&self) {
        if let Some(handle) = self.debounce.lock().unwrap().take() {
            handle.abort();
        }
        self.heartbeat.abort();
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use estimate_core::{EstimatePayload, ItemKind, LineItem};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    /// Gateway stub that counts every call reaching it. `delay` holds the
    /// call open on the paused clock; `fail` makes it error after counting.
    struct StubGateway {
        creates: AtomicUsize,
        updates: AtomicUsize,
        delay: Duration,
        fail: AtomicBool,
    }

    impl StubGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                creates: AtomicUsize::new(0),
                updates: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: AtomicBool::new(false),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                creates: AtomicUsize::new(0),
                updates: AtomicUsize::new(0),
                delay,
                fail: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> usize {
            self.creates.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EstimateGateway for StubGateway {
        async fn create(&self, _payload: &EstimatePayload) -> Result<i64, GatewayError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self.delay > Duration::ZERO {
                time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Database("stub failure".to_string()));
            }
            Ok(7)
        }

        async fn update(&self, _id: i64, _payload: &EstimatePayload) -> Result<(), GatewayError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            if self.delay > Duration::ZERO {
                time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Database("stub failure".to_string()));
            }
            Ok(())
        }

        async fn read(&self, _id: i64) -> Result<EstimatePayload, GatewayError> {
            Err(GatewayError::NotFound)
        }

        async fn list_by_project(
            &self,
            _project_id: &str,
        ) -> Result<Vec<(i64, EstimatePayload)>, GatewayError> {
            Ok(Vec::new())
        }
    }

    struct TogglePolicy {
        allowed: AtomicBool,
    }

    impl TogglePolicy {
        fn new(allowed: bool) -> Arc<Self> {
            Arc::new(Self {
                allowed: AtomicBool::new(allowed),
            })
        }
    }

    impl EditPolicy for TogglePolicy {
        fn can_edit(&self) -> bool {
            self.allowed.load(Ordering::SeqCst)
        }
    }

    fn seeded_estimate() -> Estimate {
        let mut estimate = Estimate::new("proj-1");
        estimate
            .add_item(LineItem {
                id: None,
                name: "Dump fees".to_string(),
                description: String::new(),
                section: "Misc".to_string(),
                unit: String::new(),
                quantity: dec!(1),
                unit_price: dec!(150),
                markup_override: None,
                taxable: true,
                kind: ItemKind::Miscellaneous,
            })
            .unwrap();
        estimate
    }

    fn autosave(gateway: Arc<StubGateway>, estimate: Estimate) -> Autosave {
        Autosave::new(estimate, gateway, Arc::new(AlwaysEditable))
    }

    /// Lets already-scheduled tasks run without advancing the clock.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_mutations_coalesce_into_one_save() {
        let gateway = StubGateway::new();
        let sync = autosave(gateway.clone(), seeded_estimate());

        // Ten mutations inside one second.
        for _ in 0..10 {
            sync.mutate(|est| est.rates.markup_percent += dec!(1)).await;
            time::advance(Duration::from_millis(100)).await;
        }

        time::advance(Duration::from_secs(3)).await;
        settle().await;

        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_restarts_on_every_mutation() {
        let gateway = StubGateway::new();
        let sync = autosave(gateway.clone(), seeded_estimate());

        sync.on_mutation();
        time::advance(Duration::from_millis(1500)).await;
        // Not yet: the quiet period restarts here.
        assert_eq!(gateway.calls(), 0);
        sync.on_mutation();
        time::advance(Duration::from_millis(1500)).await;
        assert_eq!(gateway.calls(), 0);

        time::advance(Duration::from_millis(600)).await;
        settle().await;

        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_saves_without_edits() {
        let gateway = StubGateway::new();
        let _sync = autosave(gateway.clone(), seeded_estimate());

        time::advance(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(gateway.calls(), 1);

        time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_skips_an_estimate_with_nothing_to_persist() {
        let gateway = StubGateway::new();
        let _sync = autosave(gateway.clone(), Estimate::new("proj-1"));

        time::advance(Duration::from_secs(95)).await;
        settle().await;

        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn min_interval_drops_a_follow_up_attempt() {
        let gateway = StubGateway::new();
        let sync = autosave(gateway.clone(), seeded_estimate());

        sync.on_mutation();
        time::advance(Duration::from_millis(2100)).await;
        settle().await;
        assert_eq!(gateway.calls(), 1); // saved at ~2.1s

        // Fires at ~4.6s, only ~2.5s after the last success: dropped.
        time::advance(Duration::from_millis(500)).await;
        sync.on_mutation();
        time::advance(Duration::from_millis(2100)).await;
        settle().await;
        assert_eq!(gateway.calls(), 1);

        // Well past the minimum interval: saves again.
        time::advance(Duration::from_secs(5)).await;
        sync.on_mutation();
        time::advance(Duration::from_millis(2100)).await;
        settle().await;
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn single_flight_drops_overlapping_attempts() {
        let gateway = StubGateway::slow(Duration::from_secs(10));
        let sync = Arc::new(autosave(gateway.clone(), seeded_estimate()));

        let slow_save = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.save_now().await })
        };
        settle().await; // the slow save is now holding the in-flight flag

        assert!(matches!(sync.save_now().await, Err(SyncError::SaveInFlight)));

        // A debounce attempt while in flight is silently dropped, not queued.
        sync.on_mutation();
        time::advance(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(gateway.calls(), 1);

        time::advance(Duration::from_secs(8)).await;
        let outcome = slow_save.await.unwrap().unwrap();
        assert_eq!(outcome, SaveOutcome::Created(7));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_save_creates_and_stores_the_id() {
        let gateway = StubGateway::new();
        let sync = autosave(gateway.clone(), seeded_estimate());

        let first = sync.save_now().await.unwrap();
        assert_eq!(first, SaveOutcome::Created(7));
        assert_eq!(sync.read(|est| est.id).await, Some(7));

        let second = sync.save_now().await.unwrap();
        assert_eq!(second, SaveOutcome::Saved);
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_failure_is_swallowed_and_state_preserved() {
        let gateway = StubGateway::new();
        gateway.fail.store(true, Ordering::SeqCst);
        let sync = autosave(gateway.clone(), seeded_estimate());

        sync.on_mutation();
        time::advance(Duration::from_secs(3)).await;
        settle().await;

        // The attempt reached the gateway, failed, and changed nothing.
        assert_eq!(gateway.calls(), 1);
        assert_eq!(sync.read(|est| est.id).await, None);
        assert_eq!(sync.read(|est| est.items.len()).await, 1);

        // A manual save surfaces the same failure.
        assert!(matches!(
            sync.save_now().await,
            Err(SyncError::Gateway(GatewayError::Database(_)))
        ));

        gateway.fail.store(false, Ordering::SeqCst);
        assert_eq!(sync.save_now().await.unwrap(), SaveOutcome::Created(7));
    }

    #[tokio::test(start_paused = true)]
    async fn permission_gate_blocks_automatic_and_manual_saves() {
        let gateway = StubGateway::new();
        let policy = TogglePolicy::new(false);
        let sync = Autosave::new(seeded_estimate(), gateway.clone(), policy.clone());

        sync.on_mutation();
        time::advance(Duration::from_secs(35)).await; // debounce and heartbeat
        settle().await;
        assert_eq!(gateway.calls(), 0);

        assert!(matches!(
            sync.save_now().await,
            Err(SyncError::EditingForbidden)
        ));

        // The gate can flip mid-session; the next attempt goes through.
        policy.allowed.store(true, Ordering::SeqCst);
        assert_eq!(sync.save_now().await.unwrap(), SaveOutcome::Created(7));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_timers() {
        let gateway = StubGateway::new();
        let sync = autosave(gateway.clone(), seeded_estimate());

        sync.on_mutation();
        sync.teardown();

        time::advance(Duration::from_secs(120)).await;
        settle().await;

        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_document_persists_before_rendering() {
        struct StubRenderer {
            rendered: StdMutex<Vec<i64>>,
        }

        #[async_trait]
        impl DocumentRenderer for StubRenderer {
            async fn render(&self, estimate_id: i64) -> Result<Vec<u8>, GatewayError> {
                self.rendered.lock().unwrap().push(estimate_id);
                Ok(vec![0x25, 0x50, 0x44, 0x46])
            }
        }

        let gateway = StubGateway::new();
        let renderer = StubRenderer {
            rendered: StdMutex::new(Vec::new()),
        };
        let sync = autosave(gateway.clone(), seeded_estimate());

        let artifact = sync.generate_document(&renderer).await.unwrap();

        assert!(!artifact.is_empty());
        // Saved first, so the renderer saw the freshly assigned id.
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 1);
        assert_eq!(*renderer.rendered.lock().unwrap(), vec![7]);
    }
}
