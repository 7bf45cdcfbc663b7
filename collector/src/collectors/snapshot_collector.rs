use crate::{
    collectors::Collector,
    metrics::*,
};
use chrono::{
    DateTime,
    Utc,
};
use eyre::{
    Result,
    WrapErr as _,
};
use serde::Serialize;
use std::{
    sync::{
        atomic::{
            AtomicU64,
            Ordering,
        },
        Arc,
        PoisonError,
        RwLock,
    },
    time::{
        Duration,
        Instant,
    },
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default cadence, matching the sampling interval of the upstream usage series.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(70);

/// Scraped as `conoha_exporter_refresh_errors_total`.
pub const REFRESH_ERRORS: MetricDescriptor = MetricDescriptor::counter(
    "conoha_exporter_refresh_errors",
    "Refresh cycles that failed and left the previous snapshot in place",
    &[],
);
pub const LAST_SUCCESS: MetricDescriptor = MetricDescriptor::gauge(
    "conoha_exporter_last_success_timestamp_seconds",
    "Unix time of the last completed refresh cycle",
    &[],
);
pub const GENERATION: MetricDescriptor =
    MetricDescriptor::gauge("conoha_exporter_snapshot_generation", "Generation of the served snapshot", &[]);

const SELF_DESCRIPTORS: [MetricDescriptor; 3] = [REFRESH_ERRORS, LAST_SUCCESS, GENERATION];

/// Health of the refresh loop as seen by readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectorStatus {
    pub generation: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub refresh_errors: u64,
}

impl CollectorStatus {
    /// The status as samples of the self-describing metric families.
    pub fn samples(&self) -> Vec<LabeledSample> {
        let last_success = self
            .last_success
            .map(|at| at.timestamp_millis() as f64 / 1000.0)
            .unwrap_or(0.0);
        vec![
            LabeledSample {
                metric: REFRESH_ERRORS.name,
                labels: Vec::new(),
                value: self.refresh_errors as f64,
            },
            LabeledSample {
                metric: LAST_SUCCESS.name,
                labels: Vec::new(),
                value: last_success,
            },
            LabeledSample {
                metric: GENERATION.name,
                labels: Vec::new(),
                value: self.generation as f64,
            },
        ]
    }
}

/// Rebuilds the snapshot from all collectors on a fixed interval and serves
/// the last complete one to any number of readers.
///
/// Each cycle assembles its samples in a private [`SnapshotBuilder`]; only a
/// fully built snapshot is published, by swapping the `Arc` under the write
/// lock. A failed cycle publishes nothing, so readers keep getting the last
/// good snapshot.
pub struct SnapshotCollector {
    collectors: Vec<Box<dyn Collector>>,
    descriptors: Vec<MetricDescriptor>,
    interval: Duration,
    current: RwLock<Arc<Snapshot>>,
    refresh_errors: AtomicU64,
    /// Serializes cycles so generations are published in order.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for SnapshotCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCollector")
            .field("collectors", &self.collector_names())
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl SnapshotCollector {
    pub fn new(collectors: Vec<Box<dyn Collector>>, interval: Duration) -> Self {
        let descriptors = collectors
            .iter()
            .flat_map(|collector| collector.describe().iter().copied())
            .chain(SELF_DESCRIPTORS)
            .collect();

        Self {
            collectors,
            descriptors,
            interval,
            current: RwLock::new(Arc::new(Snapshot::empty())),
            refresh_errors: AtomicU64::new(0),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Every metric family that can appear, including ones without samples yet.
    pub fn describe(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|collector| collector.name()).collect()
    }

    /// The most recently completed snapshot, or [`Snapshot::empty`] before the first cycle.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn refresh_errors(&self) -> u64 {
        self.refresh_errors.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> CollectorStatus {
        let snapshot = self.current_snapshot();
        CollectorStatus {
            generation: snapshot.generation(),
            last_success: snapshot.taken_at(),
            refresh_errors: self.refresh_errors(),
        }
    }

    /// Run one complete cycle and publish its snapshot.
    ///
    /// On error nothing is published and the failure counter is incremented.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let _cycle = self.refresh_lock.lock().await;
        let started = Instant::now();
        let taken_at = Utc::now();

        match self.build().await {
            Ok(builder) => {
                let generation = self.current_snapshot().generation() + 1;
                let snapshot = Arc::new(builder.finish(generation, taken_at));
                self.publish(snapshot.clone());
                debug!(
                    generation,
                    samples = snapshot.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "published snapshot"
                );
                Ok(snapshot)
            }
            Err(err) => {
                self.refresh_errors.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    async fn build(&self) -> Result<SnapshotBuilder> {
        let mut builder = SnapshotBuilder::new();
        for collector in &self.collectors {
            collector
                .collect(&mut builder)
                .await
                .wrap_err_with(|| format!("{} collector failed", collector.name()))?;
        }
        Ok(builder)
    }

    fn publish(&self, snapshot: Arc<Snapshot>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Refresh every `interval` until `cancel` fires.
    ///
    /// The first refresh happens one interval after the call; callers that
    /// need data right away run [`SnapshotCollector::refresh`] beforehand.
    /// Cycles start on a fixed cadence, so the time a cycle takes does not
    /// push the next one back. A cycle that overruns its slot delays the
    /// following tick instead of bunching up missed ones.
    /// A cycle that is in flight when `cancel` fires is dropped unpublished.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            collectors = ?self.collector_names(),
            "snapshot collector started"
        );

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.refresh() => {
                    if let Err(err) = result {
                        error!(
                            generation = self.current_snapshot().generation(),
                            refresh_errors = self.refresh_errors(),
                            "refresh failed, keeping previous snapshot: {err:#}"
                        );
                    }
                }
            }
        }

        info!("snapshot collector shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{
        future::Future,
        pin::Pin,
        sync::atomic::AtomicBool,
    };

    const VALUE: MetricDescriptor = MetricDescriptor::gauge("test_value", "Test value", &["slot"]);

    /// Pushes `width` samples that all carry the number of the cycle, yielding
    /// between pushes so readers get scheduled mid-cycle.
    struct CyclingCollector {
        cycle: AtomicU64,
        width: usize,
        fail: AtomicBool,
    }

    impl CyclingCollector {
        fn new(width: usize) -> Arc<Self> {
            Arc::new(Self {
                cycle: AtomicU64::new(0),
                width,
                fail: AtomicBool::new(false),
            })
        }
    }

    impl Collector for Arc<CyclingCollector> {
        fn describe(&self) -> &'static [MetricDescriptor] {
            &[VALUE]
        }

        fn collect<'a>(
            &'a self,
            builder: &'a mut SnapshotBuilder,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
                for slot in 0..self.width {
                    builder.push(&VALUE, &[slot.to_string()], cycle as f64)?;
                    if slot == self.width / 2 && self.fail.load(Ordering::SeqCst) {
                        eyre::bail!("upstream went away in cycle {cycle}");
                    }
                    tokio::task::yield_now().await;
                }
                Ok(())
            })
        }

        fn name(&self) -> &'static str {
            "cycling"
        }
    }

    /// Same data every cycle.
    struct FixedCollector;

    impl Collector for FixedCollector {
        fn describe(&self) -> &'static [MetricDescriptor] {
            &[VALUE]
        }

        fn collect<'a>(
            &'a self,
            builder: &'a mut SnapshotBuilder,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                builder.push(&VALUE, &["a"], 1.5)?;
                builder.push(&VALUE, &["b"], 2.5)?;
                Ok(())
            })
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn describe_lists_collector_and_self_metrics() {
        let collector = SnapshotCollector::new(vec![Box::new(FixedCollector)], DEFAULT_REFRESH_INTERVAL);
        let names: Vec<_> = collector.describe().iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "test_value",
                "conoha_exporter_refresh_errors",
                "conoha_exporter_last_success_timestamp_seconds",
                "conoha_exporter_snapshot_generation",
            ]
        );
    }

    #[tokio::test]
    async fn empty_before_first_cycle() {
        let collector = SnapshotCollector::new(vec![Box::new(FixedCollector)], DEFAULT_REFRESH_INTERVAL);
        let snapshot = collector.current_snapshot();
        assert_eq!(snapshot.generation(), 0);
        assert!(snapshot.is_empty());
        assert_eq!(collector.status().last_success, None);
    }

    #[tokio::test]
    async fn identical_upstream_gives_equal_samples() {
        let collector = SnapshotCollector::new(vec![Box::new(FixedCollector)], DEFAULT_REFRESH_INTERVAL);
        let first = collector.refresh().await.unwrap();
        let second = collector.refresh().await.unwrap();

        assert_eq!(first.samples(), second.samples());
        assert_eq!(first.generation(), 1);
        assert_eq!(second.generation(), 2);
        assert_eq!(collector.current_snapshot().generation(), 2);
    }

    #[tokio::test]
    async fn failed_cycle_keeps_previous_snapshot() {
        let source = CyclingCollector::new(4);
        let collector = SnapshotCollector::new(vec![Box::new(source.clone())], DEFAULT_REFRESH_INTERVAL);

        let good = collector.refresh().await.unwrap();
        assert_eq!(good.len(), 4);

        source.fail.store(true, Ordering::SeqCst);
        let err = collector.refresh().await.unwrap_err();
        assert!(format!("{err:#}").contains("upstream went away in cycle 2"), "{err:#}");

        let served = collector.current_snapshot();
        assert!(Arc::ptr_eq(&served, &good));
        assert!(served.samples().iter().all(|s| s.value == 1.0));
        assert_eq!(collector.refresh_errors(), 1);

        let status = collector.status();
        assert_eq!(status.generation, 1);
        assert_eq!(status.refresh_errors, 1);
        assert_eq!(status.samples()[0].value, 1.0);

        source.fail.store(false, Ordering::SeqCst);
        let recovered = collector.refresh().await.unwrap();
        assert_eq!(recovered.generation(), 2);
        assert!(recovered.samples().iter().all(|s| s.value == 3.0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_partial_snapshot() {
        const WIDTH: usize = 64;
        const CYCLES: u64 = 50;
        const READERS: usize = 8;

        let source = CyclingCollector::new(WIDTH);
        let collector = Arc::new(SnapshotCollector::new(
            vec![Box::new(source.clone())],
            DEFAULT_REFRESH_INTERVAL,
        ));
        let done = CancellationToken::new();

        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let collector = collector.clone();
                let done = done.clone();
                tokio::spawn(async move {
                    let mut observed = 0u64;
                    let mut last_generation = 0;
                    while !done.is_cancelled() {
                        let snapshot = collector.current_snapshot();
                        if snapshot.generation() > 0 {
                            assert_eq!(snapshot.len(), WIDTH);
                            let cycle = snapshot.samples()[0].value;
                            assert!(snapshot.samples().iter().all(|s| s.value == cycle));
                        } else {
                            assert!(snapshot.is_empty());
                        }
                        assert!(snapshot.generation() >= last_generation);
                        last_generation = snapshot.generation();
                        observed += 1;
                        tokio::task::yield_now().await;
                    }
                    observed
                })
            })
            .collect();

        for cycle in 1..=CYCLES {
            if cycle % 7 == 0 {
                source.fail.store(true, Ordering::SeqCst);
                assert!(collector.refresh().await.is_err());
                source.fail.store(false, Ordering::SeqCst);
            } else {
                collector.refresh().await.unwrap();
            }
        }
        done.cancel();

        for reader in readers {
            assert!(reader.await.unwrap() > 0);
        }
        assert_eq!(collector.refresh_errors(), CYCLES / 7);
        assert_eq!(collector.current_snapshot().generation(), CYCLES - CYCLES / 7);
    }

    #[tokio::test(start_paused = true)]
    async fn run_refreshes_until_cancelled() {
        let source = CyclingCollector::new(2);
        let collector = Arc::new(SnapshotCollector::new(
            vec![Box::new(source.clone())],
            Duration::from_secs(70),
        ));
        let cancel = CancellationToken::new();

        let task = tokio::spawn({
            let collector = collector.clone();
            let cancel = cancel.clone();
            async move { collector.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_secs(70 * 3 + 1)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(collector.current_snapshot().generation(), 3);
        assert_eq!(source.cycle.load(Ordering::SeqCst), 3);
    }

    /// Takes `duration` of (paused) time per cycle.
    struct SlowCollector {
        duration: Duration,
        cycles: Arc<AtomicU64>,
    }

    impl Collector for SlowCollector {
        fn describe(&self) -> &'static [MetricDescriptor] {
            &[VALUE]
        }

        fn collect<'a>(
            &'a self,
            builder: &'a mut SnapshotBuilder,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                tokio::time::sleep(self.duration).await;
                let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
                builder.push(&VALUE, &["a"], cycle as f64)
            })
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_keeps_the_cadence_when_cycles_take_time() {
        let cycles = Arc::new(AtomicU64::new(0));
        let collector = Arc::new(SnapshotCollector::new(
            vec![Box::new(SlowCollector {
                duration: Duration::from_secs(10),
                cycles: cycles.clone(),
            })],
            Duration::from_secs(70),
        ));
        let cancel = CancellationToken::new();

        let task = tokio::spawn({
            let collector = collector.clone();
            let cancel = cancel.clone();
            async move { collector.run(cancel).await }
        });

        // Cycles start at 70s, 140s and 210s and each finishes 10s later.
        tokio::time::sleep(Duration::from_secs(70 * 3 + 15)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(cycles.load(Ordering::SeqCst), 3);
        assert_eq!(collector.current_snapshot().generation(), 3);
    }
}
