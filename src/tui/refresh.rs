//! Refresh cycles: concurrent upstream fetches bounded by one deadline.
//!
//! A cycle runs on its own coordinator thread. The forecast and metrics
//! fetches each get a worker thread and report back over a per-cycle
//! channel; the coordinator forwards every result into the dashboard queue
//! as soon as it lands, reports whatever is still pending when the window
//! closes, and then checks health. Starting a new cycle drops the previous
//! cycle's cancel sender, which ends its coordinator without further output.
//!
//! Workers share the cancel receiver: a cancelled worker that has not issued
//! its request yet skips it. A request already on the wire cannot be
//! interrupted by the blocking client, but its timeout is derived from the
//! cycle deadline, so an abandoned worker exits no later than the window
//! closes and its result is dropped.

#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, after, bounded, select, unbounded};

use crate::client::{Deadline, EnrichedSnapshot, ScalerMetrics, UpstreamClient};
use crate::core::errors::{KedastralError, Result};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::tui::model::{DashboardMsg, Endpoint, FetchFailure};

/// Shared deadline for one cycle and for the workload listing.
pub const CYCLE_WINDOW: Duration = Duration::from_secs(5);
/// Upper bound for each `/healthz` check.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Cycle id used in log entries for the out-of-cycle workload listing.
const LISTING_CYCLE: u64 = 0;

enum WorkerResult {
    Forecast(Result<EnrichedSnapshot>, Duration),
    Metrics(Result<ScalerMetrics>, Duration),
}

/// Counts a fetch worker from cycle start until its thread is gone.
struct WorkerSlot(Arc<AtomicUsize>);

impl WorkerSlot {
    fn claim(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owns the cancel handle of the cycle in flight.
pub struct RefreshOrchestrator {
    client: UpstreamClient,
    tx: Sender<DashboardMsg>,
    logger: ActivityLoggerHandle,
    window: Duration,
    current: Option<Sender<()>>,
    workers: Arc<AtomicUsize>,
}

impl RefreshOrchestrator {
    pub fn new(client: UpstreamClient, tx: Sender<DashboardMsg>, logger: ActivityLoggerHandle) -> Self {
        Self {
            client,
            tx,
            logger,
            window: CYCLE_WINDOW,
            current: None,
            workers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the cycle window. Health checks never get more than it.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Cancel the cycle in flight, if any, and start `cycle`.
    pub fn start_cycle(&mut self, cycle: u64, workload: String, lead_time: Duration) -> Result<()> {
        self.cancel();

        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        self.current = Some(cancel_tx);

        self.logger.send(ActivityEvent::CycleStarted {
            cycle,
            workload: workload.clone(),
        });

        let job = CycleJob {
            cycle,
            workload,
            lead_time,
            deadline: Deadline::after(self.window),
            window: self.window,
            health_budget: self.window.min(HEALTH_CHECK_TIMEOUT),
            client: self.client.clone(),
            tx: self.tx.clone(),
            logger: self.logger.clone(),
        };
        let slots = (
            WorkerSlot::claim(&self.workers),
            WorkerSlot::claim(&self.workers),
        );

        thread::Builder::new()
            .name(format!("ktui-cycle-{cycle}"))
            .spawn(move || job.run(&cancel_rx, slots))
            .map(|_| ())
            .map_err(|source| KedastralError::Runtime {
                details: format!("failed to spawn refresh cycle thread: {source}"),
            })
    }

    /// Fetch the workload list once; the result arrives as `WorkloadsListed`.
    pub fn list_workloads(&self) -> Result<()> {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let logger = self.logger.clone();
        let deadline = Deadline::after(self.window);

        thread::Builder::new()
            .name("ktui-workloads".to_string())
            .spawn(move || {
                let started = Instant::now();
                let result = client.list_workloads(deadline);
                let elapsed = started.elapsed();
                match &result {
                    Ok(list) => logger.send(ActivityEvent::FetchSucceeded {
                        cycle: LISTING_CYCLE,
                        endpoint: Endpoint::Workloads.as_str(),
                        duration_ms: millis(elapsed),
                        details: Some(format!("workloads={}", list.len())),
                    }),
                    Err(err) => logger.send(failed_event(LISTING_CYCLE, Endpoint::Workloads, err, elapsed)),
                }
                let _ = tx.send(DashboardMsg::WorkloadsListed(result.map_err(FetchFailure::from)));
            })
            .map(|_| ())
            .map_err(|source| KedastralError::Runtime {
                details: format!("failed to spawn workload listing thread: {source}"),
            })
    }

    /// Abandon the cycle in flight. Its coordinator exits without sending.
    pub fn cancel(&mut self) {
        self.current = None;
    }

    #[must_use]
    pub const fn has_cycle(&self) -> bool {
        self.current.is_some()
    }

    /// Fetch workers whose threads have not finished, across all cycles.
    #[must_use]
    pub fn workers_in_flight(&self) -> usize {
        self.workers.load(Ordering::SeqCst)
    }
}

// ──────────────────── cycle coordinator ────────────────────

struct CycleJob {
    cycle: u64,
    workload: String,
    lead_time: Duration,
    deadline: Deadline,
    window: Duration,
    health_budget: Duration,
    client: UpstreamClient,
    tx: Sender<DashboardMsg>,
    logger: ActivityLoggerHandle,
}

impl CycleJob {
    fn run(self, cancel_rx: &Receiver<()>, slots: (WorkerSlot, WorkerSlot)) {
        let (res_tx, res_rx) = unbounded::<WorkerResult>();
        let mut pending = BTreeSet::from([Endpoint::Forecast, Endpoint::Metrics]);

        let (forecast_slot, metrics_slot) = slots;
        self.spawn_forecast_worker(res_tx.clone(), cancel_rx.clone(), forecast_slot);
        self.spawn_metrics_worker(res_tx, cancel_rx.clone(), metrics_slot);

        let window_closed = after(
            self.deadline
                .instant()
                .saturating_duration_since(Instant::now()),
        );

        while !pending.is_empty() {
            select! {
                recv(res_rx) -> msg => match msg {
                    Ok(result) => {
                        if !self.forward(result, &mut pending) {
                            return;
                        }
                    }
                    // Every worker is gone without reporting.
                    Err(_) => {
                        if !self.expire(&pending) {
                            return;
                        }
                        pending.clear();
                    }
                },
                recv(cancel_rx) -> _ => return,
                recv(window_closed) -> _ => {
                    if !self.expire(&pending) {
                        return;
                    }
                    pending.clear();
                },
            }
        }

        if is_cancelled(cancel_rx) {
            return;
        }

        let forecaster = self
            .client
            .check_health(self.client.forecaster_url(), Deadline::after(self.health_budget));
        let scaler = self
            .client
            .check_health(self.client.scaler_url(), Deadline::after(self.health_budget));

        if is_cancelled(cancel_rx) {
            return;
        }
        let _ = self.tx.send(DashboardMsg::HealthChecked {
            cycle: self.cycle,
            forecaster,
            scaler,
        });
    }

    fn spawn_forecast_worker(
        &self,
        res_tx: Sender<WorkerResult>,
        cancel_rx: Receiver<()>,
        slot: WorkerSlot,
    ) {
        let client = self.client.clone();
        let workload = self.workload.clone();
        let (lead_time, deadline) = (self.lead_time, self.deadline);
        // A worker that cannot be spawned is reported when the window closes.
        let _ = thread::Builder::new()
            .name("ktui-forecast".to_string())
            .spawn(move || {
                let _slot = slot;
                if is_cancelled(&cancel_rx) {
                    return;
                }
                let started = Instant::now();
                let result = client.get_quantile_snapshot(&workload, lead_time, deadline);
                let _ = res_tx.send(WorkerResult::Forecast(result, started.elapsed()));
            });
    }

    fn spawn_metrics_worker(
        &self,
        res_tx: Sender<WorkerResult>,
        cancel_rx: Receiver<()>,
        slot: WorkerSlot,
    ) {
        let client = self.client.clone();
        let deadline = self.deadline;
        let _ = thread::Builder::new()
            .name("ktui-metrics".to_string())
            .spawn(move || {
                let _slot = slot;
                if is_cancelled(&cancel_rx) {
                    return;
                }
                let started = Instant::now();
                let result = client.get_scaler_metrics(deadline);
                let _ = res_tx.send(WorkerResult::Metrics(result, started.elapsed()));
            });
    }

    /// Log and forward one worker result. False once the dashboard is gone.
    fn forward(&self, result: WorkerResult, pending: &mut BTreeSet<Endpoint>) -> bool {
        let cycle = self.cycle;
        let msg = match result {
            WorkerResult::Forecast(result, elapsed) => {
                pending.remove(&Endpoint::Forecast);
                match &result {
                    Ok(enriched) => self.logger.send(ActivityEvent::FetchSucceeded {
                        cycle,
                        endpoint: Endpoint::Forecast.as_str(),
                        duration_ms: millis(elapsed),
                        details: Some(format!(
                            "steps={} api=v{}",
                            enriched.snapshot.desired_replicas.len(),
                            enriched.snapshot.api_version
                        )),
                    }),
                    Err(err) => {
                        self.logger
                            .send(failed_event(cycle, Endpoint::Forecast, err, elapsed));
                    }
                }
                DashboardMsg::ForecastFetched {
                    cycle,
                    result: result.map(Box::new).map_err(FetchFailure::from),
                }
            }
            WorkerResult::Metrics(result, elapsed) => {
                pending.remove(&Endpoint::Metrics);
                match &result {
                    Ok(_) => self.logger.send(ActivityEvent::FetchSucceeded {
                        cycle,
                        endpoint: Endpoint::Metrics.as_str(),
                        duration_ms: millis(elapsed),
                        details: None,
                    }),
                    Err(err) => {
                        self.logger
                            .send(failed_event(cycle, Endpoint::Metrics, err, elapsed));
                    }
                }
                DashboardMsg::MetricsFetched {
                    cycle,
                    result: result.map_err(FetchFailure::from),
                }
            }
        };
        self.tx.send(msg).is_ok()
    }

    /// Report every pending fetch as timed out.
    fn expire(&self, pending: &BTreeSet<Endpoint>) -> bool {
        if pending.is_empty() {
            return true;
        }
        self.logger.send(ActivityEvent::CycleDeadline {
            cycle: self.cycle,
            pending: pending.iter().map(|e| e.as_str()).collect(),
        });

        let timeout_ms = millis(self.window);
        for &endpoint in pending {
            let failure = FetchFailure::from(KedastralError::DeadlineExceeded {
                endpoint: endpoint.as_str().to_string(),
                timeout_ms,
            });
            let msg = match endpoint {
                Endpoint::Forecast => DashboardMsg::ForecastFetched {
                    cycle: self.cycle,
                    result: Err(failure),
                },
                Endpoint::Metrics => DashboardMsg::MetricsFetched {
                    cycle: self.cycle,
                    result: Err(failure),
                },
                Endpoint::Workloads | Endpoint::Health => continue,
            };
            if self.tx.send(msg).is_err() {
                return false;
            }
        }
        true
    }
}

/// The cancel sender was dropped (or, never in practice, signalled).
fn is_cancelled(cancel_rx: &Receiver<()>) -> bool {
    !matches!(cancel_rx.try_recv(), Err(TryRecvError::Empty))
}

fn failed_event(cycle: u64, endpoint: Endpoint, err: &KedastralError, elapsed: Duration) -> ActivityEvent {
    ActivityEvent::FetchFailed {
        cycle,
        endpoint: endpoint.as_str(),
        code: err.code().to_string(),
        message: err.to_string(),
        duration_ms: millis(elapsed),
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    /// A base URL on which nothing listens.
    fn closed_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    fn drain(rx: &Receiver<DashboardMsg>, count: usize, wait: Duration) -> Vec<DashboardMsg> {
        (0..count)
            .map_while(|_| rx.recv_timeout(wait).ok())
            .collect()
    }

    #[test]
    fn every_endpoint_reports_even_when_all_fail() {
        let url = closed_url();
        let client = UpstreamClient::new(&url, &url).unwrap();
        let (tx, rx) = unbounded();
        let mut orch = RefreshOrchestrator::new(client, tx, ActivityLoggerHandle::noop());
        orch.start_cycle(7, "api".to_string(), Duration::from_secs(300))
            .unwrap();

        let msgs = drain(&rx, 3, Duration::from_secs(10));
        assert_eq!(msgs.len(), 3);
        let mut seen = BTreeSet::new();
        for msg in msgs {
            match msg {
                DashboardMsg::ForecastFetched { cycle, result } => {
                    assert_eq!(cycle, 7);
                    assert!(result.is_err());
                    seen.insert(Endpoint::Forecast);
                }
                DashboardMsg::MetricsFetched { cycle, result } => {
                    assert_eq!(cycle, 7);
                    assert!(result.is_err());
                    seen.insert(Endpoint::Metrics);
                }
                DashboardMsg::HealthChecked {
                    cycle,
                    forecaster,
                    scaler,
                } => {
                    assert_eq!(cycle, 7);
                    assert!(!forecaster && !scaler);
                    seen.insert(Endpoint::Health);
                }
                other => panic!("unexpected message {other:?}"),
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn silent_upstream_times_out_within_the_window() {
        // Accepts connections (backlog) but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let client = UpstreamClient::new(&url, &url).unwrap();
        let (tx, rx) = unbounded();
        let mut orch = RefreshOrchestrator::new(client, tx, ActivityLoggerHandle::noop())
            .with_window(Duration::from_millis(300));

        let started = Instant::now();
        orch.start_cycle(1, "api".to_string(), Duration::from_secs(300))
            .unwrap();
        let msgs = drain(&rx, 2, Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(msgs.len(), 2);
        for msg in msgs {
            let failure = match msg {
                DashboardMsg::ForecastFetched { result, .. } => result.map(|_| ()).unwrap_err(),
                DashboardMsg::MetricsFetched { result, .. } => result.map(|_| ()).unwrap_err(),
                other => panic!("unexpected message {other:?}"),
            };
            assert_eq!(failure.code, "KTUI-2004");
        }
        drop(listener);
    }

    #[test]
    fn cancelled_cycle_sends_nothing_more() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let client = UpstreamClient::new(&url, &url).unwrap();
        let (tx, rx) = unbounded();
        let mut orch = RefreshOrchestrator::new(client, tx, ActivityLoggerHandle::noop())
            .with_window(Duration::from_millis(300));

        orch.start_cycle(1, "api".to_string(), Duration::from_secs(300))
            .unwrap();
        assert!(orch.has_cycle());
        orch.cancel();
        assert!(!orch.has_cycle());
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_err());
        drop(listener);
    }

    fn wait_for_idle_workers(orch: &RefreshOrchestrator, limit: Duration) -> bool {
        let started = Instant::now();
        while started.elapsed() < limit {
            if orch.workers_in_flight() == 0 {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        orch.workers_in_flight() == 0
    }

    #[test]
    fn cancelled_workers_exit_by_the_window() {
        // Accepts connections (backlog) but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let client = UpstreamClient::new(&url, &url).unwrap();
        let (tx, rx) = unbounded();
        let window = Duration::from_millis(400);
        let mut orch =
            RefreshOrchestrator::new(client, tx, ActivityLoggerHandle::noop()).with_window(window);

        orch.start_cycle(1, "api".to_string(), Duration::from_secs(300))
            .unwrap();
        assert_eq!(orch.workers_in_flight(), 2);
        orch.cancel();

        assert!(
            wait_for_idle_workers(&orch, window + Duration::from_secs(2)),
            "{} fetch workers still running",
            orch.workers_in_flight()
        );
        assert!(rx.try_recv().is_err());
        drop(listener);
    }

    #[test]
    fn superseded_cycles_do_not_accumulate_workers() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let client = UpstreamClient::new(&url, &url).unwrap();
        let (tx, _rx) = unbounded();
        let window = Duration::from_millis(300);
        let mut orch =
            RefreshOrchestrator::new(client, tx, ActivityLoggerHandle::noop()).with_window(window);

        for cycle in 1..=4 {
            orch.start_cycle(cycle, "api".to_string(), Duration::from_secs(300))
                .unwrap();
        }
        assert!(orch.workers_in_flight() <= 8);
        orch.cancel();
        assert!(wait_for_idle_workers(&orch, window + Duration::from_secs(2)));
        drop(listener);
    }

    #[test]
    fn workload_listing_reports_failure_as_a_message() {
        let url = closed_url();
        let client = UpstreamClient::new(&url, &url).unwrap();
        let (tx, rx) = unbounded();
        let orch = RefreshOrchestrator::new(client, tx, ActivityLoggerHandle::noop());
        orch.list_workloads().unwrap();
        match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            DashboardMsg::WorkloadsListed(Err(failure)) => assert_eq!(failure.code, "KTUI-2001"),
            other => panic!("unexpected message {other:?}"),
        }
    }
}
