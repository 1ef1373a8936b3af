//! Concurrency and lifecycle scenarios for the dispatcher, resolver, and
//! fleet aggregator working together.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

use tenantctl_common::error::{ControlError, Result};
use tenantctl_common::types::{Action, ContainerStatus, FleetStats, RuntimeState, Tenant};
use tenantctl_runtime::backend::memory::{MemoryRuntime, RuntimeOp};
use tenantctl_runtime::backend::{ContainerObservation, ContainerRuntime, CreateSpec, Snapshot};
use tenantctl_runtime::dispatcher::Dispatcher;
use tenantctl_runtime::fleet;
use tenantctl_runtime::resolver::{Resolver, RuntimeView};

const IMAGE: &str = "nginx:alpine";

/// Runtime that parks one kind of mutating call until the test releases it.
struct GatedRuntime {
    inner: MemoryRuntime,
    gated: RuntimeOp,
    entered: Mutex<Sender<String>>,
    release: Mutex<Receiver<()>>,
}

impl GatedRuntime {
    fn new(inner: MemoryRuntime, gated: RuntimeOp) -> (Arc<Self>, Receiver<String>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let runtime = Arc::new(Self {
            inner,
            gated,
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        (runtime, entered_rx, release_tx)
    }

    fn park(&self, op: RuntimeOp, name: &str) {
        if op != self.gated {
            return;
        }
        self.entered.lock().unwrap().send(name.to_string()).unwrap();
        self.release
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(10))
            .expect("test never released the gated call");
    }
}

impl ContainerRuntime for GatedRuntime {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn inspect(&self, name: &str) -> Result<ContainerObservation> {
        self.inner.inspect(name)
    }

    fn snapshot(&self) -> Result<Snapshot> {
        self.inner.snapshot()
    }

    fn create(&self, name: &str, spec: &CreateSpec) -> Result<()> {
        self.park(RuntimeOp::Create, name);
        self.inner.create(name, spec)
    }

    fn start(&self, name: &str) -> Result<()> {
        self.park(RuntimeOp::Start, name);
        self.inner.start(name)
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.park(RuntimeOp::Stop, name);
        self.inner.stop(name)
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.park(RuntimeOp::Remove, name);
        self.inner.remove(name)
    }
}

/// Runtime whose every mutating call panics.
struct CrashingRuntime(MemoryRuntime);

impl ContainerRuntime for CrashingRuntime {
    fn name(&self) -> &'static str {
        "crashing"
    }

    fn inspect(&self, name: &str) -> Result<ContainerObservation> {
        self.0.inspect(name)
    }

    fn snapshot(&self) -> Result<Snapshot> {
        self.0.snapshot()
    }

    fn create(&self, _name: &str, _spec: &CreateSpec) -> Result<()> {
        panic!("engine client crashed during create");
    }

    fn start(&self, _name: &str) -> Result<()> {
        panic!("engine client crashed during start");
    }

    fn stop(&self, _name: &str) -> Result<()> {
        panic!("engine client crashed during stop");
    }

    fn remove(&self, _name: &str) -> Result<()> {
        panic!("engine client crashed during remove");
    }
}

fn tenant(id: u64, subdomain: &str) -> Tenant {
    Tenant {
        id,
        name: format!("Owner {id}"),
        company_name: format!("{subdomain} Inc"),
        subdomain: subdomain.into(),
        email: format!("owner@{subdomain}.io"),
        username: None,
        created_at: None,
    }
}

// ── Concurrency ──────────────────────────────────────────────────────

#[test]
fn concurrent_stops_reach_the_adapter_once() {
    let inner = MemoryRuntime::new()
        .with_container("acme", IMAGE, RuntimeState::Running)
        .with_container("globex", IMAGE, RuntimeState::Exited);
    let (runtime, entered, release) = GatedRuntime::new(inner, RuntimeOp::Stop);
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
        IMAGE,
    ));

    let first = {
        let dispatcher = Arc::clone(&dispatcher);
        std::thread::spawn(move || dispatcher.dispatch("acme", Action::Stop))
    };
    assert_eq!(entered.recv_timeout(Duration::from_secs(10)).unwrap(), "acme");

    let second = dispatcher.dispatch("acme", Action::Stop).unwrap_err();
    assert!(matches!(second, ControlError::ActionInProgress { .. }));

    // A slow call on one container never blocks another.
    let other = dispatcher.dispatch("globex", Action::Start).unwrap();
    assert_eq!(other.target, ContainerStatus::Running);

    release.send(()).unwrap();
    let outcome = first.join().unwrap().unwrap();
    assert_eq!(outcome.target, ContainerStatus::Exited);

    assert_eq!(runtime.inner.calls(RuntimeOp::Stop), 1);
    assert_eq!(runtime.inner.state_of("acme"), RuntimeState::Exited);
    assert!(dispatcher.lock().is_empty());
}

#[test]
fn racing_removes_admit_exactly_one() {
    const THREADS: usize = 6;
    let inner = MemoryRuntime::new().with_container("acme", IMAGE, RuntimeState::Exited);
    let (runtime, entered, release) = GatedRuntime::new(inner, RuntimeOp::Remove);
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
        IMAGE,
    ));
    let barrier = Arc::new(Barrier::new(THREADS));
    let (done_tx, done_rx) = mpsc::channel();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            let done_tx = done_tx.clone();
            std::thread::spawn(move || {
                let _ = barrier.wait();
                let result = dispatcher.dispatch("acme", Action::Remove);
                let rejected = matches!(result, Err(ControlError::ActionInProgress { .. }));
                done_tx.send(rejected).unwrap();
                result
            })
        })
        .collect();

    let _ = entered.recv_timeout(Duration::from_secs(10)).unwrap();
    let rejected = (0..THREADS - 1)
        .map(|_| done_rx.recv_timeout(Duration::from_secs(10)).unwrap())
        .filter(|r| *r)
        .count();
    assert_eq!(rejected, THREADS - 1);

    release.send(()).unwrap();
    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(Result::is_ok)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(runtime.inner.calls(RuntimeOp::Remove), 1);
    assert!(dispatcher.lock().is_empty());
}

#[test]
fn crashed_adapter_call_does_not_leave_container_locked() {
    let runtime = Arc::new(CrashingRuntime(
        MemoryRuntime::new().with_container("acme", IMAGE, RuntimeState::Running),
    ));
    let dispatcher = Dispatcher::new(runtime as Arc<dyn ContainerRuntime>, IMAGE);

    let crashed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        dispatcher.dispatch("acme", Action::Stop)
    }));
    assert!(crashed.is_err());
    assert!(dispatcher.lock().in_flight("acme").is_none());
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn create_then_resolve_reports_created() {
    let runtime = Arc::new(MemoryRuntime::new());
    let dispatcher = Dispatcher::new(Arc::clone(&runtime) as Arc<dyn ContainerRuntime>, IMAGE);
    let resolver = Resolver::new(IMAGE);
    let acme = tenant(1, "acme");

    let before = resolver.resolve(&acme, &RuntimeView::observe(runtime.as_ref()));
    assert_eq!(before.status, ContainerStatus::NotCreated);

    let _ = dispatcher.dispatch("acme", Action::Create).unwrap();
    assert_eq!(runtime.calls(RuntimeOp::Create), 1);

    let after = resolver.resolve(&acme, &RuntimeView::observe(runtime.as_ref()));
    assert_eq!(after.status, ContainerStatus::Created);
    assert_eq!(after.actions, vec![Action::Start, Action::Remove]);
}

#[test]
fn unreachable_engine_scenario() {
    let runtime = Arc::new(MemoryRuntime::new().with_container("acme", IMAGE, RuntimeState::Running));
    runtime.set_reachable(false);
    let dispatcher = Dispatcher::new(Arc::clone(&runtime) as Arc<dyn ContainerRuntime>, IMAGE);

    let record = Resolver::new(IMAGE).resolve(&tenant(1, "acme"), &RuntimeView::observe(runtime.as_ref()));
    assert_eq!(record.status, ContainerStatus::DockerUnavailable);
    assert!(!record.docker_available);

    let err = dispatcher.dispatch("acme", Action::Stop).unwrap_err();
    assert!(matches!(err, ControlError::RuntimeUnavailable { .. }));
    assert_eq!(runtime.mutating_calls(), 0);
}

#[test]
fn fleet_stats_from_one_snapshot() {
    let runtime = MemoryRuntime::new()
        .with_container("t1", IMAGE, RuntimeState::Running)
        .with_container("t2", IMAGE, RuntimeState::Running)
        .with_container("t3", IMAGE, RuntimeState::Exited)
        .with_container("t5", IMAGE, RuntimeState::Created);
    let tenants: Vec<_> = (1..=5).map(|i| tenant(i, &format!("t{i}"))).collect();

    let view = RuntimeView::observe(&runtime);
    let records = Resolver::new(IMAGE).resolve_all(&tenants, &view);
    let stats = fleet::aggregate(tenants.len(), &records);

    assert_eq!(
        stats,
        FleetStats {
            total_users: 5,
            total_containers: 5,
            running_containers: 2,
            stopped_containers: 2,
        }
    );
    assert_eq!(runtime.calls(RuntimeOp::Snapshot), 1);
}
