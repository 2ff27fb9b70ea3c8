//! Memory watchdog shared by every lane of a batch.
//!
//! Resident memory is sampled on a fixed interval, so a spike shorter than the
//! interval can go unnoticed. A shorter interval catches more of them at the
//! cost of more `/proc` reads per tracked process.
//!
//! Runners release a pid as soon as they have reaped it. A pid reused between
//! the reap and the release can still be sampled once.

use std::{collections::HashMap, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::MissedTickBehavior,
};

/// What the watchdog saw of one process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryReport {
    /// Peak resident memory in bytes.
    pub peak: u64,
    /// The watchdog killed the process for exceeding the ceiling.
    pub killed: bool,
}

pub trait MemoryProbe: Send + 'static {
    /// Resident set size in bytes, `None` once the process is gone or a zombie.
    fn resident_bytes(&self, pid: u32) -> Option<u64>;
    fn kill(&self, pid: u32);
}

/// Reads `VmRSS` from `/proc/<pid>/status` (Linux).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsProbe;

impl MemoryProbe for ProcfsProbe {
    fn resident_bytes(&self, pid: u32) -> Option<u64> {
        let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
        let (_, kb) = lazy_regex::regex_captures!(r"(?m)^VmRSS:\s*(\d+)\s*kB", &status)?;
        kb.parse::<u64>().ok().map(|kb| kb * 1024)
    }

    fn kill(&self, pid: u32) {
        use nix::{
            sys::signal::{kill, Signal},
            unistd::Pid,
        };
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            log::debug!("Failed to kill pid {}: {}", pid, e);
        }
    }
}

struct Registration {
    pid: u32,
    report: oneshot::Sender<MemoryReport>,
}

enum Request {
    Track(Registration),
    /// The process was reaped by its owner.
    Release(u32),
}

struct Tracked {
    peak: u64,
    killed: bool,
    report: oneshot::Sender<MemoryReport>,
}

impl Tracked {
    fn finish(self) {
        // The runner may have given up on the report already.
        let _ = self.report.send(MemoryReport {
            peak: self.peak,
            killed: self.killed,
        });
    }
}

struct Monitor<P> {
    probe: P,
    ceiling: u64,
    tracked: HashMap<u32, Tracked>,
}

impl<P: MemoryProbe> Monitor<P> {
    fn new(probe: P, ceiling: u64) -> Self {
        Self {
            probe,
            ceiling,
            tracked: HashMap::new(),
        }
    }

    fn register(&mut self, reg: Registration) {
        // A reused pid means the previous owner is long gone.
        if let Some(old) = self.tracked.remove(&reg.pid) {
            old.finish();
        }
        self.tracked.insert(
            reg.pid,
            Tracked {
                peak: 0,
                killed: false,
                report: reg.report,
            },
        );
        self.sample(reg.pid);
    }

    fn handle(&mut self, req: Request) {
        match req {
            Request::Track(reg) => self.register(reg),
            Request::Release(pid) => {
                if let Some(t) = self.tracked.remove(&pid) {
                    t.finish();
                }
            }
        }
    }

    fn poll(&mut self) {
        let pids: Vec<u32> = self.tracked.keys().copied().collect();
        for pid in pids {
            self.sample(pid);
        }
    }

    fn sample(&mut self, pid: u32) {
        let Some(t) = self.tracked.get_mut(&pid) else {
            return;
        };
        match self.probe.resident_bytes(pid) {
            Some(rss) => {
                t.peak = t.peak.max(rss);
                if t.peak > self.ceiling && !t.killed {
                    log::debug!(
                        "pid {} uses {} bytes (ceiling {}), killing it",
                        pid,
                        t.peak,
                        self.ceiling
                    );
                    self.probe.kill(pid);
                    t.killed = true;
                }
            }
            None => {
                if let Some(t) = self.tracked.remove(&pid) {
                    t.finish();
                }
            }
        }
    }

    fn finish_all(&mut self) {
        for (_, t) in self.tracked.drain() {
            t.finish();
        }
    }
}

/// Cheap handle lanes use to put their processes under watch.
#[derive(Debug, Clone)]
pub struct WatchdogHandle {
    tx: mpsc::UnboundedSender<Request>,
}

impl WatchdogHandle {
    /// The returned channel yields exactly one report, after the process is gone.
    pub fn track(&self, pid: u32) -> oneshot::Receiver<MemoryReport> {
        let (report, rx) = oneshot::channel();
        if self.tx.send(Request::Track(Registration { pid, report })).is_err() {
            log::warn!("Memory watchdog is not running; pid {} goes unmonitored", pid);
        }
        rx
    }

    /// Stops watching `pid` and sends its report. Call once the process has been reaped.
    pub fn release(&self, pid: u32) {
        let _ = self.tx.send(Request::Release(pid));
    }
}

pub struct Watchdog {
    handle: WatchdogHandle,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Watchdog {
    pub fn spawn(ceiling: u64, interval: Duration) -> Self {
        Self::spawn_with_probe(ProcfsProbe, ceiling, interval)
    }

    pub fn spawn_with_probe<P: MemoryProbe>(probe: P, ceiling: u64, interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop, stop_rx) = oneshot::channel();
        let monitor = Monitor::new(probe, ceiling);
        let interval = interval.max(Duration::from_millis(1));
        let task = tokio::spawn(watch(monitor, rx, stop_rx, interval));
        Self {
            handle: WatchdogHandle { tx },
            stop,
            task,
        }
    }

    pub fn handle(&self) -> WatchdogHandle {
        self.handle.clone()
    }

    /// Signals that no more processes are in flight and waits for the monitor to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            log::error!("Memory watchdog terminated abnormally: {}", e);
        }
    }
}

async fn watch<P: MemoryProbe>(
    mut monitor: Monitor<P>,
    mut rx: mpsc::UnboundedReceiver<Request>,
    mut stop: oneshot::Receiver<()>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            // Also fires when the owning `Watchdog` is dropped without `shutdown`.
            _ = &mut stop => break,
            Some(req) = rx.recv() => monitor.handle(req),
            _ = ticker.tick() => monitor.poll(),
        }
    }

    while let Ok(req) = rx.try_recv() {
        monitor.handle(req);
    }
    monitor.finish_all();
}
