use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use std::{sync::Arc, thread, time::Duration};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

const IDLE_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("worker stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobKind {
    AutoEdit,
    Export,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    /// Clip the job was scheduled against.
    pub target: String,
    pub kind: JobKind,
    /// Simulated latency before the job reports `Done`.
    pub delay: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool { matches!(self, JobStatus::Done | JobStatus::Canceled) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: String,
    pub target: String,
    pub kind: JobKind,
    pub status: JobStatus,
}

#[derive(Clone)]
pub struct JobsHandle {
    tx_submit: Sender<(String, JobSpec)>,
    tx_cancel: Sender<String>,
    pub rx_events: Receiver<JobEvent>,
    /// Submitted jobs that have not reached a terminal status.
    live: Arc<Mutex<HashSet<String>>>,
}

pub struct JobsRuntime {
    rx_submit: Receiver<(String, JobSpec)>,
    rx_cancel: Receiver<String>,
    tx_events: Sender<JobEvent>,
    canceled: Arc<Mutex<HashSet<String>>>,
    live: Arc<Mutex<HashSet<String>>>,
    stop: Arc<AtomicBool>,
}

/// Forgets a job that reached a terminal status. Lock order is `live` then `canceled`.
fn retire(live: &Mutex<HashSet<String>>, canceled: &Mutex<HashSet<String>>, id: &str) {
    let mut live = live.lock();
    live.remove(id);
    canceled.lock().remove(id);
}

fn event(id: &str, spec: &JobSpec, status: JobStatus) -> JobEvent {
    JobEvent { id: id.to_string(), target: spec.target.clone(), kind: spec.kind, status }
}

impl JobsRuntime {
    /// Spawns the feeder and `num_workers` worker threads. They exit once every
    /// [`JobsHandle`] clone has been dropped.
    pub fn start(num_workers: usize) -> JobsHandle {
        let (tx_submit, rx_submit) = unbounded::<(String, JobSpec)>();
        let (tx_cancel, rx_cancel) = unbounded::<String>();
        let (tx_events, rx_events) = unbounded::<JobEvent>();
        let queue = Arc::new(Mutex::new(VecDeque::new()));

        let runtime = JobsRuntime {
            rx_submit,
            rx_cancel,
            tx_events,
            canceled: Arc::new(Mutex::new(HashSet::new())),
            live: Arc::new(Mutex::new(HashSet::new())),
            stop: Arc::new(AtomicBool::new(false)),
        };
        runtime.spawn_workers(num_workers.max(1), queue.clone());

        // Feeder thread
        {
            let q = queue;
            let canceled = runtime.canceled.clone();
            let live = runtime.live.clone();
            let stop = runtime.stop.clone();
            let rx_s = runtime.rx_submit.clone();
            let rx_c = runtime.rx_cancel.clone();
            let tx_e = runtime.tx_events.clone();
            thread::spawn(move || {
                loop {
                    crossbeam_channel::select! {
                        recv(rx_s) -> msg => {
                            if let Ok((id, spec)) = msg {
                                if canceled.lock().contains(&id) {
                                    retire(&live, &canceled, &id);
                                    let _ = tx_e.send(event(&id, &spec, JobStatus::Canceled));
                                    continue;
                                }
                                let _ = tx_e.send(event(&id, &spec, JobStatus::Pending));
                                q.lock().push_back((id, spec));
                            }
                            else { break; }
                        }
                        recv(rx_c) -> msg => {
                            let Ok(id) = msg else { break; };
                            let live = live.lock();
                            if live.contains(&id) {
                                canceled.lock().insert(id);
                            } else {
                                debug!(job = %id, "cancel for a finished or unknown job ignored");
                            }
                        }
                        default(IDLE_POLL) => {}
                    }
                }
                debug!("job feeder stopped");
                stop.store(true, Ordering::SeqCst);
            });
        }

        JobsHandle { tx_submit, tx_cancel, rx_events, live: runtime.live.clone() }
    }

    fn spawn_workers(&self, n: usize, queue: Arc<Mutex<VecDeque<(String, JobSpec)>>>) {
        for _ in 0..n {
            let q = queue.clone();
            let tx_e = self.tx_events.clone();
            let canceled = self.canceled.clone();
            let live = self.live.clone();
            let stop = self.stop.clone();
            thread::spawn(move || loop {
                let job_opt = q.lock().pop_front();
                let Some((id, spec)) = job_opt else {
                    if stop.load(Ordering::SeqCst) { break; }
                    thread::sleep(IDLE_POLL);
                    continue;
                };
                if canceled.lock().contains(&id) {
                    retire(&live, &canceled, &id);
                    let _ = tx_e.send(event(&id, &spec, JobStatus::Canceled));
                    continue;
                }
                let _ = tx_e.send(event(&id, &spec, JobStatus::Running));
                let deadline = Instant::now() + spec.delay;
                let mut was_canceled = false;
                loop {
                    if canceled.lock().contains(&id) { was_canceled = true; break; }
                    let now = Instant::now();
                    if now >= deadline { break; }
                    thread::sleep((deadline - now).min(IDLE_POLL));
                }
                let status = if was_canceled { JobStatus::Canceled } else { JobStatus::Done };
                retire(&live, &canceled, &id);
                info!(job = %id, kind = ?spec.kind, ?status, "job finished");
                let _ = tx_e.send(event(&id, &spec, status));
            });
        }
    }
}

impl JobsHandle {
    pub fn enqueue(&self, spec: JobSpec) -> Result<String, JobError> {
        let id = Uuid::new_v4().to_string();
        self.live.lock().insert(id.clone());
        if self.tx_submit.send((id.clone(), spec)).is_err() {
            self.live.lock().remove(&id);
            return Err(JobError::Stopped);
        }
        Ok(id)
    }

    /// Jobs submitted and not yet done or canceled.
    pub fn in_flight(&self) -> usize { self.live.lock().len() }

    /// Cancels a pending or running job. Ids that already finished are ignored.
    pub fn cancel_job(&self, job_id: &str) {
        let _ = self.tx_cancel.send(job_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_terminal(h: &JobsHandle, id: &str) -> JobStatus {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(ev) = h.rx_events.recv_timeout(Duration::from_millis(50)) {
                if ev.id == id && ev.status.is_terminal() { return ev.status; }
            }
        }
        panic!("job {id} never finished");
    }

    fn spec(kind: JobKind, ms: u64) -> JobSpec {
        JobSpec { target: "clip".into(), kind, delay: Duration::from_millis(ms) }
    }

    #[test]
    fn job_completes_after_delay() {
        let h = JobsRuntime::start(1);
        let started = Instant::now();
        let id = h.enqueue(spec(JobKind::Export, 30)).unwrap();
        assert_eq!(wait_terminal(&h, &id), JobStatus::Done);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn canceled_job_never_reports_done() {
        let h = JobsRuntime::start(1);
        let id = h.enqueue(spec(JobKind::AutoEdit, 2_000)).unwrap();
        thread::sleep(Duration::from_millis(50));
        h.cancel_job(&id);
        assert_eq!(wait_terminal(&h, &id), JobStatus::Canceled);
    }

    #[test]
    fn cancels_for_finished_or_unknown_jobs_are_dropped() {
        let h = JobsRuntime::start(1);
        let id = h.enqueue(spec(JobKind::Export, 0)).unwrap();
        assert_eq!(wait_terminal(&h, &id), JobStatus::Done);
        h.cancel_job(&id);
        h.cancel_job("no-such-job");
        thread::sleep(Duration::from_millis(100));
        assert_eq!(h.in_flight(), 0);
        // the next job must not be affected by the stale cancel
        let next = h.enqueue(spec(JobKind::Export, 0)).unwrap();
        assert_eq!(wait_terminal(&h, &next), JobStatus::Done);
        assert_eq!(h.in_flight(), 0);
    }

    #[test]
    fn cancel_right_after_enqueue_wins() {
        let h = JobsRuntime::start(1);
        let id = h.enqueue(spec(JobKind::AutoEdit, 1_000)).unwrap();
        h.cancel_job(&id);
        assert_eq!(wait_terminal(&h, &id), JobStatus::Canceled);
        assert_eq!(h.in_flight(), 0);
    }

    #[test]
    fn events_carry_kind_and_target() {
        let h = JobsRuntime::start(2);
        let id = h.enqueue(spec(JobKind::AutoEdit, 0)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        while Instant::now() < deadline && !seen.iter().any(|s: &JobStatus| s.is_terminal()) {
            if let Ok(ev) = h.rx_events.recv_timeout(Duration::from_millis(50)) {
                assert_eq!(ev.id, id);
                assert_eq!(ev.kind, JobKind::AutoEdit);
                assert_eq!(ev.target, "clip");
                seen.push(ev.status);
            }
        }
        assert_eq!(seen.first(), Some(&JobStatus::Pending));
        assert_eq!(seen.last(), Some(&JobStatus::Done));
    }
}
