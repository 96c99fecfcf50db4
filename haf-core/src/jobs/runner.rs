use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, info_span, warn};

use super::event::{EventKind, JobEvent, JobId, JobKind, JobState};
use crate::error::{HafError, Result};
use crate::pack::writer::{PackOptions, create};
use crate::progress::{Progress, Step};
use crate::read::extract::extract_all;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug, Default)]
pub struct RunnerOptions {
    pub pack: PackOptions,
}

struct JobEntry {
    kind: JobKind,
    state: JobState,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

type JobTable = Arc<Mutex<HashMap<JobId, JobEntry>>>;

/// Fan-out of job events: every subscriber owns a channel and receives
/// every event published after it subscribed.
#[derive(Default)]
struct EventBus {
    subs: Mutex<Vec<Sender<JobEvent>>>,
}

impl EventBus {
    fn subscribe(&self) -> Receiver<JobEvent> {
        let (tx, rx) = flume::unbounded();
        self.subs.lock().push(tx);
        rx
    }

    // Held across all sends so every subscriber sees one global order.
    fn publish(&self, ev: JobEvent) {
        self.subs.lock().retain(|tx| tx.send(ev.clone()).is_ok());
    }
}

/// Runs archive and unarchive jobs, one OS thread each, and broadcasts their
/// progress to every subscriber of [`JobRunner::events`].
pub struct JobRunner {
    jobs: JobTable,
    bus: Arc<EventBus>,
    opts: RunnerOptions,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRunner {
    pub fn new() -> Self {
        Self::with_options(RunnerOptions::default())
    }

    pub fn with_options(opts: RunnerOptions) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            bus: Arc::new(EventBus::default()),
            opts,
        }
    }

    /// A new subscription to the events of every job of this runner. Each
    /// subscriber receives all events published after this call; subscribe
    /// before submitting to see a job from its first event. Per job, events
    /// arrive in the order they were produced and end with one terminal event.
    /// Dropping the receiver ends the subscription.
    pub fn events(&self) -> Receiver<JobEvent> {
        self.bus.subscribe()
    }

    pub fn submit_archive(
        &self,
        sources: Vec<PathBuf>,
        dest_dir: PathBuf,
        archive_name: String,
    ) -> JobId {
        let opts = self.opts.pack.clone();
        self.submit(JobKind::Archive, move |rep| {
            create(&sources, &dest_dir, &archive_name, Some(&opts), rep).map(|_| ())
        })
    }

    pub fn submit_unarchive(&self, archive: PathBuf, dest_dir: PathBuf) -> JobId {
        self.submit(JobKind::Unarchive, move |rep| {
            extract_all(&archive, &dest_dir, rep).map(|_| ())
        })
    }

    /// Ask a job to stop at its next file boundary. Returns `false` when the
    /// job is unknown or already terminal.
    pub fn cancel(&self, id: JobId) -> bool {
        let jobs = self.jobs.lock();
        match jobs.get(&id) {
            Some(job) if !job.state.is_terminal() => {
                job.cancel.store(true, Ordering::Release);
                debug!(job = id, "cancel requested");
                true
            }
            _ => false,
        }
    }

    pub fn state(&self, id: JobId) -> Option<JobState> {
        self.jobs.lock().get(&id).map(|j| j.state)
    }

    pub fn kind(&self, id: JobId) -> Option<JobKind> {
        self.jobs.lock().get(&id).map(|j| j.kind)
    }

    /// Ids of jobs that have not reached a terminal state.
    pub fn running(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self
            .jobs
            .lock()
            .iter()
            .filter(|(_, j)| !j.state.is_terminal())
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Block until the job's thread has exited and return its final state.
    pub fn wait(&self, id: JobId) -> Option<JobState> {
        let handle = self.jobs.lock().get_mut(&id)?.handle.take();
        if let Some(h) = handle {
            if h.join().is_err() {
                warn!(job = id, "job thread panicked outside the job body");
            }
        }
        self.state(id)
    }

    /// Drop the bookkeeping of a terminal job. Returns `false` when the job
    /// is unknown or still running; afterwards its id is unknown.
    pub fn forget(&self, id: JobId) -> bool {
        let mut jobs = self.jobs.lock();
        match jobs.get(&id) {
            Some(job) if job.state.is_terminal() => {
                jobs.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Forget every terminal job and return their ids in ascending order.
    pub fn reap(&self) -> Vec<JobId> {
        let mut ids = Vec::new();
        self.jobs.lock().retain(|&id, job| {
            let done = job.state.is_terminal();
            if done {
                ids.push(id);
            }
            !done
        });
        ids.sort_unstable();
        debug!(jobs = ids.len(), "reaped terminal jobs");
        ids
    }

    fn submit<F>(&self, kind: JobKind, work: F) -> JobId
    where
        F: FnOnce(&mut JobReporter) -> Result<()> + Send + 'static,
    {
        let id = NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed);
        let cancel = Arc::new(AtomicBool::new(false));
        self.jobs.lock().insert(
            id,
            JobEntry {
                kind,
                state: JobState::Pending,
                cancel: cancel.clone(),
                handle: None,
            },
        );

        let jobs = self.jobs.clone();
        let bus = self.bus.clone();
        let spawned = thread::Builder::new()
            .name(format!("haf-job-{id}"))
            .spawn(move || run_job(id, kind, work, jobs, bus, cancel));

        match spawned {
            Ok(h) => {
                if let Some(job) = self.jobs.lock().get_mut(&id) {
                    job.handle = Some(h);
                }
            }
            Err(e) => {
                warn!(job = id, error = %e, "could not start job thread");
                finish(
                    &self.jobs,
                    &self.bus,
                    id,
                    kind,
                    JobState::Failed,
                    EventKind::Error(format!("could not start job: {e}")),
                );
            }
        }
        id
    }
}

fn run_job<F>(
    id: JobId,
    kind: JobKind,
    work: F,
    jobs: JobTable,
    bus: Arc<EventBus>,
    cancel: Arc<AtomicBool>,
) where
    F: FnOnce(&mut JobReporter) -> Result<()>,
{
    let span = info_span!("job", id, kind = kind.verb());
    let _enter = span.enter();

    if let Some(job) = jobs.lock().get_mut(&id) {
        job.state = JobState::Running;
    }
    info!("job started");

    let mut reporter = JobReporter {
        job: id,
        kind,
        bus: bus.clone(),
        cancel,
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| work(&mut reporter)));

    let (state, event) = match outcome {
        Ok(Ok(())) => (JobState::Succeeded, EventKind::Finished),
        Ok(Err(HafError::Cancelled)) => (JobState::Cancelled, EventKind::Cancelled),
        Ok(Err(e)) => (JobState::Failed, EventKind::Error(e.to_string())),
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            (
                JobState::Failed,
                EventKind::Error(format!("{} failed unexpectedly: {msg}", kind.verb())),
            )
        }
    };
    match &event {
        EventKind::Error(msg) => warn!(error = %msg, "job failed"),
        _ => info!(state = ?state, "job ended"),
    }
    finish(&jobs, &bus, id, kind, state, event);
}

// State first, then the event: a subscriber that sees the terminal event
// always reads a terminal state.
fn finish(
    jobs: &Mutex<HashMap<JobId, JobEntry>>,
    bus: &EventBus,
    id: JobId,
    kind: JobKind,
    state: JobState,
    event: EventKind,
) {
    if let Some(job) = jobs.lock().get_mut(&id) {
        job.state = state;
    }
    bus.publish(JobEvent {
        job: id,
        job_kind: kind,
        kind: event,
    });
}

/// [`Progress`] sink of one job: turns writer and extractor steps into
/// events and exposes the job's cancellation flag.
pub struct JobReporter {
    job: JobId,
    kind: JobKind,
    bus: Arc<EventBus>,
    cancel: Arc<AtomicBool>,
}

impl JobReporter {
    fn send(&self, kind: EventKind) {
        self.bus.publish(JobEvent {
            job: self.job,
            job_kind: self.kind,
            kind,
        });
    }
}

impl Progress for JobReporter {
    fn step(&mut self, step: Step<'_>) {
        let (doing, done) = match self.kind {
            JobKind::Archive => ("compressing", "compressed"),
            JobKind::Unarchive => ("extracting", "extracted"),
        };
        match step {
            Step::FileStarted { index, total, name } => {
                self.send(EventKind::Progress(format!(
                    "{doing} {name} ({}/{total})",
                    index + 1
                )));
            }
            Step::FileFinished {
                index,
                total,
                name,
                original_size,
                compressed_size,
            } => {
                self.send(EventKind::ProgressReplace(format!(
                    "{done} {name} ({}/{total}, {original_size} -> {compressed_size} bytes)",
                    index + 1
                )));
            }
            Step::Finalizing { path } => {
                self.send(EventKind::Progress(format!("writing {}", path.display())));
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}
