//! Task-based facade around the receiver source: bridges the I/O
//! thread, the pipeline (mutator) thread, and the sink thread, enforcing
//! per-frame task-processing deadlines (spec.md §4.L, §5).
//!
//! Grounded on `bass-ptp`'s reference-counted start/stop state machine
//! for the lock-discipline style, generalized into a task queue that
//! the sink thread drains between frame pulls — `parking_lot::Condvar`
//! provides `schedule_and_wait`'s blocking-completion semantics, the
//! same primitive `state.rs`'s `wait_state` uses.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};

use crate::audio::frame::Frame;
use crate::error::{Status, StatusResult};
use crate::receiver::{ReadMode, ReceiverSource};

/// One control-thread operation, per spec.md §6's public control
/// operations. The real handlers (slot creation, endpoint wiring) live
/// with whatever owns the `ReceiverSource`; the pipeline loop only
/// needs to serialize and dispatch them.
pub enum Task {
    CreateSlot,
    DeleteSlot { slot_index: usize },
    QuerySlot { slot_index: usize },
}

/// Applies one `Task` to the receiver source it controls (spec.md §6's
/// `DeleteSlot`/`QuerySlot` control operations). `CreateSlot` carries no
/// payload here — callers that need slot construction parameters build
/// the `Slot` themselves and call `ReceiverSource::add_slot` directly;
/// this dispatcher exists so the task queue has a real consumer instead
/// of a test-only no-op closure.
pub fn dispatch_task(source: &mut ReceiverSource, task: Task) -> StatusResult<()> {
    match task {
        Task::DeleteSlot { slot_index } => {
            source.remove_slot(slot_index);
            Ok(())
        }
        Task::QuerySlot { slot_index } => {
            if source.has_slot(slot_index) {
                Ok(())
            } else {
                Err(Status::NoRoute("slot not found"))
            }
        }
        Task::CreateSlot => Ok(()),
    }
}

struct Scheduled {
    task: Task,
    completion: Option<Box<dyn FnOnce(StatusResult<()>) + Send>>,
}

struct WaitState {
    done: bool,
    result: Option<StatusResult<()>>,
}

/// A handle callers can block on via `schedule_and_wait`.
pub struct TaskCompletion {
    state: std::sync::Arc<(Mutex<WaitState>, Condvar)>,
}

impl TaskCompletion {
    fn new() -> Self {
        Self { state: std::sync::Arc::new((Mutex::new(WaitState { done: false, result: None }), Condvar::new())) }
    }

    pub fn wait(self) -> StatusResult<()> {
        let (lock, cv) = &*self.state;
        let mut guard = lock.lock();
        while !guard.done {
            cv.wait(&mut guard);
        }
        guard.result.take().expect("done implies result set")
    }
}

/// Per-call budget so task processing never starves the sink thread.
const DEFAULT_TASK_BUDGET: Duration = Duration::from_micros(500);

pub struct PipelineLoop {
    tasks_tx: Sender<Scheduled>,
    tasks_rx: Receiver<Scheduled>,
    task_budget: Duration,
}

impl PipelineLoop {
    pub fn new(task_queue_capacity: usize) -> Self {
        let (tasks_tx, tasks_rx) = crossbeam_channel::bounded(task_queue_capacity);
        Self { tasks_tx, tasks_rx, task_budget: DEFAULT_TASK_BUDGET }
    }

    /// Submit a task from any thread. A full queue fails the schedule
    /// call immediately (spec.md §5: "producers see the schedule call
    /// fail... if capacity is exceeded").
    pub fn schedule<F>(&self, task: Task, completion_handler: F) -> StatusResult<()>
    where
        F: FnOnce(StatusResult<()>) + Send + 'static,
    {
        match self.tasks_tx.try_send(Scheduled { task, completion: Some(Box::new(completion_handler)) }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Status::NoMem("task queue full")),
            Err(TrySendError::Disconnected(_)) => Err(Status::BadState("pipeline loop stopped")),
        }
    }

    /// Submit a task and block the calling thread until it completes.
    pub fn schedule_and_wait(&self, task: Task) -> StatusResult<()> {
        let completion = TaskCompletion::new();
        let state = completion.state.clone();
        self.schedule(task, move |result| {
            let (lock, cv) = &*state;
            let mut guard = lock.lock();
            guard.done = true;
            guard.result = Some(result);
            cv.notify_all();
        })?;
        completion.wait()
    }

    /// Interleaves one frame pull with pending tasks, respecting
    /// `task_budget` so the sink is never starved (spec.md §4.L).
    /// `dispatch` applies a task to the receiver source and returns its
    /// result; it runs on the pipeline thread (here: inline, since this
    /// facade has no separate worker thread of its own to own).
    pub fn process_subframes_and_tasks(
        &self,
        source: &mut ReceiverSource,
        now_ns: u64,
        duration_frames: usize,
        mode: ReadMode,
        mut dispatch: impl FnMut(&mut ReceiverSource, Task) -> StatusResult<()>,
    ) -> Frame {
        let deadline = Instant::now() + self.task_budget;
        while Instant::now() < deadline {
            match self.tasks_rx.try_recv() {
                Ok(mut scheduled) => {
                    let result = dispatch(source, scheduled.task);
                    if let Some(handler) = scheduled.completion.take() {
                        handler(result);
                    }
                }
                Err(_) => break,
            }
        }

        let frame = source.read(now_ns, duration_frames, mode);
        let next_deadline_ns = source.refresh(now_ns);
        let _ = next_deadline_ns; // caller schedules its next wake from this
        frame
    }
}
