//! Offloading blocking work from the audio thread.
//!
//! A [`WorkerHost`] owns one worker thread shared by every processor on the
//! host. Each processor registers a [`WorkHandler`] per kind of work and gets
//! back a [`WorkerSlot`]: the audio-thread end of a strict request/response
//! pair.
//!
//! A slot has at most one request in flight. Submitting while busy hands the
//! payload back; [`WorkerSlot::submit_latest`] instead parks it as the
//! coalesced request, replacing whatever was parked before, to be dispatched
//! once the in-flight one has been consumed with [`WorkerSlot::poll`].
//!
//! Nothing on the slot side blocks or allocates: requests and completions
//! travel over bounded channels sized for exactly one message, and the worker
//! is woken through a bounded doorbell. If the doorbell is full the worker
//! still finds the request on its next idle sweep.

use crate::compat::{Arc, AtomicBool, AtomicUsize, Mutex, Ordering};
use crate::error::{Error, Result, SubmitError};
use crate::rtlog::LogDrain;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;
use std::time::Duration;

/// How long the worker sleeps between sweeps when no doorbell rings.
pub const IDLE_SWEEP: Duration = Duration::from_millis(50);

const COMMAND_CAPACITY: usize = 16;
const DOORBELL_CAPACITY: usize = 256;

/// Blocking work executed on the worker thread.
pub trait WorkHandler: Send + 'static {
    type Request: Send + 'static;
    type Response: Send + 'static;

    /// May block arbitrarily: file I/O, FFTs, deallocation.
    fn work(&mut self, request: Self::Request) -> Self::Response;
}

/// Outcome of one request, delivered back to the audio thread.
#[derive(Debug, PartialEq)]
pub enum Completion<T> {
    Done(T),
    /// The handler panicked. Nothing was produced.
    Failed,
}

impl<T> Completion<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Completion::Done(value) => Some(value),
            Completion::Failed => None,
        }
    }
}

/// Handler that just drops what it is given.
///
/// Retiring a heavyweight object is submitted to one of these so its
/// destructor runs off the audio thread.
pub struct Disposer<T>(PhantomData<fn(T)>);

impl<T> Disposer<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Disposer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> WorkHandler for Disposer<T> {
    type Request = T;
    type Response = ();

    fn work(&mut self, request: T) {
        drop(request);
    }
}

/// Audio-thread end of one request/response pair.
pub struct WorkerSlot<Req, Resp> {
    id: usize,
    requests: Sender<Req>,
    completions: Receiver<Completion<Resp>>,
    doorbell: Option<Sender<usize>>,
    in_flight: bool,
    coalesced: Option<Req>,
}

impl<Req, Resp> WorkerSlot<Req, Resp> {
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// True when no request is outstanding.
    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.in_flight
    }

    #[inline]
    pub fn has_coalesced(&self) -> bool {
        self.coalesced.is_some()
    }

    /// Hand `request` to the worker. Fails, returning it, if one is already in flight.
    pub fn try_submit(&mut self, request: Req) -> core::result::Result<(), SubmitError<Req>> {
        if self.in_flight {
            return Err(SubmitError::Busy(request));
        }
        match self.requests.try_send(request) {
            Ok(()) => {
                self.in_flight = true;
                if let Some(doorbell) = &self.doorbell {
                    let _ = doorbell.try_send(self.id);
                }
                Ok(())
            }
            Err(TrySendError::Full(request)) => Err(SubmitError::Busy(request)),
            Err(TrySendError::Disconnected(request)) => Err(SubmitError::Disconnected(request)),
        }
    }

    /// Submit now if idle, otherwise park `request` as the coalesced request.
    ///
    /// Returns whichever payload was displaced (an older parked request), so
    /// the caller decides where it gets dropped.
    pub fn submit_latest(&mut self, request: Req) -> core::result::Result<Option<Req>, SubmitError<Req>> {
        if self.in_flight {
            return Ok(self.coalesced.replace(request));
        }
        let displaced = self.coalesced.take();
        match self.try_submit(request) {
            Ok(()) => Ok(displaced),
            Err(e) => {
                self.coalesced = displaced;
                Err(e)
            }
        }
    }

    /// Park `request` as the coalesced request without trying to send it.
    ///
    /// Returns the request it displaced.
    pub fn park(&mut self, request: Req) -> Option<Req> {
        self.coalesced.replace(request)
    }

    /// Send the parked request, if there is one and nothing is in flight.
    pub fn dispatch_coalesced(&mut self) -> core::result::Result<bool, SubmitError<Req>> {
        if self.in_flight {
            return Ok(false);
        }
        match self.coalesced.take() {
            Some(request) => self.try_submit(request).map(|()| true),
            None => Ok(false),
        }
    }

    /// The parked request, if any.
    #[inline]
    pub fn coalesced(&self) -> Option<&Req> {
        self.coalesced.as_ref()
    }

    /// Remove the parked request without sending it.
    pub fn take_coalesced(&mut self) -> Option<Req> {
        self.coalesced.take()
    }

    /// Collect the completion of the in-flight request, if it has arrived.
    ///
    /// The slot becomes idle again. Parked requests are left parked.
    pub fn poll(&mut self) -> Option<Completion<Resp>> {
        if !self.in_flight {
            return None;
        }
        match self.completions.try_recv() {
            Ok(completion) => {
                self.in_flight = false;
                Some(completion)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.in_flight = false;
                Some(Completion::Failed)
            }
        }
    }
}

/// Type-erased worker side of a slot.
trait Job: Send {
    fn id(&self) -> usize;
    /// Run anything queued. Returns false once the slot has been dropped.
    fn run_pending(&mut self) -> bool;
}

struct SlotJob<H: WorkHandler> {
    id: usize,
    handler: H,
    requests: Receiver<H::Request>,
    completions: Sender<Completion<H::Response>>,
}

impl<H: WorkHandler> Job for SlotJob<H> {
    fn id(&self) -> usize {
        self.id
    }

    fn run_pending(&mut self) -> bool {
        loop {
            match self.requests.try_recv() {
                Ok(request) => {
                    let handler = &mut self.handler;
                    let completion =
                        match panic::catch_unwind(AssertUnwindSafe(|| handler.work(request))) {
                            Ok(response) => Completion::Done(response),
                            Err(_) => {
                                tracing::error!(slot = self.id, "work handler panicked");
                                Completion::Failed
                            }
                        };
                    if self.completions.send(completion).is_err() {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }
}

enum Command {
    Register {
        job: Box<dyn Job>,
        ack: Sender<()>,
    },
    AttachLog(LogDrain),
    Shutdown,
}

enum Mode {
    Threaded {
        commands: Sender<Command>,
        doorbell: Sender<usize>,
        thread: Option<JoinHandle<()>>,
    },
    Manual {
        jobs: Mutex<Vec<Box<dyn Job>>>,
        drains: Mutex<Vec<LogDrain>>,
    },
}

/// Runs registered handlers off the audio thread.
pub struct WorkerHost {
    mode: Mode,
    next_id: AtomicUsize,
    running: Arc<AtomicBool>,
}

impl WorkerHost {
    /// Start a dedicated worker thread.
    pub fn spawn(name: &str) -> Result<Self> {
        let (commands, command_rx) = crossbeam_channel::bounded::<Command>(COMMAND_CAPACITY);
        let (doorbell, doorbell_rx) = crossbeam_channel::bounded::<usize>(DOORBELL_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let thread = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                worker_loop(command_rx, doorbell_rx);
                running_clone.store(false, Ordering::Release);
            })
            .map_err(|e| Error::WorkerSpawn(e.to_string()))?;

        tracing::info!(thread = name, "worker host started");
        Ok(Self {
            mode: Mode::Threaded {
                commands,
                doorbell,
                thread: Some(thread),
            },
            next_id: AtomicUsize::new(0),
            running,
        })
    }

    /// A host without a thread. Work runs when [`run_pending`](Self::run_pending)
    /// is called, on the caller's thread. For offline rendering and tests.
    pub fn manual() -> Self {
        Self {
            mode: Mode::Manual {
                jobs: Mutex::new(Vec::new()),
                drains: Mutex::new(Vec::new()),
            },
            next_id: AtomicUsize::new(0),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.mode, Mode::Manual { .. })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Register a handler and return the audio-thread end of its slot.
    ///
    /// On a threaded host this blocks until the worker has installed the handler.
    pub fn register<H: WorkHandler>(
        &self,
        handler: H,
    ) -> Result<WorkerSlot<H::Request, H::Response>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (request_tx, request_rx) = crossbeam_channel::bounded(1);
        let (completion_tx, completion_rx) = crossbeam_channel::bounded(1);
        let job = Box::new(SlotJob {
            id,
            handler,
            requests: request_rx,
            completions: completion_tx,
        });

        let doorbell = match &self.mode {
            Mode::Threaded {
                commands, doorbell, ..
            } => {
                let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
                commands
                    .send(Command::Register { job, ack: ack_tx })
                    .map_err(|_| Error::WorkerDisconnected)?;
                ack_rx.recv().map_err(|_| Error::WorkerDisconnected)?;
                Some(doorbell.clone())
            }
            Mode::Manual { jobs, .. } => {
                jobs.lock().push(job);
                None
            }
        };

        tracing::debug!(slot = id, "worker slot registered");
        Ok(WorkerSlot {
            id,
            requests: request_tx,
            completions: completion_rx,
            doorbell,
            in_flight: false,
            coalesced: None,
        })
    }

    /// Have the worker forward an audio-thread log queue to `tracing`.
    pub fn attach_log(&self, drain: LogDrain) -> Result<()> {
        match &self.mode {
            Mode::Threaded { commands, .. } => commands
                .send(Command::AttachLog(drain))
                .map_err(|_| Error::WorkerDisconnected),
            Mode::Manual { drains, .. } => {
                drains.lock().push(drain);
                Ok(())
            }
        }
    }

    /// Manual hosts: run every queued request and flush logs. Returns the
    /// number of slots still registered. A no-op on threaded hosts.
    pub fn run_pending(&self) -> usize {
        match &self.mode {
            Mode::Threaded { .. } => 0,
            Mode::Manual { jobs, drains } => {
                let mut jobs = jobs.lock();
                jobs.retain_mut(|job| job.run_pending());
                for drain in drains.lock().iter_mut() {
                    drain.flush();
                }
                jobs.len()
            }
        }
    }

    /// Stop the worker thread and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        if let Mode::Threaded {
            commands, thread, ..
        } = &mut self.mode
        {
            if let Some(handle) = thread.take() {
                let _ = commands.send(Command::Shutdown);
                if handle.join().is_err() {
                    tracing::error!("worker thread panicked");
                }
            }
        }
        self.running.store(false, Ordering::Release);
    }
}

impl Drop for WorkerHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(commands: Receiver<Command>, doorbell: Receiver<usize>) {
    let mut jobs: Vec<Box<dyn Job>> = Vec::new();
    let mut drains: Vec<LogDrain> = Vec::new();

    loop {
        crossbeam_channel::select! {
            recv(commands) -> command => match command {
                Ok(Command::Register { job, ack }) => {
                    jobs.push(job);
                    let _ = ack.send(());
                }
                Ok(Command::AttachLog(drain)) => drains.push(drain),
                Ok(Command::Shutdown) | Err(_) => break,
            },
            recv(doorbell) -> id => {
                if let Ok(id) = id {
                    if let Some(pos) = jobs.iter().position(|job| job.id() == id) {
                        if !jobs[pos].run_pending() {
                            jobs.swap_remove(pos);
                        }
                    }
                }
            },
            default(IDLE_SWEEP) => {
                jobs.retain_mut(|job| job.run_pending());
            },
        }
        for drain in drains.iter_mut() {
            drain.flush();
        }
    }

    for drain in drains.iter_mut() {
        drain.flush();
    }
    tracing::info!(slots = jobs.len(), "worker host shutting down");
}
