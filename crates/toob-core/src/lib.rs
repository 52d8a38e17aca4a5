//! Real-time scheduling core for the toob processors.
//!
//! Everything here is shared by the processors: control ports with change
//! detection, the rate-limited publish schedule, the outbound/inbound event
//! channels, and the worker channel that takes blocking work off the audio
//! thread.
//!
//! # Primary API
//!
//! - [`ControlInput`]: host-written parameter with once-per-block change detection
//! - [`PublishScheduler`] / [`ResponsePublisher`]: "something changed → publish later"
//! - [`WorkerHost`] / [`WorkerSlot`]: at-most-one-in-flight request/response offload
//! - [`NotifyBuffer`]: fixed-capacity outbound message buffer
//! - [`Processor`]: the audio-thread contract

pub mod compat;

pub mod error;
pub use error::{Error, NotifyError, Result, SubmitError};

pub mod config;
pub use config::{ProcessorConfig, DEFAULT_NOTIFY_CAPACITY, MAX_UPDATES_PER_SECOND};

mod control;
pub use control::{
    amplitude_to_db, db_to_amplitude, ControlHandle, ControlInput, ControlOutput, MIN_DB,
};

mod dezipper;
pub use dezipper::{Dezipper, DEFAULT_RAMP_SECS};

mod clock;
pub use clock::{Clock, FrameClock, ManualClock, SystemClock};

mod schedule;
pub use schedule::{PendingPublish, PublishScheduler};

pub mod urid;
pub use urid::{uris, CoreUrids, Urid, UridMap};

mod events;
pub use events::{EventBody, InputEvent, PropertyValue};

mod notify;
pub use notify::{NotifyBuffer, NotifyMessage, Value};

mod response;
pub use response::{
    FrequencyResponse, DISPLAY_MAX_DB, DISPLAY_MIN_DB, RESPONSE_BINS, RESPONSE_MAX_HZ,
    RESPONSE_MIN_HZ,
};

mod publish;
pub use publish::ResponsePublisher;

mod buffer;
pub use buffer::CircularBuffer;

mod rtlog;
pub use rtlog::{Detail, LogDrain, LogRecord, RtLog, DEFAULT_LOG_CAPACITY};

mod worker;
pub use worker::{Completion, Disposer, WorkHandler, WorkerHost, WorkerSlot, IDLE_SWEEP};

mod processor;
pub use processor::{HostContext, ProcessBlock, Processor};

pub mod prelude {
    pub use crate::{
        Completion, ControlInput, ControlOutput, HostContext, InputEvent, NotifyBuffer,
        ProcessBlock, Processor, ProcessorConfig, PropertyValue, ResponsePublisher, Urid,
        UridMap, WorkHandler, WorkerHost, WorkerSlot,
    };
}
