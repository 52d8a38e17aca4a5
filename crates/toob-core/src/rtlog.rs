//! Logging from the audio thread.
//!
//! The audio thread can't format strings or take the subscriber's locks, so
//! it pushes small fixed records into a ring buffer. A [`LogDrain`] on a
//! non-real-time thread turns them into `tracing` events.

use crate::compat::{Arc, AtomicU64, Ordering};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_LOG_CAPACITY: usize = 64;

/// Extra payload attached to a record. Moved in, never formatted on the audio thread.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Detail {
    #[default]
    None,
    Path(PathBuf),
    Value(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub frame: u64,
    pub message: &'static str,
    pub detail: Detail,
}

/// Producer half, owned by the processor.
pub struct RtLog {
    producer: HeapProd<LogRecord>,
    dropped: Arc<AtomicU64>,
}

impl RtLog {
    pub fn new(capacity: usize) -> (RtLog, LogDrain) {
        let (producer, consumer) = HeapRb::new(capacity).split();
        let dropped = Arc::new(AtomicU64::new(0));
        (
            RtLog {
                producer,
                dropped: Arc::clone(&dropped),
            },
            LogDrain {
                consumer,
                dropped,
                reported_dropped: 0,
            },
        )
    }

    /// Queue a record. A full queue hands it back, so nothing it owns is freed here.
    #[inline]
    pub fn push(&mut self, record: LogRecord) -> Result<(), LogRecord> {
        self.producer.try_push(record).map_err(|record| {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            record
        })
    }

    /// Queue a record; a full queue hands `detail` back.
    #[inline]
    pub fn log(
        &mut self,
        level: Level,
        frame: u64,
        message: &'static str,
        detail: Detail,
    ) -> Result<(), Detail> {
        self.push(LogRecord {
            level,
            frame,
            message,
            detail,
        })
        .map_err(|record| record.detail)
    }

    #[inline]
    pub fn error(&mut self, frame: u64, message: &'static str, detail: Detail) -> Result<(), Detail> {
        self.log(Level::ERROR, frame, message, detail)
    }

    #[inline]
    pub fn info(&mut self, frame: u64, message: &'static str, detail: Detail) -> Result<(), Detail> {
        self.log(Level::INFO, frame, message, detail)
    }
}

/// Consumer half. Flushed by the worker host or by whoever owns it.
pub struct LogDrain {
    consumer: HeapCons<LogRecord>,
    dropped: Arc<AtomicU64>,
    reported_dropped: u64,
}

impl LogDrain {
    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn try_pop(&mut self) -> Option<LogRecord> {
        self.consumer.try_pop()
    }

    /// Forward every queued record to `tracing`. Returns how many were emitted.
    pub fn flush(&mut self) -> usize {
        let mut count = 0;
        while let Some(record) = self.consumer.try_pop() {
            emit(&record);
            count += 1;
        }
        let dropped = self.dropped();
        if dropped > self.reported_dropped {
            tracing::warn!(
                lost = dropped - self.reported_dropped,
                "audio thread log queue overflowed"
            );
            self.reported_dropped = dropped;
        }
        count
    }
}

fn emit(record: &LogRecord) {
    let frame = record.frame;
    let message = record.message;
    macro_rules! at {
        ($lvl:expr) => {
            match &record.detail {
                Detail::None => tracing::event!($lvl, frame, "{message}"),
                Detail::Path(path) => {
                    tracing::event!($lvl, frame, path = %path.display(), "{message}")
                }
                Detail::Value(value) => tracing::event!($lvl, frame, value, "{message}"),
            }
        };
    }
    match record.level {
        Level::ERROR => at!(Level::ERROR),
        Level::WARN => at!(Level::WARN),
        Level::INFO => at!(Level::INFO),
        Level::DEBUG => at!(Level::DEBUG),
        _ => at!(Level::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_flush() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let (mut log, mut drain) = RtLog::new(4);
        assert!(log.error(10, "model load failed", Detail::Path("/x.json".into())).is_ok());
        assert!(log.info(20, "model loaded", Detail::None).is_ok());
        assert_eq!(drain.pending(), 2);
        assert_eq!(drain.flush(), 2);
        assert_eq!(drain.pending(), 0);
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let (mut log, mut drain) = RtLog::new(2);
        assert!(log.info(0, "a", Detail::None).is_ok());
        assert!(log.info(0, "b", Detail::None).is_ok());
        assert_eq!(log.info(0, "c", Detail::Value(1.0)), Err(Detail::Value(1.0)));
        assert_eq!(drain.dropped(), 1);

        let first = drain.try_pop().unwrap();
        assert_eq!(first.message, "a");
        assert_eq!(first.level, Level::INFO);
    }

    #[test]
    fn test_full_queue_hands_path_back() {
        let (mut log, _drain) = RtLog::new(1);
        assert!(log.info(0, "a", Detail::None).is_ok());
        let path = std::path::PathBuf::from("/models/amp.json");
        let rejected = log.error(5, "model load failed", Detail::Path(path.clone()));
        assert_eq!(rejected, Err(Detail::Path(path)));
    }
}
