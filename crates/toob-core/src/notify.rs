//! Outbound event channel.
//!
//! A fixed-capacity byte buffer the processor appends timestamped key/value
//! messages to during a block. Capacity is reserved once; a write that would
//! not fit is rejected whole and the buffer is left untouched.
//!
//! Messages are bincode-encoded [`NotifyMessage`]s laid end to end. Writers
//! use borrowed [`Value`]s, which encode exactly like the owned
//! [`PropertyValue`] a reader gets back.

use crate::error::NotifyError;
use crate::events::PropertyValue;
use crate::urid::Urid;
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;

/// Borrowed property value for writing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Float(f32),
    Int(i32),
    Urid(Urid),
    FloatVector(&'a [f32]),
    Path(&'a Path),
}

impl Serialize for Value<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Variant indices follow `PropertyValue`.
        const NAME: &str = "PropertyValue";
        match *self {
            Value::Float(v) => serializer.serialize_newtype_variant(NAME, 1, "Float", &v),
            Value::Int(v) => serializer.serialize_newtype_variant(NAME, 2, "Int", &v),
            Value::Urid(v) => serializer.serialize_newtype_variant(NAME, 3, "Urid", &v),
            Value::Path(v) => serializer.serialize_newtype_variant(NAME, 4, "Path", v),
            Value::FloatVector(v) => {
                serializer.serialize_newtype_variant(NAME, 5, "FloatVector", v)
            }
        }
    }
}

/// Write-side twin of [`NotifyMessage`].
#[derive(Serialize)]
struct Outgoing<'a, 'v> {
    frame: u64,
    object_type: Urid,
    properties: &'a [(Urid, Value<'v>)],
}

/// A decoded outbound message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotifyMessage {
    pub frame: u64,
    pub object_type: Urid,
    pub properties: Vec<(Urid, PropertyValue)>,
}

impl NotifyMessage {
    pub fn property(&self, key: Urid) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find_map(|(k, v)| (*k == key).then_some(v))
    }
}

#[derive(Debug)]
pub struct NotifyBuffer {
    bytes: Vec<u8>,
    capacity: usize,
    last_frame: Option<u64>,
}

impl NotifyBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
            last_frame: None,
        }
    }

    /// Bytes a message of this type and these properties occupies.
    pub fn encoded_len(
        object_type: Urid,
        properties: &[(Urid, Value<'_>)],
    ) -> Result<usize, NotifyError> {
        let msg = Outgoing {
            frame: 0,
            object_type,
            properties,
        };
        bincode::serialized_size(&msg)
            .map(|n| n as usize)
            .map_err(|_| NotifyError::Unencodable)
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.bytes.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Start a new block. The frame watermark survives so ordering holds across blocks.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Append one message. Never allocates: the size is checked against the
    /// reserved capacity before anything is written.
    pub fn write(
        &mut self,
        frame: u64,
        object_type: Urid,
        properties: &[(Urid, Value<'_>)],
    ) -> Result<(), NotifyError> {
        if let Some(last) = self.last_frame {
            if frame < last {
                return Err(NotifyError::OutOfOrder { frame, last });
            }
        }
        let msg = Outgoing {
            frame,
            object_type,
            properties,
        };
        let needed = bincode::serialized_size(&msg)
            .map_err(|_| NotifyError::Unencodable)? as usize;
        let remaining = self.remaining();
        if needed > remaining {
            return Err(NotifyError::Overflow { needed, remaining });
        }

        let start = self.bytes.len();
        if bincode::serialize_into(&mut self.bytes, &msg).is_err() {
            self.bytes.truncate(start);
            return Err(NotifyError::Unencodable);
        }
        self.last_frame = Some(frame);
        Ok(())
    }

    /// Decode everything written since the last `clear`. Allocates; consumer side only.
    pub fn messages(&self) -> Vec<NotifyMessage> {
        let mut rest: &[u8] = &self.bytes;
        let mut out = Vec::new();
        while !rest.is_empty() {
            match bincode::deserialize_from::<_, NotifyMessage>(&mut rest) {
                Ok(msg) => out.push(msg),
                Err(e) => {
                    tracing::warn!(
                        offset = self.bytes.len() - rest.len(),
                        error = %e,
                        "undecodable notify message"
                    );
                    break;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::urid::UridMap;
    use std::path::PathBuf;

    fn ids() -> (Urid, Urid, Urid) {
        let map = UridMap::new();
        (map.map("urn:set"), map.map("urn:freq"), map.map("urn:file"))
    }

    #[test]
    fn test_write_and_decode() {
        let (set, freq, file) = ids();
        let mut buf = NotifyBuffer::new(1024);
        let curve = [1.0f32, 0.5, 0.25];
        buf.write(
            42,
            set,
            &[
                (freq, Value::FloatVector(&curve)),
                (file, Value::Path(Path::new("/tmp/model.json"))),
            ],
        )
        .unwrap();

        let msgs = buf.messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].frame, 42);
        assert_eq!(msgs[0].object_type, set);
        assert_eq!(
            msgs[0].property(freq),
            Some(&PropertyValue::FloatVector(curve.to_vec()))
        );
        assert_eq!(
            msgs[0].property(file),
            Some(&PropertyValue::Path(PathBuf::from("/tmp/model.json")))
        );
    }

    #[test]
    fn test_overflow_leaves_buffer_untouched() {
        let (set, freq, _) = ids();
        let mut buf = NotifyBuffer::new(64);
        let big = [0.0f32; 32];
        let err = buf
            .write(0, set, &[(freq, Value::FloatVector(&big))])
            .unwrap_err();
        assert!(matches!(err, NotifyError::Overflow { remaining: 64, .. }));
        assert!(buf.is_empty());

        let one = [(freq, Value::Float(1.0))];
        buf.write(0, set, &one).unwrap();
        assert_eq!(buf.remaining(), 64 - NotifyBuffer::encoded_len(set, &one).unwrap());
    }

    #[test]
    fn test_rejects_earlier_frame_across_clear() {
        let (set, freq, _) = ids();
        let mut buf = NotifyBuffer::new(256);
        buf.write(100, set, &[(freq, Value::Float(1.0))]).unwrap();
        buf.clear();
        assert_eq!(
            buf.write(99, set, &[(freq, Value::Float(1.0))]),
            Err(NotifyError::OutOfOrder { frame: 99, last: 100 })
        );
        assert!(buf.write(100, set, &[(freq, Value::Float(2.0))]).is_ok());
    }

    #[test]
    fn test_write_does_not_reallocate() {
        let (set, freq, _) = ids();
        let mut buf = NotifyBuffer::new(128);
        let ptr = buf.as_bytes().as_ptr();
        while buf.write(0, set, &[(freq, Value::Int(7))]).is_ok() {}
        assert_eq!(buf.as_bytes().as_ptr(), ptr);
        assert!(buf.remaining() < NotifyBuffer::encoded_len(set, &[(freq, Value::Int(7))]).unwrap());
    }

    #[test]
    fn test_decodes_every_value_kind() {
        let (set, freq, file) = ids();
        let mut buf = NotifyBuffer::new(1024);
        buf.write(1, set, &[(freq, Value::Float(82.4))]).unwrap();
        buf.write(2, set, &[(freq, Value::Int(-3)), (file, Value::Urid(set))])
            .unwrap();

        let msgs = buf.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].property(freq), Some(&PropertyValue::Float(82.4)));
        assert_eq!(msgs[1].frame, 2);
        assert_eq!(msgs[1].property(freq), Some(&PropertyValue::Int(-3)));
        assert_eq!(msgs[1].property(file), Some(&PropertyValue::Urid(set)));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_is_rejected_whole() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (set, _, file) = ids();
        let mut buf = NotifyBuffer::new(256);
        let path = Path::new(OsStr::from_bytes(b"/tmp/\xff.json"));
        assert_eq!(
            buf.write(0, set, &[(file, Value::Path(path))]),
            Err(NotifyError::Unencodable)
        );
        assert!(buf.is_empty());
    }
}
