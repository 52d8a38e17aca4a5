//! Fixed-capacity history of the most recent samples.

/// Ring buffer that keeps the last `capacity` values pushed.
///
/// Storage is allocated once. [`copy_to`](CircularBuffer::copy_to) takes a
/// snapshot in chronological order so a consumer on another thread never
/// reads memory that is still being overwritten.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T: Copy + Default> {
    data: Vec<T>,
    head: usize,
}

impl<T: Copy + Default> CircularBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be non-zero");
        Self {
            data: vec![T::default(); capacity],
            head: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        self.data[self.head] = value;
        self.head += 1;
        if self.head == self.data.len() {
            self.head = 0;
        }
    }

    /// Copy the contents, oldest first, into `out`. `out` must hold exactly `capacity` values.
    pub fn copy_to(&self, out: &mut [T]) {
        debug_assert_eq!(out.len(), self.data.len());
        let (newer, older) = self.data.split_at(self.head);
        let split = older.len();
        out[..split].copy_from_slice(older);
        out[split..].copy_from_slice(newer);
    }

    pub fn clear(&mut self) {
        self.data.fill(T::default());
        self.head = 0;
    }
}
