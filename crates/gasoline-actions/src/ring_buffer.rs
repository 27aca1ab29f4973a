use std::collections::VecDeque;

/// A fixed-capacity FIFO buffer: pushing past capacity drops the oldest
/// entry. Used for both the raw action buffer (cap 20) and the enhanced
/// action buffer (cap 50).
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    cap: usize,
    items: VecDeque<T>,
}

impl<T> RingBuffer<T> {
    pub fn new(cap: usize) -> Self {
        RingBuffer {
            cap,
            items: VecDeque::with_capacity(cap),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() >= self.cap {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// A read-only copy of the buffer's contents, oldest first.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_drops_oldest() {
        let mut buf = RingBuffer::new(20);
        for i in 0..25 {
            buf.push(i);
        }
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 20);
        assert_eq!(snap[0], 5);
        assert_eq!(snap[19], 24);
    }

    #[test]
    fn twenty_first_insert_evicts_exactly_one() {
        let mut buf = RingBuffer::new(20);
        for i in 0..20 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 20);
        buf.push(99);
        assert_eq!(buf.len(), 20);
        assert_eq!(buf.snapshot()[0], 1);
    }
}
