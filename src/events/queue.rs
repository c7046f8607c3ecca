//! # Bounded stable priority queue backing the bus.
//!
//! [`EventQueue`] keeps events in descending priority order, FIFO among equal
//! priorities. A new event is linked **after** the last queued event whose
//! priority is greater than or equal to its own.
//!
//! ## Storage
//! ```text
//! nodes: [ n0 | n1 | n2 | n3 | ... ]     (arena, grows up to capacity)
//!          │          ▲
//! head ────┘          │
//!   n0.next ─► n2 ─► n1 ─► None          (queued, priority order)
//! free ─► n3 ─► None                     (recycled nodes)
//! ```
//! Dequeued nodes go onto the free list with their payload and source buffers
//! cleared but not deallocated, so a warmed-up queue enqueues without touching
//! the allocator unless a payload outgrows the buffer it lands in.
//!
//! ## Rules
//! - `len() <= capacity()` at all times; a push into a full queue fails with
//!   [`BusError::QueueFull`] and leaves the queue untouched.
//! - `seq` and `at` are stamped on push.
//! - Reservation failures surface as [`BusError::AllocationFailure`].

use std::mem;
use std::time::SystemTime;

use crate::error::BusError;
use crate::events::event::{Event, EventKind, Priority, clip_source};

struct Node {
    event: Event,
    next: Option<usize>,
}

/// Bounded priority queue of events over a recycling node arena.
pub struct EventQueue {
    nodes: Vec<Node>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Option<usize>,
    len: usize,
    pooled: usize,
    capacity: usize,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue holding at most `capacity` events (min 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            tail: None,
            free: None,
            len: 0,
            pooled: 0,
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    /// Number of queued events.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no events are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if the next push would fail with `QueueFull`.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Maximum number of queued events.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of recycled nodes waiting on the free list.
    #[inline]
    pub fn pooled(&self) -> usize {
        self.pooled
    }

    /// Number of nodes ever allocated (queued + pooled).
    #[inline]
    pub fn allocated(&self) -> usize {
        self.nodes.len()
    }

    /// Copies an event into queue-owned storage and links it by priority.
    ///
    /// Returns the sequence number assigned to the event.
    pub fn push(
        &mut self,
        kind: EventKind,
        priority: Priority,
        payload: &[u8],
        source: &str,
    ) -> Result<u64, BusError> {
        if self.is_full() {
            return Err(BusError::QueueFull {
                capacity: self.capacity,
            });
        }

        let idx = self.acquire()?;
        let seq = self.next_seq + 1;
        if let Err(e) = fill(&mut self.nodes[idx].event, kind, priority, payload, source, seq) {
            self.recycle(idx);
            return Err(e);
        }
        self.next_seq = seq;
        self.link(idx);
        self.len += 1;
        Ok(seq)
    }

    /// The event that would be dispatched next.
    pub fn peek(&self) -> Option<&Event> {
        self.head.map(|idx| &self.nodes[idx].event)
    }

    /// Iterates queued events in dispatch order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            queue: self,
            cur: self.head,
        }
    }

    /// Dequeues every event in dispatch order, handing each to `f` before its
    /// node is recycled. Returns the number of events drained.
    pub fn drain_with(&mut self, mut f: impl FnMut(&Event)) -> usize {
        let mut drained = 0;
        while let Some(idx) = self.pop_front() {
            f(&self.nodes[idx].event);
            self.recycle(idx);
            drained += 1;
        }
        drained
    }

    /// Discards every queued event. Returns the number discarded.
    pub fn clear(&mut self) -> usize {
        self.drain_with(|_| {})
    }

    /// Discards every queued event and releases all node storage.
    pub fn reset(&mut self) {
        self.nodes = Vec::new();
        self.head = None;
        self.tail = None;
        self.free = None;
        self.len = 0;
        self.pooled = 0;
    }

    fn acquire(&mut self) -> Result<usize, BusError> {
        if let Some(idx) = self.free {
            self.free = self.nodes[idx].next.take();
            self.pooled -= 1;
            return Ok(idx);
        }
        self.nodes
            .try_reserve(1)
            .map_err(|_| BusError::AllocationFailure {
                bytes: mem::size_of::<Node>(),
            })?;
        self.nodes.push(Node {
            event: Event::new(EventKind::Custom),
            next: None,
        });
        Ok(self.nodes.len() - 1)
    }

    fn link(&mut self, idx: usize) {
        let priority = self.nodes[idx].event.priority;
        match self.tail {
            None => {
                self.head = Some(idx);
                self.tail = Some(idx);
            }
            Some(tail) if self.nodes[tail].event.priority >= priority => {
                self.nodes[tail].next = Some(idx);
                self.tail = Some(idx);
            }
            Some(_) => {
                // The tail is lower priority, so the insertion point is interior.
                let mut prev = None;
                let mut cur = self.head;
                while let Some(c) = cur {
                    if self.nodes[c].event.priority < priority {
                        break;
                    }
                    prev = Some(c);
                    cur = self.nodes[c].next;
                }
                self.nodes[idx].next = cur;
                match prev {
                    Some(p) => self.nodes[p].next = Some(idx),
                    None => self.head = Some(idx),
                }
            }
        }
    }

    fn pop_front(&mut self) -> Option<usize> {
        let idx = self.head?;
        self.head = self.nodes[idx].next.take();
        if self.head.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        Some(idx)
    }

    fn recycle(&mut self, idx: usize) {
        let node = &mut self.nodes[idx];
        node.event.payload.clear();
        node.event.source.clear();
        node.next = self.free;
        self.free = Some(idx);
        self.pooled += 1;
    }
}

fn fill(
    event: &mut Event,
    kind: EventKind,
    priority: Priority,
    payload: &[u8],
    source: &str,
    seq: u64,
) -> Result<(), BusError> {
    let source = clip_source(source);
    event.payload.clear();
    event
        .payload
        .try_reserve(payload.len())
        .map_err(|_| BusError::AllocationFailure {
            bytes: payload.len(),
        })?;
    event.source.clear();
    event
        .source
        .try_reserve(source.len())
        .map_err(|_| BusError::AllocationFailure {
            bytes: source.len(),
        })?;

    event.payload.extend_from_slice(payload);
    event.source.push_str(source);
    event.kind = kind;
    event.priority = priority;
    event.seq = seq;
    event.at = SystemTime::now();
    Ok(())
}

/// Iterator over queued events in dispatch order.
pub struct Iter<'a> {
    queue: &'a EventQueue,
    cur: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cur?;
        let node = &self.queue.nodes[idx];
        self.cur = node.next;
        Some(&node.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(q: &mut EventQueue, p: Priority) -> u64 {
        q.push(EventKind::Custom, p, &[], "test").expect("push")
    }

    fn order(q: &EventQueue) -> Vec<(Priority, u64)> {
        q.iter().map(|e| (e.priority, e.seq)).collect()
    }

    #[test]
    fn equal_priorities_stay_fifo() {
        let mut q = EventQueue::new(8);
        let h1 = push(&mut q, Priority::High);
        let l = push(&mut q, Priority::Low);
        let h2 = push(&mut q, Priority::High);

        assert_eq!(
            order(&q),
            vec![(Priority::High, h1), (Priority::High, h2), (Priority::Low, l)]
        );
    }

    #[test]
    fn higher_priority_goes_to_front() {
        let mut q = EventQueue::new(8);
        let n = push(&mut q, Priority::Normal);
        let c = push(&mut q, Priority::Critical);
        let l = push(&mut q, Priority::Low);
        let h = push(&mut q, Priority::High);
        let n2 = push(&mut q, Priority::Normal);

        assert_eq!(
            order(&q),
            vec![
                (Priority::Critical, c),
                (Priority::High, h),
                (Priority::Normal, n),
                (Priority::Normal, n2),
                (Priority::Low, l),
            ]
        );
        assert_eq!(q.peek().map(|e| e.seq), Some(c));
    }

    #[test]
    fn full_queue_rejects_newest() {
        let mut q = EventQueue::new(3);
        for _ in 0..3 {
            push(&mut q, Priority::Low);
        }
        let err = q
            .push(EventKind::Custom, Priority::Critical, &[], "x")
            .unwrap_err();
        assert_eq!(err, BusError::QueueFull { capacity: 3 });
        assert_eq!(q.len(), 3);
        assert!(q.iter().all(|e| e.priority == Priority::Low));
    }

    #[test]
    fn drained_nodes_are_reused() {
        let mut q = EventQueue::new(4);
        for _ in 0..4 {
            push(&mut q, Priority::Normal);
        }
        assert_eq!(q.allocated(), 4);
        assert_eq!(q.drain_with(|_| {}), 4);
        assert_eq!(q.pooled(), 4);

        for _ in 0..50 {
            push(&mut q, Priority::High);
            push(&mut q, Priority::Low);
            q.clear();
        }
        assert_eq!(q.allocated(), 4);
        assert_eq!(q.pooled(), 4);
        assert!(q.is_empty());
    }

    #[test]
    fn recycled_payload_buffer_keeps_capacity() {
        let mut q = EventQueue::new(1);
        q.push(EventKind::Custom, Priority::Normal, &[7u8; 128], "big")
            .expect("push");
        q.clear();
        q.push(EventKind::Custom, Priority::Normal, &[1, 2, 3], "small")
            .expect("push");

        assert!(q.nodes[0].event.payload.capacity() >= 128);
        let ev = q.peek().expect("queued");
        assert_eq!(ev.payload(), Some(&[1u8, 2, 3][..]));
        assert_eq!(ev.source, "small");
    }

    #[test]
    fn seq_increases_and_timestamp_is_stamped() {
        let mut q = EventQueue::new(4);
        let before = SystemTime::now();
        let a = push(&mut q, Priority::Normal);
        let b = push(&mut q, Priority::Normal);
        assert!(b > a);
        assert!(q.iter().all(|e| e.at >= before));
    }

    #[test]
    fn reset_releases_storage() {
        let mut q = EventQueue::new(4);
        push(&mut q, Priority::Normal);
        push(&mut q, Priority::Normal);
        q.reset();
        assert!(q.is_empty());
        assert_eq!(q.allocated(), 0);
        assert_eq!(q.pooled(), 0);
        assert!(q.peek().is_none());
    }
}
