//! Append-only event log with independent read cursors.
//!
//! Every subscriber holds a [`Cursor`] and reads the events published since its
//! last read, in publication order. Events are retained until every live cursor
//! has read them, so a subscriber that never reads keeps the backlog growing.
//! [`EventLog::backlog`] exposes that growth.

use std::collections::VecDeque;
use std::fmt;

/// Handle identifying one subscriber of an [`EventLog`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    slot: u32,
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.slot)
    }
}

/// A multi-consumer event log.
pub struct EventLog<T> {
    /// Retained events. `events[0]` has sequence number `head`.
    events: VecDeque<T>,
    head: u64,
    /// Next sequence number to read, per cursor slot. `None` marks a free slot.
    cursors: Vec<Option<u64>>,
}

impl<T> EventLog<T> {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
            head: 0,
            cursors: Vec::new(),
        }
    }

    /// Sequence number the next published event will receive.
    fn tail(&self) -> u64 {
        self.head + self.events.len() as u64
    }

    /// Register a new subscriber. It only sees events published after this call.
    pub fn subscribe(&mut self) -> Cursor {
        let tail = self.tail();
        let slot = match self.cursors.iter().position(Option::is_none) {
            Some(free) => {
                self.cursors[free] = Some(tail);
                free
            }
            None => {
                self.cursors.push(Some(tail));
                self.cursors.len() - 1
            }
        };
        Cursor { slot: slot as u32 }
    }

    /// Drop a subscriber. Returns `false` if the cursor was not subscribed.
    pub fn unsubscribe(&mut self, cursor: Cursor) -> bool {
        let removed = match self.cursors.get_mut(cursor.slot as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                true
            }
            _ => false,
        };
        if removed {
            self.reclaim();
        }
        removed
    }

    /// Append an event. Discarded immediately when nobody is subscribed.
    pub fn publish(&mut self, event: T) {
        if self.subscribers() == 0 {
            self.head += 1;
            return;
        }
        self.events.push_back(event);
    }

    /// Number of events the given cursor has not read yet.
    pub fn pending(&self, cursor: Cursor) -> usize {
        match self.position(cursor) {
            Some(next) => (self.tail() - next) as usize,
            None => 0,
        }
    }

    /// Number of events currently retained for slow subscribers.
    pub fn backlog(&self) -> usize {
        self.events.len()
    }

    /// Number of live cursors.
    pub fn subscribers(&self) -> usize {
        self.cursors.iter().filter(|c| c.is_some()).count()
    }

    /// Whether the cursor is subscribed to this log.
    pub fn is_subscribed(&self, cursor: Cursor) -> bool {
        self.position(cursor).is_some()
    }

    /// Discard every retained event. Cursors stay subscribed and resume at the tail.
    pub fn clear(&mut self) {
        let tail = self.tail();
        self.events.clear();
        self.head = tail;
        for next in self.cursors.iter_mut().flatten() {
            *next = tail;
        }
    }

    fn position(&self, cursor: Cursor) -> Option<u64> {
        self.cursors.get(cursor.slot as usize).copied().flatten()
    }

    /// Drop events every live cursor has already read.
    fn reclaim(&mut self) {
        let oldest = self
            .cursors
            .iter()
            .flatten()
            .copied()
            .min()
            .unwrap_or_else(|| self.tail());
        let consumed = (oldest - self.head) as usize;
        self.events.drain(..consumed);
        self.head = oldest;
    }
}

impl<T: Clone> EventLog<T> {
    /// Return all events published since this cursor's previous read.
    ///
    /// An unknown cursor reads nothing.
    pub fn read(&mut self, cursor: Cursor) -> Vec<T> {
        let Some(next) = self.position(cursor) else {
            return Vec::new();
        };
        let start = (next - self.head) as usize;
        let unread: Vec<T> = self.events.range(start..).cloned().collect();
        self.cursors[cursor.slot as usize] = Some(self.tail());
        self.reclaim();
        unread
    }
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventLog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("backlog", &self.events.len())
            .field("subscribers", &self.subscribers())
            .finish()
    }
}
