//! Priority fair queue over inbound pipes
//!
//! Pipes are grouped by receive priority. Within a priority level pipes are
//! served round robin; a lower level is only served when every more
//! preferred level has nothing to give. A pipe that comes up empty leaves
//! the queue until the transport reports it readable again.

use std::collections::{HashMap, VecDeque};

use crate::message::Message;
use crate::pipe::{PipeId, Priority, PRIORITY_LOWEST};

const LEVELS: usize = PRIORITY_LOWEST as usize;

#[derive(Debug, Clone, Copy)]
struct Slot {
    priority: Priority,
    active: bool,
}

/// Inbound fair queue
#[derive(Debug)]
pub struct FairQueue {
    /// Active pipes per level, index 0 most preferred
    levels: Vec<VecDeque<PipeId>>,
    slots: HashMap<PipeId, Slot>,
}

impl Default for FairQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FairQueue {
    pub fn new() -> Self {
        Self {
            levels: vec![VecDeque::new(); LEVELS],
            slots: HashMap::new(),
        }
    }

    /// Add a pipe; it starts out active
    pub fn register(&mut self, pipe: PipeId, priority: Priority) {
        if self.slots.contains_key(&pipe) {
            return;
        }
        self.slots.insert(
            pipe,
            Slot {
                priority,
                active: true,
            },
        );
        self.levels[priority.index()].push_back(pipe);
    }

    /// Forget a pipe entirely
    pub fn unregister(&mut self, pipe: PipeId) -> bool {
        let Some(slot) = self.slots.remove(&pipe) else {
            return false;
        };
        if slot.active {
            self.levels[slot.priority.index()].retain(|&p| p != pipe);
        }
        true
    }

    /// Put a drained pipe back in rotation
    pub fn mark_readable(&mut self, pipe: PipeId) -> bool {
        match self.slots.get_mut(&pipe) {
            Some(slot) if !slot.active => {
                slot.active = true;
                self.levels[slot.priority.index()].push_back(pipe);
                true
            }
            _ => false,
        }
    }

    /// Whether any pipe is in rotation
    pub fn can_recv(&self) -> bool {
        self.levels.iter().any(|level| !level.is_empty())
    }

    /// Whether `pipe` is in rotation
    pub fn is_active(&self, pipe: PipeId) -> bool {
        self.slots.get(&pipe).map_or(false, |slot| slot.active)
    }

    /// Pull the next message, calling `recv` on pipes in service order
    pub fn pull<F>(&mut self, mut recv: F) -> Option<(Message, PipeId)>
    where
        F: FnMut(PipeId) -> Option<Message>,
    {
        for level in self.levels.iter_mut() {
            while let Some(pipe) = level.pop_front() {
                match recv(pipe) {
                    Some(msg) => {
                        level.push_back(pipe);
                        return Some((msg, pipe));
                    }
                    None => {
                        if let Some(slot) = self.slots.get_mut(&pipe) {
                            slot.active = false;
                        }
                    }
                }
            }
        }
        None
    }
}
