//! # Experience Replay
//!
//! [`ReplayBuffer`] is a fixed-capacity ring: once full, every push overwrites
//! the oldest transition in O(1). [`DemonstrationBuffer`] collects transitions
//! recorded under manual control until the next training step consumes them.

use ndarray::Array1;

/// One observed `(state, action, reward, next_state, terminal)` sample.
///
/// Fields are private so a transition cannot be mutated once it is built.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    state: Array1<f32>,
    action: usize,
    reward: f32,
    next_state: Array1<f32>,
    terminal: bool,
}

impl Transition {
    pub fn new(
        state: Array1<f32>,
        action: usize,
        reward: f32,
        next_state: Array1<f32>,
        terminal: bool,
    ) -> Self {
        Transition {
            state,
            action,
            reward,
            next_state,
            terminal,
        }
    }

    pub fn state(&self) -> &Array1<f32> {
        &self.state
    }

    pub fn action(&self) -> usize {
        self.action
    }

    pub fn reward(&self) -> f32 {
        self.reward
    }

    pub fn next_state(&self) -> &Array1<f32> {
        &self.next_state
    }

    pub fn terminal(&self) -> bool {
        self.terminal
    }
}

/// Bounded FIFO history of transitions backed by a ring buffer
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    slots: Vec<Transition>,
    /// Index of the oldest transition once the ring has wrapped
    head: usize,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            slots: Vec::with_capacity(capacity.min(4096)),
            head: 0,
            capacity,
        }
    }

    /// Append a transition, evicting the oldest one when the buffer is full.
    /// A zero-capacity buffer discards everything.
    pub fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.slots.len() < self.capacity {
            self.slots.push(transition);
        } else {
            self.slots[self.head] = transition;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// The `index`-th transition counting from the oldest
    pub fn get(&self, index: usize) -> Option<&Transition> {
        if index >= self.slots.len() {
            return None;
        }
        let slot = (self.head + index) % self.slots.len();
        self.slots.get(slot)
    }

    /// Transitions from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Transition> + '_ {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

/// Unbounded collection of manually controlled transitions, drained by training
#[derive(Clone, Debug, Default)]
pub struct DemonstrationBuffer {
    transitions: Vec<Transition>,
}

impl DemonstrationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn get(&self, index: usize) -> Option<&Transition> {
        self.transitions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
    }
}
