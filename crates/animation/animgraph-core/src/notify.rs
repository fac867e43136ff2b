//! Notifications emitted by controllers and layers, drained by the host.

use std::collections::VecDeque;

use log::warn;
use serde::{Deserialize, Serialize};

/// Discrete signals raised during playback and rebinding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
#[non_exhaustive]
pub enum Notification {
    /// The active state switched. `from` is `None` when entering from idle.
    StateChanged {
        layer: String,
        from: Option<String>,
        to: String,
    },
    /// A fade finished, or an instant switch happened.
    TransitionComplete {
        layer: String,
        from: Option<String>,
        to: String,
    },
    MaskChanged { layer: String },
    /// The set of driven channels may have changed; hosts should re-resolve.
    RebindRequired { layer: String },
}

impl Notification {
    pub fn layer(&self) -> &str {
        match self {
            Self::StateChanged { layer, .. }
            | Self::TransitionComplete { layer, .. }
            | Self::MaskChanged { layer }
            | Self::RebindRequired { layer } => layer,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::TransitionComplete { .. } => "transition_complete",
            Self::MaskChanged { .. } => "mask_changed",
            Self::RebindRequired { .. } => "rebind_required",
        }
    }
}

/// Bounded FIFO of pending notifications. When full, the oldest entry is
/// dropped.
#[derive(Clone, Debug)]
pub struct Notifications {
    queue: VecDeque<Notification>,
    capacity: usize,
}

impl Notifications {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, n: Notification) {
        if self.queue.len() >= self.capacity {
            if let Some(dropped) = self.queue.pop_front() {
                warn!(
                    "notification queue full ({}); dropping {} for layer '{}'",
                    self.capacity,
                    dropped.name(),
                    dropped.layer()
                );
            }
        }
        self.queue.push_back(n);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = Notification>) {
        for n in items {
            self.push(n);
        }
    }

    /// Take all pending notifications in emission order.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }
}
