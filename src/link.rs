//! Snapshot channel from the control context to the pulse context.
//!
//! The only way configuration reaches the pulse engine. FIFO, no coalescing:
//! a full queue stalls the sender until the consumer catches up.

use core::hint::spin_loop;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TryReceiveError, TrySendError};

use crate::drivers::quadrature::PulseEngine;
use crate::state::ConfigSnapshot;

pub const CONFIG_QUEUE_DEPTH: usize = 2;

pub struct ConfigChannel<const N: usize = CONFIG_QUEUE_DEPTH> {
    queue: Channel<CriticalSectionRawMutex, ConfigSnapshot, N>,
}

impl<const N: usize> ConfigChannel<N> {
    pub const fn new() -> Self {
        Self { queue: Channel::new() }
    }

    /// Blocks until the queue has room.
    pub fn send(&self, snapshot: ConfigSnapshot) {
        let mut pending = snapshot;
        loop {
            match self.queue.try_send(pending) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    pending = back;
                    spin_loop();
                }
            }
        }
    }

    pub async fn receive(&self) -> ConfigSnapshot {
        self.queue.receive().await
    }

    pub fn try_receive(&self) -> Option<ConfigSnapshot> {
        match self.queue.try_receive() {
            Ok(snapshot) => Some(snapshot),
            Err(TryReceiveError::Empty) => None,
        }
    }

    /// Blocks until a snapshot is available.
    pub fn receive_blocking(&self) -> ConfigSnapshot {
        loop {
            if let Some(snapshot) = self.try_receive() {
                return snapshot;
            }
            spin_loop();
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<const N: usize> Default for ConfigChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer loop of the pulse context: applies every snapshot in order.
pub async fn pump<const N: usize>(channel: &ConfigChannel<N>, engine: &PulseEngine) -> ! {
    loop {
        let snapshot = channel.receive().await;
        engine.apply(snapshot);
        debug!("applied {}", snapshot);
    }
}
