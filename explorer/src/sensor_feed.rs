//! Bounded hand-off of sensor events from the platform callback thread to the frame loop.
//!
//! The producer never blocks: when the frame loop falls behind, new events are dropped and
//! counted. The consumer drains everything queued once per frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};

use serde::{Deserialize, Serialize};

use crate::orientation::TiltReading;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorEvent {
    pub reading: TiltReading,
    /// Screen orientation angle reported alongside the reading, in degrees.
    pub screen_angle: i32,
}

impl SensorEvent {
    pub fn new(reading: TiltReading, screen_angle: i32) -> Self {
        Self {
            reading,
            screen_angle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    Dropped,
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct SensorSender {
    tx: SyncSender<SensorEvent>,
    dropped: Arc<AtomicU64>,
}

impl SensorSender {
    pub fn try_send(&self, event: SensorEvent) -> SendOutcome {
        match self.tx.try_send(event) {
            Ok(()) => SendOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                SendOutcome::Dropped
            }
            Err(TrySendError::Disconnected(_)) => SendOutcome::Disconnected,
        }
    }
}

#[derive(Debug)]
pub struct SensorReceiver {
    rx: Receiver<SensorEvent>,
    dropped: Arc<AtomicU64>,
    reported_dropped: u64,
}

impl SensorReceiver {
    /// Everything queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<SensorEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }

        let dropped = self.dropped();
        if dropped > self.reported_dropped {
            tracing::warn!(
                dropped = dropped - self.reported_dropped,
                total = dropped,
                "sensor feed overflowed; readings dropped"
            );
            self.reported_dropped = dropped;
        }
        events
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub fn sensor_channel(capacity: usize) -> (SensorSender, SensorReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        SensorSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        SensorReceiver {
            rx,
            dropped,
            reported_dropped: 0,
        },
    )
}
