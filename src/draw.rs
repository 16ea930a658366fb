//! Frame output for renderers and recorders
//!
//! The simulation never waits on a drawer. [`ChannelDrawer`] hands frames to
//! another thread through a bounded channel and drops them when it is full.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::sim::{Body, ObjectId};

/// What a renderer needs to know about one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawable {
    pub id: ObjectId,
    pub position: DVec3,
    pub radius: f64,
    pub texture: String,
}

impl Drawable {
    pub fn new(body: &Body, texture: &str) -> Self {
        Self {
            id: body.id(),
            position: body.position(),
            radius: body.radius(),
            texture: texture.to_string(),
        }
    }
}

/// A sampled view of the match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub tick: u64,
    /// Simulated seconds
    pub sim_time: f64,
    pub scores: BTreeMap<String, f64>,
    /// Objects appearing for the first time
    pub new: Vec<Drawable>,
    /// Objects already sent in an earlier frame
    pub updated: Vec<Drawable>,
    /// Objects removed since the previous frame
    pub deleted: Vec<ObjectId>,
}

/// Receives frames every `frame_rate` ticks
pub trait Drawer: Send {
    fn draw(&mut self, frame: Frame);
}

/// Sends frames over a bounded channel, dropping them when the reader lags
#[derive(Debug)]
pub struct ChannelDrawer {
    tx: SyncSender<Frame>,
    dropped: u64,
    disconnected: bool,
}

impl ChannelDrawer {
    /// A drawer and the receiving end for another thread
    pub fn new(capacity: usize) -> (Self, FrameReceiver) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        let drawer = Self {
            tx,
            dropped: 0,
            disconnected: false,
        };
        (drawer, FrameReceiver { rx })
    }

    /// Frames discarded because the channel was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Drawer for ChannelDrawer {
    fn draw(&mut self, frame: Frame) {
        if self.disconnected {
            return;
        }
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(frame)) => {
                self.dropped += 1;
                log::debug!("dropped frame for tick {} ({} total)", frame.tick, self.dropped);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.disconnected = true;
                log::warn!("frame receiver disconnected, no more frames will be sent");
            }
        }
    }
}

/// Receiving end of a [`ChannelDrawer`]
#[derive(Debug)]
pub struct FrameReceiver {
    rx: Receiver<Frame>,
}

impl FrameReceiver {
    pub fn try_recv(&self) -> Option<Frame> {
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Every frame currently buffered
    pub fn drain(&self) -> Vec<Frame> {
        self.rx.try_iter().collect()
    }

    /// Block for the next frame; `None` once the drawer is gone
    pub fn recv(&self) -> Option<Frame> {
        self.rx.recv().ok()
    }
}
