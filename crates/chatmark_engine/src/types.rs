use std::path::PathBuf;
use std::sync::mpsc;

use thiserror::Error;

use crate::persist::PersistError;

/// Coarse phase of the export pipeline, attached to progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Recovering,
    Building,
    Writing,
}

/// Human-readable progress for the trigger surface. Advisory only, never
/// machine-parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportProgress {
    pub stage: Stage,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Progress(ExportProgress),
    Completed {
        artifact: PathBuf,
        message_count: usize,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ExportEvent);
}

/// Sink backed by an mpsc channel, for callers that surface progress on a
/// separate thread.
pub struct ChannelProgressSink {
    tx: mpsc::Sender<ExportEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<ExportEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ExportEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: ExportEvent) {}
}

/// Failure talking to the live page surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page snapshot unavailable: {0}")]
    Snapshot(String),
}

/// Failure of one end-to-end export. Per-message conversion problems never
/// surface here; they degrade to skipped messages inside the converter.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("an export is already in flight")]
    AlreadyRunning,
    #[error("unsupported chat host: {host}")]
    UnsupportedPlatform { host: String },
    #[error("invalid platform profile: {0}")]
    InvalidProfile(String),
    #[error("page error: {0}")]
    Page(#[from] PageError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}
