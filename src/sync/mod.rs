//! Lightroom → local database sync pipeline.

pub mod gallery_loader;
pub mod mapping;
pub mod media;
pub mod progress;
pub mod registry;
pub mod service;

pub use media::MediaStore;
pub use progress::{ProgressSender, SyncPhase, SyncProgress, SyncStatus};
pub use registry::{RunGuard, RunRegistry};
pub use service::{Renditions, SyncService, SyncSummary};
