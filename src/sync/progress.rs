use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Running,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Starting,
    Authenticating,
    Gallery,
    Photos,
    Saving,
    Done,
}

/// Snapshot of a running sync, sent as one SSE frame.
///
/// `totalPhotos` and `currentPhotoIndex` count across all galleries of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub status: SyncStatus,
    pub phase: SyncPhase,
    pub total_galleries: usize,
    pub current_gallery_index: usize,
    pub current_gallery_name: Option<String>,
    pub total_photos: u64,
    pub current_photo_index: u64,
    pub current_photo_name: Option<String>,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub albums: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<u64>,
}

impl SyncProgress {
    pub fn pending() -> Self {
        Self {
            status: SyncStatus::Pending,
            phase: SyncPhase::Starting,
            total_galleries: 0,
            current_gallery_index: 0,
            current_gallery_name: None,
            total_photos: 0,
            current_photo_index: 0,
            current_photo_name: None,
            message: "Waiting to start".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            albums: None,
            photos: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SyncStatus::Completed | SyncStatus::Error)
    }

    pub(crate) fn step(&mut self, phase: SyncPhase, message: impl Into<String>) {
        self.status = SyncStatus::Running;
        self.phase = phase;
        self.message = message.into();
    }

    pub(crate) fn enter_gallery(&mut self, index: usize, name: &str) {
        self.current_gallery_index = index + 1;
        self.current_gallery_name = Some(name.to_string());
        self.current_photo_name = None;
        self.step(
            SyncPhase::Gallery,
            format!(
                "Syncing gallery {} of {}: {name}",
                index + 1,
                self.total_galleries
            ),
        );
    }

    pub(crate) fn photos_found(&mut self, count: usize) {
        self.total_photos += count as u64;
        self.step(SyncPhase::Photos, format!("Found {count} photos"));
    }

    pub(crate) fn photo_started(&mut self, name: &str) {
        self.current_photo_name = Some(name.to_string());
        self.step(
            SyncPhase::Photos,
            format!(
                "Processing photo {} of {}",
                self.current_photo_index + 1,
                self.total_photos
            ),
        );
    }

    pub(crate) fn photo_finished(&mut self) {
        self.current_photo_index += 1;
        self.step(
            SyncPhase::Photos,
            format!(
                "Processed photo {} of {}",
                self.current_photo_index, self.total_photos
            ),
        );
    }

    pub(crate) fn complete(&mut self, albums: u64, photos: u64) {
        self.status = SyncStatus::Completed;
        self.phase = SyncPhase::Done;
        self.message = format!("Synced {albums} albums with {photos} photos");
        self.completed_at = Some(Utc::now());
        self.albums = Some(albums);
        self.photos = Some(photos);
    }

    pub(crate) fn fail(&mut self, public_message: &str) {
        self.status = SyncStatus::Error;
        self.phase = SyncPhase::Done;
        self.message = public_message.to_string();
        self.error = Some(public_message.to_string());
        self.completed_at = Some(Utc::now());
    }
}

/// Sending half of a run's progress channel.
///
/// Intermediate frames are dropped when the buffer is full or the receiver is gone; the
/// terminal frame waits for capacity.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Option<mpsc::Sender<SyncProgress>>,
}

impl ProgressSender {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncProgress>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender that discards everything.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, progress: &SyncProgress) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(progress.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                trace!(message = %progress.message, "progress buffer full, frame dropped");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    pub async fn finish(&self, progress: SyncProgress) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(progress).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_buffer_drops_intermediate_but_keeps_terminal() {
        let (sender, mut rx) = ProgressSender::channel(2);
        let mut p = SyncProgress::pending();
        for i in 0..5 {
            p.step(SyncPhase::Photos, format!("frame {i}"));
            sender.report(&p);
        }

        let finisher = {
            let sender = sender.clone();
            let mut done = p.clone();
            done.complete(1, 5);
            tokio::spawn(async move { sender.finish(done).await })
        };

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            let terminal = frame.is_terminal();
            frames.push(frame);
            if terminal {
                break;
            }
        }
        finisher.await.unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].message, "frame 0");
        assert_eq!(frames[1].message, "frame 1");
        assert_eq!(frames[2].status, SyncStatus::Completed);
    }

    #[tokio::test]
    async fn closed_receiver_never_fails_the_sender() {
        let (sender, rx) = ProgressSender::channel(1);
        drop(rx);
        let p = SyncProgress::pending();
        sender.report(&p);
        sender.finish(p).await;
        ProgressSender::detached().report(&SyncProgress::pending());
    }

    #[test]
    fn frames_serialize_camel_case() {
        let mut p = SyncProgress::pending();
        p.total_galleries = 2;
        p.enter_gallery(0, "Iceland");
        p.photos_found(3);
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["status"], "running");
        assert_eq!(v["phase"], "photos");
        assert_eq!(v["totalGalleries"], 2);
        assert_eq!(v["currentGalleryIndex"], 1);
        assert_eq!(v["currentGalleryName"], "Iceland");
        assert_eq!(v["totalPhotos"], 3);
        assert!(v.get("error").is_none());

        p.fail("Sync failed.");
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["error"], "Sync failed.");
    }
}
