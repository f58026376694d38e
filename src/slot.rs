use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::collaborator::GenerativeCollaborator;
use crate::error::Result;
use crate::insights::request_attendance_insights;
use crate::models::{AttendanceRecord, InsightResult};

/// Latest insight result plus the in-flight flag that gates re-submission.
#[derive(Clone, Default)]
pub struct InsightSlot {
    latest: Arc<RwLock<Option<InsightResult>>>,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when dropped.
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl InsightSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a request as in flight, or returns `None` if one already is.
    pub fn begin(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                busy: self.busy.clone(),
            })
    }

    pub async fn publish(&self, result: InsightResult) {
        *self.latest.write().await = Some(result);
    }

    pub async fn current(&self) -> Option<InsightResult> {
        self.latest.read().await.clone()
    }

    /// Runs one request and publishes its result. A failure keeps the previous value.
    pub async fn refresh(
        &self,
        collaborator: &dyn GenerativeCollaborator,
        records: &[AttendanceRecord],
        class_descriptor: &str,
    ) -> Result<InsightResult> {
        let result = request_attendance_insights(collaborator, records, class_descriptor).await?;
        self.publish(result.clone()).await;
        debug!("insight slot updated");
        Ok(result)
    }
}
