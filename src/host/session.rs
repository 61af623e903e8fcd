use crate::host::EditSession;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

/// Editing-session bracket for the CLI host.
///
/// There is no asset importer running next to the CLI, so the bracket only
/// records when the batch started and how long it took.
#[derive(Default)]
pub struct AssetEditSession {
    started: Mutex<Option<Instant>>,
}

impl AssetEditSession {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.started
            .lock()
            .map(|started| started.is_some())
            .unwrap_or(false)
    }
}

impl EditSession for AssetEditSession {
    fn begin_batch_edit(&self) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        debug!("Asset editing session started");
    }

    fn end_batch_edit(&self) {
        let started = self.started.lock().ok().and_then(|mut started| started.take());
        match started {
            Some(at) => info!(
                "Asset editing session finished after {} ms",
                at.elapsed().as_millis()
            ),
            None => debug!("Asset editing session ended without a start"),
        }
    }
}
