use crate::agents::ProjectInfo;
use crate::host::{
    AssetEditSession, EditSession, ManifestRegistry, ProgressReporter, RegistryClient,
    TerminalProgress,
};
use std::sync::Arc;

/// The collaborators a relocation batch talks to.
pub struct HostServices {
    pub registry: Arc<dyn RegistryClient>,
    pub session: Arc<dyn EditSession>,
    pub progress: Arc<dyn ProgressReporter>,
}

pub struct HostFactory;

impl HostFactory {
    pub fn create_cli(project: &ProjectInfo, show_progress: bool) -> HostServices {
        HostServices {
            registry: Arc::new(ManifestRegistry::new(
                &project.manifest_path,
                &project.lock_path,
            )),
            session: Arc::new(AssetEditSession::new()),
            progress: Arc::new(TerminalProgress::new(!show_progress)),
        }
    }
}
