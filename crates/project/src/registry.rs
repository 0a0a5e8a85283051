//! Process-wide table of open projects.

use crate::options::ProjectOptions;
use crate::project::{Project, ProjectId};
use dashmap::DashMap;
use misebridge_config::EffectiveSettings;
use misebridge_core::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
pub struct ProjectRegistry {
    projects: DashMap<ProjectId, Arc<Project>>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(
        &self,
        work_dir: impl Into<PathBuf>,
        settings: EffectiveSettings,
        options: ProjectOptions,
    ) -> Result<Arc<Project>> {
        let project = Project::open(work_dir, settings, options)?;
        self.projects.insert(project.id(), Arc::clone(&project));
        debug!(id = %project.id(), open = self.projects.len(), "Project registered");
        Ok(project)
    }

    pub fn get(&self, id: ProjectId) -> Option<Arc<Project>> {
        self.projects.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Dispose and forget one project. Returns whether it was open.
    pub fn dispose(&self, id: ProjectId) -> bool {
        match self.projects.remove(&id) {
            Some((_, project)) => {
                project.dispose();
                true
            }
            None => false,
        }
    }

    pub fn dispose_all(&self) {
        let ids: Vec<ProjectId> = self.projects.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.dispose(id);
        }
    }

    pub fn ids(&self) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self.projects.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
