//! Project resolver: build-once lookup of projects by id.

use std::collections::HashMap;

use crate::contract::ProjectRecord;

/// Coordinates needed to address a repository on the coverage service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoute<'a> {
    pub provider: &'a str,
    pub owner: &'a str,
    pub repo: &'a str,
}

#[derive(Debug, Default)]
pub struct ProjectIndex {
    by_id: HashMap<i64, ProjectRecord>,
}

impl ProjectIndex {
    /// Index `projects` by id. When ids repeat, the first record wins.
    pub fn build<I>(projects: I) -> Self
    where
        I: IntoIterator<Item = ProjectRecord>,
    {
        let mut by_id = HashMap::new();
        for project in projects {
            by_id.entry(project.project_id).or_insert(project);
        }
        Self { by_id }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, project_id: i64) -> Option<&ProjectRecord> {
        self.by_id.get(&project_id)
    }

    /// Looks up a commit's project; a commit without a project id never matches.
    pub fn resolve(&self, project_id: Option<i64>) -> Option<&ProjectRecord> {
        project_id.and_then(|id| self.get(id))
    }
}

impl ProjectRecord {
    /// Provider, owner and repo, if all three are present.
    pub fn route(&self) -> Option<ProjectRoute<'_>> {
        Some(ProjectRoute {
            provider: self.provider.as_deref()?,
            owner: self.owner.as_deref()?,
            repo: self.repo_name.as_deref()?,
        })
    }
}
