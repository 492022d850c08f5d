//! Parent container for a set of sections, at most one of them expanded.
use crate::api::ApiError;
use crate::feed::{NotificationId, SectionKey};
use crate::identity::UserIdentity;
use crate::section::SectionController;
use futures::future::join_all;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Inbox {
    sections: Vec<SectionController>,
}

impl Inbox {
    pub fn new(sections: Vec<SectionController>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &[SectionController] {
        &self.sections
    }

    pub fn section(&self, key: &SectionKey) -> Option<&SectionController> {
        self.sections.iter().find(|s| s.key() == key)
    }

    pub fn section_mut(&mut self, key: &SectionKey) -> Option<&mut SectionController> {
        self.sections.iter_mut().find(|s| s.key() == key)
    }

    pub fn expanded(&self) -> Option<&SectionController> {
        self.sections.iter().find(|s| s.is_expanded())
    }

    pub fn expanded_mut(&mut self) -> Option<&mut SectionController> {
        self.sections.iter_mut().find(|s| s.is_expanded())
    }

    /// Mount every section concurrently.
    pub async fn mount_all(&mut self) {
        join_all(self.sections.iter_mut().map(|s| s.mount())).await;
    }

    /// Toggle one section, collapsing whichever other section was open first.
    ///
    /// Returns `false` if no section has `key`.
    pub async fn toggle(&mut self, key: &SectionKey) -> Result<bool, ApiError> {
        let Some(target) = self.sections.iter().position(|s| s.key() == key) else {
            tracing::warn!(section = %key, "Toggle for unknown section");
            return Ok(false);
        };

        if self.sections[target].is_expanded() {
            self.sections[target].collapse();
            return Ok(true);
        }

        for (i, section) in self.sections.iter_mut().enumerate() {
            if i != target && section.is_expanded() {
                section.collapse();
            }
        }
        self.sections[target].expand().await?;
        Ok(true)
    }

    /// Switch the signed-in user on every section.
    ///
    /// Sections usually share one user slot, so only the first to see the
    /// switch detects a change; the expanded one goes first so it re-fetches.
    pub async fn change_user(&mut self, user: Option<Arc<UserIdentity>>) -> Result<(), ApiError> {
        let expanded = self.sections.iter().position(|s| s.is_expanded());
        let order = expanded
            .into_iter()
            .chain((0..self.sections.len()).filter(|&i| Some(i) != expanded));

        let mut result = Ok(());
        for i in order {
            if let Err(e) = self.sections[i].change_user(user.clone()).await {
                result = Err(e);
            }
        }
        result
    }

    /// Unmount every section; returns all ids a read write was issued for.
    pub fn unmount(self) -> Vec<NotificationId> {
        self.sections
            .into_iter()
            .flat_map(SectionController::unmount)
            .collect()
    }
}
