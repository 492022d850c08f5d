//! In-memory feed and project API for tests.
//!
//! Behaves like a small server: notifications are held per section in
//! newest-first order, `list` paginates them, `update` persists the patch.
//! Every call is recorded and failures can be injected.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{ApiError, FeedApi, ListQuery, NotificationPatch, ProjectApi, ProjectMeta};
use crate::feed::{
    FeedPage, NotificationEntity, NotificationId, NotificationPayload, PageMeta, SectionKey,
};

/// A recorded call to the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    List(ListQuery),
    Update(NotificationId, NotificationPatch),
    GetProject(String),
}

pub struct MockApi {
    sections: Mutex<HashMap<SectionKey, Vec<NotificationEntity>>>,
    projects: Mutex<HashMap<String, ProjectMeta>>,
    calls: Mutex<Vec<MockCall>>,
    list_error: Mutex<Option<ApiError>>,
    update_error: Mutex<Option<ApiError>>,
    project_error: Mutex<Option<ApiError>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            sections: Mutex::new(HashMap::new()),
            projects: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            list_error: Mutex::new(None),
            update_error: Mutex::new(None),
            project_error: Mutex::new(None),
        }
    }

    /// Seed `count` unread notifications for a section, ids `{key}-1..={count}`.
    pub fn with_unread(self, section: &SectionKey, count: usize) -> Self {
        let entities = (1..=count)
            .map(|i| NotificationEntity {
                id: NotificationId(format!("{section}-{i}")),
                delivered: false,
                source_page: 0,
                payload: NotificationPayload {
                    message: format!("Notification {i}"),
                    ..Default::default()
                },
            })
            .collect();
        locked(&self.sections).insert(section.clone(), entities);
        self
    }

    /// Seed an explicit notification list for a section.
    pub fn with_notifications(self, section: &SectionKey, entities: Vec<NotificationEntity>) -> Self {
        locked(&self.sections).insert(section.clone(), entities);
        self
    }

    pub fn with_project(self, id: &str, meta: ProjectMeta) -> Self {
        locked(&self.projects).insert(id.to_string(), meta);
        self
    }

    /// Make every subsequent `list` fail with `err` (or succeed again with `None`).
    pub fn set_list_error(&self, err: Option<ApiError>) {
        *locked(&self.list_error) = err;
    }

    pub fn set_update_error(&self, err: Option<ApiError>) {
        *locked(&self.update_error) = err;
    }

    pub fn set_project_error(&self, err: Option<ApiError>) {
        *locked(&self.project_error) = err;
    }

    /// Flip the server-side delivered flag without going through `update`.
    pub fn set_delivered(&self, id: &NotificationId, delivered: bool) {
        for entities in locked(&self.sections).values_mut() {
            if let Some(e) = entities.iter_mut().find(|e| &e.id == id) {
                e.delivered = delivered;
            }
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        locked(&self.calls).clone()
    }

    pub fn list_calls(&self) -> Vec<ListQuery> {
        locked(&self.calls)
            .iter()
            .filter_map(|c| match c {
                MockCall::List(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids passed to `update`, in call order.
    pub fn updated_ids(&self) -> Vec<NotificationId> {
        locked(&self.calls)
            .iter()
            .filter_map(|c| match c {
                MockCall::Update(id, _) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        locked(&self.calls).clear();
    }

    fn record(&self, call: MockCall) {
        locked(&self.calls).push(call);
    }
}

#[async_trait]
impl FeedApi for MockApi {
    async fn list(&self, query: ListQuery) -> Result<FeedPage, ApiError> {
        self.record(MockCall::List(query.clone()));
        if let Some(err) = locked(&self.list_error).clone() {
            return Err(err);
        }

        let sections = locked(&self.sections);
        let matching: Vec<&NotificationEntity> = sections
            .get(&query.section)
            .map(|all| {
                all.iter()
                    .filter(|e| query.delivered.map_or(true, |d| e.delivered == d))
                    .collect()
            })
            .unwrap_or_default();

        let size = query.page_size.max(1) as usize;
        let count = matching.len();
        let page_count = count.div_ceil(size) as u32;
        let start = (query.page.saturating_sub(1) as usize).saturating_mul(size);

        let entities: Vec<NotificationEntity> = matching
            .into_iter()
            .skip(start)
            .take(size)
            .map(|e| NotificationEntity {
                source_page: query.page,
                ..e.clone()
            })
            .collect();

        let meta = PageMeta {
            page: query.page,
            page_size: query.page_size,
            count: count as u64,
            page_count,
            notification_ids: entities.iter().map(|e| e.id.clone()).collect(),
        };
        Ok(FeedPage { entities, meta })
    }

    async fn update(
        &self,
        id: &NotificationId,
        patch: NotificationPatch,
    ) -> Result<NotificationEntity, ApiError> {
        self.record(MockCall::Update(id.clone(), patch));
        if let Some(err) = locked(&self.update_error).clone() {
            return Err(err);
        }

        let mut sections = locked(&self.sections);
        sections
            .values_mut()
            .flat_map(|entities| entities.iter_mut())
            .find(|e| &e.id == id)
            .map(|e| {
                e.delivered = patch.delivered;
                e.clone()
            })
            .ok_or_else(|| ApiError::NotFound(format!("notification {id}")))
    }
}

#[async_trait]
impl ProjectApi for MockApi {
    async fn get_project(&self, project_id: &str) -> Result<ProjectMeta, ApiError> {
        self.record(MockCall::GetProject(project_id.to_string()));
        if let Some(err) = locked(&self.project_error).clone() {
            return Err(err);
        }
        locked(&self.projects)
            .get(project_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("project {project_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::SectionIdentity;

    fn query(section: &SectionKey, page: u32, page_size: u32, delivered: Option<bool>) -> ListQuery {
        ListQuery {
            section: section.clone(),
            page,
            page_size,
            delivered,
        }
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let key = SectionIdentity::Global.key();
        let api = MockApi::new().with_unread(&key, 12);

        let page = api.list(query(&key, 3, 5, None)).await.unwrap();
        assert_eq!(page.entities.len(), 2);
        assert_eq!(page.meta.count, 12);
        assert_eq!(page.meta.page_count, 3);
        assert_eq!(page.meta.notification_ids[0].as_str(), "zooniverse-11");
        assert!(page.entities.iter().all(|e| e.source_page == 3));
    }

    #[tokio::test]
    async fn test_update_persists_and_filters() {
        let key = SectionIdentity::Global.key();
        let api = MockApi::new().with_unread(&key, 3);

        api.update(&"zooniverse-1".into(), NotificationPatch { delivered: true })
            .await
            .unwrap();

        let unread = api.list(query(&key, 1, 1, Some(false))).await.unwrap();
        assert_eq!(unread.meta.count, 2);
        assert_eq!(api.updated_ids(), vec![NotificationId::from("zooniverse-1")]);
    }

    #[tokio::test]
    async fn test_injected_list_error() {
        let key = SectionIdentity::Global.key();
        let api = MockApi::new().with_unread(&key, 3);
        api.set_list_error(Some(ApiError::HttpStatus(502)));
        assert_eq!(
            api.list(query(&key, 1, 5, None)).await.unwrap_err(),
            ApiError::HttpStatus(502)
        );
    }

    #[tokio::test]
    async fn test_unknown_project_not_found() {
        let api = MockApi::new();
        assert!(matches!(
            api.get_project("99").await,
            Err(ApiError::NotFound(_))
        ));
    }
}
