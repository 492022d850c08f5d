use super::cache::FeedPageCache;
use super::types::{BoundaryPosition, BoundaryState, NotificationId};
use crate::api::{FeedApi, NotificationPatch};
use std::sync::Arc;

/// Marks the notifications of a boundary page as read.
///
/// Writes are detached tasks: one `update` per unread entity, never awaited,
/// never retried, failures only logged. The local cache copy is flipped to
/// delivered immediately so a second pass over the same page issues nothing.
pub struct ReadMarker {
    feed: Arc<dyn FeedApi>,
}

impl ReadMarker {
    pub fn new(feed: Arc<dyn FeedApi>) -> Self {
        Self { feed }
    }

    /// Mark every still-unread entity of `boundary[position]`.
    ///
    /// Returns the ids a write was issued for. An unset boundary, or one whose
    /// entities are all delivered, is a no-op.
    pub fn mark_boundary(
        &self,
        position: BoundaryPosition,
        boundary: &BoundaryState,
        cache: &mut FeedPageCache,
    ) -> Vec<NotificationId> {
        let Some(meta) = boundary.get(position) else {
            return Vec::new();
        };

        let unread: Vec<NotificationId> = cache
            .resolve(&meta.notification_ids)
            .filter(|e| !e.delivered)
            .map(|e| e.id.clone())
            .collect();

        if unread.is_empty() {
            return unread;
        }

        // Teardown can run after the runtime is gone; with nowhere to send the
        // writes, leave the local state as it was.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                %position,
                pending = unread.len(),
                "No async runtime available, skipping mark-as-read"
            );
            return Vec::new();
        };

        for id in &unread {
            if let Some(entity) = cache.get_mut(id) {
                entity.delivered = true;
            }

            let feed = Arc::clone(&self.feed);
            let id = id.clone();
            handle.spawn(async move {
                if let Err(e) = feed.update(&id, NotificationPatch { delivered: true }).await {
                    tracing::debug!(notification = %id, error = %e, "Mark-as-read write dropped");
                }
            });
        }

        tracing::debug!(%position, page = meta.page, marked = unread.len(), "Marked boundary page read");
        unread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ListQuery, MockApi};
    use crate::feed::pagination::reconcile;
    use crate::feed::{FeedPage, SectionIdentity};
    use pretty_assertions::assert_eq;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    async fn load(api: &MockApi, page: u32) -> FeedPage {
        api.list(ListQuery {
            section: SectionIdentity::Global.key(),
            page,
            page_size: 5,
            delivered: None,
        })
        .await
        .unwrap()
    }

    async fn fixture(unread: usize) -> (Arc<MockApi>, BoundaryState, FeedPageCache) {
        let api = Arc::new(MockApi::new().with_unread(&SectionIdentity::Global.key(), unread));
        let mut boundary = BoundaryState::default();
        let mut cache = FeedPageCache::new();
        let page = load(&api, 1).await;
        cache.merge(page.entities);
        reconcile(&mut boundary, page.meta);
        api.clear_calls();
        (api, boundary, cache)
    }

    #[tokio::test]
    async fn test_marks_each_unread_entity_once() {
        let (api, boundary, mut cache) = fixture(12).await;
        let marker = ReadMarker::new(api.clone());

        let marked = marker.mark_boundary(BoundaryPosition::First, &boundary, &mut cache);
        assert_eq!(marked.len(), 5);
        settle().await;

        let mut written = api.updated_ids();
        written.sort();
        let mut expected = marked.clone();
        expected.sort();
        assert_eq!(written, expected);
        assert!(marked.iter().all(|id| cache.get(id).unwrap().delivered));
    }

    #[tokio::test]
    async fn test_second_pass_is_noop() {
        let (api, boundary, mut cache) = fixture(5).await;
        let marker = ReadMarker::new(api.clone());

        marker.mark_boundary(BoundaryPosition::First, &boundary, &mut cache);
        let again = marker.mark_boundary(BoundaryPosition::Last, &boundary, &mut cache);
        settle().await;

        assert!(again.is_empty());
        assert_eq!(api.updated_ids().len(), 5);
    }

    #[tokio::test]
    async fn test_skips_already_delivered() {
        let (api, boundary, mut cache) = fixture(5).await;
        let delivered = NotificationId::from("zooniverse-2");
        cache.get_mut(&delivered).unwrap().delivered = true;

        let marker = ReadMarker::new(api.clone());
        let marked = marker.mark_boundary(BoundaryPosition::First, &boundary, &mut cache);
        settle().await;

        assert_eq!(marked.len(), 4);
        assert!(!api.updated_ids().contains(&delivered));
    }

    #[tokio::test]
    async fn test_unset_boundary_is_noop() {
        let api = Arc::new(MockApi::new());
        let marker = ReadMarker::new(api.clone());
        let mut cache = FeedPageCache::new();

        let marked = marker.mark_boundary(BoundaryPosition::Last, &BoundaryState::default(), &mut cache);
        settle().await;

        assert!(marked.is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_write_failures_are_swallowed() {
        let (api, boundary, mut cache) = fixture(3).await;
        api.set_update_error(Some(ApiError::HttpStatus(500)));
        let marker = ReadMarker::new(api.clone());

        let marked = marker.mark_boundary(BoundaryPosition::First, &boundary, &mut cache);
        settle().await;

        assert_eq!(marked.len(), 3);
        // One attempt each, no retries
        assert_eq!(api.updated_ids().len(), 3);
    }

    #[test]
    fn test_without_runtime_issues_nothing() {
        let api = Arc::new(MockApi::new());
        let marker = ReadMarker::new(api.clone());
        let mut cache = FeedPageCache::new();
        let mut boundary = BoundaryState::default();
        cache.merge(vec![crate::feed::NotificationEntity {
            id: "x".into(),
            delivered: false,
            source_page: 1,
            payload: Default::default(),
        }]);
        reconcile(
            &mut boundary,
            crate::feed::PageMeta {
                page: 1,
                page_size: 5,
                count: 1,
                page_count: 1,
                notification_ids: vec!["x".into()],
            },
        );

        let marked = marker.mark_boundary(BoundaryPosition::First, &boundary, &mut cache);
        assert!(marked.is_empty());
        assert!(!cache.get(&"x".into()).unwrap().delivered);
    }
}
