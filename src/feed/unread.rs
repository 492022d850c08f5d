use super::types::SectionIdentity;
use crate::api::{ApiError, FeedApi, ListQuery};

/// Unread badge count for a section, fetched independently of paging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadCounter {
    count: u64,
}

impl UnreadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Ask the server how many undelivered notifications the section has.
    ///
    /// Issues a single-item listing filtered to `delivered = false` and takes
    /// the reported total. A listing with no item means zero. On failure the
    /// previous count is left untouched.
    pub async fn refresh(
        &mut self,
        feed: &dyn FeedApi,
        scope: &SectionIdentity,
    ) -> Result<u64, ApiError> {
        let query = ListQuery {
            section: scope.key(),
            page: 1,
            page_size: 1,
            delivered: Some(false),
        };

        let page = feed.list(query).await?;
        self.count = if page.entities.is_empty() {
            0
        } else {
            page.meta.count
        };

        tracing::debug!(section = %scope.key(), unread = self.count, "Refreshed unread count");
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;
    use crate::feed::NotificationId;

    #[tokio::test]
    async fn test_refresh_reports_server_count() {
        let scope = SectionIdentity::Global;
        let api = MockApi::new().with_unread(&scope.key(), 7);
        let mut counter = UnreadCounter::new();

        assert_eq!(counter.refresh(&api, &scope).await.unwrap(), 7);
        assert_eq!(counter.count(), 7);

        let calls = api.list_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].page_size, 1);
        assert_eq!(calls[0].delivered, Some(false));
    }

    #[tokio::test]
    async fn test_refresh_to_zero_when_all_read() {
        let scope = SectionIdentity::project("5");
        let api = MockApi::new().with_unread(&scope.key(), 2);
        let mut counter = UnreadCounter::new();
        counter.refresh(&api, &scope).await.unwrap();
        assert_eq!(counter.count(), 2);

        api.set_delivered(&NotificationId::from("project-5-1"), true);
        api.set_delivered(&NotificationId::from("project-5-2"), true);
        assert_eq!(counter.refresh(&api, &scope).await.unwrap(), 0);
        assert_eq!(counter.count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_count() {
        let scope = SectionIdentity::Global;
        let api = MockApi::new().with_unread(&scope.key(), 4);
        let mut counter = UnreadCounter::new();
        counter.refresh(&api, &scope).await.unwrap();

        api.set_list_error(Some(ApiError::Timeout));
        assert_eq!(counter.refresh(&api, &scope).await, Err(ApiError::Timeout));
        assert_eq!(counter.count(), 4);
    }
}
