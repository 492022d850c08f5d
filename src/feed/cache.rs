use super::types::{NotificationEntity, NotificationId};
use std::collections::HashMap;

/// Id-keyed store of every notification fetched this session.
///
/// Later fetches overwrite earlier copies of the same id. Nothing is evicted;
/// the cache lives exactly as long as its section. Ordering is not kept here,
/// callers walk [`PageMeta::notification_ids`](super::PageMeta) instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPageCache {
    entries: HashMap<NotificationId, NotificationEntity>,
}

impl FeedPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a batch of entities by id.
    pub fn merge<I>(&mut self, entities: I)
    where
        I: IntoIterator<Item = NotificationEntity>,
    {
        for entity in entities {
            self.entries.insert(entity.id.clone(), entity);
        }
    }

    pub fn get(&self, id: &NotificationId) -> Option<&NotificationEntity> {
        self.entries.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &NotificationId) -> Option<&mut NotificationEntity> {
        self.entries.get_mut(id)
    }

    /// Resolve an ordered id list to cached entities, skipping unknown ids.
    pub fn resolve<'a>(
        &'a self,
        ids: &'a [NotificationId],
    ) -> impl Iterator<Item = &'a NotificationEntity> + 'a {
        ids.iter().filter_map(move |id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::NotificationPayload;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entity(id: &str, delivered: bool, page: u32) -> NotificationEntity {
        NotificationEntity {
            id: NotificationId::from(id),
            delivered,
            source_page: page,
            payload: NotificationPayload {
                message: format!("message {id}"),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_merge_inserts_new_entities() {
        let mut cache = FeedPageCache::new();
        cache.merge(vec![entity("1", false, 1), entity("2", true, 1)]);
        assert_eq!(cache.len(), 2);
        assert!(!cache.get(&"1".into()).unwrap().delivered);
        assert!(cache.get(&"2".into()).unwrap().delivered);
    }

    #[test]
    fn test_duplicate_id_overwrites() {
        let mut cache = FeedPageCache::new();
        cache.merge(vec![entity("1", false, 1)]);
        cache.merge(vec![entity("1", true, 2)]);
        assert_eq!(cache.len(), 1);
        let cached = cache.get(&"1".into()).unwrap();
        assert!(cached.delivered);
        assert_eq!(cached.source_page, 2);
    }

    #[test]
    fn test_never_evicts_across_pages() {
        let mut cache = FeedPageCache::new();
        for page in 1..=10u32 {
            let batch: Vec<_> = (0..5)
                .map(|i| entity(&format!("{page}-{i}"), false, page))
                .collect();
            cache.merge(batch);
        }
        assert_eq!(cache.len(), 50);
    }

    #[test]
    fn test_resolve_keeps_order_and_skips_unknown() {
        let mut cache = FeedPageCache::new();
        cache.merge(vec![entity("a", false, 1), entity("b", false, 1)]);
        let ids = vec![
            NotificationId::from("b"),
            NotificationId::from("missing"),
            NotificationId::from("a"),
        ];
        let resolved: Vec<_> = cache.resolve(&ids).map(|e| e.id.as_str()).collect();
        assert_eq!(resolved, vec!["b", "a"]);
    }

    proptest! {
        #[test]
        fn prop_merge_is_idempotent(
            items in proptest::collection::vec((0u8..20, any::<bool>(), 1u32..5), 0..30)
        ) {
            let batch: Vec<_> = items
                .iter()
                .map(|(id, delivered, page)| entity(&id.to_string(), *delivered, *page))
                .collect();

            let mut once = FeedPageCache::new();
            once.merge(batch.clone());

            let mut twice = once.clone();
            twice.merge(batch);

            prop_assert_eq!(once, twice);
        }
    }
}
