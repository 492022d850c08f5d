use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Server-assigned notification id.
///
/// The feed API serializes ids as strings; we keep them opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NotificationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// Notification Entity
// ============================================================================

/// Display data carried by a notification. Opaque to the read-state logic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPayload {
    pub message: String,
    pub url: Option<String>,
    pub source_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A fetched notification.
///
/// Owned by [`FeedPageCache`](crate::feed::FeedPageCache). `delivered` is only
/// ever flipped locally by the [`ReadMarker`](crate::feed::ReadMarker).
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEntity {
    pub id: NotificationId,
    pub delivered: bool,
    /// Page of the fetch that produced this copy of the entity.
    pub source_page: u32,
    pub payload: NotificationPayload,
}

// ============================================================================
// Page Metadata
// ============================================================================

/// Pagination metadata for one fetch, plus the ids it returned in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    /// Total matching items on the server, across all pages.
    pub count: u64,
    pub page_count: u32,
    pub notification_ids: Vec<NotificationId>,
}

impl PageMeta {
    /// Metadata for a response that carried none: the requested page, nothing counted.
    pub fn synthesized(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            count: 0,
            page_count: 0,
            notification_ids: Vec::new(),
        }
    }

    /// 1-based index of the first item on this page.
    pub fn first_item(&self) -> u64 {
        let size = u64::from(self.page_size);
        (u64::from(self.page) * size).saturating_sub(size.saturating_sub(1))
    }

    /// 1-based index of the last item on this page, clamped to `count`.
    pub fn last_item(&self) -> u64 {
        (u64::from(self.page_size) * u64::from(self.page)).min(self.count)
    }
}

/// One page as returned by [`FeedApi::list`](crate::api::FeedApi::list).
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub entities: Vec<NotificationEntity>,
    pub meta: PageMeta,
}

// ============================================================================
// Boundary State
// ============================================================================

/// Which of the two tracked boundaries an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPosition {
    First,
    Last,
}

impl fmt::Display for BoundaryPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryPosition::First => f.write_str("first"),
            BoundaryPosition::Last => f.write_str("last"),
        }
    }
}

/// Earliest, latest and most recent page metadata seen this session.
///
/// `None` is the "no boundary yet" sentinel; all three are `None` until the
/// first fetch is reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryState {
    pub first: Option<PageMeta>,
    pub last: Option<PageMeta>,
    pub current: Option<PageMeta>,
}

impl BoundaryState {
    pub fn get(&self, position: BoundaryPosition) -> Option<&PageMeta> {
        match position {
            BoundaryPosition::First => self.first.as_ref(),
            BoundaryPosition::Last => self.last.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Page count as reported by the latest boundary, used to bound forward paging.
    pub fn page_count(&self) -> Option<u32> {
        self.last.as_ref().map(|m| m.page_count)
    }
}

// ============================================================================
// Section Identity
// ============================================================================

/// Reference to a project whose notifications a section shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRef {
    pub id: String,
    /// URL slug, used only for the header link.
    pub slug: Option<String>,
}

/// What a section is scoped to. Immutable for the controller's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionIdentity {
    Global,
    Project(ProjectRef),
}

/// Key of the global section; also its `section` filter on the feed API.
pub const GLOBAL_SECTION_KEY: &str = "zooniverse";

impl SectionIdentity {
    pub fn project(id: impl Into<String>) -> Self {
        SectionIdentity::Project(ProjectRef {
            id: id.into(),
            slug: None,
        })
    }

    /// Stable key used both as the parent's toggle key and the API section filter.
    pub fn key(&self) -> SectionKey {
        match self {
            SectionIdentity::Global => SectionKey(GLOBAL_SECTION_KEY.to_string()),
            SectionIdentity::Project(p) => SectionKey(format!("project-{}", p.id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionKey(pub String);

impl SectionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display metadata resolved at mount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionDisplay {
    pub name: Option<String>,
    pub avatar_src: Option<String>,
    /// Project slug for the header link; `None` links to the site root.
    pub slug: Option<String>,
}
