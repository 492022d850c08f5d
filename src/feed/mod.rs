//! Read-state core of a notification section.
//!
//! - [`pagination`] - first/last/current page boundary reconciliation
//! - [`FeedPageCache`] - id-keyed store of fetched notifications
//! - [`UnreadCounter`] - independent unread badge count
//! - [`ReadMarker`] - best-effort mark-as-read of boundary pages

mod cache;
pub mod pagination;
mod read_marker;
mod types;
mod unread;

pub use cache::FeedPageCache;
pub use pagination::{reconcile, Reconciled};
pub use read_marker::ReadMarker;
pub use types::{
    BoundaryPosition, BoundaryState, FeedPage, NotificationEntity, NotificationId,
    NotificationPayload, PageMeta, ProjectRef, SectionDisplay, SectionIdentity, SectionKey,
    GLOBAL_SECTION_KEY,
};
pub use unread::UnreadCounter;
