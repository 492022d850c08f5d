//! Paginated notification sections with boundary-based read tracking.
//!
//! A [`SectionController`] shows one notification feed (global or scoped to a
//! project) page by page. While it is open it remembers the earliest and
//! latest pages seen; closing or tearing it down marks every unread item on
//! those two boundary pages as read. An [`Inbox`] holds several sections and
//! keeps at most one of them open.

pub mod api;
pub mod config;
pub mod feed;
pub mod identity;
pub mod inbox;
pub mod render;
pub mod router;
pub mod section;
pub mod util;

pub use api::{ApiError, FeedApi, HttpApi, ProjectApi};
pub use config::{Config, StaleResponsePolicy};
pub use identity::{CurrentUser, UserIdentity};
pub use inbox::Inbox;
pub use render::SectionView;
pub use router::{MemoryRouter, PageRouter};
pub use section::{SectionController, SectionDeps, SectionSettings, SectionState, SectionToggle};
