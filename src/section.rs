//! One collapsible notification feed, global or project-scoped.
//!
//! The controller owns its boundary state and page cache exclusively and
//! drives them from expand/collapse and page-change events:
//!
//! ```text
//! Collapsed --expand--> Expanded(1)      router page := 1, load page 1
//! Expanded(p) --page change--> Expanded(p')  load p'
//! Expanded(p) --collapse--> Collapsed    mark first + last boundaries read
//! any --unmount--> (consumed)            mark first + last boundaries read
//! ```
//!
//! Loading a page is a two-stage pipeline: the page fetch is applied first
//! (reconcile + merge), and only then is the unread count refreshed, so the
//! badge always reflects the post-fetch server state.
//!
//! Page fetches are split into [`SectionController::request_page`],
//! [`PageRequest::send`] and [`SectionController::apply_page`] so callers can
//! keep several fetches in flight. Each request carries a generation number;
//! what happens to a response that arrives after a newer one is decided by
//! [`StaleResponsePolicy`].

use crate::api::{ApiError, FeedApi, ListQuery, ProjectApi};
use crate::config::{Config, StaleResponsePolicy};
use crate::feed::{
    reconcile, BoundaryPosition, BoundaryState, FeedPage, FeedPageCache, NotificationEntity,
    NotificationId, ReadMarker, Reconciled, SectionDisplay, SectionIdentity, SectionKey,
    UnreadCounter,
};
use crate::identity::{CurrentUser, UserIdentity};
use crate::router::PageRouter;
use std::sync::Arc;
use tokio::sync::mpsc;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Collapsed,
    Expanded { page: u32 },
}

/// Sent to the parent container whenever a section opens or closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionToggle {
    pub key: SectionKey,
    pub expanded: bool,
}

/// Remote collaborators a section talks to.
#[derive(Clone)]
pub struct SectionDeps {
    pub feed: Arc<dyn FeedApi>,
    pub projects: Arc<dyn ProjectApi>,
    pub router: Arc<dyn PageRouter>,
}

#[derive(Debug, Clone)]
pub struct SectionSettings {
    pub page_size: u32,
    pub stale_responses: StaleResponsePolicy,
    pub global_name: String,
}

impl Default for SectionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SectionSettings {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size.max(1),
            stale_responses: config.stale_responses,
            global_name: config.global_section_name.clone(),
        }
    }
}

/// Outcome of [`SectionController::apply_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageApplied {
    Applied(Reconciled),
    /// Dropped because a newer response was already applied.
    Discarded,
}

/// An issued page fetch, detached from the controller so it can be awaited
/// while other requests are in flight.
pub struct PageRequest {
    feed: Arc<dyn FeedApi>,
    query: ListQuery,
    generation: u64,
}

impl PageRequest {
    pub fn page(&self) -> u32 {
        self.query.page
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn send(self) -> PageResponse {
        let result = self.feed.list(self.query.clone()).await;
        PageResponse {
            page: self.query.page,
            generation: self.generation,
            result,
        }
    }
}

pub struct PageResponse {
    pub page: u32,
    pub generation: u64,
    pub result: Result<FeedPage, ApiError>,
}

// ============================================================================
// Controller
// ============================================================================

pub struct SectionController {
    identity: SectionIdentity,
    key: SectionKey,
    deps: SectionDeps,
    settings: SectionSettings,
    marker: ReadMarker,
    user: CurrentUser,
    parent: Option<mpsc::UnboundedSender<SectionToggle>>,

    state: SectionState,
    display: SectionDisplay,
    boundary: BoundaryState,
    cache: FeedPageCache,
    unread: UnreadCounter,
    error: Option<ApiError>,

    next_generation: u64,
    newest_applied: Option<u64>,
}

impl SectionController {
    /// Create a collapsed section. The global section's display name is known
    /// immediately; a project's is resolved by [`mount`](Self::mount).
    ///
    /// Pass the same [`CurrentUser`] the transport reads its token from so
    /// that [`change_user`](Self::change_user) reaches both.
    pub fn new(
        identity: SectionIdentity,
        deps: SectionDeps,
        settings: SectionSettings,
        user: impl Into<CurrentUser>,
    ) -> Self {
        let display = match &identity {
            SectionIdentity::Global => SectionDisplay {
                name: Some(settings.global_name.clone()),
                ..Default::default()
            },
            SectionIdentity::Project(project) => SectionDisplay {
                slug: project.slug.clone(),
                ..Default::default()
            },
        };

        Self {
            key: identity.key(),
            identity,
            marker: ReadMarker::new(Arc::clone(&deps.feed)),
            deps,
            settings,
            user: user.into(),
            parent: None,
            state: SectionState::Collapsed,
            display,
            boundary: BoundaryState::default(),
            cache: FeedPageCache::new(),
            unread: UnreadCounter::new(),
            error: None,
            next_generation: 0,
            newest_applied: None,
        }
    }

    pub fn with_parent(mut self, parent: mpsc::UnboundedSender<SectionToggle>) -> Self {
        self.parent = Some(parent);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn key(&self) -> &SectionKey {
        &self.key
    }

    pub fn identity(&self) -> &SectionIdentity {
        &self.identity
    }

    pub fn state(&self) -> SectionState {
        self.state
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self.state, SectionState::Expanded { .. })
    }

    pub fn display(&self) -> &SectionDisplay {
        &self.display
    }

    pub fn boundary(&self) -> &BoundaryState {
        &self.boundary
    }

    pub fn cache(&self) -> &FeedPageCache {
        &self.cache
    }

    pub fn unread_count(&self) -> u64 {
        self.unread.count()
    }

    /// Last transport error, kept until the next successful page load.
    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn user(&self) -> Option<Arc<UserIdentity>> {
        self.user.get()
    }

    /// Notifications of the most recently applied page, in server order.
    pub fn current_notifications(&self) -> Vec<&NotificationEntity> {
        match &self.boundary.current {
            Some(meta) => self.cache.resolve(&meta.notification_ids).collect(),
            None => Vec::new(),
        }
    }

    pub fn has_next_page(&self) -> bool {
        match (self.state, self.boundary.page_count()) {
            (SectionState::Expanded { page }, Some(count)) => page < count,
            _ => false,
        }
    }

    pub fn has_previous_page(&self) -> bool {
        matches!(self.state, SectionState::Expanded { page } if page > 1)
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Resolve display metadata and fetch the initial unread count.
    ///
    /// Failures land in the error slot; the section stays usable either way.
    pub async fn mount(&mut self) {
        let _ = self.resolve_display().await;
        let _ = self.refresh_unread().await;
    }

    pub async fn resolve_display(&mut self) -> Result<(), ApiError> {
        let SectionIdentity::Project(project) = &self.identity else {
            return Ok(());
        };

        match self.deps.projects.get_project(&project.id).await {
            Ok(meta) => {
                self.display.name = Some(meta.display_name);
                self.display.avatar_src = meta.avatar_src;
                if self.display.slug.is_none() {
                    self.display.slug = meta.slug;
                }
                Ok(())
            }
            Err(e) => Err(self.record_error(e)),
        }
    }

    /// Tear the section down, marking both boundaries read if a user is signed in.
    ///
    /// The writes are detached; nothing here can observe whether they land.
    pub fn unmount(mut self) -> Vec<NotificationId> {
        let marked = self.flush_boundaries();
        tracing::debug!(section = %self.key, marked = marked.len(), "Section unmounted");
        marked
    }

    // ------------------------------------------------------------------------
    // Expand / collapse
    // ------------------------------------------------------------------------

    pub async fn toggle(&mut self) -> Result<(), ApiError> {
        match self.state {
            SectionState::Collapsed => self.expand().await,
            SectionState::Expanded { .. } => {
                self.collapse();
                Ok(())
            }
        }
    }

    /// Open the section on page 1. No-op if already expanded.
    pub async fn expand(&mut self) -> Result<(), ApiError> {
        if self.is_expanded() {
            return Ok(());
        }
        self.deps.router.set_page(1);
        self.state = SectionState::Expanded { page: 1 };
        self.notify_parent(true);
        tracing::debug!(section = %self.key, "Section expanded");
        self.load_page(1).await
    }

    /// Close the section, marking both boundaries read, and start a fresh
    /// boundary session for the next expansion.
    pub fn collapse(&mut self) -> Vec<NotificationId> {
        if !self.is_expanded() {
            return Vec::new();
        }
        let marked = self.flush_boundaries();
        self.boundary = BoundaryState::default();
        self.state = SectionState::Collapsed;
        self.notify_parent(false);
        tracing::debug!(section = %self.key, marked = marked.len(), "Section collapsed");
        marked
    }

    // ------------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------------

    /// React to an external page change. Ignored while collapsed.
    ///
    /// The shown page only moves once the fetch has been applied; a failed
    /// fetch leaves the section on the page it was showing.
    pub async fn on_page_change(&mut self, page: u32) -> Result<(), ApiError> {
        if !self.is_expanded() {
            tracing::trace!(section = %self.key, page, "Ignoring page change while collapsed");
            return Ok(());
        }
        self.load_page(page).await
    }

    /// Follow the router's page indicator if it differs from the page shown.
    pub async fn sync_route(&mut self) -> Result<(), ApiError> {
        let Some(page) = self.deps.router.current_page() else {
            return Ok(());
        };
        if self.state == (SectionState::Expanded { page }) {
            return Ok(());
        }
        self.on_page_change(page).await
    }

    /// Page forward, marking the old first boundary read before leaving it.
    ///
    /// Returns `false` without doing anything when there is no next page.
    pub async fn next_page(&mut self) -> Result<bool, ApiError> {
        if !self.has_next_page() {
            return Ok(false);
        }
        let SectionState::Expanded { page } = self.state else {
            return Ok(false);
        };

        self.mark(BoundaryPosition::First);
        self.deps.router.set_page(page + 1);
        self.on_page_change(page + 1).await?;
        Ok(true)
    }

    pub async fn previous_page(&mut self) -> Result<bool, ApiError> {
        let SectionState::Expanded { page } = self.state else {
            return Ok(false);
        };
        if page <= 1 {
            return Ok(false);
        }

        self.deps.router.set_page(page - 1);
        self.on_page_change(page - 1).await?;
        Ok(true)
    }

    /// Fetch, apply, then refresh the unread count.
    async fn load_page(&mut self, page: u32) -> Result<(), ApiError> {
        let response = self.request_page(page).send().await;
        self.apply_page(response)?;
        self.refresh_unread().await?;
        Ok(())
    }

    /// Issue a page fetch stamped with the next generation number.
    pub fn request_page(&mut self, page: u32) -> PageRequest {
        let generation = self.next_generation;
        self.next_generation += 1;
        PageRequest {
            feed: Arc::clone(&self.deps.feed),
            query: ListQuery {
                section: self.key.clone(),
                page,
                page_size: self.settings.page_size,
                delivered: None,
            },
            generation,
        }
    }

    /// Fold a page response into the boundary state and cache, and move the
    /// shown page to the one the response carries.
    ///
    /// A failed response is recorded in the error slot and leaves all state
    /// untouched. Under [`StaleResponsePolicy::DiscardStale`] a response older
    /// than the newest applied one is dropped, failed or not.
    pub fn apply_page(&mut self, response: PageResponse) -> Result<PageApplied, ApiError> {
        if self.settings.stale_responses == StaleResponsePolicy::DiscardStale
            && self.newest_applied.is_some_and(|newest| response.generation < newest)
        {
            tracing::debug!(
                section = %self.key,
                page = response.page,
                generation = response.generation,
                failed = response.result.is_err(),
                "Discarding stale page response"
            );
            return Ok(PageApplied::Discarded);
        }

        let page = match response.result {
            Ok(page) => page,
            Err(e) => return Err(self.record_error(e)),
        };

        let shown = page.meta.page;
        self.cache.merge(page.entities);
        let outcome = reconcile(&mut self.boundary, page.meta);
        if self.is_expanded() {
            self.state = SectionState::Expanded { page: shown };
        }
        self.newest_applied = Some(
            self.newest_applied
                .map_or(response.generation, |n| n.max(response.generation)),
        );
        self.error = None;

        tracing::debug!(
            section = %self.key,
            page = response.page,
            generation = response.generation,
            ?outcome,
            "Applied page response"
        );
        Ok(PageApplied::Applied(outcome))
    }

    pub async fn refresh_unread(&mut self) -> Result<u64, ApiError> {
        match self.unread.refresh(self.deps.feed.as_ref(), &self.identity).await {
            Ok(count) => Ok(count),
            Err(e) => Err(self.record_error(e)),
        }
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    /// Swap the signed-in user. A different user while expanded re-fetches
    /// the shown page; signing out does not.
    pub async fn change_user(&mut self, user: Option<Arc<UserIdentity>>) -> Result<(), ApiError> {
        let previous = self.user.replace(user.clone());
        let changed = match (&previous, &user) {
            (Some(old), Some(new)) => !old.same_user(new),
            (None, Some(_)) => true,
            (_, None) => false,
        };

        match self.state {
            SectionState::Expanded { page } if changed => self.load_page(page).await,
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn mark(&mut self, position: BoundaryPosition) -> Vec<NotificationId> {
        if !self.user.is_signed_in() {
            tracing::trace!(section = %self.key, %position, "Anonymous viewer, not marking");
            return Vec::new();
        }
        self.marker.mark_boundary(position, &self.boundary, &mut self.cache)
    }

    fn flush_boundaries(&mut self) -> Vec<NotificationId> {
        let mut marked = self.mark(BoundaryPosition::First);
        marked.extend(self.mark(BoundaryPosition::Last));
        marked
    }

    fn record_error(&mut self, error: ApiError) -> ApiError {
        tracing::warn!(section = %self.key, error = %error, "Section request failed");
        self.error = Some(error.clone());
        error
    }

    fn notify_parent(&self, expanded: bool) {
        if let Some(parent) = &self.parent {
            let toggle = SectionToggle {
                key: self.key.clone(),
                expanded,
            };
            if parent.send(toggle).is_err() {
                tracing::debug!(section = %self.key, "Parent stopped listening for toggles");
            }
        }
    }
}

impl std::fmt::Debug for SectionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionController")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("boundary", &self.boundary)
            .field("cached", &self.cache.len())
            .field("unread", &self.unread.count())
            .field("error", &self.error)
            .finish()
    }
}
