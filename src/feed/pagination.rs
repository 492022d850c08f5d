//! High-water-mark tracking of the outermost pages fetched in a session.
//!
//! Read-marking only ever touches the first and last boundary pages, so this
//! module decides which fetched page becomes which boundary:
//!
//! - a page beyond the known last page extends `last`
//! - a page before the known first page extends `first`
//! - anything else (including the very first fetch) collapses both
//!   boundaries onto the new page
//!
//! `current` always follows the newest reconciled page.

use super::types::{BoundaryState, PageMeta};

/// Which rule [`reconcile`] applied. Used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    ExtendedLast,
    ExtendedFirst,
    Collapsed,
}

/// Fold a freshly fetched page's metadata into the boundary state.
///
/// An unset boundary never compares greater or smaller than a page, so the
/// first fetch of a session always lands in the collapse branch.
pub fn reconcile(boundary: &mut BoundaryState, meta: PageMeta) -> Reconciled {
    let page = meta.page;
    let last_page = boundary.last.as_ref().map(|m| m.page);
    let first_page = boundary.first.as_ref().map(|m| m.page);

    let outcome = match (first_page, last_page) {
        (_, Some(last)) if page > last => {
            boundary.last = Some(meta.clone());
            Reconciled::ExtendedLast
        }
        (Some(first), _) if page < first => {
            boundary.first = Some(meta.clone());
            Reconciled::ExtendedFirst
        }
        _ => {
            boundary.first = Some(meta.clone());
            boundary.last = Some(meta.clone());
            Reconciled::Collapsed
        }
    };

    boundary.current = Some(meta);
    tracing::trace!(page, ?outcome, "Reconciled page boundaries");
    outcome
}
