//! Plain-text view of a section: header badge, notification lines, pager.
//!
//! Kept free of any terminal library so the same view model can back a TUI
//! or the CLI's line output.

use crate::feed::SectionIdentity;
use crate::section::{SectionController, SectionState};
use crate::util::{strip_control_chars, truncate_to_width};

const DEFAULT_AVATAR: &str = "/assets/simple-avatar.jpg";

/// What sits to the left of the section title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Badge {
    /// Unread count, shown instead of any avatar while non-zero.
    Unread(u64),
    /// Site logo for the global section.
    Logo { link: String },
    Avatar { src: String, link: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub message: String,
    pub url: Option<String>,
    pub unread: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerView {
    pub page: u32,
    pub page_count: u32,
    /// "first - last of count" for the shown page.
    pub range: String,
    pub has_previous: bool,
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView {
    pub title: String,
    pub badge: Badge,
    pub expanded: bool,
    pub error: Option<String>,
    pub items: Vec<ItemView>,
    pub pager: Option<PagerView>,
}

impl SectionView {
    pub fn from_section(section: &SectionController) -> Self {
        let display = section.display();
        let link = match &display.slug {
            Some(slug) => format!("/projects/{slug}"),
            None => "/".to_string(),
        };

        let badge = match (section.unread_count(), section.identity()) {
            (n, _) if n > 0 => Badge::Unread(n),
            (_, SectionIdentity::Global) => Badge::Logo { link },
            (_, SectionIdentity::Project(_)) => Badge::Avatar {
                src: display
                    .avatar_src
                    .as_ref()
                    .map_or_else(|| DEFAULT_AVATAR.to_string(), |src| format!("//{src}")),
                link,
            },
        };

        let expanded = section.is_expanded();
        let items = if expanded {
            section
                .current_notifications()
                .into_iter()
                .map(|n| ItemView {
                    message: strip_control_chars(&n.payload.message).into_owned(),
                    url: n.payload.url.clone(),
                    unread: !n.delivered,
                })
                .collect()
        } else {
            Vec::new()
        };

        let pager = match (section.state(), &section.boundary().current) {
            (SectionState::Expanded { .. }, Some(current)) => Some(PagerView {
                page: current.page,
                page_count: section.boundary().page_count().unwrap_or(0),
                range: format!(
                    "{} - {} of {}",
                    current.first_item(),
                    current.last_item(),
                    current.count
                ),
                has_previous: section.has_previous_page(),
                has_next: section.has_next_page(),
            }),
            _ => None,
        };

        Self {
            title: display
                .name
                .clone()
                .unwrap_or_else(|| section.key().to_string()),
            badge,
            expanded,
            error: section.error().map(ToString::to_string),
            items,
            pager,
        }
    }

    /// Render as terminal lines no wider than `width` columns.
    pub fn lines(&self, width: usize) -> Vec<String> {
        let badge = match &self.badge {
            Badge::Unread(n) => format!("({n})"),
            Badge::Logo { .. } => "◎".to_string(),
            Badge::Avatar { .. } => "○".to_string(),
        };
        let glyph = if self.expanded { "✕" } else { "▾" };

        let mut lines = vec![format!("{badge} {} {glyph}", strip_control_chars(&self.title))];

        if let Some(error) = &self.error {
            lines.push(format!("  ! {error}"));
        }

        for item in &self.items {
            let marker = if item.unread { '•' } else { ' ' };
            lines.push(format!("  {marker} {}", item.message));
        }

        if let Some(pager) = &self.pager {
            let previous = if pager.has_previous { "‹ previous" } else { "" };
            let next = if pager.has_next { "older ›" } else { "" };
            lines.push(format!(
                "  {previous}  {}  (page {}/{})  {next}",
                pager.range, pager.page, pager.page_count
            ));
        }

        lines
            .into_iter()
            .map(|line| truncate_to_width(line.trim_end(), width).into_owned())
            .collect()
    }
}
