//! Router collaborator: the externally visible "current page" indicator.
use std::sync::atomic::{AtomicU32, Ordering};

pub trait PageRouter: Send + Sync {
    /// Page the location currently asks for, if any.
    fn current_page(&self) -> Option<u32>;

    /// Request the location to show `page`.
    fn set_page(&self, page: u32);
}

/// Router that keeps the page indicator in memory. Zero means unset.
#[derive(Debug, Default)]
pub struct MemoryRouter {
    page: AtomicU32,
}

impl MemoryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(page: u32) -> Self {
        Self {
            page: AtomicU32::new(page),
        }
    }
}

impl PageRouter for MemoryRouter {
    fn current_page(&self) -> Option<u32> {
        match self.page.load(Ordering::Acquire) {
            0 => None,
            page => Some(page),
        }
    }

    fn set_page(&self, page: u32) {
        self.page.store(page, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_router_starts_unset() {
        assert_eq!(MemoryRouter::new().current_page(), None);
        assert_eq!(MemoryRouter::at(3).current_page(), Some(3));
    }

    #[test]
    fn test_set_page() {
        let router = MemoryRouter::new();
        router.set_page(2);
        assert_eq!(router.current_page(), Some(2));
    }
}
