//! Common types used across PDX

use serde::{Deserialize, Serialize};

/// Offset/size window over a paginated listing.
///
/// The directory API addresses pages by item offset rather than page
/// number, so a walk advances the offset by one page size per step.
///
/// # Examples
///
/// ```
/// use pdx_common::types::PageWindow;
///
/// let first = PageWindow::first(18);
/// assert_eq!(first.offset, 0);
///
/// let second = first.next();
/// assert_eq!(second.offset, 18);
/// assert!(second.exceeds(Some(0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    /// Number of items to skip
    pub offset: u32,

    /// Maximum number of items per page
    pub size: u32,
}

impl PageWindow {
    pub fn new(offset: u32, size: u32) -> Self {
        Self { offset, size }
    }

    /// Window for the first page of a walk
    pub fn first(size: u32) -> Self {
        Self { offset: 0, size }
    }

    /// Window immediately following this one
    pub fn next(self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.size),
            size: self.size,
        }
    }

    /// Whether this window starts past an optional offset cap
    pub fn exceeds(self, max_offset: Option<u32>) -> bool {
        max_offset.is_some_and(|max| self.offset > max)
    }
}
