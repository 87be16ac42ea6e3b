//! Scroll position tracking.
//!
//! Background refreshes only follow new messages when the user is already
//! looking at the bottom of the list; someone reading history is left alone.

use hirechat_shared::constants::NEAR_BOTTOM_THRESHOLD_PX;

/// Distance between the bottom edge of the viewport and the end of the content.
pub fn distance_from_bottom(content_height: f64, scroll_offset: f64, viewport_height: f64) -> f64 {
    content_height - (scroll_offset + viewport_height)
}

#[derive(Debug, Clone)]
pub struct ScrollTracker {
    threshold: f64,
    near_bottom: bool,
}

impl ScrollTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            near_bottom: true,
        }
    }

    /// Record a scroll event and return the updated near-bottom flag.
    pub fn on_scroll(&mut self, content_height: f64, scroll_offset: f64, viewport_height: f64) -> bool {
        let distance = distance_from_bottom(content_height, scroll_offset, viewport_height);
        self.near_bottom = distance < self.threshold;
        self.near_bottom
    }

    pub fn is_near_bottom(&self) -> bool {
        self.near_bottom
    }

    /// Whether a background refresh that brought `has_new_messages` should
    /// scroll the view.
    pub fn should_follow(&self, has_new_messages: bool) -> bool {
        has_new_messages && self.near_bottom
    }
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new(NEAR_BOTTOM_THRESHOLD_PX)
    }
}
