//! # Virtual Window
//!
//! Decides which messages get laid out and drawn for a scroll position, so
//! long chats cost only what is near the viewport.
//!
//! ```text
//!            ┌──────────┐
//!  start ──▶ │ lookbehind (2 items)
//!            ├──────────┤ ◀── scroll_top
//!            │ viewport │
//!            ├──────────┤ ◀── scroll_top + container
//!            │ overscan (200 rows)
//!            ├──────────┤
//!            │ lookahead (2 items)
//!  end   ──▶ └──────────┘
//! ```
//!
//! Heights come from a [`HeightCache`] filled as items are actually
//! measured; anything not yet measured counts as `estimated_item_height`.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::ops::Range;

use crate::core::message::Message;

/// Something the window can size: a stable key plus a revision that
/// changes whenever the item's rendered height might.
pub trait Measured {
    fn key(&self) -> &str;
    fn revision(&self) -> u64;
}

impl Measured for Message {
    fn key(&self) -> &str {
        &self.id
    }

    fn revision(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.text().hash(&mut hasher);
        self.kind.hash(&mut hasher);
        self.media_url.hash(&mut hasher);
        self.variation_position().hash(&mut hasher);
        hasher.finish()
    }
}

/// Real heights by item key, valid for one layout width.
#[derive(Debug, Default)]
pub struct HeightCache {
    width: u16,
    entries: HashMap<String, (u64, u32)>,
}

impl HeightCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Heights depend on wrapping, so a new width invalidates everything.
    pub fn set_width(&mut self, width: u16) {
        if self.width != width {
            self.width = width;
            self.entries.clear();
        }
    }

    pub fn get<M: Measured>(&self, item: &M) -> Option<u32> {
        match self.entries.get(item.key()) {
            Some(&(revision, height)) if revision == item.revision() => Some(height),
            _ => None,
        }
    }

    pub fn insert<M: Measured>(&mut self, item: &M, height: u32) {
        self.entries
            .insert(item.key().to_string(), (item.revision(), height));
    }

    /// Drop entries for items no longer present.
    pub fn retain<M: Measured>(&mut self, items: &[M]) {
        if self.entries.len() > items.len() {
            let live: std::collections::HashSet<&str> = items.iter().map(|i| i.key()).collect();
            self.entries.retain(|key, _| live.contains(key.as_str()));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualWindow {
    pub estimated_item_height: u32,
    /// Items kept above the first visible one.
    pub lookbehind: usize,
    /// Items kept past the overscan edge.
    pub lookahead_items: usize,
    /// Extra layout rows rendered below the viewport.
    pub overscan: u32,
}

impl Default for VirtualWindow {
    fn default() -> Self {
        Self {
            estimated_item_height: 6,
            lookbehind: 2,
            lookahead_items: 2,
            overscan: 200,
        }
    }
}

impl VirtualWindow {
    pub fn height_of<M: Measured>(&self, item: &M, cache: &HeightCache) -> u32 {
        cache.get(item).unwrap_or(self.estimated_item_height)
    }

    /// Index range to lay out for the given scroll position. Never touches
    /// the items themselves.
    pub fn compute_visible_range<M: Measured>(
        &self,
        items: &[M],
        scroll_top: u32,
        container_height: u32,
        cache: &HeightCache,
    ) -> Range<usize> {
        let len = items.len();
        if len == 0 || container_height == 0 {
            return 0..len;
        }

        // First item whose bottom edge passes scroll_top. Past the content
        // the last item anchors.
        let mut bottom = 0u32;
        let mut anchor = None;
        for (i, item) in items.iter().enumerate() {
            bottom = bottom.saturating_add(self.height_of(item, cache));
            if bottom > scroll_top {
                anchor = Some(i);
                break;
            }
        }
        let (anchor, mut extent) = match anchor {
            Some(i) => (i, bottom - scroll_top),
            None => (len - 1, self.height_of(&items[len - 1], cache)),
        };
        let start = anchor.saturating_sub(self.lookbehind);

        let limit = container_height.saturating_add(self.overscan);
        let mut index = anchor;
        loop {
            if extent > limit {
                let end = index.saturating_add(self.lookahead_items).min(len);
                return start..end;
            }
            index += 1;
            if index >= len {
                return start..len;
            }
            extent = extent.saturating_add(self.height_of(&items[index], cache));
        }
    }

    /// Top edge of `index` in layout rows.
    pub fn offset_of<M: Measured>(&self, items: &[M], index: usize, cache: &HeightCache) -> u32 {
        items
            .iter()
            .take(index)
            .map(|item| self.height_of(item, cache))
            .fold(0u32, u32::saturating_add)
    }

    pub fn total_height<M: Measured>(&self, items: &[M], cache: &HeightCache) -> u32 {
        self.offset_of(items, items.len(), cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        key: String,
        height: u32,
    }

    impl Measured for Row {
        fn key(&self) -> &str {
            &self.key
        }

        fn revision(&self) -> u64 {
            u64::from(self.height)
        }
    }

    fn rows(heights: &[u32]) -> Vec<Row> {
        heights
            .iter()
            .enumerate()
            .map(|(i, &height)| Row {
                key: format!("m{i}"),
                height,
            })
            .collect()
    }

    fn measured(items: &[Row]) -> HeightCache {
        let mut cache = HeightCache::new();
        for item in items {
            cache.insert(item, item.height);
        }
        cache
    }

    fn small_window() -> VirtualWindow {
        VirtualWindow {
            overscan: 0,
            ..VirtualWindow::default()
        }
    }

    #[test]
    fn degenerate_inputs_cover_everything() {
        let window = VirtualWindow::default();
        let cache = HeightCache::new();
        assert_eq!(window.compute_visible_range::<Row>(&[], 0, 20, &cache), 0..0);
        assert_eq!(window.compute_visible_range(&rows(&[3, 3, 3]), 0, 0, &cache), 0..3);
    }

    #[test]
    fn range_applies_lookbehind_and_lookahead() {
        let items = rows(&[10; 20]);
        let cache = measured(&items);
        // scroll_top 55 falls inside item 5; extent 5 + 10 + 10 + 10 > 30 at item 8
        let range = small_window().compute_visible_range(&items, 55, 30, &cache);
        assert_eq!(range, 3..10);
    }

    #[test]
    fn range_at_top_and_past_end() {
        let items = rows(&[10; 20]);
        let cache = measured(&items);
        let window = small_window();
        assert_eq!(window.compute_visible_range(&items, 0, 25, &cache), 0..4);
        assert_eq!(window.compute_visible_range(&items, 10_000, 25, &cache), 17..20);
    }

    #[test]
    fn overscan_extends_the_end() {
        let items = rows(&[10; 100]);
        let cache = measured(&items);
        let range = VirtualWindow::default().compute_visible_range(&items, 0, 50, &cache);
        // 50 + 200 is first exceeded at item 25
        assert_eq!(range, 0..27);
    }

    #[test]
    fn unmeasured_items_use_the_estimate() {
        let items = rows(&[1; 10]);
        let cache = HeightCache::new();
        let window = VirtualWindow {
            estimated_item_height: 4,
            ..small_window()
        };
        assert_eq!(window.total_height(&items, &cache), 40);
        assert_eq!(window.compute_visible_range(&items, 8, 4, &cache), 0..5);
    }

    #[test]
    fn every_scroll_position_includes_an_overlapping_item() {
        let heights = [3, 7, 1, 12, 5, 5, 2, 9, 4, 30, 1, 1, 6, 8, 3];
        let items = rows(&heights);
        let cache = measured(&items);
        let window = small_window();
        let total: u32 = heights.iter().sum();
        let container = 10;

        for scroll_top in 0..=(total - container) {
            let range = window.compute_visible_range(&items, scroll_top, container, &cache);
            let overlaps = range.clone().any(|i| {
                let top = window.offset_of(&items, i, &cache);
                let bottom = top + heights[i];
                top < scroll_top + container && bottom > scroll_top
            });
            assert!(overlaps, "no visible item for scroll_top {scroll_top}: {range:?}");
        }
    }

    #[test]
    fn cache_invalidates_on_revision_and_width() {
        let mut items = rows(&[5]);
        let mut cache = measured(&items);
        assert_eq!(cache.get(&items[0]), Some(5));

        items[0].height = 9;
        assert_eq!(cache.get(&items[0]), None);

        cache.insert(&items[0], 9);
        cache.set_width(40);
        assert!(cache.is_empty());
    }

    #[test]
    fn message_revision_tracks_text() {
        let mut msg = Message::character("Luna", "short");
        let before = msg.revision();
        msg.set_text("a much longer reply");
        assert_ne!(before, msg.revision());
    }

    #[test]
    fn retain_drops_removed_items() {
        let items = rows(&[1, 2, 3]);
        let mut cache = measured(&items);
        cache.retain(&items[..1]);
        assert_eq!(cache.len(), 1);
    }
}
