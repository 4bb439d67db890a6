//! Tracks the visible range and orders boundaries by parse priority.

use crate::base::Span;
use crate::structure::ParseBoundary;

/// Currently visible text range, widened by a margin so scrolling a few
/// lines stays inside already-parsed territory.
#[derive(Debug, Default)]
pub struct ViewportManager {
    viewport: Option<Span>,
    margin: u32,
}

impl ViewportManager {
    pub fn new(margin: u32) -> Self {
        Self {
            viewport: None,
            margin,
        }
    }

    pub fn set_viewport(&mut self, viewport: Span) {
        self.viewport = Some(viewport);
    }

    pub fn viewport(&self) -> Option<Span> {
        self.viewport
    }

    /// The viewport widened by the margin on both sides.
    pub fn effective(&self) -> Option<Span> {
        self.viewport.map(|v| v.expand(self.margin))
    }

    /// Whether a span overlaps the widened viewport. With no viewport set
    /// everything counts as visible.
    pub fn is_visible(&self, span: Span) -> bool {
        match self.effective() {
            Some(viewport) => viewport.intersects(span),
            None => true,
        }
    }

    /// Indices of `boundaries` in parse-priority order: visible ones
    /// first in document order, then the rest by distance from the
    /// viewport. With no viewport set, document order is kept.
    pub fn prioritize(&self, boundaries: &[ParseBoundary]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..boundaries.len()).collect();
        let Some(viewport) = self.effective() else {
            return order;
        };
        order.sort_by_key(|&i| {
            let span = boundaries[i].span;
            let distance = if viewport.intersects(span) {
                0
            } else if span.end <= viewport.start {
                viewport.start - span.end + 1
            } else {
                span.start - viewport.end + 1
            };
            (distance, span.start)
        });
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::BoundaryKind;

    fn boundary(start: u32, end: u32) -> ParseBoundary {
        ParseBoundary::new(Span::new(start, end), BoundaryKind::Function, 0, 1.0)
    }

    #[test]
    fn test_everything_visible_without_viewport() {
        let vp = ViewportManager::new(16);
        assert!(vp.is_visible(Span::new(1000, 2000)));
    }

    #[test]
    fn test_margin_widens_viewport() {
        let mut vp = ViewportManager::new(10);
        vp.set_viewport(Span::new(100, 200));
        assert!(vp.is_visible(Span::new(92, 95)));
        assert!(vp.is_visible(Span::new(205, 209)));
        assert!(!vp.is_visible(Span::new(0, 90)));
    }

    #[test]
    fn test_prioritize_visible_first_then_by_distance() {
        let mut vp = ViewportManager::new(0);
        vp.set_viewport(Span::new(100, 200));
        let boundaries = vec![
            boundary(0, 50),     // far before
            boundary(120, 180),  // visible
            boundary(90, 95),    // just before
            boundary(500, 600),  // far after
        ];
        let order = vp.prioritize(&boundaries);
        assert_eq!(order, vec![1, 2, 0, 3]);
    }
}
