//! The active edge list: edges crossing the current subsample row.
//!
//! A singly-linked list through the edge pool, sorted ascending by each
//! edge's current x quotient. Most advances keep the order; the few edges
//! that cross a neighbour get spilled into an unsorted side list and
//! merged back, which keeps the per-row cost linear for typical paths.

use crate::polygon::{Edge, Polygon};
use crate::pool::{Pool, SlotId};
use scan_common::grid::GRID_Y;

pub(crate) struct ActiveList {
    /// Leftmost edge on the current scan line.
    pub head: Option<SlotId>,

    /// Lower bound on the remaining height of listed edges. Values <= 0
    /// mean "unknown, recompute before trusting".
    pub min_h: i32,
}

impl ActiveList {
    pub fn new() -> Self {
        Self {
            head: None,
            min_h: 0,
        }
    }

    pub fn reset(&mut self) {
        self.head = None;
        self.min_h = 0;
    }

    /// The edge following `prev`, where `None` names the list head.
    #[inline]
    pub fn after(&self, edges: &Pool<Edge>, prev: Option<SlotId>) -> Option<SlotId> {
        match prev {
            None => self.head,
            Some(p) => edges[p].next,
        }
    }

    /// Patch the link following `prev`, where `None` names the list head.
    #[inline]
    pub fn set_after(&mut self, edges: &mut Pool<Edge>, prev: Option<SlotId>, to: Option<SlotId>) {
        match prev {
            None => self.head = to,
            Some(p) => edges[p].next = to,
        }
    }

    /// Detach the edges starting at subsample row `y` from their bucket
    /// and merge them into the list, keeping it sorted by x.
    pub fn merge_starting_edges(&mut self, polygon: &mut Polygon, y: i32) {
        let bucket = polygon.bucket_index(y);
        let mut min_h = self.min_h;
        let mut starting: Option<SlotId> = None;

        // Edges arriving on later subrows of the same bucket stay put.
        let mut prev: Option<SlotId> = None;
        let mut cur = polygon.y_buckets[bucket];
        while let Some(e) = cur {
            let next = polygon.edges[e].next;
            if polygon.edges[e].ytop == y {
                match prev {
                    None => polygon.y_buckets[bucket] = next,
                    Some(p) => polygon.edges[p].next = next,
                }
                polygon.edges[e].next = starting;
                starting = Some(e);
                min_h = min_h.min(polygon.edges[e].h);
            } else {
                prev = Some(e);
            }
            cur = next;
        }

        self.head = merge_unsorted(&mut polygon.edges, self.head, starting);
        self.min_h = min_h;
    }

    /// Advance every edge by one subsample row. Edges that end are
    /// dropped; edges that cross their left neighbour are re-merged.
    pub fn substep(&mut self, edges: &mut Pool<Edge>) {
        let mut prev: Option<SlotId> = None;
        let mut prev_x = i32::MIN;
        let mut unsorted: Option<SlotId> = None;

        let mut cur = self.head;
        while let Some(e) = cur {
            let next = edges[e].next;
            edges[e].h -= 1;
            if edges[e].h != 0 {
                let edge = &mut edges[e];
                edge.x.quo += edge.dxdy.quo;
                edge.x.rem += edge.dxdy.rem;
                if edge.x.rem >= 0 {
                    edge.x.quo += 1;
                    edge.x.rem -= edge.dy;
                }

                if edge.x.quo < prev_x {
                    // Crossed its neighbour; pull out and re-merge below.
                    self.set_after(edges, prev, next);
                    edges[e].next = unsorted;
                    unsorted = Some(e);
                } else {
                    prev_x = edge.x.quo;
                    prev = Some(e);
                }
            } else {
                self.set_after(edges, prev, next);
            }
            cur = next;
        }

        if unsorted.is_some() {
            self.head = merge_unsorted(edges, self.head, unsorted);
        }
    }

    /// Whether the whole next pixel row can be stepped analytically: no
    /// listed edge ends inside the row, and no pair swaps x order while
    /// crossing it. A false positive here would corrupt coverage; a false
    /// negative merely costs the subsampled path.
    pub fn can_step_full_row(&mut self, edges: &Pool<Edge>) -> bool {
        // Recompute the height bound once it stops being trustworthy.
        if self.min_h <= 0 {
            let mut min_h = i32::MAX;
            let mut cur = self.head;
            while let Some(e) = cur {
                min_h = min_h.min(edges[e].h);
                cur = edges[e].next;
            }
            self.min_h = min_h;
        }

        if self.min_h < GRID_Y {
            return false;
        }

        // Simulate the full-row advance of each quotient and require the
        // sequence to stay strictly increasing.
        let mut prev_x = i32::MIN;
        let mut cur = self.head;
        while let Some(e) = cur {
            let edge = &edges[e];
            let mut quo = edge.x.quo + edge.dxdy_full.quo;
            if edge.x.rem + edge.dxdy_full.rem >= 0 {
                quo += 1;
            }
            if quo <= prev_x {
                return false;
            }
            prev_x = quo;
            cur = edge.next;
        }
        true
    }
}

/// Merge an unsorted list of edges into a sorted one, ascending by current
/// x quotient. Returns the new head.
fn merge_unsorted(
    edges: &mut Pool<Edge>,
    mut sorted: Option<SlotId>,
    mut unsorted: Option<SlotId>,
) -> Option<SlotId> {
    // Insertion cursor: the edge whose next field is the insertion point,
    // or None for the head. Retained across edges since successive
    // spilled edges tend to land near each other.
    let mut prev: Option<SlotId> = None;

    while let Some(e) = unsorted {
        unsorted = edges[e].next;
        let x = edges[e].x.quo;

        // Step back to the head when the cursor overshoots.
        let cand = match prev {
            None => sorted,
            Some(p) => edges[p].next,
        };
        match cand {
            Some(c) if x >= edges[c].x.quo => {}
            _ => prev = None,
        }

        // Advance until the candidate sorts at or after the new edge.
        loop {
            let cand = match prev {
                None => sorted,
                Some(p) => edges[p].next,
            };
            match cand {
                Some(c) if edges[c].x.quo < x => prev = Some(c),
                _ => break,
            }
        }

        // Splice in; the inserted edge becomes the next candidate.
        match prev {
            None => {
                edges[e].next = sorted;
                sorted = Some(e);
            }
            Some(p) => {
                edges[e].next = edges[p].next;
                edges[p].next = Some(e);
            }
        }
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan_common::grid::{GRID_X, GRID_Y};

    fn polygon_with_edges(edges: &[(i32, i32, i32, i32)]) -> Polygon {
        let mut p = Polygon::new();
        p.reset(0, 4 * GRID_Y).unwrap();
        for &(x0, y0, x1, y1) in edges {
            p.add_edge(x0, y0, x1, y1, 1).unwrap();
        }
        p
    }

    fn xs(active: &ActiveList, edges: &Pool<Edge>) -> Vec<i32> {
        let mut out = Vec::new();
        let mut cur = active.head;
        while let Some(e) = cur {
            out.push(edges[e].x.quo);
            cur = edges[e].next;
        }
        out
    }

    #[test]
    fn test_merge_sorts_bucket_edges_by_x() {
        let mut p = polygon_with_edges(&[
            (5 * GRID_X, 0, 5 * GRID_X, 2 * GRID_Y),
            (GRID_X, 0, GRID_X, 2 * GRID_Y),
            (3 * GRID_X, 0, 3 * GRID_X, 2 * GRID_Y),
        ]);
        let mut active = ActiveList::new();
        active.merge_starting_edges(&mut p, 0);

        assert_eq!(xs(&active, &p.edges), vec![GRID_X, 3 * GRID_X, 5 * GRID_X]);
        assert!(p.y_buckets[0].is_none());
    }

    #[test]
    fn test_merge_leaves_later_subrow_edges_in_the_bucket() {
        let mut p = polygon_with_edges(&[(0, 0, 0, 2 * GRID_Y), (9, 3, 9, 2 * GRID_Y)]);
        let mut active = ActiveList::new();
        active.merge_starting_edges(&mut p, 0);

        assert_eq!(xs(&active, &p.edges).len(), 1);
        assert!(p.y_buckets[0].is_some(), "subrow-3 edge should stay filed");

        active.merge_starting_edges(&mut p, 3);
        assert_eq!(xs(&active, &p.edges).len(), 2);
        assert!(p.y_buckets[0].is_none());
    }

    #[test]
    fn test_substep_drops_ending_edges() {
        let mut p = polygon_with_edges(&[(0, 0, 0, 1), (GRID_X, 0, GRID_X, 2 * GRID_Y)]);
        let mut active = ActiveList::new();
        active.merge_starting_edges(&mut p, 0);
        assert_eq!(xs(&active, &p.edges).len(), 2);

        active.substep(&mut p.edges);
        assert_eq!(xs(&active, &p.edges), vec![GRID_X]);
    }

    #[test]
    fn test_substep_restores_order_after_a_crossing() {
        // A steep rightward edge starting left of a vertical edge crosses
        // it on the first subsample step.
        let mut p = polygon_with_edges(&[
            (0, 0, 8 * GRID_X, 2 * GRID_Y),
            (GRID_X / 8, 0, GRID_X / 8, 2 * GRID_Y),
        ]);
        let mut active = ActiveList::new();
        active.merge_starting_edges(&mut p, 0);
        assert_eq!(xs(&active, &p.edges), vec![0, GRID_X / 8]);

        active.substep(&mut p.edges);
        let order = xs(&active, &p.edges);
        assert_eq!(order.len(), 2);
        assert!(order[0] <= order[1], "list must stay sorted: {order:?}");
        assert_eq!(order[0], GRID_X / 8);
    }

    #[test]
    fn test_full_row_step_rejected_when_an_edge_ends_early() {
        let mut p = polygon_with_edges(&[(0, 0, 0, GRID_Y - 1)]);
        let mut active = ActiveList::new();
        active.merge_starting_edges(&mut p, 0);
        assert!(!active.can_step_full_row(&p.edges));
    }

    #[test]
    fn test_full_row_step_rejected_when_edges_cross_inside_the_row() {
        // An X shape crossing mid-row: the diagonals swap order before the
        // row ends.
        let mut p = polygon_with_edges(&[
            (0, 0, 4 * GRID_X, GRID_Y),
            (4 * GRID_X, 0, 0, GRID_Y),
        ]);
        let mut active = ActiveList::new();
        active.merge_starting_edges(&mut p, 0);
        assert!(!active.can_step_full_row(&p.edges));
    }

    #[test]
    fn test_full_row_step_allowed_for_parallel_edges() {
        let mut p = polygon_with_edges(&[
            (0, 0, 4 * GRID_X, 4 * GRID_Y),
            (2 * GRID_X, 0, 6 * GRID_X, 4 * GRID_Y),
        ]);
        let mut active = ActiveList::new();
        active.merge_starting_edges(&mut p, 0);
        assert!(active.can_step_full_row(&p.edges));
    }
}
