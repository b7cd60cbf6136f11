//! The scan line's cell list: per-pixel-column coverage accumulators.
//!
//! A cell marks an edge pixel of the polygon on the current row. Its
//! `area` is the signed partial area inside the polygon within that
//! column; its `cover` is the signed full-column contribution that
//! propagates to every column to the right. Both are in area units of
//! `GRID_XY` per fully covered pixel, so exact trapezoid areas stay
//! integers.
//!
//! Cells are kept sorted by column and located through a cursor that only
//! moves forward between rewinds, making a monotone sequence of lookups
//! linear in the cells touched.

use crate::consumer::CoverageCell;
use crate::polygon::Edge;
use crate::pool::{Pool, SlotId};
use scan_common::grid::{split_x, GRID_X, GRID_XY, GRID_Y};
use scan_common::{floored_divrem, ScanResult};

pub(crate) struct Cell {
    next: Option<SlotId>,
    pub x: i32,
    pub area: i32,
    pub cover: i32,
}

pub(crate) struct CellList {
    /// Leftmost cell of the scan line.
    head: Option<SlotId>,

    /// Cursor: the cell whose next link is the current search position,
    /// or None when the cursor sits at the head.
    cursor: Option<SlotId>,

    cells: Pool<Cell>,
}

impl CellList {
    pub fn new() -> Self {
        Self {
            head: None,
            cursor: None,
            cells: Pool::new(32, 256),
        }
    }

    /// Drop every cell, keeping the pool's capacity for the next row.
    pub fn reset(&mut self) {
        self.head = None;
        self.cursor = None;
        self.cells.reset();
    }

    /// Move the cursor back to the head.
    #[inline]
    pub fn rewind(&mut self) {
        self.cursor = None;
    }

    /// Rewind only if the cursor has moved past column `x`.
    #[inline]
    pub fn maybe_rewind(&mut self, x: i32) {
        if let Some(t) = self.candidate(self.cursor) {
            if self.cells[t].x > x {
                self.rewind();
            }
        }
    }

    /// The cell the cursor points at.
    #[inline]
    fn candidate(&self, prev: Option<SlotId>) -> Option<SlotId> {
        match prev {
            None => self.head,
            Some(p) => self.cells[p].next,
        }
    }

    /// Find or create the cell for column `x`, advancing the cursor.
    /// Lookups must come in non-decreasing x between rewinds.
    fn find(&mut self, x: i32) -> ScanResult<SlotId> {
        let mut prev = self.cursor;
        let mut tail = self.candidate(prev);
        while let Some(t) = tail {
            if self.cells[t].x >= x {
                break;
            }
            prev = Some(t);
            tail = self.cells[t].next;
        }
        self.cursor = prev;

        if let Some(t) = tail {
            if self.cells[t].x == x {
                return Ok(t);
            }
        }

        let cell = self.cells.alloc(Cell {
            next: tail,
            x,
            area: 0,
            cover: 0,
        })?;
        match prev {
            None => self.head = Some(cell),
            Some(p) => self.cells[p].next = Some(cell),
        }
        Ok(cell)
    }

    /// Find the cells for columns `x1` and `x2` in one cursor walk.
    /// Requires `x1 <= x2`.
    fn find_pair(&mut self, x1: i32, x2: i32) -> ScanResult<(SlotId, SlotId)> {
        debug_assert!(x1 <= x2);
        let c1 = self.find(x1)?;
        let c2 = self.find(x2)?;
        Ok((c1, c2))
    }

    /// Contribution of a downwards edge sampled at `x` on the current
    /// subrow, with the interior extending right to the end of the scan.
    /// The trailing columns are handled by cover propagation at drain.
    pub fn render_span_start(&mut self, x: i32) -> ScanResult<()> {
        let (ix, fx) = split_x(x);
        let cell = self.find(ix)?;
        self.cells[cell].area += 2 * fx;
        self.cells[cell].cover += 2 * GRID_X;
        Ok(())
    }

    /// Interior span `[x1, x2)` on the current subrow.
    pub fn render_span(&mut self, x1: i32, x2: i32) -> ScanResult<()> {
        let (ix1, fx1) = split_x(x1);
        let (ix2, fx2) = split_x(x2);

        if ix1 != ix2 {
            let (c1, c2) = self.find_pair(ix1, ix2)?;
            self.cells[c1].area += 2 * fx1;
            self.cells[c1].cover += 2 * GRID_X;
            self.cells[c2].area -= 2 * fx2;
            self.cells[c2].cover -= 2 * GRID_X;
        } else {
            let cell = self.find(ix1)?;
            self.cells[cell].area += 2 * (fx1 - fx2);
        }
        Ok(())
    }

    /// Exact coverage of one edge crossing the whole current pixel row,
    /// advancing the edge by a full row's worth of subsample rows. Only
    /// valid when the edge crosses the row without meeting another edge.
    pub fn render_edge(&mut self, edge: &mut Edge, sign: i32) -> ScanResult<()> {
        let x1 = edge.x;
        let mut x2 = x1;
        x2.quo += edge.dxdy_full.quo;
        x2.rem += edge.dxdy_full.rem;
        if x2.rem >= 0 {
            x2.quo += 1;
            x2.rem -= edge.dy;
        }
        edge.x = x2;

        let (mut ix1, mut fx1) = split_x(x1.quo);
        let (mut ix2, mut fx2) = split_x(x2.quo);

        // The whole crossing stays inside one column.
        if ix1 == ix2 {
            let cell = self.find(ix1)?;
            self.cells[cell].cover += sign * GRID_XY;
            self.cells[cell].area += sign * (fx1 + fx2) * GRID_Y;
            return Ok(());
        }

        // Orient the crossing left-to-right.
        let mut sign = sign;
        let mut dx = x2.quo - x1.quo;
        let (y1, y2);
        if dx >= 0 {
            y1 = 0;
            y2 = GRID_Y;
        } else {
            std::mem::swap(&mut ix1, &mut ix2);
            std::mem::swap(&mut fx1, &mut fx2);
            dx = -dx;
            sign = -sign;
            y1 = GRID_Y;
            y2 = 0;
        }
        let dy = y2 - y1;

        // Height of the slab crossed while leaving the entry column.
        let y = floored_divrem((GRID_X - fx1) * dy, dx);

        self.maybe_rewind(ix1);
        let (c1, mut c2) = self.find_pair(ix1, ix1 + 1)?;

        self.cells[c1].area += sign * y.quo * (GRID_X + fx1);
        self.cells[c1].cover += sign * y.quo * GRID_X * 2;

        let mut y_quo = y.quo + y1;
        let mut y_rem = y.rem;

        if ix1 + 1 < ix2 {
            // Interior columns each consume a full GRID_X worth of x.
            let dydx_full = floored_divrem(GRID_X * dy, dx);
            let mut cell = c2;
            let mut ix = ix1 + 1;
            loop {
                let mut next_y = y_quo + dydx_full.quo;
                y_rem += dydx_full.rem;
                if y_rem >= dx {
                    next_y += 1;
                    y_rem -= dx;
                }

                let a = sign * (next_y - y_quo) * GRID_X;
                y_quo = next_y;

                self.cells[cell].area += a;
                self.cells[cell].cover += a * 2;

                ix += 1;
                cell = self.find(ix)?;
                if ix == ix2 {
                    break;
                }
            }
            c2 = cell;
        }

        self.cells[c2].area += sign * (y2 - y_quo) * fx2;
        self.cells[c2].cover += sign * (y2 - y_quo) * GRID_X * 2;
        Ok(())
    }

    /// Iterate the row's cells in ascending column order.
    pub fn walk(&self) -> CellWalk<'_> {
        CellWalk {
            cells: &self.cells,
            cur: self.head,
        }
    }
}

/// Ordered iteration over one row's coverage cells.
pub struct CellWalk<'a> {
    cells: &'a Pool<Cell>,
    cur: Option<SlotId>,
}

impl Iterator for CellWalk<'_> {
    type Item = CoverageCell;

    fn next(&mut self) -> Option<CoverageCell> {
        let id = self.cur?;
        let cell = &self.cells[id];
        self.cur = cell.next;
        Some(CoverageCell {
            x: cell.x,
            area: cell.area,
            cover: cell.cover,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan_common::QuoRem;

    fn columns(list: &CellList) -> Vec<i32> {
        list.walk().map(|c| c.x).collect()
    }

    fn cell_at(list: &CellList, x: i32) -> CoverageCell {
        list.walk()
            .find(|c| c.x == x)
            .unwrap_or_else(|| panic!("no cell at column {x}"))
    }

    #[test]
    fn test_find_keeps_cells_sorted_and_deduplicated() {
        let mut list = CellList::new();
        for x in [3, 3, 7, 9] {
            list.find(x).unwrap();
        }
        list.rewind();
        for x in [1, 7, 12] {
            list.find(x).unwrap();
        }
        assert_eq!(columns(&list), vec![1, 3, 7, 9, 12]);
    }

    #[test]
    fn test_maybe_rewind_only_steps_back_when_needed() {
        let mut list = CellList::new();
        list.find(2).unwrap();
        list.find(8).unwrap();

        // Cursor is at column 8; a request at or past it keeps the cursor.
        list.maybe_rewind(8);
        list.find(8).unwrap();
        assert_eq!(columns(&list), vec![2, 8]);

        // A request left of the cursor rewinds so the find can succeed.
        list.maybe_rewind(1);
        list.find(1).unwrap();
        assert_eq!(columns(&list), vec![1, 2, 8]);
    }

    #[test]
    fn test_reset_empties_the_row() {
        let mut list = CellList::new();
        list.render_span(0, 5 * GRID_X).unwrap();
        assert!(!columns(&list).is_empty());

        list.reset();
        assert!(columns(&list).is_empty());
        assert_eq!(list.walk().count(), 0);
    }

    #[test]
    fn test_span_within_one_column_accumulates_area_only() {
        let mut list = CellList::new();
        // [0.25, 0.75) of column 4.
        let x1 = 4 * GRID_X + GRID_X / 4;
        let x2 = 4 * GRID_X + 3 * GRID_X / 4;
        list.render_span(x1, x2).unwrap();

        let c = cell_at(&list, 4);
        assert_eq!(c.area, 2 * (GRID_X / 4 - 3 * GRID_X / 4));
        assert_eq!(c.cover, 0);
    }

    #[test]
    fn test_span_across_columns_opens_and_closes_cover() {
        let mut list = CellList::new();
        let x1 = GRID_X / 2;
        let x2 = 3 * GRID_X + GRID_X / 4;
        list.render_span(x1, x2).unwrap();

        assert_eq!(columns(&list), vec![0, 3]);
        let c0 = cell_at(&list, 0);
        assert_eq!(c0.area, 2 * (GRID_X / 2));
        assert_eq!(c0.cover, 2 * GRID_X);
        let c3 = cell_at(&list, 3);
        assert_eq!(c3.area, -2 * (GRID_X / 4));
        assert_eq!(c3.cover, -2 * GRID_X);
    }

    #[test]
    fn test_span_start_opens_cover_to_the_right() {
        let mut list = CellList::new();
        list.render_span_start(2 * GRID_X + 5).unwrap();

        let c = cell_at(&list, 2);
        assert_eq!(c.area, 10);
        assert_eq!(c.cover, 2 * GRID_X);
        assert_eq!(columns(&list), vec![2]);
    }

    fn full_row_edge(x: QuoRem, dxdy_full: QuoRem, dy: i32) -> Edge {
        Edge {
            next: None,
            x,
            dxdy: QuoRem::default(),
            dxdy_full,
            ytop: 0,
            dy,
            h: GRID_Y,
            dir: 1,
        }
    }

    #[test]
    fn test_vertical_edge_covers_one_column_exactly() {
        let mut list = CellList::new();
        let mut edge = full_row_edge(
            QuoRem {
                quo: 5 * GRID_X + GRID_X / 2,
                rem: -GRID_Y,
            },
            QuoRem::default(),
            GRID_Y,
        );
        list.render_edge(&mut edge, 1).unwrap();

        let c = cell_at(&list, 5);
        assert_eq!(c.cover, GRID_XY);
        // Mid-column edge: area is the half strip left of it, twice.
        assert_eq!(c.area, (GRID_X / 2 + GRID_X / 2) * GRID_Y);
    }

    #[test]
    fn test_full_row_diagonal_spans_its_columns_exactly() {
        // An edge crossing from x=0 to x=3 columns in one row: entry slab,
        // two interior slabs, empty exit cell at the landing column.
        let mut list = CellList::new();
        let dy = 4 * GRID_Y;
        let mut left = full_row_edge(
            QuoRem { quo: 0, rem: -dy },
            QuoRem {
                quo: 3 * GRID_X,
                rem: 0,
            },
            dy,
        );
        list.render_edge(&mut left, 1).unwrap();

        assert_eq!(columns(&list), vec![0, 1, 2, 3]);
        // 3 columns per 15 subrows: 5 subrows per column.
        assert_eq!(cell_at(&list, 0).area, 5 * GRID_X);
        assert_eq!(cell_at(&list, 0).cover, 5 * 2 * GRID_X);
        assert_eq!(cell_at(&list, 1).area, 5 * GRID_X);
        assert_eq!(cell_at(&list, 3).area, 0);

        // The whole crossing opens exactly one pixel row of cover.
        let total_cover: i32 = list.walk().map(|c| c.cover).sum();
        assert_eq!(total_cover, GRID_XY);

        // The edge advanced by its full-row slope.
        assert_eq!(left.x.quo, 3 * GRID_X);
        assert!(left.x.rem < 0);
    }

    #[test]
    fn test_right_to_left_crossing_opens_the_same_cover() {
        // A crossing travelling leftwards is re-oriented internally; the
        // total cover it opens must still be one pixel row.
        let mut list = CellList::new();
        let dy = GRID_Y;
        let mut edge = full_row_edge(
            QuoRem {
                quo: 10 + 3 * GRID_X,
                rem: -dy,
            },
            QuoRem {
                quo: -3 * GRID_X,
                rem: 0,
            },
            dy,
        );
        list.render_edge(&mut edge, 1).unwrap();

        assert_eq!(columns(&list), vec![0, 1, 2, 3]);
        let total_cover: i32 = list.walk().map(|c| c.cover).sum();
        assert_eq!(total_cover, GRID_XY);
        assert_eq!(edge.x.quo, 10);
    }
}
