//! The scan converter: fill-rule appliers and the per-row driver.
//!
//! Each pixel row is rendered one of two ways. If no new edge starts in
//! the row and no active edge ends or crosses another inside it, one
//! analytical pass computes exact trapezoid coverage for the whole row.
//! Otherwise the row is supersampled: `GRID_Y` subsample rows, each
//! merging newly arriving edges, emitting interior spans under the fill
//! rule, and advancing the active list by one subrow.

use crate::active::ActiveList;
use crate::cell::CellList;
use crate::consumer::CoverageConsumer;
use crate::polygon::{Edge, Polygon};
use crate::pool::{Pool, SlotId};
use scan_common::grid::{input_to_grid_x, input_to_grid_y, pixel_to_grid, GRID_X, GRID_Y};
use scan_common::ScanResult;

/// How the winding of overlapping contours decides "inside".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    /// Inside wherever the summed edge directions are non-zero.
    NonZero,
    /// Inside wherever an odd number of edges has been crossed.
    EvenOdd,
}

/// Converts a set of oriented polygon edges into per-row pixel coverage.
///
/// Lifecycle: [`reset`](Self::reset) with a pixel clip box, feed edges
/// through [`add_edge`](Self::add_edge), then [`render`](Self::render)
/// once. After a render (or a failed operation) the converter must be
/// reset before further use. Edge and cell storage is recycled across
/// resets, so a long-lived converter settles into zero allocation.
pub struct ScanConverter {
    polygon: Polygon,
    active: ActiveList,
    coverages: CellList,

    // Clip box, grid scaled.
    xmin: i32,
    xmax: i32,
    ymin: i32,
    ymax: i32,
}

impl ScanConverter {
    pub fn new() -> Self {
        Self {
            polygon: Polygon::new(),
            active: ActiveList::new(),
            coverages: CellList::new(),
            xmin: 0,
            xmax: 0,
            ymin: 0,
            ymax: 0,
        }
    }

    /// Prepare for a new render clipped to the integer pixel box
    /// `[xmin, xmax) x [ymin, ymax)`, dropping any previously added edges.
    pub fn reset(&mut self, xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> ScanResult<()> {
        self.xmin = 0;
        self.xmax = 0;
        self.ymin = 0;
        self.ymax = 0;

        let xmin = pixel_to_grid(xmin, GRID_X);
        let xmax = pixel_to_grid(xmax, GRID_X);
        let ymin = pixel_to_grid(ymin, GRID_Y);
        let ymax = pixel_to_grid(ymax, GRID_Y);

        self.active.reset();
        self.coverages.reset();
        self.polygon.reset(ymin, ymax)?;

        self.xmin = xmin;
        self.xmax = xmax;
        self.ymin = ymin;
        self.ymax = ymax;
        Ok(())
    }

    /// Add one oriented edge in input-scaled coordinates (pixels times
    /// `2^INPUT_BITS`). `dir` must be +1 or -1; -1 reverses the edge's
    /// orientation. Degenerate and out-of-band edges are accepted and
    /// ignored, as are unrecognised `dir` values.
    ///
    /// On failure the converter must be reset before further use.
    pub fn add_edge(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, dir: i32) -> ScanResult<()> {
        if dir != 1 && dir != -1 {
            return Ok(());
        }

        let sy1 = input_to_grid_y(y1);
        let sy2 = input_to_grid_y(y2);
        if sy1 == sy2 {
            return Ok(());
        }

        let sx1 = input_to_grid_x(x1);
        let sx2 = input_to_grid_x(x2);

        self.polygon.add_edge(sx1, sy1, sx2, sy2, dir)
    }

    /// Scan convert the accumulated edges, delivering coverage to the
    /// consumer row by row, top to bottom.
    ///
    /// An empty x clip emits nothing at all; otherwise the consumer sees
    /// `begin`, one `row`/`empty_row` per pixel row, then `end`. On
    /// out-of-memory the row loop stops where it stands: rows already
    /// delivered stay delivered, `end` is never called, and the caller
    /// should treat any partial output as garbage and reset.
    pub fn render<C: CoverageConsumer>(
        &mut self,
        fill_rule: FillRule,
        consumer: &mut C,
    ) -> ScanResult<()> {
        let ymin_i = self.ymin / GRID_Y;
        let ymax_i = self.ymax / GRID_Y;
        let xmin_i = self.xmin / GRID_X;
        let xmax_i = self.xmax / GRID_X;
        let h = ymax_i - ymin_i;

        if xmin_i >= xmax_i {
            return Ok(());
        }

        tracing::debug!(
            rows = h,
            xmin = xmin_i,
            xmax = xmax_i,
            fill_rule = ?fill_rule,
            "scan converting"
        );

        consumer.begin();

        for i in 0..h {
            let row_y = ymin_i + i;

            // Decide between skipping, stepping a full row analytically,
            // and supersampling.
            let mut full_step = false;
            if self.polygon.y_buckets[i as usize].is_none() {
                if self.active.head.is_none() {
                    consumer.empty_row(row_y, xmin_i, xmax_i);
                    continue;
                }
                full_step = self.active.can_step_full_row(&self.polygon.edges);
            }

            if full_step {
                match fill_rule {
                    FillRule::NonZero => fill_nonzero_row_and_step(
                        &mut self.active,
                        &mut self.polygon.edges,
                        &mut self.coverages,
                    )?,
                    FillRule::EvenOdd => fill_evenodd_row_and_step(
                        &mut self.active,
                        &mut self.polygon.edges,
                        &mut self.coverages,
                    )?,
                }
            } else {
                for suby in 0..GRID_Y {
                    let y = row_y * GRID_Y + suby;
                    self.active.merge_starting_edges(&mut self.polygon, y);

                    match fill_rule {
                        FillRule::NonZero => fill_nonzero_subrow(
                            &self.active,
                            &self.polygon.edges,
                            &mut self.coverages,
                        )?,
                        FillRule::EvenOdd => fill_evenodd_subrow(
                            &self.active,
                            &self.polygon.edges,
                            &mut self.coverages,
                        )?,
                    }

                    self.active.substep(&mut self.polygon.edges);
                }
            }

            consumer.row(row_y, xmin_i, xmax_i, self.coverages.walk());
            self.coverages.reset();

            if self.active.head.is_none() {
                self.active.min_h = i32::MAX;
            } else {
                self.active.min_h -= GRID_Y;
            }
        }

        consumer.end();
        Ok(())
    }
}

impl Default for ScanConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit interior spans of the current subrow under non-zero winding.
fn fill_nonzero_subrow(
    active: &ActiveList,
    edges: &Pool<Edge>,
    cells: &mut CellList,
) -> ScanResult<()> {
    cells.rewind();

    let mut cur = active.head;
    while let Some(start) = cur {
        let xstart = edges[start].x.quo;
        let mut winding = edges[start].dir;

        // Scan right until the winding closes.
        let mut next = edges[start].next;
        let close = loop {
            let Some(e) = next else {
                // The list ended inside an open span; keep the partial
                // coverage rather than dropping it.
                tracing::debug!(x = xstart, "active list ended inside an open winding span");
                return cells.render_span_start(xstart);
            };
            winding += edges[e].dir;
            if winding == 0 {
                break e;
            }
            next = edges[e].next;
        };

        cells.render_span(xstart, edges[close].x.quo)?;
        cur = edges[close].next;
    }
    Ok(())
}

/// Emit interior spans of the current subrow under even-odd parity.
fn fill_evenodd_subrow(
    active: &ActiveList,
    edges: &Pool<Edge>,
    cells: &mut CellList,
) -> ScanResult<()> {
    cells.rewind();

    let mut cur = active.head;
    while let Some(start) = cur {
        let xstart = edges[start].x.quo;

        let Some(close) = edges[start].next else {
            return cells.render_span_start(xstart);
        };

        cells.render_span(xstart, edges[close].x.quo)?;
        cur = edges[close].next;
    }
    Ok(())
}

/// Advance `edge`'s x by its full-row slope without emitting coverage.
#[inline]
fn step_edge_full_row(edge: &mut Edge) {
    edge.x.quo += edge.dxdy_full.quo;
    edge.x.rem += edge.dxdy_full.rem;
    if edge.x.rem >= 0 {
        edge.x.quo += 1;
        edge.x.rem -= edge.dy;
    }
}

/// Decrement `h` by a full row, unlinking the edge if it ends. The edge
/// record stays valid for rendering after removal.
#[inline]
fn retire_or_keep(
    active: &mut ActiveList,
    edges: &mut Pool<Edge>,
    prev: &mut Option<SlotId>,
    e: SlotId,
) {
    edges[e].h -= GRID_Y;
    if edges[e].h != 0 {
        *prev = Some(e);
    } else {
        let next = edges[e].next;
        active.set_after(edges, *prev, next);
    }
}

/// Analytical coverage of a whole pixel row under non-zero winding,
/// stepping every traversed edge by a full row.
fn fill_nonzero_row_and_step(
    active: &mut ActiveList,
    edges: &mut Pool<Edge>,
    cells: &mut CellList,
) -> ScanResult<()> {
    let mut prev: Option<SlotId> = None;

    let mut left = active.after(edges, prev);
    while let Some(l) = left {
        let mut winding = edges[l].dir;
        retire_or_keep(active, edges, &mut prev, l);

        let right = loop {
            let Some(r) = active.after(edges, prev) else {
                return cells.render_edge(&mut edges[l], 1);
            };

            retire_or_keep(active, edges, &mut prev, r);

            winding += edges[r].dir;
            if winding == 0 {
                break r;
            }

            // Interior edge of the span: the winding stayed open, so it
            // contributes no boundary coverage, but it still moves.
            step_edge_full_row(&mut edges[r]);
        };

        cells.render_edge(&mut edges[l], 1)?;
        cells.render_edge(&mut edges[right], -1)?;

        left = active.after(edges, prev);
    }
    Ok(())
}

/// Analytical coverage of a whole pixel row under even-odd parity,
/// stepping every traversed edge by a full row.
fn fill_evenodd_row_and_step(
    active: &mut ActiveList,
    edges: &mut Pool<Edge>,
    cells: &mut CellList,
) -> ScanResult<()> {
    let mut prev: Option<SlotId> = None;

    let mut left = active.after(edges, prev);
    while let Some(l) = left {
        retire_or_keep(active, edges, &mut prev, l);

        let Some(r) = active.after(edges, prev) else {
            return cells.render_edge(&mut edges[l], 1);
        };
        retire_or_keep(active, edges, &mut prev, r);

        cells.render_edge(&mut edges[l], 1)?;
        cells.render_edge(&mut edges[r], -1)?;

        left = active.after(edges, prev);
    }
    Ok(())
}
