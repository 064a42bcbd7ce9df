//! Geometry of the switcher panel, in top-left-origin points.
//!
//! The panel is a grid of uniform cells, four to a row, centered on the
//! screen. A footer under the grid holds the page indicator and, when there
//! is more than one page, the arrow buttons.

use crate::model::{Point, Rect, Size};
use crate::switcher::overlay::PageArrow;

pub const COLUMNS: usize = 4;
pub const TITLE_LINES: usize = 2;

const PANEL_PADDING: f64 = 20.0;
const CELL_PADDING: f64 = 10.0;
const CELL_GAP: f64 = 12.0;
const TITLE_GAP: f64 = 6.0;
const LINE_HEIGHT: f64 = 16.0;
const FOOTER_HEIGHT: f64 = 28.0;
const ARROW_SIZE: f64 = 24.0;
const INDICATOR_WIDTH: f64 = 80.0;
const ICON_SIZE: f64 = 32.0;
const SCREEN_MARGIN: f64 = 40.0;
/// Rough advance of one title character at the overlay's font size.
const CHAR_WIDTH: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellLayout {
    pub frame: Rect,
    pub thumbnail: Rect,
    pub icon: Rect,
    pub title: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub panel: Rect,
    pub cells: Vec<CellLayout>,
    pub indicator: Rect,
    pub previous_arrow: Option<Rect>,
    pub next_arrow: Option<Rect>,
    /// Title characters that fit on one line of a cell.
    pub title_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Cell(usize),
    Arrow(PageArrow),
}

pub fn row_count(count: usize) -> usize { count.div_ceil(COLUMNS) }

impl GridLayout {
    /// Lays out `count` cells holding thumbnails of `thumbnail` size, shrunk
    /// uniformly if the panel would not fit on `screen`.
    pub fn new(screen: Size, count: usize, pages: usize, thumbnail: Size) -> GridLayout {
        let columns = count.clamp(1, COLUMNS);
        let rows = row_count(count).max(1);

        let natural = panel_size(columns, rows, thumbnail, 1.0);
        let scale = f64::min(
            1.0,
            f64::min(
                (screen.width - 2.0 * SCREEN_MARGIN).max(1.0) / natural.width,
                (screen.height - 2.0 * SCREEN_MARGIN).max(1.0) / natural.height,
            ),
        );
        let size = panel_size(columns, rows, thumbnail, scale);
        let panel = Rect::new(
            ((screen.width - size.width) / 2.0).max(0.0),
            ((screen.height - size.height) / 2.0).max(0.0),
            size.width,
            size.height,
        );

        let padding = PANEL_PADDING * scale;
        let gap = CELL_GAP * scale;
        let cell = cell_size(thumbnail, scale);
        let cells = (0..count)
            .map(|i| {
                let (row, col) = (i / COLUMNS, i % COLUMNS);
                let frame = Rect::new(
                    panel.origin.x + padding + col as f64 * (cell.width + gap),
                    panel.origin.y + padding + row as f64 * (cell.height + gap),
                    cell.width,
                    cell.height,
                );
                cell_layout(frame, thumbnail, scale)
            })
            .collect();

        let footer_y = panel.max_y() - padding - FOOTER_HEIGHT * scale;
        let footer_h = FOOTER_HEIGHT * scale;
        let center_x = panel.origin.x + panel.size.width / 2.0;
        let indicator_w = INDICATOR_WIDTH * scale;
        let indicator = Rect::new(center_x - indicator_w / 2.0, footer_y, indicator_w, footer_h);
        let arrow = ARROW_SIZE * scale;
        let arrow_y = footer_y + (footer_h - arrow) / 2.0;
        let (previous_arrow, next_arrow) = if pages > 1 {
            (
                Some(Rect::new(indicator.origin.x - arrow, arrow_y, arrow, arrow)),
                Some(Rect::new(indicator.max_x(), arrow_y, arrow, arrow)),
            )
        } else {
            (None, None)
        };

        GridLayout {
            panel,
            cells,
            indicator,
            previous_arrow,
            next_arrow,
            title_chars: ((cell.width - 2.0 * CELL_PADDING * scale) / (CHAR_WIDTH * scale))
                .floor()
                .max(1.0) as usize,
        }
    }

    pub fn hit_test(&self, point: Point) -> Option<HitTarget> {
        if let Some(index) = self.cells.iter().position(|c| c.frame.contains(point)) {
            return Some(HitTarget::Cell(index));
        }
        if self.previous_arrow.is_some_and(|r| r.contains(point)) {
            return Some(HitTarget::Arrow(PageArrow::Previous));
        }
        if self.next_arrow.is_some_and(|r| r.contains(point)) {
            return Some(HitTarget::Arrow(PageArrow::Next));
        }
        None
    }
}

fn cell_size(thumbnail: Size, scale: f64) -> Size {
    Size {
        width: (thumbnail.width + 2.0 * CELL_PADDING) * scale,
        height: (CELL_PADDING * 2.0
            + thumbnail.height
            + TITLE_GAP
            + LINE_HEIGHT * TITLE_LINES as f64)
            * scale,
    }
}

fn panel_size(columns: usize, rows: usize, thumbnail: Size, scale: f64) -> Size {
    let cell = cell_size(thumbnail, scale);
    let gap = CELL_GAP * scale;
    let padding = PANEL_PADDING * scale;
    Size {
        width: 2.0 * padding + columns as f64 * cell.width + (columns - 1) as f64 * gap,
        height: 2.0 * padding
            + rows as f64 * cell.height
            + (rows - 1) as f64 * gap
            + gap
            + FOOTER_HEIGHT * scale,
    }
}

fn cell_layout(frame: Rect, thumbnail: Size, scale: f64) -> CellLayout {
    let padding = CELL_PADDING * scale;
    let thumb = Rect::new(
        frame.origin.x + padding,
        frame.origin.y + padding,
        thumbnail.width * scale,
        thumbnail.height * scale,
    );
    let icon_size = ICON_SIZE * scale;
    let icon = Rect::new(
        thumb.origin.x + 4.0 * scale,
        thumb.max_y() - icon_size - 4.0 * scale,
        icon_size,
        icon_size,
    );
    let title = Rect::new(
        frame.origin.x + padding,
        thumb.max_y() + TITLE_GAP * scale,
        frame.size.width - 2.0 * padding,
        LINE_HEIGHT * TITLE_LINES as f64 * scale,
    );
    CellLayout { frame, thumbnail: thumb, icon, title }
}

pub fn page_indicator(page: usize, pages: usize) -> String { format!("{} / {}", page + 1, pages) }

/// Splits `title` into at most `max_lines` lines of `max_chars` characters,
/// breaking at whitespace where possible and ending with an ellipsis when the
/// title does not fit.
pub fn wrap_title(title: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    let max_chars = max_chars.max(2);
    let chars: Vec<char> = title.trim().chars().collect();
    let mut rest: &[char] = &chars;
    let mut lines = Vec::new();

    while !rest.is_empty() && lines.len() < max_lines {
        if rest.len() <= max_chars {
            lines.push(rest.iter().collect());
            break;
        }
        if lines.len() + 1 == max_lines {
            let kept: String = rest[..max_chars - 1].iter().collect();
            lines.push(format!("{}\u{2026}", kept.trim_end()));
            break;
        }
        let cut = rest[..=max_chars]
            .iter()
            .rposition(|c| c.is_whitespace())
            .filter(|&i| i > 0)
            .unwrap_or(max_chars);
        let line: String = rest[..cut].iter().collect();
        lines.push(line.trim_end().to_string());
        rest = &rest[cut..];
        while rest.first().is_some_and(|c| c.is_whitespace()) {
            rest = &rest[1..];
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SCREEN: Size = Size { width: 2560.0, height: 1440.0 };
    const THUMB: Size = Size { width: 320.0, height: 200.0 };

    #[test]
    fn rows_follow_count() {
        assert_eq!(row_count(1), 1);
        assert_eq!(row_count(4), 1);
        assert_eq!(row_count(5), 2);
        assert_eq!(row_count(16), 4);
    }

    #[test]
    fn cells_form_a_four_column_grid() {
        let layout = GridLayout::new(SCREEN, 6, 1, THUMB);
        assert_eq!(layout.cells.len(), 6);
        let first = layout.cells[0].frame;
        let fifth = layout.cells[4].frame;
        assert_eq!(fifth.origin.x, first.origin.x);
        assert!(fifth.origin.y > first.max_y());
        assert!(layout.cells[3].frame.origin.x > layout.cells[2].frame.max_x());
        for cell in &layout.cells {
            assert_eq!(cell.frame.size, first.size);
            assert_eq!(cell.thumbnail.size, THUMB);
        }
    }

    #[test]
    fn panel_is_centered_and_holds_every_cell() {
        let layout = GridLayout::new(SCREEN, 16, 2, THUMB);
        let center_x = layout.panel.origin.x + layout.panel.size.width / 2.0;
        assert!((center_x - SCREEN.width / 2.0).abs() < 0.001);
        for cell in &layout.cells {
            assert!(cell.frame.max_x() <= layout.panel.max_x());
            assert!(cell.frame.max_y() <= layout.indicator.origin.y);
        }
    }

    #[test]
    fn grid_shrinks_to_fit_small_screens() {
        let screen = Size { width: 1024.0, height: 640.0 };
        let layout = GridLayout::new(screen, 16, 1, THUMB);
        assert!(layout.panel.size.width <= screen.width);
        assert!(layout.panel.size.height <= screen.height);
        assert!(layout.cells[0].thumbnail.size.width < THUMB.width);
    }

    #[test]
    fn arrows_only_with_several_pages() {
        let single = GridLayout::new(SCREEN, 3, 1, THUMB);
        assert_eq!((single.previous_arrow, single.next_arrow), (None, None));
        let paged = GridLayout::new(SCREEN, 16, 3, THUMB);
        assert!(paged.previous_arrow.is_some() && paged.next_arrow.is_some());
    }

    #[test]
    fn hit_testing() {
        let layout = GridLayout::new(SCREEN, 5, 2, THUMB);
        let inside = |r: Rect| Point { x: r.origin.x + 1.0, y: r.origin.y + 1.0 };
        assert_eq!(layout.hit_test(inside(layout.cells[4].frame)), Some(HitTarget::Cell(4)));
        assert_eq!(
            layout.hit_test(inside(layout.next_arrow.unwrap())),
            Some(HitTarget::Arrow(PageArrow::Next))
        );
        assert_eq!(
            layout.hit_test(inside(layout.previous_arrow.unwrap())),
            Some(HitTarget::Arrow(PageArrow::Previous))
        );
        assert_eq!(layout.hit_test(Point { x: 1.0, y: 1.0 }), None);
    }

    #[test]
    fn indicator_text() {
        assert_eq!(page_indicator(0, 3), "1 / 3");
        assert_eq!(page_indicator(2, 3), "3 / 3");
    }

    #[test]
    fn short_titles_stay_on_one_line() {
        assert_eq!(wrap_title("Mail - Inbox", 20, 2), vec!["Mail - Inbox"]);
        assert_eq!(wrap_title("", 20, 2), Vec::<String>::new());
    }

    #[test]
    fn long_titles_wrap_at_words() {
        assert_eq!(
            wrap_title("Safari - Rust Programming Language", 20, 2),
            vec!["Safari - Rust", "Programming Language"]
        );
    }

    #[test]
    fn overflowing_titles_end_with_ellipsis() {
        let lines = wrap_title("Preview - a very long document name that keeps going", 16, 2);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with('\u{2026}'));
        assert!(lines.iter().all(|l| l.chars().count() <= 16));
    }

    #[test]
    fn unbroken_titles_split_hard() {
        let lines = wrap_title("abcdefghijklmnopqrstuvwxyz", 10, 3);
        assert_eq!(lines, vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
    }
}
