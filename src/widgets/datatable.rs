//! DataFrame preview: one visible page of rows as a ratatui table, with
//! column widths fitted to the visible cells.

use std::borrow::Cow;

use polars::prelude::*;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table, Widget};

/// Hard cap on a rendered column's width.
const MAX_COL_WIDTH: u16 = 40;

pub struct DataTableView<'a> {
    pub df: &'a DataFrame,
    /// First visible row.
    pub offset: usize,
    /// Absolute index of the highlighted row, if any.
    pub selected: Option<usize>,
    pub accent: Color,
    pub title: String,
}

impl DataTableView<'_> {
    /// Rows that fit under the header inside `area` (bordered).
    pub fn page_size(area: Rect) -> usize {
        area.height.saturating_sub(3) as usize
    }
}

impl Widget for DataTableView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let page = Self::page_size(area);
        let end = (self.offset + page).min(self.df.height());
        let columns = self.df.get_columns();

        let mut widths: Vec<u16> = columns
            .iter()
            .map(|c| c.name().chars().count() as u16)
            .collect();

        let mut rows: Vec<Row> = Vec::with_capacity(end.saturating_sub(self.offset));
        for row_idx in self.offset..end {
            let mut cells = Vec::with_capacity(columns.len());
            for (col_idx, column) in columns.iter().enumerate() {
                let value = column.get(row_idx).unwrap_or(AnyValue::Null);
                let text: Cow<str> = if matches!(value, AnyValue::Null) {
                    Cow::Borrowed("")
                } else {
                    Cow::Owned(value.str_value().to_string())
                };
                widths[col_idx] = widths[col_idx]
                    .max(text.chars().count() as u16)
                    .min(MAX_COL_WIDTH);
                cells.push(Cell::from(text.into_owned()));
            }
            let mut row = Row::new(cells);
            if self.selected == Some(row_idx) {
                row = row.style(Style::default().add_modifier(Modifier::REVERSED));
            }
            rows.push(row);
        }

        let header = Row::new(
            columns
                .iter()
                .map(|c| Cell::from(c.name().to_string()))
                .collect::<Vec<_>>(),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));

        let constraints: Vec<Constraint> = widths.into_iter().map(Constraint::Length).collect();
        Table::new(rows, constraints)
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.accent))
                    .title(self.title),
            )
            .render(area, buf);
    }
}

/// Keep `selected` visible by moving `offset` with it.
pub fn follow_selection(offset: &mut usize, selected: usize, page: usize) {
    if page == 0 {
        return;
    }
    if selected < *offset {
        *offset = selected;
    } else if selected >= *offset + page {
        *offset = selected + 1 - page;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_following() {
        let mut offset = 0;
        follow_selection(&mut offset, 4, 5);
        assert_eq!(offset, 0);
        follow_selection(&mut offset, 5, 5);
        assert_eq!(offset, 1);
        follow_selection(&mut offset, 20, 5);
        assert_eq!(offset, 16);
        follow_selection(&mut offset, 2, 5);
        assert_eq!(offset, 2);
    }

    #[test]
    fn page_size_accounts_for_borders_and_header() {
        let area = Rect::new(0, 0, 80, 10);
        assert_eq!(DataTableView::page_size(area), 7);
    }
}
