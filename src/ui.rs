use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::loader::NULL_CLASS;
use crate::model::{Model, UIData};
use crate::table::{SortDirection, SortSpec};

pub const BORDER_SIZE: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 2;

const POPUP_WIDTH: u16 = 50;
const POPUP_HEIGHT: u16 = 24;

#[derive(Debug, Default)]
pub struct TableUI {
    state: TableState,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();

        let instructions = Line::from(vec![
            " Filter ".into(),
            "<F>".blue().bold(),
            " Sort ".into(),
            "<S>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<Q> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", uidata.name).bold()).centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK);
        let inner = block.inner(frame.area());
        frame.render_widget(block, frame.area());

        let [table_area, status_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(inner);

        self.draw_table(&uidata, frame, table_area);
        Self::draw_statusline(&uidata, frame, status_area);
        if uidata.show_popup {
            Self::draw_popup(&uidata.popup_message, frame);
        }
    }

    fn draw_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let widths: Vec<Constraint> = uidata
            .widths
            .iter()
            .map(|&w| Constraint::Length(w as u16))
            .collect();

        let rows = uidata.rows.iter().map(|row| {
            Row::new(row.iter().map(|cell| {
                let content = Cell::from(cell.text.as_str());
                if cell.class.as_deref() == Some(NULL_CLASS) {
                    content.dim()
                } else {
                    content
                }
            }))
        });

        let mut table = Table::new(rows, widths)
            .column_spacing(1)
            .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED))
            .cell_highlight_style(Style::new().yellow().bold());

        if uidata.display_headers {
            let header = uidata.headers.iter().map(|h| {
                let marker = match &uidata.sort {
                    Some(SortSpec { column, direction }) if column == h => match direction {
                        SortDirection::Ascending => " ▲",
                        SortDirection::Descending => " ▼",
                    },
                    _ => "",
                };
                let filtered = uidata.filters.iter().any(|(k, _)| k == h);
                let text = format!("{h}{marker}");
                if filtered {
                    Cell::from(text).underlined()
                } else {
                    Cell::from(text)
                }
            });
            table = table.header(
                Row::new(header)
                    .style(Style::new().bold())
                    .height(TABLE_HEADER_HEIGHT as u16),
            );
        }

        if uidata.rows.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(uidata.selected_row));
        }
        self.state.select_column(Some(uidata.selected_column));
        // The model already windows the rows, so the table must not scroll on its own.
        *self.state.offset_mut() = 0;
        frame.render_stateful_widget(table, area, &mut self.state);
    }

    fn draw_statusline(uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let line = Line::from(vec![
                Span::from(uidata.cmd_label.as_str()).blue().bold(),
                Span::from(uidata.cmdinput.input.as_str()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x
                + (uidata.cmd_label.chars().count() + uidata.cmdinput.cursor_pos) as u16;
            frame.set_cursor_position(Position::new(x.min(area.right()), area.y));
            return;
        }

        let position = if uidata.nrows == 0 {
            format!("0/0 of {}", uidata.total_rows)
        } else {
            format!(
                "{}/{} of {}",
                uidata.abs_selected_row + 1,
                uidata.nrows,
                uidata.total_rows
            )
        };
        let mut info = vec![Span::from(position).yellow()];
        if let Some(SortSpec { column, direction }) = &uidata.sort {
            info.push(Span::from(format!(" | sort {column} {direction}")));
        }
        if !uidata.filters.is_empty() {
            let filters = uidata
                .filters
                .iter()
                .map(|(k, v)| format!("{k}~{v}"))
                .collect::<Vec<_>>()
                .join(", ");
            info.push(Span::from(format!(" | {filters}")).cyan());
        }

        let [message_area, info_area] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).areas(area);
        frame.render_widget(Paragraph::new(uidata.status_message.as_str()), message_area);
        frame.render_widget(Paragraph::new(Line::from(info).right_aligned()), info_area);
    }

    fn draw_popup(message: &str, frame: &mut Frame) {
        let area = frame.area();
        let width = POPUP_WIDTH.min(area.width);
        let height = POPUP_HEIGHT.min(area.height);
        let popup = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        );
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .border_set(border::ROUNDED);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(Text::from(message))
                .wrap(Wrap { trim: false })
                .block(block),
            popup,
        );
    }
}
