use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::engine::SortDirection;
use crate::inputter::InputResult;
use crate::login::{LoginData, LoginField};
use crate::model::{CellView, DashboardData, HeaderView, PromptView, ScreenData, UIData};
use crate::table::FilterKind;

pub const TITLE_HEIGHT: usize = 1;
pub const PAGER_HEIGHT: usize = 1;
pub const FOOTER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const TABLE_BORDER: usize = 2;
pub const TABLE_HEIGHT_PERCENT: usize = 70;
pub const COLUMN_WIDTH_MARGIN: usize = 2;
pub const COLUMN_SPACING: usize = 1;
/// Room for the sort arrow and the search/filter icon next to a title.
pub const HEADER_MARKER_WIDTH: usize = 4;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const PAGER_WINDOW: usize = 7;

fn highlight_style() -> Style {
    Style::new().fg(Color::Black).bg(Color::Rgb(255, 192, 105))
}

fn link_style() -> Style {
    Style::new()
        .fg(Color::Rgb(22, 119, 255))
        .add_modifier(Modifier::UNDERLINED)
}

fn active_style() -> Style {
    Style::new().fg(Color::Rgb(22, 119, 255))
}

#[derive(Default)]
pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, uidata: &UIData, frame: &mut Frame) {
        let area = frame.area();
        match &uidata.screen {
            ScreenData::Login(login) => self.draw_login(login, &uidata.status_message, area, frame),
            ScreenData::Dashboard(data) => {
                self.draw_dashboard(data, uidata, area, frame);
                if let Some(prompt) = &data.prompt {
                    self.draw_prompt(prompt, area, frame);
                }
            }
        }
        if uidata.show_popup {
            self.draw_popup(&uidata.popup_message, area, frame);
        }
    }

    fn draw_login(&self, login: &LoginData, status: &str, area: Rect, frame: &mut Frame) {
        let card = centered(area, 56, 16);
        frame.render_widget(Clear, card);
        let block = Block::bordered()
            .border_set(border::ROUNDED)
            .title_bottom(Line::from(" Tab switch field · Enter log in · Ctrl-C quit ").centered());
        let inner = block.inner(card);
        frame.render_widget(block, card);

        let [title, intro, user, user_err, pass, pass_err, _, button] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        frame.render_widget(
            Paragraph::new(Line::from("Welcome Back!".bold())).centered(),
            title,
        );
        frame.render_widget(Paragraph::new(status).centered().wrap(Wrap { trim: true }), intro);

        let fields = [
            (LoginField::Username, "Username", &login.username, login.username_error, user, user_err),
            (LoginField::Password, "Password", &login.password, login.password_error, pass, pass_err),
        ];
        for (field, placeholder, input, error, field_area, error_area) in fields {
            let focused = login.focus == field;
            let text = if field == LoginField::Password {
                input.masked('•')
            } else {
                input.input.clone()
            };
            let border_style = match (error.is_some(), focused) {
                (true, _) => Style::new().fg(Color::Red),
                (false, true) => active_style(),
                (false, false) => Style::new(),
            };
            let content = if text.is_empty() && !focused {
                Line::from(Span::raw(placeholder).dark_gray())
            } else {
                Line::from(text)
            };
            frame.render_widget(
                Paragraph::new(content).block(Block::bordered().border_style(border_style)),
                field_area,
            );
            if let Some(message) = error {
                frame.render_widget(Paragraph::new(message.red()), error_area);
            }
            if focused {
                set_cursor(frame, field_area, input);
            }
        }

        frame.render_widget(
            Paragraph::new(Line::from(" Log in ".bold().white().on_blue())).centered(),
            button,
        );
    }

    fn draw_dashboard(&mut self, data: &DashboardData, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let [title, pager_top, table_area, pager_bottom, _, footer, statusline] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT as u16),
            Constraint::Length(PAGER_HEIGHT as u16),
            Constraint::Length(uidata.layout.table_block_height as u16),
            Constraint::Length(PAGER_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(FOOTER_HEIGHT as u16),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new(Line::from(data.title.as_str().bold())).centered(),
            title,
        );
        let pager = pager_line(data.page, data.pages, data.total);
        frame.render_widget(Paragraph::new(pager.clone()).centered(), pager_top);
        frame.render_widget(Paragraph::new(pager).right_aligned(), pager_bottom);

        self.draw_table(data, table_area, frame);

        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(data.source_url.as_str(), link_style()))),
            footer,
        );

        let link = match &data.selected_link {
            Some(url) => Span::styled(format!("↗ {url}"), link_style()),
            None if data.rows.is_empty() => Span::raw(""),
            None => Span::raw("no web page").dark_gray(),
        };
        let mut right = vec![link];
        if !data.selected_details.is_empty() {
            right.push(Span::raw(format!("  {}", data.selected_details)).dark_gray());
        }
        let [left_area, right_area] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).areas(statusline);
        frame.render_widget(Paragraph::new(uidata.status_message.as_str()), left_area);
        frame.render_widget(Paragraph::new(Line::from(right)).right_aligned(), right_area);
    }

    fn draw_table(&mut self, data: &DashboardData, area: Rect, frame: &mut Frame) {
        let block = Block::bordered().border_set(border::PLAIN);

        let header = Row::new(
            data.headers
                .iter()
                .enumerate()
                .map(|(idx, h)| header_cell(h, idx == data.selected_column)),
        )
        .style(Style::new().bold());

        let rows = data.rows.iter().map(|cells| Row::new(cells.iter().map(body_cell)));
        let widths = data.headers.iter().map(|h| Constraint::Length(h.width as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(COLUMN_SPACING as u16)
            .row_highlight_style(Style::new().bg(Color::Rgb(230, 244, 255)).fg(Color::Black));

        self.table_state.select(data.selected_row);
        frame.render_stateful_widget(table, area, &mut self.table_state);

        let placeholder = if data.loading {
            Some(format!("{} Loading…", SPINNER[data.spinner % SPINNER.len()]))
        } else if data.rows.is_empty() {
            Some("No data".to_string())
        } else {
            None
        };
        if let Some(text) = placeholder {
            let body = Rect {
                y: area.y + 1 + TABLE_HEADER_HEIGHT as u16,
                height: area.height.saturating_sub(2 + TABLE_HEADER_HEIGHT as u16),
                ..area
            };
            let middle = Rect {
                y: body.y + body.height / 2,
                height: 1.min(body.height),
                ..body
            };
            frame.render_widget(
                Paragraph::new(Span::raw(text).dark_gray()).centered(),
                middle.inner(Margin::new(1, 0)),
            );
        }
    }

    fn draw_prompt(&self, prompt: &PromptView, area: Rect, frame: &mut Frame) {
        match prompt {
            PromptView::Search { column, input } => {
                let popup = centered(area, 60, 5);
                frame.render_widget(Clear, popup);
                let block = Block::bordered()
                    .title(Line::from(format!(" Search {column} ")))
                    .title_bottom(
                        Line::from(" Enter Search · Ctrl-F Filter · Ctrl-R Reset · Esc close ")
                            .centered(),
                    )
                    .border_style(active_style());
                let inner = block.inner(popup);
                frame.render_widget(block, popup);
                let field = Rect { height: 1, ..inner };
                let placeholder = format!("Search {column}");
                let line = if input.input.is_empty() {
                    Line::from(Span::raw(placeholder).dark_gray())
                } else {
                    Line::from(input.input.as_str())
                };
                frame.render_widget(Paragraph::new(line), field);
                frame.set_cursor_position(Position::new(
                    field.x + input.cursor_pos as u16,
                    field.y,
                ));
            }
            PromptView::FilterMenu {
                column,
                query,
                options,
                all_selected,
                cursor,
            } => {
                let height = (options.len() + 5).clamp(6, (area.height as usize).saturating_sub(4).max(6));
                let popup = centered(area, 50, height as u16);
                frame.render_widget(Clear, popup);
                let block = Block::bordered()
                    .title(Line::from(format!(" Filter {column} ")))
                    .title_bottom(
                        Line::from(" Tab toggle · Ctrl-A all · Enter OK · Ctrl-R Reset · Esc ")
                            .centered(),
                    )
                    .border_style(active_style());
                let inner = block.inner(popup);
                frame.render_widget(block, popup);

                let [search, list] =
                    Layout::vertical([Constraint::Length(2), Constraint::Min(1)]).areas(inner);
                let search_line = if query.input.is_empty() {
                    Line::from(vec![Span::raw("⌕ "), "Search in filters".dark_gray()])
                } else {
                    Line::from(vec![Span::raw("⌕ "), Span::raw(query.input.as_str())])
                };
                frame.render_widget(Paragraph::new(search_line), search);
                frame.set_cursor_position(Position::new(
                    search.x + 2 + query.cursor_pos as u16,
                    search.y,
                ));

                let mut lines = Vec::with_capacity(options.len() + 1);
                lines.push(menu_line("Select all", *all_selected, 0, *cursor == 0));
                for (idx, (text, checked)) in options.iter().enumerate() {
                    lines.push(menu_line(text, *checked, 1, *cursor == idx + 1));
                }
                let visible = list.height as usize;
                let offset = cursor.saturating_sub(visible.saturating_sub(1));
                let lines: Vec<Line> = lines.into_iter().skip(offset).take(visible).collect();
                frame.render_widget(Paragraph::new(Text::from(lines)), list);
            }
        }
    }

    fn draw_popup(&self, message: &str, area: Rect, frame: &mut Frame) {
        let lines = message.lines().count() as u16;
        let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16;
        let popup = centered(area, width + 4, lines + 2);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(message).block(
                Block::bordered()
                    .border_set(border::THICK)
                    .title_bottom(Line::from(" Esc close ").centered()),
            ),
            popup,
        );
    }
}

fn header_cell(header: &HeaderView, selected: bool) -> Cell<'static> {
    let mut spans = vec![Span::raw(header.title.clone())];
    match header.sort {
        Some(SortDirection::Ascending) => spans.push(Span::styled(" ▲", active_style())),
        Some(SortDirection::Descending) => spans.push(Span::styled(" ▼", active_style())),
        None => {}
    }
    let icon = match header.filter {
        Some(FilterKind::Search) => Some(" ⌕"),
        Some(FilterKind::Categorical) => Some(" ▾"),
        None => None,
    };
    if let Some(icon) = icon {
        let style = if header.filtered {
            active_style()
        } else {
            Style::new().dark_gray()
        };
        spans.push(Span::styled(icon, style));
    }
    let line = Line::from(spans);
    let cell = Cell::from(line);
    if selected {
        cell.style(Style::new().add_modifier(Modifier::REVERSED))
    } else {
        cell
    }
}

fn body_cell(cell: &CellView) -> Cell<'static> {
    if cell.badge {
        let text = cell.text();
        if text.is_empty() {
            return Cell::from("");
        }
        return Cell::from(Line::from(Span::styled(
            format!(" {text} "),
            Style::new().fg(Color::Rgb(9, 88, 217)).bg(Color::Rgb(230, 244, 255)),
        )));
    }
    let base = if cell.link { link_style() } else { Style::new() };
    let spans: Vec<Span> = cell
        .segments
        .iter()
        .map(|s| {
            let style = if s.emphasized {
                base.patch(highlight_style())
            } else {
                base
            };
            Span::styled(s.text.clone(), style)
        })
        .collect();
    Cell::from(Line::from(spans))
}

fn menu_line(text: &str, checked: bool, depth: usize, focused: bool) -> Line<'static> {
    let mark = if checked { "[x]" } else { "[ ]" };
    let line = Line::from(format!("{}{mark} {text}", "  ".repeat(depth)));
    if focused {
        line.style(Style::new().add_modifier(Modifier::REVERSED))
    } else {
        line
    }
}

/// "‹ 1 2 [3] 4 5 ›  · 42 items", with a window of page numbers around the current page.
fn pager_line(page: usize, pages: usize, total: usize) -> Line<'static> {
    let pages = pages.max(1);
    let half = PAGER_WINDOW / 2;
    let first = page.saturating_sub(half).min(pages.saturating_sub(PAGER_WINDOW));
    let last = std::cmp::min(first + PAGER_WINDOW, pages);

    let mut spans = vec![Span::raw("‹ ")];
    if first > 0 {
        spans.push(Span::raw("… "));
    }
    for p in first..last {
        if p == page {
            spans.push(Span::styled(format!("[{}]", p + 1), active_style().bold()));
        } else {
            spans.push(Span::raw(format!("{}", p + 1)));
        }
        spans.push(Span::raw(" "));
    }
    if last < pages {
        spans.push(Span::raw("… "));
    }
    spans.push(Span::raw("›"));
    spans.push(Span::raw(format!("  · {total} items")).dark_gray());
    Line::from(spans)
}

fn set_cursor(frame: &mut Frame, field: Rect, input: &InputResult) {
    frame.set_cursor_position(Position::new(
        field.x + 1 + input.cursor_pos as u16,
        field.y + 1,
    ));
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
