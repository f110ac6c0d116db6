use arboard::Clipboard;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::{DashConfig, HELP_TEXT, Message, PromptMode};
use crate::engine::{SortDirection, TableEngine, page_bounds, page_count};
use crate::inputter::{InputResult, Inputter};
use crate::loader::{LoadHandle, LoadState, Loader};
use crate::login::{LoginData, LoginForm, LoginOutcome};
use crate::table::{ColumnId, FilterKind, Pin, Row, university_columns};
use crate::ui::{
    COLUMN_SPACING, COLUMN_WIDTH_MARGIN, FOOTER_HEIGHT, HEADER_MARKER_WIDTH, PAGER_HEIGHT,
    STATUSLINE_HEIGHT, TABLE_BORDER, TABLE_HEADER_HEIGHT, TABLE_HEIGHT_PERCENT, TITLE_HEIGHT,
};

pub const DASHBOARD_TITLE: &str = "List Of Universities";

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Screen {
    Login,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    Search(ColumnId),
    FilterMenu(ColumnId),
    Popup,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub table_block_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let chrome = TITLE_HEIGHT + 2 * PAGER_HEIGHT + FOOTER_HEIGHT + STATUSLINE_HEIGHT;
        let min_block = TABLE_BORDER + TABLE_HEADER_HEIGHT + 1;
        let table_block_height = (ui_height * TABLE_HEIGHT_PERCENT / 100)
            .min(ui_height.saturating_sub(chrome))
            .max(min_block);
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(TABLE_BORDER),
            table_height: table_block_height - TABLE_BORDER - TABLE_HEADER_HEIGHT,
            table_block_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSegment {
    pub text: String,
    pub emphasized: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CellView {
    pub segments: Vec<CellSegment>,
    pub link: bool,
    pub badge: bool,
}

impl CellView {
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct HeaderView {
    pub title: String,
    pub width: usize,
    pub sort: Option<SortDirection>,
    pub filter: Option<FilterKind>,
    pub filtered: bool,
}

#[derive(Debug, Clone)]
pub enum PromptView {
    Search {
        column: String,
        input: InputResult,
    },
    FilterMenu {
        column: String,
        query: InputResult,
        options: Vec<(String, bool)>,
        all_selected: bool,
        cursor: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub title: String,
    pub loading: bool,
    pub spinner: usize,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<Vec<CellView>>,
    pub selected_row: Option<usize>,
    pub selected_column: usize,
    pub page: usize,
    pub pages: usize,
    pub total: usize,
    pub source_url: String,
    pub selected_link: Option<String>,
    pub selected_details: String,
    pub prompt: Option<PromptView>,
}

#[derive(Debug, Clone)]
pub enum ScreenData {
    Login(LoginData),
    Dashboard(DashboardData),
}

#[derive(Debug, Clone)]
pub struct UIData {
    pub screen: ScreenData,
    pub layout: UILayout,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
}

/// The mounted dashboard page. Dropping it drops the pending load, which cancels it.
struct Dashboard {
    load: LoadState,
    handle: Option<LoadHandle>,
    rows: Arc<[Row]>,
    engine: TableEngine,
    view: Vec<usize>,
    widths: Vec<usize>,
    page: usize,
    cursor_row: usize,
    offset_row: usize,
    cursor_column: usize,
    offset_column: usize,
    menu_cursor: usize,
    mounted_at: Instant,
}

impl Dashboard {
    fn mount(loader: &Arc<Loader>) -> Self {
        info!("Mounting dashboard, loading {}", loader.url());
        let engine = TableEngine::new(university_columns());
        let mut dashboard = Dashboard {
            load: LoadState::Loading,
            handle: Some(Arc::clone(loader).spawn()),
            rows: Arc::from(Vec::new()),
            engine,
            view: Vec::new(),
            widths: Vec::new(),
            page: 0,
            cursor_row: 0,
            offset_row: 0,
            cursor_column: 0,
            offset_column: 0,
            menu_cursor: 0,
            mounted_at: Instant::now(),
        };
        dashboard.widths = dashboard.natural_widths(usize::MAX);
        dashboard
    }

    fn unmount(self) {
        if let Some(handle) = &self.handle {
            handle.cancel();
        }
        debug!("Dashboard unmounted");
    }

    fn poll_load(&mut self, max_column_width: usize) -> bool {
        let Some(state) = self.handle.as_mut().and_then(LoadHandle::poll) else {
            return false;
        };
        self.handle = None;
        self.apply_load(state, max_column_width);
        true
    }

    fn apply_load(&mut self, state: LoadState, max_column_width: usize) {
        self.rows = state.rows();
        self.load = state;
        self.widths = self.natural_widths(max_column_width);
        self.refresh_view();
    }

    fn natural_widths(&self, max_column_width: usize) -> Vec<usize> {
        self.engine
            .columns()
            .iter()
            .map(|spec| {
                if let Some(width) = spec.fixed_width {
                    return width;
                }
                let content = self
                    .rows
                    .iter()
                    .map(|r| spec.id.value(r).chars().count())
                    .max()
                    .unwrap_or(0);
                let width = std::cmp::max(spec.title.len() + HEADER_MARKER_WIDTH, content)
                    + COLUMN_WIDTH_MARGIN;
                std::cmp::min(width, max_column_width)
            })
            .collect()
    }

    /// Recompute the visible rows and go back to the first page.
    fn refresh_view(&mut self) {
        self.view = self.engine.view(&self.rows);
        self.page = 0;
        self.cursor_row = 0;
        self.offset_row = 0;
        trace!("View has {} of {} rows", self.view.len(), self.rows.len());
    }

    fn page_len(&self, page_size: usize) -> usize {
        page_bounds(self.view.len(), self.page, page_size).len()
    }

    fn selected_row(&self, page_size: usize) -> Option<&Row> {
        let bounds = page_bounds(self.view.len(), self.page, page_size);
        let pos = bounds.start + self.cursor_row;
        if pos >= bounds.end {
            return None;
        }
        self.view.get(pos).map(|&idx| &self.rows[idx])
    }

    fn selected_column(&self) -> ColumnId {
        self.engine.columns()[self.cursor_column].id
    }

    fn scroll_into_view(&mut self, table_height: usize) {
        let height = table_height.max(1);
        if self.cursor_row < self.offset_row {
            self.offset_row = self.cursor_row;
        } else if self.cursor_row >= self.offset_row + height {
            self.offset_row = self.cursor_row + 1 - height;
        }
    }

    /// Indices of the middle (unpinned) columns.
    fn middle_columns(&self) -> Vec<usize> {
        self.engine
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.pin == Pin::None)
            .map(|(idx, _)| idx)
            .collect()
    }

    fn reveal_column(&mut self, table_width: usize) {
        let middle = self.middle_columns();
        let Some(pos) = middle.iter().position(|&c| c == self.cursor_column) else {
            return;
        };
        let visible = visible_columns(&self.widths, &self.pins(), table_width, self.offset_column);
        if !visible.iter().any(|&(c, _)| c == self.cursor_column) || pos < self.offset_column {
            self.offset_column = pos;
        }
    }

    fn pins(&self) -> Vec<Pin> {
        self.engine.columns().iter().map(|c| c.pin).collect()
    }
}

/// Columns that fit into `available`, as (column index, render width).
/// When everything does not fit, pinned columns stay and the unpinned ones are shown
/// starting at `offset` (an index among the unpinned columns).
pub fn visible_columns(
    widths: &[usize],
    pins: &[Pin],
    available: usize,
    offset: usize,
) -> Vec<(usize, usize)> {
    let total: usize = widths.iter().map(|w| w + COLUMN_SPACING).sum();
    if total <= available {
        return widths.iter().copied().enumerate().collect();
    }

    let pinned: usize = widths
        .iter()
        .zip(pins)
        .filter(|(_, p)| **p != Pin::None)
        .map(|(w, _)| w + COLUMN_SPACING)
        .sum();
    let mut budget = available.saturating_sub(pinned);
    let mut middle = Vec::new();
    let unpinned = widths
        .iter()
        .zip(pins)
        .enumerate()
        .filter(|(_, (_, p))| **p == Pin::None)
        .map(|(idx, (w, _))| (idx, *w))
        .skip(offset);
    for (idx, width) in unpinned {
        if width + COLUMN_SPACING <= budget {
            middle.push((idx, width));
            budget -= width + COLUMN_SPACING;
        } else {
            // Add the last partial visible column
            if budget > COLUMN_SPACING {
                middle.push((idx, budget - COLUMN_SPACING));
            }
            break;
        }
    }

    let of = |pin: Pin| {
        widths
            .iter()
            .zip(pins)
            .enumerate()
            .filter(move |(_, (_, p))| **p == pin)
            .map(|(idx, (w, _))| (idx, *w))
    };
    of(Pin::Left).chain(middle).chain(of(Pin::Right)).collect()
}

pub struct Model {
    config: DashConfig,
    pub status: Status,
    screen: Screen,
    modus: Modus,
    previous_modus: Modus,
    loader: Arc<Loader>,
    login: LoginForm,
    dashboard: Option<Dashboard>,
    input: Inputter,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    status_message: String,
}

impl Model {
    pub fn init(config: &DashConfig, loader: Arc<Loader>, ui_width: usize, ui_height: usize) -> Self {
        let uilayout = UILayout::from_values(ui_width, ui_height);
        let mut model = Self {
            config: config.clone(),
            status: Status::Ready,
            screen: Screen::Login,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            loader,
            login: LoginForm::default(),
            dashboard: None,
            input: Inputter::default(),
            uidata: UIData {
                screen: ScreenData::Login(LoginData::default()),
                layout: uilayout.clone(),
                show_popup: false,
                popup_message: String::new(),
                status_message: String::new(),
            },
            uilayout,
            clipboard: None,
            status_message: "Please enter your username and password to log in.".to_string(),
        };
        if config.skip_login {
            model.show_dashboard();
        }
        model.update_uidata();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// Whether key events should reach the model unmapped.
    pub fn prompt_mode(&self) -> Option<PromptMode> {
        match (self.screen, self.modus) {
            (Screen::Login, _) => Some(PromptMode::Login),
            (Screen::Dashboard, Modus::Search(_)) => Some(PromptMode::Search),
            (Screen::Dashboard, Modus::FilterMenu(_)) => Some(PromptMode::FilterMenu),
            _ => None,
        }
    }

    pub fn raw_keyevents(&self) -> bool {
        self.prompt_mode().is_some()
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.dashboard
            .as_ref()
            .is_some_and(|d| d.load.is_loading())
    }

    pub fn quit(&mut self) {
        if let Some(dashboard) = self.dashboard.take() {
            dashboard.unmount();
        }
        self.status = Status::Quitting;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    fn show_dashboard(&mut self) {
        if let Some(old) = self.dashboard.take() {
            old.unmount();
        }
        self.dashboard = Some(Dashboard::mount(&self.loader));
        self.screen = Screen::Dashboard;
        self.modus = Modus::Table;
        self.set_status_message("Loading ...");
    }

    fn logout(&mut self) {
        if let Some(dashboard) = self.dashboard.take() {
            dashboard.unmount();
        }
        self.login = LoginForm::default();
        self.screen = Screen::Login;
        self.modus = Modus::Table;
        self.set_status_message("Logged out.");
    }

    pub fn update(&mut self, message: Option<Message>) {
        let max_column_width = self.config.max_column_width;
        let loaded = self
            .dashboard
            .as_mut()
            .is_some_and(|d| d.poll_load(max_column_width));
        if loaded && let Some(dashboard) = &self.dashboard {
            let took = dashboard.mounted_at.elapsed().as_millis();
            let count = dashboard.rows.len();
            self.set_status_message(format!("Loaded {count} universities in {took}ms"));
        }

        match message {
            Some(Message::Quit) => self.quit(),
            Some(Message::Resize(width, height)) => self.ui_resize(width, height),
            Some(msg) => self.dispatch(msg),
            None => (),
        }

        self.update_uidata();
    }

    fn dispatch(&mut self, msg: Message) {
        match (self.screen, self.modus) {
            (Screen::Login, _) => {
                if let Message::RawKey(key) = msg {
                    self.login_input(key);
                }
            }
            (Screen::Dashboard, Modus::Table) => match msg {
                Message::MoveUp => self.move_selection_up(),
                Message::MoveDown => self.move_selection_down(),
                Message::MoveLeft => self.move_column(false),
                Message::MoveRight => self.move_column(true),
                Message::MoveBeginning => self.move_selection_beginning(),
                Message::MoveEnd => self.move_selection_end(),
                Message::NextPage => self.change_page(true),
                Message::PrevPage => self.change_page(false),
                Message::OpenColumnMenu => self.open_column_menu(),
                Message::Sort => self.sort_selected_column(),
                Message::CopyLink => self.copy_link(),
                Message::Reload => self.show_dashboard(),
                Message::Logout => self.logout(),
                Message::Help => self.show_help(),
                _ => (),
            },
            (Screen::Dashboard, Modus::Popup) => {
                if matches!(msg, Message::Exit | Message::Help) {
                    self.modus = self.previous_modus;
                    self.previous_modus = Modus::Popup;
                }
            }
            (Screen::Dashboard, Modus::Search(column)) => {
                if let Message::RawKey(key) = msg {
                    self.search_input(column, key);
                }
            }
            (Screen::Dashboard, Modus::FilterMenu(column)) => {
                if let Message::RawKey(key) = msg {
                    self.filter_menu_input(column, key);
                }
            }
        }
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        let layout = self.uilayout.clone();
        if let Some(dashboard) = &mut self.dashboard {
            dashboard.scroll_into_view(layout.table_height);
            dashboard.reveal_column(layout.table_width);
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
    }

    // -------------------- Input handling ---------------------- //

    fn login_input(&mut self, key: KeyEvent) {
        if self.login.read(key) == LoginOutcome::Submitted {
            self.show_dashboard();
        }
    }

    fn search_input(&mut self, column: ColumnId, key: KeyEvent) {
        let Some(dashboard) = &mut self.dashboard else {
            return;
        };
        let engine = &mut dashboard.engine;
        match (key.code, key.modifiers) {
            (KeyCode::Char('r'), KeyModifiers::CONTROL) => {
                engine.reset(column);
                self.input.clear();
                dashboard.refresh_view();
            }
            (KeyCode::Char('f'), KeyModifiers::CONTROL) => {
                engine.edit_search(column, self.input.value());
                engine.filter_search(column);
                dashboard.refresh_view();
            }
            _ => {
                let result = self.input.read(key);
                if result.canceled {
                    engine.close(column);
                    self.modus = Modus::Table;
                } else {
                    engine.edit_search(column, &result.input);
                    if result.finished {
                        engine.confirm_search(column);
                        dashboard.refresh_view();
                        self.modus = Modus::Table;
                    }
                }
            }
        }
        let summary = self
            .dashboard
            .as_ref()
            .filter(|_| self.modus == Modus::Table)
            .map(|d| format!("{} of {} universities", d.view.len(), d.rows.len()));
        if let Some(summary) = summary {
            self.set_status_message(summary);
        }
    }

    fn filter_menu_input(&mut self, column: ColumnId, key: KeyEvent) {
        let Some(dashboard) = &mut self.dashboard else {
            return;
        };
        let options = dashboard.engine.visible_options(&dashboard.rows, column);
        match (key.code, key.modifiers) {
            (KeyCode::Up, _) => dashboard.menu_cursor = dashboard.menu_cursor.saturating_sub(1),
            (KeyCode::Down, _) => {
                dashboard.menu_cursor = std::cmp::min(dashboard.menu_cursor + 1, options.len())
            }
            (KeyCode::Tab, _) => {
                if dashboard.menu_cursor == 0 {
                    dashboard.engine.toggle_all_options(column, &options);
                } else if let Some(option) = options.get(dashboard.menu_cursor - 1) {
                    dashboard.engine.toggle_option(column, &option.value);
                }
            }
            (KeyCode::Char('a'), KeyModifiers::CONTROL) => {
                dashboard.engine.toggle_all_options(column, &options)
            }
            (KeyCode::Char('r'), KeyModifiers::CONTROL) => {
                dashboard.engine.reset(column);
                self.input.clear();
                dashboard.menu_cursor = 0;
                dashboard.refresh_view();
            }
            (KeyCode::Enter, _) => {
                dashboard.engine.confirm_options(column);
                dashboard.refresh_view();
                self.modus = Modus::Table;
            }
            (KeyCode::Esc, _) => {
                dashboard.engine.close(column);
                self.modus = Modus::Table;
            }
            _ => {
                let result = self.input.read(key);
                dashboard.engine.set_option_query(column, &result.input);
                let narrowed = dashboard.engine.visible_options(&dashboard.rows, column);
                dashboard.menu_cursor = std::cmp::min(dashboard.menu_cursor, narrowed.len());
            }
        }
    }

    // -------------------- Control handling functions ---------------------- //

    fn open_column_menu(&mut self) {
        let Some(dashboard) = &mut self.dashboard else {
            return;
        };
        let column = dashboard.selected_column();
        let kind = dashboard.engine.spec(column).and_then(|c| c.filter);
        if !dashboard.engine.open(column) {
            let title = dashboard.engine.spec(column).map_or("", |c| c.title);
            self.set_status_message(format!("{title} can not be searched or filtered"));
            return;
        }
        self.previous_modus = self.modus;
        match kind {
            Some(FilterKind::Search) => {
                let draft = dashboard.engine.draft(column).first().cloned().unwrap_or_default();
                self.input.set(&draft);
                self.modus = Modus::Search(column);
            }
            Some(FilterKind::Categorical) => {
                self.input.clear();
                dashboard.menu_cursor = 0;
                self.modus = Modus::FilterMenu(column);
            }
            None => {}
        }
        trace!("Opened {column:?} menu, modus {:?}", self.modus);
    }

    fn sort_selected_column(&mut self) {
        let Some(dashboard) = &mut self.dashboard else {
            return;
        };
        let column = dashboard.selected_column();
        let sort = dashboard.engine.cycle_sort(column);
        dashboard.refresh_view();
        let title = dashboard.engine.spec(column).map_or("", |c| c.title);
        let message = match sort {
            Some(s) if s.direction == SortDirection::Ascending => format!("Sorted by {title} ascending"),
            Some(_) => format!("Sorted by {title} descending"),
            None => "Sort cleared".to_string(),
        };
        self.set_status_message(message);
    }

    fn copy_link(&mut self) {
        let page_size = self.config.page_size;
        let Some(link) = self
            .dashboard
            .as_ref()
            .and_then(|d| d.selected_row(page_size))
            .and_then(Row::link)
            .map(str::to_string)
        else {
            self.set_status_message("Selected university has no web page");
            return;
        };
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => trace!("Clipboard not available: {:?}", e),
            }
        }
        let copied = self
            .clipboard
            .as_mut()
            .map(|c| c.set_text(link.clone()));
        match copied {
            Some(Ok(_)) => self.set_status_message(format!("Copied {link}")),
            Some(Err(e)) => {
                trace!("Error copying to clipboard: {:?}", e);
                self.set_status_message("Could not copy to clipboard");
            }
            None => self.set_status_message("Clipboard not available"),
        }
    }

    fn move_selection_up(&mut self) {
        let table_height = self.uilayout.table_height;
        if let Some(dashboard) = &mut self.dashboard {
            dashboard.cursor_row = dashboard.cursor_row.saturating_sub(1);
            dashboard.scroll_into_view(table_height);
        }
    }

    fn move_selection_down(&mut self) {
        let (page_size, table_height) = (self.config.page_size, self.uilayout.table_height);
        if let Some(dashboard) = &mut self.dashboard {
            let len = dashboard.page_len(page_size);
            if dashboard.cursor_row + 1 < len {
                dashboard.cursor_row += 1;
            }
            dashboard.scroll_into_view(table_height);
        }
    }

    fn move_selection_beginning(&mut self) {
        if let Some(dashboard) = &mut self.dashboard {
            dashboard.cursor_row = 0;
            dashboard.offset_row = 0;
        }
    }

    fn move_selection_end(&mut self) {
        let (page_size, table_height) = (self.config.page_size, self.uilayout.table_height);
        if let Some(dashboard) = &mut self.dashboard {
            dashboard.cursor_row = dashboard.page_len(page_size).saturating_sub(1);
            dashboard.scroll_into_view(table_height);
        }
    }

    fn change_page(&mut self, forward: bool) {
        let page_size = self.config.page_size;
        if let Some(dashboard) = &mut self.dashboard {
            let pages = page_count(dashboard.view.len(), page_size);
            dashboard.page = if forward {
                std::cmp::min(dashboard.page + 1, pages - 1)
            } else {
                dashboard.page.saturating_sub(1)
            };
            dashboard.cursor_row = 0;
            dashboard.offset_row = 0;
        }
    }

    fn move_column(&mut self, right: bool) {
        let table_width = self.uilayout.table_width;
        if let Some(dashboard) = &mut self.dashboard {
            let last = dashboard.engine.columns().len().saturating_sub(1);
            dashboard.cursor_column = if right {
                std::cmp::min(dashboard.cursor_column + 1, last)
            } else {
                dashboard.cursor_column.saturating_sub(1)
            };
            dashboard.reveal_column(table_width);
        }
    }

    // -------------------- UI snapshot ---------------------- //

    fn update_uidata(&mut self) {
        let screen = match self.screen {
            Screen::Login => ScreenData::Login(self.login.data()),
            Screen::Dashboard => ScreenData::Dashboard(self.dashboard_data()),
        };
        let show_popup = self.modus == Modus::Popup;
        self.uidata = UIData {
            screen,
            layout: self.uilayout.clone(),
            show_popup,
            popup_message: if show_popup {
                HELP_TEXT.to_string()
            } else {
                String::new()
            },
            status_message: self.status_message.clone(),
        };
    }

    fn dashboard_data(&mut self) -> DashboardData {
        let page_size = self.config.page_size;
        let layout = &self.uilayout;
        let url = self.loader.url().to_string();
        let Some(dashboard) = &mut self.dashboard else {
            return DashboardData::default();
        };

        let visible = visible_columns(
            &dashboard.widths,
            &dashboard.pins(),
            layout.table_width,
            dashboard.offset_column,
        );
        let engine = &dashboard.engine;
        let headers = visible
            .iter()
            .map(|&(idx, width)| {
                let spec = &engine.columns()[idx];
                HeaderView {
                    title: spec.title.to_string(),
                    width,
                    sort: engine.sort_of(spec.id),
                    filter: spec.filter,
                    filtered: engine.is_filtered(spec.id),
                }
            })
            .collect();

        let bounds = page_bounds(dashboard.view.len(), dashboard.page, page_size);
        let begin = bounds.start + dashboard.offset_row;
        let end = std::cmp::min(begin + layout.table_height.max(1), bounds.end);
        let rows = dashboard.view[begin.min(end)..end]
            .iter()
            .map(|&ridx| {
                let row = &dashboard.rows[ridx];
                visible
                    .iter()
                    .map(|&(idx, _)| {
                        let spec = &engine.columns()[idx];
                        let segments = engine
                            .highlight(spec.id, spec.id.value(row))
                            .into_iter()
                            .map(|s| CellSegment {
                                text: s.text.to_string(),
                                emphasized: s.emphasized,
                            })
                            .collect();
                        CellView {
                            segments,
                            link: spec.link && row.link().is_some(),
                            badge: spec.badge,
                        }
                    })
                    .collect()
            })
            .collect::<Vec<Vec<CellView>>>();

        let selected = dashboard.selected_row(page_size);
        let selected_link = selected.and_then(Row::link).map(str::to_string);
        let selected_details = selected
            .map(|row| {
                let mut details = Vec::new();
                if let Some(region) = &row.state_province {
                    details.push(region.clone());
                }
                if !row.domains.is_empty() {
                    details.push(row.domains.join(", "));
                }
                details.join(" · ")
            })
            .unwrap_or_default();

        let selected_column = visible
            .iter()
            .position(|&(idx, _)| idx == dashboard.cursor_column)
            .unwrap_or(0);

        let prompt = match self.modus {
            Modus::Search(column) => Some(PromptView::Search {
                column: column.key().to_string(),
                input: self.input.get(),
            }),
            Modus::FilterMenu(column) => {
                let options = dashboard.engine.visible_options(&dashboard.rows, column);
                let draft = dashboard.engine.draft(column);
                let all_selected =
                    !options.is_empty() && options.iter().all(|o| draft.contains(&o.value));
                Some(PromptView::FilterMenu {
                    column: column.key().to_string(),
                    query: self.input.get(),
                    options: options
                        .into_iter()
                        .map(|o| {
                            let checked = draft.contains(&o.value);
                            (o.text, checked)
                        })
                        .collect(),
                    all_selected,
                    cursor: dashboard.menu_cursor,
                })
            }
            Modus::Table | Modus::Popup => None,
        };

        DashboardData {
            title: DASHBOARD_TITLE.to_string(),
            loading: dashboard.load.is_loading(),
            spinner: (dashboard.mounted_at.elapsed().as_millis() / 100) as usize,
            headers,
            selected_row: (!rows.is_empty())
                .then(|| dashboard.cursor_row.saturating_sub(dashboard.offset_row)),
            rows,
            selected_column,
            page: dashboard.page.min(page_count(dashboard.view.len(), page_size) - 1),
            pages: page_count(dashboard.view.len(), page_size),
            total: dashboard.view.len(),
            source_url: url,
            selected_link,
            selected_details,
            prompt,
        }
    }
}
