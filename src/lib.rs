use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use polars::prelude::DataFrame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap};

pub mod chart;
pub mod compare;
pub mod config;
pub mod dedup;
pub mod error;
pub mod lookup;
pub mod session;
pub mod statistics;
pub mod table;
pub mod transport;
pub mod widgets;
pub mod xlsx;

pub use config::{ConfigManager, Settings};
pub use error::Error;
pub use session::{Session, SessionState};
pub use transport::SendOutcome;

use chart::ChartKind;
use lookup::MatchMode;
use transport::{EmailJob, WhatsAppJob};
use widgets::datatable::{follow_selection, DataTableView};
use widgets::prompt::{centered, Prompt, PromptField, PromptView};

/// Application name used for the config directory and window titles.
pub const APP_NAME: &str = "xltool";

pub enum AppEvent {
    Key(KeyEvent),
    /// Load a workbook as the active table; optional sheet selector.
    Open(PathBuf, Option<String>),
    /// Result of a background send, reported by a transport thread.
    Transport(error::Result<SendOutcome>),
    Resize(u16, u16),
    Exit,
    Crash(String),
}

#[derive(Default)]
pub struct ErrorModal {
    pub active: bool,
    pub message: String,
}

impl ErrorModal {
    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

/// Which operation a confirmed prompt feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Open,
    Sheet,
    EditCell { row: usize },
    Dedupe,
    DedupeExport,
    Lookup,
    Compare,
    Export,
    SaveAs,
    Chart,
    Email,
    WhatsApp,
    ExportResult,
}

/// A read-only result (lookup matches, statistics) shown as an overlay
/// with its own export key.
pub struct ResultView {
    pub title: String,
    /// Sheet name used when the result is exported.
    pub sheet: String,
    pub df: DataFrame,
    pub offset: usize,
}

pub struct App {
    pub session: Session,
    events: Sender<AppEvent>,
    prompt: Option<(PromptKind, Prompt)>,
    pub error_modal: ErrorModal,
    pub result_view: Option<ResultView>,
    show_help: bool,
    pub status: String,
    offset: usize,
    selected: usize,
    /// Visible data rows, updated on every render.
    page: usize,
    accent: Color,
}

impl App {
    pub fn new(events: Sender<AppEvent>) -> App {
        let config = ConfigManager::new(APP_NAME).unwrap_or_else(|e| {
            eprintln!("Warning: could not determine config directory: {}", e);
            ConfigManager::with_dir(std::env::temp_dir().join(APP_NAME))
        });
        let session = Session::new(config);
        let accent = session.settings().theme.accent_color();
        App {
            session,
            events,
            prompt: None,
            error_modal: ErrorModal::default(),
            result_view: None,
            show_help: false,
            status: "No file loaded".to_string(),
            offset: 0,
            selected: 0,
            page: 20,
            accent,
        }
    }

    pub fn send_event(&mut self, event: AppEvent) {
        let _ = self.events.send(event);
    }

    /// Handle one event; may hand a follow-up event back to the loop.
    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        match event {
            AppEvent::Key(key) => self.handle_key(*key),
            AppEvent::Open(path, sheet) => {
                self.open(path, sheet.as_deref());
                None
            }
            AppEvent::Transport(result) => {
                match result {
                    Ok(outcome) => self.status = outcome.detail().to_string(),
                    Err(e) => self.error_modal.show(e.to_string()),
                }
                None
            }
            AppEvent::Resize(_, _) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn open(&mut self, path: &Path, sheet: Option<&str>) {
        match self.session.open(path, sheet) {
            Ok(()) => {
                self.offset = 0;
                self.selected = 0;
                if let Some(table) = self.session.table() {
                    self.status = format!(
                        "Loaded {} | rows: {} | columns: {}",
                        table.path.display(),
                        table.df.height(),
                        table.df.width()
                    );
                }
            }
            Err(e) => self.error_modal.show(e.to_string()),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppEvent> {
        if self.error_modal.active {
            self.error_modal.hide();
            return None;
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return None;
        }
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return None;
        }
        if self.result_view.is_some() {
            self.handle_result_key(key);
            return None;
        }
        self.handle_normal_key(key)
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
            }
            KeyCode::Enter => {
                if let Some((kind, prompt)) = self.prompt.take() {
                    self.dispatch_prompt(kind, prompt);
                }
            }
            KeyCode::Tab | KeyCode::Down => {
                if let Some((_, prompt)) = self.prompt.as_mut() {
                    prompt.next_field();
                }
            }
            KeyCode::BackTab | KeyCode::Up => {
                if let Some((_, prompt)) = self.prompt.as_mut() {
                    prompt.prev_field();
                }
            }
            KeyCode::Backspace => {
                if let Some((_, prompt)) = self.prompt.as_mut() {
                    prompt.backspace();
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some((_, prompt)) = self.prompt.as_mut() {
                    prompt.insert_char(c);
                }
            }
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyEvent) {
        let Some(view) = self.result_view.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.result_view = None;
            }
            KeyCode::Down => {
                view.offset = (view.offset + 1).min(view.df.height().saturating_sub(1));
            }
            KeyCode::Up => view.offset = view.offset.saturating_sub(1),
            KeyCode::PageDown => {
                view.offset = (view.offset + 10).min(view.df.height().saturating_sub(1));
            }
            KeyCode::PageUp => view.offset = view.offset.saturating_sub(10),
            KeyCode::Char('x') => {
                self.prompt = Some((
                    PromptKind::ExportResult,
                    Prompt::new(
                        "Export result",
                        vec![PromptField::new("Output file (.xlsx)")],
                    ),
                ));
            }
            _ => {}
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<AppEvent> {
        match key.code {
            KeyCode::Char('q') => return Some(AppEvent::Exit),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('o') => {
                self.prompt = Some((
                    PromptKind::Open,
                    Prompt::new(
                        "Open workbook",
                        vec![
                            PromptField::new("Path"),
                            PromptField::new("Sheet (name or index, empty = first)"),
                        ],
                    ),
                ));
            }
            KeyCode::Down => self.move_selection(1),
            KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(self.page as isize),
            KeyCode::PageUp => self.move_selection(-(self.page as isize)),
            KeyCode::Home => {
                self.selected = 0;
                follow_selection(&mut self.offset, self.selected, self.page);
            }
            KeyCode::End => {
                self.selected = self.table_height().saturating_sub(1);
                follow_selection(&mut self.offset, self.selected, self.page);
            }
            KeyCode::Char('n') => {
                if let Some(table) = self.session.table() {
                    let names = table.sheet_names.join(", ");
                    self.prompt = Some((
                        PromptKind::Sheet,
                        Prompt::new(
                            &format!("Switch sheet ({names})"),
                            vec![PromptField::with_value(
                                "Sheet (name or index)",
                                table.sheet.clone(),
                            )],
                        ),
                    ));
                } else {
                    self.status = "Load a file first.".to_string();
                }
            }
            KeyCode::Enter => {
                if let Some(table) = self.session.table() {
                    if table.height() == 0 {
                        self.status = "Nothing to edit.".to_string();
                        return None;
                    }
                    let first_column = table.columns().first().cloned().unwrap_or_default();
                    let current = table
                        .cell(self.selected, &first_column)
                        .map(|v| v.render())
                        .unwrap_or_default();
                    self.prompt = Some((
                        PromptKind::EditCell { row: self.selected },
                        Prompt::new(
                            &format!("Edit row {} ({first_column}={current})", self.selected),
                            vec![
                                PromptField::with_value("Column", first_column),
                                PromptField::new("New value"),
                            ],
                        ),
                    ));
                } else {
                    self.status = "Load a file first.".to_string();
                }
            }
            KeyCode::Char('t') => match self.session.trim_whitespace() {
                Ok(()) => self.status = "Trimmed whitespace in text cells.".to_string(),
                Err(e) => self.error_modal.show(e.to_string()),
            },
            KeyCode::Char('d') => {
                self.prompt = Some((
                    PromptKind::Dedupe,
                    Prompt::new(
                        "Remove duplicates (keep first)",
                        vec![PromptField::new("Key column")],
                    ),
                ));
            }
            KeyCode::Char('D') => {
                self.prompt = Some((
                    PromptKind::DedupeExport,
                    Prompt::new(
                        "Deduplicate into a new workbook",
                        vec![
                            PromptField::new("Key column"),
                            PromptField::new("Output file (.xlsx)"),
                        ],
                    ),
                ));
            }
            KeyCode::Char('c') => {
                let suggested = format!(
                    "compare_{}.xlsx",
                    chrono::Local::now().format("%Y%m%d_%H%M%S")
                );
                self.prompt = Some((
                    PromptKind::Compare,
                    Prompt::new(
                        "Compare two workbooks by column",
                        vec![
                            PromptField::new("File 1"),
                            PromptField::new("Key column (file 1)"),
                            PromptField::new("File 2"),
                            PromptField::new("Key column (file 2)"),
                            PromptField::with_value("Output file", suggested),
                        ],
                    ),
                ));
            }
            KeyCode::Char('l') => {
                self.prompt = Some((
                    PromptKind::Lookup,
                    Prompt::new(
                        "Lookup rows",
                        vec![
                            PromptField::new("File (empty = active table)"),
                            PromptField::new("Column"),
                            PromptField::new("Value"),
                            PromptField::with_value("Match (Exact/Partial)", "Exact"),
                        ],
                    ),
                ));
            }
            KeyCode::Char('a') => match self.session.describe() {
                Ok(df) => {
                    self.result_view = Some(ResultView {
                        title: "Descriptive statistics".to_string(),
                        sheet: "Descriptive".to_string(),
                        df,
                        offset: 0,
                    })
                }
                Err(e) => self.error_modal.show(e.to_string()),
            },
            KeyCode::Char('r') => match self.session.correlation() {
                Ok(df) => {
                    self.result_view = Some(ResultView {
                        title: "Correlation matrix".to_string(),
                        sheet: "Correlation".to_string(),
                        df,
                        offset: 0,
                    })
                }
                Err(e) => self.error_modal.show(e.to_string()),
            },
            KeyCode::Char('g') => {
                self.prompt = Some((
                    PromptKind::Chart,
                    Prompt::new(
                        "Quick chart",
                        vec![
                            PromptField::with_value("Type (line/bar/pie)", "line"),
                            PromptField::new("X column (optional)"),
                            PromptField::new("Y column"),
                            PromptField::new("Output file (.png)"),
                        ],
                    ),
                ));
            }
            KeyCode::Char('x') => {
                self.prompt = Some((
                    PromptKind::Export,
                    Prompt::new(
                        "Export active table",
                        vec![PromptField::new("Output file (.xlsx)")],
                    ),
                ));
            }
            KeyCode::Char('s') => match self.session.save() {
                Ok(path) => {
                    self.status = format!("Saved to {}", path.display());
                }
                Err(e) => self.error_modal.show(e.to_string()),
            },
            KeyCode::Char('S') => {
                self.prompt = Some((
                    PromptKind::SaveAs,
                    Prompt::new("Save as", vec![PromptField::new("Output file (.xlsx)")]),
                ));
            }
            KeyCode::Char('m') => self.open_email_prompt(),
            KeyCode::Char('w') => self.open_whatsapp_prompt(),
            _ => {}
        }
        None
    }

    fn open_email_prompt(&mut self) {
        let settings = self.session.settings().smtp.clone();
        let attachment = self
            .session
            .last_exported()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let remember = if settings.remember { "y" } else { "n" };
        self.prompt = Some((
            PromptKind::Email,
            Prompt::new(
                "Send via email (SMTP)",
                vec![
                    PromptField::new("To (comma separated)"),
                    PromptField::with_value("Subject", format!("{APP_NAME} - exported file")),
                    PromptField::with_value("Message", "Please find the attached file."),
                    PromptField::with_value(
                        "SMTP (host:port)",
                        settings.server.unwrap_or_else(|| "smtp.gmail.com:587".to_string()),
                    ),
                    PromptField::with_value("Sender email", settings.sender.unwrap_or_default()),
                    PromptField::masked("Password / app password"),
                    PromptField::with_value("Remember SMTP settings (y/n)", remember),
                    PromptField::with_value("Attachment", attachment),
                ],
            ),
        ));
    }

    fn open_whatsapp_prompt(&mut self) {
        let attachment = self
            .session
            .last_exported()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.prompt = Some((
            PromptKind::WhatsApp,
            Prompt::new(
                "Send via WhatsApp Web",
                vec![
                    PromptField::new("Phone (international, e.g. 9198xxxxxxx)"),
                    PromptField::new("Message (optional)"),
                    PromptField::with_value("File", attachment),
                ],
            ),
        ));
    }

    fn dispatch_prompt(&mut self, kind: PromptKind, prompt: Prompt) {
        match kind {
            PromptKind::Open => {
                let path = prompt.value(0).to_string();
                if path.is_empty() {
                    self.error_modal.show("Enter a file path.".to_string());
                    return;
                }
                let sheet = non_empty(prompt.value(1));
                self.open(Path::new(&path), sheet.as_deref());
            }
            PromptKind::Sheet => {
                let sheet = prompt.value(0).to_string();
                match self.session.switch_sheet(&sheet) {
                    Ok(()) => {
                        self.offset = 0;
                        self.selected = 0;
                        self.status = format!("Loaded sheet: {sheet}");
                    }
                    Err(e) => self.error_modal.show(e.to_string()),
                }
            }
            PromptKind::EditCell { row } => {
                let column = prompt.value(0).to_string();
                let raw = prompt.fields[1].value.clone();
                match self.session.set_cell(row, &column, &raw) {
                    Ok(()) => self.status = format!("Updated {column}[{row}]"),
                    Err(e) => self.error_modal.show(e.to_string()),
                }
            }
            PromptKind::Dedupe => {
                let column = prompt.value(0).to_string();
                let before = self.table_height();
                match self.session.dedupe(&column) {
                    Ok(removed) => {
                        self.clamp_selection();
                        self.status = format!(
                            "Removed {removed} duplicate row(s) by {column} | rows before: {before} | after: {}",
                            self.table_height()
                        );
                    }
                    Err(e) => self.error_modal.show(e.to_string()),
                }
            }
            PromptKind::DedupeExport => {
                let column = prompt.value(0).to_string();
                let out = PathBuf::from(prompt.value(1));
                match self.session.dedupe_to_file(&column, &out) {
                    Ok(path) => self.status = format!("Cleaned file exported to {}", path.display()),
                    Err(e) => self.error_modal.show(e.to_string()),
                }
            }
            PromptKind::Lookup => {
                let file = non_empty(prompt.value(0)).map(PathBuf::from);
                let column = prompt.value(1).to_string();
                let query = prompt.value(2).to_string();
                let mode = MatchMode::parse(prompt.value(3));
                match self.session.lookup(file.as_deref(), &column, &query, mode) {
                    Ok(result) if result.is_empty() => {
                        self.status = "No matching rows found.".to_string();
                    }
                    Ok(result) => {
                        self.status = format!("{} matching row(s) found.", result.rows.height());
                        self.result_view = Some(ResultView {
                            title: format!(
                                "{} match for '{}' in {}",
                                result.mode.as_str(),
                                result.query,
                                result.column
                            ),
                            sheet: "LookupResult".to_string(),
                            df: result.rows,
                            offset: 0,
                        });
                    }
                    Err(e) => self.error_modal.show(e.to_string()),
                }
            }
            PromptKind::Compare => {
                let left = PathBuf::from(prompt.value(0));
                let key_left = prompt.value(1).to_string();
                let right = PathBuf::from(prompt.value(2));
                let key_right = prompt.value(3).to_string();
                let out = PathBuf::from(prompt.value(4));
                if prompt.value(0).is_empty()
                    || key_left.is_empty()
                    || right.as_os_str().is_empty()
                    || key_right.is_empty()
                {
                    self.error_modal
                        .show("Choose both files and both columns.".to_string());
                    return;
                }
                match self
                    .session
                    .compare_to_file(&left, &key_left, &right, &key_right, &out)
                {
                    Ok((path, cmp)) => {
                        self.status = format!(
                            "Comparison exported: {} | matches: {} | only file1: {} | only file2: {}",
                            path.display(),
                            cmp.matched.height(),
                            cmp.only_left.height(),
                            cmp.only_right.height()
                        );
                    }
                    Err(e) => self.error_modal.show(e.to_string()),
                }
            }
            PromptKind::Export => {
                let out = PathBuf::from(prompt.value(0));
                match self.session.export(&out) {
                    Ok(path) => self.status = format!("Exported to {}", path.display()),
                    Err(e) => self.error_modal.show(e.to_string()),
                }
            }
            PromptKind::SaveAs => {
                let out = PathBuf::from(prompt.value(0));
                match self.session.save_as(&out) {
                    Ok(path) => self.status = format!("Saved to {}", path.display()),
                    Err(e) => self.error_modal.show(e.to_string()),
                }
            }
            PromptKind::Chart => {
                let Some(kind) = ChartKind::parse(prompt.value(0)) else {
                    self.error_modal
                        .show("Chart type must be line, bar, or pie.".to_string());
                    return;
                };
                let x = non_empty(prompt.value(1));
                let y = prompt.value(2).to_string();
                let out = PathBuf::from(prompt.value(3));
                match self.session.chart(kind, x.as_deref(), &y, &out) {
                    Ok(path) => self.status = format!("Chart written to {}", path.display()),
                    Err(e) => self.error_modal.show(e.to_string()),
                }
            }
            PromptKind::Email => self.dispatch_email(prompt),
            PromptKind::WhatsApp => {
                let phone = prompt.value(0).to_string();
                if phone.is_empty() {
                    self.error_modal.show("Enter a phone number.".to_string());
                    return;
                }
                let attachment = PathBuf::from(prompt.value(2));
                if !attachment.exists() {
                    self.error_modal
                        .show("Export a file first, or name an existing one.".to_string());
                    return;
                }
                let job = WhatsAppJob {
                    phone,
                    message: prompt.fields[1].value.clone(),
                    attachment,
                };
                transport::spawn_whatsapp(job, self.events.clone());
                self.status = "Opening WhatsApp Web in the background...".to_string();
            }
            PromptKind::ExportResult => {
                let out = PathBuf::from(prompt.value(0));
                let Some(view) = self.result_view.as_ref() else {
                    return;
                };
                let sheet = view.sheet.clone();
                let df = view.df.clone();
                match self.session.export_frame(&sheet, &df, &out) {
                    Ok(path) => self.status = format!("Result exported to {}", path.display()),
                    Err(e) => self.error_modal.show(e.to_string()),
                }
            }
        }
    }

    fn dispatch_email(&mut self, prompt: Prompt) {
        let recipients: Vec<String> = prompt
            .value(0)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
        if recipients.is_empty() {
            self.error_modal.show("Enter recipient email(s).".to_string());
            return;
        }
        let server = prompt.value(3).to_string();
        let sender = prompt.value(4).to_string();
        let password = prompt.fields[5].value.clone();
        if server.is_empty() && sender.is_empty() && password.is_empty() {
            self.status = "No SMTP credentials provided - skipping email send.".to_string();
            return;
        }
        if server.is_empty() || sender.is_empty() || password.is_empty() {
            self.error_modal
                .show("Enter SMTP server, sender, and password.".to_string());
            return;
        }
        let attachment = PathBuf::from(prompt.value(7));
        if !attachment.exists() {
            self.error_modal
                .show("Export a file first, or name an existing one.".to_string());
            return;
        }

        let remember = prompt.value(6).to_ascii_lowercase().starts_with('y');
        self.session.remember_smtp(&server, &sender, remember);

        let job = EmailJob {
            server,
            sender,
            password,
            recipients,
            subject: prompt.value(1).to_string(),
            body: prompt.fields[2].value.clone(),
            attachment,
        };
        transport::spawn_email(job, self.events.clone());
        self.status = "Sending email in the background...".to_string();
    }

    fn table_height(&self) -> usize {
        self.session.table().map_or(0, |t| t.height())
    }

    fn move_selection(&mut self, delta: isize) {
        let height = self.table_height();
        if height == 0 {
            return;
        }
        let selected = self.selected as isize + delta;
        self.selected = selected.clamp(0, height as isize - 1) as usize;
        follow_selection(&mut self.offset, self.selected, self.page);
    }

    fn clamp_selection(&mut self) {
        let height = self.table_height();
        if height == 0 {
            self.selected = 0;
            self.offset = 0;
        } else if self.selected >= height {
            self.selected = height - 1;
            follow_selection(&mut self.offset, self.selected, self.page);
        }
    }
}

const HELP: &[(&str, &str)] = &[
    ("o", "Open workbook"),
    ("n", "Switch sheet"),
    ("Enter", "Edit selected row"),
    ("t", "Trim whitespace in text cells"),
    ("d / D", "Remove duplicates (in place / to a new file)"),
    ("c", "Compare two workbooks by column"),
    ("l", "Lookup rows (exact or partial)"),
    ("a", "Descriptive statistics"),
    ("r", "Correlation matrix"),
    ("g", "Quick chart (line/bar/pie)"),
    ("x", "Export active table"),
    ("s / S", "Save (with backup) / save as"),
    ("m", "Send via email"),
    ("w", "Send via WhatsApp Web"),
    ("?", "This help"),
    ("q", "Quit"),
];

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

        // title line
        let title = match self.session.table() {
            Some(table) => {
                let dirty = if self.session.state() == SessionState::Dirty {
                    " [modified]"
                } else {
                    ""
                };
                format!(
                    "{APP_NAME} - {} [{}]{dirty}",
                    table.path.display(),
                    table.sheet
                )
            }
            None => format!("{APP_NAME} - no file"),
        };
        Paragraph::new(title)
            .style(Style::default().fg(self.accent).add_modifier(Modifier::BOLD))
            .render(chunks[0], buf);

        // data area
        match self.session.table() {
            Some(table) => {
                self.page = DataTableView::page_size(chunks[1]);
                follow_selection(&mut self.offset, self.selected, self.page);
                DataTableView {
                    df: &table.df,
                    offset: self.offset,
                    selected: Some(self.selected),
                    accent: self.accent,
                    title: format!(
                        "rows: {} | columns: {}",
                        table.df.height(),
                        table.df.width()
                    ),
                }
                .render(chunks[1], buf);
            }
            None => {
                Paragraph::new("No file loaded. Press o to open a workbook, ? for help.")
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(self.accent)),
                    )
                    .render(chunks[1], buf);
            }
        }

        Paragraph::new(self.status.clone()).render(chunks[2], buf);
        Paragraph::new(
            "o open | s save | d dedupe | c compare | l lookup | a stats | g chart | m email | ? help | q quit",
        )
        .style(Style::default().add_modifier(Modifier::DIM))
        .render(chunks[3], buf);

        if let Some(view) = &self.result_view {
            render_result(view, self.accent, area, buf);
        }
        if self.show_help {
            render_help(self.accent, area, buf);
        }
        if let Some((_, prompt)) = &self.prompt {
            PromptView {
                prompt,
                accent: self.accent,
            }
            .render(area, buf);
        }
        if self.error_modal.active {
            render_error(&self.error_modal.message, area, buf);
        }
    }
}

fn render_result(view: &ResultView, accent: Color, area: Rect, buf: &mut Buffer) {
    let modal = centered(
        area,
        area.width.saturating_sub(6),
        area.height.saturating_sub(4),
    );
    Clear.render(modal, buf);
    let chunks =
        Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(modal);
    DataTableView {
        df: &view.df,
        offset: view.offset,
        selected: None,
        accent,
        title: view.title.clone(),
    }
    .render(chunks[0], buf);
    Paragraph::new("x export | Up/Down scroll | Esc close")
        .style(Style::default().add_modifier(Modifier::DIM))
        .render(chunks[1], buf);
}

fn render_help(accent: Color, area: Rect, buf: &mut Buffer) {
    let height = HELP.len() as u16 + 2;
    let modal = centered(area, 58, height);
    Clear.render(modal, buf);
    let lines: Vec<Line> = HELP
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{key:>7}  "), Style::default().fg(accent)),
                Span::raw(*action),
            ])
        })
        .collect();
    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent))
                .title("Keyboard shortcuts"),
        )
        .render(modal, buf);
}

fn render_error(message: &str, area: Rect, buf: &mut Buffer) {
    let modal = centered(area, 60, 7);
    Clear.render(modal, buf);
    Paragraph::new(message.to_string())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title("Error"),
        )
        .render(modal, buf);
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn key(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn quit_key_produces_exit() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        assert!(matches!(app.event(&key('q')), Some(AppEvent::Exit)));
    }

    #[test]
    fn help_overlay_toggles() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        app.event(&key('?'));
        assert!(app.show_help);
        // while help is open, q closes it instead of quitting
        assert!(app.event(&key('q')).is_none());
        assert!(!app.show_help);
    }

    #[test]
    fn error_modal_swallows_the_next_key() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        app.error_modal.show("boom".to_string());
        assert!(app.event(&key('q')).is_none());
        assert!(!app.error_modal.active);
    }

    #[test]
    fn transport_outcomes_update_the_status_line() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        app.event(&AppEvent::Transport(Ok(SendOutcome::Sent {
            detail: "email sent to a@b.c".to_string(),
        })));
        assert_eq!(app.status, "email sent to a@b.c");

        app.event(&AppEvent::Transport(Err(Error::Transport(
            "connection refused".to_string(),
        ))));
        assert!(app.error_modal.active);
        assert!(app.error_modal.message.contains("connection refused"));
    }

    #[test]
    fn opening_a_missing_file_surfaces_a_read_error() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        app.event(&AppEvent::Open(
            PathBuf::from("/no/such/file.xlsx"),
            None,
        ));
        assert!(app.error_modal.active);
    }

    #[test]
    fn prompt_fields_collect_typed_input() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        app.event(&key('l'));
        assert!(app.prompt.is_some());
        app.event(&key('a'));
        let (_, prompt) = app.prompt.as_ref().unwrap();
        assert_eq!(prompt.fields[0].value, "a");
        // Esc cancels
        app.event(&AppEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(app.prompt.is_none());
    }
}
