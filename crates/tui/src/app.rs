use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use bookshelf_core::{
    AddOutcome, Book, BorrowOutcome, Library, LibraryFile, Listing, ReturnOutcome,
};
use chrono::{DateTime, Local};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::form::{Form, FormKind, Submission};

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    menu: Color,
    rule: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            menu: Color::Blue,
            rule: Color::Magenta,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

impl Theme {
    fn tone(&self, tone: Tone) -> Color {
        match tone {
            Tone::Info => self.accent,
            Tone::Success => self.success,
            Tone::Warning => self.warning,
            Tone::Danger => self.danger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Add,
    Search,
    Borrow,
    Return,
    ViewAll,
    Total,
    Clear,
    Exit,
}

impl MenuAction {
    const ALL: [MenuAction; 8] = [
        MenuAction::Add,
        MenuAction::Search,
        MenuAction::Borrow,
        MenuAction::Return,
        MenuAction::ViewAll,
        MenuAction::Total,
        MenuAction::Clear,
        MenuAction::Exit,
    ];

    fn label(self) -> &'static str {
        match self {
            MenuAction::Add => "Add a Book",
            MenuAction::Search => "Search for a Book",
            MenuAction::Borrow => "Borrow a Book",
            MenuAction::Return => "Return a Book",
            MenuAction::ViewAll => "View All Books",
            MenuAction::Total => "Total Number of Books",
            MenuAction::Clear => "Clear Library Database",
            MenuAction::Exit => "Exit",
        }
    }

    fn from_digit(ch: char) -> Option<Self> {
        let index = ch.to_digit(10)?.checked_sub(1)? as usize;
        Self::ALL.get(index).copied()
    }
}

/// What the content pane shows. Book views are recomputed on every draw so
/// they always reflect the current collection.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Panel {
    Home,
    AllBooks,
    Search { query: String },
    Total,
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Interactive shell driving a single [`Library`].
pub struct BookshelfApp {
    library: Library,
    file: LibraryFile,
    save_on_exit: bool,
    reader: Option<String>,
    menu_cursor: usize,
    panel: Panel,
    table_offset: usize,
    table_height: usize,
    form: Option<Form>,
    confirm_clear: bool,
    status: String,
    tone: Tone,
    last_saved: Option<DateTime<Local>>,
    should_quit: bool,
    theme: Theme,
}

impl BookshelfApp {
    pub fn new(library: Library, file: LibraryFile, save_on_exit: bool) -> Self {
        Self {
            library,
            file,
            save_on_exit,
            reader: None,
            menu_cursor: 0,
            panel: Panel::Home,
            table_offset: 0,
            table_height: 1,
            form: Some(Form::new(FormKind::Welcome)),
            confirm_clear: false,
            status: "Ready".to_string(),
            tone: Tone::Info,
            last_saved: None,
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.set_status_tone(message, Tone::Info);
    }

    fn set_status_tone(&mut self, message: impl Into<String>, tone: Tone) {
        self.status = message.into();
        self.tone = tone;
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let outcome = self.event_loop(&mut terminal, &mut event_rx).await;
        restore_terminal(&mut terminal)?;
        outcome
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_rx: &mut mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }
            match event_rx.recv().await {
                Some(AppEvent::Input(Event::Key(key))) => self.handle_key(key),
                Some(AppEvent::Input(_)) | Some(AppEvent::Tick) => {}
                None => break,
            }
        }
        Ok(())
    }

    /// Persist on the way out when configured to. Returns the record count written.
    pub fn finish(&mut self) -> Result<Option<usize>> {
        if !self.save_on_exit {
            info!("Exit without saving (save_on_exit disabled)");
            return Ok(None);
        }
        let path = self.file.path().display().to_string();
        self.file
            .save(self.library.books())
            .with_context(|| format!("failed to save library to {path}"))?;
        info!(path = %path, titles = self.library.len(), "Saved on exit");
        Ok(Some(self.library.len()))
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        // Ctrl+C quits from every mode, including open forms.
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.form = None;
            self.confirm_clear = false;
            self.should_quit = true;
            return;
        }
        if self.form.is_some() {
            self.handle_form_key(key);
        } else if self.confirm_clear {
            self.handle_confirm_key(key);
        } else {
            self.handle_menu_key(key);
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        if key.modifiers == KeyModifiers::CONTROL {
            if key.code == KeyCode::Char('s') {
                self.save_now();
            }
            return;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.move_menu_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_menu_cursor(-1),
            KeyCode::PageDown => self.scroll_table(self.table_height as isize),
            KeyCode::PageUp => self.scroll_table(-(self.table_height as isize)),
            KeyCode::Enter => self.activate(MenuAction::ALL[self.menu_cursor]),
            KeyCode::Char(ch) => match MenuAction::from_digit(ch) {
                Some(action) => {
                    self.menu_cursor = MenuAction::ALL
                        .iter()
                        .position(|candidate| *candidate == action)
                        .unwrap_or(0);
                    self.activate(action);
                }
                None => self.set_status_tone(
                    "Invalid choice. Please select an option from 1 to 8.",
                    Tone::Danger,
                ),
            },
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                let kind = form.kind;
                self.form = None;
                if kind == FormKind::Welcome {
                    self.greet();
                } else {
                    self.set_status("Cancelled");
                }
            }
            KeyCode::Enter if !form.is_last_field() => form.focus_next(),
            KeyCode::Enter => match form.submit() {
                Some(submission) => {
                    self.form = None;
                    self.apply(submission);
                }
                None => {
                    let message = form.first_error().unwrap_or("Invalid input").to_string();
                    self.set_status_tone(format!("Error! {message}"), Tone::Danger);
                }
            },
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
            KeyCode::Left => form.move_cursor(-1),
            KeyCode::Right => form.move_cursor(1),
            KeyCode::Home => form.move_home(),
            KeyCode::End => form.move_end(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Delete => form.delete(),
            KeyCode::Char(ch) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    form.insert(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        self.confirm_clear = false;
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => self.clear_library(),
            _ => self.set_status("Clear cancelled"),
        }
    }

    fn activate(&mut self, action: MenuAction) {
        match action {
            MenuAction::Add => self.open_form(FormKind::Add),
            MenuAction::Search => self.open_form(FormKind::Search),
            MenuAction::Borrow => self.open_form(FormKind::Borrow),
            MenuAction::Return => self.open_form(FormKind::Return),
            MenuAction::ViewAll => {
                self.show_panel(Panel::AllBooks);
                let shown = match self.library.list_all() {
                    Listing::Empty => None,
                    Listing::Books(books) => Some(books.len()),
                };
                match shown {
                    Some(count) => self.set_status(format!("Showing {count} titles")),
                    None => self.set_status_tone(
                        "No books are currently in the library system.",
                        Tone::Warning,
                    ),
                }
            }
            MenuAction::Total => {
                self.show_panel(Panel::Total);
                let total = self.library.total_copies();
                self.set_status(format!(
                    "The total number of books in the library is: {total}"
                ));
            }
            MenuAction::Clear => {
                self.confirm_clear = true;
                self.set_status_tone(
                    format!(
                        "Clear every record and delete {}? (y/n)",
                        self.file.path().display()
                    ),
                    Tone::Warning,
                );
            }
            MenuAction::Exit => self.should_quit = true,
        }
    }

    fn open_form(&mut self, kind: FormKind) {
        let form = Form::new(kind);
        self.set_status(format!("{}: Enter to confirm, Esc to cancel", form.title()));
        self.form = Some(form);
    }

    fn apply(&mut self, submission: Submission) {
        match submission {
            Submission::Welcome { name } => {
                if !name.is_empty() {
                    self.reader = Some(name);
                }
                self.greet();
            }
            Submission::Add {
                title,
                author,
                publication_year,
                copies,
            } => {
                match self
                    .library
                    .add_or_update(&title, &author, publication_year, copies)
                {
                    AddOutcome::Added => self.set_status_tone(
                        format!("Book '{title}' has been added to the book library."),
                        Tone::Success,
                    ),
                    AddOutcome::Updated { available_copies } => self.set_status_tone(
                        format!(
                            "Updated the number of copies for '{title}' (now {available_copies})."
                        ),
                        Tone::Success,
                    ),
                }
                self.show_panel(Panel::AllBooks);
            }
            Submission::Search { query } => {
                let found = self.library.find(&query).len();
                if found == 0 {
                    self.set_status_tone(
                        "The book was not found. Please make sure that you entered the correct title.",
                        Tone::Danger,
                    );
                } else {
                    self.set_status_tone(format!("Found {found} result(s)"), Tone::Success);
                }
                self.show_panel(Panel::Search { query });
            }
            Submission::Borrow { title } => match self.library.borrow(&title) {
                BorrowOutcome::Borrowed { remaining } => self.set_status_tone(
                    format!(
                        "You have successfully borrowed '{title}'. Enjoy your reading! ({remaining} left)"
                    ),
                    Tone::Success,
                ),
                BorrowOutcome::Unavailable => self.set_status_tone(
                    format!(
                        "Sorry, all copies of '{title}' are currently borrowed. See option 5 for available books."
                    ),
                    Tone::Warning,
                ),
                BorrowOutcome::NotFound => self.set_status_tone(
                    format!("'{title}' not found in the library."),
                    Tone::Danger,
                ),
            },
            Submission::Return { title } => match self.library.return_book(&title) {
                ReturnOutcome::Returned { .. } => self.set_status_tone(
                    format!("Thank you for returning '{title}'. We hope you liked this book!"),
                    Tone::Success,
                ),
                ReturnOutcome::NotFound => self.set_status_tone(
                    format!(
                        "'{title}' is not recognized as part of the library. Please check the title."
                    ),
                    Tone::Danger,
                ),
            },
        }
    }

    fn greet(&mut self) {
        let message = match self.reader.as_deref() {
            Some(name) => format!("Hello, Dear {name}. Welcome to Book Library!"),
            None => "Welcome to Book Library!".to_string(),
        };
        self.set_status_tone(
            format!("{message} Choose an action by number (1-8)."),
            Tone::Info,
        );
    }

    fn clear_library(&mut self) {
        self.show_panel(Panel::Home);
        match self.library.clear(&self.file) {
            Ok(()) => self.set_status_tone(
                "Library database has been cleared successfully!",
                Tone::Danger,
            ),
            Err(err) => {
                error!(?err, "Failed to delete library data");
                self.set_status_tone(
                    format!("Library cleared in memory but the file was kept: {err}"),
                    Tone::Danger,
                );
            }
        }
    }

    fn save_now(&mut self) {
        match self.file.save(self.library.books()) {
            Ok(()) => {
                let now = Local::now();
                self.last_saved = Some(now);
                self.set_status_tone(
                    format!(
                        "Library data has been saved successfully at {}.",
                        now.format("%H:%M:%S")
                    ),
                    Tone::Info,
                );
            }
            Err(err) => {
                error!(?err, "Save failed");
                self.set_status_tone(format!("Save failed: {err}"), Tone::Danger);
            }
        }
    }

    fn show_panel(&mut self, panel: Panel) {
        self.panel = panel;
        self.table_offset = 0;
    }

    fn move_menu_cursor(&mut self, delta: isize) {
        let last = MenuAction::ALL.len() as isize - 1;
        self.menu_cursor = (self.menu_cursor as isize + delta).clamp(0, last) as usize;
    }

    fn scroll_table(&mut self, delta: isize) {
        let rows = self.visible_books().len();
        let max_offset = rows.saturating_sub(self.table_height) as isize;
        self.table_offset = (self.table_offset as isize + delta).clamp(0, max_offset) as usize;
    }

    fn visible_books(&self) -> Vec<&Book> {
        match &self.panel {
            Panel::AllBooks => self.library.books().iter().collect(),
            Panel::Search { query } => self.library.find(query),
            Panel::Home | Panel::Total => Vec::new(),
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_header(frame, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(30), Constraint::Min(20)])
            .split(chunks[1]);
        self.render_menu(frame, body[0]);
        self.render_content(frame, body[1]);
        self.render_status(frame, chunks[2]);

        if let Some(form) = &self.form {
            self.render_form(frame, form);
        } else if self.confirm_clear {
            self.render_confirm(frame);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let greeting = match self.reader.as_deref() {
            Some(name) => format!("Book Library · {name}"),
            None => "Book Library".to_string(),
        };
        let header = Paragraph::new(Line::from(Span::styled(
            greeting,
            Style::default()
                .fg(self.theme.rule)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, area);
    }

    fn render_menu(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = MenuAction::ALL
            .iter()
            .enumerate()
            .map(|(idx, action)| {
                let label = format!("{}. {}", idx + 1, action.label());
                if idx == self.menu_cursor {
                    ListItem::new(Line::from(Span::styled(
                        format!("▶ {label}"),
                        Style::default()
                            .fg(self.theme.accent)
                            .bg(self.theme.selection_bg)
                            .add_modifier(Modifier::BOLD),
                    )))
                } else {
                    ListItem::new(Line::from(Span::styled(
                        format!("  {label}"),
                        Style::default().fg(self.theme.menu),
                    )))
                }
            })
            .collect();
        let menu = List::new(items).block(Block::default().borders(Borders::ALL).title("Menu"));
        frame.render_widget(menu, area);
    }

    fn render_content(&mut self, frame: &mut Frame, area: Rect) {
        match self.panel.clone() {
            Panel::Home => self.render_home(frame, area),
            Panel::Total => self.render_total(frame, area),
            Panel::AllBooks => {
                if matches!(self.library.list_all(), Listing::Empty) {
                    self.render_notice(
                        frame,
                        area,
                        "All Books",
                        "No books are currently in the library system.",
                        self.theme.warning,
                    );
                } else {
                    self.render_table(frame, area, "All Books".to_string());
                }
            }
            Panel::Search { query } => {
                let title = format!("Search: \"{query}\"");
                if self.library.find(&query).is_empty() {
                    self.render_notice(
                        frame,
                        area,
                        &title,
                        "The book was not found. Please make sure that you entered the correct title.",
                        self.theme.danger,
                    );
                } else {
                    self.render_table(frame, area, title);
                }
            }
        }
    }

    fn render_home(&self, frame: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let lines = vec![
            Line::from("Choose an action from the menu by number or with the arrow keys."),
            Line::from(""),
            Line::from(vec![
                Span::styled("1-8", bold),
                Span::raw(" pick an action  "),
                Span::styled("Enter", bold),
                Span::raw(" run the highlighted one"),
            ]),
            Line::from(vec![
                Span::styled("PgUp/PgDn", bold),
                Span::raw(" scroll the book table  "),
                Span::styled("Ctrl+S", bold),
                Span::raw(" save now"),
            ]),
            Line::from(vec![Span::styled("q", bold), Span::raw(" exit")]),
            Line::from(""),
            Line::from(Span::styled(
                format!("Data file: {}", self.file.path().display()),
                Style::default().fg(self.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Instructions"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_total(&self, frame: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(Span::styled(
                format!(
                    "The total number of books in the library is: {}",
                    self.library.total_copies()
                ),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Distinct titles: {}", self.library.len())),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Total"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_notice(&self, frame: &mut Frame, area: Rect, title: &str, text: &str, color: Color) {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(color),
        )))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_table(&mut self, frame: &mut Frame, area: Rect, title: String) {
        // borders plus header row
        self.table_height = area.height.saturating_sub(3).max(1) as usize;
        let books = self.visible_books();
        let max_offset = books.len().saturating_sub(self.table_height);
        let offset = self.table_offset.min(max_offset);

        let rows: Vec<Row> = books
            .iter()
            .skip(offset)
            .take(self.table_height)
            .map(|book| {
                let copies_style = if book.available_copies == 0 {
                    Style::default().fg(self.theme.warning)
                } else {
                    Style::default().fg(self.theme.primary_fg)
                };
                Row::new(vec![
                    Cell::from(book.title.clone()),
                    Cell::from(book.author.clone()),
                    Cell::from(book.publication_year.to_string()),
                    Cell::from(Span::styled(book.available_copies.to_string(), copies_style)),
                ])
            })
            .collect();

        let header = Row::new(vec!["Title", "Author", "Year", "Copies"]).style(
            Style::default()
                .fg(self.theme.menu)
                .add_modifier(Modifier::BOLD),
        );
        let title = if books.len() > self.table_height {
            format!("{title} ({}-{} of {})", offset + 1, offset + rows.len(), books.len())
        } else {
            format!("{title} ({})", books.len())
        };
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(44),
                Constraint::Percentage(34),
                Constraint::Length(6),
                Constraint::Length(8),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
        self.table_offset = offset;
        frame.render_widget(table, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = Line::from(Span::styled(
            self.status.clone(),
            Style::default().fg(self.theme.tone(self.tone)),
        ));
        let saved = match self.last_saved {
            Some(at) => format!("last saved {}", at.format("%H:%M:%S")),
            None if self.save_on_exit => "saves on exit".to_string(),
            None => "not saved".to_string(),
        };
        let secondary = Line::from(Span::styled(
            format!(
                "{} titles · {} copies · {} · {}",
                self.library.len(),
                self.library.total_copies(),
                self.file.path().display(),
                saved
            ),
            Style::default().fg(self.theme.muted),
        ));
        let paragraph = Paragraph::new(vec![primary, secondary])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_form(&self, frame: &mut Frame, form: &Form) {
        let frame_area = frame.size();
        let mut lines = Vec::new();
        let mut cursor_row = 0_u16;
        for (idx, field) in form.fields.iter().enumerate() {
            let focused = idx == form.focus;
            let label_style = if focused {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.primary_fg)
            };
            lines.push(Line::from(Span::styled(field.label, label_style)));
            if focused {
                cursor_row = lines.len() as u16;
            }
            lines.push(Line::from(vec![
                Span::styled("> ", Style::default().fg(self.theme.accent)),
                Span::raw(field.input.clone()),
            ]));
            if let Some(error) = &field.error {
                lines.push(Line::from(Span::styled(
                    error.clone(),
                    Style::default().fg(self.theme.danger),
                )));
            }
        }
        lines.push(Line::from(""));
        let bold = Style::default().add_modifier(Modifier::BOLD);
        lines.push(Line::from(vec![
            Span::styled("Enter", bold),
            Span::raw(" next/confirm  "),
            Span::styled("Tab", bold),
            Span::raw(" switch field  "),
            Span::styled("Esc", bold),
            Span::raw(" cancel"),
        ]));

        let width = 64_u16.min(frame_area.width.saturating_sub(4)).max(24);
        let height = (lines.len() as u16 + 2).min(frame_area.height);
        let area = centered_rect(width, height, frame_area);
        frame.render_widget(Clear, area);

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(form.title()));
        frame.render_widget(paragraph, area);

        let focused = form.focused();
        let cursor_x = (area.x + 3 + focused.cursor as u16).min(area.right().saturating_sub(2));
        let cursor_y = (area.y + 1 + cursor_row).min(area.bottom().saturating_sub(2));
        frame.set_cursor(cursor_x, cursor_y);
    }

    fn render_confirm(&self, frame: &mut Frame) {
        let area = centered_rect(52, 6, frame.size());
        frame.render_widget(Clear, area);
        let lines = vec![
            Line::from(Span::styled(
                "Clear the whole library?",
                Style::default()
                    .fg(self.theme.danger)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("{} will be deleted.", self.file.path().display())),
            Line::from("Press y to confirm, any other key to cancel."),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Confirm"))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use std::{fs, path::Path};
    use tempfile::tempdir;

    fn app_at(path: &Path) -> BookshelfApp {
        BookshelfApp::new(Library::new(), LibraryFile::new(path), true)
    }

    fn press(app: &mut BookshelfApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_line(app: &mut BookshelfApp, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
        press(app, KeyCode::Enter);
    }

    fn add_book(app: &mut BookshelfApp, title: &str, author: &str, year: &str, copies: &str) {
        press(app, KeyCode::Char('1'));
        type_line(app, title);
        type_line(app, author);
        type_line(app, year);
        type_line(app, copies);
    }

    fn screen_text(app: &mut BookshelfApp) -> Result<String> {
        let mut terminal = Terminal::new(TestBackend::new(100, 30))?;
        terminal.draw(|frame| app.draw(frame))?;
        Ok(terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect())
    }

    fn started(path: &Path) -> BookshelfApp {
        let mut app = app_at(path);
        type_line(&mut app, "Ada");
        app
    }

    #[test]
    fn welcome_prompt_records_reader_name() -> Result<()> {
        let dir = tempdir()?;
        let app = started(&dir.path().join("library_data.json"));
        assert_eq!(app.reader.as_deref(), Some("Ada"));
        assert!(app.form.is_none());
        assert!(app.status.contains("Hello, Dear Ada"));
        Ok(())
    }

    #[test]
    fn add_then_update_through_the_menu() -> Result<()> {
        let dir = tempdir()?;
        let mut app = started(&dir.path().join("library_data.json"));

        add_book(&mut app, "Dune", "Herbert", "1965", "2");
        assert_eq!(app.tone, Tone::Success);
        add_book(&mut app, "dune", "X", "1999", "3");
        assert!(app.status.contains("now 5"));

        assert_eq!(app.library.books(), &[Book::new("Dune", "Herbert", 1965, 5)]);
        assert_eq!(app.panel, Panel::AllBooks);
        Ok(())
    }

    #[test]
    fn invalid_year_keeps_the_form_open() -> Result<()> {
        let dir = tempdir()?;
        let mut app = started(&dir.path().join("library_data.json"));

        add_book(&mut app, "Dune", "Herbert", "nineteen", "2");
        assert!(app.form.is_some());
        assert_eq!(app.tone, Tone::Danger);
        assert!(app.library.is_empty());

        press(&mut app, KeyCode::Esc);
        assert!(app.form.is_none());
        assert!(app.library.is_empty());
        Ok(())
    }

    #[test]
    fn borrow_and_return_report_outcomes() -> Result<()> {
        let dir = tempdir()?;
        let mut app = started(&dir.path().join("library_data.json"));
        add_book(&mut app, "Dune", "Herbert", "1965", "1");

        press(&mut app, KeyCode::Char('3'));
        type_line(&mut app, "DUNE");
        assert_eq!(app.tone, Tone::Success);

        press(&mut app, KeyCode::Char('3'));
        type_line(&mut app, "dune");
        assert_eq!(app.tone, Tone::Warning);
        assert_eq!(app.library.get("Dune").map(|b| b.available_copies), Some(0));

        press(&mut app, KeyCode::Char('4'));
        type_line(&mut app, "Unknown Title");
        assert_eq!(app.tone, Tone::Danger);

        press(&mut app, KeyCode::Char('4'));
        type_line(&mut app, "Dune");
        assert_eq!(app.tone, Tone::Success);
        assert_eq!(app.library.get("Dune").map(|b| b.available_copies), Some(1));
        Ok(())
    }

    #[test]
    fn search_shows_matching_titles_only() -> Result<()> {
        let dir = tempdir()?;
        let mut app = started(&dir.path().join("library_data.json"));
        add_book(&mut app, "Dune", "Herbert", "1965", "1");
        add_book(&mut app, "Foundation", "Asimov", "1951", "1");

        press(&mut app, KeyCode::Char('2'));
        type_line(&mut app, "dun");
        assert!(app.status.contains("Found 1 result(s)"));

        let screen = screen_text(&mut app)?;
        assert!(screen.contains("Dune"));
        assert!(!screen.contains("Foundation"));
        Ok(())
    }

    #[test]
    fn view_all_reports_empty_library() -> Result<()> {
        let dir = tempdir()?;
        let mut app = started(&dir.path().join("library_data.json"));

        press(&mut app, KeyCode::Char('5'));
        assert_eq!(app.tone, Tone::Warning);
        assert!(screen_text(&mut app)?.contains("No books are currently in the library system."));
        Ok(())
    }

    #[test]
    fn total_sums_copies() -> Result<()> {
        let dir = tempdir()?;
        let mut app = started(&dir.path().join("library_data.json"));
        add_book(&mut app, "Dune", "Herbert", "1965", "2");
        add_book(&mut app, "Emma", "Austen", "1815", "3");

        press(&mut app, KeyCode::Char('6'));
        assert!(app.status.ends_with(": 5"));
        Ok(())
    }

    #[test]
    fn clear_requires_confirmation_and_deletes_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("library_data.json");
        let mut app = started(&path);
        add_book(&mut app, "Dune", "Herbert", "1965", "2");
        app.finish()?;
        assert!(path.exists());

        press(&mut app, KeyCode::Char('7'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.library.len(), 1);
        assert!(path.exists());

        press(&mut app, KeyCode::Char('7'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.library.is_empty());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn exit_saves_collection() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("library_data.json");
        let mut app = started(&path);
        add_book(&mut app, "Dune", "Herbert", "1965", "2");

        press(&mut app, KeyCode::Char('8'));
        assert!(app.should_quit);
        assert_eq!(app.finish()?, Some(1));

        let reloaded = LibraryFile::new(&path).load()?.into_library();
        assert_eq!(reloaded.books(), app.library.books());
        Ok(())
    }

    #[test]
    fn exit_without_saving_when_disabled() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("library_data.json");
        let mut app = BookshelfApp::new(Library::new(), LibraryFile::new(&path), false);
        assert_eq!(app.finish()?, None);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn exit_save_failure_is_returned() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("library_data.json");
        fs::create_dir_all(path.join("inner"))?;
        let mut app = started(&path);
        add_book(&mut app, "Dune", "Herbert", "1965", "2");

        let err = match app.finish() {
            Ok(saved) => panic!("save into a directory succeeded: {saved:?}"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("failed to save library"));
        assert!(path.is_dir());
        Ok(())
    }

    #[test]
    fn ctrl_c_quits_from_forms_and_confirmation() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("library_data.json");
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);

        let mut app = app_at(&path);
        assert!(app.form.is_some());
        app.handle_key(ctrl_c);
        assert!(app.should_quit);
        assert!(app.form.is_none());

        let mut app = started(&path);
        press(&mut app, KeyCode::Char('1'));
        type_line(&mut app, "Dune");
        app.handle_key(ctrl_c);
        assert!(app.should_quit);
        assert!(app.library.is_empty());

        let mut app = started(&path);
        press(&mut app, KeyCode::Char('7'));
        assert!(app.confirm_clear);
        app.handle_key(ctrl_c);
        assert!(app.should_quit);
        assert!(!app.confirm_clear);
        Ok(())
    }

    #[test]
    fn unknown_menu_choice_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let mut app = started(&dir.path().join("library_data.json"));
        press(&mut app, KeyCode::Char('9'));
        assert_eq!(app.tone, Tone::Danger);
        assert!(!app.should_quit);
        Ok(())
    }
}
