use crate::config::config::DisplayConfig;
use crate::core::{BeginOutcome, SearchController, SearchState, SearchTicket};
use crate::error::LookupError;
use crate::utils::logging::LogRingBuffer;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

type LookupResult = (SearchTicket, Result<Vec<String>, LookupError>);

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const LOG_PANEL_LINES: usize = 8;

/// Interactive search box on top of a [`SearchController`]
pub struct SearchTui {
    controller: SearchController,

    /// Query text, edited only by the user
    input: Input,

    /// Runtime the lookups are spawned on
    runtime: Handle,

    results_tx: UnboundedSender<LookupResult>,
    results_rx: UnboundedReceiver<LookupResult>,

    display: DisplayConfig,
    log_buffer: Option<LogRingBuffer>,
    show_logs: bool,

    should_quit: bool,
    spinner_frame: usize,
}

impl SearchTui {
    pub fn new(
        controller: SearchController,
        runtime: Handle,
        display: DisplayConfig,
        log_buffer: Option<LogRingBuffer>,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let show_logs = display.show_log_panel && log_buffer.is_some();

        Self {
            controller,
            input: Input::default(),
            runtime,
            results_tx,
            results_rx,
            display,
            log_buffer,
            show_logs,
            should_quit: false,
            spinner_frame: 0,
        }
    }

    pub fn controller(&self) -> &SearchController {
        &self.controller
    }

    pub fn query(&self) -> &str {
        self.input.value()
    }

    /// Main run loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            self.drain_results();

            terminal.draw(|f| self.draw(f))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key_event(key) {
                        break;
                    }
                }
            }

            if self.controller.is_loading() {
                self.spinner_frame = (self.spinner_frame + 1) % SPINNER.len();
            }

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// Apply every lookup result that has arrived. Returns how many were applied.
    pub fn drain_results(&mut self) -> usize {
        let mut applied = 0;
        while let Ok((ticket, result)) = self.results_rx.try_recv() {
            if self.controller.complete_search(&ticket, result) {
                applied += 1;
            }
        }
        applied
    }

    /// Handle keyboard input; returns true when the app should exit
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                return true;
            }
            KeyCode::Char('l') if ctrl => {
                self.controller.reset();
            }
            KeyCode::F(5) => {
                if self.log_buffer.is_some() {
                    self.show_logs = !self.show_logs;
                }
            }
            KeyCode::Esc => {
                self.controller.cancel();
            }
            KeyCode::Enter => {
                self.trigger_search();
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
            }
        }

        false
    }

    /// Confirm-key handler; a no-op while a lookup is in flight
    fn trigger_search(&mut self) {
        if self.controller.is_loading() {
            debug!(target: "tui", "Ignoring Enter while loading");
            return;
        }

        if let BeginOutcome::Dispatch(ticket) = self.controller.begin_search(self.input.value()) {
            let source = self.controller.source();
            let tx = self.results_tx.clone();
            self.runtime.spawn(async move {
                let result = source.lookup(&ticket.query).await;
                // Receiver is gone once the view is torn down
                let _ = tx.send((ticket, result));
            });
        }
    }

    /// Draw the UI
    pub fn draw(&self, f: &mut Frame) {
        let size = f.area();

        let mut constraints = vec![
            Constraint::Length(3), // Query input
            Constraint::Length(3), // Status
            Constraint::Min(3),    // Suggestions
        ];
        if self.show_logs {
            constraints.push(Constraint::Length(LOG_PANEL_LINES as u16 + 2));
        }
        constraints.push(Constraint::Length(1)); // Help line

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(size);

        self.draw_input(f, chunks[0]);
        self.draw_status(f, chunks[1]);
        self.draw_suggestions(f, chunks[2]);

        if self.show_logs {
            self.draw_logs(f, chunks[3]);
        }

        let help = Paragraph::new(self.help_text())
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Left);
        f.render_widget(help, chunks[chunks.len() - 1]);
    }

    fn draw_input(&self, f: &mut Frame, area: Rect) {
        let inner_width = area.width.saturating_sub(2) as usize;
        let scroll = self.input.visual_scroll(inner_width);

        let (title, color) = if self.controller.is_loading() {
            (
                format!(" {} Поиск {} ", self.display.icons.search, SPINNER[self.spinner_frame]),
                Color::DarkGray,
            )
        } else {
            (format!(" {} Поиск ", self.display.icons.search), Color::Yellow)
        };

        let input = Paragraph::new(self.input.value())
            .scroll((0, scroll as u16))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .style(Style::default().fg(color)),
            );
        f.render_widget(input, area);

        let cursor_x = self.input.visual_cursor().saturating_sub(scroll) as u16;
        f.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
    }

    fn draw_status(&self, f: &mut Frame, area: Rect) {
        let icons = &self.display.icons;
        let (text, style) = match self.controller.state() {
            SearchState::Idle => (
                "Введите начало имени и нажмите Enter".to_string(),
                Style::default().fg(Color::DarkGray),
            ),
            SearchState::Loading => (
                format!("{} Поиск...", icons.loading),
                Style::default().fg(Color::Cyan),
            ),
            SearchState::Failed(message) => (
                format!("{} {}", icons.error, message),
                Style::default().fg(Color::Red),
            ),
            SearchState::Success(list) if self.display.show_count => (
                format!("{} Найдено совпадений: {}", icons.success, list.len()),
                Style::default().fg(Color::Green),
            ),
            SearchState::Success(_) => (icons.success.clone(), Style::default().fg(Color::Green)),
        };

        let status = Paragraph::new(text)
            .style(style)
            .block(Block::default().borders(Borders::ALL).title("Статус"))
            .wrap(Wrap { trim: true });
        f.render_widget(status, area);
    }

    fn draw_suggestions(&self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .controller
            .suggestions()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:>2}. ", i + 1),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(name.as_str(), Style::default().add_modifier(Modifier::BOLD)),
                ]))
            })
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Имена"));
        f.render_widget(list, area);
    }

    fn draw_logs(&self, f: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .log_buffer
            .as_ref()
            .map(|buffer| buffer.get_recent(LOG_PANEL_LINES))
            .unwrap_or_default()
            .into_iter()
            .map(|entry| Line::from(entry.format_for_display()))
            .collect();

        let logs = Paragraph::new(lines)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Log (F5)"));
        f.render_widget(logs, area);
    }

    fn help_text(&self) -> String {
        if self.controller.is_loading() {
            "Esc: Cancel | Ctrl+Q: Quit".to_string()
        } else {
            "Enter: Search | Ctrl+L: Clear results | F5: Log | Ctrl+Q: Quit".to_string()
        }
    }
}

/// Set up the terminal, run the search box until the user quits, restore the terminal
pub fn run_search_tui(
    controller: SearchController,
    runtime: Handle,
    display: DisplayConfig,
    log_buffer: Option<LogRingBuffer>,
) -> Result<()> {
    info!(target: "tui", "Starting search box");

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e).context("Failed to enter alternate screen");
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(terminal) => terminal,
        Err(e) => {
            let _ = restore_terminal(&mut io::stdout());
            return Err(e).context("Failed to create terminal");
        }
    };

    let mut app = SearchTui::new(controller, runtime, display, log_buffer);
    let result = app.run(&mut terminal);

    restore_terminal(terminal.backend_mut())?;

    result.context("TUI execution failed")
}

/// Leave raw mode and the alternate screen, and show the cursor again
fn restore_terminal<W: io::Write>(out: &mut W) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(out, LeaveAlternateScreen, Show).context("Failed to leave alternate screen")?;
    Ok(())
}
