//! A single-screen status dashboard, in the teacher's ratatui/crossterm
//! idiom: raw mode + alternate screen, redrawn once per tick, `q` to quit.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};

use globed_core::core::Core;
use globed_core::telemetry::Diagnostic;

const LOG_CAPACITY: usize = 200;

pub struct Dashboard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    should_quit: bool,
    log: Vec<Diagnostic>,
}

impl Dashboard {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            should_quit: false,
            log: Vec::new(),
        })
    }

    /// Drives `core.tick()` once per loop iteration and redraws; returns
    /// when the user presses `q` or ctrl-c.
    pub fn run(&mut self, core: &mut Core) -> io::Result<()> {
        while !self.should_quit {
            core.tick(Instant::now());
            self.log.extend(core.telemetry.drain());
            if self.log.len() > LOG_CAPACITY {
                let excess = self.log.len() - LOG_CAPACITY;
                self.log.drain(..excess);
            }
            self.draw(core)?;

            if event::poll(Duration::from_millis(33))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && key.code == KeyCode::Char('q') {
                        self.should_quit = true;
                    }
                }
            }
        }
        Ok(())
    }

    fn draw(&mut self, core: &Core) -> io::Result<()> {
        let log = &self.log;
        self.terminal.draw(|frame| render(frame, core, log))?;
        Ok(())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
    }
}

fn render(frame: &mut Frame, core: &Core, log: &[Diagnostic]) {
    let area = frame.area();
    let block = Block::default()
        .title(" globed-core harness ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Length(5), Constraint::Length(5), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    render_session(frame, rows[0], core);
    render_directory(frame, rows[1], core);
    render_diagnostics(frame, rows[2], log);

    let help = Paragraph::new("q  Quit").style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[3]);
}

fn render_session(frame: &mut Frame, area: Rect, core: &Core) {
    let state = format!("{:?}", core.session.state());
    let account = core
        .session
        .account_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let remote_count = core.registry.player_ids().count();

    let lines = vec![
        Line::from(vec![Span::raw("state:   "), Span::styled(state, Style::default().fg(Color::Yellow))]),
        Line::from(format!("account: {account}")),
        Line::from(format!("tps:     {}", core.sender.tps())),
        Line::from(format!("remotes: {remote_count}")),
    ];

    let widget = Paragraph::new(lines).block(Block::default().title(" Session ").borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_directory(frame: &mut Frame, area: Rect, core: &Core) {
    let central = core
        .directory
        .active_central()
        .map(|c| c.url.clone())
        .unwrap_or_else(|| "none".to_string());
    let servers = core.directory.game_servers().len();
    let relay = core.directory.active_relay().unwrap_or("direct");

    let lines = vec![
        Line::from(format!("central:  {central}")),
        Line::from(format!("servers:  {servers}")),
        Line::from(format!("relay:    {relay}")),
    ];
    let widget = Paragraph::new(lines).block(Block::default().title(" Directory ").borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_diagnostics(frame: &mut Frame, area: Rect, log: &[Diagnostic]) {
    let items: Vec<ListItem> = log
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .map(|d| ListItem::new(format!("[{:?}] {}", d.severity, d.message)))
        .collect();

    let list = List::new(items).block(Block::default().title(" Diagnostics ").borders(Borders::ALL));
    frame.render_widget(list, area);
}
