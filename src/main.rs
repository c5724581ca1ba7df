//! StreamVerse - terminal movie discovery
//!
//! # Usage
//!
//! ```bash
//! # Launch interactive TUI
//! streamverse
//!
//! # CLI mode (for automation)
//! streamverse unlock 123456
//! streamverse search "before sunrise"
//! streamverse play tt0112471 --backend vidsrc
//! ```

use std::io::{stdout, Stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use tracing_subscriber::EnvFilter;

use streamverse::app::{App, InputMode, View};
use streamverse::cli::{Cli, Command, ExitCode, Output};
use streamverse::commands::{self, Context};
use streamverse::config::{self, Config};
use streamverse::session::PIN_LENGTH;
use streamverse::store::{FileStore, MemoryStore, Store};
use streamverse::ui::{centered_rect, Theme};
use streamverse::TmdbClient;

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.is_cli_mode() {
        init_cli_logging();
        let exit_code = run_cli(cli).await;
        std::process::exit(exit_code.into());
    } else {
        init_tui_logging();
        run_tui(cli).await
    }
}

// =============================================================================
// Logging
// =============================================================================

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env("STREAMVERSE_LOG").unwrap_or_else(|_| EnvFilter::new(default))
}

/// CLI mode logs to stderr so stdout stays parseable
fn init_cli_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter("warn"))
        .with_target(false)
        .init();
}

/// TUI mode owns the terminal, so logs go to a file in the data directory
fn init_tui_logging() {
    let Some(dir) = config::data_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(log_file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("streamverse.log"))
    else {
        return;
    };

    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(log_file))
        .with_env_filter(env_filter("info"))
        .with_ansi(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path),
        None => Ok(Config::load()),
    }
}

// =============================================================================
// CLI Mode
// =============================================================================

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => return output.error(format!("{:#}", e), ExitCode::InvalidArgs),
    };
    let mut ctx = Context::open(config);

    let Some(command) = cli.command else {
        return ExitCode::Success;
    };

    if command.requires_session() && !ctx.is_unlocked() {
        return output.error(
            "Session is locked. Run `streamverse unlock <PIN>` first.",
            ExitCode::Locked,
        );
    }

    match command {
        Command::Unlock(cmd) => commands::unlock_cmd(cmd, &mut ctx, &output),

        Command::Lock => commands::lock_cmd(&mut ctx, &output),

        Command::Backend(cmd) => commands::backend_cmd(cmd, &mut ctx, &output),

        Command::History(cmd) => commands::history_cmd(cmd, &mut ctx, &output),

        Command::Lists(cmd) => match ctx.client() {
            Ok(client) => commands::lists_cmd(cmd, Arc::new(client), &ctx, &output).await,
            Err(e) => output.error(e.to_string(), ExitCode::InvalidArgs),
        },

        Command::Search(cmd) => match ctx.client() {
            Ok(client) => commands::search_cmd(cmd, &client, &output).await,
            Err(e) => output.error(e.to_string(), ExitCode::InvalidArgs),
        },

        Command::Resolve(cmd) => match ctx.client() {
            Ok(client) => commands::resolve_cmd(cmd, &client, &output).await,
            Err(e) => output.error(e.to_string(), ExitCode::InvalidArgs),
        },

        Command::Play(cmd) => match ctx.client() {
            Ok(client) => commands::play_cmd(cmd, &client, &mut ctx, &output).await,
            Err(e) => output.error(e.to_string(), ExitCode::InvalidArgs),
        },
    }
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Initialize the terminal for TUI mode
fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run interactive TUI
async fn run_tui(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let api_key = config.tmdb_api_key()?;
    let client = TmdbClient::new(api_key).with_timeout(config.request_timeout());

    let store: Box<dyn Store> = match FileStore::default_path() {
        Some(path) => Box::new(FileStore::open(path)),
        None => Box::new(MemoryStore::new()),
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "StreamVerse starting");

    // Create app state
    let mut app = App::new(Arc::new(client), store, &config);

    let mut terminal = init_terminal().context("Failed to initialize terminal")?;

    // Run the main event loop
    let result = run_event_loop(&mut terminal, &mut app).await;

    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;

    result
}

/// Main event loop - handles input, applies background results, renders UI
async fn run_event_loop(terminal: &mut Tui, app: &mut App<TmdbClient>) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(50);

    while app.running {
        // Render current state
        terminal.draw(|frame| render_ui(frame, app))?;

        // Poll for input with timeout so background results get picked up
        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (ignore releases on Windows)
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        app.poll();

        if let Some(url) = app.take_open_request() {
            tracing::info!(url = %url, "Opening player");
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, "Failed to open browser");
            }
        }
    }

    Ok(())
}

// =============================================================================
// UI Rendering
// =============================================================================

/// Main render function - dispatches to view-specific renderers
fn render_ui(frame: &mut Frame, app: &App<TmdbClient>) {
    let area = frame.area();

    // Clear with background color
    frame.render_widget(Clear, area);
    frame.render_widget(
        Block::default().style(Style::default().bg(Theme::BACKGROUND)),
        area,
    );

    // Main layout: header, content, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    render_status_bar(frame, chunks[2], app);

    if app.view() == View::Locked {
        render_gate(frame, area, app);
        return;
    }

    render_content(frame, chunks[1], app);

    if let Some(notice) = app.notice() {
        render_notice_popup(frame, area, notice);
    }
}

/// Render the header with title and search box
fn render_header(frame: &mut Frame, area: Rect, app: &App<TmdbClient>) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(20), // Logo
            Constraint::Min(1),     // Search box
        ])
        .split(area);

    let logo = Paragraph::new(Line::from(vec![
        Span::styled(
            "STREAM",
            Style::default()
                .fg(Theme::PRIMARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "VERSE",
            Style::default()
                .fg(Theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Theme::border()),
    );
    frame.render_widget(logo, header_chunks[0]);

    let editing = app.input_mode == InputMode::Editing;
    let query = &app.search().query;

    let search_text = if editing {
        format!("⌕ {}│", query)
    } else if query.is_empty() {
        "⌕ Press / to search, or paste an IMDb id".to_string()
    } else {
        format!("⌕ {}", query)
    };

    let search_box = Paragraph::new(search_text)
        .style(if editing {
            Theme::input().fg(Theme::PRIMARY)
        } else {
            Theme::input()
        })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(if editing {
                    Theme::border_focused()
                } else {
                    Theme::border()
                })
                .title(Span::styled(" SEARCH ", Theme::title())),
        );
    frame.render_widget(search_box, header_chunks[1]);
}

/// Render the main content area based on current view
fn render_content(frame: &mut Frame, area: Rect, app: &App<TmdbClient>) {
    // Typing over the player shows the live results
    if app.input_mode == InputMode::Editing && app.search().is_active() {
        render_search_results(frame, area, app);
        return;
    }

    match app.view() {
        View::Locked => {}
        View::Home => render_home(frame, area, app),
        View::Search => render_search_results(frame, area, app),
        View::Playing => render_playing(frame, area, app),
    }
}

/// Render the curated lists
fn render_home(frame: &mut Frame, area: Rect, app: &App<TmdbClient>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border())
        .title(Span::styled(" ♥ MOVIE NIGHT ", Theme::title()));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lists = app.lists();

    if lists.is_loading {
        let loading = Paragraph::new("⟳ Loading movies...")
            .style(Theme::loading())
            .alignment(Alignment::Center);
        frame.render_widget(loading, inner);
        return;
    }

    if let Some(error) = &lists.error {
        let error = Paragraph::new(error.as_str())
            .style(Theme::error())
            .alignment(Alignment::Center);
        frame.render_widget(error, inner);
        return;
    }

    let mut lines = Vec::new();
    let populated = lists.lists.iter().filter(|(_, movies)| !movies.is_empty());
    for (row, (key, all)) in populated.enumerate() {
        let title = app
            .queries()
            .iter()
            .find(|q| q.key == key)
            .map_or(key, |q| q.title.as_str());
        let visible = lists.visible(key);
        let row_selected = row == app.cursor.row.selected;

        let mut header = vec![Span::styled(
            title.to_string(),
            if row_selected {
                Theme::accent()
            } else {
                Theme::secondary()
            },
        )];
        if lists.is_expandable(key) {
            let toggle = if lists.is_expanded(key) {
                "  [e] Show Less".to_string()
            } else {
                format!("  [e] View All ({})", all.len())
            };
            header.push(Span::styled(toggle, Theme::dimmed()));
        }
        lines.push(Line::from(header));

        let mut movies = Vec::new();
        for (col, movie) in visible.iter().enumerate() {
            let selected = row_selected && col == app.cursor.col.selected;
            movies.push(Span::styled(
                movie.title.clone(),
                if selected {
                    Theme::highlighted()
                } else {
                    Theme::text()
                },
            ));
            if let Some(year) = movie.year() {
                movies.push(Span::styled(format!(" {}", year), Theme::year()));
            }
            movies.push(Span::raw("   "));
        }
        lines.push(Line::from(movies));
        lines.push(Line::from(""));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled("No movies found", Theme::dimmed())));
    }

    let para = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(para, inner);
}

/// Render search candidates
fn render_search_results(frame: &mut Frame, area: Rect, app: &App<TmdbClient>) {
    let search = app.search();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border())
        .title(Span::styled(
            format!(" RESULTS ({}) ", search.candidates.len()),
            Theme::title(),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.is_resolving() {
        let loading = Paragraph::new("⟳ Loading movie...")
            .style(Theme::loading())
            .alignment(Alignment::Center);
        frame.render_widget(loading, inner);
        return;
    }

    if search.is_searching {
        let loading = Paragraph::new("⟳ Searching...")
            .style(Theme::loading())
            .alignment(Alignment::Center);
        frame.render_widget(loading, inner);
        return;
    }

    if search.candidates.is_empty() {
        let empty = Paragraph::new("Keep typing, or press Enter to play an IMDb id")
            .style(Theme::dimmed())
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let items: Vec<ListItem> = search
        .candidates
        .iter()
        .enumerate()
        .map(|(i, movie)| {
            let is_selected = i == app.candidate_list.selected;
            let marker = if is_selected { "▸ " } else { "  " };
            let year = movie
                .year()
                .map(|y| format!(" ({})", y))
                .unwrap_or_else(|| " (N/A)".to_string());

            ListItem::new(Line::from(vec![
                Span::styled(
                    marker,
                    if is_selected {
                        Theme::accent()
                    } else {
                        Theme::dimmed()
                    },
                ),
                Span::styled(
                    movie.title.clone(),
                    if is_selected {
                        Theme::highlighted()
                    } else {
                        Theme::text()
                    },
                ),
                Span::styled(year, Theme::year()),
            ]))
        })
        .collect();

    let list = List::new(items).style(Theme::text());
    frame.render_widget(list, inner);
}

/// Render the active playback selection
fn render_playing(frame: &mut Frame, area: Rect, app: &App<TmdbClient>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border_focused())
        .title(Span::styled(" ▶ NOW PLAYING ", Theme::success()));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(playback) = app.playback() else {
        return;
    };

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            playback
                .title
                .clone()
                .unwrap_or_else(|| playback.external_id.clone()),
            Style::default()
                .fg(Theme::PRIMARY)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(playback.external_id.clone(), Theme::dimmed())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Server: ", Theme::dimmed()),
            Span::styled(playback.backend.display_name(), Theme::accent()),
        ]),
        Line::from(Span::styled(playback.url(), Theme::secondary())),
        Line::from(""),
        Line::from(vec![
            Span::styled(" o ", Theme::keybind()),
            Span::styled("Open again  ", Theme::dimmed()),
            Span::styled(" b ", Theme::keybind()),
            Span::styled("Switch server  ", Theme::dimmed()),
            Span::styled(" ESC ", Theme::keybind()),
            Span::styled("Home", Theme::dimmed()),
        ]),
    ];

    let para = Paragraph::new(content).alignment(Alignment::Center);
    frame.render_widget(para, inner);
}

/// Render the PIN popup
fn render_gate(frame: &mut Frame, area: Rect, app: &App<TmdbClient>) {
    let gate = app.gate();
    let popup_area = centered_rect(44, 11, area);
    frame.render_widget(Clear, popup_area);

    let typed = gate.input().chars().count();
    let mask = format!(
        "{}{}",
        "● ".repeat(typed),
        "_ ".repeat(PIN_LENGTH.saturating_sub(typed))
    );

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("Enter the PIN", Theme::text())),
        Line::from(""),
        Line::from(Span::styled(mask.trim_end().to_string(), Theme::pin())),
        Line::from(""),
    ];

    if let Some(error) = gate.error() {
        lines.push(Line::from(Span::styled(error, Theme::error())));
    } else {
        lines.push(Line::from(""));
    }

    match gate.visible_hint() {
        Some(hint) => lines.push(Line::from(Span::styled(hint, Theme::secondary()))),
        None if gate.has_hint() => lines.push(Line::from(vec![
            Span::styled(" ? ", Theme::keybind()),
            Span::styled("Forgot PIN?", Theme::dimmed()),
        ])),
        None => {}
    }

    let popup = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Theme::border_focused())
                .title(Span::styled(" 🔒 LOCKED ", Theme::title()))
                .style(Style::default().bg(Theme::BACKGROUND)),
        );

    frame.render_widget(popup, popup_area);
}

/// Render status bar at bottom
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App<TmdbClient>) {
    let mode_indicator = match app.input_mode {
        InputMode::Normal => Span::styled(
            " NORMAL ",
            Style::default().fg(Theme::BACKGROUND).bg(Theme::PRIMARY),
        ),
        InputMode::Editing => Span::styled(
            " INSERT ",
            Style::default().fg(Theme::BACKGROUND).bg(Theme::ACCENT),
        ),
    };

    let view_indicator = Span::styled(
        format!(" {} ", format!("{:?}", app.view()).to_uppercase()),
        Style::default().fg(Theme::TEXT),
    );

    let backend_indicator = Span::styled(
        format!(" ▶ {} ", app.backend().display_name()),
        Theme::accent(),
    );

    let help = match app.view() {
        View::Locked => " type PIN  ?:hint  ESC:quit ",
        View::Home => " q:quit  /:search  ←→↑↓:move  ↵:play  e:expand  b:server ",
        View::Search => " q:quit  /:edit  ↑↓:move  ↵:play  ESC:clear ",
        View::Playing => " q:quit  o:open  b:server  ESC:home ",
    };

    let status_line = Line::from(vec![
        mode_indicator,
        view_indicator,
        backend_indicator,
        Span::raw(" │ "),
        Span::styled(help, Style::default().fg(Theme::TEXT)),
    ]);

    let status = Paragraph::new(status_line).style(Theme::status_bar());
    frame.render_widget(status, area);
}

/// Render notice popup overlay
fn render_notice_popup(frame: &mut Frame, area: Rect, notice: &str) {
    let popup_area = centered_rect(60, 5, area);
    frame.render_widget(Clear, popup_area);

    let notice_block = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(notice, Theme::error())),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Theme::error())
            .title(Span::styled(" ✗ NOTICE ", Theme::error()))
            .style(Style::default().bg(Theme::BACKGROUND)),
    );

    frame.render_widget(notice_block, popup_area);
}
