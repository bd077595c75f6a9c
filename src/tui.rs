use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Terminal;
use tokio::sync::mpsc;

use crate::dashboard::{Dashboard, DashboardSnapshot};
use crate::fetch::Transport;
use crate::monitor::MonitorSnapshot;
use crate::types::{LogType, MovementType, RiskKind, SystemStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Finance,
    Monitor,
}

struct App {
    tab: Tab,
    snapshot: Option<Arc<DashboardSnapshot>>,
    monitor: MonitorSnapshot,
    loading: bool,
    refreshing: bool,
    last_error: Option<String>,
    should_quit: bool,
    scroll_offset: usize,
}

pub async fn run<T>(dashboard: Arc<Dashboard<T>>) -> Result<(), Box<dyn std::error::Error>>
where
    T: Transport + 'static,
{
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, dashboard).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app<T>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    dashboard: Arc<Dashboard<T>>,
) -> Result<(), Box<dyn std::error::Error>>
where
    T: Transport + 'static,
{
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Option<String>>();
    let mut app = App {
        tab: Tab::Finance,
        snapshot: None,
        monitor: dashboard.monitor().snapshot(),
        loading: true,
        refreshing: false,
        last_error: None,
        should_quit: false,
        scroll_offset: 0,
    };

    spawn_refresh(&dashboard, &done_tx);
    app.refreshing = true;

    while !app.should_quit {
        while let Ok(outcome) = done_rx.try_recv() {
            app.refreshing = false;
            app.last_error = outcome;
        }
        app.snapshot = dashboard.current();
        app.monitor = dashboard.monitor().snapshot();
        app.loading = dashboard.is_loading();

        terminal.draw(|f| draw(f, &app))?;

        if event::poll(Duration::from_millis(150))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                        KeyCode::Tab => {
                            app.tab = match app.tab {
                                Tab::Finance => Tab::Monitor,
                                Tab::Monitor => Tab::Finance,
                            };
                            app.scroll_offset = 0;
                        }
                        KeyCode::Char('r') if !app.refreshing => {
                            spawn_refresh(&dashboard, &done_tx);
                            app.refreshing = true;
                        }
                        KeyCode::Char('s') => {
                            dashboard.monitor().simulate_failure();
                        }
                        KeyCode::Up => app.scroll_offset = app.scroll_offset.saturating_sub(1),
                        KeyCode::Down => app.scroll_offset = app.scroll_offset.saturating_add(1),
                        _ => {}
                    }
                }
            }
        }
    }

    Ok(())
}

fn spawn_refresh<T>(dashboard: &Arc<Dashboard<T>>, done: &mpsc::UnboundedSender<Option<String>>)
where
    T: Transport + 'static,
{
    let dashboard = dashboard.clone();
    let done = done.clone();
    tokio::spawn(async move {
        let outcome = dashboard.refresh().await.err().map(|e| e.to_string());
        let _ = done.send(outcome);
    });
}

fn status_color(status: SystemStatus) -> Color {
    match status {
        SystemStatus::Ok => Color::Green,
        SystemStatus::Degraded => Color::Yellow,
        SystemStatus::Critical => Color::Red,
    }
}

fn draw(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10)])
        .split(f.area());

    draw_header(f, app, chunks[0]);

    if app.loading {
        let p = Paragraph::new("Loading account data...")
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(p, chunks[1]);
        return;
    }

    match app.tab {
        Tab::Finance => draw_finance(f, app, chunks[1]),
        Tab::Monitor => draw_monitor(f, app, chunks[1]),
    }
}

fn draw_header(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let status = app.monitor.health.status;
    let account = app.snapshot.as_ref().map(|s| s.account_id.as_str()).unwrap_or("-");
    let tab_style = |tab: Tab| {
        if app.tab == tab {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let mut header = vec![
        Span::styled(" bankwatch ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" account {account} | ")),
        Span::styled(
            format!(" API {} ", status.label()),
            Style::default().fg(Color::Black).bg(status_color(status)).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled("Finance", tab_style(Tab::Finance)),
        Span::raw(" "),
        Span::styled("Monitor", tab_style(Tab::Monitor)),
        Span::raw(" | "),
    ];
    if app.refreshing {
        header.push(Span::styled("refreshing... ", Style::default().fg(Color::Yellow)));
    } else if let Some(err) = &app.last_error {
        header.push(Span::styled(format!("load failed: {err} "), Style::default().fg(Color::Red)));
    }
    header.push(Span::styled(
        "q=quit Tab=switch r=refresh s=simulate",
        Style::default().fg(Color::DarkGray),
    ));

    let p = Paragraph::new(Line::from(header)).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_finance(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let Some(snapshot) = app.snapshot.as_deref() else {
        let p = Paragraph::new("No account data loaded. Press r to retry.")
            .block(Block::default().borders(Borders::ALL).title(" Finance "));
        f.render_widget(p, area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(8)])
        .split(area);

    let totals = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(34), Constraint::Percentage(33), Constraint::Percentage(33)])
        .split(rows[0]);

    let balance = snapshot.balance.map(|b| format!("{b:.2}")).unwrap_or_else(|| "n/a".to_string());
    let boxes = [
        (" Balance ", balance, Color::White),
        (" Income ", format!("+{:.2}", snapshot.stats.total_in), Color::Green),
        (" Expenses ", format!("{:.2}", snapshot.stats.total_out), Color::Red),
    ];
    for (i, (title, value, color)) in boxes.into_iter().enumerate() {
        let p = Paragraph::new(Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(p, totals[i]);
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(rows[1]);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(body[0]);

    let risk_rows: Vec<Row> = snapshot
        .stats
        .risks
        .iter()
        .map(|risk| {
            let (tag, color) = match risk.risk_kind {
                RiskKind::HighValue => ("HIGH", Color::Red),
                RiskKind::Duplicate => ("DUP ", Color::Yellow),
            };
            Row::new(vec![
                Cell::from(Span::styled(tag, Style::default().fg(color).add_modifier(Modifier::BOLD))),
                Cell::from(risk.movement.description.clone()),
                Cell::from(format!("{:.2}", risk.movement.amount)),
            ])
        })
        .collect();
    let risks = Table::new(risk_rows, [Constraint::Length(5), Constraint::Min(12), Constraint::Length(12)])
        .block(Block::default().borders(Borders::ALL).title(format!(" Risks ({}) ", snapshot.stats.risks.len())));
    f.render_widget(risks, side[0]);

    let top_rows: Vec<Row> = snapshot
        .stats
        .top5
        .iter()
        .map(|m| Row::new(vec![Cell::from(m.description.clone()), Cell::from(format!("{:.2}", m.amount))]))
        .collect();
    let top = Table::new(top_rows, [Constraint::Min(12), Constraint::Length(12)])
        .block(Block::default().borders(Borders::ALL).title(" Top 5 Movements "));
    f.render_widget(top, side[1]);

    let max_visible = (body[1].height as usize).saturating_sub(3);
    let movement_rows: Vec<Row> = snapshot
        .ledger
        .iter()
        .rev()
        .skip(app.scroll_offset)
        .take(max_visible)
        .map(|m| {
            let color = match m.movement_type {
                MovementType::Credit => Color::Green,
                MovementType::Debit => Color::Red,
            };
            Row::new(vec![
                Cell::from(m.date.format("%Y-%m-%d").to_string()),
                Cell::from(m.description.clone()),
                Cell::from(Span::styled(m.movement_type.label(), Style::default().fg(color))),
                Cell::from(format!("{:.2}", m.amount)),
                Cell::from(format!("{:.2}", m.dynamic_balance)),
            ])
        })
        .collect();
    let table = Table::new(
        movement_rows,
        [
            Constraint::Length(11),
            Constraint::Min(16),
            Constraint::Length(7),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(
        Row::new(vec!["DATE", "DESCRIPTION", "TYPE", "AMOUNT", "BALANCE"])
            .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::White)),
    )
    .block(Block::default().borders(Borders::ALL).title(format!(" Movements ({}) ", snapshot.ledger.len())));
    f.render_widget(table, body[1]);
}

fn draw_monitor(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(6)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    let health = &app.monitor.health;
    let health_text = vec![
        Line::from(vec![
            Span::styled("  Status:         ", Style::default().fg(Color::DarkGray)),
            Span::styled(health.status.label(), Style::default().fg(status_color(health.status)).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::styled("  5xx (last 10):  ", Style::default().fg(Color::DarkGray)),
            Span::raw(health.recent_errors.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Latency (last 5): ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{:.0}ms", health.recent_latency)),
        ]),
    ];
    f.render_widget(
        Paragraph::new(health_text).block(Block::default().borders(Borders::ALL).title(" Health ")),
        top[0],
    );

    let lat = &app.monitor.latency;
    let latency_text = vec![
        Line::from(format!("  p50={:<6} p95={:<6} p99={:<6}", lat.p50_ms, lat.p95_ms, lat.p99_ms)),
        Line::from(format!("  min={:<6} max={:<6} n={}", lat.min_ms, lat.max_ms, lat.count)),
    ];
    f.render_widget(
        Paragraph::new(latency_text).block(Block::default().borders(Borders::ALL).title(" Latency (ms) ")),
        top[1],
    );

    let max_visible = (chunks[1].height as usize).saturating_sub(3);
    let log_rows: Vec<Row> = app
        .monitor
        .logs
        .iter()
        .skip(app.scroll_offset)
        .take(max_visible)
        .map(|log| {
            let color = match log.log_type {
                LogType::Success => Color::Green,
                LogType::Risk => Color::Yellow,
                LogType::Error => Color::Red,
            };
            Row::new(vec![
                Cell::from(log.timestamp.format("%H:%M:%S").to_string()),
                Cell::from(Span::styled(log.log_type.label(), Style::default().fg(color).add_modifier(Modifier::BOLD))),
                Cell::from(log.status.to_string()),
                Cell::from(format!("{}ms", log.latency)),
                Cell::from(log.endpoint.clone()),
                Cell::from(log.message.clone()),
            ])
        })
        .collect();
    let table = Table::new(
        log_rows,
        [
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Min(20),
            Constraint::Min(12),
        ],
    )
    .header(
        Row::new(vec!["TIME", "TYPE", "STATUS", "LATENCY", "ENDPOINT", "MESSAGE"])
            .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::White)),
    )
    .block(Block::default().borders(Borders::ALL).title(format!(" Request Log ({}) ", app.monitor.logs.len())));
    f.render_widget(table, chunks[1]);
}
