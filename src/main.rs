use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::{
    io::{self, stdout},
    time::{Duration, Instant},
};

use gridclash::game::{
    Cell, Effect, Game, GamePhase, PlayerColor, PowerUp, RoundOutcome, POWER_UP_SPAWN_SECS,
};

// ============================================================================
// Visual Constants
// ============================================================================

const CELL_WIDTH: u16 = 2;
const CURSOR_CHAR: &str = "██";
const OWNED_CHAR: &str = "▒▒";
const EMPTY_CHAR: &str = "  ";

// ============================================================================
// Color Mapping
// ============================================================================

fn player_color(color: PlayerColor) -> Color {
    match color {
        PlayerColor::Pink => Color::Magenta,
        PlayerColor::Green => Color::Green,
    }
}

fn power_up_style(power_up: PowerUp) -> Style {
    match power_up.effect() {
        Effect::Claim => Style::default().fg(Color::Yellow),
        Effect::Clear => Style::default().fg(Color::Red),
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(frame: &mut Frame, game: &Game) {
    let area = frame.size();

    match game.phase {
        GamePhase::Ready => render_ready(frame, area),
        GamePhase::Playing => render_game(frame, game, area),
        GamePhase::Finished => render_finished(frame, game, area),
    }
}

fn render_game(frame: &mut Frame, game: &Game, area: Rect) {
    let rows = game.grid.rows() as u16;
    let grid_display_width = rows * CELL_WIDTH + 2;
    let grid_display_height = rows + 2;
    let info_width = 20;
    let total_width = grid_display_width + info_width + 2;
    let total_height = grid_display_height + 3;

    let main_area = centered_rect(total_width, total_height, area);

    let vertical = Layout::vertical([
        Constraint::Length(grid_display_height),
        Constraint::Fill(1),
    ])
    .split(main_area);

    let game_row = vertical[0];

    let horizontal = Layout::horizontal([
        Constraint::Length(grid_display_width),
        Constraint::Length(info_width),
    ])
    .split(game_row);

    render_grid(frame, game, horizontal[0]);
    render_info(frame, game, horizontal[1]);

    let controls_area = Rect {
        x: area.x,
        y: game_row.y + game_row.height,
        width: area.width,
        height: 2,
    };

    if controls_area.y + 1 < area.height {
        let controls = Paragraph::new(vec![Line::from(
            "P1: Arrows | P2: WASD | Q/ESC: Quit",
        )])
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(controls, controls_area);
    }
}

fn render_grid(frame: &mut Frame, game: &Game, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" GridClash ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = game.grid.rows();
    let mut lines: Vec<Line> = Vec::new();

    for x in 0..rows {
        let mut spans: Vec<Span> = Vec::new();

        for y in 0..rows {
            let span = match game.grid.cell_at(x, y) {
                Some(cell) => cell_span(game, cell),
                None => Span::raw(EMPTY_CHAR),
            };
            spans.push(span);
        }

        lines.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(lines);
    frame.render_widget(paragraph, inner);
}

fn cell_span<'a>(game: &Game, cell: &Cell) -> Span<'a> {
    if let Some(owner) = cell.owner() {
        let color = player_color(game.player(owner).color);
        if cell.is_occupied() {
            return Span::styled(CURSOR_CHAR, Style::default().fg(color));
        }
        if let Some(power_up) = cell.power_up() {
            return Span::styled(power_up.icon(), power_up_style(power_up));
        }
        return Span::styled(OWNED_CHAR, Style::default().fg(color));
    }

    match cell.power_up() {
        Some(power_up) => Span::styled(power_up.icon(), power_up_style(power_up)),
        None => Span::raw(EMPTY_CHAR),
    }
}

fn render_info(frame: &mut Frame, game: &Game, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Scores ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::from("")];
    for player in &game.players {
        lines.push(Line::from(Span::styled(
            format!("{} player", player.color.label()),
            Style::default().fg(player_color(player.color)),
        )));
        lines.push(Line::from(format!("{}", player.score)));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "Time",
        Style::default().fg(Color::Yellow),
    )));
    lines.push(Line::from(format!("{}s", game.time_left)));

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

fn render_ready(frame: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("GRIDCLASH", Style::default().fg(Color::Cyan))),
        Line::from(""),
        Line::from("Claim more cells than"),
        Line::from("your opponent before"),
        Line::from("the clock runs out."),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to start",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" GridClash ")
            .title_alignment(Alignment::Center),
    );

    let popup_area = centered_rect(28, 12, area);
    frame.render_widget(paragraph, popup_area);
}

fn render_finished(frame: &mut Frame, game: &Game, area: Rect) {
    // Keep the final board visible behind the popup
    render_game(frame, game, area);

    let outcome = match game.outcome() {
        RoundOutcome::Draw => "It's a draw!".to_string(),
        RoundOutcome::Winner(id) => {
            format!("The {} player wins!", game.player(id).color.label())
        }
    };

    let mut text = vec![
        Line::from(""),
        Line::from(Span::styled("TIME'S UP", Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(outcome),
        Line::from(""),
    ];
    for player in &game.players {
        text.push(Line::from(Span::styled(
            format!("{}: {}", player.color.label(), player.score),
            Style::default().fg(player_color(player.color)),
        )));
    }
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        "R: restart | Q: quit",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Round Over ")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(Color::Black)),
    );

    let popup_area = centered_rect(30, 13, area);
    frame.render_widget(paragraph, popup_area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let horizontal = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width.min(area.width)),
        Constraint::Fill(1),
    ])
    .split(area);

    let vertical = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(area.height)),
        Constraint::Fill(1),
    ])
    .split(horizontal[1]);

    vertical[1]
}

// ============================================================================
// Main Loop
// ============================================================================

fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

fn main() -> io::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut game = Game::new();
    let mut last_tick = Instant::now();
    let mut last_spawn = Instant::now();
    let tick_duration = Duration::from_secs(1);
    let spawn_duration = Duration::from_secs(POWER_UP_SPAWN_SECS);

    // Main loop
    loop {
        terminal.draw(|frame| render(frame, &game))?;

        let timeout = tick_duration
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        // Always allow quit
                        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => break,
                        KeyCode::Enter if game.phase == GamePhase::Ready => {
                            game.start();
                            last_tick = Instant::now();
                            last_spawn = Instant::now();
                        }
                        KeyCode::Char('r') | KeyCode::Char('R')
                            if game.phase == GamePhase::Finished =>
                        {
                            game.restart();
                            last_tick = Instant::now();
                            last_spawn = Instant::now();
                        }
                        code if game.phase == GamePhase::Playing => {
                            game.handle_key(normalize(code));
                        }
                        _ => {}
                    }
                }
            }
        }

        if game.phase == GamePhase::Playing {
            if last_tick.elapsed() >= tick_duration {
                game.tick_second();
                last_tick = Instant::now();
            }
            if last_spawn.elapsed() >= spawn_duration {
                game.spawn_power_up();
                last_spawn = Instant::now();
            }
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
