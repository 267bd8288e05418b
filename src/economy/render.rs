//! Status panel for the browser driver (read-only from the engine).

use ratzilla::ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Paragraph};
use ratzilla::ratatui::Frame;

use super::boost;
use super::catalog::AssetClass;
use super::state::{BoostStatus, Track};
use super::Engine;

/// Key hints, in the order the driver binds them.
pub const HELP: &str =
    "[C] tap  [U] upgrade  [1-9] buy business  [E]/[B] watch ad  [I] investing  [O] dismiss";

pub fn render(engine: &Engine, f: &mut Frame, area: Rect) {
    let investing = engine.is_investing_view_active();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(7), // Wallet
            Constraint::Length(4), // Boosts
            Constraint::Min(3),    // Businesses or market
            Constraint::Length(3), // Help
        ])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        "Idle Tycoon",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    render_wallet(engine, f, chunks[1]);
    render_boosts(engine, f, chunks[2]);
    if investing {
        render_market(engine, f, chunks[3]);
    } else {
        render_businesses(engine, f, chunks[3]);
    }

    let help = Paragraph::new(Line::from(Span::styled(
        HELP,
        Style::default().fg(Color::DarkGray),
    )))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Center);
    f.render_widget(help, chunks[4]);
}

fn render_wallet(engine: &Engine, f: &mut Frame, area: Rect) {
    let s = engine.state();
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Balance: "),
            Span::styled(
                s.balance.to_string(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!(
            "Level {}  |  {} per tap  |  upgrade {}",
            s.level,
            engine.per_click(),
            s.upgrade_cost
        )),
        Line::from(format!(
            "Income {}/h  |  net worth {}",
            engine.hourly_income(),
            engine.net_worth()
        )),
    ];
    if s.offline_earnings > 0 {
        lines.push(Line::from(Span::styled(
            format!("While you were away you earned {}", s.offline_earnings),
            Style::default().fg(Color::Green),
        )));
    }
    let wallet = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Wallet "),
    );
    f.render_widget(wallet, area);
}

fn boost_line(engine: &Engine, track: Track) -> Line<'static> {
    let state = engine.state().boost(track);
    let secs = engine.boost_remaining_seconds(track);
    let (text, color) = match state.status {
        BoostStatus::Idle => ("ready".to_string(), Color::Gray),
        BoostStatus::Watching => (format!("watching ad, {secs}s"), Color::Blue),
        BoostStatus::Boosted => (format!("2x for {secs}s"), Color::Magenta),
    };
    Line::from(vec![
        Span::raw(format!("{:>9} boost: ", track.name())),
        Span::styled(text, Style::default().fg(color)),
    ])
}

fn render_boosts(engine: &Engine, f: &mut Frame, area: Rect) {
    let lines: Vec<Line> = Track::all()
        .iter()
        .map(|t| boost_line(engine, *t))
        .collect();
    let boosts = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
            .title(" Boosts "),
    );
    f.render_widget(boosts, area);
}

fn render_businesses(engine: &Engine, f: &mut Frame, area: Rect) {
    let s = engine.state();
    let lines: Vec<Line> = engine
        .catalog()
        .businesses
        .iter()
        .enumerate()
        .map(|(i, def)| {
            let price = def.sizes.first().map(|z| z.cost).unwrap_or(0);
            Line::from(format!(
                " [{}] {:<16} {:>8}  owned {}",
                i + 1,
                def.name,
                price,
                s.owned_count(&def.id)
            ))
        })
        .collect();
    let boosted = boost::is_active(&s.business_boost);
    let title = if boosted {
        " Businesses (2x) "
    } else {
        " Businesses "
    };
    let list = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(title),
    );
    f.render_widget(list, area);
}

fn render_market(engine: &Engine, f: &mut Frame, area: Rect) {
    let mut lines = Vec::new();
    for class in [AssetClass::Stock, AssetClass::Crypto] {
        for asset in engine.catalog().assets(class) {
            let price = engine.asset_price(class, &asset.id).unwrap_or(asset.base_price);
            let held = engine
                .state()
                .holding(class, &asset.id)
                .map(|h| h.quantity)
                .unwrap_or(0.0);
            lines.push(Line::from(format!(
                " {:<6} {:<6} {:>12.2}  held {}",
                class.name(),
                asset.id,
                price,
                held
            )));
        }
    }
    let market = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue))
            .title(format!(" Market  portfolio {:.2} ", engine.portfolio_value())),
    );
    f.render_widget(market, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::catalog::Catalog;
    use crate::economy::save::MemoryStorage;
    use crate::economy::EngineConfig;
    use crate::time::ManualClock;
    use ratzilla::ratatui::backend::TestBackend;
    use ratzilla::ratatui::Terminal;

    fn screen_text(engine: &Engine) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(engine, f, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn engine() -> Engine {
        Engine::new(
            Catalog::starter(),
            EngineConfig::default(),
            Box::new(MemoryStorage::new()),
            Box::new(ManualClock::new(1_000)),
        )
    }

    #[test]
    fn shows_wallet_and_businesses() {
        let mut e = engine();
        e.tap();
        let text = screen_text(&e);
        assert!(text.contains("Balance: 1"));
        assert!(text.contains("Coffee Stand"));
        assert!(!text.contains("Market"));
    }

    #[test]
    fn investing_view_swaps_in_market() {
        let mut e = engine();
        e.set_investing_view_active(true);
        let text = screen_text(&e);
        assert!(text.contains("Market"));
        assert!(text.contains("TECH"));
    }
}
