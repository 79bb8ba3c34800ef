//! Countdown rendering

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::time::Duration;

use super::Countdown;
use crate::session::SessionType;

const SHORT_BREAK: Color = Color::Rgb(154, 255, 0);
const LONG_BREAK: Color = Color::Rgb(0, 239, 255);
const WARNING: Color = Color::Rgb(255, 196, 0);
const ALERT: Color = Color::Rgb(255, 0, 68);

const CONTROLS: [&str; 3] = [
    "CTRL-C | ESC -> Quit",
    "p      | P   -> Pause",
    "c      | C   -> Continue",
];

/// Rows in a big clock glyph
pub const GLYPH_HEIGHT: u16 = 5;

/// Main draw function
pub fn draw(f: &mut Frame, countdown: &Countdown) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),                // Spacer
            Constraint::Length(GLYPH_HEIGHT),  // Clock
            Constraint::Length(1),             // Gap
            Constraint::Length(2),             // Session type and task
            Constraint::Min(0),                // Spacer
            Constraint::Length(CONTROLS.len() as u16), // Footer
        ])
        .split(f.area());

    draw_clock(f, countdown, chunks[1]);
    draw_description(f, countdown, chunks[3]);
    draw_footer(f, countdown, chunks[5]);
}

fn draw_clock(f: &mut Frame, countdown: &Countdown, area: Rect) {
    let color = clock_color(
        countdown.session_type(),
        countdown.remaining(),
        countdown.duration(),
    );

    let lines: Vec<Line> = big_text(&format_clock(countdown.display_time()))
        .into_iter()
        .map(Line::from)
        .collect();

    let clock = Paragraph::new(lines)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center);
    f.render_widget(clock, area);
}

fn draw_description(f: &mut Frame, countdown: &Countdown, area: Rect) {
    let mut header = vec![Span::raw(countdown.session_type().as_str())];
    if countdown.is_paused() {
        header.push(Span::raw(" "));
        header.push(Span::styled("[PAUSED]", Style::default().fg(WARNING).bold()));
    }

    let description = Paragraph::new(vec![
        Line::from(header),
        Line::from(countdown.task().title.as_str()),
    ])
    .alignment(Alignment::Center);
    f.render_widget(description, area);
}

fn draw_footer(f: &mut Frame, countdown: &Countdown, area: Rect) {
    let counter = format!("sessions : {}", countdown.task().sessions);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(counter.len() as u16)])
        .split(area);

    let controls: Vec<Line> = CONTROLS.iter().map(|c| Line::from(*c)).collect();
    f.render_widget(
        Paragraph::new(controls).style(Style::default().fg(Color::DarkGray)),
        cols[0],
    );

    // Bottom-right corner
    let mut lines = vec![Line::from(""); CONTROLS.len() - 1];
    lines.push(Line::from(counter));
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Right), cols[1]);
}

/// Clock color: breaks have a fixed color, focus shifts from the default
/// color to warning at half time and to alert at a quarter.
pub fn clock_color(session_type: SessionType, remaining: Duration, total: Duration) -> Color {
    match session_type {
        SessionType::Short => SHORT_BREAK,
        SessionType::Long => LONG_BREAK,
        SessionType::Focus => {
            let percent = if total.is_zero() {
                0.0
            } else {
                remaining.as_secs_f64() * 100.0 / total.as_secs_f64()
            };

            if percent > 50.0 {
                Color::Reset
            } else if percent >= 25.0 {
                WARNING
            } else {
                ALERT
            }
        }
    }
}

/// `MM:SS`, or `HH:MM:SS` from one hour up, rounded to the nearest second
pub fn format_clock(d: Duration) -> String {
    let total = (d.as_millis() + 500) / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours < 1 {
        format!("{:02}:{:02}", minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Render `text` with the block font, one string per row.
/// Characters without a glyph are skipped.
pub fn big_text(text: &str) -> Vec<String> {
    let glyphs: Vec<&[&str; GLYPH_HEIGHT as usize]> = text.chars().filter_map(glyph).collect();

    (0..GLYPH_HEIGHT as usize)
        .map(|row| {
            glyphs
                .iter()
                .map(|g| g[row])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn glyph(c: char) -> Option<&'static [&'static str; GLYPH_HEIGHT as usize]> {
    let glyph = match c {
        '0' => &["█████", "█   █", "█   █", "█   █", "█████"],
        '1' => &["  █  ", " ██  ", "  █  ", "  █  ", " ███ "],
        '2' => &["█████", "    █", "█████", "█    ", "█████"],
        '3' => &["█████", "    █", " ████", "    █", "█████"],
        '4' => &["█   █", "█   █", "█████", "    █", "    █"],
        '5' => &["█████", "█    ", "█████", "    █", "█████"],
        '6' => &["█████", "█    ", "█████", "█   █", "█████"],
        '7' => &["█████", "    █", "   █ ", "  █  ", "  █  "],
        '8' => &["█████", "█   █", "█████", "█   █", "█████"],
        '9' => &["█████", "█   █", "█████", "    █", "█████"],
        ':' => &["   ", " █ ", "   ", " █ ", "   "],
        _ => return None,
    };
    Some(glyph)
}
