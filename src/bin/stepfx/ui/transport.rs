//! Transport bar: tempo, play state, position, queue and level

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::StatusUpdate;

pub fn render_transport(frame: &mut Frame, area: Rect, status: &StatusUpdate) {
    let block = Block::default().title(" stepfx ").borders(Borders::ALL);

    let playing = status.position.playing;
    let (symbol, label) = if playing { ("▶", "Playing") } else { ("■", "Stopped") };
    let queued = match status.queued {
        Some(p) => format!("next: P{}  ", p + 1),
        None => String::new(),
    };
    let color = status.color;
    let swatch = Color::Rgb(
        (color.r * 255.0) as u8,
        (color.g * 255.0) as u8,
        (color.b * 255.0) as u8,
    );

    let line = Line::from(vec![
        Span::styled(format!(" BPM: {}  ", status.bpm), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("{symbol} {label}  "),
            Style::default().fg(if playing { Color::Green } else { Color::Yellow }),
        ),
        Span::styled(
            format!(
                "P{} step {:>2}  ",
                status.position.pattern + 1,
                status.position.step + 1
            ),
            Style::default().fg(Color::White),
        ),
        Span::styled(queued, Style::default().fg(Color::LightMagenta)),
        Span::styled(
            if status.follow { "follow  " } else { "" },
            Style::default().fg(Color::LightBlue),
        ),
        Span::styled(
            format!("voices: {}  ", status.voices),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled("██", Style::default().fg(swatch)),
        Span::styled(
            format!("  Peak: {:.2}", status.peak),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
