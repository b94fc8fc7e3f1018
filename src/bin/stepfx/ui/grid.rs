//! Step grid for the pattern each track is playing, with playhead

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use stepfx::sequencing::Song;

use crate::demo::TRACKS;
use super::StatusUpdate;

/// Pattern `track` is on for the global pattern `global`.
fn track_pattern(loops: &[Option<(usize, usize)>], track: usize, global: usize) -> usize {
    match loops.get(track).copied().flatten() {
        Some((start, end)) => start + global % (end - start + 1),
        None => global,
    }
}

pub fn render_grid(
    frame: &mut Frame,
    area: Rect,
    song: &Song,
    status: &StatusUpdate,
    selected: usize,
    loops: &[Option<(usize, usize)>],
) {
    let block = Block::default().title(" Pattern ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 2 || inner.width < 24 {
        return;
    }

    let playhead = status.position.step;
    let mut lines = Vec::new();

    for track in 0..song.track_count() {
        let pattern = track_pattern(loops, track, status.position.pattern);
        let Some(grid) = song.grid(pattern, track) else {
            continue;
        };
        let name = TRACKS.get(track).copied().unwrap_or("track");
        let loop_label = match loops.get(track).copied().flatten() {
            Some((a, b)) => format!("[{}-{}]", a + 1, b + 1),
            None => String::new(),
        };
        let label_style = if track == selected {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(Span::styled(
            format!("{name:6} P{} {loop_label}", pattern + 1),
            label_style,
        )));

        for row in (0..grid.rows()).rev() {
            if (0..grid.steps()).all(|s| grid.note(row, s).is_none()) {
                continue;
            }
            let mut spans = vec![Span::raw("  ")];
            for step in 0..grid.steps() {
                let on = grid.note(row, step).is_some();
                let glyph = if on { "▓" } else { "░" };
                let fg = match (on, step == playhead && status.position.playing) {
                    (true, true) => Color::Yellow,
                    (false, true) => Color::Gray,
                    (true, false) => Color::Cyan,
                    (false, false) => Color::DarkGray,
                };
                spans.push(Span::styled(glyph, Style::default().fg(fg)));
                if step % 4 == 3 {
                    spans.push(Span::raw(" "));
                }
            }
            lines.push(Line::from(spans));
        }
    }

    frame.render_widget(Paragraph::new(lines), inner);
}
