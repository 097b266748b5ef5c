use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("r", Style::default().fg(Color::Magenta)),
            Span::raw("           Run selected scenario"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("x", Style::default().fg(Color::Magenta)),
            Span::raw("           Reset selected scenario"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("tab / ←/→", Style::default().fg(Color::Magenta)),
            Span::raw("   Switch scenario"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("?", Style::default().fg(Color::Magenta)),
            Span::raw("           Toggle this help"),
        ]),
        Line::from(""),
        Line::from("A completed scenario stays at 100% until reset; runs advance"),
        Line::from("independently, so other scenarios keep going while you watch one."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
