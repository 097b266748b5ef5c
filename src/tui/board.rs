use super::UiState;
use crate::model::{project, PhaseStatus};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

pub(super) fn draw(area: Rect, f: &mut Frame, state: &UiState) {
    if state.show_help {
        super::help::draw_help(area, f);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(5),
            Constraint::Length(3),
        ])
        .split(area);

    draw_tabs(rows[0], f, state);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    draw_code(middle[0], f, state);
    draw_detail(middle[1], f, state);

    draw_board(rows[2], f, state);
    draw_status(rows[3], f, state);
}

fn draw_tabs(area: Rect, f: &mut Frame, state: &UiState) {
    let titles: Vec<Line> = state
        .scenarios
        .iter()
        .map(|s| {
            let view = state.view(s.id);
            if view.completed == s.catalog.len() && !view.advancing {
                Line::from(format!("{} ✓", s.title))
            } else {
                Line::from(s.title)
            }
        })
        .collect();
    let tabs = Tabs::new(titles)
        .select(state.selected)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL).title("Scenarios"));
    f.render_widget(tabs, area);
}

fn draw_code(area: Rect, f: &mut Frame, state: &UiState) {
    let scenario = state.selected_scenario();
    let mut lines = vec![Line::from(Span::styled(
        scenario.description,
        Style::default().fg(Color::Gray),
    ))];
    lines.push(Line::from(""));
    lines.extend(scenario.code.lines().map(Line::from));
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Code"));
    f.render_widget(p, area);
}

/// Right-hand panel: the active phase's payload while advancing, the program
/// output once the run settles, otherwise a hint.
fn draw_detail(area: Rect, f: &mut Frame, state: &UiState) {
    let scenario = state.selected_scenario();
    let view = state.view(scenario.id);
    let total = scenario.catalog.len();

    let (title, lines): (String, Vec<Line>) = if view.advancing {
        let index = view.completed.min(total - 1);
        let phase = &scenario.catalog.phases()[index];
        let lines = phase
            .payload
            .as_ref()
            .map(payload_lines)
            .unwrap_or_else(|| vec![Line::from("…")]);
        (phase.name.clone(), lines)
    } else if view.completed == total {
        let lines = scenario
            .output
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Green))))
            .collect();
        ("Output".to_string(), lines)
    } else {
        (
            "Phases".to_string(),
            vec![Line::from(Span::styled(
                "press r to run",
                Style::default().fg(Color::DarkGray),
            ))],
        )
    };

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_board(area: Rect, f: &mut Frame, state: &UiState) {
    let scenario = state.selected_scenario();
    let view = state.view(scenario.id);
    let cells = project(&scenario.catalog, view.completed, view.advancing);

    let constraints: Vec<Constraint> = cells
        .iter()
        .map(|_| Constraint::Ratio(1, cells.len() as u32))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (cell, column) in cells.iter().zip(columns.iter()) {
        let (marker, style) = match cell.status {
            PhaseStatus::Completed => ("✓", Style::default().fg(Color::Green)),
            PhaseStatus::InProgress => (
                "⟳",
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
            ),
            PhaseStatus::Pending => ("·", Style::default().fg(Color::DarkGray)),
        };
        let p = Paragraph::new(Line::from(Span::styled(
            format!("{marker} {}", cell.name),
            style,
        )))
        .block(Block::default().borders(Borders::ALL).border_style(style))
        .alignment(Alignment::Center);
        f.render_widget(p, *column);
    }
}

fn draw_status(area: Rect, f: &mut Frame, state: &UiState) {
    let line = Line::from(vec![
        Span::styled("r", Style::default().fg(Color::Magenta)),
        Span::raw(" run  "),
        Span::styled("x", Style::default().fg(Color::Magenta)),
        Span::raw(" reset  "),
        Span::styled("tab", Style::default().fg(Color::Magenta)),
        Span::raw(" next  "),
        Span::styled("?", Style::default().fg(Color::Magenta)),
        Span::raw(" help  "),
        Span::styled("q", Style::default().fg(Color::Magenta)),
        Span::raw(" quit   "),
        Span::styled(state.info.clone(), Style::default().fg(Color::Yellow)),
    ]);
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

/// Render an opaque phase payload as display lines. Known display shapes
/// (tokens, checks, output, tree) get dedicated layouts; anything else falls
/// back to pretty JSON.
fn payload_lines(payload: &serde_json::Value) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(desc) = payload.get("description").and_then(|v| v.as_str()) {
        lines.push(Line::from(Span::styled(
            desc.to_string(),
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(""));
    }

    if let Some(tokens) = payload.get("tokens").and_then(|v| v.as_array()) {
        let joined = tokens
            .iter()
            .filter_map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(Line::from(joined));
    } else if let Some(checks) = payload.get("checks").and_then(|v| v.as_array()) {
        for check in checks {
            let status = check.get("status").and_then(|v| v.as_str()).unwrap_or("?");
            let text = check.get("check").and_then(|v| v.as_str()).unwrap_or("");
            lines.push(Line::from(vec![
                Span::styled(status.to_string(), Style::default().fg(Color::Green)),
                Span::raw(" "),
                Span::raw(text.to_string()),
            ]));
        }
    } else if let Some(output) = payload.get("output").and_then(|v| v.as_array()) {
        for entry in output {
            if let Some(s) = entry.as_str() {
                lines.push(Line::from(s.to_string()));
            }
        }
    } else if let Some(tree) = payload.get("tree") {
        push_tree(&mut lines, tree, 0);
    } else if lines.is_empty() {
        let pretty = serde_json::to_string_pretty(payload).unwrap_or_default();
        lines.extend(pretty.lines().map(|l| Line::from(l.to_string())));
    }

    lines
}

fn push_tree(lines: &mut Vec<Line<'static>>, node: &serde_json::Value, depth: usize) {
    if let Some(name) = node.get("name").and_then(|v| v.as_str()) {
        lines.push(Line::from(format!("{}{}", "  ".repeat(depth), name)));
    }
    if let Some(children) = node.get("children").and_then(|v| v.as_array()) {
        for child in children {
            push_tree(lines, child, depth + 1);
        }
    }
}
