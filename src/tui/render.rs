use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell as TableCell, Clear, Paragraph, Row, Table, Tabs, Wrap},
};

use super::app::App;
use super::resource::Resource;
use crate::explorer::{TreeKind, View, ViewContent};
use crate::table::{DataTable, SortOrder};

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(1)])
        .split(f.area());

    render_header(f, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(32), Constraint::Percentage(68)])
        .split(chunks[1]);

    let trees = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(body[0]);
    render_tree(f, app, TreeKind::Model, trees[0]);
    render_tree(f, app, TreeKind::Report, trees[1]);

    render_views(f, app, body[1]);
    render_footer(f, app, chunks[2]);

    if app.wait.is_visible() {
        render_wait(f, app, f.area());
    }
    if app.error.is_some() {
        render_error(f, app, f.area());
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let run = match app.run_status.as_ref() {
        Resource::NotAsked => Span::styled("not analyzed", Style::default().fg(theme.overlay1)),
        Resource::Loading => Span::styled(format!("{} running", app.wait.spinner()), theme.info_style()),
        Resource::Success(summary) => Span::styled(
            format!("{} result(s) in {:.2}s", summary.results, summary.duration.as_secs_f64()),
            theme.success_style(),
        ),
        Resource::Failure(message) => Span::styled(format!("failed: {}", message), theme.error_style()),
    };

    let line = Line::from(vec![
        Span::styled(app.explorer.model_tree().header().to_string(), theme.title_style()),
        Span::raw("  │  "),
        run,
        Span::raw("  │  "),
        Span::styled(app.status.clone(), Style::default().fg(theme.subtext0)),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style(false))
        .title(" Fault Explorer ");
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn render_tree(f: &mut Frame, app: &mut App, kind: TreeKind, area: Rect) {
    let focused = app.active_tree() == kind;
    let height = area.height.saturating_sub(2) as usize;
    app.update_tree_scroll(kind, height);

    let theme = &app.theme;
    let tree = app.explorer.tree(kind);
    let registry = app.explorer.registry(kind);
    let state = app.tree_state(kind);

    let title = match kind {
        TreeKind::Model => " Model ".to_string(),
        TreeKind::Report if tree.is_empty() => " Report (press r) ".to_string(),
        TreeKind::Report => " Report ".to_string(),
    };

    let lines: Vec<Line> = state
        .visible()
        .iter()
        .skip(state.scroll_offset())
        .take(height)
        .map(|&(id, depth)| {
            let marker = if !tree.children(id).is_empty() {
                if state.is_expanded(id) { "▼ " } else { "▶ " }
            } else {
                "  "
            };
            let label = tree.label(id).unwrap_or_default();
            let mut style = if registry.contains(id) {
                Style::default().fg(theme.text)
            } else {
                Style::default().fg(theme.subtext0)
            };
            if focused && state.selected() == Some(id) {
                style = theme.selected_style();
            }
            Line::from(vec![
                Span::raw("  ".repeat(depth)),
                Span::styled(marker, Style::default().fg(theme.overlay1)),
                Span::styled(label.to_string(), style),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style(focused))
        .title(Span::styled(title, theme.title_style()));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_views(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(false));
    let inner = block.inner(chunks[1]);
    app.set_viewport(inner.width, inner.height);

    let theme = &app.theme;
    let workspace = app.explorer.workspace();
    let titles: Vec<Line> = workspace
        .tabs()
        .iter()
        .filter_map(|&h| workspace.view(h))
        .map(|view| Line::from(view.title.clone()))
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).border_style(theme.border_style(false)))
        .select(workspace.current_index().unwrap_or(0))
        .style(Style::default().fg(theme.subtext0))
        .highlight_style(Style::default().fg(theme.lavender).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    match workspace.current_view() {
        None => {
            let hint = Paragraph::new("Select a node and press Enter to open a view")
                .style(Style::default().fg(theme.overlay1))
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(hint, chunks[1]);
        }
        Some(view) => render_view(f, app, view, block, chunks[1]),
    }
}

fn render_view(f: &mut Frame, app: &App, view: &View, block: Block, area: Rect) {
    let theme = &app.theme;
    match &view.content {
        ViewContent::Diagram(diagram) => {
            let lines: Vec<Line> = diagram
                .lines()
                .into_iter()
                .map(|line| {
                    let style = if line.contains('↪') {
                        theme.transfer_style()
                    } else if line.contains("(undefined)") {
                        theme.placeholder_style()
                    } else if line.trim_end().ends_with(')') {
                        theme.gate_style()
                    } else {
                        theme.event_style()
                    };
                    Line::from(Span::styled(line, style))
                })
                .collect();
            let block = block.title(Span::styled(format!(" {} · {}% ", diagram.fault_tree, diagram.zoom()), theme.title_style()));
            f.render_widget(Paragraph::new(lines).block(block), area);
        }
        ViewContent::Table(table) => render_table(f, app, table, block, area),
    }
}

fn render_table(f: &mut Frame, app: &App, table: &DataTable, block: Block, area: Rect) {
    let theme = &app.theme;
    let sort = table.sort_state();
    let header = Row::new(table.columns().iter().enumerate().map(|(i, name)| {
        let arrow = match sort {
            Some((c, SortOrder::Ascending)) if c == i => " ▲",
            Some((c, SortOrder::Descending)) if c == i => " ▼",
            _ => "",
        };
        TableCell::from(format!("{}{}", name, arrow))
    }))
    .style(Style::default().fg(theme.blue).add_modifier(Modifier::BOLD));

    let rows = table.rows().iter().map(|row| {
        Row::new(row.iter().map(|cell| {
            let style = if cell.is_undefined() {
                theme.placeholder_style()
            } else {
                Style::default().fg(theme.text)
            };
            TableCell::from(Span::styled(cell.to_string(), style))
        }))
    });

    let widths: Vec<Constraint> = table
        .column_widths()
        .into_iter()
        .map(|w| Constraint::Length(w.min(60) as u16 + 1))
        .collect();
    let block = block.title(Span::styled(
        format!(" {} · {} row(s) ", table.title(), table.row_count()),
        theme.title_style(),
    ));
    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let keys = [
        ("↑↓←→", "move"),
        ("Enter", "open"),
        ("Tab", "tree"),
        ("r", "run"),
        ("n", "new"),
        ("x", "close"),
        ("[ ]", "tabs"),
        ("+ - =", "zoom"),
        ("s", "sort"),
        ("^Q", "quit"),
    ];
    let mut spans = Vec::new();
    for (key, action) in keys {
        spans.push(Span::styled(format!(" {} ", key), theme.key_style()));
        spans.push(Span::styled(format!("{} ", action), Style::default().fg(theme.subtext0)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_wait(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let popup = centered_rect(50, 20, area);
    f.render_widget(Clear, popup);

    let content = vec![
        Line::from(vec![
            Span::styled(app.wait.spinner().to_string(), Style::default().fg(theme.sky).add_modifier(Modifier::BOLD)),
            Span::styled(" Running analysis...", Style::default().fg(theme.sky)),
        ]),
        Line::from(""),
        Line::from(Span::styled(app.wait.label().to_string(), Style::default().fg(theme.text))),
        Line::from(""),
        Line::from(Span::styled("Ctrl+W hides this window", Style::default().fg(theme.overlay1))),
    ];
    let block = Block::default()
        .title(" Please wait ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.sky))
        .style(Style::default().bg(theme.mantle));
    f.render_widget(
        Paragraph::new(content).block(block).alignment(Alignment::Center).wrap(Wrap { trim: true }),
        popup,
    );
}

fn render_error(f: &mut Frame, app: &App, area: Rect) {
    let Some(modal) = &app.error else { return };
    let theme = &app.theme;
    let popup = centered_rect(60, 30, area);
    f.render_widget(Clear, popup);

    let content = vec![
        Line::from(vec![
            Span::styled("✗ ", theme.error_style()),
            Span::styled(modal.title.clone(), theme.error_style().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
        Line::from(Span::styled(modal.message.clone(), Style::default().fg(theme.text))),
        Line::from(""),
        Line::from(Span::styled("Press Enter or Esc to close", Style::default().fg(theme.overlay1))),
    ];
    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(theme.error_style())
        .style(Style::default().bg(theme.mantle));
    f.render_widget(
        Paragraph::new(content).block(block).alignment(Alignment::Center).wrap(Wrap { trim: true }),
        popup,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
