use chrono::Utc;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, InputMode};
use crate::catalog::ColumnDef;
use crate::lifecycle::LifecyclePhase;
use crate::model::{ModalState, NoticeLevel};
use crate::palette::PaletteDomain;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const PL_D: Color = Color::Rgb(82, 24, 124);
const PL_E: Color = Color::Rgb(13, 148, 136);
const SELECTED_BG: Color = Color::Rgb(24, 36, 58);

pub fn render(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_kind_bar(frame, root[1], app);
    render_body(frame, root[2], app);
    render_footer(frame, root[3], app);

    match app.mode() {
        InputMode::ClusterPicker => render_cluster_picker(frame, app),
        InputMode::Palette => render_palette(frame, app),
        InputMode::Viewer => render_viewer(frame, app),
        InputMode::ConfirmDelete => render_delete_confirm(frame, app),
        InputMode::ScalePrompt => render_scale_prompt(frame, app),
        InputMode::ScaleDownConfirm => render_scale_down(frame, app),
        InputMode::Normal | InputMode::Filter => {}
    }

    if app.show_help() {
        render_help_modal(frame, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let left_line = build_left_header_line(app);
    let right_line = build_right_header_line(app);
    let right_width = spans_width(&right_line.spans) as u16;
    if area.width < 42 || right_width == 0 || right_width >= area.width {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right_line).style(Style::default().bg(BG)),
        chunks[1],
    );
}

fn build_left_header_line(app: &App) -> Line<'static> {
    let focus = app.focus();
    let cluster = match (focus.cluster.as_deref(), app.connecting()) {
        (_, Some(connecting)) => format!(" 󰠳 {} … ", compact_text(connecting, 24)),
        (Some(cluster), None) => format!(" 󰠳 {} ", compact_text(cluster, 24)),
        (None, None) => " 󰠳 no cluster ".to_string(),
    };

    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, cluster, Color::White, PL_A, PL_B);
    push_powerline_segment(
        &mut spans,
        format!(" 󰉖 {} ", compact_text(&focus.namespace.label(), 20)),
        Color::White,
        PL_B,
        PL_C,
    );
    let loading = if app.is_loading() { " ⟳" } else { "" };
    push_powerline_segment(
        &mut spans,
        format!(" {} ({}){loading} ", focus.kind.label, focus.kind.shortcut),
        Color::White,
        PL_C,
        BG,
    );
    Line::from(spans)
}

fn build_right_header_line(app: &App) -> Line<'static> {
    let Some(state) = app.lifecycle() else {
        return Line::default();
    };

    let (phase_fg, phase_bg) = phase_colors(state.phase);
    let nodes = state
        .total_desired_nodes
        .map(|total| format!(" 󰒋 {total} nodes "))
        .unwrap_or_else(|| " 󰒋 ? nodes ".to_string());
    let mut segments = vec![
        (format!(" {} ", state.phase), phase_fg, phase_bg),
        (nodes, Color::White, PL_D),
    ];
    if let Some(upgrade) = app.upgrade()
        && !upgrade.is_up_to_date
        && !upgrade.latest_version.is_empty()
    {
        let label = format!(
            " 󰚰 {} → {} ",
            upgrade.current_version, upgrade.latest_version
        );
        segments.push((label, Color::Black, WARN));
    }

    let mut spans = Vec::new();
    let mut next_bg = BG;
    for (label, fg, bg) in segments {
        push_powerline_segment_rtl(&mut spans, label, fg, bg, next_bg);
        next_bg = bg;
    }
    spans.push(Span::styled(" ", Style::default().bg(next_bg)));
    Line::from(spans)
}

fn phase_colors(phase: LifecyclePhase) -> (Color, Color) {
    match phase {
        LifecyclePhase::Running => (Color::Black, ACCENT),
        LifecyclePhase::ScalingDown | LifecyclePhase::ScalingUp => (Color::Black, WARN),
        LifecyclePhase::ScaledDown => (Color::White, PL_C),
        LifecyclePhase::Unknown => (Color::White, Color::Rgb(30, 41, 59)),
    }
}

fn render_kind_bar(frame: &mut Frame, area: Rect, app: &App) {
    let active = app.focus().kind.key;
    let mut spans = Vec::new();
    for kind in app.catalog().kinds() {
        let style = if kind.key == active {
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED).bg(BG)
        };
        spans.push(Span::styled(
            format!(" {}:{} ", kind.shortcut, kind.label),
            style,
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &mut App) {
    let show_filter = app.mode() == InputMode::Filter || !app.focus().filter.is_empty();
    let table_area = if show_filter {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(3)])
            .split(area);
        render_filter_line(frame, chunks[0], app);
        chunks[1]
    } else {
        area
    };

    app.set_table_page_size(table_rows_visible(table_area));
    render_table(frame, table_area, app);
}

fn render_filter_line(frame: &mut Frame, area: Rect, app: &App) {
    let editing = app.mode() == InputMode::Filter;
    let cursor = if editing { "▏" } else { "" };
    let line = Line::from(vec![
        Span::styled(" / ", Style::default().fg(Color::Black).bg(PL_E)),
        Span::styled(
            format!(" {}{cursor}", app.focus().filter),
            Style::default().fg(if editing { Color::White } else { MUTED }),
        ),
    ]);
    frame.render_widget(Paragraph::new(line).style(Style::default().bg(BG)), area);
}

fn render_table(frame: &mut Frame, area: Rect, app: &App) {
    let kind = app.focus().kind;
    if app.focus().cluster.is_none() {
        let hint = Paragraph::new(Text::from(vec![
            Line::from("No cluster selected."),
            Line::from(""),
            Line::from("Press C to pick a cluster."),
        ]))
        .block(panel_block(kind.label.to_string(), MUTED))
        .style(Style::default().fg(MUTED));
        frame.render_widget(hint, area);
        return;
    }

    if let Some(error) = app.focused_table().and_then(|table| table.error.as_deref()) {
        let panel = Paragraph::new(Text::from(error.to_string()))
            .wrap(Wrap { trim: false })
            .block(panel_block(format!("{} Error", kind.label), ERROR))
            .style(Style::default().fg(ERROR));
        frame.render_widget(panel, area);
        return;
    }

    let visible_rows = app.visible_rows();
    let header_row = Row::new(kind.columns.iter().map(|column| {
        Cell::from(column.label).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let now = Utc::now();
    let rows = visible_rows.iter().map(|row| {
        Row::new(
            row.render_columns(kind.columns, now)
                .into_iter()
                .map(|value| Cell::from(value).style(Style::default().fg(Color::White))),
        )
    });

    let refreshed = app
        .focused_table()
        .and_then(|table| table.last_refreshed)
        .map(|at| format!("  {}", at.format("%H:%M:%S")))
        .unwrap_or_default();
    let title = if app.is_loading() && app.focused_table().is_none() {
        format!("{} (loading…)", kind.label)
    } else {
        format!("{} ({}){refreshed}", kind.label, visible_rows.len())
    };

    let table = Table::new(rows, column_constraints(kind.columns))
        .header(header_row)
        .block(panel_block(title, ACCENT))
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(SELECTED_BG)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("󰜴 ");

    let mut state = TableState::default();
    state.select(app.selected_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mode = app.mode();
    let (mode_fg, mode_bg) = match mode {
        InputMode::ConfirmDelete | InputMode::ScaleDownConfirm => (Color::Black, WARN),
        InputMode::Normal => (Color::White, PL_A),
        _ => (Color::White, PL_E),
    };

    let (text, fg, bg) = match app.notice() {
        Some(notice) => {
            let (fg, bg) = match notice.level {
                NoticeLevel::Info => (Color::White, PL_B),
                NoticeLevel::Success => (Color::Black, ACCENT),
                NoticeLevel::Error => (Color::Black, ERROR),
            };
            (notice.message.clone(), fg, bg)
        }
        None => (
            "? help  : palette  / filter  C clusters  q quit".to_string(),
            MUTED,
            BG,
        ),
    };

    let mut spans = Vec::new();
    push_powerline_segment(
        &mut spans,
        format!(" {} ", mode_label(mode)),
        mode_fg,
        mode_bg,
        bg,
    );
    let width_hint = area.width.saturating_sub(12) as usize;
    spans.push(Span::styled(
        format!(" {} ", compact_text(&text, width_hint)),
        Style::default().fg(fg).bg(bg),
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)), area);
}

fn render_cluster_picker(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let block = panel_block("Clusters  (Enter connect, r reload, Esc close)".to_string(), ACCENT);
    if let Some(error) = app.cluster_picker_error() {
        let panel = Paragraph::new(Text::from(error.to_string()))
            .wrap(Wrap { trim: false })
            .block(block)
            .style(Style::default().fg(ERROR));
        frame.render_widget(panel, area);
        return;
    }
    if app.clusters().is_empty() {
        let message = if app.cluster_picker_loading() {
            "Loading clusters…"
        } else {
            "No clusters found"
        };
        frame.render_widget(
            Paragraph::new(message)
                .block(block)
                .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    }

    let current = app.focus().cluster.as_deref();
    let rows = app.clusters().iter().map(|cluster| {
        let marker = if current == Some(cluster.name.as_str()) {
            "●"
        } else {
            " "
        };
        let status = cluster
            .error
            .as_deref()
            .or(cluster.status.as_deref())
            .unwrap_or("-");
        let status_style = if cluster.error.is_some() {
            Style::default().fg(ERROR)
        } else {
            Style::default().fg(MUTED)
        };
        Row::new(vec![
            Cell::from(marker).style(Style::default().fg(ACCENT)),
            Cell::from(cluster.name.clone()).style(Style::default().fg(Color::White)),
            Cell::from(status.to_string()).style(status_style),
            Cell::from(cluster.version.clone().unwrap_or_default())
                .style(Style::default().fg(MUTED)),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Fill(2),
            Constraint::Fill(1),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(["", "NAME", "STATUS", "VERSION"]).style(
            Style::default()
                .fg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(block)
    .column_spacing(1)
    .row_highlight_style(Style::default().bg(SELECTED_BG).add_modifier(Modifier::BOLD))
    .highlight_symbol("󰜴 ");

    let mut state = TableState::default();
    state.select(Some(app.cluster_picker_selected()));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_palette(frame: &mut Frame, app: &App) {
    let area = centered_rect(50, 50, frame.area());
    frame.render_widget(Clear, area);

    let palette = app.palette();
    let title = match palette.domain() {
        PaletteDomain::Kinds => "Resource kinds  (prefix \"ns\" for namespaces)",
        PaletteDomain::Namespaces => "Namespaces",
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled(":", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("{}▏", palette.query()),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(""),
    ];

    let candidates = app.palette_candidates();
    if candidates.is_empty() {
        lines.push(Line::styled("No match", Style::default().fg(MUTED)));
    }
    let budget = area.height.saturating_sub(5) as usize;
    for (index, candidate) in candidates.iter().take(budget.max(1)).enumerate() {
        let style = if index == 0 {
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::styled(format!(" {} ", candidate.label()), style));
    }

    let modal = Paragraph::new(lines).block(panel_block(title.to_string(), ACCENT));
    frame.render_widget(modal, area);
}

fn render_viewer(frame: &mut Frame, app: &App) {
    let area = centered_rect(90, 85, frame.area());
    frame.render_widget(Clear, area);

    let viewer = app.viewer();
    let title = viewer.title().unwrap_or("Viewer").to_string();
    let (text, border) = match viewer {
        ModalState::Loading { .. } => {
            (Text::styled("Loading…", Style::default().fg(MUTED)), ACCENT)
        }
        ModalState::Loaded { title, content } => {
            if content.is_empty() {
                (Text::styled("(empty)", Style::default().fg(MUTED)), ACCENT)
            } else if title.starts_with("YAML") {
                (highlight_yaml_text(content), ACCENT)
            } else {
                (Text::from(content.clone()), ACCENT)
            }
        }
        ModalState::Failed { message, .. } => {
            (Text::styled(message.clone(), Style::default().fg(ERROR)), ERROR)
        }
        ModalState::Closed => (Text::default(), MUTED),
    };

    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .scroll((app.viewer_scroll(), 0))
        .block(panel_block(format!("{title}  (Esc close)"), border))
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_delete_confirm(frame: &mut Frame, app: &App) {
    let Some(pending) = app.pending_delete() else {
        return;
    };
    let area = centered_rect(60, 20, frame.area());
    frame.render_widget(Clear, area);
    let modal = Paragraph::new(vec![
        Line::from(pending.prompt.clone()),
        Line::from(""),
        Line::styled("y / Enter  delete      n / Esc  cancel", Style::default().fg(MUTED)),
    ])
    .wrap(Wrap { trim: false })
    .block(panel_block("Confirm delete".to_string(), WARN))
    .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_scale_prompt(frame: &mut Frame, app: &App) {
    let Some(prompt) = app.scale_prompt() else {
        return;
    };
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);
    let modal = Paragraph::new(vec![
        Line::from(format!("Replicas for {}:", prompt.target.display())),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(ACCENT)),
            Span::styled(format!("{}▏", prompt.input), Style::default().fg(Color::White)),
        ]),
        Line::from(""),
        Line::styled("Enter scale      Esc cancel", Style::default().fg(MUTED)),
    ])
    .block(panel_block("Scale".to_string(), ACCENT))
    .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_scale_down(frame: &mut Frame, app: &App) {
    let Some(confirm) = app.scale_down() else {
        return;
    };
    let area = centered_rect(60, 30, frame.area());
    frame.render_widget(Clear, area);

    let armed = confirm.is_armed();
    let submit = if armed {
        Span::styled(
            " Enter  scale down ",
            Style::default()
                .fg(Color::Black)
                .bg(ERROR)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(" Enter  scale down ", Style::default().fg(MUTED).bg(PANEL))
    };
    let modal = Paragraph::new(vec![
        Line::from(format!(
            "Scale every node group of {} to zero.",
            confirm.cluster_to_stop
        )),
        Line::from("Workloads stop until the cluster is scaled up again."),
        Line::from(""),
        Line::from(format!("Type {} to confirm:", confirm.cluster_to_stop)),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(WARN)),
            Span::styled(format!("{}▏", confirm.input), Style::default().fg(Color::White)),
        ]),
        Line::from(""),
        Line::from(vec![
            submit,
            Span::styled("   Esc cancel", Style::default().fg(MUTED)),
        ]),
    ])
    .wrap(Wrap { trim: false })
    .block(panel_block("Scale down cluster".to_string(), ERROR))
    .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(78, 72, frame.area());
    frame.render_widget(Clear, area);

    let focus = app.focus();
    let mut lines = vec![
        Line::from(format!(
            "fleetdeck help  mode:{}  namespace:{}  kind:{}",
            mode_label(app.mode()),
            focus.namespace,
            focus.kind.label
        )),
        Line::from(""),
    ];
    for line in help_lines(app) {
        lines.push(Line::from(line));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block("Help".to_string(), ACCENT))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn help_lines(app: &App) -> Vec<String> {
    let mut lines = vec![
        "Global: : palette  ? help  / filter  r refresh  Esc clear  q quit".to_string(),
        "Move: ↑/↓  PgUp/PgDn  Home/End".to_string(),
        "Cluster: C pick  U scale up  Z scale down  N refresh node status".to_string(),
        "Palette: type a kind, or \"ns <name>\" for a namespace".to_string(),
        String::new(),
    ];

    let shortcuts = app
        .catalog()
        .kinds()
        .iter()
        .map(|kind| format!("{} {}", kind.shortcut, kind.label))
        .collect::<Vec<_>>();
    lines.push(format!("Kinds: {}", shortcuts.join("  ")));

    let kind = app.focus().kind;
    let actions = kind
        .actions
        .iter()
        .map(|action| action.label())
        .collect::<Vec<_>>();
    lines.push(format!("{} rows: {}", kind.label, actions.join(", ")));
    lines.push(
        "Row keys: x/Enter describe  y yaml  l logs  L previous logs  R restart  S scale  \
         T trigger  Ctrl+D delete"
            .to_string(),
    );

    if let Some(state) = app.lifecycle()
        && !state.nodegroups.is_empty()
    {
        lines.push(String::new());
        let checked = state
            .last_checked
            .map(|at| at.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!("Nodegroups (checked {checked}):"));
        for group in &state.nodegroups {
            lines.push(format!(
                "  {}  {}  desired {}  min {}  max {}",
                group.name,
                group.status.as_deref().unwrap_or("-"),
                group.desired_size,
                group.min_size,
                group.max_size
            ));
        }
    }
    lines
}

fn mode_label(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Normal => "nrm",
        InputMode::Filter => "filter",
        InputMode::Palette => "palette",
        InputMode::ClusterPicker => "clusters",
        InputMode::ConfirmDelete => "confirm",
        InputMode::ScalePrompt => "scale",
        InputMode::ScaleDownConfirm => "stop",
        InputMode::Viewer => "view",
    }
}

fn panel_block(title: String, border: Color) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(PANEL))
}

fn highlight_yaml_text(input: &str) -> Text<'static> {
    let lines = input
        .lines()
        .map(highlight_yaml_line)
        .collect::<Vec<Line<'static>>>();
    Text::from(lines)
}

fn highlight_yaml_line(line: &str) -> Line<'static> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ' || **byte == b'\t')
        .count();
    let (indent, trimmed) = line.split_at(indent_len);

    let mut spans = vec![Span::raw(indent.to_string())];
    if trimmed.is_empty() {
        return Line::from(spans);
    }
    if trimmed.starts_with('#') {
        spans.push(Span::styled(trimmed.to_string(), Style::default().fg(MUTED)));
        return Line::from(spans);
    }
    if let Some(rest) = trimmed.strip_prefix("- ") {
        spans.push(Span::styled("- ", Style::default().fg(ACCENT)));
        spans.extend(highlight_yaml_content(rest));
        return Line::from(spans);
    }

    spans.extend(highlight_yaml_content(trimmed));
    Line::from(spans)
}

fn highlight_yaml_content(content: &str) -> Vec<Span<'static>> {
    let Some((key, value)) = split_yaml_key_value(content) else {
        return vec![Span::styled(
            content.to_string(),
            Style::default().fg(Color::White),
        )];
    };

    let mut spans = vec![
        Span::styled(key.to_string(), Style::default().fg(Color::Rgb(103, 232, 249))),
        Span::styled(":", Style::default().fg(MUTED)),
    ];
    if value.trim().is_empty() {
        return spans;
    }
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        value.trim_start().to_string(),
        Style::default().fg(yaml_value_color(value.trim())),
    ));
    spans
}

fn split_yaml_key_value(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    Some((key, value))
}

fn yaml_value_color(value: &str) -> Color {
    if value.starts_with('"') || value.starts_with('\'') {
        Color::Rgb(125, 211, 252)
    } else if matches!(value, "true" | "false" | "null" | "~") {
        WARN
    } else if value.parse::<f64>().is_ok() {
        Color::Rgb(251, 146, 60)
    } else {
        Color::Rgb(147, 197, 253)
    }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn push_powerline_segment_rtl(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn table_rows_visible(area: Rect) -> usize {
    area.height.saturating_sub(3).max(1) as usize
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn column_constraints(columns: &[ColumnDef]) -> Vec<Constraint> {
    if columns.is_empty() {
        return vec![Constraint::Percentage(100)];
    }
    columns
        .iter()
        .map(|column| match column.width {
            Some(width) => Constraint::Length(width),
            None => Constraint::Fill(1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{column_constraints, compact_text, render};
    use crate::app::{App, AppEvent};
    use crate::catalog::{Catalog, ColumnDef};
    use crate::input::Action;
    use crate::lifecycle::{NodegroupStatus, ScalingReport};
    use crate::model::{ClusterSummary, ResourceRow};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::layout::Constraint;
    use serde_json::json;

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|line| line.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_picker_before_connect() {
        let mut app = App::new(Catalog::validated().unwrap(), None, None);
        app.start();
        app.apply_event(AppEvent::Clusters(Ok(vec![ClusterSummary {
            name: "prod-eu".to_string(),
            ..ClusterSummary::default()
        }])));
        let text = screen(&mut app);
        assert!(text.contains("prod-eu"));
        assert!(text.contains("No cluster selected."));
    }

    #[test]
    fn renders_rows_and_delete_prompt() {
        let mut app = App::new(Catalog::validated().unwrap(), None, None);
        app.start();
        app.apply_event(AppEvent::Clusters(Ok(vec![ClusterSummary {
            name: "prod".to_string(),
            ..ClusterSummary::default()
        }])));
        app.apply_action(Action::SubmitInput);
        let command = app.apply_event(AppEvent::Connected {
            cluster: "prod".to_string(),
            result: Ok("ok".to_string()),
        });
        let crate::app::AppCommand::Batch(commands) = command else {
            panic!("expected batch");
        };
        let ticket = commands
            .into_iter()
            .find_map(|command| match command {
                crate::app::AppCommand::FetchList { ticket, .. } => Some(ticket),
                _ => None,
            })
            .unwrap();
        app.apply_event(AppEvent::Listed {
            ticket,
            result: Ok(vec![
                ResourceRow::from_json(json!({"namespace": "default", "name": "web-1"})).unwrap(),
            ]),
        });

        let text = screen(&mut app);
        assert!(text.contains("web-1"));

        app.apply_action(Action::Row(crate::dispatch::RowAction::Delete));
        let text = screen(&mut app);
        assert!(text.contains("Confirm delete"));
    }

    #[test]
    fn help_lists_nodegroup_sizes() {
        let mut app = App::new(Catalog::validated().unwrap(), Some("prod".to_string()), None);
        app.start();
        app.apply_event(AppEvent::Clusters(Ok(vec![ClusterSummary {
            name: "prod".to_string(),
            ..ClusterSummary::default()
        }])));
        app.apply_event(AppEvent::Connected {
            cluster: "prod".to_string(),
            result: Ok("ok".to_string()),
        });
        app.apply_event(AppEvent::ScalingStatus {
            cluster: "prod".to_string(),
            result: Ok(ScalingReport {
                cluster_name: "prod".to_string(),
                total_desired_nodes: 3,
                nodegroups: vec![NodegroupStatus {
                    name: "general".to_string(),
                    status: Some("ACTIVE".to_string()),
                    desired_size: 3,
                    min_size: 1,
                    max_size: 6,
                    error: None,
                }],
                ..ScalingReport::default()
            }),
        });
        app.apply_action(Action::ToggleHelp);

        let text = screen(&mut app);
        assert!(text.contains("Nodegroups (checked"));
        assert!(text.contains("general  ACTIVE  desired 3  min 1  max 6"));
    }

    #[test]
    fn fixed_and_flexible_columns() {
        let columns = [
            ColumnDef {
                field: "name",
                label: "NAME",
                width: None,
            },
            ColumnDef {
                field: "age",
                label: "AGE",
                width: Some(6),
            },
        ];
        assert_eq!(
            column_constraints(&columns),
            vec![Constraint::Fill(1), Constraint::Length(6)]
        );
    }

    #[test]
    fn compact_text_truncates_with_ellipsis() {
        assert_eq!(compact_text("deployments", 6), "deplo…");
        assert_eq!(compact_text("pods", 6), "pods");
    }
}
