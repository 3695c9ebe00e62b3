use once_cell::sync::Lazy;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use regex::Regex;

use crate::models::RewrittenTicket;
use crate::state::{AppState, Focus};
use crate::theme::Theme;
use crate::utils::{first_line, scroll_offset, truncate};

static TICKET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Z0-9]+-\d+\b").expect("ticket key pattern is valid"));

/// Which controls the screen offers in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub rewrite_enabled: bool,
    pub approve_enabled: bool,
    pub refresh_enabled: bool,
    pub select_all_enabled: bool,
    pub select_all_checked: bool,
    pub edit_enabled: bool,
}

pub fn controls(state: &AppState) -> Controls {
    Controls {
        // An empty selection still reaches the reducer so it can explain why.
        rewrite_enabled: !state.loading && state.selected_project.is_some(),
        approve_enabled: !state.loading && !state.rewritten_tickets.is_empty(),
        refresh_enabled: !state.loading && state.selected_project.is_some(),
        select_all_enabled: !state.tickets.is_empty(),
        select_all_checked: state.select_all,
        edit_enabled: !state.rewritten_tickets.is_empty(),
    }
}

pub fn render(f: &mut Frame, state: &AppState, theme: &Theme, backend_url: &str) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, rows[0], state, theme, backend_url);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(28),
            Constraint::Percentage(45),
            Constraint::Min(20),
        ])
        .split(rows[1]);
    render_projects(f, columns[0], state, theme);
    render_tickets(f, columns[1], state, theme);
    render_drafts(f, columns[2], state, theme);

    render_banner(f, rows[2], state, theme);
    render_footer(f, rows[3], state, theme);

    if state.editor.is_some() {
        render_editor(f, state, theme);
    }
}

fn pane_block<'a>(title: String, focused: bool, theme: &Theme) -> Block<'a> {
    let border = if focused {
        Style::default().fg(theme.focus_border).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.blurred_border)
    };
    Block::default().title(title).borders(Borders::ALL).border_style(border)
}

fn render_header(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme, backend_url: &str) {
    let mut spans = vec![
        Span::styled("Jira Ticket Rewriter", theme.popup_title),
        Span::styled(format!("  backend: {backend_url}"), Style::default().fg(theme.text_secondary)),
    ];
    if let Some(project) = &state.selected_project {
        spans.push(Span::styled(
            format!("  project: {} ({})", project.key, project.name),
            Style::default().fg(theme.text),
        ));
    }
    if let Some(at) = state.last_refreshed {
        spans.push(Span::styled(
            format!("  refreshed {}", at.format("%H:%M:%S")),
            Style::default().fg(theme.text_secondary),
        ));
    }
    if state.loading {
        spans.push(Span::styled("  Loading...", theme.loading));
    }
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_projects(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let selected_key = state.selected_project_key();
    let items: Vec<ListItem> = if state.projects.is_empty() {
        let text = if state.loading { "Loading projects..." } else { "No projects found" };
        vec![ListItem::new(Span::styled(text, Style::default().fg(theme.text_secondary)))]
    } else {
        state
            .projects
            .iter()
            .map(|project| {
                let active = Some(project.key.as_str()) == selected_key;
                let marker = if active { "● " } else { "  " };
                let style = if active {
                    Style::default().fg(theme.text_highlight).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(theme.text)
                };
                ListItem::new(vec![
                    Line::from(Span::styled(format!("{marker}{}", project.key), style)),
                    Line::from(Span::styled(
                        format!("  {}", truncate(&project.name, 22)),
                        Style::default().fg(theme.text_secondary).add_modifier(Modifier::ITALIC),
                    )),
                ])
            })
            .collect()
    };

    let mut list_state = ListState::default();
    if !state.projects.is_empty() {
        list_state.select(Some(state.project_cursor));
    }
    let list = List::new(items)
        .block(pane_block("Projects [1]".to_string(), state.focus == Focus::Projects, theme))
        .highlight_symbol("→");
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_tickets(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let controls = controls(state);
    let title = format!(
        "Tickets [2] {} select all ({}/{})",
        if controls.select_all_checked { "[x]" } else { "[ ]" },
        state.selected_tickets.len(),
        state.tickets.len()
    );
    let block = pane_block(title, state.focus == Focus::Tickets, theme);

    if state.tickets.is_empty() {
        let text = match (&state.selected_project, state.loading) {
            (None, _) => "Select a project to list its tickets",
            (Some(_), true) => "Loading tickets...",
            (Some(_), false) => "No tickets in this project",
        };
        let placeholder = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.text_secondary));
        f.render_widget(placeholder, area);
        return;
    }

    let width = area.width.saturating_sub(14) as usize;
    let items: Vec<ListItem> = state
        .tickets
        .iter()
        .map(|ticket| {
            let checked = state.is_selected(&ticket.key);
            let mut spans = vec![
                if checked {
                    Span::styled("[x] ", theme.checkbox_on)
                } else {
                    Span::styled("[ ] ", theme.checkbox_off)
                },
                Span::styled(ticket.key.clone(), theme.ticket_key),
            ];
            if ticket.is_rewritten {
                spans.push(Span::styled(" ✓", theme.rewritten_marker));
            }
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                truncate(&ticket.summary, width.saturating_sub(ticket.key.len())),
                Style::default().fg(theme.text),
            ));
            let mut lines = vec![Line::from(spans)];
            if let Some(description) = ticket.description.as_deref() {
                let preview = first_line(description);
                if !preview.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("    {}", truncate(preview, width)),
                        Style::default().fg(theme.text_secondary),
                    )));
                }
            }
            ListItem::new(lines)
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select(Some(state.ticket_cursor));
    let list = List::new(items)
        .block(block)
        .highlight_symbol("→")
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn highlight_keys(text: &str, base: Style, theme: &Theme) -> Line<'static> {
    let mut spans = Vec::new();
    let mut last = 0;
    for m in TICKET_REGEX.find_iter(text) {
        if m.start() > last {
            spans.push(Span::styled(text[last..m.start()].to_owned(), base));
        }
        spans.push(Span::styled(m.as_str().to_owned(), theme.ticket_key));
        last = m.end();
    }
    if last < text.len() {
        spans.push(Span::styled(text[last..].to_owned(), base));
    }
    Line::from(spans)
}

fn draft_lines(draft: &RewrittenTicket, current: bool, theme: &Theme) -> Vec<Line<'static>> {
    let marker = if current { "→ " } else { "  " };
    let body = Style::default().fg(theme.text);
    let mut lines = vec![
        Line::from(vec![
            Span::raw(marker),
            Span::styled(draft.key.clone(), theme.ticket_key),
            Span::raw(" "),
            Span::styled(draft.rewritten_title.clone(), theme.draft_title),
        ]),
        Line::from(Span::styled(
            format!("  was: {}", draft.original_title),
            Style::default().fg(theme.text_secondary).add_modifier(Modifier::ITALIC),
        )),
    ];
    for line in draft.rewritten_description.lines() {
        let mut rendered = highlight_keys(line, body, theme);
        rendered.spans.insert(0, Span::raw("  "));
        lines.push(rendered);
    }
    if !draft.acceptance_criteria.is_empty() {
        lines.push(Line::from(Span::styled(
            "  Acceptance criteria:",
            Style::default().fg(theme.text_secondary).add_modifier(Modifier::BOLD),
        )));
        for criterion in &draft.acceptance_criteria {
            lines.push(Line::from(Span::styled(
                format!("    • {}", crate::models::strip_numbering(criterion)),
                theme.criterion,
            )));
        }
    }
    lines.push(Line::from(""));
    lines
}

fn render_drafts(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let title = format!("Rewritten drafts [3] ({})", state.rewritten_tickets.len());
    let block = pane_block(title, state.focus == Focus::Drafts, theme);

    if state.rewritten_tickets.is_empty() {
        let placeholder = Paragraph::new("Select tickets and press r to rewrite them")
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(theme.text_secondary));
        f.render_widget(placeholder, area);
        return;
    }

    let mut lines = Vec::new();
    let mut cursor_line = 0;
    for (i, draft) in state.rewritten_tickets.iter().enumerate() {
        if i == state.draft_cursor {
            cursor_line = lines.len();
        }
        lines.extend(draft_lines(draft, i == state.draft_cursor, theme));
    }
    let height = area.height.saturating_sub(2) as usize;
    // The cursor draft is shown from its first line.
    let offset = cursor_line.min(lines.len().saturating_sub(height));
    let para = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset as u16, 0));
    f.render_widget(para, area);
}

fn render_banner(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let banner = if let Some(error) = &state.error {
        Paragraph::new(format!(" ✗ {error}  (Esc to dismiss)")).style(theme.banner_error)
    } else if let Some(success) = &state.success {
        Paragraph::new(format!(" ✓ {success}  (Esc to dismiss)")).style(theme.banner_success)
    } else {
        return;
    };
    f.render_widget(banner, area);
}

fn render_footer(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let controls = controls(state);
    let hint = |label: &'static str, enabled: bool| {
        Span::styled(
            label,
            if enabled { theme.footer } else { theme.footer_disabled },
        )
    };
    let sep = || Span::styled(" | ", theme.footer_disabled);
    let spans = vec![
        hint("Tab Focus", true),
        sep(),
        hint("↑/↓ j/k Move", true),
        sep(),
        hint("Enter Open", true),
        sep(),
        hint("Space Select", !state.tickets.is_empty()),
        sep(),
        hint("a Select all", controls.select_all_enabled),
        sep(),
        hint("r Rewrite", controls.rewrite_enabled),
        sep(),
        hint("e Edit", controls.edit_enabled),
        sep(),
        hint("y Copy", controls.edit_enabled),
        sep(),
        hint("u Approve", controls.approve_enabled),
        sep(),
        hint("f Refresh", controls.refresh_enabled),
        sep(),
        hint("L Reload", true),
        sep(),
        hint("q Quit", true),
    ];
    let footer = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(footer, area);
}

fn render_editor(f: &mut Frame, state: &AppState, theme: &Theme) {
    let Some(editor) = &state.editor else {
        return;
    };
    let area = centered_rect(70, 60, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .title(Span::styled(
            format!("Editing {} (Ctrl-S save, Esc cancel)", editor.key),
            theme.popup_title,
        ))
        .borders(Borders::ALL)
        .style(theme.popup_border);
    let mut text = editor.buffer.clone();
    text.push('▏');
    let inner_height = area.height.saturating_sub(2) as usize;
    let line_count = text.lines().count();
    let para = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(theme.popup_text)
        .scroll((scroll_offset(line_count.saturating_sub(1), inner_height, line_count) as u16, 0));
    f.render_widget(para, area);
}

/// Centers a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r)[1];
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical)[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, Ticket};
    use crate::state::Action;
    use ratatui::{Terminal, backend::TestBackend};

    fn state_with_tickets() -> AppState {
        let mut state = AppState::new();
        state.apply(Action::ProjectsLoaded(Ok(vec![Project {
            id: "1".into(),
            key: "P1".into(),
            name: "Proj1".into(),
            project_type_key: String::new(),
        }])));
        state.apply(Action::SelectProject("P1".into()));
        state.apply(Action::IssuesLoaded {
            project_key: "P1".into(),
            carry_rewritten: false,
            result: Ok(vec![Ticket {
                key: "P1-1".into(),
                summary: "Fix bug".into(),
                description: Some("Crashes on save".into()),
                is_rewritten: false,
            }]),
        });
        state
    }

    fn draft() -> RewrittenTicket {
        RewrittenTicket {
            key: "P1-1".into(),
            original_title: "Fix bug".into(),
            rewritten_title: "Resolve defect".into(),
            rewritten_description: "Relates to P1-7".into(),
            acceptance_criteria: vec!["1. AC1".into()],
            technical_context: None,
        }
    }

    fn draw(state: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();
        terminal
            .draw(|f| render(f, state, &Theme::default(), "http://localhost:8000"))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn controls_follow_loading_and_drafts() {
        let mut state = state_with_tickets();
        let idle = controls(&state);
        assert!(idle.rewrite_enabled);
        assert!(!idle.approve_enabled);
        assert!(idle.refresh_enabled);

        state.rewritten_tickets = vec![draft()];
        assert!(controls(&state).approve_enabled);

        state.loading = true;
        let busy = controls(&state);
        assert!(!busy.rewrite_enabled);
        assert!(!busy.approve_enabled);
        assert!(!busy.refresh_enabled);
    }

    #[test]
    fn renders_projects_and_ticket_checkboxes() {
        let mut state = state_with_tickets();
        state.toggle_ticket("P1-1");
        let screen = draw(&state);
        assert!(screen.contains("Proj1"));
        assert!(screen.contains("[x] P1-1"));
        assert!(screen.contains("Fix bug"));
        assert!(screen.contains("(1/1)"));
    }

    #[test]
    fn renders_drafts_and_rewritten_marker() {
        let mut state = state_with_tickets();
        state.tickets[0].is_rewritten = true;
        state.rewritten_tickets = vec![draft()];
        let screen = draw(&state);
        assert!(screen.contains("P1-1 ✓"));
        assert!(screen.contains("Resolve defect"));
        assert!(screen.contains("• AC1"));
    }

    #[test]
    fn renders_banner_and_loading() {
        let mut state = state_with_tickets();
        state.loading = true;
        state.error = Some("Failed to fetch issues".into());
        let screen = draw(&state);
        assert!(screen.contains("Loading..."));
        assert!(screen.contains("Failed to fetch issues"));
    }

    #[test]
    fn renders_editor_popup() {
        let mut state = state_with_tickets();
        state.rewritten_tickets = vec![draft()];
        state.apply(Action::BeginEdit);
        let screen = draw(&state);
        assert!(screen.contains("Editing P1-1"));
    }

    #[test]
    fn ticket_keys_are_highlighted_in_descriptions() {
        let theme = Theme::default();
        let line = highlight_keys("see P1-7 and ABC-12.", Style::default(), &theme);
        let keys: Vec<&str> = line
            .spans
            .iter()
            .filter(|s| s.style == theme.ticket_key)
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(keys, vec!["P1-7", "ABC-12"]);
    }
}
