use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::state::{Action, AppState, Focus};
use crate::ui::controls;

#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    Quit,
    Dispatch(Action),
    Ignore,
}

pub fn handle_key(key: KeyEvent, state: &AppState) -> KeyOutcome {
    if key.kind == KeyEventKind::Release {
        return KeyOutcome::Ignore;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }
    if state.editor.is_some() {
        return handle_editor_key(key.code, ctrl);
    }

    let controls = controls(state);
    let action = match key.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Tab | KeyCode::Char('l') => Action::FocusNext,
        KeyCode::BackTab | KeyCode::Char('h') => Action::FocusPrevious,
        KeyCode::Up | KeyCode::Char('k') => Action::MoveCursor(-1),
        KeyCode::Down | KeyCode::Char('j') => Action::MoveCursor(1),
        KeyCode::PageUp => Action::MoveCursor(-10),
        KeyCode::PageDown => Action::MoveCursor(10),
        KeyCode::Enter => match state.focus {
            Focus::Projects => match state.projects.get(state.project_cursor) {
                Some(project) => Action::SelectProject(project.key.clone()),
                None => return KeyOutcome::Ignore,
            },
            Focus::Tickets => return toggle_under_cursor(state),
            Focus::Drafts if controls.edit_enabled => Action::BeginEdit,
            Focus::Drafts => return KeyOutcome::Ignore,
        },
        KeyCode::Char(' ') if state.focus == Focus::Tickets => return toggle_under_cursor(state),
        KeyCode::Char('a') if controls.select_all_enabled => Action::ToggleSelectAll,
        KeyCode::Char('r') if controls.rewrite_enabled => Action::RequestRewrite,
        KeyCode::Char('e') if controls.edit_enabled => Action::BeginEdit,
        KeyCode::Char('y') if controls.edit_enabled => Action::CopyDraft,
        KeyCode::Char('u') if controls.approve_enabled => Action::ApproveUpdate,
        KeyCode::Char('f') | KeyCode::F(5) if controls.refresh_enabled => Action::RefreshIssues,
        KeyCode::Char('L') => Action::Reload,
        KeyCode::Char('1') => focus_action(state.focus, Focus::Projects),
        KeyCode::Char('2') => focus_action(state.focus, Focus::Tickets),
        KeyCode::Char('3') => focus_action(state.focus, Focus::Drafts),
        KeyCode::Esc => Action::DismissBanner,
        _ => return KeyOutcome::Ignore,
    };
    KeyOutcome::Dispatch(action)
}

fn handle_editor_key(code: KeyCode, ctrl: bool) -> KeyOutcome {
    let action = match code {
        KeyCode::Char('s') if ctrl => Action::CommitEdit,
        KeyCode::Esc => Action::CancelEdit,
        KeyCode::Enter => Action::EditorInput('\n'),
        KeyCode::Tab => Action::EditorInput('\t'),
        KeyCode::Backspace => Action::EditorBackspace,
        KeyCode::Char(c) if !ctrl => Action::EditorInput(c),
        _ => return KeyOutcome::Ignore,
    };
    KeyOutcome::Dispatch(action)
}

fn toggle_under_cursor(state: &AppState) -> KeyOutcome {
    match state.tickets.get(state.ticket_cursor) {
        Some(ticket) => KeyOutcome::Dispatch(Action::ToggleTicket(ticket.key.clone())),
        None => KeyOutcome::Ignore,
    }
}

/// Number keys jump straight to a pane by cycling focus.
fn focus_action(current: Focus, target: Focus) -> Action {
    if current.next() == target {
        Action::FocusNext
    } else if current.previous() == target {
        Action::FocusPrevious
    } else {
        Action::MoveCursor(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, Ticket};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state() -> AppState {
        let mut state = AppState::new();
        state.apply(Action::ProjectsLoaded(Ok(vec![Project {
            id: "1".into(),
            key: "P1".into(),
            name: "Proj1".into(),
            project_type_key: String::new(),
        }])));
        state
    }

    fn with_tickets() -> AppState {
        let mut state = state();
        state.apply(Action::SelectProject("P1".into()));
        state.apply(Action::IssuesLoaded {
            project_key: "P1".into(),
            carry_rewritten: false,
            result: Ok(vec![Ticket {
                key: "P1-1".into(),
                summary: "Fix bug".into(),
                description: None,
                is_rewritten: false,
            }]),
        });
        state.focus = Focus::Tickets;
        state
    }

    #[test]
    fn enter_on_projects_selects_project() {
        assert_eq!(
            handle_key(press(KeyCode::Enter), &state()),
            KeyOutcome::Dispatch(Action::SelectProject("P1".into()))
        );
    }

    #[test]
    fn space_toggles_ticket_under_cursor() {
        assert_eq!(
            handle_key(press(KeyCode::Char(' ')), &with_tickets()),
            KeyOutcome::Dispatch(Action::ToggleTicket("P1-1".into()))
        );
    }

    #[test]
    fn rewrite_with_empty_selection_still_dispatches() {
        assert_eq!(
            handle_key(press(KeyCode::Char('r')), &with_tickets()),
            KeyOutcome::Dispatch(Action::RequestRewrite)
        );
    }

    #[test]
    fn loading_gates_rewrite_and_refresh() {
        let mut state = with_tickets();
        state.loading = true;
        assert_eq!(handle_key(press(KeyCode::Char('r')), &state), KeyOutcome::Ignore);
        assert_eq!(handle_key(press(KeyCode::Char('f')), &state), KeyOutcome::Ignore);
        assert_eq!(handle_key(press(KeyCode::Char('u')), &state), KeyOutcome::Ignore);
    }

    #[test]
    fn editor_captures_typing() {
        let mut state = with_tickets();
        state.editor = Some(crate::state::DraftEditor {
            key: "P1-1".into(),
            buffer: String::new(),
        });
        assert_eq!(
            handle_key(press(KeyCode::Char('q')), &state),
            KeyOutcome::Dispatch(Action::EditorInput('q'))
        );
        assert_eq!(
            handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL), &state),
            KeyOutcome::Dispatch(Action::CommitEdit)
        );
        assert_eq!(
            handle_key(press(KeyCode::Esc), &state),
            KeyOutcome::Dispatch(Action::CancelEdit)
        );
    }

    #[test]
    fn quit_keys() {
        assert_eq!(handle_key(press(KeyCode::Char('q')), &state()), KeyOutcome::Quit);
        assert_eq!(
            handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), &state()),
            KeyOutcome::Quit
        );
    }

    #[test]
    fn escape_dismisses_banner() {
        assert_eq!(
            handle_key(press(KeyCode::Esc), &state()),
            KeyOutcome::Dispatch(Action::DismissBanner)
        );
    }
}
