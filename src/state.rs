//! Screen state and the reducer that drives it.
//!
//! Every user intent and every backend completion is an [`Action`]. Applying
//! an action mutates [`AppState`] and returns the [`Effect`]s the runner has
//! to execute; the reducer itself never performs I/O.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::models::{Project, RewrittenTicket, Ticket, UpdateOutcome};

pub const NO_SELECTION_MESSAGE: &str = "Please select at least one ticket to rewrite";
pub const NO_DRAFTS_MESSAGE: &str = "There are no rewritten tickets to update";
pub const UPDATE_FAILED_MESSAGE: &str = "Failed to update tickets in Jira. Please try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Projects,
    Tickets,
    Drafts,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Projects => Focus::Tickets,
            Focus::Tickets => Focus::Drafts,
            Focus::Drafts => Focus::Projects,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Focus::Projects => Focus::Drafts,
            Focus::Tickets => Focus::Projects,
            Focus::Drafts => Focus::Tickets,
        }
    }
}

/// Modal text editor over one draft's description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftEditor {
    pub key: String,
    pub buffer: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Init,
    Reload,
    ProjectsLoaded(Result<Vec<Project>, String>),
    SelectProject(String),
    RefreshIssues,
    IssuesLoaded {
        project_key: String,
        carry_rewritten: bool,
        result: Result<Vec<Ticket>, String>,
    },
    ToggleTicket(String),
    ToggleSelectAll,
    RequestRewrite,
    RewriteCompleted {
        project_key: Option<String>,
        result: Result<Vec<RewrittenTicket>, String>,
    },
    EditDescription {
        key: String,
        text: String,
    },
    ApproveUpdate,
    UpdateCompleted(Result<UpdateOutcome, String>),
    DismissBanner,
    BannerExpired {
        generation: u64,
    },
    CopyDraft,
    CopyCompleted {
        key: String,
        result: Result<(), String>,
    },
    FocusNext,
    FocusPrevious,
    MoveCursor(isize),
    BeginEdit,
    EditorInput(char),
    EditorBackspace,
    CommitEdit,
    CancelEdit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    FetchProjects,
    FetchIssues {
        project_key: String,
        carry_rewritten: bool,
    },
    RewriteTickets {
        project_key: Option<String>,
        tickets: Vec<Ticket>,
    },
    UpdateTickets {
        tickets: Vec<RewrittenTicket>,
    },
    ScheduleBannerDismiss {
        generation: u64,
    },
    CancelBannerDismiss,
    CopyToClipboard {
        key: String,
        text: String,
    },
}

#[derive(Debug)]
pub struct AppState {
    pub projects: Vec<Project>,
    pub selected_project: Option<Project>,
    pub tickets: Vec<Ticket>,
    pub selected_tickets: Vec<Ticket>,
    pub rewritten_tickets: Vec<RewrittenTicket>,
    pub loading: bool,
    pub error: Option<String>,
    pub success: Option<String>,
    pub select_all: bool,
    pub banner_generation: u64,
    pub focus: Focus,
    pub project_cursor: usize,
    pub ticket_cursor: usize,
    pub draft_cursor: usize,
    pub editor: Option<DraftEditor>,
    pub last_refreshed: Option<DateTime<Local>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            projects: Vec::new(),
            selected_project: None,
            tickets: Vec::new(),
            selected_tickets: Vec::new(),
            rewritten_tickets: Vec::new(),
            loading: false,
            error: None,
            success: None,
            select_all: false,
            banner_generation: 0,
            focus: Focus::Projects,
            project_cursor: 0,
            ticket_cursor: 0,
            draft_cursor: 0,
            editor: None,
            last_refreshed: None,
        }
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected_tickets.iter().any(|t| t.key == key)
    }

    pub fn selected_project_key(&self) -> Option<&str> {
        self.selected_project.as_ref().map(|p| p.key.as_str())
    }

    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::Init => {
                self.loading = true;
                self.error = None;
                vec![Effect::FetchProjects]
            }
            Action::Reload => {
                // The generation survives so a pending expiry cannot clear a
                // banner raised after the reset.
                let generation = self.banner_generation;
                *self = Self::new();
                self.banner_generation = generation;
                let mut effects = vec![Effect::CancelBannerDismiss];
                effects.extend(self.apply(Action::Init));
                effects
            }
            Action::ProjectsLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(projects) => {
                        info!(count = projects.len(), "projects loaded");
                        self.projects = projects;
                        self.project_cursor = 0;
                        Vec::new()
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to fetch projects");
                        self.set_error("Failed to fetch projects".to_string())
                    }
                }
            }
            Action::SelectProject(key) => self.select_project(&key),
            Action::RefreshIssues => match self.selected_project_key() {
                Some(key) => {
                    let project_key = key.to_string();
                    self.loading = true;
                    self.error = None;
                    vec![Effect::FetchIssues {
                        project_key,
                        carry_rewritten: true,
                    }]
                }
                None => Vec::new(),
            },
            Action::IssuesLoaded {
                project_key,
                carry_rewritten,
                result,
            } => self.issues_loaded(&project_key, carry_rewritten, result),
            Action::ToggleTicket(key) => {
                self.toggle_ticket(&key);
                Vec::new()
            }
            Action::ToggleSelectAll => {
                self.toggle_select_all();
                Vec::new()
            }
            Action::RequestRewrite => self.request_rewrite(),
            Action::RewriteCompleted {
                project_key,
                result,
            } => self.rewrite_completed(project_key, result),
            Action::EditDescription { key, text } => {
                self.edit_description(&key, text);
                Vec::new()
            }
            Action::ApproveUpdate => self.approve_update(),
            Action::UpdateCompleted(result) => self.update_completed(result),
            Action::DismissBanner => {
                self.error = None;
                self.success = None;
                vec![Effect::CancelBannerDismiss]
            }
            Action::BannerExpired { generation } => {
                if generation == self.banner_generation {
                    self.error = None;
                    self.success = None;
                }
                Vec::new()
            }
            Action::CopyDraft => match self.rewritten_tickets.get(self.draft_cursor) {
                Some(draft) => vec![Effect::CopyToClipboard {
                    key: draft.key.clone(),
                    text: draft.to_clipboard_text(),
                }],
                None => Vec::new(),
            },
            Action::CopyCompleted { key, result } => match result {
                Ok(()) => self.set_success(format!("Copied draft for {key} to the clipboard")),
                Err(err) => self.set_error(format!("Could not copy to the clipboard: {err}")),
            },
            Action::FocusNext => {
                self.focus = self.focus.next();
                Vec::new()
            }
            Action::FocusPrevious => {
                self.focus = self.focus.previous();
                Vec::new()
            }
            Action::MoveCursor(delta) => {
                let (cursor, len) = match self.focus {
                    Focus::Projects => (&mut self.project_cursor, self.projects.len()),
                    Focus::Tickets => (&mut self.ticket_cursor, self.tickets.len()),
                    Focus::Drafts => (&mut self.draft_cursor, self.rewritten_tickets.len()),
                };
                *cursor = move_cursor(*cursor, delta, len);
                Vec::new()
            }
            Action::BeginEdit => {
                if let Some(draft) = self.rewritten_tickets.get(self.draft_cursor) {
                    self.editor = Some(DraftEditor {
                        key: draft.key.clone(),
                        buffer: draft.rewritten_description.clone(),
                    });
                }
                Vec::new()
            }
            Action::EditorInput(c) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.buffer.push(c);
                }
                Vec::new()
            }
            Action::EditorBackspace => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.buffer.pop();
                }
                Vec::new()
            }
            Action::CommitEdit => match self.editor.take() {
                Some(DraftEditor { key, buffer }) => {
                    self.apply(Action::EditDescription { key, text: buffer })
                }
                None => Vec::new(),
            },
            Action::CancelEdit => {
                self.editor = None;
                Vec::new()
            }
        }
    }

    fn select_project(&mut self, key: &str) -> Vec<Effect> {
        let Some(project) = self.projects.iter().find(|p| p.key == key).cloned() else {
            warn!(project = key, "selected project is not in the project list");
            return Vec::new();
        };
        self.selected_project = Some(project);
        self.tickets.clear();
        self.selected_tickets.clear();
        self.rewritten_tickets.clear();
        self.select_all = false;
        self.ticket_cursor = 0;
        self.draft_cursor = 0;
        self.editor = None;
        self.loading = true;
        self.error = None;
        vec![Effect::FetchIssues {
            project_key: key.to_string(),
            carry_rewritten: false,
        }]
    }

    fn issues_loaded(
        &mut self,
        project_key: &str,
        carry_rewritten: bool,
        result: Result<Vec<Ticket>, String>,
    ) -> Vec<Effect> {
        if self.selected_project_key() != Some(project_key) {
            info!(project = project_key, "discarding issues for a project no longer selected");
            return Vec::new();
        }
        self.loading = false;
        match result {
            Ok(fetched) => {
                let previous: HashMap<&str, bool> = self
                    .tickets
                    .iter()
                    .map(|t| (t.key.as_str(), t.is_rewritten))
                    .collect();
                let tickets = fetched
                    .into_iter()
                    .map(|mut ticket| {
                        ticket.is_rewritten = carry_rewritten
                            && previous.get(ticket.key.as_str()).copied().unwrap_or(false);
                        ticket
                    })
                    .collect::<Vec<_>>();
                info!(project = project_key, count = tickets.len(), "issues loaded");
                self.tickets = tickets;
                self.ticket_cursor = self.ticket_cursor.min(self.tickets.len().saturating_sub(1));
                self.last_refreshed = Some(Local::now());
                Vec::new()
            }
            Err(err) => {
                warn!(project = project_key, error = %err, "failed to fetch issues");
                self.set_error("Failed to fetch issues".to_string())
            }
        }
    }

    pub fn toggle_ticket(&mut self, key: &str) {
        if let Some(pos) = self.selected_tickets.iter().position(|t| t.key == key) {
            self.selected_tickets.remove(pos);
        } else if let Some(ticket) = self.tickets.iter().find(|t| t.key == key) {
            self.selected_tickets.push(ticket.clone());
        } else {
            return;
        }
        self.select_all =
            !self.tickets.is_empty() && self.selected_tickets.len() == self.tickets.len();
    }

    pub fn toggle_select_all(&mut self) {
        if self.select_all {
            self.selected_tickets.clear();
        } else {
            self.selected_tickets = self.tickets.clone();
        }
        self.select_all = !self.select_all;
    }

    fn request_rewrite(&mut self) -> Vec<Effect> {
        if self.selected_tickets.is_empty() {
            return self.set_error(NO_SELECTION_MESSAGE.to_string());
        }
        self.loading = true;
        self.error = None;
        info!(count = self.selected_tickets.len(), "requesting rewrite");
        vec![Effect::RewriteTickets {
            project_key: self.selected_project_key().map(str::to_string),
            tickets: self.selected_tickets.clone(),
        }]
    }

    fn rewrite_completed(
        &mut self,
        project_key: Option<String>,
        result: Result<Vec<RewrittenTicket>, String>,
    ) -> Vec<Effect> {
        if project_key.as_deref() != self.selected_project_key() {
            info!("discarding rewrite issued for a project no longer selected");
            return Vec::new();
        }
        self.loading = false;
        match result {
            Ok(rewritten) => {
                let selected: HashSet<&str> =
                    self.selected_tickets.iter().map(|t| t.key.as_str()).collect();
                for ticket in self.tickets.iter_mut() {
                    if selected.contains(ticket.key.as_str()) {
                        ticket.is_rewritten = true;
                    }
                }
                let count = rewritten.len();
                self.rewritten_tickets = rewritten;
                self.draft_cursor = 0;
                self.set_success(format!("Successfully rewrote {count} ticket(s)"))
            }
            Err(err) => {
                warn!(error = %err, "rewrite failed");
                self.set_error("Failed to rewrite tickets. Please try again.".to_string())
            }
        }
    }

    pub fn edit_description(&mut self, key: &str, text: String) {
        if let Some(draft) = self.rewritten_tickets.iter_mut().find(|d| d.key == key) {
            draft.rewritten_description = text;
        }
    }

    fn approve_update(&mut self) -> Vec<Effect> {
        if self.rewritten_tickets.is_empty() {
            return self.set_error(NO_DRAFTS_MESSAGE.to_string());
        }
        self.loading = true;
        self.error = None;
        info!(count = self.rewritten_tickets.len(), "pushing rewritten tickets to Jira");
        vec![Effect::UpdateTickets {
            tickets: self.rewritten_tickets.clone(),
        }]
    }

    fn update_completed(&mut self, result: Result<UpdateOutcome, String>) -> Vec<Effect> {
        self.loading = false;
        match result {
            Ok(outcome) if outcome.success => {
                log_failed_tickets(&outcome);
                self.rewritten_tickets.clear();
                self.selected_tickets.clear();
                self.select_all = false;
                self.draft_cursor = 0;
                let mut message = if outcome.updated_tickets.is_empty() {
                    "Tickets updated in Jira".to_string()
                } else {
                    format!("Updated {} in Jira", outcome.updated_tickets.join(", "))
                };
                if !outcome.failed_tickets.is_empty() {
                    message.push_str(&format!("; failed: {}", outcome.failed_keys()));
                }
                let mut effects = self.set_success(message);
                if let Some(project_key) = self.selected_project_key().map(str::to_string) {
                    self.loading = true;
                    effects.push(Effect::FetchIssues {
                        project_key,
                        carry_rewritten: true,
                    });
                }
                effects
            }
            Ok(outcome) => {
                log_failed_tickets(&outcome);
                if outcome.failed_tickets.is_empty() {
                    self.set_error(UPDATE_FAILED_MESSAGE.to_string())
                } else {
                    self.set_error(format!("Failed to update tickets: {}", outcome.failed_keys()))
                }
            }
            Err(err) => {
                warn!(error = %err, "update failed");
                self.set_error(UPDATE_FAILED_MESSAGE.to_string())
            }
        }
    }

    fn set_error(&mut self, message: String) -> Vec<Effect> {
        self.error = Some(message);
        self.success = None;
        self.schedule_banner_dismiss()
    }

    fn set_success(&mut self, message: String) -> Vec<Effect> {
        self.success = Some(message);
        self.error = None;
        self.schedule_banner_dismiss()
    }

    fn schedule_banner_dismiss(&mut self) -> Vec<Effect> {
        self.banner_generation += 1;
        vec![Effect::ScheduleBannerDismiss {
            generation: self.banner_generation,
        }]
    }
}

fn log_failed_tickets(outcome: &UpdateOutcome) {
    for failed in &outcome.failed_tickets {
        warn!(
            key = %failed.key,
            error = failed.error.as_deref().unwrap_or("unknown"),
            "ticket failed to update"
        );
    }
}

fn move_cursor(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    cursor.saturating_add_signed(delta).min(len - 1)
}
