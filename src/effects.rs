use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::network::BackendApi;
use crate::state::{Action, Effect};

/// Executes reducer effects and reports completions back as actions.
pub struct EffectRunner {
    backend: Arc<dyn BackendApi>,
    actions: UnboundedSender<Action>,
    handle: Handle,
    banner: BannerTimer,
}

impl EffectRunner {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        actions: UnboundedSender<Action>,
        handle: Handle,
        banner_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            actions,
            handle,
            banner: BannerTimer::new(banner_timeout),
        }
    }

    pub fn run(&mut self, effect: Effect) {
        match effect {
            Effect::FetchProjects => {
                let backend = self.backend.clone();
                self.spawn(async move {
                    let result = backend.list_projects().await.map_err(|e| e.to_string());
                    Action::ProjectsLoaded(result)
                });
            }
            Effect::FetchIssues {
                project_key,
                carry_rewritten,
            } => {
                let backend = self.backend.clone();
                self.spawn(async move {
                    let result = backend
                        .list_issues(&project_key)
                        .await
                        .map_err(|e| e.to_string());
                    Action::IssuesLoaded {
                        project_key,
                        carry_rewritten,
                        result,
                    }
                });
            }
            Effect::RewriteTickets {
                project_key,
                tickets,
            } => {
                let backend = self.backend.clone();
                self.spawn(async move {
                    let result = backend
                        .rewrite_tickets(&tickets)
                        .await
                        .map_err(|e| e.to_string());
                    Action::RewriteCompleted {
                        project_key,
                        result,
                    }
                });
            }
            Effect::UpdateTickets { tickets } => {
                let backend = self.backend.clone();
                self.spawn(async move {
                    let result = backend
                        .update_tickets(&tickets)
                        .await
                        .map_err(|e| e.to_string());
                    Action::UpdateCompleted(result)
                });
            }
            Effect::ScheduleBannerDismiss { generation } => {
                if self.banner.is_pending() {
                    debug!(generation, "replacing pending banner dismissal");
                }
                self.banner
                    .schedule(&self.handle, generation, self.actions.clone());
            }
            Effect::CancelBannerDismiss => self.banner.cancel(),
            Effect::CopyToClipboard { key, text } => {
                let result = copy_to_clipboard(text);
                if self
                    .actions
                    .send(Action::CopyCompleted { key, result })
                    .is_err()
                {
                    debug!("action channel closed; dropping clipboard result");
                }
            }
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = Action> + Send + 'static,
    {
        let actions = self.actions.clone();
        self.handle.spawn(async move {
            let action = task.await;
            if actions.send(action).is_err() {
                debug!("action channel closed; dropping completion");
            }
        });
    }
}

fn copy_to_clipboard(text: String) -> Result<(), String> {
    let mut clipboard = arboard::Clipboard::new().map_err(|e| e.to_string())?;
    clipboard.set_text(text).map_err(|e| {
        warn!(error = %e, "clipboard write failed");
        e.to_string()
    })
}

/// At most one pending dismissal; scheduling replaces the previous one.
pub struct BannerTimer {
    timeout: Duration,
    pending: Option<CancellationToken>,
}

impl BannerTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: None,
        }
    }

    pub fn schedule(&mut self, handle: &Handle, generation: u64, actions: UnboundedSender<Action>) {
        self.cancel();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let timeout = self.timeout;
        handle.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    let _ = actions.send(Action::BannerExpired { generation });
                }
            }
        });
        self.pending = Some(token);
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}

impl Drop for BannerTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    use crate::error::{ApiError, ApiResult};
    use crate::models::{Project, RewrittenTicket, Ticket, UpdateOutcome};

    #[derive(Default)]
    struct FakeBackend {
        issue_calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BackendApi for FakeBackend {
        async fn list_projects(&self) -> ApiResult<Vec<Project>> {
            Ok(vec![Project {
                id: "1".into(),
                key: "P1".into(),
                name: "Proj1".into(),
                project_type_key: String::new(),
            }])
        }

        async fn list_issues(&self, project_key: &str) -> ApiResult<Vec<Ticket>> {
            self.issue_calls
                .lock()
                .unwrap()
                .push(project_key.to_string());
            Ok(Vec::new())
        }

        async fn rewrite_tickets(&self, _tickets: &[Ticket]) -> ApiResult<Vec<RewrittenTicket>> {
            Err(ApiError::Malformed("not a list".into()))
        }

        async fn update_tickets(&self, _tickets: &[RewrittenTicket]) -> ApiResult<UpdateOutcome> {
            Ok(UpdateOutcome {
                success: true,
                updated_tickets: Vec::new(),
                failed_tickets: Vec::new(),
            })
        }
    }

    fn runner(backend: Arc<FakeBackend>) -> (EffectRunner, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = EffectRunner::new(backend, tx, Handle::current(), Duration::from_secs(5));
        (runner, rx)
    }

    #[tokio::test]
    async fn fetch_projects_reports_back() {
        let (mut runner, mut rx) = runner(Arc::new(FakeBackend::default()));
        runner.run(Effect::FetchProjects);
        match rx.recv().await {
            Some(Action::ProjectsLoaded(Ok(projects))) => assert_eq!(projects[0].key, "P1"),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_issues_keeps_request_context() {
        let backend = Arc::new(FakeBackend::default());
        let (mut runner, mut rx) = runner(backend.clone());
        runner.run(Effect::FetchIssues {
            project_key: "P1".into(),
            carry_rewritten: true,
        });
        match rx.recv().await {
            Some(Action::IssuesLoaded {
                project_key,
                carry_rewritten,
                result: Ok(_),
            }) => {
                assert_eq!(project_key, "P1");
                assert!(carry_rewritten);
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert_eq!(*backend.issue_calls.lock().unwrap(), vec!["P1".to_string()]);
    }

    #[tokio::test]
    async fn backend_errors_become_messages() {
        let (mut runner, mut rx) = runner(Arc::new(FakeBackend::default()));
        runner.run(Effect::RewriteTickets {
            project_key: Some("P1".into()),
            tickets: Vec::new(),
        });
        match rx.recv().await {
            Some(Action::RewriteCompleted {
                result: Err(message),
                ..
            }) => assert!(message.contains("malformed")),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn banner_expires_after_timeout() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = BannerTimer::new(Duration::from_secs(5));
        timer.schedule(&Handle::current(), 1, tx);

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(rx.try_recv().ok(), Some(Action::BannerExpired { generation: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_pending_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = BannerTimer::new(Duration::from_secs(5));
        timer.schedule(&Handle::current(), 1, tx.clone());
        tokio::time::sleep(Duration::from_secs(3)).await;
        timer.schedule(&Handle::current(), 2, tx);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(rx.try_recv().ok(), Some(Action::BannerExpired { generation: 2 }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = BannerTimer::new(Duration::from_secs(5));
        timer.schedule(&Handle::current(), 1, tx);
        timer.cancel();
        assert!(!timer.is_pending());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
