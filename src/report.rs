//! Report records and the generation pipeline

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    context::RepoContextService,
    error::{BriefError, Result},
    llm::{LlmProvider, Model},
    notify::{ReportNotifier, ReportSubscription},
    prompt::{compile_report_prompt, compile_template},
    store::RepoTreeStore,
    types::{Report, ReportStatus, RepoTreeNode, UserContext, Visibility},
    url::parse_repo_url,
    visualize::calculate_language_breakdown,
};

/// In-memory report records, scoped by user
#[derive(Default)]
pub struct ReportStore {
    reports: RwLock<Vec<Report>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending report
    pub async fn create(
        &self,
        user_id: &str,
        repo_url: &str,
        repo_tree_id: Option<String>,
        model: Option<Model>,
    ) -> Report {
        let report = pending_report(user_id, repo_url, repo_tree_id, model);
        self.reports.write().await.push(report.clone());
        report
    }

    pub async fn get(&self, id: &str, user_id: &str) -> Result<Report> {
        self.reports
            .read()
            .await
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned()
            .ok_or_else(|| BriefError::ReportNotFound { id: id.to_string() })
    }

    /// All reports of `user_id`, newest first
    pub async fn list_for_user(&self, user_id: &str) -> Vec<Report> {
        self.reports
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn find_by_repo_url(&self, user_id: &str, repo_url: &str) -> Option<Report> {
        self.reports
            .read()
            .await
            .iter()
            .rev()
            .find(|r| r.user_id == user_id && r.repo_url == repo_url)
            .cloned()
    }

    /// Existing report for this user and repository, or a new one linked to
    /// the cached tree
    ///
    /// Fails with `TreeNotCached` when the repository tree was never persisted.
    /// The lookup and the insert happen under one write lock, so concurrent
    /// upserts for the same user and repository yield one report.
    pub async fn upsert(&self, user_id: &str, repo_url: &str, trees: &RepoTreeStore) -> Result<Report> {
        let mut reports = self.reports.write().await;
        if let Some(existing) = reports
            .iter()
            .rev()
            .find(|r| r.user_id == user_id && r.repo_url == repo_url)
        {
            return Ok(existing.clone());
        }

        let cached = trees
            .get_cached(repo_url)
            .await?
            .ok_or_else(|| BriefError::TreeNotCached {
                repo_url: repo_url.to_string(),
            })?;
        let report = pending_report(user_id, repo_url, Some(cached.id), None);
        reports.push(report.clone());
        Ok(report)
    }

    pub async fn update_content(&self, id: &str, user_id: &str, content: &str) -> Result<Report> {
        self.modify(id, user_id, |report| report.content = Some(content.to_string()))
            .await
    }

    pub async fn set_status(&self, id: &str, user_id: &str, status: ReportStatus) -> Result<Report> {
        self.modify(id, user_id, |report| report.status = status).await
    }

    async fn modify<F>(&self, id: &str, user_id: &str, change: F) -> Result<Report>
    where
        F: FnOnce(&mut Report),
    {
        let mut reports = self.reports.write().await;
        let report = reports
            .iter_mut()
            .find(|r| r.id == id && r.user_id == user_id)
            .ok_or_else(|| BriefError::ReportNotFound { id: id.to_string() })?;
        change(report);
        Ok(report.clone())
    }

    /// Remove a report; returns whether one was removed
    pub async fn delete(&self, id: &str, user_id: &str) -> bool {
        let mut reports = self.reports.write().await;
        let before = reports.len();
        reports.retain(|r| !(r.id == id && r.user_id == user_id));
        reports.len() != before
    }
}

fn pending_report(user_id: &str, repo_url: &str, repo_tree_id: Option<String>, model: Option<Model>) -> Report {
    Report {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        repo_url: repo_url.to_string(),
        repo_tree_id,
        model: model.map(|m| m.id().to_string()),
        content: None,
        status: ReportStatus::Pending,
        created_at: Utc::now(),
    }
}

/// What to generate a report for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub repo_url: String,
    /// Model identifier, e.g. `gpt-4o-mini`
    pub model: String,
    /// Section names; canonical order is restored when compiling
    pub sections: Vec<String>,
    pub visibility: Visibility,
}

impl ReportRequest {
    pub fn new(repo_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            model: model.into(),
            sections: Vec::new(),
            visibility: Visibility::Public,
        }
    }

    pub fn with_sections<S: Into<String>>(mut self, sections: impl IntoIterator<Item = S>) -> Self {
        self.sections = sections.into_iter().map(Into::into).collect();
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }
}

/// Header describing the repository, followed by its packed contents
pub fn build_repo_context(
    repo_url: &str,
    description: Option<&str>,
    tree: &[RepoTreeNode],
    packed: &str,
) -> String {
    let title = parse_repo_url(repo_url)
        .map(|info| info.title())
        .unwrap_or_else(|_| repo_url.to_string());

    let mut context = format!("Repository: {}\nURL: {}\n", title, repo_url);
    if let Some(description) = description {
        context.push_str(&format!("Description: {}\n", description));
    }

    let languages = calculate_language_breakdown(tree);
    if !languages.is_empty() {
        context.push_str("\nLanguages:\n");
        for entry in languages {
            context.push_str(&format!("- {}: {:.1}%\n", entry.language, entry.percentage));
        }
    }

    context.push('\n');
    context.push_str(packed);
    context
}

/// Turns a repository URL plus chosen sections into a stored report
pub struct ReportService {
    trees: Arc<RepoTreeStore>,
    contexts: Arc<RepoContextService>,
    reports: Arc<ReportStore>,
    llm: Arc<dyn LlmProvider>,
    notifier: ReportNotifier,
}

impl ReportService {
    pub fn new(
        trees: Arc<RepoTreeStore>,
        contexts: Arc<RepoContextService>,
        reports: Arc<ReportStore>,
        llm: Arc<dyn LlmProvider>,
        notifier: ReportNotifier,
    ) -> Self {
        Self {
            trees,
            contexts,
            reports,
            llm,
            notifier,
        }
    }

    pub fn reports(&self) -> &Arc<ReportStore> {
        &self.reports
    }

    pub fn notifier(&self) -> &ReportNotifier {
        &self.notifier
    }

    /// Create the pending report and the prompt that will fill it
    ///
    /// Nothing is created when the repository can't be read.
    async fn prepare(&self, user: &UserContext, request: &ReportRequest, model: Model) -> Result<(Report, String)> {
        let repo_url = request.repo_url.as_str();
        let tree = self
            .trees
            .get_or_build_tree_as(repo_url, Some(user), request.visibility)
            .await?;
        let packed = self.contexts.generate(repo_url, Some(user), request.visibility).await?;
        let report = self
            .reports
            .create(&user.user_id, repo_url, tree.id.clone(), Some(model))
            .await;

        let description = match self.trees.get_repo_description(repo_url).await {
            Ok(description) => description,
            Err(e) => {
                warn!(repo_url, error = %e, "repository description unavailable");
                None
            }
        };

        let context = build_repo_context(repo_url, description.as_deref(), &tree.tree_data, &packed.context);
        let prompt = compile_report_prompt(&context, &compile_template(&request.sections));
        Ok((report, prompt))
    }

    /// Send the prompt, store the outcome and notify subscribers
    async fn complete(&self, report: Report, model: Model, prompt: String) -> Result<Report> {
        match self.llm.send_prompt(&prompt, model).await {
            Ok(content) => {
                self.reports
                    .update_content(&report.id, &report.user_id, &content)
                    .await?;
                let done = self
                    .reports
                    .set_status(&report.id, &report.user_id, ReportStatus::Completed)
                    .await?;
                info!(report_id = %done.id, model = %model, "report completed");
                self.notifier.publish(&done.id, ReportStatus::Completed);
                Ok(done)
            }
            Err(e) => {
                error!(report_id = %report.id, error = %e, "report generation failed");
                self.reports
                    .set_status(&report.id, &report.user_id, ReportStatus::Failed)
                    .await?;
                self.notifier.publish(&report.id, ReportStatus::Failed);
                Err(e)
            }
        }
    }

    /// Generate a report and wait for it
    pub async fn generate(&self, user: &UserContext, request: &ReportRequest) -> Result<Report> {
        let model: Model = request.model.parse()?;
        let (report, prompt) = self.prepare(user, request, model).await?;
        self.complete(report, model, prompt).await
    }

    /// Create the pending report and finish it in the background
    ///
    /// The returned subscription is registered before the work is spawned,
    /// so it always observes the final status.
    pub async fn start(
        self: &Arc<Self>,
        user: &UserContext,
        request: &ReportRequest,
    ) -> Result<(Report, ReportSubscription)> {
        let model: Model = request.model.parse()?;
        let (report, prompt) = self.prepare(user, request, model).await?;
        let subscription = self.notifier.subscribe(&report.id);

        let service = Arc::clone(self);
        let pending = report.clone();
        tokio::spawn(async move {
            // Failures are recorded on the report and published
            let _ = service.complete(pending, model, prompt).await;
        });
        Ok((report, subscription))
    }
}
