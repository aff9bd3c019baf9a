//! Workflow resource client.

use async_trait::async_trait;
use futures::Stream;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use crate::error::{PromethiumError, PromethiumResult};
use crate::http::{Connection, Resource};
use crate::models::{
    ListWorkflowParams, MemoryEstimate, StatusVocabulary, Workflow, WorkflowId, WorkflowRequest,
    WorkflowResult, WorkflowStatus,
};
use crate::page::{Page, PageSource, Paginator};
use crate::wait::{StatusSource, StatusLog, TracingStatusLog, WaitOptions, wait_for_workflows};

const WORKFLOWS_PATH: &str = "/v0/workflows";

/// Submit, inspect, and manage workflows.
#[derive(Debug, Clone)]
pub struct Workflows {
    conn: Connection,
    vocabulary: StatusVocabulary,
}

impl Workflows {
    pub(crate) fn new(conn: Connection, vocabulary: StatusVocabulary) -> Self {
        Self { conn, vocabulary }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Validate and submit a workflow. The returned status is non-terminal.
    #[instrument(skip(self, request), fields(name = %request.name, kind = %request.kind()))]
    pub async fn submit(&self, request: &WorkflowRequest) -> PromethiumResult<Workflow> {
        request.validate()?;
        let workflow: Workflow = self
            .conn
            .send_json(
                self.conn.post(WORKFLOWS_PATH),
                request,
                Resource::Workflow,
                &request.name,
            )
            .await?;
        debug!("Submitted workflow {} ({})", workflow.id, workflow.status);
        Ok(workflow)
    }

    /// Current snapshot of a workflow.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &WorkflowId) -> PromethiumResult<Workflow> {
        let path = format!("{WORKFLOWS_PATH}/{id}");
        self.conn
            .json(self.conn.get(&path), Resource::Workflow, id.as_str())
            .await
    }

    /// Current status of a workflow.
    pub async fn status(&self, id: &WorkflowId) -> PromethiumResult<WorkflowStatus> {
        Ok(self.get(id).await?.status)
    }

    /// Request cancellation of a running workflow.
    #[instrument(skip(self))]
    pub async fn stop(&self, id: &WorkflowId) -> PromethiumResult<()> {
        let path = format!("{WORKFLOWS_PATH}/{id}/stop");
        self.conn
            .empty(self.conn.post(&path), Resource::Workflow, id.as_str())
            .await
    }

    /// Delete a workflow. The server answers 409 unless it is terminal.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &WorkflowId) -> PromethiumResult<()> {
        let path = format!("{WORKFLOWS_PATH}/{id}");
        self.conn
            .empty(self.conn.delete(&path), Resource::Workflow, id.as_str())
            .await
    }

    /// Predict GPU memory use for a request without submitting it.
    #[instrument(skip(self, request), fields(kind = %request.kind()))]
    pub async fn memory(&self, request: &WorkflowRequest) -> PromethiumResult<MemoryEstimate> {
        request.validate()?;
        let path = format!("{WORKFLOWS_PATH}/memory");
        self.conn
            .send_json(self.conn.post(&path), request, Resource::Workflow, &request.name)
            .await
    }

    // ─── Results ────────────────────────────────────────────────────

    /// Results of a terminal workflow.
    #[instrument(skip(self))]
    pub async fn results(&self, id: &WorkflowId) -> PromethiumResult<WorkflowResult> {
        let path = format!("{WORKFLOWS_PATH}/{id}/results");
        self.conn
            .json(self.conn.get(&path), Resource::Workflow, id.as_str())
            .await
    }

    /// ZIP bundle of every result artifact.
    #[instrument(skip(self))]
    pub async fn download(&self, id: &WorkflowId) -> PromethiumResult<Vec<u8>> {
        let path = format!("{WORKFLOWS_PATH}/{id}/results/download");
        let bytes = self
            .conn
            .bytes(self.conn.get(&path), Resource::Workflow, id.as_str())
            .await?;
        debug!("Downloaded {} bytes of results for {}", bytes.len(), id);
        Ok(bytes)
    }

    // ─── Listing ────────────────────────────────────────────────────

    /// Paginator over workflows matching `params`.
    pub fn paginator(
        &self,
        params: &ListWorkflowParams,
    ) -> PromethiumResult<Paginator<WorkflowPages>> {
        Paginator::new(
            WorkflowPages {
                conn: self.conn.clone(),
                filter: params.filter_query(),
            },
            params.size,
        )
    }

    /// One page: `params.page`, or page 1 when unset.
    pub async fn list(&self, params: &ListWorkflowParams) -> PromethiumResult<Page<Workflow>> {
        self.paginator(params)?
            .fetch(params.page.unwrap_or(1))
            .await
    }

    /// Every matching workflow, walking all pages from page 1.
    /// `params.page` is ignored.
    pub async fn list_all(&self, params: &ListWorkflowParams) -> PromethiumResult<Vec<Workflow>> {
        self.paginator(params)?.collect_all().await
    }

    /// Lazy stream of pages from `params.page` (page 1 when unset) to the
    /// last.
    pub fn pages(
        &self,
        params: &ListWorkflowParams,
    ) -> PromethiumResult<impl Stream<Item = PromethiumResult<Page<Workflow>>> + Send + 'static> {
        Ok(self
            .paginator(params)?
            .into_pages_from(params.page.unwrap_or(1)))
    }

    // ─── Waiting ────────────────────────────────────────────────────

    /// Wait for one workflow to become terminal and return its final snapshot.
    pub async fn wait(&self, id: &WorkflowId, options: &WaitOptions) -> PromethiumResult<Workflow> {
        let mut finished = self.wait_all(std::slice::from_ref(id), options).await?;
        finished
            .remove(id)
            .ok_or_else(|| PromethiumError::WorkflowNotFound(id.to_string()))
    }

    /// Wait for every workflow in `ids`, logging through `tracing`.
    pub async fn wait_all(
        &self,
        ids: &[WorkflowId],
        options: &WaitOptions,
    ) -> PromethiumResult<FxHashMap<WorkflowId, Workflow>> {
        self.wait_all_with_log(ids, options, &TracingStatusLog).await
    }

    /// Wait for every workflow in `ids`, reporting observations to `log`.
    #[instrument(skip(self, options, log), fields(count = ids.len()))]
    pub async fn wait_all_with_log(
        &self,
        ids: &[WorkflowId],
        options: &WaitOptions,
        log: &dyn StatusLog,
    ) -> PromethiumResult<FxHashMap<WorkflowId, Workflow>> {
        if options.vocabulary.is_some() {
            return wait_for_workflows(self, ids, options, log).await;
        }
        let options = options.clone().with_vocabulary(self.vocabulary.clone());
        wait_for_workflows(self, ids, &options, log).await
    }
}

#[async_trait]
impl StatusSource for Workflows {
    async fn fetch_status(&self, id: &WorkflowId) -> PromethiumResult<Workflow> {
        self.get(id).await
    }
}

/// `GET /v0/workflows` as a [`PageSource`].
#[derive(Debug, Clone)]
pub struct WorkflowPages {
    conn: Connection,
    filter: Vec<(&'static str, String)>,
}

#[async_trait]
impl PageSource for WorkflowPages {
    type Item = Workflow;

    async fn fetch_page(&self, page: u32, size: u32) -> PromethiumResult<Page<Workflow>> {
        let request = self
            .conn
            .get(WORKFLOWS_PATH)
            .query(&self.filter)
            .query(&[("page", page), ("size", size)]);
        self.conn
            .json(request, Resource::Workflow, WORKFLOWS_PATH)
            .await
    }
}
