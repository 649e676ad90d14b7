//! Full-update orchestration.
//!
//! Drives one destructive rebuild: fetch the listing, wipe the stored tree,
//! materialize every path, mirror markdown content, then resolve content for
//! every directory created in the run.
//!
//! ```text
//! Idle → FetchingListing → Wiping → Materializing → ResolvingContent → Done
//!                  └────────────┴──────────┴──────────────┴──→ Failed
//! ```
//!
//! The rebuild is not transactional. A run that fails after `Wiping` leaves
//! the store with a partially rebuilt tree until the next successful run.

use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db;
use crate::decompose::{decompose, RunContext};
use crate::error::{PipelineError, Result};
use crate::fetcher::fetch_content;
use crate::materialize::materialize_decomposition;
use crate::models::{is_markdown, EntryKind, NodeId, NodeKind, TreeListing};
use crate::progress::{NoProgress, ProgressMode, ProgressReporter, UpdateProgressEvent};
use crate::remote::{GitHubRemote, RemoteSource};
use crate::resolver::{resolve_directory, DirectorySource};
use crate::sqlite_store::SqliteStore;
use crate::store::memory::InMemoryStore;
use crate::store::Store;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    FetchingListing,
    Wiping,
    Materializing,
    ResolvingContent,
    Done,
    Failed,
}

/// What a completed run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReport {
    pub tree_id: String,
    pub entries: usize,
    pub directories: usize,
    pub files: usize,
    /// Markdown files whose content was mirrored.
    pub markdown_contents: usize,
    /// Directories resolved from a README.md / index.md.
    pub index_directories: usize,
    /// Directories resolved with a generated TOC.
    pub toc_directories: usize,
    pub truncated: bool,
    pub elapsed_ms: u64,
}

/// Which snapshot to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSelector {
    /// Head of a branch; resolved to its tree before listing.
    Branch(String),
    /// A tree identifier used as-is.
    Tree(String),
}

/// One full-update run over a store and a remote source.
pub struct FullUpdate<'a> {
    store: &'a dyn Store,
    remote: &'a dyn RemoteSource,
    progress: &'a dyn ProgressReporter,
    fetch_concurrency: usize,
    state: RunState,
}

impl<'a> FullUpdate<'a> {
    pub fn new(store: &'a dyn Store, remote: &'a dyn RemoteSource) -> Self {
        Self {
            store,
            remote,
            progress: &NoProgress,
            fetch_concurrency: 1,
            state: RunState::Idle,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Markdown blobs fetched at once while materializing. Values below 1
    /// are treated as 1.
    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n.max(1);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        info!(from = ?self.state, to = ?next, "full update state");
        self.state = next;
    }

    /// Run the update for `tree_id`. Any error is terminal for the run.
    pub async fn run(&mut self, tree_id: &str) -> Result<UpdateReport> {
        let started = Instant::now();
        match self.execute(tree_id).await {
            Ok(mut report) => {
                report.elapsed_ms = started.elapsed().as_millis() as u64;
                self.transition(RunState::Done);
                Ok(report)
            }
            Err(e) => {
                error!(state = ?self.state, stage = e.stage().as_str(), error = %e, "full update failed");
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    async fn execute(&mut self, tree_id: &str) -> Result<UpdateReport> {
        self.transition(RunState::FetchingListing);
        self.progress.report(UpdateProgressEvent::FetchingListing {
            tree_id: tree_id.to_string(),
        });
        let listing = self.remote.list_tree(tree_id).await?;
        if listing.truncated {
            warn!(
                tree_id = %listing.tree_id,
                entries = listing.entries.len(),
                "remote listing is truncated; mirroring the partial tree"
            );
        }

        self.transition(RunState::Wiping);
        self.progress.report(UpdateProgressEvent::Wiping);
        self.store
            .wipe_tree()
            .await
            .map_err(PipelineError::Persistence)?;

        self.transition(RunState::Materializing);
        let mut ctx = RunContext::new();
        let markdown = materialize_listing(self.store, &mut ctx, &listing, self.progress).await?;
        let markdown_contents = self.store_markdown(markdown).await?;

        self.transition(RunState::ResolvingContent);
        let directories = ctx.directories().to_vec();
        let total = directories.len() as u64;
        let mut report = UpdateReport {
            tree_id: listing.tree_id.clone(),
            entries: listing.entries.len(),
            directories: directories.len(),
            files: ctx.len() - directories.len(),
            markdown_contents,
            truncated: listing.truncated,
            ..Default::default()
        };
        for (i, (path, node_id)) in directories.iter().enumerate() {
            match resolve_directory(self.store, self.remote, node_id, path).await? {
                DirectorySource::IndexFile(_) => report.index_directories += 1,
                DirectorySource::Toc => report.toc_directories += 1,
            }
            self.progress.report(UpdateProgressEvent::Resolving {
                n: i as u64 + 1,
                total,
            });
        }

        Ok(report)
    }

    /// Fetch and store markdown content with bounded concurrency.
    ///
    /// Results are consumed in listing order, so the first failure in
    /// listing order aborts the run no matter which fetch finishes first.
    async fn store_markdown(&self, files: Vec<MarkdownFile>) -> Result<usize> {
        let remote = self.remote;
        let total = files.len() as u64;
        // Owned items and a boxed stream keep the future Send for axum
        let mut fetches = stream::iter(files)
            .map(move |file: MarkdownFile| async move {
                let body = fetch_content(remote, &file.blob_id).await?;
                Ok::<_, PipelineError>((file, body))
            })
            .boxed()
            .buffered(self.fetch_concurrency);

        let mut stored = 0usize;
        while let Some(result) = fetches.next().await {
            let (file, body) = result?;
            self.store
                .upsert_content(&file.node_id, &body)
                .await
                .map_err(PipelineError::Persistence)?;
            stored += 1;
            self.progress.report(UpdateProgressEvent::FetchingContent {
                n: stored as u64,
                total,
            });
        }
        Ok(stored)
    }
}

/// A newly created markdown file waiting for its content.
#[derive(Debug, Clone)]
struct MarkdownFile {
    node_id: NodeId,
    blob_id: String,
}

/// Walk the listing and persist one node per distinct path. Returns the
/// markdown files created, in listing order.
async fn materialize_listing(
    store: &dyn Store,
    ctx: &mut RunContext,
    listing: &TreeListing,
    progress: &dyn ProgressReporter,
) -> Result<Vec<MarkdownFile>> {
    let total = listing.entries.len() as u64;
    let mut markdown = Vec::new();

    for (i, entry) in listing.entries.iter().enumerate() {
        let decomposition = decompose(ctx, &entry.path, entry.kind)?;
        let kind = match entry.kind {
            EntryKind::File => NodeKind::File {
                content_hash: entry.blob_id.clone(),
                source_url: entry.url.clone(),
            },
            EntryKind::Directory => NodeKind::Directory,
        };
        let node = materialize_decomposition(store, ctx, &decomposition, kind).await?;

        if node.created && entry.kind == EntryKind::File && is_markdown(&decomposition.node.name)
        {
            markdown.push(MarkdownFile {
                node_id: node.id,
                blob_id: entry.blob_id.clone(),
            });
        }
        progress.report(UpdateProgressEvent::Materializing {
            n: i as u64 + 1,
            total,
        });
    }

    Ok(markdown)
}

/// Resolve the selector, then run a full update.
pub async fn full_update(
    store: &dyn Store,
    remote: &dyn RemoteSource,
    selector: &TreeSelector,
    fetch_concurrency: usize,
    progress: &dyn ProgressReporter,
) -> Result<UpdateReport> {
    let tree_id = match selector {
        TreeSelector::Tree(id) => id.clone(),
        TreeSelector::Branch(branch) => {
            let id = remote.resolve_tree_id(branch).await?;
            info!(branch = %branch, tree_id = %id, "resolved branch head");
            id
        }
    };

    FullUpdate::new(store, remote)
        .with_progress(progress)
        .with_fetch_concurrency(fetch_concurrency)
        .run(&tree_id)
        .await
}

/// Counts a run would produce, computed without touching the real store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatePlan {
    pub tree_id: String,
    pub entries: usize,
    pub directories: usize,
    pub files: usize,
    pub markdown_files: usize,
    pub truncated: bool,
}

/// Materialize a listing into a scratch in-memory store and count the result.
pub async fn plan_listing(listing: &TreeListing) -> Result<UpdatePlan> {
    let scratch = InMemoryStore::new();
    let mut ctx = RunContext::new();
    let markdown = materialize_listing(&scratch, &mut ctx, listing, &NoProgress).await?;
    let directories = ctx.directories().len();
    Ok(UpdatePlan {
        tree_id: listing.tree_id.clone(),
        entries: listing.entries.len(),
        directories,
        files: ctx.len() - directories,
        markdown_files: markdown.len(),
        truncated: listing.truncated,
    })
}

/// `mirror update`: run a full update against the configured database and
/// remote, printing a summary to stdout.
pub async fn run_update(
    config: &Config,
    tree: Option<String>,
    dry_run: bool,
    progress: ProgressMode,
) -> anyhow::Result<()> {
    let remote = GitHubRemote::new(&config.remote)?;
    let selector = match tree {
        Some(id) => TreeSelector::Tree(id),
        None => TreeSelector::Branch(config.remote.branch.clone()),
    };

    if dry_run {
        let tree_id = match &selector {
            TreeSelector::Tree(id) => id.clone(),
            TreeSelector::Branch(branch) => remote.resolve_tree_id(branch).await?,
        };
        let listing = remote.list_tree(&tree_id).await?;
        let plan = plan_listing(&listing).await?;
        println!("update {} (dry-run)", plan.tree_id);
        println!("  entries: {}", plan.entries);
        println!("  directories: {}", plan.directories);
        println!("  files: {}", plan.files);
        println!("  markdown files: {}", plan.markdown_files);
        if plan.truncated {
            println!("  truncated: yes");
        }
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let reporter = progress.reporter();

    let result = full_update(
        &store,
        &remote,
        &selector,
        config.remote.fetch_concurrency,
        reporter.as_ref(),
    )
    .await;
    store.pool().close().await;

    let report = result.map_err(|e| {
        anyhow::anyhow!("update failed at stage '{}': {}", e.stage().as_str(), e)
    })?;

    println!("update {}", report.tree_id);
    println!("  entries: {}", report.entries);
    println!("  directories: {}", report.directories);
    println!("  files: {}", report.files);
    println!("  markdown contents: {}", report.markdown_contents);
    println!(
        "  directory contents: {} index, {} toc",
        report.index_directories, report.toc_directories
    );
    if report.truncated {
        println!("  truncated: yes");
    }
    println!("ok");
    Ok(())
}
