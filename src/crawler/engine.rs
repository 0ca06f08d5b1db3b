//! Crawl engine - traversal, dispatch and completion detection
//!
//! The engine seeds the frontier with the base URL and keeps up to
//! `max-concurrent-pages` fetch tasks running. Each task opens its page, waits
//! for readiness within the wait budget, captures content and links, then
//! admits the links and marks its unit done in a single frontier transaction.
//! The crawl is complete when no task is outstanding and every unit is done. A
//! task that panics still leaves its unit done, with `UnitOutcome::TaskFailed`.

use crate::config::{Config, CrawlConfig};
use crate::render::{with_budget, Readiness, RenderError, Renderer, OPEN_OPERATION};
use crate::state::{CrawlUnit, Dispatch, Frontier, FrontierCounts, UnitOutcome, UnitState};
use crate::url::{to_absolute, Classification, UrlClassifier};
use crate::{Result, SnapError};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::{Id, JoinError, JoinSet};

const READINESS_OPERATION: &str = "readiness";
const EXTRACT_OPERATION: &str = "extract";

// Slack over the wait budget before the engine abandons an open itself
const OPEN_GRACE: Duration = Duration::from_secs(1);

/// Lifecycle of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Created, not yet started
    Idle,
    /// The base URL is being fetched
    Running,
    /// The base URL is done; remaining units are being fetched
    Draining,
    /// Every unit is done
    Complete,
    /// Stopped by the shutdown signal
    Cancelled,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// PNG image captured for a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The unit's URL as discovered
    pub url: String,
    pub png: Vec<u8>,
}

/// Everything a finished crawl produced
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Every unit, in discovery order
    pub units: Vec<CrawlUnit>,
    pub snapshots: Vec<Snapshot>,
    pub counts: FrontierCounts,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl CrawlOutcome {
    /// Units whose content was captured, in discovery order
    pub fn captured(&self) -> impl Iterator<Item = &CrawlUnit> {
        self.units.iter().filter(|unit| unit.is_captured())
    }

    pub fn count_outcome(&self, outcome: UnitOutcome) -> usize {
        self.units
            .iter()
            .filter(|unit| unit.outcome == Some(outcome))
            .count()
    }
}

/// Shared by every fetch task
struct TaskContext<R: Renderer> {
    renderer: Arc<R>,
    frontier: Arc<Mutex<Frontier>>,
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
    base_url: String,
    ready_selector: Option<String>,
    wait_budget: Duration,
    poll_interval: Duration,
    capture_snapshots: bool,
}

/// What a fetch task reports back to the engine
#[derive(Debug)]
struct TaskReport {
    url: String,
    depth: u32,
    outcome: UnitOutcome,
    error: Option<RenderError>,
}

struct Capture {
    content: String,
    links: Vec<String>,
    snapshot: Option<Vec<u8>>,
}

struct Failure {
    outcome: UnitOutcome,
    error: RenderError,
}

/// Drives a crawl against a renderer
pub struct CrawlEngine<R: Renderer> {
    config: CrawlConfig,
    capture_snapshots: bool,
    renderer: Arc<R>,
    frontier: Arc<Mutex<Frontier>>,
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
    state: EngineState,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<R: Renderer> CrawlEngine<R> {
    /// Creates an engine for the given configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `renderer` - The renderer pages are fetched with
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlEngine)` - Engine in the `Idle` state
    /// * `Err(SnapError::Config)` - The base URL or an exclude pattern is invalid
    pub fn new(config: &Config, renderer: R) -> Result<Self> {
        let classifier = UrlClassifier::from_config(&config.crawl)?;
        let frontier = Frontier::new(classifier, config.crawl.depth);

        Ok(Self {
            config: config.crawl.clone(),
            capture_snapshots: config.output.render,
            renderer: Arc::new(renderer),
            frontier: Arc::new(Mutex::new(frontier)),
            snapshots: Arc::new(Mutex::new(Vec::new())),
            state: EngineState::Idle,
            shutdown: None,
        })
    }

    /// Stops the crawl when `true` is sent on the channel
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Shared handle to the frontier
    pub fn frontier(&self) -> Arc<Mutex<Frontier>> {
        Arc::clone(&self.frontier)
    }

    fn set_state(&mut self, state: EngineState) {
        tracing::debug!("Engine state: {} -> {}", self.state, state);
        self.state = state;
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - Every reachable unit is done
    /// * `Err(SnapError::BaseUnreachable)` - The base URL could not be opened
    /// * `Err(SnapError::TaskFailed)` - The base URL's fetch task panicked
    /// * `Err(SnapError::Incomplete)` - Units were left unfinished
    /// * `Err(SnapError::Cancelled)` - The shutdown signal fired
    pub async fn run(&mut self) -> Result<CrawlOutcome> {
        let started_at = Utc::now();
        let start = Instant::now();

        self.frontier.lock().admit_base();
        self.set_state(EngineState::Running);

        tracing::info!(
            "Starting crawl of {} (depth {}, {} concurrent pages)",
            self.config.base_url,
            self.config.depth,
            self.config.max_concurrent_pages
        );

        let context = Arc::new(TaskContext {
            renderer: Arc::clone(&self.renderer),
            frontier: Arc::clone(&self.frontier),
            snapshots: Arc::clone(&self.snapshots),
            base_url: self.config.base_url.clone(),
            ready_selector: self.config.ready_selector.clone(),
            wait_budget: self.config.wait_budget(),
            poll_interval: self.config.poll_every(),
            capture_snapshots: self.capture_snapshots,
        });

        let max_tasks = self.config.max_concurrent_pages.max(1) as usize;
        let mut tasks: JoinSet<TaskReport> = JoinSet::new();
        let mut running: HashMap<Id, Dispatch> = HashMap::new();
        let mut shutdown = self.shutdown.clone();
        let mut finished = 0usize;

        loop {
            while tasks.len() < max_tasks {
                let next = {
                    let mut frontier = self.frontier.lock();
                    match frontier.next_discovered() {
                        Some(dispatch) => {
                            frontier.mark_in_flight(&dispatch.key)?;
                            Some(dispatch)
                        }
                        None => None,
                    }
                };

                let Some(dispatch) = next else {
                    break;
                };

                tracing::info!("Crawling [depth {}]: {}", dispatch.depth, dispatch.url);
                let handle = tasks.spawn(fetch_unit(Arc::clone(&context), dispatch.clone()));
                running.insert(handle.id(), dispatch);
            }

            // Nothing outstanding and nothing left to dispatch
            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                joined = tasks.join_next_with_id() => {
                    let report = match joined {
                        Some(Ok((id, report))) => {
                            running.remove(&id);
                            report
                        }
                        Some(Err(e)) => match running.remove(&e.id()) {
                            Some(dispatch) => self.recover_failed_task(dispatch, e),
                            None => {
                                tracing::error!("Untracked fetch task failed: {}", e);
                                continue;
                            }
                        },
                        None => continue,
                    };

                    finished += 1;
                    if let Err(e) = self.handle_report(report) {
                        tasks.shutdown().await;
                        self.renderer.shutdown().await;
                        return Err(e);
                    }

                    if finished % 10 == 0 {
                        let counts = self.frontier.lock().counts();
                        tracing::info!(
                            "Progress: {} pages done, {} in flight, {} waiting",
                            counts.done,
                            counts.in_flight,
                            counts.discovered
                        );
                    }
                }
                _ = wait_for_shutdown(&mut shutdown) => {
                    tracing::warn!("Shutdown requested, cancelling {} outstanding pages", tasks.len());
                    tasks.shutdown().await;
                    self.renderer.shutdown().await;
                    self.set_state(EngineState::Cancelled);
                    return Err(SnapError::Cancelled);
                }
            }
        }

        self.renderer.shutdown().await;

        let unfinished = {
            let frontier = self.frontier.lock();
            (!frontier.is_complete()).then(|| frontier.counts())
        };
        if let Some(counts) = unfinished {
            return Err(SnapError::Incomplete {
                in_flight: counts.in_flight,
                discovered: counts.discovered,
            });
        }

        self.set_state(EngineState::Complete);

        let (units, counts) = {
            let frontier = self.frontier.lock();
            (frontier.units().to_vec(), frontier.counts())
        };
        let snapshots = std::mem::take(&mut *self.snapshots.lock());
        let duration = start.elapsed();

        tracing::info!(
            "Crawl complete: {} pages, {} captured in {:.2}s",
            counts.done,
            counts.captured,
            duration.as_secs_f64()
        );

        Ok(CrawlOutcome {
            units,
            snapshots,
            counts,
            started_at,
            duration,
        })
    }

    fn handle_report(&mut self, report: TaskReport) -> Result<()> {
        match (&report.error, report.outcome) {
            (None, _) => tracing::debug!("Captured {}", report.url),
            (Some(e), UnitOutcome::TimedOut) => tracing::warn!("Timed out: {} ({})", report.url, e),
            (Some(e), _) => tracing::warn!("Failed: {} ({})", report.url, e),
        }

        if report.depth > 0 {
            return Ok(());
        }

        if report.outcome == UnitOutcome::TaskFailed {
            return Err(SnapError::TaskFailed {
                url: report.url,
                message: report
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
            });
        }

        // A base page that opens but never becomes ready is not fatal
        let unreachable = match &report.error {
            Some(e) => report.outcome == UnitOutcome::OpenFailed || is_open_timeout(e),
            None => false,
        };

        if unreachable {
            if let Some(source) = report.error {
                return Err(SnapError::BaseUnreachable {
                    url: report.url,
                    source,
                });
            }
        }

        if self.state == EngineState::Running {
            self.set_state(EngineState::Draining);
        }

        Ok(())
    }

    /// Records a unit whose fetch task panicked or was aborted as Done
    fn recover_failed_task(&self, dispatch: Dispatch, error: JoinError) -> TaskReport {
        let message = if error.is_panic() {
            "fetch task panicked"
        } else {
            "fetch task was aborted"
        };
        tracing::error!("{} while crawling {}", message, dispatch.url);

        let mut frontier = self.frontier.lock();
        let in_flight = frontier
            .get(&dispatch.key)
            .map_or(false, |unit| unit.state == UnitState::InFlight);
        if in_flight {
            if let Err(e) = frontier.mark_done(&dispatch.key, None, UnitOutcome::TaskFailed) {
                tracing::error!("{}", e);
            }
        }

        TaskReport {
            url: dispatch.url,
            depth: dispatch.depth,
            outcome: UnitOutcome::TaskFailed,
            error: Some(RenderError::Aborted(message.to_string())),
        }
    }
}

fn is_open_timeout(error: &RenderError) -> bool {
    matches!(error, RenderError::Timeout { operation, .. } if operation == OPEN_OPERATION)
}

/// Resolves when `true` is sent on the shutdown channel; never without one
async fn wait_for_shutdown(shutdown: &mut Option<watch::Receiver<bool>>) {
    let Some(receiver) = shutdown else {
        return std::future::pending().await;
    };

    loop {
        if *receiver.borrow_and_update() {
            return;
        }
        if receiver.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

/// Fetches one unit and records the result in the frontier
async fn fetch_unit<R: Renderer>(context: Arc<TaskContext<R>>, dispatch: Dispatch) -> TaskReport {
    let result = match to_absolute(&dispatch.url, &context.base_url) {
        Ok(absolute) => capture_page(&context, &absolute).await,
        Err(e) => Err(Failure {
            outcome: UnitOutcome::OpenFailed,
            error: RenderError::Open {
                url: dispatch.url.clone(),
                message: e.to_string(),
            },
        }),
    };

    let (content, links, outcome, error) = match result {
        Ok(capture) => {
            if let Some(png) = capture.snapshot {
                context.snapshots.lock().push(Snapshot {
                    url: dispatch.url.clone(),
                    png,
                });
            }
            (Some(capture.content), capture.links, UnitOutcome::Captured, None)
        }
        Err(failure) => (None, Vec::new(), failure.outcome, Some(failure.error)),
    };

    {
        let mut frontier = context.frontier.lock();
        let child_depth = dispatch.depth + 1;
        let mut admitted = 0usize;

        for link in &links {
            if dispatch.depth < frontier.max_depth() {
                if frontier.admit(link, child_depth) {
                    admitted += 1;
                }
            } else if let Classification::Admit { canonical } = frontier.classify(link) {
                tracing::trace!("Depth limit reached, not following {}", canonical);
            }
        }

        if let Err(e) = frontier.mark_done(&dispatch.key, content, outcome) {
            tracing::error!("{}", e);
        }

        tracing::debug!(
            "{}: {} links found, {} admitted",
            dispatch.url,
            links.len(),
            admitted
        );
    }

    TaskReport {
        url: dispatch.url,
        depth: dispatch.depth,
        outcome,
        error,
    }
}

/// Opens a page, waits for readiness and reads it
///
/// Opening and readiness share the wait budget. Reading the page gets a wait
/// budget of its own, as does closing it. A snapshot or link extraction
/// failure keeps the captured content.
async fn capture_page<R: Renderer>(
    context: &TaskContext<R>,
    absolute: &str,
) -> std::result::Result<Capture, Failure> {
    let renderer = &context.renderer;
    let budget = context.wait_budget;
    let started = Instant::now();

    let mut page = with_budget(renderer.open(absolute, budget), budget + OPEN_GRACE, OPEN_OPERATION)
        .await
        .map_err(|error| Failure {
            outcome: if error.is_timeout() {
                UnitOutcome::TimedOut
            } else {
                UnitOutcome::OpenFailed
            },
            error,
        })?;

    let remaining = budget.saturating_sub(started.elapsed());
    let readiness = renderer
        .wait_until_ready(
            &mut page,
            context.ready_selector.as_deref(),
            remaining,
            context.poll_interval,
        )
        .await;

    if readiness == Readiness::TimedOut {
        close_page(&**renderer, page, budget, absolute).await;
        return Err(Failure {
            outcome: UnitOutcome::TimedOut,
            error: RenderError::Timeout {
                operation: READINESS_OPERATION.to_string(),
                budget,
            },
        });
    }

    let captured = match tokio::time::timeout(budget, read_page(context, &page, absolute)).await {
        Ok(result) => result,
        Err(_) => Err(Failure {
            outcome: UnitOutcome::TimedOut,
            error: RenderError::Timeout {
                operation: EXTRACT_OPERATION.to_string(),
                budget,
            },
        }),
    };

    close_page(&**renderer, page, budget, absolute).await;
    captured
}

/// Reads content, snapshot and links from a ready page
async fn read_page<R: Renderer>(
    context: &TaskContext<R>,
    page: &R::Page,
    absolute: &str,
) -> std::result::Result<Capture, Failure> {
    let renderer = &context.renderer;

    let content = renderer
        .extract_content(page)
        .await
        .map_err(|error| Failure {
            outcome: UnitOutcome::ExtractFailed,
            error,
        })?;

    let snapshot = if context.capture_snapshots {
        renderer.capture_snapshot(page).await.unwrap_or_else(|e| {
            tracing::warn!("Snapshot failed for {}: {}", absolute, e);
            None
        })
    } else {
        None
    };

    let links = renderer.extract_links(page).await.unwrap_or_else(|e| {
        tracing::warn!("Link extraction failed for {}: {}", absolute, e);
        Vec::new()
    });

    Ok(Capture {
        content,
        links,
        snapshot,
    })
}

async fn close_page<R: Renderer>(renderer: &R, page: R::Page, budget: Duration, absolute: &str) {
    if tokio::time::timeout(budget, renderer.close(page)).await.is_err() {
        tracing::warn!("Closing {} did not finish within {:?}", absolute, budget);
    }
}
