//! Running all categories of a month
//!
//! Each category becomes one [`CompositionJob`]: its directory is listed,
//! the files are put in chronological order and composed into a statement.
//! Categories run side by side and are all awaited before [`run`] returns,
//! so a failing category never keeps the other one from finishing.

use std::path::PathBuf;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::JoinSet;

use crate::category::Category;
use crate::collect::{collect_files, sort_chronologically, SourceFile};
use crate::error::{Error, Result};
use crate::month::Month;
use crate::paths::{category_dir, is_accessible_dir, month_dir, output_path};
use crate::pdf::compose;

/// Settings for one run of the tool
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory containing one folder per month
    pub root_dir: PathBuf,
    /// Month to build statements for
    pub month: Month,
    /// Optional name inserted into output filenames
    pub user_name: Option<String>,
    /// Upper bound for each category job, unbounded if `None`
    pub timeout: Option<Duration>,
}

impl RunConfig {
    pub fn new(root_dir: impl Into<PathBuf>, month: Month) -> Self {
        Self {
            root_dir: root_dir.into(),
            month,
            user_name: None,
            timeout: None,
        }
    }

    /// Output file of a category under this configuration
    pub fn output_path(&self, category: Category) -> PathBuf {
        output_path(
            &self.root_dir,
            self.month,
            category,
            self.user_name.as_deref(),
        )
    }
}

/// Everything needed to compose one statement
#[derive(Debug, Clone)]
pub struct CompositionJob {
    pub root_dir: PathBuf,
    pub month: Month,
    pub category: Category,
    pub output_path: PathBuf,
    /// Oldest first
    pub ordered_files: Vec<SourceFile>,
}

impl CompositionJob {
    /// List and order the category's files
    pub async fn prepare(config: &RunConfig, category: Category) -> Result<Self> {
        let dir = category_dir(&config.root_dir, config.month, category);

        let mut files = collect_files(&dir).await?;
        sort_chronologically(&mut files);

        if files.is_empty() {
            warn!("No invoices found in {}", dir.display());
        }

        Ok(Self {
            root_dir: config.root_dir.clone(),
            month: config.month,
            category,
            output_path: config.output_path(category),
            ordered_files: files,
        })
    }

    /// Compose the statement, off the async executor
    ///
    /// Setting `cancelled` stops the composition and keeps it from replacing
    /// the output file. The composer sets it itself right before it does.
    pub async fn execute(self, cancelled: Arc<AtomicBool>) -> Result<Statement> {
        let source_count = self.ordered_files.len();
        let output_path = self.output_path.clone();

        let page_count = tokio::task::spawn_blocking(move || {
            compose(&self.ordered_files, &self.output_path, &cancelled)
        })
        .await
        .map_err(|e| Error::General(format!("Composition task failed: {}", e)))??;

        Ok(Statement {
            output_path,
            page_count,
            source_count,
        })
    }
}

/// A statement that has been written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub output_path: PathBuf,
    pub page_count: usize,
    pub source_count: usize,
}

/// Result of one category
#[derive(Debug)]
pub struct CategoryOutcome {
    pub category: Category,
    pub result: Result<Statement>,
}

/// Results of all categories, ordered by category
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<CategoryOutcome>,
}

impl RunReport {
    /// Outcome for a single category
    pub fn outcome(&self, category: Category) -> Option<&CategoryOutcome> {
        self.outcomes.iter().find(|o| o.category == category)
    }

    /// Whether every category produced a statement
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Report over all categories, ordered by category
    ///
    /// Categories without an outcome, e.g. because their task panicked, are
    /// recorded as failed.
    pub fn from_outcomes(mut outcomes: Vec<CategoryOutcome>) -> Self {
        for category in Category::ALL {
            if !outcomes.iter().any(|o| o.category == category) {
                error!("No result for {} statement", category);
                outcomes.push(CategoryOutcome {
                    category,
                    result: Err(Error::General(format!(
                        "{} job ended without a result",
                        category
                    ))),
                });
            }
        }
        outcomes.sort_by_key(|o| o.category);

        Self { outcomes }
    }

    /// Statements that were written
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

/// Fail if the root or month directory can't be used
///
/// Nothing is written before these checks pass.
pub async fn check_preconditions(config: &RunConfig) -> Result<()> {
    if !is_accessible_dir(&config.root_dir).await {
        return Err(Error::RootDirectory(config.root_dir.clone()));
    }

    let month_dir = month_dir(&config.root_dir, config.month);
    if !is_accessible_dir(&month_dir).await {
        return Err(Error::MonthDirectory(month_dir));
    }

    Ok(())
}

/// Build the statement of a single category
///
/// With a timeout set, a job that runs past it is stopped and its statement
/// is not written. A job that was already moving its statement into place
/// is allowed to finish.
pub async fn run_category(config: &RunConfig, category: Category) -> Result<Statement> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let job = async {
        let job = CompositionJob::prepare(config, category).await?;
        job.execute(Arc::clone(&cancelled)).await
    };

    let Some(limit) = config.timeout else {
        return job.await;
    };

    let mut job = pin!(job);
    match tokio::time::timeout(limit, job.as_mut()).await {
        Ok(result) => result,
        Err(_) => {
            if cancelled.swap(true, Ordering::SeqCst) {
                warn!("{} statement finished while timing out", category);
                return job.await;
            }
            Err(Error::Timeout {
                category: category.to_string(),
                seconds: limit.as_secs(),
            })
        }
    }
}

/// Check preconditions, then build the statements of all categories
///
/// Returns an error only for fatal preconditions. Per-category failures are
/// logged and collected in the report.
pub async fn run(config: &RunConfig) -> Result<RunReport> {
    check_preconditions(config).await?;

    let mut jobs = JoinSet::new();
    for category in Category::ALL {
        let config = config.clone();
        jobs.spawn(async move {
            let result = run_category(&config, category).await;
            CategoryOutcome { category, result }
        });
    }

    let mut outcomes = Vec::with_capacity(Category::ALL.len());
    while let Some(joined) = jobs.join_next().await {
        match joined {
            Ok(outcome) => {
                log_outcome(&outcome);
                outcomes.push(outcome);
            }
            Err(e) => error!("Category job aborted: {}", e),
        }
    }

    Ok(RunReport::from_outcomes(outcomes))
}

fn log_outcome(outcome: &CategoryOutcome) {
    match &outcome.result {
        Ok(statement) => info!(
            "Created {} ({} pages from {} files)",
            statement.output_path.display(),
            statement.page_count,
            statement.source_count
        ),
        Err(e) => error!("Failed to create {} statement: {}", outcome.category, e),
    }
}
