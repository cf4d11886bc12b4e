//! Request pipeline
//!
//! One parameterized pipeline serves both request shapes:
//!
//! - **comparison**: one content type, requester plus up to 3 other members
//! - **multi-metric**: up to 3 content types, one member
//!
//! Both reduce to a base scan job plus overlay scan jobs over the same
//! corpus snapshot, so the axis of variation (subject vs. content type) is
//! just data. Per run: validate (zero I/O on failure) -> rate limiter ->
//! gate -> scan corpus once -> base search -> overlay searches -> re-key
//! every series onto a shared date grid -> tabular artifact -> chart ->
//! image artifact -> deliver bytes -> delete artifacts.
//!
//! The run body is file-bound work, so it executes on the blocking thread
//! pool; the async side only throttles and awaits. The gate permit and the
//! artifact guard move into the worker, which means a run that outlives its
//! wall-clock bound keeps the slot until its work actually stops, then
//! cleans up via the same RAII path as every other exit.

use crate::chart::{ChartEngine, ChartModel, SvgChartEngine};
use crate::config::Config;
use crate::corpus::CorpusScanner;
use crate::error::{ArgSlot, Error, Result};
use crate::gate::{ConcurrencyGate, RateLimiter};
use crate::scanners::ScannerRegistry;
use crate::series::{CsvTable, TimeSeries};
use crate::types::{ContentType, Guild, Member};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Overlay limit carried over from the source behavior: chart legends stay
/// readable with at most 4 plotted series. Longer lists are truncated, not
/// rejected.
pub const MAX_OVERLAYS: usize = 3;

/// A rendered chart ready for delivery.
#[derive(Debug, Clone)]
pub struct ChartImage {
    /// Suggested filename for the receiving channel
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// One scanner invocation the run will perform on top of the base search.
struct ScanJob {
    content: ContentType,
    member_id: u64,
    /// Legend label for the resulting overlay
    label: String,
}

/// Orchestrates statistics requests end to end.
///
/// Owns the scratch directory, the scanner registry, the chart engine, and
/// both throttles. All per-run state (corpus snapshot, series, chart model,
/// artifacts) is exclusively owned by that run.
pub struct RequestPipeline {
    dump_root: PathBuf,
    scratch_dir: PathBuf,
    registry: Arc<ScannerRegistry>,
    engine: Arc<dyn ChartEngine>,
    gate: Arc<ConcurrencyGate>,
    limiter: RateLimiter,
    run_timeout: Duration,
    corpus_scans: Arc<AtomicU64>,
}

impl RequestPipeline {
    /// Create a pipeline with the built-in scanners and SVG engine.
    ///
    /// Validates the startup conditions (dump root readable, scratch dir
    /// creatable); failures here are configuration errors, not per-request
    /// ones.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_parts(config, ScannerRegistry::new(), Box::new(SvgChartEngine))
    }

    /// Create a pipeline with a custom registry and engine.
    pub fn with_parts(
        config: &Config,
        registry: ScannerRegistry,
        engine: Box<dyn ChartEngine>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dump_root: config.dump_root()?,
            scratch_dir: config.scratch.dir.clone(),
            registry: Arc::new(registry),
            engine: Arc::from(engine),
            gate: Arc::new(ConcurrencyGate::new()),
            limiter: RateLimiter::new(
                config.limits.rate_limit_invocations,
                Duration::from_secs(config.limits.rate_limit_window_secs),
            ),
            run_timeout: Duration::from_secs(config.limits.run_timeout_secs),
            corpus_scans: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Ordered labels of the supported content types, for help/options
    /// display.
    pub fn list_supported_content_types(&self) -> Vec<&'static str> {
        self.registry.supported_labels()
    }

    /// Total corpus snapshots taken since startup.
    ///
    /// Each run scans exactly once, regardless of how many searches it
    /// performs; exposed for logging and for tests asserting that
    /// invariant.
    pub fn corpus_scans(&self) -> u64 {
        self.corpus_scans.load(Ordering::Relaxed)
    }

    /// Compare one content type across the requester and up to 3 other
    /// members.
    ///
    /// The requester's series is the base plot; each other member becomes a
    /// named overlay in request order, labeled with their display name.
    /// Subjects must be distinct: the requester already is the base plot,
    /// and a repeated member would draw the same line twice.
    pub async fn run_comparison(
        &self,
        guild: &Guild,
        content: &str,
        requester: &Member,
        others: &[Member],
    ) -> Result<ChartImage> {
        let content = parse_content(content, ArgSlot::Content(1))?;

        let others = truncated(others, MAX_OVERLAYS);
        for (i, member) in others.iter().enumerate() {
            if member.id == requester.id || others[..i].iter().any(|m| m.id == member.id) {
                return Err(Error::Validation {
                    slot: ArgSlot::Subject(i as u8 + 1),
                    value: member.display_name.clone(),
                });
            }
        }

        let jobs = others
            .iter()
            .map(|member| ScanJob {
                content,
                member_id: member.id,
                label: member.display_name.clone(),
            })
            .collect();

        self.run(
            guild,
            requester,
            content,
            requester.display_name.clone(),
            jobs,
            format!("{}, {}", content.label(), guild.name),
        )
        .await
    }

    /// Chart up to 3 content types for a single member.
    ///
    /// The first content type's series is the base plot; the 2nd/3rd become
    /// overlays labeled with their content labels.
    pub async fn run_multi_metric(
        &self,
        guild: &Guild,
        contents: &[&str],
        requester: &Member,
    ) -> Result<ChartImage> {
        if contents.is_empty() {
            return Err(Error::Validation {
                slot: ArgSlot::Content(1),
                value: String::new(),
            });
        }

        // Validate every slot up front: no I/O happens if any is unknown,
        // and the error names the offending slot.
        let contents = truncated(contents, 1 + MAX_OVERLAYS);
        let mut parsed = Vec::with_capacity(contents.len());
        for (i, raw) in contents.iter().enumerate() {
            parsed.push(parse_content(raw, ArgSlot::Content(i as u8 + 1))?);
        }

        let base_content = parsed[0];
        let jobs = parsed[1..]
            .iter()
            .map(|content| ScanJob {
                content: *content,
                member_id: requester.id,
                label: content.label().to_string(),
            })
            .collect();

        self.run(
            guild,
            requester,
            base_content,
            base_content.label().to_string(),
            jobs,
            format!("{}, {}", requester.display_name, guild.name),
        )
        .await
    }

    /// Shared run body behind validation: throttles, then the pipeline
    /// proper on the blocking pool, under a wall-clock bound.
    async fn run(
        &self,
        guild: &Guild,
        requester: &Member,
        base_content: ContentType,
        base_label: String,
        overlay_jobs: Vec<ScanJob>,
        title_head: String,
    ) -> Result<ChartImage> {
        // Throttled requesters never contend for the global slot.
        self.limiter.check(requester.id)?;
        let permit = self.gate.try_acquire_owned().ok_or(Error::GateDenied)?;

        tracing::info!(
            guild_id = guild.id,
            requester_id = requester.id,
            content = %base_content,
            overlays = overlay_jobs.len(),
            "Pipeline run started"
        );

        let run = PipelineRun {
            dump_root: self.dump_root.clone(),
            scratch_dir: self.scratch_dir.clone(),
            registry: Arc::clone(&self.registry),
            engine: Arc::clone(&self.engine),
            corpus_scans: Arc::clone(&self.corpus_scans),
            guild_id: guild.id,
            requester_id: requester.id,
            base_content,
            base_label,
            overlay_jobs,
            title_head,
        };

        // The worker owns the permit: if we stop waiting, the slot stays
        // taken until the abandoned work stops, then opens via the permit's
        // Drop.
        let worker = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            run.execute()
        });

        match tokio::time::timeout(self.run_timeout, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => {
                std::panic::resume_unwind(join_err.into_panic())
            }
            Ok(Err(join_err)) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                join_err,
            ))),
            Err(_) => {
                tracing::warn!(
                    guild_id = guild.id,
                    requester_id = requester.id,
                    limit_secs = self.run_timeout.as_secs(),
                    "Pipeline run timed out"
                );
                Err(Error::Timeout {
                    limit_secs: self.run_timeout.as_secs(),
                })
            }
        }
    }
}

/// Everything one worker needs, owned, so the run can leave the async
/// context.
struct PipelineRun {
    dump_root: PathBuf,
    scratch_dir: PathBuf,
    registry: Arc<ScannerRegistry>,
    engine: Arc<dyn ChartEngine>,
    corpus_scans: Arc<AtomicU64>,
    guild_id: u64,
    requester_id: u64,
    base_content: ContentType,
    base_label: String,
    overlay_jobs: Vec<ScanJob>,
    title_head: String,
}

impl PipelineRun {
    fn execute(self) -> Result<ChartImage> {
        // One snapshot per run; every search below sees the same corpus.
        let corpus = CorpusScanner::scan(&self.dump_root)?;
        self.corpus_scans.fetch_add(1, Ordering::Relaxed);

        let base = self
            .registry
            .get(self.base_content)
            .search(self.guild_id, self.requester_id, &corpus)?;

        let mut overlays = Vec::with_capacity(self.overlay_jobs.len());
        for job in &self.overlay_jobs {
            match self
                .registry
                .get(job.content)
                .search(self.guild_id, job.member_id, &corpus)
            {
                Ok(series) if series.is_empty() => {
                    // Nothing to plot for this overlay; keep the chart.
                    tracing::warn!(
                        label = %job.label,
                        content = %job.content,
                        "Overlay has no recorded activity, skipping"
                    );
                }
                Ok(series) => overlays.push((job.label.clone(), series)),
                Err(e) => {
                    // A failed overlay degrades to a warning; the base
                    // chart still goes out.
                    tracing::warn!(
                        label = %job.label,
                        content = %job.content,
                        error = %e,
                        "Overlay search failed, skipping"
                    );
                }
            }
        }

        // Members are rarely active on identical day sets, so every series
        // is re-keyed by date onto the union of plotted dates, zero-filled.
        // Positional alignment alone would misplot values.
        let mut grid: BTreeSet<NaiveDate> = base.dates().collect();
        for (_, series) in &overlays {
            grid.extend(series.dates());
        }
        let grid: Vec<NaiveDate> = grid.into_iter().collect();
        let base_on_grid: TimeSeries = grid.iter().map(|d| (*d, base.value_on(*d))).collect();

        // Artifact names derive from request identity; uniqueness relies on
        // the single-flight gate. If the gate is ever sharded, add a
        // run-unique component here.
        let stem = format!("{}_{}_{}", self.guild_id, self.requester_id, self.base_content);
        let table_path = self.scratch_dir.join(format!("{}.csv", stem));
        let image_path = self
            .scratch_dir
            .join(format!("{}.{}", stem, self.engine.extension()));
        let _artifacts = ArtifactGuard::new(vec![table_path.clone(), image_path.clone()]);

        // The tabular artifact is the requester's recorded activity, not
        // the zero-filled chart grid.
        CsvTable::dump(&base, &table_path)?;

        let mut model = ChartModel::compose(&base_on_grid, &self.base_label);
        for (label, series) in &overlays {
            model.add_overlay(label, series.sample(&grid))?;
        }

        // Final title: context head composed around the structured span,
        // never parsed back out of renderer output.
        model.title = format!("{}\n{}", self.title_head, model.span_text());

        self.engine.render(&model, &image_path)?;

        let bytes = std::fs::read(&image_path)?;

        tracing::info!(
            guild_id = self.guild_id,
            requester_id = self.requester_id,
            content = %self.base_content,
            series = model.series_count(),
            image_bytes = bytes.len(),
            "Pipeline run finished"
        );

        Ok(ChartImage {
            filename: format!("{}.{}", self.base_content, self.engine.extension()),
            bytes,
        })
        // _artifacts drops here (and on every earlier error path),
        // deleting both files.
    }
}

fn parse_content(raw: &str, slot: ArgSlot) -> Result<ContentType> {
    raw.parse().map_err(|_| Error::Validation {
        slot,
        value: raw.to_string(),
    })
}

fn truncated<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    if items.len() > limit {
        tracing::debug!(
            supplied = items.len(),
            limit,
            "Truncating request list to the product limit"
        );
    }
    items.iter().take(limit).cloned().collect()
}

/// Deletes the run's scratch artifacts when dropped.
///
/// Runs on every exit path of the worker: success, error, and runs the
/// caller stopped waiting for. Files that were never created are ignored.
struct ArtifactGuard {
    paths: Vec<PathBuf>,
}

impl ArtifactGuard {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to delete scratch artifact"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_preserves_order() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(truncated(&items, 3), vec![1, 2, 3]);
        assert_eq!(truncated(&items, 10), items);
    }

    #[test]
    fn test_artifact_guard_removes_existing_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("run.csv");
        let missing = dir.path().join("run.svg");
        std::fs::write(&existing, "date,count\n").unwrap();

        drop(ArtifactGuard::new(vec![existing.clone(), missing]));
        assert!(!existing.exists());
    }
}
