//! Batch identifier assignment.
//!
//! Walks the ingest root for metadata records and takes each one through
//! the full identifier lifecycle:
//!
//! ```text
//! load → title → rights → mint → write → save → hours → bind
//! ```
//!
//! The identifiers are saved before anything else can fail, so a minted ARK
//! always reaches the record. The contact-hours update is a second edit with
//! its own save.
//!
//! Datasets are processed one at a time. A failure at any step ends that
//! dataset's run only; it is recorded with the dataset, the step, and the
//! error, and the loop moves on to the next dataset.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use reqwest::StatusCode;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::binder::ResolverBinder;
use crate::config::{Config, IngestConfig};
use crate::error::ArkError;
use crate::minter::ArkMinter;
use crate::models::{BindRequest, RightsLevel};
use crate::progress::{IngestProgressEvent, IngestProgressReporter};
use crate::store::{MetadataStore, XmlFileStore};
use crate::uri::UriConfig;
use crate::writer;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Overrides `ingest.root`.
    pub root: Option<PathBuf>,
    /// Read titles and rights only; mint, write, and bind nothing.
    pub dry_run: bool,
    pub limit: Option<usize>,
    /// Skip the bind step even when `bind.enabled` is set.
    pub no_bind: bool,
}

/// One metadata record found under the ingest root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    /// Path relative to the ingest root.
    pub id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Load,
    Title,
    Rights,
    Mint,
    Write,
    Save,
    Hours,
    Bind,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Load => "load",
            Step::Title => "title",
            Step::Rights => "rights",
            Step::Mint => "mint",
            Step::Write => "write",
            Step::Save => "save",
            Step::Hours => "hours",
            Step::Bind => "bind",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DatasetOutcome {
    pub dataset: String,
    pub title: String,
    pub rights: RightsLevel,
    /// `None` on a dry run.
    pub ark: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatasetFailure {
    pub dataset: String,
    pub step: Step,
    pub error: String,
    /// Set when the failure happened after minting, so the ARK is not lost.
    pub ark: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub discovered: usize,
    pub succeeded: Vec<DatasetOutcome>,
    pub failures: Vec<DatasetFailure>,
}

impl IngestReport {
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// The minting, writing, and binding collaborators for one run.
pub struct Pipeline {
    pub minter: ArkMinter,
    pub binder: Option<(ResolverBinder, String, String)>,
    pub uris: UriConfig,
    pub default_rights: Option<RightsLevel>,
    pub contact_hours: Option<String>,
}

impl Pipeline {
    pub fn from_config(config: &Config, no_bind: bool) -> Result<Self> {
        let endpoints = config.endpoints()?;
        let minter = ArkMinter::from_endpoints(endpoints, &config.http)?;
        let binder = if config.bind.enabled && !no_bind {
            Some((
                ResolverBinder::from_endpoints(endpoints, &config.http)?,
                config.bind.field.clone(),
                config.bind_base_url()?,
            ))
        } else {
            None
        };
        Ok(Self {
            minter,
            binder,
            uris: config.uri_config()?,
            default_rights: config.ingest.default_rights,
            contact_hours: config.ingest.contact_hours.clone(),
        })
    }
}

/// Run an ingest and print its summary.
///
/// Dataset failures do not make this return `Err`; they are in the report.
pub fn run_ingest(
    config: &Config,
    options: &IngestOptions,
    reporter: &dyn IngestProgressReporter,
) -> Result<IngestReport> {
    let root = options.root.clone().unwrap_or_else(|| config.ingest.root.clone());

    let mut datasets = discover_datasets(&config.ingest, &root)?;
    if let Some(lim) = options.limit {
        datasets.truncate(lim);
    }
    reporter.report(&IngestProgressEvent::Started {
        root: &root,
        datasets: datasets.len(),
    });

    let pipeline = Pipeline::from_config(config, options.no_bind)?;
    let report = ingest_datasets(&pipeline, &datasets, options.dry_run, reporter);

    if options.dry_run {
        println!("ingest {} (dry-run)", root.display());
        println!("  datasets found: {}", report.discovered);
        for outcome in &report.succeeded {
            println!("  {}  [{}]  {}", outcome.dataset, outcome.rights, outcome.title);
        }
    } else {
        println!("ingest {}", root.display());
        println!("  datasets found: {}", report.discovered);
        for outcome in &report.succeeded {
            println!(
                "  {}  ark:/{}",
                outcome.dataset,
                outcome.ark.as_deref().unwrap_or("-")
            );
        }
    }

    for failure in &report.failures {
        match &failure.ark {
            Some(ark) => println!(
                "  FAILED {} at {} (ark:/{}): {}",
                failure.dataset, failure.step, ark, failure.error
            ),
            None => println!(
                "  FAILED {} at {}: {}",
                failure.dataset, failure.step, failure.error
            ),
        }
    }

    println!(
        "  {} succeeded, {} failure(s)",
        report.succeeded.len(),
        report.failure_count()
    );

    Ok(report)
}

/// Process every dataset, isolating failures per dataset.
pub fn ingest_datasets(
    pipeline: &Pipeline,
    datasets: &[Dataset],
    dry_run: bool,
    reporter: &dyn IngestProgressReporter,
) -> IngestReport {
    let mut report = IngestReport {
        discovered: datasets.len(),
        ..Default::default()
    };
    let total = datasets.len();

    for (i, dataset) in datasets.iter().enumerate() {
        let position = i + 1;
        match process_dataset(pipeline, dataset, dry_run) {
            Ok(outcome) => {
                reporter.report(&IngestProgressEvent::Succeeded {
                    position,
                    total,
                    outcome: &outcome,
                });
                report.succeeded.push(outcome);
            }
            Err(failure) => {
                tracing::warn!(
                    dataset = %failure.dataset,
                    step = %failure.step,
                    error = %failure.error,
                    "dataset failed"
                );
                reporter.report(&IngestProgressEvent::Failed {
                    position,
                    total,
                    failure: &failure,
                });
                report.failures.push(failure);
            }
        }
    }

    tracing::info!(
        succeeded = report.succeeded.len(),
        failed = report.failure_count(),
        "ingest finished"
    );
    report
}

fn process_dataset(
    pipeline: &Pipeline,
    dataset: &Dataset,
    dry_run: bool,
) -> Result<DatasetOutcome, DatasetFailure> {
    let fail = |step: Step, ark: Option<&str>, error: anyhow::Error| DatasetFailure {
        dataset: dataset.id.clone(),
        step,
        error: format!("{:#}", error),
        ark: ark.map(str::to_string),
    };

    let mut store = XmlFileStore::new(&dataset.path);
    let mut doc = store.load().map_err(|e| fail(Step::Load, None, e))?;

    let title = writer::read_alt_title(&doc).map_err(|e| fail(Step::Title, None, e.into()))?;

    let rights = writer::read_rights(&doc)
        .or(pipeline.default_rights)
        .ok_or_else(|| {
            fail(
                Step::Rights,
                None,
                ArkError::SchemaViolation(
                    "record names no rights level and ingest.default_rights is unset".into(),
                )
                .into(),
            )
        })?;

    if dry_run {
        return Ok(DatasetOutcome {
            dataset: dataset.id.clone(),
            title,
            rights,
            ark: None,
        });
    }

    let ark = pipeline
        .minter
        .mint()
        .map_err(|e| fail(Step::Mint, None, e.into()))?;
    let minted = Some(ark.full_ark());

    writer::write_identifiers(&mut doc, &ark, &pipeline.uris, rights, &title)
        .map_err(|e| fail(Step::Write, minted, e.into()))?;
    store
        .save(&doc)
        .map_err(|e| fail(Step::Save, minted, e))?;

    if let Some(hours) = &pipeline.contact_hours {
        writer::set_contact_hours(&mut doc, hours)
            .map_err(|e| fail(Step::Hours, minted, e.into()))?;
        store
            .save(&doc)
            .map_err(|e| fail(Step::Hours, minted, e))?;
    }

    if let Some((binder, field, base_url)) = &pipeline.binder {
        let request = BindRequest::new(ark.full_ark(), field, base_url)
            .map_err(|e| fail(Step::Bind, minted, e.into()))?;
        let status = binder
            .send(&request)
            .map_err(|e| fail(Step::Bind, minted, e.into()))?;
        if status != StatusCode::OK {
            return Err(fail(
                Step::Bind,
                minted,
                ArkError::UnexpectedStatus {
                    url: request.url(binder.resolver_base()),
                    status,
                }
                .into(),
            ));
        }
    }

    tracing::info!(dataset = %dataset.id, ark = %ark, "dataset done");
    Ok(DatasetOutcome {
        dataset: dataset.id.clone(),
        title,
        rights,
        ark: Some(ark.full_ark().to_string()),
    })
}

/// Metadata records under `root`, sorted by relative path.
pub fn discover_datasets(config: &IngestConfig, root: &Path) -> Result<Vec<Dataset>> {
    if !root.is_dir() {
        anyhow::bail!("Ingest root is not a directory: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;
    let exclude_set = build_globset(&config.exclude_globs)?;

    let mut datasets = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        if !include_set.is_match(&rel_str) {
            continue;
        }

        datasets.push(Dataset {
            id: rel_str,
            path: path.to_path_buf(),
        });
    }

    // Sort for deterministic ordering
    datasets.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(datasets)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discovery_applies_globs_and_sorts() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("b")).unwrap();
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::fs::write(root.join("b/roads.shp.xml"), "<m/>").unwrap();
        std::fs::write(root.join("a/parks.shp.xml"), "<m/>").unwrap();
        std::fs::write(root.join("a/parks_ISO.xml"), "<m/>").unwrap();
        std::fs::write(root.join("a/parks_FGDC.xml"), "<m/>").unwrap();
        std::fs::write(root.join("a/readme.txt"), "x").unwrap();

        let datasets = discover_datasets(&IngestConfig::default(), root).unwrap();
        let ids: Vec<&str> = datasets.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a/parks.shp.xml", "b/roads.shp.xml"]);
    }

    #[cfg(unix)]
    #[test]
    fn discovery_skips_unreadable_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("roads.shp.xml"), "<m/>").unwrap();
        std::os::unix::fs::symlink(root.join("gone"), root.join("dangling.shp.xml")).unwrap();

        let config = IngestConfig {
            follow_symlinks: true,
            ..IngestConfig::default()
        };
        let datasets = discover_datasets(&config, root).unwrap();
        let ids: Vec<&str> = datasets.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["roads.shp.xml"]);
    }

    #[test]
    fn discovery_requires_directory() {
        let tmp = TempDir::new().unwrap();
        let err = discover_datasets(&IngestConfig::default(), &tmp.path().join("missing"))
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn step_names() {
        assert_eq!(Step::Mint.to_string(), "mint");
        assert_eq!(Step::Bind.as_str(), "bind");
    }
}
