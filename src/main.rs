//! # geoark CLI
//!
//! ## Usage
//!
//! ```bash
//! geoark --config ./config/geoark.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `geoark mint` | Mint one identifier and print its parts |
//! | `geoark bind <ark>` | Bind a resolver field for an existing identifier |
//! | `geoark uris <ark>` | Print the landing and download URIs |
//! | `geoark write <xml>` | Write identifiers into a metadata record |
//! | `geoark hours <xml> <hours>` | Rewrite contact hours in a record |
//! | `geoark ingest` | Run the full lifecycle for every record under a root |
//! | `geoark endpoints` | Show configured environments |

use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::StatusCode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use geoark::binder::ResolverBinder;
use geoark::config::{self, Environment};
use geoark::ingest::{self, IngestOptions};
use geoark::minter::ArkMinter;
use geoark::models::{ArkIdentifier, RightsLevel};
use geoark::progress::ProgressMode;
use geoark::store::{MetadataStore, XmlFileStore};
use geoark::{endpoints, writer};

/// geoark: mint, record, and bind ARK identifiers for geospatial datasets.
#[derive(Parser)]
#[command(name = "geoark", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/geoark.toml")]
    config: PathBuf,

    /// Override the configured environment (`production` or `development`).
    #[arg(long = "env", global = true)]
    environment: Option<Environment>,

    /// Debug-level logging on stderr (`RUST_LOG` takes precedence).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint one new identifier.
    ///
    /// Each call consumes an identifier from the NOID namespace.
    Mint,

    /// Bind a field of an existing identifier at the resolver.
    ///
    /// The bound value is `<base-url><ark>`.
    Bind {
        /// Identifier as `NNNNN/xxxxxxxxxxx`.
        ark: String,

        /// Field to bind. Defaults to `bind.field` (usually `where`).
        #[arg(long)]
        field: Option<String>,

        /// Value prefix. Defaults to `bind.base_url`, then the app URL.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Print the landing and download URIs for an identifier.
    Uris {
        ark: String,

        #[arg(long, default_value = "public")]
        rights: RightsLevel,

        /// Dataset alternate title (download file name).
        #[arg(long)]
        title: String,
    },

    /// Write identifiers into a metadata record.
    ///
    /// Mints a new identifier unless `--ark` is given. Title and rights are
    /// read from the record when not passed.
    Write {
        /// Path to the metadata XML file.
        path: PathBuf,

        #[arg(long)]
        ark: Option<String>,

        #[arg(long)]
        rights: Option<RightsLevel>,

        #[arg(long)]
        title: Option<String>,

        /// Also bind the configured field after saving.
        #[arg(long)]
        bind: bool,
    },

    /// Rewrite the contact hours of every contact in a record.
    Hours {
        path: PathBuf,
        hours: String,
    },

    /// Assign identifiers to every metadata record under a directory.
    ///
    /// A failing dataset is reported and skipped; the run continues.
    Ingest {
        /// Directory to scan. Defaults to `ingest.root`.
        #[arg(long)]
        root: Option<PathBuf>,

        /// List datasets with their title and rights without minting.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of datasets to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Skip the resolver bind step.
        #[arg(long)]
        no_bind: bool,

        /// Progress on stderr. Defaults to `human` on a terminal, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Show the configured environments and which one is active.
    Endpoints,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "geoark=debug"
        } else {
            "geoark=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut cfg = config::load_config(&cli.config)?;
    if let Some(env) = cli.environment {
        cfg = cfg.with_environment(env)?;
    }

    match cli.command {
        Commands::Mint => {
            let minter = ArkMinter::from_endpoints(cfg.endpoints()?, &cfg.http)?;
            let ark = minter.mint()?;
            println!("ark:              {}", ark.scheme_form());
            println!("authority number: {}", ark.authority_number());
            println!("assigned name:    {}", ark.assigned_name());
        }
        Commands::Bind {
            ark,
            field,
            base_url,
        } => {
            let field = field.unwrap_or_else(|| cfg.bind.field.clone());
            let base_url = match base_url {
                Some(url) => url,
                None => cfg.bind_base_url()?,
            };
            let binder = ResolverBinder::from_endpoints(cfg.endpoints()?, &cfg.http)?;
            let status = binder.bind(&ark, &field, &base_url)?;
            println!("bind {} {} -> {}{}: {}", ark, field, base_url, ark, status);
            if status != StatusCode::OK {
                anyhow::bail!("resolver answered {}", status);
            }
        }
        Commands::Uris { ark, rights, title } => {
            let ark = ArkIdentifier::parse(&ark)?;
            let uris = cfg.uri_config()?;
            println!("landing:  {}", uris.landing_uri(&ark));
            println!("download: {}", uris.download_uri(rights, &ark, &title));
        }
        Commands::Write {
            path,
            ark,
            rights,
            title,
            bind,
        } => {
            let mut store = XmlFileStore::new(&path);
            let mut doc = store.load()?;

            let title = match title {
                Some(t) => t,
                None => writer::read_alt_title(&doc)?,
            };
            let rights = rights
                .or_else(|| writer::read_rights(&doc))
                .or(cfg.ingest.default_rights)
                .context("No rights level in the record; pass --rights")?;
            let ark = match ark {
                Some(a) => ArkIdentifier::parse(&a)?,
                None => ArkMinter::from_endpoints(cfg.endpoints()?, &cfg.http)?.mint()?,
            };

            writer::write_identifiers(&mut doc, &ark, &cfg.uri_config()?, rights, &title)?;
            store.save(&doc)?;
            println!("wrote {} to {}", ark.scheme_form(), path.display());

            if bind {
                let binder = ResolverBinder::from_endpoints(cfg.endpoints()?, &cfg.http)?;
                let status = binder.bind(ark.full_ark(), &cfg.bind.field, &cfg.bind_base_url()?)?;
                println!("bind {}: {}", cfg.bind.field, status);
                if status != StatusCode::OK {
                    anyhow::bail!("resolver answered {}", status);
                }
            }
        }
        Commands::Hours { path, hours } => {
            let mut store = XmlFileStore::new(&path);
            let mut doc = store.load()?;
            let n = writer::set_contact_hours(&mut doc, &hours)?;
            store.save(&doc)?;
            println!("updated {} contact(s) in {}", n, path.display());
        }
        Commands::Ingest {
            root,
            dry_run,
            limit,
            no_bind,
            progress,
        } => {
            let options = IngestOptions {
                root,
                dry_run,
                limit,
                no_bind,
            };
            let reporter = ProgressMode::resolve(progress).reporter();
            let report = ingest::run_ingest(&cfg, &options, reporter.as_ref())?;
            if report.failure_count() > 0 {
                anyhow::bail!(
                    "{} of {} dataset(s) failed",
                    report.failure_count(),
                    report.processed()
                );
            }
        }
        Commands::Endpoints => {
            endpoints::list_endpoints(&cfg)?;
        }
    }

    Ok(())
}
