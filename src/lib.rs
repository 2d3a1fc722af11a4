//! # geoark
//!
//! Persistent ARK identifiers for geospatial metadata records.
//!
//! geoark mints an Archival Resource Key from a NOID service, writes it into
//! a dataset's metadata record (citation identifier, metadata file ID, and
//! download URI), and binds the identifier's `where` field at the resolver.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────────┐   ┌──────────┐
//! │  Minter  │──▶│    URI    │──▶│    Writer    │──▶│  Binder  │
//! │ mint+1   │   │  builder  │   │ XML metadata │   │ bind+set │
//! └──────────┘   └───────────┘   └──────┬───────┘   └──────────┘
//!                                       │
//!                                  ┌────▼─────┐
//!                                  │  Store   │
//!                                  │ XML file │
//!                                  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! geoark endpoints                         # show the active environment
//! geoark mint                              # mint one identifier
//! geoark write roads.shp.xml --rights public
//! geoark bind 77981/gmgssf2mb2h
//! geoark ingest --root ./datasets --dry-run
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | ARK identifier, rights level, bind request |
//! | [`error`] | Error taxonomy |
//! | [`minter`] | Minting against a NOID service |
//! | [`binder`] | Resolver binding |
//! | [`uri`] | Landing and download URIs |
//! | [`metadata`] | XML element tree and path lookup |
//! | [`writer`] | Identifier fields in a metadata record |
//! | [`store`] | Metadata document backends |
//! | [`ingest`] | Batch processing with per-dataset isolation |

pub mod binder;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod ingest;
pub mod metadata;
pub mod minter;
pub mod models;
pub mod progress;
pub mod store;
pub mod uri;
pub mod writer;
