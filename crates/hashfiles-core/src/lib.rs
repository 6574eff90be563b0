//! Hashfiles Core - content-addressed renaming of build output
//!
//! Features:
//! - In-memory asset graph with automatic reference fixup on rename
//! - Eligibility rules for assets whose URLs must stay stable
//! - Dependency-ordered batches, with cycles reported instead of broken
//! - Placement pass: static directory or CDN, with cross-origin marking
//! - Hashing pass: BLAKE3 fingerprints embedded in file names
//! - JSON graph manifests and on-disk output

pub mod asset;
pub mod config;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod graph;
pub mod hasher;
pub mod hashfiles;
pub mod manifest;
pub mod mover;
pub mod order;
pub mod output;
pub mod placement;
pub mod relation;
pub mod report;

pub use asset::{Asset, AssetId, AssetSpec, AssetType};
pub use config::{CdnRoot, Options, ResolvedOptions, DEFAULT_CONFIG_FILE};
pub use error::{Error, Result};
pub use filter::{fixed_reason, is_movable, FixedReason};
pub use fingerprint::HashingPolicy;
pub use graph::AssetGraph;
pub use hasher::{ContentDigest, FINGERPRINT_LEN};
pub use hashfiles::{plan, process, run_pass};
pub use manifest::{load_graph, Manifest};
pub use mover::{move_asset, MoveOutcome, MovePolicy};
pub use order::{generate_move_order, CyclicDependency, DependencySnapshot, MoveOrder};
pub use output::write_output;
pub use placement::{Placement, PlacementPolicy};
pub use relation::{ReferenceStyle, RelationId, RelationType, RelationView};
pub use report::{Move, Pass, PassReport, Report, Warning};
