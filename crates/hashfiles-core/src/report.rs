//! Report - what each pass moved and what it had to leave alone

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use url::Url;

use crate::asset::AssetId;
use crate::relation::RelationId;

/// The two sequential rewrite passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    Placement,
    Hashing,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Placement => write!(f, "placement"),
            Pass::Hashing => write!(f, "hashing"),
        }
    }
}

/// One applied rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Move {
    pub asset: AssetId,
    pub from: Url,
    pub to: Url,
    /// Relations that now point at `to`.
    pub retargeted: Vec<RelationId>,
}

/// Recoverable problems. Processing continues after each of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// Eligible assets left at their pre-pass URL because they depend on
    /// each other.
    CyclicDependency {
        assets: BTreeSet<AssetId>,
        relations: Vec<RelationId>,
    },
    /// The computed URL already belongs to another asset; this asset keeps
    /// its URL for the pass.
    UrlConflict { asset: AssetId, url: Url },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::CyclicDependency { assets, relations } => write!(
                f,
                "cyclic dependency between {} assets ({} relations), left unprocessed",
                assets.len(),
                relations.len()
            ),
            Warning::UrlConflict { asset, url } => {
                write!(f, "{asset} not moved: {url} is already in use")
            }
        }
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub pass: Pass,
    /// Number of batches the dependency order produced.
    pub batches: usize,
    pub moved: Vec<Move>,
    pub warnings: Vec<Warning>,
}

impl PassReport {
    pub fn new(pass: Pass) -> Self {
        Self {
            pass,
            batches: 0,
            moved: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// The move applied to `asset` in this pass, if any.
    pub fn move_of(&self, asset: AssetId) -> Option<&Move> {
        self.moved.iter().find(|m| m.asset == asset)
    }
}

/// Outcome of a full `process` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub placement: PassReport,
    pub hashing: PassReport,
}

impl Report {
    pub fn passes(&self) -> [&PassReport; 2] {
        [&self.placement, &self.hashing]
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.passes().into_iter().flat_map(|pass| pass.warnings.iter())
    }

    /// True when some asset moved in either pass.
    pub fn is_asset_moved(&self, asset: AssetId) -> bool {
        self.passes()
            .iter()
            .any(|pass| pass.move_of(asset).is_some())
    }

    /// Original URL to final URL of every asset moved by either pass.
    pub fn rename_map(&self) -> BTreeMap<String, String> {
        let mut first: BTreeMap<AssetId, &Url> = BTreeMap::new();
        let mut last: BTreeMap<AssetId, &Url> = BTreeMap::new();

        for pass in self.passes() {
            for m in &pass.moved {
                first.entry(m.asset).or_insert(&m.from);
                last.insert(m.asset, &m.to);
            }
        }

        first
            .into_iter()
            .filter_map(|(asset, from)| {
                let to = last.get(&asset)?;
                (from != *to).then(|| (from.to_string(), to.to_string()))
            })
            .collect()
    }
}
