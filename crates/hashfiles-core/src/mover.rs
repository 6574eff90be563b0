//! Asset Mover - applies a policy's new URL to one asset

use url::Url;

use crate::asset::AssetId;
use crate::error::{Error, Result};
use crate::graph::AssetGraph;
use crate::report::{Move, Warning};

/// Produces new URLs for the assets of one pass.
///
/// Any `Fn(&AssetGraph, AssetId) -> Option<String>` closure is a policy.
pub trait MovePolicy {
    /// New URL for `asset`, or `None` to leave it where it is.
    ///
    /// A value ending in `/` is a directory: the asset keeps its file name,
    /// query and fragment. Anything else is used verbatim, resolved against
    /// the asset's current URL.
    fn new_url(&self, graph: &AssetGraph, asset: AssetId) -> Option<String>;

    /// Called after `asset` has been given the URL this policy produced.
    fn after_move(&self, _graph: &mut AssetGraph, _asset: AssetId) {}
}

impl<F> MovePolicy for F
where
    F: Fn(&AssetGraph, AssetId) -> Option<String>,
{
    fn new_url(&self, graph: &AssetGraph, asset: AssetId) -> Option<String> {
        self(graph, asset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The policy had nothing to say, or the URL did not change.
    Unchanged,
    Moved(Move),
    /// The URL belongs to another asset; nothing was changed.
    Conflict(Warning),
}

/// Resolve a policy's new URL for `asset`.
pub fn target_url(graph: &AssetGraph, asset: AssetId, new_url: &str) -> Result<Option<Url>> {
    let asset = graph.asset(asset);
    let Some(current) = asset.url() else {
        return Ok(None);
    };

    let href = if new_url.ends_with('/') {
        format!("{new_url}{}{}", asset.file_name(), asset.query_and_fragment())
    } else {
        new_url.to_string()
    };

    current
        .join(&href)
        .map(Some)
        .map_err(|source| Error::InvalidUrl { url: href, source })
}

/// Move one asset according to `policy`.
///
/// Inline assets are never moved. The rename itself goes through
/// [`AssetGraph::set_url`], so every relation pointing at the asset follows
/// it and is listed in the returned [`Move`].
pub fn move_asset<P>(graph: &mut AssetGraph, asset: AssetId, policy: &P) -> Result<MoveOutcome>
where
    P: MovePolicy + ?Sized,
{
    let Some(new_url) = policy.new_url(graph, asset) else {
        return Ok(MoveOutcome::Unchanged);
    };
    let Some(to) = target_url(graph, asset, &new_url)? else {
        return Ok(MoveOutcome::Unchanged);
    };
    let Some(from) = graph.asset(asset).url().cloned() else {
        return Ok(MoveOutcome::Unchanged);
    };

    if from == to {
        policy.after_move(graph, asset);
        return Ok(MoveOutcome::Unchanged);
    }

    match graph.set_url(asset, to.clone()) {
        Ok(retargeted) => {
            policy.after_move(graph, asset);
            Ok(MoveOutcome::Moved(Move {
                asset,
                from,
                to,
                retargeted,
            }))
        }
        Err(Error::UrlInUse(url)) => {
            Ok(MoveOutcome::Conflict(Warning::UrlConflict { asset, url }))
        }
        Err(err) => Err(err),
    }
}
