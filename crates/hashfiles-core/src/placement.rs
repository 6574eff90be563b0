//! Placement - first pass: static directory or CDN
//!
//! Every eligible asset moves into `{root}{static_dir}/`, unless a CDN root
//! is configured and the asset can safely be served cross-origin. Batches
//! arrive dependencies first, so by the time an asset is placed, whatever it
//! references has already left (or stayed in) the build root.

use serde::Serialize;
use url::Url;

use crate::asset::{AssetId, AssetType};
use crate::config::{CdnRoot, ResolvedOptions};
use crate::graph::AssetGraph;
use crate::mover::MovePolicy;
use crate::order::content_dependencies;
use crate::relation::{ReferenceStyle, RelationType};

/// Where an asset lands in the placement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Static,
    Cdn,
}

/// New-URL producer for the placement pass.
#[derive(Debug, Clone)]
pub struct PlacementPolicy {
    options: ResolvedOptions,
}

impl PlacementPolicy {
    pub fn new(options: ResolvedOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// The configured CDN, if `asset` may be served from it.
    pub fn cdn_for(&self, graph: &AssetGraph, id: AssetId) -> Option<&CdnRoot> {
        let cdn = self.options.cdn.as_ref()?;
        let asset = graph.asset(id);
        let asset_type = asset.asset_type();

        if asset_type == AssetType::Htc || asset.extension().eq_ignore_ascii_case(".jar") {
            return None;
        }
        if asset_type == AssetType::Html && !self.options.cdn_html {
            return None;
        }
        if asset_type == AssetType::Flash && !self.options.cdn_flash {
            return None;
        }

        let same_origin_consumer = graph
            .incoming(id)
            .iter()
            .any(|relation| relation.relation_type.is_in(RelationType::SAME_ORIGIN_ONLY));
        if same_origin_consumer {
            return None;
        }

        // Anything on the CDN must not depend on files still under the root.
        let local_dependency = content_dependencies(graph, id).iter().any(|relation| {
            graph
                .asset(relation.to)
                .url()
                .is_some_and(|url| graph.is_under_root(url))
        });
        if local_dependency {
            return None;
        }

        Some(cdn)
    }

    pub fn can_use_cdn(&self, graph: &AssetGraph, id: AssetId) -> bool {
        self.cdn_for(graph, id).is_some()
    }

    pub fn placement(&self, graph: &AssetGraph, id: AssetId) -> Placement {
        if self.can_use_cdn(graph, id) {
            Placement::Cdn
        } else {
            Placement::Static
        }
    }

    /// Directory URL an asset with the given placement moves into.
    pub fn base_url(&self, placement: Placement) -> &Url {
        match (placement, &self.options.cdn) {
            (Placement::Cdn, Some(cdn)) => &cdn.base,
            _ => &self.options.static_base,
        }
    }

    fn hosting_cdn(&self, url: &Url) -> Option<&CdnRoot> {
        self.options
            .cdn
            .as_ref()
            .filter(|cdn| url.as_str().starts_with(cdn.base.as_str()))
    }
}

impl MovePolicy for PlacementPolicy {
    fn new_url(&self, graph: &AssetGraph, id: AssetId) -> Option<String> {
        let asset = graph.asset(id);
        asset.url()?;

        let base = self.base_url(self.placement(graph, id));
        Some(format!(
            "{}{}{}",
            base,
            asset.file_name(),
            asset.query_and_fragment()
        ))
    }

    /// Fix up the references to an asset that now lives on the CDN.
    fn after_move(&self, graph: &mut AssetGraph, id: AssetId) {
        let asset = graph.asset(id);
        let asset_type = asset.asset_type();
        let Some(cdn) = asset.url().and_then(|url| self.hosting_cdn(url)) else {
            return;
        };
        let protocol_relative = cdn.protocol_relative;

        for relation in graph.incoming(id) {
            if protocol_relative {
                graph.set_reference_style(relation.id, ReferenceStyle::ProtocolRelative);
            } else if asset_type == AssetType::SourceMap {
                // Source maps resolve relative to the mapped file, not the page.
                graph.set_reference_style(relation.id, ReferenceStyle::Absolute);
            }

            let crossorigin_tag = matches!(
                (relation.relation_type, asset_type),
                (RelationType::HtmlScript, AssetType::JavaScript)
                    | (RelationType::HtmlStyle, AssetType::Css)
            );
            if crossorigin_tag {
                graph.set_cross_origin(relation.id, true);
                graph.mark_dirty(relation.from);
            }
        }
    }
}
