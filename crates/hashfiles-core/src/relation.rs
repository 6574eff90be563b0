//! Relations - directed references from one asset's content to another asset

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::asset::AssetId;

/// Stable identity of a relation within one [`crate::AssetGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(pub(crate) usize);

impl RelationId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relation#{}", self.0)
    }
}

/// Closed set of reference kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// `<script src>`
    HtmlScript,
    /// `<link rel=stylesheet>` or `<style>`
    HtmlStyle,
    HtmlAnchor,
    HtmlMetaRefresh,
    HtmlImage,
    HtmlIFrame,
    HtmlPrefetchLink,
    HtmlPreloadLink,
    HtmlServiceWorkerRegistration,
    /// Redirect declared by the server configuration
    FileRedirect,
    JavaScriptServiceWorkerRegistration,
    JavaScriptWebWorker,
    /// URL computed at runtime by script code
    JavaScriptStaticUrl,
    CssImport,
    CssImage,
    /// `sourceMappingURL` comment pointing at a source map
    SourceMappingUrl,
    /// The `file` property of a source map, pointing back at the mapped file
    SourceMapFile,
    SourceMapSource,
    Other,
}

impl RelationType {
    /// Registrations that tie a script to a stable, origin-anchored URL.
    pub const WORKER_REGISTRATIONS: &'static [RelationType] = &[
        RelationType::HtmlServiceWorkerRegistration,
        RelationType::JavaScriptServiceWorkerRegistration,
        RelationType::JavaScriptWebWorker,
    ];

    /// References a human or a bookmark can follow.
    pub const NAVIGATIONS: &'static [RelationType] = &[
        RelationType::HtmlAnchor,
        RelationType::HtmlMetaRefresh,
        RelationType::FileRedirect,
    ];

    pub const RESOURCE_HINTS: &'static [RelationType] =
        &[RelationType::HtmlPrefetchLink, RelationType::HtmlPreloadLink];

    /// Consumers that can only fetch from their own origin.
    pub const SAME_ORIGIN_ONLY: &'static [RelationType] = &[
        RelationType::JavaScriptStaticUrl,
        RelationType::HtmlServiceWorkerRegistration,
        RelationType::JavaScriptServiceWorkerRegistration,
    ];

    pub fn is_in(self, set: &[RelationType]) -> bool {
        set.contains(&self)
    }

    /// Render a reference to `href` the way it appears in the source content.
    pub(crate) fn render(self, href: &str, cross_origin: bool) -> String {
        let crossorigin = if cross_origin {
            " crossorigin=\"anonymous\""
        } else {
            ""
        };

        match self {
            RelationType::HtmlScript => format!("<script src=\"{href}\"{crossorigin}></script>"),
            RelationType::HtmlStyle => {
                format!("<link rel=\"stylesheet\" href=\"{href}\"{crossorigin}>")
            }
            RelationType::HtmlAnchor => format!("<a href=\"{href}\">"),
            RelationType::HtmlMetaRefresh => {
                format!("<meta http-equiv=\"refresh\" content=\"0; url={href}\">")
            }
            RelationType::HtmlImage => format!("<img src=\"{href}\">"),
            RelationType::HtmlIFrame => format!("<iframe src=\"{href}\"></iframe>"),
            RelationType::HtmlPrefetchLink => format!("<link rel=\"prefetch\" href=\"{href}\">"),
            RelationType::HtmlPreloadLink => format!("<link rel=\"preload\" href=\"{href}\">"),
            RelationType::HtmlServiceWorkerRegistration => {
                format!("<script>navigator.serviceWorker.register('{href}')</script>")
            }
            RelationType::FileRedirect => format!("Location: {href}"),
            RelationType::JavaScriptServiceWorkerRegistration => {
                format!("navigator.serviceWorker.register('{href}')")
            }
            RelationType::JavaScriptWebWorker => format!("new Worker('{href}')"),
            RelationType::JavaScriptStaticUrl => format!("'{href}'.toString('url')"),
            RelationType::CssImport => format!("@import \"{href}\";"),
            RelationType::CssImage => format!("url({href})"),
            RelationType::SourceMappingUrl => format!("//# sourceMappingURL={href}"),
            RelationType::SourceMapFile => format!("\"file\":\"{href}\""),
            RelationType::SourceMapSource => format!("\"{href}\""),
            RelationType::Other => href.to_string(),
        }
    }

    /// Markup wrapped around an inline target serialized in place.
    pub(crate) fn inline_wrapper(self) -> (&'static str, &'static str) {
        match self {
            RelationType::HtmlScript => ("<script>", "</script>"),
            RelationType::HtmlStyle => ("<style>", "</style>"),
            _ => ("", ""),
        }
    }
}

/// How an href is written into the source content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceStyle {
    /// Relative to the referencing file, or absolute across origins.
    #[default]
    Relative,
    /// Path from the site root (`/static/a.css`).
    RootRelative,
    Absolute,
    /// Absolute without the scheme (`//cdn.example.com/a.css`).
    ProtocolRelative,
}

/// Edge weight stored in the graph.
#[derive(Debug, Clone)]
pub(crate) struct Relation {
    pub relation_type: RelationType,
    pub reference_style: ReferenceStyle,
    pub cross_origin: bool,
}

/// Owned snapshot of a relation together with its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationView {
    pub id: RelationId,
    pub from: AssetId,
    pub to: AssetId,
    pub relation_type: RelationType,
    pub reference_style: ReferenceStyle,
    pub cross_origin: bool,
}
