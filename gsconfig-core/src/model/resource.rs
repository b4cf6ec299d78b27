use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CatalogObject, Store, required_text};
use crate::CatalogResult;
use crate::xml::{BoundingBox, Element, atom_link};

/// The publishable content of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    FeatureType,
    Coverage,
    WmsLayer,
}

impl ResourceKind {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::FeatureType => "featureType",
            Self::Coverage => "coverage",
            Self::WmsLayer => "wmsLayer",
        }
    }

    /// Path segment of the collection under a store.
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::FeatureType => "featuretypes",
            Self::Coverage => "coverages",
            Self::WmsLayer => "wmslayers",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "featureType" => Some(Self::FeatureType),
            "coverage" => Some(Self::Coverage),
            "wmsLayer" => Some(Self::WmsLayer),
            _ => None,
        }
    }
}

/// How the declared and native projections of a resource are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectionPolicy {
    ForceDeclared,
    ForceNative,
    Reproject,
}

impl fmt::Display for ProjectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ForceDeclared => "FORCE_DECLARED",
            Self::ForceNative => "FORCE_NATIVE",
            Self::Reproject => "REPROJECT",
        })
    }
}

impl FromStr for ProjectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FORCE_DECLARED" => Ok(Self::ForceDeclared),
            "FORCE_NATIVE" => Ok(Self::ForceNative),
            "REPROJECT" => Ok(Self::Reproject),
            _ => Err(format!(
                "Invalid projection policy '{s}'. Valid options: FORCE_DECLARED, FORCE_NATIVE, REPROJECT"
            )),
        }
    }
}

/// A feature type, coverage or cascaded WMS layer.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub name: String,
    pub workspace: String,
    pub store: String,
    pub href: String,
    pub native_name: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    pub native_bbox: Option<BoundingBox>,
    pub latlon_bbox: Option<BoundingBox>,
    /// Declared SRS, e.g. `EPSG:4326`.
    pub projection: Option<String>,
    pub projection_policy: Option<ProjectionPolicy>,
    pub enabled: Option<bool>,
    /// Attribute names, feature types only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
}

impl Resource {
    /// Unpopulated resource named `name` inside `store`.
    #[must_use]
    pub fn handle(store: &Store, name: &str) -> Self {
        Self::with_href(store, name, store.resource_href(name))
    }

    /// Build a resource from an entry of a store's resource listing.
    pub fn from_index(store: &Store, node: &Element) -> CatalogResult<Self> {
        let name = required_text(node, "name")?;
        let href = atom_link(node).map_or_else(|| store.resource_href(name), ToString::to_string);
        Ok(Self::with_href(store, name, href))
    }

    fn with_href(store: &Store, name: &str, href: String) -> Self {
        Self {
            kind: store.kind.resource_kind(),
            name: name.to_string(),
            workspace: store.workspace.name.clone(),
            store: store.name.clone(),
            href,
            native_name: None,
            title: None,
            abstract_text: None,
            keywords: Vec::new(),
            native_bbox: None,
            latlon_bbox: None,
            projection: None,
            projection_policy: None,
            enabled: None,
            attributes: Vec::new(),
        }
    }
}

impl CatalogObject for Resource {
    fn href(&self) -> &str {
        &self.href
    }

    fn root_tag(&self) -> &'static str {
        self.kind.tag()
    }

    fn encode(&self, root: &mut Element) {
        root.push_text("name", self.name.as_str());
        root.push_opt_text("nativeName", self.native_name.as_deref());
        root.push_opt_text("title", self.title.as_deref());
        root.push_opt_text("abstract", self.abstract_text.as_deref());
        if !self.keywords.is_empty() {
            let mut keywords = Element::new("keywords");
            for keyword in &self.keywords {
                keywords.push_text("string", keyword.as_str());
            }
            root.push(keywords);
        }
        if let Some(bbox) = &self.native_bbox {
            root.push(bbox.to_element("nativeBoundingBox"));
        }
        if let Some(bbox) = &self.latlon_bbox {
            root.push(bbox.to_element("latLonBoundingBox"));
        }
        root.push_opt_text("srs", self.projection.as_deref());
        if let Some(policy) = self.projection_policy {
            root.push_text("projectionPolicy", policy.to_string());
        }
        if let Some(enabled) = self.enabled {
            root.push_text("enabled", enabled.to_string());
        }
    }

    fn apply(&mut self, doc: &Element) -> CatalogResult<()> {
        if let Some(kind) = ResourceKind::from_tag(doc.local_name()) {
            self.kind = kind;
        }
        self.name = required_text(doc, "name")?.to_string();
        self.native_name = doc.child_text("nativeName").map(ToString::to_string);
        self.title = doc.child_text("title").map(ToString::to_string);
        self.abstract_text = doc.child_text("abstract").map(ToString::to_string);
        self.keywords = doc
            .find("keywords")
            .map(|k| k.find_all("string").map(|s| s.text.clone()).collect())
            .unwrap_or_default();
        self.native_bbox = BoundingBox::from_element(doc.find("nativeBoundingBox"));
        self.latlon_bbox = BoundingBox::from_element(doc.find("latLonBoundingBox"));
        self.projection = doc.child_text("srs").map(ToString::to_string);
        self.projection_policy = doc.child_text("projectionPolicy").and_then(|p| {
            p.parse()
                .map_err(|e| warn!("{e} on resource {}", self.href))
                .ok()
        });
        self.enabled = doc.child_bool("enabled");
        self.attributes = doc
            .find("attributes")
            .map(|a| {
                a.find_all("attribute")
                    .filter_map(|attr| attr.child_text("name"))
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(())
    }
}
