use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CatalogObject, ResourceKind, Workspace, base_url, collection_url, required_text};
use crate::CatalogResult;
use crate::transport::Method;
use crate::xml::{Element, atom_link};

/// The three kinds of store GeoServer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreKind {
    /// Vector data: a database, a shapefile, ...
    #[serde(rename = "dataStore")]
    Data,
    /// Raster data: GeoTIFF, WorldImage, mosaics, ...
    #[serde(rename = "coverageStore")]
    Coverage,
    /// A cascaded remote WMS.
    #[serde(rename = "wmsStore")]
    Wms,
}

impl StoreKind {
    pub const ALL: [Self; 3] = [Self::Data, Self::Coverage, Self::Wms];

    /// Element name used in listings and documents.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Data => "dataStore",
            Self::Coverage => "coverageStore",
            Self::Wms => "wmsStore",
        }
    }

    /// Path segment of the collection under a workspace.
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Data => "datastores",
            Self::Coverage => "coveragestores",
            Self::Wms => "wmsstores",
        }
    }

    /// Kind of the resources published from this kind of store.
    #[must_use]
    pub fn resource_kind(self) -> ResourceKind {
        match self {
            Self::Data => ResourceKind::FeatureType,
            Self::Coverage => ResourceKind::Coverage,
            Self::Wms => ResourceKind::WmsLayer,
        }
    }
}

/// A configured connection to a data backend.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub kind: StoreKind,
    pub name: String,
    pub workspace: Workspace,
    pub href: String,
    /// Backend format, e.g. `Shapefile`, `PostGIS` or `GeoTIFF`.
    #[serde(rename = "type")]
    pub store_type: Option<String>,
    pub enabled: Option<bool>,
    pub description: Option<String>,
    /// Data stores only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub connection_parameters: BTreeMap<String, String>,
    /// Coverage stores only: location of the raster.
    pub url: Option<String>,
    /// WMS stores only.
    pub capabilities_url: Option<String>,
    #[serde(skip)]
    saved: bool,
}

impl Store {
    fn handle(kind: StoreKind, name: &str, workspace: &Workspace, href: String, saved: bool) -> Self {
        Self {
            kind,
            name: name.to_string(),
            workspace: workspace.clone(),
            href,
            store_type: None,
            enabled: None,
            description: None,
            connection_parameters: BTreeMap::new(),
            url: None,
            capabilities_url: None,
            saved,
        }
    }

    /// Build a store from an entry of a workspace's store listing.
    pub fn from_index(kind: StoreKind, workspace: &Workspace, node: &Element) -> CatalogResult<Self> {
        let name = required_text(node, "name")?;
        let href = atom_link(node).map_or_else(
            || workspace.store_href(kind, name),
            ToString::to_string,
        );
        Ok(Self::handle(kind, name, workspace, href, true))
    }

    /// A store that does not exist on the server yet. Saving it creates it.
    #[must_use]
    pub fn unsaved(kind: StoreKind, name: &str, workspace: &Workspace) -> Self {
        let href = workspace.store_href(kind, name);
        let mut store = Self::handle(kind, name, workspace, href, false);
        store.enabled = Some(true);
        store
    }

    /// The wire tag of this store's kind, e.g. `dataStore`.
    #[must_use]
    pub fn resource_type(&self) -> &'static str {
        self.kind.tag()
    }

    /// Listing of the resources published from this store.
    #[must_use]
    pub fn resources_url(&self) -> String {
        format!(
            "{}/{}.xml",
            base_url(&self.href),
            self.kind.resource_kind().collection()
        )
    }

    /// Location of the resource `name` inside this store.
    #[must_use]
    pub fn resource_href(&self, name: &str) -> String {
        format!(
            "{}/{}/{name}.xml",
            base_url(&self.href),
            self.kind.resource_kind().collection()
        )
    }

    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.saved
    }
}

impl CatalogObject for Store {
    fn href(&self) -> &str {
        &self.href
    }

    fn root_tag(&self) -> &'static str {
        self.kind.tag()
    }

    fn save_method(&self) -> Method {
        if self.saved { Method::Put } else { Method::Post }
    }

    fn save_url(&self) -> &str {
        if self.saved {
            &self.href
        } else {
            collection_url(&self.href)
        }
    }

    fn mark_saved(&mut self) {
        self.saved = true;
    }

    fn encode(&self, root: &mut Element) {
        root.push_text("name", self.name.as_str());
        root.push(Element::new("workspace").with_child(Element::text_node(
            "name",
            self.workspace.name.as_str(),
        )));
        root.push_opt_text("description", self.description.as_deref());
        root.push_opt_text("type", self.store_type.as_deref());
        if let Some(enabled) = self.enabled {
            root.push_text("enabled", enabled.to_string());
        }
        match self.kind {
            StoreKind::Data => {
                let mut params = Element::new("connectionParameters");
                for (key, value) in &self.connection_parameters {
                    params.push(Element::text_node("entry", value.as_str()).with_attr("key", key.as_str()));
                }
                root.push(params);
            }
            StoreKind::Coverage => root.push_opt_text("url", self.url.as_deref()),
            StoreKind::Wms => root.push_opt_text("capabilitiesURL", self.capabilities_url.as_deref()),
        }
    }

    fn apply(&mut self, doc: &Element) -> CatalogResult<()> {
        self.name = required_text(doc, "name")?.to_string();
        self.store_type = doc.child_text("type").map(ToString::to_string);
        self.enabled = doc.child_bool("enabled");
        self.description = doc.child_text("description").map(ToString::to_string);
        self.connection_parameters = doc
            .find("connectionParameters")
            .map(|params| {
                params
                    .find_all("entry")
                    .filter_map(|entry| Some((entry.attr("key")?.to_string(), entry.text.clone())))
                    .collect()
            })
            .unwrap_or_default();
        self.url = doc.child_text("url").map(ToString::to_string);
        self.capabilities_url = doc.child_text("capabilitiesURL").map(ToString::to_string);
        self.saved = true;
        Ok(())
    }
}
