use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CatalogObject, collection_url, required_text};
use crate::transport::Method;
use crate::xml::{BoundingBox, Element, atom_link};
use crate::CatalogResult;

/// Ordered stack of layers rendered together.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGroup {
    pub name: String,
    pub href: String,
    pub layers: Vec<String>,
    /// One entry per layer; `None` renders the layer with its default style.
    pub styles: Vec<Option<String>>,
    pub bounds: Option<BoundingBox>,
    #[serde(skip)]
    saved: bool,
}

impl LayerGroup {
    #[must_use]
    pub fn handle(service_url: &str, name: &str) -> Self {
        Self::with_href(name, format!("{service_url}/layergroups/{name}.xml"), true)
    }

    pub fn from_index(service_url: &str, node: &Element) -> CatalogResult<Self> {
        let name = required_text(node, "name")?;
        Ok(match atom_link(node) {
            Some(href) => Self::with_href(name, href.to_string(), true),
            None => Self::handle(service_url, name),
        })
    }

    /// A group that is created on the server by its first save.
    #[must_use]
    pub fn unsaved(
        service_url: &str,
        name: &str,
        layers: Vec<String>,
        styles: Vec<Option<String>>,
        bounds: Option<BoundingBox>,
    ) -> Self {
        let mut group = Self::with_href(name, format!("{service_url}/layergroups/{name}.xml"), false);
        group.layers = layers;
        group.styles = styles;
        group.bounds = bounds;
        group
    }

    fn with_href(name: &str, href: String, saved: bool) -> Self {
        Self {
            name: name.to_string(),
            href,
            layers: Vec::new(),
            styles: Vec::new(),
            bounds: None,
            saved,
        }
    }

    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.saved
    }
}

/// Name of a `<layer>`/`<published>`/`<style>` entry, written either as text or as a `<name>` child.
fn entry_name(node: &Element) -> Option<String> {
    let name = node
        .child_text("name")
        .unwrap_or(node.text.as_str())
        .trim();
    (!name.is_empty()).then(|| name.to_string())
}

impl CatalogObject for LayerGroup {
    fn href(&self) -> &str {
        &self.href
    }

    fn root_tag(&self) -> &'static str {
        "layerGroup"
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
        let mut layers = Element::new("layers");
        for layer in &self.layers {
            layers.push(Element::new("layer").with_child(Element::text_node("name", layer.as_str())));
        }
        root.push(layers);
        let mut styles = Element::new("styles");
        for style in &self.styles {
            let mut node = Element::new("style");
            if let Some(style) = style {
                node.push_text("name", style.as_str());
            }
            styles.push(node);
        }
        root.push(styles);
        if let Some(bounds) = &self.bounds {
            root.push(bounds.to_element("bounds"));
        }
    }

    fn apply(&mut self, doc: &Element) -> CatalogResult<()> {
        self.name = required_text(doc, "name")?.to_string();
        self.layers = if let Some(layers) = doc.find("layers") {
            layers.find_all("layer").filter_map(entry_name).collect()
        } else if let Some(published) = doc.find("publishables") {
            published.find_all("published").filter_map(entry_name).collect()
        } else {
            Vec::new()
        };
        self.styles = doc
            .find("styles")
            .map(|s| s.find_all("style").map(entry_name).collect())
            .unwrap_or_default();
        if !self.styles.is_empty() && self.styles.len() != self.layers.len() {
            warn!(
                "Layer group {} lists {} styles for {} layers",
                self.name,
                self.styles.len(),
                self.layers.len()
            );
        }
        self.bounds = BoundingBox::from_element(doc.find("bounds"));
        self.saved = true;
        Ok(())
    }
}
