use serde::{Deserialize, Serialize};

use super::{CatalogObject, ResourceKind, required_text};
use crate::CatalogResult;
use crate::xml::{Element, atom_link};

/// Reference from a layer to the resource it publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub kind: Option<ResourceKind>,
    pub name: String,
    pub href: String,
}

/// A published resource with its styling.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub href: String,
    /// `VECTOR`, `RASTER`, `WMS`, ...
    #[serde(rename = "type")]
    pub layer_type: Option<String>,
    pub default_style: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,
    pub resource: Option<ResourceLink>,
    pub attribution: Option<String>,
    pub enabled: Option<bool>,
}

impl Layer {
    #[must_use]
    pub fn handle(service_url: &str, name: &str) -> Self {
        Self::with_href(name, format!("{service_url}/layers/{name}.xml"))
    }

    pub fn from_index(service_url: &str, node: &Element) -> CatalogResult<Self> {
        let name = required_text(node, "name")?;
        Ok(match atom_link(node) {
            Some(href) => Self::with_href(name, href.to_string()),
            None => Self::handle(service_url, name),
        })
    }

    fn with_href(name: &str, href: String) -> Self {
        Self {
            name: name.to_string(),
            href,
            layer_type: None,
            default_style: None,
            styles: Vec::new(),
            resource: None,
            attribution: None,
            enabled: None,
        }
    }
}

fn style_ref(name: &str) -> Element {
    Element::new("style").with_child(Element::text_node("name", name))
}

impl CatalogObject for Layer {
    fn href(&self) -> &str {
        &self.href
    }

    fn root_tag(&self) -> &'static str {
        "layer"
    }

    fn encode(&self, root: &mut Element) {
        root.push_text("name", self.name.as_str());
        if let Some(style) = &self.default_style {
            root.push(Element::new("defaultStyle").with_child(Element::text_node("name", style.as_str())));
        }
        if !self.styles.is_empty() {
            let mut styles = Element::new("styles");
            for style in &self.styles {
                styles.push(style_ref(style));
            }
            root.push(styles);
        }
        if let Some(title) = &self.attribution {
            root.push(Element::new("attribution").with_child(Element::text_node("title", title.as_str())));
        }
        if let Some(enabled) = self.enabled {
            root.push_text("enabled", enabled.to_string());
        }
    }

    fn apply(&mut self, doc: &Element) -> CatalogResult<()> {
        self.name = required_text(doc, "name")?.to_string();
        self.layer_type = doc.child_text("type").map(ToString::to_string);
        self.default_style = doc.find_path("defaultStyle/name").map(|n| n.text.clone());
        self.styles = doc
            .find("styles")
            .map(|s| {
                s.find_all("style")
                    .filter_map(|style| style.child_text("name"))
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        self.resource = match doc.find("resource") {
            Some(node) => Some(ResourceLink {
                kind: node.attr("class").and_then(ResourceKind::from_tag),
                name: required_text(node, "name")?.to_string(),
                href: atom_link(node).unwrap_or_default().to_string(),
            }),
            None => None,
        };
        self.attribution = doc.find_path("attribution/title").map(|t| t.text.clone());
        self.enabled = doc.child_bool("enabled");
        Ok(())
    }
}
