use serde::{Deserialize, Serialize};

use super::{CatalogObject, base_url, required_text};
use crate::CatalogResult;
use crate::xml::{Element, XmlError, atom_link};

/// A named SLD style.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,
    pub href: String,
    /// File the SLD is stored in on the server, e.g. `population.sld`.
    pub filename: Option<String>,
}

impl Style {
    #[must_use]
    pub fn handle(service_url: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            href: format!("{service_url}/styles/{name}.xml"),
            filename: None,
        }
    }

    pub fn from_index(service_url: &str, node: &Element) -> CatalogResult<Self> {
        let name = required_text(node, "name")?;
        let mut style = Self::handle(service_url, name);
        if let Some(href) = atom_link(node) {
            style.href = href.to_string();
        }
        Ok(style)
    }

    /// Location of the raw SLD document.
    #[must_use]
    pub fn body_href(&self) -> String {
        format!("{}.sld", base_url(&self.href))
    }
}

impl CatalogObject for Style {
    fn href(&self) -> &str {
        &self.href
    }

    fn root_tag(&self) -> &'static str {
        "style"
    }

    fn encode(&self, root: &mut Element) {
        root.push_text("name", self.name.as_str());
        root.push_opt_text("filename", self.filename.as_deref());
    }

    fn apply(&mut self, doc: &Element) -> CatalogResult<()> {
        self.name = required_text(doc, "name")?.to_string();
        self.filename = doc.child_text("filename").map(ToString::to_string);
        Ok(())
    }
}

/// Content of a style's SLD document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sld {
    /// `NamedLayer/Name`.
    pub layer_name: Option<String>,
    /// `UserStyle/Title`, falling back to `UserStyle/Name`.
    pub title: Option<String>,
    pub body: String,
}

impl Sld {
    pub fn parse(body: &[u8]) -> Result<Self, XmlError> {
        let root = Element::parse(body)?;
        let layer = root.find("NamedLayer");
        let user_style = layer.and_then(|l| l.find("UserStyle"));
        Ok(Self {
            layer_name: layer
                .and_then(|l| l.child_text("Name"))
                .map(ToString::to_string),
            title: user_style
                .and_then(|s| s.child_text("Title").or_else(|| s.child_text("Name")))
                .map(ToString::to_string),
            body: String::from_utf8_lossy(body).into_owned(),
        })
    }
}
