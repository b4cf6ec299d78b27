use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CatalogObject, StoreKind, base_url, required_text};
use crate::xml::{Element, atom_link};
use crate::{CatalogError, CatalogResult};

/// Logical grouping of stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    pub href: String,
}

impl Workspace {
    #[must_use]
    pub fn new(service_url: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            href: format!("{service_url}/workspaces/{name}.xml"),
        }
    }

    /// Build a workspace from an entry of `/workspaces.xml`.
    pub fn from_index(node: &Element) -> CatalogResult<Self> {
        let name = required_text(node, "name")?;
        let href = atom_link(node).ok_or_else(|| CatalogError::MissingElement {
            element: node.name.clone(),
            child: "atom:link",
        })?;
        Ok(Self {
            name: name.to_string(),
            href: href.to_string(),
        })
    }

    /// Listing of this workspace's stores of one kind.
    #[must_use]
    pub fn stores_url(&self, kind: StoreKind) -> String {
        format!("{}/{}.xml", base_url(&self.href), kind.collection())
    }

    #[must_use]
    pub fn datastores_url(&self) -> String {
        self.stores_url(StoreKind::Data)
    }

    #[must_use]
    pub fn coveragestores_url(&self) -> String {
        self.stores_url(StoreKind::Coverage)
    }

    #[must_use]
    pub fn wmsstores_url(&self) -> String {
        self.stores_url(StoreKind::Wms)
    }

    /// Location of the store `name` of the given kind.
    #[must_use]
    pub fn store_href(&self, kind: StoreKind, name: &str) -> String {
        format!("{}/{}/{name}.xml", base_url(&self.href), kind.collection())
    }
}

impl CatalogObject for Workspace {
    fn href(&self) -> &str {
        &self.href
    }

    fn root_tag(&self) -> &'static str {
        "workspace"
    }

    fn encode(&self, root: &mut Element) {
        root.push_text("name", self.name.as_str());
    }

    fn apply(&mut self, doc: &Element) -> CatalogResult<()> {
        self.name = required_text(doc, "name")?.to_string();
        Ok(())
    }
}

impl fmt::Display for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_urls() {
        let ws = Workspace::new("http://gs/rest", "topp");
        assert_eq!(ws.href, "http://gs/rest/workspaces/topp.xml");
        assert_eq!(ws.datastores_url(), "http://gs/rest/workspaces/topp/datastores.xml");
        assert_eq!(
            ws.coveragestores_url(),
            "http://gs/rest/workspaces/topp/coveragestores.xml"
        );
        assert_eq!(ws.wmsstores_url(), "http://gs/rest/workspaces/topp/wmsstores.xml");
        assert_eq!(
            ws.store_href(StoreKind::Data, "states"),
            "http://gs/rest/workspaces/topp/datastores/states.xml"
        );
    }

    #[test]
    fn from_index_requires_link() {
        let node = Element::parse(b"<workspace><name>sf</name></workspace>").unwrap();
        assert!(matches!(
            Workspace::from_index(&node),
            Err(CatalogError::MissingElement { child: "atom:link", .. })
        ));
    }

    #[test]
    fn message() {
        let ws = Workspace::new("http://gs/rest", "acme");
        assert_eq!(ws.message(), "<workspace><name>acme</name></workspace>");
    }
}
