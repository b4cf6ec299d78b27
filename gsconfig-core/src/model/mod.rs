//! Typed views of catalog entries.
//!
//! Every object is materialized in two steps: listings produce a lightweight handle
//! (name + REST location), and [`Catalog::refresh`](crate::Catalog::refresh) reads the
//! object's document and fills in the typed fields. Field access never touches the
//! network.

mod attribute;
mod layer;
mod layergroup;
mod resource;
mod store;
mod style;
mod workspace;

pub use attribute::{AttributeSpec, AttributeType, GeometryType, attributes_element};
pub use layer::{Layer, ResourceLink};
pub use layergroup::LayerGroup;
pub use resource::{ProjectionPolicy, Resource, ResourceKind};
pub use store::{Store, StoreKind};
pub use style::{Sld, Style};
pub use workspace::Workspace;

use crate::CatalogResult;
use crate::transport::Method;
use crate::xml::Element;

/// An object with a REST location that can be read, saved and deleted.
pub trait CatalogObject {
    /// URL of the object's XML representation.
    fn href(&self) -> &str;

    /// Name of the root element of the object's document, e.g. `featureType`.
    fn root_tag(&self) -> &'static str;

    /// Verb used by [`Catalog::save`](crate::Catalog::save).
    fn save_method(&self) -> Method {
        Method::Put
    }

    /// URL a save is sent to.
    fn save_url(&self) -> &str {
        self.href()
    }

    /// Called after a successful save, so the next save updates instead of creating.
    fn mark_saved(&mut self) {}

    /// Write the object's editable fields below `root`.
    fn encode(&self, root: &mut Element);

    /// Replace the object's fields with the content of its fetched document.
    fn apply(&mut self, doc: &Element) -> CatalogResult<()>;

    /// Complete XML document sent on save.
    fn message(&self) -> String {
        let mut root = Element::new(self.root_tag());
        self.encode(&mut root);
        root.to_xml()
    }
}

/// Strip the `.xml` suffix of a REST location, leaving the path children hang off.
pub(crate) fn base_url(href: &str) -> &str {
    href.strip_suffix(".xml").unwrap_or(href)
}

/// Collection an object lives in, e.g. `…/layergroups` for `…/layergroups/x.xml`.
pub(crate) fn collection_url(href: &str) -> &str {
    href.rsplit_once('/').map_or(href, |(parent, _)| parent)
}

/// Text of a required child of a listing entry.
pub(crate) fn required_text<'a>(node: &'a Element, child: &'static str) -> CatalogResult<&'a str> {
    node.child_text(child)
        .ok_or_else(|| crate::CatalogError::MissingElement {
            element: node.name.clone(),
            child,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_helpers() {
        let href = "http://gs/rest/workspaces/topp/datastores/states.xml";
        assert_eq!(base_url(href), "http://gs/rest/workspaces/topp/datastores/states");
        assert_eq!(collection_url(href), "http://gs/rest/workspaces/topp/datastores");
        assert_eq!(base_url("http://gs/rest/x"), "http://gs/rest/x");
    }

    #[test]
    fn required_text_reports_missing_child() {
        let node = Element::new("dataStore");
        let err = required_text(&node, "name").unwrap_err();
        assert_eq!(err.to_string(), "Element <dataStore> is missing a <name> child");
    }
}
