//! Minimal owned XML tree for the REST configuration documents.
//!
//! GeoServer documents are small, namespace-light and data-only, so a plain element
//! tree (name, attributes, text, children) read with `quick-xml` is all the catalog
//! needs. Child lookups match on the local name, ignoring any prefix.

use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Errors produced while reading a document.
#[derive(thiserror::Error, Debug)]
pub enum XmlError {
    #[error(transparent)]
    Parse(#[from] quick_xml::Error),

    #[error(transparent)]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("document has no root element")]
    NoRootElement,
}

/// An XML element with its attributes, text content and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

fn local(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// An element holding only text, e.g. `<title>States</title>`.
    #[must_use]
    pub fn text_node(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append `<name>text</name>`.
    pub fn push_text(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.children.push(Self::text_node(name, text));
    }

    /// Append `<name>text</name>` when a value is present.
    pub fn push_opt_text(&mut self, name: &str, text: Option<&str>) {
        if let Some(text) = text {
            self.push_text(name, text);
        }
    }

    #[must_use]
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given local name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == name)
    }

    /// All children with the given local name, in document order.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.local_name() == name)
    }

    /// Follow a `/`-separated path of local names, e.g. `"attribution/title"`.
    #[must_use]
    pub fn find_path(&self, path: &str) -> Option<&Element> {
        path.split('/').try_fold(self, |el, step| el.find(step))
    }

    /// Text of the first matching child, `None` when the child is missing.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.find(name).map(|c| c.text.as_str())
    }

    /// Boolean value of a child such as `<enabled>true</enabled>`.
    #[must_use]
    pub fn child_bool(&self, name: &str) -> Option<bool> {
        self.child_text(name)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    /// Parse a complete document and return its root element.
    pub fn parse(bytes: &[u8]) -> Result<Self, XmlError> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => stack.push(open(&start)?),
                Event::Empty(start) => attach(&mut stack, &mut root, open(&start)?),
                Event::End(_) => {
                    if let Some(done) = stack.pop() {
                        attach(&mut stack, &mut root, done);
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        root.ok_or(XmlError::NoRootElement)
    }

    /// Serialize this element and its subtree without an XML declaration.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            let _ = write!(out, " {key}=\"{}\"", escape(value.as_str()));
        }
        if self.text.is_empty() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        out.push_str(&escape(self.text.as_str()));
        for child in &self.children {
            child.write_into(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn open(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// The navigation link of a listing entry.
///
/// Entries either carry an `href` attribute themselves or an `atom:link` child.
#[must_use]
pub fn atom_link(node: &Element) -> Option<&str> {
    node.attr("href")
        .or_else(|| node.find("link").and_then(|link| link.attr("href")))
}

/// Build the `atom:link` element GeoServer uses to reference other objects.
#[must_use]
pub fn atom_link_element(href: &str) -> Element {
    Element::new("atom:link")
        .with_attr("rel", "alternate")
        .with_attr("href", href)
        .with_attr("type", "application/xml")
        .with_attr("xmlns:atom", ATOM_NAMESPACE)
}

/// Axis-aligned extent as reported by the server.
///
/// Coordinates are kept as the server's decimal strings, so a save writes back
/// exactly what was read.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub minx: String,
    pub maxx: String,
    pub miny: String,
    pub maxy: String,
    pub crs: Option<String>,
}

impl BoundingBox {
    #[must_use]
    pub fn new(minx: &str, maxx: &str, miny: &str, maxy: &str, crs: Option<&str>) -> Self {
        Self {
            minx: minx.to_string(),
            maxx: maxx.to_string(),
            miny: miny.to_string(),
            maxy: maxy.to_string(),
            crs: crs.map(ToString::to_string),
        }
    }

    /// Read a box from an element with `minx`, `maxx`, `miny`, `maxy` and optional `crs` children.
    ///
    /// Returns `None` when the element is absent or any coordinate is missing.
    #[must_use]
    pub fn from_element(node: Option<&Element>) -> Option<Self> {
        let node = node?;
        Some(Self {
            minx: node.child_text("minx")?.to_string(),
            maxx: node.child_text("maxx")?.to_string(),
            miny: node.child_text("miny")?.to_string(),
            maxy: node.child_text("maxy")?.to_string(),
            crs: node.child_text("crs").map(ToString::to_string),
        })
    }

    /// Build `<name>` holding this box.
    #[must_use]
    pub fn to_element(&self, name: &str) -> Element {
        let mut node = Element::new(name);
        node.push_text("minx", self.minx.as_str());
        node.push_text("maxx", self.maxx.as_str());
        node.push_text("miny", self.miny.as_str());
        node.push_text("maxy", self.maxy.as_str());
        if let Some(crs) = &self.crs {
            node.push(Element::text_node("crs", crs.as_str()).with_attr("class", "projected"));
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    const STATES: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <featureType>
          <name>states</name>
          <title>USA Population &amp; Area</title>
          <keywords>
            <string>census</string>
            <string>united</string>
          </keywords>
          <nativeBoundingBox>
            <minx>-124.73142200000001</minx>
            <maxx>-66.969849</maxx>
            <miny>24.955967</miny>
            <maxy>49.371735</maxy>
            <crs>EPSG:4326</crs>
          </nativeBoundingBox>
          <store class="dataStore">
            <name>states_shapefile</name>
            <atom:link xmlns:atom="http://www.w3.org/2005/Atom" rel="alternate" href="http://gs/rest/workspaces/topp/datastores/states_shapefile.xml" type="application/xml"/>
          </store>
        </featureType>
    "#};

    #[test]
    fn parse_nested_document() {
        let root = Element::parse(STATES.as_bytes()).unwrap();
        assert_eq!(root.name, "featureType");
        assert_eq!(root.child_text("name"), Some("states"));
        assert_eq!(root.child_text("title"), Some("USA Population & Area"));
        let keywords: Vec<_> = root
            .find("keywords")
            .unwrap()
            .find_all("string")
            .map(|k| k.text.as_str())
            .collect();
        assert_eq!(keywords, ["census", "united"]);
        assert_eq!(
            root.find("store").and_then(atom_link),
            Some("http://gs/rest/workspaces/topp/datastores/states_shapefile.xml")
        );
        assert_eq!(root.find("store").unwrap().attr("class"), Some("dataStore"));
    }

    #[test]
    fn bbox_from_element() {
        let root = Element::parse(STATES.as_bytes()).unwrap();
        let bbox = BoundingBox::from_element(root.find("nativeBoundingBox")).unwrap();
        assert_eq!(
            bbox,
            BoundingBox::new(
                "-124.73142200000001",
                "-66.969849",
                "24.955967",
                "49.371735",
                Some("EPSG:4326")
            )
        );
        assert_eq!(BoundingBox::from_element(root.find("latLonBoundingBox")), None);
    }

    #[test]
    fn bbox_missing_coordinate() {
        let node = Element::parse(b"<b><minx>1</minx><maxx>2</maxx><miny>3</miny></b>").unwrap();
        assert_eq!(BoundingBox::from_element(Some(&node)), None);
    }

    #[test]
    fn bbox_round_trip_text() {
        let bbox = BoundingBox::new("0", "10", "-5", "5", Some("EPSG:3857"));
        insta::assert_snapshot!(bbox.to_element("bounds").to_xml(), @r#"<bounds><minx>0</minx><maxx>10</maxx><miny>-5</miny><maxy>5</maxy><crs class="projected">EPSG:3857</crs></bounds>"#);
        let no_crs = BoundingBox::new("0", "1", "0", "1", None);
        insta::assert_snapshot!(no_crs.to_element("bounds").to_xml(), @"<bounds><minx>0</minx><maxx>1</maxx><miny>0</miny><maxy>1</maxy></bounds>");
    }

    #[test]
    fn atom_link_prefers_href_attribute() {
        let node = Element::new("layer").with_attr("href", "http://direct");
        assert_eq!(atom_link(&node), Some("http://direct"));
        let node = Element::new("layer").with_child(atom_link_element("http://nested"));
        assert_eq!(atom_link(&node), Some("http://nested"));
        assert_eq!(atom_link(&Element::new("layer")), None);
    }

    #[test]
    fn serialize_escapes_text_and_attributes() {
        let doc = Element::new("featureType")
            .with_child(Element::text_node("title", "Roads <& rails>"))
            .with_child(atom_link_element("http://gs/rest?a=1&b=2"));
        insta::assert_snapshot!(doc.to_xml(), @r#"<featureType><title>Roads &lt;&amp; rails&gt;</title><atom:link rel="alternate" href="http://gs/rest?a=1&amp;b=2" type="application/xml" xmlns:atom="http://www.w3.org/2005/Atom"/></featureType>"#);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Element::parse(b"").is_err());
        assert!(Element::parse(b"<a><b></a>").is_err());
    }

    #[test]
    fn find_path_and_bool() {
        let root = Element::parse(
            b"<layer><attribution><title>OSM</title></attribution><enabled>TRUE</enabled></layer>",
        )
        .unwrap();
        assert_eq!(
            root.find_path("attribution/title").map(|t| t.text.as_str()),
            Some("OSM")
        );
        assert_eq!(root.child_bool("enabled"), Some(true));
        assert_eq!(root.child_bool("queryable"), None);
    }
}
