//! The [`Catalog`] façade: name resolution, reads, writes and uploads.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use url::form_urlencoded;

use crate::bundle::{BundleSources, prepare_upload_bundle};
use crate::cache::{CachedBody, ResponseCache, SystemClock};
use crate::config::ConnectionSettings;
use crate::model::{
    AttributeSpec, CatalogObject, Layer, LayerGroup, Resource, Sld, Store, StoreKind, Style,
    Workspace, attributes_element, base_url,
};
use crate::transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, SLD_CONTENT_TYPE,
    TIFF_CONTENT_TYPE, XML_CONTENT_TYPE, ZIP_CONTENT_TYPE,
};
use crate::xml::{BoundingBox, Element};
use crate::{CatalogError, CatalogResult};

/// Outcome of resolving a name inside one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    /// More than one entry matched; the message says which.
    Ambiguous(String),
}

/// Data for a file upload.
#[derive(Debug)]
pub enum UploadData {
    /// A ready-made archive (or raw GeoTIFF for coverages) on disk. Never deleted.
    Archive(PathBuf),
    /// Archive content (or raw GeoTIFF for coverages) held in memory.
    Bytes(Vec<u8>),
    /// Parts to package with [`prepare_upload_bundle`] under the store name.
    Bundle(BundleSources),
}

impl UploadData {
    fn into_body(self, name: &str) -> CatalogResult<Vec<u8>> {
        match self {
            Self::Archive(path) => read_file(&path),
            Self::Bytes(bytes) => Ok(bytes),
            Self::Bundle(sources) => {
                let bundle = prepare_upload_bundle(name, sources)?;
                read_file(&bundle)
            }
        }
    }
}

/// Local file header magic of a ZIP archive.
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

fn read_file(path: &Path) -> CatalogResult<Vec<u8>> {
    fs::read(path).map_err(|e| CatalogError::Io(e, path.display().to_string()))
}

/// Status a write must answer with.
#[derive(Debug, Clone, Copy)]
enum Expect {
    Success,
    Created,
}

impl Expect {
    fn accepts(self, status: u16) -> bool {
        match self {
            Self::Success => (200..300).contains(&status),
            Self::Created => status == 201,
        }
    }
}

/// Query string for file uploads, including the leading `?` when non-empty.
fn upload_query(overwrite: bool, charset: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if overwrite {
        query.append_pair("update", "overwrite");
    }
    if let Some(charset) = charset {
        query.append_pair("charset", charset);
    }
    let query = query.finish();
    if query.is_empty() {
        query
    } else {
        format!("?{query}")
    }
}

/// Session with one GeoServer REST endpoint.
///
/// Owns the HTTP transport and a short-lived cache of GET responses. Every
/// operation is blocking, and a catalog is meant to be used from one thread.
#[derive(Debug)]
pub struct Catalog {
    service_url: String,
    transport: Box<dyn HttpTransport>,
    cache: RefCell<ResponseCache>,
}

impl Catalog {
    /// Connect to `url` (e.g. `http://localhost:8080/geoserver/rest`) with Basic authentication.
    pub fn new(url: &str, username: &str, password: &str) -> CatalogResult<Self> {
        Ok(Self::with_transport(
            url,
            ReqwestTransport::new(username, password)?,
            ResponseCache::default(),
        ))
    }

    pub fn from_settings(settings: &ConnectionSettings) -> CatalogResult<Self> {
        let cache = ResponseCache::new(settings.cache_ttl, Box::new(SystemClock));
        Ok(Self::with_transport(
            &settings.url,
            ReqwestTransport::new(settings.username.as_str(), settings.password.as_str())?,
            cache,
        ))
    }

    /// Build a catalog on top of any transport, e.g. [`FauxTransport`](crate::FauxTransport) in tests.
    #[must_use]
    pub fn with_transport(
        url: &str,
        transport: impl HttpTransport + 'static,
        cache: ResponseCache,
    ) -> Self {
        Self {
            service_url: url.trim_end_matches('/').to_string(),
            transport: Box::new(transport),
            cache: RefCell::new(cache),
        }
    }

    #[must_use]
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    fn get_raw(&self, url: &str) -> CatalogResult<CachedBody> {
        if let Some(body) = self.cache.borrow().get(url) {
            return Ok(body);
        }
        debug!("GET {url}");
        let response = self.transport.send(HttpRequest::get(url))?;
        if response.status != 200 {
            return Err(CatalogError::FailedRequest {
                method: Method::Get,
                url: url.to_string(),
                status: response.status,
                body: response.text(),
            });
        }
        let body: CachedBody = Arc::from(response.body);
        self.cache.borrow_mut().put(url, body.clone());
        Ok(body)
    }

    fn get_xml(&self, url: &str) -> CatalogResult<Element> {
        let body = self.get_raw(url)?;
        Element::parse(&body).map_err(|source| CatalogError::InvalidXml {
            url: url.to_string(),
            source,
        })
    }

    /// Send a mutating request. The cache is cleared whatever the outcome.
    fn dispatch(&self, request: HttpRequest) -> CatalogResult<HttpResponse> {
        debug!("{} {}", request.method, request.url);
        let response = self.transport.send(request);
        self.cache.borrow_mut().invalidate_all();
        response
    }

    fn write(&self, request: HttpRequest, expect: Expect) -> CatalogResult<HttpResponse> {
        let (method, url) = (request.method, request.url.clone());
        let response = self.dispatch(request)?;
        if expect.accepts(response.status) {
            Ok(response)
        } else {
            Err(CatalogError::Upload {
                method,
                url,
                status: response.status,
                body: response.text(),
            })
        }
    }

    /// Entries named `tag` of the listing at `url`.
    fn listing<T>(
        &self,
        url: &str,
        tag: &str,
        build: impl Fn(&Element) -> CatalogResult<T>,
    ) -> CatalogResult<Vec<T>> {
        self.get_xml(url)?.find_all(tag).map(build).collect()
    }

    /// Fetch the object's document and populate its fields.
    pub fn refresh<T: CatalogObject>(&self, obj: &mut T) -> CatalogResult<()> {
        let doc = self.get_xml(obj.href())?;
        obj.apply(&doc)
    }

    /// Refresh a handle, mapping a failed request to `None`.
    fn refreshed<T: CatalogObject>(&self, mut obj: T) -> CatalogResult<Option<T>> {
        match self.refresh(&mut obj) {
            Ok(()) => Ok(Some(obj)),
            Err(e) if e.is_failed_request() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Send the object's XML with its save verb. Any 2xx status is a success.
    pub fn save<T: CatalogObject>(&self, obj: &mut T) -> CatalogResult<()> {
        let request = HttpRequest::with_body(
            obj.save_method(),
            obj.save_url(),
            XML_CONTENT_TYPE,
            obj.message(),
        );
        self.write(request, Expect::Success)?;
        obj.mark_saved();
        Ok(())
    }

    /// Delete the object. With `purge`, the server also removes the underlying data.
    pub fn delete<T: CatalogObject>(&self, obj: &T, purge: bool) -> CatalogResult<()> {
        let url = if purge {
            format!("{}?purge=true", obj.href())
        } else {
            obj.href().to_string()
        };
        let response = self.dispatch(HttpRequest::delete(url.as_str()))?;
        if response.status == 200 {
            Ok(())
        } else {
            Err(CatalogError::FailedRequest {
                method: Method::Delete,
                url,
                status: response.status,
                body: response.text(),
            })
        }
    }

    pub fn get_workspaces(&self) -> CatalogResult<Vec<Workspace>> {
        let url = format!("{}/workspaces.xml", self.service_url);
        self.listing(&url, "workspace", Workspace::from_index)
    }

    pub fn get_workspace(&self, name: &str) -> CatalogResult<Option<Workspace>> {
        let mut candidates: Vec<_> = self
            .get_workspaces()?
            .into_iter()
            .filter(|ws| ws.name == name)
            .collect();
        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.pop()),
            n => Err(CatalogError::AmbiguousRequest(format!(
                "{n} workspaces are named {name}"
            ))),
        }
    }

    /// The workspace the server uses when none is given.
    pub fn get_default_workspace(&self) -> CatalogResult<Workspace> {
        let mut alias = Workspace::new(&self.service_url, "default");
        self.refresh(&mut alias)?;
        Ok(Workspace::new(&self.service_url, &alias.name))
    }

    fn workspace_or_default(&self, workspace: Option<&Workspace>) -> CatalogResult<Workspace> {
        match workspace {
            Some(ws) => Ok(ws.clone()),
            None => self.get_default_workspace(),
        }
    }

    /// Create a workspace together with its namespace `uri`.
    pub fn create_workspace(&self, name: &str, uri: &str) -> CatalogResult<Workspace> {
        let mut namespace = Element::new("namespace");
        namespace.push_text("prefix", name);
        namespace.push_text("uri", uri);
        let url = format!("{}/namespaces/", self.service_url);
        self.write(
            HttpRequest::with_body(Method::Post, url, XML_CONTENT_TYPE, namespace.to_xml()),
            Expect::Success,
        )?;
        info!("Created workspace {name}");
        self.get_workspace(name)?
            .ok_or_else(|| CatalogError::NotFound(format!("Workspace {name} was not created")))
    }

    /// Resolve `name` among the data, coverage and WMS stores of one workspace.
    pub fn lookup_store(&self, name: &str, workspace: &Workspace) -> CatalogResult<Lookup<Store>> {
        let mut matches = StoreKind::ALL.map(|_| Vec::new());
        for (kind, found) in StoreKind::ALL.into_iter().zip(matches.iter_mut()) {
            let listing = self.get_xml(&workspace.stores_url(kind))?;
            for node in listing.find_all(kind.tag()) {
                if node.child_text("name") == Some(name) {
                    found.push(Store::from_index(kind, workspace, node)?);
                }
            }
        }
        let [mut ds, mut cs, mut wms] = matches;
        Ok(match (ds.len(), cs.len(), wms.len()) {
            (1, 0, _) => Lookup::Found(ds.remove(0)),
            (0, 1, _) => Lookup::Found(cs.remove(0)),
            (0, 0, 1) => Lookup::Found(wms.remove(0)),
            (0, 0, _) => Lookup::NotFound,
            _ => Lookup::Ambiguous(format!(
                "{workspace} and name: {name} do not uniquely identify a store"
            )),
        })
    }

    /// Find a store by name, in one workspace or across all of them.
    pub fn get_store(&self, name: &str, workspace: Option<&Workspace>) -> CatalogResult<Store> {
        if let Some(ws) = workspace {
            return match self.lookup_store(name, ws)? {
                Lookup::Found(store) => Ok(store),
                Lookup::NotFound => Err(CatalogError::NotFound(format!(
                    "No store found in {ws} named: {name}"
                ))),
                Lookup::Ambiguous(msg) => Err(CatalogError::AmbiguousRequest(msg)),
            };
        }

        let mut found: Option<Store> = None;
        for ws in self.get_workspaces()? {
            let probe = match self.lookup_store(name, &ws) {
                Err(e) if e.is_failed_request() => Lookup::NotFound,
                other => other?,
            };
            match probe {
                Lookup::Found(store) if found.is_some() => {
                    debug!("Store {name} found again in {}", store.workspace);
                    return Err(CatalogError::AmbiguousRequest(format!(
                        "Multiple stores found named: {name}"
                    )));
                }
                Lookup::Found(store) => found = Some(store),
                Lookup::NotFound => {}
                Lookup::Ambiguous(msg) => return Err(CatalogError::AmbiguousRequest(msg)),
            }
        }
        found.ok_or_else(|| CatalogError::NotFound(format!("No store found named: {name}")))
    }

    /// Every store of a workspace, or of every workspace.
    pub fn get_stores(&self, workspace: Option<&Workspace>) -> CatalogResult<Vec<Store>> {
        let workspaces = match workspace {
            Some(ws) => vec![ws.clone()],
            None => self.get_workspaces()?,
        };
        let mut stores = Vec::new();
        for ws in &workspaces {
            for kind in StoreKind::ALL {
                stores.extend(self.listing(&ws.stores_url(kind), kind.tag(), |node| {
                    Store::from_index(kind, ws, node)
                })?);
            }
        }
        Ok(stores)
    }

    /// Unsaved data store; [`save`](Self::save) creates it.
    pub fn new_datastore(&self, name: &str, workspace: Option<&Workspace>) -> CatalogResult<Store> {
        let ws = self.workspace_or_default(workspace)?;
        Ok(Store::unsaved(StoreKind::Data, name, &ws))
    }

    /// Unsaved coverage store; [`save`](Self::save) creates it.
    pub fn new_coveragestore(
        &self,
        name: &str,
        workspace: Option<&Workspace>,
    ) -> CatalogResult<Store> {
        let ws = self.workspace_or_default(workspace)?;
        Ok(Store::unsaved(StoreKind::Coverage, name, &ws))
    }

    /// Without a workspace every workspace is searched, so a name taken anywhere conflicts.
    fn ensure_no_store(&self, name: &str, workspace: Option<&Workspace>) -> CatalogResult<()> {
        match self.get_store(name, workspace) {
            Ok(store) => Err(CatalogError::ConflictingData(format!(
                "There is already a store named {name} in {}",
                store.workspace
            ))),
            Err(e) if e.is_failed_request() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Create a data store from a zipped Shapefile.
    pub fn create_featurestore(
        &self,
        name: &str,
        data: UploadData,
        workspace: Option<&Workspace>,
        overwrite: bool,
        charset: Option<&str>,
    ) -> CatalogResult<()> {
        if !overwrite {
            self.ensure_no_store(name, workspace)?;
        }
        let ws = self.workspace_or_default(workspace)?;
        let url = format!(
            "{}/file.shp{}",
            base_url(&ws.store_href(StoreKind::Data, name)),
            upload_query(overwrite, charset)
        );
        let body = data.into_body(name)?;
        self.write(
            HttpRequest::with_body(Method::Put, url, ZIP_CONTENT_TYPE, body),
            Expect::Created,
        )?;
        info!("Uploaded feature store {name} to {ws}");
        Ok(())
    }

    /// Create a coverage store from a GeoTIFF or a WorldImage bundle.
    ///
    /// Bundles with a `tfw` part are sent as WorldImage archives and other bundles as
    /// zipped GeoTIFF. Archives and bytes are sent zipped when they start with the ZIP
    /// signature and as a plain GeoTIFF otherwise.
    pub fn create_coveragestore(
        &self,
        name: &str,
        data: UploadData,
        workspace: Option<&Workspace>,
        overwrite: bool,
    ) -> CatalogResult<()> {
        if !overwrite {
            self.ensure_no_store(name, workspace)?;
        }
        let ws = self.workspace_or_default(workspace)?;
        let (bundled, format) = match &data {
            UploadData::Bundle(sources) if sources.contains_key("tfw") => (true, "worldimage"),
            UploadData::Bundle(_) => (true, "geotiff"),
            UploadData::Archive(_) | UploadData::Bytes(_) => (false, "geotiff"),
        };
        let url = format!(
            "{}/file.{format}",
            base_url(&ws.store_href(StoreKind::Coverage, name))
        );
        let body = data.into_body(name)?;
        let content_type = if bundled || body.starts_with(ZIP_SIGNATURE) {
            ZIP_CONTENT_TYPE
        } else {
            TIFF_CONTENT_TYPE
        };
        self.write(
            HttpRequest::with_body(Method::Put, url, content_type, body),
            Expect::Created,
        )?;
        info!("Uploaded coverage store {name} to {ws}");
        Ok(())
    }

    /// Add a zipped Shapefile named `name` to an existing data store.
    pub fn add_data_to_store(
        &self,
        store: &Store,
        name: &str,
        data: UploadData,
        overwrite: bool,
        charset: Option<&str>,
    ) -> CatalogResult<()> {
        let url = format!(
            "{}/file.shp{}",
            base_url(&store.workspace.store_href(StoreKind::Data, &store.name)),
            upload_query(overwrite, charset)
        );
        let body = data.into_body(name)?;
        self.write(
            HttpRequest::with_body(Method::Put, url, ZIP_CONTENT_TYPE, body),
            Expect::Created,
        )?;
        Ok(())
    }

    /// Find a resource by name.
    ///
    /// With a store, only that store is searched. Otherwise the stores of the
    /// workspace, or of every workspace in listing order, are scanned and the first
    /// match is returned.
    pub fn get_resource(
        &self,
        name: &str,
        store: Option<&Store>,
        workspace: Option<&Workspace>,
    ) -> CatalogResult<Option<Resource>> {
        if let Some(store) = store {
            return self.get_resource_in_store(name, store);
        }
        let workspaces = match workspace {
            Some(ws) => vec![ws.clone()],
            None => self.get_workspaces()?,
        };
        for ws in &workspaces {
            for store in self.get_stores(Some(ws))? {
                if let Some(resource) = self.get_resource_in_store(name, &store)? {
                    return Ok(Some(resource));
                }
            }
        }
        Ok(None)
    }

    fn get_resource_in_store(&self, name: &str, store: &Store) -> CatalogResult<Option<Resource>> {
        match store.kind {
            StoreKind::Data if store.name != name => {
                self.refreshed(Resource::handle(store, name))
            }
            StoreKind::Wms => self.refreshed(Resource::handle(store, name)),
            StoreKind::Data | StoreKind::Coverage => {
                let mut candidates: Vec<_> = self
                    .store_resources(store)?
                    .into_iter()
                    .filter(|r| r.name == name)
                    .collect();
                match candidates.pop() {
                    None => Ok(None),
                    Some(_) if !candidates.is_empty() => Err(CatalogError::AmbiguousRequest(
                        format!("Multiple resources named {name} in store {}", store.name),
                    )),
                    Some(mut resource) => {
                        self.refresh(&mut resource)?;
                        Ok(Some(resource))
                    }
                }
            }
        }
    }

    fn store_resources(&self, store: &Store) -> CatalogResult<Vec<Resource>> {
        self.listing(
            &store.resources_url(),
            store.kind.resource_kind().tag(),
            |node| Resource::from_index(store, node),
        )
    }

    /// Resource handles of a store, a workspace, or the whole catalog.
    pub fn get_resources(
        &self,
        store: Option<&Store>,
        workspace: Option<&Workspace>,
    ) -> CatalogResult<Vec<Resource>> {
        if let Some(store) = store {
            return self.store_resources(store);
        }
        let mut resources = Vec::new();
        for store in self.get_stores(workspace)? {
            resources.extend(self.store_resources(&store)?);
        }
        Ok(resources)
    }

    /// Create a new, empty feature type with the given attributes in a data store.
    ///
    /// For a database store this creates the table. At least one attribute must be
    /// a geometry. An existing layer of that name is reported before the attributes
    /// are checked.
    #[allow(clippy::too_many_arguments)]
    pub fn create_native_layer(
        &self,
        workspace: Option<&Workspace>,
        store: &str,
        name: &str,
        native_name: &str,
        title: &str,
        srs: &str,
        attributes: &[AttributeSpec],
    ) -> CatalogResult<Resource> {
        let ws = self.workspace_or_default(workspace)?;
        let store = self.get_store(store, Some(&ws))?;
        if store.kind != StoreKind::Data {
            return Err(CatalogError::NotFound(format!(
                "{} is a {}, native layers need a dataStore",
                store.name,
                store.kind.tag()
            )));
        }
        if self.get_resource(name, Some(&store), None)?.is_some() {
            return Err(CatalogError::ConflictingData(format!(
                "There is already a layer named {name} in {ws}"
            )));
        }
        let attributes = attributes_element(attributes)?;

        let mut doc = Element::new("featureType");
        doc.push_text("name", name);
        doc.push_text("nativeName", native_name);
        doc.push_text("title", title);
        doc.push_text("srs", srs);
        doc.push(attributes);
        let url = format!(
            "{}/{}?charset=UTF-8",
            base_url(&store.href),
            store.kind.resource_kind().collection()
        );
        self.write(
            HttpRequest::with_body(Method::Post, url, XML_CONTENT_TYPE, doc.to_xml()),
            Expect::Success,
        )?;
        info!("Created native layer {name} in {ws}:{}", store.name);

        self.get_resource(name, Some(&store), None)?.ok_or_else(|| {
            CatalogError::NotFound(format!("Layer {name} was not found after creation"))
        })
    }

    pub fn get_layer(&self, name: &str) -> CatalogResult<Option<Layer>> {
        self.refreshed(Layer::handle(&self.service_url, name))
    }

    /// All layers, or only those publishing `resource`.
    pub fn get_layers(&self, resource: Option<&Resource>) -> CatalogResult<Vec<Layer>> {
        let url = format!("{}/layers.xml", self.service_url);
        let layers = self.listing(&url, "layer", |node| {
            Layer::from_index(&self.service_url, node)
        })?;
        let Some(resource) = resource else {
            return Ok(layers);
        };
        let mut published = Vec::new();
        for layer in layers {
            if let Some(layer) = self.refreshed(layer)?
                && layer
                    .resource
                    .as_ref()
                    .is_some_and(|link| link.href == resource.href)
            {
                published.push(layer);
            }
        }
        Ok(published)
    }

    pub fn get_layergroup(&self, name: &str) -> CatalogResult<Option<LayerGroup>> {
        self.refreshed(LayerGroup::handle(&self.service_url, name))
    }

    pub fn get_layergroups(&self) -> CatalogResult<Vec<LayerGroup>> {
        let url = format!("{}/layergroups.xml", self.service_url);
        self.listing(&url, "layerGroup", |node| {
            LayerGroup::from_index(&self.service_url, node)
        })
    }

    /// Unsaved layer group; [`save`](Self::save) creates it.
    pub fn create_layergroup(
        &self,
        name: &str,
        layers: Vec<String>,
        styles: Vec<Option<String>>,
        bounds: Option<BoundingBox>,
    ) -> CatalogResult<LayerGroup> {
        if self.get_layergroups()?.iter().any(|g| g.name == name) {
            return Err(CatalogError::ConflictingData(format!(
                "Layer group named {name} already exists!"
            )));
        }
        Ok(LayerGroup::unsaved(
            &self.service_url,
            name,
            layers,
            styles,
            bounds,
        ))
    }

    pub fn get_style(&self, name: &str) -> CatalogResult<Option<Style>> {
        self.refreshed(Style::handle(&self.service_url, name))
    }

    pub fn get_styles(&self) -> CatalogResult<Vec<Style>> {
        let url = format!("{}/styles.xml", self.service_url);
        self.listing(&url, "style", |node| {
            Style::from_index(&self.service_url, node)
        })
    }

    /// Fetch the SLD document of a style.
    pub fn style_sld(&self, style: &Style) -> CatalogResult<Sld> {
        let url = style.body_href();
        let body = self.get_raw(&url)?;
        Sld::parse(&body).map_err(|source| CatalogError::InvalidXml { url, source })
    }

    /// Upload an SLD document as style `name`.
    pub fn create_style(&self, name: &str, sld: &[u8], overwrite: bool) -> CatalogResult<()> {
        if !overwrite && self.get_style(name)?.is_some() {
            return Err(CatalogError::ConflictingData(format!(
                "There is already a style named {name}"
            )));
        }
        let request = if overwrite {
            let url = format!("{}/styles/{name}.sld", self.service_url);
            HttpRequest::with_body(Method::Put, url, SLD_CONTENT_TYPE, sld)
        } else {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("name", name)
                .finish();
            let url = format!("{}/styles?{query}", self.service_url);
            HttpRequest::with_body(Method::Post, url, SLD_CONTENT_TYPE, sld)
        };
        self.write(request, Expect::Success)?;
        Ok(())
    }
}
