use std::env::temp_dir;
use std::fs::{File, read_dir, write};
use std::io::Cursor;
use std::time::Duration;

use gsconfig_core::bundle::{BundleSource, BundleSources};
use gsconfig_core::cache::{DEFAULT_CACHE_TTL, ManualClock, ResponseCache};
use gsconfig_core::model::{
    AttributeSpec, AttributeType, GeometryType, Resource, Store, StoreKind, Style, Workspace,
};
use gsconfig_core::transport::{Method, SLD_CONTENT_TYPE, TIFF_CONTENT_TYPE, ZIP_CONTENT_TYPE};
use gsconfig_core::{Catalog, CatalogError, FauxTransport, Lookup, UploadData};
use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;

const URL: &str = "http://gs/rest";

fn catalog() -> (Catalog, FauxTransport, ManualClock) {
    let transport = FauxTransport::default();
    let clock = ManualClock::default();
    let cache = ResponseCache::new(DEFAULT_CACHE_TTL, Box::new(clock.clone()));
    let cat = Catalog::with_transport(URL, transport.clone(), cache);
    (cat, transport, clock)
}

fn entry(tag: &str, name: &str, href: &str) -> String {
    format!(
        r#"<{tag}><name>{name}</name><atom:link xmlns:atom="http://www.w3.org/2005/Atom" rel="alternate" href="{href}" type="application/xml"/></{tag}>"#
    )
}

fn serve_workspaces(transport: &FauxTransport, names: &[&str]) {
    let entries: String = names
        .iter()
        .map(|n| entry("workspace", n, &format!("{URL}/workspaces/{n}.xml")))
        .collect();
    transport.get_ok(
        format!("{URL}/workspaces.xml"),
        format!("<workspaces>{entries}</workspaces>"),
    );
}

fn serve_stores(transport: &FauxTransport, ws: &str, kind: StoreKind, names: &[&str]) {
    let entries: String = names
        .iter()
        .map(|n| {
            let href = format!("{URL}/workspaces/{ws}/{}/{n}.xml", kind.collection());
            entry(kind.tag(), n, &href)
        })
        .collect();
    transport.get_ok(
        format!("{URL}/workspaces/{ws}/{}.xml", kind.collection()),
        format!("<{tag}s>{entries}</{tag}s>", tag = kind.tag()),
    );
}

fn serve_all_stores(transport: &FauxTransport, ws: &str, ds: &[&str], cs: &[&str], wms: &[&str]) {
    serve_stores(transport, ws, StoreKind::Data, ds);
    serve_stores(transport, ws, StoreKind::Coverage, cs);
    serve_stores(transport, ws, StoreKind::Wms, wms);
}

fn feature_type(name: &str) -> String {
    format!("<featureType><name>{name}</name><title>{name} title</title><enabled>true</enabled></featureType>")
}

fn zip_members(body: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(body)).unwrap();
    let mut names: Vec<_> = archive.file_names().map(ToString::to_string).collect();
    names.sort();
    names
}

fn topp() -> Workspace {
    Workspace::new(URL, "topp")
}

#[test]
fn cached_reads_within_ttl() {
    let (cat, transport, clock) = catalog();
    serve_workspaces(&transport, &["topp"]);
    let url = format!("{URL}/workspaces.xml");

    cat.get_workspaces().unwrap();
    cat.get_workspaces().unwrap();
    assert_eq!(transport.count(Method::Get, &url), 1);

    clock.advance(DEFAULT_CACHE_TTL);
    cat.get_workspaces().unwrap();
    assert_eq!(transport.count(Method::Get, &url), 2);

    clock.advance(Duration::from_secs(1));
    cat.get_workspaces().unwrap();
    assert_eq!(transport.count(Method::Get, &url), 2);
}

#[test]
fn writes_clear_the_cache() {
    let (cat, transport, _) = catalog();
    serve_workspaces(&transport, &["topp"]);
    transport.respond(Method::Put, format!("{URL}/styles/pop.sld"), 200, "");
    let url = format!("{URL}/workspaces.xml");

    cat.get_workspaces().unwrap();
    cat.create_style("pop", b"<sld/>", true).unwrap();
    cat.get_workspaces().unwrap();
    assert_eq!(transport.count(Method::Get, &url), 2);

    // A failed write clears it too.
    transport.respond(Method::Delete, format!("{URL}/styles/pop.xml"), 500, "boom");
    let style = Style::handle(URL, "pop");
    assert!(cat.delete(&style, false).is_err());
    cat.get_workspaces().unwrap();
    assert_eq!(transport.count(Method::Get, &url), 3);
}

#[test]
fn failed_read_reports_status_and_body() {
    let (cat, transport, _) = catalog();
    transport.respond(Method::Get, format!("{URL}/workspaces.xml"), 503, "maintenance");
    let err = cat.get_workspaces().unwrap_err();
    assert!(err.is_failed_request());
    insta::assert_snapshot!(err.to_string(), @r"
    Tried to make a GET request to http://gs/rest/workspaces.xml but got a 503 status code:
    maintenance
    ");
}

#[test]
fn non_xml_response() {
    let (cat, transport, _) = catalog();
    transport.get_ok(format!("{URL}/workspaces.xml"), "Service unavailable");
    assert!(matches!(
        cat.get_workspaces(),
        Err(CatalogError::InvalidXml { .. })
    ));
}

#[rstest]
#[case::data(&["x"], &[], &[], Some(StoreKind::Data))]
#[case::data_shadows_wms(&["x"], &[], &["x"], Some(StoreKind::Data))]
#[case::coverage(&[], &["x"], &[], Some(StoreKind::Coverage))]
#[case::coverage_shadows_wms(&[], &["x"], &["x"], Some(StoreKind::Coverage))]
#[case::wms(&[], &[], &["x"], Some(StoreKind::Wms))]
#[case::other_names(&["y"], &["z"], &[], None)]
#[case::two_wms(&[], &[], &["x", "x"], None)]
fn store_decision_table(
    #[case] ds: &[&str],
    #[case] cs: &[&str],
    #[case] wms: &[&str],
    #[case] expected: Option<StoreKind>,
) {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", ds, cs, wms);
    let found = cat.lookup_store("x", &topp()).unwrap();
    match (expected, found) {
        (Some(kind), Lookup::Found(store)) => {
            assert_eq!(store.kind, kind);
            assert_eq!(store.name, "x");
            assert_eq!(store.workspace.name, "topp");
        }
        (None, found) => assert_eq!(found, Lookup::NotFound),
        (Some(_), other) => panic!("expected a store, got {other:?}"),
    }
}

#[rstest]
#[case::data_and_coverage(&["x"], &["x"], &[])]
#[case::two_data(&["x", "x"], &[], &[])]
#[case::two_coverage(&[], &["x", "x"], &["x"])]
fn store_decision_table_ambiguous(#[case] ds: &[&str], #[case] cs: &[&str], #[case] wms: &[&str]) {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", ds, cs, wms);
    assert!(matches!(
        cat.lookup_store("x", &topp()).unwrap(),
        Lookup::Ambiguous(_)
    ));
    assert!(matches!(
        cat.get_store("x", Some(&topp())),
        Err(CatalogError::AmbiguousRequest(_))
    ));
}

#[test]
fn store_in_workspace_not_found() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", &[], &[], &[]);
    let err = cat.get_store("x", Some(&topp())).unwrap_err();
    assert!(err.is_failed_request());
    assert_eq!(err.to_string(), "No store found in topp named: x");
}

#[test]
fn store_across_workspaces() {
    let (cat, transport, _) = catalog();
    serve_workspaces(&transport, &["topp", "sf", "nurc"]);
    serve_all_stores(&transport, "topp", &["states_shapefile"], &[], &[]);
    serve_all_stores(&transport, "sf", &["sf"], &["sfdem"], &[]);
    // nurc listings are not served at all, so its probe fails with 404

    let store = cat.get_store("sfdem", None).unwrap();
    assert_eq!(store.kind, StoreKind::Coverage);
    assert_eq!(store.workspace.name, "sf");
    assert_eq!(store.href, format!("{URL}/workspaces/sf/coveragestores/sfdem.xml"));

    let err = cat.get_store("missing", None).unwrap_err();
    assert!(err.is_failed_request());
    assert_eq!(err.to_string(), "No store found named: missing");
}

#[test]
fn store_in_two_workspaces_is_ambiguous() {
    let (cat, transport, _) = catalog();
    serve_workspaces(&transport, &["topp", "sf"]);
    serve_all_stores(&transport, "topp", &["shared"], &[], &[]);
    serve_all_stores(&transport, "sf", &[], &["shared"], &[]);
    let err = cat.get_store("shared", None).unwrap_err();
    assert_eq!(err.to_string(), "Multiple stores found named: shared");
}

#[test]
fn ambiguous_probe_is_not_swallowed() {
    let (cat, transport, _) = catalog();
    serve_workspaces(&transport, &["topp"]);
    serve_all_stores(&transport, "topp", &["dup", "dup"], &[], &[]);
    assert!(matches!(
        cat.get_store("dup", None),
        Err(CatalogError::AmbiguousRequest(_))
    ));
}

#[test]
fn get_stores_of_every_workspace() {
    let (cat, transport, _) = catalog();
    serve_workspaces(&transport, &["topp", "sf"]);
    serve_all_stores(&transport, "topp", &["states_shapefile"], &[], &["remote"]);
    serve_all_stores(&transport, "sf", &["sf"], &["sfdem"], &[]);
    let names: Vec<_> = cat
        .get_stores(None)
        .unwrap()
        .into_iter()
        .map(|s| format!("{}:{}", s.workspace, s.name))
        .collect();
    assert_eq!(names, ["topp:states_shapefile", "topp:remote", "sf:sf", "sf:sfdem"]);
}

#[test]
fn resource_without_qualifier_takes_first_match() {
    let (cat, transport, _) = catalog();
    serve_workspaces(&transport, &["a", "b"]);
    serve_all_stores(&transport, "a", &["a_ds"], &[], &[]);
    serve_all_stores(&transport, "b", &["b_ds"], &[], &[]);
    let a_roads = format!("{URL}/workspaces/a/datastores/a_ds/featuretypes/roads.xml");
    let b_roads = format!("{URL}/workspaces/b/datastores/b_ds/featuretypes/roads.xml");
    transport.get_ok(&a_roads, feature_type("roads"));
    transport.get_ok(&b_roads, feature_type("roads"));

    let roads = cat.get_resource("roads", None, None).unwrap().unwrap();
    assert_eq!(roads.workspace, "a");
    assert_eq!(roads.store, "a_ds");
    assert_eq!(roads.title.as_deref(), Some("roads title"));
    assert_eq!(transport.count(Method::Get, &b_roads), 0);
}

#[test]
fn resource_in_workspace_skips_missing_stores() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", &["first", "second"], &[], &[]);
    transport.get_ok(
        format!("{URL}/workspaces/topp/datastores/second/featuretypes/roads.xml"),
        feature_type("roads"),
    );
    let roads = cat.get_resource("roads", None, Some(&topp())).unwrap().unwrap();
    assert_eq!(roads.store, "second");
    assert_eq!(cat.get_resource("rivers", None, Some(&topp())).unwrap(), None);
}

#[test]
fn resource_in_coverage_store_uses_listing() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "sf", &[], &["sfdem"], &[]);
    let sf = Workspace::new(URL, "sf");
    let store = cat.get_store("sfdem", Some(&sf)).unwrap();
    let listing = format!("{URL}/workspaces/sf/coveragestores/sfdem/coverages.xml");
    let href = format!("{URL}/workspaces/sf/coveragestores/sfdem/coverages/sfdem.xml");
    transport.get_ok(&listing, format!("<coverages>{}</coverages>", entry("coverage", "sfdem", &href)));
    transport.get_ok(
        &href,
        "<coverage><name>sfdem</name><title>Spearfish elevation</title><srs>EPSG:26713</srs></coverage>",
    );

    let dem = cat.get_resource("sfdem", Some(&store), None).unwrap().unwrap();
    assert_eq!(dem.projection.as_deref(), Some("EPSG:26713"));
    assert_eq!(cat.get_resource("other", Some(&store), None).unwrap(), None);
}

#[test]
fn duplicate_resource_in_store_is_ambiguous() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "sf", &[], &["dem"], &[]);
    let store = cat.get_store("dem", Some(&Workspace::new(URL, "sf"))).unwrap();
    let href = format!("{URL}/workspaces/sf/coveragestores/dem/coverages/dem.xml");
    let twice = entry("coverage", "dem", &href).repeat(2);
    transport.get_ok(
        format!("{URL}/workspaces/sf/coveragestores/dem/coverages.xml"),
        format!("<coverages>{twice}</coverages>"),
    );
    assert!(matches!(
        cat.get_resource("dem", Some(&store), None),
        Err(CatalogError::AmbiguousRequest(_))
    ));
}

#[test]
fn missing_resource_in_data_store_is_none() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", &["states_shapefile"], &[], &[]);
    let store = cat.get_store("states_shapefile", Some(&topp())).unwrap();
    assert_eq!(cat.get_resource("nope", Some(&store), None).unwrap(), None);
}

#[test]
fn native_layer_attribute_validation() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", &["pg"], &[], &[]);
    let no_geometry = [AttributeSpec::new("label", AttributeType::String)];
    let err = cat
        .create_native_layer(Some(&topp()), "pg", "poi", "poi", "POI", "EPSG:4326", &no_geometry)
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidAttributes(_)));

    let err = cat
        .create_native_layer(Some(&topp()), "pg", "poi", "poi", "POI", "EPSG:4326", &[])
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidAttributes(_)));
    assert!(transport.requests().iter().all(|r| r.method == Method::Get));
}

#[test]
fn native_layer_conflict_is_reported_before_attributes() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", &["pg"], &[], &[]);
    transport.get_ok(
        format!("{URL}/workspaces/topp/datastores/pg/featuretypes/poi.xml"),
        feature_type("poi"),
    );
    let err = cat
        .create_native_layer(Some(&topp()), "pg", "poi", "poi", "POI", "EPSG:4326", &[])
        .unwrap_err();
    assert!(matches!(err, CatalogError::ConflictingData(_)));
}

#[test]
fn native_layer_name_conflict() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", &["pg"], &[], &[]);
    transport.get_ok(
        format!("{URL}/workspaces/topp/datastores/pg/featuretypes/poi.xml"),
        feature_type("poi"),
    );
    let attrs = [AttributeSpec::geometry("the_geom", GeometryType::Point)];
    let err = cat
        .create_native_layer(Some(&topp()), "pg", "poi", "poi", "POI", "EPSG:4326", &attrs)
        .unwrap_err();
    assert!(matches!(err, CatalogError::ConflictingData(_)));
    assert_eq!(transport.count(Method::Post, &format!("{URL}/workspaces/topp/datastores/pg/featuretypes?charset=UTF-8")), 0);
}

#[test]
fn native_layer_is_created() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", &["pg"], &[], &[]);
    let href = format!("{URL}/workspaces/topp/datastores/pg/featuretypes/poi.xml");
    transport.respond(Method::Get, &href, 404, "No such feature type");
    transport.get_ok(&href, feature_type("poi"));
    let post = format!("{URL}/workspaces/topp/datastores/pg/featuretypes?charset=UTF-8");
    transport.respond(Method::Post, &post, 201, "");

    let attrs = [
        AttributeSpec::geometry("the_geom", GeometryType::Point),
        AttributeSpec::new("label", AttributeType::String).nillable(),
    ];
    let poi = cat
        .create_native_layer(Some(&topp()), "pg", "poi", "poi_table", "Points", "EPSG:4326", &attrs)
        .unwrap();
    assert_eq!(poi.name, "poi");

    let sent = transport
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    insta::assert_snapshot!(String::from_utf8(sent.body.unwrap()).unwrap(), @"<featureType><name>poi</name><nativeName>poi_table</nativeName><title>Points</title><srs>EPSG:4326</srs><attributes><attribute><name>the_geom</name><binding>com.vividsolutions.jts.geom.Point</binding><nillable>false</nillable></attribute><attribute><name>label</name><binding>java.lang.String</binding><nillable>true</nillable></attribute></attributes></featureType>");
}

#[test]
fn shapefile_bundle_upload() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", &[], &[], &[]);
    let put = format!("{URL}/workspaces/topp/datastores/parcels/file.shp");
    transport.respond(Method::Put, &put, 201, "");

    let mut parts = BundleSources::new();
    for ext in ["shp", "shx", "dbf", "prj"] {
        parts.insert(ext.to_string(), BundleSource::Bytes(ext.as_bytes().to_vec()));
    }
    cat.create_featurestore("parcels", UploadData::Bundle(parts), Some(&topp()), false, None)
        .unwrap();

    let sent = transport.requests().pop().unwrap();
    assert_eq!(sent.method, Method::Put);
    assert_eq!(sent.url, put);
    assert_eq!(sent.content_type, Some(ZIP_CONTENT_TYPE));
    assert_eq!(
        zip_members(&sent.body.unwrap()),
        ["parcels.dbf", "parcels.prj", "parcels.shp", "parcels.shx"]
    );
}

#[test]
fn shapefile_upload_conflict() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", &["parcels"], &[], &[]);
    let err = cat
        .create_featurestore("parcels", UploadData::Bytes(vec![]), Some(&topp()), false, None)
        .unwrap_err();
    assert_eq!(err.to_string(), "There is already a store named parcels in topp");
    assert!(transport.requests().iter().all(|r| r.method == Method::Get));
}

#[test]
fn store_name_taken_in_another_workspace_conflicts() {
    let (cat, transport, _) = catalog();
    serve_workspaces(&transport, &["topp", "sf"]);
    serve_all_stores(&transport, "topp", &[], &[], &[]);
    serve_all_stores(&transport, "sf", &["parcels"], &[], &[]);
    transport.get_ok(
        format!("{URL}/workspaces/default.xml"),
        "<workspace><name>topp</name></workspace>",
    );
    let err = cat
        .create_featurestore("parcels", UploadData::Bytes(vec![]), None, false, None)
        .unwrap_err();
    assert_eq!(err.to_string(), "There is already a store named parcels in sf");

    let err = cat
        .create_coveragestore("parcels", UploadData::Bytes(vec![]), None, false)
        .unwrap_err();
    assert!(matches!(err, CatalogError::ConflictingData(_)));
    assert!(transport.requests().iter().all(|r| r.method == Method::Get));
}

#[test]
fn store_name_in_two_workspaces_is_ambiguous_on_upload() {
    let (cat, transport, _) = catalog();
    serve_workspaces(&transport, &["topp", "sf"]);
    serve_all_stores(&transport, "topp", &["parcels"], &[], &[]);
    serve_all_stores(&transport, "sf", &["parcels"], &[], &[]);
    let err = cat
        .create_featurestore("parcels", UploadData::Bytes(vec![]), None, false, None)
        .unwrap_err();
    assert!(matches!(err, CatalogError::AmbiguousRequest(_)));
}

#[test]
fn new_store_name_goes_to_default_workspace() {
    let (cat, transport, _) = catalog();
    serve_workspaces(&transport, &["topp", "sf"]);
    serve_all_stores(&transport, "topp", &[], &[], &[]);
    serve_all_stores(&transport, "sf", &["roads"], &[], &[]);
    transport.get_ok(
        format!("{URL}/workspaces/default.xml"),
        "<workspace><name>topp</name></workspace>",
    );
    let put = format!("{URL}/workspaces/topp/datastores/parcels/file.shp");
    transport.respond(Method::Put, &put, 201, "");
    cat.create_featurestore("parcels", UploadData::Bytes(b"PK".to_vec()), None, false, None)
        .unwrap();
    assert_eq!(transport.count(Method::Put, &put), 1);
}

#[test]
fn shapefile_overwrite_skips_check_and_sets_query() {
    let (cat, transport, _) = catalog();
    let put = format!("{URL}/workspaces/topp/datastores/parcels/file.shp?update=overwrite&charset=UTF-8");
    transport.respond(Method::Put, &put, 201, "");
    cat.create_featurestore(
        "parcels",
        UploadData::Bytes(b"PK".to_vec()),
        Some(&topp()),
        true,
        Some("UTF-8"),
    )
    .unwrap();
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(transport.count(Method::Put, &put), 1);
}

#[test]
fn upload_requires_created_status() {
    let (cat, transport, _) = catalog();
    let put = format!("{URL}/workspaces/topp/datastores/parcels/file.shp?update=overwrite");
    transport.respond(Method::Put, &put, 200, "accepted");
    let err = cat
        .create_featurestore("parcels", UploadData::Bytes(vec![]), Some(&topp()), true, None)
        .unwrap_err();
    assert!(matches!(err, CatalogError::Upload { status: 200, .. }));
}

#[test]
fn caller_archive_is_kept() {
    let (cat, transport, _) = catalog();
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("roads.zip");
    let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
    zip.start_file("roads.shp", zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.finish().unwrap();

    let store = Store::unsaved(StoreKind::Data, "roads", &topp());
    transport.respond(
        Method::Put,
        format!("{URL}/workspaces/topp/datastores/roads/file.shp"),
        201,
        "",
    );
    cat.add_data_to_store(&store, "roads", UploadData::Archive(archive.clone()), false, None)
        .unwrap();
    assert!(archive.is_file());
}

#[test]
fn failed_upload_removes_generated_bundle() {
    let (cat, transport, _) = catalog();
    let put = format!("{URL}/workspaces/topp/datastores/leftover_check/file.shp?update=overwrite");
    transport.respond(Method::Put, &put, 500, "disk full");

    let mut parts = BundleSources::new();
    parts.insert("shp".to_string(), BundleSource::Bytes(b"shp".to_vec()));
    parts.insert("dbf".to_string(), BundleSource::Bytes(b"dbf".to_vec()));
    let err = cat
        .create_featurestore("leftover_check", UploadData::Bundle(parts), Some(&topp()), true, None)
        .unwrap_err();
    assert!(matches!(err, CatalogError::Upload { status: 500, .. }));
    assert_eq!(transport.count(Method::Put, &put), 1);

    let leftovers: Vec<_> = read_dir(temp_dir())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("gsconfig-leftover_check-"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn world_image_upload() {
    let (cat, transport, _) = catalog();
    serve_all_stores(&transport, "topp", &[], &[], &[]);
    let put = format!("{URL}/workspaces/topp/coveragestores/Pk50095/file.worldimage");
    transport.respond(Method::Put, &put, 201, "");

    let mut parts = BundleSources::new();
    parts.insert("tiff".to_string(), BundleSource::Bytes(b"II*".to_vec()));
    parts.insert("tfw".to_string(), BundleSource::Bytes(b"1.0".to_vec()));
    cat.create_coveragestore("Pk50095", UploadData::Bundle(parts), Some(&topp()), false)
        .unwrap();

    let sent = transport.requests().pop().unwrap();
    assert_eq!(sent.url, put);
    assert_eq!(sent.content_type, Some(ZIP_CONTENT_TYPE));
    assert_eq!(zip_members(&sent.body.unwrap()), ["Pk50095.tfw", "Pk50095.tiff"]);
}

#[test]
fn raw_geotiff_upload() {
    let (cat, transport, _) = catalog();
    let put = format!("{URL}/workspaces/topp/coveragestores/dem/file.geotiff");
    transport.respond(Method::Put, &put, 201, "");
    cat.create_coveragestore("dem", UploadData::Bytes(b"II*\0".to_vec()), Some(&topp()), true)
        .unwrap();
    let sent = transport.requests().pop().unwrap();
    assert_eq!(sent.url, put);
    assert_eq!(sent.content_type, Some(TIFF_CONTENT_TYPE));
}

#[test]
fn geotiff_file_is_sent_raw() {
    let (cat, transport, _) = catalog();
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("dem.tif");
    write(&tif, b"II*\0").unwrap();
    let put = format!("{URL}/workspaces/topp/coveragestores/dem/file.geotiff");
    transport.respond(Method::Put, &put, 201, "");

    cat.create_coveragestore("dem", UploadData::Archive(tif.clone()), Some(&topp()), true)
        .unwrap();
    let sent = transport.requests().pop().unwrap();
    assert_eq!(sent.url, put);
    assert_eq!(sent.content_type, Some(TIFF_CONTENT_TYPE));
    assert_eq!(sent.body.as_deref(), Some(b"II*\0".as_slice()));
    assert!(tif.is_file());
}

#[test]
fn zipped_geotiff_archive_is_sent_as_zip() {
    let (cat, transport, _) = catalog();
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("dem.zip");
    let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
    zip.start_file("dem.tif", zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.finish().unwrap();
    let put = format!("{URL}/workspaces/topp/coveragestores/dem/file.geotiff");
    transport.respond(Method::Put, &put, 201, "");

    cat.create_coveragestore("dem", UploadData::Archive(archive), Some(&topp()), true)
        .unwrap();
    let sent = transport.requests().pop().unwrap();
    assert_eq!(sent.content_type, Some(ZIP_CONTENT_TYPE));
    assert_eq!(zip_members(&sent.body.unwrap()), ["dem.tif"]);
}

#[test]
fn style_creation() {
    let (cat, transport, _) = catalog();
    transport.get_ok(
        format!("{URL}/styles/pop.xml"),
        "<style><name>pop</name><filename>pop.sld</filename></style>",
    );
    let err = cat.create_style("pop", b"<sld/>", false).unwrap_err();
    assert!(matches!(err, CatalogError::ConflictingData(_)));

    let post = format!("{URL}/styles?name=fresh");
    transport.respond(Method::Post, &post, 201, "");
    cat.create_style("fresh", b"<sld/>", false).unwrap();
    let sent = transport.requests().pop().unwrap();
    assert_eq!(sent.url, post);
    assert_eq!(sent.content_type, Some(SLD_CONTENT_TYPE));
}

#[test]
fn style_sld_title() {
    let (cat, transport, _) = catalog();
    transport.get_ok(
        format!("{URL}/styles.xml"),
        format!("<styles>{}</styles>", entry("style", "pop", &format!("{URL}/styles/pop.xml"))),
    );
    transport.get_ok(
        format!("{URL}/styles/pop.sld"),
        indoc! {r#"
            <StyledLayerDescriptor>
              <NamedLayer>
                <Name>pop</Name>
                <UserStyle><Title>Population</Title></UserStyle>
              </NamedLayer>
            </StyledLayerDescriptor>
        "#},
    );
    let styles = cat.get_styles().unwrap();
    assert_eq!(styles.len(), 1);
    let sld = cat.style_sld(&styles[0]).unwrap();
    assert_eq!(sld.title.as_deref(), Some("Population"));
    assert_eq!(cat.get_style("missing").unwrap(), None);
}

#[test]
fn unsaved_store_is_posted_then_put() {
    let (cat, transport, _) = catalog();
    let collection = format!("{URL}/workspaces/topp/datastores");
    let href = format!("{collection}/pg.xml");
    transport.respond(Method::Post, &collection, 201, "pg");
    transport.respond(Method::Put, &href, 200, "");

    let mut store = cat.new_datastore("pg", Some(&topp())).unwrap();
    store
        .connection_parameters
        .insert("dbtype".to_string(), "postgis".to_string());
    cat.save(&mut store).unwrap();
    assert!(store.is_saved());
    cat.save(&mut store).unwrap();
    assert_eq!(transport.count(Method::Post, &collection), 1);
    assert_eq!(transport.count(Method::Put, &href), 1);
}

#[test]
fn save_failure_is_an_upload_error() {
    let (cat, transport, _) = catalog();
    let href = format!("{URL}/workspaces/topp.xml");
    transport.respond(Method::Put, &href, 500, "java.lang.NullPointerException");
    let mut ws = topp();
    let err = cat.save(&mut ws).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r"
    Tried to make a PUT request to http://gs/rest/workspaces/topp.xml but got a 500 status code:
    java.lang.NullPointerException
    ");
}

#[test]
fn delete_with_purge() {
    let (cat, transport, _) = catalog();
    transport.get_ok(
        format!("{URL}/layers/roads.xml"),
        "<layer><name>roads</name><type>VECTOR</type></layer>",
    );
    transport.respond(Method::Delete, format!("{URL}/layers/roads.xml?purge=true"), 200, "");
    let layer = cat.get_layer("roads").unwrap().unwrap();
    cat.delete(&layer, true).unwrap();

    let err = cat.delete(&layer, false).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::FailedRequest { method: Method::Delete, status: 404, .. }
    ));
}

#[test]
fn layers_of_a_resource() {
    let (cat, transport, _) = catalog();
    let states_href = format!("{URL}/workspaces/topp/datastores/states_shapefile/featuretypes/states.xml");
    let layers: String = ["states", "roads"]
        .iter()
        .map(|n| entry("layer", n, &format!("{URL}/layers/{n}.xml")))
        .collect();
    transport.get_ok(format!("{URL}/layers.xml"), format!("<layers>{layers}</layers>"));
    transport.get_ok(
        format!("{URL}/layers/states.xml"),
        format!(r#"<layer><name>states</name><resource class="featureType"><name>states</name><atom:link xmlns:atom="http://www.w3.org/2005/Atom" href="{states_href}"/></resource></layer>"#),
    );
    transport.get_ok(
        format!("{URL}/layers/roads.xml"),
        r#"<layer><name>roads</name><resource class="featureType"><name>roads</name><atom:link xmlns:atom="http://www.w3.org/2005/Atom" href="http://gs/rest/elsewhere.xml"/></resource></layer>"#,
    );

    assert_eq!(cat.get_layers(None).unwrap().len(), 2);
    let store = Store::unsaved(StoreKind::Data, "states_shapefile", &topp());
    let states = Resource::handle(&store, "states");
    let published = cat.get_layers(Some(&states)).unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].name, "states");
}

#[test]
fn layer_groups() {
    let (cat, transport, _) = catalog();
    transport.get_ok(
        format!("{URL}/layergroups.xml"),
        format!(
            "<layerGroups>{}</layerGroups>",
            entry("layerGroup", "tasmania", &format!("{URL}/layergroups/tasmania.xml"))
        ),
    );
    assert_eq!(cat.get_layergroup("missing").unwrap(), None);
    let err = cat
        .create_layergroup("tasmania", vec![], vec![], None)
        .unwrap_err();
    assert!(matches!(err, CatalogError::ConflictingData(_)));

    let group = cat
        .create_layergroup("base", vec!["roads".to_string()], vec![None], None)
        .unwrap();
    assert!(!group.is_saved());
}

#[test]
fn workspace_creation_and_default() {
    let (cat, transport, _) = catalog();
    transport.respond(Method::Post, format!("{URL}/namespaces/"), 201, "acme");
    serve_workspaces(&transport, &["topp", "acme"]);
    let ws = cat.create_workspace("acme", "http://example.com/acme").unwrap();
    assert_eq!(ws.href, format!("{URL}/workspaces/acme.xml"));
    let sent = transport
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    assert_eq!(
        sent.body.unwrap(),
        b"<namespace><prefix>acme</prefix><uri>http://example.com/acme</uri></namespace>"
    );

    transport.get_ok(
        format!("{URL}/workspaces/default.xml"),
        "<workspace><name>topp</name></workspace>",
    );
    assert_eq!(cat.get_default_workspace().unwrap(), topp());
    assert_eq!(cat.get_workspace("nope").unwrap(), None);
}

#[test]
fn default_workspace_is_used_for_new_stores() {
    let (cat, transport, _) = catalog();
    transport.get_ok(
        format!("{URL}/workspaces/default.xml"),
        "<workspace><name>topp</name></workspace>",
    );
    let cs = cat.new_coveragestore("dem", None).unwrap();
    assert_eq!(cs.href, format!("{URL}/workspaces/topp/coveragestores/dem.xml"));
}
