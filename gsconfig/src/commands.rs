use std::fs::read;
use std::io::Write;
use std::path::{Path, PathBuf};

use gsconfig_core::bundle::{BundleSource, BundleSources, shapefile_and_friends};
use gsconfig_core::model::Workspace;
use gsconfig_core::{Catalog, CatalogError, UploadData};
use serde::Serialize;
use tracing::info;

use crate::args::Command;
use crate::{GsconfigError, GsconfigResult};

/// Writes listings as one line per entry and single objects as YAML, or both as JSON.
struct Printer<'w, W: Write> {
    json: bool,
    out: &'w mut W,
}

impl<W: Write> Printer<'_, W> {
    fn list<T: Serialize>(&mut self, items: &[T], label: impl Fn(&T) -> String) -> GsconfigResult<()> {
        if self.json {
            serde_json::to_writer_pretty(&mut *self.out, items)?;
            writeln!(self.out)?;
        } else {
            for item in items {
                writeln!(self.out, "{}", label(item))?;
            }
        }
        Ok(())
    }

    fn show<T: Serialize>(&mut self, item: &T) -> GsconfigResult<()> {
        if self.json {
            serde_json::to_writer_pretty(&mut *self.out, item)?;
            writeln!(self.out)?;
        } else {
            self.out.write_all(serde_yaml::to_string(item)?.as_bytes())?;
        }
        Ok(())
    }
}

fn workspace(cat: &Catalog, name: Option<String>) -> GsconfigResult<Option<Workspace>> {
    let Some(name) = name else {
        return Ok(None);
    };
    match cat.get_workspace(&name)? {
        Some(ws) => Ok(Some(ws)),
        None => Err(not_found(format!("No workspace named {name}"))),
    }
}

fn not_found(msg: String) -> GsconfigError {
    CatalogError::NotFound(msg).into()
}

fn extension(path: &Path) -> GsconfigResult<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .ok_or_else(|| GsconfigError::MissingExtension(path.to_path_buf()))
}

/// Key every file by its lowercased extension.
fn bundle_by_extension(files: Vec<PathBuf>) -> GsconfigResult<BundleSources> {
    let mut sources = BundleSources::new();
    for path in files {
        sources.insert(extension(&path)?, BundleSource::Path(path));
    }
    Ok(sources)
}

fn shapefile_upload(name: &str, mut files: Vec<PathBuf>) -> GsconfigResult<UploadData> {
    if files.len() != 1 {
        return Ok(UploadData::Bundle(bundle_by_extension(files)?));
    }
    let path = files.remove(0);
    let single_shp = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("shp"));
    if path.extension().is_none() || single_shp {
        let parts = shapefile_and_friends(&path.with_extension(""));
        if parts.is_empty() {
            return Err(GsconfigError::NoInputFiles(format!(
                "{name}, nothing matches {}.*",
                path.display()
            )));
        }
        return Ok(UploadData::Bundle(parts));
    }
    if extension(&path)? == "zip" {
        Ok(UploadData::Archive(path))
    } else {
        Ok(UploadData::Bundle(bundle_by_extension(vec![path])?))
    }
}

fn coverage_upload(mut files: Vec<PathBuf>) -> GsconfigResult<UploadData> {
    if files.len() != 1 {
        return Ok(UploadData::Bundle(bundle_by_extension(files)?));
    }
    let path = files.remove(0);
    match extension(&path)?.as_str() {
        "zip" => Ok(UploadData::Archive(path)),
        "tif" | "tiff" => {
            let bytes = read(&path).map_err(|e| GsconfigError::InputError(e, path.clone()))?;
            Ok(UploadData::Bytes(bytes))
        }
        _ => Ok(UploadData::Bundle(bundle_by_extension(vec![path])?)),
    }
}

/// Execute one command against the catalog, writing its output to `out`.
pub fn run(cat: &Catalog, command: Command, json: bool, out: &mut impl Write) -> GsconfigResult<()> {
    let mut printer = Printer { json, out };
    match command {
        Command::Workspaces => printer.list(&cat.get_workspaces()?, |ws| ws.name.clone()),
        Command::Stores { workspace: ws } => {
            let ws = workspace(cat, ws)?;
            let stores = cat.get_stores(ws.as_ref())?;
            printer.list(&stores, |s| format!("{}:{}", s.workspace, s.name))
        }
        Command::Resources { workspace: ws, store } => {
            let ws = workspace(cat, ws)?;
            let store = match store {
                Some(name) => Some(cat.get_store(&name, ws.as_ref())?),
                None => None,
            };
            let resources = cat.get_resources(store.as_ref(), ws.as_ref())?;
            printer.list(&resources, |r| format!("{}:{}", r.workspace, r.name))
        }
        Command::Layers => printer.list(&cat.get_layers(None)?, |l| l.name.clone()),
        Command::LayerGroups => printer.list(&cat.get_layergroups()?, |g| g.name.clone()),
        Command::Styles => printer.list(&cat.get_styles()?, |s| s.name.clone()),
        Command::Store { name, workspace: ws } => {
            let ws = workspace(cat, ws)?;
            let mut store = cat.get_store(&name, ws.as_ref())?;
            cat.refresh(&mut store)?;
            printer.show(&store)
        }
        Command::Resource {
            name,
            workspace: ws,
            store,
        } => {
            let ws = workspace(cat, ws)?;
            let store = match store {
                Some(store) => Some(cat.get_store(&store, ws.as_ref())?),
                None => None,
            };
            let resource = cat
                .get_resource(&name, store.as_ref(), ws.as_ref())?
                .ok_or_else(|| not_found(format!("No resource named {name}")))?;
            printer.show(&resource)
        }
        Command::CreateWorkspace { name, uri } => {
            let ws = cat.create_workspace(&name, &uri)?;
            printer.show(&ws)
        }
        Command::UploadShapefile {
            name,
            files,
            workspace: ws,
            overwrite,
            charset,
        } => {
            let ws = workspace(cat, ws)?;
            let data = shapefile_upload(&name, files)?;
            cat.create_featurestore(&name, data, ws.as_ref(), overwrite, charset.as_deref())?;
            Ok(())
        }
        Command::UploadCoverage {
            name,
            files,
            workspace: ws,
            overwrite,
        } => {
            let ws = workspace(cat, ws)?;
            let data = coverage_upload(files)?;
            cat.create_coveragestore(&name, data, ws.as_ref(), overwrite)?;
            Ok(())
        }
        Command::UploadStyle {
            name,
            file,
            overwrite,
        } => {
            let sld = read(&file).map_err(|e| GsconfigError::InputError(e, file.clone()))?;
            cat.create_style(&name, &sld, overwrite)?;
            info!("Uploaded style {name}");
            Ok(())
        }
        Command::DeleteLayer { name, purge } => {
            let layer = cat
                .get_layer(&name)?
                .ok_or_else(|| not_found(format!("No layer named {name}")))?;
            cat.delete(&layer, purge)?;
            info!("Deleted layer {name}");
            Ok(())
        }
        Command::DeleteStyle { name, purge } => {
            let style = cat
                .get_style(&name)?
                .ok_or_else(|| not_found(format!("No style named {name}")))?;
            cat.delete(&style, purge)?;
            info!("Deleted style {name}");
            Ok(())
        }
    }
}
