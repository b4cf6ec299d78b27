//! Upload bundles for multi-file formats.
//!
//! GeoServer's REST API takes formats such as Shapefile or WorldImage, which come
//! with several sidecar files next to the main data, as a single ZIP archive. The
//! server expects every member to share one base name, differ only by extension,
//! and live at the root of the archive. This module produces such archives.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{CatalogError, CatalogResult};

/// Sidecar extensions picked out of an existing archive when re-bundling.
const SHAPEFILE_PARTS: [&str; 4] = [".shp", ".prj", ".shx", ".dbf"];

/// Content of one member of an upload bundle.
pub enum BundleSource {
    /// File on disk, copied as-is.
    Path(PathBuf),
    /// In-memory content.
    Bytes(Vec<u8>),
    /// Stream read to the end.
    Reader(Box<dyn Read>),
}

impl fmt::Debug for BundleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<PathBuf> for BundleSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for BundleSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for BundleSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl BundleSource {
    fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(_) => "in-memory data".to_string(),
            Self::Reader(_) => "stream".to_string(),
        }
    }

    fn copy_into(self, out: &mut impl Write) -> CatalogResult<u64> {
        let context = self.describe();
        let copied = match self {
            Self::Path(path) => File::open(&path).and_then(|mut file| io::copy(&mut file, out)),
            Self::Bytes(bytes) => out.write_all(&bytes).map(|()| bytes.len() as u64),
            Self::Reader(mut reader) => io::copy(&mut reader, out),
        };
        copied.map_err(|e| CatalogError::Io(e, context))
    }

    fn into_bytes(self) -> CatalogResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.copy_into(&mut buffer)?;
        Ok(buffer)
    }
}

/// Extension (without the dot) to the content stored under `<base name>.<extension>`.
pub type BundleSources = BTreeMap<String, BundleSource>;

/// Collect the Shapefile parts that exist next to `base`, e.g. `data/states` finds
/// `data/states.shp`, `data/states.shx`, `data/states.dbf` and `data/states.prj`.
#[must_use]
pub fn shapefile_and_friends(base: &Path) -> BundleSources {
    SHAPEFILE_PARTS
        .iter()
        .map(|ext| &ext[1..])
        .filter_map(|ext| {
            let candidate = base.with_extension(ext);
            candidate
                .is_file()
                .then(|| (ext.to_string(), BundleSource::Path(candidate)))
        })
        .collect()
}

/// Build a ZIP archive whose members all share `name` as their base name.
///
/// When the sources hold a `zip` entry and no `shp` entry, the referenced archive is
/// re-packaged: the first `.shp`, `.prj`, `.shx` and `.dbf` members (compared
/// case-insensitively) are renamed to `name.<ext>` and everything else is dropped.
/// Otherwise every `(ext, source)` pair becomes a `name.ext` member.
///
/// The archive is written to a temporary `gsconfig-<name>-*.zip` file which is
/// removed when the returned [`TempPath`] is dropped.
pub fn prepare_upload_bundle(name: &str, mut sources: BundleSources) -> CatalogResult<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("gsconfig-{name}-"))
        .suffix(".zip")
        .tempfile()
        .map_err(|e| CatalogError::Io(e, "temporary upload bundle".to_string()))?;

    let mut zip = ZipWriter::new(file.as_file_mut());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    match sources.remove("zip") {
        Some(archive) if !sources.contains_key("shp") => {
            rebundle(name, archive, &mut zip, options)?;
        }
        archive => {
            if let Some(archive) = archive {
                sources.insert("zip".to_string(), archive);
            }
            for (ext, source) in sources {
                let member = format!("{name}.{ext}");
                debug!("Adding {member} from {}", source.describe());
                zip.start_file(member, options)?;
                source.copy_into(&mut zip)?;
            }
        }
    }
    zip.finish()?;

    Ok(file.into_temp_path())
}

fn rebundle<W: Write + Seek>(
    name: &str,
    archive: BundleSource,
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
) -> CatalogResult<()> {
    let mut original = ZipArchive::new(Cursor::new(archive.into_bytes()?))?;
    let mut wanted = SHAPEFILE_PARTS.to_vec();
    for index in 0..original.len() {
        let mut entry = original.by_index(index)?;
        let Some(ext) = entry_extension(entry.name()) else {
            continue;
        };
        // Archives made on macOS repeat every member under __MACOSX/, keep the first.
        let Some(pos) = wanted.iter().position(|w| *w == ext) else {
            continue;
        };
        wanted.remove(pos);
        let member = format!("{name}{ext}");
        debug!("Re-bundling {} as {member}", entry.name());
        zip.start_file(member, options)?;
        io::copy(&mut entry, zip).map_err(|e| CatalogError::Io(e, entry.name().to_string()))?;
    }
    Ok(())
}

/// Last four characters of an archive member name, lowercased.
fn entry_extension(member: &str) -> Option<String> {
    let start = member.len().checked_sub(4)?;
    member.get(start..).map(str::to_ascii_lowercase)
}
