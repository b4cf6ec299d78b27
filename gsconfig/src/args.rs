use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args as ClapArgs, Parser, Subcommand};
use gsconfig_core::config::ConnectionSettings;

/// Defines the styles used for the CLI help output.
const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug, PartialEq)]
#[command(
    about,
    version,
    after_help = "Use RUST_LOG environment variable to control logging level, e.g. RUST_LOG=debug or RUST_LOG=gsconfig=debug. Use GSCONFIG_LOG_FORMAT to pick full, compact, pretty or json log output.",
    styles = HELP_STYLES
)]
pub struct Args {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Print listings and objects as JSON.
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

// Overrides for the config file and the GEOSERVER_* environment variables.
#[derive(ClapArgs, Debug, Clone, PartialEq, Default)]
pub struct ConnectionArgs {
    /// Path to a YAML config file with url, username, password and cache_ttl keys.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// REST endpoint, e.g. http://localhost:8080/geoserver/rest
    #[arg(long, global = true)]
    pub url: Option<String>,
    #[arg(short, long, global = true)]
    pub username: Option<String>,
    #[arg(short, long, global = true)]
    pub password: Option<String>,
}

impl ConnectionArgs {
    pub fn merge_into(self, settings: &mut ConnectionSettings) {
        if let Some(url) = self.url {
            settings.url = url;
        }
        if let Some(username) = self.username {
            settings.username = username;
        }
        if let Some(password) = self.password {
            settings.password = password;
        }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List workspaces.
    Workspaces,
    /// List data, coverage and WMS stores.
    Stores {
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// List feature types, coverages and WMS layers.
    Resources {
        #[arg(short, long)]
        workspace: Option<String>,
        /// Only list the resources of this store. Requires --workspace.
        #[arg(short, long, requires = "workspace")]
        store: Option<String>,
    },
    /// List layers.
    Layers,
    /// List layer groups.
    LayerGroups,
    /// List styles.
    Styles,
    /// Show one store. Without --workspace every workspace is searched.
    Store {
        name: String,
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Show one resource, the first match in workspace order unless narrowed down.
    Resource {
        name: String,
        #[arg(short, long)]
        workspace: Option<String>,
        #[arg(short, long)]
        store: Option<String>,
    },
    /// Create a workspace and its namespace.
    CreateWorkspace { name: String, uri: String },
    /// Create a data store from Shapefile parts, a zipped Shapefile, or a path without extension.
    UploadShapefile {
        name: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        workspace: Option<String>,
        /// Replace the store if it already exists.
        #[arg(long)]
        overwrite: bool,
        /// Character set of the DBF file, e.g. ISO-8859-1.
        #[arg(long)]
        charset: Option<String>,
    },
    /// Create a coverage store from a GeoTIFF, a zip archive, or raster parts such as tiff + tfw.
    UploadCoverage {
        name: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        workspace: Option<String>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Upload an SLD file as a style.
    UploadStyle {
        name: String,
        file: PathBuf,
        #[arg(long)]
        overwrite: bool,
    },
    /// Delete a layer.
    DeleteLayer {
        name: String,
        /// Also remove the underlying data.
        #[arg(long)]
        purge: bool,
    },
    /// Delete a style.
    DeleteStyle {
        name: String,
        /// Also remove the SLD file.
        #[arg(long)]
        purge: bool,
    },
}
