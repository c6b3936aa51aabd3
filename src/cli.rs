use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to config.yaml. Created with defaults if missing.
    #[clap(short, long, default_value = "config.yaml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve `GET /api/app?id=<app id>` over http.
    Serve {
        /// Listen address, overrides `listen` from config
        #[clap(short, long)]
        listen: Option<String>,
    },
    /// Fetch and print metadata of a single app
    Meta {
        /// App id (package name)
        app_id: String,

        /// Also print which strategy matched each field
        #[clap(long, default_value = "false")]
        report: bool,
    },
    /// Run the extractor over a saved detail page
    Extract {
        /// Saved html file
        file: PathBuf,

        /// App id to put in the record
        #[clap(long)]
        id: String,

        /// Also print which strategy matched each field
        #[clap(long, default_value = "false")]
        report: bool,
    },
    /// Refresh metadata of every app in the catalog
    Catalog {
        /// Only apps in this category
        #[clap(long)]
        category: Option<String>,

        /// Only apps whose title, description or category contains this text
        #[clap(short, long)]
        query: Option<String>,

        /// Only featured apps
        #[clap(long, default_value = "false")]
        featured: bool,
    },
}
