use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "quire",
    about = "Quire — versioned page store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to quire.toml (defaults to ./quire.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the database and provision the site
    Init,
    /// Show or rename the site
    Site(SiteArgs),
    /// Create or edit a page in the staging version
    Put(PutArgs),
    /// Remove a page from the staging version
    Rm(RmArgs),
    /// Show which page a path resolves to
    Resolve(ResolveArgs),
    /// Print the content of the page at a path
    Cat(ResolveArgs),
    /// List stored pages, newest first
    Pages(ListArgs),
    /// List stored versions, newest first
    Versions(ListArgs),
}

#[derive(Args)]
pub struct SiteArgs {
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct PutArgs {
    /// URL path of the page
    pub path: String,
    /// Edit this page instead of creating one
    #[arg(long)]
    pub uid: Option<String>,
    /// Read content from a file
    #[arg(short, long, conflicts_with = "content")]
    pub file: Option<PathBuf>,
    /// Inline content
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long, default_value = "")]
    pub title: String,
    #[arg(long, default_value = "default")]
    pub template: String,
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    #[arg(long, default_value = "")]
    pub excerpt: String,
}

#[derive(Args)]
pub struct RmArgs {
    pub uid: String,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub path: String,
    /// "next", a version uid, or omitted for the published version
    #[arg(long = "version", value_name = "SELECTOR")]
    pub selector: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Resume from a cursor printed by a previous call
    #[arg(long)]
    pub cursor: Option<String>,
}
