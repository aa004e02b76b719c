use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use quire_sdk::{CancelToken, Provisioned, Quire, QuireConfig, Target, Uid, WritablePage};

use crate::cli::*;

const DEFAULT_CONFIG_FILE: &str = "quire.toml";

/// Read the config named on the command line, `./quire.toml` if it exists,
/// or fall back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<QuireConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(QuireConfig::default());
            }
            default
        }
    };
    let config = QuireConfig::load(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.rooted_at(base))
}

pub fn run_command(cli: Cli, config: QuireConfig) -> anyhow::Result<()> {
    let quire = Quire::open(config).context("opening store")?;
    match cli.command {
        Command::Init => cmd_init(&quire),
        Command::Site(args) => cmd_site(&quire, args),
        Command::Put(args) => cmd_put(&quire, args),
        Command::Rm(args) => cmd_rm(&quire, args),
        Command::Resolve(args) => cmd_resolve(&quire, args),
        Command::Cat(args) => cmd_cat(&quire, args),
        Command::Pages(args) => cmd_pages(&quire, args),
        Command::Versions(args) => cmd_versions(&quire, args),
    }
}

fn cmd_init(quire: &Quire) -> anyhow::Result<()> {
    let provisioned = quire.provision()?;
    let created = matches!(provisioned, Provisioned::Created(_));
    let site = provisioned.into_site();
    if created {
        println!("{} Provisioned site {}", "✓".green().bold(), site.title.bold());
    } else {
        println!("Site {} already provisioned", site.title.bold());
    }
    println!("  Published: {}", site.version.to_string().cyan());
    println!("  Staging:   {}", site.next_version.to_string().yellow());
    Ok(())
}

fn cmd_site(quire: &Quire, args: SiteArgs) -> anyhow::Result<()> {
    quire.start()?;
    let site = match args.title {
        Some(title) => quire.update_site(&CancelToken::new(), &title)?,
        None => quire.site()?,
    };
    println!("{}", site.title.bold());
    println!("  Site:      {}", site.uid);
    println!("  Published: {}", site.version.to_string().cyan());
    println!("  Staging:   {}", site.next_version.to_string().yellow());
    Ok(())
}

fn cmd_put(quire: &Quire, args: PutArgs) -> anyhow::Result<()> {
    quire.start()?;
    let content = match (&args.file, args.content) {
        (Some(file), _) => {
            std::fs::read(file).with_context(|| format!("reading {}", file.display()))?
        }
        (None, Some(content)) => content.into_bytes(),
        (None, None) => anyhow::bail!("either --file or --content is required"),
    };
    let uid = args.uid.as_deref().map(Uid::parse).transpose()?;
    let write = WritablePage {
        title: args.title,
        path: args.path,
        template_name: args.template,
        tags: args.tags,
        excerpt: args.excerpt,
    };

    let outcome = quire.put_page(&CancelToken::new(), uid, &write, &content)?;
    let page = &outcome.page;
    match (uid, outcome.forked_from) {
        (None, _) => println!(
            "{} Created {} {}",
            "✓".green().bold(),
            page.path.bold(),
            page.uid.to_string().yellow()
        ),
        (Some(_), Some(old)) => println!(
            "{} Forked {} {} → {}",
            "✓".green().bold(),
            page.path.bold(),
            old.short_id().dimmed(),
            page.uid.to_string().yellow()
        ),
        (Some(_), None) => println!(
            "{} Updated {} {}",
            "✓".green().bold(),
            page.path.bold(),
            page.uid.to_string().yellow()
        ),
    }
    Ok(())
}

fn cmd_rm(quire: &Quire, args: RmArgs) -> anyhow::Result<()> {
    quire.start()?;
    let uid = Uid::parse(&args.uid)?;
    let path = quire.delete_page(&CancelToken::new(), &uid)?;
    println!("{} Removed {} from staging", "✓".green().bold(), path.bold());
    Ok(())
}

fn resolve_target(quire: &Quire, args: &ResolveArgs) -> anyhow::Result<Target> {
    quire.start()?;
    Ok(quire.target(args.selector.as_deref(), false)?)
}

fn cmd_resolve(quire: &Quire, args: ResolveArgs) -> anyhow::Result<()> {
    let target = resolve_target(quire, &args)?;
    let page = quire.resolve_page(&target, &args.path)?;
    println!("{} {} ({})", page.path.bold(), page.uid.to_string().yellow(), target);
    if !page.title.is_empty() {
        println!("  Title:    {}", page.title);
    }
    println!("  Template: {}", page.template_name);
    println!("  Content:  {}", page.content.to_string().dimmed());
    Ok(())
}

fn cmd_cat(quire: &Quire, args: ResolveArgs) -> anyhow::Result<()> {
    let target = resolve_target(quire, &args)?;
    let uid = quire.resolve(&target, &args.path)?;
    let content = quire.content(&uid)?;
    std::io::stdout().write_all(&content)?;
    Ok(())
}

fn parse_cursor(cursor: Option<&str>) -> anyhow::Result<Option<Uid>> {
    Ok(cursor.map(Uid::parse).transpose()?)
}

fn print_cursor(cursor: Option<Uid>) {
    if let Some(cursor) = cursor {
        println!("{} --cursor {}", "more:".dimmed(), cursor);
    }
}

fn cmd_pages(quire: &Quire, args: ListArgs) -> anyhow::Result<()> {
    let cursor = parse_cursor(args.cursor.as_deref())?;
    let (pages, next) = quire.pages(cursor.as_ref())?;
    if pages.is_empty() {
        println!("No pages.");
    }
    for page in pages {
        println!("{}  {}  {}", page.uid.to_string().yellow(), page.path.bold(), page.title);
    }
    print_cursor(next);
    Ok(())
}

fn cmd_versions(quire: &Quire, args: ListArgs) -> anyhow::Result<()> {
    let site = quire.start()?;
    let cursor = parse_cursor(args.cursor.as_deref())?;
    let (versions, next) = quire.versions(cursor.as_ref())?;
    for version in versions {
        let label = if version.uid == site.version {
            "published".green().to_string()
        } else if version.uid == site.next_version {
            "staging".yellow().to_string()
        } else {
            String::new()
        };
        println!("{}  {} paths  {}", version.uid, version.pages.len(), label);
    }
    print_cursor(next);
    Ok(())
}
