use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notifeed::feed::{SectionIdentity, SectionKey};
use notifeed::{
    Config, CurrentUser, HttpApi, Inbox, MemoryRouter, SectionController, SectionDeps,
    SectionSettings, SectionView, UserIdentity,
};

/// Get the config directory path (~/.config/notifeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("notifeed"))
}

#[derive(Parser, Debug)]
#[command(name = "notifeed", about = "Page through notification feeds and mark them read")]
struct Args {
    /// Config file (default: ~/.config/notifeed/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Add a section for this project (repeatable)
    #[arg(long = "project", value_name = "ID")]
    projects: Vec<String>,

    /// Leave out the global section
    #[arg(long)]
    no_global: bool,

    /// Section to open, e.g. `zooniverse` or `project-42` (default: first section)
    #[arg(long, value_name = "KEY")]
    expand: Option<String>,

    /// Jump to this page after opening
    #[arg(long, value_name = "N")]
    page: Option<u32>,

    /// Page forward this many times, marking each page left behind as read
    #[arg(long, value_name = "N", default_value_t = 0)]
    walk: u32,

    /// Browse anonymously; nothing is marked read
    #[arg(long)]
    peek: bool,

    /// Output width in columns
    #[arg(long, value_name = "N", default_value_t = 80)]
    width: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let user = CurrentUser::new(if args.peek {
        None
    } else {
        config.resolve_token().map(|token| Arc::new(UserIdentity::new(token)))
    });
    if !user.is_signed_in() {
        tracing::info!("No identity; notifications will not be marked read");
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("notifeed/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let api = Arc::new(
        HttpApi::from_config(client, &config, user.clone())
            .context("Invalid API base URL in config")?,
    );

    let deps = SectionDeps {
        feed: api.clone(),
        projects: api,
        router: Arc::new(MemoryRouter::new()),
    };
    let settings = SectionSettings::from(&config);

    let mut identities = Vec::new();
    if !args.no_global {
        identities.push(SectionIdentity::Global);
    }
    identities.extend(args.projects.iter().map(SectionIdentity::project));
    if identities.is_empty() {
        anyhow::bail!("No sections to show: pass --project or drop --no-global");
    }

    let sections = identities
        .into_iter()
        .map(|identity| {
            SectionController::new(identity, deps.clone(), settings.clone(), user.clone())
        })
        .collect();
    let mut inbox = Inbox::new(sections);
    inbox.mount_all().await;

    run_session(inbox, &args, Duration::from_millis(config.shutdown_grace_ms)).await
}

/// Open the requested section and move to the requested page.
async fn navigate(inbox: &mut Inbox, args: &Args) -> Result<()> {
    let target = match &args.expand {
        Some(key) => SectionKey(key.clone()),
        None => match inbox.sections().first() {
            Some(section) => section.key().clone(),
            None => return Ok(()),
        },
    };
    if inbox.expanded().map(|s| s.key()) != Some(&target)
        && !inbox.toggle(&target).await.context("Failed to open section")?
    {
        anyhow::bail!("Unknown section '{target}'");
    }

    if let Some(section) = inbox.expanded_mut() {
        if let Some(page) = args.page {
            section
                .on_page_change(page)
                .await
                .with_context(|| format!("Failed to load page {page}"))?;
        }
        for _ in 0..args.walk {
            if !section.next_page().await.context("Failed to load next page")? {
                break;
            }
        }
    }
    Ok(())
}

/// Navigate, print, then always unmount and wait `grace` for the detached
/// read writes, even when navigation failed.
async fn run_session(mut inbox: Inbox, args: &Args, grace: Duration) -> Result<()> {
    let outcome = navigate(&mut inbox, args).await;

    for section in inbox.sections() {
        for line in SectionView::from_section(section).lines(args.width) {
            println!("{line}");
        }
    }

    let marked = inbox.unmount();
    if !marked.is_empty() {
        tracing::info!(count = marked.len(), "Marking notifications read");
        tokio::time::sleep(grace).await;
    }

    outcome
}
