use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use tracing::info;

use feature_resolver::config::{self, ResolverConfig};
use feature_resolver::feature::context::ResolveContext;
use feature_resolver::feature::factory::FeatureTypeRegistry;
use feature_resolver::feature::reference::FeatureReference;
use feature_resolver::feature::resolver::ReferenceResolver;
use feature_resolver::feature::rule::MatchRule;
use feature_resolver::feature::site::Site;
use feature_resolver::feature::sites::{SiteStore, StaticSite};
use feature_resolver::feature::types::FeatureSummary;
use feature_resolver::logging;

#[derive(Parser)]
#[command(name = "feature-resolver")]
#[command(version, about = "Resolve feature references against configured sites")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SiteArgs {
    /// Site description file (JSON)
    #[arg(long, conflicts_with = "store_url")]
    site: Option<PathBuf>,

    /// URL of a site kept in the local site store
    #[arg(long = "store")]
    store_url: Option<String>,
}

#[derive(Args)]
struct ReferenceArgs {
    /// Feature location, relative to the site URL or absolute
    #[arg(long)]
    url: String,

    /// Feature identifier (overrides the one the site declares)
    #[arg(long, requires = "version")]
    id: Option<String>,

    /// Nominal version (overrides the one the site declares)
    #[arg(long, requires = "id")]
    version: Option<String>,

    /// perfect, compatible, equivalent or greaterOrEqual
    #[arg(long)]
    rule: Option<String>,

    /// Packaging type (defaults to the declared or site type)
    #[arg(long = "type")]
    feature_type: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a feature reference and print the chosen feature
    Resolve {
        #[command(flatten)]
        site: SiteArgs,

        #[command(flatten)]
        reference: ReferenceArgs,

        /// Ignore the rule and resolve the reference's own feature
        #[arg(long)]
        exact: bool,

        /// Overrides the configured timeout; 0 disables it
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// List the candidate pool of a site
    Candidates {
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Copy a site description into the local site store
    Import {
        /// Site description file (JSON)
        #[arg(long)]
        site: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let config = ResolverConfig::load(&config_path)?;
    let _guard = logging::init(&config.logging, &config::log_dir())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config))
}

async fn run(command: Command, config: ResolverConfig) -> anyhow::Result<()> {
    let resolver = ReferenceResolver::new(Arc::new(FeatureTypeRegistry::with_defaults()));

    match command {
        Command::Resolve {
            site,
            reference,
            exact,
            timeout_ms,
        } => {
            let site = open_site(&site, &config)?;
            let reference = build_reference(&site, &reference)?;

            let timeout = match timeout_ms {
                Some(0) => None,
                Some(ms) => Some(Duration::from_millis(ms)),
                None => config.resolve.timeout(),
            };
            let ctx = timeout
                .map(ResolveContext::with_timeout)
                .unwrap_or_else(ResolveContext::unbounded);

            let feature = if exact {
                resolver.resolve_exact(&reference, &ctx).await?
            } else {
                resolver.resolve_best(&reference, &ctx).await?
            };
            info!("Resolved {} to {}", reference.url(), feature.url());

            println!(
                "{}",
                serde_json::to_string_pretty(&FeatureSummary::from(feature.as_ref()))?
            );
        }
        Command::Candidates { site } => {
            let site = open_site(&site, &config)?;
            let ctx = config
                .resolve
                .timeout()
                .map(ResolveContext::with_timeout)
                .unwrap_or_else(ResolveContext::unbounded);

            let Some(candidates) = site.configured_candidates().await? else {
                println!("Site {} has no configured features", site.url());
                return Ok(());
            };

            for candidate in &candidates {
                match resolver.versioned_identifier(candidate, &ctx).await {
                    Ok(id) => println!("{}\t{}", id, candidate.url()),
                    Err(e) => println!("?\t{}\t{}", candidate.url(), e),
                }
            }
        }
        Command::Import { site } => {
            let static_site = StaticSite::load(&site)?;
            let store = SiteStore::open(&prepare_db_path(&config)?, static_site.url())?;
            let count = store.import(&static_site)?;
            println!("Imported {} features from {}", count, static_site.url());
        }
    }

    Ok(())
}

fn open_site(args: &SiteArgs, config: &ResolverConfig) -> anyhow::Result<Arc<dyn Site>> {
    match (&args.site, &args.store_url) {
        (Some(path), _) => Ok(StaticSite::load(path)
            .with_context(|| format!("Failed to load site description {:?}", path))?),
        (None, Some(raw)) => {
            let url = Url::parse(raw).with_context(|| format!("Invalid site URL: {}", raw))?;
            Ok(SiteStore::open(&prepare_db_path(config)?, url)?)
        }
        (None, None) => anyhow::bail!("Either --site or --store is required"),
    }
}

/// The site's reference to the feature at `args.url`, with the command line
/// taking precedence over what the site declares
fn build_reference(site: &Arc<dyn Site>, args: &ReferenceArgs) -> anyhow::Result<FeatureReference> {
    let url = site
        .url()
        .join(&args.url)
        .with_context(|| format!("Invalid feature URL: {}", args.url))?;
    let mut reference = site.reference_to(&url)?;

    if let Some(feature_type) = &args.feature_type {
        reference = reference.with_type(Some(feature_type.clone()));
    }
    if let (Some(id), Some(version)) = (&args.id, &args.version) {
        reference = reference.with_declared_version(id, version);
    }
    if let Some(rule) = &args.rule {
        let mut options = reference.options().cloned().unwrap_or_default();
        options.match_rule = rule.parse::<MatchRule>()?;
        reference = reference.with_options(Some(options));
    }

    Ok(reference)
}

fn prepare_db_path(config: &ResolverConfig) -> anyhow::Result<PathBuf> {
    let db_path = config.store.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {:?}", parent))?;
    }
    Ok(db_path)
}
