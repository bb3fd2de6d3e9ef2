use clap::{Parser, Subcommand};
use pagesmith::assets::scan_assets;
use pagesmith::blocks::BlockCatalog;
use pagesmith::config::{self, GeneratorOptions};
use pagesmith::generate::{CancellationToken, Generator};
use pagesmith::output;
use pagesmith::seo::calculate_seo_score;
use pagesmith::types::Project;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "pagesmith")]
#[command(about = "Block-based static site compiler for small-business websites")]
#[command(long_about = "\
Block-based static site compiler for small-business websites

A project file (JSON or TOML) describes the business, its pages and the
blocks on each page. pagesmith renders every page, inlines critical CSS,
minifies markup, styles and scripts, transcodes images and writes SEO
metadata, robots.txt and sitemap.xml.

Output structure:

  dist/
  ├── index.html                   # page \"/\"
  ├── about/index.html             # page \"/about\"
  ├── pricing.html                 # page \"/pricing.html\"
  ├── css/<page-id>.css            # full stylesheet per page
  ├── js/<page-id>.js              # page script, when any block has one
  ├── assets/hero.avif             # assets at their logical paths
  ├── robots.txt
  └── sitemap.xml

Run 'pagesmith gen-config' to generate a documented pagesmith.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Project file (.json or .toml)
    project: PathBuf,

    /// Config file [default: pagesmith.toml next to the project]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory (overrides output_path)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Add every file under this directory as an asset
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Compute everything, write nothing
    #[arg(long)]
    dry_run: bool,

    /// Disable the in-run block and image cache
    #[arg(long)]
    no_cache: bool,

    /// Process assets and pages on a single worker
    #[arg(long)]
    sequential: bool,

    /// Worker count (capped at available cores)
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the site for a project
    Build(BuildArgs),
    /// Resolve every block reference and print the SEO score
    Check {
        /// Project file (.json or .toml)
        project: PathBuf,
    },
    /// Print a stock pagesmith.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build(args) => build(args, cli.verbose > 0)?,
        Command::Check { project } => {
            let project = load_project(&project)?;
            let catalog = BlockCatalog::stock().with_overlay(&project.blocks);
            let unresolved = catalog.unresolved(&project);
            output::print_check_report(&project, &unresolved, calculate_seo_score(&project));
            if !unresolved.is_empty() {
                return Err(format!("{} unresolved block reference(s)", unresolved.len()).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn build(args: BuildArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let project_dir = args
        .project
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let config_path = args
        .config
        .unwrap_or_else(|| project_dir.join(config::CONFIG_FILENAME));
    debug!(config = %config_path.display(), "loading config");
    let mut config = config::load_config(&config_path)?;
    if let Some(out) = args.output {
        config.output_path = out.to_string_lossy().into_owned();
    }
    if Path::new(&config.source_dir).is_relative() {
        config.source_dir = project_dir
            .join(&config.source_dir)
            .to_string_lossy()
            .into_owned();
    }

    let mut project = load_project(&args.project)?;
    if let Some(dir) = &args.assets_dir {
        let scanned = scan_assets(dir)?;
        info!(dir = %dir.display(), count = scanned.len(), "assets scanned");
        for asset in scanned {
            if !project.assets.iter().any(|a| a.path == asset.path) {
                project.assets.push(asset);
            }
        }
    }

    let options = GeneratorOptions {
        parallel: !args.sequential,
        workers: args.workers,
        cache: !args.no_cache,
        watch: false,
        verbose,
        dry_run: args.dry_run,
    };

    println!("==> Building {} → {}", project.name, config.output_path);
    let generator = Generator::new(config, options);
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_generate_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = generator.generate_with_progress(&project, &CancellationToken::new(), Some(tx));
    printer.join().map_err(|_| "progress printer panicked")?;
    output::print_build_summary(&result);

    if !result.success {
        let message = result
            .errors
            .first()
            .map(|e| format!("{}: {}", e.code, e.message))
            .unwrap_or_else(|| "generation failed".to_string());
        return Err(message.into());
    }
    Ok(())
}

/// Parse a project file; `.toml` as TOML, anything else as JSON.
fn load_project(path: &Path) -> Result<Project, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let project = if is_toml {
        toml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(project)
}

/// Install the fmt subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pagesmith={level}")));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
