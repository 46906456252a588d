use anyhow::{Context, bail};
use clap::{Parser as ClapParser, Subcommand};
use console::style;
use hexo_adapter::{Adapter, Config, Post, config::DEFAULT_CONFIG_FILE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncReadExt;

#[derive(ClapParser)]
#[command(author, version, about = "Convert knowledge-base post exports into Hexo posts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    verbose: bool,
    /// Config file (defaults to ./hexo-adapter.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Print the Hexo post for one exported post (`-` reads stdin)
    Convert { input: PathBuf },
    /// Write a default config file
    Init,
}

/// Exports come either bare or wrapped in the API envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum Export {
    Envelope { data: Post },
    Bare(Post),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init => init_config(cli.config.as_deref()),
        Commands::Convert { input } => {
            let start = Instant::now();
            let config = Config::load(cli.config.as_deref())?;
            let adapter = Adapter::new(config)?;

            let post = read_post(&input).await?;
            let slug = post.slug.clone();
            let text = adapter.convert(post).await.with_context(|| format!("converting {slug}"))?;

            print!("{text}");
            eprintln!(
                "{} {} in {:.2}s.",
                style("success").cyan(),
                slug,
                start.elapsed().as_secs_f32()
            );
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

async fn read_post(input: &Path) -> anyhow::Result<Post> {
    let raw = if input == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("reading post from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("reading {}", input.display()))?
    };

    let export: Export = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a post export", input.display()))?;
    Ok(match export {
        Export::Envelope { data } | Export::Bare(data) => data,
    })
}

fn init_config(path: Option<&Path>) -> anyhow::Result<()> {
    let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let body = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    eprintln!("{} wrote {}", style("success").cyan(), path.display());
    Ok(())
}
