//! dumpgraph - activity statistics charts from archived dumps
//!
//! One-shot command-line front end for the request pipeline. The hosting
//! chat shell would normally drive the pipeline; this binary stands in for
//! it during local use and debugging.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dumpgraph_core::{Config, Guild, Member, RequestPipeline};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dumpgraph")]
#[command(about = "Long-term activity statistics from archived dumps")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the supported content types
    Options,

    /// Chart up to three content types for one member
    Get {
        /// Content types, first is the base plot (e.g. messages reactions)
        #[arg(required = true, num_args = 1..=3)]
        content: Vec<String>,

        #[command(flatten)]
        scope: Scope,

        /// Where to write the chart image
        #[arg(long, default_value = "chart.svg")]
        out: PathBuf,
    },

    /// Compare one content type across members
    Compare {
        /// Content type to compare
        content: String,

        /// Member IDs to overlay (up to three)
        #[arg(long = "with", num_args = 1..=3)]
        with: Vec<u64>,

        #[command(flatten)]
        scope: Scope,

        /// Where to write the chart image
        #[arg(long, default_value = "chart.svg")]
        out: PathBuf,
    },
}

/// Identity values normally resolved by the hosting shell.
#[derive(clap::Args, Debug)]
struct Scope {
    /// Guild ID
    #[arg(long)]
    guild: u64,

    /// Guild display name for the chart title
    #[arg(long, default_value = "guild")]
    guild_name: String,

    /// Requesting member ID
    #[arg(long)]
    user: u64,

    /// Requester display name for the chart legend
    #[arg(long, default_value = "you")]
    user_name: String,
}

impl Scope {
    fn guild(&self) -> Guild {
        Guild {
            id: self.guild,
            name: self.guild_name.clone(),
        }
    }

    fn requester(&self) -> Member {
        Member {
            id: self.user,
            display_name: self.user_name.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = dumpgraph_core::logging::init(&config.logging).ok();

    let pipeline = RequestPipeline::new(&config).context("failed to start pipeline")?;

    match args.command {
        Command::Options => {
            println!("Supported content types:");
            for label in pipeline.list_supported_content_types() {
                println!("  {}", label);
            }
        }
        Command::Get { content, scope, out } => {
            let contents: Vec<&str> = content.iter().map(String::as_str).collect();
            let image = pipeline
                .run_multi_metric(&scope.guild(), &contents, &scope.requester())
                .await
                .context("statistics request failed")?;
            std::fs::write(&out, &image.bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Wrote {} ({} bytes)", out.display(), image.bytes.len());
        }
        Command::Compare {
            content,
            with,
            scope,
            out,
        } => {
            let others: Vec<Member> = with
                .iter()
                .map(|id| Member {
                    id: *id,
                    display_name: format!("member {}", id),
                })
                .collect();
            let image = pipeline
                .run_comparison(&scope.guild(), &content, &scope.requester(), &others)
                .await
                .context("comparison request failed")?;
            std::fs::write(&out, &image.bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Wrote {} ({} bytes)", out.display(), image.bytes.len());
        }
    }

    Ok(())
}
