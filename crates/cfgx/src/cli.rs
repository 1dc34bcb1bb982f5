//! Command-line interface of the `cfgx` binary.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use cfgx_tree::ConfigResult;
use clap::{Args, Parser, Subcommand};

use crate::format::{FormatOptions, FormatStyle, dumps, format};
use crate::loader::{LoadOptions, load};

/// Load layered config documents and print the result
#[derive(Parser, Debug)]
#[command(name = "cfgx", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged config
    Render(RenderArgs),
    /// Print the merged config as a document that loads back to the same values
    Dump(RenderArgs),
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Config documents; later ones take precedence
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Overrides such as `trainer.max_steps=5000`, `tags+=fast` or `model.dropout!=`
    #[arg(short = 'o', long = "override", num_args = 1..)]
    pub overrides: Vec<String>,

    /// `compact` or `pretty`
    #[arg(long, default_value = "compact")]
    pub format: FormatStyle,

    /// Sort mapping keys
    #[arg(long)]
    pub sort_keys: bool,

    /// Leave lazy values uncomputed
    #[arg(long)]
    pub no_resolve: bool,
}

impl RenderArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            overrides: self.overrides.clone(),
            resolve_lazy: !self.no_resolve,
        }
    }

    fn format_options(&self) -> FormatOptions {
        FormatOptions {
            style: self.format,
            sort_keys: self.sort_keys,
        }
    }
}

/// Run `cli`, writing its output to `out`.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> ConfigResult<()> {
    let text = match &cli.command {
        Command::Render(args) => {
            let cfg = load(&args.paths, &args.load_options())?;
            format!("{}\n", format(&cfg, &args.format_options()))
        }
        Command::Dump(args) => {
            let cfg = load(&args.paths, &args.load_options())?;
            dumps(&cfg, &args.format_options())
        }
    };

    out.write_all(text.as_bytes())
        .context("failed to write output")?;
    Ok(())
}
