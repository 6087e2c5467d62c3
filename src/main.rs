use std::path::PathBuf;

use clap::{
    Args, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spunwrap::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Log every request (same as RUST_LOG=debug)
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch track metadata for every track id in the history
    Tracks(SourceOptions),

    /// Fetch audio features for every track id in the history
    AudioFeatures(SourceOptions),

    /// Search artist metadata for every artist in the history
    Artists(SourceOptions),

    /// Search track metadata for every artist/track pair in the history
    TrackSearch(SourceOptions),

    /// Summarize the streaming history without calling Spotify
    History(HistoryOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Args, Debug, Clone)]
pub struct SourceOptions {
    /// Export zip or directory with the history files
    #[clap(long)]
    source: Option<PathBuf>,

    /// Directory to write the tables to
    #[clap(long)]
    output: Option<PathBuf>,

    /// Also write the raw records as JSON
    #[clap(long)]
    dump_raw_json: bool,
}

impl From<SourceOptions> for cli::RunOptions {
    fn from(opts: SourceOptions) -> Self {
        cli::RunOptions {
            source: opts.source,
            output: opts.output,
            dump_raw_json: opts.dump_raw_json,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct HistoryOptions {
    /// Export zip or directory with the history files
    #[clap(long)]
    source: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn init_logger(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .target(env_logger::Target::Pipe(Box::new(cli::ProgressLogWriter)))
        .init();
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Tracks(opt) => cli::tracks(opt.into()).await,
        Command::AudioFeatures(opt) => cli::audio_features(opt.into()).await,
        Command::Artists(opt) => cli::artists(opt.into()).await,
        Command::TrackSearch(opt) => cli::track_search(opt.into()).await,
        Command::History(opt) => cli::history(opt.source).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
