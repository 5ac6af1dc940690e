use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use mood_music_core::{
    load_feed, render_melody, AppConfig, MelodyRequest, MelodyStep, MoodMusicError, MoodProfile,
    RecordingSettings, WavRecorder,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn main() -> mood_music_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Describe { source, notes } => run_describe(&config, &source, notes),
        Commands::Render {
            source,
            seconds,
            output,
        } => run_render(&config, &source, seconds, &output),
    }
}

fn load_config(path: Option<&Path>) -> mood_music_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

#[derive(Serialize)]
struct Description<'a> {
    title: &'a str,
    profile: &'a MoodProfile,
    start_offset: usize,
    steps: Vec<MelodyStep>,
}

fn run_describe(config: &AppConfig, source: &SourceArgs, notes: usize) -> mood_music_core::Result<()> {
    let request = source.request()?;
    let melody = request.melody(config)?;
    let description = Description {
        title: &request.title,
        profile: melody.profile(),
        start_offset: melody.start_offset(),
        steps: melody.steps().take(notes).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}

fn run_render(
    config: &AppConfig,
    source: &SourceArgs,
    seconds: f64,
    output: &Path,
) -> mood_music_core::Result<()> {
    let request = source.request()?;
    let audio = render_melody(&request, config, seconds)?;
    WavRecorder::new(RecordingSettings::new(output)).write(&audio)?;
    tracing::info!(
        ?output,
        notes = audio.notes_played,
        seconds = audio.duration_seconds(),
        "render complete"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Procedural mood music for news headlines", long_about = None)]
struct Cli {
    /// JSON configuration file overriding audio settings and the mood table.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved profile and the first notes as JSON.
    Describe {
        #[command(flatten)]
        source: SourceArgs,
        /// Number of notes to list.
        #[arg(short, long, default_value_t = 8)]
        notes: usize,
    },
    /// Render the melody to a WAV file.
    Render {
        #[command(flatten)]
        source: SourceArgs,
        /// Length of playback before the stop fade, in seconds.
        #[arg(short, long, default_value_t = 8.0)]
        seconds: f64,
        /// Output WAV path.
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Where the title and labels come from: flags, or an article in a feed page.
#[derive(Args, Debug)]
struct SourceArgs {
    /// Headline used as the melody seed.
    #[arg(short, long, conflicts_with = "feed")]
    title: Option<String>,
    /// Subgenre label, looked up before the category.
    #[arg(long)]
    subgenre: Option<String>,
    /// Category label of the page.
    #[arg(long)]
    category: Option<String>,
    /// JSON feed page to pick an article from.
    #[arg(long)]
    feed: Option<PathBuf>,
    /// Article position within the feed page.
    #[arg(long, default_value_t = 0)]
    index: usize,
}

impl SourceArgs {
    fn request(&self) -> mood_music_core::Result<MelodyRequest> {
        if let Some(feed) = &self.feed {
            let articles = load_feed(feed)?;
            let article = articles.get(self.index).ok_or_else(|| {
                MoodMusicError::msg(format!(
                    "feed {} has {} articles, no index {}",
                    feed.display(),
                    articles.len(),
                    self.index
                ))
            })?;
            let mut request = article.melody_request(self.category.as_deref());
            if self.subgenre.is_some() {
                request.subgenre = self.subgenre.clone();
            }
            return Ok(request);
        }

        let title = self
            .title
            .clone()
            .ok_or_else(|| MoodMusicError::msg("either --title or --feed is required"))?;
        Ok(MelodyRequest {
            title,
            subgenre: self.subgenre.clone(),
            category: self.category.clone(),
        })
    }
}
