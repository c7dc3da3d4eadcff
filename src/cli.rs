use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use kasync::khan::ContentKind;
use kasync::upload::Mode;

/// Subtitle sync between YouTube and Amara, and EMA feed export
#[derive(Parser)]
#[command(name = "kasync", version)]
#[command(about = "Subtitle sync between YouTube and Amara, and EMA feed export", long_about = None)]
pub struct Cli {
    /// Config file (TOML); defaults to kasync.toml in the user config dir
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload subtitles for the listed videos to Amara
    #[command(group(ArgGroup::new("source").required(true).args(["files", "youtube", "amara"])))]
    Upload {
        /// Whitespace-delimited list of videos
        input: PathBuf,
        /// Subtitle language code
        #[arg(short, long)]
        lang: String,
        /// Rows are `YTID FILENAME`; subtitles read from local files
        #[arg(short, long)]
        files: bool,
        /// Rows are `YTID`; subtitles downloaded from YouTube
        #[arg(short, long)]
        youtube: bool,
        /// Rows are `YTID_FROM YTID_TO`; subtitles copied between Amara videos
        #[arg(short, long)]
        amara: bool,
        /// Skip videos whose subtitles cannot be downloaded instead of asking
        #[arg(long)]
        skip_errors: bool,
        /// Overwrite existing subtitles without asking
        #[arg(long)]
        rewrite: bool,
        /// Never overwrite existing subtitles (wins over --rewrite)
        #[arg(long)]
        no_rewrite: bool,
        /// File with `API_KEY USERNAME`
        #[arg(short, long, default_value = "myapi.txt")]
        credentials: PathBuf,
    },
    /// Copy YouTube subtitles to Amara for every listed video
    Sync {
        /// Whitespace-delimited list of YouTube ids
        input: PathBuf,
        /// Subtitle language code
        #[arg(short, long, default_value = "en")]
        lang: String,
        /// File with `API_KEY USERNAME`
        #[arg(short, long, default_value = "myapi.txt")]
        credentials: PathBuf,
        /// Always on; accepted for compatibility
        #[arg(long, hide = true)]
        skip_errors: bool,
        /// Always on; accepted for compatibility
        #[arg(long, hide = true)]
        no_rewrite: bool,
    },
    /// Export a Khan Academy course as an EMA feed
    KaExport {
        /// Course slug, e.g. early-math
        #[arg(short = 's', long = "subject")]
        course: String,
        #[arg(short = 'c', long = "content", value_enum, default_value_t = ContentKind::Video)]
        kind: ContentKind,
        /// Ignore the cached topic tree
        #[arg(long)]
        refresh: bool,
        /// Where the feed is written
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Export a Khanova škola schema as an EMA feed
    #[command(group(ArgGroup::new("target").required(true).args(["schema", "all"])))]
    KsExport {
        /// Database password; defaults to the first line of the password file
        #[arg(short, long)]
        password: Option<String>,
        /// Schema slug, e.g. organicka-chemie
        #[arg(short, long)]
        schema: Option<String>,
        /// List all schemas instead of exporting
        #[arg(short, long)]
        all: bool,
        /// Where the feed is written
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

impl Commands {
    pub fn upload_mode(files: bool, youtube: bool) -> Mode {
        if files {
            Mode::Files
        } else if youtube {
            Mode::Youtube
        } else {
            Mode::Amara
        }
    }
}
