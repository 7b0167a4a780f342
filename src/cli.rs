use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run manifest, bind, toc, render and merge for one language.
    Build(BuildArgs),
    /// Parse markdown sources into one JSON file per unit.
    Parse(ParseArgs),
    /// Resolve the reading order and write `manifest.json`.
    Manifest(ManifestArgs),
    /// Bind parsed units to the manifest order and write `book.json`.
    Bind(BindArgs),
    /// Group `book.json` into a nested `toc.yaml`.
    Toc(TocArgs),
    /// Render one ODF fragment per unit of `book.json`.
    Render(RenderArgs),
    /// Consolidate rendered fragments into one ODF document.
    Merge(MergeArgs),
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Project directory (holds `config.json` and `input/`).
    #[arg(long)]
    pub project: String,

    /// Language subdirectory to build (`input/<lang>`).
    #[arg(long)]
    pub lang: String,

    /// Overwrite outputs from a previous build.
    #[arg(long)]
    pub force: bool,

    /// Fail when a manifest entry has no source unit.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Source directory with `chapters/`, `parts/` and `components/`.
    #[arg(long)]
    pub input: String,

    /// Output directory for per-unit JSON files.
    #[arg(long)]
    pub out: String,

    /// Overwrite existing JSON files.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Project directory (holds `config.json` and `input/`).
    #[arg(long)]
    pub project: String,

    /// Language subdirectory (`input/<lang>`).
    #[arg(long)]
    pub lang: String,

    /// Output file path for `manifest.json`.
    #[arg(long)]
    pub out: String,

    /// Overwrite an existing manifest.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct BindArgs {
    /// Source directory with `chapters/`, `parts/` and `components/`.
    #[arg(long)]
    pub input: String,

    /// Input path to `manifest.json`.
    #[arg(long)]
    pub manifest: String,

    /// Output file path for `book.json`.
    #[arg(long)]
    pub out: String,

    /// Fail when a manifest entry has no source unit.
    #[arg(long)]
    pub strict: bool,

    /// Overwrite an existing `book.json`.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct TocArgs {
    /// Input path to `book.json`.
    #[arg(long)]
    pub book: String,

    /// Output file path for `toc.yaml`.
    #[arg(long)]
    pub out: String,

    /// Overwrite an existing `toc.yaml`.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Input path to `book.json`.
    #[arg(long)]
    pub book: String,

    /// Output directory for fragments (`<out>/<chapters|parts|components>/`).
    #[arg(long)]
    pub out: String,

    /// Project config providing `fragment_styles` (default style names otherwise).
    #[arg(long)]
    pub config: Option<String>,

    /// Overwrite existing fragments.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Fragment directory (created by `render`).
    #[arg(long)]
    pub fragments: String,

    /// Input path to `manifest.json` (fragment order).
    #[arg(long)]
    pub manifest: String,

    /// Output file path for the consolidated `.fodt`.
    #[arg(long)]
    pub out: String,

    /// Replace an existing output file.
    #[arg(long)]
    pub force: bool,
}
