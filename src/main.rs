use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    bookweave::logging::init().context("init logging")?;

    let cli = bookweave::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        bookweave::cli::Command::Build(args) => {
            bookweave::build::run(args).context("build")?;
        }
        bookweave::cli::Command::Parse(args) => {
            bookweave::unit::run(args).context("parse")?;
        }
        bookweave::cli::Command::Manifest(args) => {
            bookweave::manifest::run(args).context("manifest")?;
        }
        bookweave::cli::Command::Bind(args) => {
            bookweave::bind::run(args).context("bind")?;
        }
        bookweave::cli::Command::Toc(args) => {
            bookweave::toc::run(args).context("toc")?;
        }
        bookweave::cli::Command::Render(args) => {
            bookweave::fragment::run(args).context("render")?;
        }
        bookweave::cli::Command::Merge(args) => {
            bookweave::merge::run(args).context("merge")?;
        }
    }

    Ok(())
}
