use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cli::ManifestArgs;
use crate::config::ProjectConfig;
use crate::formats::{Manifest, write_json};
use crate::order::resolve_order;
use crate::unit::{SourceUnit, scan_sources};

pub fn run(args: ManifestArgs) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(&args.project);
    let out_path = PathBuf::from(&args.out);

    if out_path.exists() && !args.force {
        anyhow::bail!("manifest output already exists: {}", out_path.display());
    }

    let config_path = crate::config::find_config(&project_dir)?;
    let config = crate::config::load(&config_path).context("load project config")?;

    let input_dir = input_dir(&project_dir, &args.lang);
    if !input_dir.is_dir() {
        anyhow::bail!("input directory not found: {}", input_dir.display());
    }
    let sources = scan_sources(&input_dir).context("scan sources")?;

    let manifest = build_manifest(&config, &args.lang, &sources);
    tracing::info!(
        entries = manifest.order.len(),
        sources = sources.len(),
        "resolved reading order"
    );
    write_json(&out_path, &manifest, args.force)?;

    Ok(())
}

pub fn input_dir(project_dir: &Path, lang: &str) -> PathBuf {
    project_dir.join("input").join(lang)
}

pub fn build_manifest(config: &ProjectConfig, lang: &str, sources: &[SourceUnit]) -> Manifest {
    let titles = sources
        .iter()
        .map(|source| source.unit.title.as_str())
        .collect::<Vec<_>>();
    let order = resolve_order(&config.policy(), &titles);

    Manifest {
        title: config.book_title(),
        author: config.author.clone(),
        publication_date: config.publication_date(),
        language: lang.to_owned(),
        styles: config.styles.clone(),
        format: config.format.clone(),
        cover: format!("input/{lang}/images/cover.jpg"),
        order,
    }
}
