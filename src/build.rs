use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cli::{BindArgs, BuildArgs, ManifestArgs, MergeArgs, RenderArgs, TocArgs};

#[derive(Debug, Clone)]
pub struct BuildPaths {
    pub config: PathBuf,
    pub input: PathBuf,
    pub manifest: PathBuf,
    pub book: PathBuf,
    pub toc: PathBuf,
    pub fragments: PathBuf,
    pub output: PathBuf,
}

impl BuildPaths {
    pub fn new(project_dir: &Path, config: PathBuf, lang: &str) -> Self {
        let generated = project_dir.join("generated").join(lang);
        Self {
            config,
            input: crate::manifest::input_dir(project_dir, lang),
            manifest: generated.join("manifest.json"),
            book: generated.join("book.json"),
            toc: generated.join("toc.yaml"),
            fragments: generated.join("fodt"),
            output: project_dir.join("output").join(lang).join("book.fodt"),
        }
    }

    pub fn existing_outputs(&self) -> impl Iterator<Item = &Path> {
        [
            &self.manifest,
            &self.book,
            &self.toc,
            &self.fragments,
            &self.output,
        ]
        .into_iter()
        .map(PathBuf::as_path)
        .filter(|path| path.exists())
    }
}

pub fn run(args: BuildArgs) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(&args.project);
    if !project_dir.is_dir() {
        anyhow::bail!("project directory not found: {}", project_dir.display());
    }
    let config = crate::config::find_config(&project_dir)?;
    let paths = BuildPaths::new(&project_dir, config, &args.lang);

    if !args.force
        && let Some(existing) = paths.existing_outputs().next()
    {
        anyhow::bail!(
            "build output already exists: {} (use --force to rebuild)",
            existing.display()
        );
    }

    tracing::info!(project = %project_dir.display(), lang = %args.lang, "build: manifest");
    crate::manifest::run(ManifestArgs {
        project: args.project.clone(),
        lang: args.lang.clone(),
        out: path_arg(&paths.manifest),
        force: args.force,
    })
    .context("manifest")?;

    tracing::info!("build: bind");
    crate::bind::run(BindArgs {
        input: path_arg(&paths.input),
        manifest: path_arg(&paths.manifest),
        out: path_arg(&paths.book),
        strict: args.strict,
        force: args.force,
    })
    .context("bind")?;

    tracing::info!("build: toc");
    crate::toc::run(TocArgs {
        book: path_arg(&paths.book),
        out: path_arg(&paths.toc),
        force: args.force,
    })
    .context("toc")?;

    tracing::info!("build: render");
    if args.force && paths.fragments.exists() {
        std::fs::remove_dir_all(&paths.fragments).with_context(|| {
            format!("remove stale fragments: {}", paths.fragments.display())
        })?;
    }
    crate::fragment::run(RenderArgs {
        book: path_arg(&paths.book),
        out: path_arg(&paths.fragments),
        config: Some(path_arg(&paths.config)),
        force: args.force,
    })
    .context("render")?;

    tracing::info!("build: merge");
    crate::merge::run(MergeArgs {
        fragments: path_arg(&paths.fragments),
        manifest: path_arg(&paths.manifest),
        out: path_arg(&paths.output),
        force: args.force,
    })
    .context("merge")?;

    tracing::info!(out = %paths.output.display(), "build: done");
    Ok(())
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
