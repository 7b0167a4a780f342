use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::cli::ParseArgs;
use crate::formats::write_json;

pub fn run(args: ParseArgs) -> anyhow::Result<()> {
    let input_dir = PathBuf::from(&args.input);
    let out_dir = PathBuf::from(&args.out);

    if !input_dir.is_dir() {
        anyhow::bail!("input directory not found: {}", input_dir.display());
    }

    let sources = scan_sources(&input_dir).context("scan sources")?;
    for source in &sources {
        let out_path = out_dir
            .join(source.unit.kind.origin().dir_name())
            .join(format!("{}.json", source.stem));
        write_json(&out_path, &source.unit, args.force)?;
    }

    tracing::info!(units = sources.len(), out = %out_dir.display(), "parsed source units");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOrigin {
    Chapters,
    Parts,
    Components,
}

impl SourceOrigin {
    pub const ALL: [SourceOrigin; 3] = [
        SourceOrigin::Chapters,
        SourceOrigin::Parts,
        SourceOrigin::Components,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            SourceOrigin::Chapters => "chapters",
            SourceOrigin::Parts => "parts",
            SourceOrigin::Components => "components",
        }
    }
}

/// What a content unit is. Decided once at ingestion and carried afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Chapter,
    Part,
    Simple(String),
}

impl UnitKind {
    pub fn classify(origin: SourceOrigin, stem: &str) -> UnitKind {
        match origin {
            SourceOrigin::Chapters => UnitKind::Chapter,
            SourceOrigin::Parts => UnitKind::Part,
            SourceOrigin::Components => UnitKind::Simple(stem.to_lowercase()),
        }
    }

    pub fn origin(&self) -> SourceOrigin {
        match self {
            UnitKind::Chapter => SourceOrigin::Chapters,
            UnitKind::Part => SourceOrigin::Parts,
            UnitKind::Simple(_) => SourceOrigin::Components,
        }
    }

    pub fn has_subtitle(&self) -> bool {
        !matches!(self, UnitKind::Simple(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub kind: UnitKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub body: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("source unit is empty")]
    Empty,
    #[error("source unit needs a title and a subtitle line")]
    MissingSubtitle,
}

pub fn parse_unit(text: &str, origin: SourceOrigin, stem: &str) -> Result<ContentUnit, UnitError> {
    let kind = UnitKind::classify(origin, stem);
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned);

    let title = lines.next().ok_or(UnitError::Empty)?;
    let subtitle = if kind.has_subtitle() {
        Some(lines.next().ok_or(UnitError::MissingSubtitle)?)
    } else {
        None
    };

    Ok(ContentUnit {
        kind,
        title,
        subtitle,
        body: lines.collect(),
    })
}

#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub stem: String,
    pub unit: ContentUnit,
}

pub fn scan_sources(input_dir: &Path) -> anyhow::Result<Vec<SourceUnit>> {
    let mut sources = Vec::new();

    for origin in SourceOrigin::ALL {
        let dir = input_dir.join(origin.dir_name());
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "source directory not found; skipping");
            continue;
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("read source dir: {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("md") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
                tracing::warn!(path = %path.display(), "source file name is not utf-8; skipping");
                continue;
            };
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("read source unit: {}", path.display()))?;

            match parse_unit(&text, origin, &stem) {
                Ok(unit) => {
                    tracing::debug!(path = %path.display(), title = %unit.title, "parsed source unit");
                    sources.push(SourceUnit { stem, unit });
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping source unit");
                }
            }
        }
    }

    Ok(sources)
}
