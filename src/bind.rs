use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;

use anyhow::Context as _;

use crate::cli::BindArgs;
use crate::formats::{Manifest, StructuredBook, read_json, write_json};
use crate::title::normalize;
use crate::unit::{ContentUnit, scan_sources};

pub fn run(args: BindArgs) -> anyhow::Result<()> {
    let input_dir = PathBuf::from(&args.input);
    let manifest_path = PathBuf::from(&args.manifest);
    let out_path = PathBuf::from(&args.out);

    if out_path.exists() && !args.force {
        anyhow::bail!("book output already exists: {}", out_path.display());
    }

    let manifest: Manifest = read_json(&manifest_path).context("read manifest")?;
    let sources = scan_sources(&input_dir).context("scan sources")?;
    let units = index_units(sources.into_iter().map(|source| source.unit));

    let bound = bind(&manifest.order, &units);
    for key in &bound.unmatched {
        tracing::warn!(key = %key, "manifest entry has no source unit; skipping");
    }
    if args.strict && !bound.unmatched.is_empty() {
        anyhow::bail!(
            "{} manifest entries have no source unit: {}",
            bound.unmatched.len(),
            bound.unmatched.join(", ")
        );
    }

    tracing::info!(
        units = bound.units.len(),
        unmatched = bound.unmatched.len(),
        "bound reading order"
    );
    let book = StructuredBook {
        title: manifest.title,
        language: manifest.language,
        content: bound.units,
        unmatched: bound.unmatched,
    };
    write_json(&out_path, &book, args.force)?;

    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bound {
    pub units: Vec<ContentUnit>,
    pub unmatched: Vec<String>,
}

/// Keys parsed units by their normalized title. The first unit wins a key.
pub fn index_units<I>(units: I) -> HashMap<String, ContentUnit>
where
    I: IntoIterator<Item = ContentUnit>,
{
    let mut index = HashMap::new();
    for unit in units {
        match index.entry(normalize(&unit.title)) {
            Entry::Vacant(slot) => {
                slot.insert(unit);
            }
            Entry::Occupied(slot) => {
                tracing::warn!(key = %slot.key(), "duplicate unit title; keeping the first");
            }
        }
    }
    index
}

pub fn bind(order: &[String], units: &HashMap<String, ContentUnit>) -> Bound {
    let mut bound = Bound::default();

    for key in order {
        let Some(unit) = units.get(key) else {
            bound.unmatched.push(key.clone());
            continue;
        };

        let mut unit = unit.clone();
        unit.title = key.clone();
        if unit.kind.has_subtitle() {
            unit.subtitle = unit.subtitle.as_deref().map(normalize);
        }
        bound.units.push(unit);
    }

    bound
}
