use std::path::PathBuf;

use anyhow::Context as _;

use crate::cli::TocArgs;
use crate::formats::{StructuredBook, Toc, TocChapter, TocEntry, TocPart, read_json, write_output};
use crate::unit::{ContentUnit, UnitKind};

pub fn run(args: TocArgs) -> anyhow::Result<()> {
    let book_path = PathBuf::from(&args.book);
    let out_path = PathBuf::from(&args.out);

    if out_path.exists() && !args.force {
        anyhow::bail!("toc output already exists: {}", out_path.display());
    }

    let book: StructuredBook = read_json(&book_path).context("read book")?;
    if book.content.is_empty() {
        anyhow::bail!("book has no content: {}", book_path.display());
    }

    let toc = group_toc(&book.title, &book.content);
    let yaml = serde_yaml::to_string(&toc).context("serialize toc yaml")?;
    write_output(&out_path, yaml.as_bytes(), args.force)?;

    Ok(())
}

pub fn group_toc(book_title: &str, units: &[ContentUnit]) -> Toc {
    let mut entries = Vec::new();
    let mut open_part: Option<TocPart> = None;
    let mut chapter_count = 0usize;
    let mut part_count = 0usize;

    for unit in units {
        match &unit.kind {
            UnitKind::Part => {
                if let Some(part) = open_part.take() {
                    entries.push(TocEntry::Part(part));
                }
                part_count += 1;
                open_part = Some(TocPart {
                    id: format!("pt{part_count:02}"),
                    title: unit.title.clone(),
                    subtitle: unit.subtitle.clone(),
                    chapters: Vec::new(),
                });
            }
            UnitKind::Chapter => {
                chapter_count += 1;
                let chapter = TocChapter {
                    id: format!("ch{chapter_count:02}"),
                    title: unit.title.clone(),
                    subtitle: unit.subtitle.clone(),
                };
                match open_part.as_mut() {
                    Some(part) => part.chapters.push(chapter),
                    None => entries.push(TocEntry::Chapter(chapter)),
                }
            }
            UnitKind::Simple(component) => {
                if let Some(part) = open_part.take() {
                    entries.push(TocEntry::Part(part));
                }
                entries.push(TocEntry::Component {
                    title: unit.title.clone(),
                    component: component.clone(),
                });
            }
        }
    }
    if let Some(part) = open_part {
        entries.push(TocEntry::Part(part));
    }

    Toc {
        book_title: book_title.to_owned(),
        entries,
    }
}
