use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cli::RenderArgs;
use crate::config::FragmentStyles;
use crate::formats::{StructuredBook, read_json, write_output};
use crate::merge::{OFFICE_NS, PAGE_BREAK_STYLE, TEXT_NS};
use crate::title::clean_body_line;
use crate::unit::ContentUnit;
use crate::xml::{Element, XmlDocument};

pub const STYLE_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:style:1.0";
pub const FO_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0";

const ODF_VERSION: &str = "1.3";
const ODF_TEXT_MIMETYPE: &str = "application/vnd.oasis.opendocument.text";

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let book_path = PathBuf::from(&args.book);
    let out_dir = PathBuf::from(&args.out);

    let book: StructuredBook = read_json(&book_path).context("read book")?;
    let styles = match &args.config {
        Some(config) => crate::config::load(Path::new(config))?.fragment_styles,
        None => FragmentStyles::default(),
    };

    let written = write_fragments(&book, &styles, &out_dir, args.force)?;
    tracing::info!(
        fragments = written.len(),
        out = %out_dir.display(),
        "rendered fragments"
    );
    Ok(())
}

pub fn write_fragments(
    book: &StructuredBook,
    styles: &FragmentStyles,
    out_dir: &Path,
    force: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut written = Vec::new();

    for unit in &book.content {
        if !seen.insert(unit.title.as_str()) {
            continue;
        }
        let path = out_dir
            .join(unit.kind.origin().dir_name())
            .join(format!("{}.fodt", fragment_file_name(&unit.title)));

        let xml = render_fragment(unit, styles)
            .to_xml_string()
            .with_context(|| format!("serialize fragment: {}", unit.title))?;
        write_output(&path, xml.as_bytes(), force)?;
        tracing::debug!(key = %unit.title, path = %path.display(), "wrote fragment");
        written.push(path);
    }

    Ok(written)
}

pub fn fragment_file_name(key: &str) -> String {
    let name = key
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>();
    match name.trim() {
        "" | "." | ".." => "_".to_owned(),
        trimmed => trimmed.to_owned(),
    }
}

pub fn render_fragment(unit: &ContentUnit, styles: &FragmentStyles) -> XmlDocument {
    let mut text = Element::new("office:text")
        .with_child(heading(1, &styles.title, &unit.title));
    if let Some(subtitle) = &unit.subtitle {
        text = text.with_child(heading(2, &styles.subtitle, subtitle));
    }

    for line in &unit.body {
        let line = clean_body_line(line);
        if line.is_empty() {
            continue;
        }
        text = text.with_child(body_block(&line, styles));
    }

    let root = Element::new("office:document")
        .with_attr("xmlns:office", OFFICE_NS)
        .with_attr("xmlns:style", STYLE_NS)
        .with_attr("xmlns:text", TEXT_NS)
        .with_attr("xmlns:fo", FO_NS)
        .with_attr("office:version", ODF_VERSION)
        .with_attr("office:mimetype", ODF_TEXT_MIMETYPE)
        .with_child(automatic_styles())
        .with_child(Element::new("office:body").with_child(text));

    XmlDocument::new(root)
}

fn automatic_styles() -> Element {
    Element::new("office:automatic-styles").with_child(
        Element::new("style:style")
            .with_attr("style:name", PAGE_BREAK_STYLE)
            .with_attr("style:family", "paragraph")
            .with_child(
                Element::new("style:paragraph-properties").with_attr("fo:break-before", "page"),
            ),
    )
}

fn body_block(line: &str, styles: &FragmentStyles) -> Element {
    if let Some(rest) = line.strip_prefix("### ") {
        return heading(3, &styles.heading3, rest.trim());
    }
    if let Some(rest) = line.strip_prefix("## ") {
        return heading(2, &styles.subtitle, rest.trim());
    }
    if let Some(rest) = line.strip_prefix("# ") {
        return heading(1, &styles.title, rest.trim());
    }
    if let Some(rest) = line.strip_prefix("> ") {
        return paragraph(&styles.quotation, rest.trim());
    }
    if let Some(inner) = line
        .strip_prefix("**")
        .and_then(|rest| rest.strip_suffix("**"))
        .filter(|inner| !inner.trim().is_empty())
    {
        return paragraph(&styles.highlight, inner.trim());
    }
    paragraph(&styles.body, line)
}

fn heading(level: u8, style: &str, text: &str) -> Element {
    Element::new("text:h")
        .with_attr("text:style-name", style)
        .with_attr("text:outline-level", &level.to_string())
        .with_text(text)
}

fn paragraph(style: &str, text: &str) -> Element {
    Element::new("text:p")
        .with_attr("text:style-name", style)
        .with_text(text)
}
