use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cli::MergeArgs;
use crate::formats::{Manifest, read_json};
use crate::fragment::fragment_file_name;
use crate::unit::SourceOrigin;
use crate::xml::{Element, NamespaceScope, Node, XmlDocument, XmlError};

pub const OFFICE_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:office:1.0";
pub const TEXT_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";
pub const PAGE_BREAK_STYLE: &str = "page-break";

pub fn run(args: MergeArgs) -> anyhow::Result<()> {
    let fragments_dir = PathBuf::from(&args.fragments);
    let manifest_path = PathBuf::from(&args.manifest);
    let out_path = PathBuf::from(&args.out);

    if out_path.exists() && !args.force {
        anyhow::bail!("merge output already exists: {}", out_path.display());
    }

    let manifest: Manifest = read_json(&manifest_path).context("read manifest")?;
    let located = locate_fragments(&fragments_dir, &manifest.order);
    if located.paths.is_empty() {
        anyhow::bail!("no fragments found in {}", fragments_dir.display());
    }

    let merged = merge(&located.paths)?;
    merged.write_atomic(&out_path)?;
    tracing::info!(
        fragments = merged.fragment_count(),
        missing = located.missing.len(),
        out = %out_path.display(),
        "merged document"
    );

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("no fragments to merge")]
    NoFragments,
    #[error("fragment #{index} ({}) could not be read: {source}", label(.path))]
    Read {
        index: usize,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("fragment #{index} ({}) failed to parse: {source}", label(.path))]
    Parse {
        index: usize,
        path: PathBuf,
        source: XmlError,
    },
    #[error("fragment #{index} ({}) has no office:body/office:text element", label(.path))]
    MissingBody { index: usize, path: PathBuf },
    #[error("write merged document {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug)]
pub struct MissingBody;

/// Owns the target tree while fragments are appended.
///
/// Created from the base document, fed with [`MergeBuilder::append`] and
/// consumed by [`MergeBuilder::finish`]; the tree is not reachable from
/// outside until then.
#[derive(Debug)]
pub struct MergeBuilder {
    base: XmlDocument,
    body_path: Vec<usize>,
    body_scope: NamespaceScope,
    merged: usize,
}

impl MergeBuilder {
    pub fn new(base: XmlDocument) -> Result<Self, MissingBody> {
        let located = base
            .locate_child_of(OFFICE_NS, "body", "text")
            .ok_or(MissingBody)?;
        Ok(Self {
            base,
            body_path: located.path,
            body_scope: located.scope,
            merged: 1,
        })
    }

    pub fn append(&mut self, mut fragment: XmlDocument) -> Result<(), MissingBody> {
        let located = fragment
            .locate_child_of(OFFICE_NS, "body", "text")
            .ok_or(MissingBody)?;
        let children = fragment
            .element_at_mut(&located.path)
            .map(|body| std::mem::take(&mut body.children))
            .ok_or(MissingBody)?;

        let mut redeclare = located
            .scope
            .declarations()
            .filter(|(prefix, uri)| self.body_scope.uri(prefix) != Some(*uri))
            .map(|(prefix, uri)| (xmlns_attr(prefix), uri.to_owned()))
            .collect::<Vec<_>>();
        redeclare.sort();

        let separator = self.page_break();
        let body = self.body_mut()?;
        body.children.push(Node::Element(separator));
        for mut node in children {
            if let Node::Element(element) = &mut node {
                for (name, uri) in &redeclare {
                    if element.attr(name).is_none() {
                        element.set_attr(name.clone(), uri);
                    }
                }
            }
            body.children.push(node);
        }

        self.merged += 1;
        Ok(())
    }

    pub fn finish(self) -> MergedDocument {
        MergedDocument {
            document: self.base,
            fragments: self.merged,
        }
    }

    fn body_mut(&mut self) -> Result<&mut Element, MissingBody> {
        self.base.element_at_mut(&self.body_path).ok_or(MissingBody)
    }

    fn page_break(&self) -> Element {
        // Attributes need a prefix: unprefixed ones are in no namespace.
        let prefix = self
            .body_scope
            .declarations()
            .filter(|(prefix, uri)| !prefix.is_empty() && *uri == TEXT_NS)
            .map(|(prefix, _)| prefix)
            .min();
        match prefix {
            Some(prefix) => Element::new(format!("{prefix}:p"))
                .with_attr(format!("{prefix}:style-name"), PAGE_BREAK_STYLE),
            None => Element::new("text:p")
                .with_attr("xmlns:text", TEXT_NS)
                .with_attr("text:style-name", PAGE_BREAK_STYLE),
        }
    }
}

fn xmlns_attr(prefix: &str) -> String {
    if prefix.is_empty() {
        "xmlns".to_owned()
    } else {
        format!("xmlns:{prefix}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDocument {
    document: XmlDocument,
    fragments: usize,
}

impl MergedDocument {
    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Writes to `target` through a temporary file in the same directory, so
    /// `target` is either the complete document or untouched.
    pub fn write_atomic(&self, target: &Path) -> Result<(), MergeError> {
        let write_err = |source| MergeError::Write {
            path: target.to_path_buf(),
            source,
        };

        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(write_err)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
        let mut out = std::io::BufWriter::new(temp.as_file_mut());
        self.document.write_to(&mut out).map_err(write_err)?;
        out.flush().map_err(write_err)?;
        drop(out);
        temp.persist(target).map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

pub fn merge(paths: &[PathBuf]) -> Result<MergedDocument, MergeError> {
    let Some((first, rest)) = paths.split_first() else {
        return Err(MergeError::NoFragments);
    };

    let base = load_fragment(1, first)?;
    let mut builder = MergeBuilder::new(base).map_err(|MissingBody| MergeError::MissingBody {
        index: 1,
        path: first.clone(),
    })?;
    tracing::debug!(path = %first.display(), "merge base loaded");

    for (offset, path) in rest.iter().enumerate() {
        let index = offset + 2;
        let fragment = load_fragment(index, path)?;
        builder
            .append(fragment)
            .map_err(|MissingBody| MergeError::MissingBody {
                index,
                path: path.clone(),
            })?;
        tracing::debug!(index, path = %path.display(), "merged fragment");
    }

    Ok(builder.finish())
}

fn load_fragment(index: usize, path: &Path) -> Result<XmlDocument, MergeError> {
    let contents = std::fs::read_to_string(path).map_err(|source| MergeError::Read {
        index,
        path: path.to_path_buf(),
        source,
    })?;
    XmlDocument::parse(&contents).map_err(|source| MergeError::Parse {
        index,
        path: path.to_path_buf(),
        source,
    })
}

const FRAGMENT_SUBDIRS: [Option<SourceOrigin>; 4] = [
    Some(SourceOrigin::Chapters),
    Some(SourceOrigin::Parts),
    Some(SourceOrigin::Components),
    None,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedFragments {
    pub paths: Vec<PathBuf>,
    pub missing: Vec<String>,
}

pub fn locate_fragments(dir: &Path, order: &[String]) -> LocatedFragments {
    let mut located = LocatedFragments::default();

    for key in order {
        let file_name = format!("{}.fodt", fragment_file_name(key));
        let found = FRAGMENT_SUBDIRS
            .iter()
            .map(|sub| match sub {
                Some(origin) => dir.join(origin.dir_name()).join(&file_name),
                None => dir.join(&file_name),
            })
            .find(|candidate| candidate.is_file());

        match found {
            Some(path) => located.paths.push(path),
            None => {
                tracing::warn!(key = %key, "fragment not found; skipping");
                located.missing.push(key.clone());
            }
        }
    }

    located
}
