use std::fs;
use std::path::Path;

use bookweave::formats::{Manifest, StructuredBook, Toc, TocEntry};
use predicates::prelude::*;

const OFFICE_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:office:1.0";
const TEXT_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write file");
}

fn sample_project(root: &Path) {
    write(
        &root.join("config.json"),
        r#"{
  "titulo": "Liderando a Transformação",
  "autor": "Equipe",
  "data_publicacao": "2024-05-01",
  "ordem_predefinida": ["Epígrafe", "Introdução", "PARTES", "Agradecimentos", "Posfácio"],
  "mapeamento_partes": {"1": 1, "2": 3}
}
"#,
    );

    let input = root.join("input").join("pt");
    write(
        &input.join("components").join("epigrafe.md"),
        "Epígrafe\n\nO caminho se faz -- caminhando.\n",
    );
    write(
        &input.join("components").join("introducao.md"),
        "# Introdução\n\nBem-vindo.\n",
    );
    write(
        &input.join("components").join("posfacio.md"),
        "Posfácio\n\n**Obrigado**\n",
    );
    write(
        &input.join("parts").join("parte1.md"),
        "# Parte I -- Fundamentos\n## Onde tudo começa\n",
    );
    write(
        &input.join("parts").join("parte2.md"),
        "# Parte II -- Prática\n## Mãos à obra\n",
    );
    for (n, stem) in [(1, "01"), (2, "02"), (3, "03"), (4, "04")] {
        write(
            &input.join("chapters").join(format!("{stem}.md")),
            &format!("# Capítulo {n}\n## Assunto {n}\n\nTexto do capítulo {n}.\n> Citação {n}\n"),
        );
    }
}

fn build_cmd(project: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookweave");
    cmd.args(["build", "--project"])
        .arg(project)
        .args(["--lang", "pt"]);
    cmd
}

#[test]
fn build_produces_manifest_book_toc_and_merged_document() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let project = temp.path();
    sample_project(project);

    build_cmd(project).assert().success();

    let generated = project.join("generated").join("pt");
    let manifest: Manifest = serde_json::from_str(
        &fs::read_to_string(generated.join("manifest.json")).expect("read manifest"),
    )
    .expect("parse manifest");
    assert_eq!(
        manifest.order,
        vec![
            "Epígrafe",
            "Introdução",
            "Parte I — Fundamentos",
            "Capítulo 1",
            "Capítulo 2",
            "Parte II — Prática",
            "Capítulo 3",
            "Capítulo 4",
            "Agradecimentos",
            "Posfácio",
        ]
    );

    let book: StructuredBook = serde_json::from_str(
        &fs::read_to_string(generated.join("book.json")).expect("read book"),
    )
    .expect("parse book");
    assert_eq!(book.unmatched, vec!["Agradecimentos"]);
    assert_eq!(book.content.len(), 9);
    assert_eq!(book.content[2].subtitle.as_deref(), Some("Onde tudo começa"));

    let toc: Toc = serde_yaml::from_str(
        &fs::read_to_string(generated.join("toc.yaml")).expect("read toc"),
    )
    .expect("parse toc");
    let parts = toc
        .entries
        .iter()
        .filter_map(|entry| match entry {
            TocEntry::Part(part) => Some(part.chapters.len()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(parts, vec![2, 2]);

    let merged_path = project.join("output").join("pt").join("book.fodt");
    let merged = fs::read_to_string(&merged_path).expect("read merged document");
    let doc = bookweave::xml::XmlDocument::parse(&merged).expect("merged document parses");
    let located = doc
        .locate_child_of(OFFICE_NS, "body", "text")
        .expect("merged body");
    let body = doc.element_at(&located.path).expect("body element");

    let breaks = body
        .child_elements()
        .filter(|e| e.attr("text:style-name").as_deref() == Some("page-break"))
        .count();
    assert_eq!(breaks, 8);
    assert_eq!(located.scope.prefix_for(TEXT_NS), Some("text"));

    let text = body.text_content();
    let epigraph = text.find("O caminho se faz — caminhando.").expect("epigraph");
    let chapter3 = text.find("Texto do capítulo 3.").expect("chapter 3");
    let thanks = text.find("Obrigado").expect("afterword");
    assert!(epigraph < chapter3 && chapter3 < thanks);
}

#[test]
fn strict_build_fails_on_unmatched_entries() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let project = temp.path();
    sample_project(project);

    build_cmd(project)
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Agradecimentos"));

    assert!(!project.join("output").join("pt").join("book.fodt").exists());
}

#[test]
fn rebuild_requires_force() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let project = temp.path();
    sample_project(project);

    build_cmd(project).assert().success();
    build_cmd(project)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    build_cmd(project).arg("--force").assert().success();
}

#[test]
fn retry_after_strict_failure_requires_force() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let project = temp.path();
    sample_project(project);

    build_cmd(project).arg("--strict").assert().failure();
    assert!(project.join("generated").join("pt").join("manifest.json").exists());

    build_cmd(project)
        .assert()
        .failure()
        .stderr(predicate::str::contains("use --force to rebuild"));
    build_cmd(project).arg("--force").assert().success();
    assert!(project.join("output").join("pt").join("book.fodt").exists());
}

#[test]
fn forced_rebuild_drops_fragments_of_removed_sources() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let project = temp.path();
    sample_project(project);

    build_cmd(project).assert().success();
    let stale = project
        .join("generated")
        .join("pt")
        .join("fodt")
        .join("components")
        .join("Posfácio.fodt");
    assert!(stale.exists());

    fs::remove_file(
        project
            .join("input")
            .join("pt")
            .join("components")
            .join("posfacio.md"),
    )
    .expect("remove source");
    build_cmd(project).arg("--force").assert().success();

    assert!(!stale.exists());
    let book: StructuredBook = serde_json::from_str(
        &fs::read_to_string(project.join("generated").join("pt").join("book.json"))
            .expect("read book"),
    )
    .expect("parse book");
    assert!(book.content.iter().all(|unit| unit.title != "Posfácio"));
    let merged = fs::read_to_string(project.join("output").join("pt").join("book.fodt"))
        .expect("read merged");
    assert!(!merged.contains("Obrigado"));
}

#[test]
fn merge_names_the_broken_fragment_and_writes_nothing() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let root = temp.path();
    let fragment = |body: &str| {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document xmlns:office="{OFFICE_NS}" xmlns:text="{TEXT_NS}">
  <office:body><office:text>{body}</office:text></office:body>
</office:document>
"#
        )
    };
    write(
        &root.join("fodt").join("chapters").join("Capítulo 1.fodt"),
        &fragment("<text:p>um</text:p>"),
    );
    write(
        &root.join("fodt").join("chapters").join("Capítulo 2.fodt"),
        "<office:document><office:body><office:text>",
    );
    write(
        &root.join("fodt").join("chapters").join("Capítulo 3.fodt"),
        &fragment("<text:p>três</text:p>"),
    );
    write(
        &root.join("manifest.json"),
        r#"{"title":"Livro","publication_date":"2024-01-01","language":"pt","cover":"input/pt/images/cover.jpg","order":["Capítulo 1","Capítulo 2","Capítulo 3"]}"#,
    );
    let out = root.join("out").join("book.fodt");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookweave");
    cmd.arg("merge")
        .arg("--fragments")
        .arg(root.join("fodt"))
        .arg("--manifest")
        .arg(root.join("manifest.json"))
        .arg("--out")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("fragment #2 (Capítulo 2.fodt)"));

    assert!(!out.exists());
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let project = temp.path();
    sample_project(project);

    build_cmd(project)
        .env("RUST_LOG", "debug")
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"))
        .stderr(predicate::str::contains("build: merge"));
}

#[test]
fn missing_manifest_entry_is_warned_at_bind_and_merge() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let project = temp.path();
    sample_project(project);

    build_cmd(project)
        .assert()
        .success()
        .stderr(predicate::str::contains("manifest entry has no source unit"))
        .stderr(predicate::str::contains("fragment not found"));
}
