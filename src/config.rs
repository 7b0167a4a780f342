use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::order::OrderingPolicy;

pub const CONFIG_FILE_NAMES: [&str; 3] = ["config.json", "config.yaml", "config.yml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default, alias = "titulo")]
    pub title: Option<String>,
    #[serde(default, alias = "autor")]
    pub author: Option<String>,
    #[serde(default, alias = "data_publicacao")]
    pub publication_date: Option<String>,
    #[serde(default, alias = "estilos")]
    pub styles: Option<String>,
    #[serde(default, alias = "formato")]
    pub format: Option<String>,
    #[serde(default, alias = "ordem_predefinida")]
    pub order: Vec<String>,
    #[serde(default, alias = "mapeamento_partes")]
    pub part_starts: BTreeMap<u64, u64>,
    #[serde(default)]
    pub fragment_styles: FragmentStyles,
}

impl ProjectConfig {
    pub fn policy(&self) -> OrderingPolicy {
        OrderingPolicy {
            sequence: self.order.clone(),
            part_starts: self.part_starts.clone(),
        }
    }

    pub fn book_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| "Livro Digital".to_owned())
    }

    pub fn publication_date(&self) -> String {
        self.publication_date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().date_naive().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentStyles {
    pub title: String,
    pub subtitle: String,
    pub heading3: String,
    pub body: String,
    pub quotation: String,
    pub highlight: String,
}

impl Default for FragmentStyles {
    fn default() -> Self {
        Self {
            title: "Título Principal".to_owned(),
            subtitle: "Subtítulo".to_owned(),
            heading3: "Título Nível 3".to_owned(),
            body: "Texto Corpo".to_owned(),
            quotation: "Citação".to_owned(),
            highlight: "Texto Destaque".to_owned(),
        }
    }
}

pub fn find_config(project_dir: &Path) -> anyhow::Result<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no project config ({}) in {}",
                CONFIG_FILE_NAMES.join(", "),
                project_dir.display()
            )
        })
}

pub fn load(path: &Path) -> anyhow::Result<ProjectConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&contents)
            .with_context(|| format!("parse yaml config: {}", path.display()))?,
        _ => serde_json::from_str(&contents)
            .with_context(|| format!("parse json config: {}", path.display()))?,
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_json_keys_are_accepted() -> anyhow::Result<()> {
        let json = r#"{
            "titulo": "Liderando a Transformação",
            "autor": "Fulano",
            "estilos": "estilos/estilo_livro.json",
            "formato": "A5",
            "ordem_predefinida": ["Epígrafe", "PARTES", "Posfácio"],
            "mapeamento_partes": {"1": 1, "2": 5}
        }"#;
        let config: ProjectConfig = serde_json::from_str(json)?;

        assert_eq!(config.title.as_deref(), Some("Liderando a Transformação"));
        assert_eq!(config.order, vec!["Epígrafe", "PARTES", "Posfácio"]);
        assert_eq!(config.part_starts.get(&2), Some(&5));
        assert_eq!(config.fragment_styles, FragmentStyles::default());
        Ok(())
    }

    #[test]
    fn yaml_config_loads_by_extension() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "title: Livro\norder: [PARTES]\npart_starts:\n  1: 1\nfragment_styles:\n  body: Corpo\n",
        )?;

        let config = load(&path)?;

        assert_eq!(config.book_title(), "Livro");
        assert_eq!(config.policy().part_starts.get(&1), Some(&1));
        assert_eq!(config.fragment_styles.body, "Corpo");
        assert_eq!(config.fragment_styles.title, "Título Principal");
        Ok(())
    }

    #[test]
    fn find_config_reports_missing_file() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        assert!(find_config(temp.path()).is_err());
    }
}
