//! Layered configuration.
//!
//! Sources are merged in order, later ones winning:
//! 1. [`Config::default()`]
//! 2. A configuration file: the one passed explicitly, otherwise
//!    `rummage/config.toml` in the platform config directory (if present).
//! 3. `RUMMAGE_*` environment variables (`RUMMAGE_ROW_LIMIT=500`).
//! 4. Command-line [`Overrides`].

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use rummage_extract::KeywordMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const ENV_PREFIX: &str = "RUMMAGE_";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_ROW_LIMIT: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory tree to sort.
    pub scan_root: Option<PathBuf>,
    /// Where `processed/`, `error/`, `unsupported/` and `results/` are created.
    pub output_root: Option<PathBuf>,
    /// Newline-delimited keyword list.
    pub keywords_file: Option<PathBuf>,
    pub keyword_mode: KeywordMode,
    /// Files handled at once. Unset means one per available core.
    pub concurrency: Option<usize>,
    /// Rows read from each spreadsheet sheet.
    pub row_limit: usize,
    /// Remove empty directories from the scan root once the scan is done.
    pub cleanup: bool,
    /// Expand archives sitting directly in the scan root before scanning.
    pub expand_first: bool,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            scan_root: None,
            output_root: None,
            keywords_file: None,
            keyword_mode: KeywordMode::default(),
            concurrency: None,
            row_limit: DEFAULT_ROW_LIMIT,
            cleanup: true,
            expand_first: false,
        }
    }
}
impl Config {
    /// Reject values no command can work with.
    pub fn validate(&self) -> Result<()> {
        if self.row_limit == 0 {
            exn::bail!(ErrorKind::Invalid("row_limit", "must be at least 1".into()));
        }
        if self.concurrency == Some(0) {
            exn::bail!(ErrorKind::Invalid("concurrency", "must be at least 1".into()));
        }
        if let Some(root) = &self.scan_root
            && !root.is_dir()
        {
            exn::bail!(ErrorKind::Invalid("scan_root", format!("{} is not a directory", root.display())));
        }
        if let Some(file) = &self.keywords_file
            && !file.is_file()
        {
            exn::bail!(ErrorKind::Invalid("keywords_file", format!("{} is not a file", file.display())));
        }
        if let (Some(scan_root), Some(output_root)) = (&self.scan_root, &self.output_root)
            && scan_root == output_root
        {
            exn::bail!(ErrorKind::Invalid("output_root", "must differ from scan_root".into()));
        }
        Ok(())
    }

    pub fn scan_root(&self) -> Result<&Path> {
        required(self.scan_root.as_deref(), "scan_root")
    }

    pub fn output_root(&self) -> Result<&Path> {
        required(self.output_root.as_deref(), "output_root")
    }

    pub fn keywords_file(&self) -> Result<&Path> {
        required(self.keywords_file.as_deref(), "keywords_file")
    }
}

fn required<'a>(value: Option<&'a Path>, name: &'static str) -> Result<&'a Path> {
    match value {
        Some(value) => Ok(value),
        None => exn::bail!(ErrorKind::Missing(name)),
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_mode: Option<KeywordMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand_first: Option<bool>,
}

/// `rummage/config.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rummage").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Merge every source into a [`Config`].
///
/// An explicit file must exist; the default one is skipped when absent. The
/// file format follows its extension (`.yaml`/`.yml`, `.json`, otherwise TOML).
#[instrument(level = "debug", skip(overrides))]
pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let file = match explicit {
        Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|path| path.is_file()),
    };
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(file) = &file {
        tracing::debug!(file = %file.display(), "reading configuration file");
        figment = match file.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
            Some("json") => figment.merge(Json::file_exact(file)),
            _ => figment.merge(Toml::file_exact(file)),
        };
    }
    let config: Config = figment
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["log"]))
        .merge(Serialized::defaults(overrides))
        .extract()
        .or_raise(|| ErrorKind::Parse)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.row_limit, 10_000);
        assert!(config.cleanup);
        assert!(!config.expand_first);
        assert_eq!(config.keyword_mode, KeywordMode::Literal);
        assert_eq!(*config.scan_root().unwrap_err(), ErrorKind::Missing("scan_root"));
    }

    #[test]
    fn file_then_env_then_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file("rummage.toml", "row_limit = 50\nkeyword_mode = \"regex\"\ncleanup = false\nconcurrency = 3\n")?;
            jail.set_env("RUMMAGE_ROW_LIMIT", "75");
            jail.set_env("RUMMAGE_LOG", "debug");

            let overrides = Overrides { concurrency: Some(8), ..Overrides::default() };
            let config = load(Some(Path::new("rummage.toml")), &overrides).unwrap();
            assert_eq!(config.row_limit, 75);
            assert_eq!(config.keyword_mode, KeywordMode::Regex);
            assert!(!config.cleanup);
            assert_eq!(config.concurrency, Some(8));
            Ok(())
        });
    }

    #[rstest]
    #[case("rummage.yaml", "row_limit: 20\nexpand_first: true\n")]
    #[case("rummage.json", r#"{"row_limit": 20, "expand_first": true}"#)]
    fn other_formats_by_extension(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = load(Some(Path::new(name)), &Overrides::default()).unwrap();
            assert_eq!(config.row_limit, 20);
            assert!(config.expand_first);
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let err = load(Some(&dir.path().join("absent.toml")), &Overrides::default()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn malformed_file() {
        Jail::expect_with(|jail| {
            jail.create_file("rummage.toml", "row_limit = \"lots\"")?;
            let err = load(Some(Path::new("rummage.toml")), &Overrides::default()).unwrap_err();
            assert_eq!(*err, ErrorKind::Parse);
            Ok(())
        });
    }

    #[rstest]
    #[case(Config { row_limit: 0, ..Config::default() }, "row_limit")]
    #[case(Config { concurrency: Some(0), ..Config::default() }, "concurrency")]
    #[case(Config { scan_root: Some(PathBuf::from("/definitely/not/here")), ..Config::default() }, "scan_root")]
    #[case(Config { keywords_file: Some(PathBuf::from("/definitely/not/here.txt")), ..Config::default() }, "keywords_file")]
    fn invalid_values(#[case] config: Config, #[case] field: &str) {
        match &*config.validate().unwrap_err() {
            ErrorKind::Invalid(name, _) => assert_eq!(*name, field),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn output_root_must_differ() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            scan_root: Some(dir.path().to_path_buf()),
            output_root: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        assert!(matches!(&*config.validate().unwrap_err(), ErrorKind::Invalid("output_root", _)));
    }

    #[test]
    fn existing_paths_validate() {
        let dir = TempDir::new().unwrap();
        let keywords = dir.path().join("keywords.txt");
        std::fs::write(&keywords, "budget\n").unwrap();
        let config = Config {
            scan_root: Some(dir.path().to_path_buf()),
            output_root: Some(dir.path().join("out")),
            keywords_file: Some(keywords.clone()),
            ..Config::default()
        };
        config.validate().unwrap();
        assert_eq!(config.keywords_file().unwrap(), keywords);
    }
}
