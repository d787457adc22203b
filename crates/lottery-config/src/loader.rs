//! Loader for configurations split across several files.
//!
//! The main file may name other files in `include`. Sections are merged at
//! the top level only, and a section defined in two files is an error.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub struct ConfigLoader {
	/// Directory relative includes are resolved against
	root: PathBuf,
	/// Canonical paths already read, to catch include cycles
	visited: HashSet<PathBuf>,
	/// Which file defined each top-level section
	section_origins: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(root: impl AsRef<Path>) -> Self {
		Self {
			root: root.as_ref().to_path_buf(),
			visited: HashSet::new(),
			section_origins: HashMap::new(),
		}
	}

	/// Loads a configuration file together with everything it includes.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let config_path = self.locate(config_path)?;

		let main_content = self.read_source(&config_path).await?;
		let main_toml: toml::Table = toml::from_str(&main_content)?;

		let includes = extract_includes(&main_toml)?;
		if includes.is_empty() {
			return main_content.parse();
		}

		let combined = self.merge_includes(main_toml, includes, config_path).await?;
		let combined = toml::to_string(&combined).map_err(|e| {
			ConfigError::Parse(format!("Cannot merge included files: {}", e))
		})?;
		combined.parse()
	}

	/// Reads a file once and resolves its environment variables.
	async fn read_source(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical_path = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("{}: {}", path.display(), e),
			))
		})?;

		if !self.visited.insert(canonical_path.clone()) {
			return Err(ConfigError::Validation(format!(
				"{} is included more than once (include cycle?)",
				canonical_path.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	async fn merge_includes(
		&mut self,
		mut main_toml: toml::Table,
		includes: Vec<PathBuf>,
		main_path: PathBuf,
	) -> Result<toml::Table, ConfigError> {
		main_toml.remove("include");
		for key in main_toml.keys() {
			self.section_origins
				.insert(key.clone(), main_path.clone());
		}

		for include_path in includes {
			let resolved_path = self.locate(&include_path)?;
			let include_content = self.read_source(&resolved_path).await?;
			let include_toml: toml::Table = toml::from_str(&include_content)?;

			for (key, value) in include_toml {
				if let Some(first_file) = self.section_origins.get(&key) {
					return Err(ConfigError::Validation(format!(
						"Section '{}' is defined in both {} and {}",
						key,
						first_file.display(),
						resolved_path.display()
					)));
				}
				self.section_origins
					.insert(key.clone(), resolved_path.clone());
				main_toml.insert(key, value);
			}
		}

		Ok(main_toml)
	}

	fn locate(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.root.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("No such configuration file: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}

/// Reads `include`, which may be a single path or an array of paths.
fn extract_includes(toml: &toml::Table) -> Result<Vec<PathBuf>, ConfigError> {
	match toml.get("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.iter()
			.map(|item| {
				item.as_str().map(PathBuf::from).ok_or_else(|| {
					ConfigError::Validation("`include` entries must be paths".into())
				})
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"`include` must be a path or a list of paths".into(),
		)),
	}
}
