use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to load the allow-list.
///
/// Unlike everything the linter reports as a finding, this aborts the run
/// before any document is processed.
#[derive(Debug, Error)]
pub enum AllowListLoadError {
    #[error("Failed to read allow-list {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse allow-list {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error(
        "Allow-list {} maps `{name}` to both {first} and {second}",
        .path.display()
    )]
    DuplicateEntry {
        path: PathBuf,
        name: String,
        first: String,
        second: String,
    },
}

/// On-disk formats the allow-list can be written in, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowListFormat {
    /// `{ "name": "url" }` or `[{ "name": ..., "url": ... }]`
    Json,
    /// `name = "url"`, optionally under a `[references]` table
    Toml,
    /// One `name url`, `name = url` or `name: url` entry per line
    Lines,
}

impl AllowListFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => AllowListFormat::Json,
            Some(ext) if ext.eq_ignore_ascii_case("toml") => AllowListFormat::Toml,
            _ => AllowListFormat::Lines,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonAllowList {
    Map(BTreeMap<String, String>),
    List(Vec<JsonEntry>),
}

#[derive(Deserialize)]
struct JsonEntry {
    name: String,
    url: String,
}

/// Known API identifiers and their canonical documentation URLs.
///
/// Loaded once per run and shared read-only between documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: BTreeMap<String, String>,
}

impl AllowList {
    /// Reads and parses the allow-list at `path`.
    pub async fn load(path: &Path) -> Result<Self, AllowListLoadError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| AllowListLoadError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let allow_list = Self::parse(path, &content, AllowListFormat::from_path(path))?;
        log::debug!(
            "Loaded {} allow-list entries from {}",
            allow_list.len(),
            path.display()
        );
        Ok(allow_list)
    }

    /// Parses allow-list content; `path` is only used in error messages.
    pub fn parse(
        path: &Path,
        content: &str,
        format: AllowListFormat,
    ) -> Result<Self, AllowListLoadError> {
        let parse_error = |message: String| AllowListLoadError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let pairs: Vec<(String, String)> = match format {
            AllowListFormat::Json => {
                match serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))? {
                    JsonAllowList::Map(map) => map.into_iter().collect(),
                    JsonAllowList::List(list) => {
                        list.into_iter().map(|e| (e.name, e.url)).collect()
                    }
                }
            }
            AllowListFormat::Toml => {
                let table: toml::Table =
                    toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
                let table = match table.get("references").cloned() {
                    Some(toml::Value::Table(inner)) => inner,
                    _ => table,
                };
                table
                    .into_iter()
                    .map(|(name, value)| match value {
                        toml::Value::String(url) => Ok((name, url)),
                        other => Err(parse_error(format!(
                            "`{}` must map to a URL string, found {}",
                            name,
                            other.type_str()
                        ))),
                    })
                    .collect::<Result<_, _>>()?
            }
            AllowListFormat::Lines => parse_lines(content).map_err(parse_error)?,
        };

        let mut allow_list = Self::default();
        for (name, url) in pairs {
            allow_list.insert(path, name, url)?;
        }
        Ok(allow_list)
    }

    fn insert(&mut self, path: &Path, name: String, url: String) -> Result<(), AllowListLoadError> {
        let name = name.trim().trim_end_matches("()").to_string();
        let url = url.trim().to_string();

        if name.is_empty() {
            return Err(AllowListLoadError::Parse {
                path: path.to_path_buf(),
                message: "entry with an empty identifier".to_string(),
            });
        }

        match self.entries.get(&name) {
            Some(existing) if *existing != url => Err(AllowListLoadError::DuplicateEntry {
                path: path.to_path_buf(),
                name,
                first: existing.clone(),
                second: url,
            }),
            Some(_) => Ok(()),
            None => {
                self.entries.insert(name, url);
                Ok(())
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Canonical URL for an identifier.
    pub fn url(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, U: Into<String>> FromIterator<(N, U)> for AllowList {
    fn from_iter<I: IntoIterator<Item = (N, U)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(name, url)| (name.into(), url.into()))
            .collect();
        Self { entries }
    }
}

/// Parses the line format. Blank lines and `#` comments are skipped; the
/// identifier ends at the first whitespace, `=` or `:`.
fn parse_lines(content: &str) -> Result<Vec<(String, String)>, String> {
    let mut pairs = Vec::new();

    for (n, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let split = line
            .find(|c: char| c.is_whitespace() || c == '=' || c == ':')
            .unwrap_or(line.len());
        let (name, rest) = line.split_at(split);

        let rest = rest.trim_start();
        let url = rest
            .strip_prefix('=')
            .or_else(|| rest.strip_prefix(':'))
            .unwrap_or(rest)
            .trim();

        if name.is_empty() {
            return Err(format!("line {}: missing identifier", n + 1));
        }
        if url.is_empty() {
            return Err(format!("line {}: missing URL for `{}`", n + 1, name));
        }

        pairs.push((name.to_string(), url.to_string()));
    }

    Ok(pairs)
}
