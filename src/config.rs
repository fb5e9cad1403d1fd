use crate::document::Markers;
use crate::finding::Severity;
use crate::language::LanguageSet;
use crate::references::DEFAULT_API_PATTERN;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration for the linter.
///
/// Read from a TOML file passed with `--config`, or from the
/// `[preprocessor.doc-lint]` section of `book.toml` when running as an mdBook
/// preprocessor. Every field is optional.
///
/// # Example
///
/// ```toml
/// [preprocessor.doc-lint]
/// allow-list = "${DOCS_ROOT}/apis.txt"
/// extra-languages = ["prisma", "mermaid"]
/// before-marker = "Before:"
/// after-marker = "After:"
/// fail-on = "warning"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LintConfig {
    /// Allow-list path (supports ${VAR} environment variable expansion)
    pub allow_list: Option<String>,

    /// Fence languages accepted in addition to the built-in set
    pub extra_languages: Vec<String>,

    /// Regex an identifier must match to be checked against the allow-list
    pub api_pattern: String,

    /// Prose label that marks the old side of a comparison
    pub before_marker: String,

    /// Prose label that marks the new side of a comparison
    pub after_marker: String,

    /// Lowest severity that makes the run fail
    pub fail_on: Severity,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            allow_list: None,
            extra_languages: Vec::new(),
            api_pattern: DEFAULT_API_PATTERN.to_string(),
            before_marker: "Before:".to_string(),
            after_marker: "After:".to_string(),
            fail_on: Severity::Error,
        }
    }
}

impl LintConfig {
    /// Load configuration from a TOML file, expand environment variables and
    /// validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: LintConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .prepared()
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse configuration from mdbook PreprocessorContext and expand environment variables
    pub fn from_preprocessor_context(
        ctx: &mdbook::preprocess::PreprocessorContext,
    ) -> Result<Self> {
        let config: LintConfig = if let Some(config_value) = ctx.config.get("preprocessor.doc-lint")
        {
            config_value.clone().try_into()?
        } else {
            Self::default()
        };

        config
            .prepared()
            .context("Invalid configuration for preprocessor 'doc-lint'")
    }

    fn prepared(mut self) -> Result<Self> {
        self.allow_list = self.allow_list.map(|p| expand_env_vars(&p));
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration for correctness
    pub fn validate(&self) -> Result<()> {
        Regex::new(&self.api_pattern)
            .with_context(|| format!("api-pattern is not a valid regex: {}", self.api_pattern))?;

        // Compare labels as they are matched, emphasis stripped
        let markers = self.markers();
        let (before, after) = markers.labels();
        if before.is_empty() || after.is_empty() {
            anyhow::bail!("Comparison markers cannot be empty");
        }

        if before == after {
            anyhow::bail!(
                "before-marker and after-marker must differ (both are '{}')",
                self.before_marker
            );
        }

        if let Some(ref path) = self.allow_list {
            if path.trim().is_empty() {
                anyhow::bail!("allow-list path cannot be empty");
            }
        }

        Ok(())
    }

    /// Resolves the allow-list path against `root` when it is relative.
    pub fn allow_list_path(&self, root: &Path) -> Option<PathBuf> {
        self.allow_list.as_ref().map(|p| root.join(p))
    }

    pub fn languages(&self) -> LanguageSet {
        LanguageSet::with_extra(&self.extra_languages)
    }

    pub fn markers(&self) -> Markers {
        Markers::new(self.before_marker.trim(), self.after_marker.trim())
    }

    pub fn api_pattern(&self) -> Result<Regex> {
        Regex::new(&self.api_pattern)
            .with_context(|| format!("api-pattern is not a valid regex: {}", self.api_pattern))
    }
}

/// Expands `${VAR}` references in the allow-list path.
///
/// Expanded values are not scanned again. Unset variables and an unclosed
/// `${` are kept as written.
fn expand_env_vars(path: &str) -> String {
    let mut expanded = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else {
            // An unclosed `${` and everything after it is literal
            rest = &rest[start..];
            break;
        };

        let name = &tail[..end];
        match env::var(name) {
            Ok(value) => expanded.push_str(&value),
            Err(_) => {
                log::warn!("Environment variable '{}' not set in allow-list path", name);
                expanded.push_str(&rest[start..start + end + 3]);
            }
        }
        rest = &tail[end + 1..];
    }

    expanded.push_str(rest);
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_expand_env_vars_with_var() {
        env::set_var("DOC_LINT_TEST_ROOT", "/srv/docs");
        let result = expand_env_vars("${DOC_LINT_TEST_ROOT}/apis.txt");
        assert_eq!(result, "/srv/docs/apis.txt");
        env::remove_var("DOC_LINT_TEST_ROOT");
    }

    #[test]
    #[serial]
    fn test_expand_env_vars_without_var() {
        env::remove_var("NONEXISTENT_VAR");
        let result = expand_env_vars("${NONEXISTENT_VAR}");
        assert_eq!(result, "${NONEXISTENT_VAR}");
    }

    #[test]
    #[serial]
    fn test_expand_env_vars_values_not_rescanned() {
        env::set_var("DOC_LINT_TEST_A", "${DOC_LINT_TEST_B}");
        env::set_var("DOC_LINT_TEST_B", "b");
        let result = expand_env_vars("x/${DOC_LINT_TEST_A}/${DOC_LINT_TEST_B}.txt");
        assert_eq!(result, "x/${DOC_LINT_TEST_B}/b.txt");
        env::remove_var("DOC_LINT_TEST_A");
        env::remove_var("DOC_LINT_TEST_B");
    }

    #[test]
    fn test_expand_env_vars_no_expansion() {
        assert_eq!(expand_env_vars("apis.txt"), "apis.txt");
        assert_eq!(expand_env_vars("${UNCLOSED"), "${UNCLOSED");
    }

    #[test]
    fn test_parse_kebab_case_config() {
        let config: LintConfig = toml::from_str(
            r#"
allow-list = "apis.json"
extra-languages = ["prisma"]
fail-on = "warning"
"#,
        )
        .unwrap();

        assert_eq!(config.allow_list.as_deref(), Some("apis.json"));
        assert_eq!(config.fail_on, Severity::Warning);
        assert_eq!(config.before_marker, "Before:");
        assert!(config.languages().contains("prisma"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let config = LintConfig {
            api_pattern: "([".to_string(),
            ..LintConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_identical_markers() {
        let config = LintConfig {
            after_marker: "before:".to_string(),
            ..LintConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must differ"));

        let config = LintConfig {
            before_marker: "**Before:**".to_string(),
            ..LintConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_emphasis_only_marker() {
        let config = LintConfig {
            before_marker: "**".to_string(),
            ..LintConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_allow_list_path_resolution() {
        let config = LintConfig {
            allow_list: Some("apis.txt".to_string()),
            ..LintConfig::default()
        };
        assert_eq!(
            config.allow_list_path(Path::new("/book")),
            Some(PathBuf::from("/book/apis.txt"))
        );

        let config = LintConfig {
            allow_list: Some("/etc/apis.txt".to_string()),
            ..LintConfig::default()
        };
        assert_eq!(
            config.allow_list_path(Path::new("/book")),
            Some(PathBuf::from("/etc/apis.txt"))
        );
    }
}
