use std::collections::BTreeSet;

/// Get the fence tags recognized for a canonical language name.
///
/// Returns the canonical name plus the aliases highlight.js accepts for it,
/// restricted to the languages that show up in web framework documentation.
/// Unknown names map to themselves.
///
/// # Examples
///
/// ```
/// use doc_lint::get_language_aliases;
///
/// assert_eq!(get_language_aliases("bash"), vec!["bash", "sh", "zsh"]);
/// assert_eq!(get_language_aliases("prisma"), vec!["prisma"]);
/// ```
///
/// # Reference
///
/// Aliases are based on highlight.js SUPPORTED_LANGUAGES.md:
/// https://github.com/highlightjs/highlight.js/blob/main/SUPPORTED_LANGUAGES.md
pub fn get_language_aliases(lang_name: &str) -> Vec<&str> {
    match lang_name {
        "bash" => vec!["bash", "sh", "zsh"],
        "c" => vec!["c", "h"],
        "cpp" => vec!["cpp", "hpp", "cc", "hh", "c++", "h++", "cxx", "hxx"],
        "csharp" => vec!["csharp", "cs"],
        "css" => vec!["css"],
        "diff" => vec!["diff", "patch"],
        "dockerfile" => vec!["dockerfile", "docker"],
        "go" => vec!["go", "golang"],
        "graphql" => vec!["graphql", "gql"],
        "html" => vec!["html", "xhtml"],
        "http" => vec!["http", "https"],
        "ini" => vec!["ini", "toml"],
        "java" => vec!["java", "jsp"],
        "javascript" => vec!["javascript", "js", "jsx", "mjs", "cjs"],
        "json" => vec!["json", "jsonc", "json5"],
        "kotlin" => vec!["kotlin", "kt"],
        "less" => vec!["less"],
        "makefile" => vec!["makefile", "mk", "mak", "make"],
        "markdown" => vec!["markdown", "md", "mdx", "mkdown", "mkd"],
        "nginx" => vec!["nginx", "nginxconf"],
        "php" => vec!["php"],
        "plaintext" => vec!["plaintext", "txt", "text", "plain"],
        "powershell" => vec!["powershell", "pwsh", "ps", "ps1"],
        "python" => vec!["python", "py", "gyp"],
        "ruby" => vec!["ruby", "rb", "gemspec", "podspec", "thor", "irb"],
        "rust" => vec!["rust", "rs"],
        "scss" => vec!["scss"],
        "shell" => vec!["shell", "console", "shellsession", "terminal"],
        "sql" => vec!["sql"],
        "swift" => vec!["swift"],
        "typescript" => vec!["typescript", "ts", "tsx", "mts", "cts"],
        "xml" => vec!["xml", "svg", "rss", "atom", "xsl", "plist"],
        "yaml" => vec!["yaml", "yml"],
        other => vec![other],
    }
}

/// Canonical names of the built-in languages.
const BUILTIN_LANGUAGES: &[&str] = &[
    "bash",
    "c",
    "cpp",
    "csharp",
    "css",
    "diff",
    "dockerfile",
    "go",
    "graphql",
    "html",
    "http",
    "ini",
    "java",
    "javascript",
    "json",
    "kotlin",
    "less",
    "makefile",
    "markdown",
    "nginx",
    "php",
    "plaintext",
    "powershell",
    "python",
    "ruby",
    "rust",
    "scss",
    "shell",
    "sql",
    "swift",
    "typescript",
    "xml",
    "yaml",
];

/// The fixed set of fence language tags a document may use.
///
/// Built from the built-in table plus any extra tags from configuration.
/// Lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSet {
    tags: BTreeSet<String>,
}

impl LanguageSet {
    pub fn builtin() -> Self {
        let tags = BUILTIN_LANGUAGES
            .iter()
            .flat_map(|name| get_language_aliases(name))
            .map(str::to_string)
            .collect();
        Self { tags }
    }

    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::builtin();
        for tag in extra {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() {
                set.tags.insert(tag.to_lowercase());
            }
        }
        set
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_contains_aliases() {
        let set = LanguageSet::builtin();
        assert!(set.contains("jsx"));
        assert!(set.contains("bash"));
        assert!(set.contains("TSX"));
        assert!(set.contains("mdx"));
        assert!(!set.contains("prisma"));
    }

    #[test]
    fn test_extra_languages() {
        let set = LanguageSet::with_extra(["Prisma", "  ", "mermaid"]);
        assert!(set.contains("prisma"));
        assert!(set.contains("mermaid"));
        assert_eq!(set.len(), LanguageSet::builtin().len() + 2);
    }

    #[test]
    fn test_unknown_language_maps_to_itself() {
        assert_eq!(get_language_aliases("zig"), vec!["zig"]);
    }
}
