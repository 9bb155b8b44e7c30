//! Build recipes and the recipe registry.
//!
//! The recipes file is line-oriented, one project per line:
//!
//! ```text
//! com.example:lib https://github.com/example/lib; mvn -B install
//! ```
//!
//! The first field is the `group:name` key and the source URL, separated
//! by whitespace; every following `;`-separated field is one build step,
//! run in order. Blank lines and `#` comments are skipped.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::error::{KilnError, Result};

/// Source location and ordered build steps for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    /// Clone URL passed to the source-fetch command.
    pub source_url: String,
    /// Build commands run in order inside the cloned working directory.
    pub build_steps: Vec<String>,
}

/// Read-only lookup table of build recipes, keyed by `group:name`.
///
/// Loaded once at startup; the build pipeline only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct RecipeRegistry {
    recipes: HashMap<String, Recipe>,
}

impl RecipeRegistry {
    /// Build a registry from already-parsed entries (used by tests).
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Recipe)>) -> Self {
        Self {
            recipes: entries.into_iter().collect(),
        }
    }

    /// Load and parse the recipes file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| KilnError::io(path, e))?;
        let registry = Self::parse(&content)?;
        info!(
            path = %path.display(),
            recipes = registry.len(),
            "loaded recipe registry"
        );
        Ok(registry)
    }

    /// Parse recipes file content.
    pub fn parse(content: &str) -> Result<Self> {
        let mut recipes = HashMap::new();

        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split(';').map(str::trim);
            // First field: "group:name sourceURL".
            let header = fields.next().unwrap_or_default();
            let mut header_parts = header.split_whitespace();
            let (key, url) = match (header_parts.next(), header_parts.next()) {
                (Some(key), Some(url)) if header_parts.next().is_none() => (key, url),
                _ => {
                    return Err(KilnError::recipe(format!(
                        "line {}: expected `group:name sourceURL; steps...`, got `{line}`",
                        idx + 1
                    )));
                }
            };

            let build_steps: Vec<String> = fields
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();

            recipes.insert(
                key.to_string(),
                Recipe {
                    source_url: url.to_string(),
                    build_steps,
                },
            );
        }

        Ok(Self { recipes })
    }

    /// Look up the recipe for a `group:name` key.
    pub fn get(&self, project_key: &str) -> Option<&Recipe> {
        self.recipes.get(project_key)
    }

    /// Number of registered recipes.
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Whether the registry has no recipes.
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_recipe_with_steps() {
        let registry = RecipeRegistry::parse(
            "com.example:lib https://github.com/example/lib; mvn -B install; mvn javadoc:jar\n",
        )
        .unwrap();

        let recipe = registry.get("com.example:lib").unwrap();
        assert_eq!(recipe.source_url, "https://github.com/example/lib");
        assert_eq!(
            recipe.build_steps,
            vec!["mvn -B install".to_string(), "mvn javadoc:jar".to_string()]
        );
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let registry = RecipeRegistry::parse(
            "# local projects\n\ncom.example:a url-a; step\ncom.example:b url-b\n",
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("com.example:b").unwrap().build_steps.is_empty());
    }

    #[test]
    fn trailing_empty_steps_are_dropped() {
        let registry = RecipeRegistry::parse("com.example:a url; step one; ;\n").unwrap();
        let recipe = registry.get("com.example:a").unwrap();
        assert_eq!(recipe.build_steps, vec!["step one".to_string()]);
    }

    #[test]
    fn malformed_header_names_the_line() {
        let err = RecipeRegistry::parse("just-a-key-without-url\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn missing_key_is_none() {
        let registry = RecipeRegistry::parse("").unwrap();
        assert!(registry.get("com.example:lib").is_none());
        assert!(registry.is_empty());
    }
}
