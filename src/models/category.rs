use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DirectoryError;

/// Group categories. New groups must pick one of the known labels; documents
/// written by older clients may carry any free-form label, kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Academic,
    Cultural,
    Sports,
    Technology,
    Arts,
    Social,
    Volunteering,
    Other(String),
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Academic,
        Category::Cultural,
        Category::Sports,
        Category::Technology,
        Category::Arts,
        Category::Social,
        Category::Volunteering,
    ];

    /// Canonical stored label
    pub fn as_str(&self) -> &str {
        match self {
            Category::Academic => "Académico",
            Category::Cultural => "Cultural",
            Category::Sports => "Deportivo",
            Category::Technology => "Tecnología",
            Category::Arts => "Artístico",
            Category::Social => "Social",
            Category::Volunteering => "Voluntariado",
            Category::Other(label) => label.as_str(),
        }
    }
}

/// Lower-case and strip the accents used by the labels, so "Tecnologia" and
/// "TECNOLOGÍA" both match
fn fold(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            other => other,
        })
        .collect()
}

impl FromStr for Category {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s);
        Category::ALL
            .into_iter()
            .find(|c| fold(c.as_str()) == folded)
            .ok_or_else(|| DirectoryError::invalid_input(format!("Unknown category: '{}'", s)))
    }
}

/// Documents without a category read as an empty free-form label
impl Default for Category {
    fn default() -> Self {
        Category::Other(String::new())
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        value
            .parse()
            .unwrap_or_else(|_| Category::Other(value.trim().to_string()))
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
