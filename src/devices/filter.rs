//! Search and category filtering over the device list

use std::str::FromStr;

use super::types::{fold, Category, Device, UnknownCategory};

/// Label of the "every category" choice
pub const ALL_CATEGORIES_LABEL: &str = "Todos";

/// Category selection of the filter bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// Skip category matching
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES_LABEL,
            CategoryFilter::Only(category) => category.as_str(),
        }
    }

    /// Choices shown in the filter bar, "Todos" first
    pub fn choices() -> Vec<CategoryFilter> {
        std::iter::once(CategoryFilter::All)
            .chain(Category::ALL.iter().copied().map(CategoryFilter::Only))
            .collect()
    }

    pub fn matches(&self, category: Option<Category>) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => category == Some(*wanted),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if fold(s) == fold(ALL_CATEGORIES_LABEL) {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

/// Devices whose name contains `search_text` (case-insensitive) and whose
/// category matches, in input order
pub fn filter<'a>(
    devices: &'a [Device],
    search_text: &str,
    category: CategoryFilter,
) -> Vec<&'a Device> {
    let needle = search_text.to_lowercase();

    devices
        .iter()
        .filter(|d| d.name.to_lowercase().contains(&needle))
        .filter(|d| category.matches(d.category))
        .collect()
}

/// Search box and category bar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub search_text: String,
    pub category: CategoryFilter,
}

impl FilterState {
    pub fn new(search_text: &str, category: CategoryFilter) -> Self {
        Self {
            search_text: search_text.to_string(),
            category,
        }
    }

    pub fn apply<'a>(&self, devices: &'a [Device]) -> Vec<&'a Device> {
        filter(devices, &self.search_text, self.category)
    }
}
