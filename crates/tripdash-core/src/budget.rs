//! Destination budget catalog and estimator.
//!
//! Lookup is forgiving: exact key, then a case-insensitive
//! substring match in either direction (first entry in catalog order wins),
//! then a generic fallback record named after the query. An estimate never
//! fails; running over budget is reported through [`BudgetEstimate::is_over_budget`].

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const EMBEDDED_CATALOG: &str = include_str!("../../../config/destinations.yaml");

/// Appended to the description of a record replaced by a live refresh.
pub const VERIFIED_SUFFIX: &str = " (Verified with live data)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub category: String,
    pub item: String,
    pub cost: Decimal,
    pub currency: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationRecord {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    pub expenses: Vec<Expense>,
}

impl DestinationRecord {
    /// Sum of all line-item costs.
    #[must_use]
    pub fn total_cost(&self) -> Decimal {
        self.expenses.iter().map(|e| e.cost).sum()
    }

    /// Group line items by category, keeping first-seen category order.
    #[must_use]
    pub fn categories(&self) -> Vec<CategoryGroup> {
        let mut groups: Vec<CategoryGroup> = Vec::new();
        for expense in &self.expenses {
            match groups.iter_mut().find(|g| g.category == expense.category) {
                Some(group) => {
                    group.subtotal += expense.cost;
                    group.items.push(expense.clone());
                }
                None => groups.push(CategoryGroup {
                    category: expense.category.clone(),
                    subtotal: expense.cost,
                    items: vec![expense.clone()],
                }),
            }
        }
        groups
    }

    /// Website host for compact display: scheme stripped, path dropped.
    #[must_use]
    pub fn website_host(&self) -> Option<&str> {
        let site = self.website.as_deref()?;
        let rest = site
            .strip_prefix("https://")
            .or_else(|| site.strip_prefix("http://"))
            .unwrap_or(site);
        rest.split('/').next()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub subtotal: Decimal,
    pub items: Vec<Expense>,
}

/// How a query was resolved against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Partial,
    Fallback,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::Exact => write!(f, "exact"),
            MatchKind::Partial => write!(f, "partial"),
            MatchKind::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub key: String,
    #[serde(flatten)]
    pub record: DestinationRecord,
}

/// Template for the record returned when nothing matches.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackTemplate {
    pub description: String,
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    destinations: Vec<CatalogEntry>,
    #[serde(default)]
    verified: Vec<CatalogEntry>,
    fallback: FallbackTemplate,
}

impl Catalog {
    /// The catalog compiled into the binary from `config/destinations.yaml`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the embedded file fails to parse or validate.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_yaml_str(EMBEDDED_CATALOG)
    }

    /// Load and validate a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::DataFileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load from `path` when given, otherwise use the embedded catalog.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Catalog::load`] or [`Catalog::embedded`].
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::embedded(),
        }
    }

    /// Parse and validate a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on parse or validation failure.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let catalog: Catalog = serde_yaml::from_str(content)?;
        validate_catalog(&catalog)?;
        Ok(catalog)
    }

    /// Base-table keys in catalog order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.destinations.iter().map(|e| e.key.as_str())
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.destinations
    }

    /// Resolve `query` against the base table, falling back to the generic record.
    ///
    /// Surrounding whitespace in `query` is ignored.
    #[must_use]
    pub fn resolve(&self, query: &str) -> (DestinationRecord, MatchKind) {
        let query = query.trim();
        match find_entry(&self.destinations, query) {
            Some((entry, kind)) => (entry.record.clone(), kind),
            None => (self.fallback_record(query), MatchKind::Fallback),
        }
    }

    /// Look `query` up in the verified table. No fallback: `None` means the
    /// live refresh has nothing better to offer.
    #[must_use]
    pub fn verified(&self, query: &str) -> Option<(&DestinationRecord, MatchKind)> {
        find_entry(&self.verified, query).map(|(entry, kind)| (&entry.record, kind))
    }

    /// Estimate expenses for `query` against `total_budget`.
    #[must_use]
    pub fn estimate(&self, query: &str, total_budget: Decimal) -> BudgetEstimate {
        let query = query.trim();
        let (record, matched) = self.resolve(query);
        BudgetEstimate::new(query, matched, record, total_budget)
    }

    /// Replace the estimate's record with the verified listing for its query.
    ///
    /// Returns `false` and leaves the estimate untouched when the verified
    /// table has no match.
    pub fn apply_verified(&self, estimate: &mut BudgetEstimate, refreshed_at: DateTime<Utc>) -> bool {
        let Some((record, kind)) = self.verified(&estimate.query) else {
            return false;
        };
        let mut record = record.clone();
        record.description.push_str(VERIFIED_SUFFIX);
        record.last_updated = Some(refreshed_at.format("%Y-%m-%d %H:%M UTC").to_string());
        *estimate = BudgetEstimate::new(&estimate.query, kind, record, estimate.total_budget);
        estimate.verified = true;
        true
    }

    fn fallback_record(&self, query: &str) -> DestinationRecord {
        DestinationRecord {
            name: query.to_string(),
            description: self.fallback.description.clone(),
            address: None,
            price_range: None,
            website: None,
            phone: None,
            opening_hours: None,
            image_url: None,
            last_updated: None,
            expenses: self.fallback.expenses.clone(),
        }
    }
}

/// Exact key first, then case-insensitive containment either way.
///
/// A blank query never partially matches; every key "contains" the empty
/// string, which would otherwise resolve to the first entry.
fn find_entry<'a>(entries: &'a [CatalogEntry], query: &str) -> Option<(&'a CatalogEntry, MatchKind)> {
    let query = query.trim();
    if let Some(entry) = entries.iter().find(|e| e.key == query) {
        return Some((entry, MatchKind::Exact));
    }
    if query.is_empty() {
        return None;
    }
    let needle = query.to_lowercase();
    entries
        .iter()
        .find(|e| {
            let key = e.key.to_lowercase();
            needle.contains(&key) || key.contains(&needle)
        })
        .map(|entry| (entry, MatchKind::Partial))
}

fn validate_catalog(catalog: &Catalog) -> Result<(), ConfigError> {
    validate_table("destinations", &catalog.destinations)?;
    validate_table("verified", &catalog.verified)?;

    if catalog.destinations.is_empty() {
        return Err(ConfigError::Validation(
            "catalog must list at least one destination".to_string(),
        ));
    }
    if catalog.fallback.expenses.is_empty() {
        return Err(ConfigError::Validation(
            "fallback record must list at least one expense".to_string(),
        ));
    }
    validate_expenses("fallback", &catalog.fallback.expenses)
}

fn validate_table(table: &str, entries: &[CatalogEntry]) -> Result<(), ConfigError> {
    let mut seen_keys = HashSet::new();

    for entry in entries {
        if entry.key.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{table}: destination key must be non-empty"
            )));
        }
        if entry.record.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{table}: destination '{}' has an empty name",
                entry.key
            )));
        }
        if !seen_keys.insert(entry.key.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "{table}: duplicate destination key '{}'",
                entry.key
            )));
        }
        validate_expenses(&entry.key, &entry.record.expenses)?;
    }

    Ok(())
}

fn validate_expenses(owner: &str, expenses: &[Expense]) -> Result<(), ConfigError> {
    for expense in expenses {
        if expense.cost < Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "'{owner}': expense '{}' has negative cost {}",
                expense.item, expense.cost
            )));
        }
        if expense.category.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "'{owner}': expense '{}' has an empty category",
                expense.item
            )));
        }
    }
    Ok(())
}

/// Result of estimating a destination against a total budget.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetEstimate {
    pub query: String,
    pub matched: MatchKind,
    pub record: DestinationRecord,
    pub total_budget: Decimal,
    pub total_expenses: Decimal,
    /// `total_budget - total_expenses`; negative when over budget.
    pub remaining: Decimal,
    pub is_over_budget: bool,
    pub categories: Vec<CategoryGroup>,
    /// Set once a live refresh replaced the record.
    pub verified: bool,
}

impl BudgetEstimate {
    fn new(query: &str, matched: MatchKind, record: DestinationRecord, total_budget: Decimal) -> Self {
        let total_expenses = record.total_cost();
        let remaining = total_budget - total_expenses;
        Self {
            query: query.to_string(),
            matched,
            categories: record.categories(),
            record,
            total_budget,
            total_expenses,
            remaining,
            is_over_budget: remaining < Decimal::ZERO,
            verified: false,
        }
    }

    /// Magnitude shown next to "remaining" / "over budget" labels.
    #[must_use]
    pub fn remaining_display(&self) -> Decimal {
        self.remaining.abs()
    }
}

#[cfg(test)]
#[path = "budget_test.rs"]
mod tests;
