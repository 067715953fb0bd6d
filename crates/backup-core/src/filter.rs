//! Table and view selection.
//!
//! A filter is a list of entries. When the first entry is the `*` sentinel
//! the remaining entries are exclusions, otherwise they are inclusions.
//! An entry ending in `*` matches by prefix, anything else must match
//! the object name exactly.

use std::fmt;

/// Sentinel that switches a filter list into exclusion mode.
pub const WILDCARD: &str = "*";

/// One filter entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    /// Matches exactly this name.
    Exact(String),
    /// Matches every name starting with this prefix.
    Prefix(String),
}

impl NamePattern {
    /// Parse a single entry, trimming surrounding whitespace.
    pub fn parse(entry: &str) -> Self {
        let entry = entry.trim();
        if entry.ends_with('*') {
            NamePattern::Prefix(entry.trim_end_matches('*').to_string())
        } else {
            NamePattern::Exact(entry.to_string())
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(exact) => name == exact,
            NamePattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Exact(exact) => write!(f, "{exact}"),
            NamePattern::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// Resolved table filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TableFilter {
    /// Every table and view.
    #[default]
    All,
    /// Everything except names matching one of the patterns.
    AllExcept(Vec<NamePattern>),
    /// Only names matching at least one of the patterns.
    Only(Vec<NamePattern>),
}

impl TableFilter {
    /// Build a filter from list entries.
    ///
    /// The mode is decided by the first entry alone, blank or not: `*`
    /// means exclusion. Blank entries are dropped afterwards.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: Vec<String> = entries
            .into_iter()
            .map(|e| e.as_ref().to_string())
            .collect();
        let exclusion = entries
            .first()
            .is_some_and(|first| first.trim() == WILDCARD);
        let skip = usize::from(exclusion);
        let patterns: Vec<NamePattern> = entries
            .iter()
            .skip(skip)
            .filter(|e| !e.trim().is_empty())
            .map(|e| NamePattern::parse(e))
            .collect();

        match (exclusion, patterns.is_empty()) {
            (true, _) => TableFilter::AllExcept(patterns),
            (false, true) => TableFilter::All,
            (false, false) => TableFilter::Only(patterns),
        }
    }

    /// Build a filter from a comma separated string such as `"wp_*,orders"`.
    pub fn parse(list: &str) -> Self {
        Self::from_entries(list.split(','))
    }

    /// Apply the filter to catalog names, keeping catalog order.
    pub fn select<S: AsRef<str>>(&self, all: &[S]) -> Vec<String> {
        all.iter()
            .map(|name| name.as_ref())
            .filter(|name| self.accepts(name))
            .map(str::to_string)
            .collect()
    }

    pub fn accepts(&self, name: &str) -> bool {
        match self {
            TableFilter::All => true,
            TableFilter::AllExcept(patterns) => !patterns.iter().any(|p| p.matches(name)),
            TableFilter::Only(patterns) => patterns.iter().any(|p| p.matches(name)),
        }
    }
}

impl fmt::Display for TableFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |patterns: &[NamePattern]| {
            patterns
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        match self {
            TableFilter::All => write!(f, "{WILDCARD}"),
            TableFilter::AllExcept(patterns) if patterns.is_empty() => write!(f, "{WILDCARD}"),
            TableFilter::AllExcept(patterns) => write!(f, "{WILDCARD},{}", join(patterns)),
            TableFilter::Only(patterns) => write!(f, "{}", join(patterns)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<&'static str> {
        vec!["wp_posts", "orders", "wp_users", "table1", "table10"]
    }

    #[test]
    fn test_empty_filter_selects_everything() {
        let filter = TableFilter::from_entries(Vec::<String>::new());
        assert_eq!(filter, TableFilter::All);
        assert_eq!(filter.select(&catalog()), catalog());
    }

    #[test]
    fn test_prefix_entry_matches_prefix_only() {
        let filter = TableFilter::parse("wp_*");
        assert_eq!(filter.select(&catalog()), vec!["wp_posts", "wp_users"]);
    }

    #[test]
    fn test_exact_entry_does_not_match_longer_names() {
        let filter = TableFilter::parse("table1");
        assert_eq!(filter.select(&catalog()), vec!["table1"]);
    }

    #[test]
    fn test_entries_are_trimmed() {
        let filter = TableFilter::parse(" orders , wp_* ");
        assert_eq!(
            filter.select(&catalog()),
            vec!["wp_posts", "orders", "wp_users"]
        );
    }

    #[test]
    fn test_exclusion_mode() {
        let filter = TableFilter::parse("*,wp_*,table10");
        assert!(matches!(filter, TableFilter::AllExcept(_)));
        assert_eq!(filter.select(&catalog()), vec!["orders", "table1"]);
    }

    #[test]
    fn test_sentinel_alone_selects_everything() {
        let filter = TableFilter::parse("*");
        assert_eq!(filter.select(&catalog()), catalog());
    }

    #[test]
    fn test_sentinel_only_counts_in_first_position() {
        let filter = TableFilter::from_entries(["orders", "*"]);
        assert!(matches!(filter, TableFilter::Only(_)));
        // A bare "*" entry is an empty prefix and matches everything.
        assert_eq!(filter.select(&catalog()), catalog());
    }

    #[test]
    fn test_leading_blank_entry_keeps_inclusion_mode() {
        let filter = TableFilter::parse(",*,orders");
        assert!(matches!(filter, TableFilter::Only(_)));
        assert_eq!(filter.select(&catalog()), catalog());
    }

    #[test]
    fn test_blank_list_selects_everything() {
        assert_eq!(TableFilter::parse(""), TableFilter::All);
        assert_eq!(TableFilter::parse(" , "), TableFilter::All);
    }

    #[test]
    fn test_no_match_is_empty_selection() {
        let filter = TableFilter::parse("missing");
        assert!(filter.select(&catalog()).is_empty());
    }

    #[test]
    fn test_selection_is_idempotent() {
        let filter = TableFilter::parse("wp_*,orders");
        assert_eq!(filter.select(&catalog()), filter.select(&catalog()));
    }

    #[test]
    fn test_exclusion_and_inclusion_partition_catalog() {
        let all = catalog();
        let excluded = TableFilter::from_entries(["*", "wp_*", "table1"]).select(&all);
        let included = TableFilter::from_entries(["wp_*", "table1"]).select(&all);

        assert!(excluded.iter().all(|name| !included.contains(name)));
        let mut union: Vec<String> = excluded.into_iter().chain(included).collect();
        union.sort();
        let mut expected: Vec<String> = all.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(union, expected);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let filter = TableFilter::parse("*,wp_*,orders");
        assert_eq!(filter.to_string(), "*,wp_*,orders");
        assert_eq!(TableFilter::parse(&filter.to_string()), filter);
    }
}
