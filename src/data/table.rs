use std::collections::BTreeMap;

/// Read-only table of country codes and names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryTable {
    entries: BTreeMap<String, String>,
}

impl CountryTable {
    /// Build the table from `(code, name)` pairs. Codes are stored upper case;
    /// a repeated code keeps its last name.
    pub fn new<I, C, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<String>,
        N: Into<String>,
    {
        CountryTable {
            entries: entries
                .into_iter()
                .map(|(code, name)| (code.into().trim().to_uppercase(), name.into()))
                .collect(),
        }
    }

    /// Every country whose name contains `query`, ignoring case
    pub fn code_search(&self, query: &str) -> BTreeMap<String, String> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .filter(|(_, name)| name.to_lowercase().contains(&query))
            .map(|(code, name)| (code.clone(), name.clone()))
            .collect()
    }

    /// Find a country by code, ignoring case
    pub fn lookup(&self, code: &str) -> Option<(&str, &str)> {
        self.entries
            .get_key_value(&code.trim().to_uppercase())
            .map(|(code, name)| (code.as_str(), name.as_str()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.lookup(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(code, name)| (code.as_str(), name.as_str()))
    }
}
