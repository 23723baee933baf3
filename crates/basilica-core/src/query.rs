//! Query string assembly for list endpoints.
//!
//! Filters on the Basilica list endpoints are all optional; this builder collects
//! only the ones that are set so client crates can pass them straight to `reqwest`.

use std::fmt::Display;

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a key/value pair when the value is present.
    pub fn push_opt<T>(&mut self, key: &'static str, value: Option<T>)
    where
        T: Display,
    {
        if let Some(value) = value {
            self.pairs.push((key, value.to_string()));
        }
    }

    /// Append `key=true` when `flag` is set; nothing otherwise.
    pub fn push_flag(&mut self, key: &'static str, flag: bool) {
        if flag {
            self.pairs.push((key, "true".to_string()));
        }
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key, value.to_string()));
    }

    /// Return the collected key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::QueryParams;

    #[test]
    fn push_opt_skips_none() {
        let mut params = QueryParams::new();
        params.push_opt("gpu_type", Option::<String>::None);
        assert!(params.is_empty());
    }

    #[test]
    fn push_flag_only_when_set() {
        let mut params = QueryParams::new();
        params.push_flag("follow", false);
        assert!(params.is_empty());

        params.push_flag("follow", true);
        params.push("tail", 100);
        assert_eq!(
            params.into_pairs(),
            vec![("follow", "true".to_string()), ("tail", "100".to_string())]
        );
    }
}
