use std::collections::BTreeSet;

/// Blacklist entry that asks the agent to list its commands instead of
/// disabling one.
pub const LIST_COMMANDS_QUERY: &str = "?";

/// Set of command names excluded from dispatch.
///
/// Entries may be supplied individually or as comma separated lists; blanks
/// are ignored and duplicates collapse. Command names are case-sensitive on
/// the wire, so only surrounding whitespace is normalised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    names: BTreeSet<String>,
    listing_requested: bool,
}

impl Blacklist {
    /// Builds a blacklist from raw configuration entries.
    #[must_use]
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut blacklist = Self::default();
        for entry in entries {
            for name in entry.as_ref().split(',') {
                blacklist.insert(name);
            }
        }
        blacklist
    }

    fn insert(&mut self, raw: &str) {
        let name = raw.trim();
        if name.is_empty() {
            return;
        }
        if name == LIST_COMMANDS_QUERY {
            self.listing_requested = true;
        } else {
            self.names.insert(name.to_owned());
        }
    }

    /// Returns `true` when the command is disabled.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name.trim())
    }

    /// Returns `true` when `?` appeared among the entries.
    #[must_use]
    pub const fn is_listing_requested(&self) -> bool {
        self.listing_requested
    }

    /// Iterates over the disabled command names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of disabled commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when no command is disabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_comma_separated_entries() {
        let blacklist = Blacklist::from_entries(["guest-shutdown,guest-exec", " guest-file-open "]);
        let names: Vec<_> = blacklist.iter().collect();
        assert_eq!(names, ["guest-exec", "guest-file-open", "guest-shutdown"]);
    }

    #[test]
    fn query_marker_requests_listing_without_disabling() {
        let blacklist = Blacklist::from_entries(["?"]);
        assert!(blacklist.is_listing_requested());
        assert!(blacklist.is_empty());
        assert!(!blacklist.contains("?"));
    }

    #[test]
    fn ignores_blank_entries_and_duplicates() {
        let blacklist = Blacklist::from_entries(["a,,a", "", " , "]);
        assert_eq!(blacklist.len(), 1);
        assert!(blacklist.contains("a"));
    }

    #[test]
    fn lookups_are_case_sensitive() {
        let blacklist = Blacklist::from_entries(["guest-ping"]);
        assert!(blacklist.contains(" guest-ping"));
        assert!(!blacklist.contains("GUEST-PING"));
    }
}
