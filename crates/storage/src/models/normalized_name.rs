/// A newtype that ensures category and stage names are stored in a single
/// canonical spelling, so "Elite", " elite " and "ELITE" collide on the
/// unique index instead of becoming three categories.
///
/// The type enforces at compile-time that repositories bind the normalized
/// form when inserting or looking up names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName(String);

impl NormalizedName {
    /// Trims surrounding whitespace, collapses inner runs of whitespace and
    /// uppercases the result.
    ///
    /// # Examples
    ///
    /// ```
    /// use raceday_storage::models::NormalizedName;
    ///
    /// let a = NormalizedName::new("  Master  b ");
    /// let b = NormalizedName::new("MASTER B");
    ///
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str(), "MASTER B");
    /// ```
    pub fn new(name: impl AsRef<str>) -> Self {
        let collapsed = name
            .as_ref()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        Self(collapsed.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for NormalizedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_uppercases() {
        assert_eq!(NormalizedName::new("juvenil").as_str(), "JUVENIL");
    }

    #[test]
    fn test_normalization_trims_and_collapses() {
        assert_eq!(NormalizedName::new("  damas \t elite ").as_str(), "DAMAS ELITE");
    }

    #[test]
    fn test_normalization_case_insensitive() {
        assert_eq!(NormalizedName::new("Open"), NormalizedName::new("OPEN"));
    }

    #[test]
    fn test_blank_name_is_empty() {
        assert!(NormalizedName::new("   ").is_empty());
    }
}
