/// Physical store names for an index.
///
/// Index names are lower-cased; language codes are used as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    prefix: String,
}

impl StoreNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        StoreNames {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn primary(&self, index: &str) -> String {
        format!("{}_{}", self.prefix, index.to_lowercase())
    }

    pub fn localized(&self, index: &str) -> String {
        format!("{}_localized_{}", self.prefix, index.to_lowercase())
    }

    pub fn localized_view(&self, index: &str, language: &str) -> String {
        format!("{}_{}", self.localized(index), language)
    }

    pub fn relations(&self, index: &str) -> String {
        format!("{}_relations_{}", self.prefix, index.to_lowercase())
    }

    /// Every store of `index`: primary, localized, relations, then one view
    /// per language.
    pub fn all(&self, index: &str, languages: &[String]) -> Vec<String> {
        let mut names = vec![
            self.primary(index),
            self.localized(index),
            self.relations(index),
        ];
        names.extend(languages.iter().map(|l| self.localized_view(index, l)));
        names
    }
}
