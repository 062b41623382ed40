//! On-disk document shape
//!
//! ```json
//! { "categories": [ { "name_en": .., "name_de": .., "name_fr": .., "name_it": ..,
//!                     "slug": .., "language": .., "cities": [ { "name": .., "professionals": [..] } ] } ] }
//! ```
//!
//! Absent values are written as `null`; no key is ever omitted.

use crate::locale::{Locale, Translations};
use crate::storage::BusinessRecord;
use serde::{Deserialize, Serialize};

/// One partition's document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistenceDocument {
    pub categories: Vec<CategoryDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDocument {
    pub name_en: Option<String>,
    pub name_de: Option<String>,
    pub name_fr: Option<String>,
    pub name_it: Option<String>,
    pub slug: String,
    pub language: String,
    pub cities: Vec<CityDocument>,
}

impl CategoryDocument {
    /// Localized name, `None` when unknown
    pub fn name(&self, locale: Locale) -> Option<&str> {
        match locale {
            Locale::En => self.name_en.as_deref(),
            Locale::De => self.name_de.as_deref(),
            Locale::Fr => self.name_fr.as_deref(),
            Locale::It => self.name_it.as_deref(),
        }
    }

    /// Translation map with an entry for every locale that has a name
    pub fn translations(&self) -> Translations {
        Locale::ALL
            .into_iter()
            .filter_map(|locale| {
                self.name(locale)
                    .map(|name| (locale, Some(name.to_string())))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityDocument {
    pub name: String,
    pub professionals: Vec<BusinessRecord>,
}

impl PersistenceDocument {
    pub fn record_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|category| &category.cities)
            .map(|city| city.professionals.len())
            .sum()
    }
}
