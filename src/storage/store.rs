use crate::config::OutputConfig;
use crate::locale::Locale;
use crate::storage::document::{CategoryDocument, CityDocument, PersistenceDocument};
use crate::storage::{BusinessRecord, CategoryNode, HierarchyKey, StoreError, StoreResult};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Default)]
struct Partition {
    categories: Vec<CategoryBucket>,
    /// Position in `categories` by (slug, language)
    category_index: HashMap<(String, String), usize>,
    urls: HashSet<String>,
}

#[derive(Debug)]
struct CategoryBucket {
    node: CategoryNode,
    cities: Vec<CityBucket>,
    /// Position in `cities` by city name
    city_index: HashMap<String, usize>,
}

#[derive(Debug)]
struct CityBucket {
    name: String,
    records: Vec<BusinessRecord>,
}

impl CategoryBucket {
    fn new(node: CategoryNode) -> Self {
        Self {
            node,
            cities: Vec::new(),
            city_index: HashMap::new(),
        }
    }

    fn city_mut(&mut self, name: &str) -> &mut CityBucket {
        let index = match self.city_index.get(name) {
            Some(&index) => index,
            None => {
                self.cities.push(CityBucket {
                    name: name.to_string(),
                    records: Vec::new(),
                });
                self.city_index.insert(name.to_string(), self.cities.len() - 1);
                self.cities.len() - 1
            }
        };
        &mut self.cities[index]
    }
}

impl Partition {
    fn category_position(&self, slug: &str, language: &str) -> Option<usize> {
        self.category_index
            .get(&(slug.to_string(), language.to_string()))
            .copied()
    }

    fn push_category(&mut self, node: CategoryNode) -> usize {
        let key = (node.slug.clone(), node.language.clone());
        self.categories.push(CategoryBucket::new(node));
        let index = self.categories.len() - 1;
        self.category_index.insert(key, index);
        index
    }

    fn city_mut(&mut self, key: &HierarchyKey) -> &mut CityBucket {
        let index = match self.category_position(&key.category_slug, &key.language) {
            Some(index) => index,
            None => self.push_category(CategoryNode::new(
                &key.category_slug,
                &key.category_slug,
                &key.language,
            )),
        };
        self.categories[index].city_mut(&key.city)
    }
}

/// Folds a freshly resolved node into a known one; names already known are
/// kept where the new node has none
fn merge_node(known: &mut CategoryNode, fresh: CategoryNode) {
    known.display_name = fresh.display_name;
    for (locale, name) in fresh.translations {
        match name {
            Some(name) => {
                known.translations.insert(locale, Some(name));
            }
            None => {
                known.translations.entry(locale).or_insert(None);
            }
        }
    }
}

/// In-memory accumulator of collected records, one document per partition
///
/// Categories and cities keep their discovery order. Records are appended and
/// never removed or deduplicated; use [`DatasetStore::contains_url`] to decide
/// whether a record is worth collecting before appending it.
#[derive(Debug)]
pub struct DatasetStore {
    data_dir: PathBuf,
    file_prefix: String,
    partitions: BTreeMap<char, Partition>,
}

impl DatasetStore {
    pub fn new(data_dir: impl Into<PathBuf>, file_prefix: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_prefix: file_prefix.to_string(),
            partitions: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.data_dir.clone(), &config.file_prefix)
    }

    /// Fixed document path of a partition: `{data-dir}/{prefix}_{letter}.json`
    pub fn partition_path(&self, partition: char) -> PathBuf {
        self.data_dir.join(format!(
            "{}_{}.json",
            self.file_prefix,
            partition.to_ascii_lowercase()
        ))
    }

    fn partition_mut(&mut self, partition: char) -> &mut Partition {
        self.partitions
            .entry(partition.to_ascii_uppercase())
            .or_default()
    }

    /// Adds a category, or merges its name and translations into the known one
    ///
    /// A translation that is missing or `None` in `node` never replaces one
    /// that is already known, so names restored from an earlier run survive
    /// a locale that fails this time.
    pub fn register_category(&mut self, partition: char, node: CategoryNode) {
        let partition = self.partition_mut(partition);
        match partition.category_position(&node.slug, &node.language) {
            Some(index) => merge_node(&mut partition.categories[index].node, node),
            None => {
                partition.push_category(node);
            }
        }
    }

    /// Makes sure the city bucket of `key` exists, even if it stays empty
    pub fn ensure_city(&mut self, key: &HierarchyKey) {
        self.partition_mut(key.partition).city_mut(key);
    }

    /// Appends `record` under `key`
    pub fn append(&mut self, key: &HierarchyKey, record: BusinessRecord) {
        let partition = self.partition_mut(key.partition);
        partition.urls.insert(record.source_url.clone());
        partition.city_mut(key).records.push(record);
    }

    /// Returns true if a record with this source URL is in the partition
    pub fn contains_url(&self, partition: char, url: &str) -> bool {
        self.partitions
            .get(&partition.to_ascii_uppercase())
            .is_some_and(|p| p.urls.contains(url))
    }

    pub fn record_count(&self, partition: char) -> usize {
        self.partitions
            .get(&partition.to_ascii_uppercase())
            .map(count_records)
            .unwrap_or(0)
    }

    /// Projects a partition into its document
    pub fn flatten(&self, partition: char) -> PersistenceDocument {
        let Some(partition) = self.partitions.get(&partition.to_ascii_uppercase()) else {
            return PersistenceDocument::default();
        };

        let categories = partition
            .categories
            .iter()
            .map(|bucket| {
                let name = |locale: Locale| bucket.node.translations.get(&locale).cloned().flatten();
                CategoryDocument {
                    name_en: name(Locale::En),
                    name_de: name(Locale::De),
                    name_fr: name(Locale::Fr),
                    name_it: name(Locale::It),
                    slug: bucket.node.slug.clone(),
                    language: bucket.node.language.clone(),
                    cities: bucket
                        .cities
                        .iter()
                        .map(|city| CityDocument {
                            name: city.name.clone(),
                            professionals: city.records.clone(),
                        })
                        .collect(),
                }
            })
            .collect();

        PersistenceDocument { categories }
    }

    /// Rewrites the whole partition document and returns its path
    ///
    /// The document is written to a temporary file in the same directory and
    /// renamed over the previous one, so readers only ever see complete files.
    pub fn flatten_and_write(&self, partition: char) -> StoreResult<PathBuf> {
        let path = self.partition_path(partition);
        let document = self.flatten(partition);
        let json = serde_json::to_string_pretty(&document)?;
        atomic_write(&path, format!("{}\n", json).as_bytes())?;
        tracing::debug!(
            "Wrote {} records to {}",
            document.record_count(),
            path.display()
        );
        Ok(path)
    }

    /// Reads a partition document written by an earlier run
    ///
    /// Returns `Ok(None)` when the partition has never been written.
    pub fn load_partition(&self, partition: char) -> StoreResult<Option<PersistenceDocument>> {
        let path = self.partition_path(partition);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let document = serde_json::from_str(&content).map_err(|e| StoreError::InvalidDocument {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(document))
    }

    /// Seeds a partition from a previously written document
    pub fn restore(&mut self, partition: char, document: PersistenceDocument) {
        let letter = partition.to_ascii_uppercase();
        for category in document.categories {
            let mut node = CategoryNode::new(
                &category.slug,
                category.name_en.as_deref().unwrap_or(&category.slug),
                &category.language,
            );
            node.translations = category.translations();
            self.register_category(letter, node.clone());

            for city in category.cities {
                let key = HierarchyKey::new(letter, &node, &city.name);
                self.ensure_city(&key);
                for record in city.professionals {
                    self.append(&key, record);
                }
            }
        }
    }
}

fn count_records(partition: &Partition) -> usize {
    partition
        .categories
        .iter()
        .flat_map(|category| &category.cities)
        .map(|city| city.records.len())
        .sum()
}

fn atomic_write(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file_mut().sync_all()?;
    temp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bakeries() -> CategoryNode {
        let mut node = CategoryNode::new("bakeries", "Bakeries", "en");
        node.translations.insert(Locale::En, Some("Bakeries".to_string()));
        node.translations.insert(Locale::De, Some("Bäckereien".to_string()));
        node.translations.insert(Locale::Fr, None);
        node
    }

    fn record(url: &str, city: &str) -> BusinessRecord {
        BusinessRecord {
            title: format!("Shop {}", url),
            address: Some("Bahnhofstrasse 1, 8001 Zürich".to_string()),
            rating: None,
            email: "info@shop.ch".to_string(),
            category: "Bakeries".to_string(),
            city: city.to_string(),
            source_url: url.to_string(),
        }
    }

    fn store(dir: &TempDir) -> DatasetStore {
        DatasetStore::new(dir.path().join("data"), "harvest")
    }

    #[test]
    fn test_partition_path() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(
            store.partition_path('B'),
            dir.path().join("data").join("harvest_b.json")
        );
    }

    #[test]
    fn test_flatten_keeps_discovery_order() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let node = bakeries();
        store.register_category('b', node.clone());

        let zurich = HierarchyKey::new('b', &node, "Zürich");
        let basel = HierarchyKey::new('b', &node, "Basel");
        store.append(&zurich, record("https://dir.test/d/1", "Zürich"));
        store.ensure_city(&basel);
        store.append(&zurich, record("https://dir.test/d/2", "Zürich"));

        let document = store.flatten('B');
        assert_eq!(document.categories.len(), 1);
        let cities = &document.categories[0].cities;
        assert_eq!(cities[0].name, "Zürich");
        assert_eq!(cities[1].name, "Basel");
        assert_eq!(cities[0].professionals.len(), 2);
        assert!(cities[1].professionals.is_empty());
        assert_eq!(cities[0].professionals[1].source_url, "https://dir.test/d/2");
    }

    #[test]
    fn test_append_never_deduplicates() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let node = bakeries();
        let key = HierarchyKey::new('B', &node, "Bern");

        store.append(&key, record("https://dir.test/d/1", "Bern"));
        store.append(&key, record("https://dir.test/d/1", "Bern"));

        assert_eq!(store.flatten('B').record_count(), 2);
        assert!(store.contains_url('b', "https://dir.test/d/1"));
        assert!(!store.contains_url('C', "https://dir.test/d/1"));
    }

    #[test]
    fn test_write_is_idempotent_and_complete() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let node = bakeries();
        store.register_category('B', node.clone());
        store.append(
            &HierarchyKey::new('B', &node, "Zürich"),
            record("https://dir.test/d/1", "Zürich"),
        );

        let path = store.flatten_and_write('B').unwrap();
        let first = fs::read(&path).unwrap();
        store.flatten_and_write('B').unwrap();
        let second = fs::read(&path).unwrap();
        assert_eq!(first, second);

        let text = String::from_utf8(first).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\"name_fr\": null"));
        assert!(text.contains("\"name_it\": null"));
        assert!(text.contains("\"rating\": null"));
        assert!(text.contains("Bäckereien"));

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_register_category_refreshes_translations() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        store.register_category('B', CategoryNode::new("bakeries", "Bakeries", "en"));
        store.register_category('B', bakeries());

        let document = store.flatten('B');
        assert_eq!(document.categories.len(), 1);
        assert_eq!(document.categories[0].name_de.as_deref(), Some("Bäckereien"));
    }

    #[test]
    fn test_register_category_keeps_known_translations() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        store.register_category('B', bakeries());

        let mut fresh = CategoryNode::new("bakeries", "Bakeries", "en");
        fresh.translations.insert(Locale::En, Some("Bakeries".to_string()));
        fresh.translations.insert(Locale::De, None);
        fresh.translations.insert(Locale::Fr, Some("Boulangeries".to_string()));
        store.register_category('B', fresh);

        let category = &store.flatten('B').categories[0];
        assert_eq!(category.name_de.as_deref(), Some("Bäckereien"));
        assert_eq!(category.name_fr.as_deref(), Some("Boulangeries"));
        assert_eq!(category.name_it, None);
    }

    #[test]
    fn test_append_to_many_cities_keeps_order() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let node = bakeries();
        store.register_category('B', node.clone());

        for round in 0..3 {
            for city in 0..50 {
                let name = format!("City {}", city);
                let key = HierarchyKey::new('B', &node, &name);
                store.append(&key, record(&format!("https://dir.test/d/{}/{}", city, round), &name));
            }
        }

        let document = store.flatten('B');
        let cities = &document.categories[0].cities;
        assert_eq!(cities.len(), 50);
        assert_eq!(cities[0].name, "City 0");
        assert_eq!(cities[49].name, "City 49");
        assert!(cities.iter().all(|city| city.professionals.len() == 3));
        assert_eq!(store.record_count('B'), 150);
    }

    #[test]
    fn test_load_missing_partition() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load_partition('Q').unwrap().is_none());
    }

    #[test]
    fn test_load_invalid_partition() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(store.partition_path('B'), "{ not json").unwrap();
        assert!(matches!(
            store.load_partition('B'),
            Err(StoreError::InvalidDocument { .. })
        ));
    }

    #[test]
    fn test_restore_round_trips_document() {
        let dir = TempDir::new().unwrap();
        let mut first = store(&dir);
        let node = bakeries();
        first.register_category('B', node.clone());
        first.append(
            &HierarchyKey::new('B', &node, "Zürich"),
            record("https://dir.test/d/1", "Zürich"),
        );
        first.flatten_and_write('B').unwrap();

        let mut second = store(&dir);
        let loaded = second.load_partition('B').unwrap().unwrap();
        second.restore('B', loaded);

        assert!(second.contains_url('B', "https://dir.test/d/1"));
        assert_eq!(second.flatten('B'), first.flatten('B'));
    }
}
