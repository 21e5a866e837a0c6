//! The Pokedex: every known Pokemon keyed by name, with its defensive
//! effectiveness precomputed against each attacking type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::fuzzy::{FuzzyCache, FuzzyMatch, LookupError};
use super::similarity::name_confidence;
use super::types::{Effectiveness, EffectivenessError, PokemonType, TypeChart};

/// One raw record as written by the Pokedex scraper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogRecord {
    #[serde(alias = "id")]
    pub id: u32,
    #[serde(alias = "name")]
    pub name: String,
    #[serde(alias = "primaryType")]
    pub primary_type: PokemonType,
    #[serde(alias = "secondaryType", default)]
    pub secondary_type: Option<PokemonType>,
    /// Stored buckets are informational only; they are always recomputed.
    #[serde(alias = "effectiveness", default)]
    pub type_effectivenesses: Option<BTreeMap<Effectiveness, Vec<PokemonType>>>,
}

/// The attacking types that land in each effectiveness level.
///
/// Every type appears in exactly one bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectivenessBuckets {
    buckets: BTreeMap<Effectiveness, Vec<PokemonType>>,
}

impl EffectivenessBuckets {
    /// Classifies every attacking type against the given defender.
    pub fn compute(
        chart: &TypeChart,
        primary: PokemonType,
        secondary: Option<PokemonType>,
    ) -> Result<Self, EffectivenessError> {
        let mut buckets: BTreeMap<Effectiveness, Vec<PokemonType>> = Effectiveness::ALL
            .into_iter()
            .map(|level| (level, Vec::new()))
            .collect();

        for attacking in PokemonType::ALL {
            let level = chart.against(attacking, primary, secondary)?;
            buckets.entry(level).or_default().push(attacking);
        }

        Ok(Self { buckets })
    }

    pub fn get(&self, level: Effectiveness) -> &[PokemonType] {
        self.buckets.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Level the given attacking type falls into.
    #[cfg(test)]
    pub fn level_of(&self, attacking: PokemonType) -> Option<Effectiveness> {
        self.buckets
            .iter()
            .find(|(_, types)| types.contains(&attacking))
            .map(|(level, _)| *level)
    }

    fn matches(&self, stored: &BTreeMap<Effectiveness, Vec<PokemonType>>) -> bool {
        Effectiveness::ALL.into_iter().all(|level| {
            let mut theirs = stored.get(&level).cloned().unwrap_or_default();
            theirs.sort();
            let mut ours = self.get(level).to_vec();
            ours.sort();
            theirs == ours
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: String,
    pub primary_type: PokemonType,
    pub secondary_type: Option<PokemonType>,
    pub effectiveness: EffectivenessBuckets,
}

#[derive(Debug, Error)]
pub enum CatalogBuildError {
    #[error("duplicate Pokemon name in catalog: {0}")]
    DuplicateName(String),
    #[error("type chart is inconsistent: {0}")]
    Effectiveness(#[from] EffectivenessError),
}

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("catalog file not found: {}", .0.display())]
    FileMissing(PathBuf),
    #[error("failed to read catalog file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("catalog file {} is not valid JSON: {source}", path.display())]
    MalformedJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to build catalog: {0}")]
    Build(#[from] CatalogBuildError),
}

/// Immutable after construction; shared freely between threads.
pub struct Catalog {
    entries: FuzzyCache<String, CatalogEntry>,
}

impl Catalog {
    /// Builds the catalog, computing every entry's effectiveness buckets.
    pub fn build(
        records: impl IntoIterator<Item = CatalogRecord>,
        chart: &TypeChart,
    ) -> Result<Self, CatalogBuildError> {
        let mut entries = FuzzyCache::new(|desired: &String, actual: &String| {
            name_confidence(desired, actual)
        });

        for record in records {
            let secondary = record.secondary_type.filter(|&t| t != record.primary_type);
            let effectiveness =
                EffectivenessBuckets::compute(chart, record.primary_type, secondary)?;

            if let Some(stored) = &record.type_effectivenesses {
                if !effectiveness.matches(stored) {
                    crate::log(&format!(
                        "Warning: stored effectiveness for {} disagrees with the type chart, using computed values",
                        record.name
                    ));
                }
            }

            let name = record.name.clone();
            let entry = CatalogEntry {
                id: record.id,
                name: name.clone(),
                primary_type: record.primary_type,
                secondary_type: secondary,
                effectiveness,
            };

            entries
                .add(record.name, entry)
                .map_err(|_| CatalogBuildError::DuplicateName(name))?;
        }

        Ok(Self { entries })
    }

    /// Loads a JSON array of records from disk and builds the catalog.
    pub fn load(path: &Path, chart: &TypeChart) -> Result<Self, CatalogLoadError> {
        let contents = fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CatalogLoadError::FileMissing(path.to_path_buf())
            } else {
                CatalogLoadError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let records: Vec<CatalogRecord> =
            serde_json::from_str(&contents).map_err(|source| CatalogLoadError::MalformedJson {
                path: path.to_path_buf(),
                source,
            })?;

        let catalog = Self::build(records, chart)?;
        crate::log(&format!(
            "Loaded {} Pokemon from {}",
            catalog.len(),
            path.display()
        ));
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_exact(&self, name: &str) -> Result<&CatalogEntry, LookupError> {
        self.entries.get_exact(&name.to_string())
    }

    /// Resolves a possibly misread name to the closest catalog entry.
    pub fn get_best(&self, name: &str) -> Option<FuzzyMatch<&CatalogEntry>> {
        self.entries.get_best(&name.to_string())
    }

    /// Attacking types in `level` against the named Pokemon.
    pub fn effectiveness(
        &self,
        name: &str,
        level: Effectiveness,
    ) -> Result<&[PokemonType], LookupError> {
        Ok(self.get_exact(name)?.effectiveness.get(level))
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().map(|(_, entry)| entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(id: u32, name: &str, primary: PokemonType, secondary: Option<PokemonType>) -> CatalogRecord {
        CatalogRecord {
            id,
            name: name.to_string(),
            primary_type: primary,
            secondary_type: secondary,
            type_effectivenesses: None,
        }
    }

    fn sample_catalog() -> Catalog {
        Catalog::build(
            vec![
                record(1, "Orchynx", PokemonType::Grass, None),
                record(4, "Eletux", PokemonType::Electric, None),
                record(10, "Nucleon", PokemonType::Nuclear, None),
                record(27, "Raptorch", PokemonType::Fire, Some(PokemonType::Rock)),
                record(33, "Sponee", PokemonType::Bug, Some(PokemonType::Flying)),
            ],
            &TypeChart::uranium(),
        )
        .unwrap()
    }

    fn assert_partition(buckets: &EffectivenessBuckets) {
        let mut seen: Vec<PokemonType> = Effectiveness::ALL
            .into_iter()
            .flat_map(|level| buckets.get(level).to_vec())
            .collect();
        seen.sort();
        assert_eq!(seen, PokemonType::ALL.to_vec());
    }

    #[test]
    fn test_buckets_partition_all_types() {
        let catalog = sample_catalog();
        for entry in catalog.entries() {
            assert_partition(&entry.effectiveness);
        }
    }

    #[test]
    fn test_every_dual_type_combination_builds() {
        let chart = TypeChart::uranium();
        for primary in PokemonType::ALL {
            for secondary in PokemonType::ALL {
                let buckets = EffectivenessBuckets::compute(&chart, primary, Some(secondary)).unwrap();
                assert_partition(&buckets);
            }
        }
    }

    #[test]
    fn test_dual_type_buckets() {
        let catalog = sample_catalog();
        let raptorch = catalog.get_exact("Raptorch").unwrap();
        assert_eq!(
            raptorch.effectiveness.level_of(PokemonType::Water),
            Some(Effectiveness::SuperWeak)
        );
        assert_eq!(
            catalog.effectiveness("Raptorch", Effectiveness::SuperWeak).unwrap(),
            &[PokemonType::Ground, PokemonType::Nuclear, PokemonType::Water]
        );
    }

    #[test]
    fn test_single_type_buckets() {
        let catalog = sample_catalog();
        let immune = catalog.effectiveness("Eletux", Effectiveness::Immune).unwrap();
        assert!(immune.is_empty());
        let weak = catalog.effectiveness("Eletux", Effectiveness::Weak).unwrap();
        assert_eq!(weak, &[PokemonType::Ground, PokemonType::Nuclear]);
    }

    #[test]
    fn test_secondary_equal_to_primary_is_single_typed() {
        let catalog = Catalog::build(
            vec![record(1, "Orchynx", PokemonType::Grass, Some(PokemonType::Grass))],
            &TypeChart::uranium(),
        )
        .unwrap();
        assert_eq!(catalog.get_exact("Orchynx").unwrap().secondary_type, None);
    }

    #[test]
    fn test_exact_names_resolve_with_full_confidence() {
        let catalog = sample_catalog();
        for entry in catalog.entries() {
            let best = catalog.get_best(&entry.name).unwrap();
            assert_eq!(best.confidence, 1.0);
            assert_eq!(best.value.id, entry.id);
        }
    }

    #[test]
    fn test_misread_name_resolves() {
        let catalog = sample_catalog();
        let best = catalog.get_best("Nuc1eon").unwrap();
        assert_eq!(best.value.name, "Nucleon");
        assert!(best.confidence < 1.0);
        assert!(best.confidence > 0.8);
    }

    #[test]
    fn test_duplicate_names_fail() {
        let result = Catalog::build(
            vec![
                record(1, "Orchynx", PokemonType::Grass, None),
                record(2, "Orchynx", PokemonType::Fire, None),
            ],
            &TypeChart::uranium(),
        );
        assert!(matches!(result, Err(CatalogBuildError::DuplicateName(_))));
    }

    #[test]
    fn test_inconsistent_chart_fails_build() {
        let chart = TypeChart::new().with_rule(
            PokemonType::Fire,
            &[PokemonType::Grass, PokemonType::Rock],
            Effectiveness::DoubleResisted,
        );
        let result = Catalog::build(
            vec![record(1, "Odd", PokemonType::Grass, Some(PokemonType::Rock))],
            &chart,
        );
        assert!(matches!(result, Err(CatalogBuildError::Effectiveness(_))));
    }

    #[test]
    fn test_load_from_scraper_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"Id": 1, "Name": "Orchynx", "PrimaryType": "Grass", "SecondaryType": null,
                  "TypeEffectivenesses": {{"Weak": ["Fire"]}}}},
                {{"id": 27, "name": "Raptorch", "primaryType": "fire", "secondaryType": "rock"}}
            ]"#
        )
        .unwrap();

        let catalog = Catalog::load(file.path(), &TypeChart::uranium()).unwrap();
        assert_eq!(catalog.len(), 2);
        let raptorch = catalog.get_exact("Raptorch").unwrap();
        assert_eq!(raptorch.secondary_type, Some(PokemonType::Rock));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("UraniumPokedex.json");
        let result = Catalog::load(&path, &TypeChart::uranium());
        assert!(matches!(result, Err(CatalogLoadError::FileMissing(p)) if p == path));
    }

    #[test]
    fn test_load_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let result = Catalog::load(file.path(), &TypeChart::uranium());
        assert!(matches!(result, Err(CatalogLoadError::MalformedJson { .. })));
    }
}
