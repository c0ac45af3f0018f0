//! Attribute column discovery and population column detection.

use geojson::JsonObject;

/// Resident-count column used by the Portuguese BGRI census subsections.
pub const PREFERRED_POPULATION_COLUMN: &str = "N_INDIVIDUOS";

/// Upper-cased name fragments that mark a population column.
const POPULATION_KEYWORDS: &[&str] = &["INDIVIDUOS", "POP", "HABITANTES", "RESIDENTES"];

/// Name fragments that rule a numeric column out as a population guess.
const NON_POPULATION_FRAGMENTS: &[&str] = &["SHAPE", "OBJECTID", "ID"];

/// One attribute column seen in a feature collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    /// Property name.
    pub name: String,
    /// Every non-null value of the column is a JSON number, and there is at
    /// least one.
    pub numeric: bool,
}

/// Collects the property columns of a feature collection in first-seen
/// order.
pub fn summarize_columns<'a, I>(properties: I) -> Vec<ColumnSummary>
where
    I: IntoIterator<Item = Option<&'a JsonObject>>,
{
    // (name, saw a number, saw something else)
    let mut seen: Vec<(String, bool, bool)> = Vec::new();

    for props in properties.into_iter().flatten() {
        for (key, value) in props {
            let index = match seen.iter().position(|(name, ..)| name == key) {
                Some(index) => index,
                None => {
                    seen.push((key.clone(), false, false));
                    seen.len() - 1
                }
            };
            let entry = &mut seen[index];
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::Number(_) => entry.1 = true,
                _ => entry.2 = true,
            }
        }
    }

    seen.into_iter()
        .map(|(name, number, other)| ColumnSummary {
            name,
            numeric: number && !other,
        })
        .collect()
}

/// Picks the property that holds the resident count.
///
/// In order of preference: the `configured` column, the column `recorded`
/// in existing metadata, [`PREFERRED_POPULATION_COLUMN`], the first column
/// whose name mentions a population keyword, and finally the first numeric
/// column that does not look like an identifier or shape attribute.
/// Candidates that do not exist in `columns` are skipped.
#[must_use]
pub fn detect_population_column(
    columns: &[ColumnSummary],
    configured: Option<&str>,
    recorded: Option<&str>,
) -> Option<String> {
    let has = |name: &str| columns.iter().any(|c| c.name == name);

    if let Some(name) = configured {
        if has(name) {
            return Some(name.to_string());
        }
        log::warn!("Configured population column '{name}' is not in the census data");
    }

    if let Some(name) = recorded.filter(|&name| has(name)) {
        return Some(name.to_string());
    }

    if has(PREFERRED_POPULATION_COLUMN) {
        return Some(PREFERRED_POPULATION_COLUMN.to_string());
    }

    if let Some(column) = columns.iter().find(|c| {
        let upper = c.name.to_uppercase();
        POPULATION_KEYWORDS.iter().any(|k| upper.contains(k))
    }) {
        return Some(column.name.clone());
    }

    let guess = columns
        .iter()
        .find(|c| c.numeric && !NON_POPULATION_FRAGMENTS.iter().any(|f| c.name.contains(f)))?;

    log::warn!(
        "No population column found, using '{}' (this may not be a resident count)",
        guess.name
    );
    Some(guess.name.clone())
}
