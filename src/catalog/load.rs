use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{Catalog, CatalogError, Result, TrackRecord};

/// Read every source table in order and build one catalog from the
/// concatenated rows. Row order is preserved within and across sources.
pub fn load_catalog<P: AsRef<Path>>(sources: &[P]) -> Result<Catalog> {
    let mut records = Vec::new();

    for source in sources {
        let path = source.as_ref();
        let rows = read_records(path)?;
        log::info!("Loaded {} rows from {}", rows.len(), path.display());
        records.extend(rows);
    }

    if records.is_empty() {
        log::warn!("No rows found in {} source(s)", sources.len());
        return Err(CatalogError::Empty);
    }

    let catalog = Catalog::from_records(records)?;
    log::info!("Catalog has {} songs", catalog.len());
    Ok(catalog)
}

/// Deserialize one CSV table. Unknown columns are ignored; empty cells
/// become `None`.
fn read_records(path: &Path) -> Result<Vec<TrackRecord>> {
    let read_err = |source| CatalogError::Read {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(read_err)?;

    reader
        .deserialize::<TrackRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(read_err)
}

/// Find all `.csv` files under `dir`, in lexicographic file-name order
/// (`part10` sorts before `part2`; zero-pad numbered parts).
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_csv = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv {
            sources.push(entry.into_path());
        }
    }
    log::debug!("Discovered {} CSV source(s) under {}", sources.len(), dir.display());
    Ok(sources)
}
