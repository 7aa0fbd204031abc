//! JSON export of query results
//!
//! Results are written as one flat object keyed by location label to
//! `weatherInfo.json`, or `weatherInfo(1).json`, `weatherInfo(2).json`, ...
//! when earlier files exist. Existing files are never overwritten.

use crate::models::{LocationKey, WeatherMap};
use crate::{Result, WeatherGridError};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FILE_STEM: &str = "weatherInfo";

/// File name for the `n`th export in a directory
fn export_file_name(n: u32) -> String {
    if n == 0 {
        format!("{FILE_STEM}.json")
    } else {
        format!("{FILE_STEM}({n}).json")
    }
}

/// Flatten results to `label -> record`.
///
/// A city whose name equals a grid point label is written as `city:<name>`.
pub fn to_json_object(results: &WeatherMap) -> Result<Map<String, Value>> {
    let point_labels: BTreeSet<String> = results
        .keys()
        .filter(|key| key.is_point())
        .map(LocationKey::label)
        .collect();

    let mut object = Map::new();
    for (key, record) in results {
        let label = match key {
            LocationKey::City(name) if point_labels.contains(name) => {
                warn!("City '{}' collides with a grid point label, exporting as 'city:{}'", name, name);
                format!("city:{name}")
            }
            _ => key.label(),
        };
        let value = serde_json::to_value(record)
            .map_err(|e| WeatherGridError::export(format!("cannot serialize {label}: {e}")))?;
        object.insert(label, value);
    }
    Ok(object)
}

/// Write `results` to the first free `weatherInfo*.json` in `directory`
pub fn export_json<P: AsRef<Path>>(results: &WeatherMap, directory: P) -> Result<PathBuf> {
    let directory = directory.as_ref();
    let object = to_json_object(results)?;

    let (path, file) = create_next_file(directory)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &object)
        .map_err(|e| WeatherGridError::export(format!("{}: {e}", path.display())))?;
    writer.flush()?;

    info!(
        "Exported {} locations to {}",
        object.len(),
        path.display()
    );
    Ok(path)
}

fn create_next_file(directory: &Path) -> Result<(PathBuf, File)> {
    for n in 0..=u32::MAX {
        let path = directory.join(export_file_name(n));
        match File::create_new(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(WeatherGridError::export(format!(
                    "cannot create {}: {e}",
                    path.display()
                )));
            }
        }
    }
    Err(WeatherGridError::export(format!(
        "no free export file name left in {}",
        directory.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, WeatherRecord};
    use serde_json::json;
    use tempfile::tempdir;

    fn results() -> WeatherMap {
        WeatherMap::from([
            (
                LocationKey::city("Madrid"),
                WeatherRecord::new(Coordinate::new(40.4, -3.7)).with_attribute("rain_current", 0.0),
            ),
            (
                LocationKey::point(3),
                WeatherRecord::new(Coordinate::new(40.0, -3.0)).with_attribute("rain_current", 1.5),
            ),
        ])
    }

    #[test]
    fn test_export_file_names() {
        assert_eq!(export_file_name(0), "weatherInfo.json");
        assert_eq!(export_file_name(2), "weatherInfo(2).json");
    }

    #[test]
    fn test_json_object_uses_labels() {
        let object = to_json_object(&results()).unwrap();
        assert_eq!(object["point3"]["rain_current"], json!(1.5));
        assert_eq!(object["Madrid"]["coord"]["latitude"], json!(40.4));
    }

    #[test]
    fn test_colliding_city_label_is_prefixed() {
        let mut results = results();
        results.insert(
            LocationKey::city("point3"),
            WeatherRecord::new(Coordinate::new(1.0, 1.0)),
        );

        let object = to_json_object(&results).unwrap();
        assert_eq!(object.len(), 3);
        assert!(object.contains_key("city:point3"));
        assert_eq!(object["point3"]["coord"]["latitude"], json!(40.0));
    }

    #[test]
    fn test_export_never_overwrites() {
        let dir = tempdir().unwrap();

        let first = export_json(&results(), dir.path()).unwrap();
        let second = export_json(&results(), dir.path()).unwrap();
        let third = export_json(&WeatherMap::new(), dir.path()).unwrap();

        assert_eq!(first, dir.path().join("weatherInfo.json"));
        assert_eq!(second, dir.path().join("weatherInfo(1).json"));
        assert_eq!(third, dir.path().join("weatherInfo(2).json"));

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&first).unwrap()).unwrap();
        assert_eq!(written["point3"]["rain_current"], json!(1.5));
        assert_eq!(std::fs::read_to_string(&third).unwrap(), "{}");
    }

    #[test]
    fn test_export_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let result = export_json(&results(), dir.path().join("nope"));
        assert!(matches!(result, Err(WeatherGridError::Export { .. })));
    }
}
