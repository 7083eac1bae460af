use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

/// Dataset extensions GIS Cloud accepts, compared case-sensitively.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    ".shp", ".mif", ".mid", ".tab", ".kml", ".gpx", ".tif", ".tiff", ".ecw", ".img", ".jp2",
    ".jpg", ".png", ".pdf", ".json", ".geojson",
];

#[derive(Debug, Default, PartialEq)]
pub struct Filtered {
    /// Accepted paths in input order, each listed once.
    pub accepted: Vec<PathBuf>,
    /// Non-empty candidates that were turned away.
    pub rejected: Vec<String>,
}

/// Extension of `path` including the leading dot, or `None` when it has none.
fn dotted_extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
}

pub fn accepts(path: &str) -> bool {
    if path.is_empty() {
        warn!("Ignoring empty dataset path");
        return false;
    }

    let accepted = dotted_extension(path)
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()));

    if !accepted {
        warn!("{} is not an accepted filetype", path);
    }

    accepted
}

pub fn partition<I, S>(candidates: I) -> Filtered
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut filtered = Filtered::default();
    let mut seen = HashSet::new();
    for candidate in candidates {
        let candidate = candidate.as_ref();
        if !candidate.is_empty() && !seen.insert(PathBuf::from(candidate)) {
            debug!("Skipping repeated dataset path {}", candidate);
            continue;
        }
        if accepts(candidate) {
            filtered.accepted.push(PathBuf::from(candidate));
        } else if !candidate.is_empty() {
            filtered.rejected.push(candidate.to_string());
        }
    }
    filtered
}

/// Expands comma separated path lists the way the layer pickers hand them over.
pub fn split_path_lists<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|value| {
            value
                .as_ref()
                .split(',')
                .map(|part| part.trim().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        (value, logs.text())
    }

    #[test]
    fn test_accepts_every_listed_extension() {
        for ext in ACCEPTED_EXTENSIONS {
            let path = format!("/data/layer{}", ext);
            assert!(accepts(&path), "{} should be accepted", path);
        }
    }

    #[test]
    fn test_rejects_dropped_and_unknown_extensions() {
        assert!(!accepts("/data/ortho.sid"));
        assert!(!accepts("/data/legend.gif"));
        assert!(!accepts("/data/notes.txt"));
        assert!(!accepts("/data/no_extension"));
    }

    #[test]
    fn test_extension_match_is_case_sensitive() {
        assert!(!accepts("/data/ROADS.SHP"));
        assert!(!accepts("/data/scan.TIF"));
    }

    #[test]
    fn test_rejects_empty_path() {
        assert!(!accepts(""));
    }

    #[test]
    fn test_partition_keeps_order_and_reports_rejections() {
        let filtered = partition(["b.tif", "", "notes.txt", "a.shp", "legend.gif"]);

        assert_eq!(
            filtered.accepted,
            vec![PathBuf::from("b.tif"), PathBuf::from("a.shp")]
        );
        assert_eq!(filtered.rejected, vec!["notes.txt", "legend.gif"]);
    }

    #[test]
    fn test_partition_drops_repeated_paths() {
        let filtered = partition(["/d/a.shp", "/d/b.tif", "/d/a.shp", "/d/b.tif", "/d/c.kml"]);

        assert_eq!(
            filtered.accepted,
            vec![
                PathBuf::from("/d/a.shp"),
                PathBuf::from("/d/b.tif"),
                PathBuf::from("/d/c.kml")
            ]
        );
        assert!(filtered.rejected.is_empty());
    }

    #[test]
    fn test_one_warning_per_rejected_path() {
        let (filtered, logs) =
            with_captured_logs(|| partition(["a.shp", "notes.txt", "", "legend.gif", "b.tif"]));

        assert_eq!(filtered.rejected.len(), 2);
        assert_eq!(logs.matches("is not an accepted filetype").count(), 2);
        assert_eq!(logs.matches("notes.txt is not an accepted filetype").count(), 1);
        assert_eq!(logs.matches("legend.gif is not an accepted filetype").count(), 1);
        assert_eq!(logs.matches("Ignoring empty dataset path").count(), 1);
        assert!(!logs.contains("a.shp"));
        assert!(!logs.contains("b.tif"));
    }

    #[test]
    fn test_accepted_path_logs_nothing() {
        let (accepted, logs) = with_captured_logs(|| accepts("/d/roads.shp"));
        assert!(accepted);
        assert!(logs.is_empty());
    }

    #[test]
    fn test_split_path_lists() {
        let paths = split_path_lists(["/d/a.shp,/d/b.tif", "", "/d/c.kml"]);
        assert_eq!(paths, vec!["/d/a.shp", "/d/b.tif", "", "/d/c.kml"]);
    }
}
