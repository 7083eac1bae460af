use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use tempfile::{Builder, TempPath};
use tracing::info;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::error::PublishError;

/// A zipped dataset waiting to be uploaded. The file is removed on drop.
#[derive(Debug)]
pub struct Archive {
    path: TempPath,
    entries: Vec<String>,
}

impl Archive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flattened names of the files inside the archive, sorted.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Files next to `primary` that share its stem, e.g. `roads.shp` and `roads.dbf`.
pub fn sidecar_files(primary: &Path) -> io::Result<Vec<PathBuf>> {
    let Some(stem) = primary.file_stem() else {
        return Ok(Vec::new());
    };
    let dir = match primary.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.file_stem() == Some(stem) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn package(primary: &Path) -> Result<Archive, PublishError> {
    let files = sidecar_files(primary).map_err(|e| PublishError::packaging(primary, e))?;
    if files.is_empty() {
        return Err(PublishError::packaging(primary, "no dataset files found"));
    }

    let tmp_file = Builder::new()
        .prefix("gcup-")
        .suffix(".zip")
        .tempfile()
        .map_err(|e| PublishError::packaging(primary, e))?;

    let mut entries = Vec::with_capacity(files.len());
    {
        let mut zip = ZipWriter::new(tmp_file.as_file());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for file in &files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let name = name.to_string_lossy().into_owned();
            info!("{}", file.display());

            zip.start_file(name.as_str(), options)
                .map_err(|e| PublishError::packaging(primary, e))?;
            let mut source = File::open(file).map_err(|e| PublishError::packaging(primary, e))?;
            io::copy(&mut source, &mut zip).map_err(|e| PublishError::packaging(primary, e))?;
            entries.push(name);
        }

        zip.finish()
            .map_err(|e| PublishError::packaging(primary, e))?;
    }

    tmp_file
        .as_file()
        .sync_all()
        .map_err(|e| PublishError::packaging(primary, e))?;

    let path = tmp_file.into_temp_path();
    info!("{}", path.display());

    Ok(Archive { path, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_package_collects_shapefile_sidecars() {
        let dir = tempdir().unwrap();
        let shp = write(dir.path(), "x.shp", b"shape");
        write(dir.path(), "x.dbf", b"attributes");
        write(dir.path(), "x.shx", b"index");
        write(dir.path(), "x.prj", b"GEOGCS[\"WGS 84\"]");
        write(dir.path(), "x_old.dbf", b"stale");
        write(dir.path(), "y.shp", b"other");

        let archive = package(&shp).unwrap();

        assert_eq!(archive.entries(), ["x.dbf", "x.prj", "x.shp", "x.shx"]);

        let mut zip = ZipArchive::new(File::open(archive.path()).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["x.dbf", "x.prj", "x.shp", "x.shx"]);
        assert!(names.iter().all(|n| !n.contains('/')));

        let mut contents = Vec::new();
        zip.by_name("x.prj")
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"GEOGCS[\"WGS 84\"]");
    }

    #[test]
    fn test_unpacked_files_match_originals() {
        let dir = tempdir().unwrap();
        let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        let tif = write(dir.path(), "scan.tif", &payload);
        write(dir.path(), "scan.tfw", b"0.5\n0\n0\n-0.5\n144.9\n-37.8\n");

        let archive = package(&tif).unwrap();
        let mut zip = ZipArchive::new(File::open(archive.path()).unwrap()).unwrap();

        for name in ["scan.tif", "scan.tfw"] {
            let mut unpacked = Vec::new();
            zip.by_name(name).unwrap().read_to_end(&mut unpacked).unwrap();
            assert_eq!(unpacked, fs::read(dir.path().join(name)).unwrap());
        }
    }

    #[test]
    fn test_package_missing_dataset_fails() {
        let dir = tempdir().unwrap();
        let err = package(&dir.path().join("ghost.shp")).unwrap_err();
        assert!(matches!(err, PublishError::Packaging { .. }));
    }

    #[test]
    fn test_package_missing_directory_fails() {
        let err = package(Path::new("/definitely/not/here/roads.shp")).unwrap_err();
        assert!(matches!(err, PublishError::Packaging { .. }));
    }

    #[test]
    fn test_archive_removed_on_drop() {
        let dir = tempdir().unwrap();
        let kml = write(dir.path(), "route.kml", b"<kml/>");

        let archive = package(&kml).unwrap();
        let zip_path = archive.path().to_path_buf();
        assert!(zip_path.exists());

        drop(archive);
        assert!(!zip_path.exists());
    }
}
