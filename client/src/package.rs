//! Packaging of the Calabash features directory into the test package.

use crate::Result;
use log::*;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the test package, both on disk and on Device Farm.
pub const TEST_PACKAGE_NAME: &str = "features.zip";

/// Directory left behind by local Calabash runs, it must not end up in a run.
pub const STALE_TEST_SERVERS_DIR: &str = "test_servers";

/// Where the test package for `features_dir` is written: next to it.
pub fn package_path(features_dir: &Path) -> PathBuf {
    features_dir
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(TEST_PACKAGE_NAME)
}

/// Remove `<working_dir>/test_servers` if it exists.
pub fn remove_stale_test_servers(working_dir: &Path) -> Result<()> {
    let stale = working_dir.join(STALE_TEST_SERVERS_DIR);
    if stale.is_dir() {
        debug!("Removing {}", stale.display());
        fs::remove_dir_all(&stale)?;
    }
    Ok(())
}

/// Zip `features_dir` into `archive`, replacing any previous archive.
///
/// Entries are prefixed with the name of the features directory itself, so
/// the archive unpacks to `features/...`.
pub fn zip_directory(features_dir: &Path, archive: &Path) -> Result<()> {
    match fs::remove_file(archive) {
        Ok(()) => debug!("Replacing {}", archive.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(1));

    let mut writer = ZipWriter::new(File::create(archive)?);

    // `.` has no usable name or parent, resolve both before walking
    let features_dir = fs::canonicalize(features_dir)?;
    let archive = fs::canonicalize(archive)?;
    let base = features_dir.parent().unwrap_or_else(|| Path::new(""));

    let walk = WalkDir::new(&features_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.path() != archive);
    for entry in walk {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(base)
            .map_err(|e| anyhow::anyhow!("'{}' outside of features: {}", entry.path().display(), e))?;
        let name = zip_entry_name(relative);

        if entry.file_type().is_dir() {
            writer.add_directory(format!("{}/", name), options)?;
        } else {
            trace!("Packaging {}", name);
            writer.start_file(name, options)?;
            io::copy(&mut File::open(entry.path())?, &mut writer)?;
        }
    }
    writer.finish()?;

    Ok(())
}

/// Zip entries always use `/` as separator.
fn zip_entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn features(root: &Path) -> PathBuf {
        let features = root.join("features");
        fs::create_dir_all(features.join("step_definitions")).unwrap();
        fs::write(features.join("login.feature"), "Feature: Login").unwrap();
        fs::write(
            features.join("step_definitions").join("steps.rb"),
            "Given(/^I log in$/) do\nend\n",
        )
        .unwrap();
        features
    }

    #[test]
    fn archive_lands_next_to_features() {
        assert_eq!(
            package_path(Path::new("/work/app/features")),
            PathBuf::from("/work/app/features.zip")
        );
    }

    #[test]
    fn entries_are_prefixed_with_directory_name() {
        let dir = TempDir::new().unwrap();
        let features = features(dir.path());
        let archive = package_path(&features);

        zip_directory(&features, &archive).unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "features/",
                "features/login.feature",
                "features/step_definitions/",
                "features/step_definitions/steps.rb",
            ]
        );

        let mut content = String::new();
        zip.by_name("features/login.feature")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "Feature: Login");
    }

    #[test]
    fn previous_archive_is_replaced() {
        let dir = TempDir::new().unwrap();
        let features = features(dir.path());
        let archive = package_path(&features);
        fs::write(&archive, "not a zip at all").unwrap();

        zip_directory(&features, &archive).unwrap();

        let zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 4);
    }

    #[test]
    fn stale_test_servers_are_removed() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join(STALE_TEST_SERVERS_DIR);
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("server.apk"), "x").unwrap();

        remove_stale_test_servers(dir.path()).unwrap();
        assert!(!stale.exists());

        // Nothing to remove is fine too
        remove_stale_test_servers(dir.path()).unwrap();
    }

    #[test]
    fn archive_inside_the_features_directory_is_skipped() {
        let dir = TempDir::new().unwrap();
        let features = features(dir.path());
        let archive = features.join(TEST_PACKAGE_NAME);

        zip_directory(&features, &archive).unwrap();

        let zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let names: Vec<&str> = zip.file_names().collect();
        assert_eq!(names.len(), 4);
        assert!(!names.iter().any(|name| name.ends_with(TEST_PACKAGE_NAME)));
    }

    #[test]
    fn relative_features_directory_keeps_its_name() {
        let dir = TempDir::new().unwrap();
        let features = features(dir.path());
        let relative = features.join("step_definitions").join("..");

        zip_directory(&relative, &dir.path().join(TEST_PACKAGE_NAME)).unwrap();

        let zip = zip::ZipArchive::new(File::open(dir.path().join(TEST_PACKAGE_NAME)).unwrap())
            .unwrap();
        assert!(zip.file_names().any(|name| name == "features/login.feature"));
    }
}
