//! Gathers scans from image files, folders and `.zip` / `.7z` archives.

use crate::domain::model::{Batch, SkippedInput, SourceImage};
use crate::utils::error::{Result, RfiError};
use chrono::Utc;
use sevenz_rust::{Password, SevenZReader};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "gif"];
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "7z", "rar"];

const DEFAULT_BASE_NAME: &str = "rfi";

// 壓縮檔標頭宣告的大小只當作預先配置的提示
const MAX_ENTRY_PREALLOC: u64 = 64 << 20;

type ArchiveContents = (Vec<SourceImage>, Vec<SkippedInput>);

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_image_path(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn is_archive_path(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| ARCHIVE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// All extensions accepted as explicit file inputs.
pub fn accepted_extensions() -> Vec<&'static str> {
    IMAGE_EXTENSIONS
        .iter()
        .chain(ARCHIVE_EXTENSIONS.iter())
        .copied()
        .collect()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn folder_name(path: &Path) -> Option<String> {
    path.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
}

/// Explicit name, else the first archive's stem, else the first folder's
/// name, else `rfi`.
pub fn resolve_base_name(paths: &[PathBuf], base_name: Option<&str>) -> String {
    let existing = || paths.iter().filter(|p| p.exists());

    base_name
        .map(str::to_string)
        .or_else(|| {
            existing()
                .find(|p| p.is_file() && is_archive_path(p))
                .map(|p| file_stem(p))
        })
        .or_else(|| existing().filter(|p| p.is_dir()).find_map(|p| folder_name(p)))
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_NAME.to_string())
}

/// Entry name inside an archive, or `None` when it would escape the archive root.
fn enclosed_entry_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        .then(|| path.to_path_buf())
}

/// Image entries that are not macOS resource forks.
fn is_scan_entry(name: &Path) -> bool {
    // macOS 壓縮時附帶的資源分支檔
    let resource_fork = name
        .components()
        .any(|c| matches!(c, Component::Normal(part) if part == "__MACOSX"));
    !resource_fork && is_image_path(name)
}

fn archive_error(path: &Path, message: impl ToString) -> RfiError {
    RfiError::ArchiveError {
        archive: path.display().to_string(),
        message: message.to_string(),
    }
}

#[derive(Default)]
struct Intake {
    images: Vec<SourceImage>,
    skipped: Vec<SkippedInput>,
}

impl Intake {
    fn skip(&mut self, source: impl Into<String>, reason: impl Into<String>) {
        let skipped = SkippedInput::new(source, reason);
        tracing::warn!("⏭️ Skipping {}: {}", skipped.source, skipped.reason);
        self.skipped.push(skipped);
    }

    fn read_image_file(&mut self, path: &Path) {
        match fs::read(path) {
            Ok(bytes) => self.images.push(SourceImage {
                stem: file_stem(path),
                file_name: file_name(path),
                origin: path.display().to_string(),
                bytes,
            }),
            Err(e) => self.skip(path.display().to_string(), format!("unreadable file: {}", e)),
        }
    }

    /// Sorted walk that does not follow symlinked folders.
    fn walk_folder(&mut self, folder: &Path, excluded: &[PathBuf]) -> Result<()> {
        let mut entries: Vec<(PathBuf, fs::FileType)> = fs::read_dir(folder)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_type().ok().map(|ft| (entry.path(), ft)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (path, file_type) in entries {
            if file_type.is_dir() {
                if is_excluded(&path, excluded) {
                    tracing::debug!("Not descending into output folder {}", path.display());
                    continue;
                }
                self.walk_folder(&path, excluded)?;
            } else if file_type.is_symlink() && path.is_dir() {
                tracing::debug!("Not following symlinked folder {}", path.display());
            } else if is_image_path(&path) {
                self.read_image_file(&path);
            }
        }

        Ok(())
    }

    fn read_archive(&mut self, path: &Path, read: fn(&Path) -> Result<ArchiveContents>) {
        match read(path) {
            Ok((images, skipped)) => {
                tracing::info!("📦 {} image(s) found in {}", images.len(), path.display());
                self.images.extend(images);
                for entry in skipped {
                    self.skip(entry.source, entry.reason);
                }
            }
            Err(e) => self.skip(path.display().to_string(), format!("cannot open archive: {}", e)),
        }
    }
}

fn is_excluded(path: &Path, excluded: &[PathBuf]) -> bool {
    excluded.iter().any(|exclude| {
        if path == exclude {
            return true;
        }
        match (path.canonicalize(), exclude.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    })
}

/// Reads every image entry of a zip archive into memory. Entries whose names
/// would escape the archive root are reported as skipped.
pub fn read_zip_images(path: &Path) -> Result<ArchiveContents> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut images = Vec::new();
    let mut skipped = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let raw_name = entry.name().to_string();
        let origin = format!("{}!{}", path.display(), raw_name);

        let Some(name) = entry.enclosed_name() else {
            skipped.push(SkippedInput::new(origin, "unsafe entry name"));
            continue;
        };

        if !is_scan_entry(&name) {
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size().min(MAX_ENTRY_PREALLOC) as usize);
        if let Err(e) = entry.read_to_end(&mut bytes) {
            skipped.push(SkippedInput::new(origin, format!("cannot read entry: {}", e)));
            continue;
        }

        images.push(SourceImage {
            stem: file_stem(&name),
            file_name: file_name(&name),
            origin,
            bytes,
        });
    }

    Ok((images, skipped))
}

/// Reads every image entry of a 7z archive into memory, with the same
/// filtering as [`read_zip_images`].
pub fn read_7z_images(path: &Path) -> Result<ArchiveContents> {
    let mut reader =
        SevenZReader::open(path, Password::empty()).map_err(|e| archive_error(path, e))?;
    let mut images = Vec::new();
    let mut skipped = Vec::new();

    reader
        .for_each_entries(|entry, data| {
            if entry.is_directory() {
                return Ok(true);
            }

            let origin = format!("{}!{}", path.display(), entry.name());
            // 固實壓縮區塊需依序讀完每個項目
            let mut bytes = Vec::new();
            if let Err(e) = data.read_to_end(&mut bytes) {
                skipped.push(SkippedInput::new(origin, format!("cannot read entry: {}", e)));
                return Ok(true);
            }

            let Some(name) = enclosed_entry_path(entry.name()) else {
                skipped.push(SkippedInput::new(origin, "unsafe entry name"));
                return Ok(true);
            };

            if is_scan_entry(&name) {
                images.push(SourceImage {
                    stem: file_stem(&name),
                    file_name: file_name(&name),
                    origin,
                    bytes,
                });
            }
            Ok(true)
        })
        .map_err(|e| archive_error(path, e))?;

    Ok((images, skipped))
}

/// Collects every scan reachable from `paths`.
///
/// When `output_root` is given, neither it nor its `<base>_output` folder is
/// read back as input if they live inside an input folder.
pub fn collect_inputs(
    paths: &[PathBuf],
    output_root: Option<&Path>,
    base_name: Option<&str>,
) -> Result<Batch> {
    let started_at = Utc::now();
    let base_name = resolve_base_name(paths, base_name);
    let excluded: Vec<PathBuf> = output_root
        .map(|root| vec![root.to_path_buf(), root.join(format!("{}_output", base_name))])
        .unwrap_or_default();
    let mut intake = Intake::default();

    for path in paths {
        if !path.exists() {
            intake.skip(path.display().to_string(), "path does not exist");
            continue;
        }

        if path.is_dir() {
            intake.walk_folder(path, &excluded)?;
            continue;
        }

        match extension_of(path).as_deref() {
            Some("zip") => intake.read_archive(path, read_zip_images),
            Some("7z") => intake.read_archive(path, read_7z_images),
            Some("rar") => intake.skip(path.display().to_string(), "archive format not supported"),
            Some(_) if is_image_path(path) => intake.read_image_file(path),
            _ => tracing::debug!("Ignoring unsupported input {}", path.display()),
        }
    }

    if intake.images.is_empty() {
        return Err(RfiError::NoImagesFound);
    }

    tracing::info!(
        "📥 Collected {} image(s) for batch '{}' ({} skipped)",
        intake.images.len(),
        base_name,
        intake.skipped.len()
    );

    Ok(Batch {
        base_name,
        images: intake.images,
        skipped: intake.skipped,
        started_at,
    })
}
