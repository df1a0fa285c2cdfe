use anyhow::Result;
use log::info;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

pub(super) fn format_bytes(bytesval: usize, precision: usize) -> String {
    let mut val = bytesval as f32;

    for unit in ["bytes", "KiB", "MiB", "GiB", "TiB"] {
        if val < 1024.0 {
            return format!("{:.precision$} {}", val, unit, precision = precision);
        }

        val /= 1024.0;
    }

    format!("{} bytes", bytesval)
}

/// Locate `name` in the working directory or on `PATH`.
pub(super) fn find_program(name: &str) -> Option<PathBuf> {
    let bin = if cfg!(target_os = "windows") {
        format!("{}.exe", name)
    } else {
        name.to_owned()
    };

    if Path::new(&bin).exists() {
        return Some(PathBuf::from(bin));
    }

    env::split_paths(&env::var_os("PATH")?)
        .map(|x| x.join(&bin))
        .find(|x| x.exists())
}

/// Explicit output directory, otherwise the directory of `input`.
pub(super) fn output_dir(output: Option<&Path>, input: &Path) -> PathBuf {
    match output {
        Some(x) => x.to_owned(),
        None => match input.parent() {
            Some(x) if !x.as_os_str().is_empty() => x.to_owned(),
            _ => PathBuf::from("./"),
        },
    }
}

/// File name of `path` without its extension.
pub(super) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|x| x.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned())
}

/// Delete intermediate files, missing ones are skipped.
pub(super) fn delete_temp_files(temp_files: &[PathBuf]) -> Result<()> {
    for temp_file in temp_files {
        match fs::remove_file(temp_file) {
            Ok(()) => info!("Deleting {}", temp_file.to_string_lossy()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512, 2), "512.00 bytes");
        assert_eq!(format_bytes(3 * 1024 * 1024, 1), "3.0 MiB");
    }

    #[test]
    fn test_output_dir() {
        assert_eq!(
            output_dir(None, Path::new("clip.mp4")),
            PathBuf::from("./")
        );
        assert_eq!(
            output_dir(None, Path::new("media/clip.mp4")),
            PathBuf::from("media")
        );
        assert_eq!(
            output_dir(Some(Path::new("out")), Path::new("media/clip.mp4")),
            PathBuf::from("out")
        );
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("media/clip.final.mp4")), "clip.final");
    }
}
