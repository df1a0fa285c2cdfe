use std::{
    ffi::OsString,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Write `data` to a `.part` sibling first and rename it over `path`, so that
/// readers never observe a partially written file.
pub fn write_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let temp_file = part_path(path);

    let mut file = fs::File::create(&temp_file)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_file, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp_file);
    })
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
