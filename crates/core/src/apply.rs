use crate::error::{FileFailure, PlacementError};
use crate::planner::{CollisionPolicy, Placement, PlacementAction, PlacementPlan};
use filetime::FileTime;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const COPY_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Serialize, Default)]
pub struct ApplyResult {
    pub placed: usize,
    pub failures: Vec<FileFailure>,
}

/// Emitted around each placement so callers can print audit lines as the batch runs.
#[derive(Debug)]
pub enum ApplyEvent<'a> {
    Started(&'a Placement),
    Failed(&'a Placement, &'a PlacementError),
}

pub fn apply_plan(plan: &PlacementPlan) -> ApplyResult {
    apply_plan_with(plan, |_| {})
}

/// Runs every placement in order. A failing file is reported and skipped; the
/// rest of the batch still runs and nothing already placed is rolled back.
pub fn apply_plan_with<F>(plan: &PlacementPlan, mut on_event: F) -> ApplyResult
where
    F: FnMut(ApplyEvent<'_>),
{
    let overwrite = plan.collision == CollisionPolicy::Overwrite;
    let mut result = ApplyResult::default();

    for placement in &plan.placements {
        on_event(ApplyEvent::Started(placement));
        match execute(placement, overwrite) {
            Ok(()) => result.placed += 1,
            Err(err) => {
                debug!(error = %err, "placement failed");
                on_event(ApplyEvent::Failed(placement, &err));
                result.failures.push(FileFailure::from(&err));
            }
        }
    }

    result
}

fn execute(placement: &Placement, overwrite: bool) -> Result<(), PlacementError> {
    if !placement.action.touches_filesystem() {
        return Ok(());
    }

    let source = &placement.source;
    let destination = &placement.destination;
    let parent = destination_parent(destination);
    create_parent_dir(parent, directory_mode(placement.permissions))
        .map_err(|err| PlacementError::filesystem(source, "mkdir", err))?;

    if overwrite && placement.action != PlacementAction::Move {
        match fs::remove_file(destination) {
            Ok(()) => debug!(path = %destination.display(), "removed existing destination"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(PlacementError::filesystem(source, "remove", err)),
        }
    }

    match placement.action {
        PlacementAction::Copy => copy_file(placement),
        PlacementAction::Move => fs::rename(source, destination)
            .map_err(|err| PlacementError::filesystem(source, "rename", err)),
        PlacementAction::Symlink => {
            let link_target = relative_link_target(source, parent)
                .map_err(|err| PlacementError::filesystem(source, "symlink", err))?;
            create_symlink(&link_target, destination)
                .map_err(|err| PlacementError::filesystem(source, "symlink", err))
        }
        PlacementAction::Hardlink => fs::hard_link(source, destination)
            .map_err(|err| PlacementError::filesystem(source, "hardlink", err)),
        PlacementAction::ReportOnly => Ok(()),
    }
}

fn destination_parent(destination: &Path) -> &Path {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Adds `x` wherever `r` is set: `r--r--r--` becomes `r-xr-xr-x`.
pub fn directory_mode(file_mode: u32) -> u32 {
    let mode = file_mode & 0o777;
    mode | ((mode & 0o444) >> 2)
}

#[cfg(unix)]
fn create_parent_dir(dir: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(mode).create(dir)
}

#[cfg(not(unix))]
fn create_parent_dir(dir: &Path, _mode: u32) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn create_exclusive(path: &Path, mode: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
fn create_exclusive(path: &Path, _mode: u32) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn copy_file(placement: &Placement) -> Result<(), PlacementError> {
    let source = &placement.source;
    let destination = &placement.destination;

    let mut input = File::open(source).map_err(|err| PlacementError::filesystem(source, "open", err))?;
    let mut output = create_exclusive(destination, placement.permissions)
        .map_err(|err| PlacementError::filesystem(source, "create", err))?;

    let mut buf = [0u8; COPY_CHUNK_SIZE];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(PlacementError::filesystem(source, "read", err)),
        };
        output
            .write_all(&buf[..n])
            .map_err(|err| PlacementError::filesystem(source, "write", err))?;
    }
    drop(output);

    filetime::set_file_times(
        destination,
        FileTime::now(),
        FileTime::from_system_time(placement.timestamp.system_time()),
    )
    .map_err(|err| PlacementError::filesystem(source, "set times", err))
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Path to `source` as seen from `link_dir`, which must already exist.
fn relative_link_target(source: &Path, link_dir: &Path) -> io::Result<PathBuf> {
    let source_dir = match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = source
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"))?;

    let from = fs::canonicalize(link_dir)?;
    let to = fs::canonicalize(source_dir)?.join(file_name);
    Ok(relative_path(&from, &to))
}

pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let to_components: Vec<Component<'_>> = to.components().collect();

    let common = from
        .iter()
        .zip(to_components.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return to.to_path_buf();
    }

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to_components[common..] {
        out.push(component.as_os_str());
    }
    out
}
