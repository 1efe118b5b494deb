use crate::error::{FileFailure, PlacementError};
use crate::matcher::{Claim, RelatedIndex};
use crate::scan::{
    file_stem, lowercase_extension, scan_inputs, FileClassifier, FileEntry, FileKind, FileStat,
    ScanStats,
};
use crate::timestamp::{resolve_timestamp, ResolvedTimestamp};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_PERMISSIONS: u32 = 0o644;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementAction {
    Copy,
    Move,
    Symlink,
    Hardlink,
    #[default]
    ReportOnly,
}

impl PlacementAction {
    /// Copy wins over move, symlink over hardlink, and the file actions over the link actions.
    pub fn from_flags(copy: bool, mv: bool, symlink: bool, hardlink: bool) -> Option<Self> {
        if copy {
            Some(Self::Copy)
        } else if mv {
            Some(Self::Move)
        } else if symlink {
            Some(Self::Symlink)
        } else if hardlink {
            Some(Self::Hardlink)
        } else {
            None
        }
    }

    pub fn touches_filesystem(self) -> bool {
        self != Self::ReportOnly
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    Overwrite,
    Suffix,
    #[default]
    Refuse,
}

impl CollisionPolicy {
    pub fn from_flags(overwrite: bool, suffixes: bool) -> Self {
        if overwrite {
            Self::Overwrite
        } else if suffixes {
            Self::Suffix
        } else {
            Self::Refuse
        }
    }
}

/// How siblings of a group are named at the destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RelatedNaming {
    /// Every member takes the primary's timestamp name.
    #[default]
    Timestamp,
    /// Only the primary is renamed; siblings keep their stem.
    KeepOriginal,
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub inputs: Vec<PathBuf>,
    pub target: PathBuf,
    pub recursive: bool,
    pub include_hidden: bool,
    pub related: bool,
    pub videos: bool,
    pub use_modtime: bool,
    pub related_naming: RelatedNaming,
    pub collision: CollisionPolicy,
    pub action: PlacementAction,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            target: PathBuf::from("."),
            recursive: false,
            include_hidden: false,
            related: false,
            videos: false,
            use_modtime: false,
            related_naming: RelatedNaming::Timestamp,
            collision: CollisionPolicy::Refuse,
            action: PlacementAction::ReportOnly,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Placement {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub action: PlacementAction,
    pub permissions: u32,
    pub timestamp: ResolvedTimestamp,
    /// Index of the group this file travels with.
    pub group: usize,
}

impl Placement {
    pub fn audit_line(&self) -> String {
        let src = self.source.display();
        let dst = self.destination.display();
        match self.action {
            PlacementAction::Copy => format!("cp \"{src}\" \"{dst}\""),
            PlacementAction::Move => format!("mv \"{src}\" \"{dst}\""),
            PlacementAction::Symlink => format!("symlink \"{src}\" \"{dst}\""),
            PlacementAction::Hardlink => format!("hardlink \"{src}\" \"{dst}\""),
            PlacementAction::ReportOnly => format!("\"{src}\"\t\"{dst}\""),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct PlanStats {
    pub scan: ScanStats,
    pub groups: usize,
    pub already_grouped: usize,
    /// Files whose destination is the file itself.
    pub in_place: usize,
    pub planned: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementPlan {
    pub target: PathBuf,
    pub collision: CollisionPolicy,
    pub placements: Vec<Placement>,
    pub failures: Vec<FileFailure>,
    pub stats: PlanStats,
}

pub fn generate_plan(options: &PlanOptions) -> Result<PlacementPlan> {
    let classifier = FileClassifier::new().context("could not build file classifier")?;
    let scan = scan_inputs(
        &options.inputs,
        options.recursive,
        options.include_hidden,
        &classifier,
    );

    let mut planner = Planner {
        options,
        index: RelatedIndex::new(),
        planned_paths: HashSet::new(),
        placements: Vec::new(),
        failures: scan.failures.iter().map(FileFailure::from).collect(),
        stats: PlanStats {
            scan: scan.stats,
            ..PlanStats::default()
        },
    };

    for entry in &scan.entries {
        let anchor = match entry.kind {
            FileKind::Image => true,
            FileKind::Video => options.videos,
            FileKind::Other => false,
        };
        if anchor {
            planner.plan_group(entry);
        }
    }

    Ok(PlacementPlan {
        target: options.target.clone(),
        collision: options.collision,
        placements: planner.placements,
        failures: planner.failures,
        stats: planner.stats,
    })
}

struct Planner<'a> {
    options: &'a PlanOptions,
    index: RelatedIndex,
    planned_paths: HashSet<PathBuf>,
    placements: Vec<Placement>,
    failures: Vec<FileFailure>,
    stats: PlanStats,
}

impl Planner<'_> {
    fn fail(&mut self, err: PlacementError) {
        debug!(error = %err, "file skipped while planning");
        self.failures.push(FileFailure::from(&err));
        self.stats.skipped += 1;
    }

    fn plan_group(&mut self, entry: &FileEntry) {
        let names = if self.options.related {
            let claim = self.index.claim(entry, entry.is_image());
            for err in self.index.take_failures() {
                self.failures.push(FileFailure::from(&err));
            }
            match claim {
                Ok(Claim::Group(names)) => names,
                Ok(Claim::AlreadyClaimed) => {
                    self.stats.already_grouped += 1;
                    return;
                }
                Err(err) => return self.fail(err),
            }
        } else {
            vec![entry.file_name().to_os_string()]
        };

        let timestamp = match resolve_timestamp(entry, self.options.use_modtime) {
            Ok(timestamp) => timestamp,
            Err(err) => return self.fail(err),
        };

        let group = self.stats.groups;
        self.stats.groups += 1;
        let base = timestamp.base_name();
        let dest_dir = self.options.target.join(&entry.rel_dir);

        for (position, name) in names.iter().enumerate() {
            let is_primary = position == 0;
            let source = if is_primary {
                entry.path.clone()
            } else {
                entry.directory().join(name)
            };

            let name = name.to_string_lossy();
            let member_base = match self.options.related_naming {
                RelatedNaming::KeepOriginal if !is_primary => file_stem(&name).to_string(),
                _ => base.clone(),
            };
            let extension = lowercase_extension(&name);

            let candidate = dest_dir.join(format!("{member_base}{extension}"));
            if is_same_file(&source, &candidate) {
                debug!(path = %source.display(), "already at its destination");
                self.planned_paths.insert(candidate);
                self.stats.in_place += 1;
                continue;
            }

            let permissions = if !self.options.action.touches_filesystem() {
                DEFAULT_PERMISSIONS
            } else if is_primary {
                entry.stat.mode
            } else {
                match FileStat::read(&source) {
                    Ok(stat) => stat.mode,
                    Err(err) => {
                        self.fail(err);
                        continue;
                    }
                }
            };

            let destination = match resolve_destination(
                &dest_dir,
                &member_base,
                &extension,
                self.options.collision,
                &mut self.planned_paths,
            ) {
                Some(destination) => destination,
                None => {
                    self.fail(PlacementError::DestinationConflict {
                        source_path: source,
                        destination: candidate,
                    });
                    continue;
                }
            };

            debug!(source = %source.display(), destination = %destination.display(), "planned");
            self.stats.planned += 1;
            self.placements.push(Placement {
                source,
                destination,
                action: self.options.action,
                permissions,
                timestamp,
                group,
            });
        }
    }
}

/// Picks the destination for `base` + `extension` under `dir`, or `None` when
/// it is taken and the policy refuses. Taken means present on disk or already
/// handed out earlier in this run.
pub fn resolve_destination(
    dir: &Path,
    base: &str,
    extension: &str,
    policy: CollisionPolicy,
    planned_paths: &mut HashSet<PathBuf>,
) -> Option<PathBuf> {
    let candidate = dir.join(format!("{base}{extension}"));
    let chosen = match policy {
        CollisionPolicy::Overwrite => candidate,
        _ if is_available(&candidate, planned_paths) => candidate,
        CollisionPolicy::Refuse => return None,
        CollisionPolicy::Suffix => (1usize..)
            .map(|n| dir.join(format!("{base}_{n}{extension}")))
            .find(|next| is_available(next, planned_paths))?,
    };
    planned_paths.insert(chosen.clone());
    Some(chosen)
}

fn is_available(candidate: &Path, planned_paths: &HashSet<PathBuf>) -> bool {
    !planned_paths.contains(candidate) && fs::symlink_metadata(candidate).is_err()
}

/// True when `destination` names the directory entry `source` already is, or
/// another link to the same inode. A symlink at `destination` is not followed.
fn is_same_file(source: &Path, destination: &Path) -> bool {
    match (canonical_entry(source), canonical_entry(destination)) {
        (Some(a), Some(b)) if a == b => return true,
        _ => {}
    }
    same_inode(source, destination)
}

/// Canonical parent directory joined with the unresolved file name.
fn canonical_entry(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::canonicalize(parent).ok().map(|dir| dir.join(name))
}

#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::symlink_metadata(a), fs::symlink_metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_inode(_a: &Path, _b: &Path) -> bool {
    false
}
