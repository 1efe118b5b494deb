use crate::error::PlacementError;
use crate::scan::FileEntry;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
enum DirectoryPool {
    Listed {
        /// Unclaimed filenames, in listing order.
        remaining: Vec<OsString>,
        claimed: HashSet<OsString>,
    },
    /// Listing failed; anchors in this directory fall back to singletons.
    Unlisted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// Primary name first, then siblings in listing order.
    Group(Vec<OsString>),
    /// The anchor itself was already taken by an earlier group.
    AlreadyClaimed,
}

/// Per-directory pools of filenames not yet assigned to a group. Each directory
/// is listed once, the first time an anchor inside it is claimed.
#[derive(Debug, Default)]
pub struct RelatedIndex {
    pools: HashMap<PathBuf, DirectoryPool>,
    failures: Vec<PlacementError>,
}

impl RelatedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `entry` and, when `with_siblings` is set, every remaining file in
    /// its directory whose name starts with the entry's stem. Names are compared
    /// as raw bytes, so names that are not valid UTF-8 group like any other.
    pub fn claim(&mut self, entry: &FileEntry, with_siblings: bool) -> Result<Claim, PlacementError> {
        let name = entry.file_name().to_os_string();
        let pool = self.pool_for(entry.directory());

        let DirectoryPool::Listed { remaining, claimed } = pool else {
            return Ok(Claim::Group(vec![name]));
        };

        let Some(position) = remaining.iter().position(|candidate| *candidate == name) else {
            if claimed.contains(&name) {
                debug!(path = %entry.path.display(), "already grouped with an earlier file");
                return Ok(Claim::AlreadyClaimed);
            }
            warn!(path = %entry.path.display(), "anchor missing from directory pool");
            return Err(PlacementError::GroupingInvariant {
                path: entry.path.clone(),
            });
        };

        remaining.remove(position);
        claimed.insert(name.clone());
        let mut names = vec![name];

        if with_siblings {
            let stem = entry.stem().as_encoded_bytes();
            remaining.retain(|candidate| {
                if candidate.as_encoded_bytes().starts_with(stem) {
                    names.push(candidate.clone());
                    false
                } else {
                    true
                }
            });
            claimed.extend(names.iter().skip(1).cloned());
        }

        Ok(Claim::Group(names))
    }

    /// Listing failures collected since the last call.
    pub fn take_failures(&mut self) -> Vec<PlacementError> {
        std::mem::take(&mut self.failures)
    }

    fn pool_for(&mut self, dir: &Path) -> &mut DirectoryPool {
        let failures = &mut self.failures;
        self.pools
            .entry(dir.to_path_buf())
            .or_insert_with(|| match list_directory(dir) {
                Ok(remaining) => DirectoryPool::Listed {
                    remaining,
                    claimed: HashSet::new(),
                },
                Err(err) => {
                    failures.push(err);
                    DirectoryPool::Unlisted
                }
            })
    }
}

fn list_directory(dir: &Path) -> Result<Vec<OsString>, PlacementError> {
    let entries = fs::read_dir(dir).map_err(|err| PlacementError::Discovery {
        path: dir.to_path_buf(),
        source: err,
    })?;

    let mut names: Vec<OsString> = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name())
        .collect();
    names.sort();
    Ok(names)
}
