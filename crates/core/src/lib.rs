mod apply;
mod config;
mod error;
mod exif_reader;
mod matcher;
mod planner;
mod scan;
#[cfg(test)]
mod test_support;
mod timestamp;

pub use apply::{apply_plan, apply_plan_with, directory_mode, ApplyEvent, ApplyResult};
pub use config::{app_paths, load_config, load_config_from, AppConfig, AppPaths};
pub use error::{FailureKind, FileFailure, PlacementError, UnavailableReason};
pub use exif_reader::{extract_original_timestamp, read_original_timestamp, OriginalTimestamp};
pub use matcher::{Claim, RelatedIndex};
pub use planner::{
    generate_plan, resolve_destination, CollisionPolicy, Placement, PlacementAction,
    PlacementPlan, PlanOptions, PlanStats, RelatedNaming,
};
pub use scan::{scan_inputs, FileClassifier, FileEntry, FileKind, FileStat, ScanResult, ScanStats};
pub use timestamp::{resolve_timestamp, ResolvedTimestamp, TimestampSource};
