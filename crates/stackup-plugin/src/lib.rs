//! Plugin acquisition for stackup
//!
//! Makes sure every plugin a program declares is present in the local
//! plugin cache before the program runs:
//! - **VersionMatcher**: decides whether an installed plugin satisfies a requirement
//! - **RetryingDownloader**: fetches plugin archives with bounded retry
//! - **PluginInstaller**: extracts archives into the cache
//! - **InstallOrchestrator**: runs the dependency install and each plugin install in order
//! - **Context resolution**: chooses between a project and a policy pack
//!
//! ## Cache layout
//!
//! ```text
//! <cache root>/
//! ├── resource-aws-v6.1.0/     pinned install
//! ├── language-python/         unpinned install
//! └── .tmp-xxxx/               extraction in progress
//! ```

pub mod archive;
pub mod cache;
pub mod context;
pub mod download;
pub mod error;
pub mod installer;
pub mod matcher;
pub mod observer;
pub mod orchestrator;
pub mod requirement;
pub mod runtime;

pub use cache::{CacheEntry, DirPluginCache, PluginCache};
pub use context::{resolve_install_target, should_use_policy_pack_deps, FsMarkerLocator, MarkerLocator, WorkingContext};
pub use download::{DownloadError, DownloadedArtifact, HttpTransport, RetryPolicy, RetryingDownloader, Transport};
pub use error::{InstallError, InstallStage, Result};
pub use installer::{Placement, PluginInstaller};
pub use matcher::{Satisfaction, VersionMatcher};
pub use observer::{InstallEvent, InstallObserver, ProgressObserver, RecordingObserver, RetryObserver, Silent};
pub use orchestrator::{install_dependencies, InstallOptions, InstallOrchestrator, InstallOutcome, InstallReport};
pub use requirement::{Platform, PluginKind, PluginLabel, PluginRequirement};
pub use runtime::{LanguageRuntime, ProgramInfo};
