//! Package manager traits

use async_trait::async_trait;
use npmkit_exec::ProcessResult;

use crate::error::PackageError;
use crate::types::{NpmOptions, PackageManagerType, ToolVersion};

/// Host-facing operations of a package manager
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Install `options.dependencies` (or everything in the manifest when empty)
    async fn install(&self, options: &NpmOptions) -> Result<ProcessResult, PackageError>;

    /// Update installed packages
    async fn update(&self, options: &NpmOptions) -> Result<ProcessResult, PackageError>;

    /// Check that the tool is installed and report its version
    async fn check_tool(&self) -> Result<ToolVersion, PackageError>;

    /// Get the package manager type
    fn manager_type(&self) -> PackageManagerType;
}
