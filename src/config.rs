//! Load-time configuration.
//!
//! [`LoadConfig`] decides which stages of the resolution pipeline run after the headers and
//! sections are in place, and caps the size of the image buffer a file may ask for. The
//! header loader, region resolver and section materializer always run; a context is never
//! built from unresolved headers.
//!
//! # Presets
//!
//! - [`LoadConfig::full`] - Every directory resolver runs (the default)
//! - [`LoadConfig::headers_only`] - Headers and sections only, directory views stay `None`
//!
//! # Examples
//!
//! ```rust,no_run
//! use readpe::{Context, LoadConfig};
//!
//! let config = LoadConfig {
//!     resolve_relocations: false,
//!     ..LoadConfig::default()
//! };
//! let context = Context::from_file_with("sample.dll", &config)?;
//! assert!(context.relocations().is_none());
//! # Ok::<(), readpe::Error>(())
//! ```

/// Default cap on the declared `size_of_image`, 1 GiB
pub const DEFAULT_MAX_IMAGE_SIZE: u64 = 1 << 30;

/// Controls which parts of an image are resolved during loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConfig {
    /// Resolve and validate the export directory
    pub resolve_exports: bool,
    /// Resolve and validate the import descriptors and their thunk tables
    pub resolve_imports: bool,
    /// Resolve and validate the base relocation blocks
    pub resolve_relocations: bool,
    /// Largest `size_of_image` accepted; larger images are rejected before allocation
    pub max_image_size: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self::full()
    }
}

impl LoadConfig {
    /// Resolve everything
    #[must_use]
    pub fn full() -> Self {
        Self {
            resolve_exports: true,
            resolve_imports: true,
            resolve_relocations: true,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }

    /// Load headers and sections, skip every directory resolver
    #[must_use]
    pub fn headers_only() -> Self {
        Self {
            resolve_exports: false,
            resolve_imports: false,
            resolve_relocations: false,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }

    /// Same configuration with a different image size cap
    #[must_use]
    pub fn with_max_image_size(mut self, max_image_size: u64) -> Self {
        self.max_image_size = max_image_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_presets() {
        let full = LoadConfig::full();
        assert!(full.resolve_exports);
        assert!(full.resolve_imports);
        assert!(full.resolve_relocations);
        assert_eq!(full.max_image_size, DEFAULT_MAX_IMAGE_SIZE);

        let headers = LoadConfig::headers_only();
        assert!(!headers.resolve_exports);
        assert!(!headers.resolve_imports);
        assert!(!headers.resolve_relocations);

        assert_eq!(LoadConfig::default(), full);
    }

    #[test]
    fn test_config_max_image_size() {
        let config = LoadConfig::headers_only().with_max_image_size(0x1000);
        assert_eq!(config.max_image_size, 0x1000);
        assert!(!config.resolve_exports);
    }
}
