//! Build mode for production/development builds.

/// Which kind of session drives the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// One-shot build: every file rebuilt exactly once, minified output.
    Production,
    /// Watch session: compiled templates cached, unchanged files skipped.
    Development,
}

impl BuildMode {
    #[inline]
    pub const fn is_dev(self) -> bool {
        matches!(self, Self::Development)
    }

    #[inline]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}
