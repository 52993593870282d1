//! Parse-time locale/content filtering, applied while building the root
//! file's lookup tables rather than deferred to every query.

use super::flags::{ContentFlags, LocaleFlags};

/// Controls how aggressively [`super::file::RootFile::parse`] filters blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Skip blocks that name neither the requested locale nor any locale
    /// this reader recognizes, and blocks flagged low-violence.
    #[default]
    Normal,
    /// Keep every block regardless of locale/content flags.
    Full,
}

/// Load-time settings threaded through [`super::file::RootFile::parse`].
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Locale to keep under [`LoadMode::Normal`].
    pub locale: LocaleFlags,
    /// Filtering mode.
    pub mode: LoadMode,
}

impl Settings {
    /// Settings requesting a single locale under [`LoadMode::Normal`].
    pub const fn new(locale: LocaleFlags) -> Self {
        Self {
            locale,
            mode: LoadMode::Normal,
        }
    }

    /// Settings that keep every block, regardless of locale or content
    /// flags (used where no filtering is wanted, e.g. round-trip tests).
    pub const fn full() -> Self {
        Self {
            locale: LocaleFlags::new(LocaleFlags::ALL),
            mode: LoadMode::Full,
        }
    }

    /// Whether a block with the given locale/content flags should be
    /// excluded from the lookup tables.
    ///
    /// Mirrors spec.md's filter: unless `mode` is `Full`, skip if the
    /// block's locale flags share no bit with either the recognized-locale
    /// mask or the requested locale, or if the block is flagged
    /// low-violence.
    pub fn skip_block(&self, locale_flags: LocaleFlags, content_flags: ContentFlags) -> bool {
        if matches!(self.mode, LoadMode::Full) {
            return false;
        }

        let recognized = LocaleFlags::new(LocaleFlags::ALL_WOW | self.locale.value());
        let locale_skip = (locale_flags.value() & recognized.value()) == 0;
        let content_skip = content_flags.has(ContentFlags::LOW_VIOLENCE);

        locale_skip || content_skip
    }
}

impl Default for Settings {
    /// No filtering: every block is kept. Matches this reader's behavior
    /// before block-level filtering existed.
    fn default() -> Self {
        Self::full()
    }
}
