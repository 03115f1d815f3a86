use tilepaint_core::chunky::ChunkResolution;
use tilepaint_core::settings::TrackerSettings;
use tilepaint_core::util::VecI;

const DOCUMENTATION: &str = r#"# Tilepaint settings. You may edit this file, but be aware that formatting and comments will not
# be preserved, and all keys and values are case sensitive. Missing keys use their defaults.

# preview_resolution = "Full"              # One of Full, Half, Quarter, Eighth.
# default_canvas = { x = 1080, y = 1080 }  # Used by scripts without a [canvas].
#
# [tracker]
# undo_store_dir = "/path/for/undo/files"  # Defaults to a per-user cache directory.
# storage_swap_min_images = 4              # Undo entries with this many images are kept on disk.

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Resolution replayed documents are composited at.
    pub preview_resolution: ChunkResolution,
    pub default_canvas: VecI,
    pub tracker: TrackerSettings,
    #[serde(skip)]
    failed_to_load: bool,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            tracker: TrackerSettings::default(),
            preview_resolution: ChunkResolution::Full,
            default_canvas: VecI::new(1080, 1080),
            failed_to_load: false,
        }
    }
}
impl Settings {
    const FILENAME: &'static str = "settings.toml";
    /// Shared global settings, saved and loaded from user preferences.
    /// (Or defaulted, if unavailable for some reason)
    #[must_use]
    pub fn get() -> &'static Self {
        static GLOBAL_SETTINGS: std::sync::OnceLock<Settings> = std::sync::OnceLock::new();

        GLOBAL_SETTINGS.get_or_init(|| {
            let mut dir = preferences_dir();
            match dir.as_mut() {
                None => Self::no_path(),
                Some(dir) => {
                    dir.push(Self::FILENAME);
                    Self::load_or_default(dir)
                }
            }
        })
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Settings weren't available, defaulting.");
        Self {
            failed_to_load: true,
            ..Self::default()
        }
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        Self::parse(path).unwrap_or_else(|e| {
            log::warn!("Failed to load {path:?}: {e}");
            Self::no_path()
        })
    }
    fn parse(path: &std::path::Path) -> anyhow::Result<Self> {
        try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let settings: Self = toml::from_str(&string)?;
            Ok(settings)
        }
    }
    /// Return true if loading user's settings failed. This can be useful for
    /// displaying a warning.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Explicity do *not* create recursively. If not found, the user probably has a good reason.
        // Ignore errors (could already exist). Any real errors will be emitted by file access below.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        let mut string = toml::ser::to_string_pretty(self)?;
        // Prefix some documentation.
        string = DOCUMENTATION.to_owned() + &string;
        std::fs::write(preferences, string)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn saved_form_parses() {
        let settings = Settings {
            preview_resolution: ChunkResolution::Quarter,
            ..Settings::default()
        };
        let string = DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&string).unwrap();
        assert_eq!(parsed, settings);
    }
    #[test]
    fn missing_file_defaults() {
        let settings = Settings::load_or_default(std::path::Path::new("/nonexistent/settings.toml"));
        assert!(settings.did_fail_to_load());
        assert_eq!(settings.default_canvas, VecI::new(1080, 1080));
    }
}
