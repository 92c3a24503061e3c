use stratum_core::view::AutoZoom;

const DOCUMENTATION: &str = r#"# Stratum preferences. You may edit this file, but be aware that formatting and comments will not
# be preserved, and all keys and values are case sensitive.

# viewport = [width, height]    Size of the area documents are fit into, in screen pixels.
# auto_zoom = "fit-space"       One of "fit-space", "fit-width", "fit-height", "actual-pixels".
# io_threads = 2                Threads used for writing files.
# new_layers_below_active       Stack extra input images below the first one instead of above.
# animation_delay_ms = 100      Time each layer is shown for, when writing a .gif.
# ping_pong = false             Play the animation forward then backward.
# log_level = "debug"           One of "off", "error", "warn", "info", "debug", "trace".

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(serde::Serialize, serde::Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    #[default]
    FitSpace,
    FitWidth,
    FitHeight,
    ActualPixels,
}
impl From<FitMode> for AutoZoom {
    fn from(value: FitMode) -> Self {
        match value {
            FitMode::FitSpace => Self::FitSpace,
            FitMode::FitWidth => Self::FitWidth,
            FitMode::FitHeight => Self::FitHeight,
            FitMode::ActualPixels => Self::ActualPixels,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub viewport: [f64; 2],
    pub auto_zoom: FitMode,
    pub io_threads: usize,
    pub new_layers_below_active: bool,
    pub animation_delay_ms: u32,
    pub ping_pong: bool,
    pub log_level: String,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            viewport: [1280.0, 720.0],
            auto_zoom: FitMode::default(),
            io_threads: 2,
            new_layers_below_active: false,
            animation_delay_ms: 100,
            ping_pong: false,
            log_level: "debug".to_owned(),
        }
    }
}
impl Settings {
    /// The configured level, or debug if it doesn't parse.
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            log::warn!("Unknown log level {:?}, using debug.", self.log_level);
            log::LevelFilter::Debug
        })
    }
}

pub struct Preferences {
    failed_to_load: bool,
    pub settings: Settings,
}
impl Preferences {
    const FILENAME: &'static str = "preferences.toml";
    /// Shared global preferences, saved and loaded from the user's preference dir.
    /// (Or defaulted, if unavailable for some reason)
    #[must_use]
    pub fn get() -> &'static Self {
        static GLOBAL_PREFERENCES: std::sync::OnceLock<Preferences> = std::sync::OnceLock::new();

        GLOBAL_PREFERENCES.get_or_init(|| {
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
        log::warn!("Preferences weren't available, defaulting.");
        Self {
            failed_to_load: true,
            settings: Settings::default(),
        }
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<Settings> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let settings: Settings = toml::from_str(&string)?;

            Ok(settings)
        };

        match settings {
            Ok(settings) => Self {
                failed_to_load: false,
                settings,
            },
            Err(e) => {
                log::debug!("Couldn't read {}: {e:#}", path.display());
                Self::no_path()
            }
        }
    }
    /// Return true if loading user's settings failed.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Not recursive. If the parent is missing, the user probably has a good reason.
        // Errors here (like it already existing) show up on write below anyway.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        let string = DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(&self.settings)?;
        std::fs::write(preferences, string)?;
        Ok(())
    }
}
