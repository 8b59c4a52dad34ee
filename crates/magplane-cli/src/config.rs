//! Configuration vault: reads and writes `~/.magplane/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use magplane_middleware::SimSignal;
use magplane_runtime::SessionConfig;
use serde::{Deserialize, Serialize};

/// Persisted settings for the `magplane` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Frames rendered per second.
    #[serde(default = "default_fps")]
    pub fps: f32,

    /// Print the readout every this many frames (0 disables it).
    #[serde(default = "default_readout_every")]
    pub readout_every: u32,

    /// Write every frame to stdout as one JSON line.
    #[serde(default)]
    pub dump_frames: bool,

    /// Stop after this many frames; run until Ctrl-C when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frames: Option<u64>,

    /// Synthetic sensor used when no hardware is attached.
    #[serde(default)]
    pub sim: SimSignal,

    /// Pipeline tuning.
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_fps() -> f32 {
    60.0
}

fn default_readout_every() -> u32 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            readout_every: default_readout_every(),
            dump_frames: false,
            max_frames: None,
            sim: SimSignal::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Return the path to `~/.magplane/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".magplane").join("config.toml")
}

/// Where the effective config came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    File,
    /// No file yet; defaults were used.
    Missing,
    /// The file could not be read or parsed; defaults were used.
    Invalid(String),
}

/// Load `~/.magplane/config.toml`, falling back to defaults, with
/// `MAGPLANE_*` overrides applied in every case.
pub fn load() -> (Config, Origin) {
    load_or_default(&config_path())
}

pub(crate) fn load_or_default(path: &Path) -> (Config, Origin) {
    let (mut cfg, origin) = match load_from(path) {
        Ok(Some(cfg)) => (cfg, Origin::File),
        Ok(None) => (Config::default(), Origin::Missing),
        Err(e) => (Config::default(), Origin::Invalid(e)),
    };
    apply_env_overrides(&mut cfg);
    (cfg, origin)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply environment overrides to `cfg`.  Unparseable values are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `MAGPLANE_WARMUP` | `session.filter.warmup_samples` |
/// | `MAGPLANE_SPIKE_THRESHOLD` | `session.filter.spike_threshold` |
/// | `MAGPLANE_FPS` | `fps` |
/// | `MAGPLANE_MIRROR_X` | `session.planner.mirror_x` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("MAGPLANE_WARMUP")
        && let Ok(n) = v.trim().parse::<u32>()
    {
        cfg.session.filter.warmup_samples = n;
    }
    if let Ok(v) = std::env::var("MAGPLANE_SPIKE_THRESHOLD")
        && let Ok(t) = v.trim().parse::<f32>()
    {
        cfg.session.filter.spike_threshold = t;
    }
    if let Ok(v) = std::env::var("MAGPLANE_FPS")
        && let Ok(fps) = v.trim().parse::<f32>()
        && fps > 0.0
    {
        cfg.fps = fps;
    }
    if let Ok(v) = std::env::var("MAGPLANE_MIRROR_X")
        && let Some(flag) = parse_flag(&v)
    {
        cfg.session.planner.mirror_x = flag;
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Save the config, creating `~/.magplane/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn config_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap())
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn default_config_roundtrips() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let mut cfg = Config::default();
        cfg.max_frames = Some(600);
        cfg.session.planner.mirror_x = true;
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "fps = 30.0\n\n[session.filter]\nwarmup_samples = 8\n\n[sim]\nrate_hz = 25.0\n",
        )
        .unwrap();

        let cfg = load_from(&path).unwrap().unwrap();
        assert_eq!(cfg.fps, 30.0);
        assert_eq!(cfg.readout_every, 30);
        assert_eq!(cfg.session.filter.warmup_samples, 8);
        assert_eq!(cfg.session.filter.spike_threshold, 6.0);
        assert_eq!(cfg.sim.rate_hz, 25.0);
        assert_eq!(cfg.sim.seed, SimSignal::default().seed);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "fps = \"fast\"\n").unwrap();
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn config_path_points_to_magplane_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".magplane"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn env_overrides_warmup_and_threshold() {
        // SAFETY: these variables are only touched by this test.
        unsafe {
            std::env::set_var("MAGPLANE_WARMUP", "12");
            std::env::set_var("MAGPLANE_SPIKE_THRESHOLD", "4.5");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.session.filter.warmup_samples, 12);
        assert_eq!(cfg.session.filter.spike_threshold, 4.5);

        // Overrides apply whether the file is valid, missing or broken.
        let dir = tempfile::tempdir().expect("tmp dir");
        let missing = dir.path().join("absent.toml");
        let (cfg, origin) = load_or_default(&missing);
        assert_eq!(origin, Origin::Missing);
        assert_eq!(cfg.session.filter.warmup_samples, 12);

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "fps = \"fast\"\n").unwrap();
        let (cfg, origin) = load_or_default(&broken);
        assert!(matches!(origin, Origin::Invalid(_)));
        assert_eq!(cfg.session.filter.warmup_samples, 12);
        assert_eq!(cfg.session.filter.spike_threshold, 4.5);

        let valid = dir.path().join("valid.toml");
        fs::write(&valid, "[session.filter]\nwarmup_samples = 8\n").unwrap();
        let (cfg, origin) = load_or_default(&valid);
        assert_eq!(origin, Origin::File);
        assert_eq!(cfg.session.filter.warmup_samples, 12);

        unsafe {
            std::env::remove_var("MAGPLANE_WARMUP");
            std::env::remove_var("MAGPLANE_SPIKE_THRESHOLD");
        }
    }

    #[test]
    fn env_override_ignores_bad_fps() {
        // SAFETY: only this test touches MAGPLANE_FPS.
        unsafe { std::env::set_var("MAGPLANE_FPS", "-5") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.fps, 60.0);
        unsafe { std::env::set_var("MAGPLANE_FPS", "fast") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.fps, 60.0);
        unsafe { std::env::set_var("MAGPLANE_FPS", "30") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.fps, 30.0);
        unsafe { std::env::remove_var("MAGPLANE_FPS") };
    }

    #[test]
    fn mirror_flag_parsing() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);

        // SAFETY: only this test touches MAGPLANE_MIRROR_X.
        unsafe { std::env::set_var("MAGPLANE_MIRROR_X", "yes") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert!(cfg.session.planner.mirror_x);
        unsafe { std::env::remove_var("MAGPLANE_MIRROR_X") };
    }
}
