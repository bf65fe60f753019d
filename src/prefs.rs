use crate::controls::ControlState;
use std::fmt;
use std::path::{Path, PathBuf};

/// Persisted control values. Absent keys leave the current value alone.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlPrefs {
    pub resolution: Option<f32>,
    pub frequency: Option<f32>,
    pub speed: Option<f32>,
    pub palette: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefsError {
    Io(String),
    Parse { line: usize, message: String },
}

impl fmt::Display for PrefsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse { line, message } => write!(f, "parse error at line {line}: {message}"),
        }
    }
}

impl std::error::Error for PrefsError {}

impl ControlPrefs {
    pub fn from_controls(c: &ControlState) -> Self {
        Self {
            resolution: Some(c.resolution),
            frequency: Some(c.frequency),
            speed: Some(c.speed),
            palette: Some(c.palette),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay onto `base`; values go through the normal clamping setters.
    pub fn apply_to(&self, base: ControlState) -> ControlState {
        let mut c = base;
        if let Some(v) = self.resolution {
            c = c.with_resolution(v);
        }
        if let Some(v) = self.frequency {
            c = c.with_frequency(v);
        }
        if let Some(v) = self.speed {
            c = c.with_speed(v);
        }
        if let Some(i) = self.palette {
            c = c.with_palette(i);
        }
        c
    }

    /// Later non-empty fields in `other` win.
    pub fn merged(self, other: ControlPrefs) -> Self {
        Self {
            resolution: other.resolution.or(self.resolution),
            frequency: other.frequency.or(self.frequency),
            speed: other.speed.or(self.speed),
            palette: other.palette.or(self.palette),
        }
    }

    pub fn parse(text: &str) -> Result<Self, PrefsError> {
        let mut prefs = Self::default();
        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key_raw, value_raw)) = line.split_once('=') else {
                return Err(PrefsError::Parse {
                    line: line_no,
                    message: "expected <key>=<value>".to_string(),
                });
            };
            let key = key_raw.trim();
            let value = value_raw.trim();
            match key {
                "resolution" => prefs.resolution = Some(parse_unit(value, line_no, key)?),
                "frequency" => prefs.frequency = Some(parse_unit(value, line_no, key)?),
                "speed" => prefs.speed = Some(parse_unit(value, line_no, key)?),
                "palette" => {
                    prefs.palette = Some(value.parse::<usize>().map_err(|_| PrefsError::Parse {
                        line: line_no,
                        message: "palette must be a non-negative integer".to_string(),
                    })?);
                }
                _ => {}
            }
        }
        Ok(prefs)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, PrefsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = match std::fs::read_to_string(path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(PrefsError::Io(err.to_string())),
        };
        Self::parse(&text)
    }

    pub fn to_text(&self) -> String {
        let mut body = String::from("# moire_tui control prefs v1\n");
        if let Some(v) = self.resolution {
            body.push_str(&format!("resolution={v:.4}\n"));
        }
        if let Some(v) = self.frequency {
            body.push_str(&format!("frequency={v:.4}\n"));
        }
        if let Some(v) = self.speed {
            body.push_str(&format!("speed={v:.4}\n"));
        }
        if let Some(i) = self.palette {
            body.push_str(&format!("palette={i}\n"));
        }
        body
    }

    pub fn save(&self, path: Option<&Path>) -> Result<(), PrefsError> {
        let Some(path) = path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PrefsError::Io(e.to_string()))?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_text()).map_err(|e| PrefsError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| PrefsError::Io(e.to_string()))
    }
}

fn parse_unit(raw: &str, line: usize, key: &str) -> Result<f32, PrefsError> {
    let v = raw.parse::<f32>().map_err(|_| PrefsError::Parse {
        line,
        message: format!("{key} must be a number"),
    })?;
    if !v.is_finite() {
        return Err(PrefsError::Parse {
            line,
            message: format!("{key} must be finite"),
        });
    }
    Ok(v)
}

pub fn prefs_storage_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("moire_tui").join("prefs.txt"));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("moire_tui")
            .join("prefs.txt"),
    )
}
