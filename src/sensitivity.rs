//! Sensitivity model: converts between a game's native sensitivity and the
//! physical cm/360 unit, and from cm/360 to the pointer scale factor the
//! engines multiply raw pointer deltas with.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Centimetres in an inch.
const CM_PER_INCH: f64 = 2.54;
/// cm/360 that maps to a pointer scale factor of exactly 1.
pub const BASELINE_CM360: f64 = 30.0;
pub const MIN_POINTER_SCALE: f64 = 0.2;
pub const MAX_POINTER_SCALE: f64 = 3.0;
/// Source-engine `m_yaw` default, shared by CS2 and Apex.
pub const SOURCE_YAW: f64 = 0.022;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensitivityError {
    #[error("unsupported game: {0}")]
    UnsupportedGame(String),

    #[error("sensitivity must be positive, got {0}")]
    NonPositiveSensitivity(f64),

    #[error("dpi must be positive, got {0}")]
    NonPositiveDpi(f64),

    #[error("cm/360 must be positive, got {0}")]
    NonPositiveCm360(f64),

    #[error("angular constant must be positive, got {0}")]
    NonPositiveYaw(f64),
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameProfile {
    Cs2,
    Valorant,
    Apex,
    Overwatch,
    Fortnite,
    R6,
    Pubg,
    Cod,
    Custom,
}

/// Per-game conversion data. `yaw` is the view rotation in degrees per mouse
/// count at sensitivity 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSpec {
    pub name: &'static str,
    pub short_name: &'static str,
    pub yaw: f64,
    pub default_sens: f64,
    pub min_sens: f64,
    pub max_sens: f64,
}

impl GameProfile {
    pub const ALL: [GameProfile; 9] = [
        GameProfile::Cs2,
        GameProfile::Valorant,
        GameProfile::Apex,
        GameProfile::Overwatch,
        GameProfile::Fortnite,
        GameProfile::R6,
        GameProfile::Pubg,
        GameProfile::Cod,
        GameProfile::Custom,
    ];

    /// Conversion data, or `None` for the custom profile which has no formula.
    pub fn spec(self) -> Option<GameSpec> {
        let spec = match self {
            GameProfile::Cs2 => GameSpec {
                name: "Counter-Strike 2",
                short_name: "CS2",
                yaw: SOURCE_YAW,
                default_sens: 2.0,
                min_sens: 0.1,
                max_sens: 10.0,
            },
            GameProfile::Valorant => GameSpec {
                name: "Valorant",
                short_name: "VAL",
                yaw: 0.07,
                default_sens: 0.5,
                min_sens: 0.1,
                max_sens: 5.0,
            },
            GameProfile::Apex => GameSpec {
                name: "Apex Legends",
                short_name: "APEX",
                yaw: SOURCE_YAW,
                default_sens: 2.5,
                min_sens: 0.1,
                max_sens: 10.0,
            },
            GameProfile::Overwatch => GameSpec {
                name: "Overwatch 2",
                short_name: "OW2",
                yaw: 0.0066,
                default_sens: 5.0,
                min_sens: 1.0,
                max_sens: 100.0,
            },
            GameProfile::Fortnite => GameSpec {
                name: "Fortnite",
                short_name: "FN",
                yaw: 0.05555,
                default_sens: 10.0,
                min_sens: 1.0,
                max_sens: 100.0,
            },
            GameProfile::R6 => GameSpec {
                name: "Rainbow Six Siege",
                short_name: "R6",
                yaw: 0.00223,
                default_sens: 50.0,
                min_sens: 1.0,
                max_sens: 100.0,
            },
            GameProfile::Pubg => GameSpec {
                name: "PUBG",
                short_name: "PUBG",
                yaw: 0.002,
                default_sens: 50.0,
                min_sens: 1.0,
                max_sens: 100.0,
            },
            GameProfile::Cod => GameSpec {
                name: "Call of Duty",
                short_name: "COD",
                yaw: SOURCE_YAW * 1.5,
                default_sens: 5.0,
                min_sens: 0.5,
                max_sens: 20.0,
            },
            GameProfile::Custom => return None,
        };
        Some(spec)
    }

    fn require_spec(self) -> Result<GameSpec, SensitivityError> {
        self.spec()
            .ok_or_else(|| SensitivityError::UnsupportedGame(self.to_string()))
    }
}

impl FromStr for GameProfile {
    type Err = SensitivityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_lowercase();
        GameProfile::ALL
            .into_iter()
            .find(|p| p.to_string() == id)
            .ok_or(SensitivityError::UnsupportedGame(id))
    }
}

fn check_inputs(sensitivity: f64, dpi: f64) -> Result<(), SensitivityError> {
    // `!(x > 0)` also rejects NaN
    if !(sensitivity > 0.0) {
        return Err(SensitivityError::NonPositiveSensitivity(sensitivity));
    }
    if !(dpi > 0.0) {
        return Err(SensitivityError::NonPositiveDpi(dpi));
    }
    Ok(())
}

/// Physical distance for a full turn given an explicit angular constant.
pub fn cm360_with_yaw(sensitivity: f64, dpi: f64, yaw: f64) -> Result<f64, SensitivityError> {
    check_inputs(sensitivity, dpi)?;
    if !(yaw > 0.0) || !yaw.is_finite() {
        return Err(SensitivityError::NonPositiveYaw(yaw));
    }
    Ok((360.0 * CM_PER_INCH) / (sensitivity * dpi * yaw))
}

/// cm/360 for a game profile. The custom profile carries cm/360 directly, so
/// it has no formula here; use [`SensitivityConfig::cm360`] for it.
pub fn cm360(sensitivity: f64, dpi: f64, profile: GameProfile) -> Result<f64, SensitivityError> {
    let spec = profile.require_spec()?;
    cm360_with_yaw(sensitivity, dpi, spec.yaw)
}

/// Inverse of [`cm360`]: the in-game sensitivity that yields `cm360` at `dpi`.
pub fn sensitivity_from_cm360(
    profile: GameProfile,
    cm360: f64,
    dpi: f64,
) -> Result<f64, SensitivityError> {
    let spec = profile.require_spec()?;
    if !(cm360 > 0.0) {
        return Err(SensitivityError::NonPositiveCm360(cm360));
    }
    if !(dpi > 0.0) {
        return Err(SensitivityError::NonPositiveDpi(dpi));
    }
    Ok((360.0 / (cm360 / CM_PER_INCH)) / (spec.yaw * dpi))
}

/// Dimensionless multiplier for raw pointer deltas, clamped to
/// `[MIN_POINTER_SCALE, MAX_POINTER_SCALE]`.
pub fn pointer_scale_factor(cm360: f64) -> f64 {
    if !(cm360 > 0.0) {
        return MAX_POINTER_SCALE;
    }
    (BASELINE_CM360 / cm360).clamp(MIN_POINTER_SCALE, MAX_POINTER_SCALE)
}

/// Converts a sensitivity between games at the same DPI, clamped to the
/// destination game's valid range.
pub fn convert_sensitivity(
    from: GameProfile,
    to: GameProfile,
    sensitivity: f64,
    dpi: f64,
) -> Result<f64, SensitivityError> {
    let physical = cm360(sensitivity, dpi, from)?;
    let target = to.require_spec()?;
    let converted = sensitivity_from_cm360(to, physical, dpi)?;
    Ok(converted.clamp(target.min_sens, target.max_sens))
}

pub fn format_cm360(cm360: f64) -> String {
    format!("{:.1} cm/360", cm360)
}

/// Player sensitivity setup as supplied by the settings layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityConfig {
    pub game: GameProfile,
    pub sensitivity: f64,
    pub dpi: f64,
    /// Overrides the profile's angular constant (CS2 `m_yaw`).
    #[serde(default)]
    pub yaw_override: Option<f64>,
    /// Used only by the custom profile.
    #[serde(default)]
    pub custom_cm360: Option<f64>,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            game: GameProfile::Cs2,
            sensitivity: 2.0,
            dpi: 800.0,
            yaw_override: Some(SOURCE_YAW),
            custom_cm360: None,
        }
    }
}

impl SensitivityConfig {
    pub fn new(game: GameProfile, sensitivity: f64, dpi: f64) -> Self {
        Self {
            game,
            sensitivity,
            dpi,
            yaw_override: None,
            custom_cm360: None,
        }
    }

    pub fn custom(cm360: f64) -> Self {
        Self {
            game: GameProfile::Custom,
            sensitivity: 1.0,
            dpi: 800.0,
            yaw_override: None,
            custom_cm360: Some(cm360),
        }
    }

    /// Angular constant in effect: the override if set, else the profile's.
    pub fn angular_constant(&self) -> Option<f64> {
        self.yaw_override
            .or_else(|| self.game.spec().map(|spec| spec.yaw))
    }

    /// Validated cm/360 for this setup.
    pub fn cm360(&self) -> Result<f64, SensitivityError> {
        match self.game {
            GameProfile::Custom => match self.custom_cm360 {
                Some(cm) if cm > 0.0 => Ok(cm),
                Some(cm) => Err(SensitivityError::NonPositiveCm360(cm)),
                None => Err(SensitivityError::NonPositiveCm360(0.0)),
            },
            game => {
                let yaw = self
                    .angular_constant()
                    .ok_or_else(|| SensitivityError::UnsupportedGame(game.to_string()))?;
                cm360_with_yaw(self.sensitivity, self.dpi, yaw)
            }
        }
    }

    pub fn pointer_scale_factor(&self) -> Result<f64, SensitivityError> {
        self.cm360().map(pointer_scale_factor)
    }

    /// eDPI: mouse DPI multiplied by the in-game sensitivity.
    pub fn edpi(&self) -> f64 {
        self.sensitivity * self.dpi
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub player: &'static str,
    pub game: GameProfile,
    pub sensitivity: f64,
    pub dpi: f64,
}

pub const PRESETS: [Preset; 5] = [
    Preset {
        player: "s1mple",
        game: GameProfile::Cs2,
        sensitivity: 3.09,
        dpi: 400.0,
    },
    Preset {
        player: "NiKo",
        game: GameProfile::Cs2,
        sensitivity: 1.55,
        dpi: 400.0,
    },
    Preset {
        player: "ZywOo",
        game: GameProfile::Cs2,
        sensitivity: 2.0,
        dpi: 400.0,
    },
    Preset {
        player: "TenZ",
        game: GameProfile::Valorant,
        sensitivity: 0.4,
        dpi: 800.0,
    },
    Preset {
        player: "Aspas",
        game: GameProfile::Valorant,
        sensitivity: 0.35,
        dpi: 800.0,
    },
];

/// Case-insensitive preset lookup by player name.
pub fn preset(player: &str) -> Option<SensitivityConfig> {
    PRESETS
        .iter()
        .find(|p| p.player.eq_ignore_ascii_case(player))
        .map(|p| SensitivityConfig::new(p.game, p.sensitivity, p.dpi))
}

impl fmt::Display for SensitivityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cm360() {
            Ok(cm) => write!(
                f,
                "{} {} @ {} dpi ({})",
                self.game,
                self.sensitivity,
                self.dpi,
                format_cm360(cm)
            ),
            Err(e) => write!(f, "{} (invalid: {})", self.game, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const EPS: f64 = 1e-9;

    #[test]
    fn cs2_reference_value() {
        // (360 * 2.54) / (2.0 * 800 * 0.022)
        let cm = cm360(2.0, 800.0, GameProfile::Cs2).unwrap();
        assert!((cm - 914.4 / 35.2).abs() < EPS);
        assert_eq!(format_cm360(cm), "26.0 cm/360");
    }

    #[test]
    fn valorant_uses_its_own_constant() {
        let cm = cm360(0.4, 800.0, GameProfile::Valorant).unwrap();
        assert!((cm - 914.4 / (0.4 * 800.0 * 0.07)).abs() < EPS);
    }

    #[test]
    fn cm360_strictly_decreases_with_sensitivity() {
        for profile in GameProfile::ALL.into_iter().filter(|p| p.spec().is_some()) {
            let mut prev = f64::INFINITY;
            for step in 1..50 {
                let sens = step as f64 * 0.2;
                let cm = cm360(sens, 800.0, profile).unwrap();
                assert!(cm < prev, "{profile} not monotonic at {sens}");
                prev = cm;
            }
        }
    }

    #[test]
    fn rejects_non_positive_inputs() {
        assert_matches!(
            cm360(0.0, 800.0, GameProfile::Cs2),
            Err(SensitivityError::NonPositiveSensitivity(_))
        );
        assert_matches!(
            cm360(1.0, -400.0, GameProfile::Cs2),
            Err(SensitivityError::NonPositiveDpi(_))
        );
        assert_matches!(
            cm360(f64::NAN, 800.0, GameProfile::Cs2),
            Err(SensitivityError::NonPositiveSensitivity(_))
        );
        assert_matches!(
            sensitivity_from_cm360(GameProfile::Cs2, 0.0, 800.0),
            Err(SensitivityError::NonPositiveCm360(_))
        );
    }

    #[test]
    fn rejects_bad_yaw_override() {
        for yaw in [0.0, -0.022, f64::NAN, f64::INFINITY] {
            let cfg = SensitivityConfig {
                yaw_override: Some(yaw),
                ..SensitivityConfig::default()
            };
            assert_matches!(cfg.cm360(), Err(SensitivityError::NonPositiveYaw(_)));
            assert_matches!(
                cfg.pointer_scale_factor(),
                Err(SensitivityError::NonPositiveYaw(_))
            );
        }
        assert_matches!(
            cm360_with_yaw(2.0, 800.0, 0.0),
            Err(SensitivityError::NonPositiveYaw(_))
        );
    }

    #[test]
    fn custom_profile_has_no_formula() {
        assert_matches!(
            cm360(1.0, 800.0, GameProfile::Custom),
            Err(SensitivityError::UnsupportedGame(_))
        );
        assert_matches!(
            convert_sensitivity(GameProfile::Cs2, GameProfile::Custom, 1.0, 800.0),
            Err(SensitivityError::UnsupportedGame(_))
        );
    }

    #[test]
    fn unknown_game_id_is_an_error() {
        assert_matches!(
            "quake".parse::<GameProfile>(),
            Err(SensitivityError::UnsupportedGame(id)) if id == "quake"
        );
        assert_eq!("CS2".parse::<GameProfile>().unwrap(), GameProfile::Cs2);
        assert_eq!(" r6 ".parse::<GameProfile>().unwrap(), GameProfile::R6);
    }

    #[test]
    fn pointer_scale_is_clamped() {
        assert_eq!(pointer_scale_factor(30.0), 1.0);
        assert_eq!(pointer_scale_factor(60.0), 0.5);
        assert_eq!(pointer_scale_factor(1.0), MAX_POINTER_SCALE);
        assert_eq!(pointer_scale_factor(1000.0), MIN_POINTER_SCALE);
        for cm in [0.01, 0.5, 7.0, 10.0, 29.9, 150.0, 149.99, 1e9] {
            let f = pointer_scale_factor(cm);
            assert!((MIN_POINTER_SCALE..=MAX_POINTER_SCALE).contains(&f));
        }
    }

    #[test]
    fn conversion_round_trips_within_range() {
        let dpi = 800.0;
        let profiles: Vec<_> = GameProfile::ALL
            .into_iter()
            .filter(|p| p.spec().is_some())
            .collect();
        for &a in &profiles {
            for &b in &profiles {
                let spec_b = b.spec().unwrap();
                for s in [spec_b.min_sens, spec_b.default_sens, spec_b.max_sens] {
                    let in_a = convert_sensitivity(b, a, s, dpi).unwrap();
                    let spec_a = a.spec().unwrap();
                    // Only meaningful when the intermediate value was not clamped
                    let unclamped = sensitivity_from_cm360(a, cm360(s, dpi, b).unwrap(), dpi)
                        .unwrap();
                    if unclamped < spec_a.min_sens || unclamped > spec_a.max_sens {
                        continue;
                    }
                    let back = convert_sensitivity(a, b, in_a, dpi).unwrap();
                    assert!((back - s).abs() < 1e-6 * s.max(1.0), "{b}->{a}->{b}: {s} vs {back}");
                }
            }
        }
    }

    #[test]
    fn conversion_clamps_to_target_range() {
        // 0.1 in CS2 is slower than the lowest Overwatch setting
        let sens = convert_sensitivity(GameProfile::Cs2, GameProfile::Overwatch, 0.1, 100.0)
            .unwrap();
        assert_eq!(sens, 1.0);
        let sens =
            convert_sensitivity(GameProfile::Cs2, GameProfile::Valorant, 0.1, 3200.0).unwrap();
        assert_eq!(sens, 0.1);
        // PUBG's constant is 11x smaller than CS2's
        let sens = convert_sensitivity(GameProfile::Cs2, GameProfile::Pubg, 10.0, 800.0).unwrap();
        assert_eq!(sens, 100.0);
    }

    #[test]
    fn cs2_to_valorant_ratio() {
        let sens = convert_sensitivity(GameProfile::Cs2, GameProfile::Valorant, 2.0, 800.0)
            .unwrap();
        assert!((sens - 2.0 * 0.022 / 0.07).abs() < 1e-9);
    }

    #[test]
    fn config_cm360_and_scale() {
        let cfg = SensitivityConfig::default();
        assert!((cfg.cm360().unwrap() - 25.977272727).abs() < 1e-6);
        assert!(cfg.pointer_scale_factor().unwrap() > 1.0);
        assert_eq!(cfg.edpi(), 1600.0);

        let custom = SensitivityConfig::custom(60.0);
        assert_eq!(custom.cm360().unwrap(), 60.0);
        assert_eq!(custom.pointer_scale_factor().unwrap(), 0.5);

        let broken = SensitivityConfig {
            custom_cm360: None,
            ..SensitivityConfig::custom(1.0)
        };
        assert_matches!(broken.cm360(), Err(SensitivityError::NonPositiveCm360(_)));
    }

    #[test]
    fn yaw_override_changes_result() {
        let mut cfg = SensitivityConfig::new(GameProfile::Cs2, 2.0, 800.0);
        let base = cfg.cm360().unwrap();
        cfg.yaw_override = Some(0.044);
        assert!((cfg.cm360().unwrap() - base / 2.0).abs() < EPS);
    }

    #[test]
    fn presets_lookup() {
        let tenz = preset("tenz").unwrap();
        assert_eq!(tenz.game, GameProfile::Valorant);
        assert_eq!(tenz.sensitivity, 0.4);
        assert!(preset("nobody").is_none());
    }

    #[test]
    fn display_names() {
        assert_eq!(GameProfile::Cs2.to_string(), "cs2");
        assert_eq!(GameProfile::R6.spec().unwrap().short_name, "R6");
        assert!(SensitivityConfig::default().to_string().contains("cm/360"));
    }
}
