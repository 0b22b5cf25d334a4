use crate::app_dirs::AppDirs;
use crate::error::{ConfigError, Operand};
use crate::problem::OperatorKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const MIN_DURATION_SECS: u32 = 1;
pub const MAX_DURATION_SECS: u32 = 3600;
pub const DEFAULT_DURATION_SECS: u32 = 120;

/// Largest operand a range may allow, so a product always fits in an `i64`
pub const MAX_OPERAND: u32 = 1_000_000;

/// Durations offered as quick picks
pub const DURATION_PRESETS: [u32; 9] = [15, 30, 60, 120, 180, 300, 600, 900, 1800];

/// Operator families that share one set of operand bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum Category {
    #[strum(serialize = "addition/subtraction")]
    AdditionSubtraction,
    #[strum(serialize = "multiplication/division")]
    MultiplicationDivision,
}

/// Inclusive operand bounds for one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub min_a: u32,
    pub max_a: u32,
    pub min_b: u32,
    pub max_b: u32,
}

impl RangeSpec {
    pub const fn new(min_a: u32, max_a: u32, min_b: u32, max_b: u32) -> Self {
        Self {
            min_a,
            max_a,
            min_b,
            max_b,
        }
    }

    pub fn validate(&self, category: Category) -> Result<(), ConfigError> {
        if self.min_a > self.max_a {
            return Err(ConfigError::InvalidRange {
                category,
                operand: Operand::A,
                min: self.min_a,
                max: self.max_a,
            });
        }
        if self.min_b > self.max_b {
            return Err(ConfigError::InvalidRange {
                category,
                operand: Operand::B,
                min: self.min_b,
                max: self.max_b,
            });
        }
        for (operand, max) in [(Operand::A, self.max_a), (Operand::B, self.max_b)] {
            if max > MAX_OPERAND {
                return Err(ConfigError::OperandTooLarge {
                    category,
                    operand,
                    max,
                    limit: MAX_OPERAND,
                });
            }
        }
        Ok(())
    }
}

/// Parses `MIN..MAX,MIN..MAX`. Bounds are checked by [`RangeSpec::validate`], not here.
impl FromStr for RangeSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparsable = || ConfigError::UnparsableRange(s.to_string());

        let parse_pair = |part: &str| -> Option<(u32, u32)> {
            let (min, max) = part.trim().split_once("..")?;
            Some((min.trim().parse().ok()?, max.trim().parse().ok()?))
        };

        let (a, b) = s.split_once(',').ok_or_else(unparsable)?;
        let (min_a, max_a) = parse_pair(a).ok_or_else(unparsable)?;
        let (min_b, max_b) = parse_pair(b).ok_or_else(unparsable)?;

        Ok(Self::new(min_a, max_a, min_b, max_b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranges {
    pub addition: RangeSpec,
    pub multiplication: RangeSpec,
}

impl Ranges {
    pub fn for_category(&self, category: Category) -> &RangeSpec {
        match category {
            Category::AdditionSubtraction => &self.addition,
            Category::MultiplicationDivision => &self.multiplication,
        }
    }
}

/// Named range presets
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn ranges(self) -> Ranges {
        match self {
            Difficulty::Easy => Ranges {
                addition: RangeSpec::new(2, 60, 2, 60),
                multiplication: RangeSpec::new(2, 12, 2, 20),
            },
            Difficulty::Normal => Ranges {
                addition: RangeSpec::new(2, 100, 2, 100),
                multiplication: RangeSpec::new(2, 12, 2, 100),
            },
            Difficulty::Hard => Ranges {
                addition: RangeSpec::new(2, 300, 2, 300),
                multiplication: RangeSpec::new(2, 20, 2, 200),
            },
        }
    }
}

/// Everything a session needs to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfiguration {
    pub duration_seconds: u32,
    pub enabled_operators: BTreeSet<OperatorKind>,
    pub ranges: Ranges,
    /// Preset the ranges came from, `None` for custom ranges
    pub difficulty: Option<Difficulty>,
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self::from_preset(DEFAULT_DURATION_SECS, OperatorKind::ALL, Difficulty::default())
    }
}

impl TestConfiguration {
    pub fn from_preset(
        duration_seconds: u32,
        operators: impl IntoIterator<Item = OperatorKind>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            duration_seconds,
            enabled_operators: operators.into_iter().collect(),
            ranges: difficulty.ranges(),
            difficulty: Some(difficulty),
        }
    }

    pub fn custom(
        duration_seconds: u32,
        operators: impl IntoIterator<Item = OperatorKind>,
        ranges: Ranges,
    ) -> Self {
        Self {
            duration_seconds,
            enabled_operators: operators.into_iter().collect(),
            ranges,
            difficulty: None,
        }
    }

    /// Checks every invariant a session relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&self.duration_seconds) {
            return Err(ConfigError::DurationOutOfRange {
                got: self.duration_seconds,
                min: MIN_DURATION_SECS,
                max: MAX_DURATION_SECS,
            });
        }
        if self.enabled_operators.is_empty() {
            return Err(ConfigError::NoOperators);
        }

        self.ranges
            .addition
            .validate(Category::AdditionSubtraction)?;
        self.ranges
            .multiplication
            .validate(Category::MultiplicationDivision)?;

        if self.enabled_operators.contains(&OperatorKind::Division)
            && self.ranges.multiplication.max_a == 0
        {
            return Err(ConfigError::ZeroDivisor);
        }

        Ok(())
    }
}

/// Last used settings, restored on the next launch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    pub duration_seconds: u32,
    pub operators: Vec<OperatorKind>,
    pub difficulty: Difficulty,
    pub custom_ranges: Option<Ranges>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_DURATION_SECS,
            operators: OperatorKind::ALL.to_vec(),
            difficulty: Difficulty::default(),
            custom_ranges: None,
        }
    }
}

impl Preferences {
    pub fn to_configuration(&self) -> TestConfiguration {
        match self.custom_ranges {
            Some(ranges) => TestConfiguration::custom(
                self.duration_seconds,
                self.operators.iter().copied(),
                ranges,
            ),
            None => TestConfiguration::from_preset(
                self.duration_seconds,
                self.operators.iter().copied(),
                self.difficulty,
            ),
        }
    }
}

impl From<&TestConfiguration> for Preferences {
    fn from(cfg: &TestConfiguration) -> Self {
        Self {
            duration_seconds: cfg.duration_seconds,
            operators: cfg.enabled_operators.iter().copied().collect(),
            difficulty: cfg.difficulty.unwrap_or_default(),
            custom_ranges: match cfg.difficulty {
                Some(_) => None,
                None => Some(cfg.ranges),
            },
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Preferences;
    fn save(&self, prefs: &Preferences) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("monkeymath_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Preferences {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Preferences>(&bytes) {
                Ok(prefs) => prefs,
                Err(e) => {
                    tracing::warn!("ignoring unreadable preferences at {}: {e}", self.path.display());
                    Preferences::default()
                }
            },
            Err(_) => Preferences::default(),
        }
    }

    fn save(&self, prefs: &Preferences) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(prefs)?;
        fs::write(&self.path, data)
    }
}
