//! Built-in fairness settings for the tabular benchmarks

use crate::data::Constraint;
use crate::search::FairnessConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named dataset with known protected attributes and value ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Adult census income: age, race, sex protected
    Census,
    /// German credit: sex, age protected
    Credit,
    /// Bank marketing: age protected
    Bank,
}

const CENSUS_PROTECTED: &[usize] = &[0, 7, 8];
const CENSUS_RANGES: &[(i32, i32)] = &[
    (1, 9),
    (0, 7),
    (0, 39),
    (0, 15),
    (0, 6),
    (0, 13),
    (0, 5),
    (0, 4),
    (0, 1),
    (0, 99),
    (0, 39),
    (0, 99),
    (0, 39),
];

const CREDIT_PROTECTED: &[usize] = &[8, 12];
const CREDIT_RANGES: &[(i32, i32)] = &[
    (0, 3),
    (1, 80),
    (0, 4),
    (0, 10),
    (1, 200),
    (0, 4),
    (0, 4),
    (1, 4),
    (0, 1),
    (0, 2),
    (1, 4),
    (0, 3),
    (1, 8),
    (0, 2),
    (0, 2),
    (1, 4),
    (0, 3),
    (1, 2),
    (0, 1),
    (0, 1),
];

const BANK_PROTECTED: &[usize] = &[0];
const BANK_RANGES: &[(i32, i32)] = &[
    (1, 9),
    (0, 11),
    (0, 2),
    (0, 3),
    (0, 1),
    (-20, 179),
    (0, 1),
    (0, 1),
    (0, 2),
    (1, 31),
    (0, 11),
    (0, 99),
    (1, 63),
    (-1, 39),
    (0, 1),
    (0, 3),
];

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Census, Preset::Credit, Preset::Bank];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Census => "census",
            Preset::Credit => "credit",
            Preset::Bank => "bank",
        }
    }

    pub fn protected_attrs(&self) -> &'static [usize] {
        match self {
            Preset::Census => CENSUS_PROTECTED,
            Preset::Credit => CREDIT_PROTECTED,
            Preset::Bank => BANK_PROTECTED,
        }
    }

    pub fn ranges(&self) -> &'static [(i32, i32)] {
        match self {
            Preset::Census => CENSUS_RANGES,
            Preset::Credit => CREDIT_RANGES,
            Preset::Bank => BANK_RANGES,
        }
    }

    pub fn num_attrs(&self) -> usize {
        self.ranges().len()
    }

    pub fn fairness_config(&self) -> Result<FairnessConfig> {
        FairnessConfig::new(
            self.protected_attrs().to_vec(),
            Constraint::from_ranges(self.ranges())?,
        )
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "census" | "adult" => Ok(Preset::Census),
            "credit" | "german" => Ok(Preset::Credit),
            "bank" => Ok(Preset::Bank),
            _ => Err(Error::ConfigError(format!(
                "Unknown dataset preset: {s}. Valid presets: census, credit, bank"
            ))),
        }
    }
}
