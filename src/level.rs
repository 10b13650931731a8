use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

// "1-1", "3-4c", optional whitespace around the code
static REGEX_LEVEL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+)-(\d+)(c?)\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelCode {
    pub world: u32,
    pub level: u32,
    pub is_challenge: bool,
}

impl LevelCode {
    pub fn new(world: u32, level: u32, is_challenge: bool) -> Self {
        LevelCode {
            world,
            level,
            is_challenge,
        }
    }

    /// Parse the short textual form of a level code. Anything not matching
    /// `<world>-<level>[c]` yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let captures = REGEX_LEVEL_CODE.captures(input)?;
        let world = captures.get(1)?.as_str().parse::<u32>().ok()?;
        let level = captures.get(2)?.as_str().parse::<u32>().ok()?;
        let is_challenge = captures.get(3).map_or(false, |c| !c.as_str().is_empty());
        Some(LevelCode::new(world, level, is_challenge))
    }
}

impl fmt::Display for LevelCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.is_challenge {
            true => write!(f, "{}-{}c", self.world, self.level),
            false => write!(f, "{}-{}", self.world, self.level),
        }
    }
}

/// Stable key indexing a level in the cache collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LevelKey(String);

impl LevelKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LevelIdentity {
    Campaign { id: String, code: LevelCode },
    Weekly { id: String, week: u32 },
}

impl LevelIdentity {
    /// Remote identifier of the level.
    pub fn id(&self) -> &str {
        match self {
            LevelIdentity::Campaign { id, .. } | LevelIdentity::Weekly { id, .. } => id,
        }
    }

    pub fn key(&self) -> LevelKey {
        match self {
            LevelIdentity::Campaign { code, .. } => LevelKey(format!("campaign:{code}")),
            LevelIdentity::Weekly { id, .. } => LevelKey(format!("weekly:{id}")),
        }
    }
}

impl fmt::Display for LevelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LevelIdentity::Campaign { code, .. } => write!(f, "{}", code),
            LevelIdentity::Weekly { week, .. } => write!(f, "week {}", week),
        }
    }
}

/// Level grouping used to select levels for aggregation. `All` only makes
/// sense as a filter, a level itself always belongs to one of the others.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum LevelCategory {
    All,
    Regular,
    Challenge,
    Weekly,
    Bonus,
}

impl LevelCategory {
    pub fn includes(&self, other: LevelCategory) -> bool {
        *self == LevelCategory::All || *self == other
    }
}

/// Metadata every cached level exposes, campaign or weekly.
pub trait LevelInfo: Clone + PartialEq + Send + Sync + 'static {
    fn identity(&self) -> LevelIdentity;

    fn name(&self) -> &str;

    fn category(&self) -> LevelCategory;

    /// Campaign world, weekly levels have none.
    fn world(&self) -> Option<u32>;

    /// Level budget, when the metadata carries one.
    fn budget(&self) -> Option<f64>;

    fn key(&self) -> LevelKey {
        self.identity().key()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignLevelInfo {
    pub id: String,
    pub code: LevelCode,
    pub name: String,
    pub budget: f64,
    pub bonus: bool,
}

impl LevelInfo for CampaignLevelInfo {
    fn identity(&self) -> LevelIdentity {
        LevelIdentity::Campaign {
            id: self.id.clone(),
            code: self.code,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> LevelCategory {
        match (self.bonus, self.code.is_challenge) {
            (true, _) => LevelCategory::Bonus,
            (false, true) => LevelCategory::Challenge,
            (false, false) => LevelCategory::Regular,
        }
    }

    fn world(&self) -> Option<u32> {
        Some(self.code.world)
    }

    fn budget(&self) -> Option<f64> {
        Some(self.budget)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyLevelInfo {
    pub id: String,
    pub title: String,
    pub week: u32,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub preview: String,
}

impl LevelInfo for WeeklyLevelInfo {
    fn identity(&self) -> LevelIdentity {
        LevelIdentity::Weekly {
            id: self.id.clone(),
            week: self.week,
        }
    }

    fn name(&self) -> &str {
        &self.title
    }

    fn category(&self) -> LevelCategory {
        LevelCategory::Weekly
    }

    fn world(&self) -> Option<u32> {
        None
    }

    fn budget(&self) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_regular_and_challenge_codes() {
        assert_eq!(LevelCode::parse("1-1"), Some(LevelCode::new(1, 1, false)));
        assert_eq!(LevelCode::parse("3-4c"), Some(LevelCode::new(3, 4, true)));
        assert_eq!(LevelCode::parse(" 12-10C "), Some(LevelCode::new(12, 10, true)));
    }

    #[test]
    fn rejects_malformed_codes() {
        assert_eq!(LevelCode::parse("x-y"), None);
        assert_eq!(LevelCode::parse("1-"), None);
        assert_eq!(LevelCode::parse("1-1d"), None);
        assert_eq!(LevelCode::parse(""), None);
        assert_eq!(LevelCode::parse("99999999999-1"), None);
    }

    #[test]
    fn code_display_round_trips() {
        for code in ["1-1", "3-4c", "16-12c"] {
            assert_eq!(LevelCode::parse(code).unwrap().to_string(), code);
        }
    }

    #[test]
    fn campaign_levels_fall_into_one_category() {
        let mut info = CampaignLevelInfo {
            id: "a".to_string(),
            code: LevelCode::new(2, 3, false),
            name: "Bridge".to_string(),
            budget: 1000.0,
            bonus: false,
        };
        assert_eq!(info.category(), LevelCategory::Regular);
        info.code.is_challenge = true;
        assert_eq!(info.category(), LevelCategory::Challenge);
        info.bonus = true;
        assert_eq!(info.category(), LevelCategory::Bonus);
        assert!(LevelCategory::All.includes(LevelCategory::Bonus));
        assert!(!LevelCategory::Weekly.includes(LevelCategory::Bonus));
    }

    #[test]
    fn identities_resolve_to_distinct_keys() {
        let campaign = LevelIdentity::Campaign {
            id: "x1".to_string(),
            code: LevelCode::new(1, 1, false),
        };
        let challenge = LevelIdentity::Campaign {
            id: "x2".to_string(),
            code: LevelCode::new(1, 1, true),
        };
        let weekly = LevelIdentity::Weekly {
            id: "abc".to_string(),
            week: 3,
        };
        assert_eq!(campaign.key().as_str(), "campaign:1-1");
        assert_eq!(challenge.key().as_str(), "campaign:1-1c");
        assert_eq!(weekly.key().as_str(), "weekly:abc");
    }
}
