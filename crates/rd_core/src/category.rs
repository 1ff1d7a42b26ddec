use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// Upper bound on category assignments stored for one article.
pub const MAX_CATEGORIES_PER_ARTICLE: usize = 3;

/// The closed set of robotics categories articles can be filed under.
///
/// This is the only definition of the set: storage seeding and categorizer
/// validation both read [`Category::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    HumanoidRobots,
    DronesAerialSystems,
    IndustrialAutomation,
    AgvsAmrs,
    AiSoftware,
    ResearchAcademia,
    BusinessFunding,
    HealthcareRobotics,
    AgriculturalRobotics,
    ConsumerRobotics,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::HumanoidRobots,
        Category::DronesAerialSystems,
        Category::IndustrialAutomation,
        Category::AgvsAmrs,
        Category::AiSoftware,
        Category::ResearchAcademia,
        Category::BusinessFunding,
        Category::HealthcareRobotics,
        Category::AgriculturalRobotics,
        Category::ConsumerRobotics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::HumanoidRobots => "Humanoid Robots",
            Category::DronesAerialSystems => "Drones & Aerial Systems",
            Category::IndustrialAutomation => "Industrial Automation",
            Category::AgvsAmrs => "AGVs & AMRs",
            Category::AiSoftware => "AI & Software",
            Category::ResearchAcademia => "Research & Academia",
            Category::BusinessFunding => "Business & Funding",
            Category::HealthcareRobotics => "Healthcare Robotics",
            Category::AgriculturalRobotics => "Agricultural Robotics",
            Category::ConsumerRobotics => "Consumer Robotics",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::HumanoidRobots => {
                "Human-like robots with bipedal locomotion and anthropomorphic features"
            }
            Category::DronesAerialSystems => "Unmanned aerial vehicles and flying robotics platforms",
            Category::IndustrialAutomation => {
                "Manufacturing robots, robotic arms, and factory automation systems"
            }
            Category::AgvsAmrs => {
                "Autonomous Guided Vehicles and Autonomous Mobile Robots for logistics"
            }
            Category::AiSoftware => {
                "Artificial intelligence, machine learning, and robotics software platforms"
            }
            Category::ResearchAcademia => {
                "Academic research, university projects, and scientific breakthroughs"
            }
            Category::BusinessFunding => "Investment rounds, acquisitions, IPOs, and financial news",
            Category::HealthcareRobotics => {
                "Medical robots, surgical systems, and healthcare automation"
            }
            Category::AgriculturalRobotics => {
                "Farming automation, crop monitoring, and agricultural robots"
            }
            Category::ConsumerRobotics => {
                "Home robots, entertainment bots, and consumer-facing products"
            }
        }
    }

    /// Exact, case-sensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::Storage(format!("Unknown category: {}", s)))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Category::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown category `{}`", name)))
    }
}

/// A category label as reported by a categorizer back end, not yet validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub name: String,
    pub confidence: f32,
}

impl CategoryScore {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Drops labels outside the fixed set and keeps the first
/// [`MAX_CATEGORIES_PER_ARTICLE`] valid ones in the order given.
pub fn retain_known<I>(scores: I) -> Vec<(Category, f32)>
where
    I: IntoIterator<Item = CategoryScore>,
{
    scores
        .into_iter()
        .filter_map(|score| {
            let category = Category::from_name(&score.name);
            if category.is_none() {
                tracing::warn!("Dropping unknown category: {}", score.name);
            }
            category.map(|c| (c, score.confidence.clamp(0.0, 1.0)))
        })
        .take(MAX_CATEGORIES_PER_ARTICLE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_set_has_ten_distinct_names() {
        let mut names: Vec<_> = Category::ALL.iter().map(|c| c.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn test_from_name_round_trips_and_is_exact() {
        for category in Category::ALL {
            assert_eq!(Category::from_name(category.name()), Some(category));
        }
        assert_eq!(Category::from_name("humanoid robots"), None);
        assert_eq!(Category::from_name("Not A Category"), None);
    }

    #[test]
    fn test_retain_known_drops_invalid_before_capping() {
        let scores = vec![
            CategoryScore::new("Humanoid Robots", 0.9),
            CategoryScore::new("Not A Category", 0.8),
            CategoryScore::new("AI & Software", 0.7),
            CategoryScore::new("Drones & Aerial Systems", 0.6),
        ];

        let kept = retain_known(scores);
        assert_eq!(
            kept,
            vec![
                (Category::HumanoidRobots, 0.9),
                (Category::AiSoftware, 0.7),
                (Category::DronesAerialSystems, 0.6),
            ]
        );
    }

    #[test]
    fn test_serde_uses_display_name() {
        let json = serde_json::to_string(&Category::AgvsAmrs).unwrap();
        assert_eq!(json, "\"AGVs & AMRs\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::AgvsAmrs);
        assert!(serde_json::from_str::<Category>("\"Space Robots\"").is_err());
    }
}
