use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Angry,
    Happy,
    Sad,
    #[default]
    #[serde(other)]
    Neutral,
}

impl Sentiment {
    pub fn label(self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Weibo,
    Zhihu,
    Bilibili,
    Douyin,
    Baidu,
    #[serde(other)]
    Other,
}

/// One hot keyword as reported by the trends backend. Timestamps and other
/// fields the layout never uses are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendItem {
    pub keyword: String,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub raw_heat_score: f64,
    #[serde(default)]
    pub real_score: f64,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub is_marketing: bool,
    #[serde(default)]
    pub platform_count: u32,
}

impl TrendItem {
    /// Reported platform count, falling back to the platform list when the
    /// backend left the count out.
    pub fn platform_count(&self) -> u32 {
        self.platform_count.max(self.platforms.len() as u32)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SizeMetric {
    #[default]
    RealScore,
    RawHeat,
    PlatformCount,
}

impl SizeMetric {
    pub fn label(self) -> &'static str {
        match self {
            Self::RealScore => "real_score",
            Self::RawHeat => "raw_heat_score",
            Self::PlatformCount => "platform_count",
        }
    }

    pub fn value(self, trend: &TrendItem) -> f64 {
        match self {
            Self::RealScore => trend.real_score,
            Self::RawHeat => trend.raw_heat_score,
            Self::PlatformCount => f64::from(trend.platform_count()),
        }
    }
}
