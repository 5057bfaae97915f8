use serde::Deserialize;
use std::env;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Engine tuning knobs. Every field has a TARGETING_* env override so
/// deployments can retune scoring without a rebuild.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub selection: SelectionConfig,
    pub sequencer: SequencerConfig,
    pub graph: GraphConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Answers in a category before it counts as well-worn.
    pub category_wellworn: u32,
    /// Answers in a category before it counts as over-asked.
    pub category_overasked: u32,
    /// Points subtracted when the member got any question recently.
    pub recency_penalty: f32,
    /// Window for the recency penalty, in hours.
    pub recency_window_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    /// Probability of taking the highest-scored candidate outright.
    pub top_probability: f64,
    /// Probability of exploring among the top pool.
    pub exploration_probability: f64,
    /// Size of the exploration pool.
    pub top_pool_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SequencerConfig {
    /// Maximum queue length per member.
    pub queue_size: usize,
    /// Minimum pattern affinity before a probe question is considered.
    pub affinity_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// TTL for cached graph stats snapshots, in seconds.
    pub stats_ttl_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            category_wellworn: 3,
            category_overasked: 5,
            recency_penalty: 5.0,
            recency_window_hours: 24,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            top_probability: 0.70,
            exploration_probability: 0.20,
            top_pool_size: 5,
        }
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        SequencerConfig {
            queue_size: 10,
            affinity_threshold: 0.3,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig { stats_ttl_secs: 30 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scoring: ScoringConfig::default(),
            selection: SelectionConfig::default(),
            sequencer: SequencerConfig::default(),
            graph: GraphConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        Ok(Config {
            scoring: ScoringConfig {
                category_wellworn: env_parse(
                    "TARGETING_CATEGORY_WELLWORN",
                    defaults.scoring.category_wellworn,
                ),
                category_overasked: env_parse(
                    "TARGETING_CATEGORY_OVERASKED",
                    defaults.scoring.category_overasked,
                ),
                recency_penalty: env_parse(
                    "TARGETING_RECENCY_PENALTY",
                    defaults.scoring.recency_penalty,
                ),
                recency_window_hours: env_parse(
                    "TARGETING_RECENCY_WINDOW_HOURS",
                    defaults.scoring.recency_window_hours,
                ),
            },
            selection: SelectionConfig {
                top_probability: env_parse(
                    "TARGETING_TOP_PROBABILITY",
                    defaults.selection.top_probability,
                ),
                exploration_probability: env_parse(
                    "TARGETING_EXPLORATION_PROBABILITY",
                    defaults.selection.exploration_probability,
                ),
                top_pool_size: env_parse(
                    "TARGETING_TOP_POOL_SIZE",
                    defaults.selection.top_pool_size,
                ),
            },
            sequencer: SequencerConfig {
                queue_size: env_parse("TARGETING_QUEUE_SIZE", defaults.sequencer.queue_size),
                affinity_threshold: env_parse(
                    "TARGETING_AFFINITY_THRESHOLD",
                    defaults.sequencer.affinity_threshold,
                ),
            },
            graph: GraphConfig {
                stats_ttl_secs: env_parse(
                    "TARGETING_GRAPH_STATS_TTL_SECS",
                    defaults.graph.stats_ttl_secs,
                ),
            },
        })
    }
}
