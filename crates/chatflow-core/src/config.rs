//! Reveal pacing configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for the pacer's smooth-reveal loop.
///
/// Fragments queue up as they arrive; every `tick_interval_ms` the pacer
/// reveals at most `max_chars_per_tick` characters, merging queued
/// fragments smaller than `min_merge_chars` so char-by-char sources do not
/// stutter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_chars_per_tick")]
    pub max_chars_per_tick: usize,
    #[serde(default = "default_min_merge_chars")]
    pub min_merge_chars: usize,
}

fn default_tick_interval_ms() -> u64 {
    35
}

fn default_max_chars_per_tick() -> usize {
    60
}

fn default_min_merge_chars() -> usize {
    16
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_chars_per_tick: default_max_chars_per_tick(),
            min_merge_chars: default_min_merge_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let cfg: PacerConfig = serde_json::from_str("{\"max_chars_per_tick\": 5}").unwrap();
        assert_eq!(cfg.max_chars_per_tick, 5);
        assert_eq!(cfg.tick_interval_ms, 35);
        assert_eq!(cfg.min_merge_chars, 16);
    }
}
