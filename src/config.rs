//! Runtime configuration, populated once from environment variables.
//!
//! This mirrors the way the layer's public toggles are described: simple `VIL_*` boolean or
//! numeric flags, parsed once at device creation. An unparseable value logs a warning and the
//! default is kept rather than failing hard, exactly the way an unknown pNext extension struct
//! is handled elsewhere in the layer (log once, keep going).

use std::env;
use std::str::FromStr;

use log::warn;

use crate::hook::SimultaneousSubmitPolicy;

/// Default branch-pruning threshold for the FLCS matcher (see [`crate::matcher`]).
pub const DEFAULT_BRANCH_THRESHOLD: f32 = 0.95;

/// Tunable knobs and feature toggles for a [`Device`](crate::handle::device::Device).
///
/// Constructed once via [`Config::from_env`] when a device is created; individual fields may
/// also be overridden directly for tests or embedding applications that want programmatic
/// control instead of environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Enables the auto-overlay on application-created swapchains. Corresponds to
    /// `VIL_HOOK_OVERLAY` in the public interface (§6). The overlay itself is out of scope for
    /// this crate; this flag is only plumbed through for external collaborators to observe.
    pub hook_overlay: bool,
    /// Branch-pruning threshold for the matcher's lazy matrix march. A per-cell match value
    /// below this threshold additionally explores the two adjacent (non-diagonal) paths, not
    /// just the diagonal one. Lower values are more thorough but slower. Open Question in the
    /// design: the original fixes this at 0.95; this crate exposes it as a tuning knob.
    pub matcher_branch_threshold: f32,
    /// Policy for how the command hook behaves when a single record is submitted more than
    /// once within the same `vkQueueSubmit` or across overlapping submissions (§4.6). The
    /// original fixes one of three behaviors per hook implementation; this crate exposes it as
    /// a single global policy, overridable per [`crate::hook::OperationSet`] by embedding code.
    pub simultaneous_submit: SimultaneousSubmitPolicy,
    /// How long an unused command-allocator block may sit in its size-class free list before
    /// being released back to the system allocator (§4.2). Given in milliseconds for ease of
    /// env-var parsing.
    pub allocator_block_ttl_ms: u64,
    /// Number of completed frames the swapchain's frame history retains for re-location after a
    /// re-record (§3, §4.5).
    pub frame_history_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hook_overlay: false,
            matcher_branch_threshold: DEFAULT_BRANCH_THRESHOLD,
            simultaneous_submit: SimultaneousSubmitPolicy::Skip,
            allocator_block_ttl_ms: 2_000,
            frame_history_capacity: 4,
        }
    }
}

impl Config {
    /// Build a [`Config`] from environment variables, falling back to defaults for anything
    /// unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.hook_overlay = env_flag("VIL_HOOK_OVERLAY", config.hook_overlay);
        config.matcher_branch_threshold =
            env_value("VIL_MATCHER_BRANCH_THRESHOLD", config.matcher_branch_threshold);
        config.allocator_block_ttl_ms =
            env_value("VIL_ALLOCATOR_BLOCK_TTL_MS", config.allocator_block_ttl_ms);
        config.frame_history_capacity =
            env_value("VIL_FRAME_HISTORY_CAPACITY", config.frame_history_capacity);
        config
    }
}

/// Parses a `0`/`1` boolean environment variable. Logs a warning and returns `default` for any
/// other value, per §6: "unknown values log a warning and fall back to default".
pub(crate) fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Err(_) => default,
        Ok(value) => match value.as_str() {
            "0" => false,
            "1" => true,
            other => {
                warn!("Unrecognized value `{other}` for {name}, expected 0 or 1. Using default.");
                default
            }
        },
    }
}

/// Parses an arbitrary `FromStr` environment variable, logging a warning and keeping `default`
/// on a parse failure.
pub(crate) fn env_value<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Err(_) => default,
        Ok(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Unrecognized value `{value}` for {name}. Using default.");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_defaults_when_unset() {
        assert_eq!(env_flag("VIL_TEST_DOES_NOT_EXIST_FLAG", true), true);
        assert_eq!(env_flag("VIL_TEST_DOES_NOT_EXIST_FLAG", false), false);
    }

    #[test]
    fn flag_parses_valid_values() {
        env::set_var("VIL_TEST_FLAG_ON", "1");
        env::set_var("VIL_TEST_FLAG_OFF", "0");
        assert!(env_flag("VIL_TEST_FLAG_ON", false));
        assert!(!env_flag("VIL_TEST_FLAG_OFF", true));
        env::remove_var("VIL_TEST_FLAG_ON");
        env::remove_var("VIL_TEST_FLAG_OFF");
    }

    #[test]
    fn flag_falls_back_on_garbage() {
        env::set_var("VIL_TEST_FLAG_GARBAGE", "yes");
        assert_eq!(env_flag("VIL_TEST_FLAG_GARBAGE", true), true);
        env::remove_var("VIL_TEST_FLAG_GARBAGE");
    }

    #[test]
    fn value_parses_float() {
        env::set_var("VIL_TEST_THRESHOLD", "0.5");
        let v: f32 = env_value("VIL_TEST_THRESHOLD", 0.95f32);
        assert_eq!(v, 0.5);
        env::remove_var("VIL_TEST_THRESHOLD");
    }
}
