//! The options map of spec.md §6.1, modeled as a small typed wrapper
//! rather than scattering `unwrap()`s through the engine — grounded on
//! `original_source/src/parse_options.{h,cpp}`, which centralizes option
//! validation in one function before any engine code runs
//! (`SPEC_FULL.md` §7 **[AMBIENT]** Configuration).

use pdkind_ir::Error;
use std::collections::HashMap;

/// `spec.md` §6.1's recognized option keys.
pub mod keys {
    pub const ENGINE: &str = "engine";
    pub const SOLVER: &str = "solver";
    pub const SOLVER_LOGIC: &str = "solver-logic";
    pub const MAX_FRAMES: &str = "ic3-max-frames";
    pub const MAX_FRAME_SIZE: &str = "ic3-max-frame-size";
    pub const SHOW_TRACE: &str = "show-trace";
    pub const SHOW_INVARIANT: &str = "show-invariant";
}

/// A validated view over `spec.md` §6.1's options map: `engine` / `solver`
/// / `solver-logic` / `ic3-max-frames` / `ic3-max-frame-size` /
/// `show-trace` / `show-invariant`.
#[derive(Clone, Debug)]
pub struct Options {
    raw: HashMap<String, String>,
}

impl Options {
    pub fn new(raw: HashMap<String, String>) -> Self {
        Options { raw }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }

    /// `ConfigError` if `engine` is missing or is not `"pd-kind"` (the
    /// only engine this core implements, spec.md §1).
    pub fn engine(&self) -> Result<&str, Error> {
        let engine = self
            .get(keys::ENGINE)
            .ok_or_else(|| Error::Config("missing required option 'engine'".into()))?;
        if engine != "pd-kind" {
            return Err(Error::Config(format!(
                "unsupported engine '{engine}': only 'pd-kind' is implemented"
            )));
        }
        Ok(engine)
    }

    /// `ConfigError` if `solver` is missing (spec.md §6.1: "names the
    /// backend SMT procedure"). This workspace's only concrete backend is
    /// `pdkind-solve::NaiveBackend` (`SPEC_FULL.md` §4.2), selected
    /// regardless of the string's value as long as one was given — a real
    /// embedding would dispatch on it.
    pub fn solver(&self) -> Result<&str, Error> {
        self.get(keys::SOLVER)
            .ok_or_else(|| Error::Config("missing required option 'solver'".into()))
    }

    pub fn solver_logic(&self) -> Option<&str> {
        self.get(keys::SOLVER_LOGIC)
    }

    pub fn max_frames(&self) -> Result<usize, Error> {
        self.parse_usize_or(keys::MAX_FRAMES, usize::MAX)
    }

    pub fn max_frame_size(&self) -> Result<usize, Error> {
        self.parse_usize_or(keys::MAX_FRAME_SIZE, usize::MAX)
    }

    pub fn show_trace(&self) -> bool {
        self.flag(keys::SHOW_TRACE)
    }

    pub fn show_invariant(&self) -> bool {
        self.flag(keys::SHOW_INVARIANT)
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("true") | Some("1"))
    }

    fn parse_usize_or(&self, key: &str, default: usize) -> Result<usize, Error> {
        match self.get(key) {
            None => Ok(default),
            Some(s) => s
                .parse::<usize>()
                .map_err(|_| Error::Config(format!("option '{key}' must be a non-negative integer, got '{s}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> Options {
        Options::new(pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn missing_engine_is_a_config_error() {
        let opts = options(&[]);
        assert!(matches!(opts.engine(), Err(Error::Config(_))));
    }

    #[test]
    fn unsupported_engine_is_a_config_error() {
        let opts = options(&[("engine", "bmc")]);
        assert!(matches!(opts.engine(), Err(Error::Config(_))));
    }

    #[test]
    fn recognizes_pd_kind_engine() {
        let opts = options(&[("engine", "pd-kind")]);
        assert_eq!(opts.engine().unwrap(), "pd-kind");
    }

    #[test]
    fn max_frames_defaults_to_unbounded() {
        let opts = options(&[]);
        assert_eq!(opts.max_frames().unwrap(), usize::MAX);
    }

    #[test]
    fn max_frames_parses_a_configured_bound() {
        let opts = options(&[("ic3-max-frames", "5")]);
        assert_eq!(opts.max_frames().unwrap(), 5);
    }

    #[test]
    fn malformed_max_frames_is_a_config_error() {
        let opts = options(&[("ic3-max-frames", "not-a-number")]);
        assert!(matches!(opts.max_frames(), Err(Error::Config(_))));
    }

    #[test]
    fn show_trace_flag_reads_as_boolean() {
        assert!(!options(&[]).show_trace());
        assert!(options(&[("show-trace", "true")]).show_trace());
    }
}
