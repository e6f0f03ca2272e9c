//! The embedding API of spec.md §6.1, grounded directly on
//! `original_source/src/api/sally_api.{h,cpp}`: `create_context` /
//! `delete_context` / `run_on_source` / `run_on_file` / `term_to_string`
//! / `add_lemma`, the three event-hook registration functions, and the
//! two `*_to_command` renderers.
//!
//! Rust idiom replaces the original's `void(*)(void*, ...)` callback
//! pairs with boxed `FnMut` closures (a closure already captures whatever
//! state the original passed through its `void* user` parameter) composed
//! over `pdkind_core::Observer` — `ObserverHooks` below is the one place
//! that bridges the two.

use crate::config::Options;
use crate::parser::{chc, mcmt};
use pdkind_core::{Driver, Limits, Observer, QueryError, QueryResult, Stats, Verdict};
use pdkind_ir::{CexNodeId, Command, Dialect, TransitionSystem};
use pdkind_solve::NaiveBackend;
use pdkind_term::{Term, TermManager};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

/// The three observer hooks of spec.md §6.1
/// (`set_new_reachability_lemma_eh`, `set_obligation_pushed_eh`,
/// `add_next_frame_eh`), each an optional boxed closure. Adapts onto
/// `pdkind_core::Observer` so `Driver::query` never has to know it is
/// talking to the embedding layer rather than a native Rust caller.
#[derive(Default)]
struct ObserverHooks {
    reachability_lemma: Option<Box<dyn FnMut(usize, Term)>>,
    obligation_pushed: Option<Box<dyn FnMut(usize, Term, usize)>>,
    next_frame: Option<Box<dyn FnMut(usize)>>,
}

impl Observer for ObserverHooks {
    fn reachability_lemma(&mut self, level: usize, lemma: Term) {
        if let Some(cb) = &mut self.reachability_lemma {
            cb(level, lemma);
        }
    }

    fn obligation_pushed(&mut self, level: usize, formula: Term, _cex: Option<CexNodeId>, depth: usize) {
        if let Some(cb) = &mut self.obligation_pushed {
            cb(level, formula, depth);
        }
    }

    fn next_frame(&mut self, level: usize) {
        if let Some(cb) = &mut self.next_frame {
            cb(level);
        }
    }
}

/// One registered transition system, paired with the driver that
/// accumulates lemmas and runs queries against it (spec.md §6.2: `lemma`
/// / `ilemma` commands install lemmas "typically replayed from a prior
/// run's output" before a `query` command consumes them, so the driver
/// for a system persists across commands rather than being rebuilt fresh
/// for every single `query`).
struct Registered {
    system: TransitionSystem,
    driver: Driver<NaiveBackend>,
}

/// `sally_context` (spec.md §6.1): owns the term manager, the registered
/// transition systems, and the options the host created it with.
pub struct Context {
    tm: TermManager,
    options: Options,
    limits: Limits,
    systems: FxHashMap<String, Registered>,
    current_system: Option<String>,
    hooks: ObserverHooks,
}

impl Context {
    /// `create_context(options)`. `ConfigError` if `engine`/`solver` is
    /// missing or unrecognized (spec.md §7).
    pub fn create(options: Options) -> QueryResult<Self> {
        options.engine()?;
        options.solver()?;
        let limits = Limits {
            max_frames: options.max_frames()?,
            max_frame_size: options.max_frame_size()?,
            ..Limits::default()
        };
        Ok(Context {
            tm: TermManager::new(),
            options,
            limits,
            systems: FxHashMap::default(),
            current_system: None,
            hooks: ObserverHooks::default(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn term_manager(&self) -> &TermManager {
        &self.tm
    }

    pub fn term_manager_mut(&mut self) -> &mut TermManager {
        &mut self.tm
    }

    /// `term_to_string(ctx, T)`.
    pub fn term_to_string(&self, t: Term) -> String {
        self.tm.to_string(t)
    }

    pub fn system(&self, id: &str) -> Option<&TransitionSystem> {
        self.systems.get(id).map(|r| &r.system)
    }

    pub fn stats(&self, id: &str) -> Option<Stats> {
        self.systems.get(id).map(|r| r.driver.stats())
    }

    pub fn current_system_id(&self) -> Option<&str> {
        self.current_system.as_deref()
    }

    /// `set_new_reachability_lemma_eh(ctx, cb, user)`.
    pub fn set_reachability_lemma_hook(&mut self, cb: impl FnMut(usize, Term) + 'static) {
        self.hooks.reachability_lemma = Some(Box::new(cb));
    }

    /// `set_obligation_pushed_eh(ctx, cb, user)`.
    pub fn set_obligation_pushed_hook(&mut self, cb: impl FnMut(usize, Term, usize) + 'static) {
        self.hooks.obligation_pushed = Some(Box::new(cb));
    }

    /// `add_next_frame_eh(ctx, cb, user)`.
    pub fn set_next_frame_hook(&mut self, cb: impl FnMut(usize) + 'static) {
        self.hooks.next_frame = Some(Box::new(cb));
    }

    fn register_system(&mut self, id: String, system: TransitionSystem) {
        let mut driver = Driver::new(NaiveBackend::new(), self.limits);
        driver.declare_system(&self.tm, &system);
        self.systems.insert(id, Registered { system, driver });
    }

    /// Runs one already-lowered [`Command`] (spec.md §6.2) against this
    /// context: installs a lemma, an induction lemma, or runs a query.
    /// Returns the query's verdict, or `None` for `lemma`/`ilemma`.
    pub fn run_command(&mut self, cmd: Command) -> QueryResult<Option<Verdict>> {
        match cmd {
            Command::Lemma { system_id, level, term } => {
                let reg = self
                    .systems
                    .get_mut(&system_id)
                    .ok_or_else(|| QueryError::Config(format!("undefined system '{system_id}'")))?;
                reg.driver.add_reachability_lemma(level, term);
                Ok(None)
            }
            Command::InductionLemma {
                system_id,
                level,
                term,
                cex,
                cex_depth,
            } => {
                let reg = self
                    .systems
                    .get_mut(&system_id)
                    .ok_or_else(|| QueryError::Config(format!("undefined system '{system_id}'")))?;
                reg.driver.add_induction_lemma(level, term, cex, cex_depth);
                Ok(None)
            }
            Command::Query { system_id, term } => {
                let reg = self
                    .systems
                    .get_mut(&system_id)
                    .ok_or_else(|| QueryError::Config(format!("undefined system '{system_id}'")))?;
                let verdict = reg
                    .driver
                    .query(&mut self.tm, &reg.system, term, &mut self.hooks, None)?;
                self.current_system = Some(system_id);
                Ok(Some(verdict))
            }
        }
    }

    /// `run_on_source(ctx, text, dialect)`: parses every top-level form in
    /// `text` and runs it in order, returning every query's verdict in
    /// source order (spec.md §9 Open Question: both dialects accepted,
    /// full-exception-handling only — malformed input surfaces as
    /// `Error::Parse`, nothing is silently swallowed).
    #[instrument(level = "debug", skip(self, text))]
    pub fn run_on_source(&mut self, text: &str, dialect: Dialect) -> QueryResult<Vec<Verdict>> {
        let verdicts = match dialect {
            Dialect::Mcmt => self.run_mcmt_source(text),
            Dialect::Chc => self.run_chc_source(text),
        }?;
        debug!(count = verdicts.len(), "ran source unit");
        Ok(verdicts)
    }

    fn run_mcmt_source(&mut self, text: &str) -> QueryResult<Vec<Verdict>> {
        let program = mcmt::parse(&mut self.tm, text)?;
        for def in program.systems {
            self.register_system(def.id, def.system);
        }
        let mut verdicts = Vec::new();
        for cmd in program.commands {
            if let Some(verdict) = self.run_command(cmd)? {
                verdicts.push(verdict);
            }
        }
        Ok(verdicts)
    }

    /// CHC input (spec.md §8 S5): the frontend lowers the whole source
    /// unit to one transition system plus an implied safety property, run
    /// as a single synthetic query against a system named after the
    /// source's predicate.
    fn run_chc_source(&mut self, text: &str) -> QueryResult<Vec<Verdict>> {
        let system = chc::parse(&mut self.tm, text)?;
        let property = chc::query_property(&mut self.tm, &system.state_type, text)?;
        let id = "chc".to_string();
        self.register_system(id.clone(), system);
        let verdict = self
            .run_command(Command::Query {
                system_id: id,
                term: property,
            })?
            .expect("a Query command always produces a verdict");
        Ok(vec![verdict])
    }

    /// `run_on_file(ctx, path)`: dialect guessed from the extension
    /// (`.chc` => chc, anything else => mcmt), mirroring the
    /// extension-based dispatch in `original_source/src/parser`.
    pub fn run_on_file(&mut self, path: impl AsRef<Path>) -> QueryResult<Vec<Verdict>> {
        let path = path.as_ref();
        let dialect = match path.extension().and_then(|e| e.to_str()) {
            Some("chc") => Dialect::Chc,
            _ => Dialect::Mcmt,
        };
        let text = fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("cannot read '{}': {e}", path.display())))?;
        self.run_on_source(&text, dialect)
    }

    /// `add_lemma(ctx, command_text)`: parses and runs a single `lemma` /
    /// `ilemma` command against `self.current_system` (spec.md §6.1;
    /// `sally_api.cpp::add_lemma` replays exactly one command string the
    /// same way).
    pub fn add_lemma(&mut self, command_text: &str) -> QueryResult<()> {
        let system_id = self
            .current_system
            .clone()
            .ok_or_else(|| QueryError::Config("add_lemma requires a current system; run a query first".into()))?;
        let state_type = self
            .systems
            .get(&system_id)
            .ok_or_else(|| QueryError::Config(format!("undefined system '{system_id}'")))?
            .system
            .state_type
            .clone();
        let cmd = mcmt::parse_standalone_command(&mut self.tm, command_text, &state_type)?;
        self.run_command(cmd)?;
        Ok(())
    }

    /// `reachability_lemma_to_command(ctx, level, T) -> string`: renders
    /// `(lemma <system-id> <level> <term>)` against `self.current_system`,
    /// matching `sally_api.cpp::reachability_lemma_to_command`.
    pub fn reachability_lemma_to_command(&self, level: usize, lemma: Term) -> QueryResult<String> {
        let system_id = self.require_current_system()?;
        Ok(format!("(lemma {system_id} {level} {})", self.tm.to_string(lemma)))
    }

    /// `induction_lemma_to_command(ctx, level, T, cex, depth) -> string`:
    /// renders `(ilemma <system-id> <level> <term> <cex> <cex-depth>)`.
    pub fn induction_lemma_to_command(
        &self,
        level: usize,
        lemma: Term,
        cex: Term,
        cex_depth: usize,
    ) -> QueryResult<String> {
        let system_id = self.require_current_system()?;
        Ok(format!(
            "(ilemma {system_id} {level} {} {} {cex_depth})",
            self.tm.to_string(lemma),
            self.tm.to_string(cex)
        ))
    }

    fn require_current_system(&self) -> QueryResult<&str> {
        self.current_system
            .as_deref()
            .ok_or_else(|| QueryError::Config("no current system; run a query first".into()))
    }
}

/// `delete_context(ctx)` (spec.md §6.1): ownership drop is the context's
/// own `Drop`, this free function exists only so embedding callers have
/// the exact named operation the spec lists.
pub fn delete_context(_ctx: Context) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn options(pairs: &[(&str, &str)]) -> Options {
        Options::new(pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>())
    }

    const COUNTER_MCMT: &str = "
        (define-state-type ST ((x Int)))
        (define-transition-system counter ST
          :init (= x 0)
          :trans (= x' (+ x 1)))
        (query counter (>= x 0))
    ";

    #[test]
    fn create_rejects_missing_engine() {
        let ctx = Context::create(options(&[]));
        assert!(ctx.is_err());
    }

    #[test]
    fn create_accepts_pd_kind_engine_and_any_solver() {
        let ctx = Context::create(options(&[("engine", "pd-kind"), ("solver", "naive")]));
        assert!(ctx.is_ok());
    }

    #[test]
    fn run_on_source_reports_a_valid_verdict() {
        let mut ctx = Context::create(options(&[("engine", "pd-kind"), ("solver", "naive")])).unwrap();
        let verdicts = ctx.run_on_source(COUNTER_MCMT, Dialect::Mcmt).unwrap();
        assert_eq!(verdicts.len(), 1);
        assert!(matches!(verdicts[0], Verdict::Valid { .. }));
        assert_eq!(ctx.current_system_id(), Some("counter"));
    }

    #[test]
    fn reachability_lemma_to_command_round_trips_through_the_parser() {
        let mut ctx = Context::create(options(&[("engine", "pd-kind"), ("solver", "naive")])).unwrap();
        ctx.run_on_source(COUNTER_MCMT, Dialect::Mcmt).unwrap();
        let x = ctx
            .system("counter")
            .unwrap()
            .state_type
            .variables(pdkind_ir::Namespace::Current)[0];
        let rendered = ctx.reachability_lemma_to_command(0, x).unwrap();
        assert!(rendered.starts_with("(lemma counter 0 "));
    }

    #[test]
    fn add_lemma_without_a_prior_query_is_a_config_error() {
        let mut ctx = Context::create(options(&[("engine", "pd-kind"), ("solver", "naive")])).unwrap();
        assert!(ctx.add_lemma("(lemma counter 0 true)").is_err());
    }
}
