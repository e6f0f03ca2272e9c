//! Per-step variable copies for the k-induction unrolling of spec.md
//! §4.6 ("reset the induction solver to depth d+1 ... assert the
//! transition relation between consecutive frames").
//!
//! Grounded directly on `original_source/src/engine/pdkind/pdkind_engine.h`'s
//! `get_frame_variable(size_t i)`: the original keeps one fresh variable
//! per (logical variable, time step) pair and builds the unrolled
//! transition system by substitution rather than by re-declaring the state
//! type. `pdkind-ir::StateType` only exposes three fixed namespaces
//! (current/next/input), so this module layers the time-indexed copies on
//! top of it instead of widening that contract.

use pdkind_ir::{Namespace, StateType};
use pdkind_term::{Substitution, Term, TermManager};

/// A family of `depth + 1` fresh variable copies of a [`StateType`],
/// indexed `0..=depth`, used to build a quantifier-free unrolling of
/// `Trans` for k-induction.
///
/// Step 0 reuses the state type's own current-namespace terms (no
/// substitution needed); steps `1..=depth` are fresh per-step copies
/// named `"{var}@{i}"`, mirroring the original's `var@i` naming for
/// frame variables.
pub struct Unroller {
    /// `steps[i]` holds the current-namespace terms standing in for time
    /// step `i`.
    steps: Vec<Vec<Term>>,
}

impl Unroller {
    pub fn new(tm: &mut TermManager, state_type: &StateType, depth: usize) -> Self {
        let mut steps = Vec::with_capacity(depth + 1);
        steps.push(state_type.variables(Namespace::Current).to_vec());
        for i in 1..=depth {
            let names = state_type.names();
            let current = state_type.variables(Namespace::Current);
            let mut step_vars = Vec::with_capacity(names.len());
            for (name, &var) in names.iter().zip(current) {
                let sort = tm.var_sort(
                    tm.var_id(var)
                        .expect("StateType variables are always Var terms"),
                );
                step_vars.push(tm.fresh_var(format!("{name}@{i}"), sort));
            }
            steps.push(step_vars);
        }
        Unroller { steps }
    }

    pub fn depth(&self) -> usize {
        self.steps.len() - 1
    }

    /// The state-type terms standing in for time step `i`.
    pub fn at(&self, i: usize) -> &[Term] {
        &self.steps[i]
    }

    /// Rewrites `f` (a current-namespace formula) into time step `i`.
    pub fn at_step(&self, tm: &mut TermManager, state_type: &StateType, f: Term, i: usize) -> Term {
        if i == 0 {
            return f;
        }
        let subst = self.substitution(tm, state_type, Namespace::Current, i);
        tm.substitute(f, &subst)
    }

    /// Rewrites `Trans` (a current/next-namespace formula) so its
    /// "current" half refers to step `i` and its "next" half refers to
    /// step `i + 1`.
    pub fn trans_step(&self, tm: &mut TermManager, state_type: &StateType, trans: Term, i: usize) -> Term {
        let mut subst = self.substitution(tm, state_type, Namespace::Current, i);
        subst.extend(self.substitution(tm, state_type, Namespace::Next, i + 1));
        tm.substitute(trans, &subst)
    }

    fn substitution(
        &self,
        tm: &TermManager,
        state_type: &StateType,
        ns: Namespace,
        step: usize,
    ) -> Substitution {
        let ids = state_type.var_ids(tm, ns);
        ids.into_iter().zip(self.steps[step].iter().copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Unroller;
    use pdkind_ir::{Namespace, StateType, VarDecl};
    use pdkind_term::{Sort, TermManager};

    #[test]
    fn step_zero_is_the_identity() {
        let mut tm = TermManager::new();
        let st = StateType::new(&mut tm, &[VarDecl::new("x", Sort::Int)]);
        let unroller = Unroller::new(&mut tm, &st, 2);
        let x = st.variables(Namespace::Current)[0];
        assert_eq!(unroller.at_step(&mut tm, &st, x, 0), x);
    }

    #[test]
    fn later_steps_use_distinct_fresh_variables() {
        let mut tm = TermManager::new();
        let st = StateType::new(&mut tm, &[VarDecl::new("x", Sort::Int)]);
        let unroller = Unroller::new(&mut tm, &st, 3);
        let x = st.variables(Namespace::Current)[0];
        let step1 = unroller.at_step(&mut tm, &st, x, 1);
        let step2 = unroller.at_step(&mut tm, &st, x, 2);
        assert_ne!(step1, x);
        assert_ne!(step1, step2);
    }

    #[test]
    fn trans_step_links_consecutive_time_steps() {
        let mut tm = TermManager::new();
        let st = StateType::new(&mut tm, &[VarDecl::new("x", Sort::Int)]);
        let x = st.variables(Namespace::Current)[0];
        let x_next = st.variables(Namespace::Next)[0];
        let trans = tm.mk_eq(x_next, x);
        let unroller = Unroller::new(&mut tm, &st, 2);
        let step0 = unroller.trans_step(&mut tm, &st, trans, 0);
        let lhs = unroller.at(1)[0];
        let rhs = unroller.at(0)[0];
        let expected = tm.mk_eq(lhs, rhs);
        assert_eq!(step0, expected);
    }
}
