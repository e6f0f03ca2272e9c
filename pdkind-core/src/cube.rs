//! Shared conversions between a solver [`Model`] and a state-variable cube,
//! used by both the driver (reading a k-induction counterexample model)
//! and the reachability engine's trace decoding.

use pdkind_ir::{Namespace, StateAssignment, StateType};
use pdkind_solve::Model;
use pdkind_term::{Rel, Term, TermManager};

/// Reads every variable of `state_type` in namespace `ns` out of `model`
/// as a [`StateAssignment`] (spec.md §4.6: "project the model to a cube G
/// over current-state variables").
pub fn model_to_assignment(
    tm: &TermManager,
    state_type: &StateType,
    model: &Model,
    ns: Namespace,
) -> StateAssignment {
    let mut assignment = StateAssignment::default();
    for id in state_type.var_ids(tm, ns) {
        if let Some(&v) = model.ints.get(&id) {
            assignment.bindings.push((id, v));
        }
        if let Some(&b) = model.bools.get(&id) {
            assignment.bool_bindings.push((id, b));
        }
    }
    assignment
}

/// Builds a cube (conjunction of equalities) over current-namespace
/// variables from a [`StateAssignment`].
pub fn assignment_to_cube(tm: &mut TermManager, assignment: &StateAssignment) -> Term {
    let mut literals = Vec::new();
    for &(id, value) in &assignment.bindings {
        let var_term = tm.var_term(id);
        let value_term = tm.mk_int(value);
        literals.push(tm.mk_eq(var_term, value_term));
    }
    for &(id, value) in &assignment.bool_bindings {
        let var_term = tm.var_term(id);
        literals.push(if value { var_term } else { tm.mk_not(var_term) });
    }
    tm.mk_and(literals)
}

/// Reads a [`Model`] at the variables `terms` (which need not be a
/// [`StateType`]'s own namespace terms — e.g. an [`crate::unroll::Unroller`]'s
/// per-step fresh copies) and re-expresses it positionally over
/// `canonical`, which must be the same length and declaration order. Used
/// to project a k-induction counterexample's model at time step `d` back
/// onto the current-namespace variables a cube is stored against (spec.md
/// §4.6: "project the model to a cube G over current-state variables").
pub fn project_model(
    tm: &TermManager,
    terms: &[Term],
    canonical: &[Term],
    model: &Model,
) -> StateAssignment {
    let mut assignment = StateAssignment::default();
    for (&term, &canonical_term) in terms.iter().zip(canonical) {
        let canonical_id = tm
            .var_id(canonical_term)
            .expect("canonical terms are always Var terms");
        let Some(id) = tm.var_id(term) else { continue };
        if let Some(&v) = model.ints.get(&id) {
            assignment.bindings.push((canonical_id, v));
        }
        if let Some(&b) = model.bools.get(&id) {
            assignment.bool_bindings.push((canonical_id, b));
        }
    }
    assignment
}

/// The inverse of [`assignment_to_cube`]: reads a conjunction of equality
/// (and bare/negated boolean) literals back into a [`StateAssignment`],
/// used to decode a reconstructed counterexample trace's cubes into
/// reportable states (spec.md §8 Soundness-invalid: "every `s_i` must be
/// a genuine concrete state").
pub fn cube_to_assignment(tm: &TermManager, cube: Term) -> StateAssignment {
    let mut assignment = StateAssignment::default();
    for lit in tm.conjuncts(cube) {
        if let Some(id) = tm.var_id(lit) {
            assignment.bool_bindings.push((id, true));
            continue;
        }
        if let Some(inner) = tm.not_inner(lit) {
            if let Some(id) = tm.var_id(inner) {
                assignment.bool_bindings.push((id, false));
                continue;
            }
        }
        if let Some((Rel::Eq, a, b)) = tm.atom_parts(lit) {
            let (var_side, const_side) = if tm.var_id(a).is_some() { (a, b) } else { (b, a) };
            if let (Some(id), Some(value)) = (tm.var_id(var_side), tm.int_const(const_side)) {
                assignment.bindings.push((id, value));
            }
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::{assignment_to_cube, model_to_assignment};
    use pdkind_ir::{Namespace, StateType, VarDecl};
    use pdkind_solve::Model;
    use pdkind_term::{Sort, TermManager};

    #[test]
    fn round_trips_an_int_assignment() {
        let mut tm = TermManager::new();
        let st = StateType::new(&mut tm, &[VarDecl::new("x", Sort::Int)]);
        let id = st.var_ids(&tm, Namespace::Current)[0];
        let mut model = Model::default();
        model.ints.insert(id, 7);
        let assignment = model_to_assignment(&tm, &st, &model, Namespace::Current);
        assert_eq!(assignment.bindings, vec![(id, 7)]);
        let cube = assignment_to_cube(&mut tm, &assignment);
        let expected = {
            let x = st.variables(Namespace::Current)[0];
            let seven = tm.mk_int(7);
            tm.mk_eq(x, seven)
        };
        assert_eq!(cube, expected);
    }
}
