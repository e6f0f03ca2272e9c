use pdkind_term::{Sort, Substitution, Term, TermManager, VarId};

/// The three parallel renamings a state formula can be rewritten between
/// (spec.md §3: "current", "next", and "input").
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Current,
    Next,
    Input,
}

/// One declared state variable, before it is split into its three
/// namespaced incarnations.
#[derive(Clone, Debug)]
pub struct VarDecl {
    pub name: String,
    pub sort: Sort,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, sort: Sort) -> Self {
        VarDecl {
            name: name.into(),
            sort,
        }
    }
}

/// `spec.md` §3: "an ordered list of typed variables with three parallel
/// renamings — current, next, and input — and functions to rewrite a
/// formula between any two namespaces."
#[derive(Clone, Debug)]
pub struct StateType {
    names: Vec<String>,
    current: Vec<Term>,
    next: Vec<Term>,
    input: Vec<Term>,
}

impl StateType {
    /// Declares every variable in `decls`, in order, allocating its three
    /// namespaced variables in the given term manager.
    pub fn new(tm: &mut TermManager, decls: &[VarDecl]) -> Self {
        let mut names = Vec::with_capacity(decls.len());
        let mut current = Vec::with_capacity(decls.len());
        let mut next = Vec::with_capacity(decls.len());
        let mut input = Vec::with_capacity(decls.len());
        for decl in decls {
            names.push(decl.name.clone());
            current.push(tm.fresh_var(decl.name.clone(), decl.sort));
            next.push(tm.fresh_var(format!("{}'", decl.name), decl.sort));
            input.push(tm.fresh_var(format!("{}!", decl.name), decl.sort));
        }
        StateType {
            names,
            current,
            next,
            input,
        }
    }

    pub fn variables(&self, ns: Namespace) -> &[Term] {
        match ns {
            Namespace::Current => &self.current,
            Namespace::Next => &self.next,
            Namespace::Input => &self.input,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The `VarId`s underlying a namespace's variables, in declaration
    /// order — used to build substitutions and to read models back out of
    /// the solver façade.
    pub fn var_ids(&self, tm: &TermManager, ns: Namespace) -> Vec<VarId> {
        self.variables(ns)
            .iter()
            .map(|&t| tm.var_id(t).expect("StateType only stores Var terms"))
            .collect()
    }

    fn build_mapping(&self, tm: &TermManager, from: Namespace, to: Namespace) -> Substitution {
        let from_ids = self.var_ids(tm, from);
        let to_terms = self.variables(to);
        from_ids
            .into_iter()
            .zip(to_terms.iter().copied())
            .collect()
    }

    /// `rename(F, from_space, to_space)`.
    pub fn rename(&self, tm: &mut TermManager, f: Term, from: Namespace, to: Namespace) -> Term {
        if from == to {
            return f;
        }
        let mapping = self.build_mapping(tm, from, to);
        tm.substitute(f, &mapping)
    }
}
