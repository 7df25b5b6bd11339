//! Role-tagged clause values and the TPTP-style wire format.
//!
//! Clauses are plain values: equality and hashing go over (role, body text)
//! and nothing else. Bodies stay opaque here — the prover is the only party
//! that interprets them.

use std::fmt;

/// Clause role as tagged in prover output.
///
/// Anything the prover emits outside these three (e.g. `plain` on derived
/// clauses, `hypothesis` in some problem files) folds to [`Role::Axiom`]:
/// for selection purposes every non-conjecture, non-type clause is a usable
/// premise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Axiom,
    NegatedConjecture,
    Type,
}

impl Role {
    /// Wire spelling of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Axiom => "axiom",
            Role::NegatedConjecture => "negated_conjecture",
            Role::Type => "type",
        }
    }

    /// Classify a role token from prover output.
    pub fn parse(token: &str) -> Role {
        match token.trim() {
            "negated_conjecture" => Role::NegatedConjecture,
            "type" => Role::Type,
            _ => Role::Axiom,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line that did not have the `form(name, role, body).` shape.
#[derive(Debug, thiserror::Error)]
#[error("not a clause line: {0:?}")]
pub struct ClauseParseError(pub String);

/// An immutable, role-tagged formula.
///
/// Two clauses are equal iff their role and body text are identical; the
/// body is trimmed at construction so that reparsing our own wire output
/// yields an equal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause {
    role: Role,
    body: String,
}

impl Clause {
    pub fn new(role: Role, body: impl Into<String>) -> Self {
        let body = body.into().trim().to_string();
        Self { role, body }
    }

    /// Parse one annotated statement, e.g. `cnf(c_0_3, axiom, p(X)|q(X)).`.
    ///
    /// The statement name is discarded — clause identity is the body text.
    /// The leading form word (`cnf`, `fof`, `tff`, ...) is ignored as well;
    /// type declarations arrive as `tff` statements but re-serialize through
    /// the same single wire format.
    pub fn parse(line: &str) -> Result<Self, ClauseParseError> {
        let err = || ClauseParseError(truncate(line));
        let trimmed = line.trim();
        let inner = trimmed
            .strip_suffix('.')
            .and_then(|s| s.trim_end().strip_suffix(')'))
            .ok_or_else(err)?;
        let open = inner.find('(').ok_or_else(err)?;
        let fields = &inner[open + 1..];
        let (_name, rest) = fields.split_once(',').ok_or_else(err)?;
        let (role, body) = rest.split_once(',').ok_or_else(err)?;
        if body.trim().is_empty() {
            return Err(err());
        }
        Ok(Clause::new(Role::parse(role), body))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Canonical body text — the equality/hash key.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Serialize into the wire format fed to the prover, newline included.
    pub fn wire(&self) -> String {
        format!("{self}\n")
    }

    /// True for the clauses that seed the initial "selected" set.
    pub fn is_negated_conjecture(&self) -> bool {
        self.role == Role::NegatedConjecture
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cnf(c, {}, {}).", self.role, self.body)
    }
}

fn truncate(line: &str) -> String {
    const LIMIT: usize = 80;
    if line.len() <= LIMIT {
        line.to_string()
    } else {
        let cut = line
            .char_indices()
            .take_while(|(i, _)| *i < LIMIT)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}…", &line[..cut])
    }
}

/// Extract every parseable clause statement from raw prover output.
///
/// Lines that are not part of a statement (comments, SZS headers, perf
/// noise) are skipped; a statement may wrap across lines and ends at `).`.
/// Unparseable statements are dropped rather than failing the whole
/// listing — the prover interleaves diagnostics freely.
pub fn parse_listing(output: &str) -> Vec<Clause> {
    const FORMS: [&str; 4] = ["cnf(", "fof(", "tff(", "tcf("];
    let mut clauses = Vec::new();
    let mut pending = String::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if pending.is_empty() {
            if !FORMS.iter().any(|f| trimmed.starts_with(f)) {
                continue;
            }
            pending.push_str(trimmed);
        } else {
            pending.push(' ');
            pending.push_str(trimmed);
        }
        if pending.ends_with(").") {
            if let Ok(clause) = Clause::parse(&pending) {
                clauses.push(clause);
            }
            pending.clear();
        }
    }
    clauses
}

/// Output of clause normalization, partitioned by role.
#[derive(Debug, Clone, Default)]
pub struct Clausified {
    /// Selectable premises, in discovery order.
    pub axioms: Vec<Clause>,
    /// Negated conjectures: the initial "selected" set of every search.
    pub conjectures: Vec<Clause>,
    /// Type/sort declarations that ride along with every invocation.
    pub extras: Vec<Clause>,
}

impl Clausified {
    pub fn partition(clauses: Vec<Clause>) -> Self {
        let mut out = Clausified::default();
        for clause in clauses {
            match clause.role() {
                Role::NegatedConjecture => out.conjectures.push(clause),
                Role::Type => out.extras.push(clause),
                Role::Axiom => out.axioms.push(clause),
            }
        }
        out
    }
}
