//! Directed term graphs over proof states.
//!
//! A state's clauses are folded into one shared graph: functors are
//! shared across the whole graph by name, variables are shared within
//! a single clause, and ground-term structure is shared everywhere it
//! reoccurs. Each clause hangs off a marker node (`Selected` or
//! `Action`) so a consumer can pool per-clause embeddings out of the
//! node set.

use std::collections::HashMap;

use atp::{Clause, Role};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::parse::{parse_clause_body, Literal, Term};
use crate::types::GraphError;

/// Node labels of the state graph. The discriminants are the integer
/// codes stored in [`GraphParts::nodes`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Variable = 0,
    Functor = 1,
    Argument = 2,
    Application = 3,
    Equality = 4,
    Disequality = 5,
    Negation = 6,
    Axiom = 7,
    NegatedConjecture = 8,
    Action = 9,
    Selected = 10,
}

/// Flattened COO form of a finished graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphParts {
    /// Node kinds in node-id order.
    pub nodes: Vec<i32>,
    /// Edge source ids, parallel to `targets`.
    pub sources: Vec<i32>,
    /// Edge target ids.
    pub targets: Vec<i32>,
    /// Marker node ids, in the order the clauses were added.
    pub indices: Vec<i32>,
}

#[derive(Default)]
pub struct GraphBuilder {
    graph: DiGraph<NodeKind, ()>,
    functors: HashMap<String, NodeIndex>,
    /// Cleared between clauses: variable scope is the clause.
    variables: HashMap<String, NodeIndex>,
    /// Structural sharing of applications, keyed by functor node and
    /// argument value nodes.
    terms: HashMap<Vec<NodeIndex>, NodeIndex>,
    markers: Vec<NodeIndex>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause of the selected set.
    pub fn add_selected(&mut self, clause: &Clause) -> Result<(), GraphError> {
        self.add_clause(clause, NodeKind::Selected)
    }

    /// Adds a candidate action clause.
    pub fn add_action(&mut self, clause: &Clause) -> Result<(), GraphError> {
        self.add_clause(clause, NodeKind::Action)
    }

    fn add_clause(&mut self, clause: &Clause, marker: NodeKind) -> Result<(), GraphError> {
        let literals = parse_clause_body(clause.body())?;
        self.variables.clear();
        let literal_nodes: Vec<NodeIndex> = literals
            .iter()
            .map(|literal| self.visit_literal(literal))
            .collect();
        let kind = match clause.role() {
            Role::NegatedConjecture => NodeKind::NegatedConjecture,
            _ => NodeKind::Axiom,
        };
        let clause_node = self.graph.add_node(kind);
        for literal_node in literal_nodes {
            self.graph.add_edge(clause_node, literal_node, ());
        }
        let marker_node = self.graph.add_node(marker);
        self.graph.add_edge(marker_node, clause_node, ());
        self.markers.push(marker_node);
        Ok(())
    }

    fn visit_literal(&mut self, literal: &Literal) -> NodeIndex {
        match literal {
            Literal::Atom {
                negated,
                predicate,
                args,
            } => {
                let atom = self.visit_application(predicate, args);
                if *negated {
                    let negation = self.graph.add_node(NodeKind::Negation);
                    self.graph.add_edge(negation, atom, ());
                    negation
                } else {
                    atom
                }
            }
            Literal::Equation {
                negated,
                left,
                right,
            } => {
                let left = self.visit_term(left);
                let right = self.visit_term(right);
                let kind = if *negated {
                    NodeKind::Disequality
                } else {
                    NodeKind::Equality
                };
                let equation = self.graph.add_node(kind);
                self.graph.add_edge(equation, left, ());
                self.graph.add_edge(equation, right, ());
                equation
            }
        }
    }

    fn visit_term(&mut self, term: &Term) -> NodeIndex {
        match term {
            Term::Variable(name) => {
                if let Some(&node) = self.variables.get(name) {
                    return node;
                }
                let node = self.graph.add_node(NodeKind::Variable);
                self.variables.insert(name.clone(), node);
                node
            }
            Term::Function(name, args) => self.visit_application(name, args),
        }
    }

    /// Constants and propositional atoms collapse onto their functor
    /// node; everything else gets an `Application` with one `Argument`
    /// slot per position, chained left to right so argument order
    /// survives in the edge set.
    fn visit_application(&mut self, name: &str, args: &[Term]) -> NodeIndex {
        let functor = self.functor(name);
        if args.is_empty() {
            return functor;
        }
        let values: Vec<NodeIndex> = args.iter().map(|arg| self.visit_term(arg)).collect();
        let mut key = Vec::with_capacity(values.len() + 1);
        key.push(functor);
        key.extend_from_slice(&values);
        if let Some(&node) = self.terms.get(&key) {
            return node;
        }
        let mut slots = Vec::with_capacity(values.len());
        for &value in &values {
            let slot = self.graph.add_node(NodeKind::Argument);
            self.graph.add_edge(slot, value, ());
            slots.push(slot);
        }
        let application = self.graph.add_node(NodeKind::Application);
        self.graph.add_edge(application, functor, ());
        for &slot in &slots {
            self.graph.add_edge(application, slot, ());
        }
        for pair in slots.windows(2) {
            self.graph.add_edge(pair[0], pair[1], ());
        }
        self.terms.insert(key, application);
        application
    }

    fn functor(&mut self, name: &str) -> NodeIndex {
        if let Some(&node) = self.functors.get(name) {
            return node;
        }
        let node = self.graph.add_node(NodeKind::Functor);
        self.functors.insert(name.to_string(), node);
        node
    }

    pub fn finish(self) -> GraphParts {
        let nodes = self
            .graph
            .raw_nodes()
            .iter()
            .map(|node| node.weight as i32)
            .collect();
        let (sources, targets) = self
            .graph
            .raw_edges()
            .iter()
            .map(|edge| (edge.source().index() as i32, edge.target().index() as i32))
            .unzip();
        let indices = self.markers.iter().map(|node| node.index() as i32).collect();
        GraphParts {
            nodes,
            sources,
            targets,
            indices,
        }
    }
}
