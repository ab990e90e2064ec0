//! An LR(0) parser construction and execution library.
//!
//! A grammar is a list of context-free rules, each carrying a semantic fold
//! that collapses the values matched by its right-hand side into the value of
//! its left-hand side. Building a [`Grammar`] compiles the rules into an
//! LR(0) shift/reduce automaton with precomputed ACTION and GOTO tables;
//! [`Grammar::parse`] then drives the tables over a token stream, running the
//! folds in reduction order and returning the single remaining value.
//!
//! The [`expand`] module provides higher-level rule constructors (operator
//! precedence cascades, list shapes, optional tails) that expand into plain
//! rules.

mod dfa;
pub mod expand;
mod grammar;
mod parser;
pub mod token;

pub use crate::{
    grammar::{Builder, Fold, Grammar, GrammarError, Rule, SemanticValue},
    parser::ParseError,
    token::{Location, Token, TokenKind},
};

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub(crate) type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub(crate) type Set<T> = indexmap::IndexSet<T, BuildHasher>;
