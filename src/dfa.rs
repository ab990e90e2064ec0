//! LR(0) automaton and table construction.

use crate::{
    grammar::{is_terminal, GrammarError, Rule},
    Map, Set,
};
use std::{collections::VecDeque, fmt};

/// Identifier of an interned automaton state.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct StateId(u32);

impl StateId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

/// An LR(0) item: a rule with a dot position, held as a structural copy of
/// the rule's symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Item {
    lhs: String,
    rhs: Vec<String>,
    dot: usize,
}

impl Item {
    fn start_of<V>(rule: &Rule<V>) -> Self {
        Self {
            lhs: rule.lhs.clone(),
            rhs: rule.rhs.clone(),
            dot: 0,
        }
    }

    fn end_of<V>(rule: &Rule<V>) -> Self {
        Self {
            lhs: rule.lhs.clone(),
            rhs: rule.rhs.clone(),
            dot: rule.rhs.len(),
        }
    }

    /// The symbol immediately after the dot, if the item is not complete.
    fn expected(&self) -> Option<&str> {
        self.rhs.get(self.dot).map(String::as_str)
    }

    fn advanced(&self) -> Self {
        Self {
            dot: self.dot + 1,
            ..self.clone()
        }
    }

    /// Canonical form, e.g. `Expr -> Expr * &+ Term;`. Two items are equal
    /// iff their canonical forms are.
    fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.lhs)?;
        for (i, symbol) in self.rhs.iter().enumerate() {
            if i == self.dot {
                write!(f, " *")?;
            }
            write!(f, " {}", symbol)?;
        }
        if self.dot == self.rhs.len() {
            write!(f, " *")?;
        }
        write!(f, ";")
    }
}

/// A state of the automaton: a closed item set plus its table row.
#[derive(Debug)]
struct State {
    /// Items sorted by canonical form.
    items: Vec<Item>,
    /// Canonical key: the sorted item forms joined by single spaces.
    key: String,
    /// ACTION row, keyed by terminal symbol.
    actions: Map<String, Action>,
    /// GOTO row, keyed by nonterminal symbol.
    gotos: Map<String, StateId>,
}

impl State {
    fn contains(&self, canonical: &str) -> bool {
        self.items.iter().any(|item| item.canonical() == canonical)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Shift(StateId),
    Reduce(usize),
    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(next) => write!(f, "shift({:?})", next),
            Self::Reduce(rule) => write!(f, "reduce({})", rule),
            Self::Accept => f.write_str("accept"),
        }
    }
}

/// The compiled ACTION/GOTO tables. States are interned by canonical key;
/// rows live with their states.
#[derive(Debug)]
pub(crate) struct Automaton {
    states: Vec<State>,
    initial: StateId,
}

impl Automaton {
    /// Build the goto graph and fill the tables for `rules`. Rule 0 is the
    /// augmented start.
    #[tracing::instrument(skip_all)]
    pub(crate) fn build<V>(rules: &[Rule<V>]) -> Result<Self, GrammarError> {
        let accepting = Item::end_of(&rules[0]).canonical();

        let mut states: Vec<State> = Vec::new();
        let mut interned: Map<String, StateId> = Map::default();

        let seed = close(rules, vec![Item::start_of(&rules[0])]);
        let (initial, _) = intern(&mut states, &mut interned, seed);

        let mut pending = VecDeque::from([initial]);
        while let Some(current) = pending.pop_front() {
            let items = states[current.index()].items.clone();

            // Symbols immediately after a dot, in item order.
            let mut symbols: Set<&str> = Set::default();
            for item in &items {
                symbols.extend(item.expected());
            }

            for symbol in symbols {
                let seed = items
                    .iter()
                    .filter(|item| item.expected() == Some(symbol))
                    .map(Item::advanced)
                    .collect();
                let successor = close(rules, seed);
                let (next, is_new) = intern(&mut states, &mut interned, successor);

                if is_terminal(symbol) {
                    states[current.index()]
                        .actions
                        .insert(symbol.to_owned(), Action::Shift(next));
                } else {
                    states[current.index()].gotos.insert(symbol.to_owned(), next);
                }

                if is_new {
                    if states[next.index()].contains(&accepting) {
                        states[next.index()]
                            .actions
                            .insert("_EOF".to_owned(), Action::Accept);
                    }
                    pending.push_back(next);
                }
            }
        }
        tracing::debug!(states = states.len(), "goto graph complete");

        fill_reduces(rules, &mut states)?;

        Ok(Self { states, initial })
    }

    pub(crate) fn initial(&self) -> StateId {
        self.initial
    }

    pub(crate) fn action(&self, state: StateId, symbol: &str) -> Option<Action> {
        self.states[state.index()].actions.get(symbol).copied()
    }

    pub(crate) fn goto(&self, state: StateId, symbol: &str) -> Option<StateId> {
        self.states[state.index()].gotos.get(symbol).copied()
    }

    /// The terminal columns for which `state` has some ACTION entry, in
    /// insertion order.
    pub(crate) fn expected_in(&self, state: StateId) -> impl Iterator<Item = &str> + '_ {
        self.states[state.index()].actions.keys().map(String::as_str)
    }

    /// The lexemes of every literal terminal appearing as an ACTION column.
    pub(crate) fn keywords(&self) -> Set<String> {
        let mut keywords = Set::default();
        for state in &self.states {
            for column in state.actions.keys() {
                if let Some(lexeme) = column.strip_prefix('&') {
                    keywords.insert(lexeme.to_owned());
                }
            }
        }
        keywords
    }
}

impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, state) in self.states.iter().enumerate() {
            writeln!(f, "- {:?}:", StateId(index as u32))?;
            writeln!(f, "  items:")?;
            for item in &state.items {
                writeln!(f, "  - {}", item)?;
            }
            if !state.actions.is_empty() {
                writeln!(f, "  actions:")?;
                for (symbol, action) in &state.actions {
                    writeln!(f, "  - {} => {}", symbol, action)?;
                }
            }
            if !state.gotos.is_empty() {
                writeln!(f, "  gotos:")?;
                for (symbol, next) in &state.gotos {
                    writeln!(f, "  - {} => {:?}", symbol, next)?;
                }
            }
        }
        Ok(())
    }
}

/// LR(0) closure: extend the set with a fresh dot-at-start item for every
/// rule producing a nonterminal that sits immediately after a dot,
/// deduplicating by canonical form, until nothing new is added.
fn close<V>(rules: &[Rule<V>], seed: Vec<Item>) -> Vec<Item> {
    let mut known: Set<String> = seed.iter().map(Item::canonical).collect();
    let mut queue: VecDeque<Item> = seed.into();
    let mut items = Vec::new();

    while let Some(item) = queue.pop_front() {
        if let Some(symbol) = item.expected() {
            for rule in rules.iter().filter(|rule| rule.lhs == symbol) {
                let fresh = Item::start_of(rule);
                if known.insert(fresh.canonical()) {
                    queue.push_back(fresh);
                }
            }
        }
        items.push(item);
    }
    items
}

/// Intern a closed item set, returning its id and whether it is new. The
/// canonical key is order-insensitive: items are sorted before joining.
fn intern(
    states: &mut Vec<State>,
    interned: &mut Map<String, StateId>,
    mut items: Vec<Item>,
) -> (StateId, bool) {
    items.sort_by_cached_key(Item::canonical);
    let key = items
        .iter()
        .map(Item::canonical)
        .collect::<Vec<_>>()
        .join(" ");

    if let Some(&id) = interned.get(&key) {
        return (id, false);
    }

    let id = StateId(states.len() as u32);
    tracing::trace!(state = ?id, %key, "new state");
    interned.insert(key.clone(), id);
    states.push(State {
        items,
        key,
        actions: Map::default(),
        gotos: Map::default(),
    });
    (id, true)
}

/// Populate reduce cells: for every state containing the completed item of a
/// non-start rule, write `Reduce` into every currently empty ACTION cell of
/// a seen terminal. An occupying shift wins silently; an occupying non-shift
/// action is a fatal reduce/reduce conflict.
fn fill_reduces<V>(rules: &[Rule<V>], states: &mut [State]) -> Result<(), GrammarError> {
    // Every terminal column with an ACTION entry anywhere in the graph.
    let mut terminals: Set<String> = Set::default();
    for state in states.iter() {
        terminals.extend(state.actions.keys().cloned());
    }

    let completed: Vec<(usize, String)> = rules
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, rule)| (index, Item::end_of(rule).canonical()))
        .collect();

    for state in states.iter_mut() {
        for (rule, item) in &completed {
            if !state.contains(item) {
                continue;
            }
            for terminal in &terminals {
                match state.actions.get(terminal) {
                    None => {
                        state.actions.insert(terminal.clone(), Action::Reduce(*rule));
                    }
                    Some(Action::Shift(_)) => {}
                    Some(occupied) => {
                        return Err(GrammarError::ReduceReduceConflict {
                            state: state.key.clone(),
                            terminal: terminal.clone(),
                            occupied: occupied.to_string(),
                            rule: *rule,
                        });
                    }
                }
            }
        }
    }
    Ok(())
}
