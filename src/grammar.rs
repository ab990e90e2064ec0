//! Grammar types.

use crate::{
    dfa::Automaton,
    token::{Location, Token},
    Set,
};
use std::{fmt, mem};

/// A semantic value produced and consumed by reduction folds.
///
/// The engine is generic over the value type: every shifted token is lifted
/// via [`from_token`](Self::from_token), and every fold maps the values
/// matched by a rule's right-hand side onto the value of its left-hand side.
///
/// The location hooks are optional. When a fold result is pushed, the
/// location of the leftmost argument that has one is stamped onto it via
/// [`set_location`](Self::set_location); the default no-op implementations
/// opt out of this enrichment entirely.
pub trait SemanticValue: Sized {
    /// Lift a shifted token into a semantic value.
    fn from_token(token: Token) -> Self;

    /// The source location carried by this value, if any.
    fn location(&self) -> Option<Location> {
        None
    }

    /// Attach a source location to this value.
    fn set_location(&mut self, _location: Location) {}
}

/// The fold attached to a rule.
///
/// Called with exactly one value per right-hand-side symbol, in matched
/// order. `Send + Sync` so a built [`Grammar`] can be shared across
/// concurrent parses.
pub type Fold<V> = Box<dyn Fn(Vec<V>) -> V + Send + Sync>;

/// Terminal symbols are spelled with a `_` prefix (lexical classes such as
/// `_NUM`) or a `&` prefix (literal lexemes such as `&+`); every other name
/// is a nonterminal. This prefix discipline is the sole terminal distinction
/// the table builder relies on.
pub(crate) fn is_terminal(symbol: &str) -> bool {
    matches!(symbol.as_bytes().first(), Some(b'_') | Some(b'&'))
}

/// A context-free rule with its semantic fold.
pub struct Rule<V> {
    pub(crate) lhs: String,
    pub(crate) rhs: Vec<String>,
    pub(crate) fold: Fold<V>,
}

impl<V> Rule<V> {
    /// Construct a rule from its structural parts.
    pub fn new<L, I, F>(lhs: L, rhs: I, fold: F) -> Self
    where
        L: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
        F: Fn(Vec<V>) -> V + Send + Sync + 'static,
    {
        Self {
            lhs: lhs.into(),
            rhs: rhs.into_iter().map(Into::into).collect(),
            fold: Box::new(fold),
        }
    }

    /// Construct a rule from its textual form, e.g.
    /// `AddExpr -> AddExpr "+" MulExpr`.
    ///
    /// The right-hand side is whitespace-separated. A double-quoted word is a
    /// literal terminal (`"+"` becomes `&+`); the words `integer`,
    /// `identifier`, `string`, `EOL` and `EOF` name the corresponding lexical
    /// classes; anything else is taken verbatim, so explicit `_NUM` or `&+`
    /// spellings also work. An empty right-hand side is permitted.
    pub fn parse<F>(text: &str, fold: F) -> Result<Self, GrammarError>
    where
        F: Fn(Vec<V>) -> V + Send + Sync + 'static,
    {
        let malformed = |reason| GrammarError::RuleSyntax {
            text: text.to_owned(),
            reason,
        };

        let (lhs, rhs_text) = text.split_once("->").ok_or_else(|| malformed("missing `->`"))?;
        let lhs = lhs.trim();
        if lhs.is_empty() {
            return Err(malformed("empty left-hand side"));
        }
        if lhs.split_whitespace().nth(1).is_some() {
            return Err(malformed("left-hand side must be a single symbol"));
        }

        let mut rhs = Vec::new();
        for word in rhs_text.split_whitespace() {
            let symbol = if let Some(rest) = word.strip_prefix('"') {
                let lexeme = rest
                    .strip_suffix('"')
                    .filter(|lexeme| !lexeme.is_empty())
                    .ok_or_else(|| malformed("malformed quoted literal"))?;
                format!("&{}", lexeme)
            } else {
                match word {
                    "integer" => "_NUM".to_owned(),
                    "identifier" => "_ID".to_owned(),
                    "string" => "_STR".to_owned(),
                    "EOL" => "_EOL".to_owned(),
                    "EOF" => "_EOF".to_owned(),
                    other => other.to_owned(),
                }
            };
            rhs.push(symbol);
        }

        Ok(Self::new(lhs, rhs, fold))
    }

    /// The left-hand nonterminal.
    pub fn lhs(&self) -> &str {
        &self.lhs
    }

    /// The right-hand symbol sequence.
    pub fn rhs(&self) -> &[String] {
        &self.rhs
    }
}

impl<V> fmt::Display for Rule<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.lhs)?;
        for symbol in &self.rhs {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

impl<V> fmt::Debug for Rule<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule({})", self)
    }
}

/// A grammar construction failure. These are programming errors in the
/// grammar; there is no recovery path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("malformed rule `{text}`: {reason}")]
    RuleSyntax { text: String, reason: &'static str },

    #[error("grammar has no rules")]
    Empty,

    #[error("reserved terminal name `{name}` used as a rule left-hand side")]
    ReservedLhs { name: String },

    #[error("symbol `{name}` in rule `{rule}` is neither a terminal nor produced by any rule")]
    UnknownSymbol { name: String, rule: String },

    #[error("reduce/reduce conflict on `{terminal}` in state `{state}`: {occupied} vs reduce({rule})")]
    ReduceReduceConflict {
        /// Canonical key of the conflicting state.
        state: String,
        /// The terminal column both actions claim.
        terminal: String,
        /// The action already occupying the cell, rendered.
        occupied: String,
        /// Index of the rule whose reduction lost.
        rule: usize,
    },
}

/// A compiled grammar: the rule list plus the LR(0) ACTION/GOTO tables
/// driven by [`parse`](Grammar::parse).
///
/// Immutable after construction; shareable across concurrent parses.
pub struct Grammar<V> {
    pub(crate) rules: Vec<Rule<V>>,
    pub(crate) automaton: Automaton,
    /// Lexemes of the literal terminals, for keyword classification.
    pub(crate) keywords: Set<String>,
}

impl<V> Grammar<V> {
    pub fn builder() -> Builder<V> {
        Builder::default()
    }

    /// The rules of the grammar, in registration order. Rule 0 is the
    /// augmented start.
    pub fn rules(&self) -> impl Iterator<Item = &Rule<V>> + '_ {
        self.rules.iter()
    }

    /// A listing of the constructed automaton (states with their items and
    /// transitions), for debugging grammars.
    pub fn dump_automaton(&self) -> impl fmt::Display + '_ {
        &self.automaton
    }
}

impl<V> fmt::Debug for Grammar<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl<V> fmt::Display for Grammar<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rules:")?;
        for (index, rule) in self.rules.iter().enumerate() {
            writeln!(f, "  [{:02}] {}", index, rule)?;
        }
        Ok(())
    }
}

/// A builder object for [`Grammar`].
pub struct Builder<V> {
    rules: Vec<Rule<V>>,
}

impl<V> Default for Builder<V> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<V> Builder<V> {
    /// Register a single rule. The first registered rule is the augmented
    /// start; its right-hand side is the top-level goal.
    pub fn rule(&mut self, rule: Rule<V>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Register a batch of rules, e.g. the output of a rule expander.
    pub fn rules<I>(&mut self, rules: I) -> &mut Self
    where
        I: IntoIterator<Item = Rule<V>>,
    {
        self.rules.extend(rules);
        self
    }

    /// Compile the registered rules into ACTION/GOTO tables.
    ///
    /// Fails on an empty grammar, a reserved left-hand side, an unknown
    /// right-hand symbol, or a reduce/reduce conflict.
    pub fn build(&mut self) -> Result<Grammar<V>, GrammarError> {
        let Self { rules } = mem::take(self);

        if rules.is_empty() {
            return Err(GrammarError::Empty);
        }
        for rule in &rules {
            if is_terminal(&rule.lhs) {
                return Err(GrammarError::ReservedLhs {
                    name: rule.lhs.clone(),
                });
            }
            for symbol in &rule.rhs {
                if !is_terminal(symbol) && !rules.iter().any(|other| other.lhs == *symbol) {
                    return Err(GrammarError::UnknownSymbol {
                        name: symbol.clone(),
                        rule: rule.to_string(),
                    });
                }
            }
        }

        let automaton = Automaton::build(&rules)?;
        let keywords = automaton.keywords();

        Ok(Grammar {
            rules,
            automaton,
            keywords,
        })
    }
}
