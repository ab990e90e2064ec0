//! The table-driven parse engine.

use crate::{
    dfa::Action,
    grammar::{Grammar, SemanticValue},
    token::{Location, Token, TokenKind},
};

/// A syntax error produced by [`Grammar::parse`]. The offending token is not
/// consumed; the expected set lists the terminals the current state had
/// ACTION entries for, already rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected {} at {location}", render_expected(.expected))]
    Unexpected {
        expected: Vec<String>,
        location: Location,
    },

    #[error("no expected symbol")]
    NoExpected,
}

fn render_expected(expected: &[String]) -> String {
    match expected {
        [single] => single.clone(),
        many => format!("one of {}", many.join(", ")),
    }
}

fn render_terminal(terminal: &str) -> String {
    match terminal {
        "_ID" => "identifier".to_owned(),
        "_NUM" => "number".to_owned(),
        "_STR" => "string".to_owned(),
        "_EOF" => "EOF".to_owned(),
        "_EOL" => "EOL".to_owned(),
        other => match other.strip_prefix('&') {
            Some(lexeme) => format!("'{}'", lexeme),
            None => other.to_owned(),
        },
    }
}

impl<V: SemanticValue> Grammar<V> {
    /// Parse a token stream into a single semantic value.
    ///
    /// The stream must be finite and terminated by a single EOF token; the
    /// engine runs to acceptance or to the first failure.
    pub fn parse(&self, tokens: &[Token]) -> Result<V, ParseError> {
        let span = tracing::trace_span!("parse");
        let _enter = span.enter();

        let mut state_stack = vec![self.automaton.initial()];
        let mut result_stack: Vec<V> = Vec::new();
        let mut cursor = 0;

        loop {
            let token = tokens
                .get(cursor)
                .expect("token stream must be terminated by an EOF token");
            let symbol = self.classify(token);
            let current = *state_stack.last().expect("state stack underflow");

            match self.automaton.action(current, &symbol) {
                Some(Action::Shift(next)) => {
                    tracing::trace!(%symbol, from = ?current, to = ?next, "shift");
                    result_stack.push(V::from_token(token.clone()));
                    state_stack.push(next);
                    cursor += 1;
                }

                Some(Action::Reduce(index)) => {
                    let rule = &self.rules[index];
                    tracing::trace!(rule = %rule, "reduce");

                    let keep = rule.rhs.len();
                    let args = result_stack.split_off(result_stack.len() - keep);
                    state_stack.truncate(state_stack.len() - keep);

                    let location = args.iter().find_map(V::location);
                    let mut value = (rule.fold)(args);
                    if let Some(location) = location {
                        value.set_location(location);
                    }
                    result_stack.push(value);

                    let top = *state_stack.last().expect("state stack underflow");
                    let next = self
                        .automaton
                        .goto(top, &rule.lhs)
                        .expect("missing GOTO entry for a reduced nonterminal");
                    state_stack.push(next);
                }

                Some(Action::Accept) => {
                    tracing::trace!("accept");
                    debug_assert_eq!(result_stack.len(), self.rules[0].rhs.len());
                    debug_assert_eq!(state_stack.len(), result_stack.len() + 1);
                    return Ok(result_stack
                        .into_iter()
                        .next()
                        .expect("empty result stack at accept"));
                }

                None => {
                    let expected: Vec<String> = self
                        .automaton
                        .expected_in(current)
                        .map(render_terminal)
                        .collect();
                    tracing::trace!(%symbol, ?expected, "no action");
                    return Err(if expected.is_empty() {
                        ParseError::NoExpected
                    } else {
                        ParseError::Unexpected {
                            expected,
                            location: token.location,
                        }
                    });
                }
            }
        }
    }

    /// Map a token to the terminal symbol used as an ACTION column. A word
    /// is a literal terminal iff its lexeme matched some `&`-column at table
    /// build time; every other word is an identifier.
    fn classify(&self, token: &Token) -> String {
        match token.kind {
            TokenKind::Symbol => format!("&{}", token.form),
            TokenKind::Number => "_NUM".to_owned(),
            TokenKind::Str => "_STR".to_owned(),
            TokenKind::Eol => "_EOL".to_owned(),
            TokenKind::Eof => "_EOF".to_owned(),
            TokenKind::Word => {
                if self.keywords.contains(token.form.as_str()) {
                    format!("&{}", token.form)
                } else {
                    "_ID".to_owned()
                }
            }
        }
    }
}
