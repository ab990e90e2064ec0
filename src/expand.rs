//! Rule expanders.
//!
//! Pure functions from a shape description to the rule fragment implementing
//! it. The produced rules plug into [`Builder::rules`](crate::Builder::rules);
//! auxiliary nonterminals are derived from the root name (`{root}Op{prio}`,
//! `{root}Els`), so roots must be chosen not to collide with them.

use crate::{grammar::Rule, Map};

/// Operator associativity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
}

/// One operator of a precedence cascade.
#[derive(Debug, Clone)]
pub struct Operator {
    pub priority: u32,
    pub assoc: Assoc,
    /// Terminal symbols forming the operator, in match order.
    pub symbols: Vec<String>,
}

impl Operator {
    /// An operator written with the given lexemes. Bare lexemes are turned
    /// into literal terminals (`"+"` becomes `&+`); explicit `_`/`&`
    /// spellings pass through.
    pub fn new<I>(priority: u32, assoc: Assoc, symbols: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            priority,
            assoc,
            symbols: symbols
                .into_iter()
                .map(|symbol| terminal_symbol(symbol.into()))
                .collect(),
        }
    }

    /// Canonical name: the symbols with their `&` prefixes stripped,
    /// concatenated.
    fn name(&self) -> String {
        self.symbols
            .iter()
            .map(|symbol| symbol.strip_prefix('&').unwrap_or(symbol))
            .collect()
    }
}

/// Spell a lexeme as a terminal symbol, leaving explicit `_`/`&` spellings
/// untouched.
fn terminal_symbol(lexeme: String) -> String {
    if lexeme.starts_with(['_', '&']) {
        lexeme
    } else {
        format!("&{}", lexeme)
    }
}

/// Expand an operator-precedence cascade rooted at `root` over `leaf`
/// operands.
///
/// Priorities ascend from loosest- to tightest-binding; each level `p` gets
/// the nonterminal `{root}Op{p}` threading into the next. A left-associative
/// operator recurses on its left operand, a right-associative one on its
/// right, a non-associative one on neither. `apply` receives the canonical
/// operator name plus the leftmost and rightmost operand values.
pub fn operator_rules<V, F>(root: &str, leaf: &str, operators: &[Operator], apply: F) -> Vec<Rule<V>>
where
    F: Fn(&str, V, V) -> V + Clone + Send + Sync + 'static,
{
    assert!(
        !operators.is_empty(),
        "operator cascade needs at least one operator"
    );

    let mut levels: Map<u32, Vec<&Operator>> = Map::default();
    for operator in operators {
        levels.entry(operator.priority).or_default().push(operator);
    }
    levels.sort_keys();

    let outermost = format!("{}Op{}", root, levels.keys().next().unwrap());
    let mut rules = vec![Rule::new(root, [outermost], |mut args| args.remove(0))];

    for (index, (priority, level)) in levels.iter().enumerate() {
        let current = format!("{}Op{}", root, priority);
        let next = match levels.get_index(index + 1) {
            Some((priority, _)) => format!("{}Op{}", root, priority),
            None => leaf.to_owned(),
        };

        for operator in level {
            let mut rhs = Vec::with_capacity(operator.symbols.len() + 2);
            rhs.push(match operator.assoc {
                Assoc::Left => current.clone(),
                _ => next.clone(),
            });
            rhs.extend(operator.symbols.iter().cloned());
            rhs.push(match operator.assoc {
                Assoc::Right => current.clone(),
                _ => next.clone(),
            });

            let name = operator.name();
            let apply = apply.clone();
            rules.push(Rule::new(current.as_str(), rhs, move |mut args| {
                let right = args.pop().expect("operator rule has operands");
                let left = args.remove(0);
                apply(&name, left, right)
            }));
        }

        rules.push(Rule::new(current.as_str(), [next], |mut args| args.remove(0)));
    }
    rules
}

/// Expand a list shape rooted at `root` over `leaf` elements, with optional
/// brackets and separator.
///
/// `make` builds the list value from its elements and `split` is its
/// inverse, used to reopen the accumulated value when appending the next
/// element. When `can_be_empty` is set (and brackets are present), the bare
/// bracket pair produces `make(vec![])`. Bracket and separator lexemes
/// follow the same spelling rules as [`Operator::new`].
#[allow(clippy::too_many_arguments)]
pub fn list_rules<V, F, G>(
    root: &str,
    leaf: &str,
    brackets: Option<(&str, &str)>,
    separator: Option<&str>,
    can_be_empty: bool,
    make: F,
    split: G,
) -> Vec<Rule<V>>
where
    F: Fn(Vec<V>) -> V + Clone + Send + Sync + 'static,
    G: Fn(V) -> Vec<V> + Clone + Send + Sync + 'static,
{
    let elements = format!("{}Els", root);
    let brackets =
        brackets.map(|(left, right)| (terminal_symbol(left.into()), terminal_symbol(right.into())));
    let separator = separator.map(|lexeme| terminal_symbol(lexeme.into()));

    let mut rules = Vec::new();
    match &brackets {
        Some((left, right)) => {
            rules.push(Rule::new(
                root,
                [left.clone(), elements.clone(), right.clone()],
                |mut args| args.remove(1),
            ));
            if can_be_empty {
                let make = make.clone();
                rules.push(Rule::new(root, [left.clone(), right.clone()], move |_| {
                    make(Vec::new())
                }));
            }
        }
        None => {
            rules.push(Rule::new(root, [elements.clone()], |mut args| args.remove(0)));
        }
    }

    {
        let make = make.clone();
        rules.push(Rule::new(elements.as_str(), [leaf], move |items| make(items)));
    }

    let rhs = match &separator {
        Some(separator) => vec![elements.clone(), separator.clone(), leaf.to_owned()],
        None => vec![elements.clone(), leaf.to_owned()],
    };
    rules.push(Rule::new(elements.as_str(), rhs, move |mut args| {
        let item = args.pop().expect("list rule has a trailing element");
        let mut items = split(args.remove(0));
        items.push(item);
        make(items)
    }));

    rules
}

/// Expand a sequence with an optional tail.
///
/// Emits two rules for `lhs`: one matching `head` alone (the fold sees
/// `None`) and one matching `head` followed by `tail` (the fold sees the
/// tail values).
pub fn with_optional_tail<V, F>(lhs: &str, head: &[&str], tail: &[&str], fold: F) -> Vec<Rule<V>>
where
    F: Fn(Vec<V>, Option<Vec<V>>) -> V + Clone + Send + Sync + 'static,
{
    let head_len = head.len();
    let short = {
        let fold = fold.clone();
        Rule::new(lhs, head.iter().copied(), move |args| fold(args, None))
    };
    let long = Rule::new(lhs, head.iter().chain(tail).copied(), move |mut args| {
        let tail = args.split_off(head_len);
        fold(args, Some(tail))
    });
    vec![short, long]
}
