use lrfold::{
    expand::{self, Assoc, Operator},
    Grammar, GrammarError, Location, Rule, SemanticValue, Token, TokenKind,
};

/// The semantic value used across these tests: raw tokens, integers and
/// lists, plus a rendered form for associativity checks.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Token(Token),
    Int(i64),
    List(Vec<Value>),
    Rendered(String),
}

impl SemanticValue for Value {
    fn from_token(token: Token) -> Self {
        Self::Token(token)
    }

    fn location(&self) -> Option<Location> {
        match self {
            Self::Token(token) => Some(token.location),
            _ => None,
        }
    }
}

impl Value {
    fn int(&self) -> i64 {
        match self {
            Self::Token(token) => token.form.parse().expect("numeric token"),
            Self::Int(value) => *value,
            other => panic!("not an integer: {:?}", other),
        }
    }

    fn rendered(&self) -> String {
        match self {
            Self::Token(token) => token.form.clone(),
            Self::Rendered(text) => text.clone(),
            other => panic!("not renderable: {:?}", other),
        }
    }
}

/// A minimal test tokenizer: words, integers and single-character symbols,
/// terminated by EOF. Columns are 1-based byte offsets.
fn lex(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        let column = start as u32 + 1;
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            let mut form = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                form.push(c);
                chars.next();
            }
            tokens.push(Token::new(TokenKind::Number, form, Location::new(1, column)));
        } else if c.is_alphabetic() {
            let mut form = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !c.is_alphanumeric() {
                    break;
                }
                form.push(c);
                chars.next();
            }
            tokens.push(Token::new(TokenKind::Word, form, Location::new(1, column)));
        } else {
            chars.next();
            tokens.push(Token::new(
                TokenKind::Symbol,
                c.to_string(),
                Location::new(1, column),
            ));
        }
    }
    tokens.push(Token::eof(Location::new(1, input.len() as u32 + 1)));
    tokens
}

/// The arithmetic grammar of the rule-text front-end, folds computing
/// directly on integers.
fn arithmetic() -> Grammar<Value> {
    let first = |mut args: Vec<Value>| args.remove(0);
    Grammar::builder()
        .rule(Rule::parse("Init -> Expr", first).unwrap())
        .rule(Rule::parse(r#"Expr -> "expr" AddExpr"#, |mut args| args.remove(1)).unwrap())
        .rule(
            Rule::parse(r#"AddExpr -> AddExpr "+" MulExpr"#, |args: Vec<Value>| {
                Value::Int(args[0].int() + args[2].int())
            })
            .unwrap(),
        )
        .rule(
            Rule::parse(r#"AddExpr -> AddExpr "-" MulExpr"#, |args: Vec<Value>| {
                Value::Int(args[0].int() - args[2].int())
            })
            .unwrap(),
        )
        .rule(Rule::parse("AddExpr -> MulExpr", first).unwrap())
        .rule(
            Rule::parse(r#"MulExpr -> MulExpr "*" ConstExpr"#, |args: Vec<Value>| {
                Value::Int(args[0].int() * args[2].int())
            })
            .unwrap(),
        )
        .rule(
            Rule::parse(r#"MulExpr -> MulExpr "/" ConstExpr"#, |args: Vec<Value>| {
                Value::Int(args[0].int() / args[2].int())
            })
            .unwrap(),
        )
        .rule(Rule::parse("MulExpr -> ConstExpr", first).unwrap())
        .rule(Rule::parse("ConstExpr -> integer", |args: Vec<Value>| Value::Int(args[0].int())).unwrap())
        .build()
        .unwrap()
}

#[test]
fn arithmetic_with_precedence() {
    let grammar = arithmetic();
    let parsed = grammar.parse(&lex("expr 2+3*4")).unwrap();
    assert_eq!(parsed.int(), 14);
}

#[test]
fn subtraction_is_left_associative() {
    let grammar = arithmetic();
    let parsed = grammar.parse(&lex("expr 10-4-3")).unwrap();
    assert_eq!(parsed.int(), 3);
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let grammar = arithmetic();
    let parsed = grammar.parse(&lex("expr 1+2*3+4")).unwrap();
    assert_eq!(parsed.int(), 11);
}

#[test]
fn error_with_a_single_expectation() {
    let grammar = arithmetic();
    let err = grammar.parse(&lex("expr +")).unwrap_err();
    assert_eq!(err.to_string(), "expected number at line 1, column 6");
}

#[test]
fn trailing_token_after_a_complete_expression() {
    // The stray `2` drives the pending reductions to completion first, so
    // the failure surfaces in the accepting state.
    let grammar = arithmetic();
    let err = grammar.parse(&lex("expr 2 2")).unwrap_err();
    assert_eq!(err.to_string(), "expected EOF at line 1, column 8");
}

#[test]
fn error_with_multiple_expectations() {
    // `%` appears in no ACTION column, so the error reports every terminal
    // the current state has an entry for.
    let grammar = arithmetic();
    let err = grammar.parse(&lex("expr 2 % 3")).unwrap_err();
    match err {
        lrfold::ParseError::Unexpected { expected, location } => {
            let mut expected = expected;
            expected.sort_unstable();
            let mut wanted = vec!["'expr'", "number", "'+'", "'-'", "'*'", "'/'", "EOF"];
            wanted.sort_unstable();
            assert_eq!(expected, wanted);
            assert_eq!(location, Location::new(1, 8));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

fn list_grammar(can_be_empty: bool) -> Grammar<Value> {
    Grammar::builder()
        .rule(Rule::parse("Init -> Args", |mut args| args.remove(0)).unwrap())
        .rules(expand::list_rules(
            "Args",
            "ConstExpr",
            Some(("(", ")")),
            Some(","),
            can_be_empty,
            Value::List,
            |value| match value {
                Value::List(items) => items,
                other => panic!("not a list: {:?}", other),
            },
        ))
        .rule(Rule::parse("ConstExpr -> integer", |args: Vec<Value>| Value::Int(args[0].int())).unwrap())
        .build()
        .unwrap()
}

#[test]
fn list_expander_round_trip() {
    let grammar = list_grammar(true);

    let parsed = grammar.parse(&lex("( 1 , 2 , 3 )")).unwrap();
    assert_eq!(
        parsed,
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    let parsed = grammar.parse(&lex("( )")).unwrap();
    assert_eq!(parsed, Value::List(Vec::new()));

    grammar.parse(&lex("( 1 , )")).unwrap_err();
}

#[test]
fn non_empty_list_rejects_bare_brackets() {
    let grammar = list_grammar(false);
    grammar.parse(&lex("( )")).unwrap_err();
    grammar.parse(&lex("( 7 )")).unwrap();
}

fn cascade_grammar(operators: &[Operator]) -> Grammar<Value> {
    Grammar::builder()
        .rule(Rule::parse("Init -> Expr", |mut args| args.remove(0)).unwrap())
        .rules(expand::operator_rules(
            "Expr",
            "Leaf",
            operators,
            |name, left: Value, right| {
                Value::Rendered(format!("({}{}{})", left.rendered(), name, right.rendered()))
            },
        ))
        .rule(Rule::parse("Leaf -> integer", |mut args| args.remove(0)).unwrap())
        .build()
        .unwrap()
}

#[test]
fn cascade_left_associativity() {
    let operators = [
        Operator::new(1, Assoc::Left, ["+"]),
        Operator::new(2, Assoc::Left, ["*"]),
    ];
    let grammar = cascade_grammar(&operators);

    let parsed = grammar.parse(&lex("1+2+3")).unwrap();
    assert_eq!(parsed.rendered(), "((1+2)+3)");

    let parsed = grammar.parse(&lex("1+2*3+4")).unwrap();
    assert_eq!(parsed.rendered(), "((1+(2*3))+4)");
}

#[test]
fn cascade_right_associativity() {
    let operators = [Operator::new(1, Assoc::Right, ["^"])];
    let grammar = cascade_grammar(&operators);
    let parsed = grammar.parse(&lex("1^2^3")).unwrap();
    assert_eq!(parsed.rendered(), "(1^(2^3))");
}

#[test]
fn cascade_non_associative_operator_rejects_chains() {
    let operators = [Operator::new(1, Assoc::Nonassoc, ["="])];
    let grammar = cascade_grammar(&operators);

    let parsed = grammar.parse(&lex("1=2")).unwrap();
    assert_eq!(parsed.rendered(), "(1=2)");

    grammar.parse(&lex("1=2=3")).unwrap_err();
}

#[test]
fn reduce_reduce_conflicts_fail_construction() {
    let first = |mut args: Vec<Value>| args.remove(0);
    let err = Grammar::<Value>::builder()
        .rule(Rule::parse("S -> A", first).unwrap())
        .rule(Rule::parse("S -> B", first).unwrap())
        .rule(Rule::parse("A -> identifier", first).unwrap())
        .rule(Rule::parse("B -> identifier", first).unwrap())
        .build()
        .unwrap_err();
    match err {
        GrammarError::ReduceReduceConflict { terminal, .. } => {
            assert!(terminal.starts_with('_') || terminal.starts_with('&'));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn grammars_are_shareable_across_threads() {
    let grammar = std::sync::Arc::new(arithmetic());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let grammar = grammar.clone();
            std::thread::spawn(move || {
                let input = format!("expr {}+2*3", i);
                grammar.parse(&lex(&input)).unwrap().int()
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), i as i64 + 6);
    }
}

#[test]
fn traced_parse_runs_to_acceptance() {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .try_init()
        .ok();

    let grammar = arithmetic();
    let parsed = grammar.parse(&lex("expr 6/2-1")).unwrap();
    assert_eq!(parsed.int(), 2);
}
