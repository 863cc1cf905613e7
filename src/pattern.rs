//! Grammar patterns: a small expression tree that compiles to constraints
//! over a window of cells (spec §4.4).

use crate::cell::EntropyCell;
use crate::field::EntropyField;
use crate::ids::{CellId, StateId};
use crate::state::EntropyState;
use crate::token::{Token, TokenKind};
use once_cell::unsync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A tagged grammar expression (spec §3, "Pattern"). Patterns are immutable
/// once built; a [PatternRegistry] resolves [Pattern::Reference] by name.
#[derive(Clone)]
pub enum Pattern {
    TokenMatch { kind: TokenKind, literal: Option<String> },
    Sequence(Vec<Rc<Pattern>>),
    Choice(Vec<Rc<Pattern>>),
    Optional(Rc<Pattern>),
    Repeat(Rc<Pattern>),
    RepeatOne(Rc<Pattern>),
    Reference(String),
}

/// Bundles the read-only views a pattern match needs: the field being
/// inspected plus the token buffer and source bytes backing its token-kind
/// states. Borrowed for the lifetime of one validator invocation.
pub struct MatchContext<'a> {
    pub field: &'a EntropyField,
    pub tokens: &'a [Token],
    pub source: &'a [u8],
}

impl Pattern {
    /// Every way `self` can consume a prefix of `cells[start..]`, returned as
    /// `(end, states)` pairs where `states[i]` is the surviving state chosen
    /// for `cells[start + i]`. Greedy combinators (`repeat`/`repeat_one`)
    /// still enumerate every reachable end position, not just the longest,
    /// since a shorter match may be the one a sibling pattern needs.
    pub fn match_prefix(
        &self,
        cells: &[CellId],
        start: usize,
        ctx: &MatchContext,
        registry: &PatternRegistry,
    ) -> Vec<(usize, Vec<StateId>)> {
        match self {
            Pattern::TokenMatch { kind, literal } => {
                if start >= cells.len() {
                    return Vec::new();
                }
                let cell = ctx.field.cell(cells[start]);
                cell.live_states()
                    .filter(|s| state_matches(s, *kind, literal.as_deref(), ctx))
                    .map(|s| (start + 1, vec![s.id]))
                    .collect()
            }
            Pattern::Sequence(children) => {
                let mut frontier = vec![(start, Vec::new())];
                for child in children {
                    let mut next = Vec::new();
                    for (pos, states) in &frontier {
                        for (end, child_states) in child.match_prefix(cells, *pos, ctx, registry) {
                            let mut combined = states.clone();
                            combined.extend(child_states);
                            next.push((end, combined));
                        }
                    }
                    frontier = next;
                    if frontier.is_empty() {
                        break;
                    }
                }
                frontier
            }
            Pattern::Choice(children) => children
                .iter()
                .flat_map(|c| c.match_prefix(cells, start, ctx, registry))
                .collect(),
            Pattern::Optional(child) => {
                let mut results = vec![(start, Vec::new())];
                results.extend(child.match_prefix(cells, start, ctx, registry));
                results
            }
            Pattern::Repeat(child) => repeat_prefix(child, cells, start, ctx, registry, false),
            Pattern::RepeatOne(child) => repeat_prefix(child, cells, start, ctx, registry, true),
            Pattern::Reference(name) => match registry.get(name) {
                Some(p) => p.match_prefix(cells, start, ctx, registry),
                None => Vec::new(),
            },
        }
    }
}

fn repeat_prefix(
    child: &Rc<Pattern>,
    cells: &[CellId],
    start: usize,
    ctx: &MatchContext,
    registry: &PatternRegistry,
    require_one: bool,
) -> Vec<(usize, Vec<StateId>)> {
    let mut results = Vec::new();
    if !require_one {
        results.push((start, Vec::new()));
    }
    let mut frontier = vec![(start, Vec::new())];
    let mut seen = HashSet::new();
    seen.insert(start);

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for (pos, states) in &frontier {
            for (end, child_states) in child.match_prefix(cells, *pos, ctx, registry) {
                if end == *pos {
                    continue; // a zero-width match would loop forever
                }
                let mut combined = states.clone();
                combined.extend(child_states);
                results.push((end, combined.clone()));
                if seen.insert(end) {
                    next.push((end, combined));
                }
            }
        }
        frontier = next;
    }
    results
}

fn state_matches(state: &EntropyState, kind: TokenKind, literal: Option<&str>, ctx: &MatchContext) -> bool {
    let token_idx = match state.token_index {
        Some(idx) => idx,
        None => return false,
    };
    let token = match ctx.tokens.get(token_idx) {
        Some(t) => t,
        None => return false,
    };
    if state.interpreted_kind.unwrap_or(token.kind) != kind {
        return false;
    }
    match literal {
        Some(expected) => token.slice(ctx.source) == expected.as_bytes(),
        None => true,
    }
}

/// Process-scoped, write-once-before-use table of named grammar patterns
/// (spec §4.4, §6 "Pattern registry"). Mirrors the teacher's
/// `OnceCell`-backed immutable-after-setup production fields.
#[derive(Default)]
pub struct PatternRegistry {
    patterns: OnceCell<HashMap<String, Rc<Pattern>>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default table covering the grammar named in spec §4.4.
    pub fn standard() -> Self {
        let registry = Self::new();
        registry.install(standard_patterns());
        registry
    }

    /// Installs the registry's pattern table. May be called at most once;
    /// a second call indicates a field was already seeded against the
    /// previous table and is a programming error, not a recoverable one.
    pub fn install(&self, patterns: HashMap<String, Rc<Pattern>>) {
        self.patterns
            .set(patterns)
            .unwrap_or_else(|_| panic!("pattern registry already initialised"));
    }

    /// Register one additional named pattern before the registry is
    /// installed, for callers building a table incrementally.
    pub fn get(&self, name: &str) -> Option<Rc<Pattern>> {
        self.patterns.get().and_then(|table| table.get(name).cloned())
    }

    pub fn names(&self) -> Vec<&str> {
        self.patterns
            .get()
            .map(|table| table.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

fn kw(word: &str) -> Rc<Pattern> {
    Rc::new(Pattern::TokenMatch {
        kind: TokenKind::Keyword,
        literal: Some(word.to_string()),
    })
}

fn punct(ch: &str) -> Rc<Pattern> {
    Rc::new(Pattern::TokenMatch {
        kind: TokenKind::Punctuation,
        literal: Some(ch.to_string()),
    })
}

fn op(sym: &str) -> Rc<Pattern> {
    Rc::new(Pattern::TokenMatch {
        kind: TokenKind::Operator,
        literal: Some(sym.to_string()),
    })
}

fn ident() -> Rc<Pattern> {
    Rc::new(Pattern::TokenMatch { kind: TokenKind::Identifier, literal: None })
}

fn eof() -> Rc<Pattern> {
    Rc::new(Pattern::TokenMatch { kind: TokenKind::EndOfInput, literal: None })
}

fn reference(name: &str) -> Rc<Pattern> {
    Rc::new(Pattern::Reference(name.to_string()))
}

fn seq(children: Vec<Rc<Pattern>>) -> Rc<Pattern> {
    Rc::new(Pattern::Sequence(children))
}

fn choice(children: Vec<Rc<Pattern>>) -> Rc<Pattern> {
    Rc::new(Pattern::Choice(children))
}

fn optional(p: Rc<Pattern>) -> Rc<Pattern> {
    Rc::new(Pattern::Optional(p))
}

fn repeat(p: Rc<Pattern>) -> Rc<Pattern> {
    Rc::new(Pattern::Repeat(p))
}

/// Builds the grammar named in spec §4.4. Deliberately a plain, readable
/// recursive-descent shaped grammar rather than an exhaustive one: the WFC
/// driver only needs enough structure to exercise pattern-match validators
/// end to end.
fn standard_patterns() -> HashMap<String, Rc<Pattern>> {
    let mut table: HashMap<String, Rc<Pattern>> = HashMap::new();
    let mut put = |name: &str, pattern: Rc<Pattern>| {
        table.insert(name.to_string(), pattern);
    };

    put(
        "literal",
        choice(vec![
            Rc::new(Pattern::TokenMatch { kind: TokenKind::IntegerLiteral, literal: None }),
            Rc::new(Pattern::TokenMatch { kind: TokenKind::FloatLiteral, literal: None }),
            Rc::new(Pattern::TokenMatch { kind: TokenKind::StringLiteral, literal: None }),
            Rc::new(Pattern::TokenMatch { kind: TokenKind::CharLiteral, literal: None }),
            kw("true"),
            kw("false"),
            kw("null"),
        ]),
    );

    put(
        "type",
        choice(vec![
            kw("int"),
            kw("float"),
            kw("bool"),
            kw("string"),
            kw("char"),
            ident(),
        ]),
    );

    put(
        "primary",
        choice(vec![
            reference("literal"),
            ident(),
            seq(vec![punct("("), reference("expression"), punct(")")]),
        ]),
    );

    put(
        "unary",
        choice(vec![
            seq(vec![choice(vec![op("-"), op("!")]), reference("unary")]),
            reference("primary"),
        ]),
    );

    let binary_op = choice(vec![
        op("+"), op("-"), op("*"), op("/"), op("%"),
        op("=="), op("!="), op("<"), op(">"), op("<="), op(">="),
        op("&&"), op("||"),
    ]);
    put(
        "binary",
        seq(vec![
            reference("unary"),
            Rc::new(Pattern::Repeat(seq(vec![binary_op, reference("unary")]))),
        ]),
    );

    put("expression", reference("binary"));

    let parameter = seq(vec![ident(), reference("type")]);
    put(
        "parameter-list",
        seq(vec![
            punct("("),
            optional(seq(vec![
                parameter.clone(),
                Rc::new(Pattern::Repeat(seq(vec![punct(","), parameter]))),
            ])),
            punct(")"),
        ]),
    );

    put(
        "argument-list",
        seq(vec![
            punct("("),
            optional(seq(vec![
                reference("expression"),
                Rc::new(Pattern::Repeat(seq(vec![punct(","), reference("expression")]))),
            ])),
            punct(")"),
        ]),
    );

    put(
        "block",
        seq(vec![punct("{"), repeat(reference("statement")), punct("}")]),
    );

    put(
        "if",
        seq(vec![
            kw("if"),
            punct("("),
            reference("expression"),
            punct(")"),
            reference("block"),
            optional(seq(vec![kw("else"), reference("block")])),
        ]),
    );

    put(
        "while",
        seq(vec![
            kw("while"),
            punct("("),
            reference("expression"),
            punct(")"),
            reference("block"),
        ]),
    );

    put(
        "for",
        seq(vec![
            kw("for"),
            punct("("),
            reference("statement"),
            punct(";"),
            reference("expression"),
            punct(";"),
            reference("statement"),
            punct(")"),
            reference("block"),
        ]),
    );

    put(
        "return",
        seq(vec![kw("return"), optional(reference("expression")), punct(";")]),
    );

    put(
        "assignment",
        seq(vec![ident(), op("="), reference("expression"), punct(";")]),
    );

    put(
        "var-decl",
        seq(vec![
            kw("var"),
            ident(),
            reference("type"),
            optional(seq(vec![op("="), reference("expression")])),
            punct(";"),
        ]),
    );

    put(
        "collapse",
        seq(vec![kw("collapse"), punct("("), ident(), punct(")"), punct(";")]),
    );

    put(
        "superpose",
        seq(vec![kw("superpose"), punct("("), ident(), punct(")"), reference("block")]),
    );

    put(
        "periscope",
        seq(vec![kw("periscope"), punct("("), ident(), punct(")"), reference("block")]),
    );

    put(
        "statement",
        choice(vec![
            reference("if"),
            reference("while"),
            reference("for"),
            reference("return"),
            reference("collapse"),
            reference("superpose"),
            reference("periscope"),
            reference("var-decl"),
            reference("assignment"),
            reference("block"),
        ]),
    );

    put(
        "func-decl",
        seq(vec![
            choice(vec![kw("func"), kw("fn")]),
            ident(),
            reference("parameter-list"),
            optional(reference("type")),
            reference("block"),
        ]),
    );

    put(
        "region-decl",
        seq(vec![kw("region"), ident(), reference("block")]),
    );

    put(
        "regime-decl",
        seq(vec![
            kw("regime"),
            ident(),
            choice(vec![kw("fifo"), kw("filo"), kw("seq"), kw("rand")]),
            punct(";"),
        ]),
    );

    put(
        "declaration",
        choice(vec![
            reference("region-decl"),
            reference("regime-decl"),
            reference("func-decl"),
            reference("var-decl"),
        ]),
    );

    put(
        "program",
        seq(vec![
            repeat(choice(vec![
                reference("declaration"),
                reference("statement"),
                reference("expression"),
            ])),
            eof(),
        ]),
    );

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Code;
    use crate::scanner::Scanner;

    fn seeded_field<'c>(source: &'c str) -> (EntropyField, Vec<Token>, Code<'c>) {
        let code = Code::from(source);
        let tokens = Scanner::new().scan(&code);
        let mut field = EntropyField::new();
        for (i, token) in tokens.iter().enumerate() {
            let cell = field.add_cell(crate::position::Position::new(token.line, token.column, token.start));
            field.add_token_state(cell, format!("{}", token.kind), i, token.kind, 100);
        }
        (field, tokens, code)
    }

    #[test]
    fn token_match_accepts_single_identifier() {
        let (field, tokens, code) = seeded_field("x");
        let ctx = MatchContext { field: &field, tokens: &tokens, source: code.value };
        let registry = PatternRegistry::standard();
        let cells: Vec<CellId> = (0..1).map(CellId::from).collect();
        let pattern = ident();
        let results = pattern.match_prefix(&cells, 0, &ctx, &registry);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);
    }

    #[test]
    fn standard_registry_resolves_every_named_pattern() {
        let registry = PatternRegistry::standard();
        for name in [
            "program", "declaration", "region-decl", "regime-decl", "func-decl", "var-decl",
            "statement", "block", "expression", "return", "if", "while", "for", "collapse",
            "superpose", "periscope", "assignment", "type", "parameter-list", "argument-list",
            "binary", "unary", "primary", "literal",
        ] {
            assert!(registry.get(name).is_some(), "missing pattern: {name}");
        }
    }
}
