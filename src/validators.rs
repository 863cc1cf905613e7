//! Built-in validators (spec §4.3): free functions returning the boxed
//! closures a [Constraint](crate::constraint::Constraint) runs each pass.
//! Every one of them only ever eliminates states; none creates or destroys
//! cells, states, or constraints (spec §5, "Aliasing discipline").

use crate::cell::EntropyCell;
use crate::constraint::{ValidatorFn, ValidatorOutcome};
use crate::field::EntropyField;
use crate::ids::{CellId, StateId};
use crate::pattern::{MatchContext, Pattern, PatternRegistry};
use crate::position::Position;
use crate::token::{Token, TokenKind};
use std::rc::Rc;

const DEFAULT_ADJACENCY_BOUND: usize = 200;
const EXTENDED_ADJACENCY_BOUND: usize = 500;
const ADJACENCY_EXTENDED_PUNCTUATION: &[&[u8]] = &[b";", b"}", b"{", b")"];

const COMPOUND_OPERATORS: &[&str] = &[
    "++", "--", "&&", "||", "==", "<=", ">=", "!=", "+=", "-=", "*=", "/=", "%=", "&=", "|=",
    "^=", "<<", ">>",
];

fn is_extended_bound_token(token: &Token, source: &[u8]) -> bool {
    token.kind == TokenKind::Punctuation
        && ADJACENCY_EXTENDED_PUNCTUATION.contains(&token.slice(source))
}

/// Eliminates any state in the first cell of a pair that has no
/// source-compatible successor in the second (spec §4.3, "Adjacency
/// validator"). `tokens`/`source` are the scanner's output buffer and the
/// source bytes it was scanned from, captured once at constraint-install time.
pub fn adjacency(tokens: Rc<Vec<Token>>, source: Rc<[u8]>) -> ValidatorFn {
    Rc::new(move |constraint, field| {
        assert_eq!(constraint.cells.len(), 2, "adjacency constraint expects exactly two cells");
        let cell_a = constraint.cells[0];
        let cell_b = constraint.cells[1];
        let last_token_index = tokens.len().saturating_sub(1);

        let mut to_eliminate = Vec::new();
        {
            let a = field.cell(cell_a);
            let b = field.cell(cell_b);
            for state_a in a.live_states() {
                let token_a_idx = match state_a.token_index {
                    Some(idx) => idx,
                    None => continue,
                };
                if token_a_idx == last_token_index {
                    continue; // the last token is exempt from the successor requirement
                }
                let token_a = &tokens[token_a_idx];
                let bound_a = if is_extended_bound_token(token_a, &source) {
                    EXTENDED_ADJACENCY_BOUND
                } else {
                    DEFAULT_ADJACENCY_BOUND
                };

                let has_successor = b.live_states().any(|state_b| {
                    let token_b_idx = match state_b.token_index {
                        Some(idx) => idx,
                        None => return false,
                    };
                    let token_b = &tokens[token_b_idx];
                    if token_b.start < token_a.end {
                        return false;
                    }
                    let gap = token_b.start - token_a.end;
                    let bound = if is_extended_bound_token(token_b, &source) {
                        bound_a.max(EXTENDED_ADJACENCY_BOUND)
                    } else {
                        bound_a
                    };
                    gap <= bound
                });

                if !has_successor {
                    to_eliminate.push(state_a.id);
                }
            }
        }

        apply_eliminations(field, cell_a, &to_eliminate, &[cell_a, cell_b])
    })
}

/// Requires a strictly increasing source position (by line, then byte offset
/// within a line) across an ordered cell triple (spec §4.3, "Sequence
/// validator"). `strict` resolves the Design Notes open question: when false
/// (the default), an out-of-order triple is only a hard failure once every
/// cell in it has collapsed; when true, any triple lacking an order-preserving
/// assignment is a hard failure immediately.
pub fn sequence(strict: bool) -> ValidatorFn {
    Rc::new(move |constraint, field| {
        assert_eq!(constraint.cells.len(), 3, "sequence constraint expects exactly three cells");
        let (a, b, c) = (constraint.cells[0], constraint.cells[1], constraint.cells[2]);

        let ordered = position_precedes(field.cell(a).position, field.cell(b).position)
            && position_precedes(field.cell(b).position, field.cell(c).position);
        if ordered {
            return ValidatorOutcome::Stable;
        }

        let all_collapsed =
            field.cell(a).is_collapsed() && field.cell(b).is_collapsed() && field.cell(c).is_collapsed();
        if !all_collapsed && !strict {
            // Lenient mode: other constraints are relied on to prune this triple
            // once more cells have collapsed.
            return ValidatorOutcome::Stable;
        }

        let mut progressed = false;
        for cell_id in [a, b, c] {
            let live: Vec<StateId> = field.cell(cell_id).live_states().map(|s| s.id).collect();
            for state_id in live {
                if field.eliminate(cell_id, state_id) {
                    progressed = true;
                }
            }
        }
        outcome_for(field, &[a, b, c], progressed)
    })
}

fn position_precedes(p: Position, q: Position) -> bool {
    (p.line, p.byte_offset) < (q.line, q.byte_offset)
}

/// When two byte-adjacent single-character operator cells together spell a
/// known compound operator, forces them to collapse jointly: if one side's
/// single-character interpretation is gone, so is the other's (spec §4.3,
/// "Compound-operator grammar constraint").
pub fn compound_operator(tokens: Rc<Vec<Token>>, source: Rc<[u8]>) -> ValidatorFn {
    Rc::new(move |constraint, field| {
        assert_eq!(
            constraint.cells.len(),
            2,
            "compound-operator constraint expects exactly two cells"
        );
        let (a, b) = (constraint.cells[0], constraint.cells[1]);

        let is_compound = {
            let token_a = single_char_operator(field.cell(a), &tokens);
            let token_b = single_char_operator(field.cell(b), &tokens);
            match (token_a, token_b) {
                (Some(ta), Some(tb)) if tb.start == ta.end => {
                    let mut combined = Vec::with_capacity(2);
                    combined.extend_from_slice(ta.slice(&source));
                    combined.extend_from_slice(tb.slice(&source));
                    COMPOUND_OPERATORS
                        .iter()
                        .any(|op| op.as_bytes() == combined.as_slice())
                }
                _ => false,
            }
        };
        if !is_compound {
            return ValidatorOutcome::Stable;
        }

        let a_live = field.cell(a).live_count();
        let b_live = field.cell(b).live_count();
        let mut progressed = false;
        if a_live == 0 && b_live > 0 {
            let ids: Vec<StateId> = field.cell(b).live_states().map(|s| s.id).collect();
            for id in ids {
                progressed |= field.eliminate(b, id);
            }
        } else if b_live == 0 && a_live > 0 {
            let ids: Vec<StateId> = field.cell(a).live_states().map(|s| s.id).collect();
            for id in ids {
                progressed |= field.eliminate(a, id);
            }
        }
        outcome_for(field, &[a, b], progressed)
    })
}

fn single_char_operator<'a>(cell: &EntropyCell, tokens: &'a [Token]) -> Option<&'a Token> {
    cell.live_states()
        .filter_map(|s| s.token_index)
        .filter_map(|idx| tokens.get(idx))
        .find(|t| t.kind == TokenKind::Operator && t.len() == 1)
}

/// Prunes states across a window of cells that are inconsistent with every
/// candidate parse of `pattern` over that window (spec §4.3, "Pattern
/// validators"; spec §4.4, "Validator invocation during propagation").
pub fn pattern_match(
    pattern: Rc<Pattern>,
    registry: Rc<PatternRegistry>,
    tokens: Rc<Vec<Token>>,
    source: Rc<[u8]>,
) -> ValidatorFn {
    Rc::new(move |constraint, field| {
        let full_matches: Vec<Vec<StateId>> = {
            let ctx = MatchContext { field, tokens: &tokens, source: &source };
            pattern
                .match_prefix(&constraint.cells, 0, &ctx, &registry)
                .into_iter()
                .filter(|(end, _)| *end == constraint.cells.len())
                .map(|(_, states)| states)
                .collect()
        };

        if full_matches.is_empty() {
            return ValidatorOutcome::Contradiction;
        }

        let mut allowed: Vec<std::collections::HashSet<StateId>> =
            vec![std::collections::HashSet::new(); constraint.cells.len()];
        for states in &full_matches {
            for (i, state_id) in states.iter().enumerate() {
                allowed[i].insert(*state_id);
            }
        }

        let mut progressed = false;
        for (i, &cell_id) in constraint.cells.iter().enumerate() {
            let to_eliminate: Vec<StateId> = field
                .cell(cell_id)
                .live_states()
                .map(|s| s.id)
                .filter(|id| !allowed[i].contains(id))
                .collect();
            for state_id in to_eliminate {
                progressed |= field.eliminate(cell_id, state_id);
            }
        }
        outcome_for(field, &constraint.cells, progressed)
    })
}

fn apply_eliminations(
    field: &mut EntropyField,
    target: CellId,
    states: &[StateId],
    watch: &[CellId],
) -> ValidatorOutcome {
    let mut progressed = false;
    for &state_id in states {
        progressed |= field.eliminate(target, state_id);
    }
    outcome_for(field, watch, progressed)
}

fn outcome_for(field: &EntropyField, watch: &[CellId], progressed: bool) -> ValidatorOutcome {
    if watch.iter().any(|&id| field.cell(id).is_contradiction()) {
        ValidatorOutcome::Contradiction
    } else if progressed {
        ValidatorOutcome::Progress
    } else {
        ValidatorOutcome::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Code;
    use crate::constraint::ConstraintKind;
    use crate::periscope::ValidatorId;
    use crate::scanner::Scanner;

    fn scanned<'c>(source: &'c str) -> (Vec<Token>, Code<'c>) {
        let code = Code::from(source);
        let tokens = Scanner::new().scan(&code);
        (tokens, code)
    }

    #[test]
    fn adjacency_tolerates_small_gaps() {
        let (tokens, code) = scanned("1  +  2");
        let source: Rc<[u8]> = Rc::from(code.value);
        let tokens = Rc::new(tokens);
        let mut field = EntropyField::new();
        let cells: Vec<CellId> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let cell = field.add_cell(Position::new(t.line, t.column, t.start));
                field.add_token_state(cell, format!("{}", t.kind), i, t.kind, 100);
                cell
            })
            .collect();

        let validator = adjacency(tokens.clone(), source.clone());
        let constraint = field.add_constraint(
            ConstraintKind::Adjacency,
            vec![cells[0], cells[1]],
            "1 then +",
            ValidatorId(0),
            validator,
        );
        let outcome = constraint_run(&mut field, constraint);
        assert_ne!(outcome, ValidatorOutcome::Contradiction);
    }

    #[test]
    fn compound_operator_forces_joint_collapse() {
        let mut field = EntropyField::new();
        let a = field.add_cell(Position::new(1, 1, 0));
        let b = field.add_cell(Position::new(1, 2, 1));
        field.add_token_state(a, "op", 0, TokenKind::Operator, 100);
        field.add_token_state(b, "op", 1, TokenKind::Operator, 100);

        let token_a = Token::new(TokenKind::Operator, 0, 0, 1, Position::new(1, 1, 0), crate::token::LiteralValue::None);
        let token_b = Token::new(TokenKind::Operator, 0, 1, 2, Position::new(1, 2, 1), crate::token::LiteralValue::None);
        let tokens = Rc::new(vec![token_a, token_b]);
        let source: Rc<[u8]> = Rc::from(&b"++"[..]);

        let validator = compound_operator(tokens, source);
        let a_state = field.cell(a).states()[0].id;
        field.eliminate(a, a_state);

        let constraint =
            field.add_constraint(ConstraintKind::Grammar, vec![a, b], "++", ValidatorId(0), validator);
        let outcome = constraint_run(&mut field, constraint);
        assert_eq!(outcome, ValidatorOutcome::Contradiction);
        assert!(field.cell(b).is_contradiction());
    }

    fn constraint_run(field: &mut EntropyField, id: crate::ids::ConstraintId) -> ValidatorOutcome {
        let constraint = field.constraints()[id.index()].clone();
        constraint.run(field)
    }
}
