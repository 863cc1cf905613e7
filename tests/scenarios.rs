//! The six concrete scenarios and boundary cases from the testable-properties
//! section of the specification, run end to end through [WfcDriver].

use wfc_parse::{DriverConfig, ExtractOptions, TokenKind, WfcDriver};

fn run(source: &str) -> wfc_parse::WfcOutcome {
    WfcDriver::new(DriverConfig::default())
        .run(source)
        .expect("scanning never fails")
}

#[test]
fn scenario_1_single_identifier() {
    let outcome = run("x");
    assert!(outcome.field.is_fully_collapsed());
    let extracted = outcome.field.extract(ExtractOptions::default());
    assert_eq!(extracted.tokens.len(), 2);
    assert_eq!(extracted.tokens[0].kind, TokenKind::Identifier);
    assert_eq!(extracted.tokens[0].text(), b"x");
    assert_eq!(extracted.tokens[1].kind, TokenKind::EndOfInput);
}

#[test]
fn scenario_2_compound_increment_stays_one_operator() {
    let outcome = run("++x");
    assert!(!outcome.field.has_contradiction());
    let extracted = outcome.field.extract(ExtractOptions::default());
    let operator = extracted.tokens.iter().find(|t| t.kind == TokenKind::Operator).unwrap();
    assert_eq!(operator.text(), b"++");
}

#[test]
fn scenario_3_tight_adjacency_no_gap() {
    let outcome = run("1+2");
    assert!(!outcome.field.has_contradiction());
    let extracted = outcome.field.extract(ExtractOptions::default());
    assert_eq!(extracted.tokens.len(), outcome.field.cells().len());
}

#[test]
fn scenario_4_spaced_adjacency_within_bound() {
    let outcome = run("1  +  2");
    assert!(!outcome.field.has_contradiction());
}

#[test]
fn scenario_5_unterminated_string_yields_single_invalid_token() {
    let code = wfc_parse::Code::from("\"unterminated");
    let tokens = wfc_parse::Scanner::new().scan(&code);
    assert_eq!(tokens[0].kind, TokenKind::Invalid);
    assert_eq!(tokens[0].start, 0);
    assert_eq!(tokens[0].end, 1);

    // The driver still runs to completion over the surviving tokens.
    let outcome = run("\"unterminated");
    assert!(outcome.field.is_fully_collapsed() || outcome.field.has_contradiction());
}

#[test]
fn scenario_6_if_statement_collapses_deterministically() {
    let outcome = run("if (x) { }");
    assert!(!outcome.field.has_contradiction());
    let extracted = outcome.field.extract(ExtractOptions::default());
    assert_eq!(extracted.tokens.len(), outcome.field.cells().len());

    // Determinism: rerunning on identical input yields byte-identical output.
    let again = run("if (x) { }").field.extract(ExtractOptions::default());
    let first_text: Vec<&[u8]> = extracted.tokens.iter().map(|t| t.text()).collect();
    let second_text: Vec<&[u8]> = again.tokens.iter().map(|t| t.text()).collect();
    assert_eq!(first_text, second_text);
}

#[test]
fn boundary_empty_input_collapses_immediately() {
    // One cell for the synthetic end-of-input token (see DESIGN.md's note on
    // spec §8's "zero cells" boundary case); still trivially, vacuously
    // collapsed with no room for a contradiction.
    let outcome = run("");
    assert_eq!(outcome.field.cells().len(), 1);
    assert!(outcome.field.is_fully_collapsed());
    assert!(!outcome.field.has_contradiction());
}

#[test]
fn boundary_single_token_installs_no_pairwise_constraints() {
    let outcome = run("x");
    // one identifier cell + one eof cell: no adjacency/sequence window needs
    // more than the single pair between them, and both collapse trivially.
    assert!(outcome.field.is_fully_collapsed());
}

#[test]
fn fully_collapsed_and_contradiction_are_mutually_exclusive() {
    for source in ["", "x", "1+2", "if (x) { }", "\"unterminated"] {
        let outcome = run(source);
        assert!(!(outcome.field.is_fully_collapsed() && outcome.field.has_contradiction()));
    }
}

#[test]
fn extracted_length_equals_collapsed_cell_count() {
    let outcome = run("var x int = 1;");
    let collapsed = outcome.field.cells().iter().filter(|c| c.is_collapsed()).count();
    let extracted = outcome.field.extract(ExtractOptions::default());
    // every collapsed cell whose sole state is a token-state contributes one
    // entry (production/epsilon states, if any survive, contribute none).
    assert!(extracted.tokens.len() <= collapsed);
}

#[test]
fn scanner_round_trip_reproduces_source_bytes() {
    let source = "region r { func main() { var x int = 1 + 2; return x; } }";
    let code = wfc_parse::Code::from(source);
    let tokens = wfc_parse::Scanner::new().scan(&code);
    let mut reconstructed = Vec::new();
    for token in &tokens {
        if token.kind != TokenKind::EndOfInput {
            reconstructed.extend_from_slice(token.slice(code.value));
        }
    }
    assert_eq!(reconstructed, source.as_bytes());
}
