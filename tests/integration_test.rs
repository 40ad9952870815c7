//! Integration tests for linekv
//! Drives full command lines through the processor and asserts on the
//! exact wire text produced by the formatter.

use std::sync::Arc;

use tempfile::TempDir;

use linekv::protocol::response::{format_error, format_success};
use linekv::CommandProcessor;

/// Opens a processor over a fresh data directory. The TempDir is returned
/// to keep it alive for the lifetime of the test.
fn setup() -> (Arc<CommandProcessor>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let processor = CommandProcessor::open(dir.path()).expect("Failed to open processor");
    (processor, dir)
}

/// Runs one command line for `client` and returns the wire text, success
/// or error.
fn run(processor: &CommandProcessor, line: &str, client: &str) -> Result<String, String> {
    processor
        .parse_and_execute(line, client)
        .map(|outcome| format_success(&outcome))
        .map_err(|error| format_error(&error))
}

// ============================================================================
// Single-client command flows
// ============================================================================

#[test]
fn test_set_and_get_integer() {
    let (processor, _dir) = setup();

    assert_eq!(run(&processor, "SET number_key 42", "a").unwrap(), "NIL 42");
    assert_eq!(run(&processor, "GET number_key", "a").unwrap(), "42");
}

#[test]
fn test_set_and_get_quoted_string() {
    let (processor, _dir) = setup();

    assert_eq!(
        run(&processor, "SET quoted_key \"hello world\"", "a").unwrap(),
        "NIL \"hello world\""
    );
    assert_eq!(
        run(&processor, "GET quoted_key", "a").unwrap(),
        "\"hello world\""
    );
}

#[test]
fn test_set_reports_old_and_new_booleans() {
    let (processor, _dir) = setup();

    assert_eq!(run(&processor, "SET bool_key TRUE", "a").unwrap(), "NIL TRUE");
    assert_eq!(
        run(&processor, "SET bool_key FALSE", "a").unwrap(),
        "TRUE FALSE"
    );
}

#[test]
fn test_get_missing_key_is_nil() {
    let (processor, _dir) = setup();
    assert_eq!(run(&processor, "GET never_set", "a").unwrap(), "NIL");
}

#[test]
fn test_digit_string_round_trips_quoted() {
    let (processor, _dir) = setup();

    assert_eq!(run(&processor, "SET k \"42\"", "a").unwrap(), "NIL \"42\"");
    assert_eq!(run(&processor, "GET k", "a").unwrap(), "\"42\"");
}

// ============================================================================
// Error responses
// ============================================================================

#[test]
fn test_numeric_key_is_rejected() {
    let (processor, _dir) = setup();
    assert_eq!(
        run(&processor, "SET 123 value", "a").unwrap_err(),
        "ERR \"Value 123 is not valid as key\""
    );
}

#[test]
fn test_nil_value_is_rejected() {
    let (processor, _dir) = setup();
    assert_eq!(
        run(&processor, "SET test_key NIL", "a").unwrap_err(),
        "ERR \"Cannot SET key to NIL\""
    );
}

#[test]
fn test_commit_without_transaction() {
    let (processor, _dir) = setup();
    assert_eq!(
        run(&processor, "COMMIT", "a").unwrap_err(),
        "ERR \"no_transaction\""
    );
}

#[test]
fn test_rollback_without_transaction() {
    let (processor, _dir) = setup();
    assert_eq!(
        run(&processor, "ROLLBACK", "a").unwrap_err(),
        "ERR \"No active transaction\""
    );
}

#[test]
fn test_unclosed_string_is_rejected() {
    let (processor, _dir) = setup();
    assert_eq!(
        run(&processor, "SET k \"dangling", "a").unwrap_err(),
        "ERR \"Unclosed string\""
    );
}

#[test]
fn test_malformed_lines_are_invalid_commands() {
    let (processor, _dir) = setup();
    for line in ["", "NOPE", "SET only_key", "GET k extra"] {
        assert_eq!(
            run(&processor, line, "a").unwrap_err(),
            "ERR \"Invalid command\"",
            "line {:?}",
            line
        );
    }
}

#[test]
fn test_path_traversal_client_id_is_rejected() {
    let (processor, dir) = setup();

    // The client id names the transaction-record file; ids that could
    // reach outside the transactions directory are refused outright.
    assert_eq!(
        run(&processor, "BEGIN", "../../../../tmp/pwned").unwrap_err(),
        "ERR \"Invalid command\""
    );
    assert_eq!(
        run(&processor, "SET k v", "../sneaky").unwrap_err(),
        "ERR \"Invalid command\""
    );
    assert_eq!(
        run(&processor, "GET k", "..").unwrap_err(),
        "ERR \"Invalid command\""
    );

    // No record file was written anywhere, inside the layout or out.
    assert_eq!(
        std::fs::read_dir(dir.path().join("transactions"))
            .unwrap()
            .count(),
        0
    );
    assert!(!dir.path().join("sneaky.transaction").exists());
}

// ============================================================================
// Transactions across clients
// ============================================================================

#[test]
fn test_transaction_isolation_until_commit() {
    let (processor, _dir) = setup();

    assert_eq!(run(&processor, "BEGIN", "a").unwrap(), "OK");
    assert_eq!(run(&processor, "SET tx_key v", "a").unwrap(), "NIL v");

    // The buffered write is invisible to another client.
    assert_eq!(run(&processor, "GET tx_key", "b").unwrap(), "NIL");

    assert_eq!(run(&processor, "COMMIT", "a").unwrap(), "OK");
    assert_eq!(run(&processor, "GET tx_key", "b").unwrap(), "v");
}

#[test]
fn test_atomicity_failure_on_conflicting_write() {
    let (processor, _dir) = setup();

    assert_eq!(
        run(&processor, "SET atomic_key initial", "a").unwrap(),
        "NIL initial"
    );
    assert_eq!(run(&processor, "BEGIN", "a").unwrap(), "OK");
    assert_eq!(run(&processor, "GET atomic_key", "a").unwrap(), "initial");

    // Client b commits a competing value while a's transaction is open.
    assert_eq!(
        run(&processor, "SET atomic_key modified", "b").unwrap(),
        "initial modified"
    );

    assert_eq!(
        run(&processor, "COMMIT", "a").unwrap_err(),
        "ERR \"Atomicity failure (atomic_key)\""
    );
}

#[test]
fn test_begin_inside_transaction_fails() {
    let (processor, _dir) = setup();
    assert_eq!(run(&processor, "BEGIN", "a").unwrap(), "OK");
    assert_eq!(
        run(&processor, "BEGIN", "a").unwrap_err(),
        "ERR \"Already in transaction\""
    );
}

#[test]
fn test_transaction_reads_its_own_writes() {
    let (processor, _dir) = setup();
    run(&processor, "SET k committed", "a").unwrap();

    assert_eq!(run(&processor, "BEGIN", "a").unwrap(), "OK");
    assert_eq!(run(&processor, "SET k pending", "a").unwrap(), "committed pending");
    assert_eq!(run(&processor, "GET k", "a").unwrap(), "pending");

    assert_eq!(run(&processor, "ROLLBACK", "a").unwrap(), "OK");
    assert_eq!(run(&processor, "GET k", "a").unwrap(), "committed");
}

#[test]
fn test_disjoint_transactions_both_commit() {
    let (processor, _dir) = setup();

    run(&processor, "BEGIN", "a").unwrap();
    run(&processor, "BEGIN", "b").unwrap();
    run(&processor, "SET ka 1", "a").unwrap();
    run(&processor, "SET kb 2", "b").unwrap();

    assert_eq!(run(&processor, "COMMIT", "a").unwrap(), "OK");
    assert_eq!(run(&processor, "COMMIT", "b").unwrap(), "OK");
    assert_eq!(run(&processor, "GET ka", "c").unwrap(), "1");
    assert_eq!(run(&processor, "GET kb", "c").unwrap(), "2");
}

// ============================================================================
// Durability
// ============================================================================

#[test]
fn test_committed_values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let processor = CommandProcessor::open(dir.path()).unwrap();
        run(&processor, "SET k \"survives restart\"", "a").unwrap();
    }

    let processor = CommandProcessor::open(dir.path()).unwrap();
    assert_eq!(run(&processor, "GET k", "a").unwrap(), "\"survives restart\"");
}

#[test]
fn test_open_transaction_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let processor = CommandProcessor::open(dir.path()).unwrap();
        run(&processor, "BEGIN", "a").unwrap();
        run(&processor, "SET k pending", "a").unwrap();
    }

    let processor = CommandProcessor::open(dir.path()).unwrap();
    // The transaction is still active: BEGIN fails, and the pending write
    // is still there to commit.
    assert_eq!(
        run(&processor, "BEGIN", "a").unwrap_err(),
        "ERR \"Already in transaction\""
    );
    assert_eq!(run(&processor, "COMMIT", "a").unwrap(), "OK");
    assert_eq!(run(&processor, "GET k", "b").unwrap(), "pending");
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_parallel_clients_serialize_cleanly() {
    let (processor, _dir) = setup();
    let mut handles = Vec::new();

    for i in 0..4 {
        let processor = Arc::clone(&processor);
        handles.push(std::thread::spawn(move || {
            let client = format!("client-{}", i);
            for round in 0..5 {
                run(&processor, &format!("SET k{}_{} {}", i, round, round), &client).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for i in 0..4 {
        for round in 0..5 {
            assert_eq!(
                run(&processor, &format!("GET k{}_{}", i, round), "checker").unwrap(),
                round.to_string()
            );
        }
    }
}
