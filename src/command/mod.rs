//! Command processing: tokenize one line, dispatch it, produce an outcome.
//!
//! A command line is at most three tokens: a verb, a key, and a value. The
//! split happens on the first two ASCII spaces only, which keeps spaces and
//! quotes inside the value token intact for the value parser. Every
//! malformed shape collapses into the single "Invalid command" error.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::protocol::{self, Outcome, ProtocolError, Value};
use crate::storage::{DurableStore, StorageError};
use crate::txn::{TxnError, TxnManager};

/// Command processing errors. Wrapped variants stay transparent so their
/// display text reaches the wire unchanged.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Empty input, unknown verb, or wrong arity.
    #[error("Invalid command")]
    InvalidCommand,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Txn(#[from] TxnError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type CommandResult<T> = Result<T, CommandError>;

/// A parsed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Set { key: String, value: Value },
    Get { key: String },
    Begin,
    Commit,
    Rollback,
}

/// Parses one command line into its typed form.
pub fn parse(text: &str) -> CommandResult<Command> {
    let tokens: Vec<&str> = text.trim().splitn(3, ' ').collect();
    match tokens.as_slice() {
        ["SET", key, value] => Ok(Command::Set {
            key: protocol::parse_key(key)?,
            value: protocol::parse_value(value)?,
        }),
        ["GET", key] => Ok(Command::Get {
            key: protocol::parse_key(key)?,
        }),
        ["BEGIN"] => Ok(Command::Begin),
        ["COMMIT"] => Ok(Command::Commit),
        ["ROLLBACK"] => Ok(Command::Rollback),
        _ => Err(CommandError::InvalidCommand),
    }
}

/// Executes parsed commands against the store through the transaction
/// engine, which decides per client whether an operation is transactional.
pub struct CommandProcessor {
    txns: Arc<TxnManager>,
}

impl CommandProcessor {
    /// Opens the full engine stack rooted at `data_dir`.
    pub fn open(data_dir: &Path) -> CommandResult<Arc<Self>> {
        let store = DurableStore::open(data_dir)?;
        let txns = TxnManager::open(data_dir, store)?;
        Ok(Arc::new(Self { txns }))
    }

    /// Parses and executes one command line on behalf of `client`.
    pub fn parse_and_execute(&self, text: &str, client: &str) -> CommandResult<Outcome> {
        let command = parse(text)?;
        debug!("Client {:?} issued {:?}", client, command);
        self.execute(command, client)
    }

    /// Executes one parsed command.
    pub fn execute(&self, command: Command, client: &str) -> CommandResult<Outcome> {
        match command {
            Command::Set { key, value } => {
                let old = self.txns.set(client, &key, value.clone())?;
                Ok(Outcome::Set {
                    old: Value::from(old),
                    new: value,
                })
            }
            Command::Get { key } => {
                let value = self.txns.get(client, &key)?;
                Ok(Outcome::Single(Value::from(value)))
            }
            Command::Begin => {
                self.txns.begin(client)?;
                Ok(Outcome::Ok)
            }
            Command::Commit => {
                self.txns.commit(client)?;
                Ok(Outcome::Ok)
            }
            Command::Rollback => {
                self.txns.rollback(client)?;
                Ok(Outcome::Ok)
            }
        }
    }
}
