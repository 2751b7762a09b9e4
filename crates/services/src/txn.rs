//! Multi-document transactions over a MongoDB client session.
//!
//! Catalog writes touch a menu item and the restaurant's category index
//! together. They run through [`in_transaction!`], which restarts the whole
//! body when the server labels the failure `TransientTransactionError`
//! (typically a write conflict with a concurrent catalog edit).

use mongodb::error::UNKNOWN_TRANSACTION_COMMIT_RESULT;
use mongodb::{Client, ClientSession, Database};
use tracing::warn;

use crate::dao::base::{DaoError, DaoResult};

pub const MAX_TXN_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct TxnRunner {
    client: Client,
    enabled: bool,
}

impl TxnRunner {
    /// With `enabled == false` the body still runs on a session, just
    /// without transactional guarantees. Standalone servers need this.
    pub fn new(db: &Database, enabled: bool) -> Self {
        Self {
            client: db.client().clone(),
            enabled,
        }
    }

    pub async fn start(&self) -> DaoResult<Txn> {
        let session = self.client.start_session().await?;
        Ok(Txn {
            session,
            enabled: self.enabled,
        })
    }
}

pub struct Txn {
    session: ClientSession,
    enabled: bool,
}

impl Txn {
    pub fn session(&mut self) -> &mut ClientSession {
        &mut self.session
    }

    pub async fn begin(&mut self) -> DaoResult<()> {
        if self.enabled {
            self.session.start_transaction().await?;
        }
        Ok(())
    }

    /// Commits on success, aborts on failure, and hands `result` back.
    pub async fn finish<T>(&mut self, result: DaoResult<T>) -> DaoResult<T> {
        if !self.enabled {
            return result;
        }
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = self.session.abort_transaction().await {
                    warn!(error = %abort_err, "Abort after failed transaction body failed");
                }
                Err(e)
            }
        }
    }

    async fn commit(&mut self) -> DaoResult<()> {
        let mut attempt = 1;
        loop {
            match self.session.commit_transaction().await {
                Ok(()) => return Ok(()),
                Err(e)
                    if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                        && attempt < MAX_TXN_ATTEMPTS =>
                {
                    warn!(attempt, error = %e, "Commit result unknown, retrying commit");
                    attempt += 1;
                }
                Err(e) => return Err(DaoError::Mongo(e)),
            }
        }
    }
}

/// Runs `$body` inside a transaction on `$runner`, retrying transient
/// failures. `$txn` names the `&mut Txn` binding available to the body.
///
/// ```ignore
/// let item = in_transaction!(self.txn, |txn| self.create_item_in(txn, rid, &input));
/// ```
macro_rules! in_transaction {
    ($runner:expr, |$txn:ident| $body:expr) => {{
        let mut __txn = $runner.start().await?;
        let mut __attempt = 1;
        loop {
            __txn.begin().await?;
            let __result = {
                let $txn = &mut __txn;
                $body.await
            };
            match __txn.finish(__result).await {
                Err(e) if e.is_transient() && __attempt < $crate::txn::MAX_TXN_ATTEMPTS => {
                    ::tracing::warn!(attempt = __attempt, error = %e, "Transient transaction failure, retrying");
                    __attempt += 1;
                }
                other => break other,
            }
        }
    }};
}

pub(crate) use in_transaction;
