//! AgentKern Control Plane: Context Store (C1), Idempotency Service (C5),
//! dead-letter queue, and quarantine ledger.

pub mod dlq;
pub mod idempotency;
pub mod postgres;
pub mod quarantine;
pub mod repository;
pub mod rollup;
pub mod vector;

pub use dlq::{DeadLetterQueue, DlqEntry, DLQ_TTL};
pub use idempotency::{derive_key, IdempotencyRecord, IdempotencyService, BATCH_TTL, DEFAULT_TTL};
pub use postgres::PostgresStore;
pub use quarantine::{QuarantineEntry, QuarantineLedger};
pub use repository::{ContextStore, Expected};
pub use rollup::RollupRow;
pub use vector::{cosine_similarity, top_k_similar, ScoredMatch};
