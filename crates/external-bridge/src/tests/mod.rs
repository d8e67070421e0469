//! Ingestor scenarios against an in-memory ledger and fixture chain
