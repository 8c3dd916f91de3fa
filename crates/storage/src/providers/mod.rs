//! Providers for chain state.
//!
//! This module defines the transaction-scoped providers used by [`ChainDb`](crate::ChainDb). Each
//! provider wraps a borrowed reth transaction and covers one concern:
//! - Canonical headers, bodies and side blocks (via [`BlockProvider`])
//! - Hash, transaction, receipt and weight indices (via [`IndexProvider`])
//! - The canonical head pointer (via [`HeadRefProvider`])
//! - Fork choice and head rewinds (via [`ForkChoiceProvider`])
mod block_provider;
pub(crate) use block_provider::BlockProvider;

mod index_provider;
pub(crate) use index_provider::IndexProvider;

mod head_ref_provider;
pub(crate) use head_ref_provider::HeadRefProvider;

mod fork_choice;
pub(crate) use fork_choice::ForkChoiceProvider;
