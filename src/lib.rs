//! # Block-Assembler
//!
//! Block-template assembler for Bitcoin-family proof-of-work chains.
//!
//! Given a node-supplied `getblocktemplate` payload and pool configuration,
//! this crate produces everything a stratum front-end needs to hand work to
//! miners and submit their winning shares back:
//!
//! - a canonical coinbase transaction in legacy and witness forms, with
//!   precomputed byte offsets for in-place extranonce mutation,
//! - a Merkle authentication path over the selected transaction set,
//! - a block header seeded for mining,
//! - a serialized hex block ready for `submitblock`.
//!
//! ## Architecture
//!
//! The crate is layered leaves-first:
//! - Primitive codec (`codec`): CompactSize, BIP-34 heights, hex forms
//! - Transaction codec (`transaction`): legacy/witness serialization
//! - Merkle helpers (`merkle`), SegWit commitments (`segwit`)
//! - Transaction selection under a count cap (`selector`)
//! - Chain profiles (`chain`) and target arithmetic (`pow`)
//! - Coinbase construction (`coinbase`)
//! - The live template binding (`work`), fed by the stratum edge (`stratum`)
//!
//! ## Design Principles
//!
//! 1. **Byte-exact construction**: serialization follows consensus encoding
//!    precisely; a single stray byte produces shares the network rejects
//! 2. **In-place mutation**: miners overwrite extranonce bytes at recorded
//!    offsets millions of times per second, never reserializing
//! 3. **No hidden state**: every per-chain difference lives in a
//!    [`Chain`] profile value, never in process-wide configuration
//!
//! ## Usage
//!
//! ```rust
//! use block_assembler::{Chain, MiningConfig, Work};
//! use serde_json::json;
//!
//! let template = json!({
//!     "result": {
//!         "height": 700000,
//!         "version": 0x2000_0000u32,
//!         "previousblockhash":
//!             "0000000000000000000000000000000000000000000000000000000000000011",
//!         "curtime": 1600000000,
//!         "bits": "170b2c70",
//!         "coinbasevalue": 625000000i64,
//!         "transactions": [],
//!     }
//! });
//!
//! let mut work = Work::new(1, Chain::Btc, MiningConfig::default(), &[0u8; 20], "/pool/");
//! work.load_from_template(&template).unwrap();
//! assert!(work.ready());
//!
//! let block_hex = work.build_block();
//! assert!(block_hex.starts_with("00000020")); // version 0x20000000, little-endian
//! ```

pub mod address;
pub mod chain;
pub mod codec;
pub mod coinbase;
pub mod config;
pub mod constants;
pub mod error;
pub mod fanin;
pub mod merkle;
pub mod pow;
pub mod segwit;
pub mod selector;
pub mod stratum;
pub mod transaction;
pub mod types;
pub mod work;

// Re-export commonly used types
pub use chain::Chain;
pub use config::{MiningConfig, WorkerConfig};
pub use constants::*;
pub use error::{AssemblyError, Result};
pub use stratum::StratumSubmit;
pub use types::*;
pub use work::{Work, WorkState};
