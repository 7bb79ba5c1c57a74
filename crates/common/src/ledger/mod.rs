//! The ledger SecureDAG records files, grants and keys on
//!
//! The ledger is an external collaborator. It only ever sees content
//! addresses, public keys and sealed file keys.

mod address;
mod memory;
mod provider;

pub use address::{Address, AddressError, ADDRESS_SIZE};
pub use memory::MemoryLedger;
pub use provider::{
    AccessInfo, EncryptionKeyRecord, FileId, FileInfo, IpTimestamp, Ledger, LedgerError,
    ModuleKind, UnknownModule,
};
