pub mod decrypt;
pub mod encrypt;
pub mod hash;
pub mod init;
pub mod keys;
pub mod message;
pub mod version;

pub use decrypt::Decrypt;
pub use encrypt::Encrypt;
pub use hash::Hash;
pub use init::Init;
pub use keys::Keys;
pub use message::Message;
pub use version::Version;
