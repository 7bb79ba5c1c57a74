//! The human-readable message a wallet signs to derive keys
//!
//! The message itself is never stored. Only its parameters
//! ([`DerivationMetadata`]) are kept next to a cached signature, so rendering
//! must be byte-for-byte stable for identical parameters.

use serde::{Deserialize, Serialize};

use super::derivation::KeyVersion;

/// Fixed `issuedAt` used when the caller does not supply one
pub const DEFAULT_ISSUED_AT: &str = "2023-01-01T00:00:00.000Z";
/// Fixed nonce used when the caller does not supply one
pub const DEFAULT_NONCE: &str = "0";
/// Domain used when the caller does not supply one
pub const DEFAULT_DOMAIN: &str = "localhost";

#[derive(Debug, thiserror::Error)]
#[error("derivation message does not match its metadata")]
pub struct MessageMismatchError;

/// Parameters the derivation message is rendered from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationMetadata {
    pub domain: String,
    pub user_address: String,
    pub chain_id: u64,
    pub key_version: KeyVersion,
    pub nonce: String,
    pub issued_at: String,
}

impl DerivationMetadata {
    /// Render the exact message these parameters describe
    pub fn message(&self) -> String {
        format!(
            "{domain} wants you to derive encryption keys for SecureDAG:\n\
             \n\
             Account: {address}\n\
             Key Version: {version}\n\
             Purpose: File encryption and secure sharing\n\
             \n\
             Chain ID: {chain_id}\n\
             Nonce: {nonce}\n\
             Issued At: {issued_at}\n\
             \n\
             By signing this message, you are generating deterministic encryption keys \
             that will be used to encrypt your files and enable secure sharing. \
             These keys are derived from your signature and can be regenerated anytime \
             with the same wallet.",
            domain = self.domain,
            address = self.user_address,
            version = self.key_version,
            chain_id = self.chain_id,
            nonce = self.nonce,
            issued_at = self.issued_at,
        )
    }
}

/// Optional overrides for [`build_message`]
#[derive(Clone, Debug, Default)]
pub struct MessageOptions {
    pub domain: Option<String>,
    pub issued_at: Option<String>,
    pub nonce: Option<String>,
}

/// A rendered message along with the metadata needed to rebuild it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivationMessage {
    pub message: String,
    pub metadata: DerivationMetadata,
}

pub fn build_message(
    user_address: &str,
    chain_id: u64,
    key_version: KeyVersion,
    options: MessageOptions,
) -> DerivationMessage {
    // an empty domain or timestamp falls back to the default, an empty nonce is kept
    let metadata = DerivationMetadata {
        domain: options
            .domain
            .filter(|domain| !domain.is_empty())
            .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
        user_address: user_address.to_string(),
        chain_id,
        key_version,
        nonce: options.nonce.unwrap_or_else(|| DEFAULT_NONCE.to_string()),
        issued_at: options
            .issued_at
            .filter(|issued_at| !issued_at.is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUED_AT.to_string()),
    };
    DerivationMessage {
        message: metadata.message(),
        metadata,
    }
}

/// Check that `message` is exactly what `metadata` renders to
pub fn verify_message(
    metadata: &DerivationMetadata,
    message: &str,
) -> Result<(), MessageMismatchError> {
    if metadata.message() == message {
        Ok(())
    } else {
        Err(MessageMismatchError)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ADDRESS: &str = "0xAbC0000000000000000000000000000000000001";

    #[test]
    fn test_message_template() {
        let built = build_message(ADDRESS, 296, KeyVersion::CURRENT, MessageOptions::default());
        let expected = "localhost wants you to derive encryption keys for SecureDAG:\n\
\n\
Account: 0xAbC0000000000000000000000000000000000001\n\
Key Version: 1\n\
Purpose: File encryption and secure sharing\n\
\n\
Chain ID: 296\n\
Nonce: 0\n\
Issued At: 2023-01-01T00:00:00.000Z\n\
\n\
By signing this message, you are generating deterministic encryption keys that will be used to encrypt your files and enable secure sharing. These keys are derived from your signature and can be regenerated anytime with the same wallet.";
        assert_eq!(built.message, expected);
    }

    #[test]
    fn test_defaults_are_fixed() {
        let a = build_message(ADDRESS, 296, KeyVersion::CURRENT, MessageOptions::default());
        let b = build_message(ADDRESS, 296, KeyVersion::CURRENT, MessageOptions::default());
        assert_eq!(a, b);
        assert_eq!(a.metadata.issued_at, DEFAULT_ISSUED_AT);
        assert_eq!(a.metadata.nonce, DEFAULT_NONCE);
        assert_eq!(a.metadata.domain, DEFAULT_DOMAIN);
    }

    #[test]
    fn test_overrides_are_recorded_in_metadata() {
        let options = MessageOptions {
            domain: Some("app.securedag.io".to_string()),
            issued_at: Some("2024-06-01T12:00:00.000Z".to_string()),
            nonce: Some("42".to_string()),
        };
        let built = build_message(ADDRESS, 1, KeyVersion::new(3).unwrap(), options);
        assert!(built.message.starts_with("app.securedag.io wants you"));
        assert!(built.message.contains("Nonce: 42\n"));
        assert!(built.message.contains("Key Version: 3\n"));

        // rebuilding from the stored metadata yields the same text
        assert_eq!(built.metadata.message(), built.message);
    }

    #[test]
    fn test_empty_overrides() {
        let options = MessageOptions {
            domain: Some(String::new()),
            issued_at: Some(String::new()),
            nonce: Some(String::new()),
        };
        let built = build_message(ADDRESS, 296, KeyVersion::CURRENT, options);
        assert_eq!(built.metadata.domain, DEFAULT_DOMAIN);
        assert_eq!(built.metadata.issued_at, DEFAULT_ISSUED_AT);
        assert_eq!(built.metadata.nonce, "");
        assert!(built.message.starts_with("localhost wants you"));
        assert!(built.message.contains("Nonce: \n"));
    }

    #[test]
    fn test_verify_message() {
        let built = build_message(ADDRESS, 296, KeyVersion::CURRENT, MessageOptions::default());
        assert!(verify_message(&built.metadata, &built.message).is_ok());

        let mut tampered = built.metadata.clone();
        tampered.chain_id = 1;
        assert!(verify_message(&tampered, &built.message).is_err());
    }

    #[test]
    fn test_metadata_json_layout() {
        let built = build_message(ADDRESS, 296, KeyVersion::CURRENT, MessageOptions::default());
        let json = serde_json::to_value(&built.metadata).unwrap();
        assert_eq!(json["userAddress"], ADDRESS);
        assert_eq!(json["chainId"], 296);
        assert_eq!(json["keyVersion"], 1);
        assert_eq!(json["issuedAt"], DEFAULT_ISSUED_AT);
    }
}
