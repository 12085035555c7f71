//! Id token validation
//!
//! Classifies a presented id token as `Accepted`, `Invalid` or `Unknown`.
//! The classification is returned verbatim to the charge point; malformed
//! input is never an error, it is just classified.

use rust_ocpp::v2_0_1::datatypes::id_token_type::IdTokenType;
use rust_ocpp::v2_0_1::enumerations::authorization_status_enum_type::AuthorizationStatusEnumType;
use rust_ocpp::v2_0_1::enumerations::id_token_enum_type::IdTokenEnumType;

use crate::config::TokenAllowEntry;

/// Classifies id tokens against format rules and the configured allow-list.
pub struct TokenValidator {
    accepted: Vec<TokenAllowEntry>,
}

impl TokenValidator {
    pub fn new(accepted: Vec<TokenAllowEntry>) -> Self {
        Self { accepted }
    }

    /// Classify a presented token.
    ///
    /// Rules, in order:
    /// 1. a value that is not plain base-16 is `Unknown`;
    /// 2. token types this deployment does not handle are `Unknown`,
    ///    except `eMAID` which is recognized but always `Invalid`;
    /// 3. `ISO14443` values must be exactly 8 or 14 hex characters,
    ///    `ISO15693` exactly 16, `Central` any length; a wrong length is
    ///    `Invalid` even for a listed value;
    /// 4. what passes the format rules must still appear in the allow-list
    ///    as an exact (type, value) pair to be `Accepted`.
    pub fn validate(&self, id_token: &IdTokenType) -> AuthorizationStatusEnumType {
        let value = &id_token.id_token;

        if !is_hex(value) {
            return AuthorizationStatusEnumType::Unknown;
        }

        match id_token.kind {
            IdTokenEnumType::Central => {}
            IdTokenEnumType::EMAID => return AuthorizationStatusEnumType::Invalid,
            IdTokenEnumType::ISO14443 => {
                if value.len() != 8 && value.len() != 14 {
                    return AuthorizationStatusEnumType::Invalid;
                }
            }
            IdTokenEnumType::ISO15693 => {
                if value.len() != 16 {
                    return AuthorizationStatusEnumType::Invalid;
                }
            }
            _ => return AuthorizationStatusEnumType::Unknown,
        }

        let listed = self
            .accepted
            .iter()
            .any(|entry| entry.kind == id_token.kind && entry.value == *value);

        if listed {
            AuthorizationStatusEnumType::Accepted
        } else {
            AuthorizationStatusEnumType::Invalid
        }
    }
}

/// Plain hex string: non-empty, every character a hex digit.
fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit())
}
