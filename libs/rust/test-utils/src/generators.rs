//! Shared proptest generators.

use proptest::prelude::*;

/// Generate identifiers usable as user, host or variable names.
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_-]{0,20}"
}

/// Generate hierarchical identifiers such as `apps/web/db-password`.
pub fn path_identifier_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,12}(/[a-z][a-z0-9-]{0,12}){0,3}"
}

/// Generate role kinds.
pub fn role_kind_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("user".to_string()),
        Just("host".to_string()),
        Just("group".to_string()),
        Just("layer".to_string()),
    ]
}

/// Generate `(kind, identifier)` role id parts.
pub fn role_id_parts_strategy() -> impl Strategy<Value = (String, String)> {
    (role_kind_strategy(), path_identifier_strategy())
}

/// Generate arbitrary secret values, binary included.
pub fn secret_bytes_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..256)
}

/// Generate printable secret strings.
pub fn secret_string_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9!@#$%^&*]{8,64}"
}

/// Generate passwords meeting the server's complexity rules: 12 to 128
/// characters with two upper-case, two lower-case, one digit and one
/// special character.
pub fn password_strategy() -> impl Strategy<Value = String> {
    ("[A-Z]{2}", "[a-z]{2}", "[0-9]", "[!@#$%^&*-]", "[A-Za-z0-9]{6,40}")
        .prop_map(|(upper, lower, digit, special, rest)| format!("{upper}{lower}{digit}{special}{rest}"))
}

/// Generate HTTP status codes the client classifies.
pub fn http_status_code_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(400u16),
        Just(401u16),
        Just(403u16),
        Just(404u16),
        Just(409u16),
        Just(422u16),
        Just(429u16),
        Just(500u16),
        Just(502u16),
        Just(503u16),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::is_valid_password;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_passwords_are_valid() {
        let mut runner = TestRunner::default();
        for _ in 0..20 {
            let value = password_strategy().new_tree(&mut runner).unwrap().current();
            assert!(is_valid_password(&value), "{value}");
        }
    }

    #[test]
    fn test_path_identifier_format() {
        let mut runner = TestRunner::default();
        for _ in 0..10 {
            let value = path_identifier_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(!value.is_empty());
            assert!(!value.ends_with('/'));
            assert!(!value.contains("//"));
        }
    }
}
