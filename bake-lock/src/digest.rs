use crc::{Crc, CRC_64_ISO_3309};
use std::collections::BTreeMap;

const CRC64_ISO: Crc<u64> = Crc::<u64>::new(&CRC_64_ISO_3309);

/// Hex CRC-64 (ISO polynomial) of the raw command bytes.
pub fn digest_command(command: &str) -> String {
    hex::encode(CRC64_ISO.checksum(command.as_bytes()).to_be_bytes())
}

/// Hex CRC-64 (ISO polynomial) of the environment, serialized as a
/// `BTreeMap`-sorted `KEY=VALUE\n`-joined string. Sorting is required:
/// hashing a `HashMap`'s iteration order would make the digest nondeterministic.
pub fn digest_env(env: &BTreeMap<String, String>) -> String {
    let mut buf = String::new();
    for (key, value) in env {
        buf.push_str(key);
        buf.push('=');
        buf.push_str(value);
        buf.push('\n');
    }
    hex::encode(CRC64_ISO.checksum(buf.as_bytes()).to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_digest_is_independent_of_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("B".to_string(), "2".to_string());
        a.insert("A".to_string(), "1".to_string());

        let mut b = BTreeMap::new();
        b.insert("A".to_string(), "1".to_string());
        b.insert("B".to_string(), "2".to_string());

        assert_eq!(digest_env(&a), digest_env(&b));
    }

    #[test]
    fn command_digest_changes_with_command_text() {
        assert_ne!(digest_command("echo a"), digest_command("echo b"));
    }
}
