//! Known miner/validator display names.

use alloy::primitives::Address;
use std::collections::HashMap;

/// Address to display name lookup, loaded once per run.
///
/// Keys are parsed addresses, so lookups ignore checksum casing.
#[derive(Debug, Clone, Default)]
pub struct MinerDirectory {
    names: HashMap<Address, String>,
}

impl MinerDirectory {
    /// Build a directory from `(address, name)` pairs. The first name given
    /// for an address is kept.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Address, S)>,
        S: Into<String>,
    {
        let mut names = HashMap::new();
        for (address, name) in entries {
            names.entry(address).or_insert_with(|| name.into());
        }
        Self { names }
    }

    /// Display name for `address`, or an empty string if unknown.
    pub fn name_for(&self, address: &Address) -> &str {
        self.names.get(address).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_lookup_ignores_checksum_case() {
        let checksummed = Address::from_str("0xEA674fdDe714fd979de3EdF0F56AA9716B898ec8").unwrap();
        let lowercase = Address::from_str("0xea674fdde714fd979de3edf0f56aa9716b898ec8").unwrap();
        let directory = MinerDirectory::from_entries([(checksummed, "Ethermine")]);

        assert_eq!(directory.name_for(&lowercase), "Ethermine");
    }

    #[test]
    fn test_unknown_miner_has_empty_name() {
        let directory = MinerDirectory::default();
        assert_eq!(directory.name_for(&Address::ZERO), "");
        assert!(directory.is_empty());
    }

    #[test]
    fn test_first_entry_wins() {
        let address = Address::repeat_byte(7);
        let directory = MinerDirectory::from_entries([(address, "first"), (address, "second")]);
        assert_eq!(directory.name_for(&address), "first");
        assert_eq!(directory.len(), 1);
    }
}
