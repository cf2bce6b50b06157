//! Gas price heuristics over a block's transaction set.

use alloy::primitives::{B256, U256};
use rust_decimal::Decimal;

use crate::error::{HeuristicsError, HeuristicsResult};
use crate::models::ChainTransaction;

/// Decimal places between wei and gwei.
pub const GWEI_SCALE: u32 = 9;

/// Convert a wei amount to gwei.
///
/// The conversion is exact; amounts above the decimal range are rejected
/// rather than rounded.
pub fn wei_to_gwei(hash: B256, wei: U256) -> HeuristicsResult<Decimal> {
    let out_of_range = || HeuristicsError::GasPriceOutOfRange { hash, wei };

    let wei = u128::try_from(wei).map_err(|_| out_of_range())?;
    let wei = i128::try_from(wei).map_err(|_| out_of_range())?;
    Decimal::try_from_i128_with_scale(wei, GWEI_SCALE)
        .map(|gwei| gwei.normalize())
        .map_err(|_| out_of_range())
}

/// Gas price statistics of a block relative to one of its transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPriceProfile {
    pub max_gwei: Decimal,
    pub min_gwei: Decimal,
    /// Siblings paying strictly more than the reference price.
    pub higher_count: u64,
}

impl GasPriceProfile {
    fn seed(gwei: Decimal, higher: u64) -> Self {
        Self {
            max_gwei: gwei,
            min_gwei: gwei,
            higher_count: higher,
        }
    }

    fn absorb(self, gwei: Decimal, higher: u64) -> Self {
        Self {
            max_gwei: self.max_gwei.max(gwei),
            min_gwei: self.min_gwei.min(gwei),
            higher_count: self.higher_count + higher,
        }
    }
}

/// Scan a block once, collecting max/min gas price and the number of
/// transactions priced strictly above `reference_gwei`.
///
/// # Returns
/// `None` for an empty block.
pub fn profile_block(
    reference_gwei: Decimal,
    block_txs: &[ChainTransaction],
) -> HeuristicsResult<Option<GasPriceProfile>> {
    block_txs.iter().try_fold(None::<GasPriceProfile>, |profile, tx| {
        let gwei = wei_to_gwei(tx.hash, tx.gas_price)?;
        let higher = u64::from(gwei > reference_gwei);

        Ok(Some(match profile {
            None => GasPriceProfile::seed(gwei, higher),
            Some(profile) => profile.absorb(gwei, higher),
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use std::str::FromStr;

    const GWEI: u64 = 1_000_000_000;

    fn create_test_tx(index: u64, gas_price_wei: u64) -> ChainTransaction {
        ChainTransaction {
            hash: B256::with_last_byte(index as u8 + 1),
            block_number: 1,
            from: Address::ZERO,
            to: None,
            nonce: 0,
            transaction_index: index,
            gas_price: U256::from(gas_price_wei),
        }
    }

    fn block_with_prices(prices_gwei: &[u64]) -> Vec<ChainTransaction> {
        prices_gwei
            .iter()
            .enumerate()
            .map(|(i, price)| create_test_tx(i as u64, price * GWEI))
            .collect()
    }

    #[test]
    fn test_wei_to_gwei_is_exact() {
        assert_eq!(wei_to_gwei(B256::ZERO, U256::from(GWEI)).unwrap(), Decimal::ONE);
        assert_eq!(
            wei_to_gwei(B256::ZERO, U256::from(1u64)).unwrap(),
            Decimal::from_str("0.000000001").unwrap()
        );
        assert_eq!(
            wei_to_gwei(B256::ZERO, U256::from(12_345_678_901u64)).unwrap(),
            Decimal::from_str("12.345678901").unwrap()
        );
    }

    #[test]
    fn test_wei_to_gwei_rejects_huge_values() {
        let err = wei_to_gwei(B256::ZERO, U256::MAX).unwrap_err();
        assert!(matches!(err, HeuristicsError::GasPriceOutOfRange { .. }));
    }

    #[test]
    fn test_higher_counts_for_three_tx_block() {
        let block = block_with_prices(&[5, 10, 3]);
        let counts: Vec<u64> = [5, 10, 3]
            .iter()
            .map(|price| {
                profile_block(Decimal::from(*price), &block)
                    .unwrap()
                    .unwrap()
                    .higher_count
            })
            .collect();
        assert_eq!(counts, vec![1, 0, 2]);
    }

    #[test]
    fn test_max_min_bound_every_sibling() {
        let block = block_with_prices(&[7, 2, 19, 4, 19, 1, 8]);
        let profile = profile_block(Decimal::from(4), &block).unwrap().unwrap();

        assert_eq!(profile.max_gwei, Decimal::from(19));
        assert_eq!(profile.min_gwei, Decimal::from(1));
        for tx in &block {
            let gwei = wei_to_gwei(tx.hash, tx.gas_price).unwrap();
            assert!(profile.max_gwei >= gwei);
            assert!(profile.min_gwei <= gwei);
        }
    }

    #[test]
    fn test_pairwise_higher_counts_sum() {
        let prices = [13u64, 2, 8, 21, 1, 34, 5, 3];
        let block = block_with_prices(&prices);
        let total: u64 = prices
            .iter()
            .map(|p| profile_block(Decimal::from(*p), &block).unwrap().unwrap().higher_count)
            .sum();
        let n = prices.len() as u64;
        assert_eq!(total, n * (n - 1) / 2);
    }

    #[test]
    fn test_equal_prices_are_not_higher() {
        let block = block_with_prices(&[3, 3, 3]);
        let profile = profile_block(Decimal::from(3), &block).unwrap().unwrap();
        assert_eq!(profile.higher_count, 0);
    }

    #[test]
    fn test_empty_block_has_no_profile() {
        assert_eq!(profile_block(Decimal::ONE, &[]).unwrap(), None);
    }
}
