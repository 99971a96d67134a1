//! Order total computation.

use std::collections::HashMap;

use common::{Money, ProductId};
use store::Product;

use super::{OrderError, OrderLineRequest};

/// Computes order totals from current catalog prices.
pub struct PricingCalculator;

impl PricingCalculator {
    /// Sums `quantity * unit price` over the requested lines.
    ///
    /// Every requested product must be present in `products`, otherwise the
    /// calculation fails with `ProductNotFound` for the first missing one.
    /// A total that does not fit in minor units fails with `TotalOverflow`.
    pub fn total_price(
        lines: &[OrderLineRequest],
        products: &[Product],
    ) -> Result<Money, OrderError> {
        let prices: HashMap<ProductId, Money> =
            products.iter().map(|p| (p.id, p.price)).collect();

        lines.iter().try_fold(Money::zero(), |total, line| {
            let price = prices
                .get(&line.product_id)
                .ok_or(OrderError::ProductNotFound(line.product_id))?;
            price
                .checked_mul(line.quantity)
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or(OrderError::TotalOverflow(line.product_id))
        })
    }
}
