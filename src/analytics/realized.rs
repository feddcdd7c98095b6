const DAYS_PER_YEAR: f64 = 365.0;

/// Annualized yield earned by buying PT at `bond_price` and holding it for
/// `days` until redemption at 1.0: `(1/p - 1) / (days / 365)`.
///
/// Returns `None` for a non-positive price or horizon; those are data-quality
/// failures, not yields.
pub fn realized_apy(bond_price: f64, days: f64) -> Option<f64> {
    if !bond_price.is_finite() || !days.is_finite() || bond_price <= 0.0 || days <= 0.0 {
        return None;
    }
    let tau = days / DAYS_PER_YEAR;
    Some((1.0 / bond_price - 1.0) / tau)
}
