//! VAT arithmetic.

/// Upper-cases a policy-market header value into a country code. The value
/// is otherwise passed through untouched; an empty value means no market.
pub fn get_vat_country_code(policy_market: Option<&str>) -> Option<String> {
    policy_market
        .filter(|m| !m.is_empty())
        .map(str::to_uppercase)
}

/// `base * (1 + rate)` rounded half-up to two decimals.
///
/// Rounding is applied to the scaled value (`floor(x * 100 + 0.5) / 100`),
/// so binary representation error only matters at the rounding step.
pub fn calculate_price_with_vat(base: f64, rate: f64) -> f64 {
    let with_vat = base * (1.0 + rate);
    (with_vat * 100.0 + 0.5).floor() / 100.0
}
