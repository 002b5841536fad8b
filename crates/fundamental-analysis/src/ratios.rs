//! Plain accounting ratios used to fill gaps in vendor fundamentals.

pub fn pe_ratio(price: f64, eps: f64) -> Option<f64> {
    if eps > 0.0 && price > 0.0 {
        Some(price / eps)
    } else {
        None
    }
}

/// Net margin as a decimal (0.25 = 25%)
pub fn profit_margin(net_income: f64, revenue: f64) -> Option<f64> {
    if revenue > 0.0 {
        Some(net_income / revenue)
    } else {
        None
    }
}

/// Effective tax rate from the income statement; `None` when pretax income is zero.
pub fn effective_tax_rate(tax_provision: f64, pretax_income: f64) -> Option<f64> {
    if pretax_income != 0.0 {
        Some((tax_provision / pretax_income).abs())
    } else {
        None
    }
}
