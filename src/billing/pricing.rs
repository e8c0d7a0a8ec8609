//! Plan-tier pricing policy: consultation discounts and the emergency-charge
//! rule. Pure functions, no I/O, so the policy is testable in isolation.

use rust_decimal::Decimal;

use crate::models::enums::PlanTier;

/// A discounted consultation price.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountedPrice {
    pub final_price: Decimal,
    pub discount_percentage: u8,
}

/// Discount granted by the patient's subscription tier.
pub fn discount_percentage(plan: Option<PlanTier>) -> u8 {
    match plan {
        Some(PlanTier::Basic) | Some(PlanTier::BasicFamily) => 30,
        Some(PlanTier::Premium) | Some(PlanTier::PremiumFamily) => 50,
        Some(PlanTier::Ultra) | Some(PlanTier::UltraFamily) => 70,
        Some(PlanTier::Free) | None => 0,
    }
}

pub fn calculate_discount(base_price: Decimal, plan: Option<PlanTier>) -> DiscountedPrice {
    let discount_percentage = discount_percentage(plan);
    let final_price =
        base_price * Decimal::from(100 - u32::from(discount_percentage)) / Decimal::from(100);
    DiscountedPrice {
        final_price,
        discount_percentage,
    }
}

/// Whether an emergency consultation is billed.
///
/// Premium and ultra tiers (and their family variants) include unlimited
/// emergency consultations. Basic tiers include a monthly allowance and are
/// charged once it runs out. Free or unknown plans always pay.
pub fn should_charge_for_emergency_consultation(
    plan: Option<PlanTier>,
    consultations_left: Option<i64>,
) -> bool {
    match plan {
        Some(PlanTier::Premium)
        | Some(PlanTier::PremiumFamily)
        | Some(PlanTier::Ultra)
        | Some(PlanTier::UltraFamily) => false,
        Some(PlanTier::Basic) | Some(PlanTier::BasicFamily) => {
            !matches!(consultations_left, Some(n) if n > 0)
        }
        Some(PlanTier::Free) | None => true,
    }
}
