use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern, so values
/// round-trip through the TEXT columns the store uses.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

// Terminal once 'completed' or 'cancelled'; only 'authorized' holds are
// ever captured or released by the sweeps.
str_enum!(PaymentStatus {
    Authorized => "authorized",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(NotificationType {
    Payment => "payment",
    Error => "error",
});

str_enum!(PlanTier {
    Free => "free",
    Basic => "basic",
    BasicFamily => "basic_family",
    Premium => "premium",
    PremiumFamily => "premium_family",
    Ultra => "ultra",
    UltraFamily => "ultra_family",
});
