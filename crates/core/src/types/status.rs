//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Order lifecycle status as stored in the `orders` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed with a shipping address; awaiting fulfilment.
    #[default]
    Pending,
    /// Placed without shipping capture; nothing left to do.
    Completed,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// How the shopper pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    /// Pay the courier on delivery.
    #[default]
    #[serde(rename = "cod")]
    CashOnDelivery,
    /// Card or wallet payment at checkout. Shown but not yet accepted.
    #[serde(rename = "online")]
    Online,
}

impl PaymentMethod {
    /// Whether orders may currently be placed with this method.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::CashOnDelivery)
    }

    /// Short code stored on the order row.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cod",
            Self::Online => "online",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::CashOnDelivery),
            "online" => Ok(Self::Online),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}
