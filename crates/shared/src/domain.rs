use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ProductId);
id_newtype!(OrderId);
id_newtype!(PaymentId);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Delivery status of an order. Serialized exactly as the gateway stores it.
///
/// The gateway keeps the status as free text. Decoding is case-insensitive;
/// a null or blank value is the column default `Pending`, and anything else
/// unrecognised decodes as `Unknown` so the rest of the list still loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Delivering,
    Completed,
    Unknown,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Delivering => "Delivering",
            Self::Completed => "Completed",
            Self::Unknown => "Unknown",
        }
    }

    fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Pending,
            Some(raw) => raw.parse().unwrap_or(Self::Unknown),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts only the three lifecycle states; `Unknown` is never parsed.
impl FromStr for DeliveryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "delivering" => Ok(Self::Delivering),
            "completed" => Ok(Self::Completed),
            _ => Err(UnknownVariant {
                kind: "delivery status",
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for DeliveryStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeliveryStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_wire(raw.as_deref()))
    }
}

/// Payment status. The gateway stores whatever a client sent, so values
/// outside the four known ones are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    Other(String),
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [Self::Pending, Self::Paid, Self::Failed, Self::Refunded];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
            Self::Other(raw) => raw,
        }
    }

    fn from_wire(raw: Option<String>) -> Self {
        let raw = raw.unwrap_or_default();
        raw.parse().unwrap_or(Self::Other(raw))
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the four known statuses only, in any case.
impl FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "payment status",
                value: s.to_string(),
            })
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<String>::deserialize(deserializer).map(Self::from_wire)
    }
}

/// Payment methods offered by the console. The gateway stores the method as
/// free text, so records keep it as a `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Cash,
    AtmCard,
    BankTransfer,
    EWallet,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        Self::Cash,
        Self::AtmCard,
        Self::BankTransfer,
        Self::EWallet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::AtmCard => "ATM Card",
            Self::BankTransfer => "Bank Transfer",
            Self::EWallet => "E-Wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|method| {
                method
                    .as_str()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .eq_ignore_ascii_case(&wanted)
            })
            .ok_or_else(|| UnknownVariant {
                kind: "payment method",
                value: s.to_string(),
            })
    }
}
