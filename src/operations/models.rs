use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;
use crate::ledger::models::Network;

/// Workflow selected by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    GenerateWallet,
    Swap,
    Bridge,
    GenerateWalletAndSwap,
    Transfer,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::GenerateWallet => "generate_wallet",
            OperationKind::Swap => "swap",
            OperationKind::Bridge => "bridge",
            OperationKind::GenerateWalletAndSwap => "generate_wallet_and_swap",
            OperationKind::Transfer => "transfer",
        }
    }

    pub fn all() -> Vec<OperationKind> {
        vec![
            OperationKind::GenerateWallet,
            OperationKind::Swap,
            OperationKind::Bridge,
            OperationKind::GenerateWalletAndSwap,
            OperationKind::Transfer,
        ]
    }

    /// Exact match on an explicit `kind` tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::all().into_iter().find(|k| k.as_str() == tag.trim())
    }

    /// Derive the kind from a verb name when no tag is given.
    ///
    /// Both `generate_wallet` and `swap` present selects the composite;
    /// otherwise the first matching token wins in the order
    /// generate_wallet, swap, bridge, transfer.
    pub fn from_name(name: &str) -> Option<Self> {
        let has_generate = name.contains("generate_wallet");
        let has_swap = name.contains("swap");

        if has_generate && has_swap {
            Some(OperationKind::GenerateWalletAndSwap)
        } else if has_generate {
            Some(OperationKind::GenerateWallet)
        } else if has_swap {
            Some(OperationKind::Swap)
        } else if name.contains("bridge") {
            Some(OperationKind::Bridge)
        } else if name.contains("transfer") {
            Some(OperationKind::Transfer)
        } else {
            None
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateWalletParams {
    pub wallet_count: u32,
    pub feed_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    /// Share of the baseline balance to swap, in (0, 1]
    pub swap_fraction: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeParams {
    pub from: Network,
    pub to: Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferParams {
    pub to: Address,
    pub amount: Decimal,
}

/// Validated payload, one variant per workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationSpec {
    GenerateWallet(GenerateWalletParams),
    Swap(SwapParams),
    Bridge(BridgeParams),
    GenerateWalletAndSwap {
        wallets: GenerateWalletParams,
        swap: SwapParams,
    },
    Transfer(TransferParams),
    /// Kept so dispatch can warn and move on
    Unrecognized { tag: Option<String> },
}

impl OperationSpec {
    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            OperationSpec::GenerateWallet(_) => Some(OperationKind::GenerateWallet),
            OperationSpec::Swap(_) => Some(OperationKind::Swap),
            OperationSpec::Bridge(_) => Some(OperationKind::Bridge),
            OperationSpec::GenerateWalletAndSwap { .. } => {
                Some(OperationKind::GenerateWalletAndSwap)
            }
            OperationSpec::Transfer(_) => Some(OperationKind::Transfer),
            OperationSpec::Unrecognized { .. } => None,
        }
    }
}

/// A registry entry after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub id: i64,
    pub name: String,
    pub spec: OperationSpec,
}

/// A registry entry as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOperation {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl RawOperation {
    pub fn validate(&self) -> Result<Operation, RegistryError> {
        let kind = match self.kind.as_deref() {
            Some(tag) => OperationKind::from_tag(tag),
            None => OperationKind::from_name(&self.name),
        };

        let spec = match kind {
            Some(OperationKind::GenerateWallet) => {
                OperationSpec::GenerateWallet(self.generate_wallet_params()?)
            }
            Some(OperationKind::Swap) => OperationSpec::Swap(self.swap_params()?),
            Some(OperationKind::Bridge) => OperationSpec::Bridge(BridgeParams {
                from: self.network("from")?,
                to: self.network("to")?,
            }),
            Some(OperationKind::GenerateWalletAndSwap) => OperationSpec::GenerateWalletAndSwap {
                wallets: self.generate_wallet_params()?,
                swap: self.swap_params()?,
            },
            Some(OperationKind::Transfer) => OperationSpec::Transfer(TransferParams {
                to: self.address("to")?,
                amount: self.positive_decimal("amount")?,
            }),
            None => OperationSpec::Unrecognized {
                tag: self.kind.clone(),
            },
        };

        Ok(Operation {
            id: self.id,
            name: self.name.clone(),
            spec,
        })
    }

    fn generate_wallet_params(&self) -> Result<GenerateWalletParams, RegistryError> {
        let wallet_count = match self.field("wallet_count")? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
        .filter(|count| *count > 0)
        .and_then(|count| u32::try_from(count).ok())
        .ok_or_else(|| self.invalid("wallet_count", "must be a positive integer"))?;

        Ok(GenerateWalletParams {
            wallet_count,
            feed_amount: self.positive_decimal("feed_amount")?,
        })
    }

    fn swap_params(&self) -> Result<SwapParams, RegistryError> {
        let swap_fraction = self.positive_decimal("swap_fraction")?;
        if swap_fraction > Decimal::ONE {
            return Err(self.invalid("swap_fraction", "must be in (0, 1]"));
        }
        Ok(SwapParams { swap_fraction })
    }

    fn field(&self, field: &'static str) -> Result<&Value, RegistryError> {
        self.details
            .get(field)
            .filter(|v| !v.is_null())
            .ok_or_else(|| RegistryError::MissingField {
                id: self.id,
                name: self.name.clone(),
                field,
            })
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> RegistryError {
        RegistryError::InvalidField {
            id: self.id,
            name: self.name.clone(),
            field,
            reason: reason.into(),
        }
    }

    fn positive_decimal(&self, field: &'static str) -> Result<Decimal, RegistryError> {
        let raw = match self.field(field)? {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            other => return Err(self.invalid(field, format!("expected a number, got {}", other))),
        };
        let value = Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|e| self.invalid(field, e.to_string()))?;

        if value <= Decimal::ZERO {
            return Err(self.invalid(field, "must be greater than zero"));
        }
        Ok(value)
    }

    fn text(&self, field: &'static str) -> Result<&str, RegistryError> {
        self.field(field)?
            .as_str()
            .ok_or_else(|| self.invalid(field, "expected a string"))
    }

    fn network(&self, field: &'static str) -> Result<Network, RegistryError> {
        let raw = self.text(field)?;
        Network::from_str(raw).map_err(|e| self.invalid(field, e.to_string()))
    }

    fn address(&self, field: &'static str) -> Result<Address, RegistryError> {
        let raw = self.text(field)?;
        Address::from_str(raw.trim()).map_err(|e| self.invalid(field, e.to_string()))
    }
}
