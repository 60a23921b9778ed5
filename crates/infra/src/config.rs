//! Engine configuration.
//!
//! Defaults suit a single-process deployment; each knob can be overridden
//! through the environment:
//!
//! | variable                     | default | meaning                               |
//! |------------------------------|---------|---------------------------------------|
//! | `TALLY_MAX_CONFLICT_RETRIES` | `3`     | re-plans after a stale-version commit |
//! | `TALLY_INVOICE_PREFIX`       | `INV`   | invoice number prefix                 |
//! | `TALLY_OVERPAYMENT`          | `allow` | `allow` or `reject`                   |

use anyhow::{Context, bail};

use tally_invoicing::OverpaymentPolicy;

pub const MAX_CONFLICT_RETRIES_VAR: &str = "TALLY_MAX_CONFLICT_RETRIES";
pub const INVOICE_PREFIX_VAR: &str = "TALLY_INVOICE_PREFIX";
pub const OVERPAYMENT_VAR: &str = "TALLY_OVERPAYMENT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How many times an operation re-reads and re-plans after a conflict.
    pub max_conflict_retries: u32,
    pub invoice_number_prefix: String,
    pub overpayment: OverpaymentPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            invoice_number_prefix: "INV".to_string(),
            overpayment: OverpaymentPolicy::Allow,
        }
    }
}

impl EngineConfig {
    /// Load from process environment, falling back to defaults for unset variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (used by `from_env` and tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_CONFLICT_RETRIES_VAR) {
            config.max_conflict_retries = raw
                .trim()
                .parse()
                .with_context(|| format!("{MAX_CONFLICT_RETRIES_VAR} must be a non-negative integer, got {raw:?}"))?;
        }

        if let Some(raw) = lookup(INVOICE_PREFIX_VAR) {
            let prefix = raw.trim();
            if prefix.is_empty() {
                bail!("{INVOICE_PREFIX_VAR} cannot be empty");
            }
            config.invoice_number_prefix = prefix.to_string();
        }

        if let Some(raw) = lookup(OVERPAYMENT_VAR) {
            config.overpayment = match raw.trim().to_ascii_lowercase().as_str() {
                "allow" => OverpaymentPolicy::Allow,
                "reject" => OverpaymentPolicy::Reject,
                other => bail!("{OVERPAYMENT_VAR} must be `allow` or `reject`, got {other:?}"),
            };
        }

        Ok(config)
    }

    /// `{prefix}-{sequence:05}`, e.g. `INV-00042`.
    pub fn format_invoice_number(&self, sequence: u64) -> String {
        format!("{}-{:05}", self.invoice_number_prefix, sequence)
    }
}
