use alloy_primitives::address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::adapters::traits::{SwapProvider, SwapRoute};
use crate::error::{AppError, AppResult};
use crate::execution::bridge::Bridge;
use crate::execution::native::NativeTransfer;
use crate::ledger::models::{Asset, BridgeRoute};
use crate::operations::models::{
    BridgeParams, GenerateWalletParams, Operation, OperationSpec, SwapParams, TransferParams,
};
use crate::operations::registry::OperationRegistry;
use crate::wallet::AccountManager;

/// Constants the workflows size their orders with
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Notional balance swaps are sized against; live balances are not consulted
    pub baseline_balance: Decimal,
    pub bridge_amount: Decimal,
    pub funding_route: BridgeRoute,
    pub swap_route: SwapRoute,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            baseline_balance: dec!(0.01),
            bridge_amount: dec!(0.01),
            funding_route: BridgeRoute::native_deposit(),
            swap_route: SwapRoute::new(
                vec![
                    address!("8c3e3f2983db650727f3e05b7a7773e4d641537b"),
                    address!("a5900cce51c45ab9730039943b3863c822342034"),
                ],
                vec![2000],
            ),
        }
    }
}

/// Routes an operation to its workflow handler
pub struct OperationDispatcher {
    config: WorkflowConfig,
    funding: Arc<AccountManager>,
    farming: Arc<AccountManager>,
    bridge: Arc<dyn Bridge>,
    swap: Arc<dyn SwapProvider>,
    transfer: Arc<dyn NativeTransfer>,
}

impl OperationDispatcher {
    pub fn new(
        config: WorkflowConfig,
        funding: Arc<AccountManager>,
        farming: Arc<AccountManager>,
        bridge: Arc<dyn Bridge>,
        swap: Arc<dyn SwapProvider>,
        transfer: Arc<dyn NativeTransfer>,
    ) -> Self {
        Self {
            config,
            funding,
            farming,
            bridge,
            swap,
            transfer,
        }
    }

    /// Reload both identity tables from disk
    pub fn reload_identities(&self) {
        self.funding.load();
        self.farming.load();
    }

    /// Look up `operation_id` and run it.
    ///
    /// An id the registry does not know is logged and treated as done.
    pub async fn dispatch(&self, registry: &OperationRegistry, operation_id: i64) -> AppResult<()> {
        match registry.get(operation_id) {
            Some(operation) => self.execute(operation).await,
            None => {
                let e = AppError::UnknownOperation(format!("no operation with id {}", operation_id));
                warn!("⚠️ {}", e);
                Ok(())
            }
        }
    }

    #[instrument(skip(self, operation), fields(operation_id = operation.id, name = %operation.name))]
    pub async fn execute(&self, operation: &Operation) -> AppResult<()> {
        info!("▶️ Executing operation: {}", operation.name);

        match &operation.spec {
            OperationSpec::GenerateWallet(params) => {
                self.generate_wallet(operation.id, params).await?
            }
            OperationSpec::Swap(params) => self.swap(operation.id, params).await,
            OperationSpec::Bridge(params) => self.bridge(operation.id, params).await,
            OperationSpec::GenerateWalletAndSwap { wallets, swap } => {
                self.generate_wallet(operation.id, wallets).await?;
                self.swap(operation.id, swap).await;
            }
            OperationSpec::Transfer(params) => self.transfer(operation.id, params).await?,
            OperationSpec::Unrecognized { tag } => {
                let e = AppError::UnknownOperation(match tag {
                    Some(tag) => format!("{} (kind {})", operation.name, tag),
                    None => operation.name.clone(),
                });
                warn!("⚠️ Cant find operation: {}", e);
                return Ok(());
            }
        }

        info!("⏹️ Finished executing operation: {}", operation.name);
        Ok(())
    }

    /// Create `wallet_count` farming identities and fund each across the bridge.
    ///
    /// Identities stay persisted when their funding fails.
    async fn generate_wallet(&self, operation_id: i64, params: &GenerateWalletParams) -> AppResult<()> {
        let funder = self.funding.first_identity()?;
        let mut funded = 0u32;

        for i in 0..params.wallet_count {
            let identity = self.farming.create_and_persist()?;
            match self
                .bridge
                .transfer_and_bridge(
                    &funder,
                    identity.address(),
                    self.config.funding_route,
                    params.feed_amount,
                    Some(operation_id),
                )
                .await
            {
                Ok(_) => funded += 1,
                Err(e) => error!(
                    "❌ Funding {} ({}/{}) failed: {}",
                    identity.checksum_address(),
                    i + 1,
                    params.wallet_count,
                    e
                ),
            }
        }

        info!(
            "✅ Successfully generated {} new wallets ({} funded)",
            params.wallet_count, funded
        );
        Ok(())
    }

    /// One swap per farming identity, sized against the baseline balance
    async fn swap(&self, operation_id: i64, params: &SwapParams) {
        let amount = self.config.baseline_balance * params.swap_fraction;
        let identities = self.farming.list_signing_identities();

        let mut swapped = 0usize;
        for identity in &identities {
            match self
                .swap
                .swap(identity, &self.config.swap_route, amount, Some(operation_id))
                .await
            {
                Ok(_) => swapped += 1,
                Err(e) => error!("❌ Swap for {} failed: {}", identity.checksum_address(), e),
            }
        }

        info!("🔄 Swapped {} for {}/{} identities", amount, swapped, identities.len());
    }

    /// Bridge a fixed amount for every farming identity; other routes do nothing
    async fn bridge(&self, operation_id: i64, params: &BridgeParams) {
        let route = BridgeRoute::new(params.from, params.to, Asset::Eth);
        if !route.is_supported() {
            info!("No bridge for {} -> {}, nothing submitted", params.from, params.to);
            return;
        }

        for identity in self.farming.list_signing_identities() {
            if let Err(e) = self
                .bridge
                .bridge(&identity, route, self.config.bridge_amount, Some(operation_id))
                .await
            {
                error!("❌ Bridge for {} failed: {}", identity.checksum_address(), e);
            }
        }
    }

    /// Native transfer from the first funding identity
    async fn transfer(&self, operation_id: i64, params: &TransferParams) -> AppResult<()> {
        let sender = self.funding.first_identity()?;
        self.transfer
            .transfer(
                &sender,
                params.to,
                self.transfer.network().native_asset(),
                params.amount,
                Some(operation_id),
            )
            .await?;
        Ok(())
    }
}
