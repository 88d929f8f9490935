use ethers_core::types::U256;

use crate::fetch::FetchContext;
use crate::models::NetworkUtilization;

/// Share of the gas limit used, as a percentage truncated to two decimals.
pub fn utilization_percent(gas_used: U256, gas_limit: U256) -> f64 {
    if gas_limit.is_zero() {
        return 0.0;
    }
    let basis_points = gas_used.saturating_mul(U256::from(10_000u64)) / gas_limit;
    basis_points.low_u64() as f64 / 100.0
}

/// Gas utilization of the latest block. `None` when the head block cannot be
/// read.
pub async fn fetch_network_utilization(ctx: &FetchContext) -> Option<NetworkUtilization> {
    let latest = ctx.latest_block_number().await?;
    let block = ctx.block_header(latest).await?;
    Some(NetworkUtilization {
        utilization: utilization_percent(block.gas_used, block.gas_limit),
        gas_used: block.gas_used.to_string(),
        gas_limit: block.gas_limit.to_string(),
        current_block: latest,
    })
}
