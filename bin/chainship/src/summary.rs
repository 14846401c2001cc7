//! Human-readable output, written to stderr next to the logs.

use chainship_deploy::{DeploymentSuccess, GasPricePolicy, NetworkRegistry, VerificationResult};
use comfy_table::{Table, presets::UTF8_FULL};

/// Summary of a successful deployment.
pub fn deployment_table(success: &DeploymentSuccess) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Deployment", ""]);

    table.add_row(vec!["Network".to_string(), success.network_name.clone()]);
    table.add_row(vec![
        "Contract address".to_string(),
        success.contract_address.to_checksum(None),
    ]);
    table.add_row(vec![
        "Deployer".to_string(),
        success.deployer_address.to_checksum(None),
    ]);
    table.add_row(vec![
        "Transaction hash".to_string(),
        success.transaction_hash.to_string(),
    ]);
    table.add_row(vec![
        "Block".to_string(),
        success
            .block_number
            .map_or_else(|| "unknown".to_string(), |block| block.to_string()),
    ]);
    table.add_row(vec![
        "Gas (estimated / limit)".to_string(),
        format!("{} / {}", success.estimated_gas, success.gas_limit),
    ]);

    match &success.verification {
        VerificationResult::Confirmed(readings) => {
            let readings = readings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(vec!["Verification".to_string(), format!("ok ({})", readings)]);
        }
        VerificationResult::Unavailable(reason) => {
            table.add_row(vec![
                "Verification".to_string(),
                format!("unavailable: {}", reason),
            ]);
        }
    }

    if let Some(url) = &success.explorer_url {
        table.add_row(vec!["Explorer".to_string(), url.clone()]);
    }

    table
}

/// What the operator usually does after a deployment.
pub fn next_steps(success: &DeploymentSuccess) -> String {
    let address = success.contract_address.to_checksum(None);
    let mut steps = vec![
        format!("Save the contract address: {}", address),
        "Update your frontend with the new contract address".to_string(),
        "Verify the contract on the block explorer (optional)".to_string(),
    ];
    if let Some(url) = &success.explorer_url {
        steps.push(format!("View on the explorer: {}", url));
    }

    let mut out = String::from("Next steps:");
    for (i, step) in steps.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, step));
    }
    out
}

/// Resolved network profiles.
pub fn networks_table(registry: &NetworkRegistry) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Network",
        "Chain ID",
        "RPC URL",
        "Gas price",
        "Timeout",
        "Confirmations",
        "Explorer",
    ]);

    for (name, profile) in &registry.networks {
        let gas_price = match profile.gas_price {
            GasPricePolicy::Node => "node".to_string(),
            GasPricePolicy::Fixed(wei) => format!("{} wei", wei),
        };
        table.add_row(vec![
            name.clone(),
            profile.chain_id.to_string(),
            profile
                .rpc_url
                .as_ref()
                .map_or_else(|| "in-process".to_string(), ToString::to_string),
            gas_price,
            format!("{} ms", profile.timeout_ms),
            profile.confirmations.to_string(),
            profile.explorer_url.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }

    table
}
