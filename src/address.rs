//! Sender / receiver resolution for transactions without contract metadata.

use alloy_primitives::Address;
use tracing::debug;

use crate::error::TransformError;
use crate::hex_format::strip_hex_prefix;
use crate::qtum_rpc_client::QtumRpcReadClient;
use crate::qtum_types::{DecodedRawTransaction, Vout};

/// Base58check payload: one version byte followed by a 20-byte hash.
const BASE58_PAYLOAD_LEN: usize = 21;

/// Converts a source-chain address (base58check, or raw 20-byte hex) into an
/// Ethereum-style `0x` address.
pub fn to_eth_address(address: &str) -> Result<String, TransformError> {
    let digits = strip_hex_prefix(address);
    if digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(format!("0x{}", digits.to_ascii_lowercase()));
    }

    let payload = bitcoin::base58::decode_check(address).map_err(|e| {
        TransformError::AddressResolution(format!("invalid address {:?}: {}", address, e))
    })?;
    if payload.len() != BASE58_PAYLOAD_LEN {
        return Err(TransformError::AddressResolution(format!(
            "address {:?} decodes to {} bytes, expected {}",
            address,
            payload.len(),
            BASE58_PAYLOAD_LEN
        )));
    }
    Ok(format!("0x{:x}", Address::from_slice(&payload[1..])))
}

/// Follows the first input back to the output it spends and returns that output's address.
pub async fn sender_address(
    client: &dyn QtumRpcReadClient,
    decoded: &DecodedRawTransaction,
) -> Result<String, TransformError> {
    let vin = decoded.vin.first().ok_or_else(|| {
        TransformError::AddressResolution(format!("transaction {} has no inputs", decoded.txid))
    })?;
    let (prev_txid, prev_vout) = match (&vin.txid, vin.vout) {
        (Some(txid), Some(vout)) => (txid.as_str(), vout),
        _ => {
            return Err(TransformError::AddressResolution(format!(
                "first input of transaction {} doesn't reference a previous output",
                decoded.txid
            )))
        }
    };

    debug!(txid = %decoded.txid, prev_txid, prev_vout, "resolving sender from previous output");
    let prev = client
        .get_raw_transaction(prev_txid, true)
        .await
        .map_err(TransformError::upstream(format!(
            "couldn't get previous transaction {}",
            prev_txid
        )))?;

    let output = prev
        .vout
        .iter()
        .find(|out| out.n == prev_vout)
        .ok_or_else(|| {
            TransformError::AddressResolution(format!(
                "previous transaction {} has no output {}",
                prev_txid, prev_vout
            ))
        })?;
    let address = output.script_pub_key.destination().ok_or_else(|| {
        TransformError::AddressResolution(format!(
            "output {}:{} has no destination address",
            prev_txid, prev_vout
        ))
    })?;
    to_eth_address(address)
}

/// First output paying to a standard address.
pub fn receiver_address(vouts: &[Vout]) -> Result<String, TransformError> {
    let address = vouts
        .iter()
        .find_map(|vout| vout.script_pub_key.destination())
        .ok_or_else(|| {
            TransformError::AddressResolution("no output carries a destination address".to_string())
        })?;
    to_eth_address(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qtum_types::ScriptPubKey;

    fn p2pkh_address(version: u8, hash: [u8; 20]) -> String {
        let mut payload = vec![version];
        payload.extend_from_slice(&hash);
        bitcoin::base58::encode_check(&payload)
    }

    fn vout(n: u32, addresses: Vec<String>) -> Vout {
        Vout {
            value: 1.0,
            n,
            script_pub_key: ScriptPubKey {
                addresses,
                ..Default::default()
            },
        }
    }

    #[test]
    fn base58_address_converts_to_hash160() {
        let address = p2pkh_address(0x78, [0xab; 20]);
        assert_eq!(
            to_eth_address(&address).unwrap(),
            format!("0x{}", "ab".repeat(20))
        );
    }

    #[test]
    fn hex_address_is_normalized() {
        let hex = "0x7926223070547D2D15B2EF5E7383E541C338FFE9";
        assert_eq!(
            to_eth_address(hex).unwrap(),
            "0x7926223070547d2d15b2ef5e7383e541c338ffe9"
        );
    }

    #[test]
    fn corrupted_address_fails() {
        let mut address = p2pkh_address(0x78, [0x01; 20]);
        address.pop();
        address.push('z');
        assert!(matches!(
            to_eth_address(&address),
            Err(TransformError::AddressResolution(_))
        ));
    }

    #[test]
    fn receiver_skips_outputs_without_address() {
        let address = p2pkh_address(0x78, [0x22; 20]);
        let vouts = vec![vout(0, vec![]), vout(1, vec![address])];
        assert_eq!(
            receiver_address(&vouts).unwrap(),
            format!("0x{}", "22".repeat(20))
        );
    }

    #[test]
    fn receiver_fails_without_addresses() {
        let vouts = vec![vout(0, vec![]), vout(1, vec![])];
        assert!(matches!(
            receiver_address(&vouts),
            Err(TransformError::AddressResolution(_))
        ));
    }
}
