//! Models of the source node's RPC results.
//!
//! Field names follow the node's JSON; only what the transformers read is modeled.

use serde::Deserialize;

use crate::error::TransformError;
use crate::hex_format::amount_to_base_units;

/// `getblockheader` result.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeader {
    pub hash: String,
    pub height: u64,
    /// Absent for the genesis block.
    #[serde(rename = "previousblockhash", default)]
    pub previous_block_hash: String,
    pub difficulty: f64,
    #[serde(rename = "hashStateRoot", default)]
    pub hash_state_root: String,
    pub time: u64,
    pub nonce: u64,
}

impl BlockHeader {
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
}

/// `getblock` result at verbosity 1.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub hash: String,
    pub height: u64,
    pub size: u64,
    pub merkleroot: String,
    pub nonce: u64,
    #[serde(default)]
    pub tx: Vec<String>,
}

/// `gettransaction` result (wallet-level lookup).
#[derive(Debug, Clone, Deserialize)]
pub struct WalletTransaction {
    pub txid: String,
    pub hex: String,
    #[serde(default)]
    pub blockhash: String,
    #[serde(default)]
    pub blockindex: u64,
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub details: Vec<TransactionDetail>,
}

impl WalletTransaction {
    pub fn is_pending(&self) -> bool {
        self.blockhash.is_empty()
    }

    pub fn first_label(&self) -> Option<&str> {
        self.details
            .iter()
            .map(|detail| detail.label.as_str())
            .find(|label| !label.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionDetail {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub vout: u32,
}

/// `getrawtransaction` result. The non-verbose form only fills `hex`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub txid: String,
    #[serde(default)]
    pub hex: String,
    #[serde(default)]
    pub blockhash: String,
    #[serde(default)]
    pub vin: Vec<Vin>,
    #[serde(default)]
    pub vout: Vec<Vout>,
}

impl RawTransaction {
    pub fn is_pending(&self) -> bool {
        self.blockhash.is_empty()
    }
}

/// `decoderawtransaction` result.
#[derive(Debug, Clone, Deserialize)]
pub struct DecodedRawTransaction {
    pub txid: String,
    #[serde(default)]
    pub vin: Vec<Vin>,
    #[serde(default)]
    pub vout: Vec<Vout>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Vin {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub vout: Option<u32>,
    #[serde(default)]
    pub coinbase: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vout {
    pub value: f64,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptPubKey {
    #[serde(default)]
    pub asm: String,
    #[serde(default)]
    pub hex: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl ScriptPubKey {
    /// Standard destination, if the script pays to one.
    pub fn destination(&self) -> Option<&str> {
        self.addresses
            .first()
            .map(String::as_str)
            .or(self.address.as_deref())
    }
}

/// `gettxout` result; the node returns `null` for spent outputs.
#[derive(Debug, Clone, Deserialize)]
pub struct TxOut {
    #[serde(default)]
    pub bestblock: String,
    #[serde(default)]
    pub confirmations: u64,
    pub value: f64,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
    #[serde(default)]
    pub coinbase: bool,
}

/// Smart-contract invocation carried in an output script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInfo {
    /// OP_SENDER pubkey hash, hex.
    pub from: Option<String>,
    /// Contract address; `None` for OP_CREATE.
    pub to: Option<String>,
    pub gas_used: u64,
    /// Call data or creation bytecode, hex.
    pub user_input: String,
}

impl DecodedRawTransaction {
    /// Sum of all output values in base units.
    pub fn total_amount(&self) -> Result<u64, TransformError> {
        self.vout.iter().try_fold(0u64, |total, vout| {
            let units = amount_to_base_units(vout.value)?;
            total.checked_add(units).ok_or_else(|| {
                TransformError::Format(format!(
                    "output total of transaction {} overflows",
                    self.txid
                ))
            })
        })
    }

    /// Scans the outputs for an OP_CALL / OP_CREATE script.
    pub fn contract_info(&self) -> Result<Option<ContractInfo>, TransformError> {
        for vout in &self.vout {
            if let Some(info) = parse_contract_asm(&vout.script_pub_key.asm)? {
                return Ok(Some(info));
            }
        }
        Ok(None)
    }
}

const OP_SENDER: &str = "OP_SENDER";
const OP_CALL: &str = "OP_CALL";
const OP_CREATE: &str = "OP_CREATE";

/// Parses a contract output script in asm form.
///
/// Layouts:
/// `[<addrType> <pkh> <sig> OP_SENDER] <version> <gasLimit> <gasPrice> <data> <contract> OP_CALL`
/// `[<addrType> <pkh> <sig> OP_SENDER] <version> <gasLimit> <gasPrice> <bytecode> OP_CREATE`
pub fn parse_contract_asm(asm: &str) -> Result<Option<ContractInfo>, TransformError> {
    let tokens: Vec<&str> = asm.split_whitespace().collect();
    let is_call = match tokens.last() {
        Some(&OP_CALL) => true,
        Some(&OP_CREATE) => false,
        _ => return Ok(None),
    };

    let (from, body) = match tokens.iter().position(|t| *t == OP_SENDER) {
        Some(3) => (Some(tokens[1].to_ascii_lowercase()), &tokens[4..]),
        Some(pos) => {
            return Err(TransformError::Decode(format!(
                "unexpected OP_SENDER position {} in script {:?}",
                pos, asm
            )))
        }
        None => (None, &tokens[..]),
    };

    let expected = if is_call { 6 } else { 5 };
    if body.len() != expected {
        return Err(TransformError::Decode(format!(
            "contract script has {} elements, expected {}: {:?}",
            body.len(),
            expected,
            asm
        )));
    }

    let gas_used = parse_script_number(body[1])?;
    let user_input = push_data(body[3]);
    let to = is_call.then(|| body[4].to_ascii_lowercase());

    Ok(Some(ContractInfo {
        from,
        to,
        gas_used,
        user_input,
    }))
}

/// Data push as hex. An empty push renders as `0`.
fn push_data(token: &str) -> String {
    match token {
        "0" | "OP_0" | "OP_FALSE" => String::new(),
        other => other.to_ascii_lowercase(),
    }
}

/// Pushes of up to 4 bytes are rendered in decimal, without leading zeros.
/// Anything else that happens to be all digits is a hex push.
fn is_decimal_push(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return false;
    }
    digits
        .parse::<i64>()
        .map_or(false, |value| value <= i64::from(i32::MAX))
}

/// Reads a script number as rendered in asm: decimal for small pushes,
/// otherwise little-endian sign-magnitude bytes in hex.
pub fn parse_script_number(token: &str) -> Result<u64, TransformError> {
    if is_decimal_push(token) {
        let value = token
            .parse::<i64>()
            .map_err(|e| TransformError::Decode(format!("invalid script number {:?}: {}", token, e)))?;
        return u64::try_from(value)
            .map_err(|_| TransformError::Decode(format!("negative script number {}", token)));
    }

    let bytes = hex::decode(token)
        .map_err(|e| TransformError::Decode(format!("invalid script number {:?}: {}", token, e)))?;
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(TransformError::Decode(format!(
            "script number {:?} has unsupported width {}",
            token,
            bytes.len()
        )));
    }
    if bytes[bytes.len() - 1] & 0x80 != 0 {
        return Err(TransformError::Decode(format!(
            "negative script number {}",
            token
        )));
    }

    Ok(bytes
        .iter()
        .rev()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
}
