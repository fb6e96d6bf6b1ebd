//! Helius-style swap webhook ingestion: HMAC verification over the raw
//! body, payload parsing, and BUY/SELL direction inference.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use trading_core::types::swap::{SwapDirection, SwapEvent, WRAPPED_SOL_MINT};

use crate::error::GatewayError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
pub struct TokenTransfer {
    #[serde(rename = "fromUserAccount")]
    pub from_user_account: String,
    #[serde(rename = "toUserAccount")]
    pub to_user_account: String,
    pub mint: String,
    #[serde(rename = "tokenAmount")]
    pub token_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AccountDataEntry {
    pub account: String,
    #[serde(rename = "nativeBalanceChange", default)]
    pub native_balance_change: i64,
}

/// A Helius enhanced-webhook payload, trimmed to the fields this gateway
/// actually consumes (`§6` wire format: `webhookID`, `type`, `timestamp`,
/// `signature`, `fee`, `feePayer`, `slot`, `nativeTransfers`,
/// `tokenTransfers[]`, `accountData[]`, `source`, `description`).
#[derive(Debug, Deserialize)]
pub struct HeliusSwapPayload {
    #[serde(rename = "webhookID")]
    #[allow(dead_code)]
    pub webhook_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: i64,
    pub signature: String,
    pub fee: u64,
    #[serde(rename = "feePayer")]
    pub fee_payer: String,
    pub slot: u64,
    #[serde(rename = "tokenTransfers", default)]
    pub token_transfers: Vec<TokenTransfer>,
    #[serde(rename = "accountData", default)]
    #[allow(dead_code)]
    pub account_data: Vec<AccountDataEntry>,
    #[allow(dead_code)]
    pub source: Option<String>,
    #[allow(dead_code)]
    pub description: Option<String>,
}

/// Verify `X-Helius-Signature` as HMAC-SHA256 over the exact raw request
/// body, using constant-time comparison.
pub fn verify_signature(secret: &str, raw_body: &[u8], signature_hex: &str) -> Result<(), GatewayError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| GatewayError::SignatureInvalid)?;
    mac.update(raw_body);
    let expected = hex::decode(signature_hex).map_err(|_| GatewayError::SignatureInvalid)?;
    mac.verify_slice(&expected).map_err(|_| GatewayError::SignatureInvalid)
}

/// Turn a parsed Helius payload into a `SwapEvent`, inferring BUY/SELL by
/// comparing the fee-payer's sent/received legs against the wrapped-SOL
/// mint. Non-SWAP payloads and payloads with no matching token leg are
/// dropped (`Ok(None)`), not treated as errors.
pub fn parse_swap_event(payload: &HeliusSwapPayload) -> Result<Option<SwapEvent>, GatewayError> {
    if payload.event_type != "SWAP" {
        return Ok(None);
    }

    let wallet = &payload.fee_payer;

    // BUY: wallet sends wrapped SOL, receives the token.
    let buy_leg = payload.token_transfers.iter().find(|t| {
        t.mint == WRAPPED_SOL_MINT && t.from_user_account == *wallet
    });
    let received_token = buy_leg.and_then(|sol_leg| {
        payload
            .token_transfers
            .iter()
            .find(|t| t.mint != WRAPPED_SOL_MINT && t.to_user_account == *wallet)
            .map(|token_leg| (sol_leg, token_leg))
    });

    if let Some((sol_leg, token_leg)) = received_token {
        let timestamp = timestamp_from_unix(payload.timestamp);
        return Ok(Some(SwapEvent::new(
            payload.signature.clone(),
            wallet.clone(),
            token_leg.mint.clone(),
            SwapDirection::Buy,
            sol_leg.token_amount,
            token_leg.token_amount,
            payload.slot,
            payload.fee,
            timestamp,
        )));
    }

    // SELL: wallet sends the token, receives wrapped SOL.
    let sell_leg = payload.token_transfers.iter().find(|t| {
        t.mint != WRAPPED_SOL_MINT && t.from_user_account == *wallet
    });
    let received_sol = sell_leg.and_then(|token_leg| {
        payload
            .token_transfers
            .iter()
            .find(|t| t.mint == WRAPPED_SOL_MINT && t.to_user_account == *wallet)
            .map(|sol_leg| (token_leg, sol_leg))
    });

    if let Some((token_leg, sol_leg)) = received_sol {
        let timestamp = timestamp_from_unix(payload.timestamp);
        return Ok(Some(SwapEvent::new(
            payload.signature.clone(),
            wallet.clone(),
            token_leg.mint.clone(),
            SwapDirection::Sell,
            sol_leg.token_amount,
            token_leg.token_amount,
            payload.slot,
            payload.fee,
            timestamp,
        )));
    }

    Ok(None)
}

fn timestamp_from_unix(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now)
}
