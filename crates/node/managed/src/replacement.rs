//! Deterministic replacement of an invalidated block.
//!
//! The replacement keeps the deposits of the invalidated block and appends one deposit, sent by
//! [`INVALIDATED_BLOCK_DEPOSIT_SENDER`], whose input is the [`OutputV0`] encoding of the block it
//! replaces. The optimistic output can be recovered from that deposit afterwards.

use alloy_primitives::{Address, B256, Bytes, TxKind, U256, address, keccak256};
use alloy_rlp::{Decodable, Encodable};
use kona_interop::OutputV0;
use op_alloy_consensus::TxDeposit;

/// Sender and recipient of the invalidated-block deposit.
pub const INVALIDATED_BLOCK_DEPOSIT_SENDER: Address =
    address!("0xdeaddeaddeaddeaddeaddeaddeaddeaddead0002");

/// Source-hash domain of the invalidated-block deposit.
const INVALIDATED_BLOCK_SOURCE_DOMAIN: u64 = 4;

/// Gas limit of the invalidated-block deposit.
const INVALIDATED_BLOCK_DEPOSIT_GAS: u64 = 36_000;

/// EIP-2718 type byte of deposit transactions.
const DEPOSIT_TX_TYPE: u8 = 0x7e;

/// Returns the deposit recording `output` as invalidated.
pub fn invalidated_block_deposit(output: &OutputV0) -> TxDeposit {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(B256::from(U256::from(INVALIDATED_BLOCK_SOURCE_DOMAIN)).as_slice());
    preimage[32..].copy_from_slice(output.output_root().as_slice());

    TxDeposit {
        source_hash: keccak256(preimage),
        from: INVALIDATED_BLOCK_DEPOSIT_SENDER,
        to: TxKind::Call(INVALIDATED_BLOCK_DEPOSIT_SENDER),
        gas_limit: INVALIDATED_BLOCK_DEPOSIT_GAS,
        input: Bytes::copy_from_slice(&output.encode()),
        ..Default::default()
    }
}

/// Returns the EIP-2718 encoding of `tx`.
pub fn encode_deposit(tx: &TxDeposit) -> Bytes {
    let mut out = Vec::with_capacity(1 + Encodable::length(tx));
    out.push(DEPOSIT_TX_TYPE);
    Encodable::encode(tx, &mut out);
    out.into()
}

fn decode_deposit(tx: &[u8]) -> Option<TxDeposit> {
    let (&ty, mut rlp) = tx.split_first()?;
    if ty != DEPOSIT_TX_TYPE {
        return None;
    }
    <TxDeposit as Decodable>::decode(&mut rlp).ok()
}

/// Builds the transactions of the block replacing one with `transactions` and `output`.
pub fn replacement_transactions(transactions: &[Bytes], output: &OutputV0) -> Vec<Bytes> {
    transactions
        .iter()
        .filter(|tx| tx.first() == Some(&DEPOSIT_TX_TYPE))
        .cloned()
        .chain(std::iter::once(encode_deposit(&invalidated_block_deposit(output))))
        .collect()
}

/// Recovers the output of the invalidated block from a replacement's transactions.
///
/// Returns `None` if the block is not a replacement.
pub fn invalidated_output(transactions: &[Bytes]) -> Option<OutputV0> {
    let deposit = decode_deposit(transactions.last()?)?;
    if deposit.from != INVALIDATED_BLOCK_DEPOSIT_SENDER ||
        deposit.to != TxKind::Call(INVALIDATED_BLOCK_DEPOSIT_SENDER)
    {
        return None;
    }
    OutputV0::decode(&deposit.input).ok()
}
