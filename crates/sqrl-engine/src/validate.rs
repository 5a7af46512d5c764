use super::*;
use sqrl_core::NutError;
use sqrl_core::NutToken;
use sqrl_store::Transaction;

/// Validates a decoded nut against the replay guard and its validity
/// window.
///
/// The token is recorded as used *before* any success is reported
/// (mark-then-allow): two concurrent validations of the same encoding race
/// on the atomic insert, and exactly one wins. The loser, and any later
/// replay, fails with [`NutError::Replayed`]. The mark is persisted by the
/// surrounding transaction's commit; on rollback the request failed anyway
/// and produced no grant to replay.
pub fn validate_nut<T>(
    txn: &mut T,
    encoded: &str,
    token: &NutToken,
    now_ms: u64,
    validity_ms: u64,
) -> Result<(), SqrlError>
where
    T: Transaction,
{
    if !txn.mark_token_used(encoded, token.expires_at_ms(validity_ms))? {
        return Err(NutError::Replayed.into());
    }
    if token.timestamp_ms() > now_ms {
        return Err(NutError::FromFuture.into());
    }
    let age_ms = now_ms - token.timestamp_ms();
    if age_ms > validity_ms {
        return Err(NutError::Expired { age_ms }.into());
    }
    Ok(())
}
