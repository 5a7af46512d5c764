use super::*;
use sqrl_core::*;
use sqrl_store::Transaction;
use std::net::IpAddr;

/// Composes the wire reply for one backchannel request and records it as
/// the parrot the next request must echo. Runs in its own transaction so a
/// composition failure never disturbs the committed command outcome.
pub fn build_reply<T>(
    txn: &mut T,
    context: &SqrlContext,
    request: &ClientRequest,
    state: UserState,
    tif: Tif,
    requester: IpAddr,
    now_ms: u64,
) -> Result<ServerReply, SqrlError>
where
    T: Transaction,
{
    let nut = context.encode(&context.mint(requester, now_ms));
    let qry = format!(
        "{}?nut={}&cor={}",
        context.config().backchannel_path,
        nut,
        request.correlator()
    );
    let mut data = std::collections::BTreeMap::new();
    if let Some(suk) = suk_for(txn, request, state)? {
        data.insert(String::from(DATA_SUK), suk);
    }
    let reply = ServerReply::new(nut, tif, qry, request.correlator().to_string(), data);
    txn.set_transient(
        request.correlator(),
        TRANSIENT_SERVER_PARROT,
        &reply.to_base64(),
    )?;
    Ok(reply)
}

/// The server unlock key is returned when the client asks for it, and
/// unconditionally when the client needs it to produce an unlock-request
/// signature: querying with only the previous key (rotation ahead) or
/// facing a disabled identity.
fn suk_for<T>(
    txn: &mut T,
    request: &ClientRequest,
    state: UserState,
) -> Result<Option<String>, SqrlError>
where
    T: Transaction,
{
    let rotating = state == UserState::PreviousKeyMatch
        && matches!(request.command(), Command::Query);
    let wanted = request.has_opt(Opt::Suk) || rotating || state == UserState::Disabled;
    if !wanted {
        return Ok(None);
    }
    // after a rotation the row already lives under idk, before one it is
    // still under pidk
    for key in [Some(request.idk()), request.pidk()].into_iter().flatten() {
        if txn.identity_exists(key)? {
            return Ok(txn.identity_data_item(key, DATA_SUK)?);
        }
    }
    Ok(None)
}
