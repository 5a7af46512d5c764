use super::*;
use sqrl_core::UserState;
use sqrl_store::Transaction;

/// Resolves which identity state applies to a request. idk is checked
/// first; pidk only when idk misses, so an idk hit makes any pidk match
/// irrelevant. Disabled is asserted later by the ident path.
pub fn resolve<T>(txn: &mut T, idk: &str, pidk: Option<&str>) -> Result<UserState, SqrlError>
where
    T: Transaction,
{
    if txn.identity_exists(idk)? {
        return Ok(UserState::CurrentKeyMatch);
    }
    match pidk {
        Some(pidk) if txn.identity_exists(pidk)? => Ok(UserState::PreviousKeyMatch),
        _ => Ok(UserState::NoneExist),
    }
}
