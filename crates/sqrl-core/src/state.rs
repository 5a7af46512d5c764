/// Resolved identity state for one request, driving the command state
/// machine. Resolution checks idk first and pidk only when idk misses; an
/// idk hit makes any pidk match irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserState {
    /// Neither idk nor pidk is known.
    NoneExist,
    /// idk matches a stored identity.
    CurrentKeyMatch,
    /// Only pidk matches; a key rotation is in flight.
    PreviousKeyMatch,
    /// Identity exists but the auth-enabled flag is off. Asserted by the
    /// ident path after resolution, not by the resolver itself.
    Disabled,
}

impl UserState {
    /// Whether some identity row exists for this request's keys.
    pub fn id_exists(&self) -> bool {
        !matches!(self, Self::NoneExist)
    }
}
