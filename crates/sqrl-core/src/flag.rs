use super::Opt;

/// Server-side capability flags stored per identity as an enabled set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityFlag {
    /// SQRL authentication is allowed for this identity. Cleared by the
    /// `disable` command, restored by `enable`.
    AuthEnabled,
    Hardlock,
    SqrlOnly,
}

impl IdentityFlag {
    /// The client option that mirrors this flag, if any. AuthEnabled has no
    /// opt equivalent; it moves only through enable/disable commands.
    pub fn opt_equivalent(&self) -> Option<Opt> {
        match self {
            Self::AuthEnabled => None,
            Self::Hardlock => Some(Opt::Hardlock),
            Self::SqrlOnly => Some(Opt::SqrlOnly),
        }
    }
    pub const ALL: [IdentityFlag; 3] = [Self::AuthEnabled, Self::Hardlock, Self::SqrlOnly];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_enabled_has_no_opt() {
        assert_eq!(IdentityFlag::AuthEnabled.opt_equivalent(), None);
        assert_eq!(IdentityFlag::Hardlock.opt_equivalent(), Some(Opt::Hardlock));
        assert_eq!(IdentityFlag::SqrlOnly.opt_equivalent(), Some(Opt::SqrlOnly));
    }
}
