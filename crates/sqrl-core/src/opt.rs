/// Options a client may declare in the `opt=` field. Unknown options are
/// carried as raw strings by the request and ignored with a warning, so new
/// protocol options never fail old servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opt {
    /// Client-provided-session fast completion. Recognized, not supported
    /// by this embedding.
    Cps,
    /// Client asks for the server unlock key in the reply.
    Suk,
    /// Disable all non-SQRL recovery for the account.
    Hardlock,
    /// Disable all non-SQRL authentication for the account.
    SqrlOnly,
    /// Client asks the server to skip IP matching.
    NoIpTest,
}

impl Opt {
    /// Per protocol, some options are only honored on non-query commands;
    /// a `query` must not mutate account state from them.
    pub fn non_query_only(&self) -> bool {
        matches!(self, Self::Hardlock | Self::SqrlOnly)
    }
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cps" => Some(Self::Cps),
            "suk" => Some(Self::Suk),
            "hardlock" => Some(Self::Hardlock),
            "sqrlonly" => Some(Self::SqrlOnly),
            "noiptest" => Some(Self::NoIpTest),
            _ => None,
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cps => "cps",
            Self::Suk => "suk",
            Self::Hardlock => "hardlock",
            Self::SqrlOnly => "sqrlonly",
            Self::NoIpTest => "noiptest",
        }
    }
}
