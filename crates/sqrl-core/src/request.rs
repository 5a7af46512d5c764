use super::*;
use std::collections::BTreeMap;

/// Client data keys the server persists onto the identity when presented.
const STORED_KEYS: [&str; 2] = ["suk", "vuk"];

/// Malformed backchannel input. Always request-scoped; the session boundary
/// maps it to a bad-request error reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("missing required parameter '{0}'")]
    MissingParam(&'static str),
    #[error("client parameter is not valid base64 name=value lines")]
    MalformedClient,
    #[error("unsupported protocol version '{0}'")]
    UnsupportedVersion(String),
}

/// One parsed backchannel request. Transport hands over the merged query
/// and form parameters; everything here is request-scoped and immutable.
#[derive(Debug, Clone)]
pub struct ClientRequest {
    version: String,
    command: Command,
    idk: String,
    pidk: Option<String>,
    opts: Vec<Opt>,
    unknown_opts: Vec<String>,
    keys_to_store: BTreeMap<String, String>,
    nut: String,
    correlator: String,
    server_echo: Option<String>,
    has_urs: bool,
}

impl ClientRequest {
    /// Extracts just the correlator, so an invalid request can still be
    /// attributed to its login attempt for error reporting.
    pub fn parse_correlator_only(params: &BTreeMap<String, String>) -> Option<String> {
        params.get("cor").cloned()
    }

    pub fn parse(params: &BTreeMap<String, String>) -> Result<Self, ParseError> {
        let nut = params
            .get("nut")
            .cloned()
            .ok_or(ParseError::MissingParam("nut"))?;
        let correlator = params
            .get("cor")
            .cloned()
            .ok_or(ParseError::MissingParam("cor"))?;
        let client = params
            .get("client")
            .ok_or(ParseError::MissingParam("client"))?;
        let lines = decode_lines(client).ok_or(ParseError::MalformedClient)?;
        let version = lines
            .get("ver")
            .cloned()
            .ok_or(ParseError::MissingParam("ver"))?;
        if !version.split(',').any(|v| v == "1") {
            return Err(ParseError::UnsupportedVersion(version));
        }
        let command = lines
            .get("cmd")
            .map(|s| Command::from(s.as_str()))
            .ok_or(ParseError::MissingParam("cmd"))?;
        let idk = lines
            .get("idk")
            .cloned()
            .ok_or(ParseError::MissingParam("idk"))?;
        let pidk = lines.get("pidk").cloned();
        let mut opts = Vec::new();
        let mut unknown_opts = Vec::new();
        if let Some(declared) = lines.get("opt") {
            for name in declared.split('~').filter(|s| !s.is_empty()) {
                match Opt::parse(name) {
                    Some(opt) => opts.push(opt),
                    None => unknown_opts.push(name.to_string()),
                }
            }
        }
        let keys_to_store = lines
            .iter()
            .filter(|(name, _)| STORED_KEYS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Ok(Self {
            version,
            command,
            idk,
            pidk,
            opts,
            unknown_opts,
            keys_to_store,
            nut,
            correlator,
            server_echo: params.get("server").cloned(),
            has_urs: params.get("urs").is_some_and(|v| !v.is_empty()),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }
    pub fn command(&self) -> &Command {
        &self.command
    }
    pub fn idk(&self) -> &str {
        &self.idk
    }
    pub fn pidk(&self) -> Option<&str> {
        self.pidk.as_deref()
    }
    pub fn has_opt(&self, opt: Opt) -> bool {
        self.opts.contains(&opt)
    }
    pub fn opts(&self) -> &[Opt] {
        &self.opts
    }
    pub fn unknown_opts(&self) -> &[String] {
        &self.unknown_opts
    }
    pub fn keys_to_store(&self) -> &BTreeMap<String, String> {
        &self.keys_to_store
    }
    pub fn nut(&self) -> &str {
        &self.nut
    }
    pub fn correlator(&self) -> &str {
        &self.correlator
    }
    /// The exact previous server reply the client claims to be answering.
    pub fn server_echo(&self) -> Option<&str> {
        self.server_echo.as_deref()
    }
    /// Presence of the detached unlock-request signature, required as proof
    /// of intent for enable and remove.
    pub fn has_urs(&self) -> bool {
        self.has_urs
    }
}

fn decode_lines(encoded: &str) -> Option<BTreeMap<String, String>> {
    let text = util::b64_decode_str(encoded)?;
    let mut table = BTreeMap::new();
    for line in text.lines().filter(|l| !l.is_empty()) {
        let (name, value) = line.split_once('=')?;
        table.insert(name.to_string(), value.to_string());
    }
    Some(table)
}

/// Builds a `client` parameter from name=value pairs the way a SQRL client
/// would. Used by tests and client simulators.
pub fn encode_client_param(lines: &[(&str, &str)]) -> String {
    let text = lines
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("\r\n");
    util::b64_encode(text.as_bytes())
}
