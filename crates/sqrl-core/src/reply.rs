use super::*;
use std::collections::BTreeMap;

/// The wire reply sent to the authenticator client.
///
/// Field order is part of the protocol: clients stop parsing at the first
/// unrecognized entry, so the known fields (`ver`, `nut`, `tif`, `qry`,
/// `cor`) always precede extension data, and extension entries are emitted
/// in sorted order.
#[derive(Debug, Clone)]
pub struct ServerReply {
    nut: String,
    tif: Tif,
    qry: String,
    cor: String,
    data: BTreeMap<String, String>,
}

impl ServerReply {
    pub fn new(
        nut: String,
        tif: Tif,
        qry: String,
        cor: String,
        data: BTreeMap<String, String>,
    ) -> Self {
        Self {
            nut,
            tif,
            qry,
            cor,
            data,
        }
    }

    /// Error-path reply: nut and correlator both carry the error sentinel
    /// so a mistaken followup request is detected immediately.
    pub fn error(tif: Tif, qry: String) -> Self {
        Self {
            nut: String::from(ERROR_SENTINEL),
            tif,
            qry,
            cor: String::from(ERROR_SENTINEL),
            data: BTreeMap::new(),
        }
    }

    pub fn tif(&self) -> Tif {
        self.tif
    }
    pub fn nut(&self) -> &str {
        &self.nut
    }

    /// The whole reply, base64url encoded, exactly as transmitted and
    /// exactly as stored in the correlator's parrot slot.
    pub fn to_base64(&self) -> String {
        let mut lines = vec![
            String::from("ver=1"),
            format!("nut={}", self.nut),
            format!("tif={}", self.tif),
            format!("qry={}", self.qry),
            format!("cor={}", self.cor),
        ];
        for (name, value) in &self.data {
            lines.push(format!("{}={}", name, value));
        }
        util::b64_encode(lines.join("\r\n").as_bytes())
    }

    /// Decodes a transmitted reply back into ordered name=value pairs.
    /// Used by tests and by embedding applications inspecting parrots.
    pub fn decode_lines(encoded: &str) -> Option<Vec<(String, String)>> {
        let text = util::b64_decode_str(encoded)?;
        text.lines()
            .filter(|l| !l.is_empty())
            .map(|line| {
                line.split_once('=')
                    .map(|(n, v)| (n.to_string(), v.to_string()))
            })
            .collect()
    }
}
