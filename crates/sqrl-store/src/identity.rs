use sqrl_core::IdentityFlag;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// One registered authenticator key. The prior key (`pidk`) presented
/// during rotation is request-scoped and never stored; rotation rewrites
/// `idk` in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    idk: String,
    enabled_flags: BTreeSet<IdentityFlag>,
    data: BTreeMap<String, String>,
    native_xref: Option<String>,
}

impl Identity {
    /// A freshly registered identity starts with auth enabled.
    pub fn new(idk: String) -> Self {
        Self {
            idk,
            enabled_flags: BTreeSet::from([IdentityFlag::AuthEnabled]),
            data: BTreeMap::new(),
            native_xref: None,
        }
    }
    pub fn idk(&self) -> &str {
        &self.idk
    }
    pub fn set_idk(&mut self, idk: String) {
        self.idk = idk;
    }
    pub fn flag(&self, flag: IdentityFlag) -> bool {
        self.enabled_flags.contains(&flag)
    }
    /// Returns whether the set changed, so callers can log redundant
    /// enable/disable attempts.
    pub fn set_flag(&mut self, flag: IdentityFlag, enabled: bool) -> bool {
        if enabled {
            self.enabled_flags.insert(flag)
        } else {
            self.enabled_flags.remove(&flag)
        }
    }
    pub fn data_item(&self, name: &str) -> Option<&str> {
        self.data.get(name).map(String::as_str)
    }
    pub fn store_data(&mut self, data: &BTreeMap<String, String>) {
        self.data
            .extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    pub fn native_xref(&self) -> Option<&str> {
        self.native_xref.as_deref()
    }
    pub fn set_native_xref(&mut self, xref: String) {
        self.native_xref = Some(xref);
    }
}
