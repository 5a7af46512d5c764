use super::*;
use sqrl_core::*;
use sqrl_store::Transaction;

/// The command state machine for one backchannel request.
///
/// Resolves the identity state, dispatches the client command, and
/// reconciles client-declared options against stored flags. All storage
/// mutations happen through the transaction the orchestrator scoped around
/// this request; a failure here rolls the whole request back.
pub struct RequestProcessor<'a, T> {
    txn: &'a mut T,
    request: &'a ClientRequest,
    tif: &'a mut TifBuilder,
}

impl<'a, T> RequestProcessor<'a, T>
where
    T: Transaction,
{
    pub fn new(txn: &'a mut T, request: &'a ClientRequest, tif: &'a mut TifBuilder) -> Self {
        Self { txn, request, tif }
    }

    /// Runs the full command cycle and returns the terminal identity state.
    pub fn process(&mut self) -> Result<UserState, SqrlError> {
        let resolved = resolve(self.txn, self.request.idk(), self.request.pidk())?;
        match resolved {
            UserState::CurrentKeyMatch => {
                self.tif.add(TifFlag::CurrentIdMatch);
            }
            UserState::PreviousKeyMatch => {
                self.tif.add(TifFlag::PreviousIdMatch);
            }
            _ => {}
        }
        let state = self.dispatch(resolved)?;
        // remove skips reconciliation entirely; the identity is gone
        if !matches!(self.request.command(), Command::Remove) {
            self.reconcile_options()?;
        }
        Ok(state)
    }

    fn dispatch(&mut self, state: UserState) -> Result<UserState, SqrlError> {
        match self.request.command() {
            Command::Query => Ok(state),
            Command::Ident => self.ident(state),
            Command::Enable => self.enable(state),
            Command::Disable => self.disable(state),
            Command::Remove => self.remove(state),
            Command::Unsupported(name) => {
                self.tif.add(TifFlag::FunctionsNotSupported);
                self.tif.add(TifFlag::CommandFailed);
                Err(SqrlError::invalid_with_tif(
                    TifFlag::FunctionsNotSupported,
                    format!("unsupported client command {}", name),
                ))
            }
        }
    }

    /// Registration, re-authentication, and key rotation.
    fn ident(&mut self, state: UserState) -> Result<UserState, SqrlError> {
        let idk = self.request.idk();
        if !state.id_exists() {
            // first contact from this identity: store it and enable it
            self.txn.create_identity(idk)?;
            self.txn
                .store_identity_data(idk, self.request.keys_to_store())?;
        }
        // during rotation the row still lives under the previous key
        let stored_key = match state {
            UserState::PreviousKeyMatch => self.request.pidk().unwrap_or(idk),
            _ => idk,
        };
        if !self.txn.flag(stored_key, IdentityFlag::AuthEnabled)? {
            self.tif.add(TifFlag::SqrlDisabled);
            self.tif.add(TifFlag::CommandFailed);
            return Ok(UserState::Disabled);
        }
        match state {
            UserState::PreviousKeyMatch => {
                self.txn.rekey_identity(stored_key, idk)?;
                log::info!("[sqrl] key rotation complete, idk={} replaces pidk", idk);
            }
            UserState::CurrentKeyMatch => {
                // always overwrite stored extension data with the client's
                self.txn
                    .store_identity_data(idk, self.request.keys_to_store())?;
                log::info!("[sqrl] authenticated idk={}", idk);
            }
            _ => {
                log::info!("[sqrl] registered new identity idk={}", idk);
            }
        }
        if self.request.has_opt(Opt::Cps) {
            // same-request completion is not supported by this embedding
            log::info!("[sqrl] cps requested but not enabled, using default path");
        }
        self.txn.authenticate(idk, self.request.correlator())?;
        Ok(state)
    }

    fn enable(&mut self, state: UserState) -> Result<UserState, SqrlError> {
        if self.txn.flag(self.request.idk(), IdentityFlag::AuthEnabled)? {
            log::warn!("[sqrl] received enable but identity already is");
        } else if self.request.has_urs() {
            self.txn
                .set_flag(self.request.idk(), IdentityFlag::AuthEnabled, true)?;
        } else {
            return Err(SqrlError::invalid(
                "enable request did not contain urs signature",
            ));
        }
        Ok(state)
    }

    fn disable(&mut self, state: UserState) -> Result<UserState, SqrlError> {
        self.txn
            .set_flag(self.request.idk(), IdentityFlag::AuthEnabled, false)?;
        Ok(state)
    }

    fn remove(&mut self, state: UserState) -> Result<UserState, SqrlError> {
        if !self.request.has_urs() {
            return Err(SqrlError::invalid(
                "remove request did not contain urs signature",
            ));
        }
        self.txn.delete_identity(self.request.idk())?;
        Ok(state)
    }

    /// The absence of a declared option means it should be disabled, so
    /// every flag with an opt equivalent is compared and storage updated to
    /// the client's declared value. Non-query-only options are skipped on
    /// query commands. Unrecognized options are logged and ignored.
    fn reconcile_options(&mut self) -> Result<(), SqrlError> {
        if !self.txn.identity_exists(self.request.idk())? {
            return Ok(());
        }
        let is_query = matches!(self.request.command(), Command::Query);
        for flag in IdentityFlag::ALL {
            let Some(opt) = flag.opt_equivalent() else {
                continue;
            };
            if opt.non_query_only() && is_query {
                continue;
            }
            let declared = self.request.has_opt(opt);
            let stored = self.txn.flag(self.request.idk(), flag)?;
            if declared != stored {
                log::debug!(
                    "[sqrl] updating flag {:?} from {} to {}",
                    flag,
                    stored,
                    declared
                );
                self.txn.set_flag(self.request.idk(), flag, declared)?;
            }
        }
        for unknown in self.request.unknown_opts() {
            log::warn!("[sqrl] client option not supported by this library: {}", unknown);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqrl_store::MemoryStore;
    use sqrl_store::Persistence;
    use std::collections::BTreeMap;

    const IDK: &str = "m470Fb8O3XY8xAqlN2pCL0SokqPYNazwdc5sT6SLnUM";
    const COR: &str = "abc";

    fn request(lines: &[(&str, &str)], urs: bool) -> ClientRequest {
        let mut params = BTreeMap::from([
            (String::from("nut"), String::from("NUT1")),
            (String::from("cor"), String::from(COR)),
            (String::from("client"), encode_client_param(lines)),
        ]);
        if urs {
            params.insert(String::from("urs"), String::from("SIG"));
        }
        ClientRequest::parse(&params).unwrap()
    }

    fn setup(store: &MemoryStore) {
        let mut txn = store.begin().unwrap();
        txn.create_identity(IDK).unwrap();
        txn.create_correlator(COR, u64::MAX).unwrap();
        txn.commit().unwrap();
    }

    fn run(
        store: &MemoryStore,
        request: &ClientRequest,
    ) -> (Result<UserState, SqrlError>, TifBuilder) {
        let mut tif = TifBuilder::new();
        let mut txn = store.begin().unwrap();
        let result = RequestProcessor::new(&mut txn, request, &mut tif).process();
        if result.is_ok() {
            txn.commit().unwrap();
        }
        (result, tif)
    }

    #[test]
    fn ident_registers_new_identity() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.create_correlator(COR, u64::MAX).unwrap();
        txn.commit().unwrap();
        let request = request(
            &[
                ("ver", "1"),
                ("cmd", "ident"),
                ("idk", IDK),
                ("suk", "SUKVAL"),
            ],
            false,
        );
        let (result, tif) = run(&store, &request);
        assert_eq!(result.unwrap(), UserState::NoneExist);
        assert!(!tif.contains(TifFlag::CurrentIdMatch));
        let mut txn = store.begin().unwrap();
        assert!(txn.flag(IDK, IdentityFlag::AuthEnabled).unwrap());
        assert_eq!(
            txn.identity_data_item(IDK, "suk").unwrap(),
            Some(String::from("SUKVAL"))
        );
        let correlator = txn.correlator_required(COR).unwrap();
        assert_eq!(correlator.status(), AuthStatus::Complete);
        assert_eq!(correlator.authenticated_idk(), Some(IDK));
    }

    #[test]
    fn ident_against_disabled_identity_fails() {
        let store = MemoryStore::new();
        setup(&store);
        let mut txn = store.begin().unwrap();
        txn.set_flag(IDK, IdentityFlag::AuthEnabled, false).unwrap();
        txn.commit().unwrap();
        let request = request(&[("ver", "1"), ("cmd", "ident"), ("idk", IDK)], false);
        let (result, tif) = run(&store, &request);
        assert_eq!(result.unwrap(), UserState::Disabled);
        assert!(tif.contains(TifFlag::SqrlDisabled));
        assert!(tif.contains(TifFlag::CommandFailed));
        let mut txn = store.begin().unwrap();
        let correlator = txn.correlator_required(COR).unwrap();
        assert_ne!(correlator.status(), AuthStatus::Complete);
    }

    #[test]
    fn ident_with_pidk_rotates_key() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.create_identity("OLDKEY").unwrap();
        txn.create_correlator(COR, u64::MAX).unwrap();
        txn.commit().unwrap();
        let request = request(
            &[
                ("ver", "1"),
                ("cmd", "ident"),
                ("idk", IDK),
                ("pidk", "OLDKEY"),
            ],
            false,
        );
        let (result, tif) = run(&store, &request);
        assert_eq!(result.unwrap(), UserState::PreviousKeyMatch);
        assert!(tif.contains(TifFlag::PreviousIdMatch));
        let mut txn = store.begin().unwrap();
        assert!(!txn.identity_exists("OLDKEY").unwrap());
        assert!(txn.identity_exists(IDK).unwrap());
        assert_eq!(
            txn.correlator_required(COR).unwrap().status(),
            AuthStatus::Complete
        );
    }

    #[test]
    fn ident_reauth_overwrites_data() {
        let store = MemoryStore::new();
        setup(&store);
        let mut txn = store.begin().unwrap();
        txn.store_identity_data(
            IDK,
            &BTreeMap::from([(String::from("suk"), String::from("old"))]),
        )
        .unwrap();
        txn.commit().unwrap();
        let request = request(
            &[("ver", "1"), ("cmd", "ident"), ("idk", IDK), ("suk", "new")],
            false,
        );
        let (result, tif) = run(&store, &request);
        assert_eq!(result.unwrap(), UserState::CurrentKeyMatch);
        assert!(tif.contains(TifFlag::CurrentIdMatch));
        let mut txn = store.begin().unwrap();
        assert_eq!(
            txn.identity_data_item(IDK, "suk").unwrap(),
            Some(String::from("new"))
        );
    }

    #[test]
    fn enable_requires_urs() {
        let store = MemoryStore::new();
        setup(&store);
        let mut txn = store.begin().unwrap();
        txn.set_flag(IDK, IdentityFlag::AuthEnabled, false).unwrap();
        txn.commit().unwrap();
        let request_no_urs = request(&[("ver", "1"), ("cmd", "enable"), ("idk", IDK)], false);
        let (result, _) = run(&store, &request_no_urs);
        assert!(matches!(result, Err(SqrlError::Request { .. })));
        let request_urs = request(&[("ver", "1"), ("cmd", "enable"), ("idk", IDK)], true);
        let (result, _) = run(&store, &request_urs);
        assert!(result.is_ok());
        let mut txn = store.begin().unwrap();
        assert!(txn.flag(IDK, IdentityFlag::AuthEnabled).unwrap());
    }

    #[test]
    fn disable_is_unconditional() {
        let store = MemoryStore::new();
        setup(&store);
        let request = request(&[("ver", "1"), ("cmd", "disable"), ("idk", IDK)], false);
        let (result, _) = run(&store, &request);
        assert!(result.is_ok());
        let mut txn = store.begin().unwrap();
        assert!(!txn.flag(IDK, IdentityFlag::AuthEnabled).unwrap());
    }

    #[test]
    fn remove_requires_urs_and_deletes() {
        let store = MemoryStore::new();
        setup(&store);
        let request_no_urs = request(&[("ver", "1"), ("cmd", "remove"), ("idk", IDK)], false);
        let (result, _) = run(&store, &request_no_urs);
        assert!(matches!(result, Err(SqrlError::Request { .. })));
        let request_urs = request(&[("ver", "1"), ("cmd", "remove"), ("idk", IDK)], true);
        let (result, _) = run(&store, &request_urs);
        assert!(result.is_ok());
        let mut txn = store.begin().unwrap();
        assert!(!txn.identity_exists(IDK).unwrap());
    }

    #[test]
    fn unsupported_command_flags_and_fails() {
        let store = MemoryStore::new();
        setup(&store);
        let request = request(&[("ver", "1"), ("cmd", "btn"), ("idk", IDK)], false);
        let (result, tif) = run(&store, &request);
        assert!(matches!(result, Err(SqrlError::Request { tif: Some(TifFlag::FunctionsNotSupported), .. })));
        assert!(tif.contains(TifFlag::FunctionsNotSupported));
        assert!(tif.contains(TifFlag::CommandFailed));
    }

    #[test]
    fn absent_option_disables_stored_flag() {
        let store = MemoryStore::new();
        setup(&store);
        let mut txn = store.begin().unwrap();
        txn.set_flag(IDK, IdentityFlag::Hardlock, true).unwrap();
        txn.commit().unwrap();
        // non-query command without hardlock declared
        let request = request(&[("ver", "1"), ("cmd", "ident"), ("idk", IDK)], false);
        let (result, _) = run(&store, &request);
        assert!(result.is_ok());
        let mut txn = store.begin().unwrap();
        assert!(!txn.flag(IDK, IdentityFlag::Hardlock).unwrap());
    }

    #[test]
    fn query_skips_non_query_only_options() {
        let store = MemoryStore::new();
        setup(&store);
        let mut txn = store.begin().unwrap();
        txn.set_flag(IDK, IdentityFlag::Hardlock, true).unwrap();
        txn.commit().unwrap();
        let request = request(&[("ver", "1"), ("cmd", "query"), ("idk", IDK)], false);
        let (result, _) = run(&store, &request);
        assert!(result.is_ok());
        let mut txn = store.begin().unwrap();
        assert!(txn.flag(IDK, IdentityFlag::Hardlock).unwrap());
    }

    #[test]
    fn declared_option_enables_stored_flag() {
        let store = MemoryStore::new();
        setup(&store);
        let request = request(
            &[
                ("ver", "1"),
                ("cmd", "ident"),
                ("idk", IDK),
                ("opt", "sqrlonly"),
            ],
            false,
        );
        let (result, _) = run(&store, &request);
        assert!(result.is_ok());
        let mut txn = store.begin().unwrap();
        assert!(txn.flag(IDK, IdentityFlag::SqrlOnly).unwrap());
    }

    #[test]
    fn unknown_options_never_fail_the_request() {
        let store = MemoryStore::new();
        setup(&store);
        let request = request(
            &[
                ("ver", "1"),
                ("cmd", "ident"),
                ("idk", IDK),
                ("opt", "cps~hardlock~mystery"),
            ],
            false,
        );
        let (result, _) = run(&store, &request);
        assert_eq!(result.unwrap(), UserState::CurrentKeyMatch);
        let mut txn = store.begin().unwrap();
        assert!(txn.flag(IDK, IdentityFlag::Hardlock).unwrap());
        assert!(txn.identity_exists(IDK).unwrap());
    }
}
