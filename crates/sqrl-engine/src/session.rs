use super::*;
use sqrl_core::*;
use sqrl_store::Correlator;
use sqrl_store::Identity;
use sqrl_store::Persistence;
use sqrl_store::Transaction;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Everything the login page needs to render one authentication attempt.
#[derive(Debug, Clone)]
pub struct AuthPageData {
    pub url: String,
    pub nut: String,
    pub correlator: String,
    pub expires_at_ms: u64,
}

/// The composed wire reply plus whether the request it answers succeeded.
/// The transport maps `ok` onto its status code; the body is sent either
/// way so the client sees the TIF bits.
#[derive(Debug, Clone)]
pub struct ReplyOutcome {
    pub reply: ServerReply,
    pub ok: bool,
}

/// The top-level entry point an embedding application talks to.
///
/// Owns the context and the persistence backend, and scopes every piece of
/// work into its own transaction. One backchannel request runs as two:
/// the command phase commits its identity and status mutations before the
/// reply phase mints the next nut and records the parrot, so a reply-side
/// failure can never unwind a completed authentication.
pub struct SqrlOperations<P> {
    context: SqrlContext,
    store: P,
}

impl<P> SqrlOperations<P>
where
    P: Persistence,
{
    pub fn new(config: SqrlConfig, store: P) -> Result<Self, ConfigError> {
        Ok(Self {
            context: SqrlContext::new(config)?,
            store,
        })
    }

    pub fn config(&self) -> &SqrlConfig {
        self.context.config()
    }
    pub fn store(&self) -> &P {
        &self.store
    }

    /// Prepares one authentication attempt: mints the first nut, derives
    /// and persists its correlator, and composes the sqrl:// URL the page
    /// renders as a QR code. The URL itself is stored as the parrot the
    /// client's first request must echo.
    pub fn prepare_auth_page(
        &self,
        requester: IpAddr,
        host: &str,
        now_ms: u64,
    ) -> Result<AuthPageData, SqrlError> {
        let nut = self.context.encode(&self.context.mint(requester, now_ms));
        let correlator = SqrlContext::correlator_for(&nut);
        let expires_at_ms = now_ms + self.config().nut_validity_ms();
        let sfn = self
            .config()
            .server_friendly_name
            .clone()
            .unwrap_or_else(|| host.to_string());
        let url = format!(
            "sqrl://{}{}?nut={}&sfn={}&cor={}",
            host,
            self.config().backchannel_path,
            nut,
            util::b64_encode(sfn.as_bytes()),
            correlator,
        );
        let mut txn = self.store.begin()?;
        txn.create_correlator(&correlator, expires_at_ms)?;
        txn.set_transient(
            &correlator,
            TRANSIENT_SERVER_PARROT,
            &util::b64_encode(url.as_bytes()),
        )?;
        txn.commit()?;
        log::info!("[session] prepared attempt cor={}", correlator);
        Ok(AuthPageData {
            url,
            nut,
            correlator,
            expires_at_ms,
        })
    }

    /// Runs one backchannel request end to end. Never returns an error:
    /// every failure is folded into an error-path reply with the TIF bits
    /// that describe it, and the attempt's status is updated so pollers
    /// see the failure too.
    pub fn handle_client_request(
        &self,
        params: &BTreeMap<String, String>,
        requester: IpAddr,
        now_ms: u64,
    ) -> ReplyOutcome {
        let mut tif = TifBuilder::new();
        let processed = self.process_phase(params, requester, now_ms, &mut tif);
        match processed {
            Ok((request, state)) => {
                match self.reply_phase(&request, state, tif.build(), requester, now_ms) {
                    Ok(reply) => ReplyOutcome { reply, ok: true },
                    Err(error) => {
                        // the command phase committed; its flags still
                        // describe what actually happened
                        log::error!("[session] reply composition failed: {}", error);
                        tif.add(TifFlag::CommandFailed);
                        tif.add(TifFlag::TransientError);
                        ReplyOutcome {
                            reply: ServerReply::error(
                                tif.build(),
                                self.config().backchannel_path.clone(),
                            ),
                            ok: false,
                        }
                    }
                }
            }
            Err(error) => self.error_outcome(params, error, &mut tif),
        }
    }

    /// The command phase: parse, decode and validate the nut, verify the
    /// parrot, run the command state machine, and advance the attempt's
    /// status. All of it in one transaction that only commits on success.
    fn process_phase(
        &self,
        params: &BTreeMap<String, String>,
        requester: IpAddr,
        now_ms: u64,
        tif: &mut TifBuilder,
    ) -> Result<(ClientRequest, UserState), SqrlError> {
        let request = ClientRequest::parse(params)?;
        let token = self.context.decode(request.nut())?;
        let mut txn = self.store.begin()?;
        validate_nut(
            &mut txn,
            request.nut(),
            &token,
            now_ms,
            self.config().nut_validity_ms(),
        )?;
        if self.config().ip_matching {
            if token.ip() == ip_to_u32(requester) {
                tif.add(TifFlag::IpsMatched);
            } else if !request.has_opt(Opt::NoIpTest) {
                log::warn!(
                    "[session] requester ip differs from the one the nut was minted for, cor={}",
                    request.correlator()
                );
            }
        }
        if txn.correlator(request.correlator())?.is_none() {
            return Err(SqrlError::invalid("unknown correlator"));
        }
        self.check_parrot(&mut txn, &request)?;
        let state = RequestProcessor::new(&mut txn, &request, tif).process()?;
        if state == UserState::Disabled {
            txn.set_auth_status(request.correlator(), AuthStatus::UserDisabled)?;
        } else if txn.correlator_required(request.correlator())?.status() == AuthStatus::Pending {
            // first successful contact moves the attempt out of pending
            txn.set_auth_status(request.correlator(), AuthStatus::InProgress)?;
        }
        txn.commit()?;
        Ok((request, state))
    }

    /// The client's `server` parameter must echo our previous transmission
    /// byte for byte. The stored copy is consumed either way, so a replayed
    /// echo cannot pass twice.
    fn check_parrot<T>(&self, txn: &mut T, request: &ClientRequest) -> Result<(), SqrlError>
    where
        T: Transaction,
    {
        let stored = txn.take_transient(request.correlator(), TRANSIENT_SERVER_PARROT)?;
        match (stored, request.server_echo()) {
            (Some(expected), Some(echoed)) if expected == echoed => Ok(()),
            (Some(_), Some(_)) => Err(SqrlError::invalid(
                "server parameter does not match previous transmission",
            )),
            (Some(_), None) => Err(SqrlError::invalid("server parameter missing")),
            (None, _) => {
                log::warn!(
                    "[session] no parrot stored for cor={}, echo unverified",
                    request.correlator()
                );
                Ok(())
            }
        }
    }

    fn reply_phase(
        &self,
        request: &ClientRequest,
        state: UserState,
        tif: Tif,
        requester: IpAddr,
        now_ms: u64,
    ) -> Result<ServerReply, SqrlError> {
        let mut txn = self.store.begin()?;
        let reply = build_reply(
            &mut txn,
            &self.context,
            request,
            state,
            tif,
            requester,
            now_ms,
        )?;
        txn.commit()?;
        Ok(reply)
    }

    /// Folds a command-phase failure into an error reply and a status
    /// update. Status writing is best effort; the reply is produced even
    /// when the attempt can no longer be attributed.
    fn error_outcome(
        &self,
        params: &BTreeMap<String, String>,
        error: SqrlError,
        tif: &mut TifBuilder,
    ) -> ReplyOutcome {
        log::error!("[session] request failed: {}", error);
        tif.clear_all();
        tif.add(TifFlag::CommandFailed);
        let status = if error.is_invalid_request() {
            tif.add(TifFlag::ClientFailure);
            AuthStatus::ErrorBadRequest
        } else {
            tif.add(TifFlag::TransientError);
            AuthStatus::ErrorInternal
        };
        if let Some(extra) = error.tif_to_add() {
            tif.add(extra);
        }
        if let Some(correlator) = ClientRequest::parse_correlator_only(params) {
            if let Err(store_error) = self.record_error_status(&correlator, status) {
                log::error!(
                    "[session] could not record error status for cor={}: {}",
                    correlator,
                    store_error
                );
            }
        }
        ReplyOutcome {
            reply: ServerReply::error(tif.build(), self.config().backchannel_path.clone()),
            ok: false,
        }
    }

    fn record_error_status(&self, correlator: &str, status: AuthStatus) -> Result<(), SqrlError> {
        let mut txn = self.store.begin()?;
        if txn.correlator(correlator)?.is_some() {
            txn.set_auth_status(correlator, status)?;
            // the conversation is over; a late echo of the old parrot must
            // not validate
            txn.take_transient(correlator, TRANSIENT_SERVER_PARROT)?;
            txn.commit()?;
        }
        Ok(())
    }

    // embedding-application facade

    /// Ties an authenticated identity to the application's own user key.
    pub fn update_native_user_xref(&self, idk: &str, xref: &str) -> Result<(), SqrlError> {
        let mut txn = self.store.begin()?;
        txn.set_native_xref(idk, xref)?;
        txn.commit()?;
        Ok(())
    }

    pub fn fetch_identity(&self, idk: &str) -> Result<Option<Identity>, SqrlError> {
        let mut txn = self.store.begin()?;
        let identity = txn.identity(idk)?;
        txn.commit()?;
        Ok(identity)
    }

    pub fn fetch_identity_by_xref(&self, xref: &str) -> Result<Option<Identity>, SqrlError> {
        let mut txn = self.store.begin()?;
        let identity = txn.identity_by_xref(xref)?;
        txn.commit()?;
        Ok(identity)
    }

    pub fn fetch_correlator(&self, value: &str) -> Result<Correlator, SqrlError> {
        let mut txn = self.store.begin()?;
        let correlator = txn.correlator_required(value)?;
        txn.commit()?;
        Ok(correlator)
    }

    pub fn fetch_correlators(
        &self,
        values: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Correlator>, SqrlError> {
        poll::correlators(&self.store, values)
    }

    /// Poll endpoint support, see [`status_changes`].
    pub fn fetch_status_updates(
        &self,
        known: &BTreeMap<String, AuthStatus>,
    ) -> Result<BTreeMap<String, AuthStatus>, SqrlError> {
        poll::status_changes(&self.store, known)
    }

    /// Ends an attempt once the embedding application has consumed it.
    pub fn delete_correlator(&self, value: &str) -> Result<(), SqrlError> {
        let mut txn = self.store.begin()?;
        txn.delete_correlator(value)?;
        txn.commit()?;
        Ok(())
    }

    /// Drops expired correlators and used-token entries. Returns the
    /// deleted counts (correlators, tokens).
    pub fn clean_expired(&self, now_ms: u64) -> Result<(usize, usize), SqrlError> {
        let mut txn = self.store.begin()?;
        let deleted = txn.purge_expired(now_ms)?;
        txn.commit()?;
        if deleted != (0, 0) {
            log::info!(
                "[session] purged {} correlators and {} tokens",
                deleted.0,
                deleted.1
            );
        }
        Ok(deleted)
    }

    /// When the given encoded nut stops being accepted.
    pub fn nut_expiry(&self, encoded: &str) -> Result<u64, SqrlError> {
        let token = self.context.decode(encoded)?;
        Ok(token.expires_at_ms(self.config().nut_validity_ms()))
    }
}
