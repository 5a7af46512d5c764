use super::*;
use actix_web::HttpRequest;
use sqrl_core::AuthStatus;
use sqrl_store::Persistence;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::net::Ipv4Addr;

fn requester(req: &HttpRequest) -> IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// The backchannel endpoint the authenticator client posts commands to.
/// Query parameters (nut, cor) and form fields (client, server, signatures)
/// merge into one parameter table; the engine sees no transport details.
/// The reply body is sent on failure too, carrying the error TIF bits.
pub async fn backchannel<P>(
    operations: web::Data<Arc<SqrlOperations<P>>>,
    query: web::Query<BTreeMap<String, String>>,
    form: web::Form<BTreeMap<String, String>>,
    req: HttpRequest,
) -> impl Responder
where
    P: Persistence + Send + Sync + 'static,
{
    let mut params = query.into_inner();
    params.extend(form.into_inner());
    let outcome = operations.handle_client_request(&params, requester(&req), now_ms());
    let body = outcome.reply.to_base64();
    if outcome.ok {
        HttpResponse::Ok()
            .content_type("application/x-www-form-urlencoded")
            .body(body)
    } else {
        HttpResponse::InternalServerError()
            .content_type("application/x-www-form-urlencoded")
            .body(body)
    }
}

/// The browser poll endpoint. The poller sends the statuses it last saw
/// and receives only the attempts worth reporting now.
pub async fn poll<P>(
    operations: web::Data<Arc<SqrlOperations<P>>>,
    known: web::Json<BTreeMap<String, AuthStatus>>,
) -> impl Responder
where
    P: Persistence + Send + Sync + 'static,
{
    match operations.fetch_status_updates(&known) {
        Ok(changes) => HttpResponse::Ok().json(changes),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

/// Ends the browser's attempt: deletes the correlator named by its cookie
/// and sends both auth cookies back expired so the browser drops them.
pub async fn logout<P>(
    operations: web::Data<Arc<SqrlOperations<P>>>,
    req: HttpRequest,
) -> impl Responder
where
    P: Persistence + Send + Sync + 'static,
{
    let host = req.connection_info().host().to_string();
    if let Some(cookie) = req.cookie(&operations.config().correlator_cookie) {
        if let Err(e) = operations.delete_correlator(cookie.value()) {
            log::warn!("could not delete correlator on logout: {}", e);
        }
    }
    HttpResponse::Ok()
        .cookie(clear_correlator_cookie(operations.config(), &host))
        .cookie(clear_first_nut_cookie(operations.config(), &host))
        .json(serde_json::json!({"status": "logged_out"}))
}

/// Starts a login attempt: the page fetches this, renders the returned URL
/// as a QR code, and starts polling. The correlator and first-nut cookies
/// tie this browser to the attempt.
pub async fn prepare<P>(
    operations: web::Data<Arc<SqrlOperations<P>>>,
    req: HttpRequest,
) -> impl Responder
where
    P: Persistence + Send + Sync + 'static,
{
    let host = req.connection_info().host().to_string();
    let page = match operations.prepare_auth_page(requester(&req), &host, now_ms()) {
        Ok(page) => page,
        Err(e) => {
            log::error!("page preparation failed: {}", e);
            return HttpResponse::InternalServerError().body(e.to_string());
        }
    };
    HttpResponse::Ok()
        .cookie(correlator_cookie(operations.config(), &host, &page.correlator))
        .cookie(first_nut_cookie(operations.config(), &host, &page.nut))
        .json(serde_json::json!({
            "url": page.url,
            "nut": page.nut,
            "correlator": page.correlator,
            "expires_at_ms": page.expires_at_ms,
        }))
}
