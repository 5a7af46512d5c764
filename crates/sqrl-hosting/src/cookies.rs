use actix_web::cookie::Cookie;
use actix_web::cookie::time::Duration as CookieDuration;
use sqrl_core::SqrlConfig;

/// The cookie domain for a request host: the host with any trailing port
/// stripped. Only a numeric suffix counts as a port, and bracketed IPv6
/// hosts keep their brackets.
pub fn cookie_domain(host: &str) -> String {
    match host.rsplit_once(':') {
        Some((name, port))
            if !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (!name.contains(':') || (name.starts_with('[') && name.ends_with(']'))) =>
        {
            name.to_string()
        }
        _ => host.to_string(),
    }
}

/// The correlator cookie ties the browser to its login attempt. It outlives
/// the nut by the configured grace so a login completed at the last moment
/// can still be claimed.
pub fn correlator_cookie<'a>(config: &SqrlConfig, host: &str, value: &'a str) -> Cookie<'a> {
    let lifetime = config.nut_validity + config.correlator_cookie_grace;
    Cookie::build(config.correlator_cookie.clone(), value)
        .domain(cookie_domain(host))
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(lifetime.as_secs() as i64))
        .finish()
}

/// The first-nut cookie lets the original browser prove it started the
/// attempt. Same lifetime as the nut itself.
pub fn first_nut_cookie<'a>(config: &SqrlConfig, host: &str, value: &'a str) -> Cookie<'a> {
    Cookie::build(config.first_nut_cookie.clone(), value)
        .domain(cookie_domain(host))
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(config.nut_validity.as_secs() as i64))
        .finish()
}

/// Expired duplicate of the correlator cookie. Setting it tells the
/// browser to drop its copy once the attempt is consumed or abandoned.
pub fn clear_correlator_cookie(config: &SqrlConfig, host: &str) -> Cookie<'static> {
    removal(config.correlator_cookie.clone(), host)
}

/// Expired duplicate of the first-nut cookie.
pub fn clear_first_nut_cookie(config: &SqrlConfig, host: &str) -> Cookie<'static> {
    removal(config.first_nut_cookie.clone(), host)
}

fn removal(name: String, host: &str) -> Cookie<'static> {
    Cookie::build(name, "")
        .domain(cookie_domain(host))
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::ZERO)
        .finish()
}
