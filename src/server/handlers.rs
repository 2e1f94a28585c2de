use axum::extract::{ConnectInfo, State};
use axum::response::{Redirect, Response};
use axum::Form;
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::info;

use super::{render, AppState};
use crate::error::AllowlistError;

#[derive(Debug, Default, Deserialize)]
pub struct IpForm {
    #[serde(default)]
    pub ip: String,
}

fn peer_ip(peer: Option<ConnectInfo<SocketAddr>>) -> Result<String, AllowlistError> {
    peer.map(|ConnectInfo(addr)| addr.ip().to_canonical().to_string())
        .ok_or_else(|| AllowlistError::PeerAddressUnresolvable("no peer address".to_string()))
}

fn form_ip(form: Option<Form<IpForm>>) -> Result<String, AllowlistError> {
    match form {
        Some(Form(IpForm { ip })) if !ip.trim().is_empty() => Ok(ip.trim().to_string()),
        _ => Err(AllowlistError::RequestMalformed("no param: ip".to_string())),
    }
}

pub async fn add_me(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Result<Redirect, AllowlistError> {
    let ip = peer_ip(peer)?;
    info!("add me: {}", ip);
    state.registry.add_ip(&ip, &state.abort.child_token()).await?;
    Ok(Redirect::to("/"))
}

pub async fn delete_me(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Result<Redirect, AllowlistError> {
    let ip = peer_ip(peer)?;
    info!("delete me: {}", ip);
    state.registry.delete_ip(&ip, &state.abort.child_token()).await?;
    Ok(Redirect::to("/"))
}

pub async fn add_ip(
    State(state): State<AppState>,
    form: Option<Form<IpForm>>,
) -> Result<Redirect, AllowlistError> {
    let ip = form_ip(form)?;
    info!("add ip: {}", ip);
    state.registry.add_ip(&ip, &state.abort.child_token()).await?;
    Ok(Redirect::to("/"))
}

pub async fn delete_ip(
    State(state): State<AppState>,
    form: Option<Form<IpForm>>,
) -> Result<Redirect, AllowlistError> {
    let ip = form_ip(form)?;
    info!("delete ip: {}", ip);
    state.registry.delete_ip(&ip, &state.abort.child_token()).await?;
    Ok(Redirect::to("/"))
}

pub async fn index(State(state): State<AppState>) -> Response {
    render::index(&state.registry.list(), state.auth.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_peer_ip_missing() {
        assert!(matches!(
            peer_ip(None),
            Err(AllowlistError::PeerAddressUnresolvable(_))
        ));
    }

    #[test]
    fn test_peer_ip_unmaps_ipv4() {
        let mapped = Ipv4Addr::new(10, 0, 0, 7).to_ipv6_mapped();
        let addr = SocketAddr::new(IpAddr::V6(mapped), 50000);
        assert_eq!(peer_ip(Some(ConnectInfo(addr))).unwrap(), "10.0.0.7");

        let addr = SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 1);
        assert_eq!(peer_ip(Some(ConnectInfo(addr))).unwrap(), "::1");
    }

    #[test]
    fn test_form_ip() {
        assert!(matches!(form_ip(None), Err(AllowlistError::RequestMalformed(_))));
        assert!(matches!(
            form_ip(Some(Form(IpForm::default()))),
            Err(AllowlistError::RequestMalformed(_))
        ));
        let form = IpForm {
            ip: " 1.2.3.4 ".to_string(),
        };
        assert_eq!(form_ip(Some(Form(form))).unwrap(), "1.2.3.4");
    }
}
