//! TLS policy application for the transport client builder.
//!
//! The sync layer does not implement TLS; it only narrows what the transport
//! backend may negotiate (minimum version, trust anchors, verification
//! bypasses for test servers).

use crate::config::{ClientOptions, ConnectionSpec, HostnameVerification, TransportSecurity};
use reqwest::ClientBuilder;

/// Restricts `builder` to the ordered connection-spec preference list.
///
/// Any TLS spec in the list raises the minimum negotiable version to
/// TLS 1.2 (rustls negotiates nothing older anyway); plain HTTP stays
/// allowed only while `Cleartext` is present, so replications against
/// cleartext test endpoints keep working.
pub(crate) fn apply_connection_specs(
    mut builder: ClientBuilder,
    specs: &[ConnectionSpec],
) -> ClientBuilder {
    if specs.is_empty() {
        return builder;
    }

    if specs.contains(&ConnectionSpec::ModernTls) || specs.contains(&ConnectionSpec::CompatibleTls)
    {
        builder = builder.min_tls_version(reqwest::tls::Version::TLS_1_2);
        log::warn!("restricting transport client to TLS 1.2 or newer");
    }

    builder = builder.https_only(!specs.contains(&ConnectionSpec::Cleartext));

    builder
}

/// Applies the transport-security and hostname-verification slots.
///
/// With the rustls backend the hostname check lives inside certificate
/// verification, so `HostnameVerification::AcceptAny` turns off chain
/// verification as a whole.
pub(crate) fn apply_transport_security(
    mut builder: ClientBuilder,
    options: &ClientOptions,
) -> ClientBuilder {
    let mut accept_any = false;

    if let Some(security) = options.transport_security_value() {
        match security {
            TransportSecurity::Platform => {}
            TransportSecurity::AdditionalRoots(roots) => {
                for root in roots {
                    builder = builder.add_root_certificate(root.clone());
                }
            }
            TransportSecurity::AcceptAnyCertificate => accept_any = true,
        }
    }

    if options.hostname_verification_value() == Some(HostnameVerification::AcceptAny) {
        accept_any = true;
    }

    if accept_any {
        log::warn!("certificate and hostname verification disabled; do not use in production");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
}
