use crate::errors::SyncError;
use std::fmt;
use std::time::Duration;

/// Default connect timeout handed to the transport layer.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default write timeout handed to the transport layer.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default read timeout: replication heartbeat (30 s) plus 10 s slack.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(40);

/// Certificate-chain validation policy for the transport client.
///
/// The actual validation is performed by the TLS backend; this type only
/// selects which trust anchors (if any) it validates against.
#[derive(Clone)]
pub enum TransportSecurity {
    /// Validate against the platform/built-in root certificates.
    Platform,
    /// Validate against the platform roots plus the given extra roots
    /// (e.g., a corporate CA or a pinned Sync Gateway certificate).
    AdditionalRoots(Vec<reqwest::Certificate>),
    /// Accept **every** certificate chain unconditionally.
    ///
    /// *DO NOT USE THIS IN PRODUCTION.* Intended for talking to test
    /// servers with self-signed certificates only.
    AcceptAnyCertificate,
}

impl TransportSecurity {
    /// Builds an [`TransportSecurity::AdditionalRoots`] policy from a PEM
    /// certificate.
    ///
    /// Fails with [`SyncError::SecurityProvider`] when the certificate
    /// material cannot be parsed.
    pub fn additional_roots_from_pem(pem: &[u8]) -> Result<Self, SyncError> {
        let cert = reqwest::Certificate::from_pem(pem)
            .map_err(|e| SyncError::SecurityProvider(e.to_string()))?;
        Ok(TransportSecurity::AdditionalRoots(vec![cert]))
    }
}

impl fmt::Debug for TransportSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportSecurity::Platform => write!(f, "Platform"),
            TransportSecurity::AdditionalRoots(roots) => {
                write!(f, "AdditionalRoots({} certs)", roots.len())
            }
            TransportSecurity::AcceptAnyCertificate => write!(f, "AcceptAnyCertificate"),
        }
    }
}

/// Hostname verification policy for the transport client.
///
/// With the rustls backend, hostname verification happens inside certificate
/// verification and cannot be disabled independently: [`AcceptAny`]
/// therefore also implies accepting untrusted chains. Test/dev use only.
///
/// [`AcceptAny`]: HostnameVerification::AcceptAny
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostnameVerification {
    /// Verify that the certificate matches the requested hostname.
    Standard,
    /// Accept every hostname. *DO NOT USE THIS IN PRODUCTION.*
    AcceptAny,
}

/// An entry in the ordered list of connection specs the client may negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSpec {
    /// Modern TLS: TLS 1.2 or newer only.
    ModernTls,
    /// Legacy-tolerant TLS. With the rustls backend this degenerates to
    /// TLS 1.2, the oldest version rustls negotiates.
    CompatibleTls,
    /// Plain HTTP. Retained so replications against cleartext test
    /// endpoints keep working when TLS enforcement is on.
    Cleartext,
}

/// The connection specs applied when minimum-TLS enforcement is on,
/// most secure first.
pub const ENFORCED_CONNECTION_SPECS: [ConnectionSpec; 3] = [
    ConnectionSpec::ModernTls,
    ConnectionSpec::CompatibleTls,
    ConnectionSpec::Cleartext,
];

/// Configuration for the shared transport client.
///
/// Built with chained setters and consumed by
/// [`HttpClientFactory::new`](crate::client::HttpClientFactory::new); once the
/// factory owns it there is no way to mutate it, so configuration is one-shot
/// by construction.
///
/// The transport-security and hostname-verification slots may each be set at
/// most once; a second write fails with [`SyncError::ConfigurationConflict`].
///
/// Note on timeouts: the transport layer has no per-write timeout, so the
/// configured write allowance is folded into the overall request deadline
/// (`read + write`).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    connect_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
    follow_redirects: bool,
    enforce_min_tls: bool,
    transport_security: Option<TransportSecurity>,
    hostname_verification: Option<HostnameVerification>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            follow_redirects: true,
            // Platform TLS stacks on older devices may negotiate below 1.2
            enforce_min_tls: true,
            transport_security: None,
            hostname_verification: None,
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Whether the client follows HTTP redirects. Defaults to `true`.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Whether the client restricts negotiation to
    /// [`ENFORCED_CONNECTION_SPECS`]. Defaults to `true`.
    pub fn enforce_min_tls(mut self, enforce: bool) -> Self {
        self.enforce_min_tls = enforce;
        self
    }

    /// Sets the certificate-chain validation policy.
    ///
    /// One-shot: fails with [`SyncError::ConfigurationConflict`] when a
    /// policy was already set.
    pub fn transport_security(mut self, security: TransportSecurity) -> Result<Self, SyncError> {
        if self.transport_security.is_some() {
            return Err(SyncError::ConfigurationConflict(
                "transport security provider",
            ));
        }
        self.transport_security = Some(security);
        Ok(self)
    }

    /// Sets the hostname verification policy.
    ///
    /// One-shot: fails with [`SyncError::ConfigurationConflict`] when a
    /// policy was already set.
    pub fn hostname_verification(
        mut self,
        verification: HostnameVerification,
    ) -> Result<Self, SyncError> {
        if self.hostname_verification.is_some() {
            return Err(SyncError::ConfigurationConflict("hostname verifier"));
        }
        self.hostname_verification = Some(verification);
        Ok(self)
    }

    /// Convenience for connecting to servers that use self-signed SSL certs:
    /// accepts every certificate chain and every hostname.
    ///
    /// *DO NOT USE THIS IN PRODUCTION.*
    ///
    /// Fills both one-shot slots, so it fails with
    /// [`SyncError::ConfigurationConflict`] if either was already set.
    pub fn allow_self_signed_certificates(self) -> Result<Self, SyncError> {
        self.transport_security(TransportSecurity::AcceptAnyCertificate)?
            .hostname_verification(HostnameVerification::AcceptAny)
    }

    /// The connection specs the built client will negotiate, most secure
    /// first. Empty when enforcement is off (the transport default applies).
    pub fn connection_specs(&self) -> &[ConnectionSpec] {
        if self.enforce_min_tls {
            &ENFORCED_CONNECTION_SPECS
        } else {
            &[]
        }
    }

    pub(crate) fn connect_timeout_value(&self) -> Duration {
        self.connect_timeout
    }

    pub(crate) fn read_timeout_value(&self) -> Duration {
        self.read_timeout
    }

    /// Overall request deadline: read allowance plus write allowance.
    pub(crate) fn request_deadline(&self) -> Duration {
        self.read_timeout + self.write_timeout
    }

    pub(crate) fn follows_redirects(&self) -> bool {
        self.follow_redirects
    }

    pub(crate) fn enforces_min_tls(&self) -> bool {
        self.enforce_min_tls
    }

    pub(crate) fn transport_security_value(&self) -> Option<&TransportSecurity> {
        self.transport_security.as_ref()
    }

    pub(crate) fn hostname_verification_value(&self) -> Option<HostnameVerification> {
        self.hostname_verification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_replicator_expectations() {
        let options = ClientOptions::default();
        assert_eq!(options.connect_timeout_value(), Duration::from_secs(10));
        assert_eq!(options.read_timeout_value(), Duration::from_secs(40));
        assert_eq!(options.request_deadline(), Duration::from_secs(50));
        assert!(options.follows_redirects());
        assert!(options.enforces_min_tls());
    }

    #[test]
    fn enforced_specs_are_ordered_most_secure_first() {
        let options = ClientOptions::default();
        assert_eq!(
            options.connection_specs(),
            &[
                ConnectionSpec::ModernTls,
                ConnectionSpec::CompatibleTls,
                ConnectionSpec::Cleartext,
            ]
        );

        let relaxed = ClientOptions::default().enforce_min_tls(false);
        assert!(relaxed.connection_specs().is_empty());
    }

    #[test]
    fn transport_security_is_one_shot() {
        let options = ClientOptions::default()
            .transport_security(TransportSecurity::Platform)
            .unwrap();

        let err = options
            .transport_security(TransportSecurity::AcceptAnyCertificate)
            .unwrap_err();
        assert!(matches!(err, SyncError::ConfigurationConflict(_)));
    }

    #[test]
    fn hostname_verification_is_one_shot() {
        let options = ClientOptions::default()
            .hostname_verification(HostnameVerification::Standard)
            .unwrap();

        let err = options
            .hostname_verification(HostnameVerification::AcceptAny)
            .unwrap_err();
        assert!(matches!(err, SyncError::ConfigurationConflict(_)));
    }

    #[test]
    fn self_signed_mode_fills_both_slots() {
        let options = ClientOptions::default()
            .allow_self_signed_certificates()
            .unwrap();

        assert!(matches!(
            options.transport_security_value(),
            Some(TransportSecurity::AcceptAnyCertificate)
        ));
        assert_eq!(
            options.hostname_verification_value(),
            Some(HostnameVerification::AcceptAny)
        );

        // Either occupied slot makes the convenience fail
        let occupied = ClientOptions::default()
            .transport_security(TransportSecurity::Platform)
            .unwrap();
        assert!(occupied.allow_self_signed_certificates().is_err());
    }

    #[test]
    fn setter_once_then_factory_build_is_fine() {
        let options = ClientOptions::default()
            .transport_security(TransportSecurity::Platform)
            .unwrap();
        let factory = crate::client::HttpClientFactory::new(options);
        let _client = factory.client();
        assert!(factory.is_built());
    }
}
