//! Proxy selection for target URLs
//!
//! [`PacSelector`] ties fetching, sandboxed evaluation and directive parsing
//! together. Every failure along the way turns into a direct connection:
//! a broken PAC script must never make a URL unreachable.

use crate::clock::Clock;
use crate::config::{Config, ConfigValidator, SandboxLimits};
use crate::directive::{parse_directives, ProxyList};
use crate::error::{PacError, Result};
use crate::helpers::HostResolver;
use crate::script::{PacScript, SandboxOptions, ScriptHost};
use crate::source::PacLocation;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, warn};
use url::{Host, Url};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the selector gets its script from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOrigin {
    /// Fetched on first use
    Location(PacLocation),
    /// Source supplied directly
    Script(PacScript),
}

impl From<PacLocation> for ScriptOrigin {
    fn from(location: PacLocation) -> Self {
        ScriptOrigin::Location(location)
    }
}

impl From<PacScript> for ScriptOrigin {
    fn from(script: PacScript) -> Self {
        ScriptOrigin::Script(script)
    }
}

/// Outcome of one evaluation, before the fail-open fallback is applied
#[derive(Debug)]
pub enum Selection {
    Resolved(ProxyList),
    Fault(PacError),
}

impl Selection {
    /// Collapse to a usable list, `DIRECT` on fault
    pub fn into_list(self) -> ProxyList {
        match self {
            Selection::Resolved(list) => list,
            Selection::Fault(_) => ProxyList::direct(),
        }
    }
}

#[derive(Debug)]
enum HostState {
    Unloaded,
    Loaded(Arc<ScriptHost>),
    Faulted(String),
}

#[derive(Debug)]
struct SelectorState {
    origin: ScriptOrigin,
    host: HostState,
}

/// Builder for [`PacSelector`]
#[derive(Debug)]
pub struct PacSelectorBuilder {
    origin: ScriptOrigin,
    options: SandboxOptions,
    fetch_timeout: Duration,
}

impl PacSelectorBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.options.clock = clock;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.options.resolver = resolver;
        self
    }

    pub fn limits(mut self, limits: SandboxLimits) -> Self {
        self.options.limits = limits;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn build(self) -> PacSelector {
        PacSelector {
            state: RwLock::new(SelectorState {
                origin: self.origin,
                host: HostState::Unloaded,
            }),
            options: self.options,
            fetch_timeout: self.fetch_timeout,
        }
    }
}

/// Answers "which proxies for this URL" from a PAC script
#[derive(Debug)]
pub struct PacSelector {
    state: RwLock<SelectorState>,
    options: SandboxOptions,
    fetch_timeout: Duration,
}

impl PacSelector {
    pub fn builder(origin: impl Into<ScriptOrigin>) -> PacSelectorBuilder {
        PacSelectorBuilder {
            origin: origin.into(),
            options: SandboxOptions::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Selector for already-loaded source, with the system clock and resolver
    pub fn from_script(script: PacScript) -> Self {
        Self::builder(script).build()
    }

    /// Selector for the PAC location and limits in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        ConfigValidator::validate(config)?;

        let url = config
            .pac
            .url
            .as_deref()
            .ok_or_else(|| PacError::InvalidLocation {
                location: String::new(),
                reason: "no PAC location configured".to_string(),
            })?;

        Ok(Self::builder(PacLocation::parse(url)?)
            .limits(config.sandbox)
            .fetch_timeout(config.pac.fetch_timeout())
            .build())
    }

    /// Ordered proxies to try for `url`; never empty
    pub fn select(&self, url: &Url) -> ProxyList {
        let selection = self.evaluate(url);
        if let Selection::Fault(err) = &selection {
            log_fault(url.as_str(), err);
        }
        selection.into_list()
    }

    /// Like [`select`](Self::select) for a URL that has not been parsed yet.
    ///
    /// The script sees `url` as given; only the host is taken from the
    /// parsed form.
    pub fn select_str(&self, url: &str) -> ProxyList {
        let url = url.trim();
        match Url::parse(url) {
            Ok(parsed) => {
                let selection = self.evaluate_target(url, &parsed);
                if let Selection::Fault(err) = &selection {
                    log_fault(url, err);
                }
                selection.into_list()
            }
            Err(e) => {
                let err = PacError::InvalidTarget {
                    target: url.to_string(),
                    reason: e.to_string(),
                };
                log_fault(url, &err);
                ProxyList::direct()
            }
        }
    }

    /// Evaluate the script for `url` without applying the fallback
    pub fn evaluate(&self, url: &Url) -> Selection {
        self.evaluate_target(url.as_str(), url)
    }

    fn evaluate_target(&self, raw_url: &str, url: &Url) -> Selection {
        let host = match self.ensure_loaded() {
            Ok(host) => host,
            Err(e) => return Selection::Fault(e),
        };

        let Some(target_host) = target_host(url) else {
            return Selection::Fault(PacError::InvalidTarget {
                target: url.to_string(),
                reason: "URL has no host".to_string(),
            });
        };

        let raw = match host.invoke(raw_url, &target_host) {
            Ok(raw) => raw,
            Err(e) => return Selection::Fault(e),
        };

        match ProxyList::new(parse_directives(&raw)) {
            Some(list) => Selection::Resolved(list),
            None => {
                warn!("PAC result {:?} for {} has no usable directive", raw, url);
                Selection::Resolved(ProxyList::direct())
            }
        }
    }

    /// Fetch and compile the script now rather than on the first `select`
    pub fn load(&self) -> Result<()> {
        self.ensure_loaded().map(|_| ())
    }

    /// Discard the loaded script or remembered fault and load again
    pub fn reload(&self) -> Result<()> {
        self.write_state().host = HostState::Unloaded;
        self.load()
    }

    /// Switch to a different script; it is loaded on next use
    pub fn set_origin(&self, origin: impl Into<ScriptOrigin>) {
        let mut state = self.write_state();
        state.origin = origin.into();
        state.host = HostState::Unloaded;
    }

    pub fn origin(&self) -> ScriptOrigin {
        self.read_state().origin.clone()
    }

    /// The reason the current script failed to load, if it did
    pub fn load_error(&self) -> Option<String> {
        match &self.read_state().host {
            HostState::Faulted(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    fn ensure_loaded(&self) -> Result<Arc<ScriptHost>> {
        match &self.read_state().host {
            HostState::Loaded(host) => return Ok(Arc::clone(host)),
            HostState::Faulted(reason) => return Err(PacError::LoadFaulted(reason.clone())),
            HostState::Unloaded => {}
        }

        let mut state = self.write_state();
        // Another thread may have finished loading while we waited
        match &state.host {
            HostState::Loaded(host) => return Ok(Arc::clone(host)),
            HostState::Faulted(reason) => return Err(PacError::LoadFaulted(reason.clone())),
            HostState::Unloaded => {}
        }

        match self.load_host(&state.origin) {
            Ok(host) => {
                let host = Arc::new(host);
                state.host = HostState::Loaded(Arc::clone(&host));
                Ok(host)
            }
            Err(e) => {
                warn!("Failed to load PAC script: {}", e);
                state.host = HostState::Faulted(e.to_string());
                Err(e)
            }
        }
    }

    fn load_host(&self, origin: &ScriptOrigin) -> Result<ScriptHost> {
        let script = match origin {
            ScriptOrigin::Location(location) => location.fetch(self.fetch_timeout)?,
            ScriptOrigin::Script(script) => script.clone(),
        };
        ScriptHost::load(script, self.options.clone())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SelectorState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SelectorState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Host argument for `FindProxyForURL`: IPv6 literals lose their brackets
fn target_host(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_string()),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

fn log_fault(target: &str, err: &PacError) {
    if err.is_load_error() {
        // Already reported when the load failed
        debug!("Using DIRECT for {}: {}", target, err);
    } else {
        warn!("PAC evaluation for {} failed, using DIRECT: {}", target, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::{ProxyAddress, ProxyDirective};
    use std::io::Write;
    use std::thread;

    fn selector(source: &str) -> PacSelector {
        PacSelector::from_script(PacScript::new(source, "inline"))
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_select_ordered_list() {
        let selector = selector(
            r#"function FindProxyForURL(url, host) {
                   return "PROXY proxy.example.com:8080; DIRECT";
               }"#,
        );

        let list = selector.select(&url("http://www.example.com/"));
        assert_eq!(
            list.directives(),
            &[
                ProxyDirective::Http(ProxyAddress::new("proxy.example.com", 8080)),
                ProxyDirective::Direct,
            ]
        );
    }

    #[test]
    fn test_host_argument() {
        let selector = selector(
            r#"function FindProxyForURL(url, host) { return "PROXY " + host + ":3128"; }"#,
        );

        let list = selector.select(&url("https://user@Intranet.Example.com:8443/a?b"));
        assert_eq!(list.to_string(), "PROXY intranet.example.com:3128");

        assert_eq!(target_host(&url("http://[::1]:8080/")).as_deref(), Some("::1"));
        assert_eq!(target_host(&url("http://10.0.0.1/")).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_select_str_passes_url_as_given() {
        let selector = selector(
            r#"function FindProxyForURL(url, host) {
                   return url == "HTTP://Example.COM" ? "PROXY raw:1" : "PROXY normalized:1";
               }"#,
        );

        assert_eq!(selector.select_str("HTTP://Example.COM").to_string(), "PROXY raw:1");
        assert_eq!(
            selector.select(&url("HTTP://Example.COM")).to_string(),
            "PROXY normalized:1"
        );
    }

    #[test]
    fn test_runaway_script_is_direct() {
        let selector = PacSelector::builder(PacScript::new(
            r#"function spin() { for (var j = 0; j < 9000; j++) {} }
               function FindProxyForURL(url, host) {
                   while (true) { for (var k = 0; k < 9000; k++) { spin(); } }
               }"#,
            "inline",
        ))
        .limits(SandboxLimits {
            eval_timeout_ms: 200,
            ..SandboxLimits::default()
        })
        .build();

        let selection = selector.evaluate(&url("http://a.example/"));
        assert!(matches!(selection, Selection::Fault(PacError::Timeout(_))));
        assert!(selector.select(&url("http://a.example/")).is_direct());
        assert!(selector.load_error().is_none());
    }

    #[test]
    fn test_runtime_fault_is_direct() {
        let selector = selector("function FindProxyForURL(url, host) { throw 'boom'; }");

        let selection = selector.evaluate(&url("http://a.example/"));
        assert!(matches!(selection, Selection::Fault(PacError::Runtime(_))));
        assert!(selector.select(&url("http://a.example/")).is_direct());
        // Runtime faults are per call, not remembered
        assert!(selector.load_error().is_none());
    }

    #[test]
    fn test_unusable_result_is_direct() {
        for body in ["return 'bogus';", "return '';", "return null;"] {
            let selector = selector(&format!("function FindProxyForURL(url, host) {{ {body} }}"));
            let list = selector.select(&url("http://a.example/"));
            assert_eq!(list, ProxyList::direct(), "{body}");
        }
    }

    #[test]
    fn test_load_fault_is_remembered() {
        let selector = selector("function FindProxyForURL(url, host) {");

        let first = selector.evaluate(&url("http://a.example/"));
        assert!(matches!(first, Selection::Fault(PacError::Compile(_))));

        let second = selector.evaluate(&url("http://a.example/"));
        assert!(matches!(second, Selection::Fault(PacError::LoadFaulted(_))));
        assert!(selector.load_error().is_some());
        assert!(selector.select(&url("http://a.example/")).is_direct());
    }

    #[test]
    fn test_reload_after_fix() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "function FindProxyForURL(url, host) {{ return ").unwrap();
        file.flush().unwrap();

        let selector = PacSelector::builder(PacLocation::File(file.path().to_path_buf())).build();
        assert!(selector.load().is_err());
        assert!(selector.select(&url("http://a.example/")).is_direct());

        std::fs::write(
            file.path(),
            "function FindProxyForURL(url, host) { return 'PROXY fixed:1'; }",
        )
        .unwrap();
        // The fault sticks until an explicit reload
        assert!(selector.select(&url("http://a.example/")).is_direct());

        selector.reload().unwrap();
        assert!(selector.load_error().is_none());
        assert_eq!(selector.select(&url("http://a.example/")).to_string(), "PROXY fixed:1");
    }

    #[test]
    fn test_set_origin() {
        let selector = selector("function FindProxyForURL(url, host) { return 'PROXY one:1'; }");
        assert_eq!(selector.select(&url("http://a/")).to_string(), "PROXY one:1");

        selector.set_origin(PacScript::new(
            "function FindProxyForURL(url, host) { return 'SOCKS two:2'; }",
            "second",
        ));
        assert_eq!(selector.select(&url("http://a/")).to_string(), "SOCKS two:2");
        assert!(matches!(selector.origin(), ScriptOrigin::Script(s) if s.origin == "second"));
    }

    #[test]
    fn test_missing_location_is_direct() {
        let dir = tempfile::tempdir().unwrap();
        let selector = PacSelector::builder(PacLocation::File(dir.path().join("none.pac"))).build();

        let selection = selector.evaluate(&url("http://a/"));
        assert!(matches!(selection, Selection::Fault(PacError::ScriptRead { .. })));
        assert!(selector.select(&url("http://a/")).is_direct());
    }

    #[test]
    fn test_invalid_targets() {
        let selector = selector("function FindProxyForURL(url, host) { return 'PROXY p:1'; }");

        assert!(matches!(
            selector.evaluate(&url("mailto:someone@example.com")),
            Selection::Fault(PacError::InvalidTarget { .. })
        ));
        assert!(selector.select_str("not a url").is_direct());
        assert_eq!(selector.select_str("http://a/").to_string(), "PROXY p:1");
    }

    #[test]
    fn test_from_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "function FindProxyForURL(url, host) {{ return 'PROXY cfg:9'; }}").unwrap();
        file.flush().unwrap();

        let mut config = Config::default();
        assert!(matches!(
            PacSelector::from_config(&config),
            Err(PacError::InvalidLocation { .. })
        ));

        config.pac.url = Some(file.path().display().to_string());
        let selector = PacSelector::from_config(&config).unwrap();
        assert_eq!(selector.select(&url("http://a/")).to_string(), "PROXY cfg:9");

        config.sandbox.loop_iteration_limit = 0;
        assert!(matches!(
            PacSelector::from_config(&config),
            Err(PacError::Validation(_))
        ));
    }

    #[test]
    fn test_shared_across_threads() {
        let selector = Arc::new(selector(
            r#"function FindProxyForURL(url, host) {
                   if (dnsDomainIs(host, ".internal")) return "DIRECT";
                   return "PROXY gw:3128";
               }"#,
        ));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let selector = Arc::clone(&selector);
                thread::spawn(move || {
                    let internal = selector.select(&url(&format!("http://h{i}.internal/")));
                    let external = selector.select(&url(&format!("http://h{i}.example/")));
                    (internal.to_string(), external.to_string())
                })
            })
            .collect();

        for handle in handles {
            let (internal, external) = handle.join().unwrap();
            assert_eq!(internal, "DIRECT");
            assert_eq!(external, "PROXY gw:3128");
        }
    }
}
