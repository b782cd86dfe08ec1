use std::net::Ipv4Addr;

use crate::error::ConfigError;

/// One row of the `--list-env` table, shaped after
/// `original_source/Server.py`'s `HelpPrinter.print_list_env`.
struct EnvVarDoc {
    name: &'static str,
    title: &'static str,
    default: &'static str,
    ty: &'static str,
}

const ENV_VARS: &[EnvVarDoc] = &[
    EnvVarDoc { name: "SNIPY__LOCAL_IP", title: "bind address for both listeners", default: "127.0.0.1", ty: "ipv4" },
    EnvVarDoc { name: "SNIPY__WORKERS", title: "worker thread hint for the executor", default: "1", ty: "int >= 1" },
    EnvVarDoc { name: "SNIPY__PIPE_CHUNK", title: "per-read buffer size for pumps", default: "16384", ty: "int" },
    EnvVarDoc { name: "SNIPY__PROXY", title: "route upstream via SOCKS5", default: "false", ty: "bool" },
    EnvVarDoc { name: "SNIPY__PROXY_HOST", title: "ip address of the socks5 proxy server", default: "(none)", ty: "string" },
    EnvVarDoc { name: "SNIPY__PROXY_PORT", title: "port of the socks5 proxy server", default: "(none)", ty: "int 0-65535" },
    EnvVarDoc { name: "SNIPY__PROXY_AUTH_USERNAME", title: "proxy authentication username", default: "(none)", ty: "string" },
    EnvVarDoc { name: "SNIPY__PROXY_AUTH_PASSWORD", title: "proxy authentication password", default: "(none)", ty: "string" },
    EnvVarDoc { name: "SNIPY__PROXY_RESOLVE", title: "resolve hostname at the proxy instead of locally", default: "false", ty: "bool" },
];

/// Prints the `--list-env` table and returns without touching any listener.
pub fn print_env_table() {
    println!("{}", "=".repeat(70));
    println!("server config options:");
    println!("{}", "-".repeat(30));
    for var in ENV_VARS {
        println!("{}", var.name);
        println!("\ttitle : {}", var.title);
        println!("\tdefault : {}", var.default);
        println!("\ttype : {}", var.ty);
        println!();
    }
}

#[derive(Debug, Clone)]
pub struct Socks5Auth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub enum DialPolicy {
    Direct,
    Socks5 {
        host: String,
        port: u16,
        auth: Option<Socks5Auth>,
        remote_resolve: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub local_ip: Ipv4Addr,
    pub workers: usize,
    pub pipe_chunk: usize,
    pub dial_policy: DialPolicy,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            name,
            value: other.to_string(),
            reason: "expected a bool (true/false/1/0)".to_string(),
        }),
    }
}

fn parse_int<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: "expected an integer".to_string(),
    })
}

impl Config {
    /// Loads and validates configuration from `SNIPY__*` environment
    /// variables. This is a one-shot, process-wide immutable value: there is
    /// no runtime cache file and no global re-reads.
    pub fn from_env() -> Result<Self, ConfigError> {
        let local_ip = match env_var("SNIPY__LOCAL_IP") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "SNIPY__LOCAL_IP",
                value: v,
                reason: "expected an IPv4 address".to_string(),
            })?,
            None => Ipv4Addr::new(127, 0, 0, 1),
        };

        let workers = match env_var("SNIPY__WORKERS") {
            Some(v) => {
                let n: usize = parse_int("SNIPY__WORKERS", &v)?;
                if n < 1 {
                    return Err(ConfigError::InvalidValue {
                        name: "SNIPY__WORKERS",
                        value: v,
                        reason: "must be >= 1".to_string(),
                    });
                }
                n
            }
            None => 1,
        };

        let pipe_chunk = match env_var("SNIPY__PIPE_CHUNK") {
            Some(v) => parse_int("SNIPY__PIPE_CHUNK", &v)?,
            None => 16384,
        };

        let proxy = match env_var("SNIPY__PROXY") {
            Some(v) => parse_bool("SNIPY__PROXY", &v)?,
            None => false,
        };

        let dial_policy = if proxy {
            let host = env_var("SNIPY__PROXY_HOST").ok_or(ConfigError::MissingProxyField {
                field: "proxy_host",
            })?;
            let port_str = env_var("SNIPY__PROXY_PORT").ok_or(ConfigError::MissingProxyField {
                field: "proxy_port",
            })?;
            // the source's 0..=65353 range is a typo; accept the full u16 range.
            let port: u16 = parse_int("SNIPY__PROXY_PORT", &port_str)?;

            let username = env_var("SNIPY__PROXY_AUTH_USERNAME");
            let password = env_var("SNIPY__PROXY_AUTH_PASSWORD");
            let auth = match (username, password) {
                (Some(username), Some(password)) => Some(Socks5Auth { username, password }),
                (None, None) => None,
                (Some(_), None) | (None, Some(_)) => {
                    return Err(ConfigError::InvalidValue {
                        name: "SNIPY__PROXY_AUTH_USERNAME/SNIPY__PROXY_AUTH_PASSWORD",
                        value: String::new(),
                        reason: "username and password must be set together".to_string(),
                    })
                }
            };

            let remote_resolve = match env_var("SNIPY__PROXY_RESOLVE") {
                Some(v) => parse_bool("SNIPY__PROXY_RESOLVE", &v)?,
                None => false,
            };

            DialPolicy::Socks5 {
                host,
                port,
                auth,
                remote_resolve,
            }
        } else {
            DialPolicy::Direct
        };

        Ok(Config {
            local_ip,
            workers,
            pipe_chunk,
            dial_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // std::env is process-global; serialize tests that touch it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for name in [
            "SNIPY__LOCAL_IP",
            "SNIPY__WORKERS",
            "SNIPY__PIPE_CHUNK",
            "SNIPY__PROXY",
            "SNIPY__PROXY_HOST",
            "SNIPY__PROXY_PORT",
            "SNIPY__PROXY_AUTH_USERNAME",
            "SNIPY__PROXY_AUTH_PASSWORD",
            "SNIPY__PROXY_RESOLVE",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn defaults_are_direct_dial() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.local_ip, Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(config.pipe_chunk, 16384);
        assert!(matches!(config.dial_policy, DialPolicy::Direct));
    }

    #[test]
    fn proxy_without_host_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("SNIPY__PROXY", "true");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingProxyField { field: "proxy_host" }
        ));
        clear_env();
    }

    #[test]
    fn proxy_with_auth_and_remote_resolve() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("SNIPY__PROXY", "true");
        std::env::set_var("SNIPY__PROXY_HOST", "10.0.0.2");
        std::env::set_var("SNIPY__PROXY_PORT", "1080");
        std::env::set_var("SNIPY__PROXY_AUTH_USERNAME", "u");
        std::env::set_var("SNIPY__PROXY_AUTH_PASSWORD", "p");
        std::env::set_var("SNIPY__PROXY_RESOLVE", "true");

        let config = Config::from_env().unwrap();
        match config.dial_policy {
            DialPolicy::Socks5 {
                host,
                port,
                auth,
                remote_resolve,
            } => {
                assert_eq!(host, "10.0.0.2");
                assert_eq!(port, 1080);
                assert!(remote_resolve);
                let auth = auth.unwrap();
                assert_eq!(auth.username, "u");
                assert_eq!(auth.password, "p");
            }
            DialPolicy::Direct => panic!("expected Socks5 policy"),
        }
        clear_env();
    }
}
