//! Property-based tests for configuration, inventory and request parsing.

use proptest::prelude::*;
use provisioner::ansible::inventory::{parse_host_line, render_host_line};
use provisioner::config::{GithubConfig, HostAuthConfig, HostConfig, ProvisionerConfig};
use provisioner::installer::NameVersionArgs;
use provisioner::remote::AnsibleHost;
use provisioner::summary::Summary;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Generate a utility name (lowercase, dashes allowed).
fn utility_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}"
}

/// Generate a release tag such as `v0.10.0` or `1.28.1`.
fn version_strategy() -> impl Strategy<Value = String> {
    "v?[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}"
}

/// Generate an IPv4 address.
fn ipv4_strategy() -> impl Strategy<Value = String> {
    (1u8..=254, 0u8..=255, 0u8..=255, 1u8..=254).prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}"))
}

/// Generate an inventory value, including characters that need quoting.
fn inventory_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ._/'\"$=-]{1,16}"
}

fn remote_host_strategy() -> impl Strategy<Value = AnsibleHost> {
    (
        "[a-z][a-z0-9-]{0,12}",
        ipv4_strategy(),
        "[a-z]{0,8}",
        proptest::option::of(inventory_value_strategy()),
        proptest::option::of(inventory_value_strategy()),
        proptest::option::of(1u16..=65535),
    )
        .prop_map(|(host, ip_address, username, password, key, port)| AnsibleHost {
            host,
            ip_address,
            username,
            password,
            ssh_private_key_file_path: key,
            port,
        })
}

fn host_config_strategy() -> impl Strategy<Value = HostConfig> {
    ("[a-z]{1,8}", ipv4_strategy(), "[a-z]{0,6}", "[a-z0-9]{0,8}").prop_map(
        |(name, address, username, password)| HostConfig {
            name,
            address,
            auth: HostAuthConfig {
                username,
                password,
                ..Default::default()
            },
            port: None,
        },
    )
}

fn config_strategy() -> impl Strategy<Value = ProvisionerConfig> {
    (
        proptest::collection::vec(host_config_strategy(), 0..3),
        "[0-9./]{0,18}",
        "[a-z]{0,8}",
        "[a-zA-Z0-9_]{0,12}",
        proptest::collection::btree_map("[a-z_]{1,8}", "[a-z0-9.]{1,10}", 0..4),
    )
        .prop_map(|(hosts, range, organization, token, plugins)| {
            let mut config = ProvisionerConfig::default();
            config.remote.hosts = hosts;
            config.remote.lan_scan.ip_discovery_range = range;
            config.vcs.github = GithubConfig {
                organization,
                git_access_token: token,
                ..Default::default()
            };
            config.plugins = plugins
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect::<BTreeMap<_, _>>();
            config
        })
}

proptest! {
    // ========================================================================
    // Configuration merge
    // ========================================================================

    #[test]
    fn merge_with_empty_config_is_identity(config in config_strategy()) {
        let empty = ProvisionerConfig::default();
        prop_assert_eq!(config.merge(&empty), config.clone());
        prop_assert_eq!(empty.merge(&config), config);
    }

    #[test]
    fn merge_prefers_non_empty_user_values(base in config_strategy(), user in config_strategy()) {
        let merged = base.merge(&user);

        if user.vcs.github.git_access_token.is_empty() {
            prop_assert_eq!(&merged.vcs.github.git_access_token, &base.vcs.github.git_access_token);
        } else {
            prop_assert_eq!(&merged.vcs.github.git_access_token, &user.vcs.github.git_access_token);
        }

        if user.remote.hosts.is_empty() {
            prop_assert_eq!(&merged.remote.hosts, &base.remote.hosts);
        } else {
            prop_assert_eq!(&merged.remote.hosts, &user.remote.hosts);
        }

        for (key, value) in &user.plugins {
            prop_assert_eq!(merged.plugins.get(key), Some(value));
        }
        for key in base.plugins.keys() {
            prop_assert!(merged.plugins.contains_key(key));
        }
    }

    // ========================================================================
    // Inventory lines
    // ========================================================================

    #[test]
    fn inventory_line_round_trips(host in remote_host_strategy()) {
        let line = render_host_line(&host);
        let parsed = parse_host_line(&line).unwrap();
        prop_assert_eq!(parsed, host);
    }

    #[test]
    fn local_inventory_line_round_trips(username in "[a-z]{1,8}") {
        let host = AnsibleHost::local(&username);
        let line = render_host_line(&host);
        prop_assert!(line.contains("ansible_connection=local"));
        prop_assert!(!line.contains("ansible_host="));
        let parsed = parse_host_line(&line).unwrap();
        prop_assert!(parsed.is_local());
        prop_assert_eq!(parsed, host);
    }

    // ========================================================================
    // Summary
    // ========================================================================

    #[test]
    fn summary_keeps_append_order(names in proptest::collection::vec("[A-Z][a-z ]{0,12}", 0..8)) {
        let summary = Summary::new(false);
        for (index, name) in names.iter().enumerate() {
            summary.append(name, &index.to_string());
        }
        let recorded: Vec<String> = summary.rows().into_iter().map(|(name, _)| name).collect();
        prop_assert_eq!(recorded, names);
    }

    // ========================================================================
    // Utility requests
    // ========================================================================

    #[test]
    fn versioned_request_splits_on_at(name in utility_name_strategy(), version in version_strategy()) {
        let request = format!("{name}@{version}");
        let parsed = NameVersionArgs::parse(&request);
        prop_assert_eq!(&parsed.name, &name);
        prop_assert_eq!(parsed.version.as_deref(), Some(version.as_str()));
        prop_assert_eq!(parsed.request(), request);
    }

    #[test]
    fn bare_request_has_no_version(name in utility_name_strategy()) {
        let parsed = NameVersionArgs::parse(&name);
        prop_assert_eq!(&parsed.name, &name);
        prop_assert!(parsed.version.is_none());
        prop_assert_eq!(parsed.request(), name);
    }
}
