//! Relational row mapping for every aggregate table.
//!
//! # Responsibility
//! - Bind each entity to its table's column list, in column order.
//! - Decode rows back into entities, rejecting unknown enum values.
//!
//! # Invariants
//! - `COLUMNS[0]` is the primary key column `id`.
//! - `to_values` yields exactly one value per column, in `COLUMNS` order.

use crate::model::account::{DnsSettings, DomainCategory, ExtraSettings, Network, Settings};
use crate::model::group::Group;
use crate::model::nameserver::NameServerGroup;
use crate::model::peer::{Peer, PeerLocation, PeerStatus};
use crate::model::policy::{Policy, PolicyRule, PolicyRuleProtocol, PolicyTrafficAction};
use crate::model::route::{NetworkType, Route};
use crate::model::setup_key::{SetupKey, SetupKeyType};
use crate::model::user::{PersonalAccessToken, User, UserRole};
use crate::store::error::{StoreError, StoreResult};
use crate::store::translate::{AccountRecord, PolicyRuleRecord};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// Entity with a fixed table mapping.
pub(crate) trait TableRow: Sized {
    const TABLE: &'static str;
    /// Column names; the first one is the primary key.
    const COLUMNS: &'static [&'static str];

    fn to_values(&self) -> StoreResult<Vec<Value>>;
    fn from_row(row: &Row<'_>) -> StoreResult<Self>;
}

impl TableRow for AccountRecord {
    const TABLE: &'static str = "accounts";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "created_by",
        "created_at",
        "domain",
        "domain_category",
        "is_domain_primary_account",
        "network_identifier",
        "network_net",
        "network_dns",
        "network_serial",
        "dns_disabled_management_groups",
        "settings_peer_login_expiration_enabled",
        "settings_peer_login_expiration_ms",
        "settings_regular_users_view_blocked",
        "settings_groups_propagation_enabled",
        "settings_jwt_groups_enabled",
        "settings_jwt_groups_claim_name",
        "settings_peer_approval_enabled",
    ];

    fn to_values(&self) -> StoreResult<Vec<Value>> {
        Ok(vec![
            text(&self.id),
            text(&self.created_by),
            int(self.created_at),
            text(&self.domain),
            text(domain_category_to_db(self.domain_category)),
            flag(self.is_domain_primary_account),
            text(&self.network.identifier),
            text(&self.network.net),
            text(&self.network.dns),
            int(self.network.serial),
            json(&self.dns_settings.disabled_management_groups, "dns_disabled_management_groups")?,
            flag(self.settings.peer_login_expiration_enabled),
            int(self.settings.peer_login_expiration_ms),
            flag(self.settings.regular_users_view_blocked),
            flag(self.settings.groups_propagation_enabled),
            flag(self.settings.jwt_groups_enabled),
            text(&self.settings.jwt_groups_claim_name),
            flag(self.settings.extra.peer_approval_enabled),
        ])
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            domain: row.get("domain")?,
            domain_category: parse_enum(row, "domain_category", parse_domain_category)?,
            is_domain_primary_account: row.get("is_domain_primary_account")?,
            network: Network {
                identifier: row.get("network_identifier")?,
                net: row.get("network_net")?,
                dns: row.get("network_dns")?,
                serial: row.get("network_serial")?,
            },
            dns_settings: DnsSettings {
                disabled_management_groups: parse_json(row, "dns_disabled_management_groups")?,
            },
            settings: Settings {
                peer_login_expiration_enabled: row.get("settings_peer_login_expiration_enabled")?,
                peer_login_expiration_ms: row.get("settings_peer_login_expiration_ms")?,
                regular_users_view_blocked: row.get("settings_regular_users_view_blocked")?,
                groups_propagation_enabled: row.get("settings_groups_propagation_enabled")?,
                jwt_groups_enabled: row.get("settings_jwt_groups_enabled")?,
                jwt_groups_claim_name: row.get("settings_jwt_groups_claim_name")?,
                extra: ExtraSettings {
                    peer_approval_enabled: row.get("settings_peer_approval_enabled")?,
                },
            },
        })
    }
}

impl TableRow for Peer {
    const TABLE: &'static str = "peers";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "account_id",
        "key",
        "setup_key",
        "ip",
        "meta",
        "name",
        "dns_label",
        "user_id",
        "ssh_key",
        "ssh_enabled",
        "login_expiration_enabled",
        "last_login",
        "status_last_seen",
        "status_connected",
        "status_login_expired",
        "status_requires_approval",
        "location_connection_ip",
        "location_country_code",
        "location_city_name",
        "location_geoname_id",
    ];

    fn to_values(&self) -> StoreResult<Vec<Value>> {
        Ok(vec![
            text(&self.id),
            text(&self.account_id),
            text(&self.key),
            text(&self.setup_key),
            text(&self.ip),
            json(&self.meta, "meta")?,
            text(&self.name),
            text(&self.dns_label),
            text(&self.user_id),
            text(&self.ssh_key),
            flag(self.ssh_enabled),
            flag(self.login_expiration_enabled),
            int(self.last_login),
            int(self.status.last_seen),
            flag(self.status.connected),
            flag(self.status.login_expired),
            flag(self.status.requires_approval),
            text(&self.location.connection_ip),
            text(&self.location.country_code),
            text(&self.location.city_name),
            int(self.location.geoname_id),
        ])
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            key: row.get("key")?,
            setup_key: row.get("setup_key")?,
            ip: row.get("ip")?,
            meta: parse_json(row, "meta")?,
            name: row.get("name")?,
            dns_label: row.get("dns_label")?,
            status: PeerStatus {
                last_seen: row.get("status_last_seen")?,
                connected: row.get("status_connected")?,
                login_expired: row.get("status_login_expired")?,
                requires_approval: row.get("status_requires_approval")?,
            },
            user_id: row.get("user_id")?,
            ssh_key: row.get("ssh_key")?,
            ssh_enabled: row.get("ssh_enabled")?,
            login_expiration_enabled: row.get("login_expiration_enabled")?,
            last_login: row.get("last_login")?,
            location: PeerLocation {
                connection_ip: row.get("location_connection_ip")?,
                country_code: row.get("location_country_code")?,
                city_name: row.get("location_city_name")?,
                geoname_id: row.get("location_geoname_id")?,
            },
        })
    }
}

impl TableRow for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "account_id",
        "role",
        "is_service_user",
        "service_user_name",
        "auto_groups",
        "blocked",
        "last_login",
        "issued",
    ];

    fn to_values(&self) -> StoreResult<Vec<Value>> {
        Ok(vec![
            text(&self.id),
            text(&self.account_id),
            text(user_role_to_db(self.role)),
            flag(self.is_service_user),
            text(&self.service_user_name),
            json(&self.auto_groups, "auto_groups")?,
            flag(self.blocked),
            int(self.last_login),
            text(&self.issued),
        ])
    }

    /// Tokens are a separate table; `pats` starts empty.
    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            role: parse_enum(row, "role", parse_user_role)?,
            is_service_user: row.get("is_service_user")?,
            service_user_name: row.get("service_user_name")?,
            auto_groups: parse_json(row, "auto_groups")?,
            pats: HashMap::new(),
            blocked: row.get("blocked")?,
            last_login: row.get("last_login")?,
            issued: row.get("issued")?,
        })
    }
}

impl TableRow for PersonalAccessToken {
    const TABLE: &'static str = "personal_access_tokens";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "hashed_token",
        "expiration_date",
        "created_by",
        "created_at",
        "last_used",
    ];

    fn to_values(&self) -> StoreResult<Vec<Value>> {
        Ok(vec![
            text(&self.id),
            text(&self.user_id),
            text(&self.name),
            text(&self.hashed_token),
            int(self.expiration_date),
            text(&self.created_by),
            int(self.created_at),
            int(self.last_used),
        ])
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            hashed_token: row.get("hashed_token")?,
            expiration_date: row.get("expiration_date")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            last_used: row.get("last_used")?,
        })
    }
}

impl TableRow for Group {
    const TABLE: &'static str = "account_groups";
    const COLUMNS: &'static [&'static str] = &["id", "account_id", "name", "issued", "peers"];

    fn to_values(&self) -> StoreResult<Vec<Value>> {
        Ok(vec![
            text(&self.id),
            text(&self.account_id),
            text(&self.name),
            text(&self.issued),
            json(&self.peers, "peers")?,
        ])
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            name: row.get("name")?,
            issued: row.get("issued")?,
            peers: parse_json(row, "peers")?,
        })
    }
}

impl TableRow for Route {
    const TABLE: &'static str = "routes";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "account_id",
        "network",
        "net_id",
        "description",
        "peer",
        "peer_groups",
        "network_type",
        "masquerade",
        "metric",
        "enabled",
        "group_ids",
    ];

    fn to_values(&self) -> StoreResult<Vec<Value>> {
        Ok(vec![
            text(&self.id),
            text(&self.account_id),
            text(&self.network),
            text(&self.net_id),
            text(&self.description),
            text(&self.peer),
            json(&self.peer_groups, "peer_groups")?,
            text(network_type_to_db(self.network_type)),
            flag(self.masquerade),
            int(i64::from(self.metric)),
            flag(self.enabled),
            json(&self.groups, "group_ids")?,
        ])
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            network: row.get("network")?,
            net_id: row.get("net_id")?,
            description: row.get("description")?,
            peer: row.get("peer")?,
            peer_groups: parse_json(row, "peer_groups")?,
            network_type: parse_enum(row, "network_type", parse_network_type)?,
            masquerade: row.get("masquerade")?,
            metric: row.get("metric")?,
            enabled: row.get("enabled")?,
            groups: parse_json(row, "group_ids")?,
        })
    }
}

impl TableRow for NameServerGroup {
    const TABLE: &'static str = "name_server_groups";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "account_id",
        "name",
        "description",
        "name_servers",
        "group_ids",
        "is_primary",
        "domains",
        "enabled",
        "search_domains_enabled",
    ];

    fn to_values(&self) -> StoreResult<Vec<Value>> {
        Ok(vec![
            text(&self.id),
            text(&self.account_id),
            text(&self.name),
            text(&self.description),
            json(&self.name_servers, "name_servers")?,
            json(&self.groups, "group_ids")?,
            flag(self.primary),
            json(&self.domains, "domains")?,
            flag(self.enabled),
            flag(self.search_domains_enabled),
        ])
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            name_servers: parse_json(row, "name_servers")?,
            groups: parse_json(row, "group_ids")?,
            primary: row.get("is_primary")?,
            domains: parse_json(row, "domains")?,
            enabled: row.get("enabled")?,
            search_domains_enabled: row.get("search_domains_enabled")?,
        })
    }
}

impl TableRow for SetupKey {
    const TABLE: &'static str = "setup_keys";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "account_id",
        "key",
        "name",
        "key_type",
        "created_at",
        "expires_at",
        "updated_at",
        "revoked",
        "used_times",
        "last_used",
        "auto_groups",
        "usage_limit",
        "ephemeral",
    ];

    fn to_values(&self) -> StoreResult<Vec<Value>> {
        Ok(vec![
            text(&self.id),
            text(&self.account_id),
            text(&self.key),
            text(&self.name),
            text(setup_key_type_to_db(self.key_type)),
            int(self.created_at),
            int(self.expires_at),
            int(self.updated_at),
            flag(self.revoked),
            int(self.used_times),
            int(self.last_used),
            json(&self.auto_groups, "auto_groups")?,
            int(self.usage_limit),
            flag(self.ephemeral),
        ])
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            key: row.get("key")?,
            name: row.get("name")?,
            key_type: parse_enum(row, "key_type", parse_setup_key_type)?,
            created_at: row.get("created_at")?,
            expires_at: row.get("expires_at")?,
            updated_at: row.get("updated_at")?,
            revoked: row.get("revoked")?,
            used_times: row.get("used_times")?,
            last_used: row.get("last_used")?,
            auto_groups: parse_json(row, "auto_groups")?,
            usage_limit: row.get("usage_limit")?,
            ephemeral: row.get("ephemeral")?,
        })
    }
}

impl TableRow for Policy {
    const TABLE: &'static str = "policies";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "account_id",
        "name",
        "description",
        "enabled",
        "source_posture_checks",
    ];

    fn to_values(&self) -> StoreResult<Vec<Value>> {
        Ok(vec![
            text(&self.id),
            text(&self.account_id),
            text(&self.name),
            text(&self.description),
            flag(self.enabled),
            json(&self.source_posture_checks, "source_posture_checks")?,
        ])
    }

    /// Rules are a separate table; `rules` starts empty.
    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            enabled: row.get("enabled")?,
            rules: Vec::new(),
            source_posture_checks: parse_json(row, "source_posture_checks")?,
        })
    }
}

impl TableRow for PolicyRuleRecord {
    const TABLE: &'static str = "policy_rules";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "policy_id",
        "position",
        "name",
        "description",
        "enabled",
        "rule_action",
        "destinations",
        "sources",
        "bidirectional",
        "protocol",
        "ports",
    ];

    fn to_values(&self) -> StoreResult<Vec<Value>> {
        let rule = &self.rule;
        Ok(vec![
            text(&rule.id),
            text(&rule.policy_id),
            int(self.position),
            text(&rule.name),
            text(&rule.description),
            flag(rule.enabled),
            text(traffic_action_to_db(rule.action)),
            json(&rule.destinations, "destinations")?,
            json(&rule.sources, "sources")?,
            flag(rule.bidirectional),
            text(rule_protocol_to_db(rule.protocol)),
            json(&rule.ports, "ports")?,
        ])
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            position: row.get("position")?,
            rule: PolicyRule {
                id: row.get("id")?,
                policy_id: row.get("policy_id")?,
                name: row.get("name")?,
                description: row.get("description")?,
                enabled: row.get("enabled")?,
                action: parse_enum(row, "rule_action", parse_traffic_action)?,
                destinations: parse_json(row, "destinations")?,
                sources: parse_json(row, "sources")?,
                bidirectional: row.get("bidirectional")?,
                protocol: parse_enum(row, "protocol", parse_rule_protocol)?,
                ports: parse_json(row, "ports")?,
            },
        })
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn int(value: i64) -> Value {
    Value::Integer(value)
}

fn flag(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

fn json<T: Serialize + ?Sized>(value: &T, column: &str) -> StoreResult<Value> {
    serde_json::to_string(value)
        .map(Value::Text)
        .map_err(|err| StoreError::InvalidData(format!("cannot encode `{column}`: {err}")))
}

fn parse_json<T: DeserializeOwned>(row: &Row<'_>, column: &str) -> StoreResult<T> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw)
        .map_err(|err| StoreError::InvalidData(format!("invalid json in `{column}`: {err}")))
}

fn parse_enum<T>(row: &Row<'_>, column: &str, parse: fn(&str) -> Option<T>) -> StoreResult<T> {
    let raw: String = row.get(column)?;
    parse(&raw)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid value `{raw}` in `{column}`")))
}

pub(crate) fn domain_category_to_db(category: DomainCategory) -> &'static str {
    match category {
        DomainCategory::Private => "private",
        DomainCategory::Public => "public",
        DomainCategory::Unclassified => "",
    }
}

fn parse_domain_category(value: &str) -> Option<DomainCategory> {
    match value {
        "private" => Some(DomainCategory::Private),
        "public" => Some(DomainCategory::Public),
        "" => Some(DomainCategory::Unclassified),
        _ => None,
    }
}

fn user_role_to_db(role: UserRole) -> &'static str {
    match role {
        UserRole::Owner => "owner",
        UserRole::Admin => "admin",
        UserRole::User => "user",
    }
}

fn parse_user_role(value: &str) -> Option<UserRole> {
    match value {
        "owner" => Some(UserRole::Owner),
        "admin" => Some(UserRole::Admin),
        "user" => Some(UserRole::User),
        _ => None,
    }
}

fn network_type_to_db(kind: NetworkType) -> &'static str {
    match kind {
        NetworkType::Ipv4 => "ipv4",
        NetworkType::Ipv6 => "ipv6",
    }
}

fn parse_network_type(value: &str) -> Option<NetworkType> {
    match value {
        "ipv4" => Some(NetworkType::Ipv4),
        "ipv6" => Some(NetworkType::Ipv6),
        _ => None,
    }
}

fn setup_key_type_to_db(kind: SetupKeyType) -> &'static str {
    match kind {
        SetupKeyType::Reusable => "reusable",
        SetupKeyType::OneOff => "one-off",
    }
}

fn parse_setup_key_type(value: &str) -> Option<SetupKeyType> {
    match value {
        "reusable" => Some(SetupKeyType::Reusable),
        "one-off" => Some(SetupKeyType::OneOff),
        _ => None,
    }
}

fn traffic_action_to_db(action: PolicyTrafficAction) -> &'static str {
    match action {
        PolicyTrafficAction::Accept => "accept",
        PolicyTrafficAction::Drop => "drop",
    }
}

fn parse_traffic_action(value: &str) -> Option<PolicyTrafficAction> {
    match value {
        "accept" => Some(PolicyTrafficAction::Accept),
        "drop" => Some(PolicyTrafficAction::Drop),
        _ => None,
    }
}

fn rule_protocol_to_db(protocol: PolicyRuleProtocol) -> &'static str {
    match protocol {
        PolicyRuleProtocol::All => "all",
        PolicyRuleProtocol::Tcp => "tcp",
        PolicyRuleProtocol::Udp => "udp",
        PolicyRuleProtocol::Icmp => "icmp",
    }
}

fn parse_rule_protocol(value: &str) -> Option<PolicyRuleProtocol> {
    match value {
        "all" => Some(PolicyRuleProtocol::All),
        "tcp" => Some(PolicyRuleProtocol::Tcp),
        "udp" => Some(PolicyRuleProtocol::Udp),
        "icmp" => Some(PolicyRuleProtocol::Icmp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::TableRow;
    use crate::model::group::Group;
    use crate::model::nameserver::NameServerGroup;
    use crate::model::peer::Peer;
    use crate::model::policy::Policy;
    use crate::model::route::Route;
    use crate::model::setup_key::SetupKey;
    use crate::model::user::{PersonalAccessToken, User};
    use crate::store::translate::{AccountRecord, PolicyRuleRecord};

    fn assert_arity<T: TableRow + Default>() {
        let values = T::default().to_values().unwrap();
        assert_eq!(values.len(), T::COLUMNS.len(), "table {}", T::TABLE);
        assert_eq!(T::COLUMNS[0], "id", "table {}", T::TABLE);
    }

    #[test]
    fn every_table_binds_one_value_per_column() {
        assert_arity::<AccountRecord>();
        assert_arity::<Peer>();
        assert_arity::<User>();
        assert_arity::<PersonalAccessToken>();
        assert_arity::<Group>();
        assert_arity::<Route>();
        assert_arity::<NameServerGroup>();
        assert_arity::<SetupKey>();
        assert_arity::<Policy>();
        assert_arity::<PolicyRuleRecord>();
    }
}
