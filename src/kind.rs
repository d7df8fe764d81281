//! The resource models of the API.

use crate::policy::{FieldPolicy, Obstruction, Satisfaction};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Account,
    Token,
    Notice,
    Server,
    Ip,
    Domain,
    DnsRecord,
    App,
    PsqlDb,
    MailUser,
    Address,
    Cert,
    QuarantinedMail,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 13] = [
        Self::Account,
        Self::Token,
        Self::Notice,
        Self::Server,
        Self::Ip,
        Self::Domain,
        Self::DnsRecord,
        Self::App,
        Self::PsqlDb,
        Self::MailUser,
        Self::Address,
        Self::Cert,
        Self::QuarantinedMail,
    ];

    /// Path segment of the model's endpoints.
    pub fn model_name(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Token => "token",
            Self::Notice => "notice",
            Self::Server => "server",
            Self::Ip => "ip",
            Self::Domain => "domain",
            Self::DnsRecord => "dnsrecord",
            Self::App => "app",
            Self::PsqlDb => "psqldb",
            Self::MailUser => "mailuser",
            Self::Address => "address",
            Self::Cert => "cert",
            Self::QuarantinedMail => "quarantinedmail",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            Self::Address => "addresses",
            Self::Account => "accounts",
            Self::Token => "tokens",
            Self::Notice => "notices",
            Self::Server => "servers",
            Self::Ip => "ips",
            Self::Domain => "domains",
            Self::DnsRecord => "dnsrecords",
            Self::App => "apps",
            Self::PsqlDb => "psqldbs",
            Self::MailUser => "mailusers",
            Self::Cert => "certs",
            Self::QuarantinedMail => "quarantinedmails",
        }
    }

    pub fn primary_key(&self) -> &'static str {
        match self {
            Self::Token => "key",
            _ => "id",
        }
    }

    /// Whether create and delete take effect immediately, without a
    /// ready/deleted state to poll for.
    pub fn is_instantaneous(&self) -> bool {
        matches!(
            self,
            Self::Token | Self::Notice | Self::Server | Self::Ip | Self::Cert
        )
    }

    pub fn default_policy(&self) -> FieldPolicy {
        match self {
            Self::Account | Self::Server | Self::Ip | Self::QuarantinedMail => {
                FieldPolicy::new(["id"])
            }
            Self::Token => {
                FieldPolicy::new(["name", "key"]).with_satisfaction(Satisfaction::Equal)
            }
            Self::Notice => {
                FieldPolicy::new(["type", "content"]).with_satisfaction(Satisfaction::Equal)
            }
            Self::Domain => FieldPolicy::new(["name"]).with_satisfaction(Satisfaction::Equal),
            Self::DnsRecord => FieldPolicy::new(["domain_name", "type", "content"])
                .with_satisfaction(Satisfaction::Equal),
            Self::App => FieldPolicy::new(["name", "osuser"]).with_obstruction(Obstruction::Equal),
            Self::PsqlDb => {
                FieldPolicy::new(["name", "server"]).with_obstruction(Obstruction::Equal)
            }
            Self::MailUser => {
                FieldPolicy::new(["name", "imap_server"]).with_satisfaction(Satisfaction::Equal)
            }
            Self::Address => FieldPolicy::new(["source", "destinations", "forwards"])
                .with_obstruction(Obstruction::Conflicting(vec!["source".to_string()]))
                .with_satisfaction(Satisfaction::Equal),
            Self::Cert => FieldPolicy::new(["name", "cert", "intermediates", "key"])
                .with_satisfaction(Satisfaction::Equal),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}
