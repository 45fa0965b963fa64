//! Service name hints for well-known ports.
//!
//! Purely advisory: the name reflects the conventional assignment of the
//! port, not anything observed on the wire.

use crate::types::Port;

/// Conventional service name for a port, if it is a well-known one.
pub fn service_name(port: Port) -> Option<&'static str> {
    let name = match port.as_u16() {
        20 => "ftp-data",
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 => "smtp",
        53 => "dns",
        80 => "http",
        88 => "kerberos",
        110 => "pop3",
        111 => "rpcbind",
        135 => "msrpc",
        139 => "netbios-ssn",
        143 => "imap",
        389 => "ldap",
        443 => "https",
        445 => "microsoft-ds",
        465 => "smtps",
        587 => "submission",
        636 => "ldaps",
        873 => "rsync",
        993 => "imaps",
        995 => "pop3s",
        1080 => "socks",
        1433 => "mssql",
        1521 => "oracle",
        1883 => "mqtt",
        2049 => "nfs",
        2375 => "docker",
        2376 => "docker-tls",
        3128 => "squid",
        3306 => "mysql",
        3389 => "rdp",
        5060 => "sip",
        5432 => "postgresql",
        5672 => "amqp",
        5900 => "vnc",
        6379 => "redis",
        6443 => "kubernetes-api",
        8000 | 8008 | 8081 | 8888 => "http-alt",
        8080 => "http-proxy",
        8443 => "https-alt",
        9090 => "prometheus",
        9092 => "kafka",
        9200 => "elasticsearch",
        11211 => "memcached",
        27017 => "mongodb",
        _ => return None,
    };
    Some(name)
}
